//! Sepsiscope: batch sepsis risk prediction.
//!
//! Main entry point for the terminal application and the headless batch mode.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use sepsiscope::adapters::csv_report::{format_value, PATIENT_ID_COLUMN, PREDICTION_COLUMN, WARNING_COLUMN};
use sepsiscope::adapters::sanitize::SanitizingMakeWriter;
use sepsiscope::adapters::{HttpPredictionClient, SmtpMailer};
use sepsiscope::application::{
    load_payload_file, report_title, DeliveryStatus, PredictionService, ReportService,
};
use sepsiscope::domain::PredictionReport;
use sepsiscope::tui::App;
use sepsiscope::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "sepsiscope",
    version,
    about = "Batch sepsis risk prediction against a remote model service",
    long_about = "Loads a JSON batch of patient lab values (top-level 'sepsis_fv'), sends it to \
        the sepsis prediction service and shows the per-patient risk.\n\n\
        Without arguments the interactive terminal UI starts. With --batch the same pipeline \
        runs once, prints the result table and writes the CSV report.\n\n\
        Configuration comes from SEPSISCOPE_* environment variables."
)]
struct Cli {
    /// Run headless on this lab records file instead of starting the UI
    #[arg(long, value_name = "FILE")]
    batch: Option<PathBuf>,

    /// Directory for the CSV report (overrides SEPSISCOPE_REPORT_DIR)
    #[arg(long, value_name = "DIR", requires = "batch")]
    out: Option<PathBuf>,

    /// Save the report without e-mailing it
    #[arg(long, requires = "batch")]
    no_email: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // IMPORTANT: writing logs to the terminal will corrupt the TUI (alternate screen).
    // Default behavior:
    // - interactive TUI: log to a file
    // - batch mode: log to stderr (stdout carries the result table)
    // - otherwise: log to stdout (so `docker logs` works)
    // The guard lives until the end of `main` so a failure is still flushed.
    let _guard = match init_logging(cli.batch.is_some()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => report_failure(&e),
    }
}

fn report_failure(e: &anyhow::Error) -> ExitCode {
    tracing::error!("{:#}", e);
    eprintln!("Error: {e:#}");
    ExitCode::FAILURE
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::from_env()?;
    if let Some(out) = cli.out {
        config.report_dir = out;
    }

    match cli.batch {
        Some(path) => run_batch(&config, &path, !cli.no_email),
        None => {
            tracing::info!("Starting Sepsiscope...");
            let mut app = App::new(&config)?;
            app.run()?;
            tracing::info!("Sepsiscope shutdown complete.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(headless: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_mode = std::env::var("SEPSISCOPE_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" | "stderr" => false,
        // auto
        _ => interactive && !headless,
    };

    let (writer, guard) = if use_file {
        let log_file =
            std::env::var("SEPSISCOPE_LOG_FILE").unwrap_or_else(|_| "sepsiscope.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Cannot open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else if headless || log_mode == "stderr" {
        tracing_appender::non_blocking(std::io::stderr())
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    build_subscriber(writer, !use_file).init();

    Ok(guard)
}

/// `RUST_LOG`-filtered fmt subscriber writing sanitized lines to `writer`.
fn build_subscriber<W>(writer: W, ansi: bool) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
}

/// Headless run: load, predict, print, export.
fn run_batch(config: &AppConfig, path: &std::path::Path, send_email: bool) -> Result<ExitCode> {
    let batch = load_payload_file(path)?;

    let api = Arc::new(HttpPredictionClient::new(
        config.api_url.clone(),
        config.api_timeout,
    )?);
    let prediction = PredictionService::new(api);
    let report = prediction.run(&batch)?;

    let mailer = match &config.mail {
        Some(mail) => Some(Arc::new(SmtpMailer::from_config(mail)?)),
        None => None,
    };
    let reports = ReportService::new(mailer, config.report_dir.clone(), config.timezone);

    println!(
        "{}",
        report_title(&report.generated_at.with_timezone(&config.timezone))
    );
    println!();
    print!("{}", plain_table(&report));

    let summary = report.summary();
    println!();
    println!(
        "Positive: {}  Negative: {}  Total: {}  Positive share: {:.1}%",
        summary.positive, summary.negative, summary.total, summary.positive_percent
    );

    let export = reports.generate_at(&report, report.generated_at, send_email)?;
    println!("Report saved to {}", export.path.display());

    let code = match &export.delivery {
        DeliveryStatus::Sent { recipients } => {
            println!("E-mail sent to {}", recipients.join(", "));
            ExitCode::SUCCESS
        }
        DeliveryStatus::Skipped => {
            if send_email && !reports.email_enabled() {
                println!("E-mail delivery not configured; report not sent.");
            }
            ExitCode::SUCCESS
        }
        DeliveryStatus::Failed { error } => {
            eprintln!("{error}");
            ExitCode::from(2)
        }
    };

    Ok(code)
}

/// Fixed-width text rendering of the result table.
fn plain_table(report: &PredictionReport) -> String {
    let features = report.feature_columns();
    let header: Vec<String> = std::iter::once(PATIENT_ID_COLUMN)
        .chain(features.iter().copied())
        .chain([PREDICTION_COLUMN, WARNING_COLUMN])
        .map(str::to_string)
        .collect();

    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.patient_id.clone())
                .chain(features.iter().map(|name| {
                    row.record.get(name).map(format_value).unwrap_or_default()
                }))
                .chain([
                    row.prediction.to_string(),
                    row.warning.map(|w| w.to_string()).unwrap_or_default(),
                ])
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(header[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}
