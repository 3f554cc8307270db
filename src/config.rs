//! Runtime configuration from the environment.
//!
//! Nothing secret has a default. E-mail delivery is enabled only when a
//! sender and at least one recipient are configured, and then requires a
//! credential. Any mail variable set without them is an error.
//!
//! # Credential sources
//!
//! Precedence (highest first):
//! - `SEPSISCOPE_SMTP_PASSWORD_FILE` (read from a file path)
//! - `/run/secrets/sepsiscope_smtp_password` (Docker/Compose secret default)
//! - `SEPSISCOPE_SMTP_PASSWORD` (debug builds only)

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use lettre::Address;
use zeroize::Zeroizing;

use crate::SepsiscopeError;

/// Prediction endpoint used when `SEPSISCOPE_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://sepsis-model-api.onrender.com/test/v1.0/prediction/";
pub const DEFAULT_SMTP_RELAY: &str = "smtp.gmail.com";
pub const DEFAULT_REPORT_DIR: &str = "reports";
pub const DEFAULT_TIMEZONE: &str = "US/Eastern";

const API_URL_ENV: &str = "SEPSISCOPE_API_URL";
const API_TIMEOUT_ENV: &str = "SEPSISCOPE_API_TIMEOUT_SECS";
const SMTP_SENDER_ENV: &str = "SEPSISCOPE_SMTP_SENDER";
const SMTP_RECIPIENTS_ENV: &str = "SEPSISCOPE_SMTP_RECIPIENTS";
const SMTP_RELAY_ENV: &str = "SEPSISCOPE_SMTP_RELAY";
const SMTP_PASSWORD_FILE_ENV: &str = "SEPSISCOPE_SMTP_PASSWORD_FILE";
const SMTP_PASSWORD_DOCKER_SECRET_PATH: &str = "/run/secrets/sepsiscope_smtp_password";
const SMTP_PASSWORD_ENV_DEV: &str = "SEPSISCOPE_SMTP_PASSWORD";
const REPORT_DIR_ENV: &str = "SEPSISCOPE_REPORT_DIR";
const TIMEZONE_ENV: &str = "SEPSISCOPE_TIMEZONE";

/// SMTP credential. Zeroized on drop and never printed.
#[derive(Clone)]
pub struct SmtpCredential(Zeroizing<String>);

impl SmtpCredential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for SmtpCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SmtpCredential([REDACTED])")
    }
}

/// Mail relay settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: Address,
    pub credential: SmtpCredential,
    pub recipients: Vec<Address>,
    pub relay: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    /// `None` waits for the service indefinitely.
    pub api_timeout: Option<Duration>,
    /// `None` disables e-mail delivery.
    pub mail: Option<MailConfig>,
    pub report_dir: PathBuf,
    pub timezone: Tz,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    /// Returns `SepsiscopeError::Config` if a value is present but invalid.
    pub fn from_env() -> Result<Self, SepsiscopeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `SepsiscopeError::Config` if a value is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SepsiscopeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = get(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        reqwest::Url::parse(&api_url)
            .map_err(|e| SepsiscopeError::Config(format!("{API_URL_ENV}={api_url:?}: {e}")))?;

        let api_timeout = match get(API_TIMEOUT_ENV) {
            Some(v) => {
                let secs: u64 = v.parse().map_err(|_| {
                    SepsiscopeError::Config(format!("{API_TIMEOUT_ENV} must be whole seconds, got {v:?}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let timezone = get(TIMEZONE_ENV).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| SepsiscopeError::Config(format!("{TIMEZONE_ENV}: unknown time zone {timezone:?}")))?;

        let report_dir = PathBuf::from(get(REPORT_DIR_ENV).unwrap_or_else(|| DEFAULT_REPORT_DIR.to_string()));

        let mail = Self::mail_from_lookup(&get)?;
        if mail.is_none() {
            tracing::info!("E-mail delivery not configured; reports will only be saved to disk");
        }

        Ok(Self {
            api_url,
            api_timeout,
            mail,
            report_dir,
            timezone,
        })
    }

    fn mail_from_lookup<F>(get: &F) -> Result<Option<MailConfig>, SepsiscopeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sender = get(SMTP_SENDER_ENV);
        let recipients = get(SMTP_RECIPIENTS_ENV);

        let (sender, recipients) = match (sender, recipients) {
            (None, None) => {
                let stray = [SMTP_PASSWORD_FILE_ENV, SMTP_PASSWORD_ENV_DEV, SMTP_RELAY_ENV]
                    .into_iter()
                    .find(|key| get(key).is_some());
                return match stray {
                    Some(key) => Err(SepsiscopeError::Config(format!(
                        "{key} is set but {SMTP_SENDER_ENV} and {SMTP_RECIPIENTS_ENV} are missing"
                    ))),
                    None => Ok(None),
                };
            }
            (Some(s), Some(r)) => (s, r),
            (None, Some(_)) => {
                return Err(SepsiscopeError::Config(format!(
                    "{SMTP_RECIPIENTS_ENV} is set but {SMTP_SENDER_ENV} is missing"
                )))
            }
            (Some(_), None) => {
                return Err(SepsiscopeError::Config(format!(
                    "{SMTP_SENDER_ENV} is set but {SMTP_RECIPIENTS_ENV} is missing"
                )))
            }
        };

        let sender = parse_address(&sender)?;
        let recipients = parse_recipients(&recipients)?;
        let credential = read_smtp_credential(get)?;
        let relay = get(SMTP_RELAY_ENV).unwrap_or_else(|| DEFAULT_SMTP_RELAY.to_string());

        Ok(Some(MailConfig {
            sender,
            credential,
            recipients,
            relay,
        }))
    }
}

fn parse_address(raw: &str) -> Result<Address, SepsiscopeError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| SepsiscopeError::Config(format!("invalid e-mail address {raw:?}: {e}")))
}

/// Parse a comma-separated recipient list. Empty entries are skipped.
fn parse_recipients(raw: &str) -> Result<Vec<Address>, SepsiscopeError> {
    let recipients = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_address)
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(SepsiscopeError::Config(format!("{SMTP_RECIPIENTS_ENV} lists no addresses")));
    }
    Ok(recipients)
}

fn read_secret_file(path: &Path) -> Result<SmtpCredential, SepsiscopeError> {
    let content = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        SepsiscopeError::Config(format!("cannot read SMTP credential from {}: {e}", path.display()))
    })?);
    let secret = content.trim_end_matches(['\n', '\r']);
    if secret.is_empty() {
        return Err(SepsiscopeError::Config(format!(
            "SMTP credential file {} is empty",
            path.display()
        )));
    }
    Ok(SmtpCredential::new(secret))
}

fn read_smtp_credential<F>(get: &F) -> Result<SmtpCredential, SepsiscopeError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1) Explicit file path
    if let Some(path) = get(SMTP_PASSWORD_FILE_ENV) {
        return read_secret_file(Path::new(&path));
    }

    // 2) Docker secrets default path
    let docker_secret = Path::new(SMTP_PASSWORD_DOCKER_SECRET_PATH);
    if docker_secret.exists() {
        return read_secret_file(docker_secret);
    }

    // 3) Dev-only env var (refused in release builds)
    if cfg!(debug_assertions) {
        if let Some(secret) = get(SMTP_PASSWORD_ENV_DEV) {
            return Ok(SmtpCredential::new(secret));
        }
    }

    Err(SepsiscopeError::Config(format!(
        "missing SMTP credential: provide {SMTP_PASSWORD_FILE_ENV} (or mount {SMTP_PASSWORD_DOCKER_SECRET_PATH})"
    )))
}
