//! HTTP adapter: Implementation of PredictionApi.
//!
//! One blocking `POST` per batch. The body is `{"sepsis_fv": [...]}` and
//! the service answers `{"sepsis_risk": [0|1, ...]}`.
//!
//! No retry and no backoff. Unless configured otherwise there is no
//! timeout either: the call waits until the service responds or the
//! transport fails.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{LabRecord, SepsisLabel};
use crate::ports::{PredictionApi, PredictionError};

/// Request body field holding the feature vectors.
pub const REQUEST_KEY: &str = "sepsis_fv";

/// Response body field holding the labels.
pub const RESPONSE_KEY: &str = "sepsis_risk";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 2048;

#[derive(Serialize)]
struct PredictionRequest<'a> {
    sepsis_fv: &'a [LabRecord],
}

/// Blocking reqwest client for the sepsis model service.
pub struct HttpPredictionClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpPredictionClient {
    /// Create a client for `endpoint`.
    ///
    /// # Errors
    /// Returns `PredictionError::Transport` if the HTTP client cannot be built
    /// (e.g. TLS backend initialization failure).
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, PredictionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sepsiscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, endpoint))
    }

    /// Create a client around a preconfigured reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::blocking::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl PredictionApi for HttpPredictionClient {
    fn predict(&self, batch: &[LabRecord]) -> Result<Vec<SepsisLabel>, PredictionError> {
        tracing::debug!("POST {} ({} records)", self.endpoint, batch.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&PredictionRequest { sepsis_fv: batch })
            .send()
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("Prediction service returned {}", status.as_u16());
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        parse_labels(&body)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

/// Decode the label array from a success response body.
///
/// A missing `sepsis_risk` key yields an empty list; the caller's length
/// check then rejects the batch.
///
/// # Errors
/// Returns `PredictionError::Shape` if the body is not a JSON object, the
/// key does not hold an array, or a label is not 0/1.
pub fn parse_labels(body: &str) -> Result<Vec<SepsisLabel>, PredictionError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| PredictionError::Shape(format!("response is not JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| PredictionError::Shape("response is not a JSON object".to_string()))?;

    let labels = match object.get(RESPONSE_KEY) {
        None => return Ok(Vec::new()),
        Some(Value::Array(labels)) => labels,
        Some(_) => {
            return Err(PredictionError::Shape(format!("'{RESPONSE_KEY}' is not an array")));
        }
    };

    labels
        .iter()
        .enumerate()
        .map(|(i, v)| {
            SepsisLabel::from_wire(v).ok_or_else(|| {
                PredictionError::Shape(format!("label {} is {v}, expected 0 or 1", i + 1))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve exactly one HTTP response on loopback; returns the URL and a
    /// handle yielding the request body that was received.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Should bind loopback");
        let addr = listener.local_addr().expect("Should have address");

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("Should accept");
            let mut reader = BufReader::new(stream.try_clone().expect("Should clone stream"));

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("Should read header");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().expect("Should parse length");
                }
            }

            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).expect("Should read body");

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("Should write response");
            String::from_utf8(request_body).expect("Body should be UTF-8")
        });

        (format!("http://{addr}/test/v1.0/prediction/"), handle)
    }

    fn client(endpoint: String) -> HttpPredictionClient {
        let client = reqwest::blocking::Client::builder()
            .no_proxy()
            .build()
            .expect("Should build client");
        HttpPredictionClient::with_client(client, endpoint)
    }

    fn batch() -> Vec<LabRecord> {
        let mut a = LabRecord::new();
        a.set("Age", 64.0);
        a.set("Temp", 34.5);
        let mut b = LabRecord::new();
        b.set("Lactate", 4.2);
        vec![a, b]
    }

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels(r#"{"sepsis_risk": [1, 0, 1.0]}"#).expect("Should parse");
        assert_eq!(
            labels,
            vec![SepsisLabel::Positive, SepsisLabel::Negative, SepsisLabel::Positive]
        );

        assert!(parse_labels(r#"{"status": "ok"}"#).expect("Should parse").is_empty());
    }

    #[test]
    fn test_parse_labels_rejects_bad_shapes() {
        for body in [
            "<html>502</html>",
            "[1, 0]",
            r#"{"sepsis_risk": "1,0"}"#,
            r#"{"sepsis_risk": [1, 2]}"#,
            r#"{"sepsis_risk": [0.7]}"#,
        ] {
            assert!(
                matches!(parse_labels(body), Err(PredictionError::Shape(_))),
                "expected shape error for {body}"
            );
        }
    }

    #[test]
    fn test_predict_round_trip() {
        let (url, server) = serve_once("200 OK", r#"{"sepsis_risk": [1, 0]}"#);
        let labels = client(url).predict(&batch()).expect("Should predict");
        assert_eq!(labels, vec![SepsisLabel::Positive, SepsisLabel::Negative]);

        let sent: Value = serde_json::from_str(&server.join().expect("Server thread"))
            .expect("Request should be JSON");
        let rows = sent[REQUEST_KEY].as_array().expect("Should send an array");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Age"], 64.0);
        assert_eq!(rows[0]["Temp"], 34.5);
        assert_eq!(rows[1].as_object().map(|o| o.len()), Some(1));
    }

    #[test]
    fn test_predict_surfaces_status_and_body() {
        let (url, server) = serve_once("422 Unprocessable Entity", r#"{"detail": "bad Temp"}"#);
        let err = client(url).predict(&batch()).expect_err("Should fail");
        server.join().expect("Server thread");

        match err {
            PredictionError::Status { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("bad Temp"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_predict_transport_failure() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .expect("Should bind")
            .port();
        let err = client(format!("http://127.0.0.1:{port}/"))
            .predict(&batch())
            .expect_err("Should fail");
        assert!(matches!(err, PredictionError::Transport(_)));
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(MAX_ERROR_BODY);
        let truncated = truncate_body(long);
        assert!(truncated.len() <= MAX_ERROR_BODY + 3);
        assert!(truncated.ends_with("..."));
    }
}
