use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::models::{ImportBatch, ImportReceipt};

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    #[error("could not reach the server: {0}")]
    Transport(String),

    #[error("{0}")]
    Config(String),
}

/// Sends one batch and waits for the answer. Implementations must not retry.
pub trait Submitter {
    fn submit(&self, batch: &ImportBatch) -> Result<ImportReceipt, SubmitError>;
}

pub struct HttpSubmitter {
    agent: ureq::Agent,
    url: String,
    token: Option<Zeroizing<String>>,
}

impl HttpSubmitter {
    pub fn new(
        base_url: &str,
        import_path: &str,
        token: Option<Zeroizing<String>>,
        timeout: Duration,
        use_env_proxy: bool,
    ) -> Result<Self, SubmitError> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(SubmitError::Config(
                "No API URL configured. Run `stmt-import config set api_base_url <url>`.".to_string(),
            ));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(SubmitError::Config(format!("API URL must start with http:// or https://: {base}")));
        }
        let path = import_path.trim();
        let url = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };

        let mut config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false);
        if !use_env_proxy {
            config = config.proxy(None);
        }
        let agent: ureq::Agent = config.build().into();
        Ok(Self { agent, url, token })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Submitter for HttpSubmitter {
    fn submit(&self, batch: &ImportBatch) -> Result<ImportReceipt, SubmitError> {
        tracing::info!(url = %self.url, transactions = batch.transactions.len(), "submitting statement batch");

        let mut request = self.agent.post(&self.url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token.as_str()));
        }
        let mut response = request
            .send_json(batch)
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = match response.body_mut().read_to_string() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(status, error = %e, "could not read import response body");
                String::new()
            }
        };
        let json: Option<Value> = serde_json::from_str(&body).ok();
        tracing::debug!(status, bytes = body.len(), "import endpoint responded");

        if !(200..300).contains(&status) {
            let message = json
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("The server could not import the statement (status {status})"));
            tracing::warn!(status, %message, "statement import rejected");
            return Err(SubmitError::Rejected { status, message });
        }

        Ok(receipt_from(status, json.as_ref()))
    }
}

/// Pull a human message out of an error body: `message`, `error`, `detail`,
/// or `error.message`.
fn error_message(body: &Value) -> Option<String> {
    for key in ["message", "error", "detail"] {
        match body.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Object(inner)) => {
                if let Some(Value::String(s)) = inner.get("message") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }
    None
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn receipt_from(status: u16, body: Option<&Value>) -> ImportReceipt {
    let Some(body) = body else {
        return ImportReceipt {
            status,
            ..Default::default()
        };
    };
    let data = body.get("data").unwrap_or(body);
    let statement_id = ["statement_id", "id"]
        .iter()
        .find_map(|k| data.get(*k).and_then(as_text));
    let imported = ["imported", "imported_count", "transactions_imported", "count"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_u64));
    let message = body.get("message").and_then(Value::as_str).map(str::to_string);
    ImportReceipt {
        status,
        statement_id,
        imported,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;

    use crate::models::NormalizedTransaction;

    fn batch() -> ImportBatch {
        ImportBatch {
            card_id: "card-9".to_string(),
            period_start: "2024-01-01".to_string(),
            period_end: "2024-01-31".to_string(),
            import_source: "csv".to_string(),
            original_filename: Some("jan.csv".to_string()),
            transactions: vec![NormalizedTransaction {
                card_id: "card-9".to_string(),
                transaction_date: "2024-01-05".to_string(),
                amount: -12.5,
                merchant_name: Some("Cafe".to_string()),
                description: None,
                transaction_reference: None,
                posting_date: None,
                original_amount: None,
                original_currency: None,
            }],
        }
    }

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let Some(end) = header_end(buf) else {
            return false;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        if let Some(line) = head.lines().find(|l| l.starts_with("content-length:")) {
            let len: usize = line["content-length:".len()..].trim().parse().unwrap_or(0);
            return buf.len() >= end + len;
        }
        buf.ends_with(b"0\r\n\r\n")
    }

    /// Serve exactly one request with a canned response; hands back the raw
    /// request text.
    fn one_shot_server(status_line: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        raw_server(response)
    }

    fn raw_server(response: String) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request_complete(&buf) {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
        });
        (format!("http://{addr}"), rx)
    }

    #[test]
    fn test_submit_posts_batch_and_reads_receipt() {
        let (base, rx) = one_shot_server("201 Created", r#"{"data":{"id":42,"imported":1},"message":"ok"}"#);
        let token = Some(Zeroizing::new("secret-token".to_string()));
        let submitter = HttpSubmitter::new(&base, "/api/v1/card-statements/import", token, Duration::from_secs(5), false).unwrap();
        let receipt = submitter.submit(&batch()).unwrap();
        assert_eq!(receipt.status, 201);
        assert_eq!(receipt.statement_id.as_deref(), Some("42"));
        assert_eq!(receipt.imported, Some(1));
        assert_eq!(receipt.message.as_deref(), Some("ok"));

        let request = rx.recv().unwrap();
        assert!(request.starts_with("POST /api/v1/card-statements/import"));
        assert!(request.to_lowercase().contains("authorization: bearer secret-token"));
        assert!(request.contains(r#""card_id":"card-9""#));
        assert!(request.contains(r#""import_source":"csv""#));
        assert!(!request.contains("posting_date"));
    }

    #[test]
    fn test_submit_surfaces_backend_message() {
        let (base, _rx) = one_shot_server(
            "422 Unprocessable Entity",
            r#"{"message":"Statement period overlaps an existing statement"}"#,
        );
        let submitter = HttpSubmitter::new(&base, "import", None, Duration::from_secs(5), false).unwrap();
        match submitter.submit(&batch()) {
            Err(SubmitError::Rejected { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "Statement period overlaps an existing statement");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_generic_message_without_body() {
        let (base, _rx) = one_shot_server("500 Internal Server Error", "");
        let submitter = HttpSubmitter::new(&base, "/import", None, Duration::from_secs(5), false).unwrap();
        let err = submitter.submit(&batch()).unwrap_err();
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn test_truncated_success_body_gives_empty_receipt() {
        let (base, _rx) = raw_server(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"data\":".to_string(),
        );
        let submitter = HttpSubmitter::new(&base, "/import", None, Duration::from_secs(5), false).unwrap();
        let receipt = submitter.submit(&batch()).unwrap();
        assert_eq!(receipt.status, 200);
        assert_eq!(receipt.statement_id, None);
        assert_eq!(receipt.imported, None);
    }

    #[test]
    fn test_submit_transport_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let submitter =
            HttpSubmitter::new(&format!("http://127.0.0.1:{port}"), "/import", None, Duration::from_secs(2), false).unwrap();
        assert!(matches!(submitter.submit(&batch()), Err(SubmitError::Transport(_))));
    }

    #[test]
    fn test_new_requires_base_url() {
        assert!(matches!(
            HttpSubmitter::new("", "/import", None, Duration::from_secs(1), false),
            Err(SubmitError::Config(_))
        ));
        assert!(matches!(
            HttpSubmitter::new("ftp://example.com", "/import", None, Duration::from_secs(1), false),
            Err(SubmitError::Config(_))
        ));
        let s = HttpSubmitter::new("https://books.example.com/", "api/import", None, Duration::from_secs(1), false).unwrap();
        assert_eq!(s.url(), "https://books.example.com/api/import");
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(&json!({"error": "bad"})).as_deref(), Some("bad"));
        assert_eq!(error_message(&json!({"error": {"message": "nested"}})).as_deref(), Some("nested"));
        assert_eq!(error_message(&json!({"detail": "why"})).as_deref(), Some("why"));
        assert_eq!(error_message(&json!({"status": 1})), None);
    }

    #[test]
    fn test_batch_serializes_expected_keys() {
        let value = serde_json::to_value(batch()).unwrap();
        assert_eq!(value["period_start"], "2024-01-01");
        assert_eq!(value["original_filename"], "jan.csv");
        assert_eq!(value["transactions"][0]["amount"], -12.5);
        assert!(value["transactions"][0].get("description").is_none());
    }
}
