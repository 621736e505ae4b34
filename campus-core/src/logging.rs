use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Install the fmt subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    // A second init (tests, embedding apps) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// One outgoing REST call. Headers are never recorded: they carry the bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCallLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub query_string: Option<String>,
    pub status_code: Option<u16>,
    pub duration_ms: u64,
    #[serde(skip)]
    started: Option<Instant>,
}

impl ApiCallLog {
    pub fn start(method: &str, path: &str, query: &[(String, String)]) -> Self {
        let query_string = if query.is_empty() {
            None
        } else {
            Some(
                query
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&"),
            )
        };

        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            query_string,
            status_code: None,
            duration_ms: 0,
            started: Some(Instant::now()),
        }
    }

    /// Stamp the outcome and emit the entry. `None` means the transport failed.
    pub fn finish(mut self, status: Option<u16>) -> Self {
        self.status_code = status;
        self.duration_ms = self
            .started
            .take()
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or_default();
        self.emit();
        self
    }

    fn emit(&self) {
        let query = self.query_string.as_deref().map(|q| format!("?{}", q)).unwrap_or_default();
        match self.status_code {
            Some(status) if (200..300).contains(&status) => info!(
                request_id = %self.id,
                "📡 API Call: {} {}{} -> {} ({} ms)",
                self.method, self.path, query, status, self.duration_ms
            ),
            Some(status) => warn!(
                request_id = %self.id,
                "⚠️ API Call: {} {}{} -> {} ({} ms)",
                self.method, self.path, query, status, self.duration_ms
            ),
            None => warn!(
                request_id = %self.id,
                "❌ API Call: {} {}{} -> transport failure ({} ms)",
                self.method, self.path, query, self.duration_ms
            ),
        }
    }
}
