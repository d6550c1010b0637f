use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the tracker and workspace clients.
///
/// Everything except `Config` is scoped to a single record: the sync loop
/// logs it and moves on.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{service}: authentication failed: {message}")]
    Authentication { service: &'static str, message: String },

    #[error("{service}: permission denied: {message}")]
    Permission { service: &'static str, message: String },

    #[error("{service}: not found: {message}")]
    NotFound { service: &'static str, message: String },

    #[error("{service}: rejected request: {message}")]
    Validation { service: &'static str, message: String },

    #[error("{service}: transient failure: {message}")]
    Transient { service: &'static str, message: String },

    #[error("{service}: unexpected response: {message}")]
    Decode { service: &'static str, message: String },
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Classify a non-success HTTP status. `body` is whatever the server
    /// sent back, trimmed for logging.
    pub fn from_status(service: &'static str, status: StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));
        match status {
            StatusCode::UNAUTHORIZED => SyncError::Authentication { service, message },
            StatusCode::FORBIDDEN => SyncError::Permission { service, message },
            StatusCode::NOT_FOUND => SyncError::NotFound { service, message },
            StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
                SyncError::Transient { service, message }
            }
            s if s.is_server_error() => SyncError::Transient { service, message },
            s if s.is_client_error() => SyncError::Validation { service, message },
            _ => SyncError::Decode { service, message },
        }
    }

    /// Transport failures (timeouts, refused connections, TLS) never reach
    /// the server's error mapping, so they are all transient.
    pub fn from_transport(service: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        SyncError::Transient { service, message }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        SyncError::Decode {
            service,
            message: message.into(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max).collect();
        format!("{cut}…")
    }
}
