// src/error.rs
use thiserror::Error;

/// Structured code the backend may attach to an empty-portfolio response.
pub const EMPTY_PORTFOLIO_CODE: &str = "empty_portfolio";

#[derive(Error, Debug)]
pub enum FolioError {
    /// Rejected locally, before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    EmptyPortfolio(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl FolioError {
    pub fn is_empty_portfolio(&self) -> bool {
        matches!(self, FolioError::EmptyPortfolio(_))
    }

    /// Reclassifies a failed `GET /dashboard` so callers can render an
    /// empty state instead of a generic error. A structured code wins; the
    /// message match covers backends that only send `detail` text.
    pub fn into_dashboard_error(self) -> FolioError {
        match self {
            FolioError::Server {
                status,
                message,
                code,
            } => {
                let coded = code.as_deref() == Some(EMPTY_PORTFOLIO_CODE);
                if coded || mentions_no_holdings(&message) {
                    FolioError::EmptyPortfolio(message)
                } else {
                    FolioError::Server {
                        status,
                        message,
                        code,
                    }
                }
            }
            other => other,
        }
    }
}

// Case-sensitive: a bare 404 reason phrase ("Not Found") stays a server error.
fn mentions_no_holdings(message: &str) -> bool {
    message.contains("No holdings") || message.contains("not found")
}

impl From<reqwest::Error> for FolioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FolioError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            FolioError::Decode(err.to_string())
        } else {
            FolioError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for FolioError {
    fn from(err: std::io::Error) -> Self {
        FolioError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
