use thiserror::Error;

/// Failures of the page session (the snapshot provider seam).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page load timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("no page has been opened in this session")]
    NoPage,

    #[error("session does not support {operation}")]
    Unsupported { operation: &'static str },
}

impl SessionError {
    /// Whether a fresh attempt at the same page load may succeed.
    ///
    /// Timeouts, transport failures, 429 and 5xx responses are transient.
    /// Everything else would fail the same way again.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            SessionError::Http(_) | SessionError::Timeout { .. } => true,
            SessionError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            SessionError::NoPage | SessionError::Unsupported { .. } => false,
        }
    }
}

/// Failures reading or writing run output.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("worklist '{name}' not found at {path}")]
    WorklistMissing { name: String, path: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error for {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ScraperError {
    /// The one condition that stops a detail run before any page is touched.
    #[must_use]
    pub fn is_worklist_missing(&self) -> bool {
        matches!(self, ScraperError::Sink(SinkError::WorklistMissing { .. }))
    }
}
