#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
}

impl MemoryError {
    /// HTTP status of a failed upstream call, if that's what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
