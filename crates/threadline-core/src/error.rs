use thiserror::Error;

/// A convenience `Result` alias using [`ThreadlineError`].
pub type ThreadlineResult<T> = Result<T, ThreadlineError>;

/// Top-level error type for Threadline.
///
/// Remote variants carry the detail (and raw payload where there is one) for
/// logging; the request boundary never shows that detail to the browser.
#[derive(Error, Debug)]
pub enum ThreadlineError {
    /// The user submitted a blank message.
    #[error("Empty message")]
    EmptyInput,

    /// Network or transport failure talking to the assistant API.
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The assistant API answered with something we cannot interpret.
    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    /// The assistant API reported the run as failed.
    #[error("Run failed: {0}")]
    RunFailed(String),

    /// The run did not reach a terminal state within the polling budget.
    #[error("Run did not complete after {attempts} attempts")]
    RunTimedOut {
        /// Number of status queries performed.
        attempts: u32,
    },

    /// A conversation record could not be written or addressed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid or incomplete configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThreadlineError {
    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::RemoteUnavailable(_) => "remote_unavailable",
            Self::RemoteProtocol(_) => "remote_protocol",
            Self::RunFailed(_) => "run_failed",
            Self::RunTimedOut { .. } => "run_timed_out",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }

    /// Whether the error came from talking to the assistant API.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_)
                | Self::RemoteProtocol(_)
                | Self::RunFailed(_)
                | Self::RunTimedOut { .. }
        )
    }
}
