use std::path::PathBuf;
use std::time::Duration;

/// All errors that can occur in audiograb.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid URL (must start with http:// or https://): {0}")]
    InvalidUrl(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("{program} not found: is it installed and on PATH?")]
    ToolNotFound { program: String },

    #[error("{program} timed out after {}s", .timeout.as_secs_f64())]
    ProcessTimeout { program: String, timeout: Duration },

    #[error("{program} failed (exit code {}): {stderr}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ProcessFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("download did not produce expected output at {path}")]
    OutputMissing { path: PathBuf },

    #[error("{program} produced no output")]
    EmptyOutput { program: String },

    #[error("{program} output exceeded the {limit} byte limit")]
    OutputTooLarge { program: String, limit: usize },

    #[error("invalid audio output: {0}")]
    InvalidAudio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means an external command ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ProcessTimeout { .. })
    }

    /// Whether this error stems from bad caller input rather than a pipeline failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidUrl(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
