use meet_orchestrator::TaskError;

/// Domain error for a pipeline task body, convertible to the orchestrator's
/// `TaskError` at the task/handler boundary. Kept separate from `TaskError`
/// so task logic reads in terms of its own failure modes (empty mix,
/// malformed container, remote 4xx) rather than generic transient/permanent.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("transient: {0}")]
    Transient(String),

    #[error("permanent: {0}")]
    Permanent(String),
}

impl PipelineError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }
}

impl From<PipelineError> for TaskError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Transient(m) => TaskError::Transient(m),
            PipelineError::Permanent(m) => TaskError::Permanent(m),
        }
    }
}

impl From<meet_shared::AppError> for PipelineError {
    fn from(err: meet_shared::AppError) -> Self {
        PipelineError::Transient(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            PipelineError::Transient(err.to_string())
        } else if let Some(status) = err.status() {
            if meet_shared::retry::is_retryable_status(status.as_u16()) {
                PipelineError::Transient(err.to_string())
            } else {
                PipelineError::Permanent(err.to_string())
            }
        } else {
            PipelineError::Transient(err.to_string())
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
