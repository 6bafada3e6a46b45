use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Static retry/timeout policy for one task kind, keyed by `name` in the DAG
/// (§4.11's table). Timeout bounds the task body; response bounds how long
/// the orchestrator waits for a heartbeat before declaring it lost.
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub name: String,
    pub timeout: Duration,
    pub response_deadline: Duration,
    pub max_retries: u32,
}

impl TaskDef {
    pub fn new(name: impl Into<String>, timeout_secs: u64, response_secs: u64, max_retries: u32) -> Self {
        Self {
            name: name.into(),
            timeout: Duration::from_secs(timeout_secs),
            response_deadline: Duration::from_secs(response_secs),
            max_retries,
        }
    }
}

/// Per-invocation context passed to a task handler. `input` carries only
/// identifiers per the payload-thinning rule (§4.11): handlers reload large
/// data (word lists, track URLs) from storage using `transcript_id`, not
/// from the orchestrator message.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub run_id: String,
    pub task_ref: String,
    pub attempt: u32,
    pub input: Value,
}

impl TaskContext {
    pub fn input_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.input.clone())
    }
}

/// Error returned by a task body. Permanent errors skip remaining retries;
/// transient errors are retried per the task's `max_retries`.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

impl TaskError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            TaskError::Transient(m) | TaskError::Permanent(m) => m,
        }
    }
}

pub type TaskOutput = Value;

/// Implemented by every concrete pipeline task (pad_track, mixdown,
/// transcribe_track, detect_topics, ...) and registered with the worker
/// pool under a stable `task_name`.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    fn task_name(&self) -> &str;

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError>;
}

/// A dynamic fan-out generator task: given the context, produces the set of
/// child task definitions plus their keyed inputs at runtime (§4.11's
/// `ForkJoinDynamic`), e.g. one `pad_track` child per recorded track.
#[async_trait]
pub trait ForkGenerator: Send + Sync {
    fn task_name(&self) -> &str;

    async fn generate(&self, ctx: &TaskContext) -> Result<ForkPlan, TaskError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForkPlan {
    /// Stable reference names for each spawned child, e.g. `pad_track[0]`.
    pub task_refs: Vec<String>,
    /// The underlying task kind every child runs (its `TaskDef` is reused).
    pub child_task_name: String,
    /// Per-child input, same length and order as `task_refs`.
    pub inputs: Vec<Value>,
}
