use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::dag::NodeKind;
use crate::schema::{task_instance, workflow_run};
use crate::task::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Queued,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = workflow_run)]
pub struct WorkflowRunRow {
    pub id: Uuid,
    pub dag_name: String,
    pub transcript_id: Uuid,
    pub status: String,
    pub input: Value,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRunRow {
    pub fn status(&self) -> RunStatus {
        RunStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = workflow_run)]
pub struct NewWorkflowRun {
    pub id: Uuid,
    pub dag_name: String,
    pub transcript_id: Uuid,
    pub status: String,
    pub input: Value,
}

impl NewWorkflowRun {
    pub fn new(dag_name: impl Into<String>, transcript_id: Uuid, input: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            dag_name: dag_name.into(),
            transcript_id,
            status: RunStatus::Running.as_str().to_string(),
            input,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = task_instance)]
pub struct TaskInstanceRow {
    pub id: Uuid,
    pub workflow_run_id: Uuid,
    pub task_ref: String,
    pub task_name: String,
    pub status: String,
    pub attempt: i32,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskInstanceRow {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_instance)]
pub struct NewTaskInstance {
    pub id: Uuid,
    pub workflow_run_id: Uuid,
    pub task_ref: String,
    pub task_name: String,
    pub status: String,
    pub attempt: i32,
    pub input: Value,
}

impl NewTaskInstance {
    pub fn for_node(workflow_run_id: Uuid, task_ref: &str, kind: &NodeKind, input: Value) -> Self {
        let task_name = match kind {
            NodeKind::Task(def) => def.name.clone(),
            NodeKind::ForkDynamic { child_task_def } => child_task_def.name.clone(),
        };
        Self {
            id: Uuid::new_v4(),
            workflow_run_id,
            task_ref: task_ref.to_string(),
            task_name,
            status: TaskStatus::Queued.as_str().to_string(),
            attempt: 0,
            input,
        }
    }
}

/// `error` is `Option<Option<String>>` so a success update can explicitly
/// clear an error left over from an earlier failed attempt, rather than
/// diesel's default "skip column when None" AsChangeset behavior.
#[derive(AsChangeset)]
#[diesel(table_name = task_instance)]
pub struct TaskFinishUpdate {
    pub status: String,
    pub output: Option<Value>,
    pub error: Option<Option<String>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskFinishUpdate {
    pub fn success(output: Value) -> Self {
        Self {
            status: TaskStatus::Completed.as_str().to_string(),
            output: Some(output),
            error: Some(None),
            finished_at: Some(Utc::now()),
        }
    }

    pub fn failure(err: &TaskError, terminal: bool) -> Self {
        Self {
            status: if terminal {
                TaskStatus::Failed.as_str().to_string()
            } else {
                TaskStatus::Queued.as_str().to_string()
            },
            output: None,
            error: Some(Some(err.message().to_string())),
            finished_at: if terminal { Some(Utc::now()) } else { None },
        }
    }
}
