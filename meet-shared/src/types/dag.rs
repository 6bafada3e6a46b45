use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mirrors `DagTaskStatus` from the original conductor's progress broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DagTaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagTask {
    pub name: String,
    pub status: DagTaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub parents: Vec<String>,
    pub error: Option<String>,
    pub children_total: u32,
    pub children_completed: u32,
}

impl DagTask {
    pub fn progress_pct(&self) -> f64 {
        if self.children_total == 0 {
            return match self.status {
                DagTaskStatus::Completed => 100.0,
                _ => 0.0,
            };
        }
        (self.children_completed as f64 / self.children_total as f64) * 100.0
    }
}

/// Derived, broadcast-only snapshot of an in-flight workflow run. Never
/// persisted as its own table row; always rebuilt from the orchestrator's
/// task-instance rows and pushed as a full snapshot, never a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagStatus {
    pub workflow_run_id: String,
    pub transcript_id: uuid::Uuid,
    pub tasks: Vec<DagTask>,
}

impl DagStatus {
    pub fn is_terminal(&self) -> bool {
        !self.tasks.is_empty()
            && self.tasks.iter().all(|t| {
                matches!(
                    t.status,
                    DagTaskStatus::Completed | DagTaskStatus::Failed | DagTaskStatus::Cancelled
                )
            })
    }

    pub fn has_failure(&self) -> bool {
        self.tasks
            .iter()
            .any(|t| matches!(t.status, DagTaskStatus::Failed | DagTaskStatus::Cancelled))
    }
}
