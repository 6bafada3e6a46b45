//! Read-only queries over `task_instance` used by downstream tasks to pull a
//! sibling or parent's persisted output by identity, per the payload-thinning
//! rule: a task's full output lives in its own row, never embedded in a
//! dispatch message. Handlers hold a `DbPool` and call these directly rather
//! than going through the `Engine`, since they don't drive execution.

use diesel::prelude::*;
use meet_shared::clients::DbPool;
use meet_shared::{AppError, AppResult};
use serde_json::Value;
use uuid::Uuid;

use crate::models::TaskInstanceRow;
use crate::schema::task_instance;

/// The persisted output of one task, by its exact `task_ref`.
pub fn task_output(pool: &DbPool, run_id: Uuid, task_ref: &str) -> AppResult<Option<Value>> {
    let mut conn = pool.get().map_err(|e| AppError::internal(e.to_string()))?;
    let row: Option<TaskInstanceRow> = task_instance::table
        .filter(task_instance::workflow_run_id.eq(run_id))
        .filter(task_instance::task_ref.eq(task_ref))
        .select(TaskInstanceRow::as_select())
        .first(&mut conn)
        .optional()?;
    Ok(row.and_then(|r| r.output))
}

/// The persisted outputs of every dynamically-spawned child of a
/// fork-dynamic generator, in `task_ref` order (stable since children are
/// named `"{generator_ref}[0]"`, `"[1]"`, ...).
pub fn fork_outputs(pool: &DbPool, run_id: Uuid, generator_ref: &str) -> AppResult<Vec<Value>> {
    let mut conn = pool.get().map_err(|e| AppError::internal(e.to_string()))?;
    let prefix = format!("{generator_ref}[");
    let mut rows: Vec<TaskInstanceRow> = task_instance::table
        .filter(task_instance::workflow_run_id.eq(run_id))
        .filter(task_instance::task_ref.like(format!("{prefix}%")))
        .select(TaskInstanceRow::as_select())
        .load(&mut conn)?;
    rows.sort_by_key(|r| fork_index(&r.task_ref));
    Ok(rows.into_iter().filter_map(|r| r.output).collect())
}

/// Parses the numeric index out of a `"{generator_ref}[N]"` task ref for
/// sorting; non-matching refs sort last.
fn fork_index(task_ref: &str) -> usize {
    task_ref
        .rsplit_once('[')
        .and_then(|(_, rest)| rest.strip_suffix(']'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX)
}
