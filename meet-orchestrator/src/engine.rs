use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use diesel::prelude::*;
use meet_shared::clients::{DbPool, RedisClient};
use meet_shared::retry::RetryPolicy;
use meet_shared::types::dag::{DagStatus, DagTask, DagTaskStatus};
use meet_shared::{AppError, AppResult, ErrorCode};
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::dag::{DagDef, Node, NodeKind};
use crate::models::{
    NewTaskInstance, NewWorkflowRun, RunStatus, TaskFinishUpdate, TaskInstanceRow, TaskStatus,
    WorkflowRunRow,
};
use crate::schema::{task_instance, workflow_run};
use crate::task::{TaskContext, TaskDef, TaskError};
use crate::worker::Registry;

/// A fork-dynamic generator's children are stored as `task_instance` rows
/// whose `task_ref` is `"{generator_ref}[{index}]"`. This lets readiness and
/// status queries treat the join edge ("depends on all children of the
/// generator") without a separate parent/child table.
fn child_prefix(generator_ref: &str) -> String {
    format!("{generator_ref}[")
}

pub struct Engine {
    pool: DbPool,
    registry: Registry,
    redis: Option<RedisClient>,
    redis_channel_prefix: String,
    concurrency: usize,
}

impl Engine {
    pub fn new(pool: DbPool, registry: Registry) -> Self {
        Self {
            pool,
            registry,
            redis: None,
            redis_channel_prefix: "transcript-events".to_string(),
            concurrency: 8,
        }
    }

    pub fn with_redis(mut self, redis: RedisClient) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Creates a workflow_run plus one queued task_instance per static DAG
    /// node. Fork-dynamic nodes get a single placeholder row for the
    /// generator itself; its children are materialized once it runs.
    pub async fn start(&self, dag: &DagDef, transcript_id: Uuid, input: Value) -> AppResult<Uuid> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        let run = NewWorkflowRun::new(dag.name.clone(), transcript_id, input.clone());
        let run_id = run.id;

        diesel::insert_into(workflow_run::table)
            .values(&run)
            .execute(&mut conn)?;

        for node in &dag.nodes {
            let row = NewTaskInstance::for_node(run_id, &node.task_ref, &node.kind, input.clone());
            diesel::insert_into(task_instance::table)
                .values(&row)
                .execute(&mut conn)?;
        }

        tracing::info!(run_id = %run_id, dag = %dag.name, "workflow run started");
        Ok(run_id)
    }

    /// Resets every task_instance for `run_id` to `queued` and clears prior
    /// output/error, for a force-replay run. The workflow_run row is set
    /// back to `running`.
    pub async fn replay(&self, run_id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;

        diesel::update(task_instance::table)
            .filter(task_instance::workflow_run_id.eq(run_id))
            .set((
                task_instance::status.eq(TaskStatus::Queued.as_str()),
                task_instance::attempt.eq(0),
                task_instance::output.eq(None::<Value>),
                task_instance::error.eq(None::<String>),
                task_instance::started_at.eq(None::<chrono::DateTime<Utc>>),
                task_instance::finished_at.eq(None::<chrono::DateTime<Utc>>),
            ))
            .execute(&mut conn)?;

        diesel::update(workflow_run::table)
            .filter(workflow_run::id.eq(run_id))
            .set((
                workflow_run::status.eq(RunStatus::Running.as_str()),
                workflow_run::finished_at.eq(None::<chrono::DateTime<Utc>>),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    pub async fn cancel(&self, run_id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;

        diesel::update(task_instance::table)
            .filter(task_instance::workflow_run_id.eq(run_id))
            .filter(task_instance::status.eq_any([TaskStatus::Queued.as_str(), TaskStatus::Running.as_str()]))
            .set((
                task_instance::status.eq(TaskStatus::Cancelled.as_str()),
                task_instance::finished_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        diesel::update(workflow_run::table)
            .filter(workflow_run::id.eq(run_id))
            .set((
                workflow_run::status.eq(RunStatus::Cancelled.as_str()),
                workflow_run::finished_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    /// Drives `run_id` to completion: repeatedly finds tasks whose parents
    /// are all satisfied, dispatches them (bounded by `concurrency`), applies
    /// retry/timeout policy, expands fork-dynamic generators into child rows,
    /// and broadcasts a DAG status snapshot after each state change.
    pub async fn run(&self, dag: &DagDef, run_id: Uuid) -> AppResult<RunStatus> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        loop {
            let rows = self.load_tasks(run_id)?;

            if rows.iter().any(|r| r.status() == TaskStatus::Failed) {
                self.finish_run(run_id, RunStatus::Failed).await?;
                return Ok(RunStatus::Failed);
            }

            if self.all_terminal_success(dag, &rows) {
                self.finish_run(run_id, RunStatus::Completed).await?;
                return Ok(RunStatus::Completed);
            }

            let ready = self.ready_tasks(dag, &rows);
            if ready.is_empty() {
                if rows.iter().all(|r| r.status() != TaskStatus::Running) {
                    // Nothing ready, nothing running, not complete: a cycle or
                    // unmet dependency. Treat as a stuck failure rather than spin.
                    self.finish_run(run_id, RunStatus::Failed).await?;
                    return Ok(RunStatus::Failed);
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                continue;
            }

            let mut handles = Vec::new();
            for row in ready {
                let permit = semaphore.clone().acquire_owned().await.map_err(|e| AppError::internal(e.to_string()))?;
                let engine = self.clone_handles();
                let dag = dag.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    engine.execute_one(&dag, run_id, row).await
                }));
            }

            for handle in handles {
                handle.await.map_err(|e| AppError::internal(e.to_string()))??;
            }

            self.broadcast_status(dag, run_id).await;
        }
    }

    fn clone_handles(&self) -> EngineHandles {
        EngineHandles {
            pool: self.pool.clone(),
            registry: self.registry.clone(),
        }
    }

    fn load_tasks(&self, run_id: Uuid) -> AppResult<Vec<TaskInstanceRow>> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        let rows = task_instance::table
            .filter(task_instance::workflow_run_id.eq(run_id))
            .select(TaskInstanceRow::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn all_terminal_success(&self, dag: &DagDef, rows: &[TaskInstanceRow]) -> bool {
        dag.nodes.iter().all(|n| {
            rows.iter()
                .find(|r| r.task_ref == n.task_ref)
                .map(|r| r.status() == TaskStatus::Completed)
                .unwrap_or(false)
        })
    }

    fn parent_satisfied(&self, dag: &DagDef, rows: &[TaskInstanceRow], parent_ref: &str) -> bool {
        let parent_row = rows.iter().find(|r| r.task_ref == parent_ref);
        let Some(parent_row) = parent_row else { return false };
        if parent_row.status() != TaskStatus::Completed {
            return false;
        }

        let is_fork = matches!(
            dag.node(parent_ref).map(|n| &n.kind),
            Some(NodeKind::ForkDynamic { .. })
        );
        if !is_fork {
            return true;
        }

        let prefix = child_prefix(parent_ref);
        let children: Vec<_> = rows.iter().filter(|r| r.task_ref.starts_with(&prefix)).collect();
        children.iter().all(|c| c.status() == TaskStatus::Completed)
    }

    fn ready_tasks(&self, dag: &DagDef, rows: &[TaskInstanceRow]) -> Vec<TaskInstanceRow> {
        let mut out = Vec::new();
        for node in &dag.nodes {
            let row = match rows.iter().find(|r| r.task_ref == node.task_ref) {
                Some(r) => r,
                None => continue,
            };
            if row.status() != TaskStatus::Queued {
                continue;
            }
            if node.parents.iter().all(|p| self.parent_satisfied(dag, rows, p)) {
                out.push(row.clone());
            }
        }

        // Dynamically-spawned children of a completed fork are also eligible
        // once queued; the generator row itself isn't their DAG parent entry
        // so they're not covered by the loop above.
        for row in rows {
            if row.status() == TaskStatus::Queued && dag.node(&row.task_ref).is_none() {
                out.push(row.clone());
            }
        }

        out
    }

    async fn finish_run(&self, run_id: Uuid, status: RunStatus) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        diesel::update(workflow_run::table)
            .filter(workflow_run::id.eq(run_id))
            .set((
                workflow_run::status.eq(status.as_str()),
                workflow_run::finished_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    pub async fn get_run(&self, run_id: Uuid) -> AppResult<WorkflowRunRow> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        workflow_run::table
            .filter(workflow_run::id.eq(run_id))
            .select(WorkflowRunRow::as_select())
            .first(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::new(ErrorCode::WorkflowNotFound, "workflow run not found"),
                other => other.into(),
            })
    }

    /// Builds the structured status snapshot served by `GET
    /// /transcripts/:id/status` and broadcast over the `DAG_STATUS` event.
    pub async fn get_status(&self, dag: &DagDef, run_id: Uuid) -> AppResult<DagStatus> {
        let run = self.get_run(run_id).await?;
        let rows = self.load_tasks(run_id)?;
        Ok(self.build_status(dag, &run, &rows))
    }

    fn build_status(&self, dag: &DagDef, run: &WorkflowRunRow, rows: &[TaskInstanceRow]) -> DagStatus {
        let order = dag.topo_order();
        let mut tasks = Vec::new();

        for task_ref in &order {
            let node = dag.node(task_ref).expect("topo order only contains dag nodes");
            let row = rows.iter().find(|r| &r.task_ref == task_ref);

            let (status, started_at, finished_at, error) = match row {
                Some(r) => (
                    map_status(r.status()),
                    r.started_at,
                    r.finished_at,
                    r.error.clone(),
                ),
                None => (DagTaskStatus::Queued, None, None, None),
            };

            let duration_seconds = match (started_at, finished_at) {
                (Some(s), Some(f)) => Some((f - s).num_milliseconds() as f64 / 1000.0),
                _ => None,
            };

            let (children_total, children_completed) = if matches!(node.kind, NodeKind::ForkDynamic { .. }) {
                let prefix = child_prefix(task_ref);
                let children: Vec<_> = rows.iter().filter(|r| r.task_ref.starts_with(&prefix)).collect();
                let completed = children.iter().filter(|c| c.status() == TaskStatus::Completed).count();
                (children.len() as u32, completed as u32)
            } else {
                (0, 0)
            };

            tasks.push(DagTask {
                name: task_ref.clone(),
                status,
                started_at,
                finished_at,
                duration_seconds,
                parents: node.parents.clone(),
                error,
                children_total,
                children_completed,
            });
        }

        DagStatus {
            workflow_run_id: run.id.to_string(),
            transcript_id: run.transcript_id,
            tasks,
        }
    }

    /// Fire-and-forget publish of the current DAG snapshot. Failures are
    /// logged, never propagated: a broken broadcast must not fail the run.
    async fn broadcast_status(&self, dag: &DagDef, run_id: Uuid) {
        let Some(redis) = &self.redis else { return };

        let status = match self.get_status(dag, run_id).await {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(run_id = %run_id, error = %err, "failed to build dag status for broadcast");
                return;
            }
        };

        let payload = match serde_json::to_string(&status) {
            Ok(p) => p,
            Err(_) => return,
        };

        let channel = format!("{}:{}", self.redis_channel_prefix, status.transcript_id);
        if let Err(err) = redis.publish(&channel, &payload).await {
            tracing::warn!(run_id = %run_id, error = %err, "failed to broadcast dag status");
        }
    }
}

/// Resolves the `TaskDef` governing one task instance: the node's own def
/// for a static task, the generator's `child_task_def` for a dynamically
/// spawned child (whose `task_ref` isn't in `dag.nodes` at all), or a
/// conservative fallback if neither is found (e.g. a stale run from a
/// retired DAG shape).
fn task_policy(dag: &DagDef, task_ref: &str) -> TaskDef {
    if let Some(node) = dag.node(task_ref) {
        return match &node.kind {
            NodeKind::Task(def) => def.clone(),
            NodeKind::ForkDynamic { .. } => TaskDef::new(task_ref, 60, 30, 3),
        };
    }

    if let Some(idx) = task_ref.rfind('[') {
        let generator_ref = &task_ref[..idx];
        if let Some(Node { kind: NodeKind::ForkDynamic { child_task_def }, .. }) = dag.node(generator_ref) {
            return child_task_def.clone();
        }
    }

    TaskDef::new(task_ref, 300, 150, 3)
}

/// The webhook task's backoff is deliberately much longer-tailed than every
/// other task's (§4.11's retry table singles it out: up to 30 attempts,
/// capped at an hour between them).
fn backoff_policy(task_name: &str) -> RetryPolicy {
    if task_name == "webhook" {
        RetryPolicy::webhook()
    } else {
        RetryPolicy::default()
    }
}

fn map_status(status: TaskStatus) -> DagTaskStatus {
    match status {
        TaskStatus::Queued => DagTaskStatus::Queued,
        TaskStatus::Running => DagTaskStatus::Running,
        TaskStatus::Completed => DagTaskStatus::Completed,
        TaskStatus::Failed => DagTaskStatus::Failed,
        TaskStatus::Cancelled => DagTaskStatus::Cancelled,
    }
}

/// The subset of `Engine` state needed inside a spawned task execution,
/// cloned per dispatch so `run`'s loop doesn't hold `&self` across `.await`.
#[derive(Clone)]
struct EngineHandles {
    pool: DbPool,
    registry: Registry,
}

impl EngineHandles {
    async fn execute_one(&self, dag: &DagDef, run_id: Uuid, row: TaskInstanceRow) -> AppResult<()> {
        self.mark_running(&row)?;

        let node = dag.node(&row.task_ref);
        let ctx = TaskContext {
            run_id: run_id.to_string(),
            task_ref: row.task_ref.clone(),
            attempt: row.attempt as u32 + 1,
            input: row.input.clone(),
        };

        if matches!(node.map(|n| &n.kind), Some(NodeKind::ForkDynamic { .. })) {
            self.run_generator(dag, run_id, &row, &ctx).await
        } else {
            self.run_handler(dag, &row, &ctx).await
        }
    }

    fn mark_running(&self, row: &TaskInstanceRow) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        diesel::update(task_instance::table)
            .filter(task_instance::id.eq(row.id))
            .set((
                task_instance::status.eq(TaskStatus::Running.as_str()),
                task_instance::started_at.eq(row.started_at.or(Some(Utc::now()))),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    async fn run_handler(&self, dag: &DagDef, row: &TaskInstanceRow, ctx: &TaskContext) -> AppResult<()> {
        let Some(handler) = self.registry.handler(&row.task_name) else {
            self.finish_task(row, TaskFinishUpdate::failure(
                &TaskError::Permanent(format!("no handler registered for {}", row.task_name)),
                true,
            ))?;
            return Ok(());
        };

        let def = task_policy(dag, &row.task_ref);
        let mut policy = backoff_policy(&row.task_name);
        policy.max_attempts = def.max_retries;
        let result = tokio::time::timeout(def.timeout, handler.run(ctx)).await;

        match result {
            Ok(Ok(output)) => self.finish_task(row, TaskFinishUpdate::success(output))?,
            Ok(Err(err)) => self.handle_failure(row, err, &policy).await?,
            Err(_) => self.handle_failure(row, TaskError::Transient("task timed out".into()), &policy).await?,
        }

        Ok(())
    }

    async fn run_generator(&self, dag: &DagDef, run_id: Uuid, row: &TaskInstanceRow, ctx: &TaskContext) -> AppResult<()> {
        let Some(generator) = self.registry.generator(&row.task_name) else {
            self.finish_task(row, TaskFinishUpdate::failure(
                &TaskError::Permanent(format!("no generator registered for {}", row.task_name)),
                true,
            ))?;
            return Ok(());
        };

        let def = task_policy(dag, &row.task_ref);
        let mut policy = backoff_policy(&row.task_name);
        policy.max_attempts = def.max_retries;

        match generator.generate(ctx).await {
            Ok(plan) => {
                let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
                for (task_ref, input) in plan.task_refs.iter().zip(plan.inputs.into_iter()) {
                    let child = NewTaskInstance {
                        id: Uuid::new_v4(),
                        workflow_run_id: run_id,
                        task_ref: task_ref.clone(),
                        task_name: plan.child_task_name.clone(),
                        status: TaskStatus::Queued.as_str().to_string(),
                        attempt: 0,
                        input,
                    };
                    diesel::insert_into(task_instance::table)
                        .values(&child)
                        .execute(&mut conn)?;
                }
                drop(conn);
                self.finish_task(row, TaskFinishUpdate::success(serde_json::json!({
                    "spawned": plan.task_refs.len(),
                })))?;
            }
            Err(err) => self.handle_failure(row, err, &policy).await?,
        }

        Ok(())
    }

    async fn handle_failure(&self, row: &TaskInstanceRow, err: TaskError, policy: &RetryPolicy) -> AppResult<()> {
        let next_attempt = row.attempt + 1;
        let terminal = !err.is_retryable() || next_attempt as u32 >= policy.max_attempts;

        if terminal {
            self.finish_task(row, TaskFinishUpdate::failure(&err, true))?;
        } else {
            tokio::time::sleep(policy.delay_for(row.attempt as u32)).await;
            let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
            diesel::update(task_instance::table)
                .filter(task_instance::id.eq(row.id))
                .set((
                    task_instance::status.eq(TaskStatus::Queued.as_str()),
                    task_instance::attempt.eq(next_attempt),
                    task_instance::error.eq(Some(err.message().to_string())),
                ))
                .execute(&mut conn)?;
        }
        Ok(())
    }

    fn finish_task(&self, row: &TaskInstanceRow, update: TaskFinishUpdate) -> AppResult<()> {
        let mut conn = self.pool.get().map_err(|e| AppError::internal(e.to_string()))?;
        diesel::update(task_instance::table)
            .filter(task_instance::id.eq(row.id))
            .set(&update)
            .execute(&mut conn)?;
        Ok(())
    }
}
