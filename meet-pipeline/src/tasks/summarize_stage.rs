//! Title & summary generators (C8): three independent LLM calls over the
//! aggregated topic list, plus `finalize`, which commits them to the
//! transcript row and flips `status` to `ended`.

use std::time::Duration;

use async_trait::async_trait;
use meet_orchestrator::{TaskContext, TaskError, TaskHandler, TaskOutput};
use serde::Deserialize;

use super::intake::RecordingInfo;
use super::{db_conn, db_err, load_sibling_output, to_output, WorkflowInput};
use crate::ctx::PipelineCtx;
use crate::llm::LlmClient;

const MAX_RETRIES: u32 = 3;

/// Shared degrade-on-exhaustion loop (§4.8): an empty string is a valid
/// result, never a task failure, so `finalize` is never blocked by a flaky
/// LLM backend.
async fn complete_degrading(llm: &dyn LlmClient, system: &str, prompt: &str, timeout: Duration) -> String {
    for attempt in 0..MAX_RETRIES {
        match llm.complete(system, prompt, timeout).await {
            Ok(text) => return text.trim().to_string(),
            Err(e) if attempt + 1 == MAX_RETRIES => {
                tracing::warn!(error = %e, "summary generation exhausted retries, defaulting to empty string");
            }
            Err(_) => continue,
        }
    }
    String::new()
}

fn render_topics(topics: &[meet_shared::Topic], titles_only: bool) -> String {
    topics
        .iter()
        .map(|t| if titles_only { t.title.clone() } else { format!("{}: {}", t.title, t.summary) })
        .collect::<Vec<_>>()
        .join("\n")
}

fn load_topics(conn: &mut diesel::PgConnection, transcript_id: uuid::Uuid) -> Result<Vec<meet_shared::Topic>, TaskError> {
    let row = meet_storage::controllers::transcripts::get(conn, transcript_id).map_err(db_err)?;
    Ok(row.topics())
}

pub struct TitleTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for TitleTask {
    fn task_name(&self) -> &str {
        "title"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = super::run_uuid(ctx)?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;

        let mut conn = db_conn(&self.ctx.pool)?;
        let topics = load_topics(&mut conn, input.transcript_id)?;
        drop(conn);

        let system = "You produce a concise meeting title from a list of its topic titles. \
            Respond with the title text only, no quotes or punctuation wrapper.";
        let prompt = format!("Language: {}\n\nTopics:\n{}", recording.target_language, render_topics(&topics, true));
        let title = complete_degrading(self.ctx.llm.as_ref(), system, &prompt, Duration::from_secs(60)).await;

        let mut conn = db_conn(&self.ctx.pool)?;
        super::append_event(&mut conn, input.transcript_id, meet_shared::EventKind::FinalTitle { title: title.clone() });

        to_output(serde_json::json!({ "title": title }))
    }
}

pub struct LongSummaryTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for LongSummaryTask {
    fn task_name(&self) -> &str {
        "long_summary"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = super::run_uuid(ctx)?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;

        let mut conn = db_conn(&self.ctx.pool)?;
        let topics = load_topics(&mut conn, input.transcript_id)?;
        drop(conn);

        let system = "You write a detailed multi-paragraph meeting summary from its topics, \
            covering what was discussed and any decisions made.";
        let prompt = format!("Language: {}\n\nTopics:\n{}", recording.target_language, render_topics(&topics, false));
        let summary = complete_degrading(self.ctx.llm.as_ref(), system, &prompt, Duration::from_secs(300)).await;

        let mut conn = db_conn(&self.ctx.pool)?;
        super::append_event(
            &mut conn,
            input.transcript_id,
            meet_shared::EventKind::FinalLongSummary { summary: summary.clone() },
        );

        to_output(serde_json::json!({ "summary": summary }))
    }
}

pub struct ShortSummaryTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for ShortSummaryTask {
    fn task_name(&self) -> &str {
        "short_summary"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = super::run_uuid(ctx)?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;

        let mut conn = db_conn(&self.ctx.pool)?;
        let topics = load_topics(&mut conn, input.transcript_id)?;
        drop(conn);

        let system = "You write a compact single-paragraph recap of a meeting from its topics.";
        let prompt = format!("Language: {}\n\nTopics:\n{}", recording.target_language, render_topics(&topics, false));
        let summary = complete_degrading(self.ctx.llm.as_ref(), system, &prompt, Duration::from_secs(60)).await;

        let mut conn = db_conn(&self.ctx.pool)?;
        super::append_event(
            &mut conn,
            input.transcript_id,
            meet_shared::EventKind::FinalShortSummary { summary: summary.clone() },
        );

        to_output(serde_json::json!({ "summary": summary }))
    }
}

#[derive(Debug, Deserialize)]
struct TitleOutput {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary: String,
}

pub struct FinalizeTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for FinalizeTask {
    fn task_name(&self) -> &str {
        "finalize"
    }

    /// Never fails: every input defaults to empty per §4.8, so the
    /// transcript always reaches `status=ended`, degraded or not.
    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = super::run_uuid(ctx)?;

        let title: TitleOutput = load_sibling_output(&self.ctx.pool, run_id, "title")?;
        let long_summary: SummaryOutput = load_sibling_output(&self.ctx.pool, run_id, "long_summary")?;
        let short_summary: SummaryOutput = load_sibling_output(&self.ctx.pool, run_id, "short_summary")?;

        let mut conn = db_conn(&self.ctx.pool)?;
        meet_storage::controllers::transcripts::finalize(
            &mut conn,
            input.transcript_id,
            title.title,
            short_summary.summary,
            long_summary.summary,
        )
        .map_err(db_err)?;

        to_output(serde_json::json!({ "status": "ended" }))
    }
}
