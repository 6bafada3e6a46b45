//! Topic segmentation (C7): `detect_topics` chunks the merged word stream,
//! `topic_summary` fans out one LLM call per chunk, and `aggregate_topics`
//! merges the results into the transcript's final topic list.

use async_trait::async_trait;
use meet_orchestrator::{ForkGenerator, ForkPlan, TaskContext, TaskError, TaskHandler, TaskOutput};
use meet_shared::{Topic, Word};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intake::RecordingInfo;
use super::transcribe_stage::MergedWords;
use super::{db_conn, db_err, load_fork_outputs, load_sibling_output, run_uuid, to_output, WorkflowInput};
use crate::ctx::PipelineCtx;
use crate::topics::{aggregate_topics, chunk_words, summarize_chunk};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkedWords {
    pub chunks: Vec<Vec<Word>>,
}

pub struct DetectTopicsTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for DetectTopicsTask {
    fn task_name(&self) -> &str {
        "detect_topics"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let _input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;
        let merged: MergedWords = load_sibling_output(&self.ctx.pool, run_id, "merge_words")?;

        let chunks = chunk_words(&merged.words);
        to_output(ChunkedWords { chunks })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicSummaryInput {
    chunk_index: usize,
    transcript_id: Uuid,
}

pub struct TopicSummaryGenerator {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl ForkGenerator for TopicSummaryGenerator {
    fn task_name(&self) -> &str {
        "topic_summary"
    }

    async fn generate(&self, ctx: &TaskContext) -> Result<ForkPlan, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;
        let chunked: ChunkedWords = load_sibling_output(&self.ctx.pool, run_id, "detect_topics")?;

        let mut task_refs = Vec::with_capacity(chunked.chunks.len());
        let mut inputs = Vec::with_capacity(chunked.chunks.len());
        for i in 0..chunked.chunks.len() {
            task_refs.push(format!("topic_summary[{i}]"));
            inputs.push(to_output(TopicSummaryInput { chunk_index: i, transcript_id: input.transcript_id })?);
        }

        Ok(ForkPlan { task_refs, child_task_name: "topic_summary".to_string(), inputs })
    }
}

pub struct TopicSummaryTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for TopicSummaryTask {
    fn task_name(&self) -> &str {
        "topic_summary"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: TopicSummaryInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;

        let chunked: ChunkedWords = load_sibling_output(&self.ctx.pool, run_id, "detect_topics")?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;
        let chunk = chunked
            .chunks
            .get(input.chunk_index)
            .cloned()
            .ok_or_else(|| TaskError::Permanent(format!("chunk {} out of range", input.chunk_index)))?;

        let topic = summarize_chunk(self.ctx.llm.as_ref(), chunk, &recording.target_language)
            .await
            .ok_or_else(|| TaskError::Permanent("chunk produced no topic".into()))?;

        to_output(topic)
    }
}

pub struct AggregateTopicsTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for AggregateTopicsTask {
    fn task_name(&self) -> &str {
        "aggregate_topics"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;

        let topics: Vec<Topic> = load_fork_outputs(&self.ctx.pool, run_id, "topic_summary")?;
        let merged = aggregate_topics(topics);

        let mut conn = db_conn(&self.ctx.pool)?;
        let row = meet_storage::controllers::transcripts::get(&mut conn, input.transcript_id).map_err(db_err)?;
        meet_storage::controllers::transcripts::update_topics(&mut conn, input.transcript_id, &merged, &row.participants())
            .map_err(db_err)?;

        for topic in &merged {
            super::append_event(&mut conn, input.transcript_id, meet_shared::EventKind::Topic(topic.clone()));
        }

        to_output(serde_json::json!({ "topic_count": merged.len() }))
    }
}
