//! ASR (C5) and the word merger (C6). `transcribe_track` runs against each
//! track's already-padded audio rather than the raw upload: the padded
//! object's sample 0 is meeting t=0, so the words ASR returns need no
//! further timestamp shift before merging.

use async_trait::async_trait;
use meet_orchestrator::{ForkGenerator, ForkPlan, TaskContext, TaskError, TaskHandler, TaskOutput};
use meet_shared::Word;
use serde::{Deserialize, Serialize};

use super::audio_stage::PadTrackOutput;
use super::intake::RecordingInfo;
use super::{load_fork_outputs, load_sibling_output, run_uuid, to_output, WorkflowInput};
use crate::asr::tag_track_words;
use crate::ctx::PipelineCtx;
use crate::merger::merge_tracks;

#[derive(Debug, Serialize, Deserialize)]
struct TranscribeTrackInput {
    track_index: usize,
    audio_url: String,
    language: String,
}

pub struct TranscribeTrackGenerator {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl ForkGenerator for TranscribeTrackGenerator {
    fn task_name(&self) -> &str {
        "transcribe_track"
    }

    async fn generate(&self, ctx: &TaskContext) -> Result<ForkPlan, TaskError> {
        let _input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;

        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;
        let mut padded: Vec<PadTrackOutput> = load_fork_outputs(&self.ctx.pool, run_id, "pad_track")?;
        padded.sort_by_key(|t| t.track_index);

        let mut task_refs = Vec::with_capacity(padded.len());
        let mut inputs = Vec::with_capacity(padded.len());
        for track in padded {
            task_refs.push(format!("transcribe_track[{}]", track.track_index));
            inputs.push(to_output(TranscribeTrackInput {
                track_index: track.track_index,
                audio_url: track.url,
                language: recording.source_language.clone(),
            })?);
        }

        Ok(ForkPlan { task_refs, child_task_name: "transcribe_track".to_string(), inputs })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeTrackOutput {
    pub track_index: usize,
    pub words: Vec<Word>,
}

pub struct TranscribeTrackTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for TranscribeTrackTask {
    fn task_name(&self) -> &str {
        "transcribe_track"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: TranscribeTrackInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let raw = self.ctx.asr.transcribe(&input.audio_url, &input.language).await?;
        let words = tag_track_words(raw, input.track_index as i32);
        to_output(TranscribeTrackOutput { track_index: input.track_index, words })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MergedWords {
    pub words: Vec<Word>,
    pub word_count: usize,
}

pub struct MergeWordsTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for MergeWordsTask {
    fn task_name(&self) -> &str {
        "merge_words"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let _input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;

        let mut per_track: Vec<TranscribeTrackOutput> = load_fork_outputs(&self.ctx.pool, run_id, "transcribe_track")?;
        per_track.sort_by_key(|t| t.track_index);
        let tracks: Vec<Vec<Word>> = per_track.into_iter().map(|t| t.words).collect();

        let words = merge_tracks(tracks);
        let word_count = words.len();
        to_output(MergedWords { words, word_count })
    }
}
