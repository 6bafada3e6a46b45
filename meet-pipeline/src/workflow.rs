//! The multitrack post-processing DAG shape (§4.11) and the task registry
//! that binds each node's `task_name` to its concrete handler.
//!
//! Two deliberate deviations from the diagram's literal edges:
//! - `transcribe_track` forks off `pad_track`'s output rather than
//!   `get_participants`: ASR needs to run against the padded (offset-
//!   corrected) track audio so the word timestamps it returns are already
//!   meeting-relative, with no separate shift step downstream. The cost is
//!   some lost overlap between padding and transcription.
//! - the `detect_topics` fan-out is a real DAG fork (`topic_summary`) rather
//!   than an in-process concurrent loop, so a crash mid-segmentation loses
//!   at most one chunk instead of the whole topic list. `aggregate_topics`
//!   sits between the fork and the title/summary triplet to merge it back
//!   into one ordered list.

use std::sync::Arc;

use meet_orchestrator::{DagBuilder, DagDef, Registry, TaskDef};

use crate::ctx::PipelineCtx;
use crate::tasks::{
    AggregateTopicsTask, ChatPostTask, ConsentCleanupTask, DetectTopicsTask, FinalizeTask, GetParticipantsTask,
    GetRecordingTask, LongSummaryTask, MergeWordsTask, MixdownTask, PadTrackGenerator, PadTrackTask, ShortSummaryTask,
    TitleTask, TopicSummaryGenerator, TopicSummaryTask, TranscribeTrackGenerator, TranscribeTrackTask, WaveformTask,
    WebhookTask,
};

pub const WORKFLOW_NAME: &str = "multitrack_transcript";

pub fn multitrack_dag() -> DagDef {
    DagBuilder::new(WORKFLOW_NAME)
        .task("get_recording", TaskDef::new("get_recording", 60, 30, 3), &[])
        .task("get_participants", TaskDef::new("get_participants", 60, 30, 3), &["get_recording"])
        .fork_dynamic("pad_track", TaskDef::new("pad_track", 300, 120, 3), &["get_recording"])
        .task("mixdown", TaskDef::new("mixdown", 600, 300, 3), &["pad_track"])
        .task("waveform", TaskDef::new("waveform", 120, 60, 3), &["mixdown"])
        .fork_dynamic("transcribe_track", TaskDef::new("transcribe_track", 1800, 900, 3), &["pad_track"])
        .task("merge_words", TaskDef::new("merge_words", 60, 30, 3), &["transcribe_track"])
        .task("detect_topics", TaskDef::new("detect_topics", 300, 120, 3), &["merge_words"])
        .fork_dynamic("topic_summary", TaskDef::new("topic_summary", 120, 60, 3), &["detect_topics"])
        .task("aggregate_topics", TaskDef::new("aggregate_topics", 60, 30, 3), &["topic_summary"])
        .task("title", TaskDef::new("title", 60, 30, 3), &["aggregate_topics"])
        .task("long_summary", TaskDef::new("long_summary", 300, 120, 3), &["aggregate_topics"])
        .task("short_summary", TaskDef::new("short_summary", 60, 30, 3), &["aggregate_topics"])
        .task("finalize", TaskDef::new("finalize", 60, 30, 5), &["title", "long_summary", "short_summary", "waveform"])
        .task("consent_cleanup", TaskDef::new("consent_cleanup", 60, 30, 5), &["finalize", "get_participants"])
        .task("chat_post", TaskDef::new("chat_post", 60, 30, 5), &["consent_cleanup"])
        .task("webhook", TaskDef::new("webhook", 60, 30, 30), &["consent_cleanup"])
        .build()
}

/// Binds every node above to its concrete `meet-pipeline` implementation.
/// Called once at `meet-worker` startup with the process's shared `PipelineCtx`.
pub fn build_registry(ctx: PipelineCtx) -> Registry {
    Registry::new()
        .register_handler("get_recording", Arc::new(GetRecordingTask { ctx: ctx.clone() }))
        .register_handler("get_participants", Arc::new(GetParticipantsTask { ctx: ctx.clone() }))
        .register_generator("pad_track", Arc::new(PadTrackGenerator { ctx: ctx.clone() }))
        .register_handler("pad_track", Arc::new(PadTrackTask { ctx: ctx.clone() }))
        .register_handler("mixdown", Arc::new(MixdownTask { ctx: ctx.clone() }))
        .register_handler("waveform", Arc::new(WaveformTask { ctx: ctx.clone() }))
        .register_generator("transcribe_track", Arc::new(TranscribeTrackGenerator { ctx: ctx.clone() }))
        .register_handler("transcribe_track", Arc::new(TranscribeTrackTask { ctx: ctx.clone() }))
        .register_handler("merge_words", Arc::new(MergeWordsTask { ctx: ctx.clone() }))
        .register_handler("detect_topics", Arc::new(DetectTopicsTask { ctx: ctx.clone() }))
        .register_generator("topic_summary", Arc::new(TopicSummaryGenerator { ctx: ctx.clone() }))
        .register_handler("topic_summary", Arc::new(TopicSummaryTask { ctx: ctx.clone() }))
        .register_handler("aggregate_topics", Arc::new(AggregateTopicsTask { ctx: ctx.clone() }))
        .register_handler("title", Arc::new(TitleTask { ctx: ctx.clone() }))
        .register_handler("long_summary", Arc::new(LongSummaryTask { ctx: ctx.clone() }))
        .register_handler("short_summary", Arc::new(ShortSummaryTask { ctx: ctx.clone() }))
        .register_handler("finalize", Arc::new(FinalizeTask { ctx: ctx.clone() }))
        .register_handler("consent_cleanup", Arc::new(ConsentCleanupTask { ctx: ctx.clone() }))
        .register_handler("chat_post", Arc::new(ChatPostTask { ctx: ctx.clone() }))
        .register_handler("webhook", Arc::new(WebhookTask { ctx }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_order_respects_fork_dependencies() {
        let dag = multitrack_dag();
        let order = dag.topo_order();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();

        assert!(pos("get_recording") < pos("pad_track"));
        assert!(pos("pad_track") < pos("transcribe_track"));
        assert!(pos("transcribe_track") < pos("merge_words"));
        assert!(pos("detect_topics") < pos("topic_summary"));
        assert!(pos("topic_summary") < pos("aggregate_topics"));
        assert!(pos("aggregate_topics") < pos("title"));
        assert!(pos("finalize") < pos("consent_cleanup"));
        assert!(pos("consent_cleanup") < pos("webhook"));
    }

    #[test]
    fn dag_has_one_node_per_task_name() {
        let dag = multitrack_dag();
        assert_eq!(dag.nodes.len(), 17);
        assert!(dag.node("webhook").is_some());
        assert!(dag.node("topic_summary").is_some());
    }
}
