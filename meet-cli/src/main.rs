//! Operator CLI (§6). One subcommand per common operation.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use diesel::prelude::*;
use meet_orchestrator::schema::workflow_run::dsl as wr;
use meet_orchestrator::{Engine, Registry, RunStatus, WorkflowRunRow};
use meet_pipeline::tasks::WorkflowInput;
use meet_pipeline::workflow::multitrack_dag;
use meet_shared::clients::create_pool;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "meet-cli")]
#[command(about = "Operator tooling for the meeting pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch (or replay) the post-processing workflow for a transcript.
    ProcessTranscript {
        transcript_id: Uuid,
        /// Wait for the workflow to reach a terminal state before exiting.
        #[arg(long)]
        sync: bool,
        /// Cancel any in-flight run for this transcript and start a fresh one.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    meet_shared::middleware::init_tracing("meet-cli");
    let cli = Cli::parse();

    let pool = create_pool(&cli.database_url);
    let engine = Engine::new(pool.clone(), Registry::new());

    match cli.command {
        Commands::ProcessTranscript { transcript_id, sync, force } => {
            process_transcript(&engine, &pool, transcript_id, sync, force).await
        }
    }
}

fn latest_run(
    pool: &meet_shared::clients::DbPool,
    transcript_id: Uuid,
) -> anyhow::Result<Option<WorkflowRunRow>> {
    let mut conn = pool.get()?;
    let row = wr::workflow_run
        .filter(wr::transcript_id.eq(transcript_id))
        .order(wr::created_at.desc())
        .first::<WorkflowRunRow>(&mut conn)
        .optional()?;
    Ok(row)
}

async fn process_transcript(
    engine: &Engine,
    pool: &meet_shared::clients::DbPool,
    transcript_id: Uuid,
    sync: bool,
    force: bool,
) -> ExitCode {
    let mut conn = match pool.get() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to connect to database: {e}");
            return ExitCode::FAILURE;
        }
    };

    let transcript = match meet_storage::controllers::transcripts::get(&mut conn, transcript_id) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: transcript {transcript_id} not found: {e}");
            return ExitCode::FAILURE;
        }
    };
    drop(conn);

    eprintln!("Found transcript: {}", if transcript.title.is_empty() { transcript_id.to_string() } else { transcript.title.clone() });
    eprintln!("  Status: {}", transcript.status);

    let Some(recording_id) = transcript.recording_id else {
        eprintln!("Error: transcript has no associated recording");
        return ExitCode::FAILURE;
    };

    let existing = match latest_run(pool, transcript_id) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: failed to look up prior workflow runs: {e}");
            return ExitCode::FAILURE;
        }
    };

    let dag = multitrack_dag();

    let run_id = match (&existing, force) {
        (Some(run), true) => {
            if run.status() == RunStatus::Running {
                eprintln!("Force-replay: cancelling in-flight run {}", run.id);
                if let Err(e) = engine.cancel(run.id).await {
                    eprintln!("Error: failed to cancel prior run: {e}");
                    return ExitCode::FAILURE;
                }
            }
            let input = serde_json::to_value(WorkflowInput { transcript_id, recording_id }).expect("WorkflowInput always serializes");
            match engine.start(&dag, transcript_id, input).await {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("Error: failed to start workflow: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        (Some(run), false) if run.status() == RunStatus::Running => {
            eprintln!("Error: workflow run {} is already in progress for this transcript", run.id);
            return ExitCode::FAILURE;
        }
        (Some(run), false) if run.status() == RunStatus::Failed => {
            eprintln!("Replaying failed run {}", run.id);
            if let Err(e) = engine.replay(run.id).await {
                eprintln!("Error: failed to replay run: {e}");
                return ExitCode::FAILURE;
            }
            run.id
        }
        _ => {
            eprintln!("Dispatching multitrack pipeline");
            let input = serde_json::to_value(WorkflowInput { transcript_id, recording_id }).expect("WorkflowInput always serializes");
            match engine.start(&dag, transcript_id, input).await {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("Error: failed to start workflow: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    eprintln!("Workflow run: {run_id}");

    if !sync {
        return ExitCode::SUCCESS;
    }

    loop {
        match engine.get_run(run_id).await {
            Ok(run) => match run.status() {
                RunStatus::Completed => {
                    eprintln!("Workflow completed");
                    return ExitCode::SUCCESS;
                }
                RunStatus::Failed => {
                    eprintln!("Workflow failed");
                    return ExitCode::FAILURE;
                }
                RunStatus::Cancelled => {
                    eprintln!("Workflow cancelled");
                    return ExitCode::FAILURE;
                }
                RunStatus::Running => {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            },
            Err(e) => {
                eprintln!("Error: failed to poll workflow run: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
