use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use meet_pipeline::workflow::multitrack_dag;
use meet_shared::middleware::{decode_jwt, extract_bearer_token, BEARER_SUBPROTOCOL};
use meet_shared::EventKind;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// `GET /v1/transcripts/{id}/ws` (§6, §4.9). Bearer auth rides the
/// `Sec-WebSocket-Protocol` header since browsers cannot set arbitrary
/// headers on the handshake; the server must echo `bearer` back or the
/// client drops the connection.
pub async fn transcript_ws(
    State(state): State<AppState>,
    Path(transcript_id): Path<Uuid>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, meet_shared::AppError> {
    let protocol_header = headers.get("sec-websocket-protocol").and_then(|v| v.to_str().ok());

    let token = protocol_header
        .and_then(extract_bearer_token)
        .ok_or_else(|| meet_shared::AppError::unauthorized("missing bearer subprotocol"))?;
    decode_jwt(&token)?;

    Ok(ws
        .protocols([BEARER_SUBPROTOCOL])
        .on_upgrade(move |socket| stream_transcript(socket, state, transcript_id)))
}

async fn stream_transcript(socket: WebSocket, state: AppState, transcript_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    if let Some(snapshot) = initial_snapshot(&state, transcript_id).await {
        if sender.send(Message::Text(snapshot)).await.is_err() {
            return;
        }
    }

    let channel = format!("transcript-events:{transcript_id}");
    let mut pubsub = match state.redis.subscribe(&state.config.redis_url, &channel).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, %transcript_id, "failed to subscribe to transcript event channel");
            let _ = sender.close().await;
            return;
        }
    };
    let mut messages = pubsub.on_message();

    loop {
        tokio::select! {
            msg = messages.next() => {
                let Some(msg) = msg else { break };
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

/// `GET /v1/events` (§6): a user-scoped counterpart of the per-transcript
/// stream, multiplexing every transcript event belonging to the
/// authenticated user onto one socket instead of one per transcript.
pub async fn user_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, meet_shared::AppError> {
    let protocol_header = headers.get("sec-websocket-protocol").and_then(|v| v.to_str().ok());

    let token = protocol_header
        .and_then(extract_bearer_token)
        .ok_or_else(|| meet_shared::AppError::unauthorized("missing bearer subprotocol"))?;
    let claims = decode_jwt(&token)?;

    Ok(ws
        .protocols([BEARER_SUBPROTOCOL])
        .on_upgrade(move |socket| stream_user_events(socket, state, claims.sub)))
}

async fn stream_user_events(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    let channel = format!("user-events:{user_id}");
    let mut pubsub = match state.redis.subscribe(&state.config.redis_url, &channel).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, %user_id, "failed to subscribe to user event channel");
            let _ = sender.close().await;
            return;
        }
    };
    let mut messages = pubsub.on_message();

    loop {
        tokio::select! {
            msg = messages.next() => {
                let Some(msg) = msg else { break };
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

/// Seeds a freshly connected client with the last known DAG snapshot plus
/// the transcript's current terminal fields, so it isn't starved of state
/// until the next live task transition.
async fn initial_snapshot(state: &AppState, transcript_id: Uuid) -> Option<String> {
    let pool = state.pool.clone();
    let transcript = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().ok()?;
        meet_storage::controllers::transcripts::get(&mut conn, transcript_id).ok()
    })
    .await
    .ok()??;

    let run_id = transcript.workflow_run_id.as_deref().and_then(|s| Uuid::parse_str(s).ok())?;
    let dag = multitrack_dag();
    let status = state.engine.get_status(&dag, run_id).await.ok()?;

    serde_json::to_string(&EventKind::DagStatus(status)).ok()
}
