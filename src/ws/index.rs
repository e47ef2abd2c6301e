//! WebSocket endpoint bridging sockets to session tasks.
//!
//! Each socket is identified by `session_id` + `participant_id` query
//! parameters. Incoming frames become session commands; hub events stream
//! back out. Errors from a command go to this socket only.

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::{handle, Message};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::GameError;
use crate::game::session::{Command, Reply};
use crate::protocol::{ClientMsg, ServerMsg};
use crate::registry::{self, Registry};

fn query_uuid(query: &str, key: &str) -> Option<Uuid> {
    let prefix = format!("{key}=");
    query
        .split('&')
        .find_map(|kv| kv.strip_prefix(prefix.as_str()))
        .and_then(|v| Uuid::parse_str(v).ok())
}

pub async fn ws_index(
    req: HttpRequest,
    body: web::Payload,
    registry: web::Data<Arc<Registry>>,
) -> Result<HttpResponse, Error> {
    // 1 · identity comes from the query string
    let query = req.query_string();
    let session_id = query_uuid(query, "session_id")
        .ok_or_else(|| actix_web::error::ErrorBadRequest("session_id missing or malformed"))?;
    let participant_id = query_uuid(query, "participant_id")
        .ok_or_else(|| actix_web::error::ErrorBadRequest("participant_id missing or malformed"))?;

    let tx = registry
        .sender(session_id)
        .map_err(|_| actix_web::error::ErrorNotFound("unknown session"))?;

    // 2 · handshake
    let (response, mut session, mut ws_stream) = handle(&req, body)?;

    // 3 · subscribe to this participant's event channel
    let (conn, mut events) = registry.hub().register(participant_id);
    let registry = registry.get_ref().clone();

    actix::spawn(async move {
        loop {
            tokio::select! {
                // client → session task
                Some(frame) = ws_stream.next() => {
                    match frame {
                        Ok(Message::Text(text)) => {
                            let Ok(cmsg) = serde_json::from_str::<ClientMsg>(&text) else {
                                continue;
                            };
                            let out = match dispatch(&tx, participant_id, cmsg).await {
                                Ok(Some(msg)) => Some(msg),
                                Ok(None) => None,
                                Err(e) => Some(ServerMsg::Error {
                                    message: e.to_string(),
                                }),
                            };
                            if let Some(msg) = out {
                                if send_json(&mut session, &msg).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Err(_) => break,
                        _ => {}
                    }
                }
                // session events → client
                Some(msg) = events.recv() => {
                    if send_json(&mut session, &msg).await.is_err() {
                        log::warn!("WS send failed for {participant_id}");
                        break;
                    }
                }
                else => break,
            }
        }

        registry.hub().unregister(participant_id, conn);
        log::info!("WS closed for participant {participant_id}");
    });

    Ok(response)
}

async fn send_json(session: &mut actix_ws::Session, msg: &ServerMsg) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    session.text(json).await.map_err(|_| ())
}

/// One request/response round-trip into the session task.
async fn request<T>(
    tx: &mpsc::Sender<Command>,
    make: impl FnOnce(Reply<T>) -> Command,
) -> Result<T, GameError> {
    let (reply, rx) = oneshot::channel();
    tx.send(make(reply))
        .await
        .map_err(|_| GameError::SessionClosed)?;
    rx.await.map_err(|_| GameError::SessionClosed)?
}

/// Map a client message onto session commands. `Ok(Some(_))` is a direct
/// reply for this socket; broadcasts travel through the hub instead.
async fn dispatch(
    tx: &mpsc::Sender<Command>,
    pid: Uuid,
    msg: ClientMsg,
) -> Result<Option<ServerMsg>, GameError> {
    match msg {
        ClientMsg::Ready => {
            request(tx, |reply| Command::ToggleReady { pid, reply }).await?;
            Ok(None)
        }
        ClientMsg::Start => {
            request(tx, |reply| Command::Start { pid, reply }).await?;
            Ok(None)
        }
        ClientMsg::AdvanceToStats => {
            request(tx, |reply| Command::AdvanceToStats { pid, reply }).await?;
            Ok(None)
        }
        ClientMsg::SubmitStats { stats } => {
            let report = stats.sanitized();
            request(tx, |reply| Command::SubmitStats { pid, report, reply }).await?;
            Ok(None)
        }
        ClientMsg::SubmitGuesses { guesses } => {
            request(tx, |reply| Command::SubmitGuesses {
                pid,
                guesses,
                reply,
            })
            .await?;
            Ok(None)
        }
        ClientMsg::RecordAction { action } => {
            let action_id = request(tx, |reply| Command::RecordAction {
                pid,
                kind: action,
                reply,
            })
            .await?;
            Ok(Some(ServerMsg::ActionRecorded { action_id }))
        }
        ClientMsg::SkipDebate => {
            request(tx, |reply| Command::SkipDebate { pid, reply }).await?;
            Ok(None)
        }
        ClientMsg::Chat { content } => {
            request(tx, |reply| Command::Chat {
                pid,
                content,
                reply,
            })
            .await?;
            Ok(None)
        }
        ClientMsg::Leave => {
            request(tx, |reply| Command::Leave { pid, reply }).await?;
            Ok(None)
        }
        ClientMsg::Sync => {
            let (session, you) = registry::snapshot_via(tx, Some(pid)).await?;
            Ok(Some(ServerMsg::SessionState { session, you }))
        }
    }
}
