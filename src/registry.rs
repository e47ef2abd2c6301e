//! Directory of live sessions and the join-code namespace.
//!
//! Lookup state only: command routing and the finished-session archive.
//! Everything mutable about a session itself lives on that session's task,
//! which removes its own entries here when it goes down.

use crate::config::Settings;
use crate::error::GameError;
use crate::game::session::{self, Command, JoinOutcome};
use crate::game::types::SessionSnapshot;
use crate::hub::Hub;
use crate::protocol::PrivateState;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

struct SessionEntry {
    code: String,
    tx: mpsc::Sender<Command>,
}

/// What a participant gets back from create/join.
#[derive(Debug)]
pub struct Created {
    pub participant_id: Uuid,
    pub session: SessionSnapshot,
}

pub struct Registry {
    cfg: Settings,
    hub: Arc<Hub>,
    sessions: DashMap<Uuid, SessionEntry>,
    codes: DashMap<String, Uuid>,
    finished: DashMap<Uuid, SessionSnapshot>,
}

impl Registry {
    pub fn new(cfg: Settings, hub: Arc<Hub>) -> Arc<Self> {
        Arc::new(Registry {
            cfg,
            hub,
            sessions: DashMap::new(),
            codes: DashMap::new(),
            finished: DashMap::new(),
        })
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Spawn a fresh lobby with `host_name` as its host.
    pub fn create_session(self: &Arc<Self>, host_name: String) -> Result<Created, GameError> {
        let code = self.allocate_code()?;
        let (tx, host_id, snapshot) =
            session::spawn(self.clone(), self.cfg.clone(), code.clone(), host_name);
        self.codes.insert(code.clone(), snapshot.id);
        self.sessions.insert(snapshot.id, SessionEntry { code, tx });
        Ok(Created {
            participant_id: host_id,
            session: snapshot,
        })
    }

    /// Join by code; fails for unknown codes, started or full sessions.
    pub async fn join_session(&self, code: &str, name: String) -> Result<Created, GameError> {
        let id = self.resolve(code)?;
        let tx = self.sender(id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Join { name, reply })
            .await
            .map_err(|_| GameError::SessionClosed)?;
        let JoinOutcome {
            participant_id,
            session,
        } = rx.await.map_err(|_| GameError::SessionClosed)??;
        Ok(Created {
            participant_id,
            session,
        })
    }

    /// Public view of a session, live or finished. A session that finishes
    /// between the routing lookup and the snapshot request is served from
    /// the archive, which is always populated before the task goes down.
    pub async fn snapshot_by_code(&self, code: &str) -> Result<SessionSnapshot, GameError> {
        let id = self.resolve(code)?;
        if let Ok(tx) = self.sender(id) {
            if let Ok((snapshot, _)) = snapshot_via(&tx, None).await {
                return Ok(snapshot);
            }
        }
        self.finished
            .get(&id)
            .map(|s| s.clone())
            .ok_or(GameError::SessionNotFound)
    }

    pub fn sender(&self, session_id: Uuid) -> Result<mpsc::Sender<Command>, GameError> {
        self.sessions
            .get(&session_id)
            .map(|e| e.tx.clone())
            .ok_or(GameError::SessionNotFound)
    }

    fn resolve(&self, code: &str) -> Result<Uuid, GameError> {
        let code = code.trim().to_ascii_uppercase();
        self.codes
            .get(&code)
            .map(|id| *id)
            .ok_or(GameError::SessionNotFound)
    }

    /// Random fixed-length code, retried a bounded number of times before
    /// giving up with a hard error.
    fn allocate_code(&self) -> Result<String, GameError> {
        let mut rng = rand::rng();
        for _ in 0..self.cfg.code_attempts {
            let code: String = (0..self.cfg.code_length)
                .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.codes.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(GameError::CodesExhausted)
    }

    /// Called by a finishing session: archive the final snapshot and stop
    /// routing commands. The code stays reserved for the archived record.
    pub(crate) fn retire(&self, id: Uuid, snapshot: SessionSnapshot) {
        self.finished.insert(id, snapshot);
        self.sessions.remove(&id);
    }

    /// Called by an emptied lobby: drop the session entirely and free its
    /// code for reuse.
    pub(crate) fn delete(&self, id: Uuid) {
        if let Some((_, entry)) = self.sessions.remove(&id) {
            self.codes.remove(&entry.code);
            log::info!("session {id} ({}) deleted, lobby emptied", entry.code);
        }
    }
}

/// Ask a session task for its snapshot (plus private state for `pid`).
pub async fn snapshot_via(
    tx: &mpsc::Sender<Command>,
    pid: Option<Uuid>,
) -> Result<(SessionSnapshot, Option<PrivateState>), GameError> {
    let (reply, rx) = oneshot::channel();
    tx.send(Command::Snapshot { pid, reply })
        .await
        .map_err(|_| GameError::SessionClosed)?;
    rx.await.map_err(|_| GameError::SessionClosed)
}
