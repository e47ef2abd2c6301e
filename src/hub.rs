//! In-process event fan-out: one channel per connected participant.
//!
//! The session task publishes here and never learns whether a participant
//! is actually connected; a message for an absent participant is dropped,
//! and a reconnecting client resynchronizes by re-fetching state instead of
//! replaying events.

use crate::protocol::ServerMsg;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one socket, so a stale connection's cleanup cannot evict the
/// connection that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnId(u64);

#[derive(Default)]
pub struct Hub {
    senders: DashMap<Uuid, (ConnId, mpsc::UnboundedSender<ServerMsg>)>,
    next_conn: AtomicU64,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Hub::default())
    }

    /// Register a connection for `participant`. A newer socket replaces the
    /// older one, whose receiver then drains dead and closes.
    pub fn register(&self, participant: Uuid) -> (ConnId, mpsc::UnboundedReceiver<ServerMsg>) {
        let conn = ConnId(self.next_conn.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(participant, (conn, tx));
        (conn, rx)
    }

    /// Drop the registration, but only if `conn` is still the live socket.
    pub fn unregister(&self, participant: Uuid, conn: ConnId) {
        self.senders
            .remove_if(&participant, |_, (current, _)| *current == conn);
    }

    /// Fire-and-forget delivery to one participant.
    pub fn send(&self, participant: Uuid, msg: ServerMsg) {
        if let Some(entry) = self.senders.get(&participant) {
            let _ = entry.1.send(msg);
        }
    }

    /// Fire-and-forget delivery to a set of participants.
    pub fn broadcast(&self, participants: &[Uuid], msg: &ServerMsg) {
        for pid in participants {
            self.send(*pid, msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_reaches_registered_participant_only() {
        let hub = Hub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (conn, mut rx) = hub.register(a);

        hub.broadcast(
            &[a, b],
            &ServerMsg::PlayerReady {
                participant_id: a,
                ready: true,
            },
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMsg::PlayerReady { ready: true, .. })
        ));

        hub.unregister(a, conn);
        hub.send(
            a,
            ServerMsg::PlayerReady {
                participant_id: a,
                ready: false,
            },
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_socket_cleanup_keeps_the_replacement() {
        let hub = Hub::new();
        let a = Uuid::new_v4();
        let (old_conn, _old_rx) = hub.register(a);
        let (_new_conn, mut new_rx) = hub.register(a);

        hub.unregister(a, old_conn);
        hub.send(
            a,
            ServerMsg::PlayerReady {
                participant_id: a,
                ready: true,
            },
        );
        assert!(new_rx.try_recv().is_ok());
    }
}
