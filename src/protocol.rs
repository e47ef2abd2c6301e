//! Wire-protocol shared by client, WS handler and session task.

use crate::game::missions::Mission;
use crate::game::types::{
    Alignment, AlignmentPlan, GamePhase, GameStatus, ParticipantView, RoleActionKind,
    SessionSnapshot, StatReport,
};
use crate::roles::catalog::{Role, RoleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Self-reported match stats as they arrive off the wire. Values are only
/// coerced to non-negative, never validated — trust-based by design.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct StatPayload {
    pub victory: bool,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub damage: i64,
    pub cs: i64,
}

impl StatPayload {
    pub fn sanitized(&self) -> StatReport {
        fn coerce(v: i64) -> u32 {
            v.clamp(0, u32::MAX as i64) as u32
        }
        StatReport {
            victory: self.victory,
            kills: coerce(self.kills),
            deaths: coerce(self.deaths),
            assists: coerce(self.assists),
            damage: coerce(self.damage),
            cs: coerce(self.cs),
        }
    }
}

/// One entry of a guess set.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct GuessEntry {
    pub target: Uuid,
    pub role: RoleId,
}

// ---------- client → server ----------
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Toggle the lobby ready flag.
    Ready,
    /// Host only: assign roles and start the match.
    Start,
    /// Host only: the external match is over, collect stats.
    AdvanceToStats,
    SubmitStats {
        stats: StatPayload,
    },
    SubmitGuesses {
        guesses: Vec<GuessEntry>,
    },
    RecordAction {
        action: RoleActionKind,
    },
    /// Host only: end the debate early.
    SkipDebate,
    Chat {
        content: String,
    },
    /// Leave the lobby (not allowed once the game has started).
    Leave,
    /// Re-fetch session + private state after a reconnect.
    Sync,
}

/// Private state re-sent on `Sync` so a reconnecting client can rebuild its
/// UI without any event replay.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PrivateState {
    pub role: Option<Role>,
    pub alignment: Option<AlignmentPlan>,
    pub partner: Option<Uuid>,
    pub missions: Vec<Mission>,
}

/// One disclosed guess in the reveal payload.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct GuessReveal {
    pub guesser: Uuid,
    pub target: Uuid,
    pub guessed: RoleId,
    pub actual: RoleId,
    pub correct: bool,
}

/// Everything disclosed at the end of a session.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RevealResults {
    pub players: Vec<ParticipantView>,
    pub guesses: Vec<GuessReveal>,
    pub stats: HashMap<Uuid, StatReport>,
}

// ---------- server → client ----------
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMsg {
    PlayerJoined {
        participant: ParticipantView,
    },
    PlayerLeft {
        participant_id: Uuid,
        new_host: Option<Uuid>,
    },
    PlayerReady {
        participant_id: Uuid,
        ready: bool,
    },
    ChatMessage {
        sender_id: Uuid,
        sender: String,
        content: String,
        ts: DateTime<Utc>,
    },
    /// Private: your role and role-specific data, sent once at game start.
    GameStarted {
        role: Role,
        alignment: Option<AlignmentPlan>,
        partner: Option<Uuid>,
        mission: Option<Mission>,
    },
    PhaseChanged {
        status: GameStatus,
        phase: Option<GamePhase>,
        deadline: Option<DateTime<Utc>>,
    },
    StatsProgress {
        submitted: usize,
        total: usize,
    },
    /// Acknowledgement only; guessed content never leaks before the reveal.
    GuessReceived {
        participant_id: Uuid,
        submitted: usize,
        total: usize,
    },
    /// Private: a new side-mission for a mission-bearing role.
    MissionIssued {
        mission: Mission,
    },
    /// Public: a Double-Face stepped into the open during the debate.
    Revealed {
        participant_id: Uuid,
        alignment: Alignment,
    },
    ActionRecorded {
        action_id: u64,
    },
    GameEnded {
        results: RevealResults,
    },
    SessionState {
        session: SessionSnapshot,
        you: Option<PrivateState>,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_payload_coerces_negatives_to_zero() {
        let p = StatPayload {
            victory: true,
            kills: -3,
            deaths: 2,
            assists: -1,
            damage: 18000,
            cs: -200,
        };
        let r = p.sanitized();
        assert_eq!((r.kills, r.deaths, r.assists), (0, 2, 0));
        assert_eq!((r.damage, r.cs), (18000, 0));
        assert!(r.victory);
    }

    #[test]
    fn client_msg_round_trips_through_tagged_json() {
        let json = r#"{"type":"RecordAction","action":{"action":"reveal","alignment":"bad"}}"#;
        let msg: ClientMsg = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::RecordAction {
                action: RoleActionKind::Reveal {
                    alignment: Alignment::Bad
                }
            }
        ));
    }
}
