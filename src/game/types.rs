//! Session-scoped data model shared by the state machine, collectors and
//! scoring engine.

use crate::roles::catalog::RoleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session life-cycle. Forward-only.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Lobby,
    Playing,
    Voting,
    Finished,
}

/// Phase within `Playing`/`Voting`/`Finished`. `None` while the external
/// match is still running.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Stats,
    Debate,
    Vote,
    Reveal,
}

/// Session-scoped identity; no persistent account behind it.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub ready: bool,
    /// Assigned at game start, immutable afterwards.
    pub role: Option<RoleId>,
    /// Set once, at reveal.
    pub points: Option<PointsBreakdown>,
}

/// What other participants are allowed to see. Roles stay hidden until the
/// session is finished.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParticipantView {
    pub id: Uuid,
    pub name: String,
    pub ready: bool,
    pub role: Option<RoleId>,
    pub points: Option<PointsBreakdown>,
}

impl Participant {
    pub fn new(name: String) -> Self {
        Participant {
            id: Uuid::new_v4(),
            name,
            ready: false,
            role: None,
            points: None,
        }
    }

    pub fn view(&self, disclose: bool) -> ParticipantView {
        ParticipantView {
            id: self.id,
            name: self.name.clone(),
            ready: self.ready,
            role: if disclose { self.role } else { None },
            points: if disclose { self.points } else { None },
        }
    }
}

/// Self-reported match performance. Trust-based; resubmission overwrites.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatReport {
    pub victory: bool,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub damage: u32,
    pub cs: u32,
}

/// One guessed role about one other participant.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RoleGuess {
    pub guesser: Uuid,
    pub target: Uuid,
    pub guessed: RoleId,
}

/// Double-Face allegiance.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Good,
    Bad,
}

impl Alignment {
    pub fn flipped(self) -> Alignment {
        match self {
            Alignment::Good => Alignment::Bad,
            Alignment::Bad => Alignment::Good,
        }
    }
}

/// Fixed at game start: the Double-Face starts on `initial` and flips at
/// each scheduled instant.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignmentPlan {
    pub initial: Alignment,
    pub flips_at: Vec<DateTime<Utc>>,
}

impl AlignmentPlan {
    pub fn current(&self, at: DateTime<Utc>) -> Alignment {
        let elapsed_flips = self.flips_at.iter().filter(|t| **t <= at).count();
        if elapsed_flips % 2 == 0 {
            self.initial
        } else {
            self.initial.flipped()
        }
    }
}

/// Typed payload per side-action, never an opaque blob.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoleActionKind {
    /// Double-Face steps into the open, declaring an allegiance. Only valid
    /// in the first seconds of the debate.
    Reveal { alignment: Alignment },
    /// Droide reports one of its issued missions as done.
    MissionCompleted { mission_id: String },
    /// Romeo reports having honored the pairing rule.
    PairingHonored,
}

/// Append-only log entry.
#[derive(Debug, Serialize, Clone)]
pub struct RoleAction {
    pub id: u64,
    pub participant: Uuid,
    #[serde(flatten)]
    pub kind: RoleActionKind,
    pub at: DateTime<Utc>,
}

/// Per-participant side-action summary handed to the scoring engine.
#[derive(Debug, Clone, Default)]
pub struct SideActions {
    pub revealed: bool,
    pub alignment: Option<Alignment>,
    pub missions_completed: u32,
    pub missions_issued: u32,
    pub pairing_honored: bool,
}

/// Final per-participant score, summed from three independent components.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PointsBreakdown {
    pub vote_bonus: i32,
    pub discovery_bonus: i32,
    pub role_bonus: i32,
    pub total: i32,
}

/// Public state of a session, used for lobby views and reconnect re-sync.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub code: String,
    pub host: Uuid,
    pub status: GameStatus,
    pub phase: Option<GamePhase>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub participants: Vec<ParticipantView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn alignment_plan_flips_parity() {
        let start = Utc::now();
        let plan = AlignmentPlan {
            initial: Alignment::Good,
            flips_at: vec![start + Duration::minutes(5), start + Duration::minutes(10)],
        };
        assert_eq!(plan.current(start), Alignment::Good);
        assert_eq!(plan.current(start + Duration::minutes(6)), Alignment::Bad);
        assert_eq!(plan.current(start + Duration::minutes(11)), Alignment::Good);
    }
}
