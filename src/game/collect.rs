//! Per-session collectors: stat reports, guess sets and the side-action log.
//!
//! All three are owned by the session task; nothing here is shared or
//! locked. Completion checks are evaluated against the *current* participant
//! list so a collector never blocks on someone who already left the lobby.

use crate::error::GameError;
use crate::game::types::{Alignment, RoleAction, RoleActionKind, RoleGuess, StatReport};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One stat report per participant, last write wins.
#[derive(Debug, Default)]
pub struct StatsCollector {
    reports: HashMap<Uuid, StatReport>,
}

impl StatsCollector {
    pub fn submit(&mut self, participant: Uuid, report: StatReport) {
        self.reports.insert(participant, report);
    }

    pub fn get(&self, participant: Uuid) -> Option<&StatReport> {
        self.reports.get(&participant)
    }

    pub fn all(&self) -> &HashMap<Uuid, StatReport> {
        &self.reports
    }

    pub fn is_complete(&self, participants: &[Uuid]) -> bool {
        !participants.is_empty() && participants.iter().all(|p| self.reports.contains_key(p))
    }

    /// (submitted, total) for progress broadcasts.
    pub fn progress(&self, participants: &[Uuid]) -> (usize, usize) {
        let submitted = participants
            .iter()
            .filter(|p| self.reports.contains_key(p))
            .count();
        (submitted, participants.len())
    }
}

/// One full guess set per guesser; partial sets are rejected, never stored.
#[derive(Debug, Default)]
pub struct GuessCollector {
    sets: HashMap<Uuid, Vec<RoleGuess>>,
}

impl GuessCollector {
    /// Store a complete set: exactly one guess per *other* participant.
    /// A valid resubmission replaces the previous set wholesale.
    pub fn submit(
        &mut self,
        guesser: Uuid,
        guesses: Vec<RoleGuess>,
        participants: &[Uuid],
    ) -> Result<(), GameError> {
        let expected = participants.len().saturating_sub(1);
        if guesses.len() != expected {
            return Err(GameError::IncompleteGuessSet {
                expected,
                got: guesses.len(),
            });
        }

        let mut targets = HashSet::with_capacity(guesses.len());
        for g in &guesses {
            let valid = g.guesser == guesser
                && g.target != guesser
                && participants.contains(&g.target)
                && targets.insert(g.target);
            if !valid {
                return Err(GameError::BadGuessTargets);
            }
        }

        self.sets.insert(guesser, guesses);
        Ok(())
    }

    pub fn get(&self, guesser: Uuid) -> Option<&[RoleGuess]> {
        self.sets.get(&guesser).map(|v| v.as_slice())
    }

    /// Every stored guess, in no particular order. Scoring does not depend
    /// on submission order.
    pub fn flatten(&self) -> Vec<RoleGuess> {
        self.sets.values().flatten().copied().collect()
    }

    pub fn is_complete(&self, participants: &[Uuid]) -> bool {
        !participants.is_empty() && participants.iter().all(|p| self.sets.contains_key(p))
    }

    pub fn progress(&self, participants: &[Uuid]) -> (usize, usize) {
        let submitted = participants
            .iter()
            .filter(|p| self.sets.contains_key(p))
            .count();
        (submitted, participants.len())
    }
}

/// Append-only side-action log with monotonically increasing ids.
#[derive(Debug, Default)]
pub struct ActionLog {
    entries: Vec<RoleAction>,
    next_id: u64,
}

impl ActionLog {
    pub fn record(&mut self, participant: Uuid, kind: RoleActionKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(RoleAction {
            id,
            participant,
            kind,
            at: Utc::now(),
        });
        id
    }

    pub fn has_revealed(&self, participant: Uuid) -> bool {
        self.entries.iter().any(|a| {
            a.participant == participant && matches!(a.kind, RoleActionKind::Reveal { .. })
        })
    }

    pub fn revealed_alignment(&self, participant: Uuid) -> Option<Alignment> {
        self.entries.iter().find_map(|a| match a.kind {
            RoleActionKind::Reveal { alignment } if a.participant == participant => {
                Some(alignment)
            }
            _ => None,
        })
    }

    pub fn completed_missions(&self, participant: Uuid) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|a| match &a.kind {
                RoleActionKind::MissionCompleted { mission_id } if a.participant == participant => {
                    Some(mission_id.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn pairing_honored(&self, participant: Uuid) -> bool {
        self.entries
            .iter()
            .any(|a| a.participant == participant && a.kind == RoleActionKind::PairingHonored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Alignment;
    use crate::roles::catalog::RoleId;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn full_set(guesser: Uuid, participants: &[Uuid]) -> Vec<RoleGuess> {
        participants
            .iter()
            .filter(|p| **p != guesser)
            .map(|p| RoleGuess {
                guesser,
                target: *p,
                guessed: RoleId::Serpentin,
            })
            .collect()
    }

    #[test]
    fn stats_progress_tracks_current_participants() {
        let players = ids(5);
        let mut stats = StatsCollector::default();
        assert!(!stats.is_complete(&players));

        for p in &players[..4] {
            stats.submit(*p, StatReport::default());
        }
        assert_eq!(stats.progress(&players), (4, 5));
        assert!(!stats.is_complete(&players));

        stats.submit(players[4], StatReport::default());
        assert!(stats.is_complete(&players));
    }

    #[test]
    fn stats_resubmission_overwrites() {
        let p = Uuid::new_v4();
        let mut stats = StatsCollector::default();
        stats.submit(p, StatReport::default());
        stats.submit(
            p,
            StatReport {
                kills: 7,
                ..StatReport::default()
            },
        );
        assert_eq!(stats.get(p).unwrap().kills, 7);
    }

    #[test]
    fn short_guess_set_is_rejected_without_storing() {
        let players = ids(5);
        let guesser = players[0];
        let mut guesses = GuessCollector::default();

        let mut set = full_set(guesser, &players);
        set.pop();
        let err = guesses.submit(guesser, set, &players).unwrap_err();
        assert!(matches!(err, GameError::IncompleteGuessSet { expected: 4, got: 3 }));
        assert!(guesses.get(guesser).is_none());
    }

    #[test]
    fn rejected_resubmission_keeps_prior_set() {
        let players = ids(5);
        let guesser = players[0];
        let mut guesses = GuessCollector::default();

        let good = full_set(guesser, &players);
        guesses.submit(guesser, good.clone(), &players).unwrap();

        // Duplicate target: shape violation, prior set must survive.
        let mut bad = good.clone();
        bad[1].target = bad[0].target;
        assert_eq!(
            guesses.submit(guesser, bad, &players),
            Err(GameError::BadGuessTargets)
        );
        assert_eq!(guesses.get(guesser).unwrap(), good.as_slice());
    }

    #[test]
    fn self_guess_is_a_shape_violation() {
        let players = ids(5);
        let guesser = players[0];
        let mut guesses = GuessCollector::default();

        let mut set = full_set(guesser, &players);
        set[0].target = guesser;
        assert_eq!(
            guesses.submit(guesser, set, &players),
            Err(GameError::BadGuessTargets)
        );
    }

    #[test]
    fn guess_completion_over_all_participants() {
        let players = ids(5);
        let mut guesses = GuessCollector::default();
        for p in &players {
            assert!(!guesses.is_complete(&players));
            guesses.submit(*p, full_set(*p, &players), &players).unwrap();
        }
        assert!(guesses.is_complete(&players));
        assert_eq!(guesses.flatten().len(), 20);
    }

    #[test]
    fn action_log_queries() {
        let p = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut log = ActionLog::default();

        assert!(!log.has_revealed(p));
        let first = log.record(
            p,
            RoleActionKind::Reveal {
                alignment: Alignment::Bad,
            },
        );
        let second = log.record(
            p,
            RoleActionKind::MissionCompleted {
                mission_id: "miss_3".into(),
            },
        );
        assert!(second > first);
        assert!(log.has_revealed(p));
        assert_eq!(log.revealed_alignment(p), Some(Alignment::Bad));
        assert!(!log.has_revealed(other));
        assert_eq!(log.completed_missions(p), vec!["miss_3"]);
        assert!(!log.pairing_honored(p));
    }
}
