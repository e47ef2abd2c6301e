//! One async task per live session.
//!
//! The task owns every piece of mutable session state; a command channel
//! serializes all mutations, so the two racing phase triggers (completion
//! detection and wall-clock deadlines) both funnel into the same guarded
//! transition functions and the loser of the race is a no-op. Timer and
//! mission-schedule handles live on the task and are aborted the moment the
//! session finishes or is torn down.

use crate::config::Settings;
use crate::error::GameError;
use crate::game::collect::{ActionLog, GuessCollector, StatsCollector};
use crate::game::missions::{Mission, MissionDeck};
use crate::game::scoring::{self, ScoreInput};
use crate::game::types::{
    Alignment, AlignmentPlan, GamePhase, GameStatus, Participant, RoleActionKind, RoleGuess,
    SessionSnapshot, SideActions, StatReport,
};
use crate::hub::Hub;
use crate::protocol::{GuessEntry, GuessReveal, PrivateState, RevealResults, ServerMsg};
use crate::registry::Registry;
use crate::roles::assign;
use crate::roles::catalog::RoleId;
use chrono::{DateTime, Duration as TimeDelta, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

pub type Reply<T> = oneshot::Sender<Result<T, GameError>>;

#[derive(Debug)]
pub struct JoinOutcome {
    pub participant_id: Uuid,
    pub session: SessionSnapshot,
}

/// Everything a client (or a timer) can ask of a session.
#[derive(Debug)]
pub enum Command {
    Join {
        name: String,
        reply: Reply<JoinOutcome>,
    },
    ToggleReady {
        pid: Uuid,
        reply: Reply<bool>,
    },
    Start {
        pid: Uuid,
        reply: Reply<()>,
    },
    AdvanceToStats {
        pid: Uuid,
        reply: Reply<()>,
    },
    SubmitStats {
        pid: Uuid,
        report: StatReport,
        reply: Reply<()>,
    },
    SubmitGuesses {
        pid: Uuid,
        guesses: Vec<GuessEntry>,
        reply: Reply<()>,
    },
    RecordAction {
        pid: Uuid,
        kind: RoleActionKind,
        reply: Reply<u64>,
    },
    SkipDebate {
        pid: Uuid,
        reply: Reply<()>,
    },
    Chat {
        pid: Uuid,
        content: String,
        reply: Reply<()>,
    },
    Leave {
        pid: Uuid,
        reply: Reply<()>,
    },
    Snapshot {
        pid: Option<Uuid>,
        reply: oneshot::Sender<(SessionSnapshot, Option<PrivateState>)>,
    },
    /// Internal: a phase deadline elapsed. No-op if the phase already moved.
    PhaseTimeout { phase: GamePhase },
    /// Internal: the mission schedule wants to deal another mission.
    DeliverMission { pid: Uuid },
}

#[derive(Default)]
struct Timers {
    phase: Option<JoinHandle<()>>,
    missions: Vec<JoinHandle<()>>,
}

impl Timers {
    fn set_phase(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.phase.replace(handle) {
            old.abort();
        }
    }

    fn abort_all(&mut self) {
        if let Some(h) = self.phase.take() {
            h.abort();
        }
        for h in self.missions.drain(..) {
            h.abort();
        }
    }
}

struct Session {
    id: Uuid,
    code: String,
    host: Uuid,
    status: GameStatus,
    phase: Option<GamePhase>,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    participants: Vec<Participant>,

    stats: StatsCollector,
    guesses: GuessCollector,
    actions: ActionLog,

    deck: MissionDeck,
    issued: HashMap<Uuid, Vec<&'static Mission>>,
    alignment_plans: HashMap<Uuid, AlignmentPlan>,
    partners: HashMap<Uuid, Uuid>,
    debate_entered: Option<Instant>,

    cfg: Settings,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
    tx: mpsc::Sender<Command>,
    timers: Timers,
}

/// Create the session task for a fresh lobby and return its command sender,
/// the host's participant id and the initial snapshot.
pub(crate) fn spawn(
    registry: Arc<Registry>,
    cfg: Settings,
    code: String,
    host_name: String,
) -> (mpsc::Sender<Command>, Uuid, SessionSnapshot) {
    let host = Participant::new(host_name);
    let host_id = host.id;
    let (tx, rx) = mpsc::channel::<Command>(64);

    let session = Session {
        id: Uuid::new_v4(),
        code,
        host: host_id,
        status: GameStatus::Lobby,
        phase: None,
        deadline: None,
        created_at: Utc::now(),
        finished_at: None,
        participants: vec![host],
        stats: StatsCollector::default(),
        guesses: GuessCollector::default(),
        actions: ActionLog::default(),
        deck: MissionDeck::shuffled(),
        issued: HashMap::new(),
        alignment_plans: HashMap::new(),
        partners: HashMap::new(),
        debate_entered: None,
        hub: registry.hub().clone(),
        registry,
        cfg,
        tx: tx.clone(),
        timers: Timers::default(),
    };

    let snapshot = session.snapshot();
    tokio::spawn(session.run(rx));
    (tx, host_id, snapshot)
}

impl Session {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        log::info!("session {} ({}) up", self.id, self.code);
        while let Some(cmd) = rx.recv().await {
            if self.handle(cmd) {
                break;
            }
        }
        self.timers.abort_all();
        log::info!("session {} ({}) down", self.id, self.code);
    }

    /// Returns true once the task should exit (finished or empty lobby).
    fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Join { name, reply } => {
                let _ = reply.send(self.join(name));
            }
            Command::ToggleReady { pid, reply } => {
                let _ = reply.send(self.toggle_ready(pid));
            }
            Command::Start { pid, reply } => {
                let _ = reply.send(self.start(pid));
            }
            Command::AdvanceToStats { pid, reply } => {
                let _ = reply.send(self.advance_to_stats(pid));
            }
            Command::SubmitStats { pid, report, reply } => {
                let _ = reply.send(self.submit_stats(pid, report));
            }
            Command::SubmitGuesses {
                pid,
                guesses,
                reply,
            } => {
                let res = self.submit_guesses(pid, guesses);
                let _ = reply.send(res);
                if self.status == GameStatus::Voting && self.guesses.is_complete(&self.ids()) {
                    return self.finish();
                }
            }
            Command::RecordAction { pid, kind, reply } => {
                let _ = reply.send(self.record_action(pid, kind));
            }
            Command::SkipDebate { pid, reply } => {
                let _ = reply.send(self.skip_debate(pid));
            }
            Command::Chat {
                pid,
                content,
                reply,
            } => {
                let _ = reply.send(self.chat(pid, content));
            }
            Command::Leave { pid, reply } => {
                match self.leave(pid) {
                    Ok(empty) => {
                        let _ = reply.send(Ok(()));
                        if empty {
                            self.registry.delete(self.id);
                            return true;
                        }
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::Snapshot { pid, reply } => {
                let you = pid.and_then(|p| self.private_state(p));
                let _ = reply.send((self.snapshot(), you));
            }
            Command::PhaseTimeout { phase } => match phase {
                GamePhase::Debate => self.enter_vote(),
                GamePhase::Vote => return self.finish(),
                _ => {}
            },
            Command::DeliverMission { pid } => self.deliver_mission(pid),
        }
        false
    }

    // ----- lobby -----------------------------------------------------------

    fn join(&mut self, name: String) -> Result<JoinOutcome, GameError> {
        if self.status != GameStatus::Lobby {
            return Err(GameError::NotInLobby);
        }
        if self.participants.len() >= self.cfg.max_players {
            return Err(GameError::SessionFull);
        }

        let participant = Participant::new(name);
        let view = participant.view(false);
        let pid = participant.id;
        self.participants.push(participant);

        self.hub
            .broadcast(&self.ids(), &ServerMsg::PlayerJoined { participant: view });
        Ok(JoinOutcome {
            participant_id: pid,
            session: self.snapshot(),
        })
    }

    fn toggle_ready(&mut self, pid: Uuid) -> Result<bool, GameError> {
        if self.status != GameStatus::Lobby {
            return Err(GameError::NotInLobby);
        }
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == pid)
            .ok_or(GameError::UnknownParticipant)?;
        participant.ready = !participant.ready;
        let ready = participant.ready;

        self.hub.broadcast(
            &self.ids(),
            &ServerMsg::PlayerReady {
                participant_id: pid,
                ready,
            },
        );
        Ok(ready)
    }

    fn leave(&mut self, pid: Uuid) -> Result<bool, GameError> {
        if self.status != GameStatus::Lobby {
            return Err(GameError::NotInLobby);
        }
        let idx = self
            .participants
            .iter()
            .position(|p| p.id == pid)
            .ok_or(GameError::UnknownParticipant)?;
        self.participants.remove(idx);

        if self.participants.is_empty() {
            return Ok(true);
        }

        // The lobby must stay startable, so an abandoned host seat moves to
        // the longest-standing remaining participant.
        let mut new_host = None;
        if self.host == pid {
            self.host = self.participants[0].id;
            new_host = Some(self.host);
        }

        self.hub.broadcast(
            &self.ids(),
            &ServerMsg::PlayerLeft {
                participant_id: pid,
                new_host,
            },
        );
        Ok(false)
    }

    fn chat(&mut self, pid: Uuid, content: String) -> Result<(), GameError> {
        let sender = self
            .participants
            .iter()
            .find(|p| p.id == pid)
            .ok_or(GameError::UnknownParticipant)?;
        let msg = ServerMsg::ChatMessage {
            sender_id: pid,
            sender: sender.name.clone(),
            content,
            ts: Utc::now(),
        };
        self.hub.broadcast(&self.ids(), &msg);
        Ok(())
    }

    // ----- start -----------------------------------------------------------

    fn start(&mut self, pid: Uuid) -> Result<(), GameError> {
        self.require_host(pid)?;
        if self.status != GameStatus::Lobby {
            return Err(GameError::NotInLobby);
        }
        let ids = self.ids();
        if ids.len() < self.cfg.min_players || ids.len() > self.cfg.max_players {
            return Err(GameError::NotEnoughPlayers {
                min: self.cfg.min_players,
                max: self.cfg.max_players,
            });
        }
        if !self.participants.iter().all(|p| p.ready) {
            return Err(GameError::PlayersNotReady);
        }

        let assignment = assign::assign(&ids)?;
        for p in &mut self.participants {
            p.role = assignment.get(&p.id).copied();
        }
        self.status = GameStatus::Playing;
        self.phase = None;
        self.deadline = None;

        // Role-specific private data, drawn once and fixed for the session.
        let mut rng = rand::rng();
        let roster: Vec<(Uuid, RoleId)> = assignment.iter().map(|(p, r)| (*p, *r)).collect();
        for (p, role) in &roster {
            match role {
                RoleId::DoubleFace => {
                    let initial = if rng.random_bool(0.5) {
                        Alignment::Good
                    } else {
                        Alignment::Bad
                    };
                    let mut flips_at: Vec<DateTime<Utc>> = (0..rng.random_range(1..=3))
                        .map(|_| Utc::now() + TimeDelta::minutes(rng.random_range(5..=30)))
                        .collect();
                    flips_at.sort();
                    self.alignment_plans
                        .insert(*p, AlignmentPlan { initial, flips_at });
                }
                RoleId::Romeo => {
                    let others: Vec<Uuid> = ids.iter().copied().filter(|i| i != p).collect();
                    if let Some(partner) = others.choose(&mut rng) {
                        self.partners.insert(*p, *partner);
                    }
                }
                RoleId::Droide => {
                    if let Some(m) = self.deck.draw() {
                        self.issued.entry(*p).or_default().push(m);
                    }
                    self.schedule_missions(*p);
                }
                _ => {}
            }
        }

        // Each participant learns only their own role.
        for (p, role) in &roster {
            self.hub.send(
                *p,
                ServerMsg::GameStarted {
                    role: role.definition().clone(),
                    alignment: self.alignment_plans.get(p).cloned(),
                    partner: self.partners.get(p).copied(),
                    mission: self
                        .issued
                        .get(p)
                        .and_then(|v| v.first())
                        .map(|m| (*m).clone()),
                },
            );
        }
        self.broadcast_phase();
        Ok(())
    }

    // ----- phase transitions ----------------------------------------------

    fn advance_to_stats(&mut self, pid: Uuid) -> Result<(), GameError> {
        self.require_host(pid)?;
        if self.status != GameStatus::Playing || self.phase.is_some() {
            return Err(GameError::WrongPhase);
        }
        self.phase = Some(GamePhase::Stats);
        self.deadline = None; // stats collection never times out
        self.broadcast_phase();
        Ok(())
    }

    fn submit_stats(&mut self, pid: Uuid, report: StatReport) -> Result<(), GameError> {
        self.member(pid)?;
        if self.status != GameStatus::Playing || self.phase != Some(GamePhase::Stats) {
            return Err(GameError::WrongPhase);
        }
        self.stats.submit(pid, report);

        let ids = self.ids();
        let (submitted, total) = self.stats.progress(&ids);
        self.hub
            .broadcast(&ids, &ServerMsg::StatsProgress { submitted, total });

        if self.stats.is_complete(&ids) {
            self.enter_debate();
        }
        Ok(())
    }

    fn enter_debate(&mut self) {
        if self.status != GameStatus::Playing || self.phase != Some(GamePhase::Stats) {
            return;
        }
        self.phase = Some(GamePhase::Debate);
        self.deadline = Some(Utc::now() + TimeDelta::seconds(self.cfg.debate_secs as i64));
        self.debate_entered = Some(Instant::now());
        self.schedule_phase_timeout(GamePhase::Debate, self.cfg.debate_duration());
        self.broadcast_phase();
    }

    fn skip_debate(&mut self, pid: Uuid) -> Result<(), GameError> {
        self.require_host(pid)?;
        if self.status != GameStatus::Playing || self.phase != Some(GamePhase::Debate) {
            return Err(GameError::WrongPhase);
        }
        self.enter_vote();
        Ok(())
    }

    fn enter_vote(&mut self) {
        if self.status != GameStatus::Playing || self.phase != Some(GamePhase::Debate) {
            return;
        }
        self.status = GameStatus::Voting;
        self.phase = Some(GamePhase::Vote);
        self.deadline = Some(Utc::now() + TimeDelta::seconds(self.cfg.vote_secs as i64));
        self.schedule_phase_timeout(GamePhase::Vote, self.cfg.vote_duration());
        self.broadcast_phase();
    }

    fn submit_guesses(&mut self, pid: Uuid, entries: Vec<GuessEntry>) -> Result<(), GameError> {
        self.member(pid)?;
        if self.status != GameStatus::Voting || self.phase != Some(GamePhase::Vote) {
            return Err(GameError::WrongPhase);
        }
        let guesses: Vec<RoleGuess> = entries
            .into_iter()
            .map(|e| RoleGuess {
                guesser: pid,
                target: e.target,
                guessed: e.role,
            })
            .collect();

        let ids = self.ids();
        self.guesses.submit(pid, guesses, &ids)?;

        let (submitted, total) = self.guesses.progress(&ids);
        self.hub.broadcast(
            &ids,
            &ServerMsg::GuessReceived {
                participant_id: pid,
                submitted,
                total,
            },
        );
        Ok(())
    }

    /// Terminal transition: score, persist, disclose, tear down. Callable
    /// from both the completion path and the vote deadline; whichever runs
    /// second finds the status already `Voting`-exited and does nothing.
    fn finish(&mut self) -> bool {
        if self.status != GameStatus::Voting || self.phase != Some(GamePhase::Vote) {
            return false;
        }
        self.timers.abort_all();
        self.status = GameStatus::Finished;
        self.phase = Some(GamePhase::Reveal);
        self.deadline = None;
        self.finished_at = Some(Utc::now());

        let now = Utc::now();
        let roles: HashMap<Uuid, RoleId> = self
            .participants
            .iter()
            .filter_map(|p| p.role.map(|r| (p.id, r)))
            .collect();
        let actions: HashMap<Uuid, SideActions> = roles
            .iter()
            .map(|(pid, role)| (*pid, self.side_actions(*pid, *role, now)))
            .collect();
        let guesses = self.guesses.flatten();

        let breakdowns = scoring::score(&ScoreInput {
            roles: &roles,
            guesses: &guesses,
            stats: self.stats.all(),
            actions: &actions,
        });
        for p in &mut self.participants {
            p.points = breakdowns.get(&p.id).copied();
        }

        let results = RevealResults {
            players: self.participants.iter().map(|p| p.view(true)).collect(),
            guesses: guesses
                .iter()
                .map(|g| {
                    let actual = roles.get(&g.target).copied().unwrap_or(g.guessed);
                    GuessReveal {
                        guesser: g.guesser,
                        target: g.target,
                        guessed: g.guessed,
                        actual,
                        correct: g.guessed == actual,
                    }
                })
                .collect(),
            stats: self.stats.all().clone(),
        };

        self.broadcast_phase();
        self.hub
            .broadcast(&self.ids(), &ServerMsg::GameEnded { results });
        self.registry.retire(self.id, self.snapshot());
        true
    }

    // ----- side actions ----------------------------------------------------

    fn record_action(&mut self, pid: Uuid, kind: RoleActionKind) -> Result<u64, GameError> {
        self.member(pid)?;
        let role = self.role_of(pid).ok_or(GameError::WrongPhase)?;

        match &kind {
            RoleActionKind::Reveal { alignment } => {
                if role != RoleId::DoubleFace {
                    return Err(GameError::RoleCannot);
                }
                if self.status != GameStatus::Playing || self.phase != Some(GamePhase::Debate) {
                    return Err(GameError::WrongPhase);
                }
                let in_window = self
                    .debate_entered
                    .is_some_and(|t| t.elapsed() < self.cfg.reveal_window());
                if !in_window {
                    return Err(GameError::RevealWindowClosed);
                }
                if self.actions.has_revealed(pid) {
                    return Err(GameError::AlreadyRevealed);
                }
                let alignment = *alignment;
                let id = self.actions.record(pid, kind);
                self.hub.broadcast(
                    &self.ids(),
                    &ServerMsg::Revealed {
                        participant_id: pid,
                        alignment,
                    },
                );
                Ok(id)
            }
            RoleActionKind::MissionCompleted { mission_id } => {
                if role != RoleId::Droide {
                    return Err(GameError::RoleCannot);
                }
                if !matches!(self.status, GameStatus::Playing | GameStatus::Voting) {
                    return Err(GameError::WrongPhase);
                }
                let issued = self
                    .issued
                    .get(&pid)
                    .is_some_and(|v| v.iter().any(|m| m.id == *mission_id));
                let done = self
                    .actions
                    .completed_missions(pid)
                    .contains(&mission_id.as_str());
                if !issued || done {
                    return Err(GameError::MissionNotIssued);
                }
                Ok(self.actions.record(pid, kind))
            }
            RoleActionKind::PairingHonored => {
                if role != RoleId::Romeo {
                    return Err(GameError::RoleCannot);
                }
                if !matches!(self.status, GameStatus::Playing | GameStatus::Voting) {
                    return Err(GameError::WrongPhase);
                }
                Ok(self.actions.record(pid, kind))
            }
        }
    }

    fn deliver_mission(&mut self, pid: Uuid) {
        if self.status != GameStatus::Playing {
            return;
        }
        let issued = self.issued.entry(pid).or_default();
        if issued.len() >= self.cfg.max_missions as usize {
            return;
        }
        // Deck exhaustion stops delivery, it never errors the session.
        if let Some(m) = self.deck.draw() {
            issued.push(m);
            self.hub.send(
                pid,
                ServerMsg::MissionIssued {
                    mission: m.clone(),
                },
            );
        }
    }

    fn side_actions(&self, pid: Uuid, role: RoleId, now: DateTime<Utc>) -> SideActions {
        let alignment = if role == RoleId::DoubleFace {
            self.actions
                .revealed_alignment(pid)
                .or_else(|| self.alignment_plans.get(&pid).map(|plan| plan.current(now)))
        } else {
            None
        };
        SideActions {
            revealed: self.actions.has_revealed(pid),
            alignment,
            missions_completed: self.actions.completed_missions(pid).len() as u32,
            missions_issued: self.issued.get(&pid).map_or(0, |v| v.len()) as u32,
            pairing_honored: self.actions.pairing_honored(pid),
        }
    }

    // ----- plumbing --------------------------------------------------------

    fn ids(&self) -> Vec<Uuid> {
        self.participants.iter().map(|p| p.id).collect()
    }

    fn member(&self, pid: Uuid) -> Result<(), GameError> {
        if self.participants.iter().any(|p| p.id == pid) {
            Ok(())
        } else {
            Err(GameError::UnknownParticipant)
        }
    }

    fn require_host(&self, pid: Uuid) -> Result<(), GameError> {
        self.member(pid)?;
        if self.host == pid {
            Ok(())
        } else {
            Err(GameError::NotHost)
        }
    }

    fn role_of(&self, pid: Uuid) -> Option<RoleId> {
        self.participants
            .iter()
            .find(|p| p.id == pid)
            .and_then(|p| p.role)
    }

    fn snapshot(&self) -> SessionSnapshot {
        let disclose = self.status == GameStatus::Finished;
        SessionSnapshot {
            id: self.id,
            code: self.code.clone(),
            host: self.host,
            status: self.status,
            phase: self.phase,
            deadline: self.deadline,
            created_at: self.created_at,
            finished_at: self.finished_at,
            participants: self.participants.iter().map(|p| p.view(disclose)).collect(),
        }
    }

    fn private_state(&self, pid: Uuid) -> Option<PrivateState> {
        self.member(pid).ok()?;
        Some(PrivateState {
            role: self.role_of(pid).map(|r| r.definition().clone()),
            alignment: self.alignment_plans.get(&pid).cloned(),
            partner: self.partners.get(&pid).copied(),
            missions: self
                .issued
                .get(&pid)
                .map(|v| v.iter().map(|m| (*m).clone()).collect())
                .unwrap_or_default(),
        })
    }

    fn broadcast_phase(&self) {
        self.hub.broadcast(
            &self.ids(),
            &ServerMsg::PhaseChanged {
                status: self.status,
                phase: self.phase,
                deadline: self.deadline,
            },
        );
    }

    fn schedule_phase_timeout(&mut self, phase: GamePhase, after: std::time::Duration) {
        let tx = self.tx.clone();
        self.timers.set_phase(tokio::spawn(async move {
            sleep(after).await;
            let _ = tx.send(Command::PhaseTimeout { phase }).await;
        }));
    }

    /// Up to `max_missions - 1` further deliveries on a fixed interval; the
    /// handler enforces the cap and deck bounds when each one fires.
    fn schedule_missions(&mut self, pid: Uuid) {
        let tx = self.tx.clone();
        let interval = self.cfg.mission_interval();
        let extra = self.cfg.max_missions.saturating_sub(1);
        self.timers.missions.push(tokio::spawn(async move {
            for _ in 0..extra {
                sleep(interval).await;
                if tx.send(Command::DeliverMission { pid }).await.is_err() {
                    break;
                }
            }
        }));
    }
}
