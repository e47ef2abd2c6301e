//! Pure scoring engine: (roles, guesses, stats, side-actions) → points.
//!
//! Deterministic over its inputs and tolerant of holes: a participant
//! without a stat report contributes nothing to team maxima and takes a
//! role bonus of 0. Input consistency (one role per participant) is the
//! state machine's responsibility, not re-checked here.

use crate::game::types::{Alignment, PointsBreakdown, RoleGuess, SideActions, StatReport};
use crate::roles::catalog::RoleId;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub struct ScoreInput<'a> {
    pub roles: &'a HashMap<Uuid, RoleId>,
    pub guesses: &'a [RoleGuess],
    pub stats: &'a HashMap<Uuid, StatReport>,
    pub actions: &'a HashMap<Uuid, SideActions>,
}

/// Highest value of each tracked stat across every submitted report,
/// computed once before any per-role comparison. Ties all take the bonus.
#[derive(Debug, Clone, Copy, Default)]
struct TeamMaxima {
    damage: u32,
    kills: u32,
    assists: u32,
    deaths: u32,
}

impl TeamMaxima {
    fn of(stats: &HashMap<Uuid, StatReport>) -> Self {
        let mut m = TeamMaxima::default();
        for r in stats.values() {
            m.damage = m.damage.max(r.damage);
            m.kills = m.kills.max(r.kills);
            m.assists = m.assists.max(r.assists);
            m.deaths = m.deaths.max(r.deaths);
        }
        m
    }
}

/// Everything a role-specific calculator may look at.
struct BonusCtx<'a> {
    report: &'a StatReport,
    maxima: &'a TeamMaxima,
    /// Distinct participants who submitted a guess set.
    voters_total: i32,
    /// How many of them named this participant as the Impostor.
    named_impostor: i32,
    side: &'a SideActions,
}

trait RoleBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32;
}

fn win_loss(ctx: &BonusCtx, win: i32, loss: i32) -> i32 {
    if ctx.report.victory {
        win
    } else {
        loss
    }
}

/// Wants the team to lose, and to stay unsuspected.
struct ImpostorBonus;
impl RoleBonus for ImpostorBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        win_loss(ctx, -3, 2) + (ctx.voters_total - ctx.named_impostor)
    }
}

/// Mirror of the Impostor: wants the win, and to be suspected.
struct EscrocBonus;
impl RoleBonus for EscrocBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        win_loss(ctx, 2, -3) + ctx.named_impostor
    }
}

struct SerpentinBonus;
impl RoleBonus for SerpentinBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        let mut b = win_loss(ctx, 2, -2);
        if ctx.report.damage >= ctx.maxima.damage {
            b += 1;
        }
        if ctx.report.deaths >= ctx.maxima.deaths {
            b += 1;
        }
        b
    }
}

struct SuperHeroBonus;
impl RoleBonus for SuperHeroBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        let mut b = win_loss(ctx, 2, -3);
        if ctx.report.damage >= ctx.maxima.damage {
            b += 1;
        }
        if ctx.report.kills >= ctx.maxima.kills {
            b += 1;
        }
        if ctx.report.assists >= ctx.maxima.assists {
            b += 1;
        }
        b
    }
}

/// Scores only through alignment timing: good side on a win, bad side on a
/// loss. No win/loss base.
struct DoubleFaceBonus;
impl RoleBonus for DoubleFaceBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        match ctx.side.alignment {
            Some(Alignment::Good) if ctx.report.victory => 2,
            Some(Alignment::Bad) if !ctx.report.victory => 2,
            _ => 0,
        }
    }
}

struct RomeoBonus;
impl RoleBonus for RomeoBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        win_loss(ctx, 2, -2) + if ctx.side.pairing_honored { 1 } else { 0 }
    }
}

struct DroideBonus;
impl RoleBonus for DroideBonus {
    fn bonus(&self, ctx: &BonusCtx) -> i32 {
        let all_cleared = ctx.side.missions_issued > 0
            && ctx.side.missions_completed >= ctx.side.missions_issued;
        win_loss(ctx, 2, -2) + if all_cleared { 1 } else { 0 }
    }
}

fn calculator(role: RoleId) -> &'static dyn RoleBonus {
    match role {
        RoleId::Impostor => &ImpostorBonus,
        RoleId::Escroc => &EscrocBonus,
        RoleId::Serpentin => &SerpentinBonus,
        RoleId::SuperHero => &SuperHeroBonus,
        RoleId::DoubleFace => &DoubleFaceBonus,
        RoleId::Romeo => &RomeoBonus,
        RoleId::Droide => &DroideBonus,
    }
}

pub fn score(input: &ScoreInput) -> HashMap<Uuid, PointsBreakdown> {
    let maxima = TeamMaxima::of(input.stats);

    let voters: HashSet<Uuid> = input.guesses.iter().map(|g| g.guesser).collect();
    let voters_total = voters.len() as i32;

    let empty = SideActions::default();
    let mut out = HashMap::with_capacity(input.roles.len());

    for (&pid, &role) in input.roles {
        let vote_bonus: i32 = input
            .guesses
            .iter()
            .filter(|g| g.guesser == pid)
            .map(|g| {
                if input.roles.get(&g.target) == Some(&g.guessed) {
                    1
                } else {
                    -1
                }
            })
            .sum();

        let discovery_bonus: i32 = input
            .guesses
            .iter()
            .filter(|g| g.target == pid)
            .map(|g| match (g.guessed == role, role) {
                (true, RoleId::SuperHero) => 0,
                (true, _) => -1,
                (false, _) => 1,
            })
            .sum();

        let named_impostor = input
            .guesses
            .iter()
            .filter(|g| g.target == pid && g.guessed == RoleId::Impostor)
            .count() as i32;

        let role_bonus = match input.stats.get(&pid) {
            Some(report) => {
                let ctx = BonusCtx {
                    report,
                    maxima: &maxima,
                    voters_total,
                    named_impostor,
                    side: input.actions.get(&pid).unwrap_or(&empty),
                };
                calculator(role).bonus(&ctx)
            }
            None => 0,
        };

        out.insert(
            pid,
            PointsBreakdown {
                vote_bonus,
                discovery_bonus,
                role_bonus,
                total: vote_bonus + discovery_bonus + role_bonus,
            },
        );
    }

    out
}
