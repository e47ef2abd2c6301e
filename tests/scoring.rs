//! Unit tests for the pure scoring engine.

use among_legends_server::game::scoring::{score, ScoreInput};
use among_legends_server::game::types::{Alignment, RoleGuess, SideActions, StatReport};
use among_legends_server::roles::catalog::RoleId;
use std::collections::HashMap;
use uuid::Uuid;

fn stat(victory: bool, kills: u32, deaths: u32, assists: u32, damage: u32) -> StatReport {
    StatReport {
        victory,
        kills,
        deaths,
        assists,
        damage,
        cs: 150,
    }
}

/// Five players: one Impostor, four fillers; everyone reports a win except
/// the last filler; every player submits a full guess set and exactly
/// `correct_accusers` of them name the Impostor.
struct Fixture {
    roles: HashMap<Uuid, RoleId>,
    guesses: Vec<RoleGuess>,
    stats: HashMap<Uuid, StatReport>,
    impostor: Uuid,
}

fn five_player_fixture(correct_accusers: usize) -> Fixture {
    let players: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let impostor = players[0];

    let mut roles = HashMap::new();
    roles.insert(players[0], RoleId::Impostor);
    roles.insert(players[1], RoleId::Serpentin);
    roles.insert(players[2], RoleId::SuperHero);
    roles.insert(players[3], RoleId::Romeo);
    roles.insert(players[4], RoleId::Droide);

    let mut stats = HashMap::new();
    for (i, p) in players.iter().enumerate() {
        stats.insert(*p, stat(i < 4, 3, 2, 5, 10_000));
    }

    // Accusers are taken from the non-impostor players in order.
    let mut guesses = Vec::new();
    let mut accusers = 0;
    for guesser in &players {
        for target in &players {
            if target == guesser {
                continue;
            }
            let guessed = if *target == impostor {
                if *guesser != impostor && accusers < correct_accusers {
                    accusers += 1;
                    RoleId::Impostor
                } else {
                    RoleId::Escroc
                }
            } else {
                RoleId::Escroc
            };
            guesses.push(RoleGuess {
                guesser: *guesser,
                target: *target,
                guessed,
            });
        }
    }

    Fixture {
        roles,
        guesses,
        stats,
        impostor,
    }
}

fn run(fx: &Fixture) -> HashMap<Uuid, among_legends_server::game::types::PointsBreakdown> {
    score(&ScoreInput {
        roles: &fx.roles,
        guesses: &fx.guesses,
        stats: &fx.stats,
        actions: &HashMap::new(),
    })
}

#[test]
fn scoring_is_deterministic() {
    let fx = five_player_fixture(3);
    let a = run(&fx);
    let b = run(&fx);
    assert_eq!(a, b);
}

#[test]
fn impostor_worked_example_from_majority_catch() {
    // Team won (impostor reports a win); 3 of the 5 submitters named them.
    // Role bonus = -3 (win) + (5 voters - 3 catchers) = -1.
    let fx = five_player_fixture(3);
    let points = run(&fx);
    assert_eq!(points[&fx.impostor].role_bonus, -1);
}

#[test]
fn impostor_profits_from_a_team_loss_and_a_clean_getaway() {
    let mut fx = five_player_fixture(0);
    fx.stats.insert(fx.impostor, stat(false, 0, 5, 1, 3_000));
    let points = run(&fx);
    // +2 (loss) + 5 voters who all missed.
    assert_eq!(points[&fx.impostor].role_bonus, 7);
}

#[test]
fn escroc_wants_to_be_suspected() {
    let players: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let escroc = players[0];
    let mut roles = HashMap::new();
    roles.insert(players[0], RoleId::Escroc);
    roles.insert(players[1], RoleId::Impostor);
    roles.insert(players[2], RoleId::Serpentin);
    roles.insert(players[3], RoleId::Romeo);
    roles.insert(players[4], RoleId::Droide);

    let mut stats = HashMap::new();
    for p in &players {
        stats.insert(*p, stat(true, 2, 2, 2, 8_000));
    }

    // Two players call the Escroc the impostor.
    let guesses: Vec<RoleGuess> = players[1..3]
        .iter()
        .map(|g| RoleGuess {
            guesser: *g,
            target: escroc,
            guessed: RoleId::Impostor,
        })
        .collect();

    let points = score(&ScoreInput {
        roles: &roles,
        guesses: &guesses,
        stats: &stats,
        actions: &HashMap::new(),
    });
    // +2 (win) + 2 accusers.
    assert_eq!(points[&escroc].role_bonus, 4);
}

#[test]
fn super_hero_discovery_bonus_never_negative() {
    let fx = five_player_fixture(0);
    let hero = *fx
        .roles
        .iter()
        .find(|(_, r)| **r == RoleId::SuperHero)
        .unwrap()
        .0;

    // Everyone who guessed about the hero nails it.
    let mut fx = fx;
    for g in &mut fx.guesses {
        if g.target == hero {
            g.guessed = RoleId::SuperHero;
        }
    }
    let points = run(&fx);
    assert_eq!(points[&hero].discovery_bonus, 0);
    assert!(points[&hero].discovery_bonus >= 0);
}

#[test]
fn other_roles_can_go_negative_on_discovery() {
    let fx = five_player_fixture(0);
    let serpentin = *fx
        .roles
        .iter()
        .find(|(_, r)| **r == RoleId::Serpentin)
        .unwrap()
        .0;

    let mut fx = fx;
    for g in &mut fx.guesses {
        if g.target == serpentin {
            g.guessed = RoleId::Serpentin;
        }
    }
    let points = run(&fx);
    assert_eq!(points[&serpentin].discovery_bonus, -4);
}

#[test]
fn vote_bonus_is_plus_one_per_hit_minus_one_per_miss() {
    let fx = five_player_fixture(3);
    let points = run(&fx);

    // An accuser who named the Impostor: 1 correct + 3 wrong = -2.
    let accuser = fx
        .guesses
        .iter()
        .find(|g| g.guessed == RoleId::Impostor)
        .unwrap()
        .guesser;
    assert_eq!(points[&accuser].vote_bonus, -2);

    // The impostor guessed Escroc about everyone: 4 misses.
    assert_eq!(points[&fx.impostor].vote_bonus, -4);
}

#[test]
fn ties_at_team_maximum_all_take_the_bonus() {
    let players: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let mut roles = HashMap::new();
    roles.insert(players[0], RoleId::Impostor);
    roles.insert(players[1], RoleId::Serpentin);
    roles.insert(players[2], RoleId::SuperHero);
    roles.insert(players[3], RoleId::Romeo);
    roles.insert(players[4], RoleId::Droide);

    // Serpentin and SuperHero tie for top damage; both lead deaths/kills
    // where their own formula looks.
    let mut stats = HashMap::new();
    stats.insert(players[0], stat(true, 1, 1, 1, 5_000));
    stats.insert(players[1], stat(true, 2, 9, 3, 20_000)); // top damage + deaths
    stats.insert(players[2], stat(true, 9, 1, 9, 20_000)); // top damage + kills + assists
    stats.insert(players[3], stat(true, 3, 2, 4, 9_000));
    stats.insert(players[4], stat(true, 2, 2, 2, 7_000));

    let points = score(&ScoreInput {
        roles: &roles,
        guesses: &[],
        stats: &stats,
        actions: &HashMap::new(),
    });

    // Serpentin: +2 win, +1 damage tie, +1 deaths lead.
    assert_eq!(points[&players[1]].role_bonus, 4);
    // SuperHero: +2 win, +1 damage tie, +1 kills, +1 assists.
    assert_eq!(points[&players[2]].role_bonus, 5);
}

#[test]
fn missing_stat_report_means_zero_role_bonus() {
    let mut fx = five_player_fixture(0);
    let serpentin = *fx
        .roles
        .iter()
        .find(|(_, r)| **r == RoleId::Serpentin)
        .unwrap()
        .0;
    fx.stats.remove(&serpentin);

    let points = run(&fx);
    assert_eq!(points[&serpentin].role_bonus, 0);
    // Vote and discovery bonuses still apply.
    assert_ne!(points[&serpentin].vote_bonus, 0);
}

#[test]
fn double_face_scores_only_on_alignment_timing() {
    let players: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let df = players[0];
    let mut roles = HashMap::new();
    roles.insert(players[0], RoleId::DoubleFace);
    roles.insert(players[1], RoleId::Impostor);
    roles.insert(players[2], RoleId::Serpentin);
    roles.insert(players[3], RoleId::Romeo);
    roles.insert(players[4], RoleId::Droide);

    let mut stats = HashMap::new();
    for p in &players {
        stats.insert(*p, stat(true, 2, 2, 2, 8_000));
    }

    let case = |alignment: Option<Alignment>, victory: bool| {
        let mut stats = stats.clone();
        stats.insert(df, stat(victory, 2, 2, 2, 8_000));
        let mut actions = HashMap::new();
        actions.insert(
            df,
            SideActions {
                alignment,
                ..SideActions::default()
            },
        );
        let points = score(&ScoreInput {
            roles: &roles,
            guesses: &[],
            stats: &stats,
            actions: &actions,
        });
        points[&df].role_bonus
    };

    assert_eq!(case(Some(Alignment::Good), true), 2);
    assert_eq!(case(Some(Alignment::Bad), false), 2);
    assert_eq!(case(Some(Alignment::Good), false), 0);
    assert_eq!(case(Some(Alignment::Bad), true), 0);
    assert_eq!(case(None, true), 0);
}

#[test]
fn romeo_and_droide_side_action_terms() {
    let players: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let romeo = players[0];
    let droide = players[1];
    let mut roles = HashMap::new();
    roles.insert(players[0], RoleId::Romeo);
    roles.insert(players[1], RoleId::Droide);
    roles.insert(players[2], RoleId::Impostor);
    roles.insert(players[3], RoleId::Serpentin);
    roles.insert(players[4], RoleId::SuperHero);

    let mut stats = HashMap::new();
    for p in &players {
        stats.insert(*p, stat(true, 1, 1, 1, 1_000));
    }

    let mut actions = HashMap::new();
    actions.insert(
        romeo,
        SideActions {
            pairing_honored: true,
            ..SideActions::default()
        },
    );
    actions.insert(
        droide,
        SideActions {
            missions_issued: 4,
            missions_completed: 4,
            ..SideActions::default()
        },
    );

    let input = ScoreInput {
        roles: &roles,
        guesses: &[],
        stats: &stats,
        actions: &actions,
    };
    let points = score(&input);
    assert_eq!(points[&romeo].role_bonus, 3); // +2 win, +1 pairing
    assert_eq!(points[&droide].role_bonus, 3); // +2 win, +1 all missions

    // One mission short, or none issued at all: no completion point.
    let mut actions = actions.clone();
    actions.insert(
        droide,
        SideActions {
            missions_issued: 4,
            missions_completed: 3,
            ..SideActions::default()
        },
    );
    let points = score(&ScoreInput { actions: &actions, ..input });
    assert_eq!(points[&droide].role_bonus, 2);

    let mut actions = actions.clone();
    actions.insert(droide, SideActions::default());
    let points = score(&ScoreInput { actions: &actions, ..input });
    assert_eq!(points[&droide].role_bonus, 2);
}

#[test]
fn totals_sum_the_three_components() {
    let fx = five_player_fixture(2);
    for b in run(&fx).values() {
        assert_eq!(b.total, b.vote_bonus + b.discovery_bonus + b.role_bonus);
    }
}
