//! Randomized role assignment, run exactly once per session at game start.

use crate::config::settings;
use crate::error::GameError;
use crate::roles::catalog::RoleId;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use uuid::Uuid;

/// Map every participant to a role.
///
/// Exactly one participant becomes the Impostor; the rest draw from a
/// shuffled pool of the remaining roles, cycling when the lobby is larger
/// than the pool. Pure: persisting the result is the caller's job.
pub fn assign(participants: &[Uuid]) -> Result<HashMap<Uuid, RoleId>, GameError> {
    let min = settings().min_players;
    if participants.len() < min {
        return Err(GameError::NotEnoughPlayers {
            min,
            max: settings().max_players,
        });
    }

    let mut rng = rand::rng();

    let mut order: Vec<Uuid> = participants.to_vec();
    order.shuffle(&mut rng);

    let mut pool: Vec<RoleId> = RoleId::ALL
        .iter()
        .copied()
        .filter(|r| *r != RoleId::Impostor)
        .collect();
    pool.shuffle(&mut rng);

    let mut assignment = HashMap::with_capacity(order.len());
    assignment.insert(order[0], RoleId::Impostor);
    for (i, pid) in order.iter().enumerate().skip(1) {
        assignment.insert(*pid, pool[(i - 1) % pool.len()]);
    }

    Ok(assignment)
}
