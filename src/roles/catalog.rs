//! Static role catalog, loaded once and shared read-only across sessions.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Fixed enumeration of secret roles. Exactly one Impostor per session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Impostor,
    Escroc,
    Serpentin,
    SuperHero,
    DoubleFace,
    Romeo,
    Droide,
}

impl RoleId {
    pub const ALL: [RoleId; 7] = [
        RoleId::Impostor,
        RoleId::Escroc,
        RoleId::Serpentin,
        RoleId::SuperHero,
        RoleId::DoubleFace,
        RoleId::Romeo,
        RoleId::Droide,
    ];

    pub fn definition(self) -> &'static Role {
        &CATALOG[self as usize]
    }
}

/// One immutable role definition, as shown on the role card.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub objective: String,
    pub color: String,
    /// Base point value.
    pub points: i32,
}

fn role(
    id: RoleId,
    name: &str,
    description: &str,
    objective: &str,
    color: &str,
    points: i32,
) -> Role {
    Role {
        id,
        name: name.into(),
        description: description.into(),
        objective: objective.into(),
        color: color.into(),
        points,
    }
}

// Index order must match the RoleId discriminants above.
static CATALOG: Lazy<Vec<Role>> = Lazy::new(|| {
    vec![
        role(
            RoleId::Impostor,
            "Impostor",
            "Make your team lose without getting unmasked.",
            "Don't get named as the impostor after the debate",
            "#FF4444",
            100,
        ),
        role(
            RoleId::Escroc,
            "Con Artist",
            "Act as suspiciously as you can while playing clean.",
            "Get accused of being the impostor",
            "#FF44AA",
            75,
        ),
        role(
            RoleId::Serpentin,
            "Serpentin",
            "Sow doubt! Accuse the others and create confusion.",
            "Get an innocent accused",
            "#44FF44",
            75,
        ),
        role(
            RoleId::SuperHero,
            "Super Hero",
            "Carry the game openly and protect an innocent player.",
            "Defend an innocent to the very end",
            "#AA44FF",
            75,
        ),
        role(
            RoleId::DoubleFace,
            "Double Face",
            "Switch sides mid-debate. Defend, then accuse (or the reverse).",
            "Turn your coat convincingly",
            "#FFAA44",
            75,
        ),
        role(
            RoleId::Romeo,
            "Romeo",
            "Your fate is bound to a secret partner. If they fall, so do you.",
            "Honor the pairing rule until the end of the match",
            "#FF8888",
            75,
        ),
        role(
            RoleId::Droide,
            "Droid",
            "Follow the secret missions you receive during the match.",
            "Complete every mission without being noticed",
            "#44AAFF",
            75,
        ),
    ]
});

pub fn catalog() -> &'static [Role] {
    &CATALOG
}
