//! Combat tracking: participants, turn order, rounds and lifecycle

pub mod error;
pub mod model;
pub mod round;
pub mod sequencer;
pub mod service;

use serde::{Deserialize, Serialize};

pub use error::CombatError;
pub use model::{Combat, CombatSnapshot, CombatStatus, NewParticipant, Participant};
pub use service::{CombatService, TurnOutcome};

/// Acting role, passed explicitly into every lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The "MJ": creates, ends and deletes combats
    GameMaster,
    Player,
}

impl Role {
    /// Map a role claim to a role. Unknown or absent claims are players.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
            Some("mj" | "gm" | "game_master") => Role::GameMaster,
            _ => Role::Player,
        }
    }

    pub fn is_game_master(self) -> bool {
        self == Role::GameMaster
    }
}
