//! Combat lifecycle errors

use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Combat {0} has ended")]
    Ended(Uuid),

    #[error("Combat {0} has no active participants")]
    EmptyActiveSet(Uuid),

    #[error("Only the game master may {0}")]
    Forbidden(&'static str),

    #[error("Combat {0} was modified concurrently, reload and retry")]
    Conflict(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CombatError {
    pub fn combat_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Combat",
            id,
        }
    }

    pub fn participant_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Participant",
            id,
        }
    }
}
