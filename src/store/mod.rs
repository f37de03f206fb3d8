//! Persistence for combats and their participants

pub mod combats;
#[cfg(test)]
pub mod faulty;
pub mod memory;
pub mod supabase;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::combat::{Combat, Participant};

pub use combats::SupabaseCombatStore;
pub use memory::MemoryStore;
pub use supabase::{SupabaseClient, SupabaseError};

/// Row-level access to combats and participants.
///
/// Participant listings come back in insertion order; the turn sequencer
/// relies on it for tie-breaking.
pub trait CombatStore: Send + Sync {
    fn insert_combat<'a>(&'a self, combat: &'a Combat) -> BoxFuture<'a, Result<(), StoreError>>;

    fn get_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<Option<Combat>, StoreError>>;

    /// Combats of a campaign, newest first
    fn list_combats(&self, campaign_id: Uuid) -> BoxFuture<'_, Result<Vec<Combat>, StoreError>>;

    /// Overwrite the combat row if its stored version is still
    /// `expected_version`. Returns false when another writer got there first.
    fn update_combat<'a>(
        &'a self,
        combat: &'a Combat,
        expected_version: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Remove a combat together with all of its participants
    fn delete_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>>;

    fn list_participants(
        &self,
        combat_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>>;

    fn insert_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    fn update_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    fn delete_participant(
        &self,
        combat_id: Uuid,
        participant_id: Uuid,
    ) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Supabase(#[from] SupabaseError),
}
