//! Store double that injects failures in front of a memory store

use futures::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::combat::{Combat, Participant};

use super::{CombatStore, MemoryStore, StoreError, SupabaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every call fails as if the database were down
    Unavailable,
    /// Combat updates always lose the version race
    LostRace,
}

pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: MemoryStore::new(),
            fault,
        }
    }

    fn down<'a, T: Send + 'a>(&self) -> Option<BoxFuture<'a, Result<T, StoreError>>> {
        (self.fault == Fault::Unavailable).then(|| {
            future::ready(Err(StoreError::Supabase(SupabaseError::Api {
                status: 503,
                body: "database unavailable".into(),
            })))
            .boxed()
        })
    }
}

impl CombatStore for FaultyStore {
    fn insert_combat<'a>(&'a self, combat: &'a Combat) -> BoxFuture<'a, Result<(), StoreError>> {
        self.down().unwrap_or_else(|| self.inner.insert_combat(combat))
    }

    fn get_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<Option<Combat>, StoreError>> {
        self.down().unwrap_or_else(|| self.inner.get_combat(combat_id))
    }

    fn list_combats(&self, campaign_id: Uuid) -> BoxFuture<'_, Result<Vec<Combat>, StoreError>> {
        self.down().unwrap_or_else(|| self.inner.list_combats(campaign_id))
    }

    fn update_combat<'a>(
        &'a self,
        combat: &'a Combat,
        expected_version: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        match self.fault {
            Fault::LostRace => future::ready(Ok(false)).boxed(),
            Fault::Unavailable => self
                .down()
                .unwrap_or_else(|| self.inner.update_combat(combat, expected_version)),
        }
    }

    fn delete_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        self.down().unwrap_or_else(|| self.inner.delete_combat(combat_id))
    }

    fn list_participants(
        &self,
        combat_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        self.down()
            .unwrap_or_else(|| self.inner.list_participants(combat_id))
    }

    fn insert_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.down()
            .unwrap_or_else(|| self.inner.insert_participant(participant))
    }

    fn update_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.down()
            .unwrap_or_else(|| self.inner.update_participant(participant))
    }

    fn delete_participant(
        &self,
        combat_id: Uuid,
        participant_id: Uuid,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        self.down()
            .unwrap_or_else(|| self.inner.delete_participant(combat_id, participant_id))
    }
}
