//! In-process combat store for tests and local development

use dashmap::DashMap;
use futures::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::combat::{Combat, Participant};

use super::{CombatStore, StoreError};

/// Combat store kept in concurrent maps. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    combats: DashMap<Uuid, Combat>,
    /// Participants per combat, in insertion order
    participants: DashMap<Uuid, Vec<Participant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CombatStore for MemoryStore {
    fn insert_combat<'a>(&'a self, combat: &'a Combat) -> BoxFuture<'a, Result<(), StoreError>> {
        self.combats.insert(combat.id, combat.clone());
        future::ready(Ok(())).boxed()
    }

    fn get_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<Option<Combat>, StoreError>> {
        let combat = self.combats.get(&combat_id).map(|c| c.clone());
        future::ready(Ok(combat)).boxed()
    }

    fn list_combats(&self, campaign_id: Uuid) -> BoxFuture<'_, Result<Vec<Combat>, StoreError>> {
        let mut combats: Vec<Combat> = self
            .combats
            .iter()
            .filter(|entry| entry.campaign_id == campaign_id)
            .map(|entry| entry.value().clone())
            .collect();
        combats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        future::ready(Ok(combats)).boxed()
    }

    fn update_combat<'a>(
        &'a self,
        combat: &'a Combat,
        expected_version: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let updated = match self.combats.get_mut(&combat.id) {
            Some(mut stored) if stored.version == expected_version => {
                *stored = combat.clone();
                true
            }
            _ => false,
        };
        future::ready(Ok(updated)).boxed()
    }

    fn delete_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        self.participants.remove(&combat_id);
        self.combats.remove(&combat_id);
        future::ready(Ok(())).boxed()
    }

    fn list_participants(
        &self,
        combat_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        let participants = self
            .participants
            .get(&combat_id)
            .map(|list| list.clone())
            .unwrap_or_default();
        future::ready(Ok(participants)).boxed()
    }

    fn insert_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.participants
            .entry(participant.combat_id)
            .or_default()
            .push(participant.clone());
        future::ready(Ok(())).boxed()
    }

    fn update_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        if let Some(mut list) = self.participants.get_mut(&participant.combat_id) {
            if let Some(stored) = list.iter_mut().find(|p| p.id == participant.id) {
                *stored = participant.clone();
            }
        }
        future::ready(Ok(())).boxed()
    }

    fn delete_participant(
        &self,
        combat_id: Uuid,
        participant_id: Uuid,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        if let Some(mut list) = self.participants.get_mut(&combat_id) {
            list.retain(|p| p.id != participant_id);
        }
        future::ready(Ok(())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(combat_id: Uuid, name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            combat_id,
            name: name.to_string(),
            character_id: None,
            order_value: 1,
            initiative_modifier: 0,
            initiative_roll: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn versioned_update_rejects_stale_writer() {
        let store = MemoryStore::new();
        let mut combat = Combat::new(Uuid::new_v4(), "Bridge".into(), String::new());
        store.insert_combat(&combat).await.unwrap();

        combat.current_round = 2;
        combat.version = 1;
        assert!(store.update_combat(&combat, 0).await.unwrap());

        combat.current_round = 3;
        combat.version = 1;
        assert!(!store.update_combat(&combat, 0).await.unwrap());

        let stored = store.get_combat(combat.id).await.unwrap().unwrap();
        assert_eq!(stored.current_round, 2);
    }

    #[tokio::test]
    async fn keeps_participants_in_insertion_order_and_deletes_cascade() {
        let store = MemoryStore::new();
        let combat = Combat::new(Uuid::new_v4(), "Crypt".into(), String::new());
        store.insert_combat(&combat).await.unwrap();

        let names = ["Ghoul", "Cleric", "Rogue"];
        for name in names {
            store
                .insert_participant(&participant(combat.id, name))
                .await
                .unwrap();
        }

        let listed = store.list_participants(combat.id).await.unwrap();
        let listed_names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(listed_names, names);

        store
            .delete_participant(combat.id, listed[1].id)
            .await
            .unwrap();
        assert_eq!(store.list_participants(combat.id).await.unwrap().len(), 2);

        store.delete_combat(combat.id).await.unwrap();
        assert!(store.get_combat(combat.id).await.unwrap().is_none());
        assert!(store.list_participants(combat.id).await.unwrap().is_empty());
    }
}
