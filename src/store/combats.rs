//! Combat tables on Supabase

use futures::future::{BoxFuture, FutureExt};
use uuid::Uuid;

use crate::combat::{Combat, Participant};

use super::supabase::SupabaseClient;
use super::{CombatStore, StoreError};

const COMBATS: &str = "combats";
const PARTICIPANTS: &str = "combat_participants";

/// Combat store backed by PostgREST
#[derive(Clone)]
pub struct SupabaseCombatStore {
    client: SupabaseClient,
}

impl SupabaseCombatStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

impl CombatStore for SupabaseCombatStore {
    fn insert_combat<'a>(&'a self, combat: &'a Combat) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.client
                .insert::<_, serde_json::Value>(COMBATS, combat)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn get_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<Option<Combat>, StoreError>> {
        async move {
            let query = format!("id=eq.{}", combat_id);
            Ok(self.client.get_one(COMBATS, &query).await?)
        }
        .boxed()
    }

    fn list_combats(&self, campaign_id: Uuid) -> BoxFuture<'_, Result<Vec<Combat>, StoreError>> {
        async move {
            let query = format!("campaign_id=eq.{}&order=created_at.desc", campaign_id);
            Ok(self.client.get(COMBATS, &query).await?)
        }
        .boxed()
    }

    fn update_combat<'a>(
        &'a self,
        combat: &'a Combat,
        expected_version: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            let query = format!("id=eq.{}&version=eq.{}", combat.id, expected_version);
            let rows: Vec<serde_json::Value> = self
                .client
                .update_returning(COMBATS, &query, combat)
                .await?;
            Ok(!rows.is_empty())
        }
        .boxed()
    }

    fn delete_combat(&self, combat_id: Uuid) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            self.client
                .delete(PARTICIPANTS, &format!("combat_id=eq.{}", combat_id))
                .await?;
            self.client
                .delete(COMBATS, &format!("id=eq.{}", combat_id))
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn list_participants(
        &self,
        combat_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        async move {
            let query = format!("combat_id=eq.{}&order=created_at.asc,id.asc", combat_id);
            Ok(self.client.get(PARTICIPANTS, &query).await?)
        }
        .boxed()
    }

    fn insert_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.client
                .insert::<_, serde_json::Value>(PARTICIPANTS, participant)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn update_participant<'a>(
        &'a self,
        participant: &'a Participant,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let query = format!("id=eq.{}", participant.id);
            self.client.update(PARTICIPANTS, &query, participant).await?;
            Ok(())
        }
        .boxed()
    }

    fn delete_participant(
        &self,
        combat_id: Uuid,
        participant_id: Uuid,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let query = format!("id=eq.{}&combat_id=eq.{}", participant_id, combat_id);
            self.client.delete(PARTICIPANTS, &query).await?;
            Ok(())
        }
        .boxed()
    }
}
