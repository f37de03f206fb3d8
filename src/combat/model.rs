//! Combat and participant records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First round of every combat
pub const FIRST_ROUND: u32 = 1;

/// Lifecycle state derived from the `is_active` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStatus {
    Active,
    Ended,
}

/// One combat encounter (row in `combats`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combat {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: bool,
    pub current_round: u32,
    /// Turn pointer
    pub current_participant_id: Option<Uuid>,
    /// Bumped on every write; guards against lost updates
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Combat {
    pub fn new(campaign_id: Uuid, name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            name,
            description,
            is_active: true,
            current_round: FIRST_ROUND,
            current_participant_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> CombatStatus {
        if self.is_active {
            CombatStatus::Active
        } else {
            CombatStatus::Ended
        }
    }
}

/// Channel name that subscribers of a combat listen on
pub fn channel_for(combat_id: Uuid) -> String {
    format!("combat:{}", combat_id)
}

/// A combatant inside one combat (row in `combat_participants`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub combat_id: Uuid,
    pub name: String,
    /// Linked character sheet, if the participant is a player character
    pub character_id: Option<Uuid>,
    /// Turn order key, ascending
    pub order_value: i32,
    #[serde(default)]
    pub initiative_modifier: i32,
    pub initiative_roll: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a participant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewParticipant {
    pub name: String,
    #[serde(default)]
    pub character_id: Option<Uuid>,
    /// Explicit order value; the next unused one is taken when absent
    #[serde(default)]
    pub order_value: Option<i32>,
    #[serde(default)]
    pub initiative_modifier: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
impl NewParticipant {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order_value: i32) -> Self {
        self.order_value = Some(order_value);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Sort insertion-ordered participants into turn order. The sort is stable,
/// so equal order values keep insertion order.
pub fn sort_turn_order(participants: &mut [Participant]) {
    participants.sort_by_key(|p| p.order_value);
}

/// Combat together with its participants in turn order
#[derive(Debug, Clone, Serialize)]
pub struct CombatSnapshot {
    #[serde(flatten)]
    pub combat: Combat,
    pub status: CombatStatus,
    pub participants: Vec<Participant>,
}

impl CombatSnapshot {
    pub fn new(combat: Combat, mut participants: Vec<Participant>) -> Self {
        sort_turn_order(&mut participants);
        Self {
            status: combat.status(),
            combat,
            participants,
        }
    }

    /// Participant holding the turn
    pub fn current(&self) -> Option<&Participant> {
        let id = self.combat.current_participant_id?;
        self.participants.iter().find(|p| p.id == id)
    }
}
