//! Combat lifecycle
//!
//! Every mutation is a read-modify-write: load the combat and its
//! participants, recompute turn and round, write the combat row (guarded by
//! its version), write the touched participant rows, then publish. Publish
//! failures are logged and never fail the mutation.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dice::{DiceExpr, DiceRoller, MAX_MODIFIER};
use crate::realtime::{CombatEvent, EventKind, Publisher};
use crate::store::CombatStore;

use super::error::CombatError;
use super::model::{channel_for, Combat, CombatSnapshot, NewParticipant, Participant};
use super::round;
use super::sequencer::{first_active, next_turn};
use super::Role;

/// Longest accepted combat or participant name
const MAX_NAME_LEN: usize = 120;

/// Result of advancing the turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    #[serde(flatten)]
    pub snapshot: CombatSnapshot,
    pub wrapped: bool,
}

/// Pointer/round movement caused by a participant mutation
#[derive(Debug, Default, Clone, Copy)]
struct TurnShift {
    pointer_moved: bool,
    round_changed: bool,
}

pub struct CombatService {
    store: Arc<dyn CombatStore>,
    publisher: Arc<dyn Publisher>,
    dice: Arc<DiceRoller>,
    gm_only_turn_advance: bool,
}

impl CombatService {
    pub fn new(
        store: Arc<dyn CombatStore>,
        publisher: Arc<dyn Publisher>,
        dice: Arc<DiceRoller>,
        gm_only_turn_advance: bool,
    ) -> Self {
        Self {
            store,
            publisher,
            dice,
            gm_only_turn_advance,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get(&self, combat_id: Uuid) -> Result<CombatSnapshot, CombatError> {
        let (combat, participants) = self.load(combat_id).await?;
        Ok(CombatSnapshot::new(combat, participants))
    }

    pub async fn list(&self, campaign_id: Uuid) -> Result<Vec<Combat>, CombatError> {
        Ok(self.store.list_combats(campaign_id).await?)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn create(
        &self,
        role: Role,
        campaign_id: Uuid,
        name: &str,
        description: &str,
    ) -> Result<Combat, CombatError> {
        require_game_master(role, "create a combat")?;
        let name = validate_name(name)?;

        let combat = Combat::new(campaign_id, name, description.trim().to_string());
        self.store.insert_combat(&combat).await?;

        info!(combat_id = %combat.id, campaign_id = %campaign_id, "Combat created");
        Ok(combat)
    }

    pub async fn end(&self, role: Role, combat_id: Uuid) -> Result<Combat, CombatError> {
        require_game_master(role, "end a combat")?;
        let mut combat = self.load_combat(combat_id).await?;
        ensure_active(&combat)?;

        combat.is_active = false;
        self.commit(&mut combat).await?;

        info!(combat_id = %combat_id, round = combat.current_round, "Combat ended");
        self.emit(
            combat_id,
            EventKind::CombatEnd,
            json!({ "round": combat.current_round, "deleted": false }),
        )
        .await;
        Ok(combat)
    }

    /// Round back to one, turn back to the first active participant
    pub async fn restart(&self, role: Role, combat_id: Uuid) -> Result<CombatSnapshot, CombatError> {
        require_game_master(role, "restart a combat")?;
        let (mut combat, participants) = self.load_active(combat_id).await?;

        round::reset(&mut combat);
        combat.current_participant_id = first_active(&participants);
        self.commit(&mut combat).await?;

        info!(combat_id = %combat_id, "Combat restarted");
        self.emit_turn_shift(
            &combat,
            TurnShift {
                pointer_moved: true,
                round_changed: true,
            },
        )
        .await;
        Ok(CombatSnapshot::new(combat, participants))
    }

    pub async fn delete(&self, role: Role, combat_id: Uuid) -> Result<(), CombatError> {
        require_game_master(role, "delete a combat")?;
        let combat = self.load_combat(combat_id).await?;

        self.store.delete_combat(combat_id).await?;

        info!(combat_id = %combat_id, "Combat deleted");
        self.emit(
            combat_id,
            EventKind::CombatEnd,
            json!({ "round": combat.current_round, "deleted": true }),
        )
        .await;
        Ok(())
    }

    // ========================================================================
    // Turn tracking
    // ========================================================================

    pub async fn advance_turn(&self, role: Role, combat_id: Uuid) -> Result<TurnOutcome, CombatError> {
        if self.gm_only_turn_advance {
            require_game_master(role, "advance the turn")?;
        }
        let (mut combat, participants) = self.load_active(combat_id).await?;

        let advance = next_turn(&participants, combat.current_participant_id)
            .ok_or(CombatError::EmptyActiveSet(combat_id))?;
        let wrapped = round::apply_advance(&mut combat, advance);
        self.commit(&mut combat).await?;

        self.emit_turn_shift(
            &combat,
            TurnShift {
                pointer_moved: true,
                round_changed: wrapped,
            },
        )
        .await;

        let snapshot = CombatSnapshot::new(combat, participants);
        debug!(
            combat_id = %combat_id,
            participant = snapshot.current().map(|p| p.name.as_str()).unwrap_or_default(),
            round = snapshot.combat.current_round,
            wrapped,
            role = ?role,
            "Turn advanced"
        );
        Ok(TurnOutcome { snapshot, wrapped })
    }

    /// Roll 1d20 + modifier for everyone and renumber the turn order from the
    /// results, highest first
    pub async fn roll_initiative(
        &self,
        role: Role,
        combat_id: Uuid,
    ) -> Result<CombatSnapshot, CombatError> {
        require_game_master(role, "roll initiative")?;
        let (mut combat, mut participants) = self.load_active(combat_id).await?;

        let mut ranking: Vec<(i32, usize)> = participants
            .iter_mut()
            .enumerate()
            .map(|(index, participant)| {
                let roll = self
                    .dice
                    .roll(&DiceExpr::D20.with_modifier(participant.initiative_modifier));
                let total = i32::try_from(roll.total).unwrap_or(i32::MAX);
                participant.initiative_roll = Some(total);
                (total, index)
            })
            .collect();
        // Stable, so equal rolls keep insertion order
        ranking.sort_by(|a, b| b.0.cmp(&a.0));

        for (order_value, (_, index)) in (1..).zip(ranking) {
            participants[index].order_value = order_value;
        }

        combat.current_participant_id = first_active(&participants);
        self.commit(&mut combat).await?;
        for participant in &participants {
            self.store.update_participant(participant).await?;
        }

        info!(combat_id = %combat_id, participants = participants.len(), "Initiative rolled");
        let snapshot = CombatSnapshot::new(combat, participants);
        self.emit(
            combat_id,
            EventKind::ParticipantUpdate,
            json!({ "action": "initiative", "participants": &snapshot.participants }),
        )
        .await;
        self.emit_turn_shift(
            &snapshot.combat,
            TurnShift {
                pointer_moved: true,
                round_changed: false,
            },
        )
        .await;
        Ok(snapshot)
    }

    // ========================================================================
    // Participants
    // ========================================================================

    pub async fn add_participant(
        &self,
        role: Role,
        combat_id: Uuid,
        new: NewParticipant,
    ) -> Result<CombatSnapshot, CombatError> {
        let (mut combat, mut participants) = self.load_active(combat_id).await?;
        let name = validate_name(&new.name)?;

        if !(-MAX_MODIFIER..=MAX_MODIFIER).contains(&new.initiative_modifier) {
            return Err(CombatError::Validation(format!(
                "initiative modifier {} is out of range",
                new.initiative_modifier
            )));
        }

        let order_value = match new.order_value {
            Some(value) => {
                ensure_order_free(&participants, None, value)?;
                value
            }
            None => next_order_value(&participants)?,
        };

        let participant = Participant {
            id: Uuid::new_v4(),
            combat_id,
            name,
            character_id: new.character_id,
            order_value,
            initiative_modifier: new.initiative_modifier,
            initiative_roll: None,
            is_active: new.is_active,
            created_at: Utc::now(),
        };

        let mut shift = TurnShift::default();
        if participant.is_active && !points_at_active(&combat, &participants) {
            combat.current_participant_id = Some(participant.id);
            shift.pointer_moved = true;
        }

        self.commit(&mut combat).await?;
        self.store.insert_participant(&participant).await?;

        debug!(
            combat_id = %combat_id,
            participant_id = %participant.id,
            order_value,
            role = ?role,
            "Participant added"
        );
        self.emit(
            combat_id,
            EventKind::ParticipantUpdate,
            json!({ "action": "added", "participant": &participant }),
        )
        .await;
        self.emit_turn_shift(&combat, shift).await;

        participants.push(participant);
        Ok(CombatSnapshot::new(combat, participants))
    }

    pub async fn remove_participant(
        &self,
        role: Role,
        combat_id: Uuid,
        participant_id: Uuid,
    ) -> Result<CombatSnapshot, CombatError> {
        let (mut combat, mut participants) = self.load_active(combat_id).await?;
        let index = position_of(&participants, participant_id)?;

        let mut shift = TurnShift::default();
        if combat.current_participant_id == Some(participant_id) {
            // Sequence from the leaving participant's slot without selecting it
            let mut anchored = participants.clone();
            anchored[index].is_active = false;
            match next_turn(&anchored, Some(participant_id)) {
                Some(advance) => shift.round_changed = round::apply_advance(&mut combat, advance),
                None => combat.current_participant_id = None,
            }
            shift.pointer_moved = true;
        }
        participants.remove(index);

        self.commit(&mut combat).await?;
        self.store
            .delete_participant(combat_id, participant_id)
            .await?;

        debug!(
            combat_id = %combat_id,
            participant_id = %participant_id,
            role = ?role,
            "Participant removed"
        );
        self.emit(
            combat_id,
            EventKind::ParticipantUpdate,
            json!({ "action": "removed", "participantId": participant_id }),
        )
        .await;
        self.emit_turn_shift(&combat, shift).await;

        Ok(CombatSnapshot::new(combat, participants))
    }

    /// Flip a participant's active flag. Deactivating the current participant
    /// passes the turn on immediately.
    pub async fn toggle_active(
        &self,
        role: Role,
        combat_id: Uuid,
        participant_id: Uuid,
    ) -> Result<CombatSnapshot, CombatError> {
        let (mut combat, mut participants) = self.load_active(combat_id).await?;
        let index = position_of(&participants, participant_id)?;

        participants[index].is_active = !participants[index].is_active;
        let now_active = participants[index].is_active;

        let mut shift = TurnShift::default();
        if now_active {
            // An empty or parked pointer goes to whoever came back
            if !points_at_active(&combat, &participants) {
                combat.current_participant_id = Some(participant_id);
                shift.pointer_moved = true;
            }
        } else if combat.current_participant_id == Some(participant_id) {
            // Nobody left to take the turn: the pointer stays put
            if let Some(advance) = next_turn(&participants, Some(participant_id)) {
                shift.round_changed = round::apply_advance(&mut combat, advance);
                shift.pointer_moved = true;
            }
        }

        self.commit(&mut combat).await?;
        self.store.update_participant(&participants[index]).await?;

        debug!(
            combat_id = %combat_id,
            participant_id = %participant_id,
            is_active = now_active,
            role = ?role,
            "Participant toggled"
        );
        self.emit(
            combat_id,
            EventKind::ParticipantUpdate,
            json!({ "action": "toggled", "participant": &participants[index] }),
        )
        .await;
        self.emit_turn_shift(&combat, shift).await;

        Ok(CombatSnapshot::new(combat, participants))
    }

    /// Explicit re-sort of one participant
    pub async fn set_order(
        &self,
        role: Role,
        combat_id: Uuid,
        participant_id: Uuid,
        order_value: i32,
    ) -> Result<CombatSnapshot, CombatError> {
        let (mut combat, mut participants) = self.load_active(combat_id).await?;
        let index = position_of(&participants, participant_id)?;
        ensure_order_free(&participants, Some(participant_id), order_value)?;

        participants[index].order_value = order_value;

        self.commit(&mut combat).await?;
        self.store.update_participant(&participants[index]).await?;

        debug!(
            combat_id = %combat_id,
            participant_id = %participant_id,
            order_value,
            role = ?role,
            "Participant reordered"
        );
        self.emit(
            combat_id,
            EventKind::ParticipantUpdate,
            json!({ "action": "reordered", "participant": &participants[index] }),
        )
        .await;

        Ok(CombatSnapshot::new(combat, participants))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn load_combat(&self, combat_id: Uuid) -> Result<Combat, CombatError> {
        self.store
            .get_combat(combat_id)
            .await?
            .ok_or_else(|| CombatError::combat_not_found(combat_id))
    }

    async fn load(&self, combat_id: Uuid) -> Result<(Combat, Vec<Participant>), CombatError> {
        let combat = self.load_combat(combat_id).await?;
        let participants = self.store.list_participants(combat_id).await?;
        Ok((combat, participants))
    }

    /// Load a combat that still accepts mutations
    async fn load_active(
        &self,
        combat_id: Uuid,
    ) -> Result<(Combat, Vec<Participant>), CombatError> {
        let (combat, participants) = self.load(combat_id).await?;
        ensure_active(&combat)?;
        Ok((combat, participants))
    }

    /// Write the combat row if nobody else wrote it since it was loaded
    async fn commit(&self, combat: &mut Combat) -> Result<(), CombatError> {
        let expected = combat.version;
        combat.version += 1;
        combat.updated_at = Utc::now();

        if self.store.update_combat(combat, expected).await? {
            Ok(())
        } else {
            warn!(combat_id = %combat.id, version = expected, "Lost concurrent combat update");
            Err(CombatError::Conflict(combat.id))
        }
    }

    async fn emit(&self, combat_id: Uuid, kind: EventKind, data: serde_json::Value) {
        let event = CombatEvent {
            combat_id,
            kind,
            data,
        };
        let channel = channel_for(combat_id);

        if let Err(e) = self.publisher.publish(&channel, &event).await {
            warn!(
                combat_id = %combat_id,
                event_type = kind.as_str(),
                error = %e,
                "Failed to publish combat event"
            );
        }
    }

    async fn emit_turn_shift(&self, combat: &Combat, shift: TurnShift) {
        if shift.pointer_moved {
            self.emit(
                combat.id,
                EventKind::TurnChange,
                json!({
                    "currentParticipantId": combat.current_participant_id,
                    "round": combat.current_round,
                }),
            )
            .await;
        }
        if shift.round_changed {
            self.emit(
                combat.id,
                EventKind::RoundChange,
                json!({ "round": combat.current_round }),
            )
            .await;
        }
    }
}

fn require_game_master(role: Role, action: &'static str) -> Result<(), CombatError> {
    if role.is_game_master() {
        Ok(())
    } else {
        Err(CombatError::Forbidden(action))
    }
}

fn ensure_active(combat: &Combat) -> Result<(), CombatError> {
    if combat.is_active {
        Ok(())
    } else {
        Err(CombatError::Ended(combat.id))
    }
}

fn validate_name(raw: &str) -> Result<String, CombatError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CombatError::Validation("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CombatError::Validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn points_at_active(combat: &Combat, participants: &[Participant]) -> bool {
    combat
        .current_participant_id
        .and_then(|current| participants.iter().find(|p| p.id == current))
        .is_some_and(|p| p.is_active)
}

fn position_of(participants: &[Participant], participant_id: Uuid) -> Result<usize, CombatError> {
    participants
        .iter()
        .position(|p| p.id == participant_id)
        .ok_or_else(|| CombatError::participant_not_found(participant_id))
}

fn ensure_order_free(
    participants: &[Participant],
    except: Option<Uuid>,
    order_value: i32,
) -> Result<(), CombatError> {
    let taken = participants
        .iter()
        .any(|p| Some(p.id) != except && p.order_value == order_value);
    if taken {
        Err(CombatError::Validation(format!(
            "order value {} is already taken",
            order_value
        )))
    } else {
        Ok(())
    }
}

/// One past the highest order value in use
fn next_order_value(participants: &[Participant]) -> Result<i32, CombatError> {
    match participants.iter().map(|p| p.order_value).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            CombatError::Validation("order values are exhausted, set one explicitly".into())
        }),
    }
}
