//! Turn sequencing over a participant snapshot
//!
//! Participants are expected in insertion order, which is how both stores
//! return them. The turn key is `(order_value, insertion index)`, so duplicate
//! order values resolve to whoever was added first.

use uuid::Uuid;

use super::model::Participant;

/// Result of moving the turn pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnAdvance {
    pub participant_id: Uuid,
    /// The sequence cycled back to its first active participant
    pub wrapped: bool,
}

type TurnKey = (i32, usize);

fn active_keys(participants: &[Participant]) -> impl Iterator<Item = (TurnKey, Uuid)> + '_ {
    participants
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_active)
        .map(|(index, p)| ((p.order_value, index), p.id))
}

fn key_of(participants: &[Participant], id: Uuid) -> Option<TurnKey> {
    participants
        .iter()
        .position(|p| p.id == id)
        .map(|index| (participants[index].order_value, index))
}

/// First active participant in turn order
pub fn first_active(participants: &[Participant]) -> Option<Uuid> {
    active_keys(participants)
        .min_by_key(|(key, _)| *key)
        .map(|(_, id)| id)
}

/// Compute the participant whose turn follows `current`.
///
/// Returns `None` when nobody is active. A missing or unknown `current`
/// starts the sequence at the first active participant without wrapping.
pub fn next_turn(participants: &[Participant], current: Option<Uuid>) -> Option<TurnAdvance> {
    let first = first_active(participants)?;

    let Some(current_key) = current.and_then(|id| key_of(participants, id)) else {
        return Some(TurnAdvance {
            participant_id: first,
            wrapped: false,
        });
    };

    let next = active_keys(participants)
        .filter(|(key, _)| *key > current_key)
        .min_by_key(|(key, _)| *key);

    Some(match next {
        Some((_, participant_id)) => TurnAdvance {
            participant_id,
            wrapped: false,
        },
        None => TurnAdvance {
            participant_id: first,
            wrapped: true,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(name: &str, order_value: i32, is_active: bool) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            combat_id: Uuid::nil(),
            name: name.to_string(),
            character_id: None,
            order_value,
            initiative_modifier: 0,
            initiative_roll: None,
            is_active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn skips_inactive_and_wraps() {
        let a = participant("A", 1, true);
        let b = participant("B", 2, true);
        let c = participant("C", 3, false);
        let all = vec![a.clone(), b.clone(), c];

        let step = next_turn(&all, Some(a.id)).unwrap();
        assert_eq!(step, TurnAdvance { participant_id: b.id, wrapped: false });

        let step = next_turn(&all, Some(b.id)).unwrap();
        assert_eq!(step, TurnAdvance { participant_id: a.id, wrapped: true });
    }

    #[test]
    fn single_active_participant_always_wraps() {
        let a = participant("A", 5, true);
        let all = vec![participant("X", 1, false), a.clone()];

        for _ in 0..3 {
            let step = next_turn(&all, Some(a.id)).unwrap();
            assert_eq!(step.participant_id, a.id);
            assert!(step.wrapped);
        }
    }

    #[test]
    fn insertion_order_does_not_matter_for_distinct_orders() {
        let a = participant("A", 10, true);
        let b = participant("B", 2, true);
        let c = participant("C", 7, true);
        let all = vec![a.clone(), b.clone(), c.clone()];

        assert_eq!(first_active(&all), Some(b.id));
        assert_eq!(next_turn(&all, Some(b.id)).unwrap().participant_id, c.id);
        assert_eq!(next_turn(&all, Some(c.id)).unwrap().participant_id, a.id);
        assert!(next_turn(&all, Some(a.id)).unwrap().wrapped);
    }

    #[test]
    fn duplicate_orders_follow_insertion_order() {
        let a = participant("A", 1, true);
        let b = participant("B", 1, true);
        let c = participant("C", 1, true);
        let all = vec![a.clone(), b.clone(), c.clone()];

        assert_eq!(next_turn(&all, Some(a.id)).unwrap().participant_id, b.id);
        assert_eq!(next_turn(&all, Some(b.id)).unwrap().participant_id, c.id);
        let step = next_turn(&all, Some(c.id)).unwrap();
        assert_eq!(step.participant_id, a.id);
        assert!(step.wrapped);
    }

    #[test]
    fn inactive_current_still_anchors_position() {
        let a = participant("A", 1, true);
        let b = participant("B", 2, false);
        let c = participant("C", 3, true);
        let all = vec![a, b.clone(), c.clone()];

        let step = next_turn(&all, Some(b.id)).unwrap();
        assert_eq!(step, TurnAdvance { participant_id: c.id, wrapped: false });
    }

    #[test]
    fn missing_pointer_starts_at_first_active() {
        let a = participant("A", 1, false);
        let b = participant("B", 2, true);
        let all = vec![a, b.clone()];

        let fresh = next_turn(&all, None).unwrap();
        assert_eq!(fresh, TurnAdvance { participant_id: b.id, wrapped: false });

        let dangling = next_turn(&all, Some(Uuid::new_v4())).unwrap();
        assert_eq!(dangling, fresh);
    }

    #[test]
    fn no_active_participant_is_a_no_op() {
        let a = participant("A", 1, false);
        let all = vec![a.clone()];

        assert!(next_turn(&all, Some(a.id)).is_none());
        assert!(next_turn(&[], None).is_none());
    }
}
