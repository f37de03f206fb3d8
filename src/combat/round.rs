//! Round counter

use super::model::{Combat, FIRST_ROUND};
use super::sequencer::TurnAdvance;

/// Move the turn pointer and bump the round when the sequence wrapped.
/// Returns true when the round changed.
pub fn apply_advance(combat: &mut Combat, advance: TurnAdvance) -> bool {
    combat.current_participant_id = Some(advance.participant_id);
    if advance.wrapped {
        combat.current_round = combat.current_round.saturating_add(1);
    }
    advance.wrapped
}

/// Back to round one; part of restarting a combat
pub fn reset(combat: &mut Combat) {
    combat.current_round = FIRST_ROUND;
}
