//! Barge-in Controller (spec component C7, §4.7).
//!
//! Binds to the VAD gate's `speech-start` event for a session and aborts
//! the in-flight turn so a new utterance can start immediately.

use std::sync::Mutex;

use vgw_core::cancel::AbortToken;
use vgw_core::domain::turn_event::TurnEvent;

/// Tracks the abort token and active-TTS flag for the turn currently
/// running on a connection.
#[derive(Default)]
pub struct BargeInController {
    active_turn: Mutex<Option<AbortToken>>,
}

impl BargeInController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the abort token for a turn about to start, replacing any
    /// prior (already-finished) one.
    pub fn begin_turn(&self, abort: AbortToken) {
        *self.active_turn.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(abort);
    }

    /// Clear the active turn once it has finished, successfully or not.
    pub fn end_turn(&self) {
        *self.active_turn.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// Called on `speech-start` while a turn may be speaking (spec §4.7):
    /// cancels the active turn's abort token so its LLM/TTS loops and the
    /// outbound pacer exit at their next check point. Emits `TTSCancelled`
    /// if a turn was actually active; otherwise this is a no-op (the prior
    /// turn already finished before barge-in was detected).
    pub fn barge_in(&self, on_event: &mut (dyn FnMut(TurnEvent) + Send)) {
        let had_active = {
            let guard = self.active_turn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(token) = guard.as_ref() {
                token.cancel();
                true
            } else {
                false
            }
        };
        if had_active {
            on_event(TurnEvent::TtsCancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barge_in_cancels_the_active_turns_token() {
        let controller = BargeInController::new();
        let token = AbortToken::new();
        controller.begin_turn(token.clone());

        let mut events = Vec::new();
        controller.barge_in(&mut |e| events.push(e));

        assert!(token.is_cancelled());
        assert!(matches!(events.last(), Some(TurnEvent::TtsCancelled)));
    }

    #[test]
    fn barge_in_with_no_active_turn_is_a_no_op() {
        let controller = BargeInController::new();
        let mut events = Vec::new();
        controller.barge_in(&mut |e| events.push(e));
        assert!(events.is_empty());
    }

    #[test]
    fn ending_a_turn_prevents_a_late_barge_in_from_firing() {
        let controller = BargeInController::new();
        let token = AbortToken::new();
        controller.begin_turn(token.clone());
        controller.end_turn();

        let mut events = Vec::new();
        controller.barge_in(&mut |e| events.push(e));

        assert!(!token.is_cancelled());
        assert!(events.is_empty());
    }
}
