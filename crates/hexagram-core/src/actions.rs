//! Match actions and the events they produce.
//!
//! This module defines every move a seat can make and the events emitted to
//! observers as the match advances.

use crate::catalog::CardId;
use crate::game::{Direction, MatchError};
use crate::ledger::PermanentScoreChange;
use crate::player::SeatId;
use serde::{Deserialize, Serialize};

/// A move made by the active seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchAction {
    /// Play a card from hand onto the face-up card
    Play(CardId),
    /// Draw one card; the turn does not pass
    Draw,
}

/// Discrete steps of a match, broadcast to observers as they happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Cards were dealt and a round began
    RoundStarted { round: u32, face_up: CardId },

    /// A computer seat (or the assist on the human's behalf) is deciding
    BotThinking { seat: SeatId },

    /// A card was played and is now face up
    CardPlayed {
        seat: SeatId,
        card: CardId,
        covered: CardId,
    },

    /// A reversal flipped the direction of play
    DirectionChanged { seat: SeatId, direction: Direction },

    /// A seat drew a card
    CardDrawn { seat: SeatId, card: CardId },

    /// The discard pile was shuffled back into the deck
    DeckReshuffled { cards: usize },

    /// A draw found no card anywhere; the seat's turn passes
    DrawExhausted { seat: SeatId },

    /// The opponent policy gave up drawing after too many attempts
    SafetyCapReached { seat: SeatId, attempts: u32 },

    /// The turn moved to another seat
    TurnAdvanced { from: SeatId, to: SeatId },

    /// A seat emptied its hand; every other seat lost battle points
    RoundFinished {
        winner: SeatId,
        /// (seat, battle points lost)
        penalties: Vec<(SeatId, i32)>,
    },

    /// A battle score fell to zero or below; the match is over
    MatchFinished {
        winners: Vec<SeatId>,
        eliminated: Vec<SeatId>,
    },

    /// Permanent scores were written to the ledger
    ScoresSettled { changes: Vec<PermanentScoreChange> },
}

/// Accept/reject summary of an engine call, for callers that only need a flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl ActionOutcome {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(error: &MatchError) -> Self {
        Self {
            accepted: false,
            reason: Some(error.to_string()),
        }
    }
}

impl<T> From<&Result<T, MatchError>> for ActionOutcome {
    fn from(result: &Result<T, MatchError>) -> Self {
        match result {
            Ok(_) => ActionOutcome::accepted(),
            Err(e) => ActionOutcome::rejected(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: Result<Vec<MatchEvent>, MatchError> = Ok(vec![]);
        assert_eq!(ActionOutcome::from(&ok), ActionOutcome::accepted());

        let err: Result<Vec<MatchEvent>, MatchError> = Err(MatchError::AssistMisuse);
        let outcome = ActionOutcome::from(&err);
        assert!(!outcome.accepted);
        assert_eq!(outcome.reason.as_deref(), Some("AI assist is only available to the human seat"));
    }

    #[test]
    fn test_action_json_uses_card_keys() {
        let action = MatchAction::Play(CardId::from_key("fire_water_weiji").unwrap());
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"Play":"fire_water_weiji"}"#);
    }
}
