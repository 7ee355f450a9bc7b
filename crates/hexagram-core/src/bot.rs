//! Opponent policy for the computer seats.
//!
//! Every computer turn follows the same priority:
//! - Reversal: play the first card in hand that swaps the face-up elements
//! - Match: otherwise play the first card sharing an element
//! - Draw: otherwise keep drawing until a drawn card matches, then play it
//!
//! The AI assist runs the same policy on behalf of the human seat.

use crate::actions::{MatchAction, MatchEvent};
use crate::catalog::CardId;
use crate::game::{MatchError, MatchState};
use crate::player::SeatId;
use crate::rules;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Non-matching draws allowed before a computer turn gives up
pub const MAX_DRAW_ATTEMPTS: u32 = 15;

/// What the policy does with its hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDecision {
    Play(CardId),
    Draw,
}

/// Choose a move for `hand` against `face_up`
pub fn decide(hand: &[CardId], face_up: CardId) -> BotDecision {
    if let Some(&card) = hand.iter().find(|&&c| rules::reverses(c, face_up)) {
        return BotDecision::Play(card);
    }
    if let Some(&card) = hand.iter().find(|&&c| rules::can_play(c, face_up)) {
        return BotDecision::Play(card);
    }
    BotDecision::Draw
}

/// A policy player bound to one seat
#[derive(Debug, Clone)]
pub struct Bot {
    pub seat: SeatId,
    max_draw_attempts: u32,
}

impl Bot {
    pub fn new(seat: SeatId) -> Self {
        Self {
            seat,
            max_draw_attempts: MAX_DRAW_ATTEMPTS,
        }
    }

    /// Use a different cap on non-matching draws
    pub fn with_draw_cap(seat: SeatId, max_draw_attempts: u32) -> Self {
        Self {
            seat,
            max_draw_attempts,
        }
    }

    /// Play one complete turn for this seat.
    ///
    /// Each play and draw goes through [`MatchState::apply_action`], the same
    /// path a human move takes. `on_step` sees every event together with the
    /// state right after it. The turn ends with a play (which advances the
    /// turn or finishes the round), an exhausted deck, or the draw cap.
    pub fn take_turn<R: Rng + ?Sized>(
        &self,
        state: &mut MatchState,
        rng: &mut R,
        on_step: &mut dyn FnMut(&MatchEvent, &MatchState),
    ) -> Result<Vec<MatchEvent>, MatchError> {
        if state.is_round_over() {
            return Err(MatchError::RoundOver);
        }
        if state.active_seat != self.seat {
            return Err(MatchError::NotYourTurn);
        }

        let mut events = Vec::new();
        let thinking = MatchEvent::BotThinking { seat: self.seat };
        on_step(&thinking, state);
        events.push(thinking);

        let face_up = state.face_up();
        let hand = state.active_player().hand.clone();
        if let BotDecision::Play(card) = decide(&hand, face_up) {
            debug!(seat = self.seat, %card, "policy plays from hand");
            events.extend(state.apply_action_with(
                self.seat,
                MatchAction::Play(card),
                rng,
                &mut *on_step,
            )?);
            return Ok(events);
        }

        let mut attempts = 0;
        while attempts < self.max_draw_attempts {
            let drawn = state.apply_action_with(self.seat, MatchAction::Draw, rng, &mut *on_step)?;
            let card = drawn.iter().find_map(|event| match event {
                MatchEvent::CardDrawn { card, .. } => Some(*card),
                _ => None,
            });
            events.extend(drawn);

            // Nothing left to draw: the turn has already passed
            let Some(card) = card else {
                return Ok(events);
            };

            if rules::can_play(card, state.face_up()) {
                debug!(seat = self.seat, %card, attempts, "policy plays drawn card");
                events.extend(state.apply_action_with(
                    self.seat,
                    MatchAction::Play(card),
                    rng,
                    &mut *on_step,
                )?);
                return Ok(events);
            }
            attempts += 1;
        }

        warn!(
            seat = self.seat,
            attempts, "draw cap reached without a playable card"
        );
        let capped = MatchEvent::SafetyCapReached {
            seat: self.seat,
            attempts,
        };
        on_step(&capped, state);
        events.push(capped);

        let passed = state.pass_turn();
        on_step(&passed, state);
        events.push(passed);

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BattleStyle, Direction, MatchPhase};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn id(key: &str) -> CardId {
        CardId::from_key(key).unwrap()
    }

    fn ids(keys: &[&str]) -> Vec<CardId> {
        keys.iter().map(|k| id(k)).collect()
    }

    fn bot_to_move(face_up: &str, bot_hand: &[&str], deck_top: &[&str]) -> MatchState {
        let mut state = MatchState::with_layout(
            "Mei".into(),
            BattleStyle::Strategic,
            id(face_up),
            vec![
                ids(&["earth_earth_kun"]),
                ids(bot_hand),
                ids(&["mountain_mountain_gen"]),
                ids(&["wind_wind_xun"]),
            ],
            ids(deck_top),
        )
        .unwrap();
        state.active_seat = 1;
        state.phase = MatchPhase::ResolvingBots;
        state
    }

    fn no_op(_: &MatchEvent, _: &MatchState) {}

    #[test]
    fn test_decide_prefers_reversal() {
        let face_up = id("water_sky_xu");
        let hand = ids(&["water_water_kan", "sky_water_song"]);
        assert_eq!(decide(&hand, face_up), BotDecision::Play(id("sky_water_song")));
    }

    #[test]
    fn test_decide_first_match_in_hand_order() {
        let face_up = id("sky_sky_qian");
        let hand = ids(&["earth_earth_kun", "sky_fire_tongren", "water_sky_xu"]);
        assert_eq!(decide(&hand, face_up), BotDecision::Play(id("sky_fire_tongren")));
    }

    #[test]
    fn test_decide_draws_without_match() {
        let hand = ids(&["earth_earth_kun", "lake_lake_dui"]);
        assert_eq!(decide(&hand, id("sky_sky_qian")), BotDecision::Draw);
    }

    #[test]
    fn test_turn_plays_reversal_and_flips() {
        let mut state = bot_to_move("water_sky_xu", &["water_water_kan", "sky_water_song"], &[]);
        let mut rng = StdRng::seed_from_u64(3);

        Bot::new(1)
            .take_turn(&mut state, &mut rng, &mut no_op)
            .unwrap();

        assert_eq!(state.face_up(), id("sky_water_song"));
        assert_eq!(state.direction, Direction::CounterClockwise);
        assert_eq!(state.active_seat, 0);
        assert_eq!(state.phase, MatchPhase::AwaitingHuman);
    }

    #[test]
    fn test_turn_draws_until_playable() {
        let mut state = bot_to_move(
            "sky_sky_qian",
            &["mountain_earth_bo"],
            &["lake_lake_dui", "fire_fire_li", "water_sky_xu", "thunder_thunder_zhen"],
        );
        let mut rng = StdRng::seed_from_u64(3);

        let events = Bot::new(1)
            .take_turn(&mut state, &mut rng, &mut no_op)
            .unwrap();

        let drawn: Vec<CardId> = events
            .iter()
            .filter_map(|e| match e {
                MatchEvent::CardDrawn { card, .. } => Some(*card),
                _ => None,
            })
            .collect();
        assert_eq!(drawn, ids(&["lake_lake_dui", "fire_fire_li", "water_sky_xu"]));
        assert_eq!(state.face_up(), id("water_sky_xu"));
        assert_eq!(
            state.players[1].hand,
            ids(&["mountain_earth_bo", "lake_lake_dui", "fire_fire_li"])
        );
        assert_eq!(state.active_seat, 2);
    }

    #[test]
    fn test_turn_stops_at_draw_cap() {
        let mut state = bot_to_move(
            "sky_sky_qian",
            &["mountain_earth_bo"],
            &["lake_lake_dui", "fire_fire_li", "water_sky_xu"],
        );
        let mut rng = StdRng::seed_from_u64(3);

        let events = Bot::with_draw_cap(1, 2)
            .take_turn(&mut state, &mut rng, &mut no_op)
            .unwrap();

        assert!(events.contains(&MatchEvent::SafetyCapReached { seat: 1, attempts: 2 }));
        assert_eq!(events.last(), Some(&MatchEvent::TurnAdvanced { from: 1, to: 2 }));
        assert_eq!(state.face_up(), id("sky_sky_qian"));
        assert_eq!(state.players[1].card_count(), 3);
    }

    #[test]
    fn test_turn_ends_when_nothing_left_to_draw() {
        let mut state = bot_to_move("sky_sky_qian", &["mountain_earth_bo"], &[]);
        let rest = std::mem::take(&mut state.piles.deck);
        state.players[3].hand.extend(rest);
        let mut rng = StdRng::seed_from_u64(3);

        let events = Bot::new(1)
            .take_turn(&mut state, &mut rng, &mut no_op)
            .unwrap();

        assert_eq!(
            events,
            vec![
                MatchEvent::BotThinking { seat: 1 },
                MatchEvent::DrawExhausted { seat: 1 },
                MatchEvent::TurnAdvanced { from: 1, to: 2 },
            ]
        );
    }

    #[test]
    fn test_turn_reports_each_step() {
        let mut state = bot_to_move("sky_sky_qian", &["mountain_earth_bo"], &["water_sky_xu"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = Vec::new();

        Bot::new(1)
            .take_turn(&mut state, &mut rng, &mut |event: &MatchEvent, state: &MatchState| {
                seen.push((event.clone(), state.players[1].card_count(), state.active_seat));
            })
            .unwrap();

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], (MatchEvent::BotThinking { seat: 1 }, 1, 1));
        assert_eq!(
            seen[1],
            (
                MatchEvent::CardDrawn {
                    seat: 1,
                    card: id("water_sky_xu")
                },
                2,
                1
            )
        );
        assert!(matches!(seen[2].0, MatchEvent::CardPlayed { seat: 1, .. }));
        assert_eq!((seen[2].1, seen[2].2), (1, 1));
        assert_eq!(seen[3], (MatchEvent::TurnAdvanced { from: 1, to: 2 }, 1, 2));
    }

    #[test]
    fn test_wrong_seat_is_rejected() {
        let mut state = bot_to_move("sky_sky_qian", &["mountain_earth_bo"], &[]);
        let mut rng = StdRng::seed_from_u64(3);
        let result = Bot::new(2).take_turn(&mut state, &mut rng, &mut no_op);
        assert_eq!(result, Err(MatchError::NotYourTurn));
    }
}
