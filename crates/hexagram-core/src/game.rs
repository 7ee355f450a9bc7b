//! Core match state machine.
//!
//! This module contains the `MatchState` struct: seats, piles, direction and
//! phase, plus the rules for playing, drawing, advancing the turn and
//! resolving the end of a round.

use crate::actions::{MatchAction, MatchEvent};
use crate::catalog::{CardId, UnknownCard, CATALOG_SIZE};
use crate::deck::Piles;
use crate::player::{Player, SeatId, BOT_NAMES};
use crate::rules;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Seats at the table
pub const SEAT_COUNT: usize = 4;

/// Seat driven by the human player
pub const HUMAN_SEAT: SeatId = 0;

/// Battle points lost per card left in hand when another seat goes out
pub const CARD_PENALTY: i32 = 10;

/// Starting battle score preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStyle {
    /// Short matches
    Quick,
    /// Long matches
    #[default]
    Strategic,
}

impl BattleStyle {
    /// Battle score every seat starts a match with
    pub fn starting_score(&self) -> i32 {
        match self {
            BattleStyle::Quick => 50,
            BattleStyle::Strategic => 150,
        }
    }
}

/// Direction of play around the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    /// Seat that plays after `seat`
    pub fn next_seat(self, seat: SeatId) -> SeatId {
        let count = SEAT_COUNT as SeatId;
        match self {
            Direction::Clockwise => (seat + 1) % count,
            Direction::CounterClockwise => (seat + count - 1) % count,
        }
    }
}

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// The human seat is active and may play, draw or ask for assist
    AwaitingHuman,

    /// A computer seat is active; human actions are refused until it
    /// hands the turn back
    ResolvingBots,

    /// A seat emptied its hand; waiting for the next round to be dealt
    RoundFinished { winner: SeatId },

    /// A round ended with a battle score at or below zero
    MatchFinished { winner: SeatId },
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MatchError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Card {0} is not in hand")]
    CardNotInHand(CardId),

    #[error("{card} does not match the face-up card {face_up}")]
    IllegalMove { card: CardId, face_up: CardId },

    #[error("AI assist is only available to the human seat")]
    AssistMisuse,

    #[error("Computer seats are still taking their turns")]
    Busy,

    #[error("No computer turn is pending")]
    NoBotTurn,

    #[error("The round is over")]
    RoundOver,

    #[error("The round is still in progress")]
    RoundInProgress,

    #[error("The match is over")]
    MatchOver,

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error(transparent)]
    UnknownCard(#[from] UnknownCard),
}

/// The complete match state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// All four seats; index equals seat id
    pub players: Vec<Player>,
    /// Deck, discard pile and face-up card
    #[serde(flatten)]
    pub piles: Piles,
    pub direction: Direction,
    /// Seat whose turn it is
    pub active_seat: SeatId,
    pub phase: MatchPhase,
    pub battle_style: BattleStyle,
    /// Round number (starts at 1)
    pub round: u32,
}

impl MatchState {
    /// Deal a new match: the named human in seat 0 against three computer seats
    pub fn new<R: Rng + ?Sized>(player_name: String, battle_style: BattleStyle, rng: &mut R) -> Self {
        let (piles, hands) = Piles::deal(rng, SEAT_COUNT);
        let mut state = Self {
            players: Self::seat_players(player_name, battle_style),
            piles,
            direction: Direction::Clockwise,
            active_seat: HUMAN_SEAT,
            phase: MatchPhase::AwaitingHuman,
            battle_style,
            round: 1,
        };
        state.seat_hands(hands);
        state
    }

    /// Build a match from an explicit layout.
    ///
    /// `hands` lists each seat's cards, `deck_top` the cards to be drawn
    /// first (in draw order). Every remaining card goes underneath in
    /// catalog order and the discard pile starts empty.
    pub fn with_layout(
        player_name: String,
        battle_style: BattleStyle,
        face_up: CardId,
        hands: Vec<Vec<CardId>>,
        deck_top: Vec<CardId>,
    ) -> Result<Self, MatchError> {
        if hands.len() != SEAT_COUNT {
            return Err(MatchError::InvalidLayout(format!(
                "expected {} hands, got {}",
                SEAT_COUNT,
                hands.len()
            )));
        }

        let mut placed = HashSet::new();
        let layout_cards = std::iter::once(face_up)
            .chain(hands.iter().flatten().copied())
            .chain(deck_top.iter().copied());
        for card in layout_cards {
            if !placed.insert(card) {
                return Err(MatchError::InvalidLayout(format!("{} placed twice", card)));
            }
        }

        let mut deck: Vec<CardId> = CardId::all().filter(|c| !placed.contains(c)).collect();
        deck.reverse();
        deck.extend(deck_top.iter().rev());

        let mut state = Self {
            players: Self::seat_players(player_name, battle_style),
            piles: Piles {
                deck,
                discard: Vec::new(),
                face_up,
            },
            direction: Direction::Clockwise,
            active_seat: HUMAN_SEAT,
            phase: MatchPhase::AwaitingHuman,
            battle_style,
            round: 1,
        };
        state.seat_hands(hands);
        Ok(state)
    }

    /// Get the number of seats
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a seat by id
    pub fn get_player(&self, seat: SeatId) -> Option<&Player> {
        self.players.get(seat as usize)
    }

    fn get_player_mut(&mut self, seat: SeatId) -> Option<&mut Player> {
        self.players.get_mut(seat as usize)
    }

    /// The seat whose turn it is
    pub fn active_player(&self) -> &Player {
        &self.players[self.active_seat as usize]
    }

    /// The human seat
    pub fn human(&self) -> &Player {
        &self.players[HUMAN_SEAT as usize]
    }

    pub fn face_up(&self) -> CardId {
        self.piles.face_up
    }

    /// Whether the current round has ended (including the final one)
    pub fn is_round_over(&self) -> bool {
        matches!(
            self.phase,
            MatchPhase::RoundFinished { .. } | MatchPhase::MatchFinished { .. }
        )
    }

    /// Whether the match has reached its special ending
    pub fn is_match_over(&self) -> bool {
        matches!(self.phase, MatchPhase::MatchFinished { .. })
    }

    /// Seat that emptied its hand this round, once the round is over
    pub fn round_winner(&self) -> Option<SeatId> {
        match self.phase {
            MatchPhase::RoundFinished { winner } | MatchPhase::MatchFinished { winner } => {
                Some(winner)
            }
            _ => None,
        }
    }

    /// Seats whose battle score is at or below zero
    pub fn eliminated_seats(&self) -> Vec<SeatId> {
        self.players
            .iter()
            .filter(|p| p.is_eliminated())
            .map(|p| p.seat)
            .collect()
    }

    /// Seats tied at the highest battle score, provided it is above zero
    pub fn leading_seats(&self) -> Vec<SeatId> {
        let best = match self.players.iter().map(|p| p.battle_score).max() {
            Some(best) if best > 0 => best,
            _ => return Vec::new(),
        };
        self.players
            .iter()
            .filter(|p| p.battle_score == best)
            .map(|p| p.seat)
            .collect()
    }

    /// Every card in the match: deck, discard, face-up and all hands
    pub fn card_census(&self) -> Vec<CardId> {
        let mut cards = Vec::with_capacity(CATALOG_SIZE);
        cards.extend(&self.piles.deck);
        cards.extend(&self.piles.discard);
        cards.push(self.piles.face_up);
        for player in &self.players {
            cards.extend(&player.hand);
        }
        cards
    }

    /// Get all currently valid actions for a seat
    pub fn valid_actions(&self, seat: SeatId) -> Vec<MatchAction> {
        let mut actions = Vec::new();

        if self.is_round_over() || seat != self.active_seat {
            return actions;
        }

        if let Some(player) = self.get_player(seat) {
            let face_up = self.face_up();
            for &card in &player.hand {
                if rules::can_play(card, face_up) {
                    actions.push(MatchAction::Play(card));
                }
            }
        }

        // Drawing is always allowed; with nothing left it passes the turn
        actions.push(MatchAction::Draw);
        actions
    }

    /// Apply an action to the match state.
    ///
    /// Every check runs before the first mutation, so a rejected action
    /// leaves the state untouched.
    pub fn apply_action<R: Rng + ?Sized>(
        &mut self,
        seat: SeatId,
        action: MatchAction,
        rng: &mut R,
    ) -> Result<Vec<MatchEvent>, MatchError> {
        self.apply_action_with(seat, action, rng, &mut |_: &MatchEvent, _: &MatchState| {})
    }

    /// Like [`MatchState::apply_action`], but `on_step` sees each event as it
    /// happens, with the state right after that step and before the next one.
    pub fn apply_action_with<R: Rng + ?Sized>(
        &mut self,
        seat: SeatId,
        action: MatchAction,
        rng: &mut R,
        on_step: &mut dyn FnMut(&MatchEvent, &MatchState),
    ) -> Result<Vec<MatchEvent>, MatchError> {
        if self.is_round_over() {
            return Err(MatchError::RoundOver);
        }
        if seat != self.active_seat {
            return Err(MatchError::NotYourTurn);
        }

        let mut events = Vec::new();
        match action {
            MatchAction::Play(card) => self.play_card(seat, card, &mut events, on_step)?,
            MatchAction::Draw => self.draw_card(seat, rng, &mut events, on_step),
        }
        Ok(events)
    }

    fn emit(
        &self,
        event: MatchEvent,
        events: &mut Vec<MatchEvent>,
        on_step: &mut dyn FnMut(&MatchEvent, &MatchState),
    ) {
        on_step(&event, self);
        events.push(event);
    }

    fn play_card(
        &mut self,
        seat: SeatId,
        card: CardId,
        events: &mut Vec<MatchEvent>,
        on_step: &mut dyn FnMut(&MatchEvent, &MatchState),
    ) -> Result<(), MatchError> {
        let face_up = self.face_up();
        let player = self.get_player(seat).ok_or(MatchError::NotYourTurn)?;

        if !player.has_card(card) {
            return Err(MatchError::CardNotInHand(card));
        }
        if !rules::can_play(card, face_up) {
            return Err(MatchError::IllegalMove { card, face_up });
        }

        // Reversal is judged against the card being covered
        let reversed = rules::reverses(card, face_up);

        let emptied = match self.get_player_mut(seat) {
            Some(player) => {
                player.remove_card(card);
                player.has_emptied_hand()
            }
            None => return Err(MatchError::NotYourTurn),
        };
        let covered = self.piles.play(card);
        debug!(seat, %card, %covered, "card played");
        self.emit(
            MatchEvent::CardPlayed {
                seat,
                card,
                covered,
            },
            events,
            on_step,
        );

        if reversed {
            self.direction = self.direction.reversed();
            debug!(seat, direction = ?self.direction, "direction reversed");
            self.emit(
                MatchEvent::DirectionChanged {
                    seat,
                    direction: self.direction,
                },
                events,
                on_step,
            );
        }

        if emptied {
            self.finish_round(seat, events, on_step);
        } else {
            let advanced = self.advance_turn();
            self.emit(advanced, events, on_step);
        }

        Ok(())
    }

    fn draw_card<R: Rng + ?Sized>(
        &mut self,
        seat: SeatId,
        rng: &mut R,
        events: &mut Vec<MatchEvent>,
        on_step: &mut dyn FnMut(&MatchEvent, &MatchState),
    ) {
        if self.piles.deck.is_empty() && !self.piles.discard.is_empty() {
            let cards = self.piles.reshuffle(rng);
            self.emit(MatchEvent::DeckReshuffled { cards }, events, on_step);
        }

        match self.piles.draw(rng) {
            Some(drawn) => {
                if let Some(player) = self.get_player_mut(seat) {
                    player.receive(drawn.card);
                }
                debug!(seat, card = %drawn.card, "card drawn");
                self.emit(
                    MatchEvent::CardDrawn {
                        seat,
                        card: drawn.card,
                    },
                    events,
                    on_step,
                );
            }
            None => {
                warn!(seat, "no card left to draw, passing the turn");
                self.emit(MatchEvent::DrawExhausted { seat }, events, on_step);
                let advanced = self.advance_turn();
                self.emit(advanced, events, on_step);
            }
        }
    }

    /// End the active seat's turn without a play
    pub(crate) fn pass_turn(&mut self) -> MatchEvent {
        self.advance_turn()
    }

    fn advance_turn(&mut self) -> MatchEvent {
        let from = self.active_seat;
        let to = self.direction.next_seat(from);
        self.active_seat = to;
        self.phase = if self.active_player().is_human {
            MatchPhase::AwaitingHuman
        } else {
            MatchPhase::ResolvingBots
        };
        debug!(from, to, "turn advanced");
        MatchEvent::TurnAdvanced { from, to }
    }

    fn finish_round(
        &mut self,
        winner: SeatId,
        events: &mut Vec<MatchEvent>,
        on_step: &mut dyn FnMut(&MatchEvent, &MatchState),
    ) {
        let mut penalties = Vec::new();
        for player in self.players.iter_mut().filter(|p| p.seat != winner) {
            let penalty = CARD_PENALTY * player.card_count() as i32;
            player.battle_score -= penalty;
            penalties.push((player.seat, penalty));
        }
        info!(winner, round = self.round, ?penalties, "round finished");
        self.phase = MatchPhase::RoundFinished { winner };
        self.emit(MatchEvent::RoundFinished { winner, penalties }, events, on_step);

        let eliminated = self.eliminated_seats();
        if !eliminated.is_empty() {
            let winners = self.leading_seats();
            info!(?winners, ?eliminated, "match finished");
            self.phase = MatchPhase::MatchFinished { winner };
            self.emit(
                MatchEvent::MatchFinished {
                    winners,
                    eliminated,
                },
                events,
                on_step,
            );
        }
    }

    /// Deal the next round, keeping battle scores
    pub fn start_next_round<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<MatchEvent>, MatchError> {
        match self.phase {
            MatchPhase::RoundFinished { .. } => {}
            MatchPhase::MatchFinished { .. } => return Err(MatchError::MatchOver),
            _ => return Err(MatchError::RoundInProgress),
        }

        self.round += 1;
        Ok(vec![self.redeal(rng)])
    }

    /// Start the match over with fresh battle scores
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<MatchEvent> {
        let score = self.battle_style.starting_score();
        for player in &mut self.players {
            player.battle_score = score;
        }
        self.round = 1;
        vec![self.redeal(rng)]
    }

    fn redeal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> MatchEvent {
        let (piles, hands) = Piles::deal(rng, SEAT_COUNT);
        self.piles = piles;
        for player in &mut self.players {
            player.hand.clear();
        }
        self.seat_hands(hands);
        self.direction = Direction::Clockwise;
        self.active_seat = HUMAN_SEAT;
        self.phase = MatchPhase::AwaitingHuman;

        info!(round = self.round, face_up = %self.piles.face_up, "round started");
        MatchEvent::RoundStarted {
            round: self.round,
            face_up: self.piles.face_up,
        }
    }

    fn seat_players(player_name: String, battle_style: BattleStyle) -> Vec<Player> {
        let score = battle_style.starting_score();
        let mut players = vec![Player::human(HUMAN_SEAT, player_name, score)];
        players.extend(
            BOT_NAMES
                .iter()
                .enumerate()
                .map(|(i, name)| Player::bot(i as SeatId + 1, name.to_string(), score)),
        );
        players
    }

    fn seat_hands(&mut self, hands: Vec<Vec<CardId>>) {
        for (player, hand) in self.players.iter_mut().zip(hands) {
            player.hand = hand;
        }
    }
}
