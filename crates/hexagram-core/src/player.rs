//! Seat state.
//!
//! This module contains:
//! - Player struct with hand, battle score and controller kind
//! - Default names for the computer seats

use crate::catalog::CardId;
use serde::{Deserialize, Serialize};

/// Seat index (0-3)
pub type SeatId = u8;

/// Names given to the three computer seats, in seat order
pub const BOT_NAMES: [&str; 3] = ["阿豪", "老宋", "阿宗"];

/// One of the four seats at the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Seat index
    pub seat: SeatId,
    /// Display name
    pub name: String,
    /// Cards held, in the order they were received
    pub hand: Vec<CardId>,
    /// Whether this seat is driven by the human player
    pub is_human: bool,
    /// Battle score for the current match
    pub battle_score: i32,
    pub ready: bool,
}

impl Player {
    /// Create the human seat
    pub fn human(seat: SeatId, name: String, battle_score: i32) -> Self {
        Self {
            seat,
            name,
            hand: Vec::new(),
            is_human: true,
            battle_score,
            ready: true,
        }
    }

    /// Create a computer-controlled seat
    pub fn bot(seat: SeatId, name: String, battle_score: i32) -> Self {
        Self {
            seat,
            name,
            hand: Vec::new(),
            is_human: false,
            battle_score,
            ready: true,
        }
    }

    /// Number of cards in hand
    pub fn card_count(&self) -> usize {
        self.hand.len()
    }

    /// Whether the hand is empty (the seat has won the round)
    pub fn has_emptied_hand(&self) -> bool {
        self.hand.is_empty()
    }

    pub fn has_card(&self, card: CardId) -> bool {
        self.hand.contains(&card)
    }

    /// Add a card to the end of the hand
    pub fn receive(&mut self, card: CardId) {
        self.hand.push(card);
    }

    /// Remove a card from the hand, returning false if it isn't held
    pub fn remove_card(&mut self, card: CardId) -> bool {
        match self.hand.iter().position(|&c| c == card) {
            Some(index) => {
                self.hand.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether the battle score has fallen to zero or below
    pub fn is_eliminated(&self) -> bool {
        self.battle_score <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(key: &str) -> CardId {
        CardId::from_key(key).unwrap()
    }

    #[test]
    fn test_player_creation() {
        let human = Player::human(0, "Mei".into(), 150);
        assert!(human.is_human);
        assert!(human.ready);
        assert_eq!(human.card_count(), 0);

        let bot = Player::bot(2, BOT_NAMES[1].into(), 50);
        assert!(!bot.is_human);
        assert_eq!(bot.seat, 2);
        assert_eq!(bot.battle_score, 50);
    }

    #[test]
    fn test_hand_management() {
        let mut player = Player::human(0, "Mei".into(), 150);
        player.receive(id("fire_fire_li"));
        player.receive(id("lake_lake_dui"));

        assert!(player.has_card(id("fire_fire_li")));
        assert!(player.remove_card(id("fire_fire_li")));
        assert!(!player.remove_card(id("fire_fire_li")));
        assert_eq!(player.hand, vec![id("lake_lake_dui")]);

        assert!(player.remove_card(id("lake_lake_dui")));
        assert!(player.has_emptied_hand());
    }

    #[test]
    fn test_elimination_threshold() {
        let mut player = Player::bot(1, "阿豪".into(), 10);
        assert!(!player.is_eliminated());
        player.battle_score = 0;
        assert!(player.is_eliminated());
        player.battle_score = -20;
        assert!(player.is_eliminated());
    }
}
