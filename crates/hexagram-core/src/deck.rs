//! Draw pile, discard pile and face-up card management.

use crate::catalog::{CardId, CATALOG_SIZE};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cards dealt to every seat at the start of a round
pub const HAND_SIZE: usize = 5;

/// A card taken from the draw pile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawn {
    pub card: CardId,
    /// Number of discards shuffled back into the deck before drawing (0 if none)
    pub reshuffled: usize,
}

/// Every card not currently held in a hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piles {
    /// Draw pile, top card last
    pub deck: Vec<CardId>,
    /// Covered face-up cards, most recent last. Never contains `face_up`.
    pub discard: Vec<CardId>,
    /// The card that decides what may be played
    pub face_up: CardId,
}

impl Piles {
    /// Shuffle the full catalog, deal `HAND_SIZE` cards to each of `seats`
    /// hands and turn the next card face up.
    ///
    /// # Panics
    ///
    /// Panics if the deal would use up the whole catalog.
    pub fn deal<R: Rng + ?Sized>(rng: &mut R, seats: usize) -> (Piles, Vec<Vec<CardId>>) {
        assert!(
            seats * HAND_SIZE < CATALOG_SIZE,
            "Cannot deal {} hands from {} cards",
            seats,
            CATALOG_SIZE
        );

        let mut deck: Vec<CardId> = CardId::all().collect();
        deck.shuffle(rng);

        let hands: Vec<Vec<CardId>> = (0..seats)
            .map(|_| {
                let at = deck.len() - HAND_SIZE;
                deck.split_off(at)
            })
            .collect();

        let face_up = deck
            .pop()
            .expect("catalog holds more cards than a full deal");

        (
            Piles {
                deck,
                discard: Vec::new(),
                face_up,
            },
            hands,
        )
    }

    /// Take the top card of the deck.
    ///
    /// An empty deck is first refilled from the discard pile (the face-up card
    /// stays where it is). Returns `None` only when both piles are empty,
    /// i.e. every other card is held in a hand.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Drawn> {
        let reshuffled = if self.deck.is_empty() {
            self.reshuffle(rng)
        } else {
            0
        };

        self.deck.pop().map(|card| Drawn { card, reshuffled })
    }

    /// Move the discard pile into the deck and shuffle it. Returns the number
    /// of cards moved.
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let moved = self.discard.len();
        self.deck.append(&mut self.discard);
        self.deck.shuffle(rng);
        if moved > 0 {
            debug!(cards = moved, "reshuffled discard pile into deck");
        }
        moved
    }

    /// Put `card` face up, covering the previous face-up card.
    /// Returns the covered card.
    pub fn play(&mut self, card: CardId) -> CardId {
        let covered = std::mem::replace(&mut self.face_up, card);
        self.discard.push(covered);
        covered
    }

    /// Whether neither the deck nor the discard pile can supply a card
    pub fn is_exhausted(&self) -> bool {
        self.deck.is_empty() && self.discard.is_empty()
    }

    /// Cards held by the piles, face-up card included
    pub fn card_count(&self) -> usize {
        self.deck.len() + self.discard.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn id(key: &str) -> CardId {
        CardId::from_key(key).unwrap()
    }

    #[test]
    fn test_deal_accounts_for_every_card() {
        let mut rng = StdRng::seed_from_u64(7);
        let (piles, hands) = Piles::deal(&mut rng, 4);

        assert_eq!(hands.len(), 4);
        assert!(hands.iter().all(|h| h.len() == HAND_SIZE));
        assert!(piles.discard.is_empty());
        assert_eq!(piles.card_count() + 4 * HAND_SIZE, CATALOG_SIZE);

        let mut seen: Vec<CardId> = hands.concat();
        seen.extend(&piles.deck);
        seen.push(piles.face_up);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), CATALOG_SIZE);
    }

    #[test]
    fn test_play_covers_face_up() {
        let mut piles = Piles {
            deck: vec![],
            discard: vec![],
            face_up: id("sky_sky_qian"),
        };
        let covered = piles.play(id("water_sky_xu"));
        assert_eq!(covered, id("sky_sky_qian"));
        assert_eq!(piles.face_up, id("water_sky_xu"));
        assert_eq!(piles.discard, vec![id("sky_sky_qian")]);
    }

    #[test]
    fn test_draw_reshuffles_discard_when_deck_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut piles = Piles {
            deck: vec![],
            discard: vec![id("earth_earth_kun"), id("fire_fire_li")],
            face_up: id("sky_sky_qian"),
        };

        let drawn = piles.draw(&mut rng).unwrap();
        assert_eq!(drawn.reshuffled, 2);
        assert_eq!(piles.face_up, id("sky_sky_qian"));
        assert!(piles.discard.is_empty());
        assert_eq!(piles.deck.len(), 1);
        assert_ne!(drawn.card, id("sky_sky_qian"));
    }

    #[test]
    fn test_draw_without_reshuffle_reports_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut piles = Piles {
            deck: vec![id("earth_earth_kun")],
            discard: vec![id("fire_fire_li")],
            face_up: id("sky_sky_qian"),
        };
        let drawn = piles.draw(&mut rng).unwrap();
        assert_eq!(
            drawn,
            Drawn {
                card: id("earth_earth_kun"),
                reshuffled: 0
            }
        );
        assert_eq!(piles.discard, vec![id("fire_fire_li")]);
    }

    #[test]
    fn test_draw_from_exhausted_piles_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut piles = Piles {
            deck: vec![],
            discard: vec![],
            face_up: id("sky_sky_qian"),
        };
        assert!(piles.is_exhausted());
        assert!(piles.draw(&mut rng).is_none());
        assert_eq!(piles.face_up, id("sky_sky_qian"));
    }
}
