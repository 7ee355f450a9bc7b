//! Property tests over the whole catalog and over random matches.

use hexagram_core::rules::{can_play, reverses};
use hexagram_core::*;
use proptest::prelude::*;

fn card() -> impl Strategy<Value = CardId> {
    (0..CATALOG_SIZE).prop_map(|i| CardId::from_index(i).unwrap())
}

proptest! {
    #[test]
    fn reversal_is_symmetric(a in card(), b in card()) {
        prop_assert_eq!(reverses(a, b), reverses(b, a));
    }

    #[test]
    fn reversal_is_always_playable(a in card(), b in card()) {
        if reverses(a, b) {
            prop_assert!(can_play(a, b));
        }
    }

    #[test]
    fn random_play_conserves_cards(seed in any::<u64>(), turns in 1usize..60) {
        let mut session = MatchSession::with_seed("Mei", BattleStyle::Quick, MemoryStore::new(), seed);

        for _ in 0..turns {
            if session.state().is_match_over() {
                break;
            }
            if session.state().is_round_over() {
                session.continue_to_next_round().unwrap();
            } else {
                session.request_assist().unwrap();
            }

            let mut cards = session.state().card_census();
            cards.sort();
            prop_assert_eq!(cards, CardId::all().collect::<Vec<_>>());
            prop_assert!(!session.state().piles.discard.contains(&session.state().face_up()));
        }
    }

    #[test]
    fn human_play_is_accepted_only_when_legal(seed in any::<u64>(), pick in 0usize..CATALOG_SIZE) {
        let mut session = MatchSession::with_seed("Mei", BattleStyle::Strategic, MemoryStore::new(), seed)
            .with_bot_mode(BotMode::Manual);
        let card = CardId::from_index(pick).unwrap();
        let face_up = session.state().face_up();
        let legal = session.state().human().has_card(card) && can_play(card, face_up);
        let before = session.state().clone();

        let result = session.submit_play(card);

        prop_assert_eq!(result.is_ok(), legal);
        if !legal {
            prop_assert_eq!(session.state(), &before);
        } else {
            prop_assert_eq!(session.state().face_up(), card);
            prop_assert_eq!(reverses(card, face_up), session.state().direction == Direction::CounterClockwise);
        }
    }
}
