//! Card compatibility.
//!
//! A card may be played onto the face-up card when the two share at least one
//! element. A play whose elements are the face-up card's elements swapped
//! reverses the direction of play.

use crate::catalog::{Card, CardId};

/// Whether `candidate` may be played onto `face_up`
pub fn is_playable(candidate: &Card, face_up: &Card) -> bool {
    candidate
        .elements
        .iter()
        .any(|element| face_up.elements.contains(element))
}

/// Whether playing `candidate` onto `face_up` reverses the direction
pub fn is_reversal(candidate: &Card, face_up: &Card) -> bool {
    let [first, second] = candidate.elements;
    let [face_first, face_second] = face_up.elements;
    first == face_second && second == face_first
}

/// [`is_playable`] by card id
pub fn can_play(candidate: CardId, face_up: CardId) -> bool {
    is_playable(candidate.card(), face_up.card())
}

/// [`is_reversal`] by card id
pub fn reverses(candidate: CardId, face_up: CardId) -> bool {
    is_reversal(candidate.card(), face_up.card())
}
