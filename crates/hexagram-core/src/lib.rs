//! Hexagram UNO - a four-seat shedding card game played with the 64 hexagrams
//!
//! This crate provides the core game logic, including:
//! - The 64-card hexagram catalog and the element compatibility rules
//! - Deck, discard pile and face-up card management
//! - The match state machine with turn order, reversals and round resolution
//! - A scripted opponent policy for the three computer seats
//! - A permanent score ledger that outlives single matches
//!
//! # Architecture
//!
//! The engine is platform-agnostic. It can be compiled to:
//! - Native Rust for server-side match hosting
//! - WebAssembly for single-player play in the browser
//!
//! # Modules
//!
//! - [`catalog`]: Cards, elements and card ids
//! - [`rules`]: Playability and reversal checks
//! - [`deck`]: Draw pile, discard pile and face-up card
//! - [`player`]: Seat state
//! - [`game`]: Match state machine
//! - [`bot`]: Opponent policy
//! - [`session`]: Match driver with observers and bot pacing
//! - [`ledger`]: Permanent scores and the storage contract
//! - [`upload`]: Leaderboard upload payloads and retry queue

pub mod actions;
pub mod bot;
pub mod catalog;
pub mod deck;
pub mod game;
pub mod ledger;
pub mod player;
pub mod rules;
pub mod session;
pub mod upload;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{ActionOutcome, MatchAction, MatchEvent};
pub use bot::{Bot, BotDecision, MAX_DRAW_ATTEMPTS};
pub use catalog::{Card, CardId, Element, UnknownCard, CATALOG, CATALOG_SIZE};
pub use deck::{Piles, HAND_SIZE};
pub use game::{BattleStyle, Direction, MatchError, MatchPhase, MatchState, HUMAN_SEAT, SEAT_COUNT};
pub use ledger::{
    Ledger, LedgerBaseline, MemoryStore, PermanentScoreChange, PermanentScoreRecord, ScoreReason,
    ScoreStore,
};
pub use player::{Player, SeatId};
pub use session::{BotMode, MatchObserver, MatchSession, SubscriptionId};
pub use upload::{LeaderboardEntry, UploadQueue, UploadStatus};
