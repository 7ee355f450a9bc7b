//! WebSocket protocol messages for Hexagram UNO.

use hexagram_core::ledger::PermanentScoreRecord;
use hexagram_core::upload::LeaderboardEntry;
use hexagram_core::{ActionOutcome, BattleStyle, CardId, MatchEvent, MatchState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Start a match against three computer seats, replacing any current one
    CreateMatch {
        player_name: String,
        #[serde(default)]
        battle_style: BattleStyle,
    },

    /// Play a card from the human hand
    Play { card: CardId },

    /// Draw a card
    Draw,

    /// Let the opponent policy play the human turn
    Assist,

    /// Deal the next round after a round end
    ContinueRound,

    /// Start the match over
    RestartMatch,

    /// Request a player's permanent record
    GetRecord { player_name: String },

    /// Submit an entry to the global leaderboard
    UploadLeaderboard { entry: LeaderboardEntry },

    /// Request the global leaderboard
    GetLeaderboard { limit: Option<usize> },

    /// Ask whether a player name is already on the leaderboard
    CheckPlayerName { player_name: String },

    /// Ask whether a device has uploaded before
    CheckDevice { device_id: String },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { connection_id: Uuid },

    /// A new match was dealt
    MatchCreated { state: MatchState },

    /// One match step and the state right after it
    Step { event: MatchEvent, state: MatchState },

    /// Result of a match request
    ActionResult { outcome: ActionOutcome },

    /// A player's permanent record, if any
    Record {
        player_name: String,
        record: Option<PermanentScoreRecord>,
    },

    /// Top leaderboard entries
    Leaderboard { entries: Vec<LeaderboardEntry> },

    PlayerNameStatus {
        player_name: String,
        exists: bool,
        entry: Option<LeaderboardEntry>,
    },

    DeviceStatus { device_id: String, uploaded: bool },

    /// Result of a leaderboard upload
    UploadResult {
        success: bool,
        error: Option<String>,
    },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}
