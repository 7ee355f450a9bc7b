//! Leaderboard upload payloads and the retry queue around them.
//!
//! The engine never talks to the network. A host turns a
//! [`PermanentScoreRecord`] into a [`LeaderboardEntry`], queues it, and
//! reports back whether each upload attempt worked.

use crate::ledger::PermanentScoreRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Failed attempts after which a queued upload is dropped
pub const MAX_UPLOAD_ATTEMPTS: u32 = 5;

/// Flattened record sent to a global leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub device_id: String,
    pub total_score: i64,
    pub games_played: u32,
    pub wins: u32,
    pub defeats: u32,
    pub clear_cards: u32,
    pub small_wins: u32,
    pub double_kills: u32,
    pub quad_kills: u32,
    pub last_played: Option<u64>,
}

impl LeaderboardEntry {
    pub fn from_record(record: &PermanentScoreRecord, device_id: impl Into<String>) -> Self {
        Self {
            player_name: record.player_name.clone(),
            device_id: device_id.into(),
            total_score: record.total_score,
            games_played: record.games_played,
            wins: record.wins,
            defeats: record.defeats,
            clear_cards: record.clear_cards,
            small_wins: record.achievements.small_wins,
            double_kills: record.achievements.double_kills,
            quad_kills: record.achievements.quad_kills,
            last_played: record.last_played,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpload {
    pub entry: LeaderboardEntry,
    pub queued_at: u64,
    /// Failed attempts so far
    pub attempts: u32,
}

/// What happened to a queued upload after an attempt was reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    /// Upload succeeded and the entry left the queue
    Uploaded,
    /// Upload failed; the entry stays queued
    Retrying { attempts: u32 },
    /// Upload failed too often and the entry was dropped
    GaveUp,
    /// Nothing was queued for that player
    NotQueued,
}

/// Pending uploads, at most one per player name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadQueue {
    pending: Vec<PendingUpload>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[PendingUpload] {
        &self.pending
    }

    /// Queue `entry`, replacing any older entry for the same player
    pub fn enqueue(&mut self, entry: LeaderboardEntry, now: u64) {
        let upload = PendingUpload {
            entry,
            queued_at: now,
            attempts: 0,
        };
        match self
            .pending
            .iter_mut()
            .find(|p| p.entry.player_name == upload.entry.player_name)
        {
            Some(existing) => {
                debug!(player = %upload.entry.player_name, "replacing queued upload");
                *existing = upload;
            }
            None => {
                debug!(player = %upload.entry.player_name, "queued upload");
                self.pending.push(upload);
            }
        }
    }

    /// Entries to try next, oldest first
    pub fn next_batch(&self) -> Vec<LeaderboardEntry> {
        self.pending.iter().map(|p| p.entry.clone()).collect()
    }

    /// Record the result of an upload attempt for `player_name`
    pub fn report(&mut self, player_name: &str, uploaded: bool) -> UploadStatus {
        let Some(index) = self
            .pending
            .iter()
            .position(|p| p.entry.player_name == player_name)
        else {
            return UploadStatus::NotQueued;
        };

        if uploaded {
            self.pending.remove(index);
            return UploadStatus::Uploaded;
        }

        let attempts = {
            let pending = &mut self.pending[index];
            pending.attempts += 1;
            pending.attempts
        };
        if attempts >= MAX_UPLOAD_ATTEMPTS {
            warn!(player = player_name, attempts, "giving up on leaderboard upload");
            self.pending.remove(index);
            UploadStatus::GaveUp
        } else {
            UploadStatus::Retrying { attempts }
        }
    }
}
