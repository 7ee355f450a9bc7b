//! Global leaderboard shared by every connection.

use dashmap::DashMap;
use hexagram_core::upload::LeaderboardEntry;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeaderboardError {
    #[error("Player name must not be blank")]
    BlankPlayerName,

    #[error("Device id must not be blank")]
    BlankDeviceId,
}

/// Best-known entry per player name.
#[derive(Debug, Default)]
pub struct GlobalLeaderboard {
    entries: DashMap<String, LeaderboardEntry>,
}

impl GlobalLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `entry.player_name`.
    pub fn upsert(&self, mut entry: LeaderboardEntry) -> Result<(), LeaderboardError> {
        entry.player_name = entry.player_name.trim().to_string();
        if entry.player_name.is_empty() {
            return Err(LeaderboardError::BlankPlayerName);
        }
        if entry.device_id.trim().is_empty() {
            return Err(LeaderboardError::BlankDeviceId);
        }

        info!(
            player = %entry.player_name,
            total_score = entry.total_score,
            "leaderboard entry uploaded"
        );
        self.entries.insert(entry.player_name.clone(), entry);
        Ok(())
    }

    /// Highest total scores first; ties go by name.
    pub fn top(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        entries.truncate(limit);
        entries
    }

    pub fn get(&self, player_name: &str) -> Option<LeaderboardEntry> {
        self.entries
            .get(player_name.trim())
            .map(|e| e.value().clone())
    }

    pub fn name_exists(&self, player_name: &str) -> bool {
        self.entries.contains_key(player_name.trim())
    }

    /// Whether any entry was uploaded from `device_id`
    pub fn device_uploaded(&self, device_id: &str) -> bool {
        self.entries.iter().any(|e| e.device_id == device_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
