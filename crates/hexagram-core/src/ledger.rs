//! Permanent score ledger.
//!
//! Battle scores live only as long as a match. Permanent scores follow a
//! player name across matches and sessions and are kept in a [`ScoreStore`].
//!
//! Settlement works from a [`LedgerBaseline`] captured when the match starts,
//! so each seat's change is computed against a fixed starting value no matter
//! how often its record was touched in between.

use crate::game::MatchState;
use crate::player::{Player, SeatId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// History entries kept per record; older ones are evicted first
pub const HISTORY_LIMIT: usize = 100;

/// Default number of records on a leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// Why a permanent score changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreReason {
    /// Winner of a match that eliminated one seat
    SmallWin,
    /// Winner of a match that eliminated two seats
    DoubleKill,
    /// Winner of a match that eliminated three seats
    QuadKill,
    /// Battle score fell to zero or below
    Eliminated,
    /// Emptied a hand in a round that did not end the match
    CardsCleared,
}

impl ScoreReason {
    /// Winning reason for a match that eliminated `count` seats
    pub fn for_eliminations(count: usize) -> Option<Self> {
        match count {
            1 => Some(ScoreReason::SmallWin),
            2 => Some(ScoreReason::DoubleKill),
            3 => Some(ScoreReason::QuadKill),
            _ => None,
        }
    }

    /// Nominal permanent score change, before flooring at zero
    pub fn change(&self) -> i64 {
        match self {
            ScoreReason::SmallWin => 100,
            ScoreReason::DoubleKill => 200,
            ScoreReason::QuadKill => 300,
            ScoreReason::Eliminated => -100,
            ScoreReason::CardsCleared => 0,
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(
            self,
            ScoreReason::SmallWin | ScoreReason::DoubleKill | ScoreReason::QuadKill
        )
    }
}

/// Audit entry appended to a record's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub old_score: i64,
    pub new_score: i64,
    pub change: i64,
    pub reason: ScoreReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievements {
    pub small_wins: u32,
    pub double_kills: u32,
    pub quad_kills: u32,
}

/// Cross-match record for one player key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentScoreRecord {
    pub player_name: String,
    pub total_score: i64,
    pub games_played: u32,
    pub wins: u32,
    pub defeats: u32,
    /// Rounds won without ending the match
    pub clear_cards: u32,
    pub achievements: Achievements,
    /// Most recent last, at most `HISTORY_LIMIT` entries
    pub history: Vec<ScoreDelta>,
    /// Timestamp of the last applied change
    pub last_played: Option<u64>,
}

impl PermanentScoreRecord {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            total_score: 0,
            games_played: 0,
            wins: 0,
            defeats: 0,
            clear_cards: 0,
            achievements: Achievements::default(),
            history: Vec::new(),
            last_played: None,
        }
    }

    /// Record one settlement change and update the counters it implies
    ///
    /// A `CardsCleared` change only counts the cleared hand; the total stays
    /// as stored, since it may have moved since the baseline was taken.
    pub fn apply(&mut self, change: &PermanentScoreChange, timestamp: u64) {
        let (old_score, new_score) = match change.reason {
            ScoreReason::CardsCleared => (self.total_score, self.total_score),
            _ => (change.old_score, change.new_score),
        };
        self.total_score = new_score;

        match change.reason {
            ScoreReason::CardsCleared => self.clear_cards += 1,
            ScoreReason::Eliminated => {
                self.games_played += 1;
                self.defeats += 1;
            }
            reason => {
                self.games_played += 1;
                self.wins += 1;
                match reason {
                    ScoreReason::SmallWin => self.achievements.small_wins += 1,
                    ScoreReason::DoubleKill => self.achievements.double_kills += 1,
                    _ => self.achievements.quad_kills += 1,
                }
            }
        }

        self.history.push(ScoreDelta {
            timestamp,
            old_score,
            new_score,
            change: new_score - old_score,
            reason: change.reason,
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self.last_played = Some(timestamp);
    }
}

/// A settlement change for one seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentScoreChange {
    /// Store key of the record
    pub key: String,
    pub player_name: String,
    pub seat: SeatId,
    pub old_score: i64,
    pub new_score: i64,
    pub change: i64,
    pub reason: ScoreReason,
}

/// Durable key-value storage for permanent score records
pub trait ScoreStore {
    fn get(&self, key: &str) -> Option<PermanentScoreRecord>;
    fn set(&mut self, key: &str, record: PermanentScoreRecord);
}

/// In-memory store, exportable as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    records: HashMap<String, PermanentScoreRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records previously produced by [`MemoryStore::to_json`]
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Human records by total score, highest first. Ties go by name.
    pub fn leaderboard(&self, limit: usize) -> Vec<PermanentScoreRecord> {
        let mut records: Vec<&PermanentScoreRecord> = self
            .records
            .iter()
            .filter(|(key, _)| key.starts_with(HUMAN_PREFIX))
            .map(|(_, record)| record)
            .collect();
        records.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        records.into_iter().take(limit).cloned().collect()
    }
}

impl ScoreStore for MemoryStore {
    fn get(&self, key: &str) -> Option<PermanentScoreRecord> {
        self.records.get(key).cloned()
    }

    fn set(&mut self, key: &str, record: PermanentScoreRecord) {
        self.records.insert(key.to_string(), record);
    }
}

const HUMAN_PREFIX: &str = "human_";
const BOT_PREFIX: &str = "ai_";

/// Store key for the human player called `name`
pub fn human_key(name: &str) -> String {
    format!("{}{}", HUMAN_PREFIX, name)
}

/// Store key for a seat
pub fn record_key(player: &Player) -> String {
    if player.is_human {
        human_key(&player.name)
    } else {
        format!("{}{}", BOT_PREFIX, player.seat)
    }
}

/// Permanent scores of every seat, captured when a match starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatBaseline {
    pub key: String,
    pub player_name: String,
    pub score: i64,
}

/// One entry per seat, indexed by seat id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBaseline {
    pub seats: Vec<SeatBaseline>,
}

impl LedgerBaseline {
    pub fn get(&self, seat: SeatId) -> Option<&SeatBaseline> {
        self.seats.get(seat as usize)
    }
}

/// Settlement changes for a finished round, without touching any store.
///
/// Returns nothing while the round is still being played. A round that did
/// not end the match yields a single zero `CardsCleared` change for the seat
/// that went out. A match end yields a win for each leading seat and an
/// elimination for each seat at or below zero; anyone else is left alone.
pub fn compute_changes(state: &MatchState, baseline: &LedgerBaseline) -> Vec<PermanentScoreChange> {
    let Some(round_winner) = state.round_winner() else {
        return Vec::new();
    };

    let change_for = |seat: SeatId, reason: ScoreReason| -> Option<PermanentScoreChange> {
        let base = baseline.get(seat)?;
        let new_score = (base.score + reason.change()).max(0);
        Some(PermanentScoreChange {
            key: base.key.clone(),
            player_name: base.player_name.clone(),
            seat,
            old_score: base.score,
            new_score,
            change: new_score - base.score,
            reason,
        })
    };

    if !state.is_match_over() {
        return change_for(round_winner, ScoreReason::CardsCleared)
            .into_iter()
            .collect();
    }

    let winners = state.leading_seats();
    let eliminated = state.eliminated_seats();
    let win_reason = ScoreReason::for_eliminations(eliminated.len());

    state
        .players
        .iter()
        .filter_map(|player| {
            if winners.contains(&player.seat) {
                win_reason.and_then(|reason| change_for(player.seat, reason))
            } else if eliminated.contains(&player.seat) {
                change_for(player.seat, ScoreReason::Eliminated)
            } else {
                None
            }
        })
        .collect()
}

/// Reads and settles permanent scores through a [`ScoreStore`]
#[derive(Debug, Clone, Default)]
pub struct Ledger<S: ScoreStore> {
    store: S,
}

impl<S: ScoreStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Record for `key`, or a fresh zeroed one if the store has none yet
    pub fn record(&self, key: &str, player_name: &str) -> PermanentScoreRecord {
        self.store
            .get(key)
            .unwrap_or_else(|| PermanentScoreRecord::new(player_name))
    }

    /// Stored record of the human player called `name`
    pub fn player_record(&self, name: &str) -> Option<PermanentScoreRecord> {
        self.store.get(&human_key(name))
    }

    /// Make sure the human player called `name` has a stored record
    pub fn initialize_player(&mut self, name: &str) -> PermanentScoreRecord {
        let key = human_key(name);
        match self.store.get(&key) {
            Some(record) => record,
            None => {
                debug!(player = name, "creating permanent score record");
                let record = PermanentScoreRecord::new(name);
                self.store.set(&key, record.clone());
                record
            }
        }
    }

    /// Change the display name stored under `key`. The key itself is kept.
    /// Returns false if there is no such record.
    pub fn rename_player(&mut self, key: &str, new_name: &str) -> bool {
        let Some(mut record) = self.store.get(key) else {
            return false;
        };
        debug!(key, from = %record.player_name, to = new_name, "renaming player");
        record.player_name = new_name.to_string();
        self.store.set(key, record);
        true
    }

    /// Capture every seat's current permanent score
    pub fn snapshot(&self, state: &MatchState) -> LedgerBaseline {
        LedgerBaseline {
            seats: state
                .players
                .iter()
                .map(|player| {
                    let key = record_key(player);
                    let score = self.record(&key, &player.name).total_score;
                    SeatBaseline {
                        key,
                        player_name: player.name.clone(),
                        score,
                    }
                })
                .collect(),
        }
    }

    /// Changes a settlement would make right now
    pub fn preview(&self, state: &MatchState, baseline: &LedgerBaseline) -> Vec<PermanentScoreChange> {
        compute_changes(state, baseline)
    }

    /// Write `changes` to the store
    pub fn apply(&mut self, changes: &[PermanentScoreChange], timestamp: u64) {
        for change in changes {
            let mut record = self.record(&change.key, &change.player_name);
            record.apply(change, timestamp);
            self.store.set(&change.key, record);
        }
    }

    /// Compute and apply the changes for a finished round
    pub fn settle_round(
        &mut self,
        state: &MatchState,
        baseline: &LedgerBaseline,
        timestamp: u64,
    ) -> Vec<PermanentScoreChange> {
        let mut changes = compute_changes(state, baseline);
        for change in changes
            .iter_mut()
            .filter(|c| c.reason == ScoreReason::CardsCleared)
        {
            let live = self.record(&change.key, &change.player_name).total_score;
            change.old_score = live;
            change.new_score = live;
        }
        if !changes.is_empty() {
            info!(
                round = state.round,
                match_over = state.is_match_over(),
                changes = changes.len(),
                "permanent scores settled"
            );
        }
        self.apply(&changes, timestamp);
        changes
    }
}
