//! WebAssembly bindings for the Hexagram UNO engine.
//!
//! This module exposes a match session to JavaScript through wasm-bindgen.
//! Everything crosses the boundary as JSON strings. Steps emitted while the
//! engine runs are buffered and collected with `takeSteps`.

use std::sync::{Arc, Mutex};
use wasm_bindgen::prelude::*;

use crate::actions::{ActionOutcome, MatchEvent};
use crate::catalog::CardId;
use crate::game::{BattleStyle, MatchError, MatchState, HUMAN_SEAT};
use crate::ledger::{human_key, MemoryStore, ScoreStore, LEADERBOARD_SIZE};
use crate::session::{now_millis, BotMode, MatchSession};
use crate::upload::{LeaderboardEntry, UploadQueue};
use serde::Serialize;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[derive(Serialize)]
struct Step<'a> {
    event: &'a MatchEvent,
    state: &'a MatchState,
}

fn parse_style(style: &str) -> Result<BattleStyle, JsValue> {
    match style {
        "" => Ok(BattleStyle::default()),
        "quick" => Ok(BattleStyle::Quick),
        "strategic" => Ok(BattleStyle::Strategic),
        other => Err(JsValue::from_str(&format!("Unknown battle style: {}", other))),
    }
}

fn outcome_json(result: &Result<Vec<MatchEvent>, MatchError>) -> String {
    serde_json::to_string(&ActionOutcome::from(result))
        .unwrap_or_else(|_| r#"{"accepted":false}"#.to_string())
}

/// WASM-exposed match wrapper
#[wasm_bindgen]
pub struct WasmMatch {
    session: MatchSession<MemoryStore>,
    steps: Arc<Mutex<Vec<String>>>,
}

#[wasm_bindgen]
impl WasmMatch {
    /// Create a match. `scores_json` is a previous `exportScores` result or
    /// an empty string.
    #[wasm_bindgen(constructor)]
    pub fn new(player_name: &str, battle_style: &str, scores_json: &str) -> Result<WasmMatch, JsValue> {
        let style = parse_style(battle_style)?;
        let store = if scores_json.trim().is_empty() {
            MemoryStore::new()
        } else {
            MemoryStore::from_json(scores_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid scores JSON: {}", e)))?
        };

        let mut session = MatchSession::create(player_name, style, store);
        let steps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&steps);
        session.subscribe(move |event: &MatchEvent, state: &MatchState| {
            if let (Ok(json), Ok(mut steps)) = (serde_json::to_string(&Step { event, state }), sink.lock()) {
                steps.push(json);
            }
        });

        Ok(WasmMatch { session, steps })
    }

    /// Get the current match state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(self.session.state()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the human seat's valid actions as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        let actions = self.session.state().valid_actions(HUMAN_SEAT);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Drain the steps emitted since the last call, as a JSON array of
    /// `{event, state}` objects
    #[wasm_bindgen(js_name = takeSteps)]
    pub fn take_steps(&self) -> String {
        let drained: Vec<String> = match self.steps.lock() {
            Ok(mut steps) => steps.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        format!("[{}]", drained.join(","))
    }

    /// Computer turns wait for `resolveBotTurn` when `manual` is set
    #[wasm_bindgen(js_name = setManualBots)]
    pub fn set_manual_bots(&mut self, manual: bool) {
        let mode = if manual { BotMode::Manual } else { BotMode::Auto };
        self.session.set_bot_mode(mode);
    }

    #[wasm_bindgen(js_name = isResolvingBots)]
    pub fn is_resolving_bots(&self) -> bool {
        self.session.is_resolving_bots()
    }

    /// Play a card by catalog key; returns `{accepted, reason}`
    #[wasm_bindgen(js_name = submitPlay)]
    pub fn submit_play(&mut self, card_key: &str) -> String {
        let result = card_key
            .parse::<CardId>()
            .map_err(MatchError::from)
            .and_then(|card| self.session.submit_play(card));
        outcome_json(&result)
    }

    #[wasm_bindgen(js_name = submitDraw)]
    pub fn submit_draw(&mut self) -> String {
        outcome_json(&self.session.submit_draw())
    }

    #[wasm_bindgen(js_name = requestAssist)]
    pub fn request_assist(&mut self) -> String {
        outcome_json(&self.session.request_assist())
    }

    #[wasm_bindgen(js_name = resolveBotTurn)]
    pub fn resolve_bot_turn(&mut self) -> String {
        outcome_json(&self.session.resolve_bot_turn())
    }

    #[wasm_bindgen(js_name = continueToNextRound)]
    pub fn continue_to_next_round(&mut self) -> String {
        outcome_json(&self.session.continue_to_next_round())
    }

    #[wasm_bindgen(js_name = restartMatch)]
    pub fn restart_match(&mut self) {
        self.session.restart_match();
    }

    /// Permanent scores as JSON, for the host to persist
    #[wasm_bindgen(js_name = exportScores)]
    pub fn export_scores(&self) -> String {
        self.session
            .ledger()
            .store()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// A human player's permanent record as JSON, or `null`
    #[wasm_bindgen(js_name = getRecord)]
    pub fn get_record(&self, player_name: &str) -> String {
        match self.session.ledger().store().get(&human_key(player_name)) {
            Some(record) => serde_json::to_string(&record).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }

    /// Local top human records as JSON
    #[wasm_bindgen(js_name = getLeaderboard)]
    pub fn get_leaderboard(&self) -> String {
        let top = self.session.ledger().store().leaderboard(LEADERBOARD_SIZE);
        serde_json::to_string(&top).unwrap_or_else(|_| "[]".to_string())
    }

    /// Upload payload for the human player
    #[wasm_bindgen(js_name = leaderboardEntry)]
    pub fn leaderboard_entry(&self, device_id: &str) -> String {
        let entry = LeaderboardEntry::from_record(&self.session.human_record(), device_id);
        serde_json::to_string(&entry).unwrap_or_else(|_| "null".to_string())
    }
}

/// WASM-exposed upload retry queue
#[wasm_bindgen]
pub struct WasmUploadQueue {
    queue: UploadQueue,
}

#[wasm_bindgen]
impl WasmUploadQueue {
    /// `queue_json` is a previous `toJson` result or an empty string
    #[wasm_bindgen(constructor)]
    pub fn new(queue_json: &str) -> Result<WasmUploadQueue, JsValue> {
        let queue = if queue_json.trim().is_empty() {
            UploadQueue::new()
        } else {
            UploadQueue::from_json(queue_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid queue JSON: {}", e)))?
        };
        Ok(WasmUploadQueue { queue })
    }

    pub fn enqueue(&mut self, entry_json: &str) -> Result<(), JsValue> {
        let entry: LeaderboardEntry = serde_json::from_str(entry_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid entry JSON: {}", e)))?;
        self.queue.enqueue(entry, now_millis());
        Ok(())
    }

    #[wasm_bindgen(js_name = nextBatch)]
    pub fn next_batch(&self) -> String {
        serde_json::to_string(&self.queue.next_batch()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Report an upload attempt; returns the resulting status as JSON
    pub fn report(&mut self, player_name: &str, uploaded: bool) -> String {
        let status = self.queue.report(player_name, uploaded);
        serde_json::to_string(&status).unwrap_or_else(|_| "null".to_string())
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> String {
        self.queue.to_json().unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style() {
        assert_eq!(parse_style("quick").ok(), Some(BattleStyle::Quick));
        assert_eq!(parse_style("").ok(), Some(BattleStyle::Strategic));
    }

    #[test]
    fn test_outcome_json() {
        let rejected: Result<Vec<MatchEvent>, MatchError> = Err(MatchError::Busy);
        assert_eq!(
            outcome_json(&rejected),
            r#"{"accepted":false,"reason":"Computer seats are still taking their turns"}"#
        );
    }
}
