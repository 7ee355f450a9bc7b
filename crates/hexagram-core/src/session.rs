//! Match driver for a host application.
//!
//! [`MatchSession`] owns one [`MatchState`], the random source, the permanent
//! score ledger and the observers. Hosts call the human-facing operations
//! (play, draw, assist, continue, restart) and the session takes care of the
//! computer seats and settlement.
//!
//! Computer turns run in one of two modes:
//! - [`BotMode::Auto`]: every computer turn is resolved inside the human call
//! - [`BotMode::Manual`]: the match stays in `ResolvingBots` and the host
//!   paces it by calling [`MatchSession::resolve_bot_turn`]

use crate::actions::{MatchAction, MatchEvent};
use crate::bot::Bot;
use crate::catalog::CardId;
use crate::game::{BattleStyle, MatchError, MatchPhase, MatchState, HUMAN_SEAT};
use crate::ledger::{Ledger, LedgerBaseline, PermanentScoreChange, PermanentScoreRecord, ScoreStore};
use crate::player::SeatId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How computer turns are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BotMode {
    #[default]
    Auto,
    Manual,
}

/// Receives every match step along with the state right after it
pub trait MatchObserver {
    fn on_step(&mut self, event: &MatchEvent, state: &MatchState);
}

impl<F> MatchObserver for F
where
    F: FnMut(&MatchEvent, &MatchState),
{
    fn on_step(&mut self, event: &MatchEvent, state: &MatchState) {
        self(event, state)
    }
}

/// Handle returned by [`MatchSession::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Observers = Vec<(SubscriptionId, Box<dyn MatchObserver + Send>)>;

fn notify(observers: &mut Observers, event: &MatchEvent, state: &MatchState) {
    for (_, observer) in observers.iter_mut() {
        observer.on_step(event, state);
    }
}

/// Milliseconds since the Unix epoch
#[cfg(not(feature = "wasm"))]
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds since the Unix epoch
#[cfg(feature = "wasm")]
pub fn now_millis() -> u64 {
    js_sys::Date::now() as u64
}

/// A single match between one human and three computer seats
pub struct MatchSession<S: ScoreStore> {
    state: MatchState,
    ledger: Ledger<S>,
    baseline: LedgerBaseline,
    rng: StdRng,
    bot_mode: BotMode,
    observers: Observers,
    next_subscription: u64,
    /// Round whose permanent scores were already written
    settled_round: Option<u32>,
    last_settlement: Vec<PermanentScoreChange>,
    clock: fn() -> u64,
}

impl<S: ScoreStore> MatchSession<S> {
    /// Deal a new match for `player_name`
    pub fn create(player_name: impl Into<String>, battle_style: BattleStyle, store: S) -> Self {
        Self::from_rng(player_name.into(), battle_style, store, StdRng::from_entropy())
    }

    /// Deal a reproducible match
    pub fn with_seed(
        player_name: impl Into<String>,
        battle_style: BattleStyle,
        store: S,
        seed: u64,
    ) -> Self {
        Self::from_rng(
            player_name.into(),
            battle_style,
            store,
            StdRng::seed_from_u64(seed),
        )
    }

    /// Run an existing state, e.g. one built with [`MatchState::with_layout`]
    pub fn from_state(state: MatchState, store: S, seed: u64) -> Self {
        Self::assemble(state, store, StdRng::seed_from_u64(seed))
    }

    fn from_rng(player_name: String, battle_style: BattleStyle, store: S, mut rng: StdRng) -> Self {
        let state = MatchState::new(player_name, battle_style, &mut rng);
        info!(
            player = %state.human().name,
            ?battle_style,
            face_up = %state.face_up(),
            "match created"
        );
        Self::assemble(state, store, rng)
    }

    fn assemble(state: MatchState, store: S, rng: StdRng) -> Self {
        let mut ledger = Ledger::new(store);
        ledger.initialize_player(&state.human().name);
        let baseline = ledger.snapshot(&state);
        Self {
            state,
            ledger,
            baseline,
            rng,
            bot_mode: BotMode::default(),
            observers: Vec::new(),
            next_subscription: 0,
            settled_round: None,
            last_settlement: Vec::new(),
            clock: now_millis,
        }
    }

    pub fn with_bot_mode(mut self, bot_mode: BotMode) -> Self {
        self.bot_mode = bot_mode;
        self
    }

    /// Replace the timestamp source used for ledger history
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger<S> {
        &mut self.ledger
    }

    pub fn baseline(&self) -> &LedgerBaseline {
        &self.baseline
    }

    pub fn bot_mode(&self) -> BotMode {
        self.bot_mode
    }

    pub fn set_bot_mode(&mut self, bot_mode: BotMode) {
        self.bot_mode = bot_mode;
    }

    /// Changes written by the most recent settlement
    pub fn last_settlement(&self) -> &[PermanentScoreChange] {
        &self.last_settlement
    }

    /// The human player's permanent record
    pub fn human_record(&self) -> PermanentScoreRecord {
        let name = &self.state.human().name;
        self.ledger
            .player_record(name)
            .unwrap_or_else(|| PermanentScoreRecord::new(name.as_str()))
    }

    /// Whether computer turns are waiting to be resolved
    pub fn is_resolving_bots(&self) -> bool {
        self.state.phase == MatchPhase::ResolvingBots
    }

    pub fn subscribe<O>(&mut self, observer: O) -> SubscriptionId
    where
        O: MatchObserver + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Play a card from the human hand
    pub fn submit_play(&mut self, card: CardId) -> Result<Vec<MatchEvent>, MatchError> {
        self.human_action(MatchAction::Play(card))
    }

    /// Draw a card for the human seat
    pub fn submit_draw(&mut self) -> Result<Vec<MatchEvent>, MatchError> {
        self.human_action(MatchAction::Draw)
    }

    /// Let the opponent policy take the human seat's turn
    pub fn request_assist(&mut self) -> Result<Vec<MatchEvent>, MatchError> {
        if self.state.is_round_over() {
            return Err(MatchError::RoundOver);
        }
        if self.state.active_seat != HUMAN_SEAT {
            return Err(MatchError::AssistMisuse);
        }

        debug!("assist playing for the human seat");
        let mut events = self.policy_turn(HUMAN_SEAT)?;
        events.extend(self.after_human()?);
        Ok(events)
    }

    /// Resolve the active computer seat's turn.
    ///
    /// Only needed in [`BotMode::Manual`]; in auto mode the match never
    /// rests in `ResolvingBots`.
    pub fn resolve_bot_turn(&mut self) -> Result<Vec<MatchEvent>, MatchError> {
        if self.state.is_round_over() {
            return Err(MatchError::RoundOver);
        }
        if self.state.phase != MatchPhase::ResolvingBots {
            return Err(MatchError::NoBotTurn);
        }
        self.policy_turn(self.state.active_seat)
    }

    /// Deal the next round after an ordinary round end
    pub fn continue_to_next_round(&mut self) -> Result<Vec<MatchEvent>, MatchError> {
        let events = self.state.start_next_round(&mut self.rng)?;
        self.broadcast(&events);
        Ok(events)
    }

    /// Start the match over: fresh battle scores, new deal, new baseline
    pub fn restart_match(&mut self) -> Vec<MatchEvent> {
        let events = self.state.restart(&mut self.rng);
        self.baseline = self.ledger.snapshot(&self.state);
        self.settled_round = None;
        self.last_settlement.clear();
        info!(player = %self.state.human().name, "match restarted");
        self.broadcast(&events);
        events
    }

    fn human_action(&mut self, action: MatchAction) -> Result<Vec<MatchEvent>, MatchError> {
        if self.state.phase == MatchPhase::ResolvingBots {
            return Err(MatchError::Busy);
        }

        let Self {
            state,
            rng,
            observers,
            ..
        } = self;
        let mut events = state.apply_action_with(
            HUMAN_SEAT,
            action,
            rng,
            &mut |event: &MatchEvent, state: &MatchState| notify(observers, event, state),
        )?;
        events.extend(self.settle_if_finished());
        events.extend(self.after_human()?);
        Ok(events)
    }

    /// Hand control to the computer seats if the turn passed to them
    fn after_human(&mut self) -> Result<Vec<MatchEvent>, MatchError> {
        let mut events = Vec::new();
        while self.bot_mode == BotMode::Auto && self.state.phase == MatchPhase::ResolvingBots {
            events.extend(self.policy_turn(self.state.active_seat)?);
        }
        Ok(events)
    }

    fn policy_turn(&mut self, seat: SeatId) -> Result<Vec<MatchEvent>, MatchError> {
        let Self {
            state,
            rng,
            observers,
            ..
        } = self;
        let mut events = Bot::new(seat).take_turn(
            state,
            rng,
            &mut |event: &MatchEvent, state: &MatchState| notify(observers, event, state),
        )?;
        events.extend(self.settle_if_finished());
        Ok(events)
    }

    fn settle_if_finished(&mut self) -> Option<MatchEvent> {
        if !self.state.is_round_over() || self.settled_round == Some(self.state.round) {
            return None;
        }
        self.settled_round = Some(self.state.round);

        let changes = self
            .ledger
            .settle_round(&self.state, &self.baseline, (self.clock)());
        self.last_settlement = changes.clone();

        let event = MatchEvent::ScoresSettled { changes };
        notify(&mut self.observers, &event, &self.state);
        Some(event)
    }

    fn broadcast(&mut self, events: &[MatchEvent]) {
        for event in events {
            notify(&mut self.observers, event, &self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Direction;
    use crate::ledger::{MemoryStore, ScoreReason};
    use std::sync::{Arc, Mutex};

    fn id(key: &str) -> CardId {
        CardId::from_key(key).unwrap()
    }

    fn ids(keys: &[&str]) -> Vec<CardId> {
        keys.iter().map(|k| id(k)).collect()
    }

    fn session_from(face_up: &str, hands: [&[&str]; 4], deck_top: &[&str]) -> MatchSession<MemoryStore> {
        let state = MatchState::with_layout(
            "Mei".into(),
            BattleStyle::Strategic,
            id(face_up),
            hands.iter().map(|h| ids(h)).collect(),
            ids(deck_top),
        )
        .unwrap();
        MatchSession::from_state(state, MemoryStore::new(), 11).with_clock(|| 1_700_000_000_000)
    }

    #[test]
    fn test_create_registers_human_record() {
        let session = MatchSession::with_seed("Mei", BattleStyle::Quick, MemoryStore::new(), 1);
        assert!(session.ledger().player_record("Mei").is_some());
        assert_eq!(session.state().battle_style, BattleStyle::Quick);
        assert_eq!(session.baseline().seats.len(), 4);
    }

    #[test]
    fn test_seeded_sessions_match() {
        let a = MatchSession::with_seed("Mei", BattleStyle::Quick, MemoryStore::new(), 5);
        let b = MatchSession::with_seed("Mei", BattleStyle::Quick, MemoryStore::new(), 5);
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_auto_mode_returns_turn_to_human() {
        let mut session = session_from(
            "sky_sky_qian",
            [
                &["water_sky_xu", "earth_earth_kun"],
                &["water_water_kan", "lake_lake_dui"],
                &["water_thunder_zhun", "fire_fire_li"],
                &["thunder_thunder_zhen", "wind_wind_xun"],
            ],
            &[],
        );

        let events = session.submit_play(id("water_sky_xu")).unwrap();

        assert_eq!(session.state().active_seat, HUMAN_SEAT);
        assert_eq!(session.state().phase, MatchPhase::AwaitingHuman);
        assert_eq!(session.state().face_up(), id("thunder_thunder_zhen"));
        assert!(events.contains(&MatchEvent::BotThinking { seat: 3 }));
    }

    #[test]
    fn test_manual_mode_waits_for_host() {
        let mut session = session_from(
            "sky_sky_qian",
            [
                &["water_sky_xu", "earth_earth_kun"],
                &["water_water_kan", "lake_lake_dui"],
                &["water_thunder_zhun", "fire_fire_li"],
                &["thunder_thunder_zhen", "wind_wind_xun"],
            ],
            &[],
        )
        .with_bot_mode(BotMode::Manual);

        session.submit_play(id("water_sky_xu")).unwrap();
        assert!(session.is_resolving_bots());
        assert_eq!(session.submit_draw(), Err(MatchError::Busy));
        assert_eq!(session.request_assist(), Err(MatchError::AssistMisuse));

        session.resolve_bot_turn().unwrap();
        assert_eq!(session.state().active_seat, 2);
        session.resolve_bot_turn().unwrap();
        session.resolve_bot_turn().unwrap();

        assert_eq!(session.state().phase, MatchPhase::AwaitingHuman);
        assert_eq!(session.resolve_bot_turn(), Err(MatchError::NoBotTurn));
    }

    #[test]
    fn test_rejected_play_reaches_no_observer() {
        let mut session = session_from(
            "sky_sky_qian",
            [&["earth_earth_kun"], &["lake_lake_dui"], &["fire_fire_li"], &["wind_wind_xun"]],
            &[],
        );
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        session.subscribe(move |_: &MatchEvent, _: &MatchState| {
            *counter.lock().unwrap() += 1;
        });

        let before = session.state().clone();
        let result = session.submit_play(id("earth_earth_kun"));

        assert!(matches!(result, Err(MatchError::IllegalMove { .. })));
        assert_eq!(session.state(), &before);
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_observers_see_each_step_until_unsubscribed() {
        let mut session = session_from(
            "sky_water_song",
            [
                &["water_sky_xu", "earth_earth_kun"],
                &["lake_lake_dui"],
                &["fire_fire_li"],
                &["wind_sky_xiaoxu", "mountain_mountain_gen"],
            ],
            &[],
        )
        .with_bot_mode(BotMode::Manual);
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let sub = session.subscribe(move |event: &MatchEvent, state: &MatchState| {
            sink.lock()
                .unwrap()
                .push((event.clone(), state.active_seat, state.phase, state.direction));
        });

        session.submit_play(id("water_sky_xu")).unwrap();

        let log_now = log.lock().unwrap().clone();
        assert_eq!(log_now.len(), 3);
        assert!(matches!(log_now[0].0, MatchEvent::CardPlayed { seat: 0, .. }));
        assert_eq!(log_now[0].1, 0, "the turn has not moved on yet");
        assert_eq!(log_now[0].2, MatchPhase::AwaitingHuman);
        assert_eq!(log_now[0].3, Direction::Clockwise);
        assert_eq!(
            log_now[1],
            (
                MatchEvent::DirectionChanged {
                    seat: 0,
                    direction: Direction::CounterClockwise
                },
                0,
                MatchPhase::AwaitingHuman,
                Direction::CounterClockwise
            )
        );
        assert_eq!(
            log_now[2],
            (
                MatchEvent::TurnAdvanced { from: 0, to: 3 },
                3,
                MatchPhase::ResolvingBots,
                Direction::CounterClockwise
            )
        );

        assert!(session.unsubscribe(sub));
        assert!(!session.unsubscribe(sub));
        session.resolve_bot_turn().unwrap();
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_assist_plays_for_human() {
        let mut session = session_from(
            "sky_sky_qian",
            [
                &["earth_earth_kun", "water_sky_xu"],
                &["lake_lake_dui"],
                &["fire_fire_li"],
                &["wind_wind_xun"],
            ],
            &[],
        )
        .with_bot_mode(BotMode::Manual);

        let events = session.request_assist().unwrap();

        assert_eq!(events[0], MatchEvent::BotThinking { seat: 0 });
        assert_eq!(session.state().face_up(), id("water_sky_xu"));
        assert_eq!(session.state().human().hand, ids(&["earth_earth_kun"]));
        assert_eq!(session.state().active_seat, 1);
    }

    #[test]
    fn test_round_end_settles_once() {
        let mut session = session_from(
            "sky_sky_qian",
            [
                &["water_sky_xu"],
                &["lake_lake_dui", "fire_fire_li"],
                &["earth_earth_kun"],
                &["wind_wind_xun"],
            ],
            &[],
        );

        let events = session.submit_play(id("water_sky_xu")).unwrap();

        let settled: Vec<&MatchEvent> = events
            .iter()
            .filter(|e| matches!(e, MatchEvent::ScoresSettled { .. }))
            .collect();
        assert_eq!(settled.len(), 1);
        assert_eq!(session.last_settlement()[0].reason, ScoreReason::CardsCleared);
        assert_eq!(session.human_record().clear_cards, 1);
        assert_eq!(session.submit_draw(), Err(MatchError::RoundOver));
        assert_eq!(session.human_record().clear_cards, 1);

        let next = session.continue_to_next_round().unwrap();
        assert!(matches!(next[..], [MatchEvent::RoundStarted { round: 2, .. }]));
    }

    #[test]
    fn test_restart_takes_a_new_baseline() {
        let mut session = session_from(
            "sky_sky_qian",
            [
                &["water_sky_xu"],
                &["lake_lake_dui", "fire_fire_li"],
                &["earth_earth_kun"],
                &["wind_wind_xun"],
            ],
            &[],
        );
        session.ledger_mut().initialize_player("Mei");
        let mut record = session.human_record();
        record.total_score = 40;
        session.ledger_mut().store_mut().set("human_Mei", record);

        session.restart_match();

        assert_eq!(session.baseline().seats[0].score, 40);
        assert_eq!(session.state().round, 1);
        assert!(session.last_settlement().is_empty());
    }
}
