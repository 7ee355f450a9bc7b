//! WebSocket server and connection handling.
//!
//! Every connection owns at most one match. Computer turns are resolved one
//! per `bot_think` tick so clients can show them as they happen; human
//! requests arriving in between are refused with `Busy`.

use crate::leaderboard::GlobalLeaderboard;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::SharedScoreStore;
use dashmap::DashMap;
use futures_util::{SinkExt, Stream, StreamExt};
use hexagram_core::ledger::{human_key, ScoreStore, LEADERBOARD_SIZE};
use hexagram_core::{ActionOutcome, BattleStyle, BotMode, MatchError, MatchEvent, MatchSession, MatchState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type Session = MatchSession<SharedScoreStore>;

/// Server state shared across all connections.
pub struct ServerState {
    /// Permanent score records, keyed like the ledger keys them
    pub scores: SharedScoreStore,
    pub leaderboard: GlobalLeaderboard,
    /// Mapping from connection ID to its message sender
    pub connections: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Delay before each computer turn
    pub bot_think: Duration,
}

impl ServerState {
    pub fn new(bot_think: Duration) -> Self {
        Self {
            scores: SharedScoreStore::new(),
            leaderboard: GlobalLeaderboard::new(),
            connections: DashMap::new(),
            bot_think,
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, connection_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.connections.get(&connection_id) {
            let _ = sender.send(msg);
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Hexagram UNO server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.connections.insert(connection_id, tx.clone());

    let welcome = ServerMessage::Welcome { connection_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    drive_connection(connection_id, ws_receiver, &state, &tx).await;

    state.connections.remove(&connection_id);
    send_task.abort();

    info!("Connection closed for {}", connection_id);
    Ok(())
}

/// Read client frames until the connection closes, resolving one computer
/// turn per `bot_think` tick while the match waits on the computer seats.
///
/// The tick is armed once when bots become pending and re-armed only after a
/// turn resolves; inbound frames never push it back.
async fn drive_connection<S>(
    connection_id: Uuid,
    mut incoming: S,
    state: &ServerState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut session: Option<Session> = None;

    let bot_tick = tokio::time::sleep(state.bot_think);
    tokio::pin!(bot_tick);
    let mut tick_armed = false;

    loop {
        let bots_pending = session.as_ref().is_some_and(|s| s.is_resolving_bots());
        if !bots_pending {
            tick_armed = false;
        } else if !tick_armed {
            bot_tick.as_mut().reset(Instant::now() + state.bot_think);
            tick_armed = true;
        }

        tokio::select! {
            msg = incoming.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => {
                            handle_message(connection_id, client_msg, &mut session, state, tx)
                        }
                        Err(e) => {
                            warn!("Invalid message from {}: {}", connection_id, e);
                            state.send_to(
                                connection_id,
                                ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                },
                            );
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client {} closing connection", connection_id);
                    break;
                }
                Some(Ok(Message::Ping(_))) => {
                    state.send_to(connection_id, ServerMessage::Pong);
                }
                Some(Err(e)) => {
                    error!("WebSocket error from {}: {}", connection_id, e);
                    break;
                }
                Some(Ok(_)) => {}
            },

            _ = &mut bot_tick, if tick_armed => {
                tick_armed = false;
                if let Some(session) = session.as_mut() {
                    if let Err(e) = session.resolve_bot_turn() {
                        warn!("Computer turn failed for {}: {}", connection_id, e);
                    }
                }
            }
        }
    }
}

/// Deal a new match whose steps are forwarded to `tx`.
fn create_session(
    player_name: &str,
    battle_style: BattleStyle,
    state: &ServerState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Session {
    let mut session = MatchSession::create(player_name, battle_style, state.scores.clone())
        .with_bot_mode(BotMode::Manual);

    let steps = tx.clone();
    session.subscribe(move |event: &MatchEvent, match_state: &MatchState| {
        let _ = steps.send(ServerMessage::Step {
            event: event.clone(),
            state: match_state.clone(),
        });
    });
    session
}

fn outcome<T>(result: &Result<T, MatchError>) -> ServerMessage {
    ServerMessage::ActionResult {
        outcome: ActionOutcome::from(result),
    }
}

fn no_match() -> ServerMessage {
    ServerMessage::Error {
        message: "No match in progress".to_string(),
    }
}

/// Handle a client message.
fn handle_message(
    connection_id: Uuid,
    msg: ClientMessage,
    session: &mut Option<Session>,
    state: &ServerState,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) {
    let reply = |msg: ServerMessage| state.send_to(connection_id, msg);

    match msg {
        ClientMessage::CreateMatch {
            player_name,
            battle_style,
        } => {
            let player_name = player_name.trim();
            if player_name.is_empty() {
                reply(ServerMessage::Error {
                    message: "Player name must not be blank".to_string(),
                });
                return;
            }

            let created = create_session(player_name, battle_style, state, tx);
            info!(%connection_id, player = player_name, "match created");
            reply(ServerMessage::MatchCreated {
                state: created.state().clone(),
            });
            *session = Some(created);
        }

        ClientMessage::Play { card } => match session.as_mut() {
            Some(s) => reply(outcome(&s.submit_play(card))),
            None => reply(no_match()),
        },

        ClientMessage::Draw => match session.as_mut() {
            Some(s) => reply(outcome(&s.submit_draw())),
            None => reply(no_match()),
        },

        ClientMessage::Assist => match session.as_mut() {
            Some(s) => reply(outcome(&s.request_assist())),
            None => reply(no_match()),
        },

        ClientMessage::ContinueRound => match session.as_mut() {
            Some(s) => reply(outcome(&s.continue_to_next_round())),
            None => reply(no_match()),
        },

        ClientMessage::RestartMatch => match session.as_mut() {
            Some(s) => {
                s.restart_match();
                reply(ServerMessage::ActionResult {
                    outcome: ActionOutcome::accepted(),
                });
            }
            None => reply(no_match()),
        },

        ClientMessage::GetRecord { player_name } => {
            let record = state.scores.get(&human_key(player_name.trim()));
            reply(ServerMessage::Record {
                player_name,
                record,
            });
        }

        ClientMessage::UploadLeaderboard { entry } => {
            let result = state.leaderboard.upsert(entry);
            if let Err(e) = &result {
                debug!(%connection_id, "leaderboard upload rejected: {}", e);
            }
            reply(ServerMessage::UploadResult {
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }

        ClientMessage::GetLeaderboard { limit } => {
            let entries = state.leaderboard.top(limit.unwrap_or(LEADERBOARD_SIZE));
            reply(ServerMessage::Leaderboard { entries });
        }

        ClientMessage::CheckPlayerName { player_name } => {
            let entry = state.leaderboard.get(&player_name);
            reply(ServerMessage::PlayerNameStatus {
                player_name,
                exists: entry.is_some(),
                entry,
            });
        }

        ClientMessage::CheckDevice { device_id } => {
            let uploaded = state.leaderboard.device_uploaded(&device_id);
            reply(ServerMessage::DeviceStatus {
                device_id,
                uploaded,
            });
        }

        ClientMessage::Ping => reply(ServerMessage::Pong),
    }
}
