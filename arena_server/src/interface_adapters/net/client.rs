use crate::domain::{GameError, GamePhase, PlayerAction, PlayerId, ValidationError};
use crate::interface_adapters::protocol::{
    ActionRequestDto, ClientMessage, JoinPayload, ProtocolError, ServerMessage, SnapshotDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_connection_id;
use crate::use_cases::{CommandError, GameHandle, GameUpdate, ServerState};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    UpdatesClosed,
    ServerStateClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

const RESET_NOTICE: &str = "New game available. Join the lobby.";
const SPECTATOR_NOTICE: &str = "Game full or in progress, you are spectating.";

/// Serializes each snapshot once and fans the frame out to every connection.
///
/// While the match is finished every state frame is followed by a `GAME_OVER` frame.
pub async fn update_serializer(
    mut update_rx: broadcast::Receiver<GameUpdate>,
    update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    update_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match update_rx.recv().await {
            Ok(update) => {
                let state_msg =
                    ServerMessage::GameStateUpdate(SnapshotDto::from(&update.snapshot));
                let txt = match serde_json::to_string(&state_msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(
                            error = ?e,
                            version = update.version,
                            "failed to serialize game state"
                        );
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = update_latest_tx.send(bytes.clone());
                let _ = update_bytes_tx.send(bytes);

                if update.snapshot.phase == GamePhase::Finished {
                    let over = ServerMessage::GameOver {
                        winner_pseudo: update.snapshot.winner.map(|w| w.pseudo),
                    };
                    match serde_json::to_string(&over) {
                        Ok(txt) => {
                            let _ = update_bytes_tx.send(Utf8Bytes::from(txt));
                        }
                        Err(e) => error!(error = ?e, "failed to serialize game over"),
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "update serializer lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("game updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_update_serializer(game: &GameHandle) {
    tokio::spawn(update_serializer(
        game.update_tx.subscribe(),
        game.update_bytes_tx.clone(),
        game.update_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let game = state.game.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, game))
}

async fn handle_socket(mut socket: WebSocket, game: GameHandle) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = next_connection_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);

    async move {
        let mut ctx = match bootstrap_connection(&mut socket, game).await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(error = ?e, "failed to bootstrap connection");
                let _ = send_close_with_reason(&mut socket, close_code::ERROR, "bootstrap failed")
                    .await;
                return;
            }
        };

        info!("client connected as spectator");

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
    }
    .instrument(span)
    .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Spectator,
    // Bound to a player created during `round`.
    Player { id: PlayerId, round: u64 },
}

struct ConnCtx {
    pub game: GameHandle,
    pub role: Role,
    // Last reset round this connection has acknowledged.
    pub round: u64,
    pub update_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub update_latest_rx: watch::Receiver<Utf8Bytes>,
    pub server_state_rx: watch::Receiver<ServerState>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_update_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn player_id(&self) -> Option<PlayerId> {
        match self.role {
            Role::Player { id, .. } => Some(id),
            Role::Spectator => None,
        }
    }

    async fn send(&mut self, socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
        let bytes = send_message(socket, msg).await?;
        self.msgs_out += 1;
        self.bytes_out += bytes as u64;
        Ok(())
    }
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    game: GameHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let update_bytes_rx = game.update_bytes_tx.subscribe();
    let mut update_latest_rx = game.update_latest_tx.subscribe();
    let mut server_state_rx = game.server_state_tx.subscribe();
    let round = server_state_rx.borrow_and_update().round;

    // Greet with the cached frame. Anything the byte stream delivers afterwards was
    // published no earlier than this frame.
    let greeting = latest_frame(&mut update_latest_rx).await?;

    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        game,
        role: Role::Spectator,
        round,
        update_bytes_rx,
        update_latest_rx,
        server_state_rx,
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_update_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    };

    let bytes_len = greeting.len();
    socket.send(Message::Text(greeting)).await?;
    ctx.msgs_out += 1;
    ctx.bytes_out += bytes_len as u64;
    Ok(ctx)
}

// Latest serialized state, waiting for the first one if the serializer has not caught up.
async fn latest_frame(rx: &mut watch::Receiver<Utf8Bytes>) -> Result<Utf8Bytes, NetError> {
    let frame = rx
        .wait_for(|bytes| !bytes.is_empty())
        .await
        .map_err(|_| NetError::UpdatesClosed)?;
    Ok(frame.clone())
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn control(result: Result<(), NetError>) -> Result<LoopControl, NetError> {
    match result {
        Ok(()) => Ok(LoopControl::Continue),
        Err(NetError::Ws(err)) => {
            // Peer is gone; disconnect follows immediately.
            debug!(error = ?err, "failed to send reply");
            Ok(LoopControl::Disconnect)
        }
        Err(err) => Err(err),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // Server state is polled first so a reset notice always precedes the snapshot
        // broadcast right after it.
        let outcome = tokio::select! {
            biased;

            changed_state = ctx.server_state_rx.changed() => match changed_state {
                Ok(()) => handle_server_state(socket, ctx).await,
                Err(_) => Err(NetError::ServerStateClosed),
            },

            update = ctx.update_bytes_rx.recv() => handle_update(socket, ctx, update).await,

            incoming = socket.recv() => handle_incoming_ws(socket, ctx, incoming).await,
        };

        let disconnect = match outcome {
            Ok(LoopControl::Continue) => false,
            Ok(LoopControl::Disconnect) => true,
            Err(e) => {
                fatal = Some(e);
                true
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_server_state(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let state = *ctx.server_state_rx.borrow_and_update();
    if state.round == ctx.round {
        return Ok(LoopControl::Continue);
    }
    ctx.round = state.round;

    // Bindings from an earlier round point at players the reset removed.
    if let Role::Player { id, round } = ctx.role {
        if round < state.round {
            debug!(player_id = id, "demoted to spectator after reset");
            ctx.role = Role::Spectator;
        }
    }

    let notice = ServerMessage::GameReset {
        message: RESET_NOTICE.to_string(),
    };
    control(ctx.send(socket, &notice).await)
}

async fn handle_update(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    update: Result<Utf8Bytes, broadcast::error::RecvError>,
) -> Result<LoopControl, NetError> {
    match update {
        Ok(bytes) => Ok(forward_update_bytes(bytes, socket, ctx).await),
        Err(broadcast::error::RecvError::Lagged(n)) => {
            if should_log(&mut ctx.last_update_lag_log) {
                warn!(missed = n, "game updates lagged; sending snapshot");
            }

            // Resync strategy: send the latest state frame.
            let latest = ctx.update_latest_rx.borrow().clone();
            if latest.is_empty() {
                if should_log(&mut ctx.last_update_lag_log) {
                    warn!("snapshot unavailable during lag recovery");
                }
                return Ok(LoopControl::Continue);
            }

            let bytes_len = latest.len();
            ctx.lag_recovery_count += 1;
            let outcome = forward_update_bytes(latest, socket, ctx).await;
            if should_log(&mut ctx.last_update_lag_log) {
                debug!(
                    bytes = bytes_len,
                    count = ctx.lag_recovery_count,
                    "sent lag recovery snapshot"
                );
            }
            Ok(outcome)
        }
        Err(broadcast::error::RecvError::Closed) => Err(NetError::UpdatesClosed),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    incoming: Option<Result<Message, Error>>,
) -> Result<LoopControl, NetError> {
    let msg = match incoming {
        Some(Ok(msg)) => msg,
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            return Ok(LoopControl::Disconnect);
        }
        None => {
            info!("websocket closed");
            return Ok(LoopControl::Disconnect);
        }
    };

    match msg {
        Message::Text(text) => {
            ctx.msgs_in += 1;
            ctx.bytes_in += text.len() as u64;

            match ClientMessage::parse(&text) {
                Ok(ClientMessage::JoinGame(payload)) => handle_join(socket, ctx, payload).await,
                Ok(ClientMessage::RequestAction(request)) => {
                    handle_action(socket, ctx, request).await
                }
                Ok(ClientMessage::ResetGame) => handle_reset(socket, ctx).await,
                Err(err) => handle_protocol_error(socket, ctx, err, text.len()).await,
            }
        }
        Message::Binary(_) => {
            ctx.close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            Ok(LoopControl::Disconnect)
        }
        Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
        Message::Close(_) => Ok(LoopControl::Disconnect),
    }
}

async fn handle_protocol_error(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    err: ProtocolError,
    bytes: usize,
) -> Result<LoopControl, NetError> {
    ctx.invalid_json += 1;
    if should_log(&mut ctx.last_invalid_input_log) {
        warn!(bytes, error = %err, "failed to parse client message");
    }

    if ctx.invalid_json > MAX_INVALID_JSON {
        ctx.close_frame = Some(CloseFrame {
            code: close_code::POLICY,
            reason: "too many invalid messages".into(),
        });
        return Ok(LoopControl::Disconnect);
    }

    control(
        ctx.send(socket, &ServerMessage::action_invalid(err.to_string()))
            .await,
    )
}

async fn handle_join(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    payload: JoinPayload,
) -> Result<LoopControl, NetError> {
    if ctx.player_id().is_some() {
        return control(
            ctx.send(socket, &ServerMessage::action_invalid("already joined as a player"))
                .await,
        );
    }

    let grid_size = payload.requested_grid_size();
    let reply = match ctx
        .game
        .join(payload.pseudo, payload.couleur, grid_size)
        .await
    {
        Ok(joined) => {
            ctx.role = Role::Player {
                id: joined.player.id,
                round: joined.round,
            };
            Span::current().record("player_id", joined.player.id);
            info!(pseudo = %joined.player.pseudo, "client joined as player");
            ServerMessage::JoinedAsPlayer {
                player_id: joined.player.id.to_string(),
            }
        }
        Err(CommandError::Game(GameError::Validation(
            ValidationError::LobbyFull | ValidationError::JoinClosed,
        ))) => ServerMessage::JoinedAsSpectator {
            message: SPECTATOR_NOTICE.to_string(),
        },
        Err(CommandError::Game(err)) => ServerMessage::action_invalid(err.to_string()),
        Err(CommandError::WorldClosed) => return Err(NetError::InputClosed),
    };

    control(ctx.send(socket, &reply).await)
}

async fn handle_action(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    request: ActionRequestDto,
) -> Result<LoopControl, NetError> {
    let Some(player_id) = ctx.player_id() else {
        if should_log(&mut ctx.last_invalid_input_log) {
            debug!("spectator action rejected");
        }
        return control(
            ctx.send(socket, &ServerMessage::action_invalid("spectators cannot act"))
                .await,
        );
    };

    let action = match PlayerAction::try_from(request) {
        Ok(action) => action,
        Err(err) => {
            return control(
                ctx.send(socket, &ServerMessage::action_invalid(err.to_string()))
                    .await,
            );
        }
    };

    match ctx.game.act(player_id, action).await {
        // Accepted actions are answered by the broadcast snapshot.
        Ok(_outcome) => Ok(LoopControl::Continue),
        Err(CommandError::Game(err)) => control(
            ctx.send(socket, &ServerMessage::action_invalid(err.to_string()))
                .await,
        ),
        Err(CommandError::WorldClosed) => Err(NetError::InputClosed),
    }
}

async fn handle_reset(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<LoopControl, NetError> {
    match ctx.game.reset().await {
        // The round change on the server state watch notifies every connection.
        Ok(()) => {
            info!("game reset requested");
            Ok(LoopControl::Continue)
        }
        Err(CommandError::Game(err)) => control(
            ctx.send(socket, &ServerMessage::action_invalid(err.to_string()))
                .await,
        ),
        Err(CommandError::WorldClosed) => Err(NetError::InputClosed),
    }
}

async fn forward_update_bytes(
    update_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = update_msg.len();
    match socket
        .send(Message::Text(update_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send game update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    // A binding from an older round refers to a player the reset already removed.
    let current_round = ctx.server_state_rx.borrow().round;
    if let Role::Player { id, round } = ctx.role {
        if round == current_round {
            ctx.game
                .leave(id)
                .await
                .map_err(|_| NetError::InputClosed)?;
        }
    }

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");
    Ok(())
}
