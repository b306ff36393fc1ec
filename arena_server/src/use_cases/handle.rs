// Wiring for the single game instance: channels plus request/reply helpers.

use crate::domain::{ActionOutcome, GameRules, GameSnapshot, PlayerAction, PlayerId};
use crate::use_cases::game::game_task;
use crate::use_cases::types::{Joined, Reply};
use crate::use_cases::{CommandError, GameEvent, GameUpdate, ServerState};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Shared configuration for spawning the game task.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Capacity for inbound commands.
    pub command_channel_capacity: usize,
    /// Capacity for broadcast snapshots.
    pub update_broadcast_capacity: usize,
    /// Gameplay tuning handed to the engine.
    pub rules: GameRules,
}

/// Channels into and out of the game task.
#[derive(Clone)]
pub struct GameHandle {
    /// Sender for commands into the game task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw snapshots.
    pub update_tx: broadcast::Sender<GameUpdate>,
    /// Broadcast sender for serialized frames.
    pub update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized snapshot frame.
    pub update_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for phase/round changes.
    pub server_state_tx: watch::Sender<ServerState>,
    rules: Arc<GameRules>,
}

impl GameHandle {
    /// Creates the channels and spawns the authoritative game task.
    pub fn spawn(settings: GameSettings) -> Self {
        let (handle, game_loop) = Self::new(settings);
        tokio::spawn(game_loop);
        handle
    }

    /// Creates the channels and returns the game task without starting it.
    ///
    /// Subscribers attached before the task is spawned are guaranteed to see the
    /// initial snapshot.
    pub fn new(settings: GameSettings) -> (Self, impl Future<Output = ()> + Send + 'static) {
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(settings.command_channel_capacity);
        let (update_tx, _update_rx) =
            broadcast::channel::<GameUpdate>(settings.update_broadcast_capacity);
        let (update_bytes_tx, _update_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(settings.update_broadcast_capacity);
        let (update_latest_tx, _update_latest_rx) =
            watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (server_state_tx, _server_state_rx) =
            watch::channel::<ServerState>(ServerState::default());

        let game_loop = game_task(
            input_rx,
            update_tx.clone(),
            server_state_tx.clone(),
            settings.rules.clone(),
        );

        let handle = Self {
            input_tx,
            update_tx,
            update_bytes_tx,
            update_latest_tx,
            server_state_tx,
            rules: Arc::new(settings.rules),
        };
        (handle, game_loop)
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub async fn join(
        &self,
        pseudo: String,
        color: Option<String>,
        grid_size: Option<u32>,
    ) -> Result<Joined, CommandError> {
        self.request(|reply| GameEvent::Join {
            pseudo,
            color,
            grid_size,
            reply,
        })
        .await
    }

    pub async fn act(
        &self,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionOutcome, CommandError> {
        self.request(|reply| GameEvent::Action {
            player_id,
            action,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), CommandError> {
        self.input_tx
            .send(GameEvent::Leave { player_id })
            .await
            .map_err(|_| CommandError::WorldClosed)
    }

    pub async fn reset(&self) -> Result<(), CommandError> {
        self.request(|reply| GameEvent::Reset { reply }).await
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, CommandError> {
        self.request(|reply| GameEvent::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> GameEvent,
    ) -> Result<T, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.input_tx
            .send(build(reply))
            .await
            .map_err(|_| CommandError::WorldClosed)?;
        let result = rx.await.map_err(|_| CommandError::WorldClosed)?;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameError, GamePhase, Position, ValidationError};

    fn handle() -> GameHandle {
        GameHandle::spawn(GameSettings {
            command_channel_capacity: 8,
            update_broadcast_capacity: 8,
            rules: GameRules::default(),
        })
    }

    #[tokio::test]
    async fn when_two_players_join_through_the_handle_then_match_starts() {
        let game = handle();

        let ana = game
            .join("Ana".to_string(), Some("#f00".to_string()), Some(8))
            .await
            .expect("ana joins");
        game.join("Bo".to_string(), None, None)
            .await
            .expect("bo joins");

        let snapshot = game.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.phase, GamePhase::InProgress);
        assert_eq!(snapshot.current_turn, Some(ana.player.id));
        assert_eq!(snapshot.grid_size, Some(8));
    }

    #[tokio::test]
    async fn when_action_is_invalid_then_handle_surfaces_the_validation_error() {
        let game = handle();
        let ana = game
            .join("Ana".to_string(), None, Some(8))
            .await
            .expect("ana joins");

        let result = game
            .act(ana.player.id, PlayerAction::Move(Position::new(1, 0)))
            .await;

        assert!(matches!(
            result,
            Err(CommandError::Game(GameError::Validation(
                ValidationError::GameNotInProgress
            )))
        ));
    }

    #[tokio::test]
    async fn when_subscribed_before_the_task_starts_then_initial_snapshot_is_seen() {
        let (game, game_loop) = GameHandle::new(GameSettings {
            command_channel_capacity: 8,
            update_broadcast_capacity: 8,
            rules: GameRules::default(),
        });
        let mut updates = game.update_tx.subscribe();

        tokio::spawn(game_loop);

        let first = updates.recv().await.expect("initial update");
        assert_eq!(first.version, 0);
        assert_eq!(first.snapshot.phase, GamePhase::Lobby);
    }

    #[tokio::test]
    async fn when_reset_is_requested_mid_lobby_then_it_is_refused() {
        let game = handle();

        let result = game.reset().await;

        assert!(matches!(
            result,
            Err(CommandError::Game(GameError::Validation(
                ValidationError::ResetNotAllowed
            )))
        ));
    }
}
