// Use-case level inputs/outputs for the game loop.

use crate::domain::{
    ActionOutcome, GameError, GamePhase, GameSnapshot, Player, PlayerAction, PlayerId,
};
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T, GameError>>;

/// Commands funnelled into the single game task. Each one runs to completion before
/// the next is read.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        pseudo: String,
        color: Option<String>,
        grid_size: Option<u32>,
        reply: Reply<Joined>,
    },
    Action {
        player_id: PlayerId,
        action: PlayerAction,
        reply: Reply<ActionOutcome>,
    },
    Leave {
        player_id: PlayerId,
    },
    Reset {
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<GameSnapshot>,
    },
}

/// A successful join, tagged with the round it happened in.
#[derive(Debug, Clone)]
pub struct Joined {
    pub player: Player,
    pub round: u64,
}

/// High-level state watched by every connection. `round` bumps on each reset so
/// connections know to drop their player binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerState {
    pub phase: GamePhase,
    pub round: u64,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            phase: GamePhase::Lobby,
            round: 0,
        }
    }
}

/// Snapshot published after every accepted mutation.
#[derive(Debug, Clone)]
pub struct GameUpdate {
    pub version: u64,
    pub snapshot: GameSnapshot,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("game loop unavailable")]
    WorldClosed,
}
