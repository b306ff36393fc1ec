// Use cases layer: application workflows for the game server.

pub mod game;
pub mod handle;
pub mod types;

pub use handle::{GameHandle, GameSettings};
pub use types::{CommandError, GameEvent, GameUpdate, Joined, ServerState};
