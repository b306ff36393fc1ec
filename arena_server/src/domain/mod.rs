// Domain layer: the authoritative game engine and its rules.

pub mod actions;
pub mod engine;
pub mod errors;
pub mod grid;
pub mod registry;
pub mod state;
pub mod tuning;
pub mod turns;
pub mod victory;

pub use actions::{ActionOutcome, PlayerAction};
pub use engine::GameEngine;
pub use errors::{GameError, ValidationError};
pub use grid::{Grid, Position};
pub use state::{
    GamePhase, GameSnapshot, Obstacle, ObstacleId, Occupant, Player, PlayerId, PlayerStatus,
    Winner,
};
pub use tuning::GameRules;
