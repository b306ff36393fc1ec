// Domain-level game entities and the read-only snapshot handed to observers.

use super::grid::Position;

pub type PlayerId = u64;
pub type ObstacleId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Active,
    Defeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub pseudo: String,
    pub color: String,
    pub health: u32,
    pub obstacle_charges: u32,
    // None once the player has been defeated.
    pub position: Option<Position>,
    pub status: PlayerStatus,
}

impl Player {
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub position: Position,
    pub health: u32,
}

/// What sits on an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Player(PlayerId),
    Obstacle(ObstacleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub id: PlayerId,
    pub pseudo: String,
}

/// Immutable copy of the aggregate state, safe to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub grid_size: Option<u32>,
    pub players: Vec<Player>,
    // Ordered by obstacle id so repeated snapshots compare equal.
    pub obstacles: Vec<Obstacle>,
    pub phase: GamePhase,
    pub current_turn: Option<PlayerId>,
    pub winner: Option<Winner>,
}

impl GameSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_by_pseudo(&self, pseudo: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.pseudo == pseudo)
    }
}
