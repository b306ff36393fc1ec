// Entity registry: canonical player/obstacle records plus a cell index kept in lockstep.

use super::errors::GameError;
use super::grid::Position;
use super::state::{Obstacle, ObstacleId, Occupant, Player, PlayerId, PlayerStatus};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    // Join order; this is also the base turn order.
    players: Vec<Player>,
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    cells: HashMap<Position, Occupant>,
    last_obstacle_id: ObstacleId,
}

impl EntityRegistry {
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    pub fn occupant_at(&self, pos: Position) -> Option<Occupant> {
        self.cells.get(&pos).copied()
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active())
    }

    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.player(player.id).is_some() {
            return Err(GameError::invariant(format!(
                "player {} registered twice",
                player.id
            )));
        }
        if let Some(pos) = player.position {
            if let Some(occupant) = self.occupant_at(pos) {
                return Err(GameError::invariant(format!(
                    "spawn cell {pos:?} already held by {occupant:?}"
                )));
            }
            self.cells.insert(pos, Occupant::Player(player.id));
        }
        self.players.push(player);
        Ok(())
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(idx);
        if let Some(pos) = player.position {
            self.cells.remove(&pos);
        }
        Some(player)
    }

    pub fn move_player(&mut self, id: PlayerId, to: Position) -> Result<(), GameError> {
        if let Some(occupant) = self.occupant_at(to) {
            return Err(GameError::invariant(format!(
                "move into {to:?} already held by {occupant:?}"
            )));
        }
        let player = self.player_mut(id)?;
        let Some(from) = player.position else {
            return Err(GameError::invariant(format!(
                "player {id} has no position to move from"
            )));
        };
        player.position = Some(to);
        self.cells.remove(&from);
        self.cells.insert(to, Occupant::Player(id));
        Ok(())
    }

    /// Marks a player defeated and frees its cell. The record itself stays.
    pub fn defeat_player(&mut self, id: PlayerId) -> Result<(), GameError> {
        let player = self.player_mut(id)?;
        player.status = PlayerStatus::Defeated;
        if let Some(pos) = player.position.take() {
            self.cells.remove(&pos);
        }
        Ok(())
    }

    /// Returns the remaining health.
    pub fn damage_player(&mut self, id: PlayerId, amount: u32) -> Result<u32, GameError> {
        let player = self.player_mut(id)?;
        player.health = player.health.saturating_sub(amount);
        Ok(player.health)
    }

    /// Returns the charges left after spending one.
    pub fn spend_obstacle_charge(&mut self, id: PlayerId) -> Result<u32, GameError> {
        let player = self.player_mut(id)?;
        if player.obstacle_charges == 0 {
            return Err(GameError::invariant(format!(
                "player {id} spent a charge it does not have"
            )));
        }
        player.obstacle_charges -= 1;
        Ok(player.obstacle_charges)
    }

    pub fn add_obstacle(&mut self, pos: Position, health: u32) -> Result<ObstacleId, GameError> {
        if let Some(occupant) = self.occupant_at(pos) {
            return Err(GameError::invariant(format!(
                "obstacle placed on {pos:?} already held by {occupant:?}"
            )));
        }
        self.last_obstacle_id += 1;
        let id = self.last_obstacle_id;
        self.obstacles.insert(
            id,
            Obstacle {
                id,
                position: pos,
                health,
            },
        );
        self.cells.insert(pos, Occupant::Obstacle(id));
        Ok(id)
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let obstacle = self.obstacles.remove(&id)?;
        self.cells.remove(&obstacle.position);
        Some(obstacle)
    }

    /// Returns the remaining health.
    pub fn damage_obstacle(&mut self, id: ObstacleId, amount: u32) -> Result<u32, GameError> {
        let Some(obstacle) = self.obstacles.get_mut(&id) else {
            return Err(GameError::invariant(format!("unknown obstacle {id}")));
        };
        obstacle.health = obstacle.health.saturating_sub(amount);
        Ok(obstacle.health)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Checks that the cell index mirrors the entity records exactly.
    pub fn verify_index(&self) -> Result<(), GameError> {
        let mut expected: HashMap<Position, Occupant> = HashMap::new();
        let placed = self
            .players
            .iter()
            .filter_map(|p| p.position.map(|pos| (pos, Occupant::Player(p.id))))
            .chain(
                self.obstacles
                    .values()
                    .map(|o| (o.position, Occupant::Obstacle(o.id))),
            );
        for (pos, occupant) in placed {
            if let Some(other) = expected.insert(pos, occupant) {
                return Err(GameError::invariant(format!(
                    "{occupant:?} and {other:?} share cell {pos:?}"
                )));
            }
        }
        if expected != self.cells {
            return Err(GameError::invariant("cell index out of sync with entities"));
        }
        Ok(())
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        match self.players.iter_mut().find(|p| p.id == id) {
            Some(player) => Ok(player),
            None => Err(GameError::invariant(format!("unknown player {id}"))),
        }
    }
}
