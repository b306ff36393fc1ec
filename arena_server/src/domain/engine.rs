// Authoritative game state machine. Every public call either fully applies or returns an
// error with the state untouched; the engine never does I/O beyond logging.

use super::actions::{self, ActionOutcome, PlayerAction};
use super::errors::{GameError, ValidationError};
use super::grid::{Grid, Position};
use super::registry::EntityRegistry;
use super::state::{GamePhase, GameSnapshot, Player, PlayerId, PlayerStatus, Winner};
use super::tuning::GameRules;
use super::turns::TurnSequencer;
use super::victory::{self, Verdict};
use tracing::{debug, info};

pub const DEFAULT_COLOR: &str = "#888888";

#[derive(Debug, Clone)]
pub struct GameEngine {
    rules: GameRules,
    // None until the first join fixes the board size.
    grid: Option<Grid>,
    registry: EntityRegistry,
    turns: TurnSequencer,
    phase: GamePhase,
    winner: Option<Winner>,
    // Player ids stay unique across resets.
    last_player_id: PlayerId,
}

impl GameEngine {
    pub fn new(rules: GameRules) -> Self {
        Self {
            rules,
            grid: None,
            registry: EntityRegistry::default(),
            turns: TurnSequencer::default(),
            phase: GamePhase::Lobby,
            winner: None,
            last_player_id: 0,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn current_turn(&self) -> Option<PlayerId> {
        match self.phase {
            GamePhase::InProgress => self.turns.current(),
            GamePhase::Lobby | GamePhase::Finished => None,
        }
    }

    /// Joins a new player. The first successful join fixes the board size; later
    /// requested sizes are ignored.
    pub fn add_player(
        &mut self,
        pseudo: &str,
        color: Option<&str>,
        grid_size: Option<u32>,
    ) -> Result<Player, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(ValidationError::JoinClosed.into());
        }
        if self.registry.players().len() >= self.rules.max_players {
            return Err(ValidationError::LobbyFull.into());
        }

        let pseudo = pseudo.trim();
        if pseudo.is_empty() {
            return Err(ValidationError::EmptyPseudo.into());
        }
        if pseudo.chars().count() > self.rules.max_pseudo_len {
            return Err(ValidationError::PseudoTooLong {
                max: self.rules.max_pseudo_len,
            }
            .into());
        }
        if self.registry.players().iter().any(|p| p.pseudo == pseudo) {
            return Err(ValidationError::PseudoTaken.into());
        }

        let grid = match self.grid {
            Some(grid) => {
                if let Some(requested) = grid_size.filter(|size| *size != grid.size()) {
                    debug!(requested, fixed = grid.size(), "grid size already fixed; ignoring");
                }
                grid
            }
            None => {
                let size = grid_size.unwrap_or(self.rules.default_grid_size);
                if !self.rules.is_allowed_grid_size(size) {
                    return Err(ValidationError::InvalidGridSize(size).into());
                }
                Grid::new(size)
            }
        };

        let spawn = grid
            .spawn_candidates()
            .into_iter()
            .find(|pos| self.registry.occupant_at(*pos).is_none())
            .ok_or(ValidationError::NoSpawnCell)?;

        let player = Player {
            id: self.last_player_id + 1,
            pseudo: pseudo.to_string(),
            color: color
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_COLOR)
                .to_string(),
            health: self.rules.max_health,
            obstacle_charges: self.rules.obstacle_charges,
            position: Some(spawn),
            status: PlayerStatus::Active,
        };
        self.registry.add_player(player.clone())?;
        self.last_player_id = player.id;
        self.grid = Some(grid);

        info!(
            player_id = player.id,
            pseudo = %player.pseudo,
            x = spawn.x,
            y = spawn.y,
            "player joined"
        );

        if self.registry.players().len() >= self.rules.min_players {
            self.start();
        }
        Ok(player)
    }

    pub fn execute_move(
        &mut self,
        player_id: PlayerId,
        target: Position,
    ) -> Result<ActionOutcome, GameError> {
        self.execute(player_id, PlayerAction::Move(target))
    }

    pub fn execute_attack(
        &mut self,
        player_id: PlayerId,
        target: Position,
    ) -> Result<ActionOutcome, GameError> {
        self.execute(player_id, PlayerAction::Attack(target))
    }

    pub fn execute_place_obstacle(
        &mut self,
        player_id: PlayerId,
        target: Position,
    ) -> Result<ActionOutcome, GameError> {
        self.execute(player_id, PlayerAction::PlaceObstacle(target))
    }

    /// Validates and applies one action, then either finishes the game or passes the turn.
    pub fn execute(
        &mut self,
        player_id: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionOutcome, GameError> {
        if self.phase != GamePhase::InProgress {
            return Err(ValidationError::GameNotInProgress.into());
        }
        let actor = self
            .registry
            .player(player_id)
            .ok_or(ValidationError::UnknownPlayer)?;
        if !actor.is_active() {
            return Err(ValidationError::PlayerDefeated.into());
        }
        if self.turns.current() != Some(player_id) {
            return Err(ValidationError::NotYourTurn.into());
        }
        let Some(grid) = self.grid else {
            return Err(GameError::invariant("match in progress without a grid"));
        };

        let plan = actions::validate(action, actor, grid, &self.registry)?;
        let outcome = actions::apply(plan, player_id, &mut self.registry, &self.rules)?;

        if let ActionOutcome::PlayerHit {
            target,
            defeated: true,
            ..
        } = outcome
        {
            info!(player_id = target, by = player_id, "player defeated");
            self.turns.remove(target);
        }
        self.registry.verify_index()?;

        match victory::evaluate(self.registry.players()) {
            Verdict::Ongoing => self.turns.advance(),
            verdict => self.finish(verdict),
        }
        debug!(player_id, action = action.name(), ?outcome, "action applied");
        Ok(outcome)
    }

    /// Handles a departing player. Returns whether anything changed.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<bool, GameError> {
        match self.phase {
            GamePhase::Lobby => {
                let Some(player) = self.registry.remove_player(player_id) else {
                    return Ok(false);
                };
                info!(player_id, pseudo = %player.pseudo, "player left lobby");
                // An empty lobby lets the next first joiner pick the board again.
                if self.registry.players().is_empty() {
                    self.grid = None;
                }
                Ok(true)
            }
            GamePhase::InProgress => {
                let active = self
                    .registry
                    .player(player_id)
                    .is_some_and(|p| p.is_active());
                if !active {
                    return Ok(false);
                }
                self.registry.defeat_player(player_id)?;
                self.turns.remove(player_id);
                self.registry.verify_index()?;
                info!(player_id, "player disconnected mid-game; marked defeated");

                let verdict = victory::evaluate(self.registry.players());
                if verdict != Verdict::Ongoing {
                    self.finish(verdict);
                }
                Ok(true)
            }
            GamePhase::Finished => Ok(false),
        }
    }

    pub fn reset(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::Finished {
            return Err(ValidationError::ResetNotAllowed.into());
        }
        self.registry.clear();
        self.turns = TurnSequencer::default();
        self.winner = None;
        self.grid = None;
        self.phase = GamePhase::Lobby;
        info!("game reset; back to lobby");
        Ok(())
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            grid_size: self.grid.map(|g| g.size()),
            players: self.registry.players().to_vec(),
            obstacles: self.registry.obstacles().cloned().collect(),
            phase: self.phase,
            current_turn: self.current_turn(),
            winner: self.winner.clone(),
        }
    }

    fn start(&mut self) {
        let order: Vec<PlayerId> = self.registry.active_players().map(|p| p.id).collect();
        self.turns = TurnSequencer::start(order);
        self.phase = GamePhase::InProgress;
        info!(
            players = self.registry.players().len(),
            first = ?self.turns.current(),
            "match started"
        );
    }

    fn finish(&mut self, verdict: Verdict) {
        self.winner = match verdict {
            Verdict::Winner(id) => self.registry.player(id).map(|p| Winner {
                id,
                pseudo: p.pseudo.clone(),
            }),
            Verdict::Draw | Verdict::Ongoing => None,
        };
        self.turns.stop();
        self.phase = GamePhase::Finished;
        info!(winner = ?self.winner.as_ref().map(|w| &w.pseudo), "match finished");
    }
}
