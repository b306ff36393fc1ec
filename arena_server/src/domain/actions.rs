// Per-action validation and execution.
//
// Validation only reads; execution only runs on a plan that validation produced, so a
// rejected action never touches the registry.

use super::errors::{GameError, ValidationError};
use super::grid::{Grid, Position};
use super::registry::EntityRegistry;
use super::state::{ObstacleId, Occupant, Player, PlayerId};
use super::tuning::GameRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Move(Position),
    Attack(Position),
    PlaceObstacle(Position),
}

impl PlayerAction {
    /// Builds an action from its wire name. Unrecognized names are rejected before any
    /// state is consulted.
    pub fn from_parts(
        action_type: &str,
        target: Option<Position>,
    ) -> Result<Self, ValidationError> {
        let build: fn(Position) -> PlayerAction = match action_type {
            "MOVE" => PlayerAction::Move,
            "ATTACK" => PlayerAction::Attack,
            "PLACE_OBSTACLE" => PlayerAction::PlaceObstacle,
            other => return Err(ValidationError::UnknownAction(other.to_string())),
        };
        target.map(build).ok_or(ValidationError::MissingTarget)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlayerAction::Move(_) => "MOVE",
            PlayerAction::Attack(_) => "ATTACK",
            PlayerAction::PlaceObstacle(_) => "PLACE_OBSTACLE",
        }
    }

    pub fn target(&self) -> Position {
        match *self {
            PlayerAction::Move(pos)
            | PlayerAction::Attack(pos)
            | PlayerAction::PlaceObstacle(pos) => pos,
        }
    }
}

/// What an applied action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Moved {
        to: Position,
    },
    PlayerHit {
        target: PlayerId,
        remaining: u32,
        defeated: bool,
    },
    ObstacleHit {
        target: ObstacleId,
        remaining: u32,
        destroyed: bool,
    },
    ObstaclePlaced {
        obstacle: ObstacleId,
        charges_left: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Plan {
    Move { to: Position },
    StrikePlayer { target: PlayerId },
    StrikeObstacle { target: ObstacleId },
    Place { at: Position },
}

pub(crate) fn validate(
    action: PlayerAction,
    actor: &Player,
    grid: Grid,
    registry: &EntityRegistry,
) -> Result<Plan, GameError> {
    let Some(from) = actor.position else {
        return Err(GameError::invariant(format!(
            "active player {} has no position",
            actor.id
        )));
    };

    let plan = match action {
        PlayerAction::Move(to) => {
            check_reach(grid, from, to)?;
            if registry.occupant_at(to).is_some() {
                return Err(ValidationError::CellOccupied.into());
            }
            Plan::Move { to }
        }
        PlayerAction::Attack(target) => {
            if !grid.in_bounds(target) {
                return Err(ValidationError::OutOfBounds.into());
            }
            if target == from {
                return Err(ValidationError::SelfTarget.into());
            }
            check_reach(grid, from, target)?;
            match registry.occupant_at(target) {
                None => return Err(ValidationError::EmptyTarget.into()),
                Some(Occupant::Player(id)) if id == actor.id => {
                    return Err(ValidationError::SelfTarget.into());
                }
                Some(Occupant::Player(id)) => Plan::StrikePlayer { target: id },
                Some(Occupant::Obstacle(id)) => Plan::StrikeObstacle { target: id },
            }
        }
        PlayerAction::PlaceObstacle(at) => {
            if actor.obstacle_charges == 0 {
                return Err(ValidationError::NoChargesRemaining.into());
            }
            check_reach(grid, from, at)?;
            if registry.occupant_at(at).is_some() {
                return Err(ValidationError::CellOccupied.into());
            }
            Plan::Place { at }
        }
    };
    Ok(plan)
}

pub(crate) fn apply(
    plan: Plan,
    actor: PlayerId,
    registry: &mut EntityRegistry,
    rules: &GameRules,
) -> Result<ActionOutcome, GameError> {
    let outcome = match plan {
        Plan::Move { to } => {
            registry.move_player(actor, to)?;
            ActionOutcome::Moved { to }
        }
        Plan::StrikePlayer { target } => {
            let remaining = registry.damage_player(target, rules.attack_damage)?;
            let defeated = remaining == 0;
            if defeated {
                registry.defeat_player(target)?;
            }
            ActionOutcome::PlayerHit {
                target,
                remaining,
                defeated,
            }
        }
        Plan::StrikeObstacle { target } => {
            let remaining = registry.damage_obstacle(target, rules.attack_damage)?;
            let destroyed = remaining == 0;
            if destroyed {
                registry.remove_obstacle(target);
            }
            ActionOutcome::ObstacleHit {
                target,
                remaining,
                destroyed,
            }
        }
        Plan::Place { at } => {
            let obstacle = registry.add_obstacle(at, rules.obstacle_health)?;
            let charges_left = registry.spend_obstacle_charge(actor)?;
            ActionOutcome::ObstaclePlaced {
                obstacle,
                charges_left,
            }
        }
    };
    Ok(outcome)
}

fn check_reach(grid: Grid, from: Position, target: Position) -> Result<(), ValidationError> {
    if !grid.in_bounds(target) {
        return Err(ValidationError::OutOfBounds);
    }
    if !Grid::is_adjacent(from, target) {
        return Err(ValidationError::NotAdjacent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::PlayerStatus;

    fn player(id: PlayerId, x: i32, y: i32, charges: u32) -> Player {
        Player {
            id,
            pseudo: format!("p{id}"),
            color: "#123456".to_string(),
            health: 100,
            obstacle_charges: charges,
            position: Some(Position::new(x, y)),
            status: PlayerStatus::Active,
        }
    }

    fn setup() -> (EntityRegistry, Grid) {
        let mut registry = EntityRegistry::default();
        registry.add_player(player(1, 1, 1, 3)).expect("add actor");
        registry.add_player(player(2, 2, 1, 3)).expect("add opponent");
        (registry, Grid::new(8))
    }

    fn check(
        registry: &EntityRegistry,
        grid: Grid,
        action: PlayerAction,
    ) -> Result<Plan, GameError> {
        let actor = registry.player(1).expect("actor").clone();
        validate(action, &actor, grid, registry)
    }

    #[test]
    fn when_action_name_is_unknown_then_it_is_rejected() {
        let result = PlayerAction::from_parts("DANCE", Some(Position::new(0, 0)));
        assert_eq!(result, Err(ValidationError::UnknownAction("DANCE".to_string())));
    }

    #[test]
    fn when_target_is_missing_then_action_is_rejected() {
        assert_eq!(
            PlayerAction::from_parts("MOVE", None),
            Err(ValidationError::MissingTarget)
        );
    }

    #[test]
    fn when_known_names_are_parsed_then_matching_actions_are_built() {
        let target = Position::new(3, 4);
        assert_eq!(
            PlayerAction::from_parts("ATTACK", Some(target)),
            Ok(PlayerAction::Attack(target))
        );
        assert_eq!(
            PlayerAction::from_parts("PLACE_OBSTACLE", Some(target)).map(|a| a.name()),
            Ok("PLACE_OBSTACLE")
        );
    }

    #[test]
    fn when_moving_to_an_empty_neighbour_then_plan_is_a_move() {
        let (registry, grid) = setup();
        let plan = check(&registry, grid, PlayerAction::Move(Position::new(1, 2)));
        assert_eq!(
            plan,
            Ok(Plan::Move {
                to: Position::new(1, 2)
            })
        );
    }

    #[test]
    fn when_move_target_is_invalid_then_reason_matches() {
        let (registry, grid) = setup();
        let reason = |pos| {
            check(&registry, grid, PlayerAction::Move(pos))
                .err()
                .and_then(|e| e.as_validation().cloned())
        };

        assert_eq!(reason(Position::new(1, -1)), Some(ValidationError::OutOfBounds));
        assert_eq!(reason(Position::new(3, 3)), Some(ValidationError::NotAdjacent));
        assert_eq!(reason(Position::new(2, 2)), Some(ValidationError::NotAdjacent));
        assert_eq!(reason(Position::new(2, 1)), Some(ValidationError::CellOccupied));
    }

    #[test]
    fn when_attacking_invalid_targets_then_reason_matches() {
        let (registry, grid) = setup();
        let reason = |pos| {
            check(&registry, grid, PlayerAction::Attack(pos))
                .err()
                .and_then(|e| e.as_validation().cloned())
        };

        assert_eq!(reason(Position::new(8, 1)), Some(ValidationError::OutOfBounds));
        assert_eq!(reason(Position::new(1, 1)), Some(ValidationError::SelfTarget));
        assert_eq!(reason(Position::new(3, 1)), Some(ValidationError::NotAdjacent));
        assert_eq!(reason(Position::new(0, 1)), Some(ValidationError::EmptyTarget));
    }

    #[test]
    fn when_attack_drops_player_to_zero_then_they_are_defeated_and_cell_freed() {
        let (mut registry, _) = setup();
        let rules = GameRules {
            attack_damage: 100,
            ..GameRules::default()
        };

        let outcome = apply(Plan::StrikePlayer { target: 2 }, 1, &mut registry, &rules)
            .expect("apply strike");

        assert_eq!(
            outcome,
            ActionOutcome::PlayerHit {
                target: 2,
                remaining: 0,
                defeated: true
            }
        );
        let target = registry.player(2).expect("record kept");
        assert_eq!(target.status, PlayerStatus::Defeated);
        assert_eq!(target.position, None);
        assert_eq!(registry.occupant_at(Position::new(2, 1)), None);
    }

    #[test]
    fn when_attack_leaves_health_then_player_stays_active() {
        let (mut registry, _) = setup();
        let rules = GameRules::default();

        apply(Plan::StrikePlayer { target: 2 }, 1, &mut registry, &rules).expect("apply strike");

        let target = registry.player(2).expect("target");
        assert_eq!(target.health, 75);
        assert!(target.is_active());
    }

    #[test]
    fn when_obstacle_health_reaches_zero_then_it_is_removed() {
        let (mut registry, grid) = setup();
        let rules = GameRules {
            obstacle_health: 25,
            ..GameRules::default()
        };
        let id = registry
            .add_obstacle(Position::new(1, 0), rules.obstacle_health)
            .expect("add obstacle");

        let plan = check(&registry, grid, PlayerAction::Attack(Position::new(1, 0)))
            .expect("attack obstacle is valid");
        let outcome = apply(plan, 1, &mut registry, &rules).expect("apply");

        assert_eq!(
            outcome,
            ActionOutcome::ObstacleHit {
                target: id,
                remaining: 0,
                destroyed: true
            }
        );
        assert_eq!(registry.obstacles().count(), 0);
        assert_eq!(registry.occupant_at(Position::new(1, 0)), None);
    }

    #[test]
    fn when_placing_without_charges_then_rejected_before_target_checks() {
        let mut registry = EntityRegistry::default();
        registry.add_player(player(1, 1, 1, 0)).expect("add actor");
        let grid = Grid::new(8);

        let result = check(&registry, grid, PlayerAction::PlaceObstacle(Position::new(9, 9)));

        assert_eq!(
            result.err().and_then(|e| e.as_validation().cloned()),
            Some(ValidationError::NoChargesRemaining)
        );
    }

    #[test]
    fn when_placing_obstacle_then_it_gets_configured_health_and_costs_a_charge() {
        let (mut registry, grid) = setup();
        let rules = GameRules::default();

        let plan = check(&registry, grid, PlayerAction::PlaceObstacle(Position::new(0, 1)))
            .expect("placement is valid");
        let outcome = apply(plan, 1, &mut registry, &rules).expect("apply");

        let ActionOutcome::ObstaclePlaced {
            obstacle,
            charges_left,
        } = outcome
        else {
            panic!("expected placement outcome, got {outcome:?}");
        };
        assert_eq!(charges_left, 2);
        let placed = registry.obstacle(obstacle).expect("obstacle stored");
        assert_eq!(placed.health, rules.obstacle_health);
        assert_eq!(placed.position, Position::new(0, 1));
        assert!(registry.verify_index().is_ok());
    }
}
