/// Gameplay tuning for a match.
///
/// Keep this separate from runtime/server configuration (ports, channel sizes, etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    /// Hard cap on joined players.
    pub max_players: usize,

    /// Joining this many players starts the match. Never below 2.
    pub min_players: usize,

    /// Starting (and maximum) player health.
    pub max_health: u32,

    /// Health removed by one attack, from players and obstacles alike.
    pub attack_damage: u32,

    /// Starting health of a freshly placed obstacle.
    pub obstacle_health: u32,

    /// Obstacles each player may place over a match.
    pub obstacle_charges: u32,

    /// Board sizes a first joiner may pick from.
    pub allowed_grid_sizes: Vec<u32>,

    /// Board size used when the first joiner does not ask for one.
    pub default_grid_size: u32,

    /// Longest accepted pseudo, in characters.
    pub max_pseudo_len: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_players: 4,
            min_players: 2,
            max_health: 100,
            attack_damage: 25,
            obstacle_health: 50,
            obstacle_charges: 3,
            allowed_grid_sizes: vec![8, 10, 12],
            default_grid_size: 10,
            max_pseudo_len: 24,
        }
    }
}

impl GameRules {
    pub fn is_allowed_grid_size(&self, size: u32) -> bool {
        self.allowed_grid_sizes.contains(&size)
    }

    /// Returns a list of problems; empty means the rules are usable.
    pub fn problems(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.min_players < 2 {
            out.push("min_players must be at least 2");
        }
        if self.max_players < self.min_players {
            out.push("max_players must be at least min_players");
        }
        if self.max_health == 0 {
            out.push("max_health must be positive");
        }
        if self.attack_damage == 0 {
            out.push("attack_damage must be positive");
        }
        if self.obstacle_health == 0 {
            out.push("obstacle_health must be positive");
        }
        if !self.is_allowed_grid_size(self.default_grid_size) {
            out.push("default_grid_size must be an allowed grid size");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_rules_are_default_then_no_problems_are_reported() {
        assert!(GameRules::default().problems().is_empty());
    }

    #[test]
    fn when_min_players_is_one_then_rules_are_rejected() {
        let rules = GameRules {
            min_players: 1,
            ..GameRules::default()
        };
        assert_eq!(rules.problems(), vec!["min_players must be at least 2"]);
    }

    #[test]
    fn when_cap_is_below_minimum_then_rules_are_rejected() {
        let rules = GameRules {
            max_players: 2,
            min_players: 3,
            ..GameRules::default()
        };
        assert_eq!(
            rules.problems(),
            vec!["max_players must be at least min_players"]
        );
    }
}
