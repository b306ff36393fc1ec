use crate::domain::GameRules;
use std::{env, net::IpAddr, str::FromStr};

// Runtime/server constants (not gameplay tuning).
pub const COMMAND_CHANNEL_CAPACITY: usize = 256;
pub const UPDATE_BROADCAST_CAPACITY: usize = 64;

const DEFAULT_HOST: [u8; 4] = [127, 0, 0, 1];
const DEFAULT_PORT: u16 = 3000;

pub fn http_host() -> IpAddr {
    parse_or("ARENA_SERVER_HOST", env::var("ARENA_SERVER_HOST").ok(), IpAddr::from(DEFAULT_HOST))
}

pub fn http_port() -> u16 {
    parse_or("ARENA_SERVER_PORT", env::var("ARENA_SERVER_PORT").ok(), DEFAULT_PORT)
}

/// Gameplay tuning from `ARENA_*` variables, falling back to defaults.
pub fn game_rules() -> GameRules {
    rules_from(|key| env::var(key).ok())
}

fn rules_from(lookup: impl Fn(&str) -> Option<String>) -> GameRules {
    let defaults = GameRules::default();
    let read = |key: &'static str, default| parse_or(key, lookup(key), default);

    let rules = GameRules {
        max_players: read("ARENA_MAX_PLAYERS", defaults.max_players as u32) as usize,
        min_players: read("ARENA_MIN_PLAYERS", defaults.min_players as u32) as usize,
        max_health: read("ARENA_MAX_HEALTH", defaults.max_health),
        attack_damage: read("ARENA_ATTACK_DAMAGE", defaults.attack_damage),
        obstacle_health: read("ARENA_OBSTACLE_HEALTH", defaults.obstacle_health),
        obstacle_charges: read("ARENA_OBSTACLE_CHARGES", defaults.obstacle_charges),
        ..defaults.clone()
    };

    let problems = rules.problems();
    if problems.is_empty() {
        rules
    } else {
        tracing::warn!(?problems, "invalid game rules in environment; using defaults");
        defaults
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "unparseable config value; using default");
            default
        }
    }
}
