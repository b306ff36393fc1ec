use super::state::{Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ongoing,
    Winner(PlayerId),
    Draw,
}

/// Terminal check over the player list: one survivor wins, none is a draw.
pub fn evaluate(players: &[Player]) -> Verdict {
    let mut active = players.iter().filter(|p| p.is_active());
    match (active.next(), active.next()) {
        (None, _) => Verdict::Draw,
        (Some(survivor), None) => Verdict::Winner(survivor.id),
        (Some(_), Some(_)) => Verdict::Ongoing,
    }
}
