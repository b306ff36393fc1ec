// Turn sequencing over the active players, in join order.

use super::state::PlayerId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSequencer {
    order: Vec<PlayerId>,
    current: Option<PlayerId>,
}

impl TurnSequencer {
    /// Starts a rotation with the first id in `order` to play.
    pub fn start(order: Vec<PlayerId>) -> Self {
        let current = order.first().copied();
        Self { order, current }
    }

    pub fn current(&self) -> Option<PlayerId> {
        self.current
    }

    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    /// Hands the turn to the next id after the current one, wrapping around.
    pub fn advance(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        self.current = match self.order.iter().position(|id| *id == current) {
            Some(idx) => self.order.get((idx + 1) % self.order.len()).copied(),
            None => self.order.first().copied(),
        };
    }

    /// Drops `id` from the rotation for good. If it held the turn, the turn moves to
    /// whoever followed it.
    pub fn remove(&mut self, id: PlayerId) {
        let Some(idx) = self.order.iter().position(|p| *p == id) else {
            return;
        };
        self.order.remove(idx);
        if self.current == Some(id) {
            self.current = if self.order.is_empty() {
                None
            } else {
                self.order.get(idx % self.order.len()).copied()
            };
        }
    }

    pub fn stop(&mut self) {
        self.current = None;
    }
}
