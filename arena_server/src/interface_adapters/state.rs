use crate::use_cases::GameHandle;

#[derive(Clone)]
pub struct AppState {
    // Channels into and out of the single game task.
    pub game: GameHandle,
}
