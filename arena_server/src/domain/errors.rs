// Domain-level errors for engine operations.

/// Rejected input. Always recoverable and always leaves the game state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("game not in progress")]
    GameNotInProgress,
    #[error("not your turn")]
    NotYourTurn,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("player is defeated")]
    PlayerDefeated,
    #[error("target out of bounds")]
    OutOfBounds,
    #[error("target not adjacent")]
    NotAdjacent,
    #[error("target cell occupied")]
    CellOccupied,
    #[error("target cell empty")]
    EmptyTarget,
    #[error("cannot target yourself")]
    SelfTarget,
    #[error("no obstacle charges remaining")]
    NoChargesRemaining,
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("action target is required")]
    MissingTarget,
    #[error("pseudo is required")]
    EmptyPseudo,
    #[error("pseudo is too long (max {max} characters)")]
    PseudoTooLong { max: usize },
    #[error("pseudo already in use")]
    PseudoTaken,
    #[error("lobby is full")]
    LobbyFull,
    #[error("game already started")]
    JoinClosed,
    #[error("grid size {0} is not allowed")]
    InvalidGridSize(u32),
    #[error("no free spawn cell")]
    NoSpawnCell,
    #[error("game is not finished")]
    ResetNotAllowed,
}

/// Everything an engine call can fail with.
///
/// `Invariant` is a broken internal contract, not bad input; it is logged at error level
/// where it is detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl GameError {
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::error!(%detail, "game invariant violated");
        GameError::Invariant(detail)
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            GameError::Validation(err) => Some(err),
            GameError::Invariant(_) => None,
        }
    }
}
