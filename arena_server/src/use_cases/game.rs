use super::types::{GameEvent, GameUpdate, Joined, ServerState};
use crate::domain::{GameEngine, GameError, GameRules};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Owns the engine and applies queued commands one at a time.
///
/// Replies go out before the resulting snapshot is broadcast, so a requester always sees
/// its own answer first.
pub async fn game_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    update_tx: broadcast::Sender<GameUpdate>,
    server_state_tx: watch::Sender<ServerState>,
    rules: GameRules,
) {
    let mut engine = GameEngine::new(rules);
    let mut version: u64 = 0;
    let mut round: u64 = 0;

    // Seed subscribers with the empty lobby.
    let _ = update_tx.send(GameUpdate {
        version,
        snapshot: engine.snapshot(),
    });

    while let Some(ev) = input_rx.recv().await {
        let changed = match ev {
            GameEvent::Join {
                pseudo,
                color,
                grid_size,
                reply,
            } => {
                let result = engine
                    .add_player(&pseudo, color.as_deref(), grid_size)
                    .map(|player| Joined { player, round });
                if let Err(err) = &result {
                    debug!(pseudo = %pseudo, error = %err, "join rejected");
                }
                let changed = mutated(&result);
                let _ = reply.send(result);
                changed
            }
            GameEvent::Action {
                player_id,
                action,
                reply,
            } => {
                let result = engine.execute(player_id, action);
                if let Err(err) = &result {
                    debug!(player_id, action = action.name(), error = %err, "action rejected");
                }
                let changed = mutated(&result);
                let _ = reply.send(result);
                changed
            }
            GameEvent::Leave { player_id } => match engine.remove_player(player_id) {
                Ok(changed) => changed,
                Err(err) => {
                    warn!(player_id, error = %err, "failed to remove player");
                    true
                }
            },
            GameEvent::Reset { reply } => {
                let result = engine.reset();
                if result.is_ok() {
                    round += 1;
                } else {
                    debug!("reset rejected; game not finished");
                }
                let changed = mutated(&result);
                let _ = reply.send(result);
                changed
            }
            GameEvent::Snapshot { reply } => {
                let _ = reply.send(Ok(engine.snapshot()));
                false
            }
        };

        if !changed {
            continue;
        }

        // Watch first: connections prefer it in their select, so a reset notice
        // precedes the snapshot that follows it.
        let next_state = ServerState {
            phase: engine.phase(),
            round,
        };
        server_state_tx.send_if_modified(|state| {
            if *state == next_state {
                false
            } else {
                *state = next_state;
                true
            }
        });

        version += 1;
        let _ = update_tx.send(GameUpdate {
            version,
            snapshot: engine.snapshot(),
        });
    }

    info!("command channel closed; game task exiting");
}

// Only rejected input leaves the state untouched; invariant failures still publish
// so observers see whatever the engine now holds.
fn mutated<T>(result: &Result<T, GameError>) -> bool {
    !matches!(result, Err(GameError::Validation(_)))
}
