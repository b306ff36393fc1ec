// Network adapter modules split by the game WebSocket vs plain HTTP routes.

pub mod client;
pub mod snapshot;

pub use client::{spawn_update_serializer, ws_handler};
pub use snapshot::snapshot_handler;
