// Framework bootstrap for the arena server runtime.

use crate::domain::GameRules;
use crate::frameworks::config;
use crate::interface_adapters::net::{snapshot_handler, spawn_update_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameHandle, GameSettings};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the arena on an already bound listener with default rules.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_with_rules(listener, GameRules::default()).await
}

/// Serves the arena on an already bound listener.
///
/// Each call spawns its own game task, so tests can run isolated servers side by side.
pub async fn run_with_rules(listener: tokio::net::TcpListener, rules: GameRules) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(rules);

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/snapshot", get(snapshot_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

/// Entry point for the binary: env, logging, bind, serve.
pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::http_host(), config::http_port());
    let rules = config::game_rules();
    tracing::debug!(?rules, "game rules loaded");

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_with_rules(listener, rules).await
}

fn build_state(rules: GameRules) -> Arc<AppState> {
    let (game, game_loop) = GameHandle::new(GameSettings {
        command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
        update_broadcast_capacity: config::UPDATE_BROADCAST_CAPACITY,
        rules,
    });
    // Serialize snapshots once for every connection. The serializer must be subscribed
    // before the game task publishes the initial lobby.
    spawn_update_serializer(&game);
    tokio::spawn(game_loop);

    Arc::new(AppState { game })
}
