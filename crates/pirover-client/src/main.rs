//! PiRover terminal client entry point.
//!
//! Loads the configuration, opens a session to the rover, and forwards key
//! edges typed on standard input until the operator quits, presses Ctrl-C, or
//! the connection breaks.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file, defaults if absent
//!  └─ Session::open()          -- handshake, debouncers, heartbeat
//!  └─ event loop
//!       ├─ stdin "up press"    -> Session::on_key_event
//!       ├─ SessionEvent        -> log; stop on Closed
//!       └─ Ctrl-C / quit       -> Session::close
//! ```
//!
//! Usage: `pirover-client [CONFIG]`.  See `infrastructure::storage::config`
//! for how the config path is resolved.

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pirover_client::infrastructure::{
    key_input::{spawn_stdin_reader, KeyInput},
    session::{Session, SessionConfig, SessionEvent},
    storage::config::{load_config, resolve_config_path},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path(std::env::args().nth(1));
    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    // Initialise structured logging.  RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    info!(config = %config_path.display(), "PiRover client starting");

    let params = config
        .connection
        .to_parameters()
        .context("invalid connection settings")?;
    if params.record_video {
        warn!("video recording was requested; this client does not record video");
    }

    let (session, mut events) = Session::open(params, SessionConfig::default()).await?;
    info!(peer = %session.peer_addr(), "connected; type e.g. `up press`, `up release`, `quit`");

    let mut keys = spawn_stdin_reader().context("starting the key reader")?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // ── Main loop ─────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            input = keys.recv() => match input {
                Some(KeyInput::Edge(key, edge)) => {
                    if let Err(e) = session.on_key_event(key, edge).await {
                        warn!("key event dropped: {e}");
                        break;
                    }
                }
                Some(KeyInput::Quit) | None => {
                    info!("disconnect requested");
                    break;
                }
            },

            event = events.recv() => match event {
                Some(SessionEvent::Failed(e)) => error!("session failed: {e}"),
                Some(SessionEvent::Closed) | None => {
                    info!("session ended");
                    break;
                }
            },

            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    session.close().await;
    info!("PiRover client stopped");
    Ok(())
}
