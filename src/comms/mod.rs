//! Front ends. Each enabled channel is a [`Component`] sharing one
//! [`CommsState`]; [`start`] spawns them and returns immediately.

#[cfg(feature = "channel-axum")]
pub mod axum_channel;
#[cfg(feature = "channel-pty")]
pub mod pty;
pub mod state;

pub use state::{CommsEvent, CommsState, SessionRegistry, SharedSession};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assistant::StudyAssistant;
use crate::config::Config;
use crate::runtime::{Component, RuntimeHandle, spawn_components};

/// Spawn every configured channel. If one fails, `shutdown` is cancelled
/// and the rest stop too.
pub fn start(config: &Config, assistant: StudyAssistant, shutdown: CancellationToken) -> RuntimeHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(64);
    let state = Arc::new(CommsState::new(assistant, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }

    #[cfg(feature = "channel-axum")]
    {
        if config.comms_http_should_load() {
            info!(bind = %config.comms.http.bind, "loading http channel");
            components.push(Box::new(axum_channel::AxumChannel::new(
                "http0",
                config.comms.http.bind.clone(),
                state.clone(),
            )));
        }
    }

    #[cfg(not(feature = "channel-axum"))]
    {
        if config.comms_http_should_load() {
            tracing::warn!("http channel enabled in config but built without the channel-axum feature");
        }
    }

    drop(state);
    tokio::spawn(drain_events(event_rx));

    spawn_components(components, shutdown)
}

/// Log channel lifecycle events until every sender is gone.
async fn drain_events(mut rx: mpsc::Receiver<CommsEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            CommsEvent::SessionOpened { channel_id, session_id } => {
                debug!(%channel_id, %session_id, "session opened");
            }
            CommsEvent::SessionClosed { channel_id, session_id } => {
                debug!(%channel_id, %session_id, "session closed");
            }
            CommsEvent::ChannelShutdown { channel_id } => {
                info!(%channel_id, "channel stopped");
            }
        }
    }
}
