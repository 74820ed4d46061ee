//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Binds the configured address/port.
//! - Accepts new TCP connections until the stop signal is raised.
//! - Spawns one task per connection; the accept loop never waits on a
//!   session.
//!
//! The per-connection logic lives in the `client` module.

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::warn;

use crate::client;
use crate::config::Config;
use crate::types::{ServerState, SessionGuard};

/// Bind the listener. Failing here is fatal for startup; there is no retry.
pub async fn bind(config: &Config) -> anyhow::Result<TcpListener> {
    let addr = config.socket_addr_string();
    TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))
}

/// Accept loop. Returns once `shutdown` becomes `true`; sessions already
/// running are left to finish on their own.
pub async fn serve(listener: TcpListener, state: ServerState, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            res = listener.accept() => match res {
                Ok((stream, peer_addr)) => {
                    if state.max_clients > 0 && state.clients.current() >= state.max_clients {
                        state.log.warn(format!(
                            "Rejecting connection from {}: max clients ({}) reached",
                            peer_addr, state.max_clients
                        ));
                        // Just drop the stream; client will see the connection closed.
                        continue;
                    }

                    // Counted here so the limit check above sees sessions not yet started.
                    let guard = SessionGuard::new(state.clients.clone(), peer_addr);
                    let state = state.clone();
                    tokio::spawn(async move {
                        client::run_client(stream, peer_addr, state, guard).await;
                    });
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                    state.log.warn(format!("Accept failed: {}", e));
                    // Usually fd exhaustion; give sessions a moment to close.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    tracing::debug!("accept loop stopped");
}
