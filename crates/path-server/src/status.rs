//! Connected-client count in the terminal title.

use std::io;

use crossterm::execute;
use crossterm::terminal::SetTitle;
use tokio::sync::watch;

pub fn title(clients: usize) -> String {
    format!("Pathfinding Server - Connected Clients: [{}]", clients)
}

/// Refresh the title whenever the count changes, until shutdown.
pub async fn run_status_display(
    mut counts: watch::Receiver<usize>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let clients = *counts.borrow_and_update();
        if let Err(e) = execute!(io::stdout(), SetTitle(title(clients))) {
            tracing::debug!("could not set terminal title: {}", e);
        }

        tokio::select! {
            changed = counts.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
