//! Background tasks for the Parlor server.
//!
//! Includes:
//! - Sweeping aged attachments out of the in-memory store.

use crate::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Starts the attachment sweeper task.
///
/// Attachments are normally released when a generation consumes them or
/// their session disconnects; the sweeper is the defensive backstop for
/// entries that slip past both (e.g. uploaded but never referenced by a
/// chat turn on a long-lived connection).
pub async fn start_attachment_sweeper(state: Arc<AppState>, max_age_secs: u64) {
    if max_age_secs == 0 {
        tracing::warn!("attachment sweeper disabled (ttl=0)");
        return;
    }

    // Sweep every 60 seconds or ttl/2, whichever is smaller (but min 1s)
    let interval_secs = (max_age_secs / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_secs);

    tracing::info!(
        max_age_secs,
        interval_secs,
        "starting attachment sweeper task"
    );

    loop {
        sleep(interval).await;

        let swept = state
            .attachments
            .sweep_older_than(Duration::from_secs(max_age_secs));
        if swept > 0 {
            tracing::info!(count = swept, "swept aged attachments");
        }
    }
}
