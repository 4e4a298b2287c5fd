//! Periodic purge of dead sessions and password-reset tokens.
//!
//! Expired or revoked refresh-token sessions and used or expired reset
//! tokens are never read again; this job deletes them on a fixed interval.

use std::time::Duration;

use chatstory_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the retention loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Session retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session retention job stopping");
                break;
            }
            _ = interval.tick() => purge(&pool).await,
        }
    }
}

async fn purge(pool: &PgPool) {
    match SessionRepo::cleanup_expired(pool).await {
        Ok(0) => tracing::debug!("Session retention: no sessions to purge"),
        Ok(deleted) => tracing::info!(deleted, "Session retention: purged sessions"),
        Err(e) => tracing::error!(error = %e, "Session retention: session cleanup failed"),
    }

    match SessionRepo::cleanup_password_resets(pool).await {
        Ok(0) => tracing::debug!("Session retention: no reset tokens to purge"),
        Ok(deleted) => tracing::info!(deleted, "Session retention: purged reset tokens"),
        Err(e) => tracing::error!(error = %e, "Session retention: reset token cleanup failed"),
    }
}
