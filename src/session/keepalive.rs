//! Activity pings and token validation.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::{ApiClient, ApiError};

pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    Sent,
    /// No token resolves, so nothing was sent.
    Skipped,
    Failed,
}

pub async fn ping_once(api: &ApiClient) -> PingOutcome {
    if !api.session().snapshot().has_token() {
        return PingOutcome::Skipped;
    }
    match api.ping_activity().await {
        Ok(_) => PingOutcome::Sent,
        Err(e) => {
            log::warn!("Activity ping failed: {}", e);
            PingOutcome::Failed
        }
    }
}

/// Pings every `every` until `shutdown` turns true or its sender is dropped.
/// The first ping goes out one full interval after spawning.
pub fn spawn_keepalive(
    api: ApiClient,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::debug!("Keep-alive started, every {:?}", every);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = ping_once(&api).await;
                    log::debug!("Keep-alive tick: {:?}", outcome);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        log::debug!("Keep-alive stopped");
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    Valid,
    NoToken,
    Rejected,
    Unreachable,
    Unexpected(StatusCode),
}

/// Asks the backend whether the stored token is still good. A missing token,
/// a 401 or an unreachable server logs the user out locally; any other
/// failure is only logged.
pub async fn validate_token(api: &ApiClient) -> Result<TokenCheck, super::SessionError> {
    let check = match api.validate_token().await {
        Ok(_) => TokenCheck::Valid,
        Err(ApiError::Unauthenticated) => TokenCheck::NoToken,
        Err(ApiError::Auth { .. }) => TokenCheck::Rejected,
        Err(ApiError::Network(e)) => {
            log::warn!("Token validation could not reach the server: {}", e);
            TokenCheck::Unreachable
        }
        Err(ApiError::Status { status, .. }) => {
            log::warn!("Token validation returned {}", status);
            TokenCheck::Unexpected(status)
        }
        Err(ApiError::Validation(fields)) => {
            log::warn!("Token validation returned 400: {}", fields);
            TokenCheck::Unexpected(StatusCode::BAD_REQUEST)
        }
        Err(ApiError::Decode(e)) => {
            log::warn!("Token validation reply was malformed: {}", e);
            TokenCheck::Valid
        }
    };

    if matches!(
        check,
        TokenCheck::NoToken | TokenCheck::Rejected | TokenCheck::Unreachable
    ) {
        log::info!("Session is no longer valid ({:?}), logging out locally", check);
        api.session().logout_locally().await?;
    }
    Ok(check)
}
