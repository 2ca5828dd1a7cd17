//! Waits for asynchronous actions to finish

use crate::api::actions::Action;
use crate::api::{ApiError, Client};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tfkit::Context;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between two status fetches
    pub interval: Duration,
    /// Budget from the first fetch until giving up
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("Timed out after {elapsed:?} waiting for action {action_id}")]
    Timeout { action_id: i64, elapsed: Duration },

    #[error("Action {action_id} failed: {message}")]
    ActionFailed { action_id: i64, message: String },

    #[error("Cancelled while waiting for action {action_id}")]
    Cancelled { action_id: i64 },

    #[error("Failed to fetch status of action {action_id}: {source}")]
    Api {
        action_id: i64,
        #[source]
        source: ApiError,
    },
}

pub struct Poller {
    config: PollerConfig,
}

impl Poller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    /// Polls `fetch` until the action reports a finish time.
    ///
    /// A failed status fetch ends the wait at once; there is no retry. The
    /// deadline is checked after each fetch, so a timeout is reported between
    /// the deadline and one interval past it.
    pub async fn wait<F, Fut>(
        &self,
        ctx: &Context,
        action_id: i64,
        mut fetch: F,
    ) -> Result<Action, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Action, ApiError>>,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;

        loop {
            let action = match fetch().await {
                Ok(action) => action,
                Err(ApiError::Cancelled) => return Err(WaitError::Cancelled { action_id }),
                Err(source) => return Err(WaitError::Api { action_id, source }),
            };

            if action.is_failed() {
                return Err(WaitError::ActionFailed {
                    action_id,
                    message: action.failure_message(),
                });
            }

            if action.is_finished() {
                tracing::debug!(
                    "Action {} finished after {:?}",
                    action_id,
                    started.elapsed()
                );
                return Ok(action);
            }

            if Instant::now() >= deadline {
                return Err(WaitError::Timeout {
                    action_id,
                    elapsed: started.elapsed(),
                });
            }

            tracing::debug!(
                "Action {} not finished (status {:?}), polling again in {:?}",
                action_id,
                action.status,
                self.config.interval
            );
            ctx.sleep(self.config.interval)
                .await
                .map_err(|_| WaitError::Cancelled { action_id })?;
        }
    }

    /// Waits on an action through the actions endpoint
    pub async fn wait_for_action(
        &self,
        ctx: &Context,
        client: &Client,
        action_id: i64,
    ) -> Result<Action, WaitError> {
        self.wait(ctx, action_id, move || async move {
            client.actions().get(ctx, action_id).await
        })
        .await
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(PollerConfig::default())
    }
}
