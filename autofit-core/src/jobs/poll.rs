//! Caller-side polling with exponential backoff.

use crate::config::PollConfig;
use crate::error::AutoMlError;
use crate::jobs::service::JobService;
use crate::jobs::state::{JobId, JobStatusResponse};
use std::time::{Duration, Instant};

/// Poll cadence: start at `initial_interval`, multiply by `backoff_factor`
/// after each poll up to `max_interval`, give up after `max_wait`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.initial_interval_ms),
            max_interval: Duration::from_millis(config.max_interval_ms),
            backoff_factor: config.backoff_factor,
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }
}

impl PollPolicy {
    pub fn next_interval(&self, current: Duration) -> Duration {
        let factor = if self.backoff_factor.is_finite() && self.backoff_factor >= 1.0 {
            self.backoff_factor
        } else {
            1.0
        };
        current.mul_f64(factor).min(self.max_interval)
    }
}

/// Poll `id` until it reaches a terminal state.
///
/// `on_update` sees every observed state that differs from the previous one.
pub async fn wait_for_completion<F>(
    service: &JobService,
    id: &JobId,
    policy: &PollPolicy,
    mut on_update: F,
) -> Result<JobStatusResponse, AutoMlError>
where
    F: FnMut(&JobStatusResponse),
{
    let start = Instant::now();
    let mut interval = policy.initial_interval.min(policy.max_interval);
    let mut last: Option<JobStatusResponse> = None;
    loop {
        let status = service.status(id).await?;
        if last.as_ref() != Some(&status) {
            on_update(&status);
        }
        if status.is_terminal() {
            return Ok(status);
        }
        last = Some(status);

        let elapsed = start.elapsed();
        if elapsed >= policy.max_wait {
            return Err(AutoMlError::PollTimeout {
                id: id.to_string(),
                waited_secs: elapsed.as_secs(),
            });
        }
        tokio::time::sleep(interval.min(policy.max_wait - elapsed)).await;
        interval = policy.next_interval(interval);
    }
}
