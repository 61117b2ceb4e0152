use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{JobHandle, JobStatus, RemoteGenerationClient};
use crate::error::{AssetError, ClientError};
use crate::scene::AssetKind;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Five minutes at the default interval.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Wait for a video job to finish and return its result URI.
///
/// Each attempt sleeps `interval` first, then polls. Transient poll errors
/// use up an attempt; a stale credential ends the wait.
pub async fn wait_for_job(
    client: &dyn RemoteGenerationClient,
    job: &JobHandle,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<String, AssetError> {
    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Stopped polling {}: cancelled", job.as_str());
                return Err(AssetError::Cancelled);
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        let status = match client.poll_job(job).await {
            Ok(status) => status,
            Err(ClientError::EntityNotFound(_)) => {
                return Err(AssetError::StaleCredential {
                    kind: AssetKind::Video,
                });
            }
            Err(e) => {
                warn!(
                    "Failed to get job status ({}/{}): {}",
                    attempt, policy.max_attempts, e
                );
                continue;
            }
        };

        match status {
            JobStatus { done: false, .. } => {
                info!(
                    "Job {} running (poll {}/{})",
                    job.as_str(),
                    attempt,
                    policy.max_attempts
                );
            }
            JobStatus {
                error: Some(message),
                ..
            } => {
                return Err(AssetError::Rejected {
                    kind: AssetKind::Video,
                    message,
                });
            }
            JobStatus {
                result_uri: Some(uri),
                ..
            } => return Ok(uri),
            JobStatus { .. } => return Err(AssetError::MissingResult),
        }
    }

    Err(AssetError::Timeout {
        attempts: policy.max_attempts,
    })
}
