//! Bounded wait for provider-side file processing.
//!
//! An uploaded file must leave `PROCESSING` before it can be referenced in a
//! generation call. The wait polls at a fixed interval for a bounded number of
//! re-checks; a file still processing at the end is deleted. The whole wait,
//! status calls included, is capped at [`PollPolicy::deadline`].

use crate::ai::FileService;
use crate::models::{FileHandle, FileState};
use crate::{Error, Result};
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Re-checks after the initial status fetch.
    pub max_attempts: usize,
    /// Time allowed for the status calls themselves on top of [`max_wait`](Self::max_wait).
    pub status_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 24,
            status_timeout: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    /// Upper bound on time spent sleeping between status checks.
    pub fn max_wait(&self) -> Duration {
        self.interval
            .saturating_mul(u32::try_from(self.max_attempts).unwrap_or(u32::MAX))
    }

    /// Hard wall-clock cap on [`wait_until_ready`].
    pub fn deadline(&self) -> Duration {
        self.max_wait().saturating_add(self.status_timeout)
    }
}

enum PollError {
    StillProcessing,
    Upstream(Error),
}

/// Poll `name` until it is no longer processing.
///
/// - `ACTIVE` (or any other non-processing state) returns the handle.
/// - `FAILED` fails with [`Error::ProcessingFailed`] right away; the file is
///   left alone.
/// - Still `PROCESSING` after `max_attempts` re-checks, or status calls
///   stalling past the deadline: the file is deleted once and
///   [`Error::ProcessingTimeout`] is returned.
/// - Errors fetching the status are returned as-is, without retrying.
pub async fn wait_until_ready(
    files: &dyn FileService,
    name: &str,
    policy: &PollPolicy,
) -> Result<FileHandle> {
    let strategy = FixedInterval::new(policy.interval).take(policy.max_attempts);
    let mut checks = 0usize;

    let retry = RetryIf::spawn(
        strategy,
        || {
            checks += 1;
            let check = checks;
            async move {
                let handle = files.get_file(name).await.map_err(PollError::Upstream)?;
                debug!("File {} status check {}: {:?}", name, check, handle.state);
                if handle.is_processing() {
                    Err(PollError::StillProcessing)
                } else {
                    Ok(handle)
                }
            }
        },
        |e: &PollError| matches!(e, PollError::StillProcessing),
    );

    let outcome = match tokio::time::timeout(policy.deadline(), retry).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                "File {} status checks exceeded the {:?} deadline",
                name,
                policy.deadline()
            );
            Err(PollError::StillProcessing)
        }
    };

    match outcome {
        Ok(handle) if handle.state == FileState::Failed => {
            warn!("File {} failed processing", name);
            Err(Error::ProcessingFailed(name.to_string()))
        }
        Ok(handle) => {
            info!("File {} ready after {} status check(s)", name, checks);
            Ok(handle)
        }
        Err(PollError::StillProcessing) => {
            warn!(
                "File {} still processing after {} status checks, deleting it",
                name, checks
            );
            if let Err(e) = files.delete_file(name).await {
                warn!("Cleanup delete of {} failed: {}", name, e);
            }
            Err(Error::ProcessingTimeout {
                name: name.to_string(),
                attempts: checks,
            })
        }
        Err(PollError::Upstream(e)) => Err(e),
    }
}
