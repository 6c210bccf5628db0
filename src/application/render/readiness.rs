use std::{future::Future, num::NonZeroU32, time::Duration};

use tracing::debug;

/// How long to wait for a page to finish drawing before printing anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: NonZeroU32,
    pub interval: Duration,
}

impl ReadinessPolicy {
    pub fn new(attempts: NonZeroU32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    /// The check never reported ready; callers proceed regardless.
    Exhausted { attempts: u32 },
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Run `check` until it reports ready or the policy runs out of attempts,
/// sleeping `interval` between checks. A check error counts as "not ready".
pub async fn poll_ready<F, Fut, E>(policy: ReadinessPolicy, mut check: F) -> Readiness
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::fmt::Display,
{
    let limit = policy.attempts.get();
    for attempt in 1..=limit {
        match check().await {
            Ok(true) => return Readiness::Ready { attempts: attempt },
            Ok(false) => {}
            Err(err) => {
                debug!(
                    target = "lpi_export::render::readiness",
                    attempt,
                    error = %err,
                    "Readiness check failed"
                );
            }
        }
        if attempt < limit {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Readiness::Exhausted { attempts: limit }
}
