use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::AppResult;

/// Bounded retry schedule for loading a third-party capability
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_millis(500),
        }
    }
}

/// Outcome of an initialization routine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Unavailable { attempts: u32, reason: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Result of the most recent finished load
#[derive(Debug, Default)]
struct LoadRecord {
    failure: Option<Readiness>,
}

/// Process-wide "is the capability loaded" flag
///
/// The flag flips from false to true at most once. Only one load runs at a
/// time and callers that queue behind it receive its outcome. A failed load
/// stays failed until [`CapabilityLoader::reload`] is called.
pub struct CapabilityLoader {
    loaded: AtomicBool,
    /// Bumped each time a load finishes
    generation: AtomicU64,
    record: Mutex<LoadRecord>,
    policy: RetryPolicy,
}

impl CapabilityLoader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            loaded: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            record: Mutex::new(LoadRecord::default()),
            policy,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Loads the capability unless it is loaded or its last load failed
    pub async fn ensure_ready<F, Fut>(&self, load: F) -> Readiness
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        if self.is_ready() {
            return Readiness::Ready;
        }

        let mut record = self.record.lock().await;
        if self.is_ready() {
            return Readiness::Ready;
        }
        if let Some(failure) = &record.failure {
            return failure.clone();
        }

        self.run(&mut record, load).await
    }

    /// User-triggered load that ignores an earlier failure
    ///
    /// Callers that were already waiting when another load finished share
    /// that load's outcome instead of starting one more.
    pub async fn reload<F, Fut>(&self, load: F) -> Readiness
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        if self.is_ready() {
            return Readiness::Ready;
        }

        let seen = self.generation.load(Ordering::Acquire);
        let mut record = self.record.lock().await;
        if self.is_ready() {
            return Readiness::Ready;
        }
        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(failure) = &record.failure {
                return failure.clone();
            }
        }

        record.failure = None;
        self.run(&mut record, load).await
    }

    /// Runs `load` until it succeeds or the policy's attempts are used up
    async fn run<F, Fut>(&self, record: &mut LoadRecord, mut load: F) -> Readiness
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts = 0u32;

        let readiness = loop {
            attempts += 1;
            match load().await {
                Ok(()) => {
                    self.loaded.store(true, Ordering::Release);
                    tracing::info!(attempts, "Capability loaded");
                    break Readiness::Ready;
                }
                Err(e) if attempts >= max_attempts => {
                    tracing::error!(attempts, error = %e, "Capability unavailable");
                    break Readiness::Unavailable {
                        attempts,
                        reason: e.to_string(),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempts,
                        max_attempts,
                        error = %e,
                        "Capability load failed, retrying"
                    );
                    tokio::time::sleep(self.policy.interval).await;
                }
            }
        };

        record.failure = (!readiness.is_ready()).then(|| readiness.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        readiness
    }
}
