//! Remote access client
//!
//! Instance boot time is unpredictable; the retry loop here is the
//! mechanism that absorbs that delay rather than a fixed sleep before the
//! first attempt.

use std::time::Duration;

use tracing::{debug, info};

use crate::errors::DeployError;
use crate::remote::shell::{RemoteShell, ShellError, ShellTarget};
use crate::utils::{default_sleep, SleepFn};

/// Connection retry policy
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Maximum connection attempts (at least 1)
    pub max_attempts: u32,

    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(1),
        }
    }
}

/// Establishes remote sessions with bounded retry.
pub struct RemoteAccessClient<T: RemoteShell> {
    shell: T,
    options: RetryOptions,
    sleep: SleepFn,
}

impl<T: RemoteShell> RemoteAccessClient<T> {
    pub fn new(shell: T, options: RetryOptions) -> Self {
        Self {
            shell,
            options,
            sleep: default_sleep(),
        }
    }

    /// Replace the sleep function (tests)
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    /// Attempt a connection up to `max_attempts` times with a fixed delay
    /// between attempts. Success on attempt `k` incurs exactly `k - 1`
    /// delays; exhaustion carries the last underlying error.
    pub async fn connect_with_retry(
        &self,
        target: &ShellTarget,
    ) -> Result<T::Session, DeployError> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut last_error: Option<ShellError> = None;

        for attempt in 1..=max_attempts {
            info!(
                "Connecting to {} (attempt {}/{})",
                target.address(),
                attempt,
                max_attempts
            );
            match self.shell.connect(target).await {
                Ok(session) => {
                    info!("Connected to {} on attempt {}", target.address(), attempt);
                    return Ok(session);
                }
                Err(e) => {
                    debug!("Connection attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                (self.sleep)(self.options.delay).await;
            }
        }

        Err(DeployError::RemoteAccessExhausted {
            attempts: max_attempts,
            source: last_error
                .unwrap_or_else(|| ShellError::Connect("no attempts made".to_string())),
        })
    }
}
