//! [`PeriodicExecutionContext`] – drives a component at a fixed rate.
//!
//! The context owns the component's lifecycle for the duration of a run:
//! it activates the component, calls `execute` once per tick on a
//! [`tokio::time::interval`], and deactivates it when the run ends. Each
//! `execute` runs synchronously to completion; nothing inside a cycle awaits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kobuki_types::{KobukiError, LifecycleState};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::component::KobukiComponent;
use crate::config::{self, ComponentConfig};

/// Fixed-rate scheduler for a [`KobukiComponent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicExecutionContext {
    period: Duration,
}

impl PeriodicExecutionContext {
    /// Create a context ticking at `rate_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`KobukiError::Config`] unless `rate_hz` is a positive,
    /// finite number with a non-zero, representable period.
    pub fn new(rate_hz: f64) -> Result<Self, KobukiError> {
        Ok(Self {
            period: config::period_for_rate(rate_hz)?,
        })
    }

    pub fn from_config(config: &ComponentConfig) -> Result<Self, KobukiError> {
        Self::new(config.rate_hz)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run until `shutdown` is raised. Returns the number of completed
    /// cycles.
    ///
    /// # Errors
    ///
    /// Activation errors are returned before the first tick. An `execute`
    /// error ends the run; the component is deactivated either way.
    pub async fn run(
        &self,
        component: &mut KobukiComponent,
        shutdown: Arc<AtomicBool>,
    ) -> Result<u64, KobukiError> {
        self.run_until(component, |_| shutdown.load(Ordering::SeqCst))
            .await
    }

    /// Run exactly `cycles` cycles.
    pub async fn run_cycles(
        &self,
        component: &mut KobukiComponent,
        cycles: u64,
    ) -> Result<u64, KobukiError> {
        self.run_until(component, |done| done >= cycles).await
    }

    async fn run_until<F>(
        &self,
        component: &mut KobukiComponent,
        mut stop: F,
    ) -> Result<u64, KobukiError>
    where
        F: FnMut(u64) -> bool,
    {
        component.activate()?;
        info!(period_ms = self.period.as_secs_f64() * 1e3, "execution context started");

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut completed = 0_u64;
        let outcome = loop {
            if stop(completed) {
                break Ok(completed);
            }
            ticker.tick().await;
            match component.execute() {
                Ok(report) => {
                    completed += 1;
                    if report.dispatched.rejected > 0 {
                        debug!(cycle = completed, rejected = report.dispatched.rejected, "driver rejected commands");
                    }
                }
                Err(e) => {
                    warn!(error = %e, cycle = completed, "execute failed; stopping");
                    break Err(e);
                }
            }
        };

        if component.state() == LifecycleState::Active {
            component.deactivate()?;
        }
        info!(cycles = completed, "execution context stopped");
        outcome
    }
}
