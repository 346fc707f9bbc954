//! # Sweep Scheduler
//!
//! Background timers driving the two periodic processes: the overdue
//! sweep and scheduled-notification delivery. Cadence is a deployment
//! parameter, overridable through the environment the same way the rest
//! of the stack reads its deployment knobs.

use std::time::Duration;

use dede_core::Timestamp;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::notify::NotificationService;
use crate::sweep::DeadlineService;

/// Cadence configuration for the background sweeps.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Interval between overdue-sweep passes.
    pub sweep_interval: Duration,
    /// Interval between scheduled-notification passes.
    pub scheduled_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            scheduled_interval: Duration::from_secs(60),
        }
    }
}

impl SweepConfig {
    /// Read the cadence from `DEDE_SWEEP_INTERVAL_SECS` and
    /// `DEDE_SCHEDULED_INTERVAL_SECS`, falling back to the defaults for
    /// unset or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sweep_interval: env_secs("DEDE_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            scheduled_interval: env_secs("DEDE_SCHEDULED_INTERVAL_SECS")
                .unwrap_or(defaults.scheduled_interval),
        }
    }
}

fn env_secs(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!(var, value = %raw, "ignoring unparsable interval override");
            None
        }
    }
}

/// Handles of the spawned background tasks.
pub struct SchedulerHandles {
    /// The overdue-sweep loop.
    pub overdue: JoinHandle<()>,
    /// The scheduled-notification loop.
    pub scheduled: JoinHandle<()>,
}

impl SchedulerHandles {
    /// Stop both loops.
    pub fn abort(&self) {
        self.overdue.abort();
        self.scheduled.abort();
    }
}

/// Spawns and owns the periodic sweep tasks.
#[derive(Clone)]
pub struct SweepScheduler {
    deadlines: DeadlineService,
    notifications: NotificationService,
    config: SweepConfig,
}

impl SweepScheduler {
    /// Create a scheduler over the engine's services.
    pub fn new(
        deadlines: DeadlineService,
        notifications: NotificationService,
        config: SweepConfig,
    ) -> Self {
        Self {
            deadlines,
            notifications,
            config,
        }
    }

    /// Spawn both background loops onto the current tokio runtime.
    ///
    /// The loops run until aborted. Each pass logs its own summary; a
    /// pass never panics the loop — sweep errors are collected per item
    /// inside the pass itself.
    pub fn spawn(&self) -> SchedulerHandles {
        let deadlines = self.deadlines.clone();
        let sweep_interval = self.config.sweep_interval;
        let overdue = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                deadlines.run_overdue_sweep(Timestamp::now());
            }
        });

        let notifications = self.notifications.clone();
        let scheduled_interval = self.config.scheduled_interval;
        let scheduled = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduled_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let delivered = notifications.process_scheduled(Timestamp::now());
                if delivered > 0 {
                    tracing::info!(delivered, "scheduled notifications delivered");
                }
            }
        });

        SchedulerHandles { overdue, scheduled }
    }
}
