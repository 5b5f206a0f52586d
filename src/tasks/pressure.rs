//! Memory Pressure Task
//!
//! Background task that samples system memory and reclaims soft cache
//! values once usage crosses a threshold.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::System;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheRegistry;
use crate::config::Config;

// == Memory Probe ==
/// Source of the current memory usage ratio.
pub trait MemoryProbe: Send + 'static {
    /// Used over total memory in [0, 1], or None if unavailable.
    fn usage(&mut self) -> Option<f64>;
}

/// Probe backed by the operating system's memory counters.
pub struct SystemMemoryProbe {
    system: System,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn usage(&mut self) -> Option<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        Some(self.system.used_memory() as f64 / total as f64)
    }
}

// == Settings ==
#[derive(Debug, Clone, Copy)]
pub struct PressureSettings {
    pub interval: Duration,
    /// Usage ratio at or above which values are shed
    pub threshold: f64,
    /// Fraction of tracked soft values reclaimed per trigger
    pub shed_fraction: f64,
}

impl From<&Config> for PressureSettings {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.pressure_interval(),
            threshold: config.pressure_threshold,
            shed_fraction: config.shed_fraction,
        }
    }
}

/// Spawns a background task that sheds soft values under memory pressure.
///
/// Each tick samples `probe`; when usage reaches the threshold, the
/// registry's memory manager reclaims `shed_fraction` of its values, oldest
/// first, and every live cache is purged of the reclaimed entries.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_pressure_monitor<P: MemoryProbe>(
    registry: Arc<CacheRegistry>,
    mut probe: P,
    settings: PressureSettings,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting memory pressure monitor: interval={:?}, threshold={}, shed_fraction={}",
            settings.interval, settings.threshold, settings.shed_fraction
        );

        loop {
            tokio::time::sleep(settings.interval).await;

            let Some(usage) = probe.usage() else {
                debug!("Memory usage unavailable, skipping pressure check");
                continue;
            };
            if usage < settings.threshold {
                debug!("Memory usage at {:.2}, below threshold", usage);
                continue;
            }

            let reclaimed = match registry.memory_pressure().shed(settings.shed_fraction) {
                Ok(reclaimed) => reclaimed,
                Err(e) => {
                    warn!("Memory pressure shed failed: {}", e);
                    continue;
                }
            };
            let purged: usize = registry
                .list_known_caches()
                .iter()
                .map(|cache| cache.purge())
                .sum();
            info!(
                "Memory usage at {:.2}: reclaimed {} values, purged {} entries",
                usage, reclaimed, purged
            );
        }
    })
}
