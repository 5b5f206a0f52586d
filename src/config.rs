//! Configuration Module
//!
//! Loads admin and memory-pressure settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin diagnostics HTTP port
    pub admin_port: u16,
    /// Seconds between memory-pressure probes
    pub pressure_interval: u64,
    /// Used/total memory ratio that triggers shedding
    pub pressure_threshold: f64,
    /// Fraction of soft values reclaimed per trigger
    pub shed_fraction: f64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ADMIN_PORT` - Admin HTTP port (default: 3000)
    /// - `CACHE_PRESSURE_INTERVAL` - Probe frequency in seconds (default: 5)
    /// - `CACHE_PRESSURE_THRESHOLD` - Memory usage ratio that triggers shedding (default: 0.90)
    /// - `CACHE_SHED_FRACTION` - Fraction of soft values reclaimed per trigger (default: 0.25)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            admin_port: env_or("CACHE_ADMIN_PORT", defaults.admin_port),
            pressure_interval: env_or("CACHE_PRESSURE_INTERVAL", defaults.pressure_interval),
            pressure_threshold: env_or("CACHE_PRESSURE_THRESHOLD", defaults.pressure_threshold),
            shed_fraction: env_or("CACHE_SHED_FRACTION", defaults.shed_fraction),
        }
    }

    pub fn pressure_interval(&self) -> Duration {
        Duration::from_secs(self.pressure_interval.max(1))
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_port: 3000,
            pressure_interval: 5,
            pressure_threshold: 0.90,
            shed_fraction: 0.25,
        }
    }
}
