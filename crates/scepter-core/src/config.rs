//! Configuration loading and typed config structures for the Scepter service.
//!
//! The canonical configuration lives in `scepter-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `scepter-config.yaml`. All fields have
/// defaults matching the reference deployment, so an absent file or an
/// empty document yields a runnable configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScepterConfig {
    /// Service-level settings (name, RNG seed, loop timing).
    #[serde(default)]
    pub service: ServiceConfig,

    /// World clock settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Rotation cycle settings.
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Reveal / handoff animation settings.
    #[serde(default)]
    pub reveal: RevealConfig,

    /// Observer sync cadence settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Observer HTTP server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Seed roster settings.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Run boundary settings.
    #[serde(default)]
    pub bounds: BoundsConfig,
}

impl ScepterConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `SCEPTER_OBSERVER_PORT` environment variable overrides
    /// `observer.port`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.observer.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.observer.apply_env_overrides();
        Ok(config)
    }
}

/// Service-level settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    /// Human-readable service name used in logs and the status page.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Seed for the selection RNG. Runs with the same seed, clock, and
    /// participant set pick the same winners.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time sleep between scheduler loop iterations, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// World clock settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    /// Number of world-clock ticks in one simulated day.
    #[serde(default = "default_ticks_per_day")]
    pub ticks_per_day: u64,

    /// How many world-clock ticks elapse per scheduler poll when the
    /// clock is left to run on its own.
    #[serde(default = "default_ticks_per_poll")]
    pub ticks_per_poll: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ticks_per_day: default_ticks_per_day(),
            ticks_per_poll: default_ticks_per_poll(),
        }
    }
}

/// Rotation cycle settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RotationConfig {
    /// Length of one holder's tenure, in simulated days. Minimum 1.
    #[serde(default = "default_duration_days")]
    pub duration_days: u64,

    /// Simulated days between scheduled rotations.
    #[serde(default = "default_days_between_cycles")]
    pub days_between_cycles: u64,

    /// Whether scheduled rotations fire without an explicit start.
    #[serde(default = "default_autostart_enabled")]
    pub autostart_enabled: bool,

    /// Remainder ticks at or below this threshold do not round the
    /// days-remaining display up by one. See the quantization rule in
    /// [`crate::sync`].
    #[serde(default)]
    pub negligible_remainder_ticks: u64,

    /// Scheduler polls between day-change / trigger bookkeeping passes.
    /// Expiry is still checked every poll; a detected clock jump forces
    /// the bookkeeping pass immediately.
    #[serde(default = "default_time_check_interval")]
    pub time_check_interval_ticks: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            duration_days: default_duration_days(),
            days_between_cycles: default_days_between_cycles(),
            autostart_enabled: default_autostart_enabled(),
            negligible_remainder_ticks: 0,
            time_check_interval_ticks: default_time_check_interval(),
        }
    }
}

/// Reveal / handoff animation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RevealConfig {
    /// Wall-clock delay between broadcasting a reveal and committing the
    /// grant. Slightly longer than the presentation so observers see the
    /// roulette finish before the winner holds power.
    #[serde(default = "default_commit_delay_ms")]
    pub commit_delay_ms: u64,

    /// Wall-clock length of the observer-side name-cycling window.
    #[serde(default = "default_cycling_window_ms")]
    pub cycling_window_ms: u64,

    /// Wall-clock duration the final winner stays on screen.
    #[serde(default = "default_result_display_ms")]
    pub result_display_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            commit_delay_ms: default_commit_delay_ms(),
            cycling_window_ms: default_cycling_window_ms(),
            result_display_ms: default_result_display_ms(),
        }
    }
}

/// Observer sync cadence settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncConfig {
    /// Polls between remaining-time pushes while at least an hour remains.
    #[serde(default = "default_coarse_interval")]
    pub coarse_interval_ticks: u64,

    /// Polls between remaining-time pushes once less than an hour remains.
    #[serde(default = "default_fine_interval")]
    pub fine_interval_ticks: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            coarse_interval_ticks: default_coarse_interval(),
            fine_interval_ticks: default_fine_interval(),
        }
    }
}

/// Observer HTTP server settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObserverConfig {
    /// The host address to bind to.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl ObserverConfig {
    /// Apply environment variable overrides to this section.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("SCEPTER_OBSERVER_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                self.port = parsed;
            }
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Seed roster settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RosterConfig {
    /// Display names of participants present at startup. More can join
    /// (and these can leave) through the admin API at runtime.
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Run boundary settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BoundsConfig {
    /// Maximum scheduler polls before the loop stops (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

fn default_service_name() -> String {
    String::from("scepter")
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_ticks_per_day() -> u64 {
    24_000
}

const fn default_ticks_per_poll() -> u64 {
    1
}

const fn default_duration_days() -> u64 {
    7
}

const fn default_days_between_cycles() -> u64 {
    7
}

const fn default_autostart_enabled() -> bool {
    true
}

const fn default_time_check_interval() -> u64 {
    1_000
}

const fn default_commit_delay_ms() -> u64 {
    6_000
}

const fn default_cycling_window_ms() -> u64 {
    5_000
}

const fn default_result_display_ms() -> u64 {
    5_000
}

const fn default_coarse_interval() -> u64 {
    100
}

const fn default_fine_interval() -> u64 {
    20
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8080
}
