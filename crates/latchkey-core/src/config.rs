//! Controller configuration.
//!
//! Configuration is loaded once at startup from a TOML file and stays fixed
//! for the lifetime of the process. Every field has a default matching the
//! constants in [`constants`](crate::constants), so an empty file is
//! a valid configuration.
//!
//! ```toml
//! [reader]
//! port = "/dev/ttyUSB0"
//! format = "plain"
//!
//! [lock]
//! transition_ms = 1700
//! revert_window_ms = 3000
//!
//! [auth]
//! allow_list = ["00AB12CD34", "0011223344"]
//! remote_url = "http://192.168.100.5/"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_DRIFT_COMPENSATION_MS, DEFAULT_LOCK_ANGLE,
    DEFAULT_REMOTE_TIMEOUT_MS, DEFAULT_REVERT_WINDOW_MS, DEFAULT_TICK_MS,
    DEFAULT_TIME_BETWEEN_FRAMES_MS, DEFAULT_TRANSITION_MS, DEFAULT_UNLOCK_ANGLE,
    FRAME_GAP_DENOMINATOR, FRAME_GAP_NUMERATOR, MAX_SERVO_ANGLE,
};
use crate::{CardIdentifier, Error, Result};

/// Top-level controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

impl ControllerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the values are inconsistent.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - the tick period is zero or longer than the transition
    /// - the frame gap threshold is shorter than one tick
    /// - a servo angle is out of range
    /// - an allow-list entry is not a valid card identifier
    /// - the remote timeout is zero
    pub fn validate(&self) -> Result<()> {
        let lock = &self.lock;
        if lock.tick_ms == 0 {
            return Err(Error::Config("lock.tick_ms must be at least 1".into()));
        }
        if lock.tick_ms > lock.transition_ms {
            return Err(Error::Config(format!(
                "lock.tick_ms ({}) exceeds lock.transition_ms ({})",
                lock.tick_ms, lock.transition_ms
            )));
        }
        if lock.lock_angle > MAX_SERVO_ANGLE || lock.unlock_angle > MAX_SERVO_ANGLE {
            return Err(Error::Config(format!(
                "servo angles must be within 0-{MAX_SERVO_ANGLE}"
            )));
        }

        if self.reader.frame_gap_threshold() < Duration::from_millis(lock.tick_ms) {
            return Err(Error::Config(format!(
                "reader.time_between_frames_ms ({}) is too short for a {} ms tick",
                self.reader.time_between_frames_ms, lock.tick_ms
            )));
        }

        self.auth.allow_list()?;

        if self.auth.timeout_ms == 0 {
            return Err(Error::Config("auth.timeout_ms must be at least 1".into()));
        }

        Ok(())
    }
}

/// Which reader protocol variant is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormatKind {
    /// Bare identifier frames separated by an inter-frame gap.
    #[default]
    Plain,
    /// Identifier wrapped in one prefix and one suffix byte, starting with `0x`.
    Prefixed,
}

/// Serial card reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Serial device path. `None` runs without a reader.
    pub port: Option<String>,

    pub baud_rate: u32,

    pub format: FrameFormatKind,

    /// Typical gap between two consecutive frames, in ms.
    pub time_between_frames_ms: u64,
}

impl ReaderConfig {
    /// Silence after which a partial frame is discarded.
    #[must_use]
    pub fn frame_gap_threshold(&self) -> Duration {
        Duration::from_millis(
            self.time_between_frames_ms * FRAME_GAP_NUMERATOR / FRAME_GAP_DENOMINATOR,
        )
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            format: FrameFormatKind::Plain,
            time_between_frames_ms: DEFAULT_TIME_BETWEEN_FRAMES_MS,
        }
    }
}

/// Lock mechanics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// Tick period of the lock controller, in ms.
    pub tick_ms: u64,

    /// Nominal end-to-end travel time, in ms.
    pub transition_ms: u64,

    /// Extra drive time when an in-flight unlock is reversed into a lock, in ms.
    pub drift_compensation_ms: u64,

    /// How long after a lock command the lock may still be reverted, in ms.
    pub revert_window_ms: u64,

    pub lock_angle: u16,

    pub unlock_angle: u16,

    /// Relock this long after an unlock settles if the door was never opened.
    /// `None` disables auto-relock.
    pub auto_relock_ms: Option<u64>,
}

impl LockConfig {
    /// Tick period as a [`Duration`].
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Convert a duration in ms into whole ticks, rounding up.
    #[must_use]
    pub fn ms_to_ticks(&self, ms: u64) -> u32 {
        let ticks = ms.div_ceil(self.tick_ms.max(1));
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn transition_ticks(&self) -> u32 {
        self.ms_to_ticks(self.transition_ms)
    }

    #[must_use]
    pub fn drift_compensation_ticks(&self) -> u32 {
        self.ms_to_ticks(self.drift_compensation_ms)
    }

    #[must_use]
    pub fn revert_window_ticks(&self) -> u32 {
        self.ms_to_ticks(self.revert_window_ms)
    }

    #[must_use]
    pub fn auto_relock_ticks(&self) -> Option<u32> {
        self.auto_relock_ms.map(|ms| self.ms_to_ticks(ms))
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            transition_ms: DEFAULT_TRANSITION_MS,
            drift_compensation_ms: DEFAULT_DRIFT_COMPENSATION_MS,
            revert_window_ms: DEFAULT_REVERT_WINDOW_MS,
            lock_angle: DEFAULT_LOCK_ANGLE,
            unlock_angle: DEFAULT_UNLOCK_ANGLE,
            auto_relock_ms: None,
        }
    }
}

/// Authorization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Card identifiers granted without contacting the remote authority.
    pub allow_list: Vec<String>,

    /// Base URL of the remote authority. `None` disables the remote fallback.
    pub remote_url: Option<Url>,

    /// Bound on each remote call, in ms.
    pub timeout_ms: u64,
}

impl AuthConfig {
    /// Parse the allow-list entries.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first malformed entry.
    pub fn allow_list(&self) -> Result<Vec<CardIdentifier>> {
        self.allow_list
            .iter()
            .map(|entry| {
                entry.parse().map_err(|e| {
                    Error::Config(format!("auth.allow_list entry {entry:?}: {e}"))
                })
            })
            .collect()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            remote_url: None,
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}
