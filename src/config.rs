use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{BundleError, Result};
use crate::throttle::Throttler;

/// Default per-host pause between clones, in seconds.
pub const DEFAULT_DELAY_SECONDS: f64 = 1.0;

/// Tunables for a bundling run, loadable from a TOML file.
///
/// Only the keys below are accepted; anything else is rejected when the
/// file is parsed.
///
/// Example TOML:
/// ```toml
/// ignore_revision_check = false
/// host_throttle_delay_seconds = 2.5
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Rewrite every archive even when its head matches the fresh clone.
    pub ignore_revision_check: bool,
    /// Minimum interval between clones from the same host.
    pub host_throttle_delay_seconds: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ignore_revision_check: false,
            host_throttle_delay_seconds: DEFAULT_DELAY_SECONDS,
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    ///
    /// # Errors
    /// Returns [`BundleError::Config`] for malformed TOML, unknown keys, or a
    /// negative/non-finite delay.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let s: Settings = toml::from_str(text).map_err(|e| BundleError::Config(e.to_string()))?;
        s.validate()?;
        Ok(s)
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    /// Returns [`BundleError::Config`] if the file cannot be read, plus
    /// everything [`Settings::from_toml_str`] rejects.
    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path).map_err(|e| {
            BundleError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&txt)
    }

    pub fn validate(&self) -> Result<()> {
        let d = self.host_throttle_delay_seconds;
        if !d.is_finite() || d < 0.0 {
            return Err(BundleError::Config(format!(
                "host_throttle_delay_seconds must be a finite number >= 0: {}",
                d
            )));
        }
        Ok(())
    }

    /// A fresh throttler using this configuration's delay.
    pub fn throttler(&self) -> Result<Throttler> {
        Throttler::from_secs_f64(self.host_throttle_delay_seconds)
    }
}
