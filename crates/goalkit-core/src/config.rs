use crate::error::{GoalkitError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// TrackingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Default window for velocity and momentum, in days.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// How long a writer waits for the history lease.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_window_days() -> i64 {
    30
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Average completion (percent) at which a project counts as complete.
    #[serde(default = "default_complete_threshold")]
    pub complete_threshold: u32,
}

fn default_complete_threshold() -> u32 {
    90
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            complete_threshold: default_complete_threshold(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load `.goalkit/config.yaml`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        let Some(data) = crate::io::read_optional(&path)? else {
            return Ok(Self::default());
        };
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).map_err(|e| GoalkitError::InvalidConfig {
            path,
            reason: e.to_string(),
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.tracking.window_days < 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "tracking.window_days={} must be at least 1",
                    self.tracking.window_days
                ),
            });
        } else if self.tracking.window_days > 365 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "tracking.window_days={} (>365 is unusual)",
                    self.tracking.window_days
                ),
            });
        }

        if self.tracking.lock_timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "tracking.lock_timeout_ms=0: concurrent writers fail immediately"
                    .to_string(),
            });
        }

        if self.analysis.complete_threshold > 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "analysis.complete_threshold={} exceeds 100",
                    self.analysis.complete_threshold
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
