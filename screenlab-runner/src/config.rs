//! TOML configuration for the runner and CLI.
//!
//! ```toml
//! data_dir = "data"
//! lookback_days = 30
//!
//! [simulation]
//! entry_threshold_pct = 1.0
//! stop_loss_pct = -5.0
//!
//! [sweep]
//! stop_loss_pct = [-2.0, -5.0, -10.0]
//! entry_threshold_pct = [0.0, 1.0]
//! ```
//!
//! Every key is optional. Command-line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};

use screenlab_core::{ParamsError, SimulationParameters};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenLabConfig {
    /// Directory holding `screen_results_*.json[.gz]` files.
    pub data_dir: PathBuf,
    /// Days of screen results to load, ending at the as-of date. `None` loads all.
    pub lookback_days: Option<u32>,
    pub simulation: SimulationParameters,
    pub sweep: SweepConfig,
}

impl Default for ScreenLabConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lookback_days: None,
            simulation: SimulationParameters::default(),
            sweep: SweepConfig::default(),
        }
    }
}

/// Value lists for a parameter sweep.
///
/// Each trailing variant pairs one `take_profit_pct` with one
/// `trailing_stop_pct`; a run without the trailing rule is always included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub entry_threshold_pct: Vec<f64>,
    pub stop_loss_pct: Vec<f64>,
    pub take_profit_pct: Vec<f64>,
    pub trailing_stop_pct: Vec<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            entry_threshold_pct: vec![0.0],
            stop_loss_pct: vec![-2.0, -5.0, -10.0],
            take_profit_pct: Vec::new(),
            trailing_stop_pct: Vec::new(),
        }
    }
}

impl ScreenLabConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.sweep.validate()?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let lists: [(&'static str, &[f64]); 4] = [
            ("sweep.entry_threshold_pct", &self.entry_threshold_pct),
            ("sweep.stop_loss_pct", &self.stop_loss_pct),
            ("sweep.take_profit_pct", &self.take_profit_pct),
            ("sweep.trailing_stop_pct", &self.trailing_stop_pct),
        ];
        for (field, values) in lists {
            if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
                return Err(ParamsError::NonFinite { field, value });
            }
        }
        Ok(())
    }
}
