//! TOML configuration loading and validation.
//!
//! Every section and key is optional; a missing file section falls back to
//! the library defaults.

use std::path::{Path, PathBuf};

use allocbook::{AllocationMode, OptimizeRequest, OptimizerConfig, RiskProfile};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::plan::{RebalanceParams, RoundingPolicy, DEFAULT_DRIFT_THRESHOLD, DEFAULT_LOT_SIZE};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub optimizer: OptimizerSection,
    pub rebalance: RebalanceSection,
    pub logging: LoggingConfig,
}

/// `[optimizer]`: request defaults plus estimation and solver settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerSection {
    pub mode: AllocationMode,
    pub profile: RiskProfile,
    pub target_return: Option<f64>,
    pub max_volatility: Option<f64>,
    pub risk_free: f64,
    pub ridge: f64,
    pub periods_per_year: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        let solver = OptimizerConfig::default();
        Self {
            mode: AllocationMode::default(),
            profile: RiskProfile::default(),
            target_return: None,
            max_volatility: None,
            risk_free: solver.risk_free,
            ridge: solver.ridge,
            periods_per_year: solver.periods_per_year,
            max_iterations: solver.max_iterations,
            tolerance: solver.tolerance,
        }
    }
}

/// `[rebalance]`
#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceSection {
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

fn default_lot_size() -> u64 {
    DEFAULT_LOT_SIZE
}
fn default_drift_threshold() -> f64 {
    DEFAULT_DRIFT_THRESHOLD
}

impl Default for RebalanceSection {
    fn default() -> Self {
        Self {
            lot_size: default_lot_size(),
            drift_threshold: default_drift_threshold(),
            rounding: RoundingPolicy::default(),
        }
    }
}

/// `[logging]`: where the audit trail goes.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
    #[serde(default = "default_true")]
    pub audit: bool,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
            audit: true,
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        self.optimizer_config()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        if let Some(target) = self.optimizer.target_return {
            if !target.is_finite() {
                return Err(Error::Config("target_return must be finite".into()));
            }
        }
        if let Some(ceiling) = self.optimizer.max_volatility {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(Error::Config("max_volatility must be > 0".into()));
            }
        }
        if self.rebalance.lot_size == 0 {
            return Err(Error::Config("lot_size must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.rebalance.drift_threshold) {
            return Err(Error::Config(
                "drift_threshold must be in [0.0, 1.0]".into(),
            ));
        }
        if self.logging.audit_file.is_empty() {
            return Err(Error::Config("audit_file must not be empty".into()));
        }
        Ok(())
    }

    /// Estimation and solver settings for [`allocbook::optimize`].
    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            risk_free: self.optimizer.risk_free,
            ridge: self.optimizer.ridge,
            periods_per_year: self.optimizer.periods_per_year,
            max_iterations: self.optimizer.max_iterations,
            tolerance: self.optimizer.tolerance,
        }
    }

    /// The configured default optimization request.
    pub fn optimize_request(&self) -> OptimizeRequest {
        OptimizeRequest {
            mode: self.optimizer.mode,
            profile: self.optimizer.profile,
            target_return: self.optimizer.target_return,
            max_volatility: self.optimizer.max_volatility,
        }
    }

    /// Rebalance parameters with no new cash.
    pub fn rebalance_params(&self) -> RebalanceParams {
        RebalanceParams {
            drift_threshold: self.rebalance.drift_threshold,
            new_cash: 0.0,
            lot_size: self.rebalance.lot_size,
            rounding: self.rebalance.rounding,
        }
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}
