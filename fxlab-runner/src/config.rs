//! Serializable backtest configuration, loaded from TOML.
//!
//! One file fully describes a run: where the bars come from, the engine
//! parameters, the signal generator, and an optional trading session.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fxlab_core::engine::{EngineConfig, PreconditionError};
use fxlab_core::signals::{
    MaCrossover, MaType, MeanReversion, Momentum, RsiBounds, SessionWindow, SignalGenerator,
    TrendFilter,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("invalid engine config: {0}")]
    Engine(#[from] PreconditionError),

    #[error("serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Complete, reproducible description of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub engine: EngineConfig,
    pub signal: SignalConfig,
    /// Restrict entries to bars inside this hour window. Open positions are
    /// not closed at the window edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionWindow>,
}

/// Price data source and date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// CSV file of bars. Relative paths resolve against the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Inclusive date filter, written as quoted `"YYYY-MM-DD"` strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    /// Generate a seeded random walk instead of reading a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<SyntheticSpec>,
}

fn default_symbol() -> String {
    "UNKNOWN".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            symbol: default_symbol(),
            start: None,
            end: None,
            synthetic: None,
        }
    }
}

/// Parameters of a synthetic random-walk series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyntheticSpec {
    pub bars: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
}

fn default_start_price() -> f64 {
    100.0
}

/// Signal generator selection (serializable enum, tagged by `type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalConfig {
    /// Fast/slow moving average state.
    MaCrossover {
        fast_period: usize,
        slow_period: usize,
        #[serde(default)]
        ma_type: MaType,
    },

    /// Sign of the rolling mean of log returns.
    Momentum { window: usize },

    /// Fade stretches away from an SMA.
    MeanReversion { sma_period: usize, threshold: f64 },

    /// EMA trend + ADX strength + pullback entry.
    TrendFilter(TrendFilterParams),
}

/// Trend filter parameters; every field falls back to the stock settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendFilterParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub trend_period: usize,
    pub slope_lag: usize,
    pub slope_threshold: f64,
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub require_pullback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<RsiBounds>,
}

impl Default for TrendFilterParams {
    fn default() -> Self {
        let tf = TrendFilter::default_params();
        Self {
            fast_period: tf.fast_period,
            slow_period: tf.slow_period,
            trend_period: tf.trend_period,
            slope_lag: tf.slope_lag,
            slope_threshold: tf.slope_threshold,
            adx_period: tf.adx_period,
            adx_threshold: tf.adx_threshold,
            require_pullback: tf.require_pullback,
            rsi: tf.rsi,
        }
    }
}

impl SignalConfig {
    pub fn name(&self) -> &'static str {
        match self {
            SignalConfig::MaCrossover { .. } => "ma_crossover",
            SignalConfig::Momentum { .. } => "momentum",
            SignalConfig::MeanReversion { .. } => "mean_reversion",
            SignalConfig::TrendFilter(_) => "trend_filter",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SignalConfig::MaCrossover {
                fast_period,
                slow_period,
                ..
            } => {
                if *fast_period == 0 {
                    return Err(invalid("signal.fast_period", "must be >= 1"));
                }
                if slow_period <= fast_period {
                    return Err(invalid(
                        "signal.slow_period",
                        format!("must be > fast_period ({fast_period}), got {slow_period}"),
                    ));
                }
            }
            SignalConfig::Momentum { window } => {
                if *window == 0 {
                    return Err(invalid("signal.window", "must be >= 1"));
                }
            }
            SignalConfig::MeanReversion {
                sma_period,
                threshold,
            } => {
                if *sma_period == 0 {
                    return Err(invalid("signal.sma_period", "must be >= 1"));
                }
                if !threshold.is_finite() || *threshold < 0.0 {
                    return Err(invalid(
                        "signal.threshold",
                        format!("must be finite and >= 0, got {threshold}"),
                    ));
                }
            }
            SignalConfig::TrendFilter(p) => {
                for (field, v) in [
                    ("signal.fast_period", p.fast_period),
                    ("signal.slow_period", p.slow_period),
                    ("signal.trend_period", p.trend_period),
                    ("signal.slope_lag", p.slope_lag),
                    ("signal.adx_period", p.adx_period),
                ] {
                    if v == 0 {
                        return Err(invalid(field, "must be >= 1"));
                    }
                }
                if p.slow_period <= p.fast_period {
                    return Err(invalid("signal.slow_period", "must be > fast_period"));
                }
                if !p.slope_threshold.is_finite() || !p.adx_threshold.is_finite() {
                    return Err(invalid("signal", "thresholds must be finite"));
                }
                if let Some(rsi) = &p.rsi {
                    if rsi.period == 0 {
                        return Err(invalid("signal.rsi.period", "must be >= 1"));
                    }
                    if !(0.0..=100.0).contains(&rsi.oversold)
                        || !(0.0..=100.0).contains(&rsi.overbought)
                        || rsi.oversold >= rsi.overbought
                    {
                        return Err(invalid(
                            "signal.rsi",
                            "bounds must satisfy 0 <= oversold < overbought <= 100",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Validate, then construct the generator.
    pub fn build(&self) -> Result<Box<dyn SignalGenerator>, ConfigError> {
        self.validate()?;
        let generator: Box<dyn SignalGenerator> = match self {
            SignalConfig::MaCrossover {
                fast_period,
                slow_period,
                ma_type,
            } => Box::new(MaCrossover::new(*fast_period, *slow_period, *ma_type)),
            SignalConfig::Momentum { window } => Box::new(Momentum::new(*window)),
            SignalConfig::MeanReversion {
                sma_period,
                threshold,
            } => Box::new(MeanReversion::new(*sma_period, *threshold)),
            SignalConfig::TrendFilter(p) => Box::new(TrendFilter {
                fast_period: p.fast_period,
                slow_period: p.slow_period,
                trend_period: p.trend_period,
                slope_lag: p.slope_lag,
                slope_threshold: p.slope_threshold,
                adx_period: p.adx_period,
                adx_threshold: p.adx_threshold,
                require_pullback: p.require_pullback,
                rsi: p.rsi,
            }),
        };
        Ok(generator)
    }
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.signal.validate()?;

        if self.data.path.is_none() && self.data.synthetic.is_none() {
            return Err(invalid("data", "either `path` or `synthetic` must be set"));
        }
        if let Some(spec) = &self.data.synthetic {
            if spec.bars == 0 {
                return Err(invalid("data.synthetic.bars", "must be >= 1"));
            }
            if !spec.start_price.is_finite() || spec.start_price <= 0.0 {
                return Err(invalid("data.synthetic.start_price", "must be > 0"));
            }
        }
        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                return Err(invalid(
                    "data.end",
                    format!("end {end} is before start {start}"),
                ));
            }
        }
        if let Some(session) = &self.session {
            if session.start_hour > 23 || session.end_hour > 24 {
                return Err(invalid("session", "hours must be within 0..=24"));
            }
            if session.start_hour == session.end_hour {
                return Err(invalid("session", "start_hour and end_hour must differ"));
            }
        }
        Ok(())
    }

    /// Deterministic fingerprint of the configuration.
    ///
    /// Two runs with identical configs share the same hash.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
