//! Serializable simulation configuration.
//!
//! A run is described by one TOML file: where the bars come from, how the
//! run executes, and the list of orders to place.
//!
//! ```toml
//! [data]
//! path = "data/NQZ25.txt"
//!
//! [run]
//! parallel = true
//! strict_levels = false
//!
//! [[orders]]
//! label = "breakout-long"
//! kind = "limit"
//! side = "long"
//! entry_bar = 10
//! limit_price = 101.5
//! stop_price = 99.0
//! target_price = 105.0
//! ```

use fillsim_core::domain::{Bar, OrderSide};
use fillsim_core::orders::{
    market_fill_price, validate_levels, validate_quantity, OrderError, OrderKind,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::strategy::{OrderRequest, Placement};

/// Unique identifier for a simulation run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("order '{label}': limit orders need a limit_price")]
    MissingLimitPrice { label: String },

    #[error("order '{label}': entry_bar {entry_bar} is beyond the {bars} loaded bars")]
    EntryBarOutOfRange {
        label: String,
        entry_bar: usize,
        bars: usize,
    },

    #[error("order '{label}': {source}")]
    InvalidOrder {
        label: String,
        #[source]
        source: OrderError,
    },
}

/// Full description of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub data: DataConfig,

    #[serde(default)]
    pub run: RunSettings,

    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

/// Where the bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// `.txt`/`.csv` exports are ingested, `.parquet` files loaded.
    pub path: PathBuf,

    /// Fail on out-of-order bar prices instead of keeping them.
    #[serde(default)]
    pub reject_insane: bool,
}

/// How the run executes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSettings {
    /// Simulate orders independently on the rayon pool. When false, orders
    /// go through the sequential strategy loop.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Reject stop/target levels on the wrong side of the entry price.
    #[serde(default)]
    pub strict_levels: bool,
}

fn default_parallel() -> bool {
    true
}

fn default_quantity() -> f64 {
    1.0
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            strict_levels: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderKindConfig {
    Market,
    Limit,
}

/// One order to place during the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSpec {
    #[serde(default)]
    pub label: Option<String>,
    pub kind: OrderKindConfig,
    pub side: OrderSide,
    /// Index of the bar the order is placed on. Market orders fill at that
    /// bar's open; limit orders start resting on it.
    pub entry_bar: usize,
    #[serde(default)]
    pub limit_price: Option<f64>,
    /// Market orders only.
    #[serde(default)]
    pub slippage: f64,
    pub stop_price: f64,
    pub target_price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

impl OrderSpec {
    /// Configured label, or `order-{index}`.
    pub fn label_or(&self, index: usize) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("order-{index}"))
    }

    fn to_request(&self, label: String) -> Result<OrderRequest, ConfigError> {
        let (kind, limit_price) = match self.kind {
            OrderKindConfig::Market => (
                OrderKind::Market {
                    slippage: self.slippage,
                },
                None,
            ),
            OrderKindConfig::Limit => {
                let price = self
                    .limit_price
                    .ok_or_else(|| ConfigError::MissingLimitPrice {
                        label: label.clone(),
                    })?;
                (OrderKind::Limit, Some(price))
            }
        };
        Ok(OrderRequest {
            label,
            kind,
            side: self.side,
            stop_price: self.stop_price,
            target_price: self.target_price,
            limit_price,
            quantity: self.quantity,
        })
    }

    /// Entry price this order will use once placed on `bar`.
    fn expected_entry(&self, bar: &Bar) -> Option<f64> {
        match self.kind {
            OrderKindConfig::Market => Some(market_fill_price(self.side, bar.open, self.slippage)),
            OrderKindConfig::Limit => self.limit_price,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file. A relative `data.path` is resolved against the
    /// config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if config.data.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data.path = dir.join(&config.data.path);
            }
        }
        Ok(config)
    }

    /// Deterministic hash of the configuration and the bars it runs over.
    ///
    /// Two runs share a RunId only when both the config and every bar
    /// (timestamp and prices) are identical.
    pub fn run_id(&self, bars: &[Bar]) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(json.as_bytes());
        for bar in bars {
            hasher.update(bar.timestamp.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.last.to_le_bytes());
        }
        Ok(hasher.finalize().to_hex().to_string())
    }

    /// Check every order against the loaded bars and turn them into placements.
    pub fn placements(&self, bars: &[Bar]) -> Result<Vec<Placement>, ConfigError> {
        self.orders
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let label = spec.label_or(index);
                let bar = bars
                    .get(spec.entry_bar)
                    .ok_or_else(|| ConfigError::EntryBarOutOfRange {
                        label: label.clone(),
                        entry_bar: spec.entry_bar,
                        bars: bars.len(),
                    })?;

                let invalid = |source| ConfigError::InvalidOrder {
                    label: label.clone(),
                    source,
                };
                validate_quantity(spec.quantity).map_err(invalid)?;
                if self.run.strict_levels {
                    if let Some(entry) = spec.expected_entry(bar) {
                        validate_levels(spec.side, entry, spec.stop_price, spec.target_price)
                            .map_err(invalid)?;
                    }
                }

                Ok(Placement {
                    entry_bar: spec.entry_bar,
                    request: spec.to_request(label.clone())?,
                })
            })
            .collect()
    }
}
