//! Default component losses and receive-signal thresholds.
//!
//! Loaded once per session from `pon_budget.toml` (when present) and then
//! overridden from the environment. The resulting [`BudgetConfig`] is passed
//! explicitly to node creation, field updates and evaluation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "pon_budget.toml";

pub const ENV_FIBER_ATTENUATION: &str = "PON_BUDGET_FIBER_ATTENUATION";
pub const ENV_CONNECTOR_LOSS: &str = "PON_BUDGET_CONNECTOR_LOSS";
pub const ENV_SPLICE_LOSS: &str = "PON_BUDGET_SPLICE_LOSS";
pub const ENV_SPLITTER_EXTRA_LOSS: &str = "PON_BUDGET_SPLITTER_EXTRA_LOSS";
pub const ENV_TERMINAL_LOSS: &str = "PON_BUDGET_TERMINAL_LOSS";
pub const ENV_MARGINAL_BELOW_DBM: &str = "PON_BUDGET_MARGINAL_BELOW_DBM";
pub const ENV_CRITICAL_BELOW_DBM: &str = "PON_BUDGET_CRITICAL_BELOW_DBM";

const INLINE_SOURCE: &str = "<inline>";

/// Losses applied to freshly created components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossDefaults {
    /// Fiber attenuation in dB/km (default: 0.35).
    pub fiber_attenuation_db_per_km: f64,
    /// Connector insertion loss in dB (default: 0.25).
    pub connector_loss_db: f64,
    /// Fusion splice loss in dB (default: 0.05).
    pub splice_loss_db: f64,
    /// Added on top of every splitter's table loss (default: 0.0).
    pub splitter_extra_loss_db: f64,
    /// Intrinsic terminal loss in dB (default: 0.0).
    pub terminal_loss_db: f64,
}

impl Default for LossDefaults {
    fn default() -> Self {
        Self {
            fiber_attenuation_db_per_km: 0.35,
            connector_loss_db: 0.25,
            splice_loss_db: 0.05,
            splitter_extra_loss_db: 0.0,
            terminal_loss_db: 0.0,
        }
    }
}

impl LossDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("fiber_attenuation_db_per_km", self.fiber_attenuation_db_per_km),
            ("connector_loss_db", self.connector_loss_db),
            ("splice_loss_db", self.splice_loss_db),
            ("splitter_extra_loss_db", self.splitter_extra_loss_db),
            ("terminal_loss_db", self.terminal_loss_db),
        ];
        for (key, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Received-power levels below which a terminal is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Below this a terminal is marginal (default: -25 dBm).
    pub marginal_below_dbm: f64,
    /// Below this a terminal is critical (default: -28 dBm).
    pub critical_below_dbm: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            marginal_below_dbm: -25.0,
            critical_below_dbm: -28.0,
        }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("marginal_below_dbm", self.marginal_below_dbm),
            ("critical_below_dbm", self.critical_below_dbm),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if self.critical_below_dbm > self.marginal_below_dbm {
            return Err(ConfigError::InvalidValue {
                key: "critical_below_dbm".to_string(),
                value: format!(
                    "{} is above marginal_below_dbm {}",
                    self.critical_below_dbm, self.marginal_below_dbm
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub defaults: LossDefaults,
    pub thresholds: SignalThresholds,
}

impl BudgetConfig {
    pub fn from_default_sources() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        let base = if config_path.exists() {
            Self::from_config_file(config_path)?
        } else {
            Self::default()
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse_toml(&content, &path.display().to_string())
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(input, INLINE_SOURCE)
    }

    fn parse_toml(input: &str, source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|err| ConfigError::ParseConfigFile {
            path: source.to_string(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PON_BUDGET_*` overrides read through `getter`.
    pub fn with_env_overrides<F>(mut self, mut getter: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let slots: [(&'static str, &mut f64); 7] = [
            (
                ENV_FIBER_ATTENUATION,
                &mut self.defaults.fiber_attenuation_db_per_km,
            ),
            (ENV_CONNECTOR_LOSS, &mut self.defaults.connector_loss_db),
            (ENV_SPLICE_LOSS, &mut self.defaults.splice_loss_db),
            (
                ENV_SPLITTER_EXTRA_LOSS,
                &mut self.defaults.splitter_extra_loss_db,
            ),
            (ENV_TERMINAL_LOSS, &mut self.defaults.terminal_loss_db),
            (
                ENV_MARGINAL_BELOW_DBM,
                &mut self.thresholds.marginal_below_dbm,
            ),
            (
                ENV_CRITICAL_BELOW_DBM,
                &mut self.thresholds.critical_below_dbm,
            ),
        ];
        for (key, slot) in slots {
            if let Some(raw) = getter(key) {
                *slot = parse_f64(key, &raw)?;
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        self.thresholds.validate()
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("read config file failed ({path}): {message}")]
    ReadConfigFile { path: String, message: String },
    #[error("parse config file failed ({path}): {message}")]
    ParseConfigFile { path: String, message: String },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn defaults_match_reference_losses() {
        let config = BudgetConfig::default();
        assert_eq!(config.defaults.fiber_attenuation_db_per_km, 0.35);
        assert_eq!(config.defaults.connector_loss_db, 0.25);
        assert_eq!(config.defaults.splice_loss_db, 0.05);
        assert_eq!(config.defaults.splitter_extra_loss_db, 0.0);
        assert_eq!(config.defaults.terminal_loss_db, 0.0);
        assert_eq!(config.thresholds.marginal_below_dbm, -25.0);
        assert_eq!(config.thresholds.critical_below_dbm, -28.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = BudgetConfig::from_toml_str(
            r#"
            [defaults]
            connector_loss_db = 0.5
            splitter_extra_loss_db = 0.3

            [thresholds]
            critical_below_dbm = -30.0
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults.connector_loss_db, 0.5);
        assert_eq!(config.defaults.splitter_extra_loss_db, 0.3);
        assert_eq!(config.defaults.fiber_attenuation_db_per_km, 0.35);
        assert_eq!(config.thresholds.critical_below_dbm, -30.0);
        assert_eq!(config.thresholds.marginal_below_dbm, -25.0);
    }

    #[test]
    fn toml_rejects_negative_loss() {
        let err = BudgetConfig::from_toml_str("[defaults]\nsplice_loss_db = -0.1\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "splice_loss_db"
        ));
    }

    #[test]
    fn toml_syntax_error_is_reported_with_source() {
        let err = BudgetConfig::from_toml_str("[defaults\n").unwrap_err();
        match err {
            ConfigError::ParseConfigFile { path, .. } => assert_eq!(path, INLINE_SOURCE),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env = BTreeMap::from([
            (ENV_FIBER_ATTENUATION, "0.4"),
            (ENV_TERMINAL_LOSS, " 0.2 "),
            (ENV_MARGINAL_BELOW_DBM, "-24"),
        ]);
        let config = BudgetConfig::default()
            .with_env_overrides(|key| env.get(key).map(|value| value.to_string()))
            .unwrap();
        assert_eq!(config.defaults.fiber_attenuation_db_per_km, 0.4);
        assert_eq!(config.defaults.terminal_loss_db, 0.2);
        assert_eq!(config.defaults.connector_loss_db, 0.25);
        assert_eq!(config.thresholds.marginal_below_dbm, -24.0);
    }

    #[test]
    fn env_override_rejects_non_numeric_value() {
        let err = BudgetConfig::default()
            .with_env_overrides(|key| (key == ENV_SPLICE_LOSS).then(|| "abc".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_SPLICE_LOSS.to_string(),
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let thresholds = SignalThresholds {
            marginal_below_dbm: -30.0,
            critical_below_dbm: -25.0,
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let path = std::env::temp_dir().join("pon-budget-missing-config.toml");
        let _ = fs::remove_file(&path);
        let err = BudgetConfig::from_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadConfigFile { .. }));
    }
}
