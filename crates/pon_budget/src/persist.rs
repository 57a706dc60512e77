//! Project files: the tree, source power and loss defaults as JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, LossDefaults};
use crate::network::{normalize_tree, validate_tree, Node, TreeError};

pub const PROJECT_FORMAT_VERSION: &str = "1.0";
pub const DEFAULT_PROJECT_NAME: &str = "Untitled PON Project";

fn default_format_version() -> String {
    PROJECT_FORMAT_VERSION.to_string()
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_format_version")]
    pub version: String,
    #[serde(default = "default_project_name")]
    pub project_name: String,
    pub source_power_dbm: f64,
    pub root: Node,
    #[serde(default)]
    pub defaults: LossDefaults,
}

impl ProjectFile {
    pub fn new(
        project_name: impl Into<String>,
        source_power_dbm: f64,
        root: Node,
        defaults: LossDefaults,
    ) -> Self {
        Self {
            version: default_format_version(),
            project_name: project_name.into(),
            source_power_dbm,
            root,
            defaults,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate. Any structural problem rejects the whole file.
    pub fn from_json(input: &str) -> Result<Self, PersistError> {
        let mut project: Self = serde_json::from_str(input)?;
        project.prepare()?;
        Ok(project)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        write_json_to_path(self, path)?;
        info!(path = %path.display(), project = %self.project_name, "project saved");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let mut project: Self = read_json_from_path(path)?;
        project.prepare()?;
        info!(
            path = %path.display(),
            project = %project.project_name,
            nodes = project.root.node_count(),
            "project loaded"
        );
        Ok(project)
    }

    /// Normalize absent optional fields, then check every tree invariant.
    pub(crate) fn prepare(&mut self) -> Result<(), PersistError> {
        if self.version != PROJECT_FORMAT_VERSION {
            warn!(
                version = %self.version,
                expected = PROJECT_FORMAT_VERSION,
                "unrecognised project format version"
            );
        }
        if !self.source_power_dbm.is_finite() {
            return Err(PersistError::NonFiniteSourcePower {
                value: self.source_power_dbm,
            });
        }
        self.defaults.validate()?;
        normalize_tree(&mut self.root, &self.defaults);
        validate_tree(&self.root)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid network tree: {0}")]
    InvalidTree(#[from] TreeError),
    #[error("invalid loss defaults: {0}")]
    InvalidDefaults(#[from] ConfigError),
    #[error("source power must be finite, got {value}")]
    NonFiniteSourcePower { value: f64 },
}

pub(crate) fn write_json_to_path<T: Serialize>(value: &T, path: &Path) -> Result<(), PersistError> {
    let data = serde_json::to_vec_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}

pub(crate) fn read_json_from_path<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}
