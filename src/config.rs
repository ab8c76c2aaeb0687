use crate::error::MindMapError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

pub const DEFAULT_HEAD_LINE: &str = "Mind Map generated by mmd-core";

/// Settings that shape how documents are written and how FILE extras are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindMapConfig {
    /// First line of every written document.
    pub head_line: String,
    /// Folder that relative FILE extras are resolved against. Defaults to the folder of the
    /// document being processed.
    pub base_folder: Option<PathBuf>,
}

impl Default for MindMapConfig {
    fn default() -> Self {
        MindMapConfig {
            head_line: DEFAULT_HEAD_LINE.to_string(),
            base_folder: None,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> Result<MindMapConfig, MindMapError>;
    fn store(&self, config: &MindMapConfig) -> Result<(), MindMapError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn load(&self) -> Result<MindMapConfig, MindMapError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(MindMapConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn store(&self, config: &MindMapConfig) -> Result<(), MindMapError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
