use crate::compress::Compression;
use crate::error::{FixgenError, Result};
use crate::fixture::{DEFAULT_BUFFER_SIZE, GenerateOptions};
use crate::pattern::Layout;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub compression: CompressionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub manifest: bool,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompressionConfig {
    #[serde(default = "default_formats")]
    pub formats: Vec<Compression>,
    /// Passed to every tool as `-<level>`; the tool's own default when unset
    pub level: Option<u8>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            manifest: true,
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            level: None,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

const fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_formats() -> Vec<Compression> {
    Compression::ALL.to_vec()
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FixgenError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| FixgenError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load_with_source().0
    }

    /// Like [`Config::load_or_default`], also returning the file the
    /// configuration came from (`None` when defaults are used).
    pub fn load_with_source() -> (Self, Option<PathBuf>) {
        Self::load_first_of(Self::candidates())
    }

    fn load_first_of<I>(candidates: I) -> (Self, Option<PathBuf>)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let Some(path) = candidates.into_iter().find(|c| c.exists()) else {
            debug!("No config file found, using defaults");
            return (Self::default(), None);
        };

        match Self::load_from_path(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                warn!("Ignoring config {}: {}; using defaults", path.display(), e);
                (Self::default(), None)
            }
        }
    }

    fn candidates() -> impl Iterator<Item = PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("fixgen/fixgen.toml")),
            Some(PathBuf::from("/etc/fixgen/fixgen.toml")),
        ]
        .into_iter()
        .flatten()
    }

    fn find_config_file() -> Result<PathBuf> {
        Self::candidates()
            .find(|candidate| candidate.exists())
            .ok_or_else(|| FixgenError::Config("Config file not found".to_owned()))
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;

        if self.general.buffer_size == 0 {
            return Err(FixgenError::Config(
                "buffer_size must be positive".to_owned(),
            ));
        }

        if let Some(level) = self.compression.level {
            if !(1..=9).contains(&level) {
                return Err(FixgenError::Config(format!(
                    "Compression level must be within 1..=9, got {level}"
                )));
            }
        }

        if self.compression.formats.is_empty() {
            return Err(FixgenError::Config(
                "At least one compression format is required".to_owned(),
            ));
        }
        let mut seen = HashSet::new();
        for format in &self.compression.formats {
            if !seen.insert(format) {
                return Err(FixgenError::Config(format!(
                    "Compression format listed twice: {format}"
                )));
            }
        }
        Ok(())
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            buffer_size: self.general.buffer_size,
            manifest: self.general.manifest,
        }
    }
}
