use crate::error::{FixgenError, Result};
use crate::fixture::temp_path;
use crate::pattern::Layout;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use tracing::debug;

/// Sidecar describing how a fixture was generated
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Manifest {
    pub len: u64,
    pub sha256: String,
    pub layout: Layout,
}

impl Manifest {
    pub fn path_for(fixture: &Utf8Path) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{fixture}.manifest.toml"))
    }

    /// Manifest of `fixture`, or `None` when it has none.
    pub fn load(fixture: &Utf8Path) -> Result<Option<Self>> {
        let path = Self::path_for(fixture);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No manifest at {}", path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| FixgenError::Manifest(format!("Failed to parse {path}: {e}")))
    }

    pub fn save(&self, fixture: &Utf8Path) -> Result<()> {
        let path = Self::path_for(fixture);
        let content = toml::to_string(self)
            .map_err(|e| FixgenError::Manifest(format!("Failed to serialize manifest: {e}")))?;

        // Write to temp, then rename
        let temp = temp_path(&path);
        fs::write(&temp, content)?;
        fs::rename(&temp, &path)?;

        debug!("Manifest saved to {}", path);
        Ok(())
    }

    /// Delete the manifest of `fixture`, if any.
    pub fn remove(fixture: &Utf8Path) -> Result<()> {
        let path = Self::path_for(fixture);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed old manifest {}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
