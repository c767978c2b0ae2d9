// src/datadir.rs

//! Lookup of shipped and user supplied data files
//!
//! Facts, mappings, projects and templates live in a base data directory.
//! An optional extra directory is layered on top: when both define the same
//! file, the extra one wins.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the base data directory
pub const DATA_DIR_ENV: &str = "CIGUEST_DATA_DIR";

#[derive(Debug, Clone)]
pub struct DataDir {
    base: PathBuf,
    extra: Option<PathBuf>,
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DataDir {
    /// Use the default base directory, optionally overlaid by `extra`
    pub fn new(extra: Option<PathBuf>) -> Self {
        Self {
            base: default_base_dir(),
            extra,
        }
    }

    /// Use an explicit base directory
    pub fn with_base(base: impl Into<PathBuf>, extra: Option<PathBuf>) -> Self {
        Self {
            base: base.into(),
            extra,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn extra(&self) -> Option<&Path> {
        self.extra.as_deref()
    }

    /// Directories in lookup order (extra first)
    fn search_dirs(&self, internal: bool) -> Vec<&Path> {
        let mut dirs = Vec::with_capacity(2);
        if !internal {
            if let Some(extra) = &self.extra {
                dirs.push(extra.as_path());
            }
        }
        dirs.push(self.base.as_path());
        dirs
    }

    /// List files in `subdir` with the given suffix
    ///
    /// Files from the extra directory come first. Internal files are only
    /// ever taken from the base directory.
    pub fn list_files(&self, subdir: &str, suffix: &str, internal: bool) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for dir in self.search_dirs(internal) {
            let path = dir.join(subdir);
            if !path.is_dir() {
                continue;
            }

            let mut found: Vec<PathBuf> = fs::read_dir(&path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(suffix))
                })
                .collect();
            found.sort();
            files.extend(found);
        }

        Ok(files)
    }

    /// First existing path for `relpath`, extra directory first
    pub fn find(&self, relpath: &str) -> Option<PathBuf> {
        self.search_dirs(false)
            .into_iter()
            .map(|dir| dir.join(relpath))
            .find(|p| p.exists())
    }

    /// Every existing copy of `relpath`, base directory first
    pub fn find_all(&self, relpath: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .search_dirs(false)
            .into_iter()
            .map(|dir| dir.join(relpath))
            .filter(|p| p.exists())
            .collect();
        found.reverse();
        found
    }

    /// Load and deserialize a YAML data file
    pub fn load_yaml<T: DeserializeOwned>(&self, relpath: &str) -> Result<T> {
        let path = self
            .find(relpath)
            .ok_or_else(|| Error::ConfigError(format!("Data file '{}' not found", relpath)))?;
        load_yaml_file(&path)
    }
}

/// Read and deserialize a YAML file
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading YAML from '{}'", path.display());
    let content = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Can't read '{}': {}", path.display(), e)))?;
    serde_yaml::from_str(&content).map_err(|e| Error::yaml(path.display(), e))
}

/// Find the shipped data directory
///
/// The environment variable wins, then an installed `share/ciguest`
/// next to the executable, then the source tree.
fn default_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    let installed = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.join("../share/ciguest")))
        .filter(|p| p.join("facts").is_dir());
    if let Some(dir) = installed {
        return dir;
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}
