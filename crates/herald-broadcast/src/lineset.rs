//! Named line sets.

use herald_core::error::HeraldError;
use herald_core::sanitize::is_valid_line_set_name;
use std::path::{Path, PathBuf};
use tracing::info;

/// Source of named, ordered line sets.
pub trait LineSetStore: Send + Sync {
    /// Load a set. Missing and empty sets are both `NotFound`.
    fn load(&self, name: &str) -> Result<Vec<String>, HeraldError>;

    /// Names of every available set, sorted.
    fn names(&self) -> Result<Vec<String>, HeraldError>;

    /// Append a line, creating the set if needed. Returns the new length.
    fn append(&self, name: &str, line: &str) -> Result<usize, HeraldError>;
}

/// Line sets stored as `{dir}/{name}.json`, each a JSON array of strings.
pub struct JsonLineSets {
    dir: PathBuf,
}

impl JsonLineSets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, HeraldError> {
        if !is_valid_line_set_name(name) {
            return Err(HeraldError::InvalidInput(format!("invalid line set name: {name}")));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    fn read(path: &Path) -> Result<Vec<String>, HeraldError> {
        let raw = std::fs::read_to_string(path)?;
        let lines: Vec<String> = serde_json::from_str(&raw)?;
        Ok(lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

impl LineSetStore for JsonLineSets {
    fn load(&self, name: &str) -> Result<Vec<String>, HeraldError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(HeraldError::NotFound(format!("line set '{name}'")));
        }
        let lines = Self::read(&path)?;
        if lines.is_empty() {
            return Err(HeraldError::NotFound(format!("line set '{name}' is empty")));
        }
        Ok(lines)
    }

    fn names(&self) -> Result<Vec<String>, HeraldError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_line_set_name(stem) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn append(&self, name: &str, line: &str) -> Result<usize, HeraldError> {
        let path = self.path_for(name)?;
        let line = line.trim();
        if line.is_empty() {
            return Err(HeraldError::InvalidInput("line is empty".into()));
        }

        let mut lines = if path.exists() {
            Self::read(&path)?
        } else {
            Vec::new()
        };
        lines.push(line.to_string());

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, serde_json::to_string_pretty(&lines)?)?;
        info!("line set '{name}' now has {} lines", lines.len());
        Ok(lines.len())
    }
}
