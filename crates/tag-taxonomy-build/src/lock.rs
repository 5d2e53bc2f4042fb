//! taxonomy.lock.toml: the record of every path ever generated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tag_taxonomy::{fingerprint, TagId};
use thiserror::Error;

use crate::toml_parser::TaxonomyConfig;

/// Current lock file format version.
pub const LOCK_VERSION: u32 = 1;

/// Lock file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    pub version: u32,
    /// RFC 3339 timestamp of the last change.
    pub generated_at: String,
    /// Sorted by path.
    #[serde(default, rename = "entry")]
    pub entries: Vec<LockEntry>,
}

/// One locked path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub path: String,
    /// Hex fingerprint; TOML integers cannot hold every `u64`.
    pub id: String,
    /// Removed from config but kept under `on_remove = "warn"`.
    #[serde(default)]
    pub deprecated: bool,
}

impl LockEntry {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let id = format_id(fingerprint(&path));
        Self {
            path,
            id,
            deprecated: false,
        }
    }

    /// The recorded fingerprint, if it parses.
    pub fn tag_id(&self) -> Option<TagId> {
        let digits = self.id.strip_prefix("0x").unwrap_or(&self.id);
        TagId::from_str_radix(digits, 16).ok()
    }
}

fn format_id(id: TagId) -> String {
    format!("0x{id:016x}")
}

/// Paths that changed between a lock file and a config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockDiff {
    /// In config but not active in the lock.
    pub added: Vec<String>,
    /// Active in the lock but missing from config.
    pub removed: Vec<String>,
}

impl LockDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl LockFile {
    pub fn new() -> Self {
        Self {
            version: LOCK_VERSION,
            generated_at: now(),
            entries: Vec::new(),
        }
    }

    /// A fresh lock covering every path in `config`.
    pub fn from_config(config: &TaxonomyConfig) -> Self {
        let mut lock = Self::new();
        lock.entries = config
            .definitions()
            .map(|def| LockEntry::new(def.path.as_str()))
            .collect();
        lock
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LockFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LockFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse and check every recorded fingerprint.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, LockFileError> {
        let mut lock: LockFile =
            toml::from_str(content).map_err(|e| LockFileError::Parse(e.to_string()))?;

        if lock.version != LOCK_VERSION {
            return Err(LockFileError::Parse(format!(
                "unsupported lock version {} (expected {LOCK_VERSION})",
                lock.version
            )));
        }
        for entry in &lock.entries {
            if entry.tag_id() != Some(fingerprint(&entry.path)) {
                return Err(LockFileError::Parse(format!(
                    "entry '{}' records id {} but its fingerprint is {}",
                    entry.path,
                    entry.id,
                    format_id(fingerprint(&entry.path))
                )));
            }
        }
        lock.entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(lock)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockFileError> {
        let path = path.as_ref();
        let mut content = String::from("# Generated by tag-taxonomy-build. Commit this file.\n\n");
        content.push_str(&toml::to_string_pretty(self)?);
        std::fs::write(path, content).map_err(|source| LockFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, path: &str) -> Option<&LockEntry> {
        self.position(path).map(|idx| &self.entries[idx])
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
    }

    /// Compare against `config`.
    ///
    /// A deprecated entry that reappears in config counts as added; one that
    /// stays absent is not reported again.
    pub fn diff(&self, config: &TaxonomyConfig) -> LockDiff {
        let configured: HashSet<&str> = config.definitions().map(|d| d.path.as_str()).collect();

        let added = config
            .definitions()
            .map(|d| d.path.as_str())
            .filter(|path| self.get(path).is_none_or(|e| e.deprecated))
            .map(str::to_owned)
            .collect();

        let removed = self
            .active_entries()
            .filter(|e| !configured.contains(e.path.as_str()))
            .map(|e| e.path.clone())
            .collect();

        LockDiff { added, removed }
    }

    /// Record `path` as active, reviving it if it was deprecated.
    pub fn add_entry(&mut self, path: &str) {
        match self.entries.binary_search_by(|e| e.path.as_str().cmp(path)) {
            Ok(idx) => self.entries[idx].deprecated = false,
            Err(idx) => self.entries.insert(idx, LockEntry::new(path)),
        }
        self.generated_at = now();
    }

    /// Returns `false` if `path` is not locked.
    pub fn mark_deprecated(&mut self, path: &str) -> bool {
        match self.position(path) {
            Some(idx) => {
                self.entries[idx].deprecated = true;
                self.generated_at = now();
                true
            }
            None => false,
        }
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.iter().filter(|e| !e.deprecated)
    }

    pub fn deprecated_entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.iter().filter(|e| e.deprecated)
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Errors reading or writing the lock file.
#[derive(Debug, Error)]
pub enum LockFileError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid lock file: {0}")]
    Parse(String),
    #[error("failed to serialize lock file: {0}")]
    Serialize(#[from] toml::ser::Error),
}
