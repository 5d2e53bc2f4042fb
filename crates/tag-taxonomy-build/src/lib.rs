//! Build-time utilities for tag-taxonomy.
//!
//! This crate provides tools for:
//! - Parsing `taxonomy.toml` schema files
//! - Managing `taxonomy.lock.toml` lock files for change detection
//! - Generating Rust code with the `taxonomy!` macro
//!
//! # Usage in build.rs
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     println!("cargo:rerun-if-changed=taxonomy.toml");
//!     tag_taxonomy_build::generate("taxonomy.toml", "src/generated_tags.rs")
//!         .expect("Failed to generate tags");
//! }
//! ```
//!
//! # Lock File Mechanism
//!
//! The lock file ensures that removing a tag is intentional:
//!
//! - First build: writes `taxonomy.lock.toml` with all paths and fingerprints
//! - Subsequent builds: compares against the lock file
//! - Path removed: **build error** (default) or **warning** (with `on_remove = "warn"`)
//! - New paths: appended to the lock
//!
//! With `on_remove = "warn"` a removed path stays in the generated code as a
//! bare `#[deprecated]` tag, so downstream references keep compiling.
//!
//! To intentionally break compatibility, delete the lock file and rebuild.

mod codegen;
mod lock;
mod toml_parser;

pub use codegen::{combined_definitions, generate_taxonomy_code, generate_taxonomy_code_from_lock};
pub use lock::{LockDiff, LockEntry, LockFile, LockFileError, LOCK_VERSION};
pub use toml_parser::{OnRemove, TaxonomyConfig, TaxonomyConfigError};

use std::path::{Path, PathBuf};
use tag_taxonomy::Registry;
use thiserror::Error;

/// Main entry point for build.rs integration.
///
/// Reads `taxonomy.toml`, compares with `taxonomy.lock.toml` next to it, and
/// writes the generated Rust code to `output_path`.
///
/// # Errors
///
/// Returns an error if:
/// - `taxonomy.toml` cannot be read or is not a valid schema
/// - Lock file mismatch detected (paths removed) and `on_remove = "error"`
/// - Output file cannot be written
pub fn generate(
    config_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();
    let lock_path = config_path.with_extension("lock.toml");
    generate_with_lock(config_path, &lock_path, output_path)
}

/// Generate with explicit lock file path.
pub fn generate_with_lock(
    config_path: impl AsRef<Path>,
    lock_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let lock_path = lock_path.as_ref();
    let output_path = output_path.as_ref();

    // 1. Parse and validate taxonomy.toml
    let config = TaxonomyConfig::from_file(config_path)?;

    // 2. Load or create lock file
    let (mut lock, diff) = if lock_path.exists() {
        let existing = LockFile::from_file(lock_path)?;
        let diff = existing.diff(&config);
        (existing, Some(diff))
    } else {
        (LockFile::from_config(&config), None)
    };

    // 3. Handle removed paths based on on_remove strategy
    if let Some(diff) = &diff
        && !diff.removed.is_empty()
    {
        match config.on_remove {
            OnRemove::Error => {
                return Err(GenerateError::LockMismatch(format_lock_error(diff)));
            }
            OnRemove::Warn => {
                for path in &diff.removed {
                    lock.mark_deprecated(path);
                    println!(
                        "cargo:warning=tag-taxonomy: '{path}' was removed from the schema and is now deprecated"
                    );
                }
            }
        }
    }

    // 4. Record new (or revived) paths
    if let Some(diff) = &diff {
        for path in &diff.added {
            lock.add_entry(path);
        }
    }

    // 5. The generated schema, deprecated paths included, must still freeze
    let definitions = combined_definitions(&config, &lock);
    Registry::build(definitions.into_iter().map(|(def, _)| def))
        .map_err(TaxonomyConfigError::from)?;

    // 6. Write the lock only when something changed
    if diff.as_ref().is_none_or(|d| !d.is_empty()) {
        lock.write_to_file(lock_path)?;
    }

    // 7. Generate Rust code
    let code = generate_taxonomy_code_from_lock(&config, &lock);
    std::fs::write(output_path, code).map_err(|source| GenerateError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn format_lock_error(diff: &LockDiff) -> String {
    let mut msg = String::new();
    msg.push_str("tag-taxonomy: Lock file mismatch!\n\n");
    msg.push_str("  Missing in taxonomy.toml (existed in lock):\n");
    for path in &diff.removed {
        msg.push_str(&format!("    - {path}\n"));
    }
    msg.push_str("\n  To fix:\n");
    msg.push_str("    1. Add the path(s) back to taxonomy.toml, OR\n");
    msg.push_str("    2. Set `on_remove = \"warn\"` in taxonomy.toml to deprecate instead, OR\n");
    msg.push_str("    3. Delete taxonomy.lock.toml to regenerate (BREAKING CHANGE!)\n");
    msg
}

/// Errors that can occur during generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("config error: {0}")]
    Config(#[from] TaxonomyConfigError),
    #[error("lock file error: {0}")]
    Lock(#[from] LockFileError),
    /// Paths removed under `on_remove = "error"`.
    #[error("{0}")]
    LockMismatch(String),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
