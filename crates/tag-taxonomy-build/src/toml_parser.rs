//! TOML configuration parser for taxonomy.toml.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tag_taxonomy::{is_valid_segment, Registry, SchemaError, TagDefinition, TagPath};
use thiserror::Error;

/// Segments `taxonomy!` cannot turn into a module, even as raw identifiers.
const UNNAMEABLE_SEGMENTS: &[&str] = &["crate", "self", "Self", "super"];

/// Rust keywords; the generated root module must be a plain identifier.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Behavior when a path is removed from config but exists in lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnRemove {
    /// Emit a compile error (default, safest)
    #[default]
    Error,
    /// Keep the removed path as a `#[deprecated]` bare tag
    Warn,
}

/// Parsed, validated taxonomy configuration.
#[derive(Debug, Clone)]
pub struct TaxonomyConfig {
    /// Module name for the generated taxonomy
    pub module_name: String,
    /// Behavior when paths are removed
    pub on_remove: OnRemove,
    /// Whether missing ancestors were added as bare tags
    pub implicit_parents: bool,
    /// All definitions (including implied parents), sorted by path
    definitions: Vec<TagDefinition>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
struct RawTaxonomyConfig {
    /// Optional module name (defaults to "tags")
    module_name: Option<String>,
    /// Behavior when paths are removed: "error" (default) or "warn"
    on_remove: Option<String>,
    /// Add missing ancestors automatically (defaults to true)
    implicit_parents: Option<bool>,
    /// `[[tag]]` tables
    #[serde(default, rename = "tag")]
    tags: Vec<TagDefinition>,
}

impl TaxonomyConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TaxonomyConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TaxonomyConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, TaxonomyConfigError> {
        let raw: RawTaxonomyConfig = toml::from_str(content)?;

        let module_name = raw.module_name.unwrap_or_else(|| "tags".to_string());
        if !is_valid_segment(&module_name) {
            return Err(TaxonomyConfigError::Validation(format!(
                "invalid module_name '{module_name}': expected an ASCII identifier"
            )));
        }
        if KEYWORDS.contains(&module_name.as_str()) {
            return Err(TaxonomyConfigError::Validation(format!(
                "invalid module_name '{module_name}': Rust keywords cannot name the generated module"
            )));
        }

        let on_remove = match raw.on_remove.as_deref() {
            None | Some("error") => OnRemove::Error,
            Some("warn") => OnRemove::Warn,
            Some(other) => {
                return Err(TaxonomyConfigError::Validation(format!(
                    "invalid on_remove value '{other}': expected 'error' or 'warn'"
                )));
            }
        };

        let implicit_parents = raw.implicit_parents.unwrap_or(true);
        let definitions = expand(raw.tags, implicit_parents)?;
        check_nameable(&definitions)?;

        // The schema must freeze; otherwise the generated code would not.
        Registry::build(definitions.iter().cloned())?;

        Ok(Self {
            module_name,
            on_remove,
            implicit_parents,
            definitions,
        })
    }

    /// All definitions, sorted by path.
    pub fn definitions(&self) -> impl ExactSizeIterator<Item = &TagDefinition> {
        self.definitions.iter()
    }

    pub fn get(&self, path: &str) -> Option<&TagDefinition> {
        self.definitions
            .binary_search_by(|def| def.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.definitions[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Sort, reject duplicates and (optionally) add every missing ancestor as a
/// bare tag.
///
/// e.g., "a.b.c" alone expands to ["a", "a.b", "a.b.c"]
fn expand(
    tags: Vec<TagDefinition>,
    implicit_parents: bool,
) -> Result<Vec<TagDefinition>, TaxonomyConfigError> {
    let mut by_path: BTreeMap<String, TagDefinition> = BTreeMap::new();
    for def in tags {
        if by_path.contains_key(def.path.as_str()) {
            return Err(TaxonomyConfigError::Schema(SchemaError::DuplicateDefinition {
                path: def.path.to_string(),
            }));
        }
        by_path.insert(def.path.as_str().to_owned(), def);
    }

    if implicit_parents {
        let mut missing: HashSet<TagPath> = HashSet::new();
        for def in by_path.values() {
            let mut parent = def.path.parent();
            while let Some(path) = parent {
                if by_path.contains_key(path.as_str()) || !missing.insert(path.clone()) {
                    break;
                }
                parent = path.parent();
            }
        }
        for path in missing {
            by_path.insert(path.as_str().to_owned(), TagDefinition::from_path(path));
        }
    }

    Ok(by_path.into_values().collect())
}

/// Every segment must be usable as a module name in the generated code.
fn check_nameable(definitions: &[TagDefinition]) -> Result<(), TaxonomyConfigError> {
    for def in definitions {
        if let Some(segment) = def
            .path
            .segments()
            .find(|segment| UNNAMEABLE_SEGMENTS.contains(segment))
        {
            return Err(TaxonomyConfigError::Validation(format!(
                "invalid tag '{}': segment '{segment}' cannot name a module",
                def.path
            )));
        }
    }
    Ok(())
}

/// Errors during config parsing.
#[derive(Debug, Error)]
pub enum TaxonomyConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tag_taxonomy::LeafKind;

    #[test]
    fn parse_simple_config() {
        let toml = r#"
[[tag]]
path = "blockchain.db.leaf"

[[tag]]
path = "blockchain.db.type.boolean"
supertypes = ["blockchain.db.leaf"]
leaf_kind = "boolean"
"#;
        let config = TaxonomyConfig::from_str(toml).unwrap();

        assert_eq!(config.module_name, "tags");
        assert!(config.implicit_parents);
        // blockchain, blockchain.db, blockchain.db.leaf, blockchain.db.type, blockchain.db.type.boolean
        assert_eq!(config.len(), 5);

        let boolean = config.get("blockchain.db.type.boolean").unwrap();
        assert_eq!(boolean.leaf_kind, Some(LeafKind::Boolean));
        assert_eq!(boolean.supertypes[0].as_str(), "blockchain.db.leaf");
        assert!(config.get("blockchain.db.type").unwrap().supertypes.is_empty());
    }

    #[test]
    fn parse_with_module_name() {
        let toml = r#"
module_name = "blockchain_tags"

[[tag]]
path = "blockchain"
"#;
        let config = TaxonomyConfig::from_str(toml).unwrap();
        assert_eq!(config.module_name, "blockchain_tags");
    }

    #[test]
    fn rejects_invalid_module_name() {
        let toml = r#"
module_name = "blockchain-tags"
"#;
        assert!(matches!(
            TaxonomyConfig::from_str(toml),
            Err(TaxonomyConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_keyword_module_name() {
        for name in ["type", "self", "crate", "Self", "gen"] {
            let toml = format!("module_name = \"{name}\"\n");
            match TaxonomyConfig::from_str(&toml) {
                Err(TaxonomyConfigError::Validation(msg)) => assert!(msg.contains(name)),
                other => panic!("module_name {name} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_unnameable_segments() {
        for path in ["a.self", "super", "crate.x", "a.Self.b"] {
            let toml = format!("[[tag]]\npath = \"{path}\"\n");
            assert!(
                matches!(
                    TaxonomyConfig::from_str(&toml),
                    Err(TaxonomyConfigError::Validation(_))
                ),
                "should reject: {path}"
            );
        }
    }

    #[test]
    fn keyword_segments_are_still_accepted() {
        let toml = r#"
[[tag]]
path = "blockchain.ux.payment.method.in"

[[tag]]
path = "blockchain.db.type"
"#;
        let config = TaxonomyConfig::from_str(toml).unwrap();
        assert!(config.contains("blockchain.ux.payment.method.in"));
        assert!(config.contains("blockchain.db.type"));
    }

    #[test]
    fn expand_creates_parents_sorted() {
        let toml = r#"
[[tag]]
path = "a.b.c.d"
"#;
        let config = TaxonomyConfig::from_str(toml).unwrap();
        let paths: Vec<_> = config.definitions().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["a", "a.b", "a.b.c", "a.b.c.d"]);
    }

    #[test]
    fn explicit_parents_are_not_duplicated() {
        let toml = r#"
[[tag]]
path = "a"

[[tag]]
path = "a.b.c"

[[tag]]
path = "a.b.d"
"#;
        let config = TaxonomyConfig::from_str(toml).unwrap();
        // a, a.b, a.b.c, a.b.d
        assert_eq!(config.len(), 4);
    }

    #[test]
    fn missing_parents_fail_without_implicit_parents() {
        let toml = r#"
implicit_parents = false

[[tag]]
path = "a.b"
"#;
        let err = TaxonomyConfig::from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            TaxonomyConfigError::Schema(SchemaError::MissingParent { .. })
        ));
    }

    #[test]
    fn rejects_invalid_path() {
        let cases = [".a", "a.", "a..b", "a.1b", "a.b-c", "a.b c", "_private.item", ""];

        for case in cases {
            let toml = format!(
                r#"
[[tag]]
path = "{case}"
"#
            );
            assert!(
                TaxonomyConfig::from_str(&toml).is_err(),
                "Should reject: {case}"
            );
        }
    }

    #[test]
    fn rejects_duplicate_and_cyclic_schemas() {
        let duplicate = r#"
[[tag]]
path = "a"

[[tag]]
path = "a"
"#;
        assert!(matches!(
            TaxonomyConfig::from_str(duplicate),
            Err(TaxonomyConfigError::Schema(SchemaError::DuplicateDefinition { .. }))
        ));

        let cyclic = r#"
[[tag]]
path = "a.x"
supertypes = ["a.y"]

[[tag]]
path = "a.y"
supertypes = ["a.x"]
"#;
        assert!(matches!(
            TaxonomyConfig::from_str(cyclic),
            Err(TaxonomyConfigError::Schema(SchemaError::CyclicSupertype { .. }))
        ));
    }

    #[test]
    fn accepts_camel_case_leaf_kind() {
        let toml = r#"
[[tag]]
path = "blockchain.app.is.ready"
leafKind = "array.of.tags"
"#;
        let config = TaxonomyConfig::from_str(toml).unwrap();
        let ready = config.get("blockchain.app.is.ready").unwrap();
        assert!(ready.is_terminal());
    }

    #[test]
    fn on_remove_defaults_to_error() {
        let config = TaxonomyConfig::from_str("").unwrap();
        assert_eq!(config.on_remove, OnRemove::Error);
        assert!(config.is_empty());
    }

    #[test]
    fn on_remove_warn() {
        let config = TaxonomyConfig::from_str(r#"on_remove = "warn""#).unwrap();
        assert_eq!(config.on_remove, OnRemove::Warn);
    }

    #[test]
    fn on_remove_invalid_value() {
        let err = TaxonomyConfig::from_str(r#"on_remove = "invalid""#).unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
