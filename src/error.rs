//! Error types.
//!
//! Two tiers: [`SchemaError`] is fatal and only produced while building a
//! registry; [`LookupError`] is returned for untrusted runtime input.

use std::fmt;

use crate::hash::TagId;

/// Why a raw string is not a valid tag path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// The input was the empty string.
    Empty,
    /// A segment at `index` is empty (leading, trailing or doubled `.`).
    EmptySegment { index: usize },
    /// A segment does not start with an ASCII letter.
    InvalidStart { segment: String },
    /// A segment contains a character outside `[A-Za-z0-9_]`.
    InvalidCharacter { segment: String, character: char },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("path is empty"),
            Self::EmptySegment { index } => write!(f, "segment {index} is empty"),
            Self::InvalidStart { segment } => {
                write!(f, "segment '{segment}' must start with an ASCII letter")
            }
            Self::InvalidCharacter { segment, character } => {
                write!(f, "segment '{segment}' contains invalid character {character:?}")
            }
        }
    }
}

/// A raw string failed tag path validation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed tag path {raw:?}: {reason}")]
pub struct MalformedPathError {
    raw: String,
    reason: MalformedReason,
}

impl MalformedPathError {
    pub(crate) fn new(raw: &str, reason: MalformedReason) -> Self {
        Self {
            raw: raw.to_owned(),
            reason,
        }
    }

    /// The rejected input.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn reason(&self) -> &MalformedReason {
        &self.reason
    }
}

/// The schema is inconsistent; no registry was built.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid path in schema: {0}")]
    MalformedPath(#[from] MalformedPathError),

    #[error("duplicate definition of '{path}'")]
    DuplicateDefinition { path: String },

    #[error("'{path}' is defined but its parent '{parent}' is not")]
    MissingParent { path: String, parent: String },

    #[error("'{path}' declares unknown supertype '{supertype}'")]
    UnknownSupertype { path: String, supertype: String },

    /// `cycle` lists each path on the cycle in edge order, starting and
    /// ending with the same path.
    #[error("cyclic supertype chain: {}", cycle.join(" -> "))]
    CyclicSupertype { cycle: Vec<String> },

    #[error("'{path}' is declared a leaf but has child '{child}'")]
    LeafWithChildren { path: String, child: String },

    #[error("'{first}' and '{second}' share fingerprint {id:#018x}; rename one of them")]
    FingerprintCollision {
        first: String,
        second: String,
        id: TagId,
    },
}

/// A runtime lookup failed. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Malformed(#[from] MalformedPathError),

    #[error("unknown tag '{path}'")]
    UnknownPath { path: String },

    #[error("'{parent}' has no child named '{name}'")]
    UnknownChild { parent: String, name: String },

    #[error("no extractor registered under '{name}'")]
    UnknownExtractor { name: String },
}

/// A leaf kind name did not match any known kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown leaf kind '{0}'")]
pub struct UnknownLeafKind(pub String);
