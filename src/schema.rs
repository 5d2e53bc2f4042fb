//! Schema input: tag definitions and leaf kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MalformedPathError, UnknownLeafKind};
use crate::path::TagPath;

/// Element classification for array leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Boolean,
    Date,
    Integer,
    Map,
    Number,
    String,
    Tag,
    Url,
}

impl ElementKind {
    pub const ALL: [ElementKind; 8] = [
        Self::Boolean,
        Self::Date,
        Self::Integer,
        Self::Map,
        Self::Number,
        Self::String,
        Self::Tag,
        Self::Url,
    ];

    /// Plural name used after `array.of.`.
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Boolean => "booleans",
            Self::Date => "dates",
            Self::Integer => "integers",
            Self::Map => "maps",
            Self::Number => "numbers",
            Self::String => "strings",
            Self::Tag => "tags",
            Self::Url => "urls",
        }
    }
}

/// Primitive classification of a terminal tag.
///
/// Opaque to the registry; value decoders downstream interpret it. Names
/// follow the `blockchain.db.type.*` suffixes: `boolean`, `bigint`,
/// `array.of.tags` and so on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LeafKind {
    Any,
    BigInt,
    Boolean,
    Date,
    Enum,
    Integer,
    Number,
    String,
    Tag,
    Url,
    ArrayOf(ElementKind),
}

const ARRAY_PREFIX: &str = "array.of.";

impl LeafKind {
    pub const SCALARS: [LeafKind; 10] = [
        Self::Any,
        Self::BigInt,
        Self::Boolean,
        Self::Date,
        Self::Enum,
        Self::Integer,
        Self::Number,
        Self::String,
        Self::Tag,
        Self::Url,
    ];

    /// Element kind for array leaves.
    pub const fn element(self) -> Option<ElementKind> {
        match self {
            Self::ArrayOf(element) => Some(element),
            _ => None,
        }
    }

    pub const fn is_array(self) -> bool {
        matches!(self, Self::ArrayOf(_))
    }
}

impl fmt::Display for LeafKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Enum => "enum",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Tag => "tag",
            Self::Url => "url",
            Self::ArrayOf(element) => return write!(f, "{ARRAY_PREFIX}{}", element.plural()),
        };
        f.write_str(name)
    }
}

impl FromStr for LeafKind {
    type Err = UnknownLeafKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(plural) = s.strip_prefix(ARRAY_PREFIX) {
            return ElementKind::ALL
                .into_iter()
                .find(|e| e.plural() == plural)
                .map(LeafKind::ArrayOf)
                .ok_or_else(|| UnknownLeafKind(s.to_owned()));
        }
        Self::SCALARS
            .into_iter()
            .find(|k| k.to_string() == s)
            .ok_or_else(|| UnknownLeafKind(s.to_owned()))
    }
}

impl TryFrom<String> for LeafKind {
    type Error = UnknownLeafKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LeafKind> for String {
    fn from(kind: LeafKind) -> Self {
        kind.to_string()
    }
}

/// One schema record: a path, its direct supertypes and its leaf status.
///
/// Deserializes from `{ "path": .., "supertypes": [..], "is_leaf": .., "leaf_kind": .. }`
/// with everything but `path` optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub path: TagPath,
    #[serde(default)]
    pub supertypes: Vec<TagPath>,
    #[serde(default, alias = "isLeaf")]
    pub is_leaf: bool,
    #[serde(default, alias = "leafKind")]
    pub leaf_kind: Option<LeafKind>,
}

impl TagDefinition {
    /// A bare, non-leaf definition with no declared supertypes.
    pub fn new(path: &str) -> Result<Self, MalformedPathError> {
        Ok(Self::from_path(TagPath::parse(path)?))
    }

    pub fn from_path(path: TagPath) -> Self {
        Self {
            path,
            supertypes: Vec::new(),
            is_leaf: false,
            leaf_kind: None,
        }
    }

    /// Builder: add a direct supertype.
    pub fn with_supertype(mut self, supertype: &str) -> Result<Self, MalformedPathError> {
        self.supertypes.push(TagPath::parse(supertype)?);
        Ok(self)
    }

    /// Builder: mark as a leaf without a primitive kind.
    pub fn leaf(mut self) -> Self {
        self.is_leaf = true;
        self
    }

    /// Builder: mark as a leaf of the given kind.
    pub fn with_leaf_kind(mut self, kind: LeafKind) -> Self {
        self.is_leaf = true;
        self.leaf_kind = Some(kind);
        self
    }

    /// A declared leaf kind implies leaf status even if `is_leaf` was omitted.
    pub fn is_terminal(&self) -> bool {
        self.is_leaf || self.leaf_kind.is_some()
    }
}

/// Const-constructible definition, emitted by the `taxonomy!` macro.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagDef {
    pub path: &'static str,
    pub supertypes: &'static [&'static str],
    pub is_leaf: bool,
    pub leaf_kind: Option<LeafKind>,
}

impl TagDef {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            supertypes: &[],
            is_leaf: false,
            leaf_kind: None,
        }
    }

    pub const fn with_supertypes(mut self, supertypes: &'static [&'static str]) -> Self {
        self.supertypes = supertypes;
        self
    }

    pub const fn leaf(mut self) -> Self {
        self.is_leaf = true;
        self
    }

    pub const fn with_leaf_kind(mut self, kind: LeafKind) -> Self {
        self.is_leaf = true;
        self.leaf_kind = Some(kind);
        self
    }
}

impl TryFrom<&TagDef> for TagDefinition {
    type Error = MalformedPathError;

    fn try_from(def: &TagDef) -> Result<Self, Self::Error> {
        Ok(Self {
            path: TagPath::parse(def.path)?,
            supertypes: def
                .supertypes
                .iter()
                .map(|s| TagPath::parse(s))
                .collect::<Result<_, _>>()?,
            is_leaf: def.is_leaf,
            leaf_kind: def.leaf_kind,
        })
    }
}
