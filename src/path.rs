//! Dotted tag paths.
//!
//! A [`TagPath`] is a validated, non-empty sequence of segments joined with
//! `.`. Each segment starts with an ASCII letter and continues with ASCII
//! letters, digits or `_`. Case is significant and preserved (`KYC`, `SSL`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MalformedPathError, MalformedReason};

/// Segment separator in canonical paths.
pub const SEPARATOR: char = '.';

/// A validated dotted path such as `blockchain.app.configuration`.
///
/// Equality, ordering and hashing use the canonical string only.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagPath {
    canonical: String,
}

impl TagPath {
    /// Parse and validate a raw path.
    pub fn parse(raw: &str) -> Result<Self, MalformedPathError> {
        validate(raw)?;
        Ok(Self {
            canonical: raw.to_owned(),
        })
    }

    /// Canonical `.`-joined form, used as the registry key.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Iterate the segments from root to leaf.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.canonical.split(SEPARATOR)
    }

    /// Number of segments (always at least 1).
    pub fn len(&self) -> usize {
        self.canonical.matches(SEPARATOR).count() + 1
    }

    /// Paths are never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Tree depth, 0 for a root path.
    #[inline]
    pub fn depth(&self) -> usize {
        self.len() - 1
    }

    /// True for single-segment paths.
    #[inline]
    pub fn is_root(&self) -> bool {
        !self.canonical.contains(SEPARATOR)
    }

    /// The last segment (the node's name under its parent).
    pub fn last(&self) -> &str {
        match self.canonical.rsplit_once(SEPARATOR) {
            Some((_, last)) => last,
            None => &self.canonical,
        }
    }

    /// Structural parent: every segment but the last. `None` for roots.
    pub fn parent(&self) -> Option<TagPath> {
        self.parent_str().map(|parent| Self {
            canonical: parent.to_owned(),
        })
    }

    pub(crate) fn parent_str(&self) -> Option<&str> {
        self.canonical
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| parent)
    }

    /// Append one segment, validating it.
    pub fn join(&self, segment: &str) -> Result<TagPath, MalformedPathError> {
        let joined = format!("{}{}{}", self.canonical, SEPARATOR, segment);
        validate(&joined)?;
        Ok(Self { canonical: joined })
    }

    /// True if `self` equals `ancestor` or lies structurally below it.
    pub fn starts_with(&self, ancestor: &TagPath) -> bool {
        match self.canonical.strip_prefix(ancestor.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(SEPARATOR),
            None => false,
        }
    }
}

/// Check a single segment against `[A-Za-z][A-Za-z0-9_]*`.
pub fn is_valid_segment(segment: &str) -> bool {
    segment_violation(segment).is_none()
}

fn segment_violation(segment: &str) -> Option<MalformedReason> {
    let mut chars = segment.chars();
    match chars.next() {
        None => return Some(MalformedReason::EmptySegment { index: 0 }),
        Some(first) if !first.is_ascii_alphabetic() => {
            return Some(MalformedReason::InvalidStart {
                segment: segment.to_owned(),
            });
        }
        Some(_) => {}
    }
    chars
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_')
        .map(|character| MalformedReason::InvalidCharacter {
            segment: segment.to_owned(),
            character,
        })
}

pub(crate) fn validate(raw: &str) -> Result<(), MalformedPathError> {
    if raw.is_empty() {
        return Err(MalformedPathError::new(raw, MalformedReason::Empty));
    }
    for (index, segment) in raw.split(SEPARATOR).enumerate() {
        if let Some(reason) = segment_violation(segment) {
            let reason = match reason {
                MalformedReason::EmptySegment { .. } => MalformedReason::EmptySegment { index },
                other => other,
            };
            return Err(MalformedPathError::new(raw, reason));
        }
    }
    Ok(())
}

impl FromStr for TagPath {
    type Err = MalformedPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TagPath {
    type Error = MalformedPathError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        validate(&raw)?;
        Ok(Self { canonical: raw })
    }
}

impl TryFrom<&str> for TagPath {
    type Error = MalformedPathError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<TagPath> for String {
    fn from(path: TagPath) -> Self {
        path.canonical
    }
}

impl AsRef<str> for TagPath {
    fn as_ref(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagPath({:?})", self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_splits() {
        let path = TagPath::parse("blockchain.app.configuration").unwrap();
        assert_eq!(path.as_str(), "blockchain.app.configuration");
        assert_eq!(
            path.segments().collect::<Vec<_>>(),
            ["blockchain", "app", "configuration"]
        );
        assert_eq!(path.len(), 3);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.last(), "configuration");
        assert!(!path.is_root());
    }

    #[test]
    fn parent_and_join_are_inverse() {
        let path = TagPath::parse("blockchain.app").unwrap();
        let child = path.join("deep_link").unwrap();
        assert_eq!(child.as_str(), "blockchain.app.deep_link");
        assert_eq!(child.parent(), Some(path));
    }

    #[test]
    fn root_has_no_parent() {
        let root = TagPath::parse("blockchain").unwrap();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.last(), "blockchain");
    }

    #[test]
    fn preserves_uppercase_segments() {
        let path = TagPath::parse("blockchain.app.configuration.SSL.pinning").unwrap();
        assert_eq!(path.segments().nth(3), Some("SSL"));
        assert!(TagPath::parse("blockchain.ux.KYC").is_ok());
        assert_ne!(
            TagPath::parse("blockchain.ux.KYC").unwrap(),
            TagPath::parse("blockchain.ux.kyc").unwrap()
        );
    }

    #[test]
    fn rejects_malformed() {
        let cases = [
            ("", MalformedReason::Empty),
            ("a..b", MalformedReason::EmptySegment { index: 1 }),
            (".a", MalformedReason::EmptySegment { index: 0 }),
            ("a.", MalformedReason::EmptySegment { index: 1 }),
            (
                "a.1b",
                MalformedReason::InvalidStart {
                    segment: "1b".into(),
                },
            ),
            (
                "a._b",
                MalformedReason::InvalidStart {
                    segment: "_b".into(),
                },
            ),
            (
                "a.b-c",
                MalformedReason::InvalidCharacter {
                    segment: "b-c".into(),
                    character: '-',
                },
            ),
            (
                "a.b c",
                MalformedReason::InvalidCharacter {
                    segment: "b c".into(),
                    character: ' ',
                },
            ),
        ];
        for (raw, reason) in cases {
            let err = TagPath::parse(raw).unwrap_err();
            assert_eq!(err.raw(), raw);
            assert_eq!(err.reason(), &reason, "wrong reason for {raw:?}");
        }
    }

    #[test]
    fn rejects_non_ascii_letters() {
        assert!(TagPath::parse("blockchain.ñ").is_err());
        assert!(TagPath::parse("blockchain.caf\u{e9}").is_err());
    }

    #[test]
    fn starts_with_respects_segment_boundaries() {
        let app = TagPath::parse("blockchain.app").unwrap();
        let config = TagPath::parse("blockchain.app.configuration").unwrap();
        let apple = TagPath::parse("blockchain.apple").unwrap();
        assert!(config.starts_with(&app));
        assert!(app.starts_with(&app));
        assert!(!apple.starts_with(&app));
        assert!(!app.starts_with(&config));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let path: TagPath = serde_json::from_str("\"blockchain.db.leaf\"").unwrap();
        assert_eq!(path.as_str(), "blockchain.db.leaf");
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"blockchain.db.leaf\"");
        assert!(serde_json::from_str::<TagPath>("\"blockchain..leaf\"").is_err());
    }
}
