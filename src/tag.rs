//! Tag handles.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::LookupError;
use crate::extract::Extractors;
use crate::hash::TagId;
use crate::path::TagPath;
use crate::registry::{NodeId, Registry, TagNode};
use crate::schema::LeafKind;

/// A handle to one node of a frozen [`Registry`].
///
/// Cheap to copy and safe to share across threads. Identity is the canonical
/// path: two tags are equal (and hash alike) iff their paths are equal.
///
/// ```
/// use tag_taxonomy::{Registry, TagDefinition};
///
/// let registry = Registry::build([
///     TagDefinition::new("blockchain").unwrap(),
///     TagDefinition::new("blockchain.app").unwrap(),
/// ])
/// .unwrap();
///
/// let root = registry.resolve("blockchain").unwrap();
/// let app = root.child("app").unwrap();
/// assert_eq!(app.path(), "blockchain.app");
/// assert_eq!(app.parent(), Some(root));
/// ```
#[derive(Clone, Copy)]
pub struct Tag<'r> {
    registry: &'r Registry,
    node: NodeId,
}

impl<'r> Tag<'r> {
    #[inline]
    pub(crate) fn new(registry: &'r Registry, node: NodeId) -> Self {
        Self { registry, node }
    }

    #[inline]
    fn entry(self) -> &'r TagNode {
        self.registry.node(self.node)
    }

    #[inline]
    fn at(self, node: NodeId) -> Tag<'r> {
        Tag::new(self.registry, node)
    }

    /// Canonical path.
    #[inline]
    pub fn path(self) -> &'r str {
        self.entry().path.as_str()
    }

    #[inline]
    pub fn tag_path(self) -> &'r TagPath {
        &self.entry().path
    }

    /// Stable fingerprint of the path.
    #[inline]
    pub fn id(self) -> TagId {
        self.entry().id
    }

    #[inline]
    pub fn node_id(self) -> NodeId {
        self.node
    }

    /// Last path segment.
    #[inline]
    pub fn name(self) -> &'r str {
        self.entry().path.last()
    }

    #[inline]
    pub fn depth(self) -> usize {
        self.entry().path.depth()
    }

    #[inline]
    pub fn registry(self) -> &'r Registry {
        self.registry
    }

    /// Structural parent; `None` only for roots.
    pub fn parent(self) -> Option<Tag<'r>> {
        self.entry().parent.map(|p| self.at(p))
    }

    /// Navigate to the child named `name`.
    pub fn child(self, name: &str) -> Result<Tag<'r>, LookupError> {
        match self.entry().children.get(name) {
            Some(&child) => Ok(self.at(child)),
            None => Err(LookupError::UnknownChild {
                parent: self.path().to_owned(),
                name: name.to_owned(),
            }),
        }
    }

    /// Direct children, ordered by segment name.
    pub fn children(self) -> impl ExactSizeIterator<Item = Tag<'r>> {
        self.entry().children.values().map(move |&c| self.at(c))
    }

    /// This tag and everything structurally below it, depth-first.
    pub fn descendants(self) -> Descendants<'r> {
        Descendants {
            registry: self.registry,
            stack: vec![self.node],
        }
    }

    /// O(1) classification check against the precomputed closure.
    ///
    /// Reflexive: `t.is_a(t)` always holds. An `other` that does not name a
    /// registered tag is never a supertype.
    pub fn is_a(self, other: impl TagRef) -> bool {
        other
            .node_in(self.registry)
            .is_some_and(|target| self.entry().all_supertypes.contains(&target))
    }

    /// Declared supertypes, in declaration order.
    pub fn direct_supertypes(self) -> impl ExactSizeIterator<Item = Tag<'r>> {
        self.entry()
            .direct_supertypes
            .iter()
            .map(move |&s| self.at(s))
    }

    /// Full reflexive-transitive closure: every tag this one is-a, itself
    /// included.
    pub fn supertypes(self) -> HashSet<Tag<'r>> {
        self.entry()
            .all_supertypes
            .iter()
            .map(|&s| self.at(s))
            .collect()
    }

    #[inline]
    pub fn is_leaf(self) -> bool {
        self.entry().is_leaf
    }

    #[inline]
    pub fn leaf_kind(self) -> Option<LeafKind> {
        self.entry().leaf_kind
    }

    /// Apply the extractor registered under `name`.
    pub fn extract<T>(self, extractors: &Extractors<T>, name: &str) -> Result<T, LookupError> {
        extractors.apply(name, self)
    }
}

impl PartialEq for Tag<'_> {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self.registry, other.registry) {
            return self.node == other.node;
        }
        self.path() == other.path()
    }
}

impl Eq for Tag<'_> {}

impl Hash for Tag<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().hash(state);
    }
}

impl PartialOrd for Tag<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path().cmp(other.path())
    }
}

impl fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl fmt::Debug for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.path()).finish()
    }
}

/// Depth-first walk over a subtree, parents before children, siblings in
/// segment order.
#[derive(Clone, Debug)]
pub struct Descendants<'r> {
    registry: &'r Registry,
    stack: Vec<NodeId>,
}

impl<'r> Iterator for Descendants<'r> {
    type Item = Tag<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.registry.node(node).children.values().rev().copied());
        Some(Tag::new(self.registry, node))
    }
}

// =============================================================================
// TagRef: anything that can name a tag in a registry
// =============================================================================

/// Something that identifies a tag: a [`Tag`], a path string, a [`TagPath`]
/// or a [`TagId`] fingerprint.
pub trait TagRef {
    /// The node this reference names in `registry`, if any.
    fn node_in(&self, registry: &Registry) -> Option<NodeId>;
}

impl<T: TagRef + ?Sized> TagRef for &T {
    #[inline]
    fn node_in(&self, registry: &Registry) -> Option<NodeId> {
        (**self).node_in(registry)
    }
}

impl TagRef for Tag<'_> {
    fn node_in(&self, registry: &Registry) -> Option<NodeId> {
        if std::ptr::eq(self.registry, registry) {
            Some(self.node)
        } else {
            registry.lookup(self.path())
        }
    }
}

impl TagRef for str {
    #[inline]
    fn node_in(&self, registry: &Registry) -> Option<NodeId> {
        registry.lookup(self)
    }
}

impl TagRef for String {
    #[inline]
    fn node_in(&self, registry: &Registry) -> Option<NodeId> {
        registry.lookup(self)
    }
}

impl TagRef for TagPath {
    #[inline]
    fn node_in(&self, registry: &Registry) -> Option<NodeId> {
        registry.lookup(self.as_str())
    }
}

impl TagRef for TagId {
    #[inline]
    fn node_in(&self, registry: &Registry) -> Option<NodeId> {
        registry.lookup_id(*self)
    }
}
