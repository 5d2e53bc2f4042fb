//! Taxonomy registry: validates a schema once, then answers lookups.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::{debug, error, info, trace};

use crate::error::{LookupError, SchemaError};
use crate::hash::{fingerprint, TagId};
use crate::path::{self, TagPath};
use crate::schema::{LeafKind, TagDef, TagDefinition};
use crate::tag::{Tag, TagRef};

/// Index of a node in a registry's arena.
///
/// Only meaningful for the registry that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Resolved node: structure and classification, fixed at build time.
#[derive(Debug)]
pub(crate) struct TagNode {
    pub(crate) path: TagPath,
    pub(crate) id: TagId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) direct_supertypes: Vec<NodeId>,
    /// Reflexive, transitively closed.
    pub(crate) all_supertypes: HashSet<NodeId>,
    pub(crate) children: BTreeMap<String, NodeId>,
    pub(crate) is_leaf: bool,
    pub(crate) leaf_kind: Option<LeafKind>,
}

/// Frozen taxonomy.
///
/// Provides:
/// - Path → [`Tag`] resolution for untrusted input
/// - O(1) classification via precomputed supertype closures
/// - Structural navigation (parent, children, DFS descendants)
/// - Reverse classification ([`Registry::implementors`])
///
/// There is no way to add definitions after [`RegistryBuilder::build`]; share
/// the registry by reference (it is `Send + Sync`).
pub struct Registry {
    nodes: Vec<TagNode>,
    path_to_idx: HashMap<String, NodeId>,
    id_to_idx: HashMap<TagId, NodeId>,
    roots: Vec<NodeId>,
}

impl Registry {
    /// Build from owned definitions. See [`RegistryBuilder`].
    pub fn build<I>(definitions: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = TagDefinition>,
    {
        let mut builder = RegistryBuilder::new();
        builder.extend(definitions);
        builder.build()
    }

    /// Build from a static table, e.g. `DEFINITIONS` generated by `taxonomy!`.
    pub fn from_defs(defs: &[TagDef]) -> Result<Self, SchemaError> {
        let definitions = defs
            .iter()
            .map(TagDefinition::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(definitions)
    }

    /// Parse `raw` and look it up.
    ///
    /// This is the entry point for untrusted strings such as remote-config
    /// keys. It never panics.
    pub fn resolve(&self, raw: &str) -> Result<Tag<'_>, LookupError> {
        if let Err(err) = path::validate(raw) {
            trace!(%err, "rejected malformed tag path");
            return Err(err.into());
        }
        match self.lookup(raw) {
            Some(node) => Ok(Tag::new(self, node)),
            None => {
                trace!(path = raw, "unknown tag path");
                Err(LookupError::UnknownPath {
                    path: raw.to_owned(),
                })
            }
        }
    }

    /// Look up an already validated path.
    #[inline]
    pub fn get(&self, path: &TagPath) -> Option<Tag<'_>> {
        self.lookup(path.as_str()).map(|node| Tag::new(self, node))
    }

    /// Fingerprint → Tag.
    #[inline]
    pub fn tag_by_id(&self, id: TagId) -> Option<Tag<'_>> {
        self.id_to_idx.get(&id).map(|&node| Tag::new(self, node))
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.path_to_idx.contains_key(path)
    }

    /// Total number of registered tags.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Single-segment tags, in definition order.
    pub fn roots(&self) -> impl ExactSizeIterator<Item = Tag<'_>> + '_ {
        self.roots.iter().map(move |&node| Tag::new(self, node))
    }

    /// All tags, in definition order.
    pub fn tags(&self) -> impl ExactSizeIterator<Item = Tag<'_>> + '_ {
        (0..self.nodes.len()).map(move |i| Tag::new(self, NodeId(i)))
    }

    /// Every tag that is-a `interface` (including the interface itself).
    ///
    /// Not O(1): scans all nodes. Use [`Tag::is_a`] for single checks.
    /// Returns an empty list when `interface` is not registered.
    pub fn implementors(&self, interface: impl TagRef) -> Vec<Tag<'_>> {
        let Some(target) = interface.node_in(self) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.all_supertypes.contains(&target))
            .map(|(i, _)| Tag::new(self, NodeId(i)))
            .collect()
    }

    #[inline]
    pub(crate) fn lookup(&self, path: &str) -> Option<NodeId> {
        self.path_to_idx.get(path).copied()
    }

    #[inline]
    pub(crate) fn lookup_id(&self, id: TagId) -> Option<NodeId> {
        self.id_to_idx.get(&id).copied()
    }

    #[inline]
    pub(crate) fn node(&self, node: NodeId) -> &TagNode {
        &self.nodes[node.0]
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.nodes.len())
            .field(
                "roots",
                &self
                    .roots
                    .iter()
                    .map(|&r| self.node(r).path.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Collects definitions and freezes them into a [`Registry`].
///
/// Build steps:
/// 1. Intern every path
/// 2. Check each definition in input order: duplicate path, fingerprint
///    collision, structural parent, declared supertypes
/// 3. Attach each node under its structural parent
/// 4. Compute reflexive-transitive supertype closures, rejecting cycles
///
/// Definition order does not change the result. A per-definition error names
/// the first offending definition in input order; cycles are only checked
/// once every definition has passed.
#[derive(Clone, Debug, Default)]
pub struct RegistryBuilder {
    definitions: Vec<TagDefinition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, definition: TagDefinition) -> &mut Self {
        self.definitions.push(definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate and freeze. Consumes the builder: a schema is built once.
    pub fn build(self) -> Result<Registry, SchemaError> {
        debug!(definitions = self.definitions.len(), "building tag registry");
        match link(&self.definitions, fingerprint) {
            Ok(registry) => {
                info!(
                    tags = registry.len(),
                    roots = registry.roots.len(),
                    "tag registry frozen"
                );
                Ok(registry)
            }
            Err(err) => {
                error!(%err, "tag schema rejected");
                Err(err)
            }
        }
    }
}

impl Extend<TagDefinition> for RegistryBuilder {
    fn extend<T: IntoIterator<Item = TagDefinition>>(&mut self, iter: T) {
        self.definitions.extend(iter);
    }
}

impl FromIterator<TagDefinition> for RegistryBuilder {
    fn from_iter<T: IntoIterator<Item = TagDefinition>>(iter: T) -> Self {
        Self {
            definitions: iter.into_iter().collect(),
        }
    }
}

fn link(definitions: &[TagDefinition], hash: fn(&str) -> TagId) -> Result<Registry, SchemaError> {
    // 1. Intern first occurrences (node index == definition index)
    let mut path_to_idx: HashMap<String, NodeId> = HashMap::with_capacity(definitions.len());
    for (idx, def) in definitions.iter().enumerate() {
        path_to_idx
            .entry(def.path.to_string())
            .or_insert(NodeId(idx));
    }

    // 2. Check each definition fully, in input order
    let mut nodes: Vec<TagNode> = Vec::with_capacity(definitions.len());
    let mut id_to_idx: HashMap<TagId, NodeId> = HashMap::with_capacity(definitions.len());
    let mut roots = Vec::new();

    for (idx, def) in definitions.iter().enumerate() {
        let node = NodeId(idx);
        let key = def.path.as_str();
        if path_to_idx.get(key) != Some(&node) {
            return Err(SchemaError::DuplicateDefinition {
                path: key.to_owned(),
            });
        }

        let id = hash(key);
        if let Some(&existing) = id_to_idx.get(&id) {
            return Err(SchemaError::FingerprintCollision {
                first: definitions[existing.0].path.to_string(),
                second: key.to_owned(),
                id,
            });
        }
        id_to_idx.insert(id, node);

        let parent = match def.path.parent_str() {
            None => {
                roots.push(node);
                None
            }
            Some(parent) => {
                let parent_node =
                    *path_to_idx
                        .get(parent)
                        .ok_or_else(|| SchemaError::MissingParent {
                            path: key.to_owned(),
                            parent: parent.to_owned(),
                        })?;
                if definitions[parent_node.0].is_terminal() {
                    return Err(SchemaError::LeafWithChildren {
                        path: parent.to_owned(),
                        child: def.path.last().to_owned(),
                    });
                }
                Some(parent_node)
            }
        };

        let mut direct = Vec::with_capacity(def.supertypes.len());
        for supertype in &def.supertypes {
            let target = *path_to_idx.get(supertype.as_str()).ok_or_else(|| {
                SchemaError::UnknownSupertype {
                    path: key.to_owned(),
                    supertype: supertype.to_string(),
                }
            })?;
            if !direct.contains(&target) {
                direct.push(target);
            }
        }

        nodes.push(TagNode {
            path: def.path.clone(),
            id,
            parent,
            direct_supertypes: direct,
            all_supertypes: HashSet::new(),
            children: BTreeMap::new(),
            is_leaf: def.is_terminal(),
            leaf_kind: def.leaf_kind,
        });
    }

    // 3. Structural tree
    for idx in 0..nodes.len() {
        if let Some(parent) = nodes[idx].parent {
            let name = nodes[idx].path.last().to_owned();
            nodes[parent.0].children.insert(name, NodeId(idx));
        }
    }

    // 4. Closure
    let closures = ClosureBuilder::new(&nodes).run()?;
    for (node, closure) in nodes.iter_mut().zip(closures) {
        node.all_supertypes = closure;
    }

    Ok(Registry {
        nodes,
        path_to_idx,
        id_to_idx,
        roots,
    })
}

// =============================================================================
// Closure: memoised DFS over the direct-supertype graph
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

struct ClosureBuilder<'a> {
    nodes: &'a [TagNode],
    marks: Vec<Mark>,
    closures: Vec<HashSet<NodeId>>,
    /// Open nodes with the index of the next supertype edge to follow.
    stack: Vec<(NodeId, usize)>,
}

impl<'a> ClosureBuilder<'a> {
    fn new(nodes: &'a [TagNode]) -> Self {
        Self {
            nodes,
            marks: vec![Mark::Unvisited; nodes.len()],
            closures: vec![HashSet::new(); nodes.len()],
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<HashSet<NodeId>>, SchemaError> {
        for idx in 0..self.nodes.len() {
            self.visit(NodeId(idx))?;
        }
        Ok(self.closures)
    }

    /// Post-order walk from `root` over `self.stack`, never the call stack.
    fn visit(&mut self, root: NodeId) -> Result<(), SchemaError> {
        if self.marks[root.0] != Mark::Unvisited {
            return Ok(());
        }
        self.open(root);

        let nodes = self.nodes;
        while let Some(frame) = self.stack.last_mut() {
            let (node, edge) = *frame;
            let Some(&supertype) = nodes[node.0].direct_supertypes.get(edge) else {
                self.stack.pop();
                self.close(node);
                continue;
            };
            frame.1 += 1;

            match self.marks[supertype.0] {
                Mark::Done => {}
                Mark::OnStack => return Err(self.cycle_error(supertype)),
                Mark::Unvisited => self.open(supertype),
            }
        }
        Ok(())
    }

    fn open(&mut self, node: NodeId) {
        self.marks[node.0] = Mark::OnStack;
        self.stack.push((node, 0));
    }

    /// Every supertype of `node` is done: union their closures.
    fn close(&mut self, node: NodeId) {
        let mut closure = HashSet::new();
        closure.insert(node);
        for &supertype in &self.nodes[node.0].direct_supertypes {
            closure.extend(self.closures[supertype.0].iter().copied());
        }
        self.marks[node.0] = Mark::Done;
        self.closures[node.0] = closure;
    }

    /// `node` is already on the stack: the cycle is the stack suffix from it.
    fn cycle_error(&self, node: NodeId) -> SchemaError {
        let start = self
            .stack
            .iter()
            .position(|&(n, _)| n == node)
            .unwrap_or_default();
        let cycle = self.stack[start..]
            .iter()
            .map(|&(n, _)| n)
            .chain(std::iter::once(node))
            .map(|n| self.nodes[n.0].path.to_string())
            .collect();
        SchemaError::CyclicSupertype { cycle }
    }
}

// =============================================================================
// Tests
// =============================================================================
