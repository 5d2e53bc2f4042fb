//! Bevy integration for tag taxonomies.
//!
//! Provides:
//! - `TaxonomyPlugin`: builds the registry during app build and inserts it as a Resource
//! - `TagSet`: multi-tag component with classification queries
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use tag_taxonomy::bevy::*;
//! use tag_taxonomy::taxonomy;
//!
//! taxonomy! {
//!     pub mod tags {
//!         blockchain {
//!             db { leaf; }
//!             ux { #[is(blockchain.db.leaf)] KYC; }
//!         }
//!     }
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(TaxonomyPlugin::from_defs(tags::DEFINITIONS))
//!         .add_systems(Startup, spawn_entities)
//!         .run();
//! }
//!
//! fn spawn_entities(mut commands: Commands) {
//!     commands.spawn(TagSet::new().with(tags::blockchain::ux::KYC::ID));
//! }
//! ```

use bevy::prelude::*;
use std::collections::HashSet;
use tracing::error;

use crate::{
    error::SchemaError,
    hash::TagId,
    registry::Registry,
    schema::{TagDef, TagDefinition},
    tag::{Tag, TagRef},
};

// =============================================================================
// Plugin
// =============================================================================

enum Source {
    Static(&'static [TagDef]),
    Owned(Vec<TagDefinition>),
}

/// Bevy plugin that freezes a taxonomy into a [`Registry`] resource.
///
/// ```ignore
/// App::new().add_plugins(TaxonomyPlugin::from_defs(tags::DEFINITIONS))
/// ```
pub struct TaxonomyPlugin {
    source: Source,
}

impl TaxonomyPlugin {
    /// From the static table emitted by `taxonomy!`.
    pub fn from_defs(defs: &'static [TagDef]) -> Self {
        Self {
            source: Source::Static(defs),
        }
    }

    /// From definitions loaded at runtime (JSON, TOML, ...).
    pub fn from_definitions(definitions: Vec<TagDefinition>) -> Self {
        Self {
            source: Source::Owned(definitions),
        }
    }

    fn registry(&self) -> Result<Registry, SchemaError> {
        match &self.source {
            Source::Static(defs) => Registry::from_defs(defs),
            Source::Owned(definitions) => Registry::build(definitions.iter().cloned()),
        }
    }
}

impl Plugin for TaxonomyPlugin {
    fn build(&self, app: &mut App) {
        match self.registry() {
            Ok(registry) => {
                app.insert_resource(registry);
            }
            Err(err) => {
                error!(%err, "taxonomy plugin cannot start");
                panic!("invalid tag schema: {err}");
            }
        }
    }
}

impl Resource for Registry {}

// =============================================================================
// TagSet Component
// =============================================================================

/// A set of tags attached to one entity.
///
/// Stores fingerprints, so it needs no registry to build or to test exact
/// membership. Classification queries take the registry.
///
/// ```ignore
/// fn kyc_entities(registry: Res<Registry>, query: Query<&TagSet>) {
///     for set in &query {
///         if set.has_a(&registry, "blockchain.db.leaf") {
///             // some tag on this entity is a leaf
///         }
///     }
/// }
/// ```
#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: HashSet<TagId>,
}

impl TagSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn single(id: TagId) -> Self {
        let mut tags = HashSet::new();
        tags.insert(id);
        Self { tags }
    }

    /// Builder method: add a tag and return self.
    #[inline]
    pub fn with(mut self, id: TagId) -> Self {
        self.tags.insert(id);
        self
    }

    /// Returns `true` if the tag was newly inserted.
    #[inline]
    pub fn insert(&mut self, id: TagId) -> bool {
        self.tags.insert(id)
    }

    /// Returns `true` if the tag was present.
    #[inline]
    pub fn remove(&mut self, id: TagId) -> bool {
        self.tags.remove(&id)
    }

    /// Exact membership, O(1).
    #[inline]
    pub fn has(&self, id: TagId) -> bool {
        self.tags.contains(&id)
    }

    /// True if any tag in the set is-a `interface`.
    ///
    /// O(n) in the set size. Fingerprints unknown to `registry` never match.
    pub fn has_a(&self, registry: &Registry, interface: impl TagRef) -> bool {
        self.kinds_of(registry, interface).next().is_some()
    }

    /// Tags in the set that are-a `interface`.
    pub fn kinds_of<'a>(
        &'a self,
        registry: &'a Registry,
        interface: impl TagRef,
    ) -> impl Iterator<Item = TagId> + 'a {
        let target = interface
            .node_in(registry)
            .map(|node| Tag::new(registry, node));
        self.classified_as(registry, target)
    }

    fn classified_as<'a>(
        &'a self,
        registry: &'a Registry,
        target: Option<Tag<'a>>,
    ) -> impl Iterator<Item = TagId> + 'a {
        self.tags
            .iter()
            .filter_map(|&id| registry.tag_by_id(id))
            .filter(move |tag| target.is_some_and(|t| tag.is_a(t)))
            .map(Tag::id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.tags.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

impl FromIterator<TagId> for TagSet {
    fn from_iter<T: IntoIterator<Item = TagId>>(iter: T) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl Extend<TagId> for TagSet {
    fn extend<T: IntoIterator<Item = TagId>>(&mut self, iter: T) {
        self.tags.extend(iter);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::fingerprint;

    const DEFS: &[TagDef] = &[
        TagDef::new("blockchain"),
        TagDef::new("blockchain.db"),
        TagDef::new("blockchain.db.leaf"),
        TagDef::new("blockchain.db.type"),
        TagDef::new("blockchain.db.type.boolean").with_supertypes(&["blockchain.db.leaf"]),
        TagDef::new("blockchain.ux"),
        TagDef::new("blockchain.ux.KYC"),
    ];

    const BOOLEAN: TagId = fingerprint("blockchain.db.type.boolean");
    const KYC: TagId = fingerprint("blockchain.ux.KYC");

    #[test]
    fn tag_set_builder() {
        let set = TagSet::new().with(BOOLEAN).with(KYC).with(KYC);

        assert_eq!(set.len(), 2);
        assert!(set.has(BOOLEAN));
        assert!(set.has(KYC));
        assert!(!set.has(fingerprint("blockchain")));
    }

    #[test]
    fn tag_set_insert_remove() {
        let mut set = TagSet::new();

        assert!(set.insert(KYC));
        assert!(!set.insert(KYC)); // duplicate
        assert!(set.remove(KYC));
        assert!(!set.remove(KYC)); // already removed
        assert!(set.is_empty());
    }

    #[test]
    fn tag_set_from_iter_and_extend() {
        let mut set: TagSet = [BOOLEAN].into_iter().collect();
        set.extend([KYC]);
        assert_eq!(set.len(), 2);
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn classification_queries_use_the_registry() {
        let registry = Registry::from_defs(DEFS).unwrap();
        let set = TagSet::new().with(BOOLEAN).with(KYC).with(fingerprint("not.registered"));

        assert!(set.has_a(&registry, "blockchain.db.leaf"));
        assert!(set.has_a(&registry, "blockchain.ux.KYC"));
        assert!(!set.has_a(&registry, "blockchain.db.type"));
        assert!(!set.has_a(&registry, "no.such.tag"));

        let leaves: Vec<TagId> = set.kinds_of(&registry, "blockchain.db.leaf").collect();
        assert_eq!(leaves, [BOOLEAN]);
        assert_eq!(set.kinds_of(&registry, "no.such.tag").count(), 0);
    }

    #[test]
    fn plugin_inserts_registry_resource() {
        let mut app = App::new();
        app.add_plugins(TaxonomyPlugin::from_defs(DEFS));
        let registry = app.world().resource::<Registry>();
        assert_eq!(registry.len(), DEFS.len());
    }

    #[test]
    fn plugin_accepts_runtime_definitions() {
        let definitions = vec![
            TagDefinition::new("blockchain").unwrap(),
            TagDefinition::new("blockchain.app").unwrap(),
        ];
        let mut app = App::new();
        app.add_plugins(TaxonomyPlugin::from_definitions(definitions));
        assert!(app.world().resource::<Registry>().contains("blockchain.app"));
    }

    #[test]
    #[should_panic(expected = "invalid tag schema")]
    fn plugin_aborts_on_schema_error() {
        const ORPHAN: &[TagDef] = &[TagDef::new("blockchain.orphan")];
        let mut app = App::new();
        app.add_plugins(TaxonomyPlugin::from_defs(ORPHAN));
    }
}
