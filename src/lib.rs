//! # Hierarchical Tag Taxonomy (tag-taxonomy)
//!
//! A dotted-path namespace of tags (`blockchain.app.configuration`) where every
//! tag sits in a structural tree *and* may declare supertypes from anywhere in
//! the namespace. A schema is validated once into an immutable [`Registry`];
//! classification against the precomputed closure is then O(1).
//!
//! ## Design
//!
//! ```text
//!  TagDefinition ──▶ RegistryBuilder ──▶ Registry ──▶ Tag<'r>
//!   (path, supertypes,   validate,         frozen       path / parent / child
//!    leaf kind)          close over        arena        is_a / supertypes
//!                        supertypes                     leaf_kind
//! ```
//!
//! - Structure (`parent`/`child`) follows the path.
//! - Classification (`is_a`) follows declared supertypes, transitively and
//!   reflexively. The structural parent is *not* a supertype.
//! - Malformed or unknown input is a [`LookupError`], never a panic.
//!
//! ```
//! use tag_taxonomy::{Registry, TagDefinition};
//!
//! let registry = Registry::build([
//!     TagDefinition::new("blockchain").unwrap(),
//!     TagDefinition::new("blockchain.db").unwrap(),
//!     TagDefinition::new("blockchain.db.leaf").unwrap(),
//!     TagDefinition::new("blockchain.db.type").unwrap(),
//!     TagDefinition::new("blockchain.db.type.boolean")
//!         .unwrap()
//!         .with_supertype("blockchain.db.leaf")
//!         .unwrap(),
//! ])
//! .unwrap();
//!
//! let boolean = registry.resolve("blockchain.db.type.boolean").unwrap();
//! assert!(boolean.is_a("blockchain.db.leaf"));
//! assert!(!boolean.is_a("blockchain.db.type"));
//! assert!(registry.resolve("not.a.real.path").is_err());
//! ```
//!
//! ## Static schemas
//!
//! The [`taxonomy!`] macro turns a nested DSL into a `&'static [TagDef]`
//! table plus per-node `PATH`/`ID` constants:
//!
//! ```ignore
//! tag_taxonomy::taxonomy! {
//!     pub mod tags {
//!         blockchain {
//!             db { leaf; type { #[is(blockchain.db.leaf)] #[leaf = "boolean"] boolean; } }
//!         }
//!     }
//! }
//!
//! let registry = Registry::from_defs(tags::DEFINITIONS)?;
//! let boolean = tags::blockchain::db::r#type::boolean::resolve(&registry)?;
//! ```

extern crate self as tag_taxonomy;

pub mod cell;
pub mod error;
pub mod extract;
pub mod hash;
pub mod path;
pub mod registry;
pub mod schema;
pub mod tag;

#[cfg(feature = "bevy")]
pub mod bevy;

pub use cell::{RegistryCell, RegistryState};
pub use error::{LookupError, MalformedPathError, MalformedReason, SchemaError, UnknownLeafKind};
pub use extract::{Extractor, Extractors, Localize, PathAsLabel};
pub use hash::{fingerprint, fnv1a_64, TagId};
pub use path::{is_valid_segment, TagPath, SEPARATOR};
pub use registry::{NodeId, Registry, RegistryBuilder};
pub use schema::{ElementKind, LeafKind, TagDef, TagDefinition};
pub use tag::{Descendants, Tag, TagRef};

pub use tag_taxonomy_macro::taxonomy;
