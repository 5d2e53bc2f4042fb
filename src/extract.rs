//! Named extractors: cross-cutting accessors applied uniformly to any [`Tag`].
//!
//! New accessors are registered by name instead of being added to `Tag`
//! itself. The standard table carries `"id"` and `"localizedType"`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::LookupError;
use crate::tag::Tag;

/// Extractor name for the canonical path.
pub const ID: &str = "id";

/// Extractor name for the localized type label.
pub const LOCALIZED_TYPE: &str = "localizedType";

/// Localization collaborator: canonical path → display string.
///
/// Implemented for any `Fn(&str) -> String + Send + Sync`.
pub trait Localize: Send + Sync {
    fn localize(&self, path: &str) -> String;
}

impl<F> Localize for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn localize(&self, path: &str) -> String {
        self(path)
    }
}

/// Uses the path itself as the label, like a string table with no entry for
/// the key.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathAsLabel;

impl Localize for PathAsLabel {
    fn localize(&self, path: &str) -> String {
        path.to_owned()
    }
}

/// A registered extractor.
pub type Extractor<T> = Arc<dyn Fn(Tag<'_>) -> T + Send + Sync>;

/// Name → extractor table.
pub struct Extractors<T = String> {
    table: HashMap<String, Extractor<T>>,
}

impl<T> Default for Extractors<T> {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
        }
    }
}

impl<T> Clone for Extractors<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl Extractors<String> {
    /// Table with the `"id"` and `"localizedType"` extractors.
    pub fn standard(localizer: impl Localize + 'static) -> Self {
        Self::new()
            .with(ID, |tag| tag.path().to_owned())
            .with(LOCALIZED_TYPE, move |tag| localizer.localize(tag.path()))
    }
}

impl<T> Extractors<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extractor` under `name`.
    ///
    /// Returns `true` if an existing extractor was replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, extractor: F) -> bool
    where
        F: Fn(Tag<'_>) -> T + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(extractor)).is_some()
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(Tag<'_>) -> T + Send + Sync + 'static,
    {
        self.register(name, extractor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Extractor<T>> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Run the extractor registered under `name` on `tag`.
    pub fn apply(&self, name: &str, tag: Tag<'_>) -> Result<T, LookupError> {
        let extractor = self
            .table
            .get(name)
            .ok_or_else(|| LookupError::UnknownExtractor {
                name: name.to_owned(),
            })?;
        Ok(extractor(tag))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<T> fmt::Debug for Extractors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractors")
            .field("names", &self.names())
            .finish()
    }
}
