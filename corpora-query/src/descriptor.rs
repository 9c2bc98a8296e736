//! Query descriptors and canonical cache keys.
//!
//! A [`QueryDescriptor`] says *what* a query reads, independent of how the
//! bytes are fetched. A [`QueryKey`] is the canonical lookup value derived
//! from a descriptor plus any positional parameters (e.g. a collection id).
//! Two keys are equal iff their descriptors and positional parameters are
//! structurally equal.
//!
//! Tag order participates in equality: composite key member order reflects
//! registration order in the tag registry, so `[Collection, Dataset]` and
//! `[Dataset, Collection]` are distinct keys.

use corpora_core::EntityTag;
use std::collections::BTreeMap;

/// Identity of a logical query. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryDescriptor {
    tags: Vec<EntityTag>,
    id: String,
    params: Option<BTreeMap<String, String>>,
}

impl QueryDescriptor {
    /// Create a descriptor for the given operation id and entity tags.
    pub fn new(id: impl Into<String>, tags: impl Into<Vec<EntityTag>>) -> Self {
        Self {
            tags: tags.into(),
            id: id.into(),
            params: None,
        }
    }

    /// Attach named parameters to the descriptor.
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params = Some(
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tags(&self) -> &[EntityTag] {
        &self.tags
    }

    pub fn params(&self) -> Option<&BTreeMap<String, String>> {
        self.params.as_ref()
    }

    /// Whether this descriptor depends on any of the given tags.
    pub fn intersects(&self, tags: &[EntityTag]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }

    /// Derive the cache key for this descriptor with no positional params.
    pub fn key(&self) -> QueryKey {
        self.key_with(&[])
    }

    /// Derive the cache key for this descriptor plus positional params.
    ///
    /// Deterministic: equal inputs always yield equal keys.
    pub fn key_with(&self, positional: &[&str]) -> QueryKey {
        QueryKey {
            descriptor: self.clone(),
            positional: positional.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Canonical, comparable identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    descriptor: QueryDescriptor,
    positional: Vec<String>,
}

impl QueryKey {
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor.id)?;
        for p in &self.positional {
            write!(f, "/{}", p)?;
        }
        Ok(())
    }
}
