// SPDX-License-Identifier: GPL-2.0-or-later

use common::{CategoryId, ObjectClass, Verb};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use thiserror::Error;

/// One (verb, object) interaction class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: CategoryId,
    pub verb: Verb,
    pub object: ObjectClass,
}

/// The fixed interaction category catalog and its cross-indices.
///
/// Built once per run and read-only afterwards. Category ids are dense and
/// 1-based so `entries[id.index()]` is the entry for `id`. The verb and
/// object buckets preserve catalog order, which downstream first-match
/// scanning depends on.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_verb: HashMap<Verb, Vec<CategoryId>>,
    by_object: HashMap<ObjectClass, Vec<CategoryId>>,
}

// Catalog file record e.g. {"id": "001", "verb": "board", "object": "airplane"}.
#[derive(Debug, Deserialize)]
struct RawCatalogEntry {
    id: String,
    verb: Verb,
    object: ObjectClass,
}

#[derive(Debug, Error)]
pub enum LoadCatalogError {
    #[error("read catalog file: {0}")]
    ReadFile(std::io::Error),

    #[error("deserialize catalog: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("bad category id '{0}': {1}")]
    ParseId(String, common::ParseCategoryIdError),

    #[error(transparent)]
    Catalog(#[from] CreateCatalogError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateCatalogError {
    #[error("empty catalog")]
    Empty,

    #[error("category id {id} at position {position}, ids must be dense and 1-based")]
    NonDenseId { position: usize, id: CategoryId },
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, LoadCatalogError> {
        use LoadCatalogError::*;
        let raw = std::fs::read_to_string(path).map_err(ReadFile)?;
        let raw_entries: Vec<RawCatalogEntry> = serde_json::from_str(&raw)?;

        let mut entries = Vec::with_capacity(raw_entries.len());
        for raw_entry in raw_entries {
            let id = raw_entry
                .id
                .parse()
                .map_err(|e| ParseId(raw_entry.id, e))?;
            entries.push(CatalogEntry {
                id,
                verb: raw_entry.verb,
                object: raw_entry.object,
            });
        }
        Ok(Self::from_entries(entries)?)
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CreateCatalogError> {
        use CreateCatalogError::*;
        if entries.is_empty() {
            return Err(Empty);
        }
        for (position, entry) in entries.iter().enumerate() {
            if entry.id.index() != position {
                return Err(NonDenseId {
                    position,
                    id: entry.id,
                });
            }
        }

        let mut by_verb: HashMap<Verb, Vec<CategoryId>> = HashMap::new();
        let mut by_object: HashMap<ObjectClass, Vec<CategoryId>> = HashMap::new();
        for entry in &entries {
            by_verb.entry(entry.verb.clone()).or_default().push(entry.id);
            by_object
                .entry(entry.object.clone())
                .or_default()
                .push(entry.id);
        }

        Ok(Self {
            entries,
            by_verb,
            by_object,
        })
    }

    #[must_use]
    pub fn get(&self, id: CategoryId) -> Option<&CatalogEntry> {
        self.entries.get(id.index())
    }

    /// Every category sharing this verb, in catalog order.
    #[must_use]
    pub fn categories_for_verb(&self, verb: &Verb) -> &[CategoryId] {
        self.by_verb.get(verb).map_or(&[], Vec::as_slice)
    }

    /// Every category sharing this object class, in catalog order.
    #[must_use]
    pub fn categories_for_object(&self, object: &ObjectClass) -> &[CategoryId] {
        self.by_object.get(object).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
