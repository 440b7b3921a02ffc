//! Entity discovery in provider documents
//!
//! - `classifier`: decides whether a single JSON node is a Club, League,
//!   Nation or Program
//! - `extractor`: depth-first walk of the nested metadata document
//! - `listing`: flat entity lists (traits, skill moves, celebrations)

pub mod classifier;
pub mod extractor;
pub mod listing;

pub use classifier::classify;
pub use extractor::extract;
pub use listing::extract_listing;

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::types::{ClassifiedEntity, EntityId, Family};

/// Entities discovered in one run, per family and id
///
/// A later entity with the same (family, id) replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    entities: BTreeMap<Family, BTreeMap<EntityId, ClassifiedEntity>>,
    replaced: usize,
    conflicting: usize,
}

impl Extraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, replacing any earlier one with the same id
    ///
    /// Returns `true` when an earlier entity was replaced.
    pub fn insert(&mut self, entity: ClassifiedEntity) -> bool {
        let family = entity.family;
        let previous = self
            .entities
            .entry(family)
            .or_default()
            .insert(entity.id.clone(), entity);

        let Some(previous) = previous else {
            return false;
        };

        self.replaced += 1;

        // Identical repeats are common in the metadata document; differing
        // ones mean the provider disagrees with itself.
        let current = &self.entities[&family][&previous.id];
        if current.raw != previous.raw {
            let kept_name = current.name_key.clone();
            self.conflicting += 1;
            warn!(
                family = %family,
                id = %previous.id,
                replaced_name = %previous.name_key,
                kept_name = %kept_name,
                "Conflicting duplicate entity id, keeping the later occurrence"
            );
        } else {
            debug!(family = %family, id = %previous.id, "Duplicate entity id");
        }

        true
    }

    /// Entities of one family, ordered by id
    pub fn family(&self, family: Family) -> impl Iterator<Item = &ClassifiedEntity> {
        self.entities
            .get(&family)
            .into_iter()
            .flat_map(|by_id| by_id.values())
    }

    pub fn get(&self, family: Family, id: &EntityId) -> Option<&ClassifiedEntity> {
        self.entities.get(&family).and_then(|by_id| by_id.get(id))
    }

    pub fn count(&self, family: Family) -> usize {
        self.entities.get(&family).map_or(0, BTreeMap::len)
    }

    pub fn total(&self) -> usize {
        self.entities.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Number of inserts that replaced an earlier entity
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    /// Replacements where the two nodes differed
    pub fn conflicting(&self) -> usize {
        self.conflicting
    }

    /// Drop every family not in `keep`
    pub fn retain_families(&mut self, keep: &[Family]) {
        self.entities.retain(|family, _| keep.contains(family));
    }

    /// Every name and description key of the given families
    pub fn localization_keys(&self, families: &[Family]) -> BTreeSet<String> {
        families
            .iter()
            .flat_map(|family| self.family(*family))
            .flat_map(|entity| {
                std::iter::once(entity.name_key.clone()).chain(entity.description_key.clone())
            })
            .collect()
    }
}
