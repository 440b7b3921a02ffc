//! Flat entity listings
//!
//! Trait, skill-move and celebration endpoints return one entity per item,
//! so no shape heuristics apply: any object with a usable `id` and a string
//! `name` is an entity of the requested family.

use serde_json::Value;
use tracing::debug;

use super::Extraction;
use crate::types::{ClassifiedEntity, EntityId, Family};

/// Add the items of one listing page to `extraction`
///
/// Accepts an array of items or an object keyed by id whose values are the
/// items. Returns how many items were accepted.
pub fn extract_listing(page: &Value, family: Family, extraction: &mut Extraction) -> usize {
    let items: Box<dyn Iterator<Item = &Value>> = match page {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(object) => Box::new(object.values()),
        _ => Box::new(std::iter::empty()),
    };

    let mut accepted = 0;
    let mut skipped = 0;

    for item in items {
        match listing_entity(item, family) {
            Some(entity) => {
                extraction.insert(entity);
                accepted += 1;
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(family = %family, skipped, "Listing items without id/name skipped");
    }

    accepted
}

fn listing_entity(item: &Value, family: Family) -> Option<ClassifiedEntity> {
    let id = EntityId::from_json(item.as_object()?.get("id")?, family.id_kind())?;
    ClassifiedEntity::from_node(family, id, item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_listing() {
        let mut extraction = Extraction::new();
        let page = json!([
            { "id": 1, "name": "TraitName_1", "description": "TraitDesc_1" },
            { "id": "flair", "name": "TraitName_Flair" },
            { "id": 3 },
            "garbage"
        ]);

        let accepted = extract_listing(&page, Family::Trait, &mut extraction);

        assert_eq!(accepted, 2);
        assert_eq!(extraction.count(Family::Trait), 2);
        assert!(extraction
            .get(Family::Trait, &EntityId::Str("flair".to_string()))
            .is_some());
    }

    #[test]
    fn test_numeric_and_string_ids_are_one_entity() {
        let mut extraction = Extraction::new();
        let page = json!([
            { "id": "1", "name": "TraitName_Earlier" },
            { "id": 1, "name": "TraitName_Later" }
        ]);

        assert_eq!(extract_listing(&page, Family::Trait, &mut extraction), 2);

        assert_eq!(extraction.count(Family::Trait), 1);
        assert_eq!(extraction.replaced(), 1);
        assert_eq!(
            extraction
                .get(Family::Trait, &EntityId::Str("1".to_string()))
                .unwrap()
                .name_key,
            "TraitName_Later"
        );
    }

    #[test]
    fn test_keyed_object_listing() {
        let mut extraction = Extraction::new();
        let page = json!({
            "10": { "id": 10, "name": "SkillMoveName_10", "stars": 5 },
            "11": { "id": 11, "name": "SkillMoveName_11", "stars": 1 }
        });

        assert_eq!(extract_listing(&page, Family::SkillMove, &mut extraction), 2);
        assert_eq!(extraction.count(Family::SkillMove), 2);
    }

    #[test]
    fn test_listing_does_not_apply_classifier_prefixes() {
        let mut extraction = Extraction::new();
        let page = json!([{ "id": 4, "name": "CelebrationName_Dab" }]);

        extract_listing(&page, Family::Celebration, &mut extraction);
        assert_eq!(extraction.count(Family::Celebration), 1);
        assert_eq!(extraction.count(Family::Club), 0);
    }

    #[test]
    fn test_scalar_page_yields_nothing() {
        let mut extraction = Extraction::new();
        assert_eq!(extract_listing(&json!(42), Family::Trait, &mut extraction), 0);
        assert!(extraction.is_empty());
    }
}
