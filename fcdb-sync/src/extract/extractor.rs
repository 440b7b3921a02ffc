//! Recursive extractor
//!
//! Walks the whole metadata document depth-first. Every object is offered to
//! the classifier and then descended into whether or not it was classified,
//! since an entity node may itself contain other entities (a league carrying
//! its clubs, a club carrying its nation).

use serde_json::Value;

use super::{classify, Extraction};

/// Discover every classifiable entity in `root`
///
/// Sibling order is not significant except that, for duplicate ids, the node
/// visited last wins.
pub fn extract(root: &Value) -> Extraction {
    let mut extraction = Extraction::new();
    extract_into(root, &mut extraction);

    tracing::debug!(
        entities = extraction.total(),
        replaced = extraction.replaced(),
        "Metadata document traversed"
    );

    extraction
}

/// Walk `node` and add its entities to an existing extraction
pub fn extract_into(node: &Value, extraction: &mut Extraction) {
    match node {
        Value::Array(items) => {
            for item in items {
                extract_into(item, extraction);
            }
        }
        Value::Object(object) => {
            if let Some(entity) = classify(node) {
                extraction.insert(entity);
            }
            for value in object.values() {
                extract_into(value, extraction);
            }
        }
        _ => {}
    }
}
