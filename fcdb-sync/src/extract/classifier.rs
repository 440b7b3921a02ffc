//! Entity classifier
//!
//! The metadata document has no type tags, so a node's family is inferred
//! from its shape. Rules are tried in order and the first match wins. A node
//! that matches no rule is not an entity: leaving a real entity out is
//! preferred over writing it into the wrong table.

use serde_json::Value;

use crate::types::{ClassifiedEntity, EntityId, Family};

/// Minimum length of a program id
const PROGRAM_ID_MIN_LEN: usize = 4;

/// One classification rule
struct Rule {
    family: Family,
    matches: fn(&Value, &Value) -> bool,
}

/// Rules in priority order
const RULES: &[Rule] = &[
    Rule {
        family: Family::Club,
        matches: is_club,
    },
    Rule {
        family: Family::League,
        matches: is_league,
    },
    Rule {
        family: Family::Nation,
        matches: is_nation,
    },
    Rule {
        family: Family::Program,
        matches: is_program,
    },
];

fn is_club(id: &Value, name: &Value) -> bool {
    id.is_i64() && has_prefix(name, "TeamName_")
}

fn is_league(id: &Value, name: &Value) -> bool {
    id.is_i64() && has_prefix(name, "LeagueName_")
}

fn is_nation(id: &Value, name: &Value) -> bool {
    id.is_i64() && has_prefix(name, "NationName_")
}

fn is_program(id: &Value, _name: &Value) -> bool {
    is_program_id(id)
}

/// Classify a single JSON node
///
/// Returns `None` for arrays, scalars, objects without both `id` and `name`,
/// and objects that match no rule. Program nodes additionally need an
/// `image` or a numeric `sort`.
pub fn classify(node: &Value) -> Option<ClassifiedEntity> {
    let object = node.as_object()?;
    let id = object.get("id")?;
    let name = object.get("name")?;

    let family = RULES
        .iter()
        .find(|rule| (rule.matches)(id, name))
        .map(|rule| rule.family)?;

    if family == Family::Program && !has_program_marker(node) {
        return None;
    }

    let entity_id = EntityId::from_json(id, family.id_kind())?;
    ClassifiedEntity::from_node(family, entity_id, node)
}

fn has_prefix(name: &Value, prefix: &str) -> bool {
    name.as_str().is_some_and(|s| s.starts_with(prefix))
}

/// Uppercase string id longer than three characters (`TOTW`, `SBC2024`)
///
/// At least one letter is required so numeric strings never qualify.
fn is_program_id(id: &Value) -> bool {
    let Some(id) = id.as_str() else {
        return false;
    };

    id.chars().count() >= PROGRAM_ID_MIN_LEN
        && id.chars().any(char::is_uppercase)
        && !id.chars().any(char::is_lowercase)
}

/// `image` present (non-null) or `sort` numeric
fn has_program_marker(node: &Value) -> bool {
    let image = node.get("image").is_some_and(|v| !v.is_null());
    let sort = node.get("sort").is_some_and(Value::is_number);
    image || sort
}
