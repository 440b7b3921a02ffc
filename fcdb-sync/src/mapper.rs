//! Schema mapper
//!
//! Turns a classified entity plus resolved display text into the row shape of
//! its family table.

use chrono::{DateTime, Utc};

use crate::localization::ResolvedNames;
use crate::types::{
    first_integer, first_string, ClassifiedEntity, ColumnType, ColumnValue, Family,
    PersistedRecord,
};

/// Map one entity to its persisted record
///
/// Missing translations fall back to the raw key. `synced_at` is written as
/// `updated_at` whether or not anything else changed.
pub fn map_to_record(
    entity: &ClassifiedEntity,
    names: &ResolvedNames,
    synced_at: DateTime<Utc>,
) -> PersistedRecord {
    PersistedRecord {
        family: entity.family,
        id: entity.id.clone(),
        display_name: names.display(&entity.name_key),
        display_description: entity
            .description_key
            .as_deref()
            .map(|key| names.display(key)),
        localization_key_name: entity.name_key.clone(),
        localization_key_description: entity.description_key.clone(),
        image: entity.image.clone(),
        extra: extra_columns(entity),
        raw_data: entity.raw.clone(),
        updated_at: synced_at,
    }
}

/// Map every entity, keeping their order
pub fn map_all<'a>(
    entities: impl IntoIterator<Item = &'a ClassifiedEntity>,
    names: &ResolvedNames,
    synced_at: DateTime<Utc>,
) -> Vec<PersistedRecord> {
    entities
        .into_iter()
        .map(|entity| map_to_record(entity, names, synced_at))
        .collect()
}

/// Variant-specific columns in `Family::extra_columns` order
fn extra_columns(entity: &ClassifiedEntity) -> Vec<(String, ColumnValue)> {
    entity
        .family
        .extra_columns()
        .iter()
        .map(|(column, column_type)| {
            let fields = source_fields(entity.family, column);
            let value = match column_type {
                ColumnType::Integer => ColumnValue::Integer(first_integer(&entity.raw, fields)),
                ColumnType::Text => ColumnValue::Text(first_string(&entity.raw, fields)),
            };
            (column.to_string(), value)
        })
        .collect()
}

/// Node fields a variant column is read from, in preference order
fn source_fields(family: Family, column: &str) -> &'static [&'static str] {
    match (family, column) {
        (Family::Club, "league_id") => &["league", "leagueId"],
        (Family::League, "nation_id") => &["nation", "nationId"],
        (Family::Program, "sort_order") => &["sort"],
        (Family::SkillMove, "stars") => &["stars"],
        (Family::Celebration, "video") => &["video"],
        _ => &[],
    }
}
