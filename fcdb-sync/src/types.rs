//! Core types shared by the pipeline stages
//!
//! Entity families, entity ids, classified entities, persisted records and
//! the run state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Families
// ============================================================================

/// Entity family (one target table per family)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    Club,
    League,
    Nation,
    Program,
    Trait,
    SkillMove,
    Celebration,
}

/// Where a family's entities come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilySource {
    /// Discovered by classifying nodes of the nested metadata document
    Universal,
    /// Flat (optionally paginated) list where every item is an entity
    Listing,
}

/// Accepted shape of a family's `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Numeric,
    Text,
    Either,
}

/// SQLite type of a variant-specific column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

impl Family {
    pub const ALL: [Family; 7] = [
        Family::Club,
        Family::League,
        Family::Nation,
        Family::Program,
        Family::Trait,
        Family::SkillMove,
        Family::Celebration,
    ];

    /// Families found in the universal metadata document, in upsert order
    pub const UNIVERSAL: [Family; 4] = [
        Family::Club,
        Family::League,
        Family::Nation,
        Family::Program,
    ];

    /// URL / config slug
    pub fn slug(self) -> &'static str {
        match self {
            Family::Club => "clubs",
            Family::League => "leagues",
            Family::Nation => "nations",
            Family::Program => "programs",
            Family::Trait => "traits",
            Family::SkillMove => "skill-moves",
            Family::Celebration => "celebrations",
        }
    }

    /// Prefix for camelCase report fields (`clubsProcessed`, `skillMovesUpserted`)
    pub fn report_prefix(self) -> &'static str {
        match self {
            Family::SkillMove => "skillMoves",
            other => other.slug(),
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Family::SkillMove => "skill_moves",
            other => other.slug(),
        }
    }

    pub fn source(self) -> FamilySource {
        match self {
            Family::Club | Family::League | Family::Nation | Family::Program => {
                FamilySource::Universal
            }
            Family::Trait | Family::SkillMove | Family::Celebration => FamilySource::Listing,
        }
    }

    pub fn id_kind(self) -> IdKind {
        match self {
            Family::Club | Family::League | Family::Nation => IdKind::Numeric,
            Family::Program => IdKind::Text,
            Family::Trait | Family::SkillMove | Family::Celebration => IdKind::Either,
        }
    }

    /// Provider path used when the config does not name one
    pub fn default_endpoint(self) -> &'static str {
        match self.source() {
            FamilySource::Universal => crate::config::DEFAULT_METADATA_ENDPOINT,
            FamilySource::Listing => match self {
                Family::SkillMove => "skillmoves",
                other => other.slug(),
            },
        }
    }

    /// Variant-specific columns after the common ones
    pub fn extra_columns(self) -> &'static [(&'static str, ColumnType)] {
        match self {
            Family::Club => &[("league_id", ColumnType::Integer)],
            Family::League => &[("nation_id", ColumnType::Integer)],
            Family::Nation | Family::Trait => &[],
            Family::Program => &[("sort_order", ColumnType::Integer)],
            Family::SkillMove => &[("stars", ColumnType::Integer)],
            Family::Celebration => &[("video", ColumnType::Text)],
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.slug() == s)
            .ok_or_else(|| format!("Unknown entity family: {}", s))
    }
}

/// What a single run synchronizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    /// One family
    Family(Family),
    /// Every universal family from one fetch of the metadata document
    Metadata,
}

impl SyncTarget {
    pub fn families(self) -> Vec<Family> {
        match self {
            SyncTarget::Family(family) => vec![family],
            SyncTarget::Metadata => Family::UNIVERSAL.to_vec(),
        }
    }

    pub fn source(self) -> FamilySource {
        match self {
            SyncTarget::Family(family) => family.source(),
            SyncTarget::Metadata => FamilySource::Universal,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            SyncTarget::Family(family) => family.slug(),
            SyncTarget::Metadata => "metadata",
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for SyncTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "metadata" {
            return Ok(SyncTarget::Metadata);
        }
        s.parse::<Family>().map(SyncTarget::Family)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Entity id as delivered by the provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl EntityId {
    /// Integer ids only; floats and out-of-range numbers are rejected
    pub fn numeric(value: &Value) -> Option<EntityId> {
        value.as_i64().map(EntityId::Int)
    }

    pub fn text(value: &Value) -> Option<EntityId> {
        value.as_str().map(|s| EntityId::Str(s.to_string()))
    }

    /// Read an id of the requested kind
    ///
    /// `Either` ids live in a TEXT column, so `1` and `"1"` both become
    /// `Str("1")` and count as the same entity.
    pub fn from_json(value: &Value, kind: IdKind) -> Option<EntityId> {
        match kind {
            IdKind::Numeric => Self::numeric(value),
            IdKind::Text => Self::text(value),
            IdKind::Either => Self::numeric(value)
                .map(|id| EntityId::Str(id.to_string()))
                .or_else(|| Self::text(value)),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Str(id) => f.write_str(id),
        }
    }
}

/// A raw JSON node recognized as an entity of one family
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntity {
    pub family: Family,
    pub id: EntityId,
    /// Opaque localization key from the node's `name`
    pub name_key: String,
    /// Opaque localization key from `description`/`desc`, if any
    pub description_key: Option<String>,
    pub image: Option<String>,
    /// The node exactly as received
    pub raw: Value,
}

impl ClassifiedEntity {
    /// Build an entity from an object node that already passed a family check
    ///
    /// Returns `None` when `name` is not a string.
    pub fn from_node(family: Family, id: EntityId, node: &Value) -> Option<Self> {
        let name_key = node.get("name")?.as_str()?.to_string();

        Some(Self {
            family,
            id,
            name_key,
            description_key: first_string(node, &["description", "desc"]),
            image: first_string(node, &["image", "imageUrl", "img"]),
            raw: node.clone(),
        })
    }
}

/// First non-empty string among `fields`
pub(crate) fn first_string(node: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| node.get(*field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First integer among `fields`
pub(crate) fn first_integer(node: &Value, fields: &[&str]) -> Option<i64> {
    fields
        .iter()
        .find_map(|field| node.get(*field).and_then(Value::as_i64))
}

// ============================================================================
// Persisted records
// ============================================================================

/// Value of a variant-specific column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Integer(Option<i64>),
    Text(Option<String>),
}

/// Row written to a family table
///
/// Upserting the same record twice only changes `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub family: Family,
    pub id: EntityId,
    pub display_name: String,
    pub display_description: Option<String>,
    pub localization_key_name: String,
    pub localization_key_description: Option<String>,
    pub image: Option<String>,
    /// Variant-specific columns, in `Family::extra_columns` order
    pub extra: Vec<(String, ColumnValue)>,
    pub raw_data: Value,
    pub updated_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn extra_value(&self, column: &str) -> Option<&ColumnValue> {
        self.extra
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

// ============================================================================
// Run state machine
// ============================================================================

/// Sync run state
///
/// `Fetching -> Extracting -> Resolving -> Mapping -> Upserting -> Done`, with
/// `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncState {
    Fetching,
    Extracting,
    Resolving,
    Mapping,
    Upserting,
    Done,
    Failed,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Done | SyncState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Fetching => "FETCHING",
            SyncState::Extracting => "EXTRACTING",
            SyncState::Resolving => "RESOLVING",
            SyncState::Mapping => "MAPPING",
            SyncState::Upserting => "UPSERTING",
            SyncState::Done => "DONE",
            SyncState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `test` fetches a single page; `full` fetches up to `maxPages`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Test,
    #[default]
    Full,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Test => "test",
            SyncMode::Full => "full",
        }
    }
}

/// Trigger body: `{ "mode": "test" | "full", "maxPages": 3 }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncRequest {
    #[serde(default)]
    pub mode: SyncMode,
    #[serde(default)]
    pub max_pages: Option<u32>,
}
