//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Entity kinds are stored as their snake_case
//! tag.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use lexa_core::{
  identity::{EntityKind, EntityMeta},
  store::EntityRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── EntityKind ───────────────────────────────────────────────────────────────

pub fn encode_kind(kind: EntityKind) -> &'static str { kind.into() }

pub fn decode_kind(s: &str) -> Result<EntityKind> {
  EntityKind::from_str(s).map_err(|_| Error::UnknownKind(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `entities` row.
pub struct RawMeta {
  pub entity_id:  String,
  pub kind:       String,
  pub created_at: String,
  pub updated_at: String,
  pub active:     bool,
}

impl RawMeta {
  pub const COLUMNS: &'static str = "entity_id, kind, created_at, updated_at, active";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id:  row.get(0)?,
      kind:       row.get(1)?,
      created_at: row.get(2)?,
      updated_at: row.get(3)?,
      active:     row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<EntityRecord> {
    Ok(EntityRecord {
      kind: decode_kind(&self.kind)?,
      meta: EntityMeta {
        id:         decode_uuid(&self.entity_id)?,
        created_at: decode_dt(&self.created_at)?,
        updated_at: decode_dt(&self.updated_at)?,
        active:     self.active,
      },
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_tags_round_trip_through_text() {
    for kind in [
      EntityKind::Language,
      EntityKind::WordContext,
      EntityKind::VocabularyContext,
      EntityKind::Learning,
    ] {
      assert_eq!(decode_kind(encode_kind(kind)).unwrap(), kind);
    }
    assert!(matches!(decode_kind("user"), Err(Error::UnknownKind(_))));
  }

  #[test]
  fn malformed_timestamp_is_reported() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
