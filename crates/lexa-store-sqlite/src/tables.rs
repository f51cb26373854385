//! Row-level persistence for each entity.
//!
//! Everything here is synchronous and runs inside the transaction opened by
//! [`SqliteStore`](crate::SqliteStore). The [`Table`] trait is the seam: the
//! generic helpers ([`fetch`], [`create`], [`persist`]) handle the shared
//! `entities` row and the kind check, each impl handles its own table and
//! relation sets.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use lexa_core::{
  aggregation::{Folder, Package, Vocabulary, VocabularyContext},
  content::{Language, Word, WordContext},
  identity::{EntityMeta, HasMeta},
  progress::Learning,
  store::EntityRecord,
  validate::require_kind,
};

use crate::{
  Error, Result,
  encode::{RawMeta, decode_opt_uuid, decode_uuid, encode_dt, encode_kind, encode_uuid},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

pub trait Table: HasMeta + Sized {
  /// Read the entity's own row and relation sets. `meta` has already been
  /// read from `entities` and kind-checked.
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self>;

  fn insert(&self, conn: &Connection) -> Result<()>;

  /// Overwrite the entity's row and relation sets with the in-memory state.
  fn save(&self, conn: &Connection) -> Result<()>;

  /// The user who may soft-delete this entity without staff rights.
  fn owner_id(&self) -> Uuid;
}

// ─── Generic helpers ─────────────────────────────────────────────────────────

pub fn entity_record(conn: &Connection, id: Uuid) -> Result<Option<EntityRecord>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM entities WHERE entity_id = ?1", RawMeta::COLUMNS),
      params![encode_uuid(id)],
      RawMeta::from_row,
    )
    .optional()?;

  raw.map(RawMeta::into_record).transpose()
}

/// Resolve `id` to a `T`. Unknown ids are [`Error::NotFound`]; ids of another
/// kind fail validation with a type mismatch.
pub fn fetch<T: Table>(conn: &Connection, id: Uuid) -> Result<T> {
  let record = entity_record(conn, id)?.ok_or(Error::NotFound(id))?;
  require_kind(record.kind, T::KIND)?;
  T::load(conn, record.meta)
}

/// Like [`fetch`], but unknown ids and ids of another kind yield `None`.
pub fn find<T: Table>(conn: &Connection, id: Uuid) -> Result<Option<T>> {
  match entity_record(conn, id)? {
    Some(record) if record.kind == T::KIND => T::load(conn, record.meta).map(Some),
    _ => Ok(None),
  }
}

pub fn fetch_all<T: Table>(conn: &Connection, ids: &[Uuid]) -> Result<Vec<T>> {
  ids.iter().map(|&id| fetch(conn, id)).collect()
}

pub fn create<T: Table>(conn: &Connection, entity: &T) -> Result<()> {
  let meta = entity.meta();
  conn.execute(
    "INSERT INTO entities (entity_id, kind, created_at, updated_at, active)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(meta.id),
      encode_kind(T::KIND),
      encode_dt(meta.created_at),
      encode_dt(meta.updated_at),
      meta.active,
    ],
  )?;
  entity.insert(conn)
}

pub fn persist<T: Table>(conn: &Connection, entity: &T) -> Result<()> {
  let meta = entity.meta();
  conn.execute(
    "UPDATE entities SET updated_at = ?2, active = ?3 WHERE entity_id = ?1",
    params![encode_uuid(meta.id), encode_dt(meta.updated_at), meta.active],
  )?;
  entity.save(conn)
}

/// Run `sql`, which takes one id parameter and yields a single id column.
pub fn query_ids(conn: &Connection, sql: &str, param: Uuid) -> Result<Vec<Uuid>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(param)], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Relation sets ───────────────────────────────────────────────────────────

fn load_ids(conn: &Connection, sql: &str, owner: Uuid) -> Result<BTreeSet<Uuid>> {
  Ok(query_ids(conn, sql, owner)?.into_iter().collect())
}

/// Replace every `(owner, member)` row of a two-column relation table.
fn replace_ids(
  conn: &Connection,
  table: &str,
  owner_col: &str,
  member_col: &str,
  owner: Uuid,
  members: &BTreeSet<Uuid>,
) -> Result<()> {
  let owner = encode_uuid(owner);
  conn.execute(&format!("DELETE FROM {table} WHERE {owner_col} = ?1"), params![
    owner
  ])?;

  let mut stmt = conn.prepare(&format!(
    "INSERT INTO {table} ({owner_col}, {member_col}) VALUES (?1, ?2)"
  ))?;
  for member in members {
    stmt.execute(params![owner, encode_uuid(*member)])?;
  }
  Ok(())
}

/// Name and author: the row shape shared by the two context tables.
fn load_named(conn: &Connection, sql: &str, id: Uuid) -> Result<(String, Uuid)> {
  let (name, author_id): (String, String) =
    conn.query_row(sql, params![encode_uuid(id)], |r| Ok((r.get(0)?, r.get(1)?)))?;
  Ok((name, decode_uuid(&author_id)?))
}

// ─── Content ─────────────────────────────────────────────────────────────────

impl Table for Language {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let id = meta.id;
    let (name, author_id, official): (String, String, bool) = conn.query_row(
      "SELECT name, author_id, official FROM languages WHERE language_id = ?1",
      params![encode_uuid(id)],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    let author_id = decode_uuid(&author_id)?;
    let subscribers = load_ids(
      conn,
      "SELECT user_id FROM language_subscribers WHERE language_id = ?1",
      id,
    )?;
    Ok(Self { meta, name, author_id, official, subscribers })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO languages (language_id, name, author_id, official)
       VALUES (?1, ?2, ?3, ?4)",
      params![
        encode_uuid(self.meta.id),
        self.name,
        encode_uuid(self.author_id),
        self.official,
      ],
    )?;
    save_language_subscribers(conn, self)
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE languages SET name = ?2, official = ?3 WHERE language_id = ?1",
      params![encode_uuid(self.meta.id), self.name, self.official],
    )?;
    save_language_subscribers(conn, self)
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

fn save_language_subscribers(conn: &Connection, language: &Language) -> Result<()> {
  replace_ids(
    conn,
    "language_subscribers",
    "language_id",
    "user_id",
    language.meta.id,
    &language.subscribers,
  )
}

impl Table for WordContext {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let (name, author_id) = load_named(
      conn,
      "SELECT name, author_id FROM word_contexts WHERE context_id = ?1",
      meta.id,
    )?;
    Ok(Self { meta, name, author_id })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO word_contexts (context_id, name, author_id) VALUES (?1, ?2, ?3)",
      params![encode_uuid(self.meta.id), self.name, encode_uuid(self.author_id)],
    )?;
    Ok(())
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE word_contexts SET name = ?2 WHERE context_id = ?1",
      params![encode_uuid(self.meta.id), self.name],
    )?;
    Ok(())
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

/// Raw column values read from a `words` row.
struct RawWord {
  name:                 String,
  language_id:          String,
  description:          String,
  word_type:            String,
  gender:               String,
  practices:            u32,
  successful_practices: u32,
  context_id:           Option<String>,
  author_id:            String,
  official:             bool,
}

impl Table for Word {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let id = meta.id;
    let raw = conn.query_row(
      "SELECT name, language_id, description, word_type, gender,
              practices, successful_practices, context_id, author_id, official
       FROM words WHERE word_id = ?1",
      params![encode_uuid(id)],
      |row| {
        Ok(RawWord {
          name:                 row.get(0)?,
          language_id:          row.get(1)?,
          description:          row.get(2)?,
          word_type:            row.get(3)?,
          gender:               row.get(4)?,
          practices:            row.get(5)?,
          successful_practices: row.get(6)?,
          context_id:           row.get(7)?,
          author_id:            row.get(8)?,
          official:             row.get(9)?,
        })
      },
    )?;
    let synonyms = load_ids(
      conn,
      "SELECT synonym_id FROM word_synonyms WHERE word_id = ?1",
      id,
    )?;

    Ok(Self {
      meta,
      name: raw.name,
      language_id: decode_uuid(&raw.language_id)?,
      description: raw.description,
      word_type: raw.word_type,
      gender: raw.gender,
      practices: raw.practices,
      successful_practices: raw.successful_practices,
      context_id: decode_opt_uuid(raw.context_id.as_deref())?,
      synonyms,
      author_id: decode_uuid(&raw.author_id)?,
      official: raw.official,
    })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO words (
         word_id, name, language_id, description, word_type, gender,
         practices, successful_practices, context_id, author_id, official
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
      params![
        encode_uuid(self.meta.id),
        self.name,
        encode_uuid(self.language_id),
        self.description,
        self.word_type,
        self.gender,
        self.practices,
        self.successful_practices,
        self.context_id.map(encode_uuid),
        encode_uuid(self.author_id),
        self.official,
      ],
    )?;
    save_synonyms(conn, self)
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE words SET
         description = ?2, word_type = ?3, gender = ?4, practices = ?5,
         successful_practices = ?6, context_id = ?7, official = ?8
       WHERE word_id = ?1",
      params![
        encode_uuid(self.meta.id),
        self.description,
        self.word_type,
        self.gender,
        self.practices,
        self.successful_practices,
        self.context_id.map(encode_uuid),
        self.official,
      ],
    )?;
    save_synonyms(conn, self)
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

// Only this word's forward edges; callers persist the other side too.
fn save_synonyms(conn: &Connection, word: &Word) -> Result<()> {
  replace_ids(
    conn,
    "word_synonyms",
    "word_id",
    "synonym_id",
    word.meta.id,
    &word.synonyms,
  )
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

impl Table for VocabularyContext {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let (name, author_id) = load_named(
      conn,
      "SELECT name, author_id FROM vocabulary_contexts WHERE context_id = ?1",
      meta.id,
    )?;
    Ok(Self { meta, name, author_id })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO vocabulary_contexts (context_id, name, author_id) VALUES (?1, ?2, ?3)",
      params![encode_uuid(self.meta.id), self.name, encode_uuid(self.author_id)],
    )?;
    Ok(())
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE vocabulary_contexts SET name = ?2 WHERE context_id = ?1",
      params![encode_uuid(self.meta.id), self.name],
    )?;
    Ok(())
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

const DOMESTIC: &str = "domestic";
const FOREIGN: &str = "foreign";

impl Table for Vocabulary {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let id = meta.id;
    let (domestic, foreign, author_id, official, context_id): (
      String,
      String,
      String,
      bool,
      Option<String>,
    ) = conn.query_row(
      "SELECT domestic_language_id, foreign_language_id, author_id, official, context_id
       FROM vocabularies WHERE vocabulary_id = ?1",
      params![encode_uuid(id)],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
    )?;

    Ok(Self {
      meta,
      domestic_language_id: decode_uuid(&domestic)?,
      foreign_language_id: decode_uuid(&foreign)?,
      domestic_words: load_side(conn, id, DOMESTIC)?,
      foreign_words: load_side(conn, id, FOREIGN)?,
      author_id: decode_uuid(&author_id)?,
      official,
      context_id: decode_opt_uuid(context_id.as_deref())?,
    })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO vocabularies (
         vocabulary_id, domestic_language_id, foreign_language_id,
         author_id, official, context_id
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        encode_uuid(self.meta.id),
        encode_uuid(self.domestic_language_id),
        encode_uuid(self.foreign_language_id),
        encode_uuid(self.author_id),
        self.official,
        self.context_id.map(encode_uuid),
      ],
    )?;
    save_sides(conn, self)
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE vocabularies SET official = ?2, context_id = ?3 WHERE vocabulary_id = ?1",
      params![
        encode_uuid(self.meta.id),
        self.official,
        self.context_id.map(encode_uuid),
      ],
    )?;
    save_sides(conn, self)
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

fn load_side(conn: &Connection, id: Uuid, side: &str) -> Result<BTreeSet<Uuid>> {
  let mut stmt = conn.prepare(
    "SELECT word_id FROM vocabulary_words WHERE vocabulary_id = ?1 AND side = ?2",
  )?;
  let raws = stmt
    .query_map(params![encode_uuid(id), side], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.iter().map(|s| decode_uuid(s)).collect()
}

/// Set assignment: prior membership on both sides is dropped.
fn save_sides(conn: &Connection, vocabulary: &Vocabulary) -> Result<()> {
  let id = encode_uuid(vocabulary.meta.id);
  conn.execute("DELETE FROM vocabulary_words WHERE vocabulary_id = ?1", params![
    id
  ])?;

  let mut stmt = conn.prepare(
    "INSERT INTO vocabulary_words (vocabulary_id, side, word_id) VALUES (?1, ?2, ?3)",
  )?;
  let sides = [
    (DOMESTIC, &vocabulary.domestic_words),
    (FOREIGN, &vocabulary.foreign_words),
  ];
  for (side, words) in sides {
    for word in words {
      stmt.execute(params![id, side, encode_uuid(*word)])?;
    }
  }
  Ok(())
}

/// Name, description, author and official flag of a package or folder row.
fn load_collection(
  conn: &Connection,
  sql: &str,
  id: Uuid,
) -> Result<(String, String, Uuid, bool)> {
  let (name, description, author_id, official): (String, String, String, bool) =
    conn.query_row(sql, params![encode_uuid(id)], |r| {
      Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
    })?;
  Ok((name, description, decode_uuid(&author_id)?, official))
}

impl Table for Package {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let id = meta.id;
    let (name, description, author_id, official) = load_collection(
      conn,
      "SELECT name, description, author_id, official FROM packages WHERE package_id = ?1",
      id,
    )?;
    Ok(Self {
      meta,
      name,
      description,
      author_id,
      official,
      vocabularies: load_ids(
        conn,
        "SELECT vocabulary_id FROM package_vocabularies WHERE package_id = ?1",
        id,
      )?,
      subscribers: load_ids(
        conn,
        "SELECT user_id FROM package_subscribers WHERE package_id = ?1",
        id,
      )?,
    })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO packages (package_id, name, description, author_id, official)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        encode_uuid(self.meta.id),
        self.name,
        self.description,
        encode_uuid(self.author_id),
        self.official,
      ],
    )?;
    save_package_members(conn, self)
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE packages SET name = ?2, description = ?3, official = ?4
       WHERE package_id = ?1",
      params![
        encode_uuid(self.meta.id),
        self.name,
        self.description,
        self.official,
      ],
    )?;
    save_package_members(conn, self)
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

fn save_package_members(conn: &Connection, package: &Package) -> Result<()> {
  replace_ids(
    conn,
    "package_vocabularies",
    "package_id",
    "vocabulary_id",
    package.meta.id,
    &package.vocabularies,
  )?;
  replace_ids(
    conn,
    "package_subscribers",
    "package_id",
    "user_id",
    package.meta.id,
    &package.subscribers,
  )
}

impl Table for Folder {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let id = meta.id;
    let (name, description, author_id, official) = load_collection(
      conn,
      "SELECT name, description, author_id, official FROM folders WHERE folder_id = ?1",
      id,
    )?;
    Ok(Self {
      meta,
      name,
      description,
      author_id,
      official,
      packages: load_ids(
        conn,
        "SELECT package_id FROM folder_packages WHERE folder_id = ?1",
        id,
      )?,
      subscribers: load_ids(
        conn,
        "SELECT user_id FROM folder_subscribers WHERE folder_id = ?1",
        id,
      )?,
    })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO folders (folder_id, name, description, author_id, official)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        encode_uuid(self.meta.id),
        self.name,
        self.description,
        encode_uuid(self.author_id),
        self.official,
      ],
    )?;
    save_folder_members(conn, self)
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE folders SET name = ?2, description = ?3, official = ?4
       WHERE folder_id = ?1",
      params![
        encode_uuid(self.meta.id),
        self.name,
        self.description,
        self.official,
      ],
    )?;
    save_folder_members(conn, self)
  }

  fn owner_id(&self) -> Uuid { self.author_id }
}

fn save_folder_members(conn: &Connection, folder: &Folder) -> Result<()> {
  replace_ids(
    conn,
    "folder_packages",
    "folder_id",
    "package_id",
    folder.meta.id,
    &folder.packages,
  )?;
  replace_ids(
    conn,
    "folder_subscribers",
    "folder_id",
    "user_id",
    folder.meta.id,
    &folder.subscribers,
  )
}

// ─── Progress ────────────────────────────────────────────────────────────────

impl Table for Learning {
  fn load(conn: &Connection, meta: EntityMeta) -> Result<Self> {
    let (user_id, vocabulary_id, score, prev_score): (String, String, i64, i64) =
      conn.query_row(
        "SELECT user_id, vocabulary_id, score, prev_score
         FROM learnings WHERE learning_id = ?1",
        params![encode_uuid(meta.id)],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
      )?;
    Ok(Self {
      meta,
      user_id: decode_uuid(&user_id)?,
      vocabulary_id: decode_uuid(&vocabulary_id)?,
      score,
      prev_score,
    })
  }

  fn insert(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "INSERT INTO learnings (learning_id, user_id, vocabulary_id, score, prev_score)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        encode_uuid(self.meta.id),
        encode_uuid(self.user_id),
        encode_uuid(self.vocabulary_id),
        self.score,
        self.prev_score,
      ],
    )?;
    Ok(())
  }

  fn save(&self, conn: &Connection) -> Result<()> {
    conn.execute(
      "UPDATE learnings SET score = ?2, prev_score = ?3 WHERE learning_id = ?1",
      params![encode_uuid(self.meta.id), self.score, self.prev_score],
    )?;
    Ok(())
  }

  fn owner_id(&self) -> Uuid { self.user_id }
}

/// Id of the learning record `user_id` holds for `vocabulary_id`, active or
/// not.
pub fn learning_for_pair(
  conn: &Connection,
  user_id: Uuid,
  vocabulary_id: Uuid,
) -> Result<Option<Uuid>> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT learning_id FROM learnings WHERE user_id = ?1 AND vocabulary_id = ?2",
      params![encode_uuid(user_id), encode_uuid(vocabulary_id)],
      |r| r.get(0),
    )
    .optional()?;
  decode_opt_uuid(raw.as_deref())
}
