//! [`SqliteStore`] — the SQLite implementation of [`LexiconStore`].

use std::{path::Path, time::Duration};

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lexa_core::{
  aggregation::{Folder, Package, Vocabulary, VocabularyContext},
  content::{Language, Word, WordContext},
  identity::{EntityKind, HasMeta, Privilege, SoftDeletable, User},
  progress::Learning,
  store::{
    EntityRecord, LexiconStore, NewContext, NewFolder, NewLanguage, NewPackage,
    NewVocabulary, NewWord, WordDetails,
  },
  validate::require_privileged_user,
};

use crate::{
  Error, Result,
  config::StoreConfig,
  schema::SCHEMA,
  tables::{self, Table},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A lexicon store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every write
/// runs as one transaction on the connection thread, so readers never see a
/// half-applied operation.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, StoreConfig::default().busy_timeout()).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, StoreConfig::default().busy_timeout()).await
  }

  /// Open the store described by `config`.
  pub async fn open_with(config: &StoreConfig) -> Result<Self> {
    let conn = match &config.path {
      Some(path) => tokio_rusqlite::Connection::open(path).await?,
      None => tokio_rusqlite::Connection::open_in_memory().await?,
    };
    info!(path = ?config.path, "opening lexicon store");
    Self::init(conn, config.busy_timeout()).await
  }

  async fn init(
    conn: tokio_rusqlite::Connection,
    busy_timeout: Duration,
  ) -> Result<Self> {
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  /// Run `op` inside an immediate transaction. The write lock is taken up
  /// front, so concurrent writers queue on the busy timeout and uniqueness
  /// races surface as [`Error::Conflict`]. Any error rolls the whole
  /// transaction back.
  async fn write<T, F>(&self, name: &'static str, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match op(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          // Dropping the transaction rolls it back.
          Err(err) => Ok(Err(err)),
        }
      })
      .await?;

    if let Err(err) = &outcome {
      match err {
        Error::Conflict(detail) => warn!(op = name, %detail, "write conflict"),
        other => debug!(op = name, error = %other, "write rejected"),
      }
    }
    outcome
  }

  pub(crate) async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }

  async fn find<T>(&self, id: Uuid) -> Result<Option<T>>
  where
    T: Table + Send + 'static,
  {
    self.read(move |conn| tables::find(conn, id)).await
  }

  /// Load a `T`, apply `mutate` and write it back if `mutate` says it
  /// changed anything.
  async fn mutate<T, F>(&self, name: &'static str, id: Uuid, mutate: F) -> Result<T>
  where
    T: Table + Send + 'static,
    F: FnOnce(&Connection, &mut T) -> Result<bool> + Send + 'static,
  {
    self
      .write(name, move |conn| {
        let mut entity: T = tables::fetch(conn, id)?;
        if mutate(conn, &mut entity)? {
          tables::persist(conn, &entity)?;
        }
        Ok(entity)
      })
      .await
  }
}

/// Soft-delete a stored `T` on behalf of `actor`. Owners may delete their own
/// entities; anyone else must be staff.
fn soft_delete_as<T: Table>(
  conn: &Connection,
  id: Uuid,
  actor: Option<&User>,
) -> Result<EntityRecord> {
  let mut entity: T = tables::fetch(conn, id)?;
  let actor = require_privileged_user(actor, Privilege::User)?;
  if actor.id != entity.owner_id() {
    require_privileged_user(Some(actor), Privilege::Staff)?;
  }

  entity.soft_delete()?;
  tables::persist(conn, &entity)?;
  Ok(EntityRecord { kind: T::KIND, meta: entity.meta().clone() })
}

fn load_each<T: Table>(conn: &Connection, ids: Vec<Uuid>) -> Result<Vec<T>> {
  ids.into_iter().map(|id| tables::fetch(conn, id)).collect()
}

// ─── LexiconStore impl ───────────────────────────────────────────────────────

impl LexiconStore for SqliteStore {
  type Error = Error;

  // ── Identity ──────────────────────────────────────────────────────────────

  async fn entity(&self, id: Uuid) -> Result<Option<EntityRecord>> {
    self.read(move |conn| tables::entity_record(conn, id)).await
  }

  async fn soft_delete(&self, id: Uuid, actor: Option<User>) -> Result<EntityRecord> {
    let record = self
      .write("soft_delete", move |conn| {
        let record = tables::entity_record(conn, id)?.ok_or(Error::NotFound(id))?;
        let actor = actor.as_ref();
        match record.kind {
          EntityKind::Language => soft_delete_as::<Language>(conn, id, actor),
          EntityKind::WordContext => soft_delete_as::<WordContext>(conn, id, actor),
          EntityKind::Word => soft_delete_as::<Word>(conn, id, actor),
          EntityKind::VocabularyContext => {
            soft_delete_as::<VocabularyContext>(conn, id, actor)
          }
          EntityKind::Vocabulary => soft_delete_as::<Vocabulary>(conn, id, actor),
          EntityKind::Package => soft_delete_as::<Package>(conn, id, actor),
          EntityKind::Folder => soft_delete_as::<Folder>(conn, id, actor),
          EntityKind::Learning => soft_delete_as::<Learning>(conn, id, actor),
        }
      })
      .await?;

    info!(%id, kind = %record.kind, "entity soft-deleted");
    Ok(record)
  }

  // ── Content ───────────────────────────────────────────────────────────────

  async fn create_language(&self, input: NewLanguage) -> Result<Language> {
    let language = self
      .write("create_language", move |conn| {
        let language =
          Language::create(&input.name, input.author.as_ref(), input.official)?;
        tables::create(conn, &language)?;
        Ok(language)
      })
      .await?;

    info!(id = %language.meta.id, name = %language.name, "language created");
    Ok(language)
  }

  async fn get_language(&self, id: Uuid) -> Result<Option<Language>> {
    self.find(id).await
  }

  async fn add_language_subscriber(
    &self,
    language_id: Uuid,
    user: Option<User>,
  ) -> Result<Language> {
    let language = self
      .mutate("add_language_subscriber", language_id, move |_, language: &mut Language| {
        Ok(language.add_subscriber(user.as_ref())?)
      })
      .await?;

    debug!(id = %language_id, subscribers = language.subscribers.len(), "language subscriber added");
    Ok(language)
  }

  async fn create_word_context(&self, input: NewContext) -> Result<WordContext> {
    let context = self
      .write("create_word_context", move |conn| {
        let context = WordContext::create(&input.name, input.author.as_ref())?;
        tables::create(conn, &context)?;
        Ok(context)
      })
      .await?;

    info!(id = %context.meta.id, name = %context.name, "word context created");
    Ok(context)
  }

  async fn get_word_context(&self, id: Uuid) -> Result<Option<WordContext>> {
    self.find(id).await
  }

  async fn create_word(&self, input: NewWord) -> Result<Word> {
    let word = self
      .write("create_word", move |conn| {
        let language: Language = tables::fetch(conn, input.language_id)?;
        let word = Word::create(
          &input.name,
          Some(&language),
          input.description.as_deref(),
          input.author.as_ref(),
          input.official,
        )?;
        tables::create(conn, &word)?;
        Ok(word)
      })
      .await?;

    info!(id = %word.meta.id, name = %word.name, "word created");
    Ok(word)
  }

  async fn create_word_with_synonyms(
    &self,
    input: NewWord,
    synonym_ids: Vec<Uuid>,
    category: String,
  ) -> Result<Word> {
    let word = self
      .write("create_word_with_synonyms", move |conn| {
        let language: Language = tables::fetch(conn, input.language_id)?;
        let mut synonyms: Vec<Word> = tables::fetch_all(conn, &synonym_ids)?;
        let word = Word::create_with_synonyms(
          &input.name,
          Some(&language),
          input.description.as_deref(),
          &mut synonyms,
          input.author.as_ref(),
          input.official,
          &category,
        )?;

        tables::create(conn, &word)?;
        for synonym in &synonyms {
          tables::persist(conn, synonym)?;
        }
        Ok(word)
      })
      .await?;

    info!(
      id = %word.meta.id,
      name = %word.name,
      synonyms = word.synonyms.len(),
      "word created with synonyms"
    );
    Ok(word)
  }

  async fn get_word(&self, id: Uuid) -> Result<Option<Word>> { self.find(id).await }

  async fn list_words(&self, language_id: Uuid) -> Result<Vec<Word>> {
    self
      .read(move |conn| {
        let ids = tables::query_ids(
          conn,
          "SELECT w.word_id FROM words w
           JOIN entities e ON e.entity_id = w.word_id
           WHERE w.language_id = ?1 AND e.active = 1
           ORDER BY w.name",
          language_id,
        )?;
        load_each(conn, ids)
      })
      .await
  }

  async fn add_synonym(&self, word_id: Uuid, synonym_id: Uuid) -> Result<Word> {
    let word = self
      .write("add_synonym", move |conn| {
        let mut word: Word = tables::fetch(conn, word_id)?;
        let mut other: Word = tables::fetch(conn, synonym_id)?;
        word.add_synonym(&mut other)?;
        tables::persist(conn, &word)?;
        tables::persist(conn, &other)?;
        Ok(word)
      })
      .await?;

    debug!(%word_id, %synonym_id, "synonyms linked");
    Ok(word)
  }

  async fn remove_synonym(&self, word_id: Uuid, synonym_id: Uuid) -> Result<Word> {
    let word = self
      .write("remove_synonym", move |conn| {
        let mut word: Word = tables::fetch(conn, word_id)?;
        let mut other: Word = tables::fetch(conn, synonym_id)?;
        word.remove_synonym(&mut other)?;
        tables::persist(conn, &word)?;
        tables::persist(conn, &other)?;
        Ok(word)
      })
      .await?;

    debug!(%word_id, %synonym_id, "synonyms unlinked");
    Ok(word)
  }

  async fn record_practice(&self, word_id: Uuid, successful: bool) -> Result<Word> {
    self
      .mutate("record_practice", word_id, move |_, word: &mut Word| {
        word.record_practice(successful)?;
        Ok(true)
      })
      .await
  }

  async fn set_word_context(&self, word_id: Uuid, context_id: Uuid) -> Result<Word> {
    self
      .mutate("set_word_context", word_id, move |conn, word: &mut Word| {
        let context: WordContext = tables::fetch(conn, context_id)?;
        word.set_context(Some(&context))?;
        Ok(true)
      })
      .await
  }

  async fn update_word_details(&self, word_id: Uuid, details: WordDetails) -> Result<Word> {
    self
      .mutate("update_word_details", word_id, move |_, word: &mut Word| {
        word.update_details(
          details.description.as_deref(),
          &details.word_type,
          &details.gender,
        )?;
        Ok(true)
      })
      .await
  }

  // ── Aggregation ───────────────────────────────────────────────────────────

  async fn create_vocabulary_context(
    &self,
    input: NewContext,
  ) -> Result<VocabularyContext> {
    let context = self
      .write("create_vocabulary_context", move |conn| {
        let context = VocabularyContext::create(&input.name, input.author.as_ref())?;
        tables::create(conn, &context)?;
        Ok(context)
      })
      .await?;

    info!(id = %context.meta.id, name = %context.name, "vocabulary context created");
    Ok(context)
  }

  async fn get_vocabulary_context(&self, id: Uuid) -> Result<Option<VocabularyContext>> {
    self.find(id).await
  }

  async fn create_vocabulary(&self, input: NewVocabulary) -> Result<Vocabulary> {
    let vocabulary = self
      .write("create_vocabulary", move |conn| {
        let domestic: Language = tables::fetch(conn, input.domestic_language_id)?;
        let foreign: Language = tables::fetch(conn, input.foreign_language_id)?;
        let domestic_words: Vec<Word> =
          tables::fetch_all(conn, &input.domestic_word_ids)?;
        let foreign_words: Vec<Word> =
          tables::fetch_all(conn, &input.foreign_word_ids)?;

        let vocabulary = Vocabulary::create_with_words(
          Some(&domestic),
          Some(&foreign),
          &domestic_words,
          &foreign_words,
          input.author.as_ref(),
          input.official,
        )?;
        tables::create(conn, &vocabulary)?;
        Ok(vocabulary)
      })
      .await?;

    info!(
      id = %vocabulary.meta.id,
      domestic = vocabulary.domestic_words.len(),
      foreign = vocabulary.foreign_words.len(),
      "vocabulary created"
    );
    Ok(vocabulary)
  }

  async fn get_vocabulary(&self, id: Uuid) -> Result<Option<Vocabulary>> {
    self.find(id).await
  }

  async fn assign_vocabulary_words(
    &self,
    vocabulary_id: Uuid,
    domestic_word_ids: Vec<Uuid>,
    foreign_word_ids: Vec<Uuid>,
  ) -> Result<Vocabulary> {
    self
      .mutate(
        "assign_vocabulary_words",
        vocabulary_id,
        move |conn, vocabulary: &mut Vocabulary| {
          let domestic: Vec<Word> = tables::fetch_all(conn, &domestic_word_ids)?;
          let foreign: Vec<Word> = tables::fetch_all(conn, &foreign_word_ids)?;
          vocabulary.assign_words(&domestic, &foreign)?;
          Ok(true)
        },
      )
      .await
  }

  async fn set_vocabulary_context(
    &self,
    vocabulary_id: Uuid,
    context_id: Uuid,
  ) -> Result<Vocabulary> {
    self
      .mutate(
        "set_vocabulary_context",
        vocabulary_id,
        move |conn, vocabulary: &mut Vocabulary| {
          let context: VocabularyContext = tables::fetch(conn, context_id)?;
          vocabulary.set_context(Some(&context))?;
          Ok(true)
        },
      )
      .await
  }

  async fn create_package(&self, input: NewPackage) -> Result<Package> {
    let package = self
      .write("create_package", move |conn| {
        let vocabularies: Vec<Vocabulary> =
          tables::fetch_all(conn, &input.vocabulary_ids)?;
        let package = Package::create_with_vocabularies(
          &input.name,
          input.author.as_ref(),
          input.official,
          input.description.as_deref(),
          &vocabularies,
        )?;
        tables::create(conn, &package)?;
        Ok(package)
      })
      .await?;

    info!(id = %package.meta.id, name = %package.name, "package created");
    Ok(package)
  }

  async fn get_package(&self, id: Uuid) -> Result<Option<Package>> { self.find(id).await }

  async fn add_package_vocabulary(
    &self,
    package_id: Uuid,
    vocabulary_id: Uuid,
  ) -> Result<Package> {
    self
      .mutate("add_package_vocabulary", package_id, move |conn, package: &mut Package| {
        let vocabulary: Vocabulary = tables::fetch(conn, vocabulary_id)?;
        Ok(package.add_vocabulary(Some(&vocabulary))?)
      })
      .await
  }

  async fn add_package_subscriber(
    &self,
    package_id: Uuid,
    user: Option<User>,
  ) -> Result<Package> {
    self
      .mutate("add_package_subscriber", package_id, move |_, package: &mut Package| {
        Ok(package.add_subscriber(user.as_ref())?)
      })
      .await
  }

  async fn create_folder(&self, input: NewFolder) -> Result<Folder> {
    let folder = self
      .write("create_folder", move |conn| {
        let packages: Vec<Package> = tables::fetch_all(conn, &input.package_ids)?;
        let folder = Folder::create_with_packages(
          &input.name,
          input.author.as_ref(),
          input.official,
          input.description.as_deref(),
          &packages,
        )?;
        tables::create(conn, &folder)?;
        Ok(folder)
      })
      .await?;

    info!(id = %folder.meta.id, name = %folder.name, "folder created");
    Ok(folder)
  }

  async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>> { self.find(id).await }

  async fn add_folder_package(&self, folder_id: Uuid, package_id: Uuid) -> Result<Folder> {
    self
      .mutate("add_folder_package", folder_id, move |conn, folder: &mut Folder| {
        let package: Package = tables::fetch(conn, package_id)?;
        Ok(folder.add_package(Some(&package))?)
      })
      .await
  }

  async fn add_folder_subscriber(
    &self,
    folder_id: Uuid,
    user: Option<User>,
  ) -> Result<Folder> {
    self
      .mutate("add_folder_subscriber", folder_id, move |_, folder: &mut Folder| {
        Ok(folder.add_subscriber(user.as_ref())?)
      })
      .await
  }

  // ── Progress ──────────────────────────────────────────────────────────────

  async fn create_learning(
    &self,
    user: Option<User>,
    vocabulary_id: Uuid,
  ) -> Result<Learning> {
    let learning = self
      .write("create_learning", move |conn| {
        let vocabulary: Vocabulary = tables::fetch(conn, vocabulary_id)?;
        let learning =
          Learning::create_with_vocabulary(user.as_ref(), Some(&vocabulary))?;

        if let Some(existing) =
          tables::learning_for_pair(conn, learning.user_id, vocabulary_id)?
        {
          return Err(Error::Conflict(format!(
            "user {} already has learning {existing} for vocabulary {vocabulary_id}",
            learning.user_id
          )));
        }
        tables::create(conn, &learning)?;
        Ok(learning)
      })
      .await?;

    info!(
      id = %learning.meta.id,
      user = %learning.user_id,
      vocabulary = %vocabulary_id,
      "learning created"
    );
    Ok(learning)
  }

  async fn get_learning(&self, id: Uuid) -> Result<Option<Learning>> { self.find(id).await }

  async fn learnings_for_user(&self, user_id: Uuid) -> Result<Vec<Learning>> {
    self
      .read(move |conn| {
        let ids = tables::query_ids(
          conn,
          "SELECT l.learning_id FROM learnings l
           JOIN entities e ON e.entity_id = l.learning_id
           WHERE l.user_id = ?1 AND e.active = 1
           ORDER BY e.created_at",
          user_id,
        )?;
        load_each(conn, ids)
      })
      .await
  }

  async fn record_learning_score(&self, learning_id: Uuid, new_score: i64) -> Result<Learning> {
    self
      .mutate("record_learning_score", learning_id, move |_, learning: &mut Learning| {
        learning.record_score(new_score)?;
        Ok(true)
      })
      .await
  }
}
