//! The `LexiconStore` trait and its input types.
//!
//! The trait is implemented by storage backends (e.g. `lexa-store-sqlite`).
//! Every write method validates with the constructors and mutators of this
//! crate and persists the result as one atomic unit: a failed call leaves the
//! store exactly as it was.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  aggregation::{Folder, Package, Vocabulary, VocabularyContext},
  content::{Language, Word, WordContext},
  identity::{EntityKind, EntityMeta, User},
  progress::Learning,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`LexiconStore::create_language`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewLanguage {
  pub name:     String,
  pub author:   Option<User>,
  pub official: Option<bool>,
}

/// Input to [`LexiconStore::create_word_context`] and
/// [`LexiconStore::create_vocabulary_context`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewContext {
  pub name:   String,
  pub author: Option<User>,
}

/// Input to [`LexiconStore::create_word`] and
/// [`LexiconStore::create_word_with_synonyms`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewWord {
  pub name:        String,
  pub language_id: Uuid,
  /// Must be present; may be empty.
  pub description: Option<String>,
  pub author:      Option<User>,
  pub official:    Option<bool>,
}

/// Replacement values for [`LexiconStore::update_word_details`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordDetails {
  pub description: Option<String>,
  #[serde(default)]
  pub word_type:   String,
  #[serde(default)]
  pub gender:      String,
}

/// Input to [`LexiconStore::create_vocabulary`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewVocabulary {
  pub domestic_language_id: Uuid,
  pub foreign_language_id:  Uuid,
  pub domestic_word_ids:    Vec<Uuid>,
  pub foreign_word_ids:     Vec<Uuid>,
  pub author:               Option<User>,
  pub official:             Option<bool>,
}

/// Input to [`LexiconStore::create_package`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewPackage {
  pub name:           String,
  pub description:    Option<String>,
  pub author:         Option<User>,
  pub official:       Option<bool>,
  pub vocabulary_ids: Vec<Uuid>,
}

/// Input to [`LexiconStore::create_folder`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewFolder {
  pub name:        String,
  pub description: Option<String>,
  pub author:      Option<User>,
  pub official:    Option<bool>,
  pub package_ids: Vec<Uuid>,
}

/// The kind and base shape of any stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
  pub kind: EntityKind,
  pub meta: EntityMeta,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a lexicon store backend.
///
/// Identifiers passed in are resolved inside the operation: an unknown id is
/// a backend "not found" error, an id of another entity kind fails with
/// [`Error::TypeMismatch`](crate::Error::TypeMismatch). Unique-name clashes
/// are reported by the backend, not prevented by locking.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait LexiconStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Look up the kind and base shape of any entity. Returns `None` if the id
  /// was never issued.
  fn entity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EntityRecord>, Self::Error>> + Send + '_;

  /// Mark an entity inactive. The author (or, for a learning record, the
  /// learner) may delete their own entity; anyone else must be staff.
  fn soft_delete(
    &self,
    id: Uuid,
    actor: Option<User>,
  ) -> impl Future<Output = Result<EntityRecord, Self::Error>> + Send + '_;

  // ── Content ───────────────────────────────────────────────────────────

  fn create_language(
    &self,
    input: NewLanguage,
  ) -> impl Future<Output = Result<Language, Self::Error>> + Send + '_;

  fn get_language(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Language>, Self::Error>> + Send + '_;

  /// Idempotent: subscribing twice leaves one subscription.
  fn add_language_subscriber(
    &self,
    language_id: Uuid,
    user: Option<User>,
  ) -> impl Future<Output = Result<Language, Self::Error>> + Send + '_;

  fn create_word_context(
    &self,
    input: NewContext,
  ) -> impl Future<Output = Result<WordContext, Self::Error>> + Send + '_;

  fn get_word_context(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<WordContext>, Self::Error>> + Send + '_;

  fn create_word(
    &self,
    input: NewWord,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  /// Create a word linked to every id in `synonym_ids` in both directions.
  /// `category` becomes the word's type.
  fn create_word_with_synonyms(
    &self,
    input: NewWord,
    synonym_ids: Vec<Uuid>,
    category: String,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  fn get_word(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Word>, Self::Error>> + Send + '_;

  /// Active words of a language, ordered by name.
  fn list_words(
    &self,
    language_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Word>, Self::Error>> + Send + '_;

  /// Link two words as synonyms; returns the first word as updated.
  fn add_synonym(
    &self,
    word_id: Uuid,
    synonym_id: Uuid,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  fn remove_synonym(
    &self,
    word_id: Uuid,
    synonym_id: Uuid,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  fn record_practice(
    &self,
    word_id: Uuid,
    successful: bool,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  fn set_word_context(
    &self,
    word_id: Uuid,
    context_id: Uuid,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  fn update_word_details(
    &self,
    word_id: Uuid,
    details: WordDetails,
  ) -> impl Future<Output = Result<Word, Self::Error>> + Send + '_;

  // ── Aggregation ───────────────────────────────────────────────────────

  fn create_vocabulary_context(
    &self,
    input: NewContext,
  ) -> impl Future<Output = Result<VocabularyContext, Self::Error>> + Send + '_;

  fn get_vocabulary_context(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<VocabularyContext>, Self::Error>> + Send + '_;

  fn create_vocabulary(
    &self,
    input: NewVocabulary,
  ) -> impl Future<Output = Result<Vocabulary, Self::Error>> + Send + '_;

  fn get_vocabulary(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Vocabulary>, Self::Error>> + Send + '_;

  /// Replace both word sets of a vocabulary.
  fn assign_vocabulary_words(
    &self,
    vocabulary_id: Uuid,
    domestic_word_ids: Vec<Uuid>,
    foreign_word_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vocabulary, Self::Error>> + Send + '_;

  fn set_vocabulary_context(
    &self,
    vocabulary_id: Uuid,
    context_id: Uuid,
  ) -> impl Future<Output = Result<Vocabulary, Self::Error>> + Send + '_;

  fn create_package(
    &self,
    input: NewPackage,
  ) -> impl Future<Output = Result<Package, Self::Error>> + Send + '_;

  fn get_package(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Package>, Self::Error>> + Send + '_;

  fn add_package_vocabulary(
    &self,
    package_id: Uuid,
    vocabulary_id: Uuid,
  ) -> impl Future<Output = Result<Package, Self::Error>> + Send + '_;

  fn add_package_subscriber(
    &self,
    package_id: Uuid,
    user: Option<User>,
  ) -> impl Future<Output = Result<Package, Self::Error>> + Send + '_;

  fn create_folder(
    &self,
    input: NewFolder,
  ) -> impl Future<Output = Result<Folder, Self::Error>> + Send + '_;

  fn get_folder(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Folder>, Self::Error>> + Send + '_;

  fn add_folder_package(
    &self,
    folder_id: Uuid,
    package_id: Uuid,
  ) -> impl Future<Output = Result<Folder, Self::Error>> + Send + '_;

  fn add_folder_subscriber(
    &self,
    folder_id: Uuid,
    user: Option<User>,
  ) -> impl Future<Output = Result<Folder, Self::Error>> + Send + '_;

  // ── Progress ──────────────────────────────────────────────────────────

  /// Fails if `user` already has a learning record for the vocabulary.
  fn create_learning(
    &self,
    user: Option<User>,
    vocabulary_id: Uuid,
  ) -> impl Future<Output = Result<Learning, Self::Error>> + Send + '_;

  fn get_learning(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Learning>, Self::Error>> + Send + '_;

  /// Active learning records of a user.
  fn learnings_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Learning>, Self::Error>> + Send + '_;

  fn record_learning_score(
    &self,
    learning_id: Uuid,
    new_score: i64,
  ) -> impl Future<Output = Result<Learning, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_word_without_description_decodes_to_none() {
    let input: NewWord = serde_json::from_str(&format!(
      r#"{{"name":"house","language_id":"{}","author":null,"official":true}}"#,
      Uuid::nil()
    ))
    .unwrap();
    assert!(input.description.is_none());
    assert!(input.author.is_none());
    assert_eq!(input.official, Some(true));
  }

  #[test]
  fn user_flags_default_to_false() {
    let id = Uuid::new_v4();
    let input: NewContext =
      serde_json::from_str(&format!(r#"{{"name":"home","author":{{"id":"{id}"}}}}"#))
        .unwrap();
    assert_eq!(input.author, Some(User::regular(id)));
  }

  #[test]
  fn entity_record_serializes_kind_in_snake_case() {
    let record = EntityRecord {
      kind: EntityKind::VocabularyContext,
      meta: EntityMeta::new(),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["kind"], "vocabulary_context");
    assert_eq!(json["meta"]["active"], true);
  }
}
