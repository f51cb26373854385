//! Author-owned vocabulary content: languages, word contexts and words.
//!
//! Constructors validate every argument before building the entity, so an
//! `Err` never leaves a half-built value behind. Relations to other entities
//! are held as id sets; the synonym relation is symmetric and every mutation
//! writes both directions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{EntityKind, EntityMeta, Identifiable, Privilege, Timestamped, User, has_meta},
  validate::{
    require_active, require_boolean, require_entity, require_language,
    require_non_empty_string, require_privileged_user, require_provided,
    require_word,
  },
};

/// Minimum length of a context name.
pub const CONTEXT_NAME_MIN_LEN: usize = 2;

// ─── Language ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
  pub meta:        EntityMeta,
  /// Unique across all languages.
  pub name:        String,
  pub author_id:   Uuid,
  pub official:    bool,
  pub subscribers: BTreeSet<Uuid>,
}

has_meta!(Language, EntityKind::Language);

impl Language {
  pub fn create(
    name: &str,
    author: Option<&User>,
    official: Option<bool>,
  ) -> Result<Self> {
    let name = require_non_empty_string(name, "language name", 1)?;
    let author = require_privileged_user(author, Privilege::User)?;
    let official = require_boolean(official, "official")?;

    Ok(Self {
      meta: EntityMeta::new(),
      name: name.to_owned(),
      author_id: author.id,
      official,
      subscribers: BTreeSet::new(),
    })
  }

  /// Add `user` to the subscribers. Returns `false` if they already were one;
  /// that case is a no-op, not an error.
  pub fn add_subscriber(&mut self, user: Option<&User>) -> Result<bool> {
    require_active(self)?;
    let user = require_privileged_user(user, Privilege::User)?;
    let added = self.subscribers.insert(user.id);
    if added {
      self.touch();
    }
    Ok(added)
  }

  pub fn same_content(&self, other: &Self) -> bool {
    self.name == other.name && self.official == other.official
  }
}

// ─── WordContext ─────────────────────────────────────────────────────────────

/// A topical grouping for words, e.g. "kitchen" or "travel".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordContext {
  pub meta:      EntityMeta,
  pub name:      String,
  pub author_id: Uuid,
}

has_meta!(WordContext, EntityKind::WordContext);

impl WordContext {
  pub fn create(name: &str, author: Option<&User>) -> Result<Self> {
    let name =
      require_non_empty_string(name, "context name", CONTEXT_NAME_MIN_LEN)?;
    let author = require_privileged_user(author, Privilege::User)?;

    Ok(Self {
      meta: EntityMeta::new(),
      name: name.to_owned(),
      author_id: author.id,
    })
  }

  pub fn same_content(&self, other: &Self) -> bool { self.name == other.name }
}

// ─── Word ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
  pub meta:                 EntityMeta,
  /// Unique across all words.
  pub name:                 String,
  pub language_id:          Uuid,
  pub description:          String,
  /// Part of speech: adjective, noun, verb, ...
  pub word_type:            String,
  /// Single-letter grammatical gender; only meaningful for nouns.
  pub gender:               String,
  pub practices:            u32,
  /// Never exceeds `practices`.
  pub successful_practices: u32,
  pub context_id:           Option<Uuid>,
  pub synonyms:             BTreeSet<Uuid>,
  pub author_id:            Uuid,
  pub official:             bool,
}

has_meta!(Word, EntityKind::Word);

impl Word {
  pub fn create(
    name: &str,
    language: Option<&Language>,
    description: Option<&str>,
    author: Option<&User>,
    official: Option<bool>,
  ) -> Result<Self> {
    let name = require_non_empty_string(name, "word name", 1)?;
    let language = require_language(language)?;
    let description = require_provided(description, "description")?;
    let author = require_privileged_user(author, Privilege::User)?;
    let official = require_boolean(official, "official")?;

    Ok(Self {
      meta: EntityMeta::new(),
      name: name.to_owned(),
      language_id: language.id(),
      description: description.to_owned(),
      word_type: String::new(),
      gender: String::new(),
      practices: 0,
      successful_practices: 0,
      context_id: None,
      synonyms: BTreeSet::new(),
      author_id: author.id,
      official,
    })
  }

  /// Create a word and link it with every word in `synonyms`, in both
  /// directions. `category` is stored as the word's type.
  ///
  /// All synonyms must belong to `language`. Nothing in `synonyms` is touched
  /// unless the whole call succeeds.
  pub fn create_with_synonyms(
    name: &str,
    language: Option<&Language>,
    description: Option<&str>,
    synonyms: &mut [Word],
    author: Option<&User>,
    official: Option<bool>,
    category: &str,
  ) -> Result<Self> {
    let language_id = require_language(language)?.id();
    let mut seen = BTreeSet::new();
    for synonym in synonyms.iter() {
      require_word(Some(synonym), Some(language_id))?;
      if !seen.insert(synonym.id()) {
        return Err(Error::structural(format!(
          "synonym {:?} is listed more than once",
          synonym.name
        )));
      }
    }
    let category = require_non_empty_string(category, "category", 1)?;

    let mut word = Self::create(name, language, description, author, official)?;
    word.word_type = category.to_owned();
    for synonym in synonyms.iter_mut() {
      word.synonyms.insert(synonym.id());
      synonym.synonyms.insert(word.id());
      synonym.touch();
    }
    Ok(word)
  }

  /// Link `self` and `other` as synonyms. Re-adding an existing link is a
  /// no-op that still succeeds.
  pub fn add_synonym(&mut self, other: &mut Word) -> Result<()> {
    self.check_synonym_pair(other)?;
    require_word(Some(other), None)?;
    if other.language_id != self.language_id {
      return Err(Error::structural(format!(
        "synonym {:?} is not in the language of {:?}",
        other.name, self.name
      )));
    }

    self.synonyms.insert(other.id());
    other.synonyms.insert(self.id());
    self.touch();
    other.touch();
    Ok(())
  }

  /// Unlink `self` and `other`. Returns `false` if they were not linked.
  /// `other` may be inactive, so links to soft-deleted words can be dropped.
  pub fn remove_synonym(&mut self, other: &mut Word) -> Result<bool> {
    self.check_synonym_pair(other)?;

    let removed = self.synonyms.remove(&other.id());
    let mirrored = other.synonyms.remove(&self.id());
    self.touch();
    other.touch();
    Ok(removed || mirrored)
  }

  fn check_synonym_pair(&self, other: &Word) -> Result<()> {
    require_active(self)?;
    if other.id() == self.id() {
      return Err(Error::structural("a word cannot be its own synonym"));
    }
    Ok(())
  }

  /// Count one practice round. Both counters only ever move together, which
  /// keeps `successful_practices <= practices`.
  pub fn record_practice(&mut self, successful: bool) -> Result<()> {
    require_active(self)?;
    let practices = self
      .practices
      .checked_add(1)
      .ok_or_else(|| Error::structural("practice counter overflow"))?;

    self.practices = practices;
    if successful {
      self.successful_practices += 1;
    }
    self.touch();
    Ok(())
  }

  /// Percentage of successful practices. Undefined before the first practice.
  pub fn success_ratio(&self) -> Result<f64> {
    if self.practices == 0 {
      return Err(Error::ArithmeticUndefined(format!(
        "word {:?} has not been practised yet",
        self.name
      )));
    }
    Ok(f64::from(self.successful_practices) / f64::from(self.practices) * 100.0)
  }

  pub fn set_context(&mut self, context: Option<&WordContext>) -> Result<()> {
    require_active(self)?;
    let context = require_entity(context, "word context")?;
    self.context_id = Some(context.id());
    self.touch();
    Ok(())
  }

  /// Replace the descriptive fields. `gender` is at most one character.
  pub fn update_details(
    &mut self,
    description: Option<&str>,
    word_type: &str,
    gender: &str,
  ) -> Result<()> {
    require_active(self)?;
    let description = require_provided(description, "description")?;
    if gender.chars().count() > 1 {
      return Err(Error::structural(format!(
        "gender {gender:?} must be a single character"
      )));
    }

    self.description = description.to_owned();
    self.word_type = word_type.to_owned();
    self.gender = gender.to_owned();
    self.touch();
    Ok(())
  }

  pub fn same_content(&self, other: &Self) -> bool {
    self.name == other.name
      && self.language_id == other.language_id
      && self.description == other.description
      && self.synonyms == other.synonyms
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, identity::SoftDeletable};

  fn user() -> User { User::regular(Uuid::new_v4()) }

  fn english() -> Language {
    Language::create("English", Some(&user()), Some(true)).unwrap()
  }

  fn word(name: &str, language: &Language) -> Word {
    Word::create(name, Some(language), Some("an animal"), Some(&user()), Some(true))
      .unwrap()
  }

  // ─── Language ──────────────────────────────────────────────────────────────

  #[test]
  fn create_language() {
    let author = user();
    let language = Language::create("English", Some(&author), Some(true)).unwrap();
    assert_eq!(language.name, "English");
    assert_eq!(language.author_id, author.id);
    assert!(language.official);
    assert!(language.subscribers.is_empty());
    assert!(language.meta.active);
  }

  #[test]
  fn create_language_rejects_empty_name() {
    let err = Language::create("", Some(&user()), Some(true)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn create_language_requires_author_and_official() {
    assert_eq!(
      Language::create("English", None, Some(true)).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
    assert_eq!(
      Language::create("English", Some(&user()), None)
        .unwrap_err()
        .kind(),
      ErrorKind::MissingValue
    );
  }

  #[test]
  fn unofficial_language_is_accepted() {
    let language = Language::create("Klingon", Some(&user()), Some(false)).unwrap();
    assert!(!language.official);
  }

  #[test]
  fn add_subscriber_is_idempotent() {
    let mut language = english();
    let reader = user();

    assert!(language.add_subscriber(Some(&reader)).unwrap());
    let once = language.subscribers.clone();
    assert!(!language.add_subscriber(Some(&reader)).unwrap());
    assert_eq!(language.subscribers, once);
    assert_eq!(language.subscribers.len(), 1);
  }

  #[test]
  fn add_subscriber_requires_user() {
    let mut language = english();
    assert_eq!(
      language.add_subscriber(None).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
  }

  // ─── WordContext ───────────────────────────────────────────────────────────

  #[test]
  fn word_context_name_length() {
    let err = WordContext::create("t", Some(&user())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);

    let context = WordContext::create("ok", Some(&user())).unwrap();
    assert_eq!(context.name, "ok");
  }

  #[test]
  fn word_context_requires_author() {
    assert_eq!(
      WordContext::create("test context", None).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
  }

  // ─── Word ──────────────────────────────────────────────────────────────────

  #[test]
  fn create_word_starts_unpractised() {
    let english = english();
    let dog = word("dog", &english);
    assert_eq!(dog.language_id, english.id());
    assert_eq!(dog.description, "an animal");
    assert_eq!(dog.practices, 0);
    assert_eq!(dog.successful_practices, 0);
    assert!(dog.context_id.is_none());
  }

  #[test]
  fn description_may_be_empty_but_must_be_provided() {
    let english = english();
    let empty =
      Word::create("cat", Some(&english), Some(""), Some(&user()), Some(true));
    assert!(empty.is_ok());

    let missing = Word::create("cat", Some(&english), None, Some(&user()), Some(true));
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn create_word_requires_language() {
    let err = Word::create("dog", None, Some(""), Some(&user()), Some(true))
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn practice_counters_and_ratio() {
    let mut dog = word("dog", &english());
    dog.record_practice(true).unwrap();
    dog.record_practice(true).unwrap();
    dog.record_practice(false).unwrap();

    assert_eq!(dog.practices, 3);
    assert_eq!(dog.successful_practices, 2);
    assert!((dog.success_ratio().unwrap() - 66.666_666).abs() < 0.01);
  }

  #[test]
  fn ratio_undefined_without_practice() {
    let dog = word("dog", &english());
    assert_eq!(
      dog.success_ratio().unwrap_err().kind(),
      ErrorKind::ArithmeticUndefined
    );
  }

  #[test]
  fn successful_never_exceeds_total() {
    let mut dog = word("dog", &english());
    for round in 0..50 {
      dog.record_practice(round % 3 != 0).unwrap();
      assert!(dog.successful_practices <= dog.practices);
    }
  }

  #[test]
  fn synonyms_are_symmetric() {
    let english = english();
    let mut big = word("big", &english);
    let mut large = word("large", &english);

    big.add_synonym(&mut large).unwrap();
    assert!(big.synonyms.contains(&large.id()));
    assert!(large.synonyms.contains(&big.id()));

    assert!(large.remove_synonym(&mut big).unwrap());
    assert!(big.synonyms.is_empty());
    assert!(large.synonyms.is_empty());
    assert!(!large.remove_synonym(&mut big).unwrap());
  }

  #[test]
  fn link_to_inactive_word_can_still_be_removed() {
    let english = english();
    let mut big = word("big", &english);
    let mut large = word("large", &english);
    big.add_synonym(&mut large).unwrap();
    large.soft_delete().unwrap();

    assert_eq!(
      big.add_synonym(&mut large).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
    assert!(big.remove_synonym(&mut large).unwrap());
    assert!(big.synonyms.is_empty());
    assert!(large.synonyms.is_empty());
  }

  #[test]
  fn synonym_must_be_other_word_in_same_language() {
    let english = english();
    let spanish = Language::create("Spanish", Some(&user()), Some(true)).unwrap();
    let mut big = word("big", &english);
    let mut grande = word("grande", &spanish);

    let err = big.add_synonym(&mut grande).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(grande.synonyms.is_empty());

    let mut twin = big.clone();
    assert_eq!(
      big.add_synonym(&mut twin).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
  }

  #[test]
  fn create_with_synonyms_links_both_ways() {
    let english = english();
    let mut existing = vec![word("large", &english), word("huge", &english)];

    let big = Word::create_with_synonyms(
      "big",
      Some(&english),
      Some("of size"),
      &mut existing,
      Some(&user()),
      Some(true),
      "adjective",
    )
    .unwrap();

    assert_eq!(big.word_type, "adjective");
    assert_eq!(big.synonyms.len(), 2);
    for synonym in &existing {
      assert!(big.synonyms.contains(&synonym.id()));
      assert!(synonym.synonyms.contains(&big.id()));
    }
  }

  #[test]
  fn create_with_synonyms_leaves_synonyms_untouched_on_failure() {
    let english = english();
    let spanish = Language::create("Spanish", Some(&user()), Some(true)).unwrap();
    let mut mixed = vec![word("large", &english), word("grande", &spanish)];
    let before: Vec<_> = mixed.iter().map(|w| w.updated_at()).collect();

    let err = Word::create_with_synonyms(
      "big",
      Some(&english),
      Some(""),
      &mut mixed,
      Some(&user()),
      Some(true),
      "adjective",
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    assert!(mixed.iter().all(|w| w.synonyms.is_empty()));
    let after: Vec<_> = mixed.iter().map(|w| w.updated_at()).collect();
    assert_eq!(before, after);
  }

  #[test]
  fn create_with_synonyms_requires_category() {
    let english = english();
    let err = Word::create_with_synonyms(
      "big",
      Some(&english),
      Some(""),
      &mut [],
      Some(&user()),
      Some(true),
      "",
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn set_context_and_details() {
    let mut dog = word("dog", &english());
    let context = WordContext::create("animals", Some(&user())).unwrap();

    dog.set_context(Some(&context)).unwrap();
    assert_eq!(dog.context_id, Some(context.id()));

    dog.update_details(Some("a pet"), "noun", "m").unwrap();
    assert_eq!(dog.gender, "m");
    assert_eq!(
      dog.update_details(Some("a pet"), "noun", "mf").unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
  }

  #[test]
  fn inactive_word_is_frozen() {
    let mut dog = word("dog", &english());
    dog.soft_delete().unwrap();
    assert_eq!(
      dog.record_practice(true).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
    assert_eq!(dog.practices, 0);
  }

  #[test]
  fn same_content_ignores_identity() {
    let english = english();
    let dog = word("dog", &english);
    let mut copy = dog.clone();
    copy.meta = EntityMeta::new();
    assert!(dog.same_content(&copy));
    assert!(!crate::identity::same_identity(&dog, &copy));
  }
}
