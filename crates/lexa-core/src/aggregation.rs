//! Study units built from content: vocabularies group words, packages group
//! vocabularies and folders group packages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  content::{CONTEXT_NAME_MIN_LEN, Language, Word},
  identity::{EntityKind, EntityMeta, Identifiable, Privilege, Timestamped, User, has_meta},
  validate::{
    require_active, require_boolean, require_entity, require_language_pair,
    require_non_empty_string, require_package_set, require_privileged_user,
    require_provided, require_vocabulary, require_vocabulary_set,
    require_word_set,
  },
};

fn ids<T: Identifiable>(values: &[T]) -> BTreeSet<Uuid> {
  values.iter().map(Identifiable::id).collect()
}

// ─── VocabularyContext ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyContext {
  pub meta:      EntityMeta,
  pub name:      String,
  pub author_id: Uuid,
}

has_meta!(VocabularyContext, EntityKind::VocabularyContext);

impl VocabularyContext {
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

// ─── Vocabulary ──────────────────────────────────────────────────────────────

/// Paired word sets: words in the learner's language and their counterparts
/// in the target language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
  pub meta:                 EntityMeta,
  pub domestic_language_id: Uuid,
  /// Never equal to `domestic_language_id`.
  pub foreign_language_id:  Uuid,
  /// Every member belongs to the domestic language.
  pub domestic_words:       BTreeSet<Uuid>,
  /// Every member belongs to the foreign language.
  pub foreign_words:        BTreeSet<Uuid>,
  pub author_id:            Uuid,
  pub official:             bool,
  pub context_id:           Option<Uuid>,
}

has_meta!(Vocabulary, EntityKind::Vocabulary);

impl Vocabulary {
  pub fn create_with_words(
    domestic_language: Option<&Language>,
    foreign_language: Option<&Language>,
    domestic_words: &[Word],
    foreign_words: &[Word],
    author: Option<&User>,
    official: Option<bool>,
  ) -> Result<Self> {
    let (domestic, foreign) =
      require_language_pair(domestic_language, foreign_language)?;
    require_word_set(domestic_words, Some(domestic.id()))?;
    require_word_set(foreign_words, Some(foreign.id()))?;
    let author = require_privileged_user(author, Privilege::User)?;
    let official = require_boolean(official, "official")?;

    Ok(Self {
      meta: EntityMeta::new(),
      domestic_language_id: domestic.id(),
      foreign_language_id: foreign.id(),
      domestic_words: ids(domestic_words),
      foreign_words: ids(foreign_words),
      author_id: author.id,
      official,
      context_id: None,
    })
  }

  /// Replace both word sets. Prior membership is discarded, not merged.
  pub fn assign_words(
    &mut self,
    domestic_words: &[Word],
    foreign_words: &[Word],
  ) -> Result<()> {
    require_active(self)?;
    require_word_set(domestic_words, Some(self.domestic_language_id))?;
    require_word_set(foreign_words, Some(self.foreign_language_id))?;

    self.domestic_words = ids(domestic_words);
    self.foreign_words = ids(foreign_words);
    self.touch();
    Ok(())
  }

  pub fn set_context(&mut self, context: Option<&VocabularyContext>) -> Result<()> {
    require_active(self)?;
    let context = require_entity(context, "vocabulary context")?;
    self.context_id = Some(context.id());
    self.touch();
    Ok(())
  }

  pub fn same_content(&self, other: &Self) -> bool {
    self.domestic_language_id == other.domestic_language_id
      && self.foreign_language_id == other.foreign_language_id
      && self.domestic_words == other.domestic_words
      && self.foreign_words == other.foreign_words
  }
}

// ─── Package ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
  pub meta:         EntityMeta,
  pub name:         String,
  pub description:  String,
  pub author_id:    Uuid,
  pub official:     bool,
  pub vocabularies: BTreeSet<Uuid>,
  pub subscribers:  BTreeSet<Uuid>,
}

has_meta!(Package, EntityKind::Package);

impl Package {
  /// Create a package holding `vocabularies`, which must be non-empty.
  pub fn create_with_vocabularies(
    name: &str,
    author: Option<&User>,
    official: Option<bool>,
    description: Option<&str>,
    vocabularies: &[Vocabulary],
  ) -> Result<Self> {
    let name = require_non_empty_string(name, "package name", 1)?;
    let author = require_privileged_user(author, Privilege::User)?;
    let official = require_boolean(official, "official")?;
    let description = require_provided(description, "description")?;
    require_vocabulary_set(vocabularies)?;

    Ok(Self {
      meta: EntityMeta::new(),
      name: name.to_owned(),
      description: description.to_owned(),
      author_id: author.id,
      official,
      vocabularies: ids(vocabularies),
      subscribers: BTreeSet::new(),
    })
  }

  /// Returns `false` if the vocabulary was already part of the package.
  pub fn add_vocabulary(&mut self, vocabulary: Option<&Vocabulary>) -> Result<bool> {
    require_active(self)?;
    let vocabulary = require_vocabulary(vocabulary)?;
    let added = self.vocabularies.insert(vocabulary.id());
    if added {
      self.touch();
    }
    Ok(added)
  }

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
    self.name == other.name && self.author_id == other.author_id
  }
}

// ─── Folder ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
  pub meta:        EntityMeta,
  pub name:        String,
  pub description: String,
  pub author_id:   Uuid,
  pub official:    bool,
  pub packages:    BTreeSet<Uuid>,
  pub subscribers: BTreeSet<Uuid>,
}

has_meta!(Folder, EntityKind::Folder);

impl Folder {
  /// Create a folder holding `packages`, which must be non-empty.
  pub fn create_with_packages(
    name: &str,
    author: Option<&User>,
    official: Option<bool>,
    description: Option<&str>,
    packages: &[Package],
  ) -> Result<Self> {
    let name = require_non_empty_string(name, "folder name", 1)?;
    let author = require_privileged_user(author, Privilege::User)?;
    let official = require_boolean(official, "official")?;
    let description = require_provided(description, "description")?;
    require_package_set(packages)?;

    Ok(Self {
      meta: EntityMeta::new(),
      name: name.to_owned(),
      description: description.to_owned(),
      author_id: author.id,
      official,
      packages: ids(packages),
      subscribers: BTreeSet::new(),
    })
  }

  pub fn add_package(&mut self, package: Option<&Package>) -> Result<bool> {
    require_active(self)?;
    let package = require_entity(package, "package")?;
    let added = self.packages.insert(package.id());
    if added {
      self.touch();
    }
    Ok(added)
  }

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
    self.name == other.name && self.author_id == other.author_id
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, identity::SoftDeletable};

  struct Fixture {
    author:  User,
    english: Language,
    spanish: Language,
    en:      Vec<Word>,
    es:      Vec<Word>,
  }

  fn fixture() -> Fixture {
    let author = User { id: Uuid::new_v4(), is_staff: true, is_superuser: true };
    let english = Language::create("English", Some(&author), Some(true)).unwrap();
    let spanish = Language::create("Spanish", Some(&author), Some(true)).unwrap();
    let make = |name: &str, language: &Language| {
      Word::create(name, Some(language), Some(""), Some(&author), Some(true))
        .unwrap()
    };
    let en = vec![make("dog", &english), make("cat", &english)];
    let es = vec![make("perro", &spanish), make("gato", &spanish)];
    Fixture { author, english, spanish, en, es }
  }

  fn vocabulary(f: &Fixture) -> Vocabulary {
    Vocabulary::create_with_words(
      Some(&f.english),
      Some(&f.spanish),
      &f.en,
      &f.es,
      Some(&f.author),
      Some(true),
    )
    .unwrap()
  }

  fn package(f: &Fixture, name: &str) -> Package {
    Package::create_with_vocabularies(
      name,
      Some(&f.author),
      Some(true),
      Some("animals"),
      &[vocabulary(f)],
    )
    .unwrap()
  }

  // ─── Vocabulary ────────────────────────────────────────────────────────────

  #[test]
  fn create_vocabulary() {
    let f = fixture();
    let vocab = vocabulary(&f);
    assert_eq!(vocab.domestic_language_id, f.english.id());
    assert_eq!(vocab.foreign_language_id, f.spanish.id());
    assert_eq!(vocab.domestic_words.len(), 2);
    assert_eq!(vocab.foreign_words.len(), 2);
    assert_eq!(vocab.author_id, f.author.id);
  }

  #[test]
  fn vocabulary_languages_must_differ() {
    let f = fixture();
    let err = Vocabulary::create_with_words(
      Some(&f.english),
      Some(&f.english),
      &f.en,
      &f.en,
      Some(&f.author),
      Some(true),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
  }

  #[test]
  fn vocabulary_words_must_match_their_side() {
    let f = fixture();
    let err = Vocabulary::create_with_words(
      Some(&f.english),
      Some(&f.spanish),
      &f.es,
      &f.en,
      Some(&f.author),
      Some(true),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
  }

  #[test]
  fn vocabulary_word_sets_must_be_non_empty() {
    let f = fixture();
    let err = Vocabulary::create_with_words(
      Some(&f.english),
      Some(&f.spanish),
      &f.en,
      &[],
      Some(&f.author),
      Some(true),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn vocabulary_requires_author_and_languages() {
    let f = fixture();
    let no_author = Vocabulary::create_with_words(
      Some(&f.english),
      Some(&f.spanish),
      &f.en,
      &f.es,
      None,
      Some(true),
    );
    assert_eq!(no_author.unwrap_err().kind(), ErrorKind::MissingValue);

    let no_foreign = Vocabulary::create_with_words(
      Some(&f.english),
      None,
      &f.en,
      &f.es,
      Some(&f.author),
      Some(true),
    );
    assert_eq!(no_foreign.unwrap_err().kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn assign_words_replaces_membership() {
    let f = fixture();
    let mut vocab = vocabulary(&f);

    vocab.assign_words(&f.en[..1], &f.es[1..]).unwrap();
    assert_eq!(vocab.domestic_words, BTreeSet::from([f.en[0].id()]));
    assert_eq!(vocab.foreign_words, BTreeSet::from([f.es[1].id()]));

    let before = vocab.clone();
    assert!(vocab.assign_words(&f.es, &f.en).is_err());
    assert!(vocab.same_content(&before));
  }

  #[test]
  fn vocabulary_context() {
    let f = fixture();
    assert_eq!(
      VocabularyContext::create("x", Some(&f.author)).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
    let context = VocabularyContext::create("pets", Some(&f.author)).unwrap();
    let mut vocab = vocabulary(&f);
    vocab.set_context(Some(&context)).unwrap();
    assert_eq!(vocab.context_id, Some(context.id()));
  }

  // ─── Package ───────────────────────────────────────────────────────────────

  #[test]
  fn package_attaches_validated_vocabularies() {
    let f = fixture();
    let vocab = vocabulary(&f);
    let pkg = Package::create_with_vocabularies(
      "Animals",
      Some(&f.author),
      Some(false),
      Some(""),
      std::slice::from_ref(&vocab),
    )
    .unwrap();
    assert_eq!(pkg.vocabularies, BTreeSet::from([vocab.id()]));
    assert!(!pkg.official);
  }

  #[test]
  fn package_requires_vocabularies() {
    let f = fixture();
    let err = Package::create_with_vocabularies(
      "Animals",
      Some(&f.author),
      Some(true),
      Some(""),
      &[],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
  }

  #[test]
  fn package_add_vocabulary_and_subscriber() {
    let f = fixture();
    let mut pkg = package(&f, "Animals");
    let extra = vocabulary(&f);

    assert!(pkg.add_vocabulary(Some(&extra)).unwrap());
    assert!(!pkg.add_vocabulary(Some(&extra)).unwrap());
    assert_eq!(pkg.vocabularies.len(), 2);

    let reader = User::regular(Uuid::new_v4());
    assert!(pkg.add_subscriber(Some(&reader)).unwrap());
    assert!(!pkg.add_subscriber(Some(&reader)).unwrap());
    assert_eq!(pkg.subscribers.len(), 1);
  }

  #[test]
  fn package_rejects_inactive_vocabulary() {
    let f = fixture();
    let mut pkg = package(&f, "Animals");
    let mut gone = vocabulary(&f);
    gone.soft_delete().unwrap();
    assert_eq!(
      pkg.add_vocabulary(Some(&gone)).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
  }

  // ─── Folder ────────────────────────────────────────────────────────────────

  #[test]
  fn folder_attaches_packages() {
    let f = fixture();
    let first = package(&f, "Animals");
    let second = package(&f, "Colours");
    let folder = Folder::create_with_packages(
      "Beginner",
      Some(&f.author),
      Some(true),
      Some("first steps"),
      &[first.clone(), second.clone()],
    )
    .unwrap();
    assert_eq!(folder.packages, BTreeSet::from([first.id(), second.id()]));
  }

  #[test]
  fn folder_rejects_duplicate_packages() {
    let f = fixture();
    let pkg = package(&f, "Animals");
    let err = Folder::create_with_packages(
      "Beginner",
      Some(&f.author),
      Some(true),
      Some(""),
      &[pkg.clone(), pkg],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructuralViolation);
  }

  #[test]
  fn folder_add_package_is_idempotent() {
    let f = fixture();
    let mut folder = Folder::create_with_packages(
      "Beginner",
      Some(&f.author),
      Some(true),
      Some(""),
      &[package(&f, "Animals")],
    )
    .unwrap();
    let extra = package(&f, "Colours");
    assert!(folder.add_package(Some(&extra)).unwrap());
    assert!(!folder.add_package(Some(&extra)).unwrap());
    assert_eq!(folder.packages.len(), 2);
    assert_eq!(
      folder.add_package(None).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
  }
}
