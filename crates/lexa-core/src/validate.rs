//! Precondition checks run before every construction or mutation.
//!
//! All checks are pure. Absence is modelled with `Option`; `None` and empty
//! inputs fail with [`Error::MissingValue`]. Structural rules fail with
//! [`Error::StructuralViolation`].

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
  Error, Result,
  aggregation::{Package, Vocabulary},
  content::{Language, Word},
  identity::{EntityKind, Identifiable, Privilege, SoftDeletable, User},
};

// ─── Scalars ─────────────────────────────────────────────────────────────────

/// Fails if `value` is empty or shorter than `min_length` characters.
pub fn require_non_empty_string<'a>(
  value: &'a str,
  what: &str,
  min_length: usize,
) -> Result<&'a str> {
  if value.is_empty() {
    return Err(Error::missing(format!("{what} is not submitted")));
  }
  if value.chars().count() < min_length {
    return Err(Error::structural(format!(
      "{what} must be at least {min_length} characters long"
    )));
  }
  Ok(value)
}

/// Fails only if the value is absent. Unlike a truthiness check, an explicit
/// `false` is accepted.
pub fn require_boolean(value: Option<bool>, what: &str) -> Result<bool> {
  value.ok_or_else(|| Error::missing(format!("{what} is not submitted")))
}

/// Fails if `value` is absent. Used for strings that must be provided but may
/// be empty, such as descriptions.
pub fn require_provided<'a, T: ?Sized>(
  value: Option<&'a T>,
  what: &str,
) -> Result<&'a T> {
  value.ok_or_else(|| Error::missing(format!("{what} is not submitted")))
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn require_privileged_user(
  user: Option<&User>,
  level: Privilege,
) -> Result<&User> {
  let user = user.ok_or_else(|| Error::missing("user is not submitted"))?;
  match level {
    Privilege::User => {}
    Privilege::Staff if !user.is_staff => {
      return Err(Error::PermissionDenied(format!(
        "user {} is not a staff member",
        user.id
      )));
    }
    Privilege::Superuser if !user.is_superuser => {
      return Err(Error::PermissionDenied(format!(
        "user {} is not a superuser",
        user.id
      )));
    }
    Privilege::Staff | Privilege::Superuser => {}
  }
  Ok(user)
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// Fails if an opaque identifier resolved to an entity of another kind.
pub fn require_kind(found: EntityKind, expected: EntityKind) -> Result<()> {
  if found != expected {
    return Err(Error::TypeMismatch { expected, found });
  }
  Ok(())
}

/// Fails if `entity` has been soft-deleted.
pub fn require_active<T>(entity: &T) -> Result<()>
where
  T: Identifiable + SoftDeletable,
{
  if !entity.is_active() {
    return Err(Error::structural(format!(
      "{} {} is inactive",
      entity.kind(),
      entity.id()
    )));
  }
  Ok(())
}

/// Fails if `value` is absent or inactive.
pub fn require_entity<'a, T>(value: Option<&'a T>, what: &str) -> Result<&'a T>
where
  T: Identifiable + SoftDeletable,
{
  let entity =
    value.ok_or_else(|| Error::missing(format!("{what} is not submitted")))?;
  require_active(entity)?;
  Ok(entity)
}

pub fn require_language(value: Option<&Language>) -> Result<&Language> {
  require_entity(value, "language")
}

/// Fails unless `value` is a word and, when `language` is given, belongs to
/// that language.
pub fn require_word(value: Option<&Word>, language: Option<Uuid>) -> Result<&Word> {
  let word = require_entity(value, "word")?;
  if let Some(language_id) = language {
    require_word_in(word, language_id)?;
  }
  Ok(word)
}

/// Fails unless exactly two distinct languages are given.
pub fn require_language_pair<'a>(
  first: Option<&'a Language>,
  second: Option<&'a Language>,
) -> Result<(&'a Language, &'a Language)> {
  let first = require_entity(first, "first language")?;
  let second = require_entity(second, "second language")?;
  if first.id() == second.id() {
    return Err(Error::structural("languages are the same"));
  }
  Ok((first, second))
}

pub fn require_vocabulary(value: Option<&Vocabulary>) -> Result<&Vocabulary> {
  require_entity(value, "vocabulary")
}

// ─── Sets ────────────────────────────────────────────────────────────────────

/// Fails unless `values` is a non-empty, duplicate-free set of active
/// entities, each satisfying `predicate`.
pub fn require_set<'a, T, F>(
  values: &'a [T],
  what: &str,
  predicate: F,
) -> Result<&'a [T]>
where
  T: Identifiable + SoftDeletable,
  F: Fn(&T) -> Result<()>,
{
  if values.is_empty() {
    return Err(Error::missing(format!("{what} must contain at least one member")));
  }

  let mut seen = BTreeSet::new();
  for value in values {
    if !seen.insert(value.id()) {
      return Err(Error::structural(format!(
        "{what} contains {} {} more than once",
        value.kind(),
        value.id()
      )));
    }
    require_active(value)?;
    predicate(value)?;
  }
  Ok(values)
}

/// Fails unless `values` is a non-empty set of words, all in `language` when
/// given.
pub fn require_word_set(values: &[Word], language: Option<Uuid>) -> Result<&[Word]> {
  require_set(values, "words", |word| match language {
    Some(language_id) => require_word_in(word, language_id),
    None => Ok(()),
  })
}

pub fn require_vocabulary_set(values: &[Vocabulary]) -> Result<&[Vocabulary]> {
  require_set(values, "vocabularies", |_| Ok(()))
}

pub fn require_package_set(values: &[Package]) -> Result<&[Package]> {
  require_set(values, "packages", |_| Ok(()))
}

fn require_word_in(word: &Word, language_id: Uuid) -> Result<()> {
  if word.language_id != language_id {
    return Err(Error::structural(format!(
      "word {:?} is not in language {language_id}",
      word.name
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  fn staff() -> User {
    User { id: Uuid::new_v4(), is_staff: true, is_superuser: false }
  }

  fn language(name: &str) -> Language {
    let author = User::regular(Uuid::new_v4());
    Language::create(name, Some(&author), Some(true)).unwrap()
  }

  fn word(name: &str, language: &Language) -> Word {
    let author = User::regular(Uuid::new_v4());
    Word::create(name, Some(language), Some(""), Some(&author), Some(true))
      .unwrap()
  }

  #[test]
  fn string_checks_distinguish_empty_from_short() {
    assert_eq!(
      require_non_empty_string("", "name", 0).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
    assert_eq!(
      require_non_empty_string("t", "name", 2).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
    assert_eq!(require_non_empty_string("ok", "name", 2).unwrap(), "ok");
  }

  #[test]
  fn string_length_counts_characters_not_bytes() {
    assert!(require_non_empty_string("日本", "name", 2).is_ok());
  }

  #[test]
  fn boolean_rejects_only_absence() {
    assert!(require_boolean(Some(true), "official").unwrap());
    assert!(!require_boolean(Some(false), "official").unwrap());
    assert_eq!(
      require_boolean(None, "official").unwrap_err().kind(),
      ErrorKind::MissingValue
    );
  }

  #[test]
  fn privilege_levels() {
    let regular = User::regular(Uuid::new_v4());
    let staff = staff();
    let root = User { id: Uuid::new_v4(), is_staff: true, is_superuser: true };

    assert!(require_privileged_user(Some(&regular), Privilege::User).is_ok());
    assert_eq!(
      require_privileged_user(None, Privilege::User).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
    assert_eq!(
      require_privileged_user(Some(&regular), Privilege::Staff)
        .unwrap_err()
        .kind(),
      ErrorKind::PermissionDenied
    );
    assert!(require_privileged_user(Some(&staff), Privilege::Staff).is_ok());
    assert_eq!(
      require_privileged_user(Some(&staff), Privilege::Superuser)
        .unwrap_err()
        .kind(),
      ErrorKind::PermissionDenied
    );
    assert!(require_privileged_user(Some(&root), Privilege::Superuser).is_ok());
  }

  #[test]
  fn kind_mismatch() {
    let err = require_kind(EntityKind::Word, EntityKind::Language).unwrap_err();
    assert_eq!(err, Error::TypeMismatch {
      expected: EntityKind::Language,
      found:    EntityKind::Word,
    });
    assert!(require_kind(EntityKind::Word, EntityKind::Word).is_ok());
  }

  #[test]
  fn language_pair_must_be_distinct() {
    let english = language("English");
    let spanish = language("Spanish");

    assert!(require_language_pair(Some(&english), Some(&spanish)).is_ok());
    assert_eq!(
      require_language_pair(Some(&english), Some(&english))
        .unwrap_err()
        .kind(),
      ErrorKind::StructuralViolation
    );
    assert_eq!(
      require_language_pair(Some(&english), None).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
  }

  #[test]
  fn word_membership() {
    let english = language("English");
    let spanish = language("Spanish");
    let dog = word("dog", &english);

    assert!(require_word(Some(&dog), Some(english.id())).is_ok());
    assert!(require_word(Some(&dog), None).is_ok());
    assert_eq!(
      require_word(Some(&dog), Some(spanish.id())).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
  }

  #[test]
  fn word_set_rules() {
    let english = language("English");
    let spanish = language("Spanish");
    let dog = word("dog", &english);
    let cat = word("cat", &english);
    let perro = word("perro", &spanish);

    assert!(require_word_set(&[dog.clone(), cat.clone()], Some(english.id())).is_ok());
    assert_eq!(
      require_word_set(&[], Some(english.id())).unwrap_err().kind(),
      ErrorKind::MissingValue
    );
    assert_eq!(
      require_word_set(&[dog.clone(), perro], Some(english.id()))
        .unwrap_err()
        .kind(),
      ErrorKind::StructuralViolation
    );
    assert_eq!(
      require_word_set(&[dog.clone(), dog], None).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
  }

  #[test]
  fn inactive_members_are_rejected() {
    let english = language("English");
    let mut dog = word("dog", &english);
    dog.soft_delete().unwrap();

    assert_eq!(
      require_word(Some(&dog), None).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
    assert_eq!(
      require_word_set(&[dog], None).unwrap_err().kind(),
      ErrorKind::StructuralViolation
    );
  }
}
