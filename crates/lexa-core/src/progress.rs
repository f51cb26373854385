//! Per-user learning progress on a vocabulary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  aggregation::Vocabulary,
  identity::{EntityKind, EntityMeta, Identifiable, Privilege, Timestamped, User, has_meta},
  validate::{require_active, require_privileged_user, require_vocabulary},
};

/// Score given to a freshly created learning record.
pub const INITIAL_SCORE: i64 = 1;

/// One user's progress on one vocabulary. At most one exists per
/// (user, vocabulary) pair; the store enforces that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
  pub meta:          EntityMeta,
  pub user_id:       Uuid,
  pub vocabulary_id: Uuid,
  pub score:         i64,
  /// The score before the most recent update.
  pub prev_score:    i64,
}

has_meta!(Learning, EntityKind::Learning);

impl Learning {
  pub fn create_with_vocabulary(
    user: Option<&User>,
    vocabulary: Option<&Vocabulary>,
  ) -> Result<Self> {
    let user = require_privileged_user(user, Privilege::User)?;
    let vocabulary = require_vocabulary(vocabulary)?;

    Ok(Self {
      meta: EntityMeta::new(),
      user_id: user.id,
      vocabulary_id: vocabulary.id(),
      score: INITIAL_SCORE,
      prev_score: INITIAL_SCORE,
    })
  }

  /// Shift the current score into `prev_score` and store `new_score`. How the
  /// new score is computed is up to the caller.
  pub fn record_score(&mut self, new_score: i64) -> Result<()> {
    require_active(self)?;
    self.prev_score = self.score;
    self.score = new_score;
    self.touch();
    Ok(())
  }

  pub fn same_content(&self, other: &Self) -> bool {
    self.user_id == other.user_id && self.vocabulary_id == other.vocabulary_id
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    ErrorKind,
    content::{Language, Word},
  };

  fn vocabulary(author: &User) -> Vocabulary {
    let english = Language::create("English", Some(author), Some(true)).unwrap();
    let spanish = Language::create("Spanish", Some(author), Some(true)).unwrap();
    let dog =
      Word::create("dog", Some(&english), Some(""), Some(author), Some(true))
        .unwrap();
    let perro =
      Word::create("perro", Some(&spanish), Some(""), Some(author), Some(true))
        .unwrap();
    Vocabulary::create_with_words(
      Some(&english),
      Some(&spanish),
      &[dog],
      &[perro],
      Some(author),
      Some(true),
    )
    .unwrap()
  }

  #[test]
  fn create_starts_at_initial_score() {
    let learner = User::regular(Uuid::new_v4());
    let vocab = vocabulary(&learner);
    let learning = Learning::create_with_vocabulary(Some(&learner), Some(&vocab))
      .unwrap();

    assert_eq!(learning.user_id, learner.id);
    assert_eq!(learning.vocabulary_id, vocab.id());
    assert_eq!(learning.score, 1);
    assert_eq!(learning.prev_score, 1);
  }

  #[test]
  fn create_requires_user_and_vocabulary() {
    let learner = User::regular(Uuid::new_v4());
    let vocab = vocabulary(&learner);

    assert_eq!(
      Learning::create_with_vocabulary(None, Some(&vocab))
        .unwrap_err()
        .kind(),
      ErrorKind::MissingValue
    );
    assert_eq!(
      Learning::create_with_vocabulary(Some(&learner), None)
        .unwrap_err()
        .kind(),
      ErrorKind::MissingValue
    );
  }

  #[test]
  fn record_score_keeps_one_step_of_history() {
    let learner = User::regular(Uuid::new_v4());
    let vocab = vocabulary(&learner);
    let mut learning =
      Learning::create_with_vocabulary(Some(&learner), Some(&vocab)).unwrap();

    learning.record_score(4).unwrap();
    assert_eq!((learning.prev_score, learning.score), (1, 4));
    learning.record_score(2).unwrap();
    assert_eq!((learning.prev_score, learning.score), (4, 2));
  }
}
