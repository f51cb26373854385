//! Identity, timestamps and soft deletion shared by every entity.
//!
//! Each entity embeds an [`EntityMeta`] and exposes it through [`HasMeta`];
//! the capability traits [`Identifiable`], [`Timestamped`] and
//! [`SoftDeletable`] are implemented on top of that, so storage code can be
//! generic over exactly the capabilities it needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The entity family an identifier belongs to. The snake_case form is the tag
/// persisted next to every identifier.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Language,
  WordContext,
  Word,
  VocabularyContext,
  Vocabulary,
  Package,
  Folder,
  Learning,
}

// ─── Meta ────────────────────────────────────────────────────────────────────

/// The base shape carried by every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
  /// Assigned at creation; never changes.
  pub id:         Uuid,
  pub created_at: DateTime<Utc>,
  /// Refreshed on every mutation.
  pub updated_at: DateTime<Utc>,
  /// `false` once soft-deleted.
  pub active:     bool,
}

impl EntityMeta {
  /// Issue a fresh identifier with both timestamps set to now.
  pub fn new() -> Self {
    let now = Utc::now();
    Self { id: Uuid::new_v4(), created_at: now, updated_at: now, active: true }
  }

  /// Bump `updated_at`. Never moves it backwards, even if the wall clock does.
  pub fn touch(&mut self) {
    let now = Utc::now();
    if now > self.updated_at {
      self.updated_at = now;
    }
  }
}

impl Default for EntityMeta {
  fn default() -> Self { Self::new() }
}

// ─── Capabilities ────────────────────────────────────────────────────────────

/// Access to the embedded [`EntityMeta`]. Implementing this yields the three
/// capability traits below.
pub trait HasMeta {
  const KIND: EntityKind;

  fn meta(&self) -> &EntityMeta;
  fn meta_mut(&mut self) -> &mut EntityMeta;
}

pub trait Identifiable {
  fn kind(&self) -> EntityKind;
  fn id(&self) -> Uuid;
}

pub trait Timestamped {
  fn created_at(&self) -> DateTime<Utc>;
  fn updated_at(&self) -> DateTime<Utc>;
  fn touch(&mut self);
}

pub trait SoftDeletable {
  fn is_active(&self) -> bool;

  /// Flip the entity to inactive. Fails if it already is; there is no
  /// restore.
  fn soft_delete(&mut self) -> Result<()>;
}

impl<T: HasMeta> Identifiable for T {
  fn kind(&self) -> EntityKind { T::KIND }

  fn id(&self) -> Uuid { self.meta().id }
}

impl<T: HasMeta> Timestamped for T {
  fn created_at(&self) -> DateTime<Utc> { self.meta().created_at }

  fn updated_at(&self) -> DateTime<Utc> { self.meta().updated_at }

  fn touch(&mut self) { self.meta_mut().touch() }
}

impl<T: HasMeta> SoftDeletable for T {
  fn is_active(&self) -> bool { self.meta().active }

  fn soft_delete(&mut self) -> Result<()> {
    let meta = self.meta_mut();
    if !meta.active {
      return Err(Error::structural(format!(
        "{} {} is already inactive",
        T::KIND,
        meta.id
      )));
    }
    meta.active = false;
    meta.touch();
    Ok(())
  }
}

/// Whether `a` and `b` denote the same stored entity, regardless of content.
pub fn same_identity<A, B>(a: &A, b: &B) -> bool
where
  A: Identifiable + ?Sized,
  B: Identifiable + ?Sized,
{
  a.kind() == b.kind() && a.id() == b.id()
}

/// Implements [`HasMeta`] for a struct with a `meta: EntityMeta` field.
macro_rules! has_meta {
  ($ty:ty, $kind:expr) => {
    impl $crate::identity::HasMeta for $ty {
      const KIND: $crate::identity::EntityKind = $kind;

      fn meta(&self) -> &$crate::identity::EntityMeta { &self.meta }

      fn meta_mut(&mut self) -> &mut $crate::identity::EntityMeta {
        &mut self.meta
      }
    }
  };
}

pub(crate) use has_meta;

// ─── User ────────────────────────────────────────────────────────────────────

/// An opaque reference to a user, supplied by the identity collaborator.
/// Only the id is ever persisted; the flags are read for permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:           Uuid,
  #[serde(default)]
  pub is_staff:     bool,
  #[serde(default)]
  pub is_superuser: bool,
}

impl User {
  /// A regular user with no elevated flags.
  pub fn regular(id: Uuid) -> Self {
    Self { id, is_staff: false, is_superuser: false }
  }
}

/// The privilege level demanded by
/// [`require_privileged_user`](crate::validate::require_privileged_user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
  User,
  Staff,
  Superuser,
}
