//! Core types and trait definitions for the Lexa vocabulary store.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the entities, the validation rules every construction and mutation
//! runs through, and the [`store::LexiconStore`] abstraction backends
//! implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregation;
pub mod content;
pub mod error;
pub mod identity;
pub mod progress;
pub mod store;
pub mod validate;

pub use error::{Error, ErrorKind, Result};
