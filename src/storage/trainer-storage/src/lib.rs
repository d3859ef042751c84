//! # Trainer Storage
//!
//! Key/value storage abstraction standing in for the browser's cookie jar
//! and local store.
//!
//! Provides the [`StorageBackend`] trait and an in-memory implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::MemoryBackend;
