//! Shared read access to seekable byte sources.
//!
//! Every input file is wrapped once in a [`SharedSource`] that serializes
//! seeks and reads. Each index built over a source gets its own
//! [`CachedReader`], an LRU read-through cache of byte ranges, so that
//! repeated line reads during the join avoid touching the file.

pub mod cached;
pub mod error;
pub mod shared;

pub use cached::CachedReader;
pub use error::SourceError;
pub use shared::SharedSource;
