//! Per-source inverted indexes over delimited lines.
//!
//! An [`Index`] maps a column value to the byte spans of the lines that
//! carry it. [`IndexLoader`] builds one or more indexes over a source in
//! a single sequential scan; records are later read back on demand
//! through an LRU byte-range cache.

pub mod core;
pub mod error;
pub mod item;
pub mod loader;

pub use core::{Index, KeyExtractor};
pub use error::{IndexError, KeyExtractError};
pub use item::{Item, ScannedItem};
pub use loader::IndexLoader;
