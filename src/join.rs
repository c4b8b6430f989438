//! The join engine: index cache, relation-by-relation join pipeline and
//! column selection.
//!
//! Sources are indexed once (in parallel, bounded), then the join key's
//! predicates are folded into a stream of partial rows which the
//! [`Selector`] renders into output lines.

pub mod cache;
pub mod error;
pub mod pipeline;
pub mod relation;
pub mod row;
pub mod selector;

pub use cache::{IndexCache, IndexCacheBuilder};
pub use error::JoinError;
pub use pipeline::Joiner;
pub use relation::RelationJoiner;
pub use row::Row;
pub use selector::{select_columns_by_range, select_columns_by_target, Selector};
