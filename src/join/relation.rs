//! Evaluation of a single equality predicate over a row stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::index::{Index, Item};
use crate::query::Relation;

use super::cache::IndexCache;
use super::row::Row;

/// Capacity of every row channel in the pipeline; bounds how far a
/// stage can run ahead of its consumer.
const ROW_CHANNEL_CAPACITY: usize = 100;

/// Joins rows along one equality predicate.
pub struct RelationJoiner {
    cache: Arc<IndexCache>,
}

impl RelationJoiner {
    /// Creates a joiner over the given index cache.
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self { cache }
    }

    fn indexes(&self, rel: &Relation) -> Option<(Arc<Index>, Arc<Index>)> {
        let Some(left) = self.cache.get(rel.left.src_index(), rel.left.col_index()) else {
            warn!(location = %rel.left, "join: left index not found");
            return None;
        };
        let Some(right) = self.cache.get(rel.right.src_index(), rel.right.col_index()) else {
            warn!(location = %rel.right, "join: right index not found");
            return None;
        };
        Some((left.clone(), right.clone()))
    }

    /// Produces the initial row stream for `rel` by probing the right
    /// index with every left item.
    ///
    /// Emission order is unspecified. A relation between two columns of
    /// the same source yields single-entry rows, the right side winning.
    pub fn full_join(&self, rel: &Relation, cancel: CancellationToken) -> mpsc::Receiver<Row> {
        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let Some((left_index, right_index)) = self.indexes(rel) else {
            return rx;
        };
        let rel = *rel;
        tokio::spawn(async move {
            let left_src = rel.left.src_index();
            let right_src = rel.right.src_index();
            let mut items = left_index.all_items(cancel.clone());
            while let Some(left_item) = items.recv().await {
                let key = left_item.key.clone();
                let mut base = Row::new();
                base.set(left_src, left_item);
                for right_item in right_index.get(&key) {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let row = base.with(right_src, right_item.clone());
                    debug!(relation = %rel, row = %row, "full join: emit");
                    if tx.send(row).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }

    /// Extends the rows of `input` along `rel`.
    ///
    /// Falls back to [`RelationJoiner::full_join`] when `input` is
    /// `None`. Every incoming row must cover the same set of sources as
    /// the first one; a mismatch ends the stream (the caller ordered
    /// predicates inconsistently). Read and key-extraction failures on a
    /// single row drop that row and keep the stream alive.
    pub fn join(
        &self,
        rel: &Relation,
        input: Option<mpsc::Receiver<Row>>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Row> {
        let Some(mut input) = input else {
            return self.full_join(rel, cancel);
        };

        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let Some((left_index, right_index)) = self.indexes(rel) else {
            return rx;
        };
        let rel = *rel;
        tokio::spawn(async move {
            let left_src = rel.left.src_index();
            let right_src = rel.right.src_index();
            let mut sources: Option<Vec<usize>> = None;
            while let Some(row) = input.recv().await {
                if cancel.is_cancelled() {
                    return;
                }

                match &sources {
                    None => sources = Some(row.sources()),
                    Some(expected) if *expected != row.sources() => {
                        error!(
                            want = ?expected,
                            got = ?row.sources(),
                            relation = %rel,
                            "join: inconsistent rows"
                        );
                        return;
                    }
                    Some(_) => {}
                }

                match (row.get(left_src).cloned(), row.get(right_src).cloned()) {
                    (Some(left_item), None) => {
                        let Some(key) = read_key(&left_index, &left_item, &rel, "left").await
                        else {
                            continue;
                        };
                        for right_item in right_index.get(&key) {
                            if cancel.is_cancelled() {
                                return;
                            }
                            let next = row.with(right_src, right_item.clone());
                            debug!(relation = %rel, row = %next, "join: extend right");
                            if tx.send(next).await.is_err() {
                                return;
                            }
                        }
                    }
                    (None, Some(right_item)) => {
                        let Some(key) = read_key(&right_index, &right_item, &rel, "right").await
                        else {
                            continue;
                        };
                        for left_item in left_index.get(&key) {
                            if cancel.is_cancelled() {
                                return;
                            }
                            let next = row.with(left_src, left_item.clone());
                            debug!(relation = %rel, row = %next, "join: extend left");
                            if tx.send(next).await.is_err() {
                                return;
                            }
                        }
                    }
                    (Some(left_item), Some(right_item)) => {
                        let Some(left_key) = read_key(&left_index, &left_item, &rel, "left").await
                        else {
                            continue;
                        };
                        let Some(right_key) =
                            read_key(&right_index, &right_item, &rel, "right").await
                        else {
                            continue;
                        };
                        if left_key == right_key {
                            debug!(relation = %rel, row = %row, "join: pass through");
                            if tx.send(row).await.is_err() {
                                return;
                            }
                        }
                    }
                    (None, None) => {
                        warn!(relation = %rel, row = %row, "join: row anchors neither side");
                    }
                }
            }
        });
        rx
    }
}

/// Reads the line behind `item` and extracts its join key.
///
/// Failures are logged at debug level and collapse to `None`; the
/// caller drops the affected row and moves on.
async fn read_key(index: &Index, item: &Item, rel: &Relation, side: &str) -> Option<String> {
    let scanned = match index.read(item).await {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, relation = %rel, side, "join: read failed");
            return None;
        }
    };
    match index.extractor().extract(&scanned.line) {
        Ok(key) => Some(key.to_string()),
        Err(e) => {
            debug!(error = %e, relation = %rel, side, "join: key extraction failed");
            None
        }
    }
}
