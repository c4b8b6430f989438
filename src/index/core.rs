//! Read-only inverted index over one source.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::source::CachedReader;

use super::error::{IndexError, KeyExtractError};
use super::item::{Item, ScannedItem};

/// Capacity of the channels returned by [`Index::scan`] and
/// [`Index::all_items`].
const SCAN_CHANNEL_CAPACITY: usize = 100;

/// Extracts the join key from a line: split on the literal delimiter,
/// take one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExtractor {
    delimiter: String,
    column: usize,
}

impl KeyExtractor {
    /// Creates an extractor for the zero-based `column`.
    pub fn new(delimiter: impl Into<String>, column: usize) -> Self {
        Self {
            delimiter: delimiter.into(),
            column,
        }
    }

    /// Returns the extracted column value.
    ///
    /// The split is literal, non-overlapping and left-to-right; there is
    /// no quoting or escaping. Fails when the line has fewer than
    /// `column + 1` fields.
    pub fn extract<'a>(&self, line: &'a str) -> Result<&'a str, KeyExtractError> {
        line.split(self.delimiter.as_str())
            .nth(self.column)
            .ok_or_else(|| KeyExtractError {
                column: self.column + 1,
                delimiter: self.delimiter.clone(),
                line: line.to_string(),
            })
    }
}

/// An in-memory key-to-lines index.
///
/// Immutable after build; lookups need no synchronization. The
/// underlying source must also stay unchanged for the index's lifetime.
#[derive(Debug)]
pub struct Index {
    data: CachedReader,
    extractor: KeyExtractor,
    entries: HashMap<String, Vec<Item>>,
}

impl Index {
    /// Assembles an index from a frozen entry map.
    pub(crate) fn new(
        data: CachedReader,
        extractor: KeyExtractor,
        entries: HashMap<String, Vec<Item>>,
    ) -> Self {
        Self {
            data,
            extractor,
            entries,
        }
    }

    /// The key extractor this index was built with.
    pub fn extractor(&self) -> &KeyExtractor {
        &self.extractor
    }

    /// Returns the items recorded for `key`, empty when the key is
    /// absent. Items keep their insertion order.
    pub fn get(&self, key: &str) -> &[Item] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads the line behind `item` through the byte-range cache.
    pub async fn read(&self, item: &Item) -> Result<ScannedItem, IndexError> {
        let bytes = self
            .data
            .read(item.offset, item.size)
            .await
            .map_err(|source| IndexError::Read {
                key: item.key.clone(),
                offset: item.offset,
                size: item.size,
                source,
            })?;
        let text = std::str::from_utf8(&bytes).map_err(|_| IndexError::InvalidUtf8 {
            offset: item.offset,
        })?;
        let line = text.strip_suffix('\n').unwrap_or(text);
        trace!(key = %item.key, offset = item.offset, size = item.size, "index read");
        Ok(ScannedItem::new(line, item.clone()))
    }

    /// Streams every item without reading its line.
    ///
    /// The order is unspecified but stable for an unchanged index.
    pub fn all_items(self: Arc<Self>, cancel: CancellationToken) -> mpsc::Receiver<Item> {
        let (tx, rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for items in self.entries.values() {
                for item in items {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if tx.send(item.clone()).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }

    /// Streams every item together with its line text.
    ///
    /// A read failure is logged and ends the stream early.
    pub fn scan(self: Arc<Self>, cancel: CancellationToken) -> mpsc::Receiver<ScannedItem> {
        let (tx, rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
        let index = self;
        tokio::spawn(async move {
            for items in index.entries.values() {
                for item in items {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let scanned = match index.read(item).await {
                        Ok(s) => s,
                        Err(e) => {
                            error!(error = %e, "scan: failed to read item");
                            return;
                        }
                    };
                    if tx.send(scanned).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }
}
