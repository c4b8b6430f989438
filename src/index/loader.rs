//! One-pass index construction.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::source::{CachedReader, SharedSource};

use super::core::{Index, KeyExtractor};
use super::error::IndexError;
use super::item::Item;

/// Builds indexes over one source.
///
/// A single sequential scan feeds any number of key extractors, so
/// several indexes over the same source cost one pass. The loader holds
/// the source's lock for the whole scan.
pub struct IndexLoader {
    source: Arc<SharedSource>,
    cache_capacity: usize,
}

impl IndexLoader {
    /// Creates a loader; each built index gets its own byte-range cache
    /// with `cache_capacity` entries.
    pub fn new(source: Arc<SharedSource>, cache_capacity: usize) -> Self {
        Self {
            source,
            cache_capacity,
        }
    }

    /// Scans the source once and returns one index per extractor, in
    /// the extractors' order.
    ///
    /// Lines are read up to `\n` or EOF; the recorded size includes the
    /// newline. Empty lines advance the offset but produce no items.
    /// Cancellation is checked before every line.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, non-UTF-8 lines, extractor rejections
    /// (annotated with extractor position and offset) and cancellation.
    pub async fn load(
        &self,
        extractors: Vec<KeyExtractor>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<Index>>, IndexError> {
        debug!(extractors = extractors.len(), "index load: begin");

        let mut maps: Vec<HashMap<String, Vec<Item>>> =
            extractors.iter().map(|_| HashMap::new()).collect();

        let mut file = self.source.lock().await;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(|source| IndexError::Io { offset: 0, source })?;

        let mut reader = BufReader::new(&mut *file);
        let mut offset: i64 = 0;
        let mut lines: u64 = 0;
        let mut buf = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Err(IndexError::Cancelled);
            }

            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|source| IndexError::Io { offset, source })?;
            if n == 0 {
                break;
            }
            lines += 1;

            let size = i32::try_from(n).map_err(|_| IndexError::LineTooLong { offset })?;
            let text = std::str::from_utf8(&buf)
                .map_err(|_| IndexError::InvalidUtf8 { offset })?;
            let line = text.strip_suffix('\n').unwrap_or(text);
            if line.is_empty() {
                offset += i64::from(size);
                continue;
            }

            for (i, extractor) in extractors.iter().enumerate() {
                let key = extractor.extract(line).map_err(|source| IndexError::Key {
                    index: i,
                    offset,
                    source,
                })?;
                trace!(extractor = i, key, offset, size, "index load: new item");
                maps[i]
                    .entry(key.to_string())
                    .or_default()
                    .push(Item::new(key, offset, size));
            }
            offset += i64::from(size);
        }
        drop(reader);
        drop(file);

        debug!(bytes = offset, lines, "index load: done");

        Ok(maps
            .into_iter()
            .zip(extractors)
            .map(|(entries, extractor)| {
                let data = CachedReader::new(self.cache_capacity, self.source.clone());
                Arc::new(Index::new(data, extractor, entries))
            })
            .collect())
    }
}
