//! The collection of all indexes, built in bounded parallel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::fs::File;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::index::{Index, IndexError, IndexLoader, KeyExtractor};
use crate::slicing;
use crate::source::SharedSource;

use super::error::JoinError;

/// Every index required by a join key, addressable by `(source, column)`
/// and by source.
///
/// Immutable after build. All indexes over one source share that
/// source's locked handle, so any of them can read the source's lines.
#[derive(Debug)]
pub struct IndexCache {
    by_location: HashMap<(usize, usize), Arc<Index>>,
    by_source: HashMap<usize, Vec<Arc<Index>>>,
    delimiter: String,
}

impl IndexCache {
    /// Returns the index over the zero-based `(src, col)` pair.
    pub fn get(&self, src: usize, col: usize) -> Option<&Arc<Index>> {
        self.by_location.get(&(src, col))
    }

    /// Returns all indexes over `src`; any one suffices to read lines.
    pub fn get_by_src(&self, src: usize) -> Option<&[Arc<Index>]> {
        self.by_source.get(&src).map(Vec::as_slice)
    }

    /// The delimiter every index was built with.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

/// Builds an [`IndexCache`] from the input files.
pub struct IndexCacheBuilder {
    sources: Vec<Arc<SharedSource>>,
    delimiter: String,
    locations: Vec<(usize, usize)>,
    jobs: usize,
    cache_capacity: usize,
}

impl IndexCacheBuilder {
    /// Creates a builder.
    ///
    /// `locations` are the zero-based `(source, column)` pairs the join
    /// key requires; duplicates are allowed. At most `jobs` sources are
    /// scanned concurrently; each built index gets a byte-range cache of
    /// `cache_capacity` entries.
    pub fn new(
        files: Vec<File>,
        locations: Vec<(usize, usize)>,
        delimiter: impl Into<String>,
        jobs: usize,
        cache_capacity: usize,
    ) -> Self {
        Self {
            sources: files
                .into_iter()
                .map(|f| Arc::new(SharedSource::new(f)))
                .collect(),
            delimiter: delimiter.into(),
            locations,
            jobs: jobs.max(1),
            cache_capacity,
        }
    }

    /// Scans every required source and assembles the cache.
    ///
    /// Each source is scanned exactly once no matter how many columns of
    /// it are indexed. The first failing scan cancels the others and is
    /// the error reported.
    pub async fn build(self, cancel: &CancellationToken) -> Result<IndexCache, JoinError> {
        debug!(
            sources = self.sources.len(),
            locations = self.locations.len(),
            "cache build: begin"
        );

        let pairs = slicing::uniq_by(self.locations.clone(), |p| *p);
        for &(src, col) in &pairs {
            if !slicing::in_range(&self.sources, src) {
                return Err(JoinError::InvalidKey {
                    src,
                    col,
                    sources: self.sources.len(),
                });
            }
        }

        // One scan per source, covering all of its columns.
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (src, col) in pairs {
            groups.entry(src).or_default().push(col);
        }

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let child = cancel.child_token();
        let mut tasks: JoinSet<Result<(usize, Vec<usize>, Vec<Arc<Index>>), IndexError>> =
            JoinSet::new();
        for (src, cols) in groups {
            let extractors: Vec<KeyExtractor> = cols
                .iter()
                .map(|&col| KeyExtractor::new(self.delimiter.clone(), col))
                .collect();
            let loader = IndexLoader::new(self.sources[src].clone(), self.cache_capacity);
            let semaphore = semaphore.clone();
            let token = child.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| IndexError::Cancelled)?;
                debug!(src, columns = cols.len(), "cache build: begin source");
                let result = loader.load(extractors, &token).await;
                if result.is_err() {
                    token.cancel();
                }
                debug!(src, "cache build: end source");
                result.map(|indexes| (src, cols, indexes))
            });
        }

        let mut by_location = HashMap::new();
        let mut by_source: HashMap<usize, Vec<Arc<Index>>> = HashMap::new();
        let mut failure: Option<IndexError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((src, cols, indexes))) => {
                    for (col, index) in cols.into_iter().zip(indexes) {
                        by_source.entry(src).or_default().push(index.clone());
                        by_location.insert((src, col), index);
                    }
                }
                Ok(Err(e)) => {
                    child.cancel();
                    record_failure(&mut failure, e);
                }
                Err(e) => {
                    error!(error = %e, "cache build: scan task failed");
                    child.cancel();
                    record_failure(&mut failure, IndexError::Cancelled);
                }
            }
        }
        if let Some(e) = failure {
            return Err(JoinError::Index(e));
        }

        debug!(indexes = by_location.len(), "cache build: end");
        Ok(IndexCache {
            by_location,
            by_source,
            delimiter: self.delimiter,
        })
    }
}

/// Keeps the first root cause: a later concrete failure replaces an
/// earlier `Cancelled`, nothing else is overwritten.
fn record_failure(current: &mut Option<IndexError>, new: IndexError) {
    match current {
        None => *current = Some(new),
        Some(IndexError::Cancelled) if !matches!(new, IndexError::Cancelled) => {
            *current = Some(new)
        }
        _ => {}
    }
}
