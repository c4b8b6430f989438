//! Folding a join key into one row stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::query::JoinKey;

use super::cache::IndexCache;
use super::relation::RelationJoiner;
use super::row::Row;

/// Runs a whole join key as a pipeline of relation stages.
pub struct Joiner {
    relations: RelationJoiner,
}

impl Joiner {
    /// Creates a joiner over the given index cache.
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self {
            relations: RelationJoiner::new(cache),
        }
    }

    /// Returns the stream of complete rows for `key`.
    ///
    /// Predicates are evaluated in their given order, each stage feeding
    /// the next; there is no reordering or plan-time deduplication. An
    /// empty key logs an error and yields a closed, empty stream.
    pub fn join(&self, key: &JoinKey, cancel: CancellationToken) -> mpsc::Receiver<Row> {
        let Some((first, rest)) = key.relations.split_first() else {
            error!("join: empty key");
            let (_, rx) = mpsc::channel(1);
            return rx;
        };

        let mut stream = self.relations.full_join(first, cancel.clone());
        for rel in rest {
            stream = self.relations.join(rel, Some(stream), cancel.clone());
        }
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::cache::IndexCacheBuilder;
    use crate::query::parse_join_key;
    use std::io::Write;
    use tokio::fs::File;

    fn temp_file(content: &str) -> File {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        File::from_std(tmp)
    }

    async fn rows_for(contents: &[&str], key: &str) -> Vec<Row> {
        let key = parse_join_key(key).unwrap();
        let files = contents.iter().map(|c| temp_file(c)).collect();
        let cache = Arc::new(
            IndexCacheBuilder::new(files, key.locations(), ",", 4, 16)
                .build(&CancellationToken::new())
                .await
                .unwrap(),
        );
        let joiner = Joiner::new(cache);
        let mut rx = joiner.join(&key, CancellationToken::new());
        let mut rows = Vec::new();
        while let Some(row) = rx.recv().await {
            rows.push(row);
        }
        rows
    }

    #[tokio::test]
    async fn test_single_relation() {
        let rows = rows_for(&["a,x\np,y\n", "p,1\n"], "1.1=2.1").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sources(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_two_relations_chain() {
        let rows = rows_for(
            &["p,x\nq,y\n", "p,m\nq,n\n", "m,1\nn,2\n"],
            "1.1=2.1,2.2=3.1",
        )
        .await;
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.sources(), vec![0, 1, 2]);
        }
    }

    #[tokio::test]
    async fn test_duplicate_relation_is_identity() {
        let once = rows_for(&["p,x\n", "p,1\np,2\n"], "1.1=2.1").await;
        let twice = rows_for(&["p,x\n", "p,1\np,2\n"], "1.1=2.1,1.1=2.1").await;

        let mut once: Vec<String> = once.iter().map(|r| r.to_string()).collect();
        let mut twice: Vec<String> = twice.iter().map(|r| r.to_string()).collect();
        once.sort();
        twice.sort();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_empty_key_is_empty_stream() {
        let files = vec![temp_file("a,b\n")];
        let cache = Arc::new(
            IndexCacheBuilder::new(files, vec![(0, 0)], ",", 4, 16)
                .build(&CancellationToken::new())
                .await
                .unwrap(),
        );
        let joiner = Joiner::new(cache);
        let mut rx = joiner.join(&JoinKey::default(), CancellationToken::new());
        assert!(rx.recv().await.is_none());
    }
}
