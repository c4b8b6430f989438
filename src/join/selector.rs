//! Column selection: turning a row and a target into an output line.

use std::sync::Arc;

use tracing::trace;

use crate::query::{Range, Target};
use crate::slicing;

use super::cache::IndexCache;
use super::error::JoinError;
use super::row::Row;

/// Selects the columns of one range from the split sources.
///
/// `sources` is indexed positionally: element 0 is the lowest-numbered
/// source of the row, element 1 the next, and so on. Range locations
/// address that dense numbering.
pub fn select_columns_by_range(
    range: &Range,
    sources: &[Vec<String>],
) -> Result<Vec<String>, JoinError> {
    let (lo, hi) = range.bounds();
    if !(slicing::in_range(sources, lo.src) && slicing::in_range(sources, hi.src - 1)) {
        return Err(JoinError::OutOfRange(format!(
            "range {range} does not fit {} sources",
            sources.len()
        )));
    }

    let srcs = slicing::interval(sources, lo.src, hi.src);
    match srcs {
        [] => Ok(Vec::new()),
        [only] => Ok(slicing::interval(only, lo.col, hi.col).to_vec()),
        [first, last] => Ok(slicing::flat(&[
            slicing::left(first, lo.col),
            slicing::right(last, hi.col),
        ])),
        [first, middle @ .., last] => {
            let mut parts: Vec<&[String]> = Vec::with_capacity(middle.len() + 2);
            parts.push(slicing::left(first, lo.col));
            for src in middle {
                parts.push(src.as_slice());
            }
            parts.push(slicing::right(last, hi.col));
            Ok(slicing::flat(&parts))
        }
    }
}

/// Selects the columns of every range of the target, in order.
///
/// Duplicate ranges yield duplicate columns.
pub fn select_columns_by_target(
    target: &Target,
    sources: &[Vec<String>],
) -> Result<Vec<String>, JoinError> {
    let mut selected = Vec::new();
    for range in &target.ranges {
        selected.extend(select_columns_by_range(range, sources)?);
    }
    Ok(selected)
}

/// Renders joined rows into output lines.
pub struct Selector {
    cache: Arc<IndexCache>,
}

impl Selector {
    /// Creates a selector over the given index cache.
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self { cache }
    }

    /// Materializes the row's lines and projects the target onto them.
    ///
    /// The row's sources are taken in ascending order and re-numbered
    /// densely from 1, so target locations address the row's position,
    /// not the absolute source number.
    pub async fn select(&self, target: &Target, row: &Row) -> Result<String, JoinError> {
        let mut lines: Vec<Vec<String>> = Vec::with_capacity(row.len());
        for (src, item) in row.items() {
            let index = self
                .cache
                .get_by_src(src)
                .and_then(|indexes| indexes.first())
                .ok_or_else(|| {
                    JoinError::OutOfRange(format!("source {} is not indexed", src + 1))
                })?;
            let scanned = index.read(item).await?;
            lines.push(
                scanned
                    .line
                    .split(self.cache.delimiter())
                    .map(str::to_string)
                    .collect(),
            );
        }

        let selected = select_columns_by_target(target, &lines)?;
        trace!(row = %row, columns = selected.len(), "select");
        Ok(selected.join(self.cache.delimiter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::cache::IndexCacheBuilder;
    use crate::query::{parse_target, Location};
    use std::io::Write;
    use tokio::fs::File;
    use tokio_util::sync::CancellationToken;

    fn matrix() -> Vec<Vec<String>> {
        vec![
            vec!["11".into(), "12".into(), "13".into()],
            vec!["21".into(), "22".into(), "23".into()],
            vec!["31".into(), "32".into(), "33".into()],
        ]
    }

    fn single(src: u32, col: u32) -> Range {
        Range::Single(Location::new(src, col))
    }

    #[test]
    fn test_range_single() {
        let got = select_columns_by_range(&single(1, 1), &matrix()).unwrap();
        assert_eq!(got, vec!["11"]);
    }

    #[test]
    fn test_range_left() {
        let got =
            select_columns_by_range(&Range::Left(Location::new(2, 2)), &matrix()).unwrap();
        assert_eq!(got, vec!["22", "23"]);
    }

    #[test]
    fn test_range_right() {
        let got =
            select_columns_by_range(&Range::Right(Location::new(3, 2)), &matrix()).unwrap();
        assert_eq!(got, vec!["31", "32"]);
    }

    #[test]
    fn test_range_interval() {
        let got = select_columns_by_range(
            &Range::Interval(Location::new(1, 1), Location::new(1, 2)),
            &matrix(),
        )
        .unwrap();
        assert_eq!(got, vec!["11", "12"]);
    }

    #[test]
    fn test_range_interval_over_two_sources() {
        let got = select_columns_by_range(
            &Range::Interval(Location::new(1, 1), Location::new(2, 2)),
            &matrix(),
        )
        .unwrap();
        assert_eq!(got, vec!["11", "12", "13", "21", "22"]);
    }

    #[test]
    fn test_range_interval_over_three_sources() {
        let got = select_columns_by_range(
            &Range::Interval(Location::new(1, 2), Location::new(3, 1)),
            &matrix(),
        )
        .unwrap();
        // The middle source is taken in full.
        assert_eq!(got, vec!["12", "13", "21", "22", "23", "31"]);
    }

    #[test]
    fn test_range_out_of_range() {
        let err = select_columns_by_range(&single(10, 1), &matrix()).unwrap_err();
        assert!(matches!(err, JoinError::OutOfRange(_)));
    }

    #[test]
    fn test_range_column_saturates() {
        let got = select_columns_by_range(&single(1, 9), &matrix()).unwrap();
        assert_eq!(got, Vec::<String>::new());
    }

    #[test]
    fn test_target_empty() {
        let got = select_columns_by_target(&Target::default(), &matrix()).unwrap();
        assert_eq!(got, Vec::<String>::new());
    }

    #[test]
    fn test_target_preserves_order_and_duplicates() {
        let target = Target::new(vec![single(1, 1), single(2, 3), single(1, 3), single(1, 1)]);
        let got = select_columns_by_target(&target, &matrix()).unwrap();
        assert_eq!(got, vec!["11", "23", "13", "11"]);
    }

    #[test]
    fn test_target_length_is_sum_of_ranges() {
        let ranges = vec![
            single(1, 2),
            Range::Left(Location::new(2, 1)),
            Range::Interval(Location::new(1, 1), Location::new(2, 2)),
        ];
        let sum: usize = ranges
            .iter()
            .map(|r| select_columns_by_range(r, &matrix()).unwrap().len())
            .sum();
        let got = select_columns_by_target(&Target::new(ranges), &matrix()).unwrap();
        assert_eq!(got.len(), sum);
    }

    fn temp_file(content: &str) -> File {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        File::from_std(tmp)
    }

    #[tokio::test]
    async fn test_select_renders_row() {
        let files = vec![temp_file("p,x,1\n"), temp_file("p,y,2\n")];
        let cache = Arc::new(
            IndexCacheBuilder::new(files, vec![(0, 0), (1, 0)], ",", 4, 16)
                .build(&CancellationToken::new())
                .await
                .unwrap(),
        );
        let selector = Selector::new(cache.clone());

        let mut row = Row::new();
        row.set(0, cache.get(0, 0).unwrap().get("p")[0].clone());
        row.set(1, cache.get(1, 0).unwrap().get("p")[0].clone());

        let target = parse_target("1.2,2.1,1.1,2.3").unwrap();
        let line = selector.select(&target, &row).await.unwrap();
        assert_eq!(line, "x,p,p,2");
    }

    #[tokio::test]
    async fn test_select_densifies_sources() {
        // The row skips source 2; target "2.x" addresses the third
        // input because the row is re-numbered densely.
        let files = vec![temp_file("p,x\n"), temp_file("q,y\n"), temp_file("p,z\n")];
        let cache = Arc::new(
            IndexCacheBuilder::new(files, vec![(0, 0), (1, 0), (2, 0)], ",", 4, 16)
                .build(&CancellationToken::new())
                .await
                .unwrap(),
        );
        let selector = Selector::new(cache.clone());

        let mut row = Row::new();
        row.set(0, cache.get(0, 0).unwrap().get("p")[0].clone());
        row.set(2, cache.get(2, 0).unwrap().get("p")[0].clone());

        let target = parse_target("2.2").unwrap();
        let line = selector.select(&target, &row).await.unwrap();
        assert_eq!(line, "z");
    }

    #[tokio::test]
    async fn test_select_out_of_range_target() {
        let files = vec![temp_file("p,x\n")];
        let cache = Arc::new(
            IndexCacheBuilder::new(files, vec![(0, 0)], ",", 4, 16)
                .build(&CancellationToken::new())
                .await
                .unwrap(),
        );
        let selector = Selector::new(cache.clone());

        let mut row = Row::new();
        row.set(0, cache.get(0, 0).unwrap().get("p")[0].clone());

        let target = parse_target("2.1").unwrap();
        let err = selector.select(&target, &row).await.unwrap_err();
        assert!(matches!(err, JoinError::OutOfRange(_)));
    }
}
