//! Abstract syntax of join keys and targets.
//!
//! Sources and columns are 1-based in the surface syntax. The engine
//! works zero-based throughout; [`Location::src_index`],
//! [`Location::col_index`] and [`Range::bounds`] perform the conversion
//! at the boundary.

use std::fmt;

/// A column of a source: `source.column`, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// 1-based source number.
    pub src: u32,
    /// 1-based column number.
    pub col: u32,
}

impl Location {
    /// Creates a new location. Both numbers must be at least 1.
    pub fn new(src: u32, col: u32) -> Self {
        Self { src, col }
    }

    /// Zero-based source index.
    pub fn src_index(&self) -> usize {
        self.src as usize - 1
    }

    /// Zero-based column index.
    pub fn col_index(&self) -> usize {
        self.col as usize - 1
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.src, self.col)
    }
}

/// An equality predicate between two locations, like SQL `join on left = right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub left: Location,
    pub right: Location,
}

impl Relation {
    /// Creates a new relation.
    pub fn new(left: Location, right: Location) -> Self {
        Self { left, right }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.left, self.right)
    }
}

/// An ordered conjunction of equality predicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinKey {
    pub relations: Vec<Relation>,
}

impl JoinKey {
    /// Creates a new join key.
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// Returns the zero-based `(source, column)` pairs of every
    /// relation side, in order. Duplicates are preserved.
    pub fn locations(&self) -> Vec<(usize, usize)> {
        self.relations
            .iter()
            .flat_map(|r| {
                [
                    (r.left.src_index(), r.left.col_index()),
                    (r.right.src_index(), r.right.col_index()),
                ]
            })
            .collect()
    }
}

/// A zero-based position used as one end of a half-open column range.
///
/// `col == usize::MAX` stands for "all remaining columns".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    /// Zero-based source index. As the upper bound, exclusive.
    pub src: usize,
    /// Zero-based column index. As the upper bound, exclusive.
    pub col: usize,
}

/// A contiguous set of columns, possibly spanning sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    /// One column: `1.2`.
    Single(Location),
    /// From the column to the end of its source: `1.2-`.
    Left(Location),
    /// From column 1 of the source up to and including the column: `-1.2`.
    Right(Location),
    /// Inclusive interval, spanning sources when the ends differ: `1.2-2.3`.
    Interval(Location, Location),
}

impl Range {
    /// Returns the zero-based half-open `[lo, hi)` bounds of this range.
    ///
    /// `hi.src` is exclusive; `hi.col == usize::MAX` selects all
    /// remaining columns of the last source.
    pub fn bounds(&self) -> (Cut, Cut) {
        match self {
            Range::Single(loc) => (
                Cut {
                    src: loc.src_index(),
                    col: loc.col_index(),
                },
                Cut {
                    src: loc.src as usize,
                    col: loc.col as usize,
                },
            ),
            Range::Left(loc) => (
                Cut {
                    src: loc.src_index(),
                    col: loc.col_index(),
                },
                Cut {
                    src: loc.src as usize,
                    col: usize::MAX,
                },
            ),
            Range::Right(loc) => (
                Cut {
                    src: loc.src_index(),
                    col: 0,
                },
                Cut {
                    src: loc.src as usize,
                    col: loc.col as usize,
                },
            ),
            Range::Interval(a, b) => (
                Cut {
                    src: a.src_index(),
                    col: a.col_index(),
                },
                Cut {
                    src: b.src as usize,
                    col: b.col as usize,
                },
            ),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Single(loc) => write!(f, "{loc}"),
            Range::Left(loc) => write!(f, "{loc}-"),
            Range::Right(loc) => write!(f, "-{loc}"),
            Range::Interval(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

/// An ordered list of ranges; defines the output projection.
///
/// Order and duplicates are significant: columns are emitted exactly as
/// listed, repeating a column listed twice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Target {
    pub ranges: Vec<Range>,
}

impl Target {
    /// Creates a new target.
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }
}
