//! Index records.

/// One indexed line: the extracted key plus the line's byte span.
///
/// `[offset, offset + size)` covers the original line including its
/// trailing newline (or up to EOF for an unterminated last line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The extracted column value.
    pub key: String,
    /// Byte position of the line's first byte in the source.
    pub offset: i64,
    /// Length of the line in bytes, newline included.
    pub size: i32,
}

impl Item {
    /// Creates a new item.
    pub fn new(key: impl Into<String>, offset: i64, size: i32) -> Self {
        Self {
            key: key.into(),
            offset,
            size,
        }
    }
}

/// A materialized line paired with the item it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedItem {
    /// The line text, trailing newline stripped.
    pub line: String,
    /// The originating item.
    pub item: Item,
}

impl ScannedItem {
    /// Creates a new scanned item.
    pub fn new(line: impl Into<String>, item: Item) -> Self {
        Self {
            line: line.into(),
            item,
        }
    }
}
