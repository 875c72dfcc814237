//! Source positions and byte/point ranges shared across the include tree,
//! program points, and the line mapper.

use serde::{Deserialize, Serialize};

/// A (row, column) pair. 1-based on any text handed to a human or serialized
/// into a [`crate::tags::Tag`]; 0-based internally (matching tree-sitter's
/// own `Point`, which this type mirrors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub row: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Convert to 1-based coordinates for display or for tag/manifest output.
    pub fn to_one_based(self) -> (u32, u32) {
        (self.row + 1, self.column + 1)
    }

    pub fn from_ts_point(p: tree_sitter::Point) -> Self {
        Self {
            row: p.row as u32,
            column: p.column as u32,
        }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A byte range plus its row/column span, snapshotted out of a tree-sitter
/// node so it can outlive the borrowed `Node<'_>` it was read from, as an
/// owning handle in place of a raw AST pointer:
/// [`crate::ast_bank::AstBank`] keeps every parsed [`tree_sitter::Tree`]
/// alive for the run, and a `Span` can always be turned back into a live
/// `Node` via `Tree::root_node().descendant_for_byte_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: SourcePosition,
    pub end_point: SourcePosition,
}

impl Span {
    pub fn from_node(node: &tree_sitter::Node) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_point: SourcePosition::from_ts_point(node.start_position()),
            end_point: SourcePosition::from_ts_point(node.end_position()),
        }
    }

    /// Whether `self` encloses `other` (inclusive byte bounds on both ends,
    /// matching `ProgramPoint::contains`'s use of `startByte <= .. && endByte >= ..`).
    pub fn encloses(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && self.end_byte >= other.end_byte
    }
}
