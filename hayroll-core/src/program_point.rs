//! A point in a translation unit's symbolic execution: a node inside one
//! file of the include tree, snapshotted as a [`Span`] rather than a live
//! `tree_sitter::Node<'_>` so it can be stored on premise-tree nodes and
//! tags that outlive any single AST traversal. `span: None` represents the
//! end of the file.

use crate::ast_bank::AstBank;
use crate::include_tree::{IncludeForest, IncludeNodeId};
use crate::source_position::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramPoint {
    pub include_node: IncludeNodeId,
    pub span: Option<Span>,
}

impl ProgramPoint {
    pub fn new(include_node: IncludeNodeId, span: Span) -> Self {
        Self {
            include_node,
            span: Some(span),
        }
    }

    pub fn eof(include_node: IncludeNodeId) -> Self {
        Self {
            include_node,
            span: None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.span.is_none()
    }

    /// The enclosing node in the same file, or -- at a file's root node --
    /// the `#include` site that pulled this file into its parent.
    pub fn parent(&self, forest: &IncludeForest, bank: &AstBank) -> Option<ProgramPoint> {
        if let Some(span) = self.span {
            let tree = bank.find(forest.path(self.include_node))?;
            let node = tree
                .root_node()
                .descendant_for_byte_range(span.start_byte, span.end_byte)?;
            if let Some(parent_node) = node.parent() {
                return Some(ProgramPoint::new(
                    self.include_node,
                    Span::from_node(&parent_node),
                ));
            }
        }
        let parent_include = forest.parent(self.include_node)?;
        let include_site = forest.get(self.include_node).include_site?;
        Some(ProgramPoint::new(parent_include, include_site))
    }

    /// Whether `self` contains `other`. Same-file containment is an exact
    /// byte-range check; cross-file containment approximates to "other's
    /// file is reached through an include site somewhere under self's
    /// file", which is the case that matters for premise-tree scoping.
    pub fn contains(&self, other: &ProgramPoint, forest: &IncludeForest) -> bool {
        if self.include_node == other.include_node {
            return match (self.span, other.span) {
                (Some(a), Some(b)) => a.encloses(&b),
                (None, None) => true,
                _ => false,
            };
        }
        forest.is_ancestor_of(self.include_node, other.include_node)
    }

    /// Re-resolves this point to its live tree-sitter node, if the file is
    /// still in `bank` and the span still addresses a node.
    pub fn node<'a>(&self, forest: &IncludeForest, bank: &'a AstBank) -> Option<tree_sitter::Node<'a>> {
        let span = self.span?;
        let tree = bank.find(forest.path(self.include_node))?;
        tree.root_node()
            .descendant_for_byte_range(span.start_byte, span.end_byte)
    }

    pub fn display(&self, forest: &IncludeForest) -> String {
        match self.span {
            None => format!("{}:EOF", forest.path(self.include_node).display()),
            Some(span) => format!(
                "{}:{}~{}",
                forest.path(self.include_node).display(),
                span.start_point,
                span.end_point
            ),
        }
    }
}
