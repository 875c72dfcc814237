//! Owns every parsed [`tree_sitter::Tree`] for one run, keyed by file path,
//! so that a [`crate::source_position::Span`] can always be turned back
//! into a live `tree_sitter::Node` via `descendant_for_byte_range` without
//! borrowing from whoever produced the span.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tree_sitter::{Parser, Tree};

use crate::error::{HayrollError, Result};

pub struct AstBank {
    parser: Parser,
    bank: HashMap<PathBuf, (String, Tree)>,
    anonymous: Vec<(String, Tree)>,
}

impl AstBank {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .map_err(|e| HayrollError::Internal(format!("tree-sitter-c grammar load failed: {e}")))?;
        Ok(Self {
            parser,
            bank: HashMap::new(),
            anonymous: Vec::new(),
        })
    }

    /// Reads and parses a file from disk, storing it under its path.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> Result<&Tree> {
        let path = path.into();
        let src = std::fs::read_to_string(&path)?;
        self.insert(path, src)
    }

    /// Parses already-loaded source text (e.g. the output of running the
    /// external preprocessor on a unit) under a synthetic path.
    pub fn add_source(&mut self, path: impl Into<PathBuf>, src: String) -> Result<&Tree> {
        self.insert(path.into(), src)
    }

    fn insert(&mut self, path: PathBuf, src: String) -> Result<&Tree> {
        let tree = self
            .parser
            .parse(&src, None)
            .ok_or_else(|| HayrollError::Internal(format!("failed to parse {}", path.display())))?;
        self.bank.insert(path.clone(), (src, tree));
        Ok(&self.bank.get(&path).unwrap().1)
    }

    /// Parses a macro body or other fragment with no source file of its
    /// own; used by the macro expander when re-lexing an expansion result.
    pub fn add_anonymous(&mut self, src: String) -> Result<&Tree> {
        let tree = self
            .parser
            .parse(&src, None)
            .ok_or_else(|| HayrollError::Internal("failed to parse anonymous fragment".into()))?;
        self.anonymous.push((src, tree));
        Ok(&self.anonymous.last().unwrap().1)
    }

    pub fn find(&self, path: impl AsRef<Path>) -> Option<&Tree> {
        self.bank.get(path.as_ref()).map(|(_, t)| t)
    }

    pub fn source(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.bank.get(path.as_ref()).map(|(s, _)| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_source_is_findable_and_reparses_to_same_text() {
        let mut bank = AstBank::new().unwrap();
        bank.add_source("unit.c", "int x;\n".to_string()).unwrap();
        assert!(bank.find("unit.c").is_some());
        assert_eq!(bank.source("unit.c"), Some("int x;\n"));
    }
}
