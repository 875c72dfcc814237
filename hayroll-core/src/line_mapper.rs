//! Maps lines between a rewritten compilation unit (the output of running
//! the external preprocessor with `-frewrite-includes`, which inlines every
//! `#include` it actually reaches but expands no macros) and the original
//! source files that fed into it, by scanning the GNU linemarkers
//! (`# <line> "<path>" <flags>`) the rewrite leaves behind in document
//! order.
//!
//! This scans the raw text with a regular expression rather than walking
//! `preproc_line` tree-sitter nodes -- [`crate::token`]'s rationale for
//! working off raw text rather than tree-sitter child nodes applies here
//! too, and a linemarker's shape is simple enough that a regex is the
//! natural tool for this kind of line-oriented text scanning.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::include_resolver::IncludeResolver;
use crate::include_tree::{IncludeForest, IncludeNodeId};

static LINEMARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^# (\d+) "([^"]*)"( (\d[ \d]*))?\s*$"#).unwrap());

#[derive(Debug, Clone)]
struct Linemarker {
    /// 1-based line number the marker claims the *next* line has, in the
    /// file named by `path`.
    src_line: u32,
    path: String,
    flags: Vec<u8>,
    /// 1-based line number of the marker line itself in the compilation unit.
    cu_line: u32,
}

fn scan_linemarkers(cu_text: &str) -> Vec<Linemarker> {
    let mut markers = Vec::new();
    for (i, line) in cu_text.lines().enumerate() {
        if let Some(caps) = LINEMARKER_RE.captures(line) {
            let src_line: u32 = caps[1].parse().unwrap_or(0);
            let path = caps[2].to_string();
            let flags = caps
                .get(4)
                .map(|m| {
                    m.as_str()
                        .split_whitespace()
                        .filter_map(|f| f.parse::<u8>().ok())
                        .collect()
                })
                .unwrap_or_default();
            markers.push(Linemarker {
                src_line,
                path,
                flags,
                cu_line: (i + 1) as u32,
            });
        }
    }
    markers
}

/// Bidirectional line map between one symbolically-executed translation
/// unit's include tree and its rewritten compilation unit text.
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    /// Per include-tree node, source line -> compilation-unit line (`0` for
    /// a source line never reached by this concrete rewrite).
    pub forward: HashMap<IncludeNodeId, Vec<u32>>,
    /// Compilation-unit line -> (include-tree node, source line), `None`
    /// for a compilation-unit line outside any tracked file (concretely
    /// executed, or the unit's own top-level text).
    pub inverse: Vec<Option<(IncludeNodeId, u32)>>,
}

impl LineMap {
    pub fn src_to_cu(&self, node: IncludeNodeId, src_line: u32) -> Option<u32> {
        self.forward
            .get(&node)
            .and_then(|lines| lines.get(src_line as usize))
            .copied()
            .filter(|&line| line != 0)
    }

    pub fn cu_to_src(&self, cu_line: u32) -> Option<(IncludeNodeId, u32)> {
        self.inverse.get(cu_line as usize).copied().flatten()
    }
}

/// Builds a [`LineMap`] from the rewritten compilation unit's text and the
/// include tree produced for the same translation unit by symbolic
/// execution. `root` is the include tree's root node (the unit's own
/// primary source file).
pub fn build_line_map(
    cu_text: &str,
    forest: &IncludeForest,
    resolver: &IncludeResolver,
    root: IncludeNodeId,
) -> LineMap {
    let cu_total_lines = cu_text.lines().count() as u32;
    let mut markers = scan_linemarkers(cu_text);
    // Sentinel trailing marker: forces one more iteration that flushes the
    // span up to the end of the file.
    markers.push(Linemarker {
        src_line: 0,
        path: String::new(),
        flags: Vec::new(),
        cu_line: 0,
    });

    let mut forward: HashMap<IncludeNodeId, Vec<u32>> = HashMap::new();
    let mut inverse: Vec<Option<(IncludeNodeId, u32)>> = vec![None; cu_total_lines as usize + 1];

    let mut current = root;
    let mut last: Option<&Linemarker> = None;
    let is_sentinel = |m: &Linemarker| m.cu_line == 0 && m.path.is_empty();

    for marker in &markers {
        let Some(prev) = last else {
            last = Some(marker);
            continue;
        };

        let resolved = resolver.resolve_user(&prev.path, &forest.ancestor_dirs(current));
        let Ok(resolved) = resolved else {
            last = Some(marker);
            continue;
        };
        if resolved != forest.path(current) {
            // The marker points somewhere not in the include tree: text
            // that was concretely executed (not reached through a real
            // `#include` this symbolic run tracked). Nothing to map.
            last = Some(marker);
            continue;
        }

        let this_cu_line = if is_sentinel(marker) {
            cu_total_lines
        } else {
            marker.cu_line
        };

        let lines = forward.entry(current).or_insert_with(|| vec![0; 1024]);
        while lines.len() <= prev.src_line as usize {
            lines.resize(lines.len() * 2, 0);
        }
        let mut s = prev.src_line;
        let mut t = prev.cu_line + 1;
        while t <= this_cu_line {
            lines[s as usize] = t;
            if (t as usize) < inverse.len() {
                inverse[t as usize] = Some((current, s));
            }
            s += 1;
            t += 1;
        }

        if is_sentinel(marker) {
            break;
        }

        match marker.flags.first() {
            Some(1) => {
                // Descending into a newly `#include`d file: find the child
                // whose include site is on `prev.src_line` in the current
                // file and whose resolved path matches this marker's path.
                if let Ok(this_resolved) = resolver.resolve_user(&marker.path, &forest.ancestor_dirs(current)) {
                    if let Some(child) = forest.get(current).children.get(&prev.src_line) {
                        if forest.path(*child) == this_resolved.as_path() {
                            current = *child;
                        }
                    }
                }
            }
            Some(2) => {
                // Returning to the parent file.
                if let Some(parent) = forest.parent(current) {
                    if let Ok(this_resolved) = resolver.resolve_user(&marker.path, &forest.ancestor_dirs(parent)) {
                        if forest.path(parent) == this_resolved.as_path() {
                            current = parent;
                        }
                    }
                }
            }
            _ => {}
        }

        last = Some(marker);
    }

    for lines in forward.values_mut() {
        while matches!(lines.last(), Some(0)) {
            lines.pop();
        }
    }

    LineMap { forward, inverse }
}

/// Blanks out every linemarker line in `cu_text`, replacing its characters
/// with spaces rather than deleting the line, so every other line's number
/// is unaffected -- the external transpiler front end chokes on GNU
/// linemarkers but is happy to see a blank line in their place.
pub fn erase_linemarkers(cu_text: &str) -> String {
    cu_text
        .lines()
        .map(|line| {
            if LINEMARKER_RE.is_match(line) {
                " ".repeat(line.len())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_a_plain_linemarker() {
        let markers = scan_linemarkers("# 1 \"a.c\"\nint x;\n# 5 \"b.h\" 1\n");
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].src_line, 1);
        assert_eq!(markers[0].path, "a.c");
        assert_eq!(markers[1].flags, vec![1]);
    }

    #[test]
    fn erase_blanks_linemarker_lines_only() {
        let erased = erase_linemarkers("# 1 \"a.c\"\nint x;\n");
        let lines: Vec<&str> = erased.lines().collect();
        assert_eq!(lines[0].trim(), "");
        assert_eq!(lines[0].len(), "# 1 \"a.c\"".len());
        assert_eq!(lines[1], "int x;");
    }
}
