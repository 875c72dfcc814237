//! Line/column text editor that batches insertions and modifications and
//! commits them in a single back-to-front pass, so edits computed from
//! independent (line, col) coordinates never shift each other's anchors.

/// One pending edit.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    kind: EditKind,
    line: usize,
    col: usize,
    content: String,
    non_erasable: bool,
    /// Lower sorts first among edits at the same (line, col): outer-left
    /// wrapping edits get a lower priority than the inner-left edits they
    /// surround, and symmetrically on the right, per the Seeder's
    /// begin/end tag nesting.
    priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EditKind {
    Insert,
    Modify,
}

impl Edit {
    fn sort_key(&self) -> (usize, usize, i32, EditKind) {
        (self.line, self.col, self.priority, self.kind)
    }
}

/// Accumulates edits against a fixed snapshot of text, then applies them
/// all at once. Lines and columns are 1-based to match the tag/manifest
/// coordinate convention used everywhere else in the pipeline.
pub struct TextEditor {
    text: String,
    edits: Vec<Edit>,
    appends: Vec<(i32, String)>,
}

impl TextEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            edits: Vec::new(),
            appends: Vec::new(),
        }
    }

    pub fn insert(&mut self, line: usize, col: usize, content: impl Into<String>) {
        self.insert_with_priority(line, col, content, 0);
    }

    pub fn insert_with_priority(&mut self, line: usize, col: usize, content: impl Into<String>, priority: i32) {
        self.edits.push(Edit {
            kind: EditKind::Insert,
            line,
            col,
            content: content.into(),
            non_erasable: false,
            priority,
        });
    }

    pub fn modify(&mut self, line: usize, col: usize, content: impl Into<String>) {
        self.modify_with_priority(line, col, content, 0);
    }

    pub fn modify_with_priority(&mut self, line: usize, col: usize, content: impl Into<String>, priority: i32) {
        self.edits.push(Edit {
            kind: EditKind::Modify,
            line,
            col,
            content: content.into(),
            non_erasable: false,
            priority,
        });
    }

    /// Marks the edit just pushed as protected against being silently
    /// dropped when another edit's erase would otherwise swallow it (used
    /// to protect the two halves of a wrapping begin/end tag pair).
    pub fn mark_last_non_erasable(&mut self) {
        if let Some(last) = self.edits.last_mut() {
            last.non_erasable = true;
        }
    }

    /// Equivalent to overwriting `length` characters with spaces.
    pub fn erase(&mut self, line: usize, col: usize, length: usize) {
        self.erase_with_priority(line, col, length, 0);
    }

    pub fn erase_with_priority(&mut self, line: usize, col: usize, length: usize, priority: i32) {
        if length == 0 {
            return;
        }
        self.modify_with_priority(line, col, " ".repeat(length), priority);
    }

    /// Queues `content` to be appended at the end of the file (for
    /// declaration-invocation tags, which have no in-line insertion point).
    /// Appends are joined in priority order after every line edit commits.
    pub fn append(&mut self, content: impl Into<String>, priority: i32) {
        self.appends.push((priority, content.into()));
    }

    /// Applies every pending edit and returns the resulting text. Committing
    /// with no pending edits returns the original text byte-for-byte.
    pub fn commit(&mut self) -> String {
        if self.edits.is_empty() && self.appends.is_empty() {
            return self.text.clone();
        }
        if self.edits.is_empty() {
            let mut result = self.text.clone();
            self.append_pending(&mut result);
            self.text = result.clone();
            return result;
        }

        let mut lines: Vec<String> = Vec::new();
        lines.push(String::new()); // padding line 0, lines are 1-based
        for line in self.text.split('\n') {
            lines.push(line.to_string());
        }
        // split('\n') on a trailing-newline string leaves an extra empty
        // element; keep it, it becomes the trailing blank line on rejoin.

        self.edits.sort_by_key(Edit::sort_key);

        // Drop edits that would be erased by a later (higher-priority, i.e.
        // same/overlapping position) non-marked erase, unless they are
        // themselves marked non-erasable. An erase is represented as a
        // Modify whose content is all spaces; any other Modify/Insert whose
        // range an erase fully contains loses unless protected.
        let edits = std::mem::take(&mut self.edits);
        let mut keep = vec![true; edits.len()];
        for (i, outer) in edits.iter().enumerate() {
            if outer.kind != EditKind::Modify || !outer.content.chars().all(|c| c == ' ') {
                continue;
            }
            let outer_end = outer.col + outer.content.len();
            for (j, inner) in edits.iter().enumerate() {
                if i == j || inner.non_erasable {
                    continue;
                }
                if inner.line == outer.line && inner.col >= outer.col && inner.col < outer_end {
                    keep[j] = false;
                }
            }
        }

        // Apply last edit first (reverse sorted order) so earlier edits on
        // the same line don't see shifted columns from later ones.
        for (edit, keep) in edits.iter().zip(keep.iter()).rev() {
            if !keep {
                continue;
            }
            apply_edit(&mut lines, edit);
        }

        let mut result = String::new();
        for line in &lines[1..] {
            result.push_str(line);
            result.push('\n');
        }
        // The synthetic trailing blank line from split('\n') produces one
        // extra '\n'; strip it so round-tripping unedited text is exact.
        if self.text.ends_with('\n') {
            result.pop();
        } else if result.ends_with('\n') {
            result.pop();
        }
        self.append_pending(&mut result);
        self.text = result.clone();
        result
    }

    fn append_pending(&mut self, result: &mut String) {
        if self.appends.is_empty() {
            return;
        }
        self.appends.sort_by_key(|(priority, _)| *priority);
        for (_, content) in self.appends.drain(..) {
            if !result.ends_with('\n') {
                result.push('\n');
            }
            result.push_str(&content);
            result.push('\n');
        }
    }
}

fn apply_edit(lines: &mut Vec<String>, edit: &Edit) {
    if edit.line >= lines.len() {
        lines.resize(edit.line + 1, String::new());
    }
    let line = &mut lines[edit.line];
    let col0 = edit.col.saturating_sub(1);
    if col0 > line.len() {
        line.extend(std::iter::repeat(' ').take(col0 - line.len()));
    }
    match edit.kind {
        EditKind::Insert => {
            if col0 >= line.len() {
                line.push_str(&edit.content);
            } else {
                line.insert_str(col0, &edit.content);
            }
        }
        EditKind::Modify => {
            let end = (col0 + edit.content.len()).min(line.len()).max(col0);
            if col0 + edit.content.len() > line.len() {
                line.extend(std::iter::repeat(' ').take(col0 + edit.content.len() - line.len()));
            }
            line.replace_range(col0..end.min(line.len()), &edit.content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_with_no_edits_is_identity() {
        let mut editor = TextEditor::new("int x = 1;\n");
        assert_eq!(editor.commit(), "int x = 1;\n");
    }

    #[test]
    fn insert_shifts_nothing_else() {
        let mut editor = TextEditor::new("int x;\n");
        editor.insert(1, 4, "/*tag*/");
        let out = editor.commit();
        assert_eq!(out, "int/*tag*/ x;\n");
    }

    #[test]
    fn erase_blanks_a_range() {
        let mut editor = TextEditor::new("#define A 1\n");
        editor.erase(1, 1, 11);
        let out = editor.commit();
        assert_eq!(out, "           \n");
    }

    #[test]
    fn appends_are_joined_after_line_edits_in_priority_order() {
        let mut editor = TextEditor::new("int x;\n");
        editor.append("int second;", 1);
        editor.append("int first;", 0);
        let out = editor.commit();
        assert_eq!(out, "int x;\nint first;\nint second;\n");
    }

    #[test]
    fn priority_orders_same_position_edits() {
        let mut editor = TextEditor::new("x\n");
        editor.insert_with_priority(1, 1, "OUTER(", 0);
        editor.insert_with_priority(1, 1, "INNER(", 1);
        let out = editor.commit();
        assert_eq!(out, "OUTER(INNER(x\n");
    }
}
