//! Seeds a preprocessed compilation unit with machine-readable tags at
//! every macro invocation and conditional-region boundary the external
//! macro analyzer discovered, so a downstream target-language rewriter can
//! reconstruct the source's macro structure from the transpiled output.
//!
//! Each of the four AST-kind templates below pushes its tag text straight
//! onto a [`TextEditor`] rather than building an intermediate task list
//! first, since the editor already does the priority-ordered, erase-aware
//! commit such a list would exist to feed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::expr::BoolExpr;
use crate::include_tree::IncludeForest;
use crate::line_mapper::LineMap;
use crate::tags::{ConditionalTag, InvocationTag, Tag, TagEdge, TagLocation};
use crate::text_editor::TextEditor;

/// One macro-invocation argument, as reported by the external macro
/// analyzer against the CU text (1-based line/col, like everywhere else).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroArgSummary {
    pub name: String,
    pub ast_kind: String,
    pub is_lvalue: bool,
    pub loc_begin: CuLocation,
    pub loc_end: CuLocation,
    pub spelling: String,
}

/// One macro invocation, as reported by the external macro analyzer.
/// Field names mirror the conditions `can_be_fn` classifies by, rather than
/// the analyzer's own (much larger) internal vocabulary -- only the
/// booleans the seeder actually consults are represented here; the wrapper
/// that parses the analyzer's raw output is responsible for projecting down
/// to this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroInvocationSummary {
    pub name: String,
    pub ast_kind: String,
    pub is_lvalue: bool,
    pub loc_begin: CuLocation,
    pub loc_end: CuLocation,
    /// Macro definition site, used as the tag's "reference location".
    pub definition_loc: Option<CuLocation>,
    pub is_location_valid: bool,
    pub spelling: String,
    pub args: Vec<MacroArgSummary>,

    pub has_aligned_arguments: bool,
    pub is_hygienic: bool,
    pub expansion_has_local_type: bool,
    pub expansion_has_anonymous_type: bool,
    pub any_argument_has_local_type: bool,
    pub any_argument_has_anonymous_type: bool,
    pub expansion_type_is_void: bool,
    pub any_argument_type_is_void: bool,
    pub any_argument_conditionally_evaluated: bool,
    pub any_argument_has_side_effects: bool,
    pub has_stringification: bool,
    pub has_token_pasting: bool,
    pub is_invoked_where_ice_required: bool,
}

impl MacroInvocationSummary {
    /// Whether the downstream rewriter may realise this macro as a
    /// target-language function.
    pub fn can_be_fn(&self) -> bool {
        self.has_aligned_arguments
            && self.is_hygienic
            && !self.expansion_has_local_type
            && !self.expansion_has_anonymous_type
            && !self.any_argument_has_local_type
            && !self.any_argument_has_anonymous_type
            && !self.expansion_type_is_void
            && !self.any_argument_type_is_void
            && !self.any_argument_conditionally_evaluated
            && !self.any_argument_has_side_effects
            && !self.has_stringification
            && !self.has_token_pasting
            && !self.is_invoked_where_ice_required
    }
}

/// A `#if`/`#elif`/`#else` region, as surfaced by the symbolic executor's
/// premise tree (after the Splitter has picked the active configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSummary {
    pub ast_kind: String,
    pub loc_begin: CuLocation,
    pub loc_end: CuLocation,
    pub premise: BoolExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuLocation {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingLocation,
    UnsupportedAstKind(String),
    SystemHeader,
    Stringification,
    TokenPasting,
    RequiresIntegralConstant,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingLocation => write!(f, "missing location"),
            DropReason::UnsupportedAstKind(kind) => write!(f, "unsupported AST kind {kind:?}"),
            DropReason::SystemHeader => write!(f, "lives in a system header"),
            DropReason::Stringification => write!(f, "uses stringification"),
            DropReason::TokenPasting => write!(f, "uses token pasting"),
            DropReason::RequiresIntegralConstant => write!(f, "required as an integral constant expression"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedingWarning {
    pub macro_name: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default)]
pub struct SeedingReport {
    pub dropped: Vec<SeedingWarning>,
}

impl SeedingReport {
    fn drop_invocation(&mut self, name: &str, reason: DropReason) {
        self.dropped.push(SeedingWarning {
            macro_name: name.to_string(),
            reason,
        });
    }
}

const SUPPORTED_AST_KINDS: &[&str] = &["Expr", "Stmt", "Stmts", "Decl", "Decls"];

/// Seeds every invocation and region summary into `cu_text`, returning the
/// tagged text and a report of anything dropped along the way.
pub fn seed(
    cu_text: &str,
    invocations: &[MacroInvocationSummary],
    regions: &[RegionSummary],
    line_map: &LineMap,
    forest: &IncludeForest,
) -> (String, SeedingReport) {
    let mut editor = TextEditor::new(cu_text);
    let mut report = SeedingReport::default();

    for invocation in invocations {
        if let Err(reason) = seed_invocation(&mut editor, invocation, line_map, forest) {
            report.drop_invocation(&invocation.name, reason);
        }
    }

    for region in regions {
        let _ = seed_region(&mut editor, region, line_map, forest);
    }

    (editor.commit(), report)
}

fn src_location(
    cu: CuLocation,
    line_map: &LineMap,
    forest: &IncludeForest,
) -> Option<(TagLocation, bool)> {
    let (node, src_line) = line_map.cu_to_src(cu.line)?;
    let path = forest.path(node);
    let is_system = forest.get(node).is_system;
    Some((
        TagLocation {
            file: path.display().to_string(),
            line: src_line,
            column: cu.col,
        },
        is_system,
    ))
}

fn cu_location(cu: CuLocation) -> TagLocation {
    TagLocation {
        file: String::new(),
        line: cu.line,
        column: cu.col,
    }
}

fn seed_invocation(
    editor: &mut TextEditor,
    invocation: &MacroInvocationSummary,
    line_map: &LineMap,
    forest: &IncludeForest,
) -> Result<(), DropReason> {
    if !invocation.is_location_valid {
        return Err(DropReason::MissingLocation);
    }
    if !SUPPORTED_AST_KINDS.contains(&invocation.ast_kind.as_str()) {
        return Err(DropReason::UnsupportedAstKind(invocation.ast_kind.clone()));
    }
    if invocation.has_stringification {
        return Err(DropReason::Stringification);
    }
    if invocation.has_token_pasting {
        return Err(DropReason::TokenPasting);
    }
    if invocation.is_invoked_where_ice_required {
        return Err(DropReason::RequiresIntegralConstant);
    }

    let (source_begin, is_system) = src_location(invocation.loc_begin, line_map, forest)
        .ok_or(DropReason::MissingLocation)?;
    if is_system {
        return Err(DropReason::SystemHeader);
    }
    let (source_end, _) =
        src_location(invocation.loc_end, line_map, forest).ok_or(DropReason::MissingLocation)?;
    let reference_location = invocation
        .definition_loc
        .and_then(|loc| src_location(loc, line_map, forest))
        .map(|(loc, _)| loc)
        .unwrap_or_else(|| source_begin.clone());

    let tag_begin = InvocationTag {
        edge: TagEdge::Begin,
        macro_name: invocation.name.clone(),
        ast_kind: invocation.ast_kind.clone(),
        is_lvalue: invocation.is_lvalue,
        source_location: source_begin,
        cu_location: cu_location(invocation.loc_begin),
        reference_location,
    };
    let mut tag_end = tag_begin.clone();
    tag_end.edge = TagEdge::End;

    seed_with_templates(
        editor,
        &invocation.ast_kind,
        invocation.is_lvalue,
        invocation.loc_begin,
        invocation.loc_end,
        &invocation.spelling,
        &Tag::Invocation(tag_begin).to_c_string_literal(),
        &Tag::Invocation(tag_end).to_c_string_literal(),
    );
    Ok(())
}

fn seed_region(
    editor: &mut TextEditor,
    region: &RegionSummary,
    line_map: &LineMap,
    forest: &IncludeForest,
) -> Result<(), DropReason> {
    if !SUPPORTED_AST_KINDS.contains(&region.ast_kind.as_str()) {
        return Err(DropReason::UnsupportedAstKind(region.ast_kind.clone()));
    }
    let (source_begin, is_system) = src_location(region.loc_begin, line_map, forest)
        .ok_or(DropReason::MissingLocation)?;
    if is_system {
        // Region summaries from system headers are dropped silently.
        return Err(DropReason::SystemHeader);
    }

    let tag_begin = ConditionalTag {
        edge: TagEdge::Begin,
        ast_kind: region.ast_kind.clone(),
        source_location: source_begin.clone(),
        cu_location: cu_location(region.loc_begin),
        reference_location: source_begin,
        premise: region.premise.clone(),
    };
    let mut tag_end = tag_begin.clone();
    tag_end.edge = TagEdge::End;

    seed_with_templates(
        editor,
        &region.ast_kind,
        false,
        region.loc_begin,
        region.loc_end,
        "",
        &Tag::Conditional(tag_begin).to_c_string_literal(),
        &Tag::Conditional(tag_end).to_c_string_literal(),
    );
    Ok(())
}

/// Applies the AST-kind-specific template, matching
/// `Seeder::genInstrumentationTasks` one to one.
fn seed_with_templates(
    editor: &mut TextEditor,
    ast_kind: &str,
    is_lvalue: bool,
    begin: CuLocation,
    end: CuLocation,
    spelling: &str,
    tag_begin_literal: &str,
    tag_end_literal: &str,
) {
    const PRIORITY_LEFT: i32 = 1;
    const PRIORITY_RIGHT: i32 = -1;

    match ast_kind {
        "Expr" if is_lvalue => {
            editor.insert_with_priority(
                begin.line as usize,
                begin.col as usize,
                format!("(*((*{tag_begin_literal})?(&("),
                PRIORITY_LEFT,
            );
            editor.insert_with_priority(
                end.line as usize,
                end.col as usize,
                format!(")):((__typeof__({spelling})*)(0))))"),
                PRIORITY_RIGHT,
            );
        }
        "Expr" => {
            editor.insert_with_priority(
                begin.line as usize,
                begin.col as usize,
                format!("((*{tag_begin_literal})?("),
                PRIORITY_LEFT,
            );
            editor.insert_with_priority(
                end.line as usize,
                end.col as usize,
                format!("):(*(__typeof__({spelling})*)(0)))"),
                PRIORITY_RIGHT,
            );
        }
        "Stmt" | "Stmts" => {
            editor.insert_with_priority(
                begin.line as usize,
                begin.col as usize,
                format!("*{tag_begin_literal};"),
                PRIORITY_LEFT,
            );
            editor.insert_with_priority(
                end.line as usize,
                end.col as usize,
                format!(";*{tag_end_literal};"),
                PRIORITY_RIGHT,
            );
        }
        "Decl" | "Decls" => {
            let uid = declaration_uid(begin, end, tag_begin_literal);
            editor.append(
                format!("const char * HAYROLL_TAG_FOR_{uid} = {tag_begin_literal};"),
                0,
            );
        }
        _ => unreachable!("unsupported AST kinds are rejected before reaching this point"),
    }
}

fn declaration_uid(begin: CuLocation, end: CuLocation, tag_begin_literal: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    tag_begin_literal.hash(&mut hasher);
    let hash32 = (hasher.finish() & 0xffff_ffff) as u32;
    format!(
        "{}_{}_{}_{}_{:08x}",
        begin.line, begin.col, end.line, end.col, hash32
    )
}

/// Macro names whose invocations were seeded at least once, used by the
/// driver to decide which feature atoms made it into the final manifest.
pub fn seeded_macro_names(invocations: &[MacroInvocationSummary], report: &SeedingReport) -> BTreeSet<String> {
    let dropped: BTreeSet<&str> = report.dropped.iter().map(|w| w.macro_name.as_str()).collect();
    invocations
        .iter()
        .map(|i| i.name.as_str())
        .filter(|name| !dropped.contains(name))
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_with_one_file() -> (IncludeForest, LineMap) {
        let mut forest = IncludeForest::new();
        let root = forest.make_root("/proj/a.c");
        let mut line_map = LineMap::default();
        line_map.forward.insert(root, vec![0, 1, 2, 3]);
        line_map.inverse = vec![
            None,
            Some((root, 1)),
            Some((root, 2)),
            Some((root, 3)),
        ];
        (forest, line_map)
    }

    fn invocation(ast_kind: &str, is_lvalue: bool) -> MacroInvocationSummary {
        MacroInvocationSummary {
            name: "INCR".to_string(),
            ast_kind: ast_kind.to_string(),
            is_lvalue,
            loc_begin: CuLocation { line: 1, col: 1 },
            loc_end: CuLocation { line: 1, col: 10 },
            definition_loc: None,
            is_location_valid: true,
            spelling: "INCR(y)".to_string(),
            args: vec![],
            has_aligned_arguments: true,
            is_hygienic: true,
            expansion_has_local_type: false,
            expansion_has_anonymous_type: false,
            any_argument_has_local_type: false,
            any_argument_has_anonymous_type: false,
            expansion_type_is_void: false,
            any_argument_type_is_void: false,
            any_argument_conditionally_evaluated: false,
            any_argument_has_side_effects: false,
            has_stringification: false,
            has_token_pasting: false,
            is_invoked_where_ice_required: false,
        }
    }

    #[test]
    fn can_be_fn_is_true_for_a_well_behaved_macro() {
        assert!(invocation("Stmt", false).can_be_fn());
    }

    #[test]
    fn stringification_flips_can_be_fn_and_is_dropped() {
        let mut inv = invocation("Expr", false);
        inv.has_stringification = true;
        assert!(!inv.can_be_fn());

        let (forest, line_map) = forest_with_one_file();
        let (_, report) = seed("(y)++;\n", &[inv], &[], &line_map, &forest);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].reason, DropReason::Stringification);
    }

    #[test]
    fn statement_invocation_is_wrapped_with_begin_end_tags() {
        let (forest, line_map) = forest_with_one_file();
        let inv = invocation("Stmt", false);
        let (seeded, report) = seed("(y)++;\n", &[inv], &[], &line_map, &forest);
        assert!(report.dropped.is_empty());
        assert!(seeded.contains("\"seedType\":\"invocation\""));
        assert!(seeded.starts_with('*'));
    }

    #[test]
    fn lvalue_expression_uses_the_address_of_template() {
        let (forest, line_map) = forest_with_one_file();
        let inv = invocation("Expr", true);
        let (seeded, _) = seed("(*(p));\n", &[inv], &[], &line_map, &forest);
        assert!(seeded.contains("&("));
    }

    #[test]
    fn declaration_invocation_appends_at_end_of_file() {
        let (forest, line_map) = forest_with_one_file();
        let inv = invocation("Decl", false);
        let (seeded, _) = seed("int x;\n", &[inv], &[], &line_map, &forest);
        assert!(seeded.trim_end().ends_with(';'));
        assert!(seeded.contains("HAYROLL_TAG_FOR_"));
    }

    #[test]
    fn conditional_region_is_seeded_with_its_premise() {
        let (forest, line_map) = forest_with_one_file();
        let region = RegionSummary {
            ast_kind: "Stmt".to_string(),
            loc_begin: CuLocation { line: 1, col: 1 },
            loc_end: CuLocation { line: 1, col: 7 },
            premise: BoolExpr::Defined("A".into()),
        };
        let (seeded, _) = seed("int x;\n", &[], &[region], &line_map, &forest);
        assert!(seeded.contains("\"seedType\":\"conditional\""));
    }
}
