//! Walks the preprocessor AST of a translation unit in lock-step: every
//! in-flight [`State`] advances through a sequential block (a translation
//! unit or an `#if` body) item-by-item, forking at
//! `#if`/`#ifdef`/`#ifndef` and merging again once two states reach the
//! same point with the same symbol table.
//!
//! A [`State`] stores [`ProgramPoint`]s (spans), not live `tree_sitter::Node`s,
//! so it can sit in a plain `Vec` across calls that also need a mutable
//! borrow of the [`AstBank`] (to parse a newly `#include`d file). Each step
//! re-resolves the node it needs, reads what it needs out of it, and drops
//! the borrow before doing anything else.

use std::path::PathBuf;
use std::rc::Rc;

use z3::Context;

use crate::ast_bank::AstBank;
use crate::error::{HayrollError, Result};
use crate::expr::{simplify_structural, BoolExpr};
use crate::include_resolver::IncludeResolver;
use crate::include_tree::{IncludeForest, IncludeNodeId};
use crate::macro_expander::expand_preproc_tokens;
use crate::program_point::ProgramPoint;
use crate::premise_tree::{PremiseTree, PremiseTreeScribe};
use crate::source_position::Span;
use crate::symbol_table::{FunctionSymbol, ObjectSymbol, Symbol, SymbolTable, UndefinedSymbol};
use crate::token::tokenize;

/// A point in the symbolic-execution sweep: where, with what symbol table
/// visible, under what accumulated condition.
#[derive(Clone)]
pub struct State {
    pub program_point: ProgramPoint,
    pub symbol_table: Rc<SymbolTable>,
    pub premise: BoolExpr,
}

impl State {
    /// Two states merge when they share a program point *and* refer to the
    /// literal same symbol-table instance -- pointer identity, not content
    /// equality.
    fn mergeable_with(&self, other: &State) -> bool {
        self.program_point == other.program_point && Rc::ptr_eq(&self.symbol_table, &other.symbol_table)
    }
}

/// Symbolically executes one translation unit, producing every feasible
/// end-of-unit [`State`] and a [`PremiseTree`] describing when each region
/// of the unit is active.
pub struct SymbolicExecutor {
    ctx: Context,
    src_path: PathBuf,
    include_resolver: IncludeResolver,
    ast_bank: AstBank,
    forest: IncludeForest,
    scribe: PremiseTreeScribe,
    root: Option<IncludeNodeId>,
}

impl SymbolicExecutor {
    pub fn new(
        cc_exe: impl Into<String>,
        src_path: impl Into<PathBuf>,
        include_paths: Vec<PathBuf>,
    ) -> Result<Self> {
        let src_path = src_path.into();
        let mut ast_bank = AstBank::new()?;
        ast_bank.add_file(&src_path)?;
        Ok(Self {
            ctx: Context::new(&z3::Config::new()),
            src_path,
            include_resolver: IncludeResolver::new(cc_exe, include_paths),
            ast_bank,
            // The root include-tree node is created in `run()`, after the
            // predefined-macro bootstrap pass gets its own throwaway root.
            forest: IncludeForest::new(),
            scribe: PremiseTreeScribe::uninitialized(),
            root: None,
        })
    }

    /// Runs the bootstrap predefined-macro pass, then the real translation
    /// unit, returning every feasible end-of-unit state. `scribe`/the
    /// premise tree can be retrieved afterward with [`Self::take_premise_tree`].
    pub fn run(&mut self) -> Result<Vec<State>> {
        let predefined_text = self.include_resolver.builtin_macros()?;
        let predefined_node = self.forest.make_root("<PREDEFINED_MACROS>");
        self.ast_bank
            .add_source("<PREDEFINED_MACROS>", predefined_text)?;

        let predefined_state = State {
            program_point: ProgramPoint::eof(predefined_node),
            symbol_table: SymbolTable::new(),
            premise: BoolExpr::Bool(true),
        };
        let mut bootstrap_states = self.execute_translation_unit_at(predefined_node, predefined_state)?;
        if bootstrap_states.len() != 1 {
            return Err(HayrollError::Internal(
                "predefined-macro pass produced more than one end state".to_string(),
            ));
        }
        let predefined_symbol_table = bootstrap_states.remove(0).symbol_table;

        let root = self.forest.make_root(&self.src_path);
        self.root = Some(root);
        let start_point = self.first_item_of_translation_unit(root)?;
        let start_state = State {
            program_point: start_point,
            symbol_table: predefined_symbol_table,
            premise: BoolExpr::Bool(true),
        };
        self.scribe = PremiseTreeScribe::new(start_point, BoolExpr::Bool(true));

        let join_point = ProgramPoint::eof(root);
        self.execute_in_lock_step(vec![start_state], join_point)
    }

    pub fn take_premise_tree(&mut self) -> Option<PremiseTree> {
        self.scribe.take_tree()
    }

    pub fn forest(&self) -> &IncludeForest {
        &self.forest
    }

    pub fn ast_bank(&self) -> &AstBank {
        &self.ast_bank
    }

    pub fn include_resolver(&self) -> &IncludeResolver {
        &self.include_resolver
    }

    /// The translation unit's own include-tree root, set once [`Self::run`]
    /// has parsed the real unit (after the predefined-macro bootstrap pass).
    pub fn root(&self) -> Option<IncludeNodeId> {
        self.root
    }

    fn execute_translation_unit_at(&mut self, include_node: IncludeNodeId, mut start: State) -> Result<Vec<State>> {
        start.program_point = self.first_item_of_translation_unit(include_node)?;
        self.execute_in_lock_step(vec![start], ProgramPoint::eof(include_node))
    }

    fn first_item_of_translation_unit(&self, include_node: IncludeNodeId) -> Result<ProgramPoint> {
        let path = self.forest.path(include_node).to_path_buf();
        let tree = self
            .ast_bank
            .find(&path)
            .ok_or_else(|| HayrollError::Internal(format!("{} not in AST bank", path.display())))?;
        let root = tree.root_node();
        match root.named_child(0) {
            Some(first) => Ok(ProgramPoint::new(include_node, Span::from_node(&first))),
            None => Ok(ProgramPoint::eof(include_node)),
        }
    }

    /// Executes every item of a sequential block (its states already
    /// positioned at the block's first item, or at the end-of-block
    /// sentinel for an empty block) in lock step, then merges the states
    /// that reach `join_point` with the same symbol table.
    fn execute_in_lock_step(&mut self, start: Vec<State>, join_point: ProgramPoint) -> Result<Vec<State>> {
        let mut tasks = start;
        let mut blocked: Vec<State> = Vec::new();

        while let Some(mut task) = tasks.pop() {
            if task.program_point.is_eof() {
                task.program_point = join_point;
                blocked.push(task);
                continue;
            }
            for next in self.execute_one(task)? {
                tasks.push(next);
            }
        }

        blocked.sort_by_key(|s| Rc::as_ptr(&s.symbol_table) as usize);
        let mut merged: Vec<State> = Vec::new();
        for state in blocked {
            if let Some(last) = merged.last_mut() {
                if last.mergeable_with(&state) {
                    last.premise = simplify_structural(last.premise.clone().or(state.premise));
                    continue;
                }
            }
            merged.push(state);
        }
        Ok(merged)
    }

    fn execute_one(&mut self, state: State) -> Result<Vec<State>> {
        let kind = self.node_kind(&state.program_point)?;
        match kind.as_str() {
            "preproc_if" | "preproc_ifdef" => self.execute_if(state),
            "preproc_include" | "preproc_include_next" => self.execute_include(state),
            "preproc_def" | "preproc_function_def" | "preproc_undef" => {
                Ok(vec![self.execute_continuous_defines(state)?])
            }
            "preproc_error" => {
                self.execute_error(&state)?;
                Ok(Vec::new())
            }
            "preproc_line" => Ok(vec![self.execute_line(state)?]),
            _ => Ok(vec![self.execute_c_tokens(state)?]),
        }
    }

    fn node_kind(&self, point: &ProgramPoint) -> Result<String> {
        let node = point
            .node(&self.forest, &self.ast_bank)
            .ok_or_else(|| HayrollError::Internal(format!("dangling program point {}", point.display(&self.forest))))?;
        Ok(node.kind().to_string())
    }

    fn node_text(&self, point: &ProgramPoint) -> Result<String> {
        let path = self.forest.path(point.include_node).to_path_buf();
        let src = self
            .ast_bank
            .source(&path)
            .ok_or_else(|| HayrollError::Internal(format!("{} not in AST bank", path.display())))?;
        let span = point
            .span
            .ok_or_else(|| HayrollError::Internal("text requested for an EOF program point".to_string()))?;
        Ok(src[span.start_byte..span.end_byte].to_string())
    }

    /// `node.next_named_sibling()`, plain -- used for the point right after
    /// an entire `#if`/`#ifdef` chain (whose `elif`/`else` arms are nested
    /// children, not siblings, in tree-sitter-c's grammar).
    fn next_sibling_point(&self, point: &ProgramPoint) -> Result<ProgramPoint> {
        let node = point
            .node(&self.forest, &self.ast_bank)
            .ok_or_else(|| HayrollError::Internal("dangling program point".to_string()))?;
        match node.next_named_sibling() {
            Some(sibling) => Ok(ProgramPoint::new(point.include_node, Span::from_node(&sibling))),
            None => Ok(ProgramPoint::eof(point.include_node)),
        }
    }

    /// Like [`Self::next_sibling_point`], but for a point *inside* an
    /// if/elif/else body: reaching the nested `preproc_elif`/`preproc_else`
    /// alternative counts as the end of this body, since that alternative
    /// is handled by [`Self::collect_if_bodies`], not iterated over as a
    /// regular body item.
    fn next_body_item_point(&self, point: &ProgramPoint) -> Result<ProgramPoint> {
        let node = point
            .node(&self.forest, &self.ast_bank)
            .ok_or_else(|| HayrollError::Internal("dangling program point".to_string()))?;
        match node.next_named_sibling() {
            Some(sibling) if sibling.kind() == "preproc_elif" || sibling.kind() == "preproc_else" => {
                Ok(ProgramPoint::eof(point.include_node))
            }
            Some(sibling) => Ok(ProgramPoint::new(point.include_node, Span::from_node(&sibling))),
            None => Ok(ProgramPoint::eof(point.include_node)),
        }
    }

    fn execute_continuous_defines(&mut self, mut state: State) -> Result<State> {
        let child = state.symbol_table.make_child();
        let mut point = state.program_point;
        loop {
            let kind = self.node_kind(&point)?;
            match kind.as_str() {
                "preproc_def" => {
                    let (name, value_span) = self.read_def_name_value(&point)?;
                    let body = match value_span {
                        Some(text) => tokenize(&text).map_err(HayrollError::MalformedExpression)?,
                        None => Vec::new(),
                    };
                    child.define(Symbol::Object(ObjectSymbol {
                        name,
                        body,
                        def_site: Some(point),
                    }));
                }
                "preproc_function_def" => {
                    let (name, params, variadic, value_span) = self.read_function_def(&point)?;
                    let body = match value_span {
                        Some(text) => tokenize(&text).map_err(HayrollError::MalformedExpression)?,
                        None => Vec::new(),
                    };
                    child.define(Symbol::Function(FunctionSymbol {
                        name,
                        params,
                        variadic,
                        body,
                        def_site: Some(point),
                    }));
                }
                "preproc_undef" => {
                    let name = self.read_undef_name(&point)?;
                    child.define(Symbol::Undefined(UndefinedSymbol {
                        name,
                        def_site: Some(point),
                    }));
                }
                _ => break,
            }
            let next = self.next_body_item_point(&point)?;
            if next.is_eof() {
                point = next;
                break;
            }
            let next_kind = self.node_kind(&next)?;
            if !matches!(next_kind.as_str(), "preproc_def" | "preproc_function_def" | "preproc_undef") {
                point = next;
                break;
            }
            point = next;
        }
        state.symbol_table = child;
        state.program_point = point;
        Ok(state)
    }

    fn read_def_name_value(&self, point: &ProgramPoint) -> Result<(String, Option<String>)> {
        self.with_node(point, |node, src| {
            let name = node
                .child_by_field_name("name")
                .map(|n| src[n.start_byte()..n.end_byte()].to_string())
                .ok_or_else(|| HayrollError::Internal("preproc_def with no name".to_string()))?;
            let value = node
                .child_by_field_name("value")
                .map(|n| src[n.start_byte()..n.end_byte()].to_string());
            Ok((name, value))
        })
    }

    fn read_function_def(&self, point: &ProgramPoint) -> Result<(String, Vec<String>, bool, Option<String>)> {
        self.with_node(point, |node, src| {
            let name = node
                .child_by_field_name("name")
                .map(|n| src[n.start_byte()..n.end_byte()].to_string())
                .ok_or_else(|| HayrollError::Internal("preproc_function_def with no name".to_string()))?;
            let mut params = Vec::new();
            let mut variadic = false;
            if let Some(params_node) = node.child_by_field_name("parameters") {
                let mut cursor = params_node.walk();
                for child in params_node.named_children(&mut cursor) {
                    if child.kind() == "identifier" {
                        params.push(src[child.start_byte()..child.end_byte()].to_string());
                    } else if child.kind() == "..." || src[child.start_byte()..child.end_byte()] == *"..." {
                        variadic = true;
                    }
                }
            }
            let value = node
                .child_by_field_name("value")
                .map(|n| src[n.start_byte()..n.end_byte()].to_string());
            Ok((name, params, variadic, value))
        })
    }

    fn read_undef_name(&self, point: &ProgramPoint) -> Result<String> {
        self.with_node(point, |node, src| {
            node.child_by_field_name("name")
                .map(|n| src[n.start_byte()..n.end_byte()].to_string())
                .ok_or_else(|| HayrollError::Internal("preproc_undef with no name".to_string()))
        })
    }

    fn with_node<T>(
        &self,
        point: &ProgramPoint,
        f: impl FnOnce(tree_sitter::Node, &str) -> Result<T>,
    ) -> Result<T> {
        let path = self.forest.path(point.include_node).to_path_buf();
        let src = self
            .ast_bank
            .source(&path)
            .ok_or_else(|| HayrollError::Internal(format!("{} not in AST bank", path.display())))?;
        let node = point
            .node(&self.forest, &self.ast_bank)
            .ok_or_else(|| HayrollError::Internal("dangling program point".to_string()))?;
        f(node, src)
    }

    fn execute_c_tokens(&mut self, mut state: State) -> Result<State> {
        let text = self.node_text(&state.program_point)?;
        if let Ok(tokens) = tokenize(&text) {
            for token in &tokens {
                if let crate::token::Token::Identifier(name) = token {
                    if let Some(symbol) = state.symbol_table.lookup(name) {
                        if let Some(def_site) = symbol.def_site() {
                            let ancestor_chain = self.ancestor_chain(state.program_point);
                            self.scribe.record_macro_premise(
                                state.program_point,
                                state.premise.clone(),
                                def_site,
                                state.premise.clone(),
                                &ancestor_chain,
                            );
                        }
                    }
                }
            }
        }
        state.program_point = self.next_body_item_point(&state.program_point)?;
        Ok(state)
    }

    /// Ancestors of `point` (innermost first) that are plausible premise-tree
    /// attachment points: its own containing `#if`/`#else` bodies, up to the
    /// translation unit root.
    fn ancestor_chain(&self, point: ProgramPoint) -> Vec<ProgramPoint> {
        let mut chain = Vec::new();
        let mut current = point.parent(&self.forest, &self.ast_bank);
        while let Some(p) = current {
            chain.push(p);
            current = p.parent(&self.forest, &self.ast_bank);
        }
        chain.push(ProgramPoint::eof(point.include_node));
        chain
    }

    fn execute_error(&self, state: &State) -> Result<()> {
        tracing::debug!(
            premise = ?state.premise,
            point = %state.program_point.display(&self.forest),
            "possible-error premise"
        );
        Ok(())
    }

    fn execute_line(&mut self, mut state: State) -> Result<State> {
        state.program_point = self.next_body_item_point(&state.program_point)?;
        Ok(state)
    }

    /// Resolves the included path, recursively symbolically executes its
    /// root under the current state, and resumes after the `#include`
    /// directive once with each of the included file's feasible end states.
    fn execute_include(&mut self, state: State) -> Result<Vec<State>> {
        let (is_system, spelling, include_site) = self.read_include_directive(&state.program_point)?;
        let resume_point = self.next_body_item_point(&state.program_point)?;

        let parent_dirs = self.forest.ancestor_dirs(state.program_point.include_node);
        let resolved = if is_system {
            self.include_resolver.resolve_system(&spelling)
        } else {
            self.include_resolver.resolve_user(&spelling, &parent_dirs)
        };
        let resolved = match resolved {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(%spelling, %err, "skipping unresolved include");
                let mut fallback = state;
                fallback.program_point = resume_point;
                return Ok(vec![fallback]);
            }
        };
        if self.ast_bank.find(&resolved).is_none() {
            self.ast_bank.add_file(&resolved)?;
        }

        let directive_line = state
            .program_point
            .span
            .map(|s| s.start_point.row)
            .unwrap_or_default();
        let child_include_node = self.forest.add_child(
            state.program_point.include_node,
            directive_line,
            resolved,
            include_site,
            is_system,
        );
        let child_start = self.first_item_of_translation_unit(child_include_node)?;
        let nested_state = State {
            program_point: child_start,
            symbol_table: state.symbol_table,
            premise: state.premise,
        };
        let end_states = self.execute_translation_unit_at(child_include_node, nested_state)?;

        Ok(end_states
            .into_iter()
            .map(|end| State {
                program_point: resume_point,
                symbol_table: end.symbol_table,
                premise: end.premise,
            })
            .collect())
    }

    fn read_include_directive(&self, point: &ProgramPoint) -> Result<(bool, String, Span)> {
        self.with_node(point, |node, src| {
            let whole_span = Span::from_node(&node);
            let path_node = node
                .child_by_field_name("path")
                .ok_or_else(|| HayrollError::Internal("preproc_include with no path".to_string()))?;
            let text = src[path_node.start_byte()..path_node.end_byte()].to_string();
            let (is_system, spelling) = if let Some(stripped) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
                (true, stripped.to_string())
            } else if let Some(stripped) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
                (false, stripped.to_string())
            } else {
                (true, text)
            };
            Ok((is_system, spelling, whole_span))
        })
    }

    /// Symbolic-if handling: forks into a then/else pair (splitting only
    /// when both branches are satisfiable), executes each branch's body in
    /// lock step, and merges the results back at the point right after the
    /// whole `#if`/`#ifdef`/.../`#endif` chain.
    fn execute_if(&mut self, state: State) -> Result<Vec<State>> {
        let if_point = state.program_point;
        let join_point = self.next_sibling_point(&if_point)?;
        let branch_states = self.collect_if_bodies(state, if_point)?;
        self.execute_in_lock_step(branch_states, join_point)
    }

    /// Recursively walks the `#if`/`#elif`/`#else` chain starting at
    /// `point`, forking a state per reachable branch body.
    fn collect_if_bodies(&mut self, state: State, point: ProgramPoint) -> Result<Vec<State>> {
        let branch = self.read_if_branch(&point)?;

        let Some(condition_source) = branch.condition else {
            // Plain `#else`: the incoming premise applies to its body as-is.
            let mut body_state = state;
            body_state.program_point = branch.body.unwrap_or_else(|| ProgramPoint::eof(point.include_node));
            return Ok(vec![body_state]);
        };
        let condition = match condition_source {
            ConditionSource::DefinedCheck(expr) => expr,
            ConditionSource::Raw(tokens) => self.expand_and_symbolize(&tokens, &state.symbol_table)?,
        };

        let then_premise = simplify_structural(state.premise.clone().and(condition.clone()));
        let else_premise = simplify_structural(state.premise.clone().and(condition.not()));

        if let Some(body) = branch.body {
            let ancestor_chain = self.ancestor_chain(body);
            self.scribe
                .add_premise_or_create_child(body, then_premise.clone(), &ancestor_chain);
        }

        let then_sat = crate::smt::check_sat(&self.ctx, &then_premise) == crate::smt::Satisfiability::Sat;
        let else_sat = crate::smt::check_sat(&self.ctx, &else_premise) == crate::smt::Satisfiability::Sat;

        let mut results = Vec::new();
        if then_sat {
            let mut then_state = state.clone();
            then_state.premise = then_premise;
            then_state.program_point = branch.body.unwrap_or_else(|| ProgramPoint::eof(point.include_node));
            results.push(then_state);
        }
        if else_sat {
            let mut else_state = state;
            else_state.premise = else_premise;
            match branch.alternative {
                Some(alt) => results.extend(self.collect_if_bodies(else_state, alt)?),
                None => {
                    else_state.program_point = ProgramPoint::eof(point.include_node);
                    results.push(else_state);
                }
            }
        }
        Ok(results)
    }

    fn read_if_branch(&self, point: &ProgramPoint) -> Result<IfBranch> {
        let kind = self.node_kind(point)?;
        self.with_node(point, |node, src| {
            let body = first_body_item(node);
            let alternative = node
                .child_by_field_name("alternative")
                .map(|n| ProgramPoint::new(point.include_node, Span::from_node(&n)));
            let body = body.map(|n| ProgramPoint::new(point.include_node, Span::from_node(&n)));

            if kind == "preproc_else" {
                return Ok(IfBranch {
                    condition: None,
                    body,
                    alternative,
                });
            }

            if kind == "preproc_ifdef" {
                let name_node = node
                    .child_by_field_name("name")
                    .ok_or_else(|| HayrollError::Internal("preproc_ifdef with no name".to_string()))?;
                let name = src[name_node.start_byte()..name_node.end_byte()].to_string();
                let whole_text = &src[node.start_byte()..node.end_byte()];
                let defined = BoolExpr::Defined(name);
                let condition = if whole_text.trim_start().starts_with("#ifndef") {
                    defined.not()
                } else {
                    defined
                };
                return Ok(IfBranch {
                    condition: Some(ConditionSource::DefinedCheck(condition)),
                    body,
                    alternative,
                });
            }

            // preproc_if / preproc_elif: the condition still needs macro
            // expansion against the live symbol table, done by the caller
            // (which has `state` in scope), so only tokenize here.
            let condition_node = node
                .child_by_field_name("condition")
                .ok_or_else(|| HayrollError::Internal("preproc_if with no condition".to_string()))?;
            let condition_text = &src[condition_node.start_byte()..condition_node.end_byte()];
            let tokens = tokenize(condition_text).map_err(HayrollError::MalformedExpression)?;
            Ok(IfBranch {
                condition: Some(ConditionSource::Raw(tokens)),
                body,
                alternative,
            })
        })
    }
}

struct IfBranch {
    condition: Option<ConditionSource>,
    body: Option<ProgramPoint>,
    alternative: Option<ProgramPoint>,
}

enum ConditionSource {
    /// An `#ifdef`/`#ifndef` test, already a complete `BoolExpr` -- no
    /// macro expansion needed beyond the `defined`-style check itself.
    DefinedCheck(BoolExpr),
    /// An `#if`/`#elif` condition's tokens, still needing expansion against
    /// the state's symbol table before being parsed into a `BoolExpr`.
    Raw(Vec<crate::token::Token>),
}

/// The first named child of a `preproc_if`/`preproc_ifdef`/`preproc_elif`/
/// `preproc_else` node that is neither its `condition`/`name` field nor its
/// `alternative` field -- i.e. the first item of its body, inlined directly
/// as a child in tree-sitter-c's grammar (no wrapping block node).
fn first_body_item(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    let condition = node.child_by_field_name("condition");
    let name = node.child_by_field_name("name");
    let alternative = node.child_by_field_name("alternative");
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if Some(child) == condition || Some(child) == name || Some(child) == alternative {
            continue;
        }
        return Some(child);
    }
    None
}

impl SymbolicExecutor {
    /// Expands `tokens` against `symbol_table` and symbolizes the result
    /// into a [`BoolExpr`]: the macro-expander-then-condition-parser
    /// pipeline every `#if` condition goes through.
    fn expand_and_symbolize(&self, tokens: &[crate::token::Token], symbol_table: &SymbolTable) -> Result<BoolExpr> {
        let expanded = expand_preproc_tokens(tokens, symbol_table)?;
        crate::cond_parser::parse_condition(&expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_with_same_point_and_table_are_mergeable() {
        let table = SymbolTable::new();
        let include_node = IncludeNodeId::default();
        let point = ProgramPoint::eof(include_node);
        let a = State {
            program_point: point,
            symbol_table: table.clone(),
            premise: BoolExpr::Defined("A".into()),
        };
        let b = State {
            program_point: point,
            symbol_table: table,
            premise: BoolExpr::Defined("B".into()),
        };
        assert!(a.mergeable_with(&b));
    }

    #[test]
    fn states_with_different_tables_are_not_mergeable() {
        let include_node = IncludeNodeId::default();
        let point = ProgramPoint::eof(include_node);
        let a = State {
            program_point: point,
            symbol_table: SymbolTable::new(),
            premise: BoolExpr::Bool(true),
        };
        let b = State {
            program_point: point,
            symbol_table: SymbolTable::new(),
            premise: BoolExpr::Bool(true),
        };
        assert!(!a.mergeable_with(&b));
    }
}
