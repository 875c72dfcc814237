//! A concrete assignment of macro names to (optional) integer values,
//! extracted from a premise's satisfying model. Mirrors `-D` flags: a name
//! with no value means `#define NAME` with an empty body, a name with a
//! value means `#define NAME value`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use z3::Context;

use crate::expr::BoolExpr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineSet {
    pub defines: HashMap<String, Option<i64>>,
}

impl DefineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_model(defines: HashMap<String, Option<i64>>) -> Self {
        Self { defines }
    }

    /// Renders as `-D` compiler flags, in a deterministic (sorted) order so
    /// debug dumps and configuration names are stable across runs.
    pub fn to_options(&self) -> Vec<String> {
        let mut names: Vec<&String> = self.defines.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| match self.defines[name] {
                None => format!("-D{name}"),
                Some(value) => format!("-D{name}={value}"),
            })
            .collect()
    }

    pub fn to_display_string(&self) -> String {
        self.to_options().join(" ")
    }

    /// Whether this define set's implied assignment makes `expr` true,
    /// i.e. whether `(assignment) -> expr` is a tautology. Macros not
    /// mentioned in `expr` are irrelevant and excluded from the assignment.
    pub fn satisfies(&self, ctx: &Context, expr: &BoolExpr) -> bool {
        let scope = expr.free_macros();
        let assignment = self.assignment_over(&scope);
        crate::smt::implies(ctx, &assignment, expr)
    }

    fn assignment_over(&self, scope: &std::collections::BTreeSet<String>) -> BoolExpr {
        let mut assignment = BoolExpr::Bool(true);
        for name in scope {
            let defined = self.defines.contains_key(name);
            let def_clause = if defined {
                BoolExpr::Defined(name.clone())
            } else {
                BoolExpr::Defined(name.clone()).not()
            };
            assignment = assignment.and(def_clause);
            if let Some(Some(value)) = self.defines.get(name) {
                let val_clause = BoolExpr::Eq(
                    Box::new(crate::expr::IntExpr::MacroValue(name.clone())),
                    Box::new(crate::expr::IntExpr::Literal(*value)),
                );
                assignment = assignment.and(val_clause);
            }
        }
        assignment
    }

    pub fn sets_to_string(sets: &[DefineSet]) -> String {
        if sets.is_empty() {
            return "// No DefineSets generated\n".to_string();
        }
        let mut out = String::new();
        for (i, set) in sets.iter().enumerate() {
            out.push_str(&format!("// DefineSet {i}\n"));
            out.push_str(&set.to_display_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_options_is_sorted_and_formats_valued_and_valueless() {
        let mut defines = HashMap::new();
        defines.insert("B".to_string(), Some(2));
        defines.insert("A".to_string(), None);
        let set = DefineSet::from_model(defines);
        assert_eq!(set.to_options(), vec!["-DA".to_string(), "-DB=2".to_string()]);
    }

    #[test]
    fn satisfies_checks_the_implication() {
        let ctx = Context::new(&z3::Config::new());
        let mut defines = HashMap::new();
        defines.insert("A".to_string(), None);
        let set = DefineSet::from_model(defines);
        assert!(set.satisfies(&ctx, &BoolExpr::Defined("A".into())));
        assert!(!set.satisfies(&ctx, &BoolExpr::Defined("A".into()).not()));
    }
}
