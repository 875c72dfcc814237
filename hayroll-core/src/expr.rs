//! A small serializable symbolic-expression AST, kept independent of the
//! `z3` crate's own expression types so that [`crate::define_set::DefineSet`]
//! and premise-tree dumps can be serialized without a live `z3::Context`.
//! [`crate::smt`] is the only place these are translated into z3 terms.

use serde::{Deserialize, Serialize};

/// An integer-valued preprocessor expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntExpr {
    Literal(i64),
    /// The value of macro `name`, i.e. `val<name>` in z3 terms.
    MacroValue(String),
    Neg(Box<IntExpr>),
    Not(Box<IntExpr>),
    BitNot(Box<IntExpr>),
    Add(Box<IntExpr>, Box<IntExpr>),
    Sub(Box<IntExpr>, Box<IntExpr>),
    Mul(Box<IntExpr>, Box<IntExpr>),
    Div(Box<IntExpr>, Box<IntExpr>),
    Rem(Box<IntExpr>, Box<IntExpr>),
    BitAnd(Box<IntExpr>, Box<IntExpr>),
    BitOr(Box<IntExpr>, Box<IntExpr>),
    BitXor(Box<IntExpr>, Box<IntExpr>),
    Shl(Box<IntExpr>, Box<IntExpr>),
    Shr(Box<IntExpr>, Box<IntExpr>),
    /// `cond ? then : else`, the only ternary the preprocessor grammar has.
    Cond(Box<BoolExpr>, Box<IntExpr>, Box<IntExpr>),
}

/// A boolean-valued preprocessor expression, as found in `#if`/`#elif`
/// conditions and in `DefineSet::satisfies` implications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolExpr {
    Bool(bool),
    /// Whether macro `name` is defined, i.e. `def<name>` in z3 terms.
    Defined(String),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Eq(Box<IntExpr>, Box<IntExpr>),
    Ne(Box<IntExpr>, Box<IntExpr>),
    Lt(Box<IntExpr>, Box<IntExpr>),
    Le(Box<IntExpr>, Box<IntExpr>),
    Gt(Box<IntExpr>, Box<IntExpr>),
    Ge(Box<IntExpr>, Box<IntExpr>),
}

impl BoolExpr {
    pub fn and(self, other: BoolExpr) -> BoolExpr {
        BoolExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: BoolExpr) -> BoolExpr {
        BoolExpr::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> BoolExpr {
        BoolExpr::Not(Box::new(self))
    }

    /// Every macro name appearing as a `Defined` or `MacroValue` leaf,
    /// deduplicated. Used to scope a [`crate::define_set::DefineSet`]'s
    /// implication check down to the macros that actually matter.
    pub fn free_macros(&self) -> std::collections::BTreeSet<String> {
        let mut names = std::collections::BTreeSet::new();
        self.collect_macros(&mut names);
        names
    }

    fn collect_macros(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            BoolExpr::Bool(_) => {}
            BoolExpr::Defined(name) => {
                out.insert(name.clone());
            }
            BoolExpr::Not(e) => e.collect_macros(out),
            BoolExpr::And(a, b) | BoolExpr::Or(a, b) => {
                a.collect_macros(out);
                b.collect_macros(out);
            }
            BoolExpr::Eq(a, b)
            | BoolExpr::Ne(a, b)
            | BoolExpr::Lt(a, b)
            | BoolExpr::Le(a, b)
            | BoolExpr::Gt(a, b)
            | BoolExpr::Ge(a, b) => {
                a.collect_int_macros(out);
                b.collect_int_macros(out);
            }
        }
    }
}

impl IntExpr {
    fn collect_int_macros(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            IntExpr::Literal(_) => {}
            IntExpr::MacroValue(name) => {
                out.insert(name.clone());
            }
            IntExpr::Neg(e) | IntExpr::Not(e) | IntExpr::BitNot(e) => e.collect_int_macros(out),
            IntExpr::Add(a, b)
            | IntExpr::Sub(a, b)
            | IntExpr::Mul(a, b)
            | IntExpr::Div(a, b)
            | IntExpr::Rem(a, b)
            | IntExpr::BitAnd(a, b)
            | IntExpr::BitOr(a, b)
            | IntExpr::BitXor(a, b)
            | IntExpr::Shl(a, b)
            | IntExpr::Shr(a, b) => {
                a.collect_int_macros(out);
                b.collect_int_macros(out);
            }
            IntExpr::Cond(c, t, e) => {
                c.collect_macros(out);
                t.collect_int_macros(out);
                e.collect_int_macros(out);
            }
        }
    }
}

impl std::fmt::Display for IntExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntExpr::Literal(v) => write!(f, "{v}"),
            IntExpr::MacroValue(name) => write!(f, "val<{name}>"),
            IntExpr::Neg(e) => write!(f, "-({e})"),
            IntExpr::Not(e) => write!(f, "!({e})"),
            IntExpr::BitNot(e) => write!(f, "~({e})"),
            IntExpr::Add(a, b) => write!(f, "({a} + {b})"),
            IntExpr::Sub(a, b) => write!(f, "({a} - {b})"),
            IntExpr::Mul(a, b) => write!(f, "({a} * {b})"),
            IntExpr::Div(a, b) => write!(f, "({a} / {b})"),
            IntExpr::Rem(a, b) => write!(f, "({a} % {b})"),
            IntExpr::BitAnd(a, b) => write!(f, "({a} & {b})"),
            IntExpr::BitOr(a, b) => write!(f, "({a} | {b})"),
            IntExpr::BitXor(a, b) => write!(f, "({a} ^ {b})"),
            IntExpr::Shl(a, b) => write!(f, "({a} << {b})"),
            IntExpr::Shr(a, b) => write!(f, "({a} >> {b})"),
            IntExpr::Cond(c, t, e) => write!(f, "({c} ? {t} : {e})"),
        }
    }
}

impl std::fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoolExpr::Bool(b) => write!(f, "{b}"),
            BoolExpr::Defined(name) => write!(f, "def<{name}>"),
            BoolExpr::Not(e) => write!(f, "!({e})"),
            BoolExpr::And(a, b) => write!(f, "({a} && {b})"),
            BoolExpr::Or(a, b) => write!(f, "({a} || {b})"),
            BoolExpr::Eq(a, b) => write!(f, "({a} == {b})"),
            BoolExpr::Ne(a, b) => write!(f, "({a} != {b})"),
            BoolExpr::Lt(a, b) => write!(f, "({a} < {b})"),
            BoolExpr::Le(a, b) => write!(f, "({a} <= {b})"),
            BoolExpr::Gt(a, b) => write!(f, "({a} > {b})"),
            BoolExpr::Ge(a, b) => write!(f, "({a} >= {b})"),
        }
    }
}

/// Structural "OR-of-ANDs" simplification used when a fully general z3
/// round-trip back into [`BoolExpr`] isn't worth the bridging cost: folds
/// constant `Bool`s and flattens nested `And`/`Or` of the same constant,
/// without attempting to decide general tautologies (that's what
/// [`crate::smt`] is for).
pub fn simplify_structural(expr: BoolExpr) -> BoolExpr {
    match expr {
        BoolExpr::Not(inner) => match simplify_structural(*inner) {
            BoolExpr::Bool(b) => BoolExpr::Bool(!b),
            BoolExpr::Not(inner2) => *inner2,
            other => BoolExpr::Not(Box::new(other)),
        },
        BoolExpr::And(a, b) => {
            let a = simplify_structural(*a);
            let b = simplify_structural(*b);
            match (a, b) {
                (BoolExpr::Bool(false), _) | (_, BoolExpr::Bool(false)) => BoolExpr::Bool(false),
                (BoolExpr::Bool(true), other) | (other, BoolExpr::Bool(true)) => other,
                (a, b) => BoolExpr::And(Box::new(a), Box::new(b)),
            }
        }
        BoolExpr::Or(a, b) => {
            let a = simplify_structural(*a);
            let b = simplify_structural(*b);
            match (a, b) {
                (BoolExpr::Bool(true), _) | (_, BoolExpr::Bool(true)) => BoolExpr::Bool(true),
                (BoolExpr::Bool(false), other) | (other, BoolExpr::Bool(false)) => other,
                (a, b) => BoolExpr::Or(Box::new(a), Box::new(b)),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_macros_collects_from_both_branches() {
        let expr = BoolExpr::Defined("A".into()).and(BoolExpr::Eq(
            Box::new(IntExpr::MacroValue("B".into())),
            Box::new(IntExpr::Literal(1)),
        ));
        let names: Vec<_> = expr.free_macros().into_iter().collect();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn structural_simplify_folds_and_with_false() {
        let expr = BoolExpr::Defined("A".into()).and(BoolExpr::Bool(false));
        assert_eq!(simplify_structural(expr), BoolExpr::Bool(false));
    }

    #[test]
    fn display_renders_defined_and_conjunctions() {
        let expr = BoolExpr::Defined("A".into()).and(BoolExpr::Defined("B".into()).not());
        assert_eq!(expr.to_string(), "(def<A> && !(def<B>))");
    }
}
