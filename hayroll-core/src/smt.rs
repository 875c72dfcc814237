//! Bridges [`crate::expr::BoolExpr`]/[`crate::expr::IntExpr`] to `z3` terms
//! for the three decision-procedure calls the symbolic executor needs:
//! satisfiability, tautology, and model extraction. Every other module
//! manipulates the serializable expression types directly and never touches
//! `z3::Context`.

use std::collections::HashMap;

use z3::ast::{Ast, Bool, Int};
use z3::{Context, SatResult, Solver};

use crate::expr::{BoolExpr, IntExpr};

/// `def<name>`/`val<name>` constants allocated for one lowering pass, kept
/// alive only as long as the `Context` that made them.
struct Lowering<'ctx> {
    ctx: &'ctx Context,
    bools: HashMap<String, Bool<'ctx>>,
    ints: HashMap<String, Int<'ctx>>,
}

impl<'ctx> Lowering<'ctx> {
    fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            bools: HashMap::new(),
            ints: HashMap::new(),
        }
    }

    fn def_const(&mut self, name: &str) -> Bool<'ctx> {
        self.bools
            .entry(name.to_string())
            .or_insert_with(|| Bool::new_const(self.ctx, format!("def{name}")))
            .clone()
    }

    fn val_const(&mut self, name: &str) -> Int<'ctx> {
        self.ints
            .entry(name.to_string())
            .or_insert_with(|| Int::new_const(self.ctx, format!("val{name}")))
            .clone()
    }

    fn lower_bool(&mut self, expr: &BoolExpr) -> Bool<'ctx> {
        match expr {
            BoolExpr::Bool(b) => Bool::from_bool(self.ctx, *b),
            BoolExpr::Defined(name) => self.def_const(name),
            BoolExpr::Not(e) => self.lower_bool(e).not(),
            BoolExpr::And(a, b) => Bool::and(self.ctx, &[&self.lower_bool(a), &self.lower_bool(b)]),
            BoolExpr::Or(a, b) => Bool::or(self.ctx, &[&self.lower_bool(a), &self.lower_bool(b)]),
            BoolExpr::Eq(a, b) => self.lower_int(a)._eq(&self.lower_int(b)),
            BoolExpr::Ne(a, b) => self.lower_int(a)._eq(&self.lower_int(b)).not(),
            BoolExpr::Lt(a, b) => self.lower_int(a).lt(&self.lower_int(b)),
            BoolExpr::Le(a, b) => self.lower_int(a).le(&self.lower_int(b)),
            BoolExpr::Gt(a, b) => self.lower_int(a).gt(&self.lower_int(b)),
            BoolExpr::Ge(a, b) => self.lower_int(a).ge(&self.lower_int(b)),
        }
    }

    fn lower_int(&mut self, expr: &IntExpr) -> Int<'ctx> {
        match expr {
            IntExpr::Literal(v) => Int::from_i64(self.ctx, *v),
            IntExpr::MacroValue(name) => self.val_const(name),
            IntExpr::Neg(e) => self.lower_int(e).unary_minus(),
            IntExpr::Not(e) => {
                let zero = Int::from_i64(self.ctx, 0);
                self.lower_bool_as_int(&BoolExpr::Eq(
                    Box::new(e.as_ref().clone()),
                    Box::new(IntExpr::Literal(0)),
                ))
                .ite(&Int::from_i64(self.ctx, 1), &zero)
            }
            IntExpr::BitNot(e) => {
                let one = Int::from_i64(self.ctx, 1);
                self.lower_int(e).unary_minus() - one
            }
            IntExpr::Add(a, b) => Int::add(self.ctx, &[&self.lower_int(a), &self.lower_int(b)]),
            IntExpr::Sub(a, b) => Int::sub(self.ctx, &[&self.lower_int(a), &self.lower_int(b)]),
            IntExpr::Mul(a, b) => Int::mul(self.ctx, &[&self.lower_int(a), &self.lower_int(b)]),
            IntExpr::Div(a, b) => self.lower_int(a).div(&self.lower_int(b)),
            IntExpr::Rem(a, b) => self.lower_int(a).rem(&self.lower_int(b)),
            // Bitwise ops have no native z3 Int support; approximated via
            // to_bv/from_bv is more machinery than this pipeline needs, so
            // they round-trip through a 64-bit bitvector.
            IntExpr::BitAnd(a, b) => self.lower_bv_op(a, b, |x, y| x.bvand(y)),
            IntExpr::BitOr(a, b) => self.lower_bv_op(a, b, |x, y| x.bvor(y)),
            IntExpr::BitXor(a, b) => self.lower_bv_op(a, b, |x, y| x.bvxor(y)),
            IntExpr::Shl(a, b) => self.lower_bv_op(a, b, |x, y| x.bvshl(y)),
            IntExpr::Shr(a, b) => self.lower_bv_op(a, b, |x, y| x.bvashr(y)),
            IntExpr::Cond(c, t, e) => {
                let cond = self.lower_bool(c);
                cond.ite(&self.lower_int(t), &self.lower_int(e))
            }
        }
    }

    fn lower_bool_as_int(&mut self, expr: &BoolExpr) -> Bool<'ctx> {
        self.lower_bool(expr)
    }

    fn lower_bv_op(
        &mut self,
        a: &IntExpr,
        b: &IntExpr,
        op: impl Fn(&z3::ast::BV<'ctx>, &z3::ast::BV<'ctx>) -> z3::ast::BV<'ctx>,
    ) -> Int<'ctx> {
        let bv_a = self.lower_int(a).int2bv(64);
        let bv_b = self.lower_int(b).int2bv(64);
        op(&bv_a, &bv_b).bv2int(true)
    }
}

/// `Sat`/`Unsat`/`Unknown`, mirroring `z3::SatResult` without leaking the
/// `z3` crate's type into callers that only branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satisfiability {
    Sat,
    Unsat,
    Unknown,
}

/// Checks whether `expr` is satisfiable under an empty assumption set.
pub fn check_sat(ctx: &Context, expr: &BoolExpr) -> Satisfiability {
    let solver = Solver::new(ctx);
    let mut lowering = Lowering::new(ctx);
    solver.assert(&lowering.lower_bool(expr));
    match solver.check() {
        SatResult::Sat => Satisfiability::Sat,
        SatResult::Unsat => Satisfiability::Unsat,
        SatResult::Unknown => Satisfiability::Unknown,
    }
}

/// Checks whether `expr` is a tautology, i.e. `not expr` is unsatisfiable.
pub fn is_tautology(ctx: &Context, expr: &BoolExpr) -> bool {
    check_sat(ctx, &expr.clone().not()) == Satisfiability::Unsat
}

/// Checks whether `antecedent -> consequent` is a tautology, the operation
/// [`crate::define_set::DefineSet::satisfies`] needs.
pub fn implies(ctx: &Context, antecedent: &BoolExpr, consequent: &BoolExpr) -> bool {
    let combined = antecedent.clone().not().or(consequent.clone());
    is_tautology(ctx, &combined)
}

/// Finds one satisfying model of `expr` and reads off the `def`/`val`
/// assignments for exactly the macro names in `scope`, producing a
/// [`crate::define_set::DefineSet`]-shaped result. Returns `None` if `expr`
/// is unsatisfiable.
pub fn find_model(
    ctx: &Context,
    expr: &BoolExpr,
    scope: &std::collections::BTreeSet<String>,
) -> Option<HashMap<String, Option<i64>>> {
    let solver = Solver::new(ctx);
    let mut lowering = Lowering::new(ctx);
    solver.assert(&lowering.lower_bool(expr));
    if solver.check() != SatResult::Sat {
        return None;
    }
    let model = solver.get_model()?;
    let mut defines = HashMap::new();
    for name in scope {
        let def_const = lowering.def_const(name);
        let is_defined = model
            .eval(&def_const, true)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !is_defined {
            continue;
        }
        let val_const = lowering.val_const(name);
        let value = model.eval(&val_const, true).and_then(|v| v.as_i64());
        defines.insert(name.clone(), value);
    }
    Some(defines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tautology_of_p_or_not_p() {
        let ctx = Context::new(&z3::Config::new());
        let p = BoolExpr::Defined("A".into());
        let tautology = p.clone().or(p.not());
        assert!(is_tautology(&ctx, &tautology));
    }

    #[test]
    fn unsat_of_defined_and_not_defined() {
        let ctx = Context::new(&z3::Config::new());
        let p = BoolExpr::Defined("A".into());
        let contradiction = p.clone().and(p.not());
        assert_eq!(check_sat(&ctx, &contradiction), Satisfiability::Unsat);
    }

    #[test]
    fn find_model_picks_a_defined_assignment() {
        let ctx = Context::new(&z3::Config::new());
        let expr = BoolExpr::Defined("A".into());
        let scope = ["A".to_string()].into_iter().collect();
        let defines = find_model(&ctx, &expr, &scope).unwrap();
        assert_eq!(defines.get("A"), Some(&None));
    }
}
