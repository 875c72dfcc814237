//! Picks a minimal cover of concrete configurations out of a refined
//! premise tree: a list of [`DefineSet`]s such that every node's complete
//! premise is satisfied by at least one of them.
//!
//! Reverse level order, greedy cover: work the tree from its deepest, most
//! specific nodes first (a child's complete premise implies its parent's,
//! so satisfying the child for free satisfies the parent too, but not vice
//! versa), and at each step discharge every remaining node the new
//! configuration happens to cover.

use std::collections::BTreeSet;

use z3::Context;

use crate::define_set::DefineSet;
use crate::error::{HayrollError, Result};
use crate::premise_tree::{PremiseNodeId, PremiseTree};

/// Picks a satisfying [`DefineSet`] per node of `tree` until every node is
/// covered, calling `check_transpilable` once per candidate configuration.
///
/// `check_transpilable` is expected to actually drive the external
/// preprocessor and transpiler against the configuration (a dry run) and
/// return an error if either rejects it -- a transpiler limitation the
/// Splitter surfaces loudly rather than silently dropping the
/// configuration, since a config no transpiler can handle means the output
/// program would be missing a reachable behavior.
pub fn split(
    tree: &PremiseTree,
    ctx: &Context,
    mut check_transpilable: impl FnMut(&DefineSet) -> Result<()>,
) -> Result<Vec<DefineSet>> {
    let mut work_list = level_order(tree);
    work_list.reverse();

    let mut configurations = Vec::new();

    while let Some(node) = work_list.first().copied() {
        let premise = tree.complete_premise(node);
        let scope: BTreeSet<String> = premise.free_macros();
        let model = crate::smt::find_model(ctx, &premise, &scope).ok_or_else(|| {
            HayrollError::Internal(format!(
                "premise-tree node has no satisfying model after refinement: {premise:?}"
            ))
        })?;
        let define_set = DefineSet::from_model(model);

        check_transpilable(&define_set)?;

        work_list.retain(|&n| {
            let other_premise = tree.complete_premise(n);
            !define_set.satisfies(ctx, &other_premise)
        });

        configurations.push(define_set);
    }

    Ok(configurations)
}

/// Level order over the whole tree (root first, deepest nodes last),
/// matching `getDescendantsLevelOrder()`.
fn level_order(tree: &PremiseTree) -> Vec<PremiseNodeId> {
    let mut order = Vec::new();
    let mut frontier = vec![tree.root()];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in &frontier {
            next.extend(tree.get(*id).children.iter().copied());
        }
        order.extend(frontier);
        frontier = next;
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BoolExpr;
    use crate::include_tree::IncludeNodeId;
    use crate::program_point::ProgramPoint;
    use crate::source_position::Span;

    fn point(start: usize, end: usize) -> ProgramPoint {
        ProgramPoint::new(
            IncludeNodeId::default(),
            Span {
                start_byte: start,
                end_byte: end,
                start_point: Default::default(),
                end_point: Default::default(),
            },
        )
    }

    #[test]
    fn covers_a_two_branch_guard() {
        let ctx = Context::new(&z3::Config::new());
        let mut tree = PremiseTree::new(point(0, 100), BoolExpr::Bool(true));
        let root = tree.root();
        let then_point = point(10, 20);
        let else_point = point(20, 30);
        tree.create_node(then_point, BoolExpr::Defined("A".into()), &[tree.get(root).program_point]);
        tree.create_node(
            else_point,
            BoolExpr::Defined("A".into()).not(),
            &[tree.get(root).program_point],
        );
        tree.refine(&ctx);

        let configurations = split(&tree, &ctx, |_| Ok(())).unwrap();
        assert_eq!(configurations.len(), 2);
        for node in [then_point, else_point] {
            let id = tree
                .descendants_preorder(tree.root())
                .into_iter()
                .find(|&id| tree.get(id).program_point == node)
                .expect("node must exist");
            let premise = tree.complete_premise(id);
            assert!(configurations
                .iter()
                .any(|set| set.satisfies(&ctx, &premise)));
        }
    }

    #[test]
    fn rejected_configuration_surfaces_as_an_error() {
        let ctx = Context::new(&z3::Config::new());
        let tree = PremiseTree::new(point(0, 100), BoolExpr::Bool(true));
        let result = split(&tree, &ctx, |_| {
            Err(HayrollError::NotTranspilable("unsupported".into()))
        });
        assert!(result.is_err());
    }
}
