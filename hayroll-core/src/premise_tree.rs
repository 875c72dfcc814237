//! Tracks the premise (a [`BoolExpr`] over macro `def`/`val` symbols) under
//! which each `#if`/`#else` body or macro expansion site is reached.
//! Arena-indexed for the same reason as [`crate::include_tree::IncludeForest`]:
//! parent and child premise-tree nodes form a cycle of ownership the Design
//! Notes ask to model with an owning handle rather than `Rc<RefCell<Weak<..>>>`.

use std::collections::HashMap;

use z3::Context;

use crate::expr::{simplify_structural, BoolExpr};
use crate::program_point::ProgramPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PremiseNodeId(pub(crate) u32);

#[derive(Debug, Clone)]
pub struct PremiseNode {
    pub program_point: ProgramPoint,
    pub premise: BoolExpr,
    /// Non-empty only for macro-expansion nodes: one premise per candidate
    /// macro definition site, keyed by that definition's program point.
    pub macro_premises: HashMap<ProgramPoint, BoolExpr>,
    pub parent: Option<PremiseNodeId>,
    pub children: Vec<PremiseNodeId>,
}

impl PremiseNode {
    pub fn is_macro_expansion(&self) -> bool {
        !self.macro_premises.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PremiseTree {
    nodes: Vec<PremiseNode>,
    root: PremiseNodeId,
    /// Fast program-point -> node lookup, mirroring the scribe's map.
    index: HashMap<ProgramPoint, PremiseNodeId>,
}

impl PremiseTree {
    pub fn new(program_point: ProgramPoint, premise: BoolExpr) -> Self {
        let root = PremiseNodeId(0);
        let mut index = HashMap::new();
        index.insert(program_point, root);
        Self {
            nodes: vec![PremiseNode {
                program_point,
                premise,
                macro_premises: HashMap::new(),
                parent: None,
                children: Vec::new(),
            }],
            root,
            index,
        }
    }

    pub fn root(&self) -> PremiseNodeId {
        self.root
    }

    pub fn get(&self, id: PremiseNodeId) -> &PremiseNode {
        &self.nodes[id.0 as usize]
    }

    fn get_mut(&mut self, id: PremiseNodeId) -> &mut PremiseNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn conjunct_root_premise(&mut self, premise: BoolExpr) {
        let root = self.root;
        let node = self.get_mut(root);
        node.premise = node.premise.clone().and(premise);
    }

    /// Disjuncts onto an existing node's premise, used when a second
    /// feasible path reaches an already-recorded program point.
    pub fn disjunct_premise(&mut self, program_point: ProgramPoint, premise: BoolExpr) {
        let id = *self
            .index
            .get(&program_point)
            .expect("disjunct target must already have a premise-tree node");
        let node = self.get_mut(id);
        node.premise = node.premise.clone().or(premise);
    }

    /// Creates a node for `program_point`, walking up through
    /// [`ProgramPoint::parent`]-reachable ancestors (supplied pre-resolved
    /// in `ancestor_chain`, innermost first) until one is already indexed,
    /// and attaching the new node there.
    pub fn create_node(
        &mut self,
        program_point: ProgramPoint,
        premise: BoolExpr,
        ancestor_chain: &[ProgramPoint],
    ) -> PremiseNodeId {
        assert!(!self.index.contains_key(&program_point));
        let parent_point = ancestor_chain
            .iter()
            .find(|p| self.index.contains_key(p))
            .expect("no ancestor of program_point is in the premise tree yet");
        let parent = self.index[parent_point];

        let id = PremiseNodeId(self.nodes.len() as u32);
        self.nodes.push(PremiseNode {
            program_point,
            premise,
            macro_premises: HashMap::new(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.get_mut(parent).children.push(id);
        self.index.insert(program_point, id);
        id
    }

    pub fn disjunct_macro_premise(
        &mut self,
        node: PremiseNodeId,
        definition_point: ProgramPoint,
        premise: BoolExpr,
    ) {
        let entry = self.get_mut(node).macro_premises.entry(definition_point);
        entry
            .and_modify(|existing| *existing = existing.clone().or(premise.clone()))
            .or_insert(premise);
    }

    /// Conjunction of `id`'s own premise with every ancestor's premise.
    pub fn complete_premise(&self, id: PremiseNodeId) -> BoolExpr {
        let mut complete = self.get(id).premise.clone();
        let mut ancestor = self.get(id).parent;
        while let Some(a) = ancestor {
            complete = complete.and(self.get(a).premise.clone());
            ancestor = self.get(a).parent;
        }
        complete
    }

    pub fn descendants_preorder(&self, id: PremiseNodeId) -> Vec<PremiseNodeId> {
        let mut out = vec![id];
        for &child in &self.get(id).children {
            out.extend(self.descendants_preorder(child));
        }
        out
    }

    /// The smallest node whose program point contains `target`.
    pub fn find_enclosing_node(
        &self,
        id: PremiseNodeId,
        target: &ProgramPoint,
        forest: &crate::include_tree::IncludeForest,
    ) -> PremiseNodeId {
        for &child in &self.get(id).children {
            if self.get(child).program_point.contains(target, forest) {
                return self.find_enclosing_node(child, target, forest);
            }
        }
        id
    }

    /// Renders an indented, human-readable dump of the tree rooted at
    /// `id`, for the `.premise_tree.raw.txt`/`.premise_tree.txt` artifacts:
    /// one line per node (program point, then premise, or every candidate
    /// macro-premise for an expansion node), children indented one level
    /// further.
    pub fn dump(&self, id: PremiseNodeId, forest: &crate::include_tree::IncludeForest, depth: usize) -> String {
        let indent = "    ".repeat(depth);
        let node = self.get(id);
        let mut out = if node.is_macro_expansion() {
            let mut line = format!("{indent}{} Macro expansion:", node.program_point.display(forest));
            for (point, premise) in &node.macro_premises {
                line.push_str(&format!(
                    "\n{indent}    {}: {premise}",
                    point.display(forest)
                ));
            }
            line
        } else {
            format!("{indent}{} {}", node.program_point.display(forest), node.premise)
        };
        for &child in &node.children {
            out.push('\n');
            out.push_str(&self.dump(child, forest, depth + 1));
        }
        out
    }

    /// Simplifies every node's premise and prunes nodes that can never be
    /// reached, or whose premise is already implied by their parent's
    /// complete premise (their children are reattached to the parent).
    pub fn refine(&mut self, ctx: &Context) {
        self.refine_node(self.root, ctx);
    }

    fn refine_node(&mut self, id: PremiseNodeId, ctx: &Context) {
        {
            let node = self.get_mut(id);
            node.premise = simplify_structural(node.premise.clone());
        }

        let complete = self.complete_premise(id);
        let macro_points: Vec<ProgramPoint> = self.get(id).macro_premises.keys().cloned().collect();
        for point in macro_points {
            let implied = {
                let premise = self.get(id).macro_premises[&point].clone();
                crate::smt::implies(ctx, &complete, &premise)
            };
            if implied {
                self.get_mut(id).macro_premises.remove(&point);
                continue;
            }
            let simplified = simplify_structural(self.get(id).macro_premises[&point].clone());
            self.get_mut(id).macro_premises.insert(point, simplified);
        }

        let children: Vec<PremiseNodeId> = self.get(id).children.clone();
        let mut new_children = Vec::new();
        for child in children {
            self.refine_node(child, ctx);

            let child_is_macro = self.get(child).is_macro_expansion();
            let child_complete = self.complete_premise(child);

            if !child_is_macro && crate::smt::check_sat(ctx, &child_complete) == crate::smt::Satisfiability::Unsat
            {
                continue;
            }

            let child_premise = self.get(child).premise.clone();
            if !child_is_macro && crate::smt::implies(ctx, &complete, &child_premise) {
                let grandchildren = self.get(child).children.clone();
                for gc in grandchildren {
                    self.get_mut(gc).parent = Some(id);
                    new_children.push(gc);
                }
            } else {
                new_children.push(child);
            }
        }
        self.get_mut(id).children = new_children;
    }
}

/// Takes down premise information as the symbolic executor visits program
/// points, creating premise-tree nodes and routing disjuncts to the right
/// place without the caller needing to track node ids itself.
pub struct PremiseTreeScribe {
    tree: Option<PremiseTree>,
}

impl PremiseTreeScribe {
    pub fn uninitialized() -> Self {
        Self { tree: None }
    }

    pub fn new(program_point: ProgramPoint, premise: BoolExpr) -> Self {
        Self {
            tree: Some(PremiseTree::new(program_point, premise)),
        }
    }

    pub fn conjunct_premise_onto_root(&mut self, premise: BoolExpr) {
        if let Some(tree) = &mut self.tree {
            tree.conjunct_root_premise(premise);
        }
    }

    pub fn disjunct_premise(&mut self, program_point: ProgramPoint, premise: BoolExpr) {
        if let Some(tree) = &mut self.tree {
            tree.disjunct_premise(program_point, premise);
        }
    }

    pub fn add_premise_or_create_child(
        &mut self,
        program_point: ProgramPoint,
        premise: BoolExpr,
        ancestor_chain: &[ProgramPoint],
    ) {
        let Some(tree) = &mut self.tree else { return };
        if tree.index.contains_key(&program_point) {
            tree.disjunct_premise(program_point, premise);
        } else {
            tree.create_node(program_point, premise, ancestor_chain);
        }
    }

    /// Records that `program_point` (a macro-expansion site) is reachable
    /// via `definition_point`'s definition under `premise`, creating the
    /// expansion site's node first if the symbolic executor hasn't visited
    /// it before.
    pub fn record_macro_premise(
        &mut self,
        program_point: ProgramPoint,
        site_premise: BoolExpr,
        definition_point: ProgramPoint,
        premise: BoolExpr,
        ancestor_chain: &[ProgramPoint],
    ) {
        let Some(tree) = &mut self.tree else { return };
        let node = if let Some(&id) = tree.index.get(&program_point) {
            id
        } else {
            tree.create_node(program_point, site_premise, ancestor_chain)
        };
        tree.disjunct_macro_premise(node, definition_point, premise);
    }

    pub fn take_tree(&mut self) -> Option<PremiseTree> {
        self.tree.take()
    }

    pub fn tree(&self) -> Option<&PremiseTree> {
        self.tree.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include_tree::{IncludeForest, IncludeNodeId};
    use crate::source_position::Span;

    fn point(forest_node: IncludeNodeId, start: usize, end: usize) -> ProgramPoint {
        ProgramPoint::new(
            forest_node,
            Span {
                start_byte: start,
                end_byte: end,
                start_point: Default::default(),
                end_point: Default::default(),
            },
        )
    }

    #[test]
    fn create_node_attaches_to_nearest_indexed_ancestor() {
        let root_node = IncludeNodeId::default();
        let root_point = point(root_node, 0, 100);
        let mut tree = PremiseTree::new(root_point, BoolExpr::Bool(true));

        let child_point = point(root_node, 10, 50);
        let child = tree.create_node(child_point, BoolExpr::Defined("A".into()), &[root_point]);

        assert_eq!(tree.get(child).parent, Some(tree.root()));
        assert_eq!(tree.get(tree.root()).children, vec![child]);
    }

    #[test]
    fn refine_prunes_unsatisfiable_child() {
        let ctx = Context::new(&z3::Config::new());
        let root_node = IncludeNodeId::default();
        let root_point = point(root_node, 0, 100);
        let mut tree = PremiseTree::new(root_point, BoolExpr::Bool(true));
        let child_point = point(root_node, 10, 50);
        let contradiction = BoolExpr::Defined("A".into()).and(BoolExpr::Defined("A".into()).not());
        tree.create_node(child_point, contradiction, &[root_point]);

        tree.refine(&ctx);
        assert!(tree.get(tree.root()).children.is_empty());
    }

    #[test]
    fn dump_indents_children_one_level_further() {
        let mut forest = IncludeForest::new();
        let root_node = forest.make_root("a.c");
        let root_point = point(root_node, 0, 100);
        let mut tree = PremiseTree::new(root_point, BoolExpr::Bool(true));
        let child_point = point(root_node, 10, 50);
        let child = tree.create_node(child_point, BoolExpr::Defined("A".into()), &[root_point]);

        let dump = tree.dump(tree.root(), &forest, 0);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].starts_with(' '));
        assert!(lines[1].starts_with("    "));
        assert!(lines[1].contains("def<A>"));
        let _ = child;
    }
}
