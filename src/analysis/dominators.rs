use std::collections::VecDeque;

use crate::ir::{BlockId, Function, Use, Value};

/// Successor/predecessor lists built by scanning block terminators.
#[derive(Debug)]
pub struct ControlFlowGraph {
    successors: Vec<Vec<BlockId>>,
    predecessors: Vec<Vec<BlockId>>,
}

impl ControlFlowGraph {
    pub fn of(function: &Function) -> Self {
        let count = function.block_count();
        let mut successors = vec![Vec::new(); count];
        let mut predecessors = vec![Vec::new(); count];
        for block in function.blocks() {
            if let Some(terminator) = function.terminator(block) {
                for successor in function.instruction(terminator).successors() {
                    successors[block.index()].push(successor);
                    predecessors[successor.index()].push(block);
                }
            }
        }
        ControlFlowGraph { successors, predecessors }
    }

    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        &self.successors[block.index()]
    }

    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        &self.predecessors[block.index()]
    }
}

/// The dominator tree of a function, computed with the iterative
/// Cooper–Harvey–Kennedy scheme: a BFS spanning tree refined by folding each
/// extra predecessor into the parent through lowest common ancestors, until
/// a fixed point.
#[derive(Debug)]
pub struct DominatorTree {
    parent: Vec<Option<BlockId>>,
    reachable: Vec<bool>,
    bfs: Vec<BlockId>,
}

impl DominatorTree {
    pub fn of(function: &Function, cfg: &ControlFlowGraph) -> Self {
        let count = function.block_count();
        let mut parent = vec![None; count];
        let mut reachable = vec![false; count];
        let mut bfs = Vec::new();
        let Some(entry) = function.entry() else {
            return DominatorTree { parent, reachable, bfs };
        };

        reachable[entry.index()] = true;
        let mut queue = VecDeque::from([entry]);
        while let Some(block) = queue.pop_front() {
            bfs.push(block);
            for &successor in cfg.successors(block) {
                if !reachable[successor.index()] {
                    reachable[successor.index()] = true;
                    parent[successor.index()] = Some(block);
                    queue.push_back(successor);
                }
            }
        }

        loop {
            let mut changed = false;
            for &block in bfs.iter().skip(1) {
                for &predecessor in cfg.predecessors(block) {
                    if !reachable[predecessor.index()] || Some(predecessor) == parent[block.index()]
                    {
                        continue;
                    }
                    let current = parent[block.index()].expect("non-entry block without parent");
                    let ancestor = lca(&parent, predecessor, current);
                    if parent[block.index()] != Some(ancestor) {
                        parent[block.index()] = Some(ancestor);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        DominatorTree { parent, reachable, bfs }
    }

    /// The immediate dominator, `None` for the entry and unreachable blocks.
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        self.parent[block.index()]
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable[block.index()]
    }

    /// The strict dominators of `block`, nearest first.
    pub fn strict_dominators(&self, block: BlockId) -> Vec<BlockId> {
        let mut dominators = Vec::new();
        let mut cursor = self.parent[block.index()];
        while let Some(block) = cursor {
            dominators.push(block);
            cursor = self.parent[block.index()];
        }
        dominators
    }

    /// Blocks in breadth-first order from the entry.
    pub fn bfs_order(&self) -> &[BlockId] {
        &self.bfs
    }

    /// Whether `a` dominates `b`. Unreachable blocks dominate nothing and
    /// are dominated by nothing.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.reachable[a.index()] || !self.reachable[b.index()] {
            return false;
        }
        a == b || self.strict_dominators(b).contains(&a)
    }
}

fn depth(parent: &[Option<BlockId>], block: BlockId) -> usize {
    let mut depth = 0;
    let mut cursor = parent[block.index()];
    while let Some(block) = cursor {
        depth += 1;
        cursor = parent[block.index()];
    }
    depth
}

/// Ancestor walk matching by depth.
fn lca(parent: &[Option<BlockId>], a: BlockId, b: BlockId) -> BlockId {
    let mut a = a;
    let mut b = b;
    let mut depth_a = depth(parent, a);
    let mut depth_b = depth(parent, b);
    while depth_a > depth_b {
        a = parent[a.index()].expect("depth accounted for the parent");
        depth_a -= 1;
    }
    while depth_b > depth_a {
        b = parent[b.index()].expect("depth accounted for the parent");
        depth_b -= 1;
    }
    while a != b {
        a = parent[a.index()].expect("roots converge");
        b = parent[b.index()].expect("roots converge");
    }
    a
}

/// Whether the definition of `value` dominates `use_site`, collapsing to
/// instruction order when both live in the same block. Constants and poison
/// dominate everything.
pub fn definition_dominates_use(
    function: &Function,
    tree: &DominatorTree,
    value: &Value,
    use_site: Use,
) -> bool {
    let user_block = function.block_containing(use_site.user);
    match value {
        Value::Constant(_) | Value::Poison(_) => true,
        Value::Parameter(block, _) => {
            *block == user_block || tree.dominates(*block, user_block)
        }
        Value::Register(definition) => {
            let definition_block = function.block_containing(*definition);
            if definition_block == user_block {
                function.comes_before(*definition, use_site.user)
            } else {
                tree.dominates(definition_block, user_block)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InsertionPoint, Instruction};
    use crate::source::SourceSpan;

    fn site() -> SourceSpan {
        SourceSpan::new(0, 0, 1)
    }

    fn branch(function: &mut Function, from: BlockId, to: BlockId) {
        function.insert(
            InsertionPoint::End(from),
            Instruction::Branch { target: to, arguments: vec![], site: site() },
        );
    }

    fn cond(function: &mut Function, from: BlockId, success: BlockId, failure: BlockId) {
        function.insert(
            InsertionPoint::End(from),
            Instruction::CondBranch {
                condition: Value::unit(),
                success,
                failure,
                site: site(),
            },
        );
    }

    fn ret(function: &mut Function, block: BlockId) {
        function.insert(
            InsertionPoint::End(block),
            Instruction::Return { value: Value::unit(), site: site() },
        );
    }

    /// entry → (then | otherwise) → join → exit.
    fn diamond() -> (Function, [BlockId; 4]) {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let then = f.append_block(0);
        let otherwise = f.append_block(0);
        let join = f.append_block(0);
        cond(&mut f, entry, then, otherwise);
        branch(&mut f, then, join);
        branch(&mut f, otherwise, join);
        ret(&mut f, join);
        (f, [entry, then, otherwise, join])
    }

    #[test]
    fn diamond_joins_dominated_by_the_fork() {
        let (f, [entry, then, otherwise, join]) = diamond();
        let cfg = ControlFlowGraph::of(&f);
        let tree = DominatorTree::of(&f, &cfg);
        assert_eq!(tree.immediate_dominator(entry), None);
        assert_eq!(tree.immediate_dominator(then), Some(entry));
        assert_eq!(tree.immediate_dominator(otherwise), Some(entry));
        assert_eq!(tree.immediate_dominator(join), Some(entry));
        assert!(tree.dominates(entry, join));
        assert!(!tree.dominates(then, join));
        assert!(tree.dominates(join, join));
    }

    #[test]
    fn strict_dominators_walk_to_the_root() {
        let (f, [entry, _, _, join]) = diamond();
        let cfg = ControlFlowGraph::of(&f);
        let tree = DominatorTree::of(&f, &cfg);
        assert_eq!(tree.strict_dominators(join), vec![entry]);
        assert!(tree.strict_dominators(entry).is_empty());
    }

    #[test]
    fn loops_keep_the_header_as_dominator() {
        // entry → head; head → (body | exit); body → head.
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let head = f.append_block(0);
        let body = f.append_block(0);
        let exit = f.append_block(0);
        branch(&mut f, entry, head);
        cond(&mut f, head, body, exit);
        branch(&mut f, body, head);
        ret(&mut f, exit);
        let cfg = ControlFlowGraph::of(&f);
        let tree = DominatorTree::of(&f, &cfg);
        assert_eq!(tree.immediate_dominator(head), Some(entry));
        assert_eq!(tree.immediate_dominator(body), Some(head));
        assert_eq!(tree.immediate_dominator(exit), Some(head));
        assert!(tree.dominates(head, body));
        assert!(!tree.dominates(body, exit));
    }

    #[test]
    fn unreachable_blocks_are_outside_the_tree() {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let orphan = f.append_block(0);
        ret(&mut f, entry);
        ret(&mut f, orphan);
        let cfg = ControlFlowGraph::of(&f);
        let tree = DominatorTree::of(&f, &cfg);
        assert!(!tree.is_reachable(orphan));
        assert!(!tree.dominates(entry, orphan));
        assert!(!tree.dominates(orphan, orphan));
        assert_eq!(tree.bfs_order(), &[entry]);
    }

    #[test]
    fn same_block_definitions_collapse_to_order() {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let storage = f.insert(InsertionPoint::End(entry), Instruction::Alloc { site: site() });
        let store = f.insert(
            InsertionPoint::End(entry),
            Instruction::Store {
                value: Value::unit(),
                target: Value::Register(storage),
                site: site(),
            },
        );
        ret(&mut f, entry);
        let cfg = ControlFlowGraph::of(&f);
        let tree = DominatorTree::of(&f, &cfg);
        let use_site = f.uses(&Value::Register(storage))[0];
        assert_eq!(use_site.user, store);
        assert!(definition_dominates_use(&f, &tree, &Value::Register(storage), use_site));
        // The reverse order would not dominate.
        assert!(!f.comes_before(store, storage));
    }
}
