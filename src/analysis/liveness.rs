use std::collections::{HashMap, HashSet};

use crate::analysis::dominators::ControlFlowGraph;
use crate::ir::{BlockId, Function, InstructionId, Value};

/// How a value's live-range covers one block. `LiveIn` and `Closed` carry
/// the last instruction referencing the value in that block, when one
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    LiveInAndOut,
    LiveOut,
    LiveIn(Option<InstructionId>),
    Closed(Option<InstructionId>),
}

impl Coverage {
    fn rank(self) -> u8 {
        match self {
            Coverage::LiveInAndOut => 3,
            Coverage::LiveOut => 2,
            Coverage::LiveIn(_) => 1,
            Coverage::Closed(_) => 0,
        }
    }
}

/// A value's per-block coverage. Blocks the value never reaches are absent.
#[derive(Debug, Clone, Default)]
pub struct LiveRange {
    pub coverage: HashMap<BlockId, Coverage>,
}

impl LiveRange {
    /// A range is empty when the value never outlives its definition point.
    pub fn is_empty(&self) -> bool {
        self.coverage.values().all(|c| matches!(c, Coverage::Closed(None)))
    }
}

fn definition_block(function: &Function, value: &Value) -> Option<BlockId> {
    match value {
        Value::Register(id) => Some(function.block_containing(*id)),
        Value::Parameter(block, _) => Some(*block),
        Value::Constant(_) | Value::Poison(_) => None,
    }
}

/// The last position in `block` at which an operand references `value`.
fn last_use_in(function: &Function, block: BlockId, value: &Value) -> Option<InstructionId> {
    let mut last = None;
    for id in function.instructions_in(block) {
        if function.instruction(id).operands().contains(value) {
            last = Some(id);
        }
    }
    last
}

/// Computes the live-range of `value` by path exploration: seed the blocks
/// of its users, then walk predecessors until the definition block closes
/// every path.
pub fn live_range(function: &Function, cfg: &ControlFlowGraph, value: &Value) -> LiveRange {
    let Some(definition) = definition_block(function, value) else {
        return LiveRange::default();
    };
    let mut live_in: HashSet<BlockId> = HashSet::new();
    let mut live_out: HashSet<BlockId> = HashSet::new();
    let mut work: Vec<BlockId> = function
        .uses(value)
        .iter()
        .map(|u| function.block_containing(u.user))
        .filter(|b| *b != definition)
        .collect();
    while let Some(block) = work.pop() {
        if !live_in.insert(block) {
            continue;
        }
        for &predecessor in cfg.predecessors(block) {
            live_out.insert(predecessor);
            if predecessor != definition {
                work.push(predecessor);
            }
        }
    }

    let mut coverage = HashMap::new();
    coverage.insert(
        definition,
        if live_out.contains(&definition) {
            Coverage::LiveOut
        } else {
            Coverage::Closed(last_use_in(function, definition, value))
        },
    );
    for &block in &live_in {
        coverage.insert(
            block,
            if live_out.contains(&block) {
                Coverage::LiveInAndOut
            } else {
                Coverage::LiveIn(last_use_in(function, block, value))
            },
        );
    }
    LiveRange { coverage }
}

/// The live-range of `value` merged with the extended live-ranges of the
/// uses that extend operand lifetimes (member projections and accesses do
/// not).
pub fn extended_live_range(function: &Function, cfg: &ControlFlowGraph, value: &Value) -> LiveRange {
    let mut visiting = HashSet::new();
    extend(function, cfg, value, &mut visiting)
}

fn extend(
    function: &Function,
    cfg: &ControlFlowGraph,
    value: &Value,
    visiting: &mut HashSet<Value>,
) -> LiveRange {
    let mut range = live_range(function, cfg, value);
    if !visiting.insert(value.clone()) {
        return range;
    }
    for use_site in function.uses(value).to_vec() {
        let user = function.instruction(use_site.user);
        if !user.extends_operand_lifetimes() || !user.produces_value() {
            continue;
        }
        let result = Value::Register(use_site.user);
        let nested = extend(function, cfg, &result, visiting);
        range = merge(function, range, nested);
    }
    visiting.remove(value);
    range
}

/// Per-block merge on the coverage lattice `InAndOut ≻ Out ≻ In ≻ Closed`;
/// ties between uses keep the later one.
fn merge(function: &Function, mut a: LiveRange, b: LiveRange) -> LiveRange {
    for (block, coverage) in b.coverage {
        match a.coverage.get(&block) {
            None => {
                a.coverage.insert(block, coverage);
            }
            Some(existing) => {
                let merged = merge_coverage(function, *existing, coverage);
                a.coverage.insert(block, merged);
            }
        }
    }
    a
}

fn merge_coverage(function: &Function, a: Coverage, b: Coverage) -> Coverage {
    if a.rank() != b.rank() {
        return if a.rank() > b.rank() { a } else { b };
    }
    match (a, b) {
        (Coverage::LiveIn(x), Coverage::LiveIn(y)) => Coverage::LiveIn(later(function, x, y)),
        (Coverage::Closed(x), Coverage::Closed(y)) => Coverage::Closed(later(function, x, y)),
        _ => a,
    }
}

fn later(
    function: &Function,
    a: Option<InstructionId>,
    b: Option<InstructionId>,
) -> Option<InstructionId> {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(x), Some(y)) => {
            if function.comes_before(x, y) {
                Some(y)
            } else {
                Some(x)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Capability, InsertionPoint, Instruction, Member};
    use crate::source::SourceSpan;

    fn site() -> SourceSpan {
        SourceSpan::new(0, 0, 1)
    }

    #[test]
    fn a_value_used_in_its_own_block_is_closed_at_the_last_use() {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let storage = f.insert(InsertionPoint::End(entry), Instruction::Alloc { site: site() });
        let first = f.insert(
            InsertionPoint::End(entry),
            Instruction::Store {
                value: Value::unit(),
                target: Value::Register(storage),
                site: site(),
            },
        );
        let second = f.insert(
            InsertionPoint::End(entry),
            Instruction::Store {
                value: Value::unit(),
                target: Value::Register(storage),
                site: site(),
            },
        );
        f.insert(
            InsertionPoint::End(entry),
            Instruction::Return { value: Value::unit(), site: site() },
        );
        let cfg = ControlFlowGraph::of(&f);
        let range = live_range(&f, &cfg, &Value::Register(storage));
        assert_eq!(range.coverage.len(), 1);
        assert_eq!(range.coverage[&entry], Coverage::Closed(Some(second)));
        assert!(f.comes_before(first, second));
        assert!(!range.is_empty());
    }

    #[test]
    fn an_unused_value_has_an_empty_range() {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let storage = f.insert(InsertionPoint::End(entry), Instruction::Alloc { site: site() });
        f.insert(
            InsertionPoint::End(entry),
            Instruction::Return { value: Value::unit(), site: site() },
        );
        let cfg = ControlFlowGraph::of(&f);
        let range = live_range(&f, &cfg, &Value::Register(storage));
        assert!(range.is_empty());
        assert_eq!(range.coverage[&entry], Coverage::Closed(None));
    }

    #[test]
    fn cross_block_uses_mark_live_out_and_live_in() {
        // entry defines, middle passes through, last uses.
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let middle = f.append_block(0);
        let last = f.append_block(0);
        let storage = f.insert(InsertionPoint::End(entry), Instruction::Alloc { site: site() });
        f.insert(
            InsertionPoint::End(entry),
            Instruction::Branch { target: middle, arguments: vec![], site: site() },
        );
        f.insert(
            InsertionPoint::End(middle),
            Instruction::Branch { target: last, arguments: vec![], site: site() },
        );
        let use_site = f.insert(
            InsertionPoint::End(last),
            Instruction::Store {
                value: Value::unit(),
                target: Value::Register(storage),
                site: site(),
            },
        );
        f.insert(
            InsertionPoint::End(last),
            Instruction::Return { value: Value::unit(), site: site() },
        );
        let cfg = ControlFlowGraph::of(&f);
        let range = live_range(&f, &cfg, &Value::Register(storage));
        assert_eq!(range.coverage[&entry], Coverage::LiveOut);
        assert_eq!(range.coverage[&middle], Coverage::LiveInAndOut);
        assert_eq!(range.coverage[&last], Coverage::LiveIn(Some(use_site)));
    }

    #[test]
    fn member_projections_do_not_extend_the_range() {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let next = f.append_block(0);
        let storage = f.insert(InsertionPoint::End(entry), Instruction::Alloc { site: site() });
        let projection = f.insert(
            InsertionPoint::End(entry),
            Instruction::Member {
                whole: Value::Register(storage),
                member: Member::Index(0),
                site: site(),
            },
        );
        f.insert(
            InsertionPoint::End(entry),
            Instruction::Branch { target: next, arguments: vec![], site: site() },
        );
        // The projection is used in the next block, the storage is not.
        f.insert(
            InsertionPoint::End(next),
            Instruction::Return { value: Value::Register(projection), site: site() },
        );
        let cfg = ControlFlowGraph::of(&f);
        let range = extended_live_range(&f, &cfg, &Value::Register(storage));
        assert_eq!(range.coverage[&entry], Coverage::Closed(Some(projection)));
        assert!(!range.coverage.contains_key(&next));
    }

    #[test]
    fn invocations_extend_their_operands() {
        let mut f = Function::declaration(vec![], false, site());
        let entry = f.append_block(0);
        let next = f.append_block(0);
        let access = f.insert(
            InsertionPoint::End(entry),
            Instruction::Access {
                source: Value::unit(),
                capability: Capability::Let,
                site: site(),
            },
        );
        let call = f.insert(
            InsertionPoint::End(entry),
            Instruction::Invoke {
                callee: Value::unit(),
                labels: vec![None],
                arguments: vec![Value::Register(access)],
                site: site(),
            },
        );
        f.insert(
            InsertionPoint::End(entry),
            Instruction::Branch { target: next, arguments: vec![], site: site() },
        );
        f.insert(
            InsertionPoint::End(next),
            Instruction::Return { value: Value::Register(call), site: site() },
        );
        let cfg = ControlFlowGraph::of(&f);
        // The invocation's result is live out of the entry block, so the
        // extended range of the access follows it there.
        let range = extended_live_range(&f, &cfg, &Value::Register(access));
        assert_eq!(range.coverage[&entry], Coverage::LiveOut);
        assert!(range.coverage.contains_key(&next));
    }

    #[test]
    fn merge_prefers_the_wider_coverage() {
        let f = Function::declaration(vec![], false, site());
        assert_eq!(
            merge_coverage(&f, Coverage::LiveOut, Coverage::LiveIn(None)),
            Coverage::LiveOut
        );
        assert_eq!(
            merge_coverage(&f, Coverage::Closed(None), Coverage::LiveInAndOut),
            Coverage::LiveInAndOut
        );
    }
}
