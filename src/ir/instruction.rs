use crate::intern::Symbol;
use crate::ir::value::Value;
use crate::source::SourceSpan;

/// A stable position in a function's instruction list. Identifiers are never
/// reused, so they survive insertions and removals around them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct InstructionId(pub(crate) u32);

impl InstructionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of access granted over a value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Capability {
    Let,
    Inout,
    Sink,
}

impl Capability {
    pub fn spelling(self) -> &'static str {
        match self {
            Capability::Let => "let",
            Capability::Inout => "inout",
            Capability::Sink => "sink",
        }
    }
}

/// What a member projection selects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Member {
    Name(Symbol),
    Index(usize),
}

/// An IR instruction. Every instruction carries the source span it was
/// lowered from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// Allocates storage for a local.
    Alloc { site: SourceSpan },
    /// Opens an access region on `source` under `capability`.
    Access { source: Value, capability: Capability, site: SourceSpan },
    /// Closes the region opened by the access defining `start`.
    EndAccess { start: Value, site: SourceSpan },
    Store { value: Value, target: Value, site: SourceSpan },
    /// Projects a member out of `whole`; does not extend its lifetime.
    Member { whole: Value, member: Member, site: SourceSpan },
    Invoke { callee: Value, labels: Vec<Option<Symbol>>, arguments: Vec<Value>, site: SourceSpan },
    /// Subscript application.
    Project { callee: Value, labels: Vec<Option<Symbol>>, arguments: Vec<Value>, site: SourceSpan },
    Branch { target: BlockId, arguments: Vec<Value>, site: SourceSpan },
    CondBranch { condition: Value, success: BlockId, failure: BlockId, site: SourceSpan },
    Return { value: Value, site: SourceSpan },
    Throw { value: Value, site: SourceSpan },
    /// A subscript's projection point; not a terminator.
    Yield { value: Value, site: SourceSpan },
}

impl Instruction {
    pub fn site(&self) -> SourceSpan {
        match self {
            Instruction::Alloc { site }
            | Instruction::Access { site, .. }
            | Instruction::EndAccess { site, .. }
            | Instruction::Store { site, .. }
            | Instruction::Member { site, .. }
            | Instruction::Invoke { site, .. }
            | Instruction::Project { site, .. }
            | Instruction::Branch { site, .. }
            | Instruction::CondBranch { site, .. }
            | Instruction::Return { site, .. }
            | Instruction::Throw { site, .. }
            | Instruction::Yield { site, .. } => *site,
        }
    }

    /// The operands in positional order, matching the def-use chains.
    pub fn operands(&self) -> Vec<Value> {
        match self {
            Instruction::Alloc { .. } => Vec::new(),
            Instruction::Access { source, .. } => vec![source.clone()],
            Instruction::EndAccess { start, .. } => vec![start.clone()],
            Instruction::Store { value, target, .. } => vec![value.clone(), target.clone()],
            Instruction::Member { whole, .. } => vec![whole.clone()],
            Instruction::Invoke { callee, arguments, .. }
            | Instruction::Project { callee, arguments, .. } => {
                let mut operands = vec![callee.clone()];
                operands.extend(arguments.iter().cloned());
                operands
            }
            Instruction::Branch { arguments, .. } => arguments.clone(),
            Instruction::CondBranch { condition, .. } => vec![condition.clone()],
            Instruction::Return { value, .. }
            | Instruction::Throw { value, .. }
            | Instruction::Yield { value, .. } => vec![value.clone()],
        }
    }

    pub fn operand(&self, index: usize) -> Value {
        self.operands()[index].clone()
    }

    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Instruction::Branch { target, .. } => vec![*target],
            Instruction::CondBranch { success, failure, .. } => vec![*success, *failure],
            _ => Vec::new(),
        }
    }

    /// A terminator ends its block: a jump, a return, or a throw.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. }
                | Instruction::CondBranch { .. }
                | Instruction::Return { .. }
                | Instruction::Throw { .. }
        )
    }

    /// Whether this instruction defines a register.
    pub fn produces_value(&self) -> bool {
        matches!(
            self,
            Instruction::Alloc { .. }
                | Instruction::Access { .. }
                | Instruction::Member { .. }
                | Instruction::Invoke { .. }
                | Instruction::Project { .. }
        )
    }

    /// Whether the result of this instruction keeps its operands alive.
    /// Member projections and accesses do not.
    pub fn extends_operand_lifetimes(&self) -> bool {
        !matches!(self, Instruction::Member { .. } | Instruction::Access { .. })
    }

    /// Whether this instruction opens a region closed by a matching
    /// region-end.
    pub fn is_region_entry(&self) -> bool {
        matches!(self, Instruction::Access { .. })
    }

    /// The region entry closed by this instruction, if it is a region end.
    pub fn closed_region_entry(&self) -> Option<&Value> {
        match self {
            Instruction::EndAccess { start, .. } => Some(start),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Alloc { .. } => "alloc",
            Instruction::Access { .. } => "access",
            Instruction::EndAccess { .. } => "end_access",
            Instruction::Store { .. } => "store",
            Instruction::Member { .. } => "member",
            Instruction::Invoke { .. } => "invoke",
            Instruction::Project { .. } => "project",
            Instruction::Branch { .. } => "branch",
            Instruction::CondBranch { .. } => "cond_branch",
            Instruction::Return { .. } => "return",
            Instruction::Throw { .. } => "throw",
            Instruction::Yield { .. } => "yield",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::value::Constant;

    fn site() -> SourceSpan {
        SourceSpan::new(0, 0, 1)
    }

    #[test]
    fn terminators_are_exactly_jumps_returns_and_throws() {
        assert!(Instruction::Branch { target: BlockId(0), arguments: vec![], site: site() }
            .is_terminator());
        assert!(Instruction::Return { value: Value::unit(), site: site() }.is_terminator());
        assert!(Instruction::Throw { value: Value::unit(), site: site() }.is_terminator());
        assert!(!Instruction::Yield { value: Value::unit(), site: site() }.is_terminator());
        assert!(!Instruction::Alloc { site: site() }.is_terminator());
    }

    #[test]
    fn successors_follow_the_terminator_shape() {
        let branch = Instruction::Branch { target: BlockId(2), arguments: vec![], site: site() };
        assert_eq!(branch.successors(), vec![BlockId(2)]);
        let cond = Instruction::CondBranch {
            condition: Value::unit(),
            success: BlockId(1),
            failure: BlockId(2),
            site: site(),
        };
        assert_eq!(cond.successors(), vec![BlockId(1), BlockId(2)]);
        let ret = Instruction::Return { value: Value::unit(), site: site() };
        assert!(ret.successors().is_empty());
    }

    #[test]
    fn operand_order_is_stable() {
        let store = Instruction::Store {
            value: Value::Constant(Constant::Int(1)),
            target: Value::Constant(Constant::Int(2)),
            site: site(),
        };
        assert_eq!(store.operand(0), Value::Constant(Constant::Int(1)));
        assert_eq!(store.operand(1), Value::Constant(Constant::Int(2)));

        let invoke = Instruction::Invoke {
            callee: Value::Constant(Constant::Int(0)),
            labels: vec![None],
            arguments: vec![Value::Constant(Constant::Int(9))],
            site: site(),
        };
        assert_eq!(invoke.operands().len(), 2);
        assert_eq!(invoke.operand(1), Value::Constant(Constant::Int(9)));
    }

    #[test]
    fn member_and_access_do_not_extend_lifetimes() {
        let member = Instruction::Member {
            whole: Value::unit(),
            member: Member::Index(0),
            site: site(),
        };
        assert!(!member.extends_operand_lifetimes());
        let access = Instruction::Access {
            source: Value::unit(),
            capability: Capability::Let,
            site: site(),
        };
        assert!(!access.extends_operand_lifetimes());
        assert!(access.is_region_entry());
        let invoke = Instruction::Invoke {
            callee: Value::unit(),
            labels: vec![],
            arguments: vec![],
            site: site(),
        };
        assert!(invoke.extends_operand_lifetimes());
    }
}
