use std::collections::HashMap;

use crate::intern::Symbol;
use crate::ir::instruction::{BlockId, Instruction, InstructionId};
use crate::ir::value::Value;
use crate::source::SourceSpan;

/// One use of a value: the using instruction and the operand position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Use {
    pub user: InstructionId,
    pub index: usize,
}

/// Where the next instruction goes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InsertionPoint {
    Start(BlockId),
    End(BlockId),
    Before(InstructionId),
    After(InstructionId),
}

#[derive(Debug)]
struct Slot {
    instruction: Instruction,
    prev: Option<InstructionId>,
    next: Option<InstructionId>,
    block: BlockId,
    live: bool,
}

/// A basic block: its parameter arity and a window into the function-wide
/// instruction list.
#[derive(Debug)]
pub struct Block {
    pub parameter_count: usize,
    first: Option<InstructionId>,
    last: Option<InstructionId>,
}

impl Block {
    pub fn first(&self) -> Option<InstructionId> {
        self.first
    }

    pub fn last(&self) -> Option<InstructionId> {
        self.last
    }
}

/// An IR function: argument labels, basic blocks, and an instruction list
/// whose positions stay stable under insertion and removal. Def-use chains
/// are maintained by [`Function::insert`] and [`Function::remove`].
#[derive(Debug)]
pub struct Function {
    pub labels: Vec<Option<Symbol>>,
    pub is_subscript: bool,
    pub site: SourceSpan,
    blocks: Vec<Block>,
    slots: Vec<Slot>,
    uses: HashMap<Value, Vec<Use>>,
}

impl Function {
    /// A declaration stub; [`Function::is_defined`] stays false until an
    /// entry block is appended.
    pub fn declaration(labels: Vec<Option<Symbol>>, is_subscript: bool, site: SourceSpan) -> Self {
        Function {
            labels,
            is_subscript,
            site,
            blocks: Vec::new(),
            slots: Vec::new(),
            uses: HashMap::new(),
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn append_block(&mut self, parameter_count: usize) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block { parameter_count, first: None, last: None });
        id
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.is_defined().then_some(BlockId(0))
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn instruction(&self, id: InstructionId) -> &Instruction {
        let slot = &self.slots[id.index()];
        debug_assert!(slot.live, "instruction was removed");
        &slot.instruction
    }

    pub fn block_containing(&self, id: InstructionId) -> BlockId {
        self.slots[id.index()].block
    }

    /// Splices `instruction` at `point` and records a use for each operand.
    pub fn insert(&mut self, point: InsertionPoint, instruction: Instruction) -> InstructionId {
        let (block, prev, next) = match point {
            InsertionPoint::Start(b) => (b, None, self.blocks[b.index()].first),
            InsertionPoint::End(b) => (b, self.blocks[b.index()].last, None),
            InsertionPoint::Before(i) => {
                let slot = &self.slots[i.index()];
                (slot.block, slot.prev, Some(i))
            }
            InsertionPoint::After(i) => {
                let slot = &self.slots[i.index()];
                (slot.block, Some(i), slot.next)
            }
        };
        let id = InstructionId(self.slots.len() as u32);
        for (index, operand) in instruction.operands().into_iter().enumerate() {
            self.uses.entry(operand).or_default().push(Use { user: id, index });
        }
        self.slots.push(Slot { instruction, prev, next, block, live: true });
        match prev {
            Some(p) => self.slots[p.index()].next = Some(id),
            None => self.blocks[block.index()].first = Some(id),
        }
        match next {
            Some(n) => self.slots[n.index()].prev = Some(id),
            None => self.blocks[block.index()].last = Some(id),
        }
        id
    }

    /// Unlinks `id` and clears the uses of its operands. The instruction's
    /// own register must be unused.
    pub fn remove(&mut self, id: InstructionId) {
        let slot = &self.slots[id.index()];
        assert!(slot.live, "instruction already removed");
        let (prev, next, block) = (slot.prev, slot.next, slot.block);
        debug_assert!(self
            .uses
            .get(&Value::Register(id))
            .map_or(true, |uses| uses.is_empty()));

        let operands = self.slots[id.index()].instruction.operands();
        for (index, operand) in operands.iter().enumerate() {
            if let Some(uses) = self.uses.get_mut(operand) {
                uses.retain(|u| !(u.user == id && u.index == index));
            }
        }
        self.uses.remove(&Value::Register(id));

        match prev {
            Some(p) => self.slots[p.index()].next = next,
            None => self.blocks[block.index()].first = next,
        }
        match next {
            Some(n) => self.slots[n.index()].prev = prev,
            None => self.blocks[block.index()].last = prev,
        }
        self.slots[id.index()].live = false;
    }

    /// The instructions of `block`, first to last.
    pub fn instructions_in(&self, block: BlockId) -> impl Iterator<Item = InstructionId> + '_ {
        let mut cursor = self.blocks[block.index()].first;
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.slots[id.index()].next;
            Some(id)
        })
    }

    /// Every live instruction, in block order.
    pub fn instructions(&self) -> Vec<InstructionId> {
        self.blocks().flat_map(|b| self.instructions_in(b).collect::<Vec<_>>()).collect()
    }

    pub fn terminator(&self, block: BlockId) -> Option<InstructionId> {
        let last = self.blocks[block.index()].last?;
        self.instruction(last).is_terminator().then_some(last)
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.terminator(block).is_some()
    }

    pub fn uses(&self, value: &Value) -> &[Use] {
        self.uses.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Predecessors per block, built by scanning terminators.
    pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
        let mut predecessors = vec![Vec::new(); self.blocks.len()];
        for block in self.blocks() {
            if let Some(terminator) = self.terminator(block) {
                for successor in self.instruction(terminator).successors() {
                    predecessors[successor.index()].push(block);
                }
            }
        }
        predecessors
    }

    /// Whether `a` precedes `b` in their common block.
    pub fn comes_before(&self, a: InstructionId, b: InstructionId) -> bool {
        debug_assert_eq!(self.block_containing(a), self.block_containing(b));
        let mut cursor = self.slots[a.index()].next;
        while let Some(id) = cursor {
            if id == b {
                return true;
            }
            cursor = self.slots[id.index()].next;
        }
        false
    }
}
