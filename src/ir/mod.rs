mod function;
mod instruction;
mod module;
mod print;
mod value;

pub use function::{Block, Function, InsertionPoint, Use};
pub use instruction::{BlockId, Capability, Instruction, InstructionId, Member};
pub use module::Module;
pub use print::{print_function, print_module};
pub use value::{Builtin, Constant, FloatBits, Value};
