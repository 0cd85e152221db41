use indexmap::IndexMap;

use crate::intern::Symbol;
use crate::ir::function::Function;

/// The lowered form of one source module: an ordered map from function name
/// to function, in registration order.
#[derive(Debug, Default)]
pub struct Module {
    pub functions: IndexMap<Symbol, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`; the first registration wins so a
    /// function can be referred to while it is being lowered.
    pub fn declare(&mut self, name: Symbol, function: Function) {
        self.functions.entry(name).or_insert(function);
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.functions.contains_key(&name)
    }

    pub fn function(&self, name: Symbol) -> Option<&Function> {
        self.functions.get(&name)
    }

    pub fn function_mut(&mut self, name: Symbol) -> Option<&mut Function> {
        self.functions.get_mut(&name)
    }
}
