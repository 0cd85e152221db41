use indexmap::IndexSet;

/// An interned name. Symbols are cheap to copy and compare; the program-wide
/// [`Interner`] resolves them back to text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interns the identifiers, labels and function names of a whole program.
///
/// The lexer never materializes text; the parser interns slices of the source
/// as it builds names, and later stages carry symbols only.
#[derive(Debug, Default)]
pub struct Interner {
    entries: IndexSet<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(index) = self.entries.get_index_of(text) {
            return Symbol(index as u32);
        }
        let (index, _) = self.entries.insert_full(text.to_string());
        Symbol(index as u32)
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.entries
            .get_index(symbol.0 as usize)
            .expect("symbol minted by another interner")
    }

    /// Looks up `text` without interning it.
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.entries.get_index_of(text).map(|i| Symbol(i as u32))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_twice_yields_the_same_symbol() {
        let mut interner = Interner::new();
        assert_eq!(interner.intern("x"), interner.intern("x"));
    }

    #[test]
    fn distinct_names_yield_distinct_symbols() {
        let mut interner = Interner::new();
        assert_ne!(interner.intern("x"), interner.intern("y"));
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::new();
        let s = interner.intern("has_next");
        assert_eq!(interner.resolve(s), "has_next");
    }

    #[test]
    fn lookup_does_not_intern() {
        let mut interner = Interner::new();
        assert_eq!(interner.lookup("absent"), None);
        assert_eq!(interner.len(), 0);
        let s = interner.intern("present");
        assert_eq!(interner.lookup("present"), Some(s));
    }
}
