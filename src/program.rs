use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::analysis;
use crate::ast;
use crate::diagnostic::Diagnostic;
use crate::intern::Interner;
use crate::ir;
use crate::lower;
use crate::parser;
use crate::scope::assign_scopes;
use crate::source::{SourceFile, SourceMap, SourceName};

/// The extension of source files; a directory import resolves to
/// `index.dyva` within it.
pub const SOURCE_EXTENSION: &str = "dyva";

/// One compiled module: its syntax tree (with diagnostics) and its lowered
/// form.
pub struct LoadedModule {
    pub syntax: ast::Module,
    pub ir: ir::Module,
}

/// An ordered collection of modules compiled together. Loading a file runs
/// the whole per-module pipeline (parse, scope, lower, analyses) and then
/// follows its imports depth-first; canonicalized names make re-loading a
/// no-op, which also cuts import cycles.
#[derive(Default)]
pub struct Program {
    pub sources: SourceMap,
    pub modules: Vec<LoadedModule>,
    pub interner: Interner,
    by_name: HashMap<SourceName, u32>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a source file from disk. Returns the existing module id when
    /// the canonical file name was loaded before.
    pub fn load_file(&mut self, path: &Path, as_entry: bool) -> io::Result<u32> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let name = SourceName::Local(canonical.clone());
        if let Some(&id) = self.by_name.get(&name) {
            return Ok(id);
        }
        let text = fs::read_to_string(&canonical)?;
        let id = self.load(SourceFile::new(name, text), as_entry);
        self.follow_imports(id, canonical.parent());
        Ok(id)
    }

    /// Loads an in-memory source through the same pipeline. Imports are not
    /// resolved for virtual sources.
    pub fn load(&mut self, file: SourceFile, as_entry: bool) -> u32 {
        let name = file.name.clone();
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let id = self.sources.add(file);
        self.by_name.insert(name, id);

        let mut syntax = parser::parse(self.sources.file(id), id, &mut self.interner, as_entry);
        let mut lowered = ir::Module::new();
        if !syntax.diagnostics.contains_error() {
            assign_scopes(&mut syntax);
            let lowering =
                lower::lower(&syntax, self.sources.file(id), &mut self.interner, as_entry);
            lowered = lowering.ir;
            syntax.diagnostics.extend(lowering.diagnostics);
            for (_, function) in lowered.functions.iter_mut() {
                analysis::analyze(function, &mut syntax.diagnostics);
            }
        }
        self.modules.push(LoadedModule { syntax, ir: lowered });
        debug_assert_eq!(self.modules.len() - 1, id as usize);
        id
    }

    /// Resolves and loads the modules imported by `id`, relative to its
    /// directory: `name.dyva`, or `name/index.dyva`.
    fn follow_imports(&mut self, id: u32, base: Option<&Path>) {
        let imports: Vec<(String, crate::source::SourceSpan)> = {
            let module = &self.modules[id as usize].syntax;
            module
                .roots
                .iter()
                .filter_map(|&root| module.cast_to_import(root))
                .map(|import| {
                    let declaration = module.import(import);
                    (self.interner.resolve(declaration.name).to_string(), declaration.site)
                })
                .collect()
        };
        for (name, site) in imports {
            let Some(base) = base else { continue };
            let file = base.join(format!("{}.{}", name, SOURCE_EXTENSION));
            let indexed = base.join(&name).join(format!("index.{}", SOURCE_EXTENSION));
            let path = if file.exists() {
                file
            } else if indexed.exists() {
                indexed
            } else {
                self.modules[id as usize]
                    .syntax
                    .diagnostics
                    .insert(Diagnostic::error(format!("cannot find module '{}'", name), site));
                continue;
            };
            if let Err(error) = self.load_file(&path, false) {
                self.modules[id as usize].syntax.diagnostics.insert(Diagnostic::error(
                    format!("cannot load module '{}': {}", name, error),
                    site,
                ));
            }
        }
    }

    pub fn module(&self, id: u32) -> &LoadedModule {
        &self.modules[id as usize]
    }

    pub fn contains_error(&self) -> bool {
        self.modules.iter().any(|m| m.syntax.diagnostics.contains_error())
    }

    /// Executes the lowered entry module. Evaluation is not implemented;
    /// loading alone reports every diagnostic the core produces.
    pub fn run(&self, _module: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn virtual_source(id: u32, text: &str) -> SourceFile {
        SourceFile::new(SourceName::Virtual(id), text)
    }

    #[test]
    fn loading_the_same_name_twice_is_a_no_op() {
        let mut program = Program::new();
        let a = program.load(virtual_source(7, "print(\"hi\")"), true);
        let b = program.load(virtual_source(7, "ignored"), true);
        assert_eq!(a, b);
        assert_eq!(program.modules.len(), 1);
    }

    #[test]
    fn empty_sources_load_cleanly() {
        let mut program = Program::new();
        let id = program.load(virtual_source(0, ""), true);
        let module = program.module(id);
        assert!(module.syntax.diagnostics.is_empty());
        assert!(module.syntax.roots.is_empty());
        // The entry still lowers to a `$main` returning unit.
        let main = program.interner.lookup("$main").unwrap();
        assert!(module.ir.function(main).unwrap().is_defined());
    }

    #[test]
    fn parse_errors_stop_the_pipeline() {
        let mut program = Program::new();
        let id = program.load(virtual_source(0, "fun f( ="), true);
        let module = program.module(id);
        assert!(module.syntax.diagnostics.contains_error());
        assert!(module.ir.functions.is_empty());
        assert!(program.contains_error());
    }

    #[test]
    fn file_loading_follows_imports_and_cycles_terminate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.dyva"), "import b\nfun fa(x) = x\n").unwrap();
        fs::write(dir.path().join("b.dyva"), "import a\nfun fb(x) = x\n").unwrap();
        let mut program = Program::new();
        let a = program.load_file(&dir.path().join("a.dyva"), false).unwrap();
        assert_eq!(program.modules.len(), 2);
        assert!(!program.contains_error());
        // Re-loading returns the same id.
        let again = program.load_file(&dir.path().join("a.dyva"), false).unwrap();
        assert_eq!(a, again);
        assert_eq!(program.modules.len(), 2);
    }

    #[test]
    fn directory_imports_resolve_to_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("util")).unwrap();
        fs::write(dir.path().join("util").join("index.dyva"), "fun helper(x) = x\n").unwrap();
        fs::write(dir.path().join("main.dyva"), "import util\nprint(1)\n").unwrap();
        let mut program = Program::new();
        program.load_file(&dir.path().join("main.dyva"), true).unwrap();
        assert_eq!(program.modules.len(), 2);
        assert!(!program.contains_error());
    }

    #[test]
    fn missing_imports_are_diagnosed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.dyva"), "import nowhere\n").unwrap();
        let mut program = Program::new();
        let id = program.load_file(&dir.path().join("main.dyva"), true).unwrap();
        let messages: Vec<_> = program
            .module(id)
            .syntax
            .diagnostics
            .iter()
            .map(|d| d.message.clone())
            .collect();
        assert!(messages.iter().any(|m| m.contains("cannot find module 'nowhere'")));
    }
}
