use crate::ast::{AnyNodeId, DeclarationId, Module, MODULE_OFFSET};
use crate::visitor::{traverse_roots, Visitor};

/// Materializes the lexical-scope relationships of a freshly parsed module:
/// every node gets a parent pointer to its innermost enclosing scope, and
/// every scope node gets the ordered list of declarations it lexically
/// contains. Top-level declarations stay reachable through the root view
/// instead.
pub fn assign_scopes(module: &mut Module) {
    let mut scoper = Scoper {
        stack: vec![MODULE_OFFSET],
        parents: Vec::new(),
        declarations: Vec::new(),
        scopes: Vec::new(),
    };
    traverse_roots(module, &mut scoper);
    debug_assert_eq!(scoper.stack, vec![MODULE_OFFSET]);

    for offset in scoper.scopes {
        module.seed_scope(offset);
    }
    for (offset, parent) in scoper.parents {
        module.set_parent(offset, parent);
    }
    for (scope, declaration) in scoper.declarations {
        module.append_scope_declaration(scope, declaration);
    }
}

struct Scoper {
    stack: Vec<u32>,
    parents: Vec<(u32, u32)>,
    declarations: Vec<(u32, DeclarationId)>,
    scopes: Vec<u32>,
}

impl Visitor for Scoper {
    fn will_enter(&mut self, module: &Module, id: AnyNodeId) -> bool {
        let innermost = *self.stack.last().unwrap();
        self.parents.push((id.offset(), innermost));
        if let Some(declaration) = module.cast_to_declaration(id) {
            if innermost != MODULE_OFFSET {
                self.declarations.push((innermost, declaration));
            }
        }
        if module.tag(id).is_scope() {
            self.stack.push(id.offset());
            self.scopes.push(id.offset());
        }
        true
    }

    fn will_exit(&mut self, module: &Module, id: AnyNodeId) {
        if module.tag(id).is_scope() {
            self.stack.pop();
        }
    }
}
