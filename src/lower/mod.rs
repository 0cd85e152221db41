mod captures;

pub use captures::captures;

use std::collections::HashMap;
use std::mem;

use crate::ast::{
    self, AnyNodeId, BindingDeclarationId, BindingIntroducer, BlockStatementId, CallStyle,
    ConditionId, ElseId, ExpressionId, FunctionDeclarationId, FunctionIntroducer, PatternId,
    StatementId, Syntax, SyntaxTag, MODULE_OFFSET,
};
use crate::diagnostic::{Diagnostic, DiagnosticSet};
use crate::intern::{Interner, Symbol};
use crate::ir::{
    self, BlockId, Builtin, Capability, Constant, Function, InsertionPoint, Instruction,
    InstructionId, Member, Value,
};
use crate::source::{SourceFile, SourcePosition, SourceSpan};
use crate::visitor::{for_each_variable_declaration, walk_pattern_with_expression, PathComponent};

/// The result of lowering one module.
pub struct Lowering {
    pub ir: ir::Module,
    pub diagnostics: DiagnosticSet,
}

/// Lowers a scoped module to IR. Semantic errors are recorded as diagnostics
/// and poison values; lowering always runs to completion.
pub fn lower(
    module: &ast::Module,
    source: &SourceFile,
    interner: &mut Interner,
    as_entry: bool,
) -> Lowering {
    let mut lowerer = Lowerer {
        module,
        source,
        interner,
        ir: ir::Module::new(),
        diagnostics: DiagnosticSet::new(),
        frames: Vec::new(),
        current: None,
        point: None,
        loops: Vec::new(),
    };
    if as_entry {
        lowerer.lower_entry();
    } else {
        lowerer.lower_library();
    }
    Lowering { ir: lowerer.ir, diagnostics: lowerer.diagnostics }
}

/// A lexical frame: the scope it mirrors and the values its names resolve
/// to.
struct Frame {
    scope: u32,
    locals: HashMap<Symbol, Value>,
}

impl Frame {
    fn new(scope: u32) -> Self {
        Frame { scope, locals: HashMap::new() }
    }

    fn module() -> Self {
        Frame::new(MODULE_OFFSET)
    }
}

struct LoopContext {
    head: BlockId,
    exit: BlockId,
}

struct Lowerer<'m, 's, 'i> {
    module: &'m ast::Module,
    source: &'s SourceFile,
    interner: &'i mut Interner,
    ir: ir::Module,
    diagnostics: DiagnosticSet,
    frames: Vec<Frame>,
    current: Option<Symbol>,
    point: Option<InsertionPoint>,
    loops: Vec<LoopContext>,
}

impl<'m, 's, 'i> Lowerer<'m, 's, 'i> {
    // Insertion context.

    fn function(&self) -> &Function {
        self.ir.function(self.current.expect("no current function")).unwrap()
    }

    fn function_mut(&mut self) -> &mut Function {
        self.ir.function_mut(self.current.expect("no current function")).unwrap()
    }

    /// The single construction primitive: splices at the insertion point,
    /// updates def-use chains, and moves the point past the new instruction.
    fn emit(&mut self, instruction: Instruction) -> InstructionId {
        let point = self.point.expect("no insertion point");
        let id = self.function_mut().insert(point, instruction);
        self.point = Some(InsertionPoint::After(id));
        id
    }

    fn append_block(&mut self, parameter_count: usize) -> BlockId {
        self.function_mut().append_block(parameter_count)
    }

    fn current_block(&self) -> BlockId {
        match self.point.expect("no insertion point") {
            InsertionPoint::Start(b) | InsertionPoint::End(b) => b,
            InsertionPoint::Before(i) | InsertionPoint::After(i) => {
                self.function().block_containing(i)
            }
        }
    }

    fn block_terminated(&self) -> bool {
        self.function().is_terminated(self.current_block())
    }

    fn move_to_end_of(&mut self, block: BlockId) {
        self.point = Some(InsertionPoint::End(block));
    }

    fn within<R>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> R) -> R {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Saves and restores the whole insertion context; used whenever a
    /// function body must be lowered while another function's context is on
    /// the stack.
    fn with_clear_context<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let frames = mem::take(&mut self.frames);
        let current = self.current.take();
        let point = self.point.take();
        let loops = mem::take(&mut self.loops);
        self.frames.push(Frame::module());
        let result = f(self);
        self.frames = frames;
        self.current = current;
        self.point = point;
        self.loops = loops;
        result
    }

    fn bind(&mut self, name: Symbol, value: Value) {
        self.frames.last_mut().expect("no frame").locals.insert(name, value);
    }

    fn end_anchor(&self, site: SourceSpan) -> SourceSpan {
        SourceSpan::empty_at(site.end_position())
    }

    // Module roots.

    fn lower_entry(&mut self) {
        let name = self.interner.intern("$main");
        let site = SourceSpan::new(self.module.index(), 0, self.source.len());
        self.ir.declare(name, Function::declaration(Vec::new(), false, site));
        self.current = Some(name);
        let entry = self.append_block(0);
        self.move_to_end_of(entry);
        self.frames.push(Frame::module());
        let roots: Vec<StatementId> = self
            .module
            .roots
            .iter()
            .filter_map(|&r| self.module.cast_to_statement(r))
            .collect();
        self.lower_sequence(&roots, false);
        if !self.block_terminated() {
            let anchor = SourceSpan::empty_at(SourcePosition {
                source: self.module.index(),
                index: self.source.len(),
            });
            self.emit(Instruction::Return { value: Value::unit(), site: anchor });
        }
        self.frames.pop();
        self.current = None;
        self.point = None;
    }

    fn lower_library(&mut self) {
        self.frames.push(Frame::module());
        let roots: Vec<AnyNodeId> = self.module.roots.clone();
        for root in roots {
            match self.module.tag(root) {
                SyntaxTag::Function => {
                    let function = self.module.cast_to_function(root).unwrap();
                    self.lower_function_declaration(function);
                }
                SyntaxTag::Struct | SyntaxTag::Trait => self.lower_type_members(root),
                _ => {}
            }
        }
        self.frames.pop();
    }

    /// Lowers the member functions of a struct or trait declaration.
    fn lower_type_members(&mut self, id: AnyNodeId) {
        let members = match self.module.node(id) {
            Syntax::Struct(n) => n.members.clone(),
            Syntax::Trait(n) => n.members.clone(),
            _ => unreachable!("not a type declaration"),
        };
        for member in members {
            match self.module.tag(member.erased()) {
                SyntaxTag::Function => {
                    let function = self.module.cast_to_function(member.erased()).unwrap();
                    self.lower_function_declaration(function);
                }
                SyntaxTag::Struct | SyntaxTag::Trait => self.lower_type_members(member.erased()),
                _ => {}
            }
        }
    }

    // Functions.

    /// The stable name a function declaration lowers under: its own stem at
    /// the module's top level, `stem@offset` anywhere else, `lambda@offset`
    /// when anonymous.
    fn function_ir_name(&mut self, id: FunctionDeclarationId) -> Symbol {
        let declaration = self.module.function(id);
        match declaration.name {
            Some(name) => {
                let top_level =
                    self.module.parent(id.erased()).map_or(false, AnyNodeId::is_module_scope);
                if top_level {
                    name.stem
                } else {
                    let text = format!("{}@{}", self.interner.resolve(name.stem), id.offset());
                    self.interner.intern(&text)
                }
            }
            None => {
                let text = format!("lambda@{}", id.offset());
                self.interner.intern(&text)
            }
        }
    }

    /// Lowers a function declaration in a cleared context, registering it in
    /// the module eagerly so it can be referred to while incomplete. Returns
    /// the function reference constant.
    fn lower_function_declaration(&mut self, id: FunctionDeclarationId) -> Value {
        let name = self.function_ir_name(id);
        if self.ir.contains(name) {
            return Value::Constant(Constant::Function(name));
        }
        let declaration = self.module.function(id).clone();
        let labels = self.module.labels_of(id);
        let is_subscript = declaration.introducer == FunctionIntroducer::Subscript;
        self.ir.declare(name, Function::declaration(labels, is_subscript, declaration.site));

        let Some(body) = declaration.body else {
            let shown = match declaration.name {
                Some(n) => self.interner.resolve(n.stem).to_string(),
                None => "lambda".to_string(),
            };
            self.diagnostics.insert(Diagnostic::error(
                format!("{} requires an implementation", shown),
                declaration.site,
            ));
            return Value::Constant(Constant::Function(name));
        };

        self.with_clear_context(|this| {
            this.current = Some(name);
            let entry = this.append_block(declaration.parameters.len());
            this.move_to_end_of(entry);
            let mut frame = Frame::new(id.offset());
            if let Some(own) = declaration.name {
                frame.locals.insert(own.stem, Value::Constant(Constant::Function(name)));
            }
            for (index, parameter) in declaration.parameters.iter().enumerate() {
                let identifier = this.module.parameter(*parameter).identifier;
                frame.locals.insert(identifier, Value::Parameter(entry, index));
            }
            this.frames.push(frame);
            this.lower_body(&body, declaration.site);
            this.frames.pop();
        });
        Value::Constant(Constant::Function(name))
    }

    /// A body that is a single expression lowers to its return; otherwise
    /// the body lowers as a block and falls through to `return unit`.
    fn lower_body(&mut self, body: &[StatementId], site: SourceSpan) {
        let end = self.end_anchor(site);
        if body.len() == 1 {
            if let Some(expression) = self.module.cast_to_expression(body[0].erased()) {
                let value = self.lower_expression(expression);
                self.emit(Instruction::Return { value, site: end });
                return;
            }
        }
        self.lower_sequence(body, false);
        if !self.block_terminated() {
            self.emit(Instruction::Return { value: Value::unit(), site: end });
        }
    }

    // Statement sequences.

    fn ends_control_flow(&self, statement: StatementId) -> bool {
        matches!(
            self.module.tag(statement.erased()),
            SyntaxTag::Return | SyntaxTag::Throw | SyntaxTag::Break | SyntaxTag::Continue
        )
    }

    /// Two-pass block lowering: functions without captures are hoisted and
    /// lowered first; the remaining statements lower in order, stopping
    /// after one that ends control flow. Deferred bodies run at the natural
    /// exit of the sequence. With `want_value`, the value of a trailing
    /// expression statement is returned.
    fn lower_sequence(&mut self, statements: &[StatementId], want_value: bool) -> Value {
        let mut rest = Vec::new();
        for &statement in statements {
            if let Some(function) = self.module.cast_to_function(statement.erased()) {
                if captures(self.module, function).is_empty() {
                    let name = self.module.function(function).name;
                    let value = self.lower_function_declaration(function);
                    if let Some(name) = name {
                        self.bind(name.stem, value);
                    }
                    continue;
                }
            }
            rest.push(statement);
        }

        let mut deferred: Vec<BlockStatementId> = Vec::new();
        let mut value = Value::unit();
        let count = rest.len();
        for (index, statement) in rest.into_iter().enumerate() {
            if let Syntax::Defer(defer) = self.module.node(statement.erased()) {
                deferred.push(defer.body);
                continue;
            }
            let last = index + 1 == count;
            if last && want_value {
                if let Some(expression) = self.module.cast_to_expression(statement.erased()) {
                    value = self.lower_expression(expression);
                    continue;
                }
            }
            self.lower_statement(statement);
            if self.ends_control_flow(statement) {
                break;
            }
        }

        for body in deferred {
            if self.block_terminated() {
                break;
            }
            self.lower_block(body, false);
        }
        value
    }

    /// Lowers a block statement in its own frame.
    fn lower_block(&mut self, id: BlockStatementId, want_value: bool) -> Value {
        let statements = self.module.block(id).statements.clone();
        self.within(Frame::new(id.offset()), |this| this.lower_sequence(&statements, want_value))
    }

    fn lower_statement(&mut self, statement: StatementId) {
        let module = self.module;
        match module.node(statement.erased()) {
            Syntax::Binding(_) => {
                let binding = module.cast_to_binding(statement.erased()).unwrap();
                self.lower_binding_declaration(binding);
            }
            Syntax::Function(declaration) => {
                let name = declaration.name;
                let function = module.cast_to_function(statement.erased()).unwrap();
                let value = self.lower_function_declaration(function);
                if let Some(name) = name {
                    self.bind(name.stem, value);
                }
            }
            Syntax::Struct(_) | Syntax::Trait(_) => self.lower_type_members(statement.erased()),
            Syntax::Import(_) | Syntax::Parameter(_) | Syntax::Field(_) | Syntax::Variable(_) => {}
            Syntax::Block(_) => {
                let block = module.cast_to_block(statement.erased()).unwrap();
                self.lower_block(block, false);
            }
            Syntax::Defer(n) => {
                // Reached only for a defer outside a sequence.
                let body = n.body;
                self.lower_block(body, false);
            }
            Syntax::Break(n) => {
                let site = n.site;
                match self.loops.last() {
                    Some(context) => {
                        let exit = context.exit;
                        self.emit(Instruction::Branch { target: exit, arguments: vec![], site });
                    }
                    None => self.diagnostics.insert(Diagnostic::error(
                        "'break' can only occur inside a loop",
                        site,
                    )),
                }
            }
            Syntax::Continue(n) => {
                let site = n.site;
                match self.loops.last() {
                    Some(context) => {
                        let head = context.head;
                        self.emit(Instruction::Branch { target: head, arguments: vec![], site });
                    }
                    None => self.diagnostics.insert(Diagnostic::error(
                        "'continue' can only occur inside a loop",
                        site,
                    )),
                }
            }
            Syntax::For(_) => self.lower_for(statement),
            Syntax::While(_) => self.lower_while(statement),
            Syntax::Return(n) => {
                let site = n.site;
                let value = match n.value {
                    Some(e) => self.lower_expression(e),
                    None => Value::unit(),
                };
                self.emit(Instruction::Return { value, site });
            }
            Syntax::Throw(n) => {
                let site = n.site;
                let value = self.lower_expression(n.value);
                self.emit(Instruction::Throw { value, site });
            }
            Syntax::Yield(n) => {
                let site = n.site;
                let expression = n.value;
                if self.function().is_subscript {
                    let value = self.lower_expression(expression);
                    self.emit(Instruction::Yield { value, site });
                } else {
                    self.lower_expression(expression);
                    self.diagnostics.insert(Diagnostic::error(
                        "'yield' can only occur in a subscript",
                        site,
                    ));
                }
            }
            Syntax::Assignment(n) => {
                let site = n.site;
                let (target, source) = (n.target, n.value);
                let place = self.lower_expression(target);
                let value = self.lower_expression(source);
                self.emit(Instruction::Store { value, target: place, site });
            }
            _ => {
                let expression = module
                    .cast_to_expression(statement.erased())
                    .expect("statement kinds are exhaustive");
                self.lower_expression(expression);
            }
        }
    }

    // Bindings.

    fn lower_binding_declaration(&mut self, id: BindingDeclarationId) {
        let module = self.module;
        let binding = module.binding(id);
        let site = binding.site;
        let pattern = binding.pattern;
        let initializer = binding.initializer;
        let introducer = match module.node(pattern.erased()) {
            Syntax::BindingPattern(p) => p.introducer,
            _ => BindingIntroducer::Let,
        };
        match introducer {
            BindingIntroducer::Var => {
                let storage = self.emit(Instruction::Alloc { site });
                let storage = Value::Register(storage);
                if let Some(initializer) = initializer {
                    walk_pattern_with_expression(
                        module,
                        pattern,
                        initializer,
                        &mut |leaf, expression, path| {
                            let place = self.project_path(storage.clone(), path, site);
                            let value = self.lower_expression(expression);
                            self.emit(Instruction::Store {
                                value,
                                target: place.clone(),
                                site: module.site(leaf.erased()),
                            });
                            self.declare_pattern_storage(leaf, place);
                        },
                    );
                } else {
                    self.declare_pattern_storage(pattern, storage);
                }
            }
            BindingIntroducer::Let | BindingIntroducer::Inout => {
                let capability = match introducer {
                    BindingIntroducer::Inout => Capability::Inout,
                    _ => Capability::Let,
                };
                let whole = match initializer {
                    Some(initializer) => self.lower_expression(initializer),
                    None => Value::Poison(site),
                };
                for_each_variable_declaration(module, pattern, &mut |variable, path| {
                    let projected = self.project_path(whole.clone(), path, site);
                    let access = self.emit(Instruction::Access {
                        source: projected,
                        capability,
                        site: module.variable(variable).site,
                    });
                    let identifier = module.variable(variable).identifier;
                    self.bind(identifier, Value::Register(access));
                });
            }
        }
    }

    /// Binds every variable under `pattern` to projections of `storage`.
    fn declare_pattern_storage(&mut self, pattern: PatternId, storage: Value) {
        let module = self.module;
        for_each_variable_declaration(module, pattern, &mut |variable, path| {
            let declaration = module.variable(variable);
            let place = self.project_path(storage.clone(), path, declaration.site);
            self.bind(declaration.identifier, place);
        });
    }

    fn project_path(&mut self, mut value: Value, path: &[PathComponent], site: SourceSpan) -> Value {
        for component in path {
            let member = match component {
                PathComponent::Index(i) => Member::Index(*i),
                PathComponent::Label(l) => Member::Name(*l),
            };
            let id = self.emit(Instruction::Member { whole: value, member, site });
            value = Value::Register(id);
        }
        value
    }

    // Expressions.

    fn lower_expression(&mut self, expression: ExpressionId) -> Value {
        let module = self.module;
        match module.node(expression.erased()) {
            Syntax::BooleanLiteral(n) => {
                let value = self.source.text_of(n.site) == "true";
                Value::Constant(Constant::Bool(value))
            }
            Syntax::IntegerLiteral(n) => {
                let text = self.source.text_of(n.site);
                match parse_integer(text) {
                    Some(value) => Value::Constant(Constant::Int(value)),
                    None => {
                        let message =
                            format!("cannot represent '{}' as a 64-bit signed integer", text);
                        let site = n.site;
                        self.diagnostics.insert(Diagnostic::error(message, site));
                        Value::Poison(site)
                    }
                }
            }
            Syntax::FloatingPointLiteral(n) => {
                let text: String =
                    self.source.text_of(n.site).chars().filter(|c| *c != '_').collect();
                match text.parse::<f64>() {
                    Ok(value) => Value::Constant(Constant::Float(ir::FloatBits::from_f64(value))),
                    Err(_) => Value::Poison(n.site),
                }
            }
            Syntax::StringLiteral(n) => {
                let site = n.site;
                let text = self.source.text_of(site);
                let inner = text
                    .strip_prefix('"')
                    .map(|t| t.strip_suffix('"').unwrap_or(t))
                    .unwrap_or(text);
                let unescaped = unescape(inner);
                let symbol = self.interner.intern(&unescaped);
                Value::Constant(Constant::String(symbol))
            }
            Syntax::ArrayLiteral(n) => {
                let site = n.site;
                let elements = n.elements.clone();
                let storage = self.emit(Instruction::Alloc { site });
                let storage = Value::Register(storage);
                for (index, element) in elements.into_iter().enumerate() {
                    let slot = self.emit(Instruction::Member {
                        whole: storage.clone(),
                        member: Member::Index(index),
                        site,
                    });
                    let value = self.lower_expression(element);
                    self.emit(Instruction::Store {
                        value,
                        target: Value::Register(slot),
                        site,
                    });
                }
                storage
            }
            Syntax::DictionaryLiteral(n) => {
                let site = n.site;
                let elements = n.elements.clone();
                let storage = self.emit(Instruction::Alloc { site });
                let storage = Value::Register(storage);
                for (index, (key, value)) in elements.into_iter().enumerate() {
                    for (offset, expression) in [(2 * index, key), (2 * index + 1, value)] {
                        let slot = self.emit(Instruction::Member {
                            whole: storage.clone(),
                            member: Member::Index(offset),
                            site,
                        });
                        let lowered = self.lower_expression(expression);
                        self.emit(Instruction::Store {
                            value: lowered,
                            target: Value::Register(slot),
                            site,
                        });
                    }
                }
                storage
            }
            Syntax::TupleLiteral(n) => {
                if n.elements.is_empty() {
                    return Value::unit();
                }
                let site = n.site;
                let elements = n.elements.clone();
                let storage = self.emit(Instruction::Alloc { site });
                let storage = Value::Register(storage);
                for (index, element) in elements.into_iter().enumerate() {
                    let member = match element.label {
                        Some(label) => Member::Name(label),
                        None => Member::Index(index),
                    };
                    let slot =
                        self.emit(Instruction::Member { whole: storage.clone(), member, site });
                    let value = self.lower_expression(element.value);
                    self.emit(Instruction::Store {
                        value,
                        target: Value::Register(slot),
                        site,
                    });
                }
                storage
            }
            Syntax::NameExpression(n) => {
                let site = n.site;
                let name = n.name;
                match n.qualification {
                    Some(qualification) => {
                        let whole = self.lower_expression(qualification);
                        let id = self.emit(Instruction::Member {
                            whole,
                            member: Member::Name(name.stem),
                            site,
                        });
                        Value::Register(id)
                    }
                    None => match self.resolve_unqualified(name.stem) {
                        Some(value) => value,
                        None => {
                            let message = format!(
                                "undefined symbol '{}'",
                                self.interner.resolve(name.stem)
                            );
                            self.diagnostics.insert(Diagnostic::error(message, site));
                            Value::Poison(site)
                        }
                    },
                }
            }
            Syntax::Call(n) => {
                let site = n.site;
                let style = n.style;
                let arguments = n.arguments.clone();
                let callee_id = n.callee;
                let callee = self.lower_expression(callee_id);
                let labels: Vec<Option<Symbol>> = arguments.iter().map(|a| a.label).collect();
                let values: Vec<Value> =
                    arguments.iter().map(|a| self.lower_expression(a.value)).collect();
                let id = match style {
                    CallStyle::Parenthesized => self.emit(Instruction::Invoke {
                        callee,
                        labels,
                        arguments: values,
                        site,
                    }),
                    CallStyle::Bracketed => self.emit(Instruction::Project {
                        callee,
                        labels,
                        arguments: values,
                        site,
                    }),
                };
                Value::Register(id)
            }
            Syntax::TypeTest(n) => {
                let site = n.site;
                let (lhs, rhs) = (n.lhs, n.rhs);
                let value = self.lower_expression(lhs);
                let tested = self.emit(Instruction::Invoke {
                    callee: Value::Constant(Constant::Builtin(Builtin::Type)),
                    labels: vec![None],
                    arguments: vec![value],
                    site,
                });
                let expected = self.lower_expression(rhs);
                self.equality_test(Value::Register(tested), expected, site)
            }
            Syntax::Lambda(n) => self.lower_function_declaration(n.function),
            Syntax::Conditional(_) => {
                let conditional = module.cast_to_conditional(expression.erased()).unwrap();
                self.lower_conditional(conditional)
            }
            Syntax::Match(_) => self.lower_match(expression),
            Syntax::Try(n) => {
                // Handlers are parsed and scoped; only the body lowers.
                let body = n.body.clone();
                let scope = expression.offset();
                self.within(Frame::new(scope), |this| this.lower_sequence(&body, true))
            }
            _ => unreachable!("expression kinds are exhaustive"),
        }
    }

    /// `lhs == rhs` through the operator-as-member encoding.
    fn equality_test(&mut self, lhs: Value, rhs: Value, site: SourceSpan) -> Value {
        let equals = self.interner.intern("==");
        let callee = self.emit(Instruction::Member {
            whole: lhs,
            member: Member::Name(equals),
            site,
        });
        let id = self.emit(Instruction::Invoke {
            callee: Value::Register(callee),
            labels: vec![None],
            arguments: vec![rhs],
            site,
        });
        Value::Register(id)
    }

    // Name resolution.

    /// Walks frames innermost to outermost; failing that, searches the
    /// declarations lexically contained in each frame's scope for a function
    /// to lower on demand, registering its constant in the frame that owns
    /// the scope. Built-ins come last.
    fn resolve_unqualified(&mut self, name: Symbol) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.locals.get(&name) {
                return Some(value.clone());
            }
        }
        for depth in (0..self.frames.len()).rev() {
            let scope = self.frames[depth].scope;
            for declaration in self.module.declarations_lexically_in(scope) {
                let Some(function) = self.module.cast_to_function(declaration.erased()) else {
                    continue;
                };
                if self.module.function(function).name.map(|n| n.stem) != Some(name) {
                    continue;
                }
                let value = self.lower_function_declaration(function);
                self.frames[depth].locals.insert(name, value.clone());
                return Some(value);
            }
        }
        Builtin::named(self.interner.resolve(name))
            .map(|b| Value::Constant(Constant::Builtin(b)))
    }

    // Control flow.

    fn lower_conditional(&mut self, id: ast::ConditionalExpressionId) -> Value {
        let module = self.module;
        let node = module.conditional(id).clone();
        let has_else = node.failure.is_some();
        let join = self.append_block(usize::from(has_else));
        let failure_block = self.append_block(0);

        self.frames.push(Frame::new(id.offset()));
        for condition in &node.conditions {
            self.lower_condition(*condition, failure_block);
        }
        let value = self.lower_block(node.success, has_else);
        if !self.block_terminated() {
            let arguments = if has_else { vec![value] } else { vec![] };
            self.emit(Instruction::Branch {
                target: join,
                arguments,
                site: self.end_anchor(module.site(node.success.erased())),
            });
        }
        self.frames.pop();

        self.move_to_end_of(failure_block);
        match node.failure {
            Some(failure) => {
                let value = self.lower_else(failure);
                if !self.block_terminated() {
                    self.emit(Instruction::Branch {
                        target: join,
                        arguments: vec![value],
                        site: self.end_anchor(node.site),
                    });
                }
            }
            None => {
                self.emit(Instruction::Branch {
                    target: join,
                    arguments: vec![],
                    site: self.end_anchor(node.site),
                });
            }
        }

        self.move_to_end_of(join);
        if has_else {
            Value::Parameter(join, 0)
        } else {
            Value::unit()
        }
    }

    fn lower_else(&mut self, id: ElseId) -> Value {
        let module = self.module;
        match module.tag(id.erased()) {
            SyntaxTag::Conditional => {
                let expression = module.cast_to_expression(id.erased()).unwrap();
                self.lower_expression(expression)
            }
            _ => {
                let block = module.cast_to_block(id.erased()).unwrap();
                self.lower_block(block, true)
            }
        }
    }

    /// One condition of an `if` or `while`: a plain expression tests and
    /// branches; a binding condition lowers its scrutinee and then the
    /// pattern match.
    fn lower_condition(&mut self, condition: ConditionId, failure: BlockId) {
        let module = self.module;
        match module.node(condition.erased()) {
            Syntax::Binding(binding) => {
                let pattern = binding.pattern;
                let scrutinee = match binding.initializer {
                    Some(initializer) => self.lower_expression(initializer),
                    None => Value::Poison(binding.site),
                };
                self.lower_pattern_test(pattern, scrutinee, failure, Capability::Let);
            }
            _ => {
                let expression = module.cast_to_expression(condition.erased()).unwrap();
                let site = module.site(condition.erased());
                let value = self.lower_expression(expression);
                let success = self.append_block(0);
                self.emit(Instruction::CondBranch {
                    condition: value,
                    success,
                    failure,
                    site,
                });
                self.move_to_end_of(success);
            }
        }
    }

    /// Scrutinee-then-branch pattern matching. Leaves the insertion point in
    /// the block reached when the pattern matches, with the pattern's
    /// variables bound in the current frame.
    fn lower_pattern_test(
        &mut self,
        pattern: PatternId,
        scrutinee: Value,
        failure: BlockId,
        capability: Capability,
    ) {
        let module = self.module;
        match module.node(pattern.erased()) {
            Syntax::Wildcard(_) => {}
            Syntax::Variable(n) => {
                let (identifier, site) = (n.identifier, n.site);
                let access = self.emit(Instruction::Access {
                    source: scrutinee,
                    capability,
                    site,
                });
                self.bind(identifier, Value::Register(access));
            }
            Syntax::BindingPattern(n) => {
                let subpattern = n.subpattern;
                let capability = match n.introducer {
                    BindingIntroducer::Let => Capability::Let,
                    BindingIntroducer::Var | BindingIntroducer::Inout => Capability::Inout,
                };
                self.lower_pattern_test(subpattern, scrutinee, failure, capability);
            }
            Syntax::TuplePattern(n) => {
                let site = n.site;
                let elements = n.elements.clone();
                for (index, element) in elements.into_iter().enumerate() {
                    let member = match element.label {
                        Some(label) => Member::Name(label),
                        None => Member::Index(index),
                    };
                    let part = self.emit(Instruction::Member {
                        whole: scrutinee.clone(),
                        member,
                        site,
                    });
                    self.lower_pattern_test(element.value, Value::Register(part), failure, capability);
                }
            }
            Syntax::ExtractorPattern(n) => {
                let site = n.site;
                let arguments = n.arguments.clone();
                let stem = match module.node(n.callee.erased()) {
                    Syntax::NameExpression(callee) => callee.name.stem,
                    _ => unreachable!("extractor callees are names"),
                };
                let selector = self.emit(Instruction::Member {
                    whole: scrutinee.clone(),
                    member: Member::Name(stem),
                    site,
                });
                let test = self.emit(Instruction::Invoke {
                    callee: Value::Register(selector),
                    labels: vec![],
                    arguments: vec![],
                    site,
                });
                let success = self.append_block(0);
                self.emit(Instruction::CondBranch {
                    condition: Value::Register(test),
                    success,
                    failure,
                    site,
                });
                self.move_to_end_of(success);
                for (index, argument) in arguments.into_iter().enumerate() {
                    let member = match argument.label {
                        Some(label) => Member::Name(label),
                        None => Member::Index(index),
                    };
                    let part = self.emit(Instruction::Member {
                        whole: scrutinee.clone(),
                        member,
                        site,
                    });
                    self.lower_pattern_test(argument.value, Value::Register(part), failure, capability);
                }
            }
            Syntax::TypePattern(n) => {
                let site = n.site;
                let (lhs, rhs) = (n.lhs, n.rhs);
                let tested = self.emit(Instruction::Invoke {
                    callee: Value::Constant(Constant::Builtin(Builtin::Type)),
                    labels: vec![None],
                    arguments: vec![scrutinee.clone()],
                    site,
                });
                let expected = self.lower_expression(rhs);
                let condition = self.equality_test(Value::Register(tested), expected, site);
                let success = self.append_block(0);
                self.emit(Instruction::CondBranch { condition, success, failure, site });
                self.move_to_end_of(success);
                self.lower_pattern_test(lhs, scrutinee, failure, capability);
            }
            _ => {
                // An expression used as an equality pattern.
                let expression = module
                    .cast_to_expression(pattern.erased())
                    .expect("pattern kinds are exhaustive");
                let site = module.site(pattern.erased());
                let expected = self.lower_expression(expression);
                let condition = self.equality_test(scrutinee, expected, site);
                let success = self.append_block(0);
                self.emit(Instruction::CondBranch { condition, success, failure, site });
                self.move_to_end_of(success);
            }
        }
    }

    fn lower_while(&mut self, statement: StatementId) {
        let module = self.module;
        let Syntax::While(node) = module.node(statement.erased()) else { unreachable!() };
        let (conditions, body, site) = (node.conditions.clone(), node.body, node.site);
        let head = self.append_block(0);
        self.emit(Instruction::Branch { target: head, arguments: vec![], site });
        self.move_to_end_of(head);
        let exit = self.append_block(0);

        self.frames.push(Frame::new(statement.erased().offset()));
        self.loops.push(LoopContext { head, exit });
        for condition in &conditions {
            self.lower_condition(*condition, exit);
        }
        self.lower_block(body, false);
        if !self.block_terminated() {
            self.emit(Instruction::Branch {
                target: head,
                arguments: vec![],
                site: self.end_anchor(site),
            });
        }
        self.loops.pop();
        self.frames.pop();
        self.move_to_end_of(exit);
    }

    /// For-loops iterate their domain through `has_next`/`next`, binding the
    /// pattern to each element; a false `where` filter continues the loop.
    fn lower_for(&mut self, statement: StatementId) {
        let module = self.module;
        let Syntax::For(node) = module.node(statement.erased()) else { unreachable!() };
        let (pattern, domain, filter, body, site) =
            (node.pattern, node.domain, node.filter, node.body, node.site);
        let domain_value = self.lower_expression(domain);
        let head = self.append_block(0);
        self.emit(Instruction::Branch { target: head, arguments: vec![], site });
        self.move_to_end_of(head);
        let exit = self.append_block(0);

        self.frames.push(Frame::new(statement.erased().offset()));
        self.loops.push(LoopContext { head, exit });

        let has_next = self.interner.intern("has_next");
        let probe = self.emit(Instruction::Member {
            whole: domain_value.clone(),
            member: Member::Name(has_next),
            site,
        });
        let more = self.emit(Instruction::Invoke {
            callee: Value::Register(probe),
            labels: vec![],
            arguments: vec![],
            site,
        });
        let body_block = self.append_block(0);
        self.emit(Instruction::CondBranch {
            condition: Value::Register(more),
            success: body_block,
            failure: exit,
            site,
        });
        self.move_to_end_of(body_block);

        let next = self.interner.intern("next");
        let step = self.emit(Instruction::Member {
            whole: domain_value,
            member: Member::Name(next),
            site,
        });
        let element = self.emit(Instruction::Invoke {
            callee: Value::Register(step),
            labels: vec![],
            arguments: vec![],
            site,
        });
        self.lower_pattern_test(pattern, Value::Register(element), exit, Capability::Let);
        if let Some(filter) = filter {
            let value = self.lower_expression(filter);
            let kept = self.append_block(0);
            self.emit(Instruction::CondBranch {
                condition: value,
                success: kept,
                failure: head,
                site,
            });
            self.move_to_end_of(kept);
        }
        self.lower_block(body, false);
        if !self.block_terminated() {
            self.emit(Instruction::Branch {
                target: head,
                arguments: vec![],
                site: self.end_anchor(site),
            });
        }
        self.loops.pop();
        self.frames.pop();
        self.move_to_end_of(exit);
    }

    /// Match lowers as a chain of pattern tests over the once-lowered
    /// scrutinee; the join receives each case's value.
    fn lower_match(&mut self, expression: ExpressionId) -> Value {
        let module = self.module;
        let Syntax::Match(node) = module.node(expression.erased()) else { unreachable!() };
        let (scrutinee, cases, site) = (node.scrutinee, node.cases.clone(), node.site);
        let scrutinee = self.lower_expression(scrutinee);
        let join = self.append_block(1);
        for case in cases {
            let body = module.match_case(case).body.clone();
            let pattern = module.match_case(case).pattern;
            let case_site = module.match_case(case).site;
            let next = self.append_block(0);
            self.within(Frame::new(case.offset()), |this| {
                this.lower_pattern_test(pattern, scrutinee.clone(), next, Capability::Let);
                let value = this.lower_sequence(&body, true);
                if !this.block_terminated() {
                    this.emit(Instruction::Branch {
                        target: join,
                        arguments: vec![value],
                        site: this.end_anchor(case_site),
                    });
                }
            });
            self.move_to_end_of(next);
        }
        if !self.block_terminated() {
            self.emit(Instruction::Branch {
                target: join,
                arguments: vec![Value::unit()],
                site: self.end_anchor(site),
            });
        }
        self.move_to_end_of(join);
        Value::Parameter(join, 0)
    }
}

/// Parses an integer literal's text, honoring `_` separators, a leading
/// sign, and the `0x`/`0o`/`0b` prefixes.
fn parse_integer(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (sign, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", cleaned.as_str()),
    };
    let (radix, digits) = if let Some(rest) = digits.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = digits.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, digits)
    };
    i64::from_str_radix(&format!("{}{}", sign, digits), radix).ok()
}

/// Resolves the escape sequences of a string literal's body.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}
