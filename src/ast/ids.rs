use std::fmt;

/// The offset denoting the module itself when a node identity is used as a
/// scope.
pub const MODULE_OFFSET: u32 = u32::MAX;

/// A type-erased node identity: a 32-bit module index packed with a 32-bit
/// offset into that module's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnyNodeId {
    bits: u64,
}

impl AnyNodeId {
    pub fn new(module: u32, offset: u32) -> Self {
        AnyNodeId { bits: (u64::from(module) << 32) | u64::from(offset) }
    }

    /// The identity standing for the module itself, used as the root scope.
    pub fn module_scope(module: u32) -> Self {
        Self::new(module, MODULE_OFFSET)
    }

    pub fn module(self) -> u32 {
        (self.bits >> 32) as u32
    }

    pub fn offset(self) -> u32 {
        self.bits as u32
    }

    pub fn is_module_scope(self) -> bool {
        self.offset() == MODULE_OFFSET
    }
}

impl fmt::Debug for AnyNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_module_scope() {
            write!(f, "m{}", self.module())
        } else {
            write!(f, "m{}.{}", self.module(), self.offset())
        }
    }
}

macro_rules! define_node_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(AnyNodeId);

        impl $name {
            pub(crate) fn new(erased: AnyNodeId) -> Self {
                $name(erased)
            }

            pub fn erased(self) -> AnyNodeId {
                self.0
            }

            pub fn module(self) -> u32 {
                self.0.module()
            }

            pub fn offset(self) -> u32 {
                self.0.offset()
            }
        }

        impl From<$name> for AnyNodeId {
            fn from(id: $name) -> AnyNodeId {
                id.0
            }
        }
    };
}

// Category identities. Each wraps any node whose tag belongs to the category;
// the arena's `cast_to_*` projections are the only mints.
define_node_id!(
    /// A node usable at declaration position.
    DeclarationId
);
define_node_id!(
    /// A node usable at expression position.
    ExpressionId
);
define_node_id!(
    /// A node usable at pattern position (includes equality-pattern
    /// expressions and variable declarations).
    PatternId
);
define_node_id!(
    /// A node usable at statement position (includes declarations and
    /// expressions).
    StatementId
);
define_node_id!(
    /// A condition of an `if` or `while`: an expression or a binding
    /// declaration with the condition role.
    ConditionId
);
define_node_id!(
    /// The failure branch of a conditional: a block or another conditional.
    ElseId
);
define_node_id!(
    /// A node that introduces a lexical scope.
    ScopeId
);

// Per-kind identities.
define_node_id!(BindingDeclarationId);
define_node_id!(FunctionDeclarationId);
define_node_id!(ParameterId);
define_node_id!(StructDeclarationId);
define_node_id!(TraitDeclarationId);
define_node_id!(FieldDeclarationId);
define_node_id!(VariableDeclarationId);
define_node_id!(ImportDeclarationId);
define_node_id!(NameExpressionId);
define_node_id!(ConditionalExpressionId);
define_node_id!(MatchExpressionId);
define_node_id!(MatchCaseId);
define_node_id!(BlockStatementId);
