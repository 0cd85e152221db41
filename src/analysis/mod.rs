mod dominators;
mod liveness;
mod projection;
mod regions;

pub use dominators::{definition_dominates_use, ControlFlowGraph, DominatorTree};
pub use liveness::{extended_live_range, live_range, Coverage, LiveRange};
pub use projection::check_projection_coherence;
pub use regions::{close_regions, eliminate_dead_accesses};

use crate::diagnostic::DiagnosticSet;
use crate::ir::Function;

/// The per-function pass pipeline run after lowering: close access regions,
/// drop dead accesses, then check subscript projection coherence.
pub fn analyze(function: &mut Function, diagnostics: &mut DiagnosticSet) {
    close_regions(function);
    eliminate_dead_accesses(function);
    check_projection_coherence(function, diagnostics);
}
