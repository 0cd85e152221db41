use std::collections::{HashSet, VecDeque};

use crate::diagnostic::{Diagnostic, DiagnosticSet};
use crate::ir::{Function, Instruction, InstructionId};
use crate::source::SourceSpan;

/// Checks that a defined subscript projects exactly once on every path: the
/// ramp (entry to the yield) is searched breadth-first, then each slide
/// (yield to return) is checked for a second yield. At most one diagnostic
/// is reported.
pub fn check_projection_coherence(function: &Function, diagnostics: &mut DiagnosticSet) {
    if !function.is_subscript || !function.is_defined() {
        return;
    }
    let entry = function.entry().expect("defined functions have an entry");

    // Ramp: look for the unique yield on every path from the entry.
    let mut slides = VecDeque::new();
    let mut visited = HashSet::from([entry]);
    let mut queue = VecDeque::from([entry]);
    while let Some(block) = queue.pop_front() {
        let mut yields = function
            .instructions_in(block)
            .filter(|id| matches!(function.instruction(*id), Instruction::Yield { .. }));
        if let Some(first) = yields.next() {
            if let Some(second) = yields.next() {
                diagnostics.insert(extraneous_projection(function, second, first));
                return;
            }
            if let Some(terminator) = function.terminator(block) {
                for successor in function.instruction(terminator).successors() {
                    slides.push_back((successor, first));
                }
            }
            continue;
        }
        match function.terminator(block) {
            Some(terminator) if !function.instruction(terminator).successors().is_empty() => {
                for successor in function.instruction(terminator).successors() {
                    if visited.insert(successor) {
                        queue.push_back(successor);
                    }
                }
            }
            _ => {
                let anchor = function
                    .block(block)
                    .last()
                    .map(|last| SourceSpan::empty_at(function.instruction(last).site().end_position()))
                    .unwrap_or(function.site);
                diagnostics
                    .insert(Diagnostic::error("subscript must yield before returning", anchor));
                return;
            }
        }
    }

    // Slide: no block past the yield may project again.
    let mut visited = HashSet::new();
    while let Some((block, witness)) = slides.pop_front() {
        if !visited.insert(block) {
            continue;
        }
        let repeated = function
            .instructions_in(block)
            .find(|id| matches!(function.instruction(*id), Instruction::Yield { .. }));
        if let Some(repeated) = repeated {
            diagnostics.insert(extraneous_projection(function, repeated, witness));
            return;
        }
        if let Some(terminator) = function.terminator(block) {
            for successor in function.instruction(terminator).successors() {
                slides.push_back((successor, witness));
            }
        }
    }
}

fn extraneous_projection(
    function: &Function,
    repeated: InstructionId,
    witness: InstructionId,
) -> Diagnostic {
    Diagnostic::error(
        "subscript cannot project more than once",
        function.instruction(repeated).site(),
    )
    .with_note(Diagnostic::note(
        "the first projection is here",
        function.instruction(witness).site(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, InsertionPoint, Value};
    use crate::source::SourceSpan;

    fn site(n: u32) -> SourceSpan {
        SourceSpan::new(0, n, n + 1)
    }

    fn subscript() -> (Function, BlockId) {
        let mut f = Function::declaration(vec![], true, site(0));
        let entry = f.append_block(1);
        (f, entry)
    }

    fn yield_in(f: &mut Function, block: BlockId, n: u32) {
        f.insert(
            InsertionPoint::End(block),
            Instruction::Yield { value: Value::unit(), site: site(n) },
        );
    }

    fn return_in(f: &mut Function, block: BlockId) {
        f.insert(
            InsertionPoint::End(block),
            Instruction::Return { value: Value::unit(), site: site(90) },
        );
    }

    #[test]
    fn a_single_yield_per_path_is_coherent() {
        let (mut f, entry) = subscript();
        yield_in(&mut f, entry, 1);
        return_in(&mut f, entry);
        let mut diagnostics = DiagnosticSet::new();
        check_projection_coherence(&f, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn two_yields_in_one_block_are_extraneous() {
        let (mut f, entry) = subscript();
        yield_in(&mut f, entry, 1);
        yield_in(&mut f, entry, 5);
        return_in(&mut f, entry);
        let mut diagnostics = DiagnosticSet::new();
        check_projection_coherence(&f, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.message, "subscript cannot project more than once");
        assert_eq!(diagnostic.site, site(5));
        assert_eq!(diagnostic.notes[0].site, site(1));
    }

    #[test]
    fn a_second_yield_on_the_slide_is_extraneous() {
        let (mut f, entry) = subscript();
        let slide = f.append_block(0);
        yield_in(&mut f, entry, 1);
        f.insert(
            InsertionPoint::End(entry),
            Instruction::Branch { target: slide, arguments: vec![], site: site(2) },
        );
        yield_in(&mut f, slide, 7);
        return_in(&mut f, slide);
        let mut diagnostics = DiagnosticSet::new();
        check_projection_coherence(&f, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.site, site(7));
        assert_eq!(diagnostic.notes[0].site, site(1));
    }

    #[test]
    fn a_path_without_a_yield_is_missing_one() {
        // entry conditionally yields; the failure path returns directly.
        let (mut f, entry) = subscript();
        let ramp = f.append_block(0);
        let bare = f.append_block(0);
        f.insert(
            InsertionPoint::End(entry),
            Instruction::CondBranch {
                condition: Value::unit(),
                success: ramp,
                failure: bare,
                site: site(0),
            },
        );
        yield_in(&mut f, ramp, 1);
        return_in(&mut f, ramp);
        return_in(&mut f, bare);
        let mut diagnostics = DiagnosticSet::new();
        check_projection_coherence(&f, &mut diagnostics);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "subscript must yield before returning"
        );
    }

    #[test]
    fn diamonds_that_always_yield_once_are_coherent() {
        // Both arms yield, the join returns.
        let (mut f, entry) = subscript();
        let left = f.append_block(0);
        let right = f.append_block(0);
        let join = f.append_block(0);
        f.insert(
            InsertionPoint::End(entry),
            Instruction::CondBranch {
                condition: Value::unit(),
                success: left,
                failure: right,
                site: site(0),
            },
        );
        yield_in(&mut f, left, 1);
        f.insert(
            InsertionPoint::End(left),
            Instruction::Branch { target: join, arguments: vec![], site: site(2) },
        );
        yield_in(&mut f, right, 3);
        f.insert(
            InsertionPoint::End(right),
            Instruction::Branch { target: join, arguments: vec![], site: site(4) },
        );
        return_in(&mut f, join);
        let mut diagnostics = DiagnosticSet::new();
        check_projection_coherence(&f, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn non_subscripts_are_ignored() {
        let mut f = Function::declaration(vec![], false, site(0));
        let entry = f.append_block(0);
        return_in(&mut f, entry);
        let mut diagnostics = DiagnosticSet::new();
        check_projection_coherence(&f, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }
}
