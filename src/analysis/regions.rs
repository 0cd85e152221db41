use crate::analysis::dominators::ControlFlowGraph;
use crate::analysis::liveness::{extended_live_range, Coverage};
use crate::ir::{Function, InsertionPoint, Instruction, InstructionId, Value};

/// Closes the access regions of a lowered function: every region entry gets
/// a matching `end_access` at each upper boundary of its extended
/// live-range. Entries whose range is empty are removed instead.
pub fn close_regions(function: &mut Function) {
    if !function.is_defined() {
        return;
    }
    let cfg = ControlFlowGraph::of(function);
    let entries: Vec<InstructionId> = function
        .instructions()
        .into_iter()
        .filter(|id| function.instruction(*id).is_region_entry())
        .collect();

    for entry in entries {
        let value = Value::Register(entry);
        let range = extended_live_range(function, &cfg, &value);
        if range.is_empty() && function.uses(&value).is_empty() {
            function.remove(entry);
            continue;
        }
        let site = function.instruction(entry).site();

        let mut boundaries: Vec<InsertionPoint> = Vec::new();
        for (&block, &coverage) in &range.coverage {
            let (point, boundary_user) = match coverage {
                Coverage::LiveInAndOut | Coverage::LiveOut => continue,
                Coverage::LiveIn(Some(user)) => (InsertionPoint::After(user), Some(user)),
                Coverage::LiveIn(None) => (InsertionPoint::Start(block), None),
                Coverage::Closed(Some(user)) => (InsertionPoint::After(user), Some(user)),
                Coverage::Closed(None) => (InsertionPoint::After(entry), None),
            };
            if let Some(user) = boundary_user {
                let instruction = function.instruction(user);
                // The last user may already close the region.
                if instruction.closed_region_entry() == Some(&value) {
                    continue;
                }
                // Nothing may follow a terminator.
                if instruction.is_terminator() {
                    continue;
                }
            }
            boundaries.push(point);
        }
        for point in boundaries {
            function.insert(point, Instruction::EndAccess { start: value.clone(), site });
        }
    }
}

/// Removes accesses whose only uses are their own region ends, together
/// with those ends, until a fixed point.
pub fn eliminate_dead_accesses(function: &mut Function) {
    if !function.is_defined() {
        return;
    }
    loop {
        let mut changed = false;
        let entries: Vec<InstructionId> = function
            .instructions()
            .into_iter()
            .filter(|id| function.instruction(*id).is_region_entry())
            .collect();
        for entry in entries {
            let value = Value::Register(entry);
            let uses = function.uses(&value).to_vec();
            let only_ends = uses
                .iter()
                .all(|u| function.instruction(u.user).closed_region_entry() == Some(&value));
            if !only_ends {
                continue;
            }
            for use_site in uses {
                function.remove(use_site.user);
            }
            function.remove(entry);
            changed = true;
        }
        if !changed {
            break;
        }
    }
}
