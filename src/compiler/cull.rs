//! Reverse-reachability dead-pass culling (§4.5 step 3).

use crate::compiler::dependency::{DependencyEdge, DependencyTable};
use crate::pass::PassRecord;

/// Returns the set of pass indices that survive culling: every pass with
/// side effects, plus every pass transitively required by one through an
/// `execution` edge. `ordering` edges are never followed here — they only
/// constrain order between passes that already survived for other reasons.
#[must_use]
pub fn reachable_active_set(passes: &[PassRecord], table: &DependencyTable) -> Vec<bool> {
    let n = passes.len();
    let mut active = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();

    for (i, pass) in passes.iter().enumerate() {
        if pass.has_side_effects {
            active[i] = true;
            stack.push(i);
        }
    }

    while let Some(p) = stack.pop() {
        for (dep, edge) in table.dependencies_of(p) {
            if matches!(edge, DependencyEdge::Execution) && !active[dep] {
                active[dep] = true;
                stack.push(dep);
            }
        }
    }

    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::dependency::build_dependency_table;
    use crate::pass::PassKind;
    use crate::resource::{Lifetime, ResourceHandle, ResourceKind};

    fn handle(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Buffer, Lifetime::Persistent, 0, 0, index)
    }

    #[test]
    fn a_pass_with_no_side_effect_dependents_is_culled() {
        // P0 writes Tmp (no side effects); P1 writes T (persistent, side effects);
        // P2 reads Tmp, writes Tmp2 (no side effects). Only P1 should be active.
        let tmp = handle(0);
        let t = handle(1);
        let tmp2 = handle(2);

        let mut p0 = PassRecord::new(0, PassKind::Compute, "p0");
        p0.written_resources.push(tmp);

        let mut p1 = PassRecord::new(1, PassKind::Compute, "p1");
        p1.written_resources.push(t);
        p1.has_side_effects = true;

        let mut p2 = PassRecord::new(2, PassKind::Compute, "p2");
        p2.read_resources.push(tmp);
        p2.written_resources.push(tmp2);

        let passes = [p0, p1, p2];
        let table = build_dependency_table(&passes);
        let active = reachable_active_set(&passes, &table);
        assert_eq!(active, vec![false, true, false]);
    }

    #[test]
    fn an_execution_dependency_of_a_side_effect_pass_survives() {
        let b = handle(0);
        let x = handle(1);

        let mut p0 = PassRecord::new(0, PassKind::Compute, "p0");
        p0.written_resources.push(b);

        let mut p1 = PassRecord::new(1, PassKind::Compute, "p1");
        p1.read_resources.push(x);

        let mut p2 = PassRecord::new(2, PassKind::Compute, "p2");
        p2.read_resources.push(b);
        p2.has_side_effects = true;

        let passes = [p0, p1, p2];
        let table = build_dependency_table(&passes);
        let active = reachable_active_set(&passes, &table);
        assert_eq!(active, vec![true, false, true]);
    }
}
