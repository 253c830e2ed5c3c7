//! Dependency-aware DFS reordering (§4.5 step 4).

use crate::compiler::dependency::DependencyTable;
use crate::merge::mergeable;
use crate::pass::{PassKind, PassRecord};

/// Produces a schedule over the active indices in `active` (in ascending
/// original-index order by construction of the caller) such that every
/// dependency precedes its dependent, with draw passes that are mergeable
/// with the current node visited after non-mergeable ones — so mergeable
/// draw passes land contiguously in the output.
#[must_use]
pub fn schedule(passes: &[PassRecord], table: &DependencyTable, active: &[bool]) -> Vec<usize> {
    let n = passes.len();
    let mut visited = vec![false; n];
    let mut schedule = Vec::with_capacity(active.iter().filter(|a| **a).count());

    for start in (0..n).rev() {
        if active[start] && !visited[start] {
            visit(start, passes, table, active, &mut visited, &mut schedule);
        }
    }

    schedule
}

fn visit(
    node: usize,
    passes: &[PassRecord],
    table: &DependencyTable,
    active: &[bool],
    visited: &mut [bool],
    schedule: &mut Vec<usize>,
) {
    if visited[node] {
        return;
    }
    visited[node] = true;

    let mut deps: Vec<usize> = table
        .dependencies_of(node)
        .filter(|(dep, _)| active[*dep])
        .map(|(dep, _)| dep)
        .collect();

    let is_draw_with_target = matches!(passes[node].kind, PassKind::Draw) && passes[node].render_target.is_some();
    deps.sort_by_key(|dep| {
        let is_mergeable_ancestor = is_draw_with_target
            && matches!(passes[*dep].kind, PassKind::Draw)
            && passes[*dep].render_target.is_some()
            && mergeable(&passes[node], &passes[*dep]);
        // non-mergeable ancestors first (false < true), then stable by original index.
        (is_mergeable_ancestor, *dep)
    });

    for dep in deps {
        visit(dep, passes, table, active, visited, schedule);
    }

    schedule.push(node);
}
