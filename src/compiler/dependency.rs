//! Dependency table construction (§4.5 steps 2).

use std::fmt;

use crate::pass::PassRecord;

/// The kind of dependency recorded between two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyEdge {
    None,
    /// A later pass may be dropped; if it survives, ordering relative to the
    /// writer must still hold (write-after-write).
    Ordering,
    /// A later pass transitively requires the earlier one to run.
    Execution,
}

/// Lower-triangular `N×N` matrix: entry `(i, j)` with `i > j` means "pass `i`
/// depends on pass `j`". Stored one row per `i`, each row holding exactly `i`
/// entries (`j` in `0..i`) — there is nothing to store above the diagonal.
#[derive(Debug, Clone)]
pub struct DependencyTable {
    rows: Vec<Vec<DependencyEdge>>,
}

impl DependencyTable {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            rows: (0..len).map(Vec::with_capacity).map(|mut r| {
                r.resize(r.capacity(), DependencyEdge::None);
                r
            }).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reads entry `(i, j)`. Entries with `i <= j` are always `None` by
    /// construction — the table only ever stores `i > j`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> DependencyEdge {
        if i <= j {
            return DependencyEdge::None;
        }
        self.rows[i][j]
    }

    pub fn set(&mut self, i: usize, j: usize, edge: DependencyEdge) {
        assert!(i > j, "dependency table only stores entries below the diagonal");
        self.rows[i][j] = edge;
    }

    /// Edges `(i, j)` with `j < i` for pass `i`, i.e. everything pass `i`
    /// depends on.
    pub fn dependencies_of(&self, i: usize) -> impl Iterator<Item = (usize, DependencyEdge)> + '_ {
        self.rows[i]
            .iter()
            .enumerate()
            .filter(|(_, e)| !matches!(e, DependencyEdge::None))
            .map(|(j, e)| (j, *e))
    }

    /// Passes that depend on pass `j` (the inverse of `dependencies_of`) —
    /// used by reverse-reachability cull.
    pub fn dependents_of(&self, j: usize) -> impl Iterator<Item = (usize, DependencyEdge)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .skip(j + 1)
            .filter_map(move |(i, row)| {
                let edge = row[j];
                (!matches!(edge, DependencyEdge::None)).then_some((i, edge))
            })
    }
}

impl fmt::Display for DependencyTable {
    /// Prints the lower-triangular matrix as one row per pass, `.`/`o`/`x`
    /// for none/ordering/execution — for test failure output and the
    /// `graphviz` feature's DOT export, not a stable machine format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len() {
            for j in 0..i {
                let c = match self.get(i, j) {
                    DependencyEdge::None => '.',
                    DependencyEdge::Ordering => 'o',
                    DependencyEdge::Execution => 'x',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(feature = "graphviz")]
impl DependencyTable {
    /// Renders the reduced dependency table as a Graphviz DOT digraph,
    /// labelling each node with `names[i]` (falling back to its index).
    /// Execution edges render solid, ordering edges dashed — gated behind
    /// the `graphviz` feature for external inspection tooling.
    #[must_use]
    pub fn to_dot(&self, names: &[String]) -> String {
        let label = |i: usize| names.get(i).cloned().unwrap_or_else(|| i.to_string());
        let mut out = String::from("digraph dependency_table {\n");
        for i in 0..self.len() {
            out.push_str(&format!("  n{i} [label=\"{}\"];\n", label(i)));
        }
        for i in 0..self.len() {
            for (j, edge) in self.dependencies_of(i) {
                let style = match edge {
                    DependencyEdge::Execution => "solid",
                    DependencyEdge::Ordering => "dashed",
                    DependencyEdge::None => continue,
                };
                out.push_str(&format!("  n{j} -> n{i} [style={style}];\n"));
            }
        }
        out.push_str("}\n");
        out
    }
}

/// Builds the dependency table for `passes`, which must already have their
/// `read_resources`/`written_resources` populated from usage evaluation
/// (§4.5 step 1).
#[must_use]
pub fn build_dependency_table(passes: &[PassRecord]) -> DependencyTable {
    let n = passes.len();
    let mut table = DependencyTable::new(n);

    for i in 0..n {
        for &resource in &passes[i].written_resources {
            for j in (i + 1)..n {
                if passes[j].read_resources.contains(&resource) {
                    table.set(j, i, DependencyEdge::Execution);
                } else if passes[j].written_resources.contains(&resource)
                    && !matches!(table.get(j, i), DependencyEdge::Execution)
                {
                    table.set(j, i, DependencyEdge::Ordering);
                }
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassKind;
    use crate::resource::{Lifetime, ResourceHandle, ResourceKind};

    fn handle(index: u32) -> ResourceHandle {
        ResourceHandle::new(ResourceKind::Buffer, Lifetime::Persistent, 0, 0, index)
    }

    #[test]
    fn read_after_write_is_an_execution_edge() {
        let mut p0 = PassRecord::new(0, PassKind::Compute, "p0");
        p0.written_resources.push(handle(0));
        let mut p1 = PassRecord::new(1, PassKind::Compute, "p1");
        p1.read_resources.push(handle(0));
        let table = build_dependency_table(&[p0, p1]);
        assert_eq!(table.get(1, 0), DependencyEdge::Execution);
    }

    #[test]
    fn write_after_write_is_an_ordering_edge_unless_also_read() {
        let mut p0 = PassRecord::new(0, PassKind::Compute, "p0");
        p0.written_resources.push(handle(0));
        let mut p1 = PassRecord::new(1, PassKind::Compute, "p1");
        p1.read_resources.push(handle(99));
        let mut p2 = PassRecord::new(2, PassKind::Compute, "p2");
        p2.written_resources.push(handle(0));
        let table = build_dependency_table(&[p0, p1, p2]);
        assert_eq!(table.get(2, 0), DependencyEdge::Ordering);
        assert_eq!(table.get(1, 0), DependencyEdge::None);
    }

    #[test]
    fn display_renders_one_row_per_pass() {
        let mut p0 = PassRecord::new(0, PassKind::Compute, "p0");
        p0.written_resources.push(handle(0));
        let mut p1 = PassRecord::new(1, PassKind::Compute, "p1");
        p1.read_resources.push(handle(0));
        let table = build_dependency_table(&[p0, p1]);
        assert_eq!(table.to_string(), "\nx\n");
    }

    #[cfg(feature = "graphviz")]
    #[test]
    fn to_dot_emits_a_solid_edge_for_execution_and_dashed_for_ordering() {
        let mut p0 = PassRecord::new(0, PassKind::Compute, "p0");
        p0.written_resources.push(handle(0));
        let mut p1 = PassRecord::new(1, PassKind::Compute, "p1");
        p1.read_resources.push(handle(99));
        let mut p2 = PassRecord::new(2, PassKind::Compute, "p2");
        p2.written_resources.push(handle(0));
        let table = build_dependency_table(&[p0, p1, p2]);
        let dot = table.to_dot(&["p0".to_string(), "p1".to_string(), "p2".to_string()]);
        assert!(dot.contains("n0 -> n2 [style=dashed];"));
        assert!(dot.starts_with("digraph dependency_table {"));
    }
}
