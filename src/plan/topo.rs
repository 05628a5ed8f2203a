use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::error::DflockError;
use crate::plan::delta::{DeltaId, DeltaTree};

/// Order deltas so every target comes before the deltas that point at it.
///
/// Nodes enter the graph in tree order, so roots keep their tree order in the output.
pub fn topo_sort(tree: &DeltaTree) -> Result<Vec<DeltaId>, DflockError> {
    let graph = dependency_graph(tree);
    match toposort(&graph, None) {
        Ok(order) => Ok(order
            .into_iter()
            .filter_map(|index| tree.id_at(index))
            .collect()),
        Err(_) => {
            let cycle_members: Vec<&str> = tarjan_scc(&graph)
                .into_iter()
                .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
                .flatten()
                .filter_map(|index| tree.id_at(index))
                .map(|id| tree.get(id).branch_name.as_str())
                .collect();
            Err(DflockError::plan(format!(
                "dependency cycle detected among branches: [{}]",
                cycle_members.join(", ")
            )))
        }
    }
}

/// Edges run from a target to the deltas built on it.
fn dependency_graph(tree: &DeltaTree) -> DiGraphMap<usize, ()> {
    let mut graph = DiGraphMap::new();
    for (id, _) in tree.iter() {
        graph.add_node(id.index());
    }
    for (id, delta) in tree.iter() {
        if let Some(target) = delta.target {
            graph.add_edge(target.index(), id.index(), ());
        }
    }
    graph
}
