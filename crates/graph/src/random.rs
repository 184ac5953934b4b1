//! Uniform random baseline graphs.
use crate::Graph;

/// Generate a uniform random simple graph with `vertices` vertices and
/// `edges` edges, for comparison against a simulated topology of the same
/// size. The edge count is clamped to the complete graph's capacity.
pub fn random_graph(vertices: usize, edges: usize, rng: &mut fastrand::Rng) -> Graph {
    let mut g = Graph::new(vertices);
    if vertices < 2 {
        return g;
    }
    let capacity = vertices * (vertices - 1) / 2;
    let target = usize::min(edges, capacity);

    while g.edge_count() < target {
        let u = rng.usize(..vertices);
        let v = rng.usize(..vertices);
        g.add_edge(u, v);
    }
    g
}
