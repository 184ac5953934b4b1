//! Topology metrics: clustering, geodesics, diameter.
use crate::Graph;

/// All-pairs shortest path lengths over unit-weight edges, by
/// Floyd–Warshall. Unreachable pairs are `f64::INFINITY`.
pub fn distances(g: &Graph) -> Vec<Vec<f64>> {
    let n = g.vertex_count();
    let mut dist = vec![vec![f64::INFINITY; n]; n];

    for v in 0..n {
        dist[v][v] = 0.0;
    }
    for &(u, v) in g.edges() {
        dist[u][v] = 1.0;
        dist[v][u] = 1.0;
    }
    for k in 0..n {
        for i in 0..n {
            if dist[i][k].is_infinite() {
                continue;
            }
            for j in 0..n {
                let through = dist[i][k] + dist[k][j];
                if through < dist[i][j] {
                    dist[i][j] = through;
                }
            }
        }
    }
    dist
}

/// Mean of the per-vertex local clustering coefficients.
///
/// A vertex with fewer than two neighbors contributes zero.
pub fn clustering_coefficient(g: &Graph) -> f64 {
    let n = g.vertex_count();
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for v in 0..n {
        let neighbors = g.neighbors(v);
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        let mut links = 0usize;
        for i in 0..k {
            for j in (i + 1)..k {
                if g.has_edge(neighbors[i], neighbors[j]) {
                    links += 1;
                }
            }
        }
        total += 2.0 * links as f64 / (k * (k - 1)) as f64;
    }
    total / n as f64
}

/// Mean geodesic distance over connected ordered pairs of distinct
/// vertices. Zero when no such pair exists.
pub fn mean_geodesic(distances: &[Vec<f64>]) -> f64 {
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for (i, row) in distances.iter().enumerate() {
        for (j, d) in row.iter().enumerate() {
            if i != j && d.is_finite() {
                sum += d;
                pairs += 1;
            }
        }
    }
    if pairs == 0 {
        0.0
    } else {
        sum / pairs as f64
    }
}

/// The largest finite shortest-path length.
pub fn diameter(distances: &[Vec<f64>]) -> u64 {
    let mut max = 0.0f64;
    for row in distances {
        for d in row {
            if d.is_finite() && *d > max {
                max = *d;
            }
        }
    }
    max as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A path on four vertices: 0 - 1 - 2 - 3.
    fn path4() -> Graph {
        let mut g = Graph::new(4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 3);
        g
    }

    fn triangle() -> Graph {
        let mut g = Graph::new(3);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 0);
        g
    }

    #[test]
    fn test_triangle_is_fully_clustered() {
        assert!((clustering_coefficient(&triangle()) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_has_no_clustering() {
        assert_eq!(clustering_coefficient(&path4()), 0.0);
    }

    #[test]
    fn test_square_with_diagonal() {
        // 0-1-2-3-0 plus the 0-2 diagonal. Vertices 1 and 3 see the
        // connected pair {0, 2}; vertices 0 and 2 see one link among
        // three neighbor pairs.
        let mut g = Graph::new(4);
        for (u, v) in [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)] {
            g.add_edge(u, v);
        }
        let expected = (1.0 + 1.0 + 1.0 / 3.0 + 1.0 / 3.0) / 4.0;
        assert!((clustering_coefficient(&g) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_path_distances() {
        let d = distances(&path4());
        assert_eq!(d[0][3], 3.0);
        assert_eq!(d[1][3], 2.0);
        assert_eq!(d[0][0], 0.0);
    }

    #[test]
    fn test_disconnected_pair_is_infinite() {
        let mut g = Graph::new(3);
        g.add_edge(0, 1);

        let d = distances(&g);
        assert!(d[0][2].is_infinite());
        assert_eq!(diameter(&d), 1);
    }

    #[test]
    fn test_mean_geodesic_of_path() {
        // Ordered pairs at distance 1: 6, distance 2: 4, distance 3: 2.
        let d = distances(&path4());
        let expected = (6.0 + 8.0 + 6.0) / 12.0;
        assert!((mean_geodesic(&d) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_diameter_of_path() {
        assert_eq!(diameter(&distances(&path4())), 3);
    }

    #[test]
    fn test_star_metrics() {
        // Star on four vertices, centered on 0.
        let mut g = Graph::new(4);
        for leaf in 1..4 {
            g.add_edge(0, leaf);
        }
        let d = distances(&g);

        assert_eq!(clustering_coefficient(&g), 0.0);
        assert_eq!(diameter(&d), 2);
        // Six ordered pairs at distance 1, six at distance 2.
        assert!((mean_geodesic(&d) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_graph_metrics() {
        let g = Graph::new(0);
        let d = distances(&g);
        assert_eq!(clustering_coefficient(&g), 0.0);
        assert_eq!(mean_geodesic(&d), 0.0);
        assert_eq!(diameter(&d), 0);
    }
}
