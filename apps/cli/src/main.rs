use std::collections::HashMap;
use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use topsim_graph::metrics::{clustering_coefficient, diameter, distances, mean_geodesic};
use topsim_graph::{dot, random::random_graph, Graph};
use topsim_p2p::{Config, PeerId, Simulation, Snapshot};

mod cli;

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let mut sim = Simulation::new(
        Config {
            servers: args.server_count,
            clients: args.client_count,
            duration: args.duration,
            churn: args.churn,
        },
        fastrand::Rng::new(),
    );
    let snapshot = sim.run();
    let topology = topology_graph(&snapshot);

    let mut rng = fastrand::Rng::new();
    let baseline = random_graph(topology.vertex_count(), topology.edge_count(), &mut rng);

    print_stats(&topology, &baseline);

    if let Some(path) = &args.graph_out {
        write_graphs(path, &topology, &baseline)?;
    }
    Ok(())
}

/// Index the snapshot's peers and rebuild its edges over `0..n`.
fn topology_graph(snapshot: &Snapshot) -> Graph {
    let index: HashMap<PeerId, usize> = snapshot
        .vertices
        .iter()
        .enumerate()
        .map(|(ix, id)| (*id, ix))
        .collect();

    let mut g = Graph::new(snapshot.vertices.len());
    for (a, b) in &snapshot.edges {
        g.add_edge(index[a], index[b]);
    }
    g
}

fn print_stats(topology: &Graph, baseline: &Graph) {
    let dist = distances(topology);
    let baseline_dist = distances(baseline);

    println!();
    println!();
    println!("\t\tStatistics!");
    println!("\t\t-----------");
    println!(
        "{:>20}\t | {:>10} | {:>12}",
        "", "Simulated", "Random Graph"
    );
    println!(
        "{:>20}\t | {:>10.4} | {:>12.4}",
        "Clustering Coef",
        clustering_coefficient(topology),
        clustering_coefficient(baseline)
    );
    println!(
        "{:>20}\t | {:>10.4} | {:>12.4}",
        "Mean Geodesic Dist",
        mean_geodesic(&dist),
        mean_geodesic(&baseline_dist)
    );
    println!(
        "{:>20}\t | {:>10} | {:>12}",
        "Diameter",
        diameter(&dist),
        diameter(&baseline_dist)
    );
}

fn write_graphs(path: &Path, topology: &Graph, baseline: &Graph) -> eyre::Result<()> {
    dot::write_graph_file(path, topology)?;

    let mut random_path = path.as_os_str().to_owned();
    random_path.push(".random.gv");
    dot::write_graph_file(Path::new(&random_path), baseline)?;

    tracing::info!(
        "graphs written to {} and {}",
        path.display(),
        Path::new(&random_path).display()
    );
    Ok(())
}
