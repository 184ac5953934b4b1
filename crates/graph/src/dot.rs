//! GraphViz DOT output.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::Graph;

/// Failure while writing a graph file.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write graph: {0}")]
    Io(#[from] io::Error),
}

/// Write `g` as an undirected GraphViz graph.
///
/// The attributes match the study's rendering settings: point-shaped
/// vertices, hairline edges, automatic aspect ratio.
pub fn write_graph<W: Write>(w: &mut W, g: &Graph) -> Result<(), WriteError> {
    writeln!(w, "graph G {{")?;
    writeln!(w, "graph [ratio=auto];")?;
    writeln!(w, "node [shape=point];")?;
    writeln!(w, "edge [arrowsize=0.3, penwidth=0.3];")?;
    for v in 0..g.vertex_count() {
        writeln!(w, "{};", v)?;
    }
    for (u, v) in g.edges() {
        writeln!(w, "{} -- {};", u, v)?;
    }
    writeln!(w, "}}")?;
    Ok(())
}

/// Write `g` to a file at `path`.
pub fn write_graph_file<P: AsRef<Path>>(path: P, g: &Graph) -> Result<(), WriteError> {
    let mut file = BufWriter::new(File::create(path)?);
    write_graph(&mut file, g)?;
    file.flush()?;
    Ok(())
}
