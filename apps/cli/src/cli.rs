use std::path::PathBuf;

use clap::Parser;

/// Simulate the peer discovery layer of a Bitcoin-style overlay and compare
/// the resulting topology against a random graph of the same size.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "The duration is given in ticks of 1/10 second; the default 864000 is one day.")]
pub struct Args {
    /// Number of reachable (server) peers to spawn.
    pub server_count: u32,
    /// Number of unreachable (client) peers to spawn.
    #[clap(default_value_t = 0)]
    pub client_count: u32,
    /// Simulation horizon, in ticks.
    #[clap(default_value_t = 864_000)]
    pub duration: u64,
    /// Upper bound on peers stopped and started per churn pulse; 0 disables
    /// churn.
    #[clap(default_value_t = 0)]
    pub churn: u32,
    /// Write the final topology as GraphViz DOT to this path. The random
    /// baseline goes to `<path>.random.gv`.
    pub graph_out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["topsim", "100"]).unwrap();

        assert_eq!(args.server_count, 100);
        assert_eq!(args.client_count, 0);
        assert_eq!(args.duration, 864_000);
        assert_eq!(args.churn, 0);
        assert!(args.graph_out.is_none());
    }

    #[test]
    fn test_all_positionals() {
        let args =
            Args::try_parse_from(["topsim", "100", "20", "5000", "3", "out.gv"]).unwrap();

        assert_eq!(args.server_count, 100);
        assert_eq!(args.client_count, 20);
        assert_eq!(args.duration, 5000);
        assert_eq!(args.churn, 3);
        assert_eq!(args.graph_out, Some(PathBuf::from("out.gv")));
    }

    #[test]
    fn test_missing_server_count_fails() {
        assert!(Args::try_parse_from(["topsim"]).is_err());
    }

    #[test]
    fn test_non_numeric_argument_fails() {
        assert!(Args::try_parse_from(["topsim", "many"]).is_err());
    }
}
