pub mod aggregate;
pub mod chart;
pub mod cluster;
pub mod config;
pub mod evolution;
pub mod forecast;
pub mod genres;
pub mod graph;
pub mod influence;
pub mod network;
pub mod score;
pub mod waves;

#[cfg(test)]
mod testutil;

/// Application name for XDG paths
pub const APP_NAME: &str = "oceanus";

/// Graph file read when neither the CLI nor the config names one
pub const DEFAULT_GRAPH_FILE: &str = "MC1_graph.json";

/// Directory chart configs are written to by default
pub const DEFAULT_OUT_DIR: &str = "charts";
