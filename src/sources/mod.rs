pub mod config_tree;
pub mod snapshot;
pub mod telemetry;
