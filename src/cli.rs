use clap::Parser;
use std::path::PathBuf;

/// Generate controller API examples by replaying a fixed catalogue of calls
#[derive(Parser, Debug, Clone)]
#[command(name = "controller-examples", version, about, long_about = None)]
pub struct Cli {
    /// File to write the examples to (stdout when omitted)
    pub output: Option<PathBuf>,
}
