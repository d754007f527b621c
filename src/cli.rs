use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforge")]
#[command(author, version, about = "Guided media-transformation pipelines compiled to ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the command tree
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a command and print the ffmpeg arguments of every step
    Compile {
        /// Command path, e.g. "Workflows/Web Ready"
        #[arg(required = true)]
        path: String,

        /// JSON file mapping step index to a configuration tree
        #[arg(short, long)]
        steps: Option<PathBuf>,

        /// Child workflow to continue with (repeat to descend further)
        #[arg(long = "child")]
        child: Vec<usize>,
    },

    /// Run a command over input files through ffmpeg
    Run {
        /// Command path, e.g. "Features/Grayscale"
        #[arg(required = true)]
        path: String,

        /// Input file(s)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// JSON file mapping step index to a configuration tree
        #[arg(short, long)]
        steps: Option<PathBuf>,

        /// Child workflow to continue with (repeat to descend further)
        #[arg(long = "child")]
        child: Vec<usize>,

        /// Where to write the final output (default: next to the first input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },
}
