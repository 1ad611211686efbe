use castforged::retry::FetchClass;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "castforged")]
#[command(author, version, about = "Media session negotiation for cast receivers")]
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
    /// Run a LOAD request through a session on the simulated device
    Negotiate {
        /// Media descriptor (URL or opaque id)
        #[arg(required = true)]
        content_id: String,

        /// JSON file with external text tracks to attach as customData
        #[arg(long)]
        tracks: Option<PathBuf>,
    },

    /// Feed a raw host message from a JSON file
    Handle {
        /// Message file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Print per-attempt retry delay bounds
    RetrySchedule {
        /// Fetch class (manifest or segment)
        #[arg(long, default_value = "manifest")]
        class: FetchClass,
    },

    /// Poll a backend's transcode status endpoint
    Poll {
        /// Backend origin, e.g. https://host:8443
        #[arg(required = true)]
        origin: String,

        /// Number of results to print before exiting
        #[arg(long, default_value = "3")]
        ticks: usize,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
