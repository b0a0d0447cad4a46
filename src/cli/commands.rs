use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "notelog")]
#[command(version, about = "Keep one note per device on an append-only event log")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new notelog project in the current directory
    Init,

    /// Show the current note of a device
    Show {
        #[command(flatten)]
        target: Target,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the note of a device with new content
    Save {
        #[command(flatten)]
        target: Target,

        /// New note content
        #[arg(required_unless_present = "stdin")]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long, conflicts_with = "content")]
        stdin: bool,

        /// Author recorded on the note (defaults to git user.email)
        #[arg(long)]
        author: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every saved version of a device's note, newest first
    History {
        #[command(flatten)]
        target: Target,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Which device a command works on
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Device (asset) ID
    #[arg(long, short = 'd')]
    pub device: Option<String>,

    /// Device display name
    #[arg(long, requires = "device")]
    pub device_name: Option<String>,

    /// Widget config JSON file ({"device": {"id": ..., "name": ...}})
    #[arg(long, conflicts_with = "device")]
    pub config: Option<PathBuf>,
}
