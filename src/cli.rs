use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(about = "Import and reconcile threat models from heterogeneous tool exports")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format (json, terminal)
    #[arg(long = "format-output", default_value = "terminal")]
    pub format_output: OutputFormat,

    /// Write output to file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the format of a threat-model export
    Detect {
        /// Target file to inspect
        target: String,
    },

    /// Import a single threat-model export
    Import {
        /// Target file to import
        target: String,

        /// Format id to use instead of detection
        /// (tool-export, threat-list, risk-document, generic-delimited)
        #[arg(long)]
        format: Option<String>,

        /// JSON file with the system entity catalog; when given, imported
        /// entities are reconciled against it
        #[arg(long)]
        entities: Option<String>,
    },

    /// Import multiple files or directories in parallel
    Batch {
        /// Paths to import (files or directories)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Format id applied to every item instead of per-item detection
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output for machine consumption
    Json,
    /// Human-readable terminal output
    Terminal,
}
