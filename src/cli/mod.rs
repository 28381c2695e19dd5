//! CLI module for citerag
//!
//! Provides subcommands:
//! - `serve`: HTTP API server
//! - `ask`: ingest local files and answer one question in-process

pub mod ask;
pub mod serve;

use clap::{Parser, Subcommand};

/// citerag - Citation-grounded question answering over your documents
#[derive(Parser)]
#[command(name = "citerag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Answer one question over local plain-text files
    Ask(ask::AskArgs),
}
