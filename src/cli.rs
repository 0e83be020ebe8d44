// CLI for running the server and one-off maintenance commands

use clap::{Parser, Subcommand};

/// Nos limites backend CLI
#[derive(Parser)]
#[command(name = "limites-backend")]
#[command(about = "Nos limites matching backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Run database migrations and exit
    Migrate,

    /// Seed the limit catalog (idempotent), repair legacy duplicates, and exit
    Seed,
}
