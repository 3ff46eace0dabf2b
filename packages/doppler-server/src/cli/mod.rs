use clap::{Parser, Subcommand};

/// Doppler Server - pass-by synthesis and speed estimation over HTTP
#[derive(Parser)]
#[command(name = "doppler-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default)
    Serve,

    /// Print the registered routes and exit
    Routes,
}
