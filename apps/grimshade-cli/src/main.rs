mod cli;
mod commands;
mod config;

use clap::Parser;

// The engine runs on a single cooperative task; a current-thread runtime
// is all it needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run().await
}
