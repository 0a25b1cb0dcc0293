use clap::Parser;
use docpipe::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Parse(args) => cli::parse::run(args).await,
        Command::Health => cli::health::run().await,
    }
}
