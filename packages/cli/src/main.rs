use std::process;

use clap::{Parser, Subcommand};
use console::style;

mod init;

#[derive(Parser)]
#[command(name = "pixur", version, about = "Set up a pixur server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the server config and optionally create the first administrator
    Init(init::InitArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let res = match cli.command {
        Commands::Init(args) => init::run(args).await,
    };
    if let Err(e) = res {
        eprintln!("{} {e:#}", style("error:").red().bold());
        process::exit(1);
    }
}
