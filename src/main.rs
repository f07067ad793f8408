//! Tickwise CLI entry point.

use clap::Parser;

use tickwise::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = tickwise::cli::execute(cli).await {
        tickwise::cli::handle_error(&err, json);
        std::process::exit(1);
    }
}
