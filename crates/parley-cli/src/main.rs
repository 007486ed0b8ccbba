//! CLI entry point.
//!
//! Parses flags, wires the session through bootstrap and hands the terminal
//! to the chat handler.

use clap::Parser;
use tokio::io::BufReader;

use parley_cli::{Cli, bootstrap, handlers, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads PARLEY_*
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut ctx = match bootstrap(cli.settings(), cli.speech_enabled()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    handlers::chat::execute(&mut ctx, stdin, &mut stdout).await
}
