//! Catapult - branch-gated configuration reconciliation.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catapult::cli::output;
use catapult::cli::{execute, Cli};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("CATAPULT_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("catapult=debug")
        } else {
            EnvFilter::new("catapult=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time())
        .init();

    if let Err(e) = execute(cli) {
        output::error(&e.to_string());
        if let Some(hint) = e.hint() {
            output::hint(&hint);
        }
        std::process::exit(1);
    }
}
