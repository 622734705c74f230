//! fly CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fly::cli::Cli;

fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    // RUST_LOG wins unless --debug asks for fly=debug explicitly
    let filter = if cli.debug {
        EnvFilter::from_default_env().add_directive("fly=debug".parse()?)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fly=warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.execute() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            Ok(ExitCode::from(code))
        }
    }
}
