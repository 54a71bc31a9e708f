use clap::Parser;
use stratlab::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    // Logs go to stderr so reports on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stratlab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
