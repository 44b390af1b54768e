use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod dataset;
mod pipeline;
mod report;
mod transport;

use cli::SeedArgs;
use config::RunConfig;
use pipeline::Pipeline;
use report::ConsoleReporter;
use transport::HttpTransport;

fn main() -> Result<()> {
    init_tracing();
    let args = SeedArgs::parse();
    let config = RunConfig::from_args(&args)?;

    let transport = HttpTransport::new(&config.host, config.timeout);
    let mut reporter = ConsoleReporter::stdout(config.verbose, config.json);
    let outcome = Pipeline::new(&config, &transport, &mut reporter).run();

    // Step failures are reported, not turned into an exit code.
    let counts = outcome.counts();
    if counts.failure > 0 {
        tracing::info!(failures = counts.failure, "seeding completed with failures");
    }
    Ok(())
}

/// Diagnostics go to stderr; stdout belongs to the reporter.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
