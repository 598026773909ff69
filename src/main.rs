use anyhow::Context;
use clap::Parser;

use bibdoi::{Pipeline, SemanticScholar, output, report::Reporter};

use crate::cli::Cli;

mod cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(input = %args.input.display(), "parsed arguments");

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| output::derive_output_path(&args.input));
    let source = SemanticScholar::new(&args.client_config())
        .with_context(|| format!("invalid --base-url {}", args.base_url))?;
    let reporter = Reporter::new(args.verbosity());

    let summary =
        Pipeline::new(source, args.pipeline_config()).run(&args.input, &output, &reporter)?;
    reporter.finish(&summary, &output);
    Ok(())
}
