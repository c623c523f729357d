use anyhow::{Context, Result};
use clap::Parser;
use sessionizer::config::{self, Args, LOG_ENV};
use sessionizer::processor::Processor;
use sessionizer::progress_events::ProgressReporter;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(default_level: &str) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid {} filter", LOG_ENV))?,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level: {}", default_level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let inactivity_secs = config::load_inactivity(&args.inactivity_file)?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        inactivity_secs,
        duration = %args.duration,
        "starting sessionization"
    );

    let mut processor = Processor::new(args.input, args.output, inactivity_secs, args.duration)
        .with_progress(ProgressReporter::new(args.progress));
    let summary = processor.process()?;

    info!(
        events = summary.events,
        sessions = summary.sessions,
        sweeps = summary.sweeps,
        "sessionization complete"
    );

    Ok(())
}
