use anyhow::Context;
use clap::Parser;

use ksym_locator::cli::Args;
use ksym_locator::config::loader::load_settings;
use ksym_locator::orchestrator::Pipeline;
use ksym_locator::{report, LogCollector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings =
        load_settings(args.config.as_deref()).context("Failed to load settings")?;
    args.apply_to(&mut settings);
    settings.validate().context("Invalid settings")?;

    // Logging first, everything below reports through log::*
    let collector = LogCollector::new(&settings.log_dir, args.log_level()).with_context(|| {
        format!("Failed to open log directory {}", settings.log_dir.display())
    })?;
    let max_level = collector.level();
    if let Err(e) = log::set_boxed_logger(Box::new(collector.clone()))
        .map(|()| log::set_max_level(max_level))
    {
        eprintln!("[Main] WARNING: Failed to register logger: {}", e);
    }
    log::info!(
        "[Main] ksym-locator {} (log: {})",
        ksym_locator::VERSION,
        collector.log_path().display()
    );

    let mut steps = report::StepLogger::start();
    let outcome = Pipeline::from_settings(&settings)
        .run(&args.kernel, |matches, progress| steps.log(matches, progress))
        .await
        .with_context(|| format!("Failed to locate symbols of {}", args.kernel.display()));

    if let Ok(report) = &outcome {
        log::info!("[Main] {}", report.summary());
    }
    if let Err(e) = collector.wait_for_empty() {
        eprintln!("[Main] WARNING: {}", e);
    }

    let report = outcome?;
    if args.json {
        println!("{}", report.to_json().context("Failed to serialise report")?);
    } else {
        println!("{}", report.to_text());
    }
    Ok(())
}
