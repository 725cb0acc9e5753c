use crate::cli::RunArgs;
use crate::config::builder::build_config;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use coexist::engine::progress::ProgressReporter;
use coexist::engine::runner::{ProcessRunner, SimulatorRunner};
use coexist::workflows::melting_point;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: RunArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args)?;

    let runner = ProcessRunner::new(config.simulator.clone());
    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting coexistence run at {:.1} K in {} using '{}'...",
        config.melting_point_guess,
        config.output_dir.display(),
        runner.describe()
    );
    info!("Invoking the melting point workflow...");

    let result =
        tokio::task::block_in_place(|| melting_point::run(&config, &runner, &reporter))?;
    let summary_path = melting_point::write_summary(&result, &config)?;
    info!("Summary written to {:?}", summary_path);

    for stage in &result.stages {
        let temperature = stage
            .final_temperature
            .map(|t| format!("{:.1} K", t))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "  {:<12} {:>7} steps  {:>6} atoms  final T = {}{}",
            stage.stage.name(),
            stage.steps,
            stage.atoms,
            temperature,
            if stage.resumed { "  (resumed)" } else { "" }
        );
    }

    match &result.estimate {
        Some(estimate) => {
            println!(
                "✓ Coexistence temperature: {:.1} K (guess {:.1} K, deviation {:+.1} K, {} samples)",
                estimate.temperature, estimate.guess, estimate.deviation, estimate.samples
            );
            if estimate.deviation.abs() > 0.05 * estimate.guess {
                println!(
                    "  The estimate is far from the guess; consider rerunning with --guess {:.0}.",
                    estimate.temperature
                );
            }
        }
        None => {
            warn!("No thermo data from the equilibration stage.");
            println!("Warning: no thermo data from the equilibration stage; no estimate.");
        }
    }
    println!("  Summary: {}", summary_path.display());

    Ok(())
}
