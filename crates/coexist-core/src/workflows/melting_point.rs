use crate::core::crystal::builder::build_conventional_cell;
use crate::core::crystal::miller::sort_along_miller;
use crate::core::io::input_deck::{
    FINAL_DATA_FILE, INITIAL_DATA_FILE, INPUT_FILE, InputDeck, LOG_FILE,
};
use crate::core::io::lammps_data::{DataOptions, LammpsData};
use crate::core::io::thermo::{ThermoError, ThermoEvent, ThermoLog, ThermoScanner, ThermoTable};
use crate::core::io::traits::SimulatorFile;
use crate::core::models::species::Species;
use crate::core::models::structure::Structure;
use crate::engine::config::{CrystalConfig, WorkflowConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{RunReport, SimulationJob, SimulatorRunner};
use crate::engine::stage::{self, StageKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const THERMO_CSV_FILE: &str = "thermo.csv";
pub const SUMMARY_FILE: &str = "summary.toml";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: StageKind,
    pub directory: PathBuf,
    pub steps: u64,
    /// The stage was not run because its output already existed.
    pub resumed: bool,
    /// Atom count of the stage's `final.data`.
    pub atoms: usize,
    pub thermo_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

/// Coexistence temperature read off the equilibration stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeltingPointEstimate {
    pub temperature: f64,
    pub guess: f64,
    /// `temperature - guess`; feed `temperature` back as the next guess when large.
    pub deviation: f64,
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MeltingPointResult {
    pub num_atoms: usize,
    pub composition: BTreeMap<String, usize>,
    pub stages: Vec<StageSummary>,
    pub estimate: Option<MeltingPointEstimate>,
    pub final_structure: Structure,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    melting_point_guess: f64,
    num_atoms: usize,
    composition: &'a BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimate: Option<&'a MeltingPointEstimate>,
    stages: &'a [StageSummary],
}

/// Builds the two-phase starting structure.
///
/// The conventional cell is replicated by `supercell * interface_multiplier`
/// and sorted along the Miller normal, so atom ids `1..=N/2` form one
/// contiguous slab.
pub fn build_initial_structure(crystal: &CrystalConfig) -> Result<Structure, EngineError> {
    let cell = build_conventional_cell(&crystal.lattice, crystal.centering, &crystal.basis)?;
    let supercell = cell.supercell(crystal.total_multiplier());
    let sorted = sort_along_miller(&supercell, crystal.miller_index)?;
    debug!(
        "Initial structure: {} atoms, cell lengths {:?}.",
        sorted.len(),
        sorted.lattice().lengths()
    );
    Ok(sorted)
}

struct StageContext<'a> {
    config: &'a WorkflowConfig,
    runner: &'a dyn SimulatorRunner,
    reporter: &'a ProgressReporter<'a>,
    species: Vec<Species>,
    num_atoms: usize,
    rng: StdRng,
}

struct StageOutcome {
    summary: StageSummary,
    structure: Structure,
    thermo: Option<ThermoTable>,
}

#[instrument(skip_all, name = "melting_point_workflow")]
pub fn run(
    config: &WorkflowConfig,
    runner: &dyn SimulatorRunner,
    reporter: &ProgressReporter,
) -> Result<MeltingPointResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Building initial structure",
    });
    let initial = build_initial_structure(&config.crystal)?;
    let composition = initial.composition();
    info!(
        "Built {} atom coexistence cell ({:?}); melting point guess {:.1} K.",
        initial.len(),
        composition,
        config.melting_point_guess
    );
    fs::create_dir_all(&config.output_dir).map_err(|e| EngineError::io(&config.output_dir, e))?;
    reporter.report(Progress::PhaseFinish);

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut ctx = StageContext {
        config,
        runner,
        reporter,
        species: initial.species().to_vec(),
        num_atoms: initial.len(),
        rng,
    };
    info!("Simulator command: {}", runner.describe());

    let mut stages = Vec::with_capacity(StageKind::ALL.len());
    let mut structure = initial;
    let mut last_thermo = None;
    for kind in StageKind::ALL {
        let outcome = run_stage(kind, &structure, &mut ctx)?;
        stages.push(outcome.summary);
        structure = outcome.structure;
        last_thermo = outcome.thermo;
    }

    let estimate = match &last_thermo {
        Some(table) => estimate_melting_point(table, config),
        None => None,
    };
    match &estimate {
        Some(e) => info!(
            "Estimated coexistence temperature {:.1} K (guess {:.1} K, deviation {:+.1} K).",
            e.temperature, e.guess, e.deviation
        ),
        None => warn!("No thermo output from the equilibration stage; no estimate available."),
    }

    Ok(MeltingPointResult {
        num_atoms: ctx.num_atoms,
        composition,
        stages,
        estimate,
        final_structure: structure,
    })
}

fn run_stage(
    kind: StageKind,
    input: &Structure,
    ctx: &mut StageContext<'_>,
) -> Result<StageOutcome, EngineError> {
    let config = ctx.config;
    let directory = config.output_dir.join(kind.directory());
    let final_path = directory.join(FINAL_DATA_FILE);
    let steps = kind.steps(config);

    ctx.reporter.report(Progress::PhaseStart { name: kind.label() });
    info!("{} in {:?}", kind.label(), directory);

    // Drawn even when resuming, so the seeds of later stages do not depend on
    // which stages were skipped.
    let deck = stage::build_deck(kind, config, &ctx.species, ctx.num_atoms, &mut ctx.rng)?;

    let resumed = config.resume && final_path.is_file();
    let mut elapsed_seconds = None;
    if resumed {
        info!("Found {:?}; skipping stage '{}'.", final_path, kind.name());
        ctx.reporter.report(Progress::Message(format!(
            "{} already complete, reusing its output",
            kind.directory()
        )));
    } else {
        prepare_directory(kind, input, &directory, &deck)?;
        let job = SimulationJob {
            stage: kind,
            directory: &directory,
            input_file: INPUT_FILE,
            total_steps: steps,
        };
        let report = run_with_progress(ctx.runner, &job, ctx.reporter)?;
        elapsed_seconds = Some(report.elapsed.as_secs_f64());
    }

    if !final_path.is_file() {
        return Err(EngineError::MissingOutput {
            stage: kind.name(),
            path: final_path,
        });
    }
    let data = LammpsData::read_from_path(&final_path).map_err(|e| EngineError::DataFile {
        path: final_path.clone(),
        source: e,
    })?;
    let structure = data
        .to_structure(&ctx.species)
        .map_err(|e| EngineError::DataFile {
            path: final_path.clone(),
            source: e,
        })?;
    if structure.len() != ctx.num_atoms {
        warn!(
            "Stage '{}' ended with {} atoms, expected {}.",
            kind.name(),
            structure.len(),
            ctx.num_atoms
        );
    }

    let thermo = read_thermo(&directory)?;
    let summary = StageSummary {
        stage: kind,
        directory,
        steps,
        resumed,
        atoms: structure.len(),
        thermo_rows: thermo.as_ref().map_or(0, ThermoTable::len),
        final_temperature: thermo.as_ref().and_then(|t| t.last("temp")),
        mean_temperature: thermo
            .as_ref()
            .and_then(|t| t.trailing_mean("temp", config.averaging_fraction)),
        elapsed_seconds,
    };
    ctx.reporter.report(Progress::PhaseFinish);

    Ok(StageOutcome {
        summary,
        structure,
        thermo,
    })
}

fn prepare_directory(
    kind: StageKind,
    input: &Structure,
    directory: &Path,
    deck: &InputDeck,
) -> Result<(), EngineError> {
    fs::create_dir_all(directory).map_err(|e| EngineError::io(directory, e))?;
    // Output left by an earlier run must not pass for this run's output.
    for name in [FINAL_DATA_FILE, LOG_FILE] {
        let stale = directory.join(name);
        if stale.is_file() {
            debug!("Removing stale {:?}.", stale);
            fs::remove_file(&stale).map_err(|e| EngineError::io(&stale, e))?;
        }
    }

    let options = DataOptions {
        include_charge: true,
        include_velocities: kind.inherits_velocities(),
    };
    let data_path = directory.join(INITIAL_DATA_FILE);
    let data = LammpsData::from_structure(input, options).map_err(|e| EngineError::DataFile {
        path: data_path.clone(),
        source: e,
    })?;
    data.write_to_path(&data_path)
        .map_err(|e| EngineError::DataFile {
            path: data_path.clone(),
            source: e,
        })?;

    let deck_path = directory.join(INPUT_FILE);
    deck.write_to_path(&deck_path)
        .map_err(|e| EngineError::io(&deck_path, e))?;
    debug!("Wrote {:?} and {:?}.", data_path, deck_path);
    Ok(())
}

fn run_with_progress(
    runner: &dyn SimulatorRunner,
    job: &SimulationJob<'_>,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    reporter.report(Progress::TaskStart {
        total: job.total_steps,
    });

    let mut scanner = ThermoScanner::new();
    let mut reached: u64 = 0;
    let mut on_output = |line: &str| {
        if let Some(ThermoEvent::Row(row)) = scanner.feed(line) {
            let step = row.first().copied().unwrap_or(0.0).max(0.0) as u64;
            let step = step.min(job.total_steps);
            if step > reached {
                reporter.report(Progress::TaskIncrement {
                    amount: step - reached,
                });
                reporter.report(Progress::StatusUpdate {
                    text: row
                        .get(1)
                        .map(|t| format!("step {}, T = {:.0} K", step, t))
                        .unwrap_or_else(|| format!("step {}", step)),
                });
                reached = step;
            }
        }
    };
    let report = runner.run(job, &mut on_output)?;

    reporter.report(Progress::TaskFinish);
    Ok(report)
}

fn read_thermo(directory: &Path) -> Result<Option<ThermoTable>, EngineError> {
    let log_path = directory.join(LOG_FILE);
    if !log_path.is_file() {
        warn!("No thermo log at {:?}.", log_path);
        return Ok(None);
    }
    let table = match ThermoLog::read_from_path(&log_path) {
        Ok(log) => log.runs.into_iter().last(),
        Err(ThermoError::NoThermoOutput) => {
            warn!("Thermo log {:?} holds no thermo table.", log_path);
            None
        }
        Err(e) => {
            return Err(EngineError::ThermoLog {
                path: log_path,
                source: e,
            });
        }
    };

    if let Some(table) = &table {
        let csv_path = directory.join(THERMO_CSV_FILE);
        table
            .write_csv_to_path(&csv_path)
            .map_err(|e| EngineError::ThermoLog {
                path: csv_path,
                source: e,
            })?;
    }
    Ok(table)
}

fn estimate_melting_point(
    table: &ThermoTable,
    config: &WorkflowConfig,
) -> Option<MeltingPointEstimate> {
    let fraction = config.averaging_fraction;
    let temperature = table.trailing_mean("temp", fraction)?;
    let samples = ((table.len() as f64 * fraction).ceil() as usize).clamp(1, table.len());
    Some(MeltingPointEstimate {
        temperature,
        guess: config.melting_point_guess,
        deviation: temperature - config.melting_point_guess,
        samples,
        pressure: table.trailing_mean("press", fraction),
        volume: table.trailing_mean("volume", fraction),
    })
}

/// Writes `summary.toml` into the run directory and returns its path.
pub fn write_summary(
    result: &MeltingPointResult,
    config: &WorkflowConfig,
) -> Result<PathBuf, EngineError> {
    let summary = RunSummary {
        melting_point_guess: config.melting_point_guess,
        num_atoms: result.num_atoms,
        composition: &result.composition,
        estimate: result.estimate.as_ref(),
        stages: &result.stages,
    };
    let text = toml::to_string(&summary).map_err(|e| EngineError::Summary(e.to_string()))?;
    let path = config.output_dir.join(SUMMARY_FILE);
    fs::write(&path, text).map_err(|e| EngineError::io(&path, e))?;
    Ok(path)
}
