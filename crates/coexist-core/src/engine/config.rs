use crate::core::crystal::builder::{BasisSite, Centering};
use crate::core::models::lattice::Lattice;
use crate::core::models::species::Species;
use crate::core::potential::ForceField;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrystalConfig {
    pub lattice: Lattice,
    pub centering: Centering,
    pub basis: Vec<BasisSite>,
    /// Replication of the conventional cell that makes up one phase.
    pub supercell: [usize; 3],
    /// Further replication that holds both phases side by side.
    pub interface_multiplier: [usize; 3],
    /// Plane along which the system is split into solid and liquid halves.
    pub miller_index: [i32; 3],
}

impl CrystalConfig {
    pub fn total_multiplier(&self) -> [usize; 3] {
        [0, 1, 2].map(|i| self.supercell[i] * self.interface_multiplier[i])
    }

    /// Species in first-appearance order of the basis. This is the atom type order.
    pub fn species(&self) -> Vec<Species> {
        let mut species: Vec<Species> = Vec::new();
        for site in &self.basis {
            if !species.contains(&site.species) {
                species.push(site.species.clone());
            }
        }
        species
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSteps {
    pub heat: u64,
    pub melt: u64,
    pub cool: u64,
    pub equilibrate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermostatConfig {
    /// Thermostat damping time in simulator time units.
    pub temp_damp: f64,
    /// Barostat damping time in simulator time units.
    pub press_damp: f64,
    /// Target pressure for the barostatted stages.
    pub pressure: f64,
    /// Multiple of the melting-point guess used to melt the liquid half.
    pub melt_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub thermo_interval: u64,
    pub dump_interval: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// LAMMPS executable (e.g., `lmp_mpi`).
    pub command: String,
    /// MPI launcher (e.g., `mpirun`); `None` runs the executable directly.
    pub launcher: Option<String>,
    pub processors: usize,
    /// Extra arguments appended after `-i lammps.in`.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub output_dir: PathBuf,
    pub melting_point_guess: f64,
    pub crystal: CrystalConfig,
    pub force_field: ForceField,
    pub steps: StageSteps,
    pub thermostat: ThermostatConfig,
    pub output: OutputConfig,
    pub simulator: SimulatorConfig,
    pub seed: Option<u64>,
    pub resume: bool,
    /// Trailing fraction of the equilibration thermo rows averaged into the estimate.
    pub averaging_fraction: f64,
}

#[derive(Default)]
pub struct WorkflowConfigBuilder {
    output_dir: Option<PathBuf>,
    melting_point_guess: Option<f64>,
    lattice: Option<Lattice>,
    centering: Option<Centering>,
    basis: Option<Vec<BasisSite>>,
    supercell: Option<[usize; 3]>,
    interface_multiplier: Option<[usize; 3]>,
    miller_index: Option<[i32; 3]>,
    force_field: Option<ForceField>,
    steps: Option<StageSteps>,
    thermostat: Option<ThermostatConfig>,
    output: Option<OutputConfig>,
    simulator: Option<SimulatorConfig>,
    seed: Option<u64>,
    resume: bool,
    averaging_fraction: Option<f64>,
}

impl WorkflowConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }
    pub fn melting_point_guess(mut self, kelvin: f64) -> Self {
        self.melting_point_guess = Some(kelvin);
        self
    }
    pub fn lattice(mut self, lattice: Lattice) -> Self {
        self.lattice = Some(lattice);
        self
    }
    pub fn centering(mut self, centering: Centering) -> Self {
        self.centering = Some(centering);
        self
    }
    pub fn basis(mut self, basis: Vec<BasisSite>) -> Self {
        self.basis = Some(basis);
        self
    }
    pub fn supercell(mut self, multipliers: [usize; 3]) -> Self {
        self.supercell = Some(multipliers);
        self
    }
    pub fn interface_multiplier(mut self, multipliers: [usize; 3]) -> Self {
        self.interface_multiplier = Some(multipliers);
        self
    }
    pub fn miller_index(mut self, miller: [i32; 3]) -> Self {
        self.miller_index = Some(miller);
        self
    }
    pub fn force_field(mut self, force_field: ForceField) -> Self {
        self.force_field = Some(force_field);
        self
    }
    pub fn steps(mut self, steps: StageSteps) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn thermostat(mut self, thermostat: ThermostatConfig) -> Self {
        self.thermostat = Some(thermostat);
        self
    }
    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }
    pub fn simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.simulator = Some(simulator);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }
    pub fn averaging_fraction(mut self, fraction: f64) -> Self {
        self.averaging_fraction = Some(fraction);
        self
    }

    pub fn build(self) -> Result<WorkflowConfig, ConfigError> {
        let crystal = CrystalConfig {
            lattice: self.lattice.ok_or(ConfigError::MissingParameter("lattice"))?,
            centering: self.centering.unwrap_or_default(),
            basis: self.basis.ok_or(ConfigError::MissingParameter("basis"))?,
            supercell: self
                .supercell
                .ok_or(ConfigError::MissingParameter("supercell"))?,
            interface_multiplier: self.interface_multiplier.unwrap_or([2, 1, 1]),
            miller_index: self.miller_index.unwrap_or([1, 0, 0]),
        };

        let config = WorkflowConfig {
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            melting_point_guess: self
                .melting_point_guess
                .ok_or(ConfigError::MissingParameter("melting_point_guess"))?,
            crystal,
            force_field: self
                .force_field
                .ok_or(ConfigError::MissingParameter("force_field"))?,
            steps: self.steps.ok_or(ConfigError::MissingParameter("steps"))?,
            thermostat: self
                .thermostat
                .ok_or(ConfigError::MissingParameter("thermostat"))?,
            output: self.output.ok_or(ConfigError::MissingParameter("output"))?,
            simulator: self
                .simulator
                .ok_or(ConfigError::MissingParameter("simulator"))?,
            seed: self.seed,
            resume: self.resume,
            averaging_fraction: self.averaging_fraction.unwrap_or(0.5),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &WorkflowConfig) -> Result<(), ConfigError> {
    if !(config.melting_point_guess.is_finite() && config.melting_point_guess > 0.0) {
        return Err(invalid(
            "melting_point_guess",
            format!("must be a positive temperature, got {}", config.melting_point_guess),
        ));
    }

    let crystal = &config.crystal;
    if crystal.basis.is_empty() {
        return Err(invalid("basis", "at least one basis site is required"));
    }
    let volume = crystal.lattice.volume();
    if !(volume.is_finite() && volume > f64::EPSILON) {
        return Err(invalid("lattice", "lattice vectors must span a non-zero volume"));
    }
    if crystal.supercell.contains(&0) {
        return Err(invalid("supercell", "every multiplier must be at least 1"));
    }
    if crystal.interface_multiplier.contains(&0) {
        return Err(invalid(
            "interface_multiplier",
            "every multiplier must be at least 1",
        ));
    }
    if crystal.miller_index == [0, 0, 0] {
        return Err(invalid("miller_index", "(0, 0, 0) does not define a plane"));
    }

    config
        .force_field
        .validate(&crystal.species())
        .map_err(|e| invalid("force_field", e.to_string()))?;

    let s = &config.steps;
    if [s.heat, s.melt, s.cool, s.equilibrate].contains(&0) {
        return Err(invalid("steps", "every stage needs at least one step"));
    }

    let t = &config.thermostat;
    if !(t.temp_damp > 0.0 && t.temp_damp.is_finite())
        || !(t.press_damp > 0.0 && t.press_damp.is_finite())
    {
        return Err(invalid("thermostat", "damping times must be positive"));
    }
    if !t.pressure.is_finite() {
        return Err(invalid("pressure", "must be a finite pressure"));
    }
    if !(t.melt_factor > 1.0 && t.melt_factor.is_finite()) {
        return Err(invalid(
            "melt_factor",
            format!("must exceed 1 to melt the liquid half, got {}", t.melt_factor),
        ));
    }

    if config.output.thermo_interval == 0 || config.output.dump_interval == 0 {
        return Err(invalid("output", "output intervals must be positive"));
    }

    if config.simulator.command.trim().is_empty() {
        return Err(invalid("simulator.command", "must not be empty"));
    }
    if config.simulator.processors == 0 {
        return Err(invalid("simulator.processors", "must be at least 1"));
    }

    if !(config.averaging_fraction > 0.0 && config.averaging_fraction <= 1.0) {
        return Err(invalid("averaging_fraction", "must be in (0, 1]"));
    }
    Ok(())
}
