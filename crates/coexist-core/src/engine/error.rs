use super::config::ConfigError;
use crate::core::crystal::CrystalError;
use crate::core::io::lammps_data::LammpsDataError;
use crate::core::io::thermo::ThermoError;
use crate::core::potential::ForceFieldError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Crystal construction failed: {0}")]
    Crystal(#[from] CrystalError),

    #[error("Force field error: {0}")]
    ForceField(#[from] ForceFieldError),

    #[error("Data file '{path}': {source}", path = path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: LammpsDataError,
    },

    #[error("Thermo log '{path}': {source}", path = path.display())]
    ThermoLog {
        path: PathBuf,
        #[source]
        source: ThermoError,
    },

    #[error("I/O error at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to launch simulator '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Stage '{stage}' failed: simulator exited with {status}")]
    SimulatorFailed { stage: &'static str, status: String },

    #[error("Stage '{stage}' finished without writing '{path}'", path = path.display())]
    MissingOutput { stage: &'static str, path: PathBuf },

    #[error("Failed to write summary: {0}")]
    Summary(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
