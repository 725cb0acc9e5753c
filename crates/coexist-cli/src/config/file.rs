use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLatticeParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileBasisSite {
    pub element: String,
    #[serde(default)]
    pub charge: f64,
    pub position: [f64; 3],
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCrystalConfig {
    /// Cubic lattice constant; ignored when `lattice` is given.
    pub lattice_constant: Option<f64>,
    pub lattice: Option<FileLatticeParameters>,
    pub centering: Option<String>,
    pub basis: Option<Vec<FileBasisSite>>,
    pub supercell: Option<[usize; 3]>,
    pub interface_multiplier: Option<[usize; 3]>,
    pub miller_index: Option<[i32; 3]>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePairCoefficients {
    pub a: String,
    pub b: String,
    pub coefficients: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePotentialConfig {
    pub pair_style: Option<String>,
    /// An empty string disables `kspace_style`.
    pub kspace_style: Option<String>,
    pub pairs: Option<Vec<FilePairCoefficients>>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileStepsConfig {
    pub heat: Option<u64>,
    pub melt: Option<u64>,
    pub cool: Option<u64>,
    pub equilibrate: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileThermostatConfig {
    pub temp_damp: Option<f64>,
    pub press_damp: Option<f64>,
    pub pressure: Option<f64>,
    pub melt_factor: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOutputConfig {
    pub thermo_interval: Option<u64>,
    pub dump_interval: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulatorConfig {
    pub command: Option<String>,
    /// An empty string runs LAMMPS without a launcher.
    pub launcher: Option<String>,
    pub processors: Option<usize>,
    pub extra_args: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub melting_point_guess: Option<f64>,
    pub seed: Option<u64>,
    pub averaging_fraction: Option<f64>,
    pub crystal: Option<FileCrystalConfig>,
    pub potential: Option<FilePotentialConfig>,
    pub steps: Option<FileStepsConfig>,
    pub thermostat: Option<FileThermostatConfig>,
    pub output: Option<FileOutputConfig>,
    pub simulator: Option<FileSimulatorConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_file() {
        let text = r#"
            output-dir = "nacl"
            melting-point-guess = 1100.0
            seed = 9

            [crystal]
            lattice-constant = 5.64
            centering = "face-centered"
            supercell = [4, 4, 4]
            miller-index = [1, 1, 0]

            [[crystal.basis]]
            element = "Na"
            charge = 1.0
            position = [0.0, 0.0, 0.0]

            [[crystal.basis]]
            element = "Cl"
            charge = -1.0
            position = [0.5, 0.5, 0.5]

            [potential]
            pair-style = "born/coul/long 9.0"
            pairs = [
                { a = "Na", b = "Cl", coefficients = "0.2637 0.317 2.340 1.048553 -1.3" },
            ]

            [steps]
            equilibrate = 50000

            [simulator]
            launcher = ""
            extra-args = ["-sf", "omp"]
        "#;
        let config: FileConfig = toml::from_str(text).unwrap();

        assert_eq!(config.output_dir, Some(PathBuf::from("nacl")));
        let crystal = config.crystal.unwrap();
        assert_eq!(crystal.lattice_constant, Some(5.64));
        assert_eq!(crystal.basis.unwrap().len(), 2);
        assert_eq!(crystal.miller_index, Some([1, 1, 0]));
        assert_eq!(config.potential.unwrap().pairs.unwrap()[0].b, "Cl");
        assert_eq!(config.steps.unwrap().equilibrate, Some(50000));
        let simulator = config.simulator.unwrap();
        assert_eq!(simulator.launcher.as_deref(), Some(""));
        assert_eq!(simulator.extra_args.unwrap(), vec!["-sf", "omp"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<FileConfig, _> = toml::from_str("[steps]\nmelting = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "melting-point-guess = \"hot\"\n").unwrap();

        let result = FileConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { path: p, .. }) if p == path));
    }
}
