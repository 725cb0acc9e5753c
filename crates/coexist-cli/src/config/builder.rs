use super::defaults::DefaultsConfig;
use super::file::{FileBasisSite, FileConfig, FileCrystalConfig, FilePotentialConfig};
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::{parse_key_value, parse_triple, parse_value};
use coexist::core::crystal::builder::{BasisSite, Centering};
use coexist::core::models::lattice::Lattice;
use coexist::core::models::species::Species;
use coexist::core::potential::{ForceField, PairCoefficients, PotentialSettings};
use coexist::engine::config::{
    self as core_config, OutputConfig, SimulatorConfig, StageSteps, ThermostatConfig,
    WorkflowConfig,
};
use std::path::PathBuf;
use tracing::debug;

pub fn build_config(args: &RunArgs) -> Result<WorkflowConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let output_dir = args
        .output_dir
        .clone()
        .or(file_config.output_dir.take())
        .unwrap_or(defaults.output_dir.clone());
    let melting_point_guess = args
        .melting_point_guess
        .or(file_config.melting_point_guess)
        .unwrap_or(defaults.melting_point_guess);
    let seed = args.seed.or(file_config.seed);
    let averaging_fraction = file_config
        .averaging_fraction
        .unwrap_or(defaults.averaging_fraction);

    let crystal = file_config.crystal.take().unwrap_or_default();
    let lattice = merge_lattice(&crystal, &defaults);
    let centering = merge_centering(crystal.centering.as_deref(), &defaults)?;
    let basis = merge_basis(crystal.basis.as_deref(), &defaults);
    let force_field = merge_force_field(file_config.potential.take().unwrap_or_default(), &defaults);

    let steps_file = file_config.steps.take().unwrap_or_default();
    let steps = StageSteps {
        heat: steps_file.heat.unwrap_or(defaults.heat_steps),
        melt: steps_file.melt.unwrap_or(defaults.melt_steps),
        cool: steps_file.cool.unwrap_or(defaults.cool_steps),
        equilibrate: steps_file.equilibrate.unwrap_or(defaults.equilibrate_steps),
    };

    let thermo_file = file_config.thermostat.take().unwrap_or_default();
    let thermostat = ThermostatConfig {
        temp_damp: thermo_file.temp_damp.unwrap_or(defaults.temp_damp),
        press_damp: thermo_file.press_damp.unwrap_or(defaults.press_damp),
        pressure: thermo_file.pressure.unwrap_or(defaults.pressure),
        melt_factor: thermo_file.melt_factor.unwrap_or(defaults.melt_factor),
    };

    let output_file = file_config.output.take().unwrap_or_default();
    let output = OutputConfig {
        thermo_interval: output_file
            .thermo_interval
            .unwrap_or(defaults.thermo_interval),
        dump_interval: output_file.dump_interval.unwrap_or(defaults.dump_interval),
    };

    let sim_file = file_config.simulator.take().unwrap_or_default();
    let launcher = if args.no_launcher {
        None
    } else {
        let name = args
            .launcher
            .clone()
            .or(sim_file.launcher)
            .unwrap_or_else(|| defaults.launcher.to_string());
        (!name.trim().is_empty()).then_some(name)
    };
    let simulator = SimulatorConfig {
        command: args
            .lammps_command
            .clone()
            .or(sim_file.command)
            .unwrap_or_else(|| defaults.lammps_command.to_string()),
        launcher,
        processors: args
            .processors
            .or(sim_file.processors)
            .unwrap_or(defaults.processors),
        extra_args: sim_file.extra_args.unwrap_or_default(),
    };

    let config = core_config::WorkflowConfigBuilder::new()
        .output_dir(output_dir)
        .melting_point_guess(melting_point_guess)
        .lattice(lattice)
        .centering(centering)
        .basis(basis)
        .supercell(crystal.supercell.unwrap_or(defaults.supercell))
        .interface_multiplier(
            crystal
                .interface_multiplier
                .unwrap_or(defaults.interface_multiplier),
        )
        .miller_index(crystal.miller_index.unwrap_or(defaults.miller_index))
        .force_field(force_field)
        .steps(steps)
        .thermostat(thermostat)
        .output(output)
        .simulator(simulator)
        .seed(seed)
        .resume(args.resume)
        .averaging_fraction(averaging_fraction)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    debug!("Final workflow configuration: {:?}", config);
    Ok(config)
}

fn merge_lattice(crystal: &FileCrystalConfig, defaults: &DefaultsConfig) -> Lattice {
    match &crystal.lattice {
        Some(p) => Lattice::from_parameters(p.a, p.b, p.c, p.alpha, p.beta, p.gamma),
        None => Lattice::cubic(
            crystal
                .lattice_constant
                .unwrap_or(defaults.lattice_constant),
        ),
    }
}

fn merge_centering(file_val: Option<&str>, defaults: &DefaultsConfig) -> Result<Centering> {
    file_val
        .unwrap_or(defaults.centering)
        .parse::<Centering>()
        .map_err(CliError::Config)
}

fn merge_basis(file_val: Option<&[FileBasisSite]>, defaults: &DefaultsConfig) -> Vec<BasisSite> {
    match file_val {
        Some(sites) => sites
            .iter()
            .map(|s| BasisSite::new(Species::new(s.element.clone(), s.charge), s.position))
            .collect(),
        None => defaults
            .basis
            .iter()
            .map(|s| BasisSite::new(Species::new(s.element, s.charge), s.position))
            .collect(),
    }
}

fn merge_force_field(file_val: FilePotentialConfig, defaults: &DefaultsConfig) -> ForceField {
    let mut pairs = PairCoefficients::new();
    match file_val.pairs {
        Some(file_pairs) => {
            for p in file_pairs {
                pairs.insert(&p.a, &p.b, p.coefficients);
            }
        }
        None => {
            for p in defaults.pairs {
                pairs.insert(p.a, p.b, p.coefficients);
            }
        }
    }
    let kspace_style = file_val
        .kspace_style
        .unwrap_or_else(|| defaults.kspace_style.to_string());
    ForceField::new(
        pairs,
        PotentialSettings {
            pair_style: file_val
                .pair_style
                .unwrap_or_else(|| defaults.pair_style.to_string()),
            kspace_style: (!kspace_style.trim().is_empty()).then_some(kspace_style),
        },
    )
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = parse_key_value(kv_pair)?;

        match key {
            "output-dir" => config.output_dir = Some(PathBuf::from(value)),
            "melting-point-guess" => {
                config.melting_point_guess = Some(parse_value(key, value, "float")?)
            }
            "seed" => config.seed = Some(parse_value(key, value, "integer")?),
            "averaging-fraction" => {
                config.averaging_fraction = Some(parse_value(key, value, "float")?)
            }
            "crystal.lattice-constant" => {
                let crystal = config.crystal.get_or_insert_with(Default::default);
                crystal.lattice_constant = Some(parse_value(key, value, "float")?);
                crystal.lattice = None;
            }
            "crystal.centering" => {
                config
                    .crystal
                    .get_or_insert_with(Default::default)
                    .centering = Some(value.to_string())
            }
            "crystal.supercell" => {
                config
                    .crystal
                    .get_or_insert_with(Default::default)
                    .supercell = Some(parse_triple(value)?)
            }
            "crystal.interface-multiplier" => {
                config
                    .crystal
                    .get_or_insert_with(Default::default)
                    .interface_multiplier = Some(parse_triple(value)?)
            }
            "crystal.miller-index" => {
                config
                    .crystal
                    .get_or_insert_with(Default::default)
                    .miller_index = Some(parse_triple(value)?)
            }
            "potential.pair-style" => {
                config
                    .potential
                    .get_or_insert_with(Default::default)
                    .pair_style = Some(value.to_string())
            }
            "potential.kspace-style" => {
                config
                    .potential
                    .get_or_insert_with(Default::default)
                    .kspace_style = Some(value.to_string())
            }
            "steps.heat" | "steps.melt" | "steps.cool" | "steps.equilibrate" => {
                let steps = config.steps.get_or_insert_with(Default::default);
                let parsed = Some(parse_value(key, value, "integer")?);
                match key {
                    "steps.heat" => steps.heat = parsed,
                    "steps.melt" => steps.melt = parsed,
                    "steps.cool" => steps.cool = parsed,
                    _ => steps.equilibrate = parsed,
                }
            }
            "thermostat.temp-damp" | "thermostat.press-damp" | "thermostat.pressure"
            | "thermostat.melt-factor" => {
                let thermostat = config.thermostat.get_or_insert_with(Default::default);
                let parsed = Some(parse_value(key, value, "float")?);
                match key {
                    "thermostat.temp-damp" => thermostat.temp_damp = parsed,
                    "thermostat.press-damp" => thermostat.press_damp = parsed,
                    "thermostat.pressure" => thermostat.pressure = parsed,
                    _ => thermostat.melt_factor = parsed,
                }
            }
            "output.thermo-interval" => {
                config
                    .output
                    .get_or_insert_with(Default::default)
                    .thermo_interval = Some(parse_value(key, value, "integer")?)
            }
            "output.dump-interval" => {
                config
                    .output
                    .get_or_insert_with(Default::default)
                    .dump_interval = Some(parse_value(key, value, "integer")?)
            }
            "simulator.command" => {
                config
                    .simulator
                    .get_or_insert_with(Default::default)
                    .command = Some(value.to_string())
            }
            "simulator.launcher" => {
                config
                    .simulator
                    .get_or_insert_with(Default::default)
                    .launcher = Some(value.to_string())
            }
            "simulator.processors" => {
                config
                    .simulator
                    .get_or_insert_with(Default::default)
                    .processors = Some(parse_value(key, value, "integer")?)
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &std::path::Path, content: &str) -> PathBuf {
        let path = dir.join("coexist.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_describe_the_mgo_run() {
        let cfg = build_config(&RunArgs::default()).expect("build ok");

        assert_eq!(cfg.melting_point_guess, 3010.0);
        assert_eq!(cfg.crystal.total_multiplier(), [10, 5, 5]);
        assert_eq!(cfg.crystal.miller_index, [1, 0, 0]);
        assert!((cfg.crystal.lattice.lengths()[0] - 4.1990858).abs() < 1e-12);
        assert_eq!(cfg.crystal.species().len(), 2);
        assert_eq!(
            cfg.steps,
            StageSteps {
                heat: 20000,
                melt: 20000,
                cool: 20000,
                equilibrate: 30000
            }
        );
        assert_eq!(cfg.simulator.launcher.as_deref(), Some("mpirun"));
        assert_eq!(cfg.simulator.command, "lmp_mpi");
        assert_eq!(cfg.simulator.processors, 4);
        assert_eq!(cfg.force_field.pairs.len(), 3);
        assert_eq!(
            cfg.force_field.settings.kspace_style.as_deref(),
            Some("pppm 1.0e-5")
        );
        assert_eq!(cfg.seed, None);
        assert!(!cfg.resume);
    }

    #[test]
    fn file_values_replace_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            melting-point-guess = 1100.0
            output-dir = "nacl-run"

            [crystal]
            lattice-constant = 5.64
            supercell = [3, 3, 3]

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
            kspace-style = ""
            pairs = [
                { a = "Na", b = "Na", coefficients = "0.2637 0.317 2.340 1.048553 -0.99" },
                { a = "Na", b = "Cl", coefficients = "0.2110 0.317 2.755 6.99055 -8.6757" },
                { a = "Cl", b = "Cl", coefficients = "0.1582 0.327 3.170 72.40215 -145.427" },
            ]

            [simulator]
            launcher = ""
            processors = 16
            "#,
        );
        let args = RunArgs {
            config: Some(path),
            ..Default::default()
        };

        let cfg = build_config(&args).expect("build ok");

        assert_eq!(cfg.melting_point_guess, 1100.0);
        assert_eq!(cfg.output_dir, PathBuf::from("nacl-run"));
        assert_eq!(cfg.crystal.total_multiplier(), [6, 3, 3]);
        assert_eq!(cfg.crystal.species()[1].symbol, "Cl");
        assert_eq!(cfg.force_field.settings.pair_style, "born/coul/long 9.0");
        assert_eq!(cfg.force_field.settings.kspace_style, None);
        assert_eq!(cfg.simulator.launcher, None);
        assert_eq!(cfg.simulator.processors, 16);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            melting-point-guess = 2800.0
            seed = 1
            [simulator]
            processors = 2
            launcher = "srun"
            "#,
        );
        let args = RunArgs {
            config: Some(path),
            melting_point_guess: Some(3150.0),
            processors: Some(32),
            no_launcher: true,
            seed: Some(77),
            resume: true,
            lammps_command: Some("lmp".to_string()),
            ..Default::default()
        };

        let cfg = build_config(&args).expect("build ok");

        assert_eq!(cfg.melting_point_guess, 3150.0);
        assert_eq!(cfg.simulator.processors, 32);
        assert_eq!(cfg.simulator.launcher, None);
        assert_eq!(cfg.simulator.command, "lmp");
        assert_eq!(cfg.seed, Some(77));
        assert!(cfg.resume);
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[steps]\nheat = 7\n");
        let args = RunArgs {
            config: Some(path),
            set_values: vec![
                "steps.heat=1000".to_string(),
                "steps.equilibrate=5000".to_string(),
                "thermostat.melt-factor=1.5".to_string(),
                "crystal.supercell=4,4,4".to_string(),
                "crystal.miller-index=[1,1,1]".to_string(),
                "simulator.launcher=srun".to_string(),
                "output.dump-interval=500".to_string(),
            ],
            ..Default::default()
        };

        let cfg = build_config(&args).expect("build ok");

        assert_eq!(cfg.steps.heat, 1000);
        assert_eq!(cfg.steps.melt, 20000);
        assert_eq!(cfg.steps.equilibrate, 5000);
        assert!((cfg.thermostat.melt_factor - 1.5).abs() < 1e-12);
        assert_eq!(cfg.crystal.supercell, [4, 4, 4]);
        assert_eq!(cfg.crystal.miller_index, [1, 1, 1]);
        assert_eq!(cfg.simulator.launcher.as_deref(), Some("srun"));
        assert_eq!(cfg.output.dump_interval, 500);
    }

    #[test]
    fn unknown_set_key_is_rejected() {
        let args = RunArgs {
            set_values: vec!["steps.freeze=10".to_string()],
            ..Default::default()
        };
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn malformed_set_value_is_an_argument_error() {
        let args = RunArgs {
            set_values: vec!["steps.heat=lots".to_string()],
            ..Default::default()
        };
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn processor_count_is_validated() {
        let args = RunArgs {
            set_values: vec!["simulator.processors=0".to_string()],
            ..Default::default()
        };
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("simulator.processors"));
    }
}
