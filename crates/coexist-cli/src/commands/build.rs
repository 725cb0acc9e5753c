use crate::cli::{BuildArgs, RunArgs};
use crate::config::builder::build_config;
use crate::error::{CliError, Result};
use coexist::core::io::lammps_data::{DataOptions, LammpsData, LammpsDataError};
use coexist::core::io::traits::SimulatorFile;
use coexist::workflows::melting_point::build_initial_structure;
use tracing::info;

pub async fn run(args: BuildArgs) -> Result<()> {
    let config = build_config(&RunArgs {
        config: args.config,
        set_values: args.set_values,
        ..Default::default()
    })?;

    let structure = build_initial_structure(&config.crystal)?;
    info!(
        "Built {} atoms with composition {:?}",
        structure.len(),
        structure.composition()
    );

    let write = || -> std::result::Result<(), LammpsDataError> {
        let data = LammpsData::from_structure(&structure, DataOptions::default())?;
        data.write_to_path(&args.output)
    };
    write().map_err(|e| CliError::FileParsing {
        path: args.output.clone(),
        source: e.into(),
    })?;

    let lengths = structure.lattice().lengths();
    println!(
        "✓ Wrote {} atoms ({:.3} x {:.3} x {:.3} Å) to {}",
        structure.len(),
        lengths[0],
        lengths[1],
        lengths[2],
        args.output.display()
    );
    println!(
        "  Atoms 1..={} form the solid half along {:?}.",
        structure.len() / 2,
        config.crystal.miller_index
    );
    Ok(())
}
