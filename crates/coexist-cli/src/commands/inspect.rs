use crate::cli::{InspectArgs, InspectCommands};
use crate::error::{CliError, Result};
use coexist::core::elements::symbol_for_mass;
use coexist::core::io::lammps_data::LammpsData;
use coexist::core::io::thermo::{ThermoLog, ThermoTable};
use coexist::core::io::traits::SimulatorFile;
use std::path::{Path, PathBuf};
use tracing::info;

const MASS_TOLERANCE: f64 = 0.05;

pub async fn run(args: InspectArgs) -> Result<()> {
    match args.command {
        InspectCommands::Data { path } => {
            let data = read_data(&path)?;
            print!("{}", describe_data(&data));
        }
        InspectCommands::Thermo { path, csv } => {
            let log = ThermoLog::read_from_path(&path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            for (i, table) in log.runs.iter().enumerate() {
                print!("{}", describe_thermo(i + 1, table));
            }
            if let Some(csv_path) = csv {
                export_csv(&log, csv_path)?;
            }
        }
    }
    Ok(())
}

fn read_data(path: &Path) -> Result<LammpsData> {
    info!("Reading data file {:?}", path);
    LammpsData::read_from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn export_csv(log: &ThermoLog, path: PathBuf) -> Result<()> {
    let Some(table) = log.last_run() else {
        return Ok(());
    };
    table
        .write_csv_to_path(&path)
        .map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
    println!("✓ Wrote {} thermo rows to {}", table.len(), path.display());
    Ok(())
}

fn describe_data(data: &LammpsData) -> String {
    let mut out = String::new();
    out.push_str(&format!("Title:      {}\n", data.title));
    out.push_str(&format!("Atoms:      {}\n", data.num_atoms()));
    out.push_str(&format!("Atom types: {}\n", data.num_atom_types()));

    let mut counts = vec![0usize; data.num_atom_types()];
    for atom in &data.atoms {
        if let Some(count) = counts.get_mut(atom.atom_type.wrapping_sub(1)) {
            *count += 1;
        }
    }
    for (i, mass) in data.masses.iter().enumerate() {
        let element = symbol_for_mass(*mass, MASS_TOLERANCE).unwrap_or("?");
        out.push_str(&format!(
            "  type {:<3} {:<3} mass {:>10.4}  x {}\n",
            i + 1,
            element,
            mass,
            counts.get(i).copied().unwrap_or(0)
        ));
    }

    let lattice = data.simulation_box.lattice();
    let [a, b, c] = lattice.lengths();
    out.push_str(&format!("Box:        {:.4} x {:.4} x {:.4} Å\n", a, b, c));
    if let Some([xy, xz, yz]) = data.simulation_box.tilt {
        out.push_str(&format!("Tilt:       xy {:.4} xz {:.4} yz {:.4}\n", xy, xz, yz));
    }
    out.push_str(&format!("Volume:     {:.4} Å^3\n", lattice.volume()));

    let total_charge: f64 = data.atoms.iter().map(|a| a.charge).sum();
    out.push_str(&format!("Net charge: {:.6}\n", total_charge));
    out.push_str(&format!(
        "Velocities: {}\n",
        if data.velocities.is_some() { "yes" } else { "no" }
    ));
    out
}

fn describe_thermo(index: usize, table: &ThermoTable) -> String {
    let mut out = format!(
        "Run {}: {} rows, columns {}\n",
        index,
        table.len(),
        table.columns.join(" ")
    );
    if let (Some(first), Some(last)) = (table.rows.first(), table.rows.last()) {
        out.push_str(&format!("  steps {} .. {}\n", first[0], last[0]));
    }
    for column in table.columns.iter().skip(1) {
        if let (Some(last), Some(mean)) = (
            table.last(column),
            table.trailing_mean(column, 0.5),
        ) {
            out.push_str(&format!(
                "  {:<10} last {:>14.4}  mean(last half) {:>14.4}\n",
                column, last, mean
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DATA: &str = "\
MgO test cell

2 atoms
2 atom types

0.0 4.2 xlo xhi
0.0 4.2 ylo yhi
0.0 4.2 zlo zhi

Masses

1 24.305
2 15.9994

Atoms # full

1 1 1 1.4 0.0 0.0 0.0
2 1 2 -1.4 2.1 2.1 2.1
";

    const LOG: &str = "\
   Step Temp Press
      0 3100 10.0
    100 3000 20.0
    200 2990 30.0
Loop time of 1.0 on 4 procs for 200 steps with 2 atoms
";

    #[test]
    fn data_summary_names_elements_from_masses() {
        let data = LammpsData::read_from(&mut Cursor::new(DATA)).unwrap();
        let text = describe_data(&data);

        assert!(text.contains("Atoms:      2\n"));
        assert!(text.contains("type 1   Mg "));
        assert!(text.contains("type 2   O  "));
        assert!(text.contains("Box:        4.2000 x 4.2000 x 4.2000"));
        assert!(text.contains("Net charge: 0.000000"));
        assert!(text.contains("Velocities: no"));
    }

    #[test]
    fn thermo_summary_reports_last_and_tail_mean() {
        let log = ThermoLog::parse(&mut Cursor::new(LOG)).unwrap();
        let text = describe_thermo(1, &log.runs[0]);

        assert!(text.starts_with("Run 1: 3 rows, columns Step Temp Press\n"));
        assert!(text.contains("steps 0 .. 200"));
        assert!(text.contains("last      2990.0000"));
        assert!(text.contains("mean(last half)      2995.0000"));
    }

    #[tokio::test]
    async fn thermo_csv_export_writes_the_last_run() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("log.lammps");
        let csv_path = dir.path().join("thermo.csv");
        std::fs::write(&log_path, LOG).unwrap();

        run(InspectArgs {
            command: InspectCommands::Thermo {
                path: log_path,
                csv: Some(csv_path.clone()),
            },
        })
        .await
        .unwrap();

        let csv = std::fs::read_to_string(csv_path).unwrap();
        assert!(csv.starts_with("Step,Temp,Press\n0,3100,10\n"));
    }

    #[tokio::test]
    async fn missing_data_file_is_a_parse_error() {
        let result = run(InspectArgs {
            command: InspectCommands::Data {
                path: PathBuf::from("/nonexistent/coexist.data"),
            },
        })
        .await;
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
