use std::path::PathBuf;

pub struct DefaultBasisSite {
    pub element: &'static str,
    pub charge: f64,
    pub position: [f64; 3],
}

pub struct DefaultPair {
    pub a: &'static str,
    pub b: &'static str,
    pub coefficients: &'static str,
}

/// Built-in MgO rock-salt run with a Buckingham plus long-range Coulomb potential.
pub struct DefaultsConfig {
    pub output_dir: PathBuf,
    pub melting_point_guess: f64,
    pub lattice_constant: f64,
    pub centering: &'static str,
    pub basis: &'static [DefaultBasisSite],
    pub supercell: [usize; 3],
    pub interface_multiplier: [usize; 3],
    pub miller_index: [i32; 3],
    pub pair_style: &'static str,
    pub kspace_style: &'static str,
    pub pairs: &'static [DefaultPair],
    pub heat_steps: u64,
    pub melt_steps: u64,
    pub cool_steps: u64,
    pub equilibrate_steps: u64,
    pub temp_damp: f64,
    pub press_damp: f64,
    pub pressure: f64,
    pub melt_factor: f64,
    pub thermo_interval: u64,
    pub dump_interval: u64,
    pub lammps_command: &'static str,
    pub launcher: &'static str,
    pub processors: usize,
    pub averaging_fraction: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("coexist-run"),
            melting_point_guess: 3010.0,
            lattice_constant: 4.1990858,
            centering: "face-centered",
            basis: &[
                DefaultBasisSite {
                    element: "Mg",
                    charge: 1.4,
                    position: [0.0, 0.0, 0.0],
                },
                DefaultBasisSite {
                    element: "O",
                    charge: -1.4,
                    position: [0.5, 0.5, 0.5],
                },
            ],
            supercell: [5, 5, 5],
            interface_multiplier: [2, 1, 1],
            miller_index: [1, 0, 0],
            pair_style: "buck/coul/long 10.0",
            kspace_style: "pppm 1.0e-5",
            pairs: &[
                DefaultPair {
                    a: "Mg",
                    b: "Mg",
                    coefficients: "1309362.2766468062  0.104    0.0",
                },
                DefaultPair {
                    a: "Mg",
                    b: "O",
                    coefficients: "9892.357            0.20199  0.0",
                },
                DefaultPair {
                    a: "O",
                    b: "O",
                    coefficients: "2145.7345           0.3      30.2222",
                },
            ],
            heat_steps: 20000,
            melt_steps: 20000,
            cool_steps: 20000,
            equilibrate_steps: 30000,
            temp_damp: 100.0,
            press_damp: 1000.0,
            pressure: 0.0,
            melt_factor: 2.0,
            thermo_interval: 100,
            dump_interval: 10000,
            lammps_command: "lmp_mpi",
            launcher: "mpirun",
            processors: 4,
            averaging_fraction: 0.5,
        }
    }
}
