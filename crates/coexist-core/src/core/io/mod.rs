//! Reading and writing the files exchanged with LAMMPS.
//!
//! Each stage directory holds an `initial.data` data file and a `lammps.in`
//! input deck written here, and receives a `final.data` data file and a
//! `log.lammps` thermo log from the simulator.

pub mod input_deck;
pub mod lammps_data;
pub mod thermo;
pub mod traits;
