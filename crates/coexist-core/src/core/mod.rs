//! # Core Module
//!
//! Building blocks shared by every stage of the coexistence workflow.
//!
//! - **Structure Representation** ([`models`]) - Species, lattices, sites, and periodic structures
//! - **Crystal Construction** ([`crystal`]) - Centered conventional cells and Miller-plane ordering
//! - **Element Data** ([`elements`]) - Standard atomic masses by symbol
//! - **Interatomic Potentials** ([`potential`]) - Pair coefficients and LAMMPS style settings
//! - **File I/O** ([`io`]) - LAMMPS data files, input decks, and thermo logs

pub mod crystal;
pub mod elements;
pub mod io;
pub mod models;
pub mod potential;
