//! # Workflows Module
//!
//! Top-level entry points for users of the library.
//!
//! - **Melting Point** ([`melting_point`]) - Solid-liquid coexistence in four LAMMPS stages,
//!   from the crystal definition to a temperature estimate.

pub mod melting_point;
