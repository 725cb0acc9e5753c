//! Data models for periodic atomic structures.

pub mod lattice;
pub mod species;
pub mod structure;
