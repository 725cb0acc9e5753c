//! # coexist Core Library
//!
//! Drives a four-stage LAMMPS workflow that estimates the melting point of a
//! crystal by the solid-liquid coexistence method. All molecular dynamics runs
//! inside the external simulator; this crate prepares its inputs, launches it,
//! and reads its outputs back.
//!
//! ## Layers
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Lattice`,
//!   `Species`), crystal construction, interatomic potential settings, and the
//!   LAMMPS file formats (data files, input decks, thermo logs).
//!
//! - **[`engine`]: The Plumbing.** Workflow configuration, stage definitions,
//!   the simulator runner seam, progress reporting, and error types.
//!
//! - **[`workflows`]: The Public API.** The melting-point procedure itself,
//!   tying `engine` and `core` together from crystal to temperature estimate.

pub mod core;
pub mod engine;
pub mod workflows;
