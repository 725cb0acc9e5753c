//! # Engine Module
//!
//! The plumbing between the crystal models and the external simulator.
//!
//! - **Configuration** ([`config`]) - Workflow parameters and their validating builder
//! - **Stages** ([`stage`]) - The four coexistence stages and the LAMMPS commands each one issues
//! - **Simulator Runner** ([`runner`]) - The seam through which a prepared stage directory is executed
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events for front ends
//! - **Error Handling** ([`error`]) - Engine-level error types wrapping every lower layer

pub mod config;
pub mod error;
pub mod progress;
pub mod runner;
pub mod stage;
