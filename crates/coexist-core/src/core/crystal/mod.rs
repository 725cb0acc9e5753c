//! Crystal construction for the coexistence workflow.
//!
//! Only lattice centering is modeled: a conventional cell is produced by
//! replicating a fractional basis over the centering translations of a
//! Bravais lattice. This covers the cubic prototypes (rock salt, CsCl, fcc and
//! bcc metals) the coexistence method is usually applied to.

pub mod builder;
pub mod miller;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CrystalError {
    #[error("Crystal basis is empty")]
    EmptyBasis,
    #[error("Miller index (0, 0, 0) does not define a plane")]
    ZeroMillerIndex,
    #[error("Invalid lattice: {0}")]
    InvalidLattice(String),
}
