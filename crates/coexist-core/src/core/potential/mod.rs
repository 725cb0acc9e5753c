//! Interatomic potential settings handed verbatim to LAMMPS.
//!
//! Coefficients are stored as opaque strings: their meaning depends on the
//! pair style and is interpreted only by the simulator.

use crate::core::models::species::Species;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForceFieldError {
    #[error("No pair coefficients defined for species pair ({0}, {1})")]
    MissingPair(String, String),
    #[error("Pair style must not be empty")]
    EmptyPairStyle,
}

/// `pair_style` and optional `kspace_style` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialSettings {
    pub pair_style: String,
    pub kspace_style: Option<String>,
}

/// Pair coefficients keyed by an unordered pair of species symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairCoefficients {
    table: HashMap<(String, String), String>,
}

impl PairCoefficients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: &str, b: &str, coefficients: impl Into<String>) {
        self.table.insert(ordered_key(a, b), coefficients.into());
    }

    pub fn with(mut self, a: &str, b: &str, coefficients: impl Into<String>) -> Self {
        self.insert(a, b, coefficients);
        self
    }

    pub fn get(&self, a: &str, b: &str) -> Option<&str> {
        self.table.get(&ordered_key(a, b)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn ordered_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// A complete potential definition for a set of species.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceField {
    pub pairs: PairCoefficients,
    pub settings: PotentialSettings,
}

impl ForceField {
    pub fn new(pairs: PairCoefficients, settings: PotentialSettings) -> Self {
        Self { pairs, settings }
    }

    /// Checks that every pair of the given species has coefficients.
    pub fn validate(&self, species: &[Species]) -> Result<(), ForceFieldError> {
        self.pair_coeff_lines(species).map(|_| ())
    }

    /// LAMMPS commands that define the potential.
    ///
    /// Atom types follow the order of `species`, starting at 1, and each
    /// `pair_coeff` line is emitted with `i <= j`.
    pub fn commands(&self, species: &[Species]) -> Result<Vec<String>, ForceFieldError> {
        if self.settings.pair_style.trim().is_empty() {
            return Err(ForceFieldError::EmptyPairStyle);
        }
        let mut lines = vec![format!("pair_style {}", self.settings.pair_style)];
        if let Some(kspace) = &self.settings.kspace_style {
            lines.push(format!("kspace_style {}", kspace));
        }
        lines.extend(self.pair_coeff_lines(species)?);
        Ok(lines)
    }

    fn pair_coeff_lines(&self, species: &[Species]) -> Result<Vec<String>, ForceFieldError> {
        let mut lines = Vec::new();
        for (i, a) in species.iter().enumerate() {
            for (j, b) in species.iter().enumerate().skip(i) {
                let coeffs = self.pairs.get(&a.symbol, &b.symbol).ok_or_else(|| {
                    ForceFieldError::MissingPair(a.symbol.clone(), b.symbol.clone())
                })?;
                lines.push(format!("pair_coeff {} {} {}", i + 1, j + 1, coeffs));
            }
        }
        Ok(lines)
    }
}
