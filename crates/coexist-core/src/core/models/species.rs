use std::fmt;
use std::hash::{Hash, Hasher};

/// An element carrying a formal oxidation state.
///
/// The oxidation state doubles as the fixed point charge written to the
/// `Atoms` section of a LAMMPS data file, so two species with the same symbol
/// but different charges are distinct atom types.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    /// The element symbol (e.g., "Mg", "O").
    pub symbol: String,
    /// The formal charge in elementary charge units.
    pub oxidation_state: f64,
}

impl Species {
    pub fn new(symbol: impl Into<String>, oxidation_state: f64) -> Self {
        Self {
            symbol: symbol.into(),
            oxidation_state,
        }
    }

    pub fn neutral(symbol: impl Into<String>) -> Self {
        Self::new(symbol, 0.0)
    }
}

impl Eq for Species {}

impl Hash for Species {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.oxidation_state.to_bits().hash(state);
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.oxidation_state == 0.0 {
            return write!(f, "{}", self.symbol);
        }
        let sign = if self.oxidation_state > 0.0 { '+' } else { '-' };
        write!(f, "{}{}{}", self.symbol, self.oxidation_state.abs(), sign)
    }
}
