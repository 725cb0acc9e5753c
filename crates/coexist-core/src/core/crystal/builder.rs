use super::CrystalError;
use crate::core::models::lattice::Lattice;
use crate::core::models::species::Species;
use crate::core::models::structure::{Site, Structure, wrap_unit};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

const DUPLICATE_TOLERANCE: f64 = 1e-6;

/// Bravais lattice centering of a conventional cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Centering {
    Primitive,
    BodyCentered,
    #[default]
    FaceCentered,
}

impl Centering {
    pub fn translations(&self) -> &'static [[f64; 3]] {
        match self {
            Centering::Primitive => &[[0.0, 0.0, 0.0]],
            Centering::BodyCentered => &[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
            Centering::FaceCentered => &[
                [0.0, 0.0, 0.0],
                [0.0, 0.5, 0.5],
                [0.5, 0.0, 0.5],
                [0.5, 0.5, 0.0],
            ],
        }
    }
}

impl FromStr for Centering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p" | "primitive" => Ok(Centering::Primitive),
            "i" | "body" | "body-centered" => Ok(Centering::BodyCentered),
            "f" | "face" | "face-centered" => Ok(Centering::FaceCentered),
            other => Err(format!(
                "Unknown centering '{}'. Expected 'primitive', 'body-centered' or 'face-centered'.",
                other
            )),
        }
    }
}

/// One species at a fractional position of the conventional cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisSite {
    pub species: Species,
    pub position: [f64; 3],
}

impl BasisSite {
    pub fn new(species: Species, position: [f64; 3]) -> Self {
        Self { species, position }
    }
}

/// Expands a basis over the centering translations into a conventional cell.
///
/// Sites are ordered by basis entry, then by translation. Positions that map
/// onto an already placed site are dropped, so a basis may list
/// symmetry-equivalent positions without doubling atoms.
pub fn build_conventional_cell(
    lattice: &Lattice,
    centering: Centering,
    basis: &[BasisSite],
) -> Result<Structure, CrystalError> {
    if basis.is_empty() {
        return Err(CrystalError::EmptyBasis);
    }
    let volume = lattice.volume();
    if !(volume.is_finite() && volume > f64::EPSILON) {
        return Err(CrystalError::InvalidLattice(
            "lattice vectors are linearly dependent".to_string(),
        ));
    }

    let mut species: Vec<Species> = Vec::new();
    let mut placed: Vec<(usize, Vector3<f64>)> = Vec::new();

    for entry in basis {
        let species_index = match species.iter().position(|s| *s == entry.species) {
            Some(idx) => idx,
            None => {
                species.push(entry.species.clone());
                species.len() - 1
            }
        };

        for t in centering.translations() {
            let frac = Vector3::new(
                wrap_unit(entry.position[0] + t[0]),
                wrap_unit(entry.position[1] + t[1]),
                wrap_unit(entry.position[2] + t[2]),
            );
            if placed.iter().any(|(_, p)| periodic_distance(p, &frac) < DUPLICATE_TOLERANCE) {
                continue;
            }
            placed.push((species_index, frac));
        }
    }

    debug!(
        "Built {:?} conventional cell with {} sites from {} basis entries.",
        centering,
        placed.len(),
        basis.len()
    );

    let sites = placed
        .into_iter()
        .map(|(idx, frac)| Site::new(idx, lattice.to_cartesian(&frac)))
        .collect();
    Ok(Structure::new(lattice.clone(), species, sites))
}

fn periodic_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).map(|d| d - d.round()).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rock_salt_basis() -> Vec<BasisSite> {
        vec![
            BasisSite::new(Species::new("Mg", 1.4), [0.0, 0.0, 0.0]),
            BasisSite::new(Species::new("O", -1.4), [0.5, 0.5, 0.5]),
        ]
    }

    #[test]
    fn face_centered_rock_salt_has_eight_atoms() {
        let cell = build_conventional_cell(
            &Lattice::cubic(4.2),
            Centering::FaceCentered,
            &rock_salt_basis(),
        )
        .unwrap();
        assert_eq!(cell.len(), 8);
        assert_eq!(cell.species().len(), 2);
        assert_eq!(cell.composition()["Mg"], 4);
        assert_eq!(cell.composition()["O"], 4);
    }

    #[test]
    fn oxygen_sublattice_is_wrapped_into_the_cell() {
        let cell = build_conventional_cell(
            &Lattice::cubic(4.0),
            Centering::FaceCentered,
            &rock_salt_basis(),
        )
        .unwrap();
        for site in cell.sites() {
            for x in site.position.iter() {
                assert!((0.0..4.0).contains(x));
            }
        }
        let o_positions: Vec<_> = cell
            .sites()
            .iter()
            .filter(|s| s.species_index == 1)
            .map(|s| s.position)
            .collect();
        assert!(o_positions.contains(&nalgebra::Point3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn equivalent_basis_positions_are_not_duplicated() {
        let basis = vec![
            BasisSite::new(Species::neutral("Cu"), [0.0, 0.0, 0.0]),
            BasisSite::new(Species::neutral("Cu"), [0.5, 0.5, 0.0]),
        ];
        let cell =
            build_conventional_cell(&Lattice::cubic(3.6), Centering::FaceCentered, &basis).unwrap();
        assert_eq!(cell.len(), 4);
        assert_eq!(cell.species().len(), 1);
    }

    #[test]
    fn empty_basis_is_rejected() {
        let result = build_conventional_cell(&Lattice::cubic(1.0), Centering::Primitive, &[]);
        assert_eq!(result, Err(CrystalError::EmptyBasis));
    }

    #[test]
    fn degenerate_lattice_is_rejected() {
        let basis = [BasisSite::new(Species::new("Mg", 1.4), [0.0, 0.0, 0.0])];
        let lattice = Lattice::from_parameters(4.0, 4.0, 4.0, 90.0, 90.0, 0.0);
        let result = build_conventional_cell(&lattice, Centering::Primitive, &basis);
        assert!(matches!(result, Err(CrystalError::InvalidLattice(_))));
    }

    #[test]
    fn centering_parses_common_spellings() {
        assert_eq!("F".parse(), Ok(Centering::FaceCentered));
        assert_eq!("body-centered".parse(), Ok(Centering::BodyCentered));
        assert!("hexagonal".parse::<Centering>().is_err());
    }
}
