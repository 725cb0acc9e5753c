use super::lattice::Lattice;
use super::species::Species;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;

/// A single atom in a periodic structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Index into the owning structure's species table.
    pub species_index: usize,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
    /// Velocity in Angstroms per picosecond, when known.
    pub velocity: Option<Vector3<f64>>,
}

impl Site {
    pub fn new(species_index: usize, position: Point3<f64>) -> Self {
        Self {
            species_index,
            position,
            velocity: None,
        }
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

/// A periodic structure: a lattice, a species table, and an ordered list of sites.
///
/// Site order is meaningful. It becomes the atom id order in LAMMPS data files,
/// and the coexistence stages select the solid half of the system by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    lattice: Lattice,
    species: Vec<Species>,
    sites: Vec<Site>,
}

impl Structure {
    pub fn new(lattice: Lattice, species: Vec<Species>, sites: Vec<Site>) -> Self {
        debug_assert!(sites.iter().all(|s| s.species_index < species.len()));
        Self {
            lattice,
            species,
            sites,
        }
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn species_of(&self, site: &Site) -> &Species {
        &self.species[site.species_index]
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn has_velocities(&self) -> bool {
        !self.sites.is_empty() && self.sites.iter().all(|s| s.velocity.is_some())
    }

    /// Number of sites per species symbol, ordered by symbol.
    pub fn composition(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for site in &self.sites {
            *counts
                .entry(self.species[site.species_index].symbol.clone())
                .or_insert(0) += 1;
        }
        counts
    }

    /// Replicates the structure `na x nb x nc` times.
    ///
    /// Sites are emitted image by image (c fastest), each image holding the
    /// original sites in their original order. A multiplier of zero is treated as one.
    pub fn supercell(&self, multipliers: [usize; 3]) -> Self {
        let [na, nb, nc] = multipliers.map(|m| m.max(1));
        let mut sites = Vec::with_capacity(self.sites.len() * na * nb * nc);

        for i in 0..na {
            for j in 0..nb {
                for k in 0..nc {
                    let shift = self
                        .lattice
                        .to_cartesian(&Vector3::new(i as f64, j as f64, k as f64))
                        .coords;
                    sites.extend(self.sites.iter().map(|site| Site {
                        species_index: site.species_index,
                        position: site.position + shift,
                        velocity: site.velocity,
                    }));
                }
            }
        }

        Self {
            lattice: self.lattice.scaled([na, nb, nc]),
            species: self.species.clone(),
            sites,
        }
    }

    /// Returns a copy with sites stably sorted by a floating-point key.
    pub fn sorted_by_key<F>(&self, mut key: F) -> Self
    where
        F: FnMut(&Site) -> f64,
    {
        let mut keyed: Vec<(f64, &Site)> = self.sites.iter().map(|s| (key(s), s)).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            lattice: self.lattice.clone(),
            species: self.species.clone(),
            sites: keyed.into_iter().map(|(_, s)| s.clone()).collect(),
        }
    }

    /// Maps every site back into the unit cell (fractional coordinates in `[0, 1)`).
    pub fn wrap_into_cell(&mut self) {
        for site in &mut self.sites {
            let frac = self.lattice.to_fractional(&site.position);
            let wrapped = frac.map(wrap_unit);
            site.position = self.lattice.to_cartesian(&wrapped);
        }
    }
}

pub(crate) fn wrap_unit(x: f64) -> f64 {
    let w = x - x.floor();
    if w >= 1.0 { 0.0 } else { w }
}
