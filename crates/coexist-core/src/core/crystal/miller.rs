use super::CrystalError;
use crate::core::models::lattice::Lattice;
use crate::core::models::structure::Structure;
use nalgebra::{Point3, Vector3};

/// Normal of the (hkl) lattice plane in Cartesian coordinates.
pub fn plane_normal(lattice: &Lattice, miller: [i32; 3]) -> Result<Vector3<f64>, CrystalError> {
    if miller == [0, 0, 0] {
        return Err(CrystalError::ZeroMillerIndex);
    }
    let hkl = Vector3::new(miller[0] as f64, miller[1] as f64, miller[2] as f64);
    Ok(lattice.reciprocal().transpose() * hkl)
}

/// Signed distance from the (hkl) plane through the origin.
pub fn distance_from_miller_plane(
    lattice: &Lattice,
    miller: [i32; 3],
    position: &Point3<f64>,
) -> Result<f64, CrystalError> {
    let normal = plane_normal(lattice, miller)?;
    Ok(position.coords.dot(&normal) / normal.norm())
}

/// Stable sort of the sites by their distance along the (hkl) normal.
///
/// After sorting, the lower half of the ids lies on one side of a plane
/// parallel to (hkl), which is how the coexistence stages split the solid
/// half from the liquid half.
pub fn sort_along_miller(structure: &Structure, miller: [i32; 3]) -> Result<Structure, CrystalError> {
    let normal = plane_normal(structure.lattice(), miller)?;
    let unit = normal / normal.norm();
    Ok(structure.sorted_by_key(|site| site.position.coords.dot(&unit)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crystal::builder::{BasisSite, Centering, build_conventional_cell};
    use crate::core::models::species::Species;

    fn rock_salt_slab() -> Structure {
        let basis = vec![
            BasisSite::new(Species::new("Mg", 1.4), [0.0, 0.0, 0.0]),
            BasisSite::new(Species::new("O", -1.4), [0.5, 0.5, 0.5]),
        ];
        build_conventional_cell(&Lattice::cubic(4.0), Centering::FaceCentered, &basis)
            .unwrap()
            .supercell([4, 2, 2])
    }

    #[test]
    fn distance_along_100_is_the_x_coordinate_for_cubic_cells() {
        let lattice = Lattice::cubic(4.0);
        let d = distance_from_miller_plane(&lattice, [1, 0, 0], &Point3::new(3.0, 1.0, 2.0))
            .unwrap();
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn sorting_along_100_splits_the_slab_into_halves() {
        let slab = rock_salt_slab();
        let length = slab.lattice().lengths()[0];
        let sorted = sort_along_miller(&slab, [1, 0, 0]).unwrap();
        let half = sorted.len() / 2;

        let max_lower = sorted.sites()[..half]
            .iter()
            .map(|s| s.position.x)
            .fold(f64::MIN, f64::max);
        let min_upper = sorted.sites()[half..]
            .iter()
            .map(|s| s.position.x)
            .fold(f64::MAX, f64::min);
        assert!(max_lower < length / 2.0);
        assert!(min_upper >= length / 2.0);
    }

    #[test]
    fn sorting_keeps_every_site() {
        let slab = rock_salt_slab();
        let sorted = sort_along_miller(&slab, [1, 1, 0]).unwrap();
        assert_eq!(sorted.len(), slab.len());
        assert_eq!(sorted.composition(), slab.composition());
    }

    #[test]
    fn zero_miller_index_is_rejected() {
        let slab = rock_salt_slab();
        assert_eq!(
            sort_along_miller(&slab, [0, 0, 0]),
            Err(CrystalError::ZeroMillerIndex)
        );
    }
}
