use nalgebra::{Matrix3, Point3, Vector3};

const ANGLE_TOLERANCE_DEG: f64 = 1e-10;

/// A periodic lattice stored as a matrix whose rows are the lattice vectors in Angstroms.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    matrix: Matrix3<f64>,
}

impl Lattice {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn from_vectors(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self::new(Matrix3::from_rows(&[
            a.transpose(),
            b.transpose(),
            c.transpose(),
        ]))
    }

    pub fn cubic(a: f64) -> Self {
        Self::new(Matrix3::from_diagonal_element(a))
    }

    /// Builds a lattice from lengths and angles (degrees).
    ///
    /// The result is in the restricted triclinic orientation LAMMPS expects:
    /// `a` along x, `b` in the xy plane, `c` with positive z.
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let (cos_a, cos_b, cos_g) = (cos_deg(alpha), cos_deg(beta), cos_deg(gamma));
        let sin_g = sin_deg(gamma);

        let cy = (cos_a - cos_b * cos_g) / sin_g;
        let cz = (1.0 - cos_b * cos_b - cy * cy).max(0.0).sqrt();

        Self::from_vectors(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(b * cos_g, b * sin_g, 0.0),
            Vector3::new(c * cos_b, c * cy, c * cz),
        )
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn vector(&self, axis: usize) -> Vector3<f64> {
        self.matrix.row(axis).transpose()
    }

    pub fn lengths(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.vector(i).norm())
    }

    /// Angles (alpha, beta, gamma) in degrees.
    pub fn angles(&self) -> [f64; 3] {
        let angle = |u: Vector3<f64>, v: Vector3<f64>| u.angle(&v).to_degrees();
        [
            angle(self.vector(1), self.vector(2)),
            angle(self.vector(0), self.vector(2)),
            angle(self.vector(0), self.vector(1)),
        ]
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * frac)
    }

    pub fn to_fractional(&self, cart: &Point3<f64>) -> Vector3<f64> {
        // A lattice with zero volume cannot hold sites; callers construct
        // lattices from positive lengths so the inverse exists.
        let inverse = self
            .matrix
            .transpose()
            .try_inverse()
            .unwrap_or_else(Matrix3::zeros);
        inverse * cart.coords
    }

    /// Reciprocal lattice vectors as rows, without the 2π factor.
    pub fn reciprocal(&self) -> Matrix3<f64> {
        self.matrix
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or_else(Matrix3::zeros)
    }

    pub fn scaled(&self, multipliers: [usize; 3]) -> Self {
        let mut matrix = self.matrix;
        for (axis, &m) in multipliers.iter().enumerate() {
            let mut row = matrix.row_mut(axis);
            row *= m as f64;
        }
        Self::new(matrix)
    }

    pub fn is_orthogonal(&self, tolerance: f64) -> bool {
        let [a, b, c] = [0, 1, 2].map(|i| self.vector(i));
        a.dot(&b).abs() < tolerance && a.dot(&c).abs() < tolerance && b.dot(&c).abs() < tolerance
    }
}

fn cos_deg(angle: f64) -> f64 {
    if (angle - 90.0).abs() < ANGLE_TOLERANCE_DEG {
        0.0
    } else {
        angle.to_radians().cos()
    }
}

fn sin_deg(angle: f64) -> f64 {
    if (angle - 90.0).abs() < ANGLE_TOLERANCE_DEG {
        1.0
    } else {
        angle.to_radians().sin()
    }
}
