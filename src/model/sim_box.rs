//! Periodic simulation cell described by axis bounds and LAMMPS tilt factors.
//!
//! The cell follows the LAMMPS convention for restricted triclinic boxes: the `a` edge lies
//! along x, the `b` edge lies in the xy plane, and `c` has a positive z component. In that
//! frame the three edge vectors are
//!
//! ```text
//! a = (lx, 0, 0)    b = (xy, ly, 0)    c = (xz, yz, lz)
//! ```
//!
//! with `lx = xhi - xlo` and so on. Orthogonal cells simply carry zero tilt factors. Every
//! constructor and setter validates the geometry, so a `SimBox` that exists is always usable
//! by the coordinate transforms and by the LAMMPS writers.

use super::error::Error;
use nalgebra::{Matrix3, Vector3};
use std::fmt;

/// Relative slack allowed on the triclinic tilt limits.
const TILT_TOLERANCE: f64 = 1e-8;
/// Relative slack for the zero entries required by [`SimBox::from_vectors`].
const ORIENTATION_TOLERANCE: f64 = 1e-10;

/// Lattice parameters: edge lengths and inter-edge angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Angle between `b` and `c`.
    pub alpha: f64,
    /// Angle between `a` and `c`.
    pub beta: f64,
    /// Angle between `a` and `b`.
    pub gamma: f64,
}

impl Lattice {
    /// Cubic lattice with all edges `a` and right angles.
    pub fn cubic(a: f64) -> Self {
        Self::orthorhombic(a, a, a)
    }

    /// Orthorhombic lattice with right angles.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha: 90.0,
            beta: 90.0,
            gamma: 90.0,
        }
    }

    /// Hexagonal lattice (`gamma = 120°`).
    pub fn hexagonal(a: f64, c: f64) -> Self {
        Self {
            a,
            b: a,
            c,
            alpha: 90.0,
            beta: 90.0,
            gamma: 120.0,
        }
    }
}

/// Periodic parallelepiped cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimBox {
    lo: Vector3<f64>,
    hi: Vector3<f64>,
    /// Tilt factors ordered `(xy, xz, yz)`.
    tilt: Vector3<f64>,
}

impl Default for SimBox {
    /// Unit cube anchored at the origin.
    fn default() -> Self {
        Self {
            lo: Vector3::zeros(),
            hi: Vector3::new(1.0, 1.0, 1.0),
            tilt: Vector3::zeros(),
        }
    }
}

impl SimBox {
    /// Creates a box from lower bounds, upper bounds, and `(xy, xz, yz)` tilt factors.
    ///
    /// # Arguments
    ///
    /// * `lo` - `(xlo, ylo, zlo)`.
    /// * `hi` - `(xhi, yhi, zhi)`.
    /// * `tilt` - `(xy, xz, yz)`; all zero for an orthogonal cell.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBox`] when a bound is not finite, when `hi <= lo` on any axis, or
    /// when a tilt factor exceeds half of the edge it skews.
    pub fn from_bounds(lo: [f64; 3], hi: [f64; 3], tilt: [f64; 3]) -> Result<Self, Error> {
        let candidate = Self {
            lo: Vector3::from(lo),
            hi: Vector3::from(hi),
            tilt: Vector3::from(tilt),
        };
        candidate.validate()?;
        Ok(candidate)
    }

    /// Creates an orthogonal box from lower and upper bounds.
    pub fn orthogonal(lo: [f64; 3], hi: [f64; 3]) -> Result<Self, Error> {
        Self::from_bounds(lo, hi, [0.0; 3])
    }

    /// Creates a cube of edge `a` anchored at the origin.
    pub fn cubic(a: f64) -> Result<Self, Error> {
        Self::orthogonal([0.0; 3], [a, a, a])
    }

    /// Creates a box from three edge vectors and an origin.
    ///
    /// The vectors must already be in LAMMPS orientation: `avect` along +x, `bvect` in the xy
    /// plane with positive y, and `cvect` with positive z.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBox`] when the vectors are not in that orientation or violate
    /// the bound/tilt invariants.
    pub fn from_vectors(
        avect: Vector3<f64>,
        bvect: Vector3<f64>,
        cvect: Vector3<f64>,
        origin: Vector3<f64>,
    ) -> Result<Self, Error> {
        let scale = avect.norm().max(bvect.norm()).max(cvect.norm()).max(1.0);
        let limit = ORIENTATION_TOLERANCE * scale;

        if avect.y.abs() > limit || avect.z.abs() > limit || bvect.z.abs() > limit {
            return Err(Error::invalid_box(
                "box vectors must have avect along x and bvect in the xy plane",
            ));
        }

        let lengths = Vector3::new(avect.x, bvect.y, cvect.z);
        let tilt = Vector3::new(bvect.x, cvect.x, cvect.y);
        Self::from_bounds(
            origin.into(),
            (origin + lengths).into(),
            tilt.into(),
        )
    }

    /// Creates a box from lattice parameters, placing `a` along x and `b` in the xy plane.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBox`] when the lengths are non-positive, the angles do not
    /// describe a parallelepiped, or the resulting tilt factors are out of range.
    pub fn from_lattice(lattice: Lattice, origin: Vector3<f64>) -> Result<Self, Error> {
        let Lattice {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        } = lattice;

        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::invalid_box(format!(
                "lattice lengths must be positive, got a={a}, b={b}, c={c}"
            )));
        }

        let (cos_alpha, cos_beta, cos_gamma) = (
            cos_degrees(alpha),
            cos_degrees(beta),
            cos_degrees(gamma),
        );

        let lx = a;
        let xy = b * cos_gamma;
        let xz = c * cos_beta;
        let ly_sq = b * b - xy * xy;
        if ly_sq <= 0.0 {
            return Err(Error::invalid_box(format!(
                "gamma = {gamma} degrees does not define a cell"
            )));
        }
        let ly = ly_sq.sqrt();
        let yz = (b * c * cos_alpha - xy * xz) / ly;
        let lz_sq = c * c - xz * xz - yz * yz;
        if lz_sq <= 0.0 {
            return Err(Error::invalid_box(format!(
                "angles ({alpha}, {beta}, {gamma}) do not define a cell"
            )));
        }
        let lz = lz_sq.sqrt();

        Self::from_bounds(
            origin.into(),
            (origin + Vector3::new(lx, ly, lz)).into(),
            [xy, xz, yz],
        )
    }

    /// Replaces bounds and tilt; the box is unchanged when validation fails.
    pub fn set_bounds(&mut self, lo: [f64; 3], hi: [f64; 3], tilt: [f64; 3]) -> Result<(), Error> {
        *self = Self::from_bounds(lo, hi, tilt)?;
        Ok(())
    }

    /// Replaces the geometry from edge vectors; the box is unchanged when validation fails.
    pub fn set_vectors(
        &mut self,
        avect: Vector3<f64>,
        bvect: Vector3<f64>,
        cvect: Vector3<f64>,
        origin: Vector3<f64>,
    ) -> Result<(), Error> {
        *self = Self::from_vectors(avect, bvect, cvect, origin)?;
        Ok(())
    }

    /// Replaces the geometry from lattice parameters, keeping the current origin.
    pub fn set_lattice(&mut self, lattice: Lattice) -> Result<(), Error> {
        *self = Self::from_lattice(lattice, self.origin())?;
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let mut values = self.lo.iter().chain(self.hi.iter()).chain(self.tilt.iter());
        if values.any(|v| !v.is_finite()) {
            return Err(Error::invalid_box("bounds and tilt factors must be finite"));
        }

        for (axis, label) in ["x", "y", "z"].iter().enumerate() {
            if self.hi[axis] <= self.lo[axis] {
                return Err(Error::invalid_box(format!(
                    "{label}hi ({}) must be greater than {label}lo ({})",
                    self.hi[axis], self.lo[axis]
                )));
            }
        }

        let lengths = self.lengths();
        let checks = [
            ("xy", self.tilt.x, lengths.x),
            ("xz", self.tilt.y, lengths.x),
            ("yz", self.tilt.z, lengths.y),
        ];
        for (label, tilt, edge) in checks {
            if tilt.abs() > 0.5 * edge * (1.0 + TILT_TOLERANCE) {
                return Err(Error::invalid_box(format!(
                    "tilt factor {label} = {tilt} exceeds half of the skewed edge ({edge})"
                )));
            }
        }

        Ok(())
    }

    pub fn xlo(&self) -> f64 {
        self.lo.x
    }

    pub fn xhi(&self) -> f64 {
        self.hi.x
    }

    pub fn ylo(&self) -> f64 {
        self.lo.y
    }

    pub fn yhi(&self) -> f64 {
        self.hi.y
    }

    pub fn zlo(&self) -> f64 {
        self.lo.z
    }

    pub fn zhi(&self) -> f64 {
        self.hi.z
    }

    pub fn xy(&self) -> f64 {
        self.tilt.x
    }

    pub fn xz(&self) -> f64 {
        self.tilt.y
    }

    pub fn yz(&self) -> f64 {
        self.tilt.z
    }

    /// Lower bounds `(xlo, ylo, zlo)`, which coincide with the cell origin.
    pub fn lo(&self) -> Vector3<f64> {
        self.lo
    }

    /// Upper bounds `(xhi, yhi, zhi)`.
    pub fn hi(&self) -> Vector3<f64> {
        self.hi
    }

    /// Tilt factors `(xy, xz, yz)`.
    pub fn tilt(&self) -> Vector3<f64> {
        self.tilt
    }

    /// Edge extents `(lx, ly, lz)`.
    pub fn lengths(&self) -> Vector3<f64> {
        self.hi - self.lo
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.lo
    }

    pub fn avect(&self) -> Vector3<f64> {
        Vector3::new(self.hi.x - self.lo.x, 0.0, 0.0)
    }

    pub fn bvect(&self) -> Vector3<f64> {
        Vector3::new(self.tilt.x, self.hi.y - self.lo.y, 0.0)
    }

    pub fn cvect(&self) -> Vector3<f64> {
        Vector3::new(self.tilt.y, self.tilt.z, self.hi.z - self.lo.z)
    }

    /// Cell vectors as the rows of a matrix (`avect`, `bvect`, `cvect`).
    pub fn vectors(&self) -> Matrix3<f64> {
        Matrix3::from_rows(&[
            self.avect().transpose(),
            self.bvect().transpose(),
            self.cvect().transpose(),
        ])
    }

    pub fn a(&self) -> f64 {
        self.avect().norm()
    }

    pub fn b(&self) -> f64 {
        self.bvect().norm()
    }

    pub fn c(&self) -> f64 {
        self.cvect().norm()
    }

    /// Angle between `b` and `c` in degrees.
    pub fn alpha(&self) -> f64 {
        self.bvect().angle(&self.cvect()).to_degrees()
    }

    /// Angle between `a` and `c` in degrees.
    pub fn beta(&self) -> f64 {
        self.avect().angle(&self.cvect()).to_degrees()
    }

    /// Angle between `a` and `b` in degrees.
    pub fn gamma(&self) -> f64 {
        self.avect().angle(&self.bvect()).to_degrees()
    }

    pub fn lattice(&self) -> Lattice {
        Lattice {
            a: self.a(),
            b: self.b(),
            c: self.c(),
            alpha: self.alpha(),
            beta: self.beta(),
            gamma: self.gamma(),
        }
    }

    /// Cell volume; the edge matrix is triangular so this is `lx * ly * lz`.
    pub fn volume(&self) -> f64 {
        let lengths = self.lengths();
        lengths.x * lengths.y * lengths.z
    }

    /// `true` when all tilt factors are exactly zero.
    pub fn is_orthogonal(&self) -> bool {
        self.tilt.x == 0.0 && self.tilt.y == 0.0 && self.tilt.z == 0.0
    }

    /// Converts an absolute position into box-relative (fractional) coordinates.
    ///
    /// The result satisfies `pos = origin + s.x * avect + s.y * bvect + s.z * cvect`. Because
    /// the edge matrix is upper triangular the inverse is solved by back substitution.
    pub fn position_relative(&self, pos: &Vector3<f64>) -> Vector3<f64> {
        let d = pos - self.lo;
        let l = self.lengths();
        let sz = d.z / l.z;
        let sy = (d.y - self.tilt.z * sz) / l.y;
        let sx = (d.x - self.tilt.x * sy - self.tilt.y * sz) / l.x;
        Vector3::new(sx, sy, sz)
    }

    /// Converts box-relative coordinates back into an absolute position.
    pub fn position_absolute(&self, rel: &Vector3<f64>) -> Vector3<f64> {
        self.lo + self.avect() * rel.x + self.bvect() * rel.y + self.cvect() * rel.z
    }

    /// LAMMPS dump bounding box: bounds enlarged to enclose the tilted cell.
    ///
    /// Returns `(lo_bound, hi_bound)` as written in `ITEM: BOX BOUNDS xy xz yz` records.
    pub fn bounding_box(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (xy, xz, yz) = (self.tilt.x, self.tilt.y, self.tilt.z);
        let x_shifts = [0.0, xy, xz, xy + xz];
        let x_min = x_shifts.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = x_shifts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let lo = Vector3::new(self.lo.x + x_min, self.lo.y + yz.min(0.0), self.lo.z);
        let hi = Vector3::new(self.hi.x + x_max, self.hi.y + yz.max(0.0), self.hi.z);
        (lo, hi)
    }

    /// Inverse of [`SimBox::bounding_box`].
    pub fn from_bounding_box(
        lo_bound: [f64; 3],
        hi_bound: [f64; 3],
        tilt: [f64; 3],
    ) -> Result<Self, Error> {
        let [xy, xz, yz] = tilt;
        let x_shifts = [0.0, xy, xz, xy + xz];
        let x_min = x_shifts.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = x_shifts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self::from_bounds(
            [lo_bound[0] - x_min, lo_bound[1] - yz.min(0.0), lo_bound[2]],
            [hi_bound[0] - x_max, hi_bound[1] - yz.max(0.0), hi_bound[2]],
            tilt,
        )
    }
}

fn cos_degrees(angle: f64) -> f64 {
    // Snap exact right angles so orthogonal lattices produce exactly zero tilt.
    if angle == 90.0 {
        0.0
    } else {
        angle.to_radians().cos()
    }
}

impl fmt::Display for SimBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimBox {{ x: [{:.3}, {:.3}], y: [{:.3}, {:.3}], z: [{:.3}, {:.3}], tilt: [{:.3}, {:.3}, {:.3}] }}",
            self.lo.x,
            self.hi.x,
            self.lo.y,
            self.hi.y,
            self.lo.z,
            self.hi.z,
            self.tilt.x,
            self.tilt.y,
            self.tilt.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(actual: &Vector3<f64>, expected: &Vector3<f64>) {
        assert!(
            (actual - expected).norm() < 1e-10,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn from_bounds_creates_orthogonal_box() {
        let sim_box = SimBox::orthogonal([0.0, -1.0, 2.0], [10.0, 4.0, 5.0]).unwrap();

        assert_eq!(sim_box.xlo(), 0.0);
        assert_eq!(sim_box.xhi(), 10.0);
        assert_eq!(sim_box.ylo(), -1.0);
        assert_eq!(sim_box.yhi(), 4.0);
        assert_eq!(sim_box.zlo(), 2.0);
        assert_eq!(sim_box.zhi(), 5.0);
        assert!(sim_box.is_orthogonal());
        assert!((sim_box.volume() - 150.0).abs() < 1e-10);
    }

    #[test]
    fn vectors_reconstruct_orthogonal_bounds() {
        let sim_box = SimBox::orthogonal([1.0, 2.0, 3.0], [4.0, 7.0, 9.0]).unwrap();
        let vectors = sim_box.vectors();

        assert_eq!(vectors, Matrix3::new(3.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 6.0));
        assert_eq!(sim_box.origin() + sim_box.avect(), Vector3::new(4.0, 2.0, 3.0));

        let rebuilt = SimBox::from_vectors(
            sim_box.avect(),
            sim_box.bvect(),
            sim_box.cvect(),
            sim_box.origin(),
        )
        .unwrap();
        assert_eq!(rebuilt, sim_box);
    }

    #[test]
    fn from_bounds_rejects_inverted_axis() {
        let err = SimBox::orthogonal([0.0, 0.0, 0.0], [1.0, 0.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidBox { .. }));
        assert!(err.to_string().contains("yhi"));
    }

    #[test]
    fn from_bounds_rejects_non_finite_values() {
        assert!(SimBox::orthogonal([0.0, 0.0, f64::NAN], [1.0, 1.0, 1.0]).is_err());
        assert!(SimBox::from_bounds([0.0; 3], [1.0; 3], [f64::INFINITY, 0.0, 0.0]).is_err());
    }

    #[test]
    fn from_bounds_rejects_excessive_tilt() {
        let err = SimBox::from_bounds([0.0; 3], [4.0, 4.0, 4.0], [2.5, 0.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("xy"));

        assert!(SimBox::from_bounds([0.0; 3], [4.0, 4.0, 4.0], [2.0, -2.0, 2.0]).is_ok());
    }

    #[test]
    fn from_vectors_rejects_general_orientation() {
        let err = SimBox::from_vectors(
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::zeros(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidBox { .. }));
    }

    #[test]
    fn from_lattice_builds_hexagonal_cell() {
        let sim_box = SimBox::from_lattice(Lattice::hexagonal(3.0, 5.0), Vector3::zeros()).unwrap();

        assert!((sim_box.a() - 3.0).abs() < 1e-10);
        assert!((sim_box.b() - 3.0).abs() < 1e-10);
        assert!((sim_box.c() - 5.0).abs() < 1e-10);
        assert!((sim_box.gamma() - 120.0).abs() < 1e-8);
        assert!((sim_box.alpha() - 90.0).abs() < 1e-8);
        assert!((sim_box.xy() + 1.5).abs() < 1e-10);
        assert!(!sim_box.is_orthogonal());

        let expected_volume = 3.0 * 3.0 * (120.0f64.to_radians().sin()) * 5.0;
        assert!((sim_box.volume() - expected_volume).abs() < 1e-10);
    }

    #[test]
    fn from_lattice_with_right_angles_is_orthogonal() {
        let sim_box = SimBox::from_lattice(Lattice::cubic(4.05), Vector3::zeros()).unwrap();
        assert!(sim_box.is_orthogonal());
        assert!((sim_box.xhi() - 4.05).abs() < 1e-12);
    }

    #[test]
    fn from_lattice_rejects_impossible_angles() {
        let lattice = Lattice {
            a: 1.0,
            b: 1.0,
            c: 1.0,
            alpha: 10.0,
            beta: 170.0,
            gamma: 90.0,
        };
        assert!(SimBox::from_lattice(lattice, Vector3::zeros()).is_err());
        assert!(SimBox::from_lattice(Lattice::cubic(-1.0), Vector3::zeros()).is_err());
    }

    #[test]
    fn lattice_round_trips_through_box() {
        let lattice = Lattice {
            a: 4.0,
            b: 5.0,
            c: 6.0,
            alpha: 80.0,
            beta: 95.0,
            gamma: 100.0,
        };
        let sim_box = SimBox::from_lattice(lattice, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let back = sim_box.lattice();

        assert!((back.a - 4.0).abs() < 1e-10);
        assert!((back.b - 5.0).abs() < 1e-10);
        assert!((back.c - 6.0).abs() < 1e-10);
        assert!((back.alpha - 80.0).abs() < 1e-8);
        assert!((back.beta - 95.0).abs() < 1e-8);
        assert!((back.gamma - 100.0).abs() < 1e-8);
    }

    #[test]
    fn relative_and_absolute_positions_are_inverse() {
        let sim_box = SimBox::from_bounds([1.0, 2.0, 3.0], [5.0, 6.0, 8.0], [1.0, -1.5, 0.5]).unwrap();
        let pos = Vector3::new(2.3, 4.1, 6.7);

        let rel = sim_box.position_relative(&pos);
        let back = sim_box.position_absolute(&rel);
        assert_vec_close(&back, &pos);

        assert_vec_close(
            &sim_box.position_relative(&(sim_box.origin() + sim_box.cvect())),
            &Vector3::new(0.0, 0.0, 1.0),
        );
    }

    #[test]
    fn setters_keep_box_unchanged_on_error() {
        let mut sim_box = SimBox::cubic(3.0).unwrap();
        let before = sim_box;

        assert!(sim_box.set_bounds([0.0; 3], [-1.0, 1.0, 1.0], [0.0; 3]).is_err());
        assert_eq!(sim_box, before);

        sim_box.set_lattice(Lattice::orthorhombic(1.0, 2.0, 3.0)).unwrap();
        assert!((sim_box.volume() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn bounding_box_round_trips() {
        let sim_box = SimBox::from_bounds([0.0; 3], [4.0, 4.0, 4.0], [1.0, -0.5, 1.5]).unwrap();
        let (lo, hi) = sim_box.bounding_box();

        assert_vec_close(&lo, &Vector3::new(-0.5, 0.0, 0.0));
        assert_vec_close(&hi, &Vector3::new(5.0, 5.5, 4.0));

        let back = SimBox::from_bounding_box(lo.into(), hi.into(), sim_box.tilt().into()).unwrap();
        assert_vec_close(&back.lo(), &sim_box.lo());
        assert_vec_close(&back.hi(), &sim_box.hi());
    }

    #[test]
    fn display_formats_bounds() {
        let sim_box = SimBox::cubic(2.0).unwrap();
        assert_eq!(
            sim_box.to_string(),
            "SimBox { x: [0.000, 2.000], y: [0.000, 2.000], z: [0.000, 2.000], tilt: [0.000, 0.000, 0.000] }"
        );
    }
}
