//! Conversions between general cell matrices (rows are lattice vectors) and [`SimBox`].

use super::error::Error;
use crate::model::error::Error as ModelError;
use crate::model::sim_box::{Lattice, SimBox};
use nalgebra::{Matrix3, Vector3};

/// Angles this close to 90 degrees are treated as right angles.
const RIGHT_ANGLE_TOLERANCE: f64 = 1e-8;

/// Row-vector matrix of the box edges, each divided by `length`.
pub(crate) fn cell_rows(sim_box: &SimBox, length: f64) -> Matrix3<f64> {
    sim_box.vectors() / length
}

/// Box with the lattice of `cell`, in LAMMPS orientation and anchored at the origin.
///
/// Cells already in LAMMPS orientation are taken verbatim; any other cell is rotated.
pub(crate) fn box_from_rows(cell: &Matrix3<f64>) -> Result<SimBox, Error> {
    let a: Vector3<f64> = cell.row(0).transpose();
    let b: Vector3<f64> = cell.row(1).transpose();
    let c: Vector3<f64> = cell.row(2).transpose();

    if let Ok(sim_box) = SimBox::from_vectors(a, b, c, Vector3::zeros()) {
        return Ok(sim_box);
    }

    let angle = |u: &Vector3<f64>, v: &Vector3<f64>| {
        let degrees = u.angle(v).to_degrees();
        if (degrees - 90.0).abs() < RIGHT_ANGLE_TOLERANCE {
            90.0
        } else {
            degrees
        }
    };
    let lattice = Lattice {
        a: a.norm(),
        b: b.norm(),
        c: c.norm(),
        alpha: angle(&b, &c),
        beta: angle(&a, &c),
        gamma: angle(&a, &b),
    };
    tracing::debug!(?lattice, "rotating general cell into LAMMPS orientation");
    Ok(SimBox::from_lattice(lattice, Vector3::zeros())?)
}

/// Fractional coordinates of Cartesian `positions` with respect to `cell`.
pub(crate) fn fractional(
    cell: &Matrix3<f64>,
    positions: &[Vector3<f64>],
) -> Result<Vec<Vector3<f64>>, Error> {
    let inverse = cell
        .transpose()
        .try_inverse()
        .ok_or_else(|| ModelError::invalid_box("cell vectors are linearly dependent"))?;
    Ok(positions.iter().map(|p| inverse * p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lammps_oriented_rows_are_used_verbatim() {
        let cell = Matrix3::new(4.0, 0.0, 0.0, 1.0, 5.0, 0.0, 0.5, -1.0, 6.0);
        let sim_box = box_from_rows(&cell).unwrap();
        assert_eq!(sim_box.vectors(), cell);
    }

    #[test]
    fn general_rows_are_rotated_preserving_lattice() {
        // fcc primitive cell
        let cell = Matrix3::new(0.0, 2.0, 2.0, 2.0, 0.0, 2.0, 2.0, 2.0, 0.0);
        let sim_box = box_from_rows(&cell).unwrap();

        let expected = 8.0_f64.sqrt();
        assert!((sim_box.a() - expected).abs() < 1e-10);
        assert!((sim_box.b() - expected).abs() < 1e-10);
        assert!((sim_box.c() - expected).abs() < 1e-10);
        assert!((sim_box.alpha() - 60.0).abs() < 1e-8);
        assert!((sim_box.volume() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_inverts_cell() {
        let cell = Matrix3::new(0.0, 2.0, 2.0, 2.0, 0.0, 2.0, 2.0, 2.0, 0.0);
        let frac = fractional(&cell, &[Vector3::new(2.0, 2.0, 2.0)]).unwrap();
        assert!((frac[0] - Vector3::new(0.5, 0.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn singular_cell_is_rejected() {
        let cell = Matrix3::new(1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert!(fractional(&cell, &[Vector3::zeros()]).is_err());
    }
}
