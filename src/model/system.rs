use super::atoms::Atoms;
use super::error::Error;
use super::sim_box::SimBox;
use nalgebra::Vector3;
use smol_str::SmolStr;
use std::fmt;

/// Passes of whole-vector shifting tried before falling back to a fractional clamp.
const MAX_WRAP_PASSES: usize = 4;

/// Atomic configuration: a periodic cell, its atoms, and per-axis boundary flags.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    sim_box: SimBox,
    atoms: Atoms,
    /// Periodic boundary flags for x, y, z.
    pub pbc: [bool; 3],
    symbols: Vec<Option<SmolStr>>,
    /// Type count declared by a loader or caller, kept even when no atom uses the top types.
    explicit_natypes: usize,
}

impl Default for System {
    fn default() -> Self {
        Self::new(SimBox::default(), Atoms::default(), [true; 3])
    }
}

impl System {
    pub fn new(sim_box: SimBox, atoms: Atoms, pbc: [bool; 3]) -> Self {
        Self {
            sim_box,
            atoms,
            pbc,
            symbols: Vec::new(),
            explicit_natypes: 0,
        }
    }

    /// Attaches element symbols, one per atom type (index 0 is type 1).
    pub fn with_symbols<S: AsRef<str>>(mut self, symbols: &[S]) -> Self {
        self.set_symbols(symbols.iter().map(|s| Some(s.as_ref())));
        self
    }

    pub fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    pub fn sim_box_mut(&mut self) -> &mut SimBox {
        &mut self.sim_box
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut Atoms {
        &mut self.atoms
    }

    pub fn natoms(&self) -> usize {
        self.atoms.natoms()
    }

    /// Number of atom types: the largest of the explicit count, the highest type in use and
    /// the symbol count.
    pub fn natypes(&self) -> usize {
        self.explicit_natypes
            .max(self.atoms.natypes())
            .max(self.symbols.len())
    }

    /// Declares types that may have no atoms yet.
    pub fn set_natypes(&mut self, natypes: usize) {
        self.explicit_natypes = natypes;
    }

    /// Per-type element symbols; `None` marks a type without a known element.
    pub fn symbols(&self) -> &[Option<SmolStr>] {
        &self.symbols
    }

    pub fn set_symbols<'a>(&mut self, symbols: impl IntoIterator<Item = Option<&'a str>>) {
        self.symbols = symbols.into_iter().map(|s| s.map(SmolStr::new)).collect();
    }

    /// Symbol of a 1-based atom type.
    pub fn symbol_of(&self, atype: i64) -> Option<&str> {
        usize::try_from(atype - 1)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .and_then(|s| s.as_deref())
    }

    /// Symbols for every type up to [`System::natypes`], failing on the first unknown one.
    pub(crate) fn complete_symbols(&self) -> Option<Vec<&str>> {
        (1..=self.natypes() as i64)
            .map(|t| self.symbol_of(t))
            .collect()
    }

    /// Names of the defined per-atom properties.
    pub fn atoms_prop(&self) -> Vec<&str> {
        self.atoms.prop_names()
    }

    /// Absolute positions to box-relative coordinates.
    pub fn scale(&self, positions: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        positions
            .iter()
            .map(|p| self.sim_box.position_relative(p))
            .collect()
    }

    /// Box-relative coordinates to absolute positions.
    pub fn unscale(&self, relative: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        relative
            .iter()
            .map(|r| self.sim_box.position_absolute(r))
            .collect()
    }

    /// Box-relative coordinates of every atom.
    pub fn atoms_scaled_positions(&self) -> Vec<Vector3<f64>> {
        self.scale(self.atoms.pos())
    }

    /// Replaces all positions from box-relative coordinates.
    pub fn set_scaled_positions(&mut self, rel: &[Vector3<f64>]) -> Result<(), Error> {
        if rel.len() != self.natoms() {
            return Err(Error::shape_mismatch("pos", self.natoms(), rel.len()));
        }
        let sim_box = self.sim_box;
        for (pos, r) in self.atoms.pos_mut().iter_mut().zip(rel) {
            *pos = sim_box.position_absolute(r);
        }
        Ok(())
    }

    /// Moves every atom inside the cell along the periodic axes.
    ///
    /// Positions are shifted by whole cell vectors until their box-relative coordinate on each
    /// periodic axis lies in `[0, 1)`. Atoms already inside are not touched, so calling this
    /// twice gives bit-identical positions.
    pub fn wrap(&mut self) {
        if !self.pbc.iter().any(|&p| p) {
            return;
        }

        let sim_box = self.sim_box;
        let pbc = self.pbc;
        let vectors = [sim_box.avect(), sim_box.bvect(), sim_box.cvect()];

        let mut moved = 0usize;
        for pos in self.atoms.pos_mut() {
            if wrap_position(&sim_box, &vectors, pbc, pos) {
                moved += 1;
            }
        }

        tracing::debug!(moved, natoms = self.natoms(), "wrapped atoms into the cell");
    }
}

fn wrap_position(
    sim_box: &SimBox,
    vectors: &[Vector3<f64>; 3],
    pbc: [bool; 3],
    pos: &mut Vector3<f64>,
) -> bool {
    let mut changed = false;

    for _ in 0..MAX_WRAP_PASSES {
        let rel = sim_box.position_relative(pos);
        let mut shifted = false;
        for axis in 0..3 {
            if !pbc[axis] {
                continue;
            }
            let images = rel[axis].floor();
            if images != 0.0 {
                *pos -= vectors[axis] * images;
                shifted = true;
            }
        }
        if !shifted {
            return changed;
        }
        changed = true;
    }

    // Rounding keeps the atom on a cell face; snap the offending fractional coordinates.
    let mut rel = sim_box.position_relative(pos);
    for axis in 0..3 {
        if pbc[axis] && !(0.0..1.0).contains(&rel[axis]) {
            rel[axis] = 0.0;
        }
    }
    *pos = sim_box.position_absolute(&rel);
    true
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let boundary: String = self
            .pbc
            .iter()
            .map(|&p| if p { 'p' } else { 'm' })
            .collect();
        write!(
            f,
            "System {{ natoms: {}, natypes: {}, pbc: {}, box: {} }}",
            self.natoms(),
            self.natypes(),
            boundary,
            self.sim_box
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_atom_system() -> System {
        let atoms = Atoms::from_types_and_positions(
            vec![1, 2],
            vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(9.0, 9.0, 9.0)],
        )
        .unwrap();
        System::new(SimBox::cubic(10.0).unwrap(), atoms, [true; 3])
    }

    fn assert_vec_close(actual: &Vector3<f64>, expected: &Vector3<f64>) {
        assert!(
            (actual - expected).norm() < 1e-10,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn default_system_is_empty_unit_cube() {
        let system = System::default();
        assert_eq!(system.natoms(), 0);
        assert_eq!(system.natypes(), 0);
        assert_eq!(system.pbc, [true; 3]);
        assert_eq!(system.sim_box(), &SimBox::default());
    }

    #[test]
    fn natypes_accounts_for_symbols() {
        let system = two_atom_system();
        assert_eq!(system.natypes(), 2);

        let system = system.with_symbols(&["Cu", "Ni", "Al"]);
        assert_eq!(system.natypes(), 3);
        assert_eq!(system.symbol_of(2), Some("Ni"));
        assert_eq!(system.symbol_of(0), None);
        assert_eq!(system.symbol_of(4), None);
        assert_eq!(system.complete_symbols(), Some(vec!["Cu", "Ni", "Al"]));

        let mut system = system;
        system.set_natypes(5);
        assert_eq!(system.natypes(), 5);
    }

    #[test]
    fn declared_natypes_survive_clone_and_never_shrink_below_use() {
        let mut system = two_atom_system();
        system.set_natypes(4);
        let copy = system.clone();
        assert_eq!(copy.natypes(), 4);
        assert_eq!(copy, system);

        system.set_natypes(1);
        assert_eq!(system.natypes(), 2);
    }

    #[test]
    fn complete_symbols_requires_every_type() {
        let mut system = two_atom_system();
        system.set_symbols([Some("Cu"), None]);
        assert_eq!(system.complete_symbols(), None);
    }

    #[test]
    fn atoms_prop_lists_columns() {
        let mut system = two_atom_system();
        system
            .atoms_mut()
            .add_property("velocity", vec![Vector3::zeros(); 2])
            .unwrap();
        assert_eq!(system.atoms_prop(), vec!["atype", "pos", "velocity"]);
    }

    #[test]
    fn wrap_moves_outside_atoms_into_orthogonal_box() {
        let mut system = two_atom_system();
        system.atoms_mut().pos_mut()[0] = Vector3::new(-1.0, 12.0, 25.0);
        system.atoms_mut().pos_mut()[1] = Vector3::new(10.0, 5.0, 5.0);

        system.wrap();

        assert_vec_close(&system.atoms().pos()[0], &Vector3::new(9.0, 2.0, 5.0));
        assert_vec_close(&system.atoms().pos()[1], &Vector3::new(0.0, 5.0, 5.0));
    }

    #[test]
    fn wrap_leaves_inside_atoms_untouched() {
        let mut system = two_atom_system();
        let before = system.atoms().pos().to_vec();
        system.wrap();
        assert_eq!(system.atoms().pos(), before.as_slice());
    }

    #[test]
    fn wrap_respects_non_periodic_axes() {
        let mut system = two_atom_system();
        system.pbc = [true, false, true];
        system.atoms_mut().pos_mut()[0] = Vector3::new(-1.0, -1.0, -1.0);

        system.wrap();

        assert_vec_close(&system.atoms().pos()[0], &Vector3::new(9.0, -1.0, 9.0));
    }

    #[test]
    fn wrap_without_periodic_axes_is_noop() {
        let mut system = two_atom_system();
        system.pbc = [false; 3];
        system.atoms_mut().pos_mut()[0] = Vector3::new(-50.0, 0.0, 0.0);

        system.wrap();

        assert_eq!(system.atoms().pos()[0], Vector3::new(-50.0, 0.0, 0.0));
    }

    #[test]
    fn wrap_handles_triclinic_cells() {
        let sim_box = SimBox::from_bounds([0.0; 3], [4.0, 4.0, 4.0], [2.0, 1.0, -1.5]).unwrap();
        let atoms = Atoms::from_types_and_positions(
            vec![1; 4],
            vec![
                Vector3::new(-3.0, 5.0, 9.0),
                Vector3::new(7.5, -2.0, 0.5),
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(0.0, 0.0, -0.0001),
            ],
        )
        .unwrap();
        let mut system = System::new(sim_box, atoms, [true; 3]);

        system.wrap();

        for rel in system.atoms_scaled_positions() {
            for axis in 0..3 {
                assert!((0.0..1.0).contains(&rel[axis]), "{rel:?} outside the cell");
            }
        }
    }

    #[test]
    fn wrap_is_idempotent() {
        let sim_box = SimBox::from_bounds([-2.0, 0.0, 1.0], [3.0, 6.0, 4.0], [1.2, -0.7, 0.4]).unwrap();
        let positions: Vec<Vector3<f64>> = (0..50)
            .map(|i| {
                let t = i as f64;
                Vector3::new(
                    (t * 1.37).sin() * 40.0,
                    (t * 0.71).cos() * 33.0,
                    t * 0.9 - 20.0,
                )
            })
            .collect();
        let atoms = Atoms::from_types_and_positions(vec![1; 50], positions).unwrap();
        let mut system = System::new(sim_box, atoms, [true, true, true]);

        system.wrap();
        let once = system.atoms().pos().to_vec();
        system.wrap();

        assert_eq!(system.atoms().pos(), once.as_slice());
    }

    #[test]
    fn scaled_positions_round_trip() {
        let mut system = two_atom_system();
        let rel = system.atoms_scaled_positions();
        assert_vec_close(&rel[1], &Vector3::new(0.9, 0.9, 0.9));
        let back = system.unscale(&rel);
        assert_vec_close(&back[1], &Vector3::new(9.0, 9.0, 9.0));

        system
            .set_scaled_positions(&[Vector3::new(0.5, 0.5, 0.5), Vector3::new(0.25, 0.0, 1.0)])
            .unwrap();
        assert_vec_close(&system.atoms().pos()[0], &Vector3::new(5.0, 5.0, 5.0));
        assert_vec_close(&system.atoms().pos()[1], &Vector3::new(2.5, 0.0, 10.0));

        assert!(system.set_scaled_positions(&[Vector3::zeros()]).is_err());
    }

    #[test]
    fn display_summarizes_system() {
        let mut system = two_atom_system();
        system.pbc = [true, true, false];
        let text = system.to_string();
        assert!(text.starts_with("System { natoms: 2, natypes: 2, pbc: ppm"));
    }
}
