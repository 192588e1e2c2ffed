//! Column-oriented storage for per-atom properties.
//!
//! Every property is a column holding exactly one entry per atom. Two columns always exist:
//! `atype` (1-based integer atom types) and `pos` (Cartesian positions in working length
//! units). Any number of additional columns (velocities, charges, flags...) can be attached
//! and removed at runtime; column names are unique and keep their insertion order, which is
//! also the order the table writers use by default.

use super::error::Error;
use nalgebra::Vector3;
use smol_str::SmolStr;
use std::sync::OnceLock;

pub const ATYPE: &str = "atype";
pub const POS: &str = "pos";

/// One per-atom column.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Integer(Vec<i64>),
    Scalar(Vec<f64>),
    Vector(Vec<Vector3<f64>>),
}

impl Property {
    pub fn len(&self) -> usize {
        match self {
            Property::Integer(v) => v.len(),
            Property::Scalar(v) => v.len(),
            Property::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of table columns one entry expands to.
    pub fn width(&self) -> usize {
        match self {
            Property::Integer(_) | Property::Scalar(_) => 1,
            Property::Vector(_) => 3,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Property::Integer(_) => "an integer property",
            Property::Scalar(_) => "a scalar property",
            Property::Vector(_) => "a vector property",
        }
    }

    /// Value for atom `index`; panics when out of range like slice indexing does.
    pub fn value(&self, index: usize) -> PropertyValue {
        match self {
            Property::Integer(v) => PropertyValue::Integer(v[index]),
            Property::Scalar(v) => PropertyValue::Scalar(v[index]),
            Property::Vector(v) => PropertyValue::Vector(v[index]),
        }
    }

    fn select(&self, indices: &[usize]) -> Property {
        match self {
            Property::Integer(v) => Property::Integer(indices.iter().map(|&i| v[i]).collect()),
            Property::Scalar(v) => Property::Scalar(indices.iter().map(|&i| v[i]).collect()),
            Property::Vector(v) => Property::Vector(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

impl From<Vec<i64>> for Property {
    fn from(values: Vec<i64>) -> Self {
        Property::Integer(values)
    }
}

impl From<Vec<f64>> for Property {
    fn from(values: Vec<f64>) -> Self {
        Property::Scalar(values)
    }
}

impl From<Vec<Vector3<f64>>> for Property {
    fn from(values: Vec<Vector3<f64>>) -> Self {
        Property::Vector(values)
    }
}

/// Value of a single property for a single atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Integer(i64),
    Scalar(f64),
    Vector(Vector3<f64>),
}

/// Ordered collection of atoms with dynamically named property columns.
#[derive(Debug, Clone)]
pub struct Atoms {
    natoms: usize,
    columns: Vec<(SmolStr, Property)>,
    natypes: OnceLock<usize>,
}

impl Default for Atoms {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PartialEq for Atoms {
    fn eq(&self, other: &Self) -> bool {
        self.natoms == other.natoms && self.columns == other.columns
    }
}

impl Atoms {
    /// Creates `natoms` atoms of type 1 at the origin.
    pub fn new(natoms: usize) -> Self {
        Self {
            natoms,
            columns: vec![
                (SmolStr::new(ATYPE), Property::Integer(vec![1; natoms])),
                (SmolStr::new(POS), Property::Vector(vec![Vector3::zeros(); natoms])),
            ],
            natypes: OnceLock::new(),
        }
    }

    /// Creates atoms from matching type and position columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when the columns differ in length and
    /// [`Error::InvalidAtomType`] when a type is below 1.
    pub fn from_types_and_positions(
        atype: Vec<i64>,
        pos: Vec<Vector3<f64>>,
    ) -> Result<Self, Error> {
        if atype.len() != pos.len() {
            return Err(Error::shape_mismatch(POS, atype.len(), pos.len()));
        }
        check_types(&atype)?;
        Ok(Self {
            natoms: atype.len(),
            columns: vec![
                (SmolStr::new(ATYPE), Property::Integer(atype)),
                (SmolStr::new(POS), Property::Vector(pos)),
            ],
            natypes: OnceLock::new(),
        })
    }

    pub fn natoms(&self) -> usize {
        self.natoms
    }

    pub fn is_empty(&self) -> bool {
        self.natoms == 0
    }

    /// Largest atom type in use; 0 for an empty container.
    ///
    /// The scan result is cached until `atype` is replaced or set.
    pub fn natypes(&self) -> usize {
        *self.natypes.get_or_init(|| {
            self.atype()
                .iter()
                .copied()
                .max()
                .map_or(0, |max| max.max(0) as usize)
        })
    }

    /// Property names in insertion order.
    pub fn prop_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Adds a column, replacing any existing column of the same name in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] when the column length differs from the atom count,
    /// [`Error::PropertyKind`] when `atype`/`pos` would change kind, and
    /// [`Error::InvalidAtomType`] for non-positive atom types.
    pub fn add_property(&mut self, name: &str, values: impl Into<Property>) -> Result<(), Error> {
        let values = values.into();
        if values.len() != self.natoms {
            return Err(Error::shape_mismatch(name, self.natoms, values.len()));
        }

        match (name, &values) {
            (ATYPE, Property::Integer(types)) => check_types(types)?,
            (ATYPE, _) => return Err(Error::property_kind(name, "an integer property")),
            (POS, Property::Vector(_)) => {}
            (POS, _) => return Err(Error::property_kind(name, "a vector property")),
            _ => {}
        }

        if name == ATYPE {
            self.natypes = OnceLock::new();
        }

        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = values,
            None => self.columns.push((SmolStr::new(name), values)),
        }
        Ok(())
    }

    /// Returns the column stored under `name`.
    pub fn get_property(&self, name: &str) -> Result<&Property, Error> {
        self.property(name)
            .ok_or_else(|| Error::missing_property(name))
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    /// Mutable access to a column. The column kind and length cannot be changed this way.
    ///
    /// `atype` is refused with [`Error::ReadOnlyProperty`]; change it with
    /// [`Atoms::set_atype`] or [`Atoms::add_property`].
    pub fn property_mut(&mut self, name: &str) -> Result<PropertyMut<'_>, Error> {
        if name == ATYPE {
            return Err(Error::ReadOnlyProperty {
                name: name.to_string(),
            });
        }
        self.columns
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, p)| match p {
                Property::Integer(v) => PropertyMut::Integer(v.as_mut_slice()),
                Property::Scalar(v) => PropertyMut::Scalar(v.as_mut_slice()),
                Property::Vector(v) => PropertyMut::Vector(v.as_mut_slice()),
            })
            .ok_or_else(|| Error::missing_property(name))
    }

    /// Removes and returns a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequiredProperty`] for `atype`/`pos` and [`Error::MissingProperty`]
    /// when no column has that name.
    pub fn remove_property(&mut self, name: &str) -> Result<Property, Error> {
        if name == ATYPE || name == POS {
            return Err(Error::RequiredProperty {
                name: name.to_string(),
            });
        }
        let index = self
            .columns
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| Error::missing_property(name))?;
        Ok(self.columns.remove(index).1)
    }

    pub fn atype(&self) -> &[i64] {
        match self.property(ATYPE) {
            Some(Property::Integer(v)) => v,
            _ => unreachable!("atype is always an integer column"),
        }
    }

    /// Sets the type of the atom at `index`.
    pub fn set_atype(&mut self, index: usize, atype: i64) -> Result<(), Error> {
        if index >= self.natoms {
            return Err(Error::shape_mismatch(ATYPE, self.natoms, index + 1));
        }
        check_types(&[atype]).map_err(|_| Error::InvalidAtomType { index, value: atype })?;
        if let Some((_, Property::Integer(types))) = self.columns.iter_mut().find(|(n, _)| n == ATYPE) {
            types[index] = atype;
        }
        self.natypes = OnceLock::new();
        Ok(())
    }

    pub fn pos(&self) -> &[Vector3<f64>] {
        match self.property(POS) {
            Some(Property::Vector(v)) => v,
            _ => unreachable!("pos is always a vector column"),
        }
    }

    pub fn pos_mut(&mut self) -> &mut [Vector3<f64>] {
        match self.property_mut(POS) {
            Ok(PropertyMut::Vector(v)) => v,
            _ => unreachable!("pos is always a vector column"),
        }
    }

    /// Typed view of an integer column.
    pub fn integer(&self, name: &str) -> Result<&[i64], Error> {
        match self.get_property(name)? {
            Property::Integer(v) => Ok(v),
            _ => Err(Error::property_kind(name, "an integer property")),
        }
    }

    /// Typed view of a scalar column.
    pub fn scalar(&self, name: &str) -> Result<&[f64], Error> {
        match self.get_property(name)? {
            Property::Scalar(v) => Ok(v),
            _ => Err(Error::property_kind(name, "a scalar property")),
        }
    }

    /// Typed view of a vector column.
    pub fn vector(&self, name: &str) -> Result<&[Vector3<f64>], Error> {
        match self.get_property(name)? {
            Property::Vector(v) => Ok(v),
            _ => Err(Error::property_kind(name, "a vector property")),
        }
    }

    /// New container holding the atoms at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range.
    pub fn subset(&self, indices: &[usize]) -> Atoms {
        Atoms {
            natoms: indices.len(),
            columns: self
                .columns
                .iter()
                .map(|(name, prop)| (name.clone(), prop.select(indices)))
                .collect(),
            natypes: OnceLock::new(),
        }
    }

    /// Lazy per-atom views in index order. Each call starts a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = AtomView<'_>> + '_ {
        (0..self.natoms).map(move |index| AtomView { atoms: self, index })
    }

    pub(crate) fn columns(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.columns.iter().map(|(n, p)| (n.as_str(), p))
    }
}

fn check_types(types: &[i64]) -> Result<(), Error> {
    match types.iter().position(|&t| t < 1) {
        Some(index) => Err(Error::InvalidAtomType {
            index,
            value: types[index],
        }),
        None => Ok(()),
    }
}

/// Mutable slice into one column.
#[derive(Debug)]
pub enum PropertyMut<'a> {
    Integer(&'a mut [i64]),
    Scalar(&'a mut [f64]),
    Vector(&'a mut [Vector3<f64>]),
}

/// Borrowed view of one atom: its id plus every property value at its index.
#[derive(Debug, Clone, Copy)]
pub struct AtomView<'a> {
    atoms: &'a Atoms,
    index: usize,
}

impl<'a> AtomView<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based atom id.
    pub fn id(&self) -> usize {
        self.index + 1
    }

    pub fn atype(&self) -> i64 {
        self.atoms.atype()[self.index]
    }

    pub fn pos(&self) -> Vector3<f64> {
        self.atoms.pos()[self.index]
    }

    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.atoms.property(name).map(|p| p.value(self.index))
    }

    /// Every `(name, value)` pair for this atom, in column order.
    pub fn properties(&self) -> impl Iterator<Item = (&'a str, PropertyValue)> + 'a {
        let index = self.index;
        self.atoms
            .columns
            .iter()
            .map(move |(name, prop)| (name.as_str(), prop.value(index)))
    }
}
