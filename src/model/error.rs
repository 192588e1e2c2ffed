use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid simulation box: {reason}")]
    InvalidBox { reason: String },

    #[error("property '{name}' has {found} entries but the system holds {expected} atoms")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("per-atom property '{name}' is not defined")]
    MissingProperty { name: String },

    #[error("per-atom property '{name}' is not {expected}")]
    PropertyKind { name: String, expected: &'static str },

    #[error("per-atom property '{name}' is required and cannot be removed")]
    RequiredProperty { name: String },

    #[error("per-atom property '{name}' is checked on write; use its setter")]
    ReadOnlyProperty { name: String },

    #[error("atom {index} has type {value}; atom types start at 1")]
    InvalidAtomType { index: usize, value: i64 },
}

impl Error {
    pub fn invalid_box(reason: impl Into<String>) -> Self {
        Self::InvalidBox {
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(name: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            expected,
            found,
        }
    }

    pub fn missing_property(name: impl Into<String>) -> Self {
        Self::MissingProperty { name: name.into() }
    }

    pub fn property_kind(name: impl Into<String>, expected: &'static str) -> Self {
        Self::PropertyKind {
            name: name.into(),
            expected,
        }
    }
}
