use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown unit '{unit}': {reason}")]
    UnknownUnit { unit: String, reason: String },

    #[error("invalid base units: {reason}")]
    InvalidBaseUnits { reason: String },
}

impl Error {
    pub fn unknown_unit(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnknownUnit {
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_base_units(reason: impl Into<String>) -> Self {
        Self::InvalidBaseUnits {
            reason: reason.into(),
        }
    }
}
