use thiserror::Error;

/// Rejected caller-supplied parameters. The message names the field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be >= {min}")]
    BelowMinimum { field: &'static str, min: f64 },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },
    #[error("{upper} must be greater than {lower}")]
    InvertedBounds {
        lower: &'static str,
        upper: &'static str,
    },
    #[error("unknown {kind} '{name}'")]
    UnknownPreset { kind: &'static str, name: String },
    #[error("{field} is required")]
    Missing { field: &'static str },
}

impl InputError {
    pub fn field(&self) -> &str {
        match self {
            InputError::NotFinite { field }
            | InputError::BelowMinimum { field, .. }
            | InputError::OutOfRange { field, .. }
            | InputError::NotPositive { field }
            | InputError::Missing { field } => field,
            InputError::InvertedBounds { upper, .. } => upper,
            InputError::UnknownPreset { kind, .. } => kind,
        }
    }
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NotFinite { field })
    }
}

pub(crate) fn require_at_least(field: &'static str, value: f64, min: f64) -> Result<f64, InputError> {
    require_finite(field, value)?;
    if value < min {
        return Err(InputError::BelowMinimum { field, min });
    }
    Ok(value)
}

pub(crate) fn require_within(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, InputError> {
    require_finite(field, value)?;
    if !(min..=max).contains(&value) {
        return Err(InputError::OutOfRange { field, min, max });
    }
    Ok(value)
}
