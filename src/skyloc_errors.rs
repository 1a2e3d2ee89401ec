use thiserror::Error;

/// Errors reported by the skyloc numeric core.
///
/// All conditions stem from caller input or configuration, never from
/// transient failures, so none of them are retried internally. A sky map is
/// either fully computed and normalized, or one of these errors is returned;
/// there is no partial-result mode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkylocError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: got {got} detector trigger(s), at least {min} required")]
    InsufficientData { got: usize, min: usize },

    #[error("Insufficient samples: got {got} posterior sample(s), at least {min} required")]
    InsufficientSamples { got: usize, min: usize },

    #[error("Resolution out of range: requested HEALPix order {requested}, maximum is {max}")]
    OutOfRange { requested: u8, max: u8 },

    #[error("Degenerate likelihood: posterior mass underflowed to zero over the whole sky")]
    DegenerateLikelihood,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl SkylocError {
    /// Convenience constructor for [`SkylocError::InvalidInput`] pointing at a
    /// specific trigger or sample index.
    pub(crate) fn invalid_at(index: usize, what: impl std::fmt::Display) -> Self {
        SkylocError::InvalidInput(format!("{what} (at index {index})"))
    }
}
