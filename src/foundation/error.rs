/// Convenience result type used across floodfx.
pub type FloodResult<T> = Result<T, FloodError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Out-of-domain numeric parameters are not errors: they are clamped where they are parsed.
#[derive(thiserror::Error, Debug)]
pub enum FloodError {
    /// Two grids that must be paired have different dimensions.
    #[error(
        "dimension mismatch in {context}: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}"
    )]
    DimensionMismatch {
        /// Operation that detected the mismatch.
        context: &'static str,
        /// Width of the reference grid.
        expected_width: u32,
        /// Height of the reference grid.
        expected_height: u32,
        /// Width of the offending grid.
        actual_width: u32,
        /// Height of the offending grid.
        actual_height: u32,
    },

    /// Invalid user-provided data (zero-sized grids, malformed params, bad buffer lengths).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while running a pass or building its execution resources.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing parameter data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FloodError {
    /// Build a [`FloodError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FloodError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`FloodError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`FloodError::DimensionMismatch`] from `(width, height)` pairs.
    pub fn dimension_mismatch(
        context: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch {
            context,
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            FloodError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            FloodError::evaluation("x")
                .to_string()
                .contains("evaluation error:")
        );
        assert!(
            FloodError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn dimension_mismatch_reports_both_sizes() {
        let err = FloodError::dimension_mismatch("decode_distance", (8, 4), (4, 8));
        let msg = err.to_string();
        assert!(msg.contains("decode_distance"));
        assert!(msg.contains("8x4"));
        assert!(msg.contains("4x8"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = FloodError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
