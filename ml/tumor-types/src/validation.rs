//! Validation error types.

use thiserror::Error;

/// Validation errors for pipeline tensors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Tensor shape differs from the configured target shape.
    #[error("unexpected tensor shape: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected `[height, width, channels]`.
        expected: [usize; 3],
        /// Actual `[height, width, channels]`.
        actual: [usize; 3],
    },

    /// Flat buffer length does not match `height * width * channels`.
    #[error("buffer length {actual} does not match shape (expected {expected})")]
    BufferLength {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// A pixel value lies outside `[0, 1]`.
    #[error("pixel value out of range [0, 1] at index {index}: {value}")]
    OutOfRange {
        /// Flat index of the offending element.
        index: usize,
        /// Offending value.
        value: f32,
    },

    /// A pixel value is `NaN` or infinite.
    #[error("non-finite pixel value at index {0}")]
    NonFiniteValue(usize),

    /// Target size has a zero dimension.
    #[error("target size must be positive, got {width}x{height}")]
    ZeroTargetSize {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::ShapeMismatch {
            expected: [128, 128, 3],
            actual: [64, 128, 3],
        };
        let msg = format!("{err}");
        assert!(msg.contains("[128, 128, 3]"));
        assert!(msg.contains("[64, 128, 3]"));

        let err = ValidationError::OutOfRange {
            index: 5,
            value: 1.5,
        };
        assert!(format!("{err}").contains("1.5"));

        let err = ValidationError::ZeroTargetSize {
            width: 0,
            height: 32,
        };
        assert!(format!("{err}").contains("0x32"));
    }
}
