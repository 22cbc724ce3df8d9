// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for scanx.

use thiserror::Error;

/// Channel error code for a missing or empty `image` argument.
pub const CODE_NO_IMAGE: &str = "NO_IMAGE";
/// Channel error code for an `image` argument of the wrong type.
pub const CODE_INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
/// Channel error code for an input over the configured byte limit.
pub const CODE_IMAGE_TOO_LARGE: &str = "IMAGE_TOO_LARGE";
/// Channel error code for bytes that are not a decodable image.
pub const CODE_DECODE_FAILED: &str = "DECODE_FAILED";
/// Channel error code for an image with no detectable document.
pub const CODE_NO_DOCUMENT_FOUND: &str = "NO_DOCUMENT_FOUND";
/// Channel error code for a failure re-encoding the output.
pub const CODE_ENCODE_FAILED: &str = "ENCODE_FAILED";
/// Catch-all channel error code for internal failures.
pub const CODE_INTERNAL: &str = "INTERNAL";

/// Top-level error type for all scanx operations.
#[derive(Debug, Error)]
pub enum ScanxError {
    // -- Input errors --
    #[error("No image provided")]
    NoImage,

    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("image is {actual} bytes, limit is {limit}")]
    ImageTooLarge { actual: usize, limit: usize },

    // -- Processing errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("no document found in image")]
    NoDocumentFound,

    #[error("failed to encode image: {0}")]
    Encode(String),

    // -- Bridge errors --
    #[error("message codec error: {0}")]
    Codec(String),

    #[error("platform bridge error: {0}")]
    Bridge(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanxError {
    /// Stable error code reported to the channel caller.
    pub fn code(&self) -> &'static str {
        match self {
            ScanxError::NoImage => CODE_NO_IMAGE,
            ScanxError::InvalidArgument { .. } => CODE_INVALID_ARGUMENT,
            ScanxError::ImageTooLarge { .. } => CODE_IMAGE_TOO_LARGE,
            ScanxError::Decode(_) => CODE_DECODE_FAILED,
            ScanxError::NoDocumentFound => CODE_NO_DOCUMENT_FOUND,
            ScanxError::Encode(_) => CODE_ENCODE_FAILED,
            ScanxError::Codec(_)
            | ScanxError::Bridge(_)
            | ScanxError::Config(_)
            | ScanxError::Io(_)
            | ScanxError::Serialization(_) => CODE_INTERNAL,
        }
    }

    /// Human-readable message sent alongside [`ScanxError::code`].
    pub fn channel_message(&self) -> String {
        self.to_string()
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_image_has_fixed_code_and_message() {
        let err = ScanxError::NoImage;
        assert_eq!(err.code(), "NO_IMAGE");
        assert_eq!(err.channel_message(), "No image provided");
    }

    #[test]
    fn processing_errors_have_distinct_codes() {
        assert_eq!(ScanxError::Decode("bad".into()).code(), "DECODE_FAILED");
        assert_eq!(ScanxError::NoDocumentFound.code(), "NO_DOCUMENT_FOUND");
        assert_eq!(ScanxError::Encode("bad".into()).code(), "ENCODE_FAILED");
        assert_eq!(
            ScanxError::ImageTooLarge { actual: 10, limit: 5 }.code(),
            "IMAGE_TOO_LARGE"
        );
    }

    #[test]
    fn io_errors_are_internal() {
        let err: ScanxError = std::io::Error::other("disk gone").into();
        assert_eq!(err.code(), CODE_INTERNAL);
    }
}
