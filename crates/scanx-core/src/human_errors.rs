// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scan screen.
//
// Every error the channel can report is mapped to plain English with a clear
// suggestion. The severity level drives how the mobile shell presents it.

use crate::error::{
    CODE_DECODE_FAILED, CODE_ENCODE_FAILED, CODE_IMAGE_TOO_LARGE, CODE_INTERNAL,
    CODE_INVALID_ARGUMENT, CODE_NO_DOCUMENT_FOUND, CODE_NO_IMAGE, ScanxError,
};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user should retake or reselect the photo.
    Retake,
    /// The input can never be processed as-is.
    Permanent,
    /// Something went wrong inside the app; retrying may help.
    Internal,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same input might succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `ScanxError` into a `HumanError` suitable for display.
pub fn humanize_error(err: &ScanxError) -> HumanError {
    match err {
        ScanxError::NoImage => HumanError {
            message: "No photo was taken.".into(),
            suggestion: "Take a photo of your document or choose one from your gallery.".into(),
            retriable: false,
            severity: Severity::Retake,
        },

        ScanxError::InvalidArgument { .. } => HumanError {
            message: "The app sent something that isn't a photo.".into(),
            suggestion: "Try choosing the photo again.".into(),
            retriable: false,
            severity: Severity::Internal,
        },

        ScanxError::ImageTooLarge { .. } => HumanError {
            message: "This photo is too large to scan.".into(),
            suggestion: "Try a lower camera resolution, or crop the photo first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanxError::Decode(_) => HumanError {
            message: "We couldn't open this photo.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try a JPEG or PNG.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanxError::NoDocumentFound => HumanError {
            message: "We couldn't find a document in this photo.".into(),
            suggestion: "Place the page on a dark, plain surface so all four corners are visible, then try again.".into(),
            retriable: false,
            severity: Severity::Retake,
        },

        ScanxError::Encode(_) => HumanError {
            message: "We couldn't save the scanned page.".into(),
            suggestion: "Try again. If this keeps happening, choose PNG as the output format.".into(),
            retriable: true,
            severity: Severity::Internal,
        },

        ScanxError::Codec(_) | ScanxError::Bridge(_) => HumanError {
            message: "The scanner didn't respond properly.".into(),
            suggestion: "Close the app and open it again.".into(),
            retriable: true,
            severity: Severity::Internal,
        },

        ScanxError::Config(detail) => HumanError {
            message: "The scanner settings are invalid.".into(),
            suggestion: format!("Reset the scanner settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::Internal,
        },

        ScanxError::Io(_) | ScanxError::Serialization(_) => HumanError {
            message: "The app couldn't read or write a file.".into(),
            suggestion: "Check there is free storage space on this device, then try again.".into(),
            retriable: true,
            severity: Severity::Internal,
        },
    }
}

/// Humanize an error known only by its channel code, as received in an error
/// envelope. `None` for codes this crate never produces.
pub fn humanize_code(code: &str) -> Option<HumanError> {
    let err = match code {
        CODE_NO_IMAGE => ScanxError::NoImage,
        CODE_INVALID_ARGUMENT => ScanxError::InvalidArgument {
            argument: String::new(),
            reason: String::new(),
        },
        CODE_IMAGE_TOO_LARGE => ScanxError::ImageTooLarge { actual: 0, limit: 0 },
        CODE_DECODE_FAILED => ScanxError::Decode(String::new()),
        CODE_NO_DOCUMENT_FOUND => ScanxError::NoDocumentFound,
        CODE_ENCODE_FAILED => ScanxError::Encode(String::new()),
        CODE_INTERNAL => ScanxError::Bridge(String::new()),
        _ => return None,
    };
    Some(humanize_error(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_asks_for_a_photo() {
        let human = humanize_error(&ScanxError::NoImage);
        assert_eq!(human.severity, Severity::Retake);
        assert!(!human.retriable);
    }

    #[test]
    fn no_document_is_retake() {
        let human = humanize_error(&ScanxError::NoDocumentFound);
        assert_eq!(human.severity, Severity::Retake);
        assert!(human.suggestion.contains("corners"));
    }

    #[test]
    fn decode_failure_is_permanent() {
        let human = humanize_error(&ScanxError::Decode("unknown magic".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }

    #[test]
    fn config_detail_is_surfaced() {
        let human = humanize_error(&ScanxError::Config("jpeg_quality 0".into()));
        assert!(human.suggestion.contains("jpeg_quality 0"));
    }

    #[test]
    fn channel_codes_map_to_the_same_advice() {
        let by_code = humanize_code("NO_DOCUMENT_FOUND").expect("known code");
        let by_error = humanize_error(&ScanxError::NoDocumentFound);
        assert_eq!(by_code.suggestion, by_error.suggestion);
        assert_eq!(by_code.severity, Severity::Retake);

        assert_eq!(
            humanize_code("DECODE_FAILED").map(|h| h.severity),
            Some(Severity::Permanent)
        );
        assert!(humanize_code("SOMETHING_ELSE").is_none());
    }
}
