// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `scanx_cv` channel: `processDocument` over the document scanner.

use std::sync::Arc;

use scanx_core::config::ScanConfig;
use scanx_core::error::{Result, ScanxError};
use scanx_document::DocumentScanner;
use tracing::{debug, info};

use crate::channel::{ChannelRegistry, MethodCall, MethodResult};
use crate::traits::MethodCallHandler;
use crate::value::MessageValue;

/// Channel name shared with the app shell.
pub const CHANNEL: &str = "scanx_cv";

/// The only method on [`CHANNEL`].
pub const METHOD_PROCESS_DOCUMENT: &str = "processDocument";

/// Argument key carrying the encoded image.
pub const ARG_IMAGE: &str = "image";

/// A call on `scanx_cv`, parsed from its method name.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRequest<'a> {
    /// `image` is `None` when absent or null.
    ProcessDocument { image: Option<&'a MessageValue> },
    Unknown(&'a str),
}

impl<'a> ChannelRequest<'a> {
    pub fn parse(call: &'a MethodCall) -> Self {
        match call.method.as_str() {
            METHOD_PROCESS_DOCUMENT => ChannelRequest::ProcessDocument {
                image: call.argument(ARG_IMAGE),
            },
            other => ChannelRequest::Unknown(other),
        }
    }
}

/// Native handler for the `scanx_cv` channel.
#[derive(Debug, Clone)]
pub struct ScanxCvHandler {
    scanner: DocumentScanner,
}

impl ScanxCvHandler {
    pub fn new(config: ScanConfig) -> Result<Self> {
        Ok(Self {
            scanner: DocumentScanner::new(config)?,
        })
    }

    pub fn scanner(&self) -> &DocumentScanner {
        &self.scanner
    }

    fn process_document(&self, image: Option<&MessageValue>) -> Result<Vec<u8>> {
        match image {
            None => Err(ScanxError::NoImage),
            Some(MessageValue::Bytes(bytes)) => self.scanner.process(bytes),
            Some(other) => Err(ScanxError::InvalidArgument {
                argument: ARG_IMAGE.into(),
                reason: format!("expected bytes, got {}", other.type_name()),
            }),
        }
    }
}

impl MethodCallHandler for ScanxCvHandler {
    fn on_method_call(&self, call: &MethodCall) -> MethodResult {
        match ChannelRequest::parse(call) {
            ChannelRequest::ProcessDocument { image } => self.process_document(image).into(),
            ChannelRequest::Unknown(method) => {
                debug!(method, "Unknown scanx_cv method");
                MethodResult::NotImplemented
            }
        }
    }
}

/// Install every native channel into `registry`. Called once by the owning
/// process at startup.
pub fn register_channels(registry: &mut ChannelRegistry, config: &ScanConfig) -> Result<()> {
    let handler = ScanxCvHandler::new(config.clone())?;
    registry.register(CHANNEL, Arc::new(handler));
    info!(mode = ?config.mode, "scanx_cv channel ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;
    use scanx_core::config::ProcessingMode;

    fn registry(mode: ProcessingMode) -> ChannelRegistry {
        let config = ScanConfig {
            mode,
            ..ScanConfig::default()
        };
        let mut registry = ChannelRegistry::new();
        register_channels(&mut registry, &config).unwrap();
        registry
    }

    fn process_call(image: MessageValue) -> MethodCall {
        MethodCall::new(
            METHOD_PROCESS_DOCUMENT,
            MessageValue::map([(ARG_IMAGE, image)]),
        )
    }

    fn no_image() -> MethodResult {
        MethodResult::Error {
            code: "NO_IMAGE".into(),
            message: Some("No image provided".into()),
            details: MessageValue::Null,
        }
    }

    fn page_photo_png() -> Vec<u8> {
        let mut img = RgbImage::from_pixel(400, 400, Rgb([25, 25, 30]));
        let page = [
            Point::new(90, 50),
            Point::new(300, 70),
            Point::new(320, 350),
            Point::new(70, 340),
        ];
        draw_polygon_mut(&mut img, &page, Rgb([240, 240, 235]));
        let mut out = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn pass_through_echoes_bytes() {
        let registry = registry(ProcessingMode::PassThrough);
        for payload in [vec![0u8], vec![1, 2, 3, 255], vec![42; 4096]] {
            let result = registry.dispatch(CHANNEL, &process_call(payload.clone().into()));
            assert_eq!(result, MethodResult::Success(MessageValue::Bytes(payload)));
        }
    }

    #[test]
    fn missing_image_is_no_image() {
        let registry = registry(ProcessingMode::PassThrough);
        let cases = [
            MethodCall::new(METHOD_PROCESS_DOCUMENT, MessageValue::Null),
            MethodCall::new(METHOD_PROCESS_DOCUMENT, MessageValue::map::<&str>([])),
            process_call(MessageValue::Null),
            process_call(MessageValue::Bytes(Vec::new())),
        ];
        for call in &cases {
            assert_eq!(registry.dispatch(CHANNEL, call), no_image());
        }
    }

    #[test]
    fn wrong_argument_type_is_invalid_argument() {
        let registry = registry(ProcessingMode::PassThrough);
        let result = registry.dispatch(CHANNEL, &process_call("not bytes".into()));
        match result {
            MethodResult::Error { code, message, .. } => {
                assert_eq!(code, "INVALID_ARGUMENT");
                assert!(message.unwrap().contains("string"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn other_methods_are_not_implemented() {
        let registry = registry(ProcessingMode::Scan);
        for method in ["getPlatformVersion", "processdocument", ""] {
            let call = MethodCall::new(method, MessageValue::map([(ARG_IMAGE, vec![1u8].into())]));
            assert_eq!(registry.dispatch(CHANNEL, &call), MethodResult::NotImplemented);
        }
    }

    #[test]
    fn scan_mode_returns_processed_image() {
        let registry = registry(ProcessingMode::Scan);
        let input = page_photo_png();
        let result = registry.dispatch(CHANNEL, &process_call(input.clone().into()));
        let MethodResult::Success(MessageValue::Bytes(output)) = result else {
            panic!("expected bytes, got {result:?}");
        };
        assert_ne!(output, input);
        let decoded = image::load_from_memory(&output).unwrap();
        assert!(decoded.width() < 400 && decoded.height() < 400);
    }

    #[test]
    fn scan_mode_reports_decode_failure() {
        let registry = registry(ProcessingMode::Scan);
        let result = registry.dispatch(CHANNEL, &process_call(vec![1u8, 2, 3].into()));
        assert!(matches!(result, MethodResult::Error { ref code, .. } if code == "DECODE_FAILED"));
    }

    #[test]
    fn repeated_calls_are_identical() {
        for mode in [ProcessingMode::PassThrough, ProcessingMode::Scan] {
            let registry = registry(mode);
            let call = process_call(page_photo_png().into());
            let first = registry.dispatch(CHANNEL, &call);
            let second = registry.dispatch(CHANNEL, &call);
            assert!(first.is_success());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn encoded_round_trip_through_registry() {
        let registry = registry(ProcessingMode::PassThrough);
        let message = crate::codec::encode_method_call(&process_call(vec![5u8, 6, 7].into()));
        let reply = registry.handle_message(CHANNEL, &message).unwrap();
        assert_eq!(
            crate::codec::decode_reply(&reply).unwrap(),
            MethodResult::Success(MessageValue::Bytes(vec![5, 6, 7]))
        );

        let unknown = crate::codec::encode_method_call(&MethodCall::new("nope", MessageValue::Null));
        assert!(registry.handle_message(CHANNEL, &unknown).unwrap().is_empty());
    }

    #[test]
    fn parse_is_exhaustive_over_method_names() {
        let call = process_call(vec![1u8].into());
        assert!(matches!(
            ChannelRequest::parse(&call),
            ChannelRequest::ProcessDocument { image: Some(MessageValue::Bytes(_)) }
        ));
        let call = MethodCall::new("other", MessageValue::Null);
        assert_eq!(ChannelRequest::parse(&call), ChannelRequest::Unknown("other"));
    }
}
