// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document scanner: the `processDocument` pipeline.
//
// Decode the photo, find the page, flatten it, optionally clean it up, and
// encode it again. In pass-through mode the input bytes are returned as-is.

use scanx_core::error::{Result, ScanxError};
use scanx_core::{
    Detection, DetectionMethod, ImageKind, OutputFormat, ProcessingMode, Quad, ScanConfig,
    ScanReport,
};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::scan::detect::QuadDetector;
use crate::scan::enhance::ScanEnhancer;
use crate::scan::warp::rectify;

/// Stateless document processor.
///
/// Holds only its configuration, so one instance can serve concurrent calls
/// from any thread.
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    config: ScanConfig,
    detector: QuadDetector,
}

impl DocumentScanner {
    /// Build a scanner, rejecting an invalid configuration.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let detector = QuadDetector::new(config.detection.clone());
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Process an encoded photo into an encoded, perspective-corrected page.
    pub fn process(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.process_with_report(data).map(|(bytes, _)| bytes)
    }

    /// [`DocumentScanner::process`], also returning what was done.
    #[instrument(skip(self, data), fields(data_len = data.len(), mode = ?self.config.mode))]
    pub fn process_with_report(&self, data: &[u8]) -> Result<(Vec<u8>, ScanReport)> {
        if data.is_empty() {
            return Err(ScanxError::NoImage);
        }

        match self.config.mode {
            ProcessingMode::PassThrough => {
                debug!("Pass-through mode, returning input unchanged");
                let report = ScanReport {
                    mode: ProcessingMode::PassThrough,
                    input_bytes: data.len(),
                    input_kind: None,
                    input_size: None,
                    detection: None,
                    enhancement: self.config.enhancement,
                    output_kind: None,
                    output_size: None,
                    output_bytes: data.len(),
                };
                Ok((data.to_vec(), report))
            }
            ProcessingMode::Scan => self.scan(data),
        }
    }

    /// Locate the document without transforming the image.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn detect(&self, data: &[u8]) -> Result<Detection> {
        let processor = self.decode(data)?;
        self.find_document(&processor)
    }

    fn scan(&self, data: &[u8]) -> Result<(Vec<u8>, ScanReport)> {
        let processor = self.decode(data)?;
        let input_kind = processor.kind();
        let input_size = (processor.width(), processor.height());

        let detection = self.find_document(&processor)?;
        let page = rectify(
            processor.as_dynamic(),
            &detection.quad,
            self.config.max_output_side,
        )?;
        let page = ScanEnhancer::new(page)
            .apply(self.config.enhancement)
            .into_dynamic();

        let page = ImageProcessor::from_dynamic(page);
        let output_size = (page.width(), page.height());
        let target = match self.config.output_format {
            OutputFormat::SameAsInput => input_kind,
            OutputFormat::Png => ImageKind::Png,
            OutputFormat::Jpeg => ImageKind::Jpeg,
        };
        let (bytes, output_kind) = page.encode(target, self.config.jpeg_quality)?;

        info!(
            method = ?detection.method,
            out_w = output_size.0,
            out_h = output_size.1,
            ?output_kind,
            output_bytes = bytes.len(),
            "Document scanned"
        );

        let report = ScanReport {
            mode: ProcessingMode::Scan,
            input_bytes: data.len(),
            input_kind: Some(input_kind),
            input_size: Some(input_size),
            detection: Some(detection),
            enhancement: self.config.enhancement,
            output_kind: Some(output_kind),
            output_size: Some(output_size),
            output_bytes: bytes.len(),
        };
        Ok((bytes, report))
    }

    fn decode(&self, data: &[u8]) -> Result<ImageProcessor> {
        if data.is_empty() {
            return Err(ScanxError::NoImage);
        }
        if data.len() > self.config.max_input_bytes {
            return Err(ScanxError::ImageTooLarge {
                actual: data.len(),
                limit: self.config.max_input_bytes,
            });
        }
        ImageProcessor::from_bytes(data)
    }

    fn find_document(&self, processor: &ImageProcessor) -> Result<Detection> {
        match self.detector.detect(processor.as_dynamic()) {
            Some(detection) => Ok(detection),
            None if self.config.fallback_to_full_image => {
                warn!("No document found; using the full frame");
                Ok(Detection {
                    quad: Quad::full_frame(processor.width(), processor.height()),
                    method: DetectionMethod::FullFrame,
                })
            }
            None => Err(ScanxError::NoDocumentFound),
        }
    }
}
