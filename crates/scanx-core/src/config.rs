// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScanxError};

/// How `processDocument` treats its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMode {
    /// Return the input bytes unchanged (no decoding).
    PassThrough,
    /// Detect the document, correct its perspective, and re-encode.
    #[default]
    Scan,
}

/// Encoding of the processed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Keep PNG or JPEG inputs in their format; anything else becomes PNG.
    #[default]
    SameAsInput,
    Png,
    Jpeg,
}

/// Post-correction clean-up applied to the warped page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Enhancement {
    #[default]
    None,
    Grayscale,
    /// Grayscale plus a contrast boost by the given factor.
    Contrast { factor: f32 },
    /// Adaptive local-mean threshold.
    Binarize { block_radius: u32, c: i32 },
    /// Global Otsu threshold.
    Otsu,
}

/// Parameters of the quadrilateral detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Longest side, in pixels, of the downscaled working copy.
    pub working_size: u32,
    /// Gaussian blur sigma applied before edge detection.
    pub blur_sigma: f32,
    /// Canny low hysteresis threshold.
    pub canny_low: f32,
    /// Canny high hysteresis threshold.
    pub canny_high: f32,
    /// Minimum fraction of the image area a document quad must cover.
    pub min_area_ratio: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
    /// Try Hough line intersection when no contour candidate is found.
    pub hough_fallback: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            working_size: 500,
            blur_sigma: 1.5,
            canny_low: 30.0,
            canny_high: 90.0,
            min_area_ratio: 0.10,
            approx_epsilon_ratio: 0.02,
            hough_fallback: true,
        }
    }
}

/// Persistent scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ProcessingMode,
    pub output_format: OutputFormat,
    /// JPEG quality (1-100) when the output is JPEG.
    pub jpeg_quality: u8,
    /// Inputs larger than this are rejected before decoding.
    pub max_input_bytes: usize,
    /// Longest side of the corrected output, in pixels.
    pub max_output_side: u32,
    /// Use the whole frame when no document is detected instead of failing.
    pub fallback_to_full_image: bool,
    pub enhancement: Enhancement,
    pub detection: DetectionConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::Scan,
            output_format: OutputFormat::SameAsInput,
            jpeg_quality: 90,
            max_input_bytes: 32 * 1024 * 1024,
            max_output_side: 4096,
            fallback_to_full_image: false,
            enhancement: Enhancement::None,
            detection: DetectionConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&data)?;
        config.validate()?;
        info!(path = %path.display(), mode = ?config.mode, "Scan configuration loaded");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "Scan configuration saved");
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ScanxError::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_input_bytes == 0 {
            return Err(ScanxError::Config("max_input_bytes must be positive".into()));
        }
        if self.max_output_side < 16 {
            return Err(ScanxError::Config(format!(
                "max_output_side must be at least 16, got {}",
                self.max_output_side
            )));
        }

        let det = &self.detection;
        if det.working_size < 64 {
            return Err(ScanxError::Config(format!(
                "detection.working_size must be at least 64, got {}",
                det.working_size
            )));
        }
        if !(det.blur_sigma > 0.0) {
            return Err(ScanxError::Config("detection.blur_sigma must be positive".into()));
        }
        if !(det.canny_low > 0.0 && det.canny_low <= det.canny_high) {
            return Err(ScanxError::Config(format!(
                "detection canny thresholds must satisfy 0 < low <= high, got {} / {}",
                det.canny_low, det.canny_high
            )));
        }
        if !(det.min_area_ratio > 0.0 && det.min_area_ratio < 1.0) {
            return Err(ScanxError::Config(format!(
                "detection.min_area_ratio must be in (0, 1), got {}",
                det.min_area_ratio
            )));
        }
        if !(det.approx_epsilon_ratio > 0.0 && det.approx_epsilon_ratio < 0.5) {
            return Err(ScanxError::Config(format!(
                "detection.approx_epsilon_ratio must be in (0, 0.5), got {}",
                det.approx_epsilon_ratio
            )));
        }

        if let Enhancement::Contrast { factor } = self.enhancement {
            if !(factor > 0.0) {
                return Err(ScanxError::Config("contrast factor must be positive".into()));
            }
        }
        Ok(())
    }
}
