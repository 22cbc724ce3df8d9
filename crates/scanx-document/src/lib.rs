// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanx-document: Document image processing for the scanx scanner.
//
// Provides image decode/encode (`image`), document quadrilateral detection
// (contours with a Hough-line fallback), perspective correction, optional
// page enhancement, and the `DocumentScanner` pipeline that ties them together.

pub mod image;
pub mod scan;
pub mod scanner;

// Re-export the primary structs so callers can use `scanx_document::DocumentScanner` etc.
pub use self::image::processor::ImageProcessor;
pub use scan::detect::QuadDetector;
pub use scan::enhance::ScanEnhancer;
pub use scanner::DocumentScanner;
