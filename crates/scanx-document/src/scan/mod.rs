// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning stages: quadrilateral detection, perspective warp, and page
// enhancement (grayscale, contrast, binarization).

pub mod detect;
pub mod enhance;
pub mod warp;

pub use detect::QuadDetector;
pub use enhance::ScanEnhancer;
pub use warp::rectify;
