// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective correction: maps a detected document quad onto an upright
// rectangle.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanx_core::error::{Result, ScanxError};
use scanx_core::Quad;
use tracing::{debug, instrument};

/// Size of the rectified page: the longer of each pair of opposite quad
/// edges, shrunk to fit `max_side` while keeping the aspect ratio.
pub fn output_size(quad: &Quad, max_side: u32) -> (u32, u32) {
    let (w, h) = quad.rectified_size();
    let longest = w.max(h);
    let factor = if longest > max_side as f32 {
        max_side as f32 / longest
    } else {
        1.0
    };
    let out_w = ((w * factor).round() as u32).clamp(1, max_side);
    let out_h = ((h * factor).round() as u32).clamp(1, max_side);
    (out_w, out_h)
}

/// Warp the region of `image` inside `quad` onto an upright rectangle.
///
/// Pixels mapping outside the source are filled white. Grayscale inputs stay
/// grayscale and alpha is kept only when the input has it.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn rectify(image: &DynamicImage, quad: &Quad, max_side: u32) -> Result<DynamicImage> {
    if quad.area() < 1.0 {
        debug!(?quad, "Quad has no area");
        return Err(ScanxError::NoDocumentFound);
    }

    let (out_w, out_h) = output_size(quad, max_side);
    let (w, h) = (out_w as f32, out_h as f32);
    let dest = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    // `from_control_points` maps the source quad onto `dest`; `warp_into`
    // inverts it to sample the source for each output pixel.
    let projection = Projection::from_control_points(quad.as_tuples(), dest).ok_or_else(|| {
        debug!(?quad, "Degenerate quad, no projective transform");
        ScanxError::NoDocumentFound
    })?;

    let rectified = match image {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = GrayImage::new(out_w, out_h);
            warp_into(gray, &projection, Interpolation::Bilinear, Luma([255u8]), &mut out);
            DynamicImage::ImageLuma8(out)
        }
        other if other.color().has_alpha() => {
            let mut out = RgbaImage::new(out_w, out_h);
            let white = Rgba([255u8, 255, 255, 255]);
            warp_into(&other.to_rgba8(), &projection, Interpolation::Bilinear, white, &mut out);
            DynamicImage::ImageRgba8(out)
        }
        other => {
            let mut out = RgbImage::new(out_w, out_h);
            let white = Rgb([255u8, 255, 255]);
            warp_into(&other.to_rgb8(), &projection, Interpolation::Bilinear, white, &mut out);
            DynamicImage::ImageRgb8(out)
        }
    };

    debug!(out_w, out_h, "Perspective correction applied");
    Ok(rectified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanx_core::Point;

    fn quad(c: [(f32, f32); 4]) -> Quad {
        Quad {
            top_left: Point::new(c[0].0, c[0].1),
            top_right: Point::new(c[1].0, c[1].1),
            bottom_right: Point::new(c[2].0, c[2].1),
            bottom_left: Point::new(c[3].0, c[3].1),
        }
    }

    #[test]
    fn output_size_uses_longer_edges() {
        let q = quad([(10.0, 10.0), (110.0, 10.0), (120.0, 210.0), (0.0, 210.0)]);
        let (w, h) = output_size(&q, 4096);
        assert_eq!(w, 120);
        assert!(h >= 200);
    }

    #[test]
    fn output_size_is_clamped_keeping_aspect() {
        let q = quad([(0.0, 0.0), (2000.0, 0.0), (2000.0, 1000.0), (0.0, 1000.0)]);
        assert_eq!(output_size(&q, 500), (500, 250));
    }

    #[test]
    fn axis_aligned_quad_crops_the_region() {
        // Left half black, right half white; crop the right half only.
        let img = GrayImage::from_fn(100, 50, |x, _| Luma([if x < 50 { 0 } else { 255 }]));
        let q = quad([(50.0, 0.0), (100.0, 0.0), (100.0, 50.0), (50.0, 50.0)]);

        let out = rectify(&DynamicImage::ImageLuma8(img), &q, 4096).unwrap();
        assert_eq!((out.width(), out.height()), (50, 50));
        let gray = out.to_luma8();
        assert!(gray.get_pixel(25, 25).0[0] > 200, "centre should be white");
    }

    #[test]
    fn colour_input_stays_colour_without_alpha() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 60, Rgb([200, 10, 10])));
        let q = quad([(10.0, 10.0), (70.0, 12.0), (68.0, 50.0), (12.0, 48.0)]);
        let out = rectify(&img, &q, 4096).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
        let px = out.to_rgb8().get_pixel(out.width() / 2, out.height() / 2).0;
        assert!(px[0] > 150 && px[1] < 60, "expected red, got {px:?}");
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let q = quad([(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert!(matches!(rectify(&img, &q, 4096), Err(ScanxError::NoDocumentFound)));
    }
}
