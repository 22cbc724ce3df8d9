// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page enhancement: grayscale, contrast boosting, and adaptive or global
// binarization of a perspective-corrected page.

use image::{DynamicImage, GrayImage, Luma};
use scanx_core::Enhancement;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// Cleans up a rectified page for legibility.
///
/// Every step consumes the enhancer and returns a new one, so steps chain the
/// same way `ImageProcessor` transformations do.
pub struct ScanEnhancer {
    image: DynamicImage,
}

impl ScanEnhancer {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Consume the enhancer and return the underlying image.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Run the configured enhancement.
    #[instrument(skip(self))]
    pub fn apply(self, enhancement: Enhancement) -> Self {
        match enhancement {
            Enhancement::None => self,
            Enhancement::Grayscale => self.grayscale(),
            Enhancement::Contrast { factor } => self.grayscale().boost_contrast(factor),
            Enhancement::Binarize { block_radius, c } => self.binarize(block_radius, c),
            Enhancement::Otsu => self.binarize_otsu(),
        }
    }

    pub fn grayscale(self) -> Self {
        let image = ImageProcessor::from_dynamic(self.image).grayscale().into_dynamic();
        Self { image }
    }

    pub fn boost_contrast(self, factor: f32) -> Self {
        let image = ImageProcessor::from_dynamic(self.image)
            .adjust_contrast(factor)
            .into_dynamic();
        Self { image }
    }

    // -- Binarization ---------------------------------------------------------

    /// Adaptive thresholding to a black-and-white page.
    ///
    /// Each pixel is compared against the mean intensity of its
    /// `block_radius` neighbourhood minus `c`: darker pixels become black,
    /// the rest white. A typical `block_radius` is 15 and `c` is 10.
    pub fn binarize(self, block_radius: u32, c: i32) -> Self {
        info!(block_radius, c, "Applying adaptive binarization");

        let gray = self.image.to_luma8();
        let (width, height) = gray.dimensions();
        let integral = IntegralImage::new(&gray);

        let output = GrayImage::from_fn(width, height, |x, y| {
            let local_mean = integral.mean_around(x, y, block_radius);
            let threshold = (local_mean as i32 - c).clamp(0, 255) as u8;
            let value = gray.get_pixel(x, y).0[0];
            Luma([if value < threshold { 0 } else { 255 }])
        });

        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }

    /// Global binarization at the Otsu threshold of the page histogram.
    pub fn binarize_otsu(self) -> Self {
        let gray = self.image.to_luma8();
        let threshold = otsu_threshold(&gray);
        debug!(threshold, "Otsu threshold computed");
        Self {
            image: DynamicImage::ImageLuma8(threshold_image(&gray, threshold)),
        }
    }
}

/// Pixels below `threshold` become black, the rest white.
pub(crate) fn threshold_image(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = gray.clone();
    for p in output.pixels_mut() {
        p.0[0] = if p.0[0] < threshold { 0 } else { 255 };
    }
    output
}

// -- Integral image -----------------------------------------------------------

/// Summed-area table with a zero-padded first row and column.
///
/// `table[y * (width + 1) + x]` holds the sum of all pixels strictly above
/// and to the left of `(x, y)`.
struct IntegralImage {
    table: Vec<u64>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = (width + 1) as usize;
        let mut table = vec![0u64; stride * (height + 1) as usize];

        for y in 0..height as usize {
            let mut row_sum = 0u64;
            for x in 0..width as usize {
                row_sum += gray.get_pixel(x as u32, y as u32).0[0] as u64;
                table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
            }
        }

        Self { table, width, height }
    }

    /// Mean of the square window of `radius` around `(cx, cy)`, clipped to
    /// the image.
    fn mean_around(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let stride = (self.width + 1) as usize;
        let x1 = cx.saturating_sub(radius) as usize;
        let y1 = cy.saturating_sub(radius) as usize;
        let x2 = (cx.saturating_add(radius).saturating_add(1)).min(self.width) as usize;
        let y2 = (cy.saturating_add(radius).saturating_add(1)).min(self.height) as usize;

        let area = ((x2 - x1) * (y2 - y1)) as f64;
        if area == 0.0 {
            return 128.0;
        }

        let t = &self.table;
        let sum = t[y2 * stride + x2] as f64 - t[y1 * stride + x2] as f64
            - t[y2 * stride + x1] as f64
            + t[y1 * stride + x1] as f64;
        sum / area
    }
}

/// Otsu threshold: the gray level maximising between-class variance.
pub(crate) fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0u64;
    let mut max_variance = 0.0f64;
    let mut best = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;
        let variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            // Pixels at `t` belong to the background class, so the split
            // point is the next level up.
            best = (t + 1).min(255) as u8;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn two_tone(width: u32, height: u32, dark: u8, light: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            Luma([if x < width / 2 { dark } else { light }])
        })
    }

    #[test]
    fn otsu_splits_two_tone_image() {
        let gray = two_tone(20, 10, 40, 200);
        let t = otsu_threshold(&gray);
        assert!(t > 40 && t <= 200, "threshold {t} should separate 40 from 200");
    }

    #[test]
    fn otsu_binarization_is_black_and_white() {
        let img = DynamicImage::ImageLuma8(two_tone(20, 10, 40, 200));
        let out = ScanEnhancer::new(img).binarize_otsu().into_dynamic().to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(19, 0).0[0], 255);
    }

    #[test]
    fn adaptive_binarization_keeps_dark_text_on_light_page() {
        let mut page = GrayImage::from_pixel(60, 60, Luma([220u8]));
        for y in 28..32 {
            for x in 10..50 {
                page.put_pixel(x, y, Luma([30u8]));
            }
        }
        let out = ScanEnhancer::new(DynamicImage::ImageLuma8(page))
            .binarize(15, 10)
            .into_dynamic()
            .to_luma8();
        assert_eq!(out.get_pixel(30, 30).0[0], 0, "stroke should be black");
        assert_eq!(out.get_pixel(5, 5).0[0], 255, "paper should be white");
    }

    #[test]
    fn integral_mean_of_uniform_image_is_its_value() {
        let gray = GrayImage::from_pixel(16, 16, Luma([77u8]));
        let integral = IntegralImage::new(&gray);
        assert!((integral.mean_around(0, 0, 3) - 77.0).abs() < 1e-9);
        assert!((integral.mean_around(15, 15, 100) - 77.0).abs() < 1e-9);
    }

    #[test]
    fn none_enhancement_leaves_colour_untouched() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 200, 30])));
        let out = ScanEnhancer::new(img.clone()).apply(Enhancement::None).into_dynamic();
        assert_eq!(out, img);
    }

    #[test]
    fn contrast_enhancement_outputs_grayscale() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 200, 30])));
        let out = ScanEnhancer::new(img)
            .apply(Enhancement::Contrast { factor: 1.4 })
            .into_dynamic();
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }
}
