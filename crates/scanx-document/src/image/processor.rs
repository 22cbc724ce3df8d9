// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: format sniffing, decode, downscale, grayscale/contrast,
// and re-encoding. Operates on in-memory images using the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use scanx_core::error::{Result, ScanxError};
use scanx_core::ImageKind;
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so calls
/// chain:
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&jpeg)?
///     .grayscale()
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
    /// Container format the image was decoded from.
    kind: ImageKind,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, WebP, ...).
    ///
    /// The container format is sniffed from the magic bytes, not trusted from
    /// any caller-supplied name.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = image::guess_format(data)
            .map_err(|err| ScanxError::Decode(format!("unrecognised image format: {err}")))?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|err| ScanxError::Decode(format!("{format:?}: {err}")))?;
        let kind = kind_of(format);
        debug!(
            ?kind,
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img, kind })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image,
            kind: ImageKind::Other,
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Format the image was decoded from (`Other` for wrapped images).
    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Convert the image to grayscale (luma).
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
            kind: self.kind,
        }
    }

    /// Adjust contrast by a factor around mid-gray. Values > 1.0 increase
    /// contrast; 1.0 is a no-op.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let adjust = |channel: u8| -> u8 {
            let val = factor * (channel as f32 - 128.0) + 128.0;
            val.clamp(0.0, 255.0) as u8
        };

        let image = match self.image {
            DynamicImage::ImageLuma8(mut gray) => {
                gray.pixels_mut().for_each(|p| p.0[0] = adjust(p.0[0]));
                DynamicImage::ImageLuma8(gray)
            }
            other => {
                let mut rgba = other.to_rgba8();
                for p in rgba.pixels_mut() {
                    let image::Rgba([r, g, b, a]) = *p;
                    *p = image::Rgba([adjust(r), adjust(g), adjust(b), a]);
                }
                DynamicImage::ImageRgba8(rgba)
            }
        };

        Self {
            image,
            kind: self.kind,
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| ScanxError::Encode(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// JPEG has no alpha channel; transparency is dropped.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        let result = match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.write_with_encoder(encoder),
            other => other.to_rgb8().write_with_encoder(encoder),
        };
        result.map_err(|err| ScanxError::Encode(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode as `kind`. Only PNG and JPEG are written; any other kind is
    /// written as PNG. Returns the bytes and the kind actually used.
    pub fn encode(&self, kind: ImageKind, jpeg_quality: u8) -> Result<(Vec<u8>, ImageKind)> {
        match kind {
            ImageKind::Jpeg => Ok((self.to_jpeg_bytes(jpeg_quality)?, ImageKind::Jpeg)),
            _ => Ok((self.to_png_bytes()?, ImageKind::Png)),
        }
    }
}

/// `image` shrunk so its longest side is at most `max_side`, or `None` when
/// it already fits.
pub(crate) fn downscale(image: &DynamicImage, max_side: u32) -> Option<DynamicImage> {
    let (w, h) = (image.width(), image.height());
    if w.max(h) <= max_side {
        return None;
    }
    let resized = image.resize(max_side, max_side, FilterType::Triangle);
    debug!(
        from_w = w,
        from_h = h,
        new_w = resized.width(),
        new_h = resized.height(),
        "Downscaled image"
    );
    Some(resized)
}

/// Map the `image` crate's format to the scanner's format kind.
fn kind_of(format: ImageFormat) -> ImageKind {
    match format {
        ImageFormat::Png => ImageKind::Png,
        ImageFormat::Jpeg => ImageKind::Jpeg,
        ImageFormat::Gif => ImageKind::Gif,
        ImageFormat::WebP => ImageKind::WebP,
        ImageFormat::Bmp => ImageKind::Bmp,
        ImageFormat::Tiff => ImageKind::Tiff,
        _ => ImageKind::Other,
    }
}
