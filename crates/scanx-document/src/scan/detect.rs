// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document quadrilateral detection.
//
// Two detectors run on a downscaled grayscale copy of the photo:
//
// 1. Contours: outer contours of the closed Canny edge map and of the Otsu
//    foreground mask are reduced to their convex hull and simplified with
//    Douglas-Peucker. Convex four-sided results are candidates; the largest
//    one wins.
// 2. Hough lines (fallback): the extreme roughly-horizontal and
//    roughly-vertical lines are intersected into a quad.
//
// The winning quad is scaled back to source-image coordinates.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length, convex_hull};
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use imageproc::morphology::dilate;
use imageproc::point::Point as PixelPoint;
use scanx_core::{Detection, DetectionConfig, DetectionMethod, Point, Quad};
use tracing::{debug, info, instrument, warn};

use super::enhance::{otsu_threshold, threshold_image};
use crate::image::processor::downscale;

/// Corners closer than this to a frame corner count as sitting on it.
const FRAME_MARGIN: f32 = 3.0;

/// Locates the document boundary in a photo.
#[derive(Debug, Clone, Default)]
pub struct QuadDetector {
    config: DetectionConfig,
}

impl QuadDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Find the document quad in `image`, in `image`'s pixel coordinates.
    ///
    /// Returns `None` when neither detector produces a convex quad covering
    /// at least `min_area_ratio` of the frame.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &DynamicImage) -> Option<Detection> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let (gray, scale) = self.working_gray(image);
        let (w, h) = gray.dimensions();
        debug!(work_w = w, work_h = h, scale, "Prepared working image");

        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);

        // Close one-pixel gaps so the page outline forms a single contour.
        let closed = dilate(&edges, Norm::LInf, 1);
        let mask = threshold_image(&blurred, otsu_threshold(&blurred));

        let best_contour = contour_quads(&closed, self.config.approx_epsilon_ratio)
            .into_iter()
            .chain(contour_quads(&mask, self.config.approx_epsilon_ratio))
            .filter_map(|quad| self.accept(quad, w, h))
            .max_by(|a, b| a.area().total_cmp(&b.area()));

        let found = match best_contour {
            Some(quad) => Some((quad, DetectionMethod::Contour)),
            None if self.config.hough_fallback => {
                debug!("No contour candidate; trying Hough lines");
                hough_quad(&edges)
                    .and_then(|quad| self.accept(quad, w, h))
                    .map(|quad| (quad, DetectionMethod::HoughLines))
            }
            None => None,
        };

        match found {
            Some((quad, method)) => {
                let quad = quad.scale(scale);
                info!(?method, area = quad.area(), "Document quadrilateral detected");
                Some(Detection { quad, method })
            }
            None => {
                warn!("No document quadrilateral found");
                None
            }
        }
    }

    /// Grayscale working copy no larger than `working_size`, plus the factor
    /// mapping working coordinates back to the source.
    fn working_gray(&self, image: &DynamicImage) -> (GrayImage, f32) {
        match downscale(image, self.config.working_size) {
            Some(small) => {
                let scale = image.width() as f32 / small.width() as f32;
                (small.to_luma8(), scale)
            }
            None => (image.to_luma8(), 1.0),
        }
    }

    /// Validate a candidate against the working frame, clamping corners that
    /// overshoot it slightly.
    fn accept(&self, quad: Quad, width: u32, height: u32) -> Option<Quad> {
        let (w, h) = (width as f32, height as f32);
        let (slack_x, slack_y) = (w * 0.05, h * 0.05);

        let mut corners = quad.corners();
        for p in corners.iter_mut() {
            if p.x < -slack_x || p.x > w + slack_x || p.y < -slack_y || p.y > h + slack_y {
                return None;
            }
            p.x = p.x.clamp(0.0, w);
            p.y = p.y.clamp(0.0, h);
        }
        let quad = Quad::from_unordered(corners);

        if !quad.is_convex() {
            return None;
        }
        if quad.area() < w * h * self.config.min_area_ratio {
            return None;
        }
        if hugs_frame(&quad, w, h) {
            return None;
        }
        Some(quad)
    }
}

/// Whether each corner sits on its own frame corner, i.e. the "document" is
/// the photo itself. Pages that merely touch the frame edges are kept.
fn hugs_frame(quad: &Quad, w: f32, h: f32) -> bool {
    let (right, bottom) = (w - 1.0, h - 1.0);
    let frame = [
        Point::new(0.0, 0.0),
        Point::new(right, 0.0),
        Point::new(right, bottom),
        Point::new(0.0, bottom),
    ];
    quad.corners()
        .iter()
        .zip(frame.iter())
        .all(|(corner, frame_corner)| {
            (corner.x - frame_corner.x).abs() <= FRAME_MARGIN
                && (corner.y - frame_corner.y).abs() <= FRAME_MARGIN
        })
}

// -- Contour detector ---------------------------------------------------------

/// Four-sided convex approximations of the outer contours of `binary`.
fn contour_quads(binary: &GrayImage, epsilon_ratio: f64) -> Vec<Quad> {
    let contours = find_contours::<i32>(binary);
    let mut quads = Vec::new();

    for contour in contours.iter().filter(|c| c.border_type == BorderType::Outer) {
        if contour.points.len() < 4 {
            continue;
        }
        let hull = convex_hull(&contour.points[..]);
        if hull.len() < 4 {
            continue;
        }
        let epsilon = arc_length(&hull, true) * epsilon_ratio;
        if epsilon <= 0.0 {
            continue;
        }
        let polygon = simplify_closed(&hull, epsilon);
        if let [a, b, c, d] = polygon[..] {
            quads.push(Quad::from_unordered([a, b, c, d]));
        }
    }

    debug!(contours = contours.len(), quads = quads.len(), "Contour candidates");
    quads
}

/// Douglas-Peucker on a closed polygon.
///
/// The ring is cut at its first vertex and the vertex farthest from it, each
/// half is simplified as an open curve, and vertices left lying on a straight
/// run are dropped.
fn simplify_closed(ring: &[PixelPoint<i32>], epsilon: f64) -> Vec<Point> {
    let first = ring[0];
    let far = (1..ring.len())
        .max_by_key(|&i| {
            let dx = (ring[i].x - first.x) as i64;
            let dy = (ring[i].y - first.y) as i64;
            dx * dx + dy * dy
        })
        .unwrap_or(0);
    if far == 0 {
        return Vec::new();
    }

    let mut second_half: Vec<PixelPoint<i32>> = ring[far..].to_vec();
    second_half.push(first);

    let mut vertices = approximate_polygon_dp(&ring[..=far], epsilon, false);
    vertices.pop();
    let mut rest = approximate_polygon_dp(&second_half, epsilon, false);
    rest.pop();
    vertices.append(&mut rest);

    let points: Vec<Point> = vertices
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect();
    drop_collinear(points, epsilon as f32)
}

/// Remove vertices within `epsilon` of the line through their neighbours.
fn drop_collinear(mut points: Vec<Point>, epsilon: f32) -> Vec<Point> {
    let mut i = 0;
    while points.len() > 3 && i < points.len() {
        let n = points.len();
        let prev = points[(i + n - 1) % n];
        let next = points[(i + 1) % n];
        if distance_to_line(&points[i], &prev, &next) < epsilon {
            points.remove(i);
        } else {
            i += 1;
        }
    }
    points
}

fn distance_to_line(p: &Point, a: &Point, b: &Point) -> f32 {
    let len = a.distance(b);
    if len < f32::EPSILON {
        return p.distance(a);
    }
    ((b.x - a.x) * (a.y - p.y) - (a.x - p.x) * (b.y - a.y)).abs() / len
}

// -- Hough detector -----------------------------------------------------------

/// Quad bounded by the outermost roughly-horizontal and roughly-vertical
/// Hough lines of `edges`.
fn hough_quad(edges: &GrayImage) -> Option<Quad> {
    let (w, h) = edges.dimensions();

    // Votes scale with resolution; suppression avoids near-duplicate lines.
    let diagonal = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt();
    let vote_threshold = (diagonal * 0.25).max(40.0) as u32;
    let lines = detect_lines(
        edges,
        LineDetectionOptions {
            vote_threshold,
            suppression_radius: 8,
        },
    );
    debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

    let (horizontal, vertical) = classify_lines(&lines);
    if horizontal.len() < 2 || vertical.len() < 2 {
        debug!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            "Insufficient horizontal/vertical lines"
        );
        return None;
    }

    let (mid_x, mid_y) = (w as f64 / 2.0, h as f64 / 2.0);
    let row_at_mid = |l: &PolarLine| y_at(l, mid_x);
    let col_at_mid = |l: &PolarLine| x_at(l, mid_y);

    let top = extreme(&horizontal, row_at_mid, false)?;
    let bottom = extreme(&horizontal, row_at_mid, true)?;
    let left = extreme(&vertical, col_at_mid, false)?;
    let right = extreme(&vertical, col_at_mid, true)?;

    let corners = [
        intersect_polar_lines(&top, &left)?,
        intersect_polar_lines(&top, &right)?,
        intersect_polar_lines(&bottom, &right)?,
        intersect_polar_lines(&bottom, &left)?,
    ];
    Some(Quad::from_unordered(corners))
}

/// Split lines into roughly horizontal and roughly vertical sets.
///
/// `angle_in_degrees` is the angle of the line's normal: near 90 the line is
/// horizontal, near 0 or 180 it is vertical. Diagonals are discarded.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }
    (horizontal, vertical)
}

fn extreme(lines: &[PolarLine], position: impl Fn(&PolarLine) -> f64, max: bool) -> Option<PolarLine> {
    let iter = lines.iter().copied();
    if max {
        iter.max_by(|a, b| position(a).total_cmp(&position(b)))
    } else {
        iter.min_by(|a, b| position(a).total_cmp(&position(b)))
    }
}

/// `y` where a non-vertical line crosses column `x`.
fn y_at(line: &PolarLine, x: f64) -> f64 {
    let theta = (line.angle_in_degrees as f64).to_radians();
    (line.r as f64 - x * theta.cos()) / theta.sin()
}

/// `x` where a non-horizontal line crosses row `y`.
fn x_at(line: &PolarLine, y: f64) -> f64 {
    let theta = (line.angle_in_degrees as f64).to_radians();
    (line.r as f64 - y * theta.sin()) / theta.cos()
}

/// Intersection of two lines `x cos(theta) + y sin(theta) = r`, or `None`
/// when they are (nearly) parallel.
fn intersect_polar_lines(a: &PolarLine, b: &PolarLine) -> Option<Point> {
    let theta_a = (a.angle_in_degrees as f64).to_radians();
    let theta_b = (b.angle_in_degrees as f64).to_radians();
    let (sin_a, cos_a) = theta_a.sin_cos();
    let (sin_b, cos_b) = theta_b.sin_cos();

    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }

    let (r_a, r_b) = (a.r as f64, b.r as f64);
    let x = (r_a * sin_b - r_b * sin_a) / denom;
    let y = (r_b * cos_a - r_a * cos_b) / denom;
    Some(Point::new(x as f32, y as f32))
}
