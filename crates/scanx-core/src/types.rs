// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the scanx document scanner.

use serde::{Deserialize, Serialize};

use crate::config::{Enhancement, ProcessingMode};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// A document quadrilateral with corners in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quad {
    /// Build a quad from four corners in any order.
    ///
    /// Corners are walked clockwise (on screen) around their centroid. The
    /// walk starts at the corner with the smallest `x + y`, the smaller `y`
    /// winning a tie, so a diamond-shaped page keeps four distinct corners.
    pub fn from_unordered(points: [Point; 4]) -> Self {
        let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
        let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;

        let mut ring = points;
        ring.sort_by(|a, b| {
            let angle_a = (a.y - cy).atan2(a.x - cx);
            let angle_b = (b.y - cy).atan2(b.x - cx);
            angle_a.total_cmp(&angle_b)
        });

        let start = (0..4)
            .min_by(|&i, &j| {
                let (a, b) = (ring[i], ring[j]);
                (a.x + a.y).total_cmp(&(b.x + b.y)).then(a.y.total_cmp(&b.y))
            })
            .unwrap_or(0);
        ring.rotate_left(start);

        Self {
            top_left: ring[0],
            top_right: ring[1],
            bottom_right: ring[2],
            bottom_left: ring[3],
        }
    }

    /// A quad covering a `width` x `height` frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(w, 0.0),
            bottom_right: Point::new(w, h),
            bottom_left: Point::new(0.0, h),
        }
    }

    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self) -> [Point; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Corners as tuples, the form `imageproc` projections take.
    pub fn as_tuples(&self) -> [(f32, f32); 4] {
        self.corners().map(|p| (p.x, p.y))
    }

    /// Area via the shoelace formula.
    pub fn area(&self) -> f32 {
        let c = self.corners();
        let mut area = 0.0f32;
        for i in 0..4 {
            let j = (i + 1) % 4;
            area += c[i].x * c[j].y;
            area -= c[j].x * c[i].y;
        }
        area.abs() / 2.0
    }

    /// Whether every interior angle turns the same way (no self-intersection,
    /// no reflex corner).
    pub fn is_convex(&self) -> bool {
        let c = self.corners();
        let mut sign = 0.0f32;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            let d = c[(i + 2) % 4];
            let cross = (b.x - a.x) * (d.y - b.y) - (b.y - a.y) * (d.x - b.x);
            if cross.abs() < f32::EPSILON {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Lengths of `[top, right, bottom, left]` edges.
    pub fn edge_lengths(&self) -> [f32; 4] {
        [
            self.top_left.distance(&self.top_right),
            self.top_right.distance(&self.bottom_right),
            self.bottom_right.distance(&self.bottom_left),
            self.bottom_left.distance(&self.top_left),
        ]
    }

    /// Size of the upright rectangle this quad flattens to: the longer of
    /// each pair of opposite edges.
    pub fn rectified_size(&self) -> (f32, f32) {
        let [top, right, bottom, left] = self.edge_lengths();
        (top.max(bottom), left.max(right))
    }

    /// Multiply every coordinate by `factor`.
    pub fn scale(&self, factor: f32) -> Self {
        let s = |p: Point| Point::new(p.x * factor, p.y * factor);
        Self {
            top_left: s(self.top_left),
            top_right: s(self.top_right),
            bottom_right: s(self.bottom_right),
            bottom_left: s(self.bottom_left),
        }
    }
}

/// Which detector produced a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    /// Largest convex four-sided contour of the edge map.
    Contour,
    /// Intersection of the dominant horizontal and vertical Hough lines.
    HoughLines,
    /// No document detected; the whole frame was used.
    FullFrame,
}

/// A detected document boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub quad: Quad,
    pub method: DetectionMethod,
}

/// Encoded image container formats the scanner recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Other,
}

/// Metadata describing one `processDocument` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub mode: ProcessingMode,
    pub input_bytes: usize,
    /// `None` in pass-through mode, where the input is never decoded.
    pub input_kind: Option<ImageKind>,
    pub input_size: Option<(u32, u32)>,
    pub detection: Option<Detection>,
    pub enhancement: Enhancement,
    pub output_kind: Option<ImageKind>,
    pub output_size: Option<(u32, u32)>,
    pub output_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Quad {
        Quad {
            top_left: Point::new(x0, y0),
            top_right: Point::new(x1, y0),
            bottom_right: Point::new(x1, y1),
            bottom_left: Point::new(x0, y1),
        }
    }

    #[test]
    fn shoelace_area_rectangle() {
        let quad = rect(0.0, 0.0, 10.0, 5.0);
        assert!((quad.area() - 50.0).abs() < 1e-3, "got {}", quad.area());
    }

    #[test]
    fn from_unordered_sorts_corners() {
        let shuffled = [
            Point::new(90.0, 110.0),
            Point::new(10.0, 12.0),
            Point::new(8.0, 100.0),
            Point::new(95.0, 5.0),
        ];
        let quad = Quad::from_unordered(shuffled);
        assert_eq!(quad.top_left, Point::new(10.0, 12.0));
        assert_eq!(quad.top_right, Point::new(95.0, 5.0));
        assert_eq!(quad.bottom_right, Point::new(90.0, 110.0));
        assert_eq!(quad.bottom_left, Point::new(8.0, 100.0));
    }

    #[test]
    fn from_unordered_keeps_diamond_corners_distinct() {
        let top = Point::new(210.0, 40.0);
        let right = Point::new(360.0, 190.0);
        let bottom = Point::new(190.0, 360.0);
        let left = Point::new(40.0, 210.0);

        // `top` and `left` share the smallest x + y; `right` and `bottom` the largest.
        let quad = Quad::from_unordered([bottom, left, right, top]);
        assert_eq!(quad.top_left, top);
        assert_eq!(quad.top_right, right);
        assert_eq!(quad.bottom_right, bottom);
        assert_eq!(quad.bottom_left, left);
        assert!(quad.is_convex());
        assert!(quad.area() > 40_000.0);
    }

    #[test]
    fn rectangle_is_convex_bowtie_is_not() {
        assert!(rect(0.0, 0.0, 10.0, 10.0).is_convex());

        let bowtie = Quad {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(10.0, 10.0),
            bottom_right: Point::new(10.0, 0.0),
            bottom_left: Point::new(0.0, 10.0),
        };
        assert!(!bowtie.is_convex());
    }

    #[test]
    fn rectified_size_takes_longer_edges() {
        let trapezoid = Quad {
            top_left: Point::new(20.0, 0.0),
            top_right: Point::new(80.0, 0.0),
            bottom_right: Point::new(100.0, 50.0),
            bottom_left: Point::new(0.0, 50.0),
        };
        let (w, h) = trapezoid.rectified_size();
        assert!((w - 100.0).abs() < 1e-3);
        assert!(h > 50.0);
    }

    #[test]
    fn scale_multiplies_coordinates() {
        let quad = rect(1.0, 2.0, 3.0, 4.0).scale(2.0);
        assert_eq!(quad, rect(2.0, 4.0, 6.0, 8.0));
    }
}
