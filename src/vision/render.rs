// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Drawing line boundaries, baselines and regions onto a page
//!
//! Shapes are drawn in place on an RGBA canvas. Each segment is clipped to
//! the canvas before rasterizing, so the cost of an edge is bounded by the
//! canvas size whatever its endpoints.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use thiserror::Error;
use tracing::debug;

use super::layout::{LinePrediction, Point, RegionMap};

/// Line boundary outline
pub const LINE_COLOR: Rgba<u8> = Rgba([0, 128, 0, 255]);
/// Baseline stroke
pub const BASELINE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Region boundary outline
pub const REGION_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Default baseline stroke width in pixels
pub const DEFAULT_BASELINE_WIDTH: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("shape has no points")]
    EmptyGeometry,
}

/// Closed outline through `points` and back to the first
pub fn draw_polygon(
    image: &mut RgbaImage,
    points: &[Point],
    color: Rgba<u8>,
) -> Result<(), RenderError> {
    if paint_degenerate(image, points, color)? {
        return Ok(());
    }

    for i in 0..points.len() {
        let start = points[i];
        let end = points[(i + 1) % points.len()];
        draw_segment(image, start, end, color, 0.0);
    }
    Ok(())
}

/// Open polyline through `points`, `width` pixels wide
pub fn draw_polyline(
    image: &mut RgbaImage,
    points: &[Point],
    color: Rgba<u8>,
    width: u32,
) -> Result<(), RenderError> {
    if paint_degenerate(image, points, color)? {
        return Ok(());
    }

    for pair in points.windows(2) {
        for t in 0..width.max(1) {
            draw_segment(image, pair[0], pair[1], color, f64::from(t));
        }
    }
    Ok(())
}

/// Handle empty and single-location geometry
///
/// Returns `true` when the shape was fully handled here.
fn paint_degenerate(
    image: &mut RgbaImage,
    points: &[Point],
    color: Rgba<u8>,
) -> Result<bool, RenderError> {
    let first = points.first().ok_or(RenderError::EmptyGeometry)?;
    if points.iter().any(|p| p != first) {
        return Ok(false);
    }

    if first.x >= 0
        && first.y >= 0
        && (first.x as u32) < image.width()
        && (first.y as u32) < image.height()
    {
        image.put_pixel(first.x as u32, first.y as u32, color);
    }
    Ok(true)
}

fn draw_segment(image: &mut RgbaImage, start: Point, end: Point, color: Rgba<u8>, offset: f64) {
    let (x1, y1) = (start.x as f64, start.y as f64);
    let (x2, y2) = (end.x as f64, end.y as f64);

    if offset == 0.0 {
        draw_clipped(image, (x1, y1), (x2, y2), color);
    } else {
        draw_clipped(image, (x1 + offset, y1), (x2 + offset, y2), color);
        draw_clipped(image, (x1, y1 + offset), (x2, y2 + offset), color);
    }
}

fn draw_clipped(image: &mut RgbaImage, start: (f64, f64), end: (f64, f64), color: Rgba<u8>) {
    if let Some((a, b)) = clip_segment(start, end, image.width(), image.height()) {
        draw_line_segment_mut(image, (a.0 as f32, a.1 as f32), (b.0 as f32, b.1 as f32), color);
    }
}

/// Liang-Barsky clip of a segment to the pixel rectangle of a canvas
///
/// Returns `None` when no part of the segment lies on the canvas.
fn clip_segment(
    start: (f64, f64),
    end: (f64, f64),
    width: u32,
    height: u32,
) -> Option<((f64, f64), (f64, f64))> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x_max, y_max) = (f64::from(width - 1), f64::from(height - 1));
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, start.0),
        (dx, x_max - start.0),
        (-dy, start.1),
        (dy, y_max - start.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    Some((
        (start.0 + t0 * dx, start.1 + t0 * dy),
        (start.0 + t1 * dx, start.1 + t1 * dy),
    ))
}

/// Draw every line, baseline and region onto a copy of `image`
///
/// Lines come first in prediction order, each boundary followed by its
/// baseline when `draw_baselines` is set; regions follow in map order.
/// Shapes without points are skipped.
pub fn annotate(
    image: &DynamicImage,
    predictions: &[LinePrediction],
    regions: &RegionMap,
    draw_baselines: bool,
    baseline_width: u32,
) -> RgbaImage {
    let mut canvas = image.to_rgba8();

    for prediction in predictions {
        if draw_polygon(&mut canvas, &prediction.boundary, LINE_COLOR).is_err() {
            debug!("Line {} has an empty boundary, skipped", prediction.line_index + 1);
        }
        if draw_baselines {
            if let Some(baseline) = prediction.visible_baseline() {
                // visible_baseline is non-empty, so this cannot fail
                let _ = draw_polyline(&mut canvas, baseline, BASELINE_COLOR, baseline_width);
            }
        }
    }

    for (region_type, group) in regions.iter() {
        for (idx, region) in group.iter().enumerate() {
            if draw_polygon(&mut canvas, &region.boundary, REGION_COLOR).is_err() {
                debug!("Region {} ({}) has an empty boundary, skipped", idx + 1, region_type);
            }
        }
    }

    canvas
}
