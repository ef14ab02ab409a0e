//! Keyframe interpolation.
//!
//! Linear interpolation of annotation geometry between two video keyframes.
//! Paths with differing vertex counts are resampled to a common count by arc
//! length before the pointwise lerp; the `linear-1.1` algorithm additionally
//! aligns the second path's starting vertex to minimize travel.

use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect};

/// Parameters handed to a renderer's `interpolate`.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationParams {
    /// Algorithm tag from the video payload. `None` means plain linear.
    pub algorithm: Option<String>,
    /// Normalized position between the two keyframes, in `[0, 1]`.
    pub factor: f32,
}

impl InterpolationParams {
    pub fn linear(factor: f32) -> Self {
        Self {
            algorithm: None,
            factor,
        }
    }

    /// Whether the algorithm tag names a linear variant. Non-linear tags are
    /// rejected with an error at interpolation time.
    pub fn is_linear(&self) -> bool {
        match &self.algorithm {
            None => true,
            Some(name) => name.starts_with("linear"),
        }
    }

    /// Reject non-linear algorithm tags.
    pub fn require_linear(&self) -> Result<(), EngineError> {
        if self.is_linear() {
            Ok(())
        } else {
            Err(EngineError::UnsupportedInterpolationAlgorithm {
                algorithm: self.algorithm.clone().unwrap_or_default(),
            })
        }
    }

    fn aligns_start(&self) -> bool {
        // linear-1.0 kept paths index-aligned; 1.1 added start alignment.
        matches!(&self.algorithm, Some(name) if name.as_str() >= "linear-1.1")
    }
}

/// Linear interpolation between two points.
pub fn lerp_point(prev: ImagePoint, next: ImagePoint, factor: f32) -> ImagePoint {
    ImagePoint::new(
        prev.x + (next.x - prev.x) * factor,
        prev.y + (next.y - prev.y) * factor,
    )
}

/// Linear interpolation between two scalars.
pub fn lerp(prev: f32, next: f32, factor: f32) -> f32 {
    prev + (next - prev) * factor
}

/// Linear interpolation between two rectangles (corners move independently).
pub fn lerp_rect(prev: &ImageRect, next: &ImageRect, factor: f32) -> ImageRect {
    ImageRect::from_corners(
        lerp_point(prev.top_left(), next.top_left(), factor),
        lerp_point(prev.bottom_right(), next.bottom_right(), factor),
    )
}

/// Interpolate between two closed paths.
///
/// Both paths are resampled to the larger vertex count, the second path is
/// optionally start-aligned, then vertices are lerped pairwise.
pub fn interpolate_path(
    prev: &[ImagePoint],
    next: &[ImagePoint],
    params: &InterpolationParams,
) -> Result<Vec<ImagePoint>, EngineError> {
    params.require_linear()?;

    if prev.is_empty() || next.is_empty() {
        return Ok(if params.factor < 0.5 {
            prev.to_vec()
        } else {
            next.to_vec()
        });
    }

    let count = prev.len().max(next.len());
    let prev = resample_closed_path(prev, count);
    let mut next = resample_closed_path(next, count);

    if params.aligns_start() {
        align_start(&prev, &mut next);
    }

    Ok(prev
        .iter()
        .zip(next.iter())
        .map(|(p, n)| lerp_point(*p, *n, params.factor))
        .collect())
}

/// Resample a closed path to exactly `count` vertices, spaced evenly by arc
/// length. A path already at `count` is returned as-is.
pub fn resample_closed_path(path: &[ImagePoint], count: usize) -> Vec<ImagePoint> {
    if path.len() == count || path.len() < 2 {
        return path.to_vec();
    }

    // Cumulative arc length including the closing segment.
    let n = path.len();
    let mut lengths = Vec::with_capacity(n + 1);
    let mut total = 0.0;
    lengths.push(0.0);
    for i in 0..n {
        let next = path[(i + 1) % n];
        total += path[i].distance_to(&next);
        lengths.push(total);
    }

    if total <= f32::EPSILON {
        // All vertices coincide; just repeat the first.
        return vec![path[0]; count];
    }

    let mut resampled = Vec::with_capacity(count);
    let step = total / count as f32;
    let mut segment = 0;

    for i in 0..count {
        let target = step * i as f32;
        while segment + 1 < lengths.len() - 1 && lengths[segment + 1] <= target {
            segment += 1;
        }

        let segment_start = path[segment % n];
        let segment_end = path[(segment + 1) % n];
        let segment_length = lengths[segment + 1] - lengths[segment];
        let t = if segment_length <= f32::EPSILON {
            0.0
        } else {
            (target - lengths[segment]) / segment_length
        };
        resampled.push(lerp_point(segment_start, segment_end, t));
    }

    resampled
}

/// Rotate `next` so its starting vertex is the one closest to the start of
/// `prev`, minimizing vertex travel during the lerp.
fn align_start(prev: &[ImagePoint], next: &mut Vec<ImagePoint>) {
    if prev.is_empty() || next.is_empty() {
        return;
    }

    let anchor = prev[0];
    let best = next
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            anchor
                .distance_to(a)
                .partial_cmp(&anchor.distance_to(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(index, _)| index)
        .unwrap_or(0);

    next.rotate_left(best);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_lerp_point_midway() {
        let mid = lerp_point(Point::new(0.0, 0.0), Point::new(10.0, 20.0), 0.5);
        assert_eq!(mid, Point::new(5.0, 10.0));
    }

    #[test]
    fn test_lerp_rect() {
        let prev = ImageRect::new(0.0, 0.0, 10.0, 10.0);
        let next = ImageRect::new(10.0, 10.0, 20.0, 20.0);
        let mid = lerp_rect(&prev, &next, 0.5);
        assert_eq!(mid, ImageRect::new(5.0, 5.0, 15.0, 15.0));
    }

    #[test]
    fn test_equal_length_paths_lerp_pointwise() {
        let prev = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let next = vec![Point::new(2.0, 0.0), Point::new(12.0, 0.0), Point::new(12.0, 10.0)];
        let result = interpolate_path(&prev, &next, &InterpolationParams::linear(0.5)).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0], Point::new(1.0, 0.0));
    }

    #[test]
    fn test_mismatched_paths_resample_to_larger_count() {
        let prev = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let next = vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(10.0, 20.0)];
        let result = interpolate_path(&prev, &next, &InterpolationParams::linear(0.25)).unwrap();
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_resample_preserves_count_and_start() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let resampled = resample_closed_path(&square, 8);
        assert_eq!(resampled.len(), 8);
        assert_eq!(resampled[0], square[0]);
        // Evenly spaced on a 40-length perimeter: every 5 units.
        assert!((resampled[1].x - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_unsupported_algorithm_is_an_error() {
        let prev = vec![Point::new(0.0, 0.0)];
        let next = vec![Point::new(1.0, 1.0)];
        let params = InterpolationParams {
            algorithm: Some("spline-2.0".to_string()),
            factor: 0.5,
        };
        assert!(matches!(
            interpolate_path(&prev, &next, &params),
            Err(EngineError::UnsupportedInterpolationAlgorithm { .. })
        ));
    }

    #[test]
    fn test_linear_1_1_aligns_start_vertex() {
        let prev = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        // Same square, vertex order rotated by two.
        let next = vec![
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        ];
        let params = InterpolationParams {
            algorithm: Some("linear-1.1".to_string()),
            factor: 0.5,
        };
        let result = interpolate_path(&prev, &next, &params).unwrap();
        // With alignment the halfway shape is the square itself.
        assert_eq!(result[0], Point::new(0.0, 0.0));
    }
}
