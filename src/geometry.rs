//! Core geometry primitives.
//!
//! Points and rectangles carry a coordinate-space marker so that image-space
//! and canvas-space values cannot be mixed by accident: converting between
//! the two always goes through the [`Camera`](crate::camera::Camera).

use std::marker::PhantomData;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Marker for image-space coordinates (pixels of the annotated image).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpace;

/// Marker for canvas-space coordinates (pixels of the on-screen canvas).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSpace;

/// A 2D point tagged with its coordinate space.
#[derive(Debug, Serialize, Deserialize)]
pub struct Point<S> {
    pub x: f32,
    pub y: f32,
    #[serde(skip)]
    _space: PhantomData<S>,
}

/// A point in image coordinates.
pub type ImagePoint = Point<ImageSpace>;
/// A point in canvas coordinates.
pub type CanvasPoint = Point<CanvasSpace>;

// Manual impls so `S` does not need to be Clone/Copy/PartialEq itself.
impl<S> Clone for Point<S> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<S> Copy for Point<S> {}
impl<S> PartialEq for Point<S> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<S> Point<S> {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Vector length when the point is used as an offset from the origin.
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Calculate Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point<S>) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Reinterpret this point in another coordinate space.
    ///
    /// Only for use by the camera transforms; everywhere else the space
    /// marker should be preserved.
    pub(crate) fn cast<T>(self) -> Point<T> {
        Point::new(self.x, self.y)
    }
}

impl<S> Add for Point<S> {
    type Output = Point<S>;
    fn add(self, rhs: Point<S>) -> Point<S> {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<S> Sub for Point<S> {
    type Output = Point<S>;
    fn sub(self, rhs: Point<S>) -> Point<S> {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<S> Mul<f32> for Point<S> {
    type Output = Point<S>;
    fn mul(self, rhs: f32) -> Point<S> {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// An axis-aligned rectangle tagged with its coordinate space.
#[derive(Debug, Serialize, Deserialize)]
pub struct Rectangle<S> {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
    #[serde(skip)]
    _space: PhantomData<S>,
}

/// A rectangle in image coordinates.
pub type ImageRect = Rectangle<ImageSpace>;
/// A rectangle in canvas coordinates.
pub type CanvasRect = Rectangle<CanvasSpace>;

impl<S> Clone for Rectangle<S> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<S> Copy for Rectangle<S> {}
impl<S> PartialEq for Rectangle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
    }
}

impl<S> Rectangle<S> {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: PhantomData,
        }
    }

    /// Create a rectangle from two corner points in any order.
    pub fn from_corners(p1: Point<S>, p2: Point<S>) -> Self {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let width = (p1.x - p2.x).abs();
        let height = (p1.y - p2.y).abs();
        Self::new(x, y, width, height)
    }

    /// The tight rectangle around a set of points, or `None` when empty.
    pub fn around_points<'a>(points: impl IntoIterator<Item = &'a Point<S>>) -> Option<Self>
    where
        S: 'a,
    {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        let mut any = false;

        for p in points {
            any = true;
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        any.then(|| Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Get the top-left corner.
    pub fn top_left(&self) -> Point<S> {
        Point::new(self.x, self.y)
    }

    /// Get the bottom-right corner.
    pub fn bottom_right(&self) -> Point<S> {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Get the center point.
    pub fn center(&self) -> Point<S> {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the rectangle (edges included).
    pub fn contains(&self, point: &Point<S>) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Get the area.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// The smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rectangle<S>) -> Rectangle<S> {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rectangle::new(x, y, right - x, bottom - y)
    }

    /// Check whether two rectangles overlap.
    pub fn intersects(&self, other: &Rectangle<S>) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Translate by an offset vector (expressed as a point delta).
    pub fn translated(&self, offset: Point<S>) -> Rectangle<S> {
        Rectangle::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }
}

/// Point-in-polygon test using the ray casting algorithm.
///
/// Open or degenerate paths (fewer than 3 vertices) contain nothing.
pub fn polygon_contains<S>(vertices: &[Point<S>], point: &Point<S>) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = vertices.len();

    let mut j = n - 1;
    for i in 0..n {
        let vi = &vertices[i];
        let vj = &vertices[j];

        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let p1: ImagePoint = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_rectangle_from_corners() {
        let rect: ImageRect =
            Rectangle::from_corners(Point::new(10.0, 20.0), Point::new(50.0, 80.0));
        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.y, 20.0);
        assert_eq!(rect.width, 40.0);
        assert_eq!(rect.height, 60.0);

        // Reversed corners produce the same rectangle
        let rect2: ImageRect =
            Rectangle::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(rect, rect2);
    }

    #[test]
    fn test_rectangle_contains() {
        let rect: ImageRect = Rectangle::new(10.0, 10.0, 100.0, 100.0);
        assert!(rect.contains(&Point::new(50.0, 50.0)));
        assert!(rect.contains(&Point::new(10.0, 10.0))); // edge
        assert!(!rect.contains(&Point::new(5.0, 50.0)));
    }

    #[test]
    fn test_rectangle_union() {
        let a: ImageRect = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(20.0, 5.0, 10.0, 10.0);
        let u = a.union(&b);
        assert_eq!(u, Rectangle::new(0.0, 0.0, 30.0, 15.0));
    }

    #[test]
    fn test_around_points() {
        let points: Vec<ImagePoint> = vec![
            Point::new(5.0, 8.0),
            Point::new(1.0, 12.0),
            Point::new(9.0, 3.0),
        ];
        let rect = ImageRect::around_points(&points).unwrap();
        assert_eq!(rect, Rectangle::new(1.0, 3.0, 8.0, 9.0));

        let empty: Vec<ImagePoint> = vec![];
        assert!(ImageRect::around_points(&empty).is_none());
    }

    #[test]
    fn test_polygon_contains() {
        let square: Vec<ImagePoint> = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        assert!(polygon_contains(&square, &Point::new(50.0, 50.0)));
        assert!(!polygon_contains(&square, &Point::new(150.0, 50.0)));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let line: Vec<ImagePoint> = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!(!polygon_contains(&line, &Point::new(5.0, 0.0)));
    }
}
