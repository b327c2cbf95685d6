// src/geometry.rs
//
// Pixel-space box and point primitives shared by the tracker and the
// input boundary. Pure value types, no failure modes.

use serde::{Deserialize, Serialize};

/// Axis-aligned box, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.w as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.h as i64
    }

    pub fn centroid(&self) -> Point {
        Point::new(
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self, other)
    }
}

/// Overlap area of two boxes; 0 when they do not intersect.
pub fn intersection_area(a: &BoundingBox, b: &BoundingBox) -> i64 {
    let x_left = (a.x as i64).max(b.x as i64);
    let y_top = (a.y as i64).max(b.y as i64);
    let x_right = a.right().min(b.right());
    let y_bottom = a.bottom().min(b.bottom());

    let x_overlap = (x_right - x_left).max(0);
    let y_overlap = (y_bottom - y_top).max(0);

    x_overlap * y_overlap
}

pub fn distance(p: &Point, q: &Point) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}
