//! Integer geometry shared by strokes and characters.

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// An integer 2D coordinate on the input canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scale both components by `num / den` using integer arithmetic,
    /// saturating at the `i32` range.
    ///
    /// `den` must be non-zero; canvas heights are clamped to at least 1
    /// before they reach this function.
    pub fn scaled(self, num: i32, den: i32) -> Self {
        let scale = |v: i32| saturate(i64::from(v) * i64::from(num) / i64::from(den));
        Self {
            x: scale(self.x),
            y: scale(self.y),
        }
    }

    /// Clamp both components to `-limit..=limit`.
    pub fn clamped(self, limit: i32) -> Self {
        Self {
            x: self.x.clamp(-limit, limit),
            y: self.y.clamp(-limit, limit),
        }
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle with inclusive bounds.
///
/// A rect covering a single point has width and height 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// A degenerate rect covering exactly `p`.
    pub fn at(p: Point) -> Self {
        Self {
            left: p.x,
            top: p.y,
            right: p.x,
            bottom: p.y,
        }
    }

    /// Grow the rect so that it contains `p`.
    pub fn include(&mut self, p: Point) {
        self.left = self.left.min(p.x);
        self.top = self.top.min(p.y);
        self.right = self.right.max(p.x);
        self.bottom = self.bottom.max(p.y);
    }

    /// Smallest rect containing both `self` and `other`.
    pub fn union(self, other: Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top + 1
    }

    /// Integer centre, rounding toward the top-left.
    pub fn center(&self) -> Point {
        let mid = |a: i32, b: i32| saturate((i64::from(a) + i64::from(b)) / 2);
        Point::new(mid(self.left, self.right), mid(self.top, self.bottom))
    }
}
