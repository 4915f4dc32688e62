//! Pen stroke capture.
//!
//! A [`Stroke`] stores one continuous pen-down path as a chain of unit
//! steps ([`GlyphLink`]) hanging off a start point. Pointer samples that
//! are further apart than one unit are joined with an integer line fill,
//! so every captured link moves at most one unit on each axis.
//!
//! Derived data (bounding rect, shape signatures) is computed lazily and
//! dropped whenever the chain changes.

pub mod matcher;

use std::cell::{Cell, OnceCell};

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::signature::Signatures;

pub use matcher::{MatchOptions, NO_MATCH};

/// Hard cap on the number of links in one stroke.
pub const MAX_LINKS: usize = 2000;

/// Canvas height that positions and offsets are normalized to.
pub const REFERENCE_CANVAS_HEIGHT: i32 = 75;

/// Largest absolute start coordinate a stroke keeps. Points beyond it are
/// clamped so that position arithmetic cannot overflow.
pub const MAX_COORDINATE: i32 = 1 << 20;

/// Chains shorter than this are treated as a tap by [`Stroke::end_input`].
const MIN_CAPTURED_LINKS: usize = 3;

/// One edge of a stroke's chain-code path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlyphLink {
    pub dx: i8,
    pub dy: i8,
}

impl GlyphLink {
    pub const fn new(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }

    /// The step as a point offset.
    pub fn delta(self) -> Point {
        Point::new(i32::from(self.dx), i32::from(self.dy))
    }
}

/// A single pen-down path.
#[derive(Debug, Clone)]
pub struct Stroke {
    start: Point,
    links: Vec<GlyphLink>,
    canvas_height: i32,
    /// Last sampled point while capture is in progress.
    cursor: Option<Point>,
    bounds: Cell<Option<Rect>>,
    signatures: OnceCell<Signatures>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Stroke {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.links == other.links
            && self.canvas_height == other.canvas_height
    }
}

impl Eq for Stroke {}

impl Stroke {
    /// An empty stroke on a reference-height canvas.
    pub fn new() -> Self {
        Self {
            start: Point::default(),
            links: Vec::new(),
            canvas_height: REFERENCE_CANVAS_HEIGHT,
            cursor: None,
            bounds: Cell::new(None),
            signatures: OnceCell::new(),
        }
    }

    /// Build a stroke directly from a stored chain.
    ///
    /// Chains longer than [`MAX_LINKS`] are truncated.
    pub fn from_links(start: Point, mut links: Vec<GlyphLink>) -> Self {
        links.truncate(MAX_LINKS);
        Self {
            start: start.clamped(MAX_COORDINATE),
            links,
            ..Self::new()
        }
    }

    /// Capture a complete stroke from a polyline of samples.
    pub fn from_points(points: &[Point]) -> Self {
        let mut stroke = Self::new();
        if let Some((&first, rest)) = points.split_first() {
            stroke.begin_input(first);
            for &p in rest {
                if !stroke.add_point(p) {
                    break;
                }
            }
        }
        stroke.end_input();
        stroke
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Start a new capture at `p`, discarding any previous chain.
    pub fn begin_input(&mut self, p: Point) {
        let p = p.clamped(MAX_COORDINATE);
        self.links.clear();
        self.start = p;
        self.cursor = Some(p);
        self.invalidate();
    }

    /// Append a pointer sample.
    ///
    /// Returns `false` once the chain is full; the caller should stop
    /// feeding points for this stroke. A sample received before
    /// [`begin_input`](Self::begin_input) starts the capture.
    pub fn add_point(&mut self, p: Point) -> bool {
        let p = p.clamped(MAX_COORDINATE);
        let Some(last) = self.cursor else {
            self.begin_input(p);
            return true;
        };
        if self.links.len() >= MAX_LINKS {
            return false;
        }

        let dx = p.x - last.x;
        let dy = p.y - last.y;
        if dx.abs() <= 1 && dy.abs() <= 1 {
            return self.push_sample(p);
        }

        // Bresenham fill along the major axis.
        let (ix, iy) = (dx.signum(), dy.signum());
        let (adx, ady) = (dx.abs(), dy.abs());
        let (mut x, mut y) = (last.x, last.y);
        if adx < ady {
            let mut d = adx;
            while y != p.y {
                y += iy;
                d += adx;
                if d > ady {
                    x += ix;
                    d -= ady;
                }
                if !self.push_sample(Point::new(x, y)) {
                    return false;
                }
            }
        } else {
            let mut d = ady;
            while x != p.x {
                x += ix;
                d += ady;
                if d > adx {
                    y += iy;
                    d -= adx;
                }
                if !self.push_sample(Point::new(x, y)) {
                    return false;
                }
            }
        }
        true
    }

    /// Finish the capture.
    ///
    /// A tap (fewer than three links) is replaced by a single one-unit
    /// step so signature extraction always has a path to work on.
    pub fn end_input(&mut self) {
        if self.links.len() < MIN_CAPTURED_LINKS {
            self.links.clear();
            self.links.push(GlyphLink::new(1, 0));
        }
        self.cursor = None;
        self.invalidate();
    }

    /// Whether `begin_input` has been called without a matching `end_input`.
    pub fn is_capturing(&self) -> bool {
        self.cursor.is_some()
    }

    /// Drop the chain and return to an empty, idle stroke.
    pub fn clear(&mut self) {
        self.links.clear();
        self.start = Point::default();
        self.cursor = None;
        self.invalidate();
    }

    fn push_sample(&mut self, p: Point) -> bool {
        let Some(last) = self.cursor else {
            return false;
        };
        if p == last {
            return true;
        }
        if self.links.len() >= MAX_LINKS {
            return false;
        }
        let step = p - last;
        self.links.push(GlyphLink::new(step.x as i8, step.y as i8));
        self.cursor = Some(p);
        self.invalidate();
        true
    }

    fn invalidate(&mut self) {
        self.bounds.set(None);
        self.signatures.take();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn start_point(&self) -> Point {
        self.start
    }

    /// Move the whole stroke so that it starts at `p`.
    pub fn set_start_point(&mut self, p: Point) {
        self.start = p.clamped(MAX_COORDINATE);
        self.bounds.set(None);
    }

    /// The point reached by walking every link from the start point.
    pub fn last_point(&self) -> Point {
        self.links
            .iter()
            .fold(self.start, |p, link| p + link.delta())
    }

    pub fn links(&self) -> &[GlyphLink] {
        &self.links
    }

    /// Number of links in the chain.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn canvas_height(&self) -> i32 {
        self.canvas_height
    }

    /// Record the height of the surface this stroke was drawn on.
    ///
    /// Only used to normalize positions and sizes between canvases of
    /// different resolutions. Clamped to at least 1.
    pub fn set_canvas_height(&mut self, height: i32) {
        self.canvas_height = height.max(1);
    }

    /// Absolute positions visited by the path, start point first.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let mut p = self.start;
        std::iter::once(self.start).chain(self.links.iter().map(move |link| {
            p += link.delta();
            p
        }))
    }

    /// Bounding rectangle of every visited position. Cached.
    pub fn bounding_rect(&self) -> Rect {
        if let Some(r) = self.bounds.get() {
            return r;
        }
        let mut r = Rect::at(self.start);
        for p in self.points() {
            r.include(p);
        }
        self.bounds.set(Some(r));
        r
    }

    /// Mean position along the path, relative to the start point.
    pub fn center_of_gravity(&self) -> Point {
        if self.links.is_empty() {
            return Point::default();
        }
        let mut p = Point::default();
        let (mut ax, mut ay) = (0i64, 0i64);
        for link in &self.links {
            p += link.delta();
            ax += i64::from(p.x);
            ay += i64::from(p.y);
        }
        let n = self.links.len() as i64;
        Point::new((ax / n) as i32, (ay / n) as i32)
    }

    /// `y` scaled from this stroke's canvas to the reference height.
    pub(crate) fn normalized_y(&self, y: i32) -> i64 {
        i64::from(y) * i64::from(REFERENCE_CANVAS_HEIGHT) / i64::from(self.canvas_height)
    }

    /// Shape signatures, computed on first use.
    pub fn signatures(&self) -> &Signatures {
        self.signatures.get_or_init(|| Signatures::of(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_line(len: i32) -> Stroke {
        Stroke::from_points(&[Point::new(0, 0), Point::new(0, len)])
    }

    #[test]
    fn adjacent_points_become_single_links() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(5, 5));
        assert!(s.add_point(Point::new(6, 5)));
        assert!(s.add_point(Point::new(7, 6)));
        assert!(s.add_point(Point::new(7, 7)));
        s.end_input();
        assert_eq!(
            s.links(),
            &[GlyphLink::new(1, 0), GlyphLink::new(1, 1), GlyphLink::new(0, 1)]
        );
        assert_eq!(s.last_point(), Point::new(7, 7));
    }

    #[test]
    fn repeated_point_is_ignored() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(0, 0));
        assert!(s.add_point(Point::new(0, 0)));
        assert!(s.add_point(Point::new(1, 0)));
        assert!(s.add_point(Point::new(1, 0)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn gaps_are_filled_with_unit_steps() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(0, 0));
        assert!(s.add_point(Point::new(7, 3)));
        assert!(s.add_point(Point::new(2, -9)));
        s.end_input();

        for link in s.links() {
            assert!(link.dx.abs() <= 1 && link.dy.abs() <= 1, "{link:?}");
            assert!(link.dx != 0 || link.dy != 0);
        }
        assert_eq!(s.last_point(), Point::new(2, -9));
    }

    #[test]
    fn l_shape_has_twenty_links() {
        let s = Stroke::from_points(&[Point::new(0, 0), Point::new(0, 10), Point::new(10, 10)]);
        assert_eq!(s.len(), 20);
        assert!(s.links()[..10].iter().all(|l| *l == GlyphLink::new(0, 1)));
        assert!(s.links()[10..].iter().all(|l| *l == GlyphLink::new(1, 0)));
    }

    #[test]
    fn tap_is_forced_to_a_single_link() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(3, 3));
        s.add_point(Point::new(4, 4));
        s.end_input();
        assert_eq!(s.links(), &[GlyphLink::new(1, 0)]);

        let mut empty = Stroke::new();
        empty.begin_input(Point::new(3, 3));
        empty.end_input();
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn link_cap_stops_at_two_thousand() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(0, 0));
        for i in 1..=MAX_LINKS as i32 {
            assert!(s.add_point(Point::new(i, 0)), "call {i} should be accepted");
        }
        assert_eq!(s.len(), MAX_LINKS);
        assert!(!s.add_point(Point::new(MAX_LINKS as i32 + 1, 0)));
        assert_eq!(s.len(), MAX_LINKS);
    }

    #[test]
    fn truncated_fill_reports_exhaustion() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(0, 0));
        assert!(!s.add_point(Point::new(0, 2500)));
        assert_eq!(s.len(), MAX_LINKS);
    }

    #[test]
    fn bounding_rect_is_recomputed_after_mutation() {
        let mut s = Stroke::new();
        s.begin_input(Point::new(0, 0));
        s.add_point(Point::new(4, 0));
        assert_eq!(s.bounding_rect(), Rect { left: 0, top: 0, right: 4, bottom: 0 });

        s.add_point(Point::new(4, 6));
        assert_eq!(s.bounding_rect(), Rect { left: 0, top: 0, right: 4, bottom: 6 });

        s.set_start_point(Point::new(10, 10));
        assert_eq!(s.bounding_rect(), Rect { left: 10, top: 10, right: 14, bottom: 16 });
    }

    #[test]
    fn center_of_gravity_of_vertical_line() {
        // Positions 1..=10 average to 5 (integer division of 55 / 10).
        let s = vertical_line(10);
        assert_eq!(s.center_of_gravity(), Point::new(0, 5));
    }

    #[test]
    fn canvas_height_is_clamped() {
        let mut s = vertical_line(4);
        s.set_canvas_height(0);
        assert_eq!(s.canvas_height(), 1);
        s.set_canvas_height(150);
        assert_eq!(s.normalized_y(20), 10);
    }

    #[test]
    fn start_points_are_clamped() {
        let s = Stroke::from_links(
            Point::new(0, 100_000_000),
            vec![GlyphLink::new(0, 1); 5],
        );
        assert_eq!(s.start_point(), Point::new(0, MAX_COORDINATE));
        assert_eq!(s.last_point(), Point::new(0, MAX_COORDINATE + 5));

        let mut t = Stroke::new();
        t.begin_input(Point::new(i32::MIN, 3));
        assert_eq!(t.start_point(), Point::new(-MAX_COORDINATE, 3));
        t.set_start_point(Point::new(i32::MAX, i32::MAX));
        assert_eq!(t.start_point(), Point::new(MAX_COORDINATE, MAX_COORDINATE));
    }

    #[test]
    fn from_links_truncates_oversized_chains() {
        let s = Stroke::from_links(Point::default(), vec![GlyphLink::new(1, 0); MAX_LINKS + 10]);
        assert_eq!(s.len(), MAX_LINKS);
    }

    #[test]
    fn signatures_are_dropped_on_recapture() {
        let mut s = vertical_line(12);
        let before = s.signatures().clone();
        s.begin_input(Point::new(0, 0));
        s.add_point(Point::new(12, 0));
        s.end_input();
        assert_ne!(&before, s.signatures());
    }
}
