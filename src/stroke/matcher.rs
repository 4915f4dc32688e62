//! Stroke-to-stroke correlation.
//!
//! The score is deliberately nonlinear: the three signature errors are
//! multiplied (each offset by its kind's weight) and positional and length
//! penalties are added on top. Lower is better; [`NO_MATCH`] rejects.
//!
//! The comparison is not symmetric. The sliding search pads the receiver's
//! signature, and the angle error is weighted by the *other* stroke's
//! distance profile.

use serde::{Deserialize, Serialize};

use super::{REFERENCE_CANVAS_HEIGHT, Stroke};
use crate::signature::SignatureKind;

/// Sentinel error for a rejected stroke pair.
pub const NO_MATCH: u32 = 400_000;

/// Link-count mismatch (percent above the shorter stroke) that rejects.
const MAX_LENGTH_PERCENT: u32 = 200;
/// Start-point vertical offset allowed before rejection, after the dead zone.
const MAX_START_OFFSET: i64 = 18;
const START_DEAD_ZONE: i64 = 4;
/// End-point vertical offset allowed before rejection, after the dead zone.
const MAX_END_OFFSET: i64 = 20;
const END_DEAD_ZONE: i64 = 3;
/// Height ratio (percent) that rejects when position matching is off.
const MAX_HEIGHT_PERCENT: i64 = 300;
const HEIGHT_SLACK: i64 = 4;

const OFFSET_PENALTY: u64 = 40;
const LENGTH_PENALTY: u64 = 2;

/// Tuning for stroke comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Compare where strokes start and end on the canvas. When off, only
    /// the overall height ratio is checked.
    pub canvas_position: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            canvas_position: true,
        }
    }
}

impl Stroke {
    /// Error between this stroke and `other` with default options.
    pub fn match_stroke(&self, other: &Stroke) -> u32 {
        self.match_with(other, &MatchOptions::default())
    }

    /// Error between this stroke and `other`; [`NO_MATCH`] if rejected.
    pub fn match_with(&self, other: &Stroke, opts: &MatchOptions) -> u32 {
        let short = self.len().min(other.len()) as u32;
        let long = self.len().max(other.len()) as u32;
        let pct = (long + 2) * 100 / (short + 2) - 100;
        if pct > MAX_LENGTH_PERCENT {
            return NO_MATCH;
        }

        let (start_offset, end_offset) = if opts.canvas_position {
            let start = dead_zone(
                self.normalized_y(self.start_point().y) - other.normalized_y(other.start_point().y),
                START_DEAD_ZONE,
            );
            if start > MAX_START_OFFSET {
                return NO_MATCH;
            }
            let end = dead_zone(
                self.normalized_y(self.last_point().y) - other.normalized_y(other.last_point().y),
                END_DEAD_ZONE,
            );
            if end > MAX_END_OFFSET {
                return NO_MATCH;
            }
            (start, end)
        } else {
            let h1 = self.normalized_height();
            let h2 = other.normalized_height();
            let (lo, hi) = (h1.min(h2), h1.max(h2));
            if (hi + HEIGHT_SLACK) * 100 / (lo + HEIGHT_SLACK) > MAX_HEIGHT_PERCENT {
                return NO_MATCH;
            }
            (0, 0)
        };

        let mine = self.signatures();
        let theirs = other.signatures();

        let mut errors = [0u32; 3];
        for kind in [
            SignatureKind::Tangent,
            SignatureKind::Distance,
            SignatureKind::Angle,
        ] {
            let weight = (kind == SignatureKind::Angle)
                .then(|| theirs.get(SignatureKind::Distance));
            let err = kind.error(mine.get(kind), theirs.get(kind), weight);
            if err > kind.spec().max_error {
                return NO_MATCH;
            }
            errors[kind as usize] = err;
        }

        let product: u64 = SignatureKind::ALL
            .iter()
            .map(|&kind| u64::from(errors[kind as usize] + kind.spec().weight))
            .product();
        let offsets = (start_offset as u64).pow(2) + (end_offset as u64).pow(2);
        let score = product + offsets * OFFSET_PENALTY + u64::from(pct).pow(2) * LENGTH_PENALTY;
        u32::try_from(score).unwrap_or(u32::MAX)
    }

    fn normalized_height(&self) -> i64 {
        let r = self.bounding_rect();
        let height = i64::from(r.bottom) - i64::from(r.top) + 1;
        height * i64::from(REFERENCE_CANVAS_HEIGHT) / i64::from(self.canvas_height())
    }
}

fn dead_zone(delta: i64, zone: i64) -> i64 {
    (delta.abs() - zone).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn stroke(points: &[(i32, i32)]) -> Stroke {
        let pts: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Stroke::from_points(&pts)
    }

    fn horizontal(y: i32, len: i32) -> Stroke {
        stroke(&[(0, y), (len, y)])
    }

    #[test]
    fn self_match_equals_weight_product() {
        let l = stroke(&[(0, 0), (0, 10), (10, 10)]);
        assert_eq!(l.match_stroke(&l.clone()), 1 * 3 * 2);

        let squiggle = stroke(&[(3, 3), (9, 14), (2, 20), (15, 31)]);
        assert_eq!(squiggle.match_stroke(&squiggle), 6);
    }

    #[test]
    fn l_shape_does_not_match_vertical_line() {
        let l = stroke(&[(0, 0), (0, 10), (10, 10)]);
        let line = stroke(&[(0, 0), (0, 20)]);
        assert_eq!(l.len(), line.len());
        assert_eq!(l.match_stroke(&line), NO_MATCH);
    }

    #[test]
    fn start_offset_boundary() {
        let base = horizontal(0, 20);
        // 22 - 4 = 18 is still accepted; the end offset is 22 - 3 = 19.
        let near = horizontal(22, 20);
        assert_eq!(base.match_stroke(&near), 6 + (18 * 18 + 19 * 19) * 40);

        let far = horizontal(23, 20);
        assert_eq!(base.match_stroke(&far), NO_MATCH);
    }

    #[test]
    fn offsets_are_normalized_to_reference_height() {
        let base = horizontal(0, 20);
        // 44 units on a 150-high canvas is 22 reference units.
        let mut tall = horizontal(44, 20);
        tall.set_canvas_height(150);
        assert_ne!(base.match_stroke(&tall), NO_MATCH);

        let mut taller = horizontal(46, 20);
        taller.set_canvas_height(150);
        assert_eq!(base.match_stroke(&taller), NO_MATCH);
    }

    #[test]
    fn position_check_can_be_disabled() {
        let top = horizontal(0, 20);
        let bottom = horizontal(40, 20);
        let relaxed = MatchOptions {
            canvas_position: false,
        };
        assert_eq!(top.match_stroke(&bottom), NO_MATCH);
        assert_eq!(top.match_with(&bottom, &relaxed), 6);
    }

    #[test]
    fn height_ratio_rejects_when_position_is_off() {
        let flat = horizontal(0, 20);
        let tall = stroke(&[(0, 0), (0, 20)]);
        let relaxed = MatchOptions {
            canvas_position: false,
        };
        assert_eq!(flat.match_with(&tall, &relaxed), NO_MATCH);
    }

    #[test]
    fn distant_start_points_reject_without_overflow() {
        let links = stroke(&[(0, 0), (0, 20)]).links().to_vec();
        let far = Stroke::from_links(Point::new(0, i32::MAX), links);
        let mut near = stroke(&[(0, 0), (0, 20)]);
        near.set_canvas_height(1);

        assert_eq!(far.match_stroke(&near), NO_MATCH);
        assert_eq!(near.match_stroke(&far), NO_MATCH);

        let relaxed = MatchOptions {
            canvas_position: false,
        };
        let mut same_canvas = near.clone();
        same_canvas.set_canvas_height(75);
        assert_eq!(far.match_with(&same_canvas, &relaxed), 6);
    }

    #[test]
    fn large_length_mismatch_rejects() {
        assert_eq!(horizontal(0, 10).match_stroke(&horizontal(0, 40)), NO_MATCH);
    }

    #[test]
    fn moderate_length_mismatch_is_penalized() {
        // (20 + 2) * 100 / (10 + 2) - 100 = 83
        let err = horizontal(0, 10).match_stroke(&horizontal(0, 20));
        assert_ne!(err, NO_MATCH);
        assert!(err >= 83 * 83 * 2, "error {err}");
    }

    #[test]
    fn matching_is_not_symmetric() {
        let a = stroke(&[(0, 0), (6, 12), (14, 14)]);
        let b = stroke(&[(0, 0), (7, 12), (14, 13)]);
        assert_eq!(a.match_stroke(&b), 347);
        assert_eq!(b.match_stroke(&a), 410);

        // Only the receiver's tangent signature slides.
        let t = SignatureKind::Tangent;
        let (sa, sb) = (a.signatures(), b.signatures());
        assert_eq!(t.error(sa.get(t), sb.get(t), None), 4);
        assert_eq!(t.error(sb.get(t), sa.get(t), None), 5);
    }

    #[test]
    fn angle_error_is_weighted_by_the_other_stroke() {
        let a = stroke(&[(0, 0), (6, 12), (14, 14)]);
        let b = stroke(&[(0, 0), (7, 12), (14, 13)]);
        let (sa, sb) = (a.signatures(), b.signatures());

        let t = SignatureKind::Tangent;
        let d = SignatureKind::Distance;
        let g = SignatureKind::Angle;
        let forward = [
            t.error(sa.get(t), sb.get(t), None),
            g.error(sa.get(g), sb.get(g), Some(sb.get(d))),
            d.error(sa.get(d), sb.get(d), None),
        ];
        let err = a.match_stroke(&b);
        if forward
            .iter()
            .zip(SignatureKind::ALL)
            .all(|(&e, kind)| e <= kind.spec().max_error)
        {
            let expected = (forward[0] + 1) * (forward[2] + 3) * (forward[1] + 2);
            let start = dead_zone(i64::from(a.start_point().y - b.start_point().y), START_DEAD_ZONE) as u32;
            let end = dead_zone(i64::from(a.last_point().y - b.last_point().y), END_DEAD_ZONE) as u32;
            let pct = (a.len().max(b.len()) as u32 + 2) * 100 / (a.len().min(b.len()) as u32 + 2) - 100;
            assert_eq!(err, expected + (start * start + end * end) * 40 + pct * pct * 2);
        } else {
            assert_eq!(err, NO_MATCH);
        }
    }
}
