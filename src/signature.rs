//! Shape signatures and signal-style correlation.
//!
//! A signature is a fixed-length integer profile derived from a stroke's
//! chain. Three kinds are extracted for every stroke:
//!
//! - **Tangent**: local direction along the path (pseudo-angle, loops)
//! - **Angle**: direction from the centroid to each point (pseudo-angle, loops)
//! - **Distance**: squared radius from the centroid, normalized to 0..=255
//!
//! All three are always computed together, so the kinds are described by a
//! static strategy table ([`SignatureSpec`]) rather than a trait object.
//! Angles use a 256-step circle: 0 = +x, 64 = +y, 128 = -x, 192 = -y.

use crate::geometry::Point;
use crate::stroke::Stroke;

/// Length every signature is scaled to before correlation.
pub const CORRELATION_POINTS: usize = 25;

/// Links summed per tangent sample.
const TANGENT_WINDOW: usize = 5;
/// Stride between tangent windows.
const TANGENT_STEP: usize = 2;
/// Centroid vectors are clamped to this magnitude before `arc_tan`.
const ANGLE_CLAMP: i32 = 5;
/// Samples added on each side of a sliding signature.
const SLIDE_PAD: usize = 2;
/// Number of start offsets tried by a sliding correlation.
const SLIDE_OFFSETS: usize = 4;

/// `atan(row+1 / col+1)` in 256ths of a circle. Symmetric: `t[r][c] + t[c][r] == 64`.
const ARC_TAN_TABLE: [[i32; 5]; 5] = [
    [32, 19, 13, 10, 8],
    [45, 32, 24, 19, 16],
    [51, 40, 32, 26, 22],
    [54, 45, 38, 32, 27],
    [56, 48, 42, 37, 32],
];

/// The three signature kinds extracted from every stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Tangent = 0,
    Angle = 1,
    Distance = 2,
}

/// Static description of one signature kind.
pub struct SignatureSpec {
    pub name: &'static str,
    /// Errors above this reject a stroke pair outright.
    pub max_error: u32,
    /// Offset added to the error before the errors are multiplied.
    pub weight: u32,
    /// Values are angles that wrap at 256.
    pub loops: bool,
    /// Correlation searches a few start offsets.
    pub slides: bool,
    compute: fn(&Stroke) -> Vec<i32>,
}

impl std::fmt::Debug for SignatureSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureSpec")
            .field("name", &self.name)
            .field("max_error", &self.max_error)
            .field("weight", &self.weight)
            .field("loops", &self.loops)
            .field("slides", &self.slides)
            .finish()
    }
}

static SPECS: [SignatureSpec; 3] = [
    SignatureSpec {
        name: "tangent",
        max_error: 20,
        weight: 1,
        loops: true,
        slides: true,
        compute: tangent_signature,
    },
    SignatureSpec {
        name: "angle",
        max_error: 40,
        weight: 2,
        loops: true,
        slides: true,
        compute: angle_signature,
    },
    SignatureSpec {
        name: "distance",
        max_error: 64,
        weight: 3,
        loops: false,
        slides: false,
        compute: distance_signature,
    },
];

impl SignatureKind {
    pub const ALL: [SignatureKind; 3] = [Self::Tangent, Self::Angle, Self::Distance];

    pub fn spec(self) -> &'static SignatureSpec {
        &SPECS[self as usize]
    }

    /// Extract this kind's signature from `stroke`, scaled to
    /// [`CORRELATION_POINTS`] samples.
    pub fn compute(self, stroke: &Stroke) -> Vec<i32> {
        (self.spec().compute)(stroke)
    }

    /// Correlation error between two signatures of this kind; lower is better.
    ///
    /// With `weight`, samples are compared index-aligned and the mean is
    /// weighted by `weight[i] + 1`. Otherwise sliding kinds keep the best of
    /// [`SLIDE_OFFSETS`] alignments of a padded copy of `a`.
    pub fn error(self, a: &[i32], b: &[i32], weight: Option<&[i32]>) -> u32 {
        let spec = self.spec();
        match weight {
            Some(w) => weighted_error(a, b, w, spec.loops),
            None if spec.slides => sliding_error(a, b, spec.loops),
            None => aligned_error(a, b, spec.loops),
        }
    }
}

impl std::fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// All signatures of one stroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatures {
    values: [Vec<i32>; 3],
}

impl Signatures {
    pub fn of(stroke: &Stroke) -> Self {
        Self {
            values: SignatureKind::ALL.map(|kind| kind.compute(stroke)),
        }
    }

    pub fn get(&self, kind: SignatureKind) -> &[i32] {
        &self.values[kind as usize]
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Pseudo-angle of the vector `(dx, dy)` without floating point.
pub fn arc_tan(dy: i32, dx: i32) -> i32 {
    let (mut dx, mut dy) = (dx, dy);
    while dx.abs() > 5 || dy.abs() > 5 {
        dx /= 2;
        dy /= 2;
    }
    if dx == 0 {
        return if dy >= 0 { 64 } else { 192 };
    }
    if dy == 0 {
        return if dx >= 0 { 0 } else { 128 };
    }
    let t = ARC_TAN_TABLE[(dy.abs() - 1) as usize][(dx.abs() - 1) as usize];
    match (dy > 0, dx > 0) {
        (true, true) => t,
        (true, false) => 128 - t,
        (false, true) => 256 - t,
        (false, false) => 128 + t,
    }
}

fn tangent_signature(stroke: &Stroke) -> Vec<i32> {
    let links = stroke.links();
    let sum = |window: &[crate::stroke::GlyphLink]| {
        window
            .iter()
            .fold(Point::default(), |acc, link| acc + link.delta())
    };
    let raw: Vec<i32> = if links.len() <= TANGENT_WINDOW {
        let d = sum(links);
        vec![arc_tan(d.y, d.x)]
    } else {
        (0..links.len() - TANGENT_WINDOW)
            .step_by(TANGENT_STEP)
            .map(|i| {
                let d = sum(&links[i..i + TANGENT_WINDOW]);
                arc_tan(d.y, d.x)
            })
            .collect()
    };
    scale(&raw, CORRELATION_POINTS, true)
}

fn angle_signature(stroke: &Stroke) -> Vec<i32> {
    let center = stroke.center_of_gravity();
    let mut current = Point::default();
    let mut raw = Vec::with_capacity(stroke.len());
    for link in stroke.links() {
        let mut d = current - center;
        let magnitude = d.x.abs().max(d.y.abs());
        if magnitude > ANGLE_CLAMP {
            d = d.scaled(ANGLE_CLAMP, magnitude);
        }
        raw.push(arc_tan(d.y, d.x));
        current += link.delta();
    }
    scale(&raw, CORRELATION_POINTS, true)
}

fn distance_signature(stroke: &Stroke) -> Vec<i32> {
    let center = stroke.center_of_gravity();
    let mut current = Point::default();
    let mut raw: Vec<i64> = Vec::with_capacity(stroke.len() / 2 + 1);
    for pair in stroke.links().chunks(2) {
        let d = current - center;
        raw.push(i64::from(d.x) * i64::from(d.x) + i64::from(d.y) * i64::from(d.y));
        for link in pair {
            current += link.delta();
        }
    }

    let min = raw.iter().copied().min().unwrap_or(0);
    let max = raw.iter().copied().max().unwrap_or(0);
    let span = (max - min).max(1);
    let normalized: Vec<i32> = raw
        .iter()
        .map(|&v| ((v - min) * 255 / span) as i32)
        .collect();
    scale(&normalized, CORRELATION_POINTS, false)
}

/// Resample `values` to exactly `target` samples.
///
/// Longer input is averaged per bucket (wraparound-aware on a 256 circle
/// when `circular`); shorter input repeats the nearest preceding sample.
pub fn scale(values: &[i32], target: usize, circular: bool) -> Vec<i32> {
    let len = values.len();
    if len == 0 {
        return vec![0; target];
    }
    if len == target {
        return values.to_vec();
    }
    if len < target {
        return (0..target).map(|j| values[j * len / target]).collect();
    }
    (0..target)
        .map(|j| {
            let start = j * len / target;
            let end = ((j + 1) * len / target).max(start + 1);
            let bucket = &values[start..end];
            if circular {
                circular_mean(bucket)
            } else {
                bucket.iter().sum::<i32>() / bucket.len() as i32
            }
        })
        .collect()
}

/// Signed difference on the 256 circle, in -128..128.
fn wrap_delta(d: i32) -> i32 {
    let d = d.rem_euclid(256);
    if d >= 128 { d - 256 } else { d }
}

fn circular_mean(bucket: &[i32]) -> i32 {
    let base = bucket[0];
    let offset: i32 = bucket.iter().map(|&v| wrap_delta(v - base)).sum();
    (base + offset / bucket.len() as i32).rem_euclid(256)
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

fn sample_diff(a: i32, b: i32, loops: bool) -> u32 {
    let d = a.abs_diff(b);
    if loops {
        let d = d % 256;
        d.min(256 - d)
    } else {
        d
    }
}

fn aligned_error(a: &[i32], b: &[i32], loops: bool) -> u32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0;
    }
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| u64::from(sample_diff(x, y, loops)))
        .sum();
    (total / n as u64) as u32
}

fn sliding_error(a: &[i32], b: &[i32], loops: bool) -> u32 {
    let (Some(&first), Some(&last)) = (a.first(), a.last()) else {
        return aligned_error(a, b, loops);
    };
    let mut padded = Vec::with_capacity(a.len() + 2 * SLIDE_PAD);
    padded.extend(std::iter::repeat_n(first, SLIDE_PAD));
    padded.extend_from_slice(a);
    padded.extend(std::iter::repeat_n(last, SLIDE_PAD));

    (0..SLIDE_OFFSETS)
        .map(|offset| aligned_error(&padded[offset..offset + a.len()], b, loops))
        .min()
        .unwrap_or(0)
}

fn weighted_error(a: &[i32], b: &[i32], weight: &[i32], loops: bool) -> u32 {
    let mut total = 0u64;
    let mut norm = 0u64;
    for ((&x, &y), &w) in a.iter().zip(b).zip(weight) {
        let w = u64::from(w.max(0).unsigned_abs()) + 1;
        total += u64::from(sample_diff(x, y, loops)) * w;
        norm += w;
    }
    if norm == 0 {
        return 0;
    }
    (total / norm) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(i32, i32)]) -> Stroke {
        let pts: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Stroke::from_points(&pts)
    }

    #[test]
    fn arc_tan_axes_and_diagonals() {
        assert_eq!(arc_tan(0, 3), 0);
        assert_eq!(arc_tan(3, 0), 64);
        assert_eq!(arc_tan(0, -3), 128);
        assert_eq!(arc_tan(-3, 0), 192);
        assert_eq!(arc_tan(2, 2), 32);
        assert_eq!(arc_tan(2, -2), 96);
        assert_eq!(arc_tan(-2, -2), 160);
        assert_eq!(arc_tan(-2, 2), 224);
        assert_eq!(arc_tan(0, 0), 64);
    }

    #[test]
    fn arc_tan_reduces_large_vectors() {
        assert_eq!(arc_tan(40, 40), 32);
        assert_eq!(arc_tan(0, -120), 128);
    }

    #[test]
    fn arc_tan_table_is_symmetric() {
        for r in 0..5 {
            for c in 0..5 {
                assert_eq!(ARC_TAN_TABLE[r][c] + ARC_TAN_TABLE[c][r], 64);
            }
        }
    }

    #[test]
    fn scale_always_hits_target_length() {
        for len in [0usize, 1, 7, 24, 25, 26, 90, 1999] {
            let values: Vec<i32> = (0..len as i32).map(|v| v % 256).collect();
            for target in [1usize, 10, CORRELATION_POINTS, 60] {
                assert_eq!(scale(&values, target, false).len(), target);
                assert_eq!(scale(&values, target, true).len(), target);
            }
        }
    }

    #[test]
    fn scale_repeats_short_input() {
        assert_eq!(scale(&[10, 20], 4, false), vec![10, 10, 20, 20]);
    }

    #[test]
    fn scale_averages_long_input() {
        assert_eq!(scale(&[0, 10, 20, 30], 2, false), vec![5, 25]);
    }

    #[test]
    fn circular_scale_averages_across_the_wrap() {
        // 250 and 6 straddle the 0/256 boundary; their mean is 0, not 128.
        assert_eq!(scale(&[250, 6], 1, true), vec![0]);
        assert_eq!(scale(&[250, 6], 1, false), vec![128]);
    }

    #[test]
    fn circular_difference_takes_the_short_way() {
        assert_eq!(sample_diff(250, 4, true), 10);
        assert_eq!(sample_diff(250, 4, false), 246);
    }

    #[test]
    fn every_signature_has_correlation_length() {
        let s = stroke(&[(0, 0), (5, 17), (-3, 30), (20, 2)]);
        let sigs = Signatures::of(&s);
        for kind in SignatureKind::ALL {
            assert_eq!(sigs.get(kind).len(), CORRELATION_POINTS, "{kind}");
        }
    }

    #[test]
    fn tangent_of_l_shape() {
        let l = stroke(&[(0, 0), (0, 10), (10, 10)]);
        let tan = SignatureKind::Tangent.compute(&l);
        assert_eq!(tan[0], 64);
        assert_eq!(tan[24], 0);
        assert!(tan.contains(&54));
        assert!(tan.contains(&24));
    }

    #[test]
    fn distance_signature_is_normalized() {
        let s = stroke(&[(0, 0), (0, 30)]);
        let dist = SignatureKind::Distance.compute(&s);
        assert!(dist.iter().all(|&v| (0..=255).contains(&v)));
        assert!(dist.contains(&255));
        assert!(dist.contains(&0));
    }

    #[test]
    fn identical_signatures_have_zero_error() {
        let s = stroke(&[(0, 0), (8, 12), (16, 0)]);
        let sigs = Signatures::of(&s);
        for kind in SignatureKind::ALL {
            let v = sigs.get(kind);
            assert_eq!(kind.error(v, v, None), 0, "{kind}");
        }
        let w = sigs.get(SignatureKind::Distance);
        let a = sigs.get(SignatureKind::Angle);
        assert_eq!(SignatureKind::Angle.error(a, a, Some(w)), 0);
    }

    #[test]
    fn sliding_tolerates_a_small_shift() {
        let base: Vec<i32> = (0..CORRELATION_POINTS as i32).map(|i| i * 8).collect();
        let shifted: Vec<i32> = std::iter::once(0)
            .chain(base.iter().copied().take(CORRELATION_POINTS - 1))
            .collect();
        let slid = SignatureKind::Tangent.error(&base, &shifted, None);
        let aligned = aligned_error(&base, &shifted, true);
        assert!(slid < aligned, "slid {slid} aligned {aligned}");
    }

    #[test]
    fn weighting_emphasizes_heavy_samples() {
        let a = [0, 0, 0, 0];
        let b = [0, 0, 0, 100];
        let light = SignatureKind::Angle.error(&a, &b, Some(&[255, 255, 255, 0]));
        let heavy = SignatureKind::Angle.error(&a, &b, Some(&[0, 0, 0, 255]));
        assert!(heavy > light);
    }

    #[test]
    fn l_shape_against_line_exceeds_tangent_limit() {
        let l = stroke(&[(0, 0), (0, 10), (10, 10)]);
        let line = stroke(&[(0, 0), (0, 20)]);
        let tan = SignatureKind::Tangent;
        let err = tan.error(
            l.signatures().get(tan),
            line.signatures().get(tan),
            None,
        );
        assert!(err > tan.spec().max_error, "tangent error {err}");
    }

    #[test]
    fn table_flags_match_kinds() {
        assert!(SignatureKind::Tangent.spec().loops && SignatureKind::Tangent.spec().slides);
        assert!(SignatureKind::Angle.spec().loops);
        assert!(!SignatureKind::Distance.spec().loops);
        assert!(!SignatureKind::Distance.spec().slides);
    }
}
