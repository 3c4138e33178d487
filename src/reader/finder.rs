//! Horizontal/vertical signature scanning for finder and alignment patterns,
//! plus the corner builder that turns three matched finders into an oriented
//! triple.

use crate::binarize::BinaryImage;
use crate::error::{QRError, QRResult};
use crate::geometry::Point;

pub(crate) const SIGNATURE_MAX_DEVIATION: f64 = 0.25;
pub(crate) const HOR_VERT_SCAN_MAX_DISTANCE: f64 = 2.0;
pub(crate) const MODULE_SIZE_DEVIATION: f64 = 0.5;
pub(crate) const CORNER_SIDE_LENGTH_DEV: f64 = 0.8;
pub(crate) const CORNER_RIGHT_ANGLE_DEV: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct FinderCandidate {
    pub row: f64,
    pub col: f64,
    pub c1: i64,
    pub c2: i64,
    pub r1: i64,
    pub r2: i64,
    pub module_size: f64,
}

impl FinderCandidate {
    pub fn point(&self) -> Point {
        Point::new(self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlignmentCandidate {
    pub row: f64,
    pub col: f64,
    pub module_size: f64,
}

impl AlignmentCandidate {
    pub fn point(&self) -> Point {
        Point::new(self.col, self.row)
    }
}

/// Flip positions along a line of pixels, seeded with an implicit light
/// pixel before the start of the line.
fn flip_positions(len: i64, is_dark: impl Fn(i64) -> bool) -> Vec<i64> {
    let mut positions = Vec::new();
    let mut prev = false;
    for i in 0..len {
        let dark = is_dark(i);
        if dark != prev {
            positions.push(i);
        }
        prev = dark;
    }
    positions
}

/// Finder signature: ratio 1:1:3:1:1 over a window of 5 consecutive runs,
/// stepping the window start by 2.
fn finder_runs(positions: &[i64]) -> Vec<(i64, i64, f64)> {
    let mut out = Vec::new();
    if positions.len() < 6 {
        return out;
    }
    let lengths: Vec<i64> = positions.windows(2).map(|w| w[1] - w[0]).collect();
    let mut i = 0;
    while i + 5 < positions.len() {
        let module = (positions[i + 5] - positions[i]) as f64 / 7.0;
        if module > 0.0 {
            let tol = SIGNATURE_MAX_DEVIATION * module;
            let l: [f64; 5] = [
                lengths[i] as f64,
                lengths[i + 1] as f64,
                lengths[i + 2] as f64,
                lengths[i + 3] as f64,
                lengths[i + 4] as f64,
            ];
            if (l[0] - module).abs() <= tol
                && (l[1] - module).abs() <= tol
                && (l[2] - 3.0 * module).abs() <= tol
                && (l[3] - module).abs() <= tol
                && (l[4] - module).abs() <= tol
            {
                out.push((positions[i + 2], positions[i + 3], module));
            }
        }
        i += 2;
    }
    out
}

/// Alignment signature: ratio n:1:1:1:n (outer runs merge into surrounding
/// data so only a lower bound applies to them).
fn alignment_runs(positions: &[i64]) -> Vec<(i64, i64, f64)> {
    let mut out = Vec::new();
    if positions.len() < 6 {
        return out;
    }
    let lengths: Vec<i64> = positions.windows(2).map(|w| w[1] - w[0]).collect();
    let mut i = 0;
    while i + 5 < positions.len() {
        let module = (positions[i + 4] - positions[i + 1]) as f64 / 3.0;
        if module > 0.0 {
            let tol = SIGNATURE_MAX_DEVIATION * module;
            let l: [f64; 5] = [
                lengths[i] as f64,
                lengths[i + 1] as f64,
                lengths[i + 2] as f64,
                lengths[i + 3] as f64,
                lengths[i + 4] as f64,
            ];
            if l[0] >= module - tol
                && (l[1] - module).abs() <= tol
                && (l[2] - module).abs() <= tol
                && (l[3] - module).abs() <= tol
                && l[4] >= module - tol
            {
                out.push((positions[i + 2], positions[i + 3], module));
            }
        }
        i += 2;
    }
    out
}

pub struct PatternScanner<'a> {
    img: &'a BinaryImage,
}

impl<'a> PatternScanner<'a> {
    pub fn new(img: &'a BinaryImage) -> Self {
        Self { img }
    }

    fn row_positions(&self, row: i64) -> Vec<i64> {
        flip_positions(self.img.width() as i64, |c| self.img.is_dark(row, c))
    }

    fn col_positions(&self, col: i64) -> Vec<i64> {
        flip_positions(self.img.height() as i64, |r| self.img.is_dark(r, col))
    }

    /// Full horizontal + vertical + dedup pipeline, producing matched finder
    /// candidates ready for the corner builder.
    pub fn find_finders(&self) -> QRResult<Vec<FinderCandidate>> {
        let height = self.img.height() as i64;
        let mut matched = Vec::new();

        for row in 0..height {
            let positions = self.row_positions(row);
            for (c1, c2, module_h) in finder_runs(&positions) {
                let scan_col = (c1 + c2) / 2;
                if let Some(cand) = self.vertical_match(row, c1, c2, module_h, scan_col) {
                    matched.push(cand);
                }
            }
        }

        let deduped = dedup_finders(matched);
        if deduped.len() < 3 {
            return Err(QRError::InsufficientFinders);
        }
        Ok(deduped)
    }

    /// Vertical confirmation for a horizontal hit at `(row, c1, c2)` with
    /// estimated module size `module_h`, scanning column `scan_col`. Bounded
    /// by image **height**, never width.
    fn vertical_match(&self, row: i64, c1: i64, c2: i64, module_h: f64, scan_col: i64) -> Option<FinderCandidate> {
        let col_positions = self.col_positions(scan_col);
        let mut best: Option<(FinderCandidate, f64)> = None;

        for (r1, r2, module_v) in finder_runs(&col_positions) {
            if !(r1..r2).contains(&row) || !(c1..c2).contains(&scan_col) {
                continue;
            }
            let ratio = module_h.min(module_v) / module_h.max(module_v);
            if ratio < MODULE_SIZE_DEVIATION {
                continue;
            }
            let h_center = Point::new((c1 + c2) as f64 / 2.0, row as f64);
            let v_center = Point::new(scan_col as f64, (r1 + r2) as f64 / 2.0);
            let distance = ((h_center.x - v_center.x).powi(2) + (h_center.y - v_center.y).powi(2)).sqrt();
            if distance > HOR_VERT_SCAN_MAX_DISTANCE {
                continue;
            }

            let candidate = FinderCandidate {
                row: v_center.y,
                col: v_center.x,
                c1,
                c2,
                r1,
                r2,
                module_size: (module_h + module_v) / 2.0,
            };
            if best.as_ref().map(|&(_, d)| distance < d).unwrap_or(true) {
                best = Some((candidate, distance));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Scans a square window for an alignment-pattern candidate, used by the
    /// 4-point retry once a provisional top-left/top-right/bottom-left triple
    /// predicts where the bottom-right alignment pattern should be.
    pub fn find_alignment_near(&self, center: Point, radius: f64) -> Option<AlignmentCandidate> {
        let row_lo = (center.y - radius).max(0.0) as i64;
        let row_hi = (center.y + radius).min(self.img.height() as f64 - 1.0) as i64;
        let col_lo = (center.x - radius).max(0.0) as i64;
        let col_hi = (center.x + radius).min(self.img.width() as f64 - 1.0) as i64;

        let mut best: Option<(AlignmentCandidate, f64)> = None;
        for row in row_lo..=row_hi {
            let positions = self.row_positions(row);
            for (c1, c2, module_h) in alignment_runs(&positions) {
                let scan_col = (c1 + c2) / 2;
                if scan_col < col_lo || scan_col > col_hi {
                    continue;
                }
                let col_positions = self.col_positions(scan_col);
                for (r1, r2, module_v) in alignment_runs(&col_positions) {
                    if !(r1..r2).contains(&row) {
                        continue;
                    }
                    let ratio = module_h.min(module_v) / module_h.max(module_v);
                    if ratio < MODULE_SIZE_DEVIATION {
                        continue;
                    }
                    let cand = AlignmentCandidate {
                        row: (r1 + r2) as f64 / 2.0,
                        col: scan_col as f64,
                        module_size: (module_h + module_v) / 2.0,
                    };
                    let dist = (cand.col - center.x).powi(2) + (cand.row - center.y).powi(2);
                    if best.as_ref().map(|&(_, d)| dist < d).unwrap_or(true) {
                        best = Some((cand, dist));
                    }
                }
            }
        }
        best.map(|(c, _)| c)
    }
}

/// Overlapping bounding boxes (centers within one module of each other) keep
/// only the smaller-distance-to-match candidate; this is an O(n^2) pass over
/// what is in practice at most a few hundred candidates.
fn dedup_finders(mut candidates: Vec<FinderCandidate>) -> Vec<FinderCandidate> {
    let mut kept: Vec<FinderCandidate> = Vec::new();
    candidates.sort_by(|a, b| a.module_size.partial_cmp(&b.module_size).unwrap());
    'outer: for cand in candidates.drain(..) {
        for existing in kept.iter_mut() {
            let dx = cand.col - existing.col;
            let dy = cand.row - existing.row;
            let threshold = existing.module_size.max(cand.module_size);
            if (dx * dx + dy * dy).sqrt() < threshold {
                continue 'outer;
            }
        }
        kept.push(cand);
    }
    kept
}

// Corner builder
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Corner {
    pub top_left: FinderCandidate,
    pub top_right: FinderCandidate,
    pub bottom_left: FinderCandidate,
    pub top_line_length: f64,
    pub left_line_length: f64,
    pub version_estimate: usize,
}

fn dist(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Builds an oriented corner from an unordered triple of matched finders,
/// rejecting skewed or non-right-angle arrangements.
pub fn build_corner(triple: [FinderCandidate; 3]) -> QRResult<Corner> {
    let pts = [triple[0].point(), triple[1].point(), triple[2].point()];
    let d01 = dist(pts[0], pts[1]);
    let d12 = dist(pts[1], pts[2]);
    let d02 = dist(pts[0], pts[2]);

    let (top_left, other1, other2) = if d01 >= d12 && d01 >= d02 {
        (triple[2], triple[0], triple[1])
    } else if d12 >= d01 && d12 >= d02 {
        (triple[0], triple[1], triple[2])
    } else {
        (triple[1], triple[0], triple[2])
    };

    let tl = top_left.point();
    let c = cross(tl, other1.point(), other2.point());
    let (top_right, bottom_left) = if c > 0.0 { (other1, other2) } else { (other2, other1) };

    let top_line_length = dist(tl, top_right.point());
    let left_line_length = dist(tl, bottom_left.point());

    let (shorter, longer) = if top_line_length <= left_line_length {
        (top_line_length, left_line_length)
    } else {
        (left_line_length, top_line_length)
    };
    if longer == 0.0 || shorter / longer < CORNER_SIDE_LENGTH_DEV {
        return Err(QRError::CornerInvalid);
    }

    let v_top = (top_right.point().x - tl.x, top_right.point().y - tl.y);
    let v_left = (bottom_left.point().x - tl.x, bottom_left.point().y - tl.y);
    let dot = v_top.0 * v_left.0 + v_top.1 * v_left.1;
    let cos_theta = dot / (top_line_length * left_line_length);
    if cos_theta.abs() > CORNER_RIGHT_ANGLE_DEV {
        return Err(QRError::CornerInvalid);
    }

    let top_module = (top_left.module_size + top_right.module_size) / 2.0;
    let left_module = (top_left.module_size + bottom_left.module_size) / 2.0;
    let estimate = ((top_line_length / top_module + left_line_length / left_module) / 2.0 - 10.0) / 4.0;
    let version_estimate = (estimate.round() as i64).clamp(1, 40) as usize;

    Ok(Corner { top_left, top_right, bottom_left, top_line_length, left_line_length, version_estimate })
}

#[cfg(test)]
mod finder_tests {
    use super::*;

    #[test]
    fn finder_runs_accepts_exact_1_1_3_1_1_ratio() {
        // positions: module size 4, runs 4,4,12,4,4
        let positions = [0, 4, 8, 20, 24, 28];
        let hits = finder_runs(&positions);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], (8, 20, 4.0));
    }

    #[test]
    fn finder_runs_rejects_uneven_ratio() {
        let positions = [0, 4, 8, 9, 13, 17];
        assert!(finder_runs(&positions).is_empty());
    }

    #[test]
    fn alignment_runs_accepts_wide_outer_runs() {
        let positions = [0, 30, 34, 38, 42, 72];
        let hits = alignment_runs(&positions);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn build_corner_rejects_collinear_triple() {
        let f = |row: f64, col: f64| FinderCandidate {
            row,
            col,
            c1: 0,
            c2: 0,
            r1: 0,
            r2: 0,
            module_size: 4.0,
        };
        let triple = [f(0.0, 0.0), f(0.0, 40.0), f(0.0, 80.0)];
        assert!(matches!(build_corner(triple), Err(QRError::CornerInvalid)));
    }

    #[test]
    fn build_corner_identifies_right_angle_triple() {
        let f = |row: f64, col: f64| FinderCandidate {
            row,
            col,
            c1: 0,
            c2: 0,
            r1: 0,
            r2: 0,
            module_size: 4.0,
        };
        // TL at (0,0), TR at (0,40) [right], BL at (40,0) [down] in (row,col).
        let top_left = f(0.0, 0.0);
        let top_right = f(0.0, 40.0);
        let bottom_left = f(40.0, 0.0);
        let corner = build_corner([top_left, top_right, bottom_left]).unwrap();
        assert_eq!(corner.top_left.point(), top_left.point());
    }
}
