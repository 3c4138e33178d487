//! Module-to-pixel coordinate transforms: the 3-point affine map used when
//! no alignment pattern has been located yet, and the 4-point projective
//! map used once a bottom-right alignment pattern pins down perspective.

use crate::error::{QRError, QRResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone)]
pub enum Transform {
    /// `img_col = a*x + c*y + e`, `img_row = b*x + d*y + f`.
    Affine { a: f64, c: f64, e: f64, b: f64, d: f64, f: f64 },
    /// `img_col = (a*x + b*y + c) / (g*x + h*y + 1)`,
    /// `img_row = (d*x + e*y + f) / (g*x + h*y + 1)`.
    Projective { a: f64, b: f64, c: f64, d: f64, e: f64, f: f64, g: f64, h: f64 },
}

impl Transform {
    /// Solves the two independent 3x3 systems for the affine coefficients
    /// given three (module, pixel) correspondences.
    pub fn from_three_points(modules: [(f64, f64); 3], pixels: [Point; 3]) -> QRResult<Self> {
        let rows: Vec<[f64; 3]> = modules.iter().map(|&(x, y)| [x, y, 1.0]).collect();
        let cols: Vec<f64> = pixels.iter().map(|p| p.x).collect();
        let rows_r: Vec<f64> = pixels.iter().map(|p| p.y).collect();

        let [a, c, e] = solve_3x3(&rows, &cols)?;
        let [b, d, f] = solve_3x3(&rows, &rows_r)?;
        Ok(Transform::Affine { a, c, e, b, d, f })
    }

    /// Eliminates the 8x9 augmented system for the projective coefficients
    /// given four (module, pixel) correspondences.
    pub fn from_four_points(modules: [(f64, f64); 4], pixels: [Point; 4]) -> QRResult<Self> {
        // Each correspondence contributes two rows:
        //   a*x + b*y + c - g*x*X - h*y*X = X
        //   d*x + e*y + f - g*x*Y - h*y*Y = Y
        // where (X, Y) is the pixel and (x, y) the module coordinate.
        let mut rows = Vec::with_capacity(8);
        let mut rhs = Vec::with_capacity(8);
        for (&(x, y), p) in modules.iter().zip(pixels.iter()) {
            rows.push([x, y, 1.0, 0.0, 0.0, 0.0, -x * p.x, -y * p.x]);
            rhs.push(p.x);
            rows.push([0.0, 0.0, 0.0, x, y, 1.0, -x * p.y, -y * p.y]);
            rhs.push(p.y);
        }
        let coeffs = solve_nxn(&rows, &rhs)?;
        Ok(Transform::Projective {
            a: coeffs[0],
            b: coeffs[1],
            c: coeffs[2],
            d: coeffs[3],
            e: coeffs[4],
            f: coeffs[5],
            g: coeffs[6],
            h: coeffs[7],
        })
    }

    /// Maps a module coordinate to a pixel coordinate, rounding half away
    /// from zero to pick the sampled pixel.
    pub fn map(&self, x: f64, y: f64) -> Point {
        match *self {
            Transform::Affine { a, c, e, b, d, f } => Point::new(a * x + c * y + e, b * x + d * y + f),
            Transform::Projective { a, b, c, d, e, f, g, h } => {
                let denom = g * x + h * y + 1.0;
                Point::new((a * x + b * y + c) / denom, (d * x + e * y + f) / denom)
            }
        }
    }

    pub fn map_rounded(&self, x: f64, y: f64) -> (i64, i64) {
        let p = self.map(x, y);
        (round_half_away_from_zero(p.x), round_half_away_from_zero(p.y))
    }
}

fn round_half_away_from_zero(v: f64) -> i64 {
    if v >= 0.0 { (v + 0.5).floor() as i64 } else { (v - 0.5).ceil() as i64 }
}

/// Solves a 3x3 linear system via Gaussian elimination with partial
/// pivoting, repairing a zero pivot by adding a later row before giving up.
fn solve_3x3(rows: &[[f64; 3]], rhs: &[f64]) -> QRResult<[f64; 3]> {
    let augmented: Vec<[f64; 4]> = rows
        .iter()
        .zip(rhs.iter())
        .map(|(r, &b)| [r[0], r[1], r[2], b])
        .collect();
    let solved = gaussian_eliminate(augmented, 3)?;
    Ok([solved[0], solved[1], solved[2]])
}

fn solve_nxn(rows: &[[f64; 8]], rhs: &[f64]) -> QRResult<[f64; 8]> {
    let augmented: Vec<Vec<f64>> = rows
        .iter()
        .zip(rhs.iter())
        .map(|(r, &b)| {
            let mut row: Vec<f64> = r.to_vec();
            row.push(b);
            row
        })
        .collect();
    let solved = gaussian_eliminate_dyn(augmented, 8)?;
    let mut out = [0.0; 8];
    out.copy_from_slice(&solved);
    Ok(out)
}

fn gaussian_eliminate(mut rows: Vec<[f64; 4]>, n: usize) -> QRResult<Vec<f64>> {
    debug_assert_eq!(rows.len(), n);
    for pivot in 0..n {
        if rows[pivot][pivot].abs() < 1e-9 {
            let swap_with = (pivot + 1..n).find(|&r| rows[r][pivot].abs() >= 1e-9);
            match swap_with {
                Some(r) => rows.swap(pivot, r),
                None => return Err(QRError::TransformSingular),
            }
        }
        let pv = rows[pivot][pivot];
        for c in pivot..=n {
            rows[pivot][c] /= pv;
        }
        for r in 0..n {
            if r == pivot {
                continue;
            }
            let factor = rows[r][pivot];
            if factor == 0.0 {
                continue;
            }
            for c in pivot..=n {
                rows[r][c] -= factor * rows[pivot][c];
            }
        }
    }
    Ok(rows.iter().map(|r| r[n]).collect())
}

fn gaussian_eliminate_dyn(mut rows: Vec<Vec<f64>>, n: usize) -> QRResult<Vec<f64>> {
    debug_assert_eq!(rows.len(), n);
    for pivot in 0..n {
        if rows[pivot][pivot].abs() < 1e-9 {
            let swap_with = (pivot + 1..n).find(|&r| rows[r][pivot].abs() >= 1e-9);
            match swap_with {
                Some(r) => rows.swap(pivot, r),
                None => return Err(QRError::TransformSingular),
            }
        }
        let pv = rows[pivot][pivot];
        for c in pivot..=n {
            rows[pivot][c] /= pv;
        }
        for r in 0..n {
            if r == pivot {
                continue;
            }
            let factor = rows[r][pivot];
            if factor == 0.0 {
                continue;
            }
            for c in pivot..=n {
                rows[r][c] -= factor * rows[pivot][c];
            }
        }
    }
    Ok(rows.iter().map(|r| r[n]).collect())
}

#[cfg(test)]
mod transform_tests {
    use super::*;

    #[test]
    fn affine_recovers_simple_scale_and_offset() {
        // module (x, y) -> pixel (3x + 10, 3y + 10)
        let modules = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
        let pixels = [Point::new(10.0, 10.0), Point::new(40.0, 10.0), Point::new(10.0, 40.0)];
        let t = Transform::from_three_points(modules, pixels).unwrap();
        let p = t.map(5.0, 5.0);
        assert!((p.x - 25.0).abs() < 1e-6);
        assert!((p.y - 25.0).abs() < 1e-6);
    }

    #[test]
    fn projective_recovers_identity_like_mapping() {
        let modules = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let pixels = [
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 20.0),
            Point::new(0.0, 20.0),
        ];
        let t = Transform::from_four_points(modules, pixels).unwrap();
        let p = t.map(5.0, 5.0);
        assert!((p.x - 10.0).abs() < 1e-6);
        assert!((p.y - 10.0).abs() < 1e-6);
    }

    #[test]
    fn singular_system_is_reported() {
        let modules = [(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)];
        let pixels = [Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(0.0, 0.0)];
        let result = Transform::from_three_points(modules, pixels);
        assert!(matches!(result, Err(QRError::TransformSingular)));
    }
}
