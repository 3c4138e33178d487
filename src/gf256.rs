//! GF(256) field arithmetic and Reed-Solomon decoding.
//!
//! The field is built over the primitive polynomial `0x11D` with generator
//! `alpha = 2`, matching ISO/IEC 18004 Annex A.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub, SubAssign};

use crate::error::{QRError, QRResult};

/// An element of GF(256). Addition and subtraction are XOR; multiplication
/// and division go through the log/exp tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct G(pub u8);

impl From<u8> for G {
    fn from(v: u8) -> Self {
        G(v)
    }
}

impl Add for G {
    type Output = G;
    fn add(self, rhs: G) -> G {
        G(self.0 ^ rhs.0)
    }
}
impl AddAssign for G {
    fn add_assign(&mut self, rhs: G) {
        self.0 ^= rhs.0;
    }
}
impl Sub for G {
    type Output = G;
    fn sub(self, rhs: G) -> G {
        G(self.0 ^ rhs.0)
    }
}
impl SubAssign for G {
    fn sub_assign(&mut self, rhs: G) {
        self.0 ^= rhs.0;
    }
}

impl Mul for G {
    type Output = G;
    fn mul(self, rhs: G) -> G {
        if self.0 == 0 || rhs.0 == 0 {
            return G(0);
        }
        let log_sum = LOG_TABLE[self.0 as usize] as usize + LOG_TABLE[rhs.0 as usize] as usize;
        G(EXP_TABLE[log_sum % 255])
    }
}
impl MulAssign for G {
    fn mul_assign(&mut self, rhs: G) {
        *self = *self * rhs;
    }
}

impl Div for G {
    type Output = G;
    fn div(self, rhs: G) -> G {
        debug_assert!(rhs.0 != 0, "division by zero in GF(256)");
        if self.0 == 0 {
            return G(0);
        }
        let la = LOG_TABLE[self.0 as usize] as i32;
        let lb = LOG_TABLE[rhs.0 as usize] as i32;
        G(EXP_TABLE[(la - lb).rem_euclid(255) as usize])
    }
}

impl G {
    pub fn pow(self, n: u32) -> G {
        if n == 0 {
            return G(1);
        }
        if self.0 == 0 {
            return G(0);
        }
        let log = LOG_TABLE[self.0 as usize] as usize * n as usize;
        G(EXP_TABLE[log % 255])
    }

    pub fn inv(self) -> G {
        debug_assert!(self.0 != 0, "zero has no multiplicative inverse");
        G(EXP_TABLE[(255 - LOG_TABLE[self.0 as usize] as usize) % 255])
    }

    /// `alpha^p`, used to build generator polynomials and evaluate at field
    /// points during Chien search.
    pub fn gen_pow(p: u32) -> G {
        G(2).pow(p)
    }
}

// log/exp tables, alpha = 2, primitive poly 0x11D
//------------------------------------------------------------------------------

static EXP_TABLE: [u8; 256] = build_exp_table();
static LOG_TABLE: [u8; 256] = build_log_table();

const fn build_exp_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        table[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= 0x11D;
        }
        i += 1;
    }
    table[255] = table[0];
    table
}

const fn build_log_table() -> [u8; 256] {
    let exp = build_exp_table();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

// Polynomial helpers
//------------------------------------------------------------------------------

/// Evaluates a polynomial (coefficients highest-degree first) at `x`.
fn poly_eval(poly: &[G], x: G) -> G {
    poly.iter().fold(G(0), |acc, &c| acc * x + c)
}

/// Computes the remainder of `msg` divided by `gen` (both highest-degree
/// first), in place, returning a `gen.len() - 1`-long remainder. This is the
/// syndrome-free encoder-side division, reused by the decoder to test
/// whether a block is already a valid codeword (remainder all zero).
pub fn poly_div(msg: &[u8], gen: &[u8]) -> Vec<u8> {
    let mut rem: Vec<G> = msg.iter().map(|&b| G(b)).collect();
    let gen: Vec<G> = gen.iter().map(|&b| G(b)).collect();
    for i in 0..msg.len() - (gen.len() - 1) {
        let coeff = rem[i];
        if coeff.0 == 0 {
            continue;
        }
        for (j, &g) in gen.iter().enumerate() {
            rem[i + j] += g * coeff;
        }
    }
    rem[msg.len() - (gen.len() - 1)..].iter().map(|g| g.0).collect()
}

/// Generator polynomial for `ec_len` EC codewords: `prod_{i=0}^{ec_len-1} (x - alpha^i)`.
pub fn generator_polynomial(ec_len: usize) -> Vec<u8> {
    let mut poly = vec![G(1)];
    for i in 0..ec_len {
        let root = G::gen_pow(i as u32);
        let mut next = vec![G(0); poly.len() + 1];
        for (j, &c) in poly.iter().enumerate() {
            next[j] += c;
            next[j + 1] += c * root;
        }
        poly = next;
    }
    poly.iter().map(|g| g.0).collect()
}

/// Attempts to correct up to `ec_len / 2` symbol errors in `block` (data
/// codewords followed by `ec_len` EC codewords), in place.
///
/// Runs the standard syndrome -> Berlekamp-Massey -> Chien search -> Forney
/// sequence. Returns the number of corrected symbols, or
/// `QRError::ReedSolomonUncorrectable` if the syndrome can't be explained by
/// `<= ec_len/2` errors.
pub fn correct(block: &mut [u8], ec_len: usize) -> QRResult<usize> {
    let syndromes = compute_syndromes(block, ec_len);
    if syndromes.iter().all(|s| s.0 == 0) {
        return Ok(0);
    }

    let locator = berlekamp_massey(&syndromes);
    let num_errors = locator.len() - 1;
    if num_errors == 0 || num_errors > ec_len / 2 {
        return Err(QRError::ReedSolomonUncorrectable);
    }

    let error_positions = chien_search(&locator, block.len()).ok_or(QRError::ReedSolomonUncorrectable)?;
    if error_positions.len() != num_errors {
        return Err(QRError::ReedSolomonUncorrectable);
    }

    let magnitudes = forney(&locator, &syndromes, &error_positions);
    for (&pos, &mag) in error_positions.iter().zip(magnitudes.iter()) {
        let idx = block.len() - 1 - pos;
        block[idx] ^= mag.0;
    }

    let verify = compute_syndromes(block, ec_len);
    if verify.iter().any(|s| s.0 != 0) {
        return Err(QRError::ReedSolomonUncorrectable);
    }
    Ok(num_errors)
}

/// `S_i = block(alpha^i)` for `i in 0..ec_len`, treating `block` as a
/// polynomial with the first byte as the highest-degree coefficient.
fn compute_syndromes(block: &[u8], ec_len: usize) -> Vec<G> {
    let coeffs: Vec<G> = block.iter().map(|&b| G(b)).collect();
    (0..ec_len).map(|i| poly_eval(&coeffs, G::gen_pow(i as u32))).collect()
}

/// Berlekamp-Massey: finds the shortest LFSR (error locator polynomial)
/// that generates the syndrome sequence. Returned polynomial has constant
/// term 1, highest-degree coefficient last (`sigma[0] = 1`).
fn berlekamp_massey(syndromes: &[G]) -> Vec<G> {
    let mut sigma = vec![G(1)];
    let mut prev_sigma = vec![G(1)];
    let mut shift = 1;
    let mut last_discrepancy = G(1);

    for i in 0..syndromes.len() {
        let mut discrepancy = syndromes[i];
        for j in 1..sigma.len() {
            discrepancy += sigma[j] * syndromes[i - j];
        }

        if discrepancy.0 == 0 {
            shift += 1;
            continue;
        }

        if 2 * (sigma.len() - 1) <= i {
            let new_len = prev_sigma.len() + shift;
            let mut next = vec![G(0); new_len.max(sigma.len())];
            next[..sigma.len()].copy_from_slice(&sigma);
            let factor = discrepancy / last_discrepancy;
            for (j, &c) in prev_sigma.iter().enumerate() {
                next[j + shift] += factor * c;
            }
            prev_sigma = sigma;
            sigma = next;
            last_discrepancy = discrepancy;
            shift = 1;
        } else {
            let factor = discrepancy / last_discrepancy;
            for (j, &c) in prev_sigma.iter().enumerate() {
                if j + shift < sigma.len() {
                    sigma[j + shift] += factor * c;
                }
            }
            shift += 1;
        }
    }
    sigma
}

/// Chien search: tries every field element `alpha^-i` (equivalently scans
/// block positions) as a root of the locator polynomial. Returns the error
/// positions counted from the *end* of the block (0 = last codeword).
fn chien_search(locator: &[G], block_len: usize) -> Option<Vec<usize>> {
    let mut positions = Vec::new();
    for i in 0..block_len {
        let x = G::gen_pow(i as u32).inv();
        let mut sum = G(0);
        for (j, &c) in locator.iter().enumerate() {
            sum += c * x.pow(j as u32);
        }
        if sum.0 == 0 {
            positions.push(i);
        }
    }
    (!positions.is_empty()).then_some(positions)
}

/// Forney algorithm: computes the error magnitude at each located position
/// from the error-evaluator polynomial `omega = (syndrome * sigma) mod x^t`.
fn forney(locator: &[G], syndromes: &[G], positions: &[usize]) -> Vec<G> {
    let t = syndromes.len();
    let mut omega = vec![G(0); t];
    for i in 0..t {
        for j in 0..locator.len() {
            if j <= i {
                omega[i] += locator[j] * syndromes[i - j];
            }
        }
    }

    let locator_deriv: Vec<G> = locator
        .iter()
        .enumerate()
        .skip(1)
        .step_by(2)
        .map(|(_, &c)| c)
        .collect();

    positions
        .iter()
        .map(|&pos| {
            let x_inv = G::gen_pow(pos as u32).inv();
            let num = poly_eval_low_first(&omega, x_inv);
            // sigma'(x) is a polynomial in x^2 (odd-degree terms only survive
            // differentiation over GF(2^m)), so fold over x_inv squared.
            let denom = poly_eval_low_first(&locator_deriv, x_inv * x_inv);
            // e_k = X_k * omega(X_k^-1) / sigma'(X_k^-1); x_inv is X_k^-1, so
            // X_k is its inverse.
            x_inv.inv() * num / denom
        })
        .collect()
}

fn poly_eval_low_first(coeffs: &[G], x: G) -> G {
    coeffs.iter().rev().fold(G(0), |acc, &c| acc * x + c)
}

#[cfg(test)]
mod gf256_tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn field_basics() {
        assert_eq!((G(5) + G(5)).0, 0);
        assert_eq!((G(0x53) * G(0xCA)).0, 0x01);
        assert_eq!(G(7) / G(7), G(1));
    }

    #[test]
    fn poly_div_zero_on_valid_codeword() {
        let gen = generator_polynomial(10);
        let mut msg = vec![0u8; 16];
        msg.extend(poly_div(&msg, &gen));
        assert!(poly_div(&msg, &gen).iter().all(|&b| b == 0));
    }

    #[test]
    fn corrects_up_to_half_ec_errors() {
        let ec_len = 10;
        let gen = generator_polynomial(ec_len);
        let data: Vec<u8> = (0..16).map(|i| (i * 7 + 3) as u8).collect();
        let mut block = data.clone();
        block.extend(poly_div(&data, &gen));

        let corrupted_positions = [2usize, 9, 20, 25, 1];
        let mut corrupted = block.clone();
        for (k, &p) in corrupted_positions.iter().enumerate() {
            corrupted[p] ^= 0x55 + k as u8;
        }

        let fixed = correct(&mut corrupted, ec_len).expect("should correct 5 errors");
        assert_eq!(fixed, 5);
        assert_eq!(&corrupted[..16], &data[..]);
    }

    #[test_case(10, 5; "half the ec capacity, ec_len 10")]
    #[test_case(16, 1; "a single error, ec_len 16")]
    #[test_case(16, 8; "full ec capacity, ec_len 16")]
    #[test_case(30, 15; "full ec capacity, ec_len 30")]
    fn corrects_exactly_t_errors_for_various_ec_lengths(ec_len: usize, num_errors: usize) {
        let gen = generator_polynomial(ec_len);
        let data: Vec<u8> = (0..20).map(|i| (i * 11 + 5) as u8).collect();
        let mut block = data.clone();
        block.extend(poly_div(&data, &gen));

        for k in 0..num_errors {
            let pos = k * (block.len() / num_errors.max(1)) + 1;
            block[pos % block.len()] ^= 0x80 + k as u8;
        }

        let fixed = correct(&mut block, ec_len).expect("should correct within half the ec length");
        assert_eq!(fixed, num_errors);
        assert_eq!(&block[..20], &data[..]);
    }

    #[test]
    fn rejects_block_with_too_many_errors() {
        let ec_len = 10;
        let gen = generator_polynomial(ec_len);
        let data: Vec<u8> = (0..16).map(|i| (i * 3 + 1) as u8).collect();
        let mut block = data;
        block.extend(poly_div(&block, &gen));

        for p in [0, 4, 8, 12, 16, 20] {
            block[p] ^= 0xFF;
        }

        assert_eq!(correct(&mut block, ec_len), Err(QRError::ReedSolomonUncorrectable));
    }
}
