//! Sampling a located corner into a logical matrix, recovering format and
//! version info, de-masking, de-interleaving, and handing the corrected
//! codeword stream to the segment decoder.

use crate::binarize::BinaryImage;
use crate::bitstream::BitStream;
use crate::codec;
use crate::error::{QRError, QRResult};
use crate::geometry::Transform;
use crate::gf256::correct;
use crate::mask::MaskPattern;
use crate::metadata::{self, Color, ECLevel, Metadata, Version};
use crate::qr::DataModIter;

use super::finder::{build_corner, Corner, FinderCandidate, PatternScanner};

pub(crate) const ALIGNMENT_SEARCH_AREA: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct DecodedSymbol {
    pub bytes: Vec<u8>,
    pub metadata: Metadata,
}

/// One cell of the base/mask matrix: whether it's reserved (`non_data`), and
/// if its value is known from the standard (`fixed`), the expected color.
#[derive(Clone, Copy, Default)]
struct Cell {
    non_data: bool,
    fixed: Option<Color>,
    dark: bool,
}

struct LogicalMatrix {
    version: Version,
    width: i32,
    cells: Vec<Cell>,
}

impl LogicalMatrix {
    fn new(version: Version) -> Self {
        let width = version.width() as i32;
        Self { version, width, cells: vec![Cell::default(); (width * width) as usize] }
    }

    fn idx(&self, r: i32, c: i32) -> usize {
        let r = if r < 0 { r + self.width } else { r };
        let c = if c < 0 { c + self.width } else { c };
        (r * self.width + c) as usize
    }

    fn mark_fixed(&mut self, r: i32, c: i32, dark: bool) {
        let i = self.idx(r, c);
        self.cells[i].non_data = true;
        self.cells[i].fixed = Some(Color::from(dark));
    }

    fn mark_reserved(&mut self, r: i32, c: i32) {
        let i = self.idx(r, c);
        self.cells[i].non_data = true;
    }

    fn cell(&self, r: i32, c: i32) -> Cell {
        self.cells[self.idx(r, c)]
    }

    fn set_sampled(&mut self, r: i32, c: i32, dark: bool) {
        let i = self.idx(r, c);
        self.cells[i].dark = dark;
    }

    /// Stamps finder, timing, alignment, dark-module, and reserved
    /// format/version regions, mirroring the encoder's base-matrix template.
    fn stamp_function_patterns(&mut self) {
        self.stamp_finder_at(3, 3);
        self.stamp_finder_at(3, -4);
        self.stamp_finder_at(-4, 3);

        for j in 8..self.width - 8 {
            self.mark_fixed(6, j, j & 1 == 0);
        }
        for i in 8..self.width - 8 {
            self.mark_fixed(i, 6, i & 1 == 0);
        }

        for &r in self.version.alignment_pattern() {
            for &c in self.version.alignment_pattern() {
                self.stamp_alignment_at(r as i32, c as i32);
            }
        }

        let v = *self.version as i32;
        self.mark_fixed(4 * v + 9, 8, true);

        for &(r, c) in FORMAT_INFO_COORDS_MAIN.iter().chain(FORMAT_INFO_COORDS_SIDE.iter()) {
            self.mark_reserved(r, c);
        }
        self.mark_fixed(-8, 8, true);

        if *self.version >= 7 {
            for &(r, c) in VERSION_INFO_COORDS_BL.iter().chain(VERSION_INFO_COORDS_TR.iter()) {
                self.mark_reserved(r, c);
            }
        }
    }

    fn stamp_finder_at(&mut self, r: i32, c: i32) {
        let (dr_lo, dr_hi) = if r > 0 { (-3, 4) } else { (-4, 3) };
        let (dc_lo, dc_hi) = if c > 0 { (-3, 4) } else { (-4, 3) };
        for i in dr_lo..=dr_hi {
            for j in dc_lo..=dc_hi {
                let dark = !matches!((i, j), (4 | -4, _) | (_, 4 | -4) | (2 | -2, _) | (_, 2 | -2));
                self.mark_fixed(r + i, c + j, dark);
            }
        }
    }

    fn stamp_alignment_at(&mut self, r: i32, c: i32) {
        let w = self.width;
        if (r == 6 && (c == 6 || c - w == -7)) || (r - w == -7 && c == 6) {
            return;
        }
        for i in -2..=2 {
            for j in -2..=2 {
                let dark = matches!((i, j), (-2 | 2, _) | (_, -2 | 2) | (0, 0));
                self.mark_fixed(r + i, c + j, dark);
            }
        }
    }
}

static FORMAT_INFO_COORDS_MAIN: [(i32, i32); 15] = [
    (8, 0), (8, 1), (8, 2), (8, 3), (8, 4), (8, 5), (8, 7), (8, 8),
    (7, 8), (5, 8), (4, 8), (3, 8), (2, 8), (1, 8), (0, 8),
];
static FORMAT_INFO_COORDS_SIDE: [(i32, i32); 15] = [
    (-1, 8), (-2, 8), (-3, 8), (-4, 8), (-5, 8), (-6, 8), (-7, 8),
    (8, -8), (8, -7), (8, -6), (8, -5), (8, -4), (8, -3), (8, -2), (8, -1),
];
static VERSION_INFO_COORDS_BL: [(i32, i32); 18] = [
    (-9, 5), (-10, 5), (-11, 5), (-9, 4), (-10, 4), (-11, 4), (-9, 3), (-10, 3), (-11, 3),
    (-9, 2), (-10, 2), (-11, 2), (-9, 1), (-10, 1), (-11, 1), (-9, 0), (-10, 0), (-11, 0),
];
static VERSION_INFO_COORDS_TR: [(i32, i32); 18] = [
    (5, -9), (5, -10), (5, -11), (4, -9), (4, -10), (4, -11), (3, -9), (3, -10), (3, -11),
    (2, -9), (2, -10), (2, -11), (1, -9), (1, -10), (1, -11), (0, -9), (0, -10), (0, -11),
];

fn read_number(matrix: &LogicalMatrix, coords: &[(i32, i32)]) -> u32 {
    let mut v = 0u32;
    for &(r, c) in coords {
        v = (v << 1) | matrix.cell(r, c).dark as u32;
    }
    v
}

/// Attempts a full decode starting from a provisional corner: 3-point
/// transform first, then (version >= 2) an alignment-assisted 4-point retry
/// if the 3-point attempt fails on a fixed-module mismatch.
pub fn decode_corner(img: &BinaryImage, scanner: &PatternScanner, triple: [FinderCandidate; 3]) -> QRResult<DecodedSymbol> {
    let corner = build_corner(triple)?;
    let version_guess = Version::new(corner.version_estimate);
    let width = version_guess.width() as f64;

    let modules_3pt = [(3.0, 3.0), (width - 4.0, 3.0), (3.0, width - 4.0)];
    let pixels_3pt = [corner.top_left.point(), corner.top_right.point(), corner.bottom_left.point()];
    let transform = Transform::from_three_points(modules_3pt, pixels_3pt)?;

    match sample_and_decode(img, transform, version_guess) {
        Ok(symbol) => return Ok(symbol),
        Err(e) if corner.version_estimate < 2 => return Err(e),
        Err(_) => {}
    }

    let predicted = transform.map(width - 7.0, width - 7.0);
    let radius = ALIGNMENT_SEARCH_AREA * (corner.top_line_length + corner.left_line_length);
    let alignment = scanner.find_alignment_near(predicted, radius).ok_or(QRError::CornerInvalid)?;

    let modules_4pt = [(3.0, 3.0), (width - 4.0, 3.0), (3.0, width - 4.0), (width - 7.0, width - 7.0)];
    let pixels_4pt = [
        corner.top_left.point(),
        corner.top_right.point(),
        corner.bottom_left.point(),
        alignment.point(),
    ];
    let transform = Transform::from_four_points(modules_4pt, pixels_4pt)?;
    sample_and_decode(img, transform, version_guess)
}

fn sample_and_decode(img: &BinaryImage, transform: Transform, version_guess: Version) -> QRResult<DecodedSymbol> {
    let mut matrix = LogicalMatrix::new(version_guess);
    matrix.stamp_function_patterns();
    sample_all(img, &transform, &mut matrix);

    let format_main = read_number(&matrix, &FORMAT_INFO_COORDS_MAIN);
    let format_side = read_number(&matrix, &FORMAT_INFO_COORDS_SIDE);
    let (ec_level, mask) = recover_either_format(format_main, format_side)?;

    let mut version = version_guess;
    if *version_guess >= 7 {
        let v_bl = read_number(&matrix, &VERSION_INFO_COORDS_BL);
        let v_tr = read_number(&matrix, &VERSION_INFO_COORDS_TR);
        let recovered = metadata::recover_version_info(v_bl).or_else(|_| metadata::recover_version_info(v_tr))?;
        if recovered != version_guess {
            // Re-sample against the corrected version's base matrix; the
            // transform itself is unaffected since it was fit from finder
            // pixel positions, not from the (possibly wrong) version guess.
            version = recovered;
            let mut corrected = LogicalMatrix::new(version);
            corrected.stamp_function_patterns();
            sample_all(img, &transform, &mut corrected);
            matrix = corrected;
        }
    }

    check_fixed_modules(&matrix, ec_level)?;

    let mask_fn = MaskPattern::new(mask).mask_fn();
    let codewords = unload_codewords(&matrix, version, mask_fn);

    let data = deinterleave_and_correct(&codewords, version, ec_level)?;

    let mut stream = BitStream::new(&data);
    let decoded = codec::decode(&mut stream, version)?;

    Ok(DecodedSymbol {
        bytes: decoded.bytes,
        metadata: Metadata { version, ec_level, mask, eci_assignment: decoded.eci_assignment },
    })
}

fn recover_either_format(main: u32, side: u32) -> QRResult<(ECLevel, u8)> {
    metadata::recover_format_info(main).or_else(|_| metadata::recover_format_info(side))
}

fn sample_all(img: &BinaryImage, transform: &Transform, matrix: &mut LogicalMatrix) {
    let width = matrix.width;
    for r in 0..width {
        for c in 0..width {
            let (px, py) = transform.map_rounded(c as f64, r as f64);
            let dark = img.is_dark(py, px);
            matrix.set_sampled(r, c, dark);
        }
    }
}

fn check_fixed_modules(matrix: &LogicalMatrix, ec_level: ECLevel) -> QRResult<()> {
    let mut fixed_count = 0u32;
    let mut mismatches = 0u32;
    for r in 0..matrix.width {
        for c in 0..matrix.width {
            let cell = matrix.cell(r, c);
            if let Some(expected) = cell.fixed {
                fixed_count += 1;
                if (expected == Color::Dark) != cell.dark {
                    mismatches += 1;
                }
            }
        }
    }
    if fixed_count > 0 && mismatches * 100 > fixed_count * ec_level.ec_percent() {
        return Err(QRError::FixedModuleMismatch);
    }
    Ok(())
}

/// De-masks data cells and walks the zig-zag traversal to unload codewords.
fn unload_codewords(matrix: &LogicalMatrix, version: Version, mask_fn: fn(i32, i32) -> bool) -> Vec<u8> {
    let total = version.total_codewords();
    let mut out = Vec::with_capacity(total);
    let mut bits_in_byte = 0u32;
    let mut current = 0u8;

    for (r, c) in DataModIter::new(version) {
        let cell = matrix.cell(r, c);
        if cell.non_data {
            continue;
        }
        let bit = if mask_fn(r, c) { cell.dark } else { !cell.dark };
        current = (current << 1) | bit as u8;
        bits_in_byte += 1;
        if bits_in_byte == 8 {
            out.push(current);
            current = 0;
            bits_in_byte = 0;
            if out.len() == total {
                break;
            }
        }
    }
    out
}

fn deinterleave_and_correct(codewords: &[u8], version: Version, ec_level: ECLevel) -> QRResult<Vec<u8>> {
    let (dw1, n1, dw2, n2) = version.data_codewords_per_block(ec_level);
    let ec_len = version.ecc_per_block(ec_level);
    let num_blocks = n1 + n2;
    let max_dw = dw1.max(dw2);

    let mut blocks: Vec<Vec<u8>> = (0..num_blocks)
        .map(|i| Vec::with_capacity(if i < n1 { dw1 } else { dw2 } + ec_len))
        .collect();

    let mut cursor = 0usize;
    for i in 0..max_dw {
        for (b, block) in blocks.iter_mut().enumerate() {
            let dw = if b < n1 { dw1 } else { dw2 };
            if i < dw {
                block.push(codewords[cursor]);
                cursor += 1;
            }
        }
    }
    for _ in 0..ec_len {
        for block in blocks.iter_mut() {
            block.push(codewords[cursor]);
            cursor += 1;
        }
    }

    let mut out = Vec::with_capacity(version.total_codewords() - num_blocks * ec_len);
    for mut block in blocks {
        correct(&mut block, ec_len)?;
        out.extend_from_slice(&block[..block.len() - ec_len]);
    }
    Ok(out)
}
