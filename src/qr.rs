//! The encoder-side module grid. This is test scaffolding: the reader never
//! constructs a `QR`, but `QRBuilder` (kept in-tree for generating synthetic
//! fixtures) draws into one, and rendering it to an `image::GrayImage` gives
//! the decode pipeline something real to chew on in tests.

use std::ops::Deref;

use crate::mask::MaskPattern;
use crate::metadata::{self, Color, ECLevel, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Empty,
    Func(Color),
    Version(Color),
    Format(Color),
    Data(Color),
}

impl Deref for Module {
    type Target = Color;
    fn deref(&self) -> &Self::Target {
        match self {
            Module::Empty => &Color::Dark,
            Module::Func(c) | Module::Version(c) | Module::Format(c) | Module::Data(c) => c,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QR {
    version: Version,
    width: usize,
    ec_level: ECLevel,
    grid: Vec<Module>,
}

impl QR {
    pub fn new(version: Version, ec_level: ECLevel) -> Self {
        let width = version.width();
        Self { version, width, ec_level, grid: vec![Module::Empty; width * width] }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn coord_to_index(&self, r: i32, c: i32) -> usize {
        let w = self.width as i32;
        let r = if r < 0 { r + w } else { r };
        let c = if c < 0 { c + w } else { c };
        (r * w + c) as usize
    }

    pub fn get(&self, r: i32, c: i32) -> Module {
        self.grid[self.coord_to_index(r, c)]
    }

    pub fn set(&mut self, r: i32, c: i32, module: Module) {
        let idx = self.coord_to_index(r, c);
        self.grid[idx] = module;
    }

    fn draw_finder_pattern_at(&mut self, r: i32, c: i32) {
        let (dr_lo, dr_hi) = if r > 0 { (-3, 4) } else { (-4, 3) };
        let (dc_lo, dc_hi) = if c > 0 { (-3, 4) } else { (-4, 3) };
        for i in dr_lo..=dr_hi {
            for j in dc_lo..=dc_hi {
                let color = match (i, j) {
                    (4 | -4, _) | (_, 4 | -4) => Color::Light,
                    (3 | -3, _) | (_, 3 | -3) => Color::Dark,
                    (2 | -2, _) | (_, 2 | -2) => Color::Light,
                    _ => Color::Dark,
                };
                self.set(r + i, c + j, Module::Func(color));
            }
        }
    }

    fn draw_finder_patterns(&mut self) {
        self.draw_finder_pattern_at(3, 3);
        self.draw_finder_pattern_at(3, -4);
        self.draw_finder_pattern_at(-4, 3);
    }

    fn draw_line(&mut self, r1: i32, c1: i32, r2: i32, c2: i32) {
        debug_assert!(r1 == r2 || c1 == c2);
        if r1 == r2 {
            for j in c1..=c2 {
                self.set(r1, j, Module::Func(if j & 1 == 0 { Color::Dark } else { Color::Light }));
            }
        } else {
            for i in r1..=r2 {
                self.set(i, c1, Module::Func(if i & 1 == 0 { Color::Dark } else { Color::Light }));
            }
        }
    }

    fn draw_timing_patterns(&mut self) {
        let w = self.width as i32;
        self.draw_line(6, 8, 6, w - 9);
        self.draw_line(8, 6, w - 9, 6);
    }

    fn draw_alignment_pattern_at(&mut self, r: i32, c: i32) {
        let w = self.width as i32;
        if (r == 6 && (c == 6 || c - w == -7)) || (r - w == -7 && c == 6) {
            return;
        }
        for i in -2..=2 {
            for j in -2..=2 {
                let color = match (i, j) {
                    (-2 | 2, _) | (_, -2 | 2) | (0, 0) => Color::Dark,
                    _ => Color::Light,
                };
                self.set(r + i, c + j, Module::Func(color));
            }
        }
    }

    fn draw_alignment_patterns(&mut self) {
        for &r in self.version.alignment_pattern() {
            for &c in self.version.alignment_pattern() {
                self.draw_alignment_pattern_at(r as i32, c as i32);
            }
        }
    }

    fn draw_dark_module(&mut self) {
        let v = *self.version as i32;
        self.set(4 * v + 9, 8, Module::Func(Color::Dark));
    }

    fn draw_number(&mut self, number: u32, bit_len: usize, module_at: impl Fn(Color) -> Module, coords: &[(i32, i32)]) {
        let mut mask = 1u32 << (bit_len - 1);
        for &(r, c) in coords {
            let color = if number & mask == 0 { Color::Light } else { Color::Dark };
            self.set(r, c, module_at(color));
            mask >>= 1;
        }
    }

    fn draw_format_info(&mut self, format_info: u32) {
        self.draw_number(format_info, metadata::FORMAT_INFO_BIT_LEN, Module::Format, &FORMAT_INFO_COORDS_MAIN);
        self.draw_number(format_info, metadata::FORMAT_INFO_BIT_LEN, Module::Format, &FORMAT_INFO_COORDS_SIDE);
        self.set(-8, 8, Module::Format(Color::Dark));
    }

    fn reserve_format_area(&mut self) {
        self.draw_format_info((1 << metadata::FORMAT_INFO_BIT_LEN) - 1);
    }

    fn draw_version_info(&mut self) {
        if *self.version < 7 {
            return;
        }
        let info = self.version.version_info();
        self.draw_number(info, metadata::VERSION_INFO_BIT_LEN, Module::Version, &VERSION_INFO_COORDS_BL);
        self.draw_number(info, metadata::VERSION_INFO_BIT_LEN, Module::Version, &VERSION_INFO_COORDS_TR);
    }

    pub fn draw_all_function_patterns(&mut self) {
        self.draw_finder_patterns();
        self.draw_timing_patterns();
        self.draw_alignment_patterns();
        self.draw_dark_module();
        self.reserve_format_area();
        self.draw_version_info();
    }

    fn draw_payload(&mut self, payload: &[u8]) {
        let mut coords = DataModIter::new(self.version);
        for &codeword in payload {
            for i in (0..8).rev() {
                let bit = (codeword >> i) & 1;
                let color = if bit == 0 { Color::Dark } else { Color::Light };
                let mut rc = coords.next().expect("data capacity overflow");
                while self.get(rc.0, rc.1) != Module::Empty {
                    rc = coords.next().expect("data capacity overflow");
                }
                self.set(rc.0, rc.1, Module::Data(color));
            }
        }
        for (r, c) in coords {
            if self.get(r, c) == Module::Empty {
                self.set(r, c, Module::Data(Color::Light));
            }
        }
    }

    pub fn draw_encoding_region(&mut self, payload: &[u8]) {
        self.draw_payload(payload);
    }

    pub fn apply_mask_pattern(&mut self, pattern: MaskPattern) {
        let mask_fn = pattern.mask_fn();
        let w = self.width as i32;
        for r in 0..w {
            for c in 0..w {
                if mask_fn(r, c) {
                    if let Module::Data(color) = self.get(r, c) {
                        self.set(r, c, Module::Data(!color));
                    }
                }
            }
        }
        let format_info = metadata::generate_format_info(self.ec_level, *pattern);
        self.draw_format_info(format_info);
    }

    pub fn count_dark_modules(&self) -> usize {
        self.grid.iter().filter(|m| ***m == Color::Dark).count()
    }

    /// Renders the symbol (with a 4-module quiet zone) as an `image::GrayImage`.
    pub fn to_image(&self, module_size: u32) -> image::GrayImage {
        let qz = 4 * module_size;
        let side = self.width as u32 * module_size + 2 * qz;
        image::GrayImage::from_fn(side, side, |px, py| {
            if px < qz || py < qz || px >= qz + self.width as u32 * module_size || py >= qz + self.width as u32 * module_size {
                return image::Luma([255]);
            }
            let c = (px - qz) / module_size;
            let r = (py - qz) / module_size;
            let color = *self.get(r as i32, c as i32);
            image::Luma([if color == Color::Dark { 0 } else { 255 }])
        })
    }
}

pub(crate) struct DataModIter {
    r: i32,
    c: i32,
    width: i32,
}

impl DataModIter {
    pub(crate) fn new(version: Version) -> Self {
        let w = version.width() as i32;
        Self { r: w - 1, c: w - 1, width: w }
    }
}

impl Iterator for DataModIter {
    type Item = (i32, i32);
    fn next(&mut self) -> Option<Self::Item> {
        let adjusted_col = if self.c <= 6 { self.c + 1 } else { self.c };
        if self.c < 0 {
            return None;
        }
        let res = (self.r, self.c);
        let col_type = (self.width - adjusted_col) % 4;
        match col_type {
            2 if self.r > 0 => {
                self.r -= 1;
                self.c += 1;
            }
            0 if self.r < self.width - 1 => {
                self.r += 1;
                self.c += 1;
            }
            0 | 2 if self.c == 7 => {
                self.c -= 2;
            }
            _ => self.c -= 1,
        }
        Some(res)
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
