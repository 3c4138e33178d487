//! Turns a raster image into the `H x W` boolean grid the rest of the
//! pipeline works over (`true` = dark module candidate).
//!
//! The reference behavior is a single global threshold computed from a
//! perceptual-luminance conversion: simple, deterministic, and not a
//! normative part of the QR standard — callers needing more robustness
//! against uneven lighting can substitute an adaptive threshold without
//! touching anything downstream of `BinaryImage`.

use image::{GenericImageView, Pixel};

use crate::error::{QRError, QRResult};

pub struct BinaryImage {
    width: usize,
    height: usize,
    dark: Vec<bool>,
}

impl BinaryImage {
    pub fn prepare<I>(img: &I) -> QRResult<Self>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(QRError::BinarizationFailed);
        }
        let (width, height) = (w as usize, h as usize);

        let mut luminance = vec![0u8; width * height];
        let mut sum: u64 = 0;
        for (x, y, px) in img.pixels() {
            let l = perceptual_luminance(&px);
            luminance[y as usize * width + x as usize] = l;
            sum += l as u64;
        }
        let threshold = (sum / (width * height) as u64) as u8;

        let dark = luminance.iter().map(|&l| l < threshold).collect();
        Ok(Self { width, height, dark })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_dark(&self, r: i64, c: i64) -> bool {
        if r < 0 || c < 0 || r as usize >= self.height || c as usize >= self.width {
            return false;
        }
        self.dark[r as usize * self.width + c as usize]
    }
}

fn perceptual_luminance<P: Pixel<Subpixel = u8>>(px: &P) -> u8 {
    let channels = px.channels();
    match channels.len() {
        1 => channels[0],
        2 => channels[0],
        _ => {
            let (r, g, b) = (channels[0] as f32, channels[1] as f32, channels[2] as f32);
            (0.299 * r + 0.587 * g + 0.114 * b) as u8
        }
    }
}

#[cfg(test)]
mod binarize_tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn rejects_zero_sized_image() {
        let img = GrayImage::new(0, 0);
        assert!(matches!(BinaryImage::prepare(&img), Err(QRError::BinarizationFailed)));
    }

    #[test]
    fn splits_on_global_threshold() {
        let mut img = GrayImage::new(4, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([0]));
        img.put_pixel(2, 0, Luma([255]));
        img.put_pixel(3, 0, Luma([255]));
        let bin = BinaryImage::prepare(&img).unwrap();
        assert!(bin.is_dark(0, 0));
        assert!(bin.is_dark(0, 1));
        assert!(!bin.is_dark(0, 2));
        assert!(!bin.is_dark(0, 3));
    }

    #[test]
    fn out_of_bounds_reads_as_light() {
        let img = GrayImage::new(2, 2);
        let bin = BinaryImage::prepare(&img).unwrap();
        assert!(!bin.is_dark(-1, 0));
        assert!(!bin.is_dark(0, 5));
    }
}
