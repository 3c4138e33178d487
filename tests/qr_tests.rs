//! End-to-end tests driving the decoder over synthetic bitmaps built with
//! the in-tree `QRBuilder`. These exercise the whole pipeline: binarize,
//! locate finders, rectify, recover format/version, de-mask, de-interleave,
//! Reed-Solomon correct, decode segments, the way a caller handing over a
//! real image would.

use image::{GenericImage, GrayImage, Luma};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use qrism::{ECLevel, MaskPattern, QRBuilder, QRReader, Version};

fn render(data: &[u8], version: usize, ec_level: ECLevel, module_size: u32) -> GrayImage {
    QRBuilder::new(data, Version::new(version), ec_level).build().unwrap().to_image(module_size)
}

/// Inverts the pixel block for one module, given coordinates relative to a
/// symbol corner the way the format/version-info tables express them
/// (negative indices wrap to the far edge, mirroring `QR::set`).
fn flip_module(img: &mut GrayImage, version: usize, module_size: u32, r: i32, c: i32) {
    let width = Version::new(version).width() as i32;
    let r = (if r < 0 { r + width } else { r }) as u32;
    let c = (if c < 0 { c + width } else { c }) as u32;
    let qz = 4 * module_size;
    for dy in 0..module_size {
        for dx in 0..module_size {
            let px = qz + c * module_size + dx;
            let py = qz + r * module_size + dy;
            let p = *img.get_pixel(px, py);
            img.put_pixel(px, py, Luma([255 - p.0[0]]));
        }
    }
}

const FORMAT_INFO_COORDS_MAIN: [(i32, i32); 15] = [
    (8, 0), (8, 1), (8, 2), (8, 3), (8, 4), (8, 5), (8, 7), (8, 8),
    (7, 8), (5, 8), (4, 8), (3, 8), (2, 8), (1, 8), (0, 8),
];

const VERSION_INFO_COORDS_BL: [(i32, i32); 18] = [
    (-9, 5), (-10, 5), (-11, 5), (-9, 4), (-10, 4), (-11, 4), (-9, 3), (-10, 3), (-11, 3),
    (-9, 2), (-10, 2), (-11, 2), (-9, 1), (-10, 1), (-11, 1), (-9, 0), (-10, 0), (-11, 0),
];

const VERSION_INFO_COORDS_TR: [(i32, i32); 18] = [
    (5, -9), (5, -10), (5, -11), (4, -9), (4, -10), (4, -11), (3, -9), (3, -10), (3, -11),
    (2, -9), (2, -10), (2, -11), (1, -9), (1, -10), (1, -11), (0, -9), (0, -10), (0, -11),
];

#[test]
fn decodes_version_1_ec_l_byte_mode() {
    // Comfortably within version 1 / EC L's 17-byte byte-mode ceiling.
    let data = b"Bugs Bunny 1940!";
    let img = render(data, 1, ECLevel::L, 4);

    let symbols = QRReader::read_all(&img).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].bytes, data);
    assert_eq!(symbols[0].metadata.version, Version::new(1));
    assert_eq!(symbols[0].metadata.ec_level, ECLevel::L);
}

#[test]
fn decodes_a_longer_payload_at_the_smallest_version_it_fits() {
    // "Bugs Bunny\n07/27/1940" is 21 bytes, past version 1/EC L's 17-byte
    // byte-mode ceiling; version 2 is the smallest version that holds it.
    let data = b"Bugs Bunny\n07/27/1940";
    let img = render(data, 2, ECLevel::L, 4);

    let symbols = QRReader::read_all(&img).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(String::from_utf8(symbols[0].bytes.clone()).unwrap(), "Bugs Bunny\n07/27/1940");
}

#[test]
fn no_qr_code_in_an_arbitrary_image_yields_empty_result() {
    // A smooth gradient has no 1:1:3:1:1 runs anywhere; stands in for "an
    // arbitrary photograph" without needing a real one on disk.
    let img = GrayImage::from_fn(200, 150, |x, y| Luma([((x + y) % 256) as u8]));
    let symbols = QRReader::read_all(&img).unwrap();
    assert!(symbols.is_empty());
}

#[test]
fn two_disjoint_qr_codes_both_recovered() {
    let data_a = b"first code";
    let data_b = b"SECOND CODE 123";
    let img_a = render(data_a, 1, ECLevel::M, 4);
    let img_b = render(data_b, 1, ECLevel::L, 4);

    let width = img_a.width().max(img_b.width());
    let height = img_a.height() + img_b.height() + 30;
    let mut canvas = GrayImage::from_pixel(width + 20, height, Luma([255]));
    canvas.copy_from(&img_a, 10, 10).unwrap();
    canvas.copy_from(&img_b, 10, img_a.height() + 20).unwrap();

    let mut symbols = QRReader::read_all(&canvas).unwrap();
    assert_eq!(symbols.len(), 2);
    symbols.sort_by(|a, b| a.bytes.cmp(&b.bytes));
    assert_eq!(symbols[0].bytes, data_a);
    assert_eq!(symbols[1].bytes, data_b);
}

#[test]
fn corner_builder_identifies_top_left_under_90_180_270_rotation() {
    let data = b"rotate me";
    let img = render(data, 2, ECLevel::M, 4);

    for &theta in &[
        std::f32::consts::FRAC_PI_2,
        std::f32::consts::PI,
        3.0 * std::f32::consts::FRAC_PI_2,
    ] {
        let rotated = rotate_about_center(&img, theta, Interpolation::Nearest, Luma([255]));
        let symbols = QRReader::read_all(&rotated).unwrap();
        assert_eq!(symbols.len(), 1, "failed to decode at theta={theta}");
        assert_eq!(symbols[0].bytes, data);
    }
}

#[test]
fn version_7_decodes_with_bit_flips_in_both_version_info_copies() {
    let data = vec![0x42u8; 100];
    let mut img = render(&data, 7, ECLevel::M, 3);

    // One bit flipped in the bottom-left copy, two in the top-right copy;
    // both are within the Hamming-distance-3 BCH tolerance independently.
    flip_module(&mut img, 7, 3, VERSION_INFO_COORDS_BL[0].0, VERSION_INFO_COORDS_BL[0].1);
    flip_module(&mut img, 7, 3, VERSION_INFO_COORDS_TR[2].0, VERSION_INFO_COORDS_TR[2].1);
    flip_module(&mut img, 7, 3, VERSION_INFO_COORDS_TR[5].0, VERSION_INFO_COORDS_TR[5].1);

    let symbols = QRReader::read_all(&img).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].bytes, data);
    assert_eq!(symbols[0].metadata.version, Version::new(7));
}

#[test]
fn format_info_decodes_with_up_to_3_bit_errors() {
    let data = b"format errors";
    let mut img = render(data, 3, ECLevel::H, 4);

    flip_module(&mut img, 3, 4, FORMAT_INFO_COORDS_MAIN[0].0, FORMAT_INFO_COORDS_MAIN[0].1);
    flip_module(&mut img, 3, 4, FORMAT_INFO_COORDS_MAIN[4].0, FORMAT_INFO_COORDS_MAIN[4].1);
    flip_module(&mut img, 3, 4, FORMAT_INFO_COORDS_MAIN[9].0, FORMAT_INFO_COORDS_MAIN[9].1);

    let symbols = QRReader::read_all(&img).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].bytes, data);
    assert_eq!(symbols[0].metadata.ec_level, ECLevel::H);
}

#[test]
fn version_40_largest_symbol_decodes() {
    let data: Vec<u8> = (0..200).map(|i| (i * 37) as u8).collect();
    let img = render(&data, 40, ECLevel::L, 3);

    let symbols = QRReader::read_all(&img).unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].bytes, data);
    assert_eq!(symbols[0].metadata.version, Version::new(40));
}

#[test]
fn all_four_ec_levels_round_trip() {
    for ec_level in [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H] {
        let data = b"EC level sweep";
        let img = render(data, 3, ec_level, 4);
        let symbols = QRReader::read_all(&img).unwrap();
        assert_eq!(symbols.len(), 1, "failed for {ec_level}");
        assert_eq!(symbols[0].bytes, data);
        assert_eq!(symbols[0].metadata.ec_level, ec_level);
    }
}

#[test]
fn all_eight_mask_patterns_round_trip() {
    for pattern in 0..8u8 {
        let data = b"mask sweep payload";
        let mut builder = QRBuilder::new(data, Version::new(2), ECLevel::M);
        builder.mask(MaskPattern::new(pattern));
        let qr = builder.build().unwrap();
        let img = qr.to_image(4);

        let symbols = QRReader::read_all(&img).unwrap();
        assert_eq!(symbols.len(), 1, "failed for mask {pattern}");
        assert_eq!(symbols[0].bytes, data);
        assert_eq!(symbols[0].metadata.mask, pattern);
    }
}

#[test]
fn decoding_is_idempotent() {
    let data = b"idempotence check";
    let img = render(data, 4, ECLevel::Q, 4);

    let first = QRReader::read_all(&img).unwrap();
    let second = QRReader::read_all(&img).unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].bytes, second[0].bytes);
    assert_eq!(first[0].metadata.version, second[0].metadata.version);
    assert_eq!(first[0].metadata.mask, second[0].metadata.mask);
}

#[test]
fn read_convenience_wrapper_utf8_decodes_first_symbol() {
    let data = "Bugs Bunny\n07/27/1940";
    let img = render(data.as_bytes(), 2, ECLevel::L, 4);
    assert_eq!(QRReader::read(&img).unwrap(), data);
}
