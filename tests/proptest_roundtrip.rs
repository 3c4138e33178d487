//! Property-based round-trip coverage: arbitrary byte payloads, encoded at
//! a version/EC-level combination chosen to have room for them, must come
//! back out of the decoder unchanged.

use proptest::prelude::*;

use qrism::{ECLevel, QRBuilder, QRReader, Version};

fn ec_level_strategy() -> impl Strategy<Value = ECLevel> {
    prop_oneof![Just(ECLevel::L), Just(ECLevel::M), Just(ECLevel::Q), Just(ECLevel::H)]
}

/// Byte-mode capacity (in bytes) for the lowest versions, with the 4-bit
/// mode indicator and 8-bit byte-mode length field already subtracted.
/// Keeps generated payloads comfortably under the ceiling for versions 1-3.
fn capacity_for(version: usize, ec_level: ECLevel) -> usize {
    let v = Version::new(version);
    let (d1, n1, d2, n2) = v.data_codewords_per_block(ec_level);
    let total_data_codewords = d1 * n1 + d2 * n2;
    (total_data_codewords * 8 - 4 - v.char_cnt_bits(2)) / 8
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn round_trips_arbitrary_byte_payloads_at_version_1(
        ec_level in ec_level_strategy(),
        len in 1usize..capacity_for(1, ECLevel::H),
        seed in any::<u64>(),
    ) {
        let ec_level = clamp_to_capacity(ec_level, len, 1);
        let data: Vec<u8> = (0..len).map(|i| ((seed.wrapping_add(i as u64)) % 256) as u8).collect();

        let qr = QRBuilder::new(&data, Version::new(1), ec_level).build().unwrap();
        let img = qr.to_image(5);
        let symbols = QRReader::read_all(&img).unwrap();
        prop_assert_eq!(symbols.len(), 1);
        prop_assert_eq!(&symbols[0].bytes, &data);
    }

    #[test]
    fn round_trips_arbitrary_byte_payloads_at_version_5(
        ec_level in ec_level_strategy(),
        len in 1usize..capacity_for(5, ECLevel::H),
        seed in any::<u64>(),
    ) {
        let ec_level = clamp_to_capacity(ec_level, len, 5);
        let data: Vec<u8> = (0..len).map(|i| ((seed.wrapping_add(i as u64 * 3)) % 256) as u8).collect();

        let qr = QRBuilder::new(&data, Version::new(5), ec_level).build().unwrap();
        let img = qr.to_image(4);
        let symbols = QRReader::read_all(&img).unwrap();
        prop_assert_eq!(symbols.len(), 1);
        prop_assert_eq!(&symbols[0].bytes, &data);
    }
}

/// `len` was drawn against EC-H's (smallest) capacity; if the sampled
/// EC level has more room that's fine, but if it has less, fall back to `H`
/// so the payload always fits.
fn clamp_to_capacity(ec_level: ECLevel, len: usize, version: usize) -> ECLevel {
    if len <= capacity_for(version, ec_level) {
        ec_level
    } else {
        ECLevel::H
    }
}
