//! Synthetic QR code generation, used only to build fixtures for the reader's
//! own test suite. Always encodes in byte mode at a caller-chosen version and
//! EC level — there is no mode-selection optimizer here, unlike a real
//! encoder, because the only consumer is "give me a symbol with this exact
//! payload to decode."

use std::ops::Deref;

use crate::error::{QRError, QRResult};
use crate::gf256::{generator_polynomial, poly_div};
use crate::mask::MaskPattern;
use crate::metadata::{ECLevel, Version};
use crate::qr::QR;

pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Version,
    ec_level: ECLevel,
    mask: MaskPattern,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8], version: Version, ec_level: ECLevel) -> Self {
        Self { data, version, ec_level, mask: MaskPattern::new(0) }
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = mask;
        self
    }

    pub fn metadata(&self) -> String {
        format!("{{ version: {}, ec_level: {} }}", *self.version, self.ec_level)
    }

    pub fn build(&self) -> QRResult<QR> {
        if self.data.is_empty() {
            return Err(QRError::BitStreamUnderflow);
        }

        let data_codewords = self.encode_byte_mode()?;
        let (data_blocks, ecc_blocks) = Self::split_into_blocks(&data_codewords, self.version, self.ec_level);

        let mut payload = Self::interleave(&data_blocks);
        payload.extend(Self::interleave(&ecc_blocks));

        let mut qr = QR::new(self.version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(&payload);
        qr.apply_mask_pattern(self.mask);

        Ok(qr)
    }

    /// Mode indicator `0100`, an 8/16-bit character count depending on
    /// version, the raw bytes, a `0000` terminator (truncated if no room),
    /// then pad bits to a byte boundary and `0xEC`/`0x11` pad bytes.
    fn encode_byte_mode(&self) -> QRResult<Vec<u8>> {
        let (d1, n1, d2, n2) = self.version.data_codewords_per_block(self.ec_level);
        let total_data_codewords = d1 * n1 + d2 * n2;
        let capacity_bits = total_data_codewords * 8;

        let len_bits = self.version.char_cnt_bits(2);
        let header_bits = 4 + len_bits;
        let body_bits = self.data.len() * 8;
        if header_bits + body_bits > capacity_bits {
            return Err(QRError::BitStreamUnderflow);
        }

        let mut bits: Vec<bool> = Vec::with_capacity(capacity_bits);
        push_bits(&mut bits, 0b0100, 4);
        push_bits(&mut bits, self.data.len() as u32, len_bits as u32);
        for &byte in self.data {
            push_bits(&mut bits, byte as u32, 8);
        }

        let terminator_len = (4).min(capacity_bits - bits.len());
        push_bits(&mut bits, 0, terminator_len as u32);
        while bits.len() % 8 != 0 {
            bits.push(false);
        }

        let mut codewords: Vec<u8> = bits
            .chunks(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
            .collect();

        let pad_bytes = [0xECu8, 0x11u8];
        let mut i = 0;
        while codewords.len() < total_data_codewords {
            codewords.push(pad_bytes[i % 2]);
            i += 1;
        }

        Ok(codewords)
    }

    fn split_into_blocks(data: &[u8], version: Version, ec_level: ECLevel) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
        let (d1, n1, d2, n2) = version.data_codewords_per_block(ec_level);
        let ec_len = version.ecc_per_block(ec_level);
        let gen = generator_polynomial(ec_len);

        let mut data_blocks = Vec::with_capacity(n1 + n2);
        let mut ecc_blocks = Vec::with_capacity(n1 + n2);
        let mut offset = 0;
        for _ in 0..n1 {
            let block = data[offset..offset + d1].to_vec();
            ecc_blocks.push(poly_div(&block, &gen));
            data_blocks.push(block);
            offset += d1;
        }
        for _ in 0..n2 {
            let block = data[offset..offset + d2].to_vec();
            ecc_blocks.push(poly_div(&block, &gen));
            data_blocks.push(block);
            offset += d2;
        }
        (data_blocks, ecc_blocks)
    }

    pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
        let max_block_size = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
        let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
        let mut res = Vec::with_capacity(total_size);
        for i in 0..max_block_size {
            for b in blocks {
                if i < b.len() {
                    res.push(b[i]);
                }
            }
        }
        res
    }
}

fn push_bits(bits: &mut Vec<bool>, value: u32, width: u32) {
    for i in (0..width).rev() {
        bits.push((value >> i) & 1 == 1);
    }
}

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn interleave_round_robins_across_blocks_of_uneven_size() {
        let blocks = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9, 0]];
        let interleaved = QRBuilder::interleave(&blocks);
        assert_eq!(interleaved, vec![1, 4, 7, 2, 5, 8, 3, 6, 9, 0]);
    }

    #[test]
    fn byte_mode_payload_fits_version_1_l_capacity() {
        let data = b"HELLO WORLD";
        let builder = QRBuilder::new(data, Version::new(1), ECLevel::L);
        let codewords = builder.encode_byte_mode().unwrap();
        assert_eq!(codewords.len(), 19);
    }

    #[test]
    fn rejects_payload_too_large_for_version() {
        let data = vec![0u8; 100];
        let builder = QRBuilder::new(&data, Version::new(1), ECLevel::L);
        assert!(matches!(builder.encode_byte_mode(), Err(QRError::BitStreamUnderflow)));
    }

    #[test]
    fn builds_a_structurally_valid_symbol() {
        let data = b"TEST123";
        let qr = QRBuilder::new(data, Version::new(1), ECLevel::M).build().unwrap();
        assert_eq!(qr.width(), 21);
    }
}
