//! Top-level decode loop: locate finder candidates, enumerate unordered
//! triples, and hand each to the corner/transform/sampling pipeline until one
//! succeeds.

mod finder;
mod symbol;

use image::{GenericImageView, Pixel};

use crate::binarize::BinaryImage;
use crate::error::{QRError, QRResult};

use finder::{FinderCandidate, PatternScanner};

pub use symbol::DecodedSymbol;

pub struct QRReader;

impl QRReader {
    /// Decodes every symbol findable in `image`, trying every unordered
    /// triple of surviving finder candidates. Corner-level failures are
    /// recovered locally: a bad triple just means the enumeration moves on.
    /// Each successfully decoded symbol carries its raw byte payload
    /// alongside diagnostics: version, EC level, mask, and ECI assignment.
    pub fn read_all<I>(image: &I) -> QRResult<Vec<DecodedSymbol>>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        debug_println!("binarizing image...");
        let img = BinaryImage::prepare(image)?;

        debug_println!("scanning for finder candidates...");
        let scanner = PatternScanner::new(&img);
        let finders = match scanner.find_finders() {
            Ok(f) => f,
            // Fewer than 3 candidates in the whole image just means "no
            // code here" (scenario: an arbitrary photograph), not a fatal
            // decode error.
            Err(QRError::InsufficientFinders) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        debug_println!("found {} finder candidates", finders.len());

        let mut results = Vec::new();

        for triple in triples(&finders) {
            debug_println!("trying a finder triple...");
            match symbol::decode_corner(&img, &scanner, triple) {
                Ok(decoded) => {
                    debug_println!("decoded symbol: {}", decoded.metadata);
                    results.push(decoded);
                }
                Err(e) => {
                    debug_println!("corner failed: {e}");
                }
            }
        }

        Ok(results)
    }

    /// Convenience wrapper returning the first successfully decoded symbol,
    /// UTF-8-decoded. Most callers that only expect one code in frame want
    /// this instead of `read_all`.
    pub fn read<I>(image: &I) -> QRResult<String>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let all = Self::read_all(image)?;
        let symbol = all.into_iter().next().ok_or(QRError::SymbolNotFound)?;
        String::from_utf8(symbol.bytes).map_err(|_| QRError::InvalidUTF8Sequence)
    }
}

/// All unordered triples of candidates, in index order — an O(n^3) walk over
/// what is in practice a handful of surviving finders.
fn triples(finders: &[FinderCandidate]) -> Vec<[FinderCandidate; 3]> {
    let mut out = Vec::new();
    let n = finders.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                out.push([finders[i], finders[j], finders[k]]);
            }
        }
    }
    out
}

#[cfg(test)]
mod reader_tests {
    use super::*;

    #[test]
    fn triples_enumerates_all_unordered_combinations() {
        let f = FinderCandidate { row: 0.0, col: 0.0, c1: 0, c2: 0, r1: 0, r2: 0, module_size: 1.0 };
        let finders = vec![f, f, f, f];
        assert_eq!(triples(&finders).len(), 4);
    }

    #[test]
    fn empty_image_yields_no_symbols() {
        let img = image::GrayImage::new(50, 50);
        let result = QRReader::read_all(&img).unwrap();
        assert!(result.is_empty());
    }
}
