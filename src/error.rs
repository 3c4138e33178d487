use std::fmt;

/// Everything that can abort a single corner's decode attempt.
///
/// These are never panics: every stage that can fail returns `QRResult`,
/// and the top-level reader loop treats `Err` as "try the next triple of
/// finders" rather than propagating to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QRError {
    BinarizationFailed,
    InsufficientFinders,
    CornerInvalid,
    TransformSingular,
    VersionUnreadable,
    FormatUnreadable,
    FixedModuleMismatch,
    ReedSolomonUncorrectable,
    BitStreamUnderflow,
    InvalidMode(u8),
    EciEncodingMalformed,
    SymbolNotFound,
    InvalidUTF8Sequence,
}

impl fmt::Display for QRError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinarizationFailed => write!(f, "image has zero width or height"),
            Self::InsufficientFinders => write!(f, "fewer than 3 finder candidates after dedup"),
            Self::CornerInvalid => write!(f, "finder triple failed L-shape/ratio/angle test"),
            Self::TransformSingular => write!(f, "Gaussian elimination hit an unresolvable zero pivot"),
            Self::VersionUnreadable => write!(f, "both version-info copies exceed Hamming distance 3"),
            Self::FormatUnreadable => write!(f, "both format-info copies exceed Hamming distance 3"),
            Self::FixedModuleMismatch => write!(f, "sampled fixed-module error rate above EC-level threshold"),
            Self::ReedSolomonUncorrectable => write!(f, "block has more errors than the code can correct"),
            Self::BitStreamUnderflow => write!(f, "bit stream asked for more bits than remain"),
            Self::InvalidMode(m) => write!(f, "unsupported or unhandled mode indicator {m:#06b}"),
            Self::EciEncodingMalformed => write!(f, "ECI designator byte sequence malformed"),
            Self::SymbolNotFound => write!(f, "no finder triple in the image decoded to a valid symbol"),
            Self::InvalidUTF8Sequence => write!(f, "decoded byte payload is not valid UTF-8"),
        }
    }
}

impl std::error::Error for QRError {}

pub type QRResult<T> = Result<T, QRError>;
