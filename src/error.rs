//! Error taxonomy for the JBIG2 codec.
//!
//! Every fallible codec operation returns [`Jbig2Error`]. Variants mirror the
//! taxonomy of the standard's error conditions rather than wrapping
//! `std::io::Error`: the codec operates over in-memory byte slices, so there
//! is no I/O layer to surface failures from.

use thiserror::Error;

/// Errors surfaced by segment parsing, region/dictionary decoding, and
/// encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Jbig2Error {
    /// The file header's 8-byte magic did not match `97 4A 42 32 0D 0A 1A 0A`.
    #[error("invalid JBIG2 file header magic")]
    InvalidMagic,

    /// The input ended before a header or segment-data read could complete.
    #[error("truncated stream: needed {needed} more byte(s) at offset {offset}")]
    TruncatedStream { offset: usize, needed: usize },

    /// A segment header carried a type code the standard does not define.
    #[error("invalid segment type code {code} in segment {segment_number}")]
    InvalidSegmentType { segment_number: u32, code: u8 },

    /// A referred-to segment number was not found, or was found but is not
    /// the kind of segment the referrer expects (e.g. a text region
    /// referring to a segment that is not a symbol dictionary).
    #[error("segment {segment_number} refers to unresolvable segment {referred}")]
    InvalidReference { segment_number: u32, referred: u32 },

    /// A field value fell outside its permitted range (template ID > 3,
    /// zero-width region, malformed combination-operator code, ...).
    #[error("invalid parameter `{field}` in segment {segment_number}: {detail}")]
    InvalidParameters {
        segment_number: u32,
        field: &'static str,
        detail: String,
    },

    /// A syntactically valid but unimplemented variant was encountered
    /// (unknown-length segment, MMR payload, ...).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    /// The arithmetic decoder's renormalization needed a byte beyond the end
    /// of the bounded substream.
    #[error("arithmetic decode failure at bit position {bit_position}")]
    ArithmeticDecodeFailure { bit_position: u64 },

    /// The Huffman trie walk consumed bits past the end of the substream
    /// without reaching a leaf.
    #[error("huffman decode failure: ran off the end of the code table")]
    HuffmanDecodeFailure,

    /// A caller-supplied cancellation token fired mid-decode.
    #[error("decode cancelled")]
    Cancelled,

    /// The encoder's output buffer would exceed the 2^31 byte limit.
    #[error("encoded output exceeds maximum size")]
    TooLarge,
}

pub type Result<T> = std::result::Result<T, Jbig2Error>;
