//! Wire-format constants fixed by ISO/IEC 14492.

/// File header magic: `97 4A 42 32 0D 0A 1A 0A`.
pub const FILE_HEADER_MAGIC: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// Sentinel in the segment-data-length field meaning "unknown, scan for the
/// terminator" (§4.5).
pub const UNKNOWN_SEGMENT_LENGTH: u32 = 0xFFFF_FFFF;

/// Sentinel page height meaning "unknown, striped" (§3 Page).
pub const UNKNOWN_PAGE_HEIGHT: u32 = 0xFFFF_FFFF;

/// Page association of 0 means "global" (§3 Segment header, §4.5).
pub const GLOBAL_PAGE_ASSOCIATION: u32 = 0;

/// Canonical AT-pixel offsets for generic region template 0 (§4.6).
pub const TEMPLATE0_CANONICAL_AT: [(i8, i8); 4] = [(3, -1), (-3, -1), (2, -2), (-2, -2)];

/// Canonical AT-pixel offset for generic region template 1 (§4.6).
pub const TEMPLATE1_CANONICAL_AT: [(i8, i8); 1] = [(3, -1)];

/// Canonical AT-pixel offset for generic region template 2 (§4.6).
pub const TEMPLATE2_CANONICAL_AT: [(i8, i8); 1] = [(2, -1)];

/// Canonical AT-pixel offset for generic region template 3 (§4.6).
pub const TEMPLATE3_CANONICAL_AT: [(i8, i8); 1] = [(2, -1)];

/// Canonical AT-pixel offsets for generic refinement region template 0
/// (§4.7): one extra neighbor in the bitmap under construction, one in the
/// reference bitmap. Template 1 takes no AT pixels.
pub const REFINEMENT_TEMPLATE0_CANONICAL_AT: [(i8, i8); 2] = [(-1, -1), (-1, 1)];

/// SLTP context index per generic-region template, in template order 0..3
/// (GLOSSARY: "SLTP context").
pub const GENERIC_SLTP_CONTEXT: [u32; 4] = [0x9B25, 0x0795, 0x00E5, 0x0195];

/// SLTP context index per generic-refinement template, in template order 0..1.
pub const REFINEMENT_SLTP_CONTEXT: [u32; 2] = [0x0010, 0x0008];

/// Encoded `(magnitude_bits, offset)` pairs for the six integer-decode
/// ranges (GLOSSARY: "Integer decode ranges"), indexed by the number of
/// leading `1` prefix bits read before the terminating `0`.
///
/// Prefix `0` selects index 0, `10` selects index 1, ..., `111110` (5 ones
/// then the implicit 6th range) selects index 5.
pub const INTEGER_DECODE_RANGES: [(u32, i64); 6] = [
    (2, 0),
    (4, 4),
    (6, 20),
    (8, 84),
    (12, 340),
    (32, 4436),
];

/// Sentinel returned by integer/IAID decode runs to mark "out of band".
pub const OOB: i64 = i32::MAX as i64;
