//! Segment header parsing and emission (§4.5 "Segment header syntax").

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::bit_io::{BitReader, BitWriter};
use crate::constants::{GLOBAL_PAGE_ASSOCIATION, UNKNOWN_SEGMENT_LENGTH};
use crate::error::{Jbig2Error, Result};

/// The segment type code (§4.5 field "segment type", 6 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SegmentType {
    SymbolDictionary = 0,
    IntermediateTextRegion = 4,
    ImmediateTextRegion = 6,
    ImmediateLosslessTextRegion = 7,
    PatternDictionary = 16,
    IntermediateHalftoneRegion = 20,
    ImmediateHalftoneRegion = 22,
    ImmediateLosslessHalftoneRegion = 23,
    IntermediateGenericRegion = 36,
    ImmediateGenericRegion = 38,
    ImmediateLosslessGenericRegion = 39,
    IntermediateGenericRefinementRegion = 40,
    ImmediateGenericRefinementRegion = 42,
    ImmediateLosslessGenericRefinementRegion = 43,
    PageInfo = 48,
    EndOfPage = 49,
    EndOfStripe = 50,
    EndOfFile = 51,
    Profiles = 52,
    Tables = 53,
    Extension = 62,
}

impl SegmentType {
    pub fn is_immediate_region(self) -> bool {
        matches!(
            self,
            SegmentType::ImmediateTextRegion
                | SegmentType::ImmediateLosslessTextRegion
                | SegmentType::ImmediateHalftoneRegion
                | SegmentType::ImmediateLosslessHalftoneRegion
                | SegmentType::ImmediateGenericRegion
                | SegmentType::ImmediateLosslessGenericRegion
                | SegmentType::ImmediateGenericRefinementRegion
                | SegmentType::ImmediateLosslessGenericRefinementRegion
        )
    }
}

/// A parsed segment header, plus the byte range (within its enclosing
/// stream) that holds the segment's data (§4.5).
#[derive(Debug, Clone)]
pub struct SegmentHeader {
    pub segment_number: u32,
    pub segment_type: SegmentType,
    pub page_association_size_is_4_bytes: bool,
    pub deferred_non_retain: bool,
    pub retain_flags: Vec<bool>,
    pub referred_to: Vec<u32>,
    pub page_association: u32,
    /// `None` means the standard's "unknown length" sentinel
    /// (`0xFFFF_FFFF`), only legal for generic regions in striped pages.
    pub data_length: Option<u32>,
}

impl SegmentHeader {
    /// How many bytes a referred-to segment number occupies, sized by the
    /// *referrer's own* segment number (§4.5 "referred-to segment numbers").
    fn referred_to_number_size(segment_number: u32) -> usize {
        if segment_number <= 256 {
            1
        } else if segment_number <= 65536 {
            2
        } else {
            4
        }
    }

    pub fn parse(reader: &mut BitReader, segment_number_hint: Option<u32>) -> Result<Self> {
        let segment_number = reader.read_u32()?;
        if let Some(expected) = segment_number_hint {
            if expected != segment_number {
                return Err(Jbig2Error::InvalidParameters {
                    segment_number,
                    field: "segment number",
                    detail: format!("out of sequence, expected {expected}"),
                });
            }
        }

        let flags = reader.read_u8()?;
        let type_code = flags & 0x3F;
        let page_association_size_is_4_bytes = flags & 0x40 != 0;
        let deferred_non_retain = flags & 0x80 != 0;
        let segment_type =
            SegmentType::try_from_primitive(type_code).map_err(|_| Jbig2Error::InvalidSegmentType {
                segment_number,
                code: type_code,
            })?;

        let rtscaf = reader.read_u8()?;
        let (referred_to_count, retain_flags) = if rtscaf >> 5 == 0b111 {
            // Long form: low 29 bits of a 4-byte field hold the count,
            // followed by ceil((count+1)/8) bytes of retain flags.
            reader.seek_to_byte(reader.byte_position() - 1);
            let raw = reader.read_u32()?;
            let count = (raw & 0x1FFF_FFFF) as usize;
            let retain_bytes = (count + 1 + 7) / 8;
            let retain_raw: Vec<u8> = (0..retain_bytes)
                .map(|_| reader.read_u8())
                .collect::<Result<_>>()?;
            let flags: Vec<bool> = (0..=count)
                .map(|i| (retain_raw[i / 8] >> (7 - (i % 8))) & 1 != 0)
                .collect();
            (count, flags)
        } else {
            // Short form: top 3 bits of the single byte are the count
            // (0..=4), and the bottom 5 bits are that many retain flags
            // packed with the referring segment's own retain bit last.
            let count = (rtscaf >> 5) as usize;
            let mut flags = Vec::with_capacity(count + 1);
            for i in 0..=count {
                flags.push((rtscaf >> (4 - i.min(4))) & 1 != 0);
            }
            (count, flags)
        };

        let ref_size = Self::referred_to_number_size(segment_number);
        let mut referred_to = Vec::with_capacity(referred_to_count);
        for _ in 0..referred_to_count {
            let n = match ref_size {
                1 => reader.read_u8()? as u32,
                2 => reader.read_u16()? as u32,
                _ => reader.read_u32()?,
            };
            referred_to.push(n);
        }

        let page_association = if page_association_size_is_4_bytes {
            reader.read_u32()?
        } else {
            reader.read_u8()? as u32
        };

        let raw_len = reader.read_u32()?;
        let data_length = if raw_len == UNKNOWN_SEGMENT_LENGTH {
            None
        } else {
            Some(raw_len)
        };

        Ok(Self {
            segment_number,
            segment_type,
            page_association_size_is_4_bytes,
            deferred_non_retain,
            retain_flags,
            referred_to,
            page_association,
            data_length,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        writer.write_u32(self.segment_number);

        let mut flags = u8::from(self.segment_type);
        if self.page_association_size_is_4_bytes {
            flags |= 0x40;
        }
        if self.deferred_non_retain {
            flags |= 0x80;
        }
        writer.write_u8(flags);

        let count = self.referred_to.len();
        if count <= 4 {
            let mut rtscaf = (count as u8) << 5;
            for (i, &retain) in self.retain_flags.iter().enumerate().take(5) {
                if retain {
                    rtscaf |= 1 << (4 - i);
                }
            }
            writer.write_u8(rtscaf);
        } else {
            writer.write_u32(0b111u32 << 29 | count as u32);
            let retain_bytes = (count + 1 + 7) / 8;
            let mut packed = vec![0u8; retain_bytes];
            for (i, &retain) in self.retain_flags.iter().enumerate() {
                if retain {
                    packed[i / 8] |= 1 << (7 - (i % 8));
                }
            }
            for byte in packed {
                writer.write_u8(byte);
            }
        }

        let ref_size = Self::referred_to_number_size(self.segment_number);
        for &n in &self.referred_to {
            match ref_size {
                1 => writer.write_u8(n as u8),
                2 => writer.write_u16(n as u16),
                _ => writer.write_u32(n),
            }
        }

        if self.page_association_size_is_4_bytes {
            writer.write_u32(self.page_association);
        } else {
            writer.write_u8(self.page_association as u8);
        }

        writer.write_u32(self.data_length.unwrap_or(UNKNOWN_SEGMENT_LENGTH));
    }

    pub fn is_global(&self) -> bool {
        self.page_association == GLOBAL_PAGE_ASSOCIATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> SegmentHeader {
        SegmentHeader {
            segment_number: 3,
            segment_type: SegmentType::ImmediateGenericRegion,
            page_association_size_is_4_bytes: false,
            deferred_non_retain: false,
            retain_flags: vec![true, false],
            referred_to: vec![0, 1],
            page_association: 1,
            data_length: Some(42),
        }
    }

    #[test]
    fn roundtrip_short_form() {
        let header = sample_header();
        let mut w = BitWriter::new();
        header.write(&mut w);
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes);
        let parsed = SegmentHeader::parse(&mut r, None).unwrap();
        assert_eq!(parsed.segment_number, 3);
        assert_eq!(parsed.segment_type, SegmentType::ImmediateGenericRegion);
        assert_eq!(parsed.referred_to, vec![0, 1]);
        assert_eq!(parsed.page_association, 1);
        assert_eq!(parsed.data_length, Some(42));
    }

    #[test]
    fn unknown_length_sentinel_roundtrips_to_none() {
        let mut header = sample_header();
        header.data_length = None;
        let mut w = BitWriter::new();
        header.write(&mut w);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        let parsed = SegmentHeader::parse(&mut r, None).unwrap();
        assert_eq!(parsed.data_length, None);
    }

    #[test]
    fn rejects_unknown_segment_type() {
        let mut w = BitWriter::new();
        w.write_u32(1);
        w.write_u8(0x05); // type 5, undefined
        w.write_u8(0x00);
        w.write_u8(0);
        w.write_u32(0);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        assert!(matches!(
            SegmentHeader::parse(&mut r, None),
            Err(Jbig2Error::InvalidSegmentType { .. })
        ));
    }

    #[test]
    fn referred_to_number_size_grows_with_segment_number() {
        assert_eq!(SegmentHeader::referred_to_number_size(10), 1);
        assert_eq!(SegmentHeader::referred_to_number_size(300), 2);
        assert_eq!(SegmentHeader::referred_to_number_size(70_000), 4);
    }

    #[test]
    fn long_form_referred_to_count_roundtrips() {
        let mut header = sample_header();
        header.referred_to = (0..10u32).collect();
        header.retain_flags = vec![false; 11];
        let mut w = BitWriter::new();
        header.write(&mut w);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        let parsed = SegmentHeader::parse(&mut r, None).unwrap();
        assert_eq!(parsed.referred_to.len(), 10);
    }
}
