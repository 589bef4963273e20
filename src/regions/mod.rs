//! Region segment decoders/encoders (§4.6-4.10): generic, generic
//! refinement, text, and pattern/halftone.

pub mod generic;
pub mod halftone;
pub mod refinement;
pub mod text;

use crate::bit_io::BitReader;
use crate::bitmap::{parse_combination_operator, CombinationOperator};
use crate::error::Result;

/// The region segment information field shared by every region segment
/// type (§3 "Region segment info").
#[derive(Debug, Clone, Copy)]
pub struct RegionInfo {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
    pub combination_operator: CombinationOperator,
}

impl RegionInfo {
    pub fn parse(reader: &mut BitReader, segment_number: u32) -> Result<Self> {
        let width = reader.read_u32()?;
        let height = reader.read_u32()?;
        let x = reader.read_u32()?;
        let y = reader.read_u32()?;
        let flags = reader.read_u8()?;
        let combination_operator = parse_combination_operator(flags & 0x07, segment_number)?;
        Ok(Self {
            width,
            height,
            x,
            y,
            combination_operator,
        })
    }

    pub fn write(&self, writer: &mut crate::bit_io::BitWriter) {
        writer.write_u32(self.width);
        writer.write_u32(self.height);
        writer.write_u32(self.x);
        writer.write_u32(self.y);
        writer.write_u8(u8::from(self.combination_operator));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_io::BitWriter;

    #[test]
    fn region_info_roundtrip() {
        let info = RegionInfo {
            width: 54,
            height: 44,
            x: 4,
            y: 11,
            combination_operator: CombinationOperator::Or,
        };
        let mut w = BitWriter::new();
        info.write(&mut w);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        let parsed = RegionInfo::parse(&mut r, 1).unwrap();
        assert_eq!(parsed.width, 54);
        assert_eq!(parsed.x, 4);
        assert_eq!(parsed.combination_operator, CombinationOperator::Or);
    }
}
