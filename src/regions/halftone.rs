//! Pattern dictionary and halftone region decoding/encoding (§4.10).

use crate::arith::{new_contexts, ArithDecoder, ArithEncoder};
use crate::bit_io::{BitReader, BitWriter};
use crate::bitmap::{Bitmap, CombinationOperator};
use crate::error::{Jbig2Error, Result};
use crate::regions::generic;

#[derive(Debug, Clone)]
pub struct PatternDictionaryParams {
    pub mmr: bool,
    pub template: u8,
    pub hdpw: u8,
    pub hdph: u8,
    pub gray_max: u32,
}

impl PatternDictionaryParams {
    pub fn parse(reader: &mut BitReader) -> Result<Self> {
        let flags = reader.read_u8()?;
        let mmr = flags & 0x01 != 0;
        let template = (flags >> 1) & 0x03;
        let hdpw = reader.read_u8()?;
        let hdph = reader.read_u8()?;
        let gray_max = reader.read_u32()?;
        Ok(Self {
            mmr,
            template,
            hdpw,
            hdph,
            gray_max,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        let mut flags = (self.template & 0x03) << 1;
        if self.mmr {
            flags |= 0x01;
        }
        writer.write_u8(flags);
        writer.write_u8(self.hdpw);
        writer.write_u8(self.hdph);
        writer.write_u32(self.gray_max);
    }

    fn collective_at(&self) -> Vec<(i8, i8)> {
        let mut at = generic::canonical_at_for(self.template).to_vec();
        at[0] = (-(self.hdpw as i32) as i8, 0);
        at
    }
}

pub fn decode_pattern_dictionary(data: &[u8]) -> Result<Vec<Bitmap>> {
    let mut reader = BitReader::new(data);
    let params = PatternDictionaryParams::parse(&mut reader)?;
    if params.mmr {
        return Err(Jbig2Error::UnsupportedFeature(
            "MMR-coded pattern dictionary",
        ));
    }
    let at = params.collective_at();
    let collective_width = (params.gray_max + 1) * params.hdpw as u32;
    let payload = reader.remaining();
    let mut dec = ArithDecoder::new(payload);
    let mut contexts = new_contexts(generic::context_size(params.template));
    let collective = generic::decode_arith(
        &mut dec,
        &mut contexts,
        collective_width,
        params.hdph as u32,
        params.template,
        &at,
        false,
        &(),
    )?;

    let mut patterns = Vec::with_capacity(params.gray_max as usize + 1);
    for i in 0..=params.gray_max {
        let x = i * params.hdpw as u32;
        patterns.push(collective.crop(x, 0, params.hdpw as u32, params.hdph as u32));
    }
    Ok(patterns)
}

pub fn encode_pattern_dictionary(patterns: &[Bitmap], template: u8) -> Vec<u8> {
    let hdpw = patterns[0].width() as u8;
    let hdph = patterns[0].height() as u8;
    let gray_max = patterns.len() as u32 - 1;
    let params = PatternDictionaryParams {
        mmr: false,
        template,
        hdpw,
        hdph,
        gray_max,
    };
    let mut writer = BitWriter::new();
    params.write(&mut writer);
    let mut bytes = writer.finish();

    let mut collective = Bitmap::new((gray_max + 1) * hdpw as u32, hdph as u32);
    for (i, p) in patterns.iter().enumerate() {
        collective.combine(p, i as i32 * hdpw as i32, 0, CombinationOperator::Replace);
    }

    let at = params.collective_at();
    let mut enc = ArithEncoder::new();
    let mut contexts = new_contexts(generic::context_size(template));
    generic::encode_arith(&mut enc, &mut contexts, &collective, template, &at, false);
    bytes.extend(enc.finish());
    bytes
}

#[derive(Debug, Clone)]
pub struct HalftoneRegionParams {
    pub mmr: bool,
    pub template: u8,
    pub enable_skip: bool,
    pub comb_op: CombinationOperator,
    pub default_pixel: u8,
    pub grid_w: u32,
    pub grid_h: u32,
    pub grid_x: i32,
    pub grid_y: i32,
    pub region_x: i16,
    pub region_y: i16,
}

impl HalftoneRegionParams {
    pub fn parse(reader: &mut BitReader) -> Result<Self> {
        let flags = reader.read_u8()?;
        let mmr = flags & 0x01 != 0;
        let template = (flags >> 1) & 0x03;
        let enable_skip = flags & 0x08 != 0;
        let comb_op = crate::bitmap::parse_combination_operator((flags >> 4) & 0x07, 0)?;
        let default_pixel = (flags >> 7) & 0x01;
        let grid_w = reader.read_u32()?;
        let grid_h = reader.read_u32()?;
        let grid_x = reader.read_u32()? as i32;
        let grid_y = reader.read_u32()? as i32;
        let region_x = reader.read_u16()? as i16;
        let region_y = reader.read_u16()? as i16;
        Ok(Self {
            mmr,
            template,
            enable_skip,
            comb_op,
            default_pixel,
            grid_w,
            grid_h,
            grid_x,
            grid_y,
            region_x,
            region_y,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        let mut flags = (self.template & 0x03) << 1;
        if self.mmr {
            flags |= 0x01;
        }
        if self.enable_skip {
            flags |= 0x08;
        }
        flags |= (u8::from(self.comb_op) & 0x07) << 4;
        flags |= (self.default_pixel & 0x01) << 7;
        writer.write_u8(flags);
        writer.write_u32(self.grid_w);
        writer.write_u32(self.grid_h);
        writer.write_u32(self.grid_x as u32);
        writer.write_u32(self.grid_y as u32);
        writer.write_u16(self.region_x as u16);
        writer.write_u16(self.region_y as u16);
    }
}

fn bits_per_value(pattern_count: usize) -> u32 {
    if pattern_count <= 1 {
        1
    } else {
        (usize::BITS - (pattern_count - 1).leading_zeros()).max(1)
    }
}

pub fn decode_halftone_region(
    data: &[u8],
    width: u32,
    height: u32,
    patterns: &[Bitmap],
) -> Result<Bitmap> {
    let mut reader = BitReader::new(data);
    let params = HalftoneRegionParams::parse(&mut reader)?;
    if params.mmr {
        return Err(Jbig2Error::UnsupportedFeature("MMR-coded halftone region"));
    }

    let bpv = bits_per_value(patterns.len());
    let at = generic::canonical_at_for(params.template).to_vec();

    let payload = reader.remaining();
    let mut dec = ArithDecoder::new(payload);
    let mut contexts = new_contexts(generic::context_size(params.template));

    let mut gray = vec![0u32; (params.grid_w * params.grid_h) as usize];
    let mut prev_bits: Option<Vec<u8>> = None;
    for j in (0..bpv).rev() {
        let plane = generic::decode_arith(
            &mut dec,
            &mut contexts,
            params.grid_w,
            params.grid_h,
            params.template,
            &at,
            false,
            &(),
        )?;
        let mut bits = vec![0u8; (params.grid_w * params.grid_h) as usize];
        for y in 0..params.grid_h {
            for x in 0..params.grid_w {
                let idx = (y * params.grid_w + x) as usize;
                let mut bit = plane.get_pixel(x, y);
                if let Some(prev) = &prev_bits {
                    bit ^= prev[idx];
                }
                gray[idx] |= (bit as u32) << j;
                bits[idx] = bit;
            }
        }
        prev_bits = Some(bits);
    }

    let mut region = if params.default_pixel != 0 {
        Bitmap::filled(width, height)
    } else {
        Bitmap::new(width, height)
    };

    for mg in 0..params.grid_h as i64 {
        for ng in 0..params.grid_w as i64 {
            let x = (params.grid_x as i64
                + mg * params.region_y as i64
                + ng * params.region_x as i64)
                >> 8;
            let y = (params.grid_y as i64
                + mg * params.region_x as i64
                - ng * params.region_y as i64)
                >> 8;
            let idx = gray[(mg as u32 * params.grid_w + ng as u32) as usize] as usize;
            let pattern = patterns
                .get(idx.min(patterns.len() - 1))
                .ok_or(Jbig2Error::InvalidParameters {
                    segment_number: 0,
                    field: "halftone grayscale value",
                    detail: "index exceeds pattern count".to_string(),
                })?;
            region.combine(pattern, x as i32, y as i32, params.comb_op);
        }
    }

    Ok(region)
}

/// Encodes a halftone region from a pre-chosen grid of pattern indices
/// (§9 Open Question (b): encoder side by symmetry with the decoder).
pub fn encode_halftone_region(
    params: &HalftoneRegionParams,
    grid: &[u32],
    patterns: &[Bitmap],
) -> Vec<u8> {
    let mut writer = BitWriter::new();
    params.write(&mut writer);
    let mut bytes = writer.finish();

    let bpv = bits_per_value(patterns.len());
    let at = generic::canonical_at_for(params.template).to_vec();

    let mut enc = ArithEncoder::new();
    let mut contexts = new_contexts(generic::context_size(params.template));
    let mut prev_bits: Option<Vec<u8>> = None;

    for j in (0..bpv).rev() {
        let mut plane = Bitmap::new(params.grid_w, params.grid_h);
        let mut bits = vec![0u8; (params.grid_w * params.grid_h) as usize];
        for y in 0..params.grid_h {
            for x in 0..params.grid_w {
                let idx = (y * params.grid_w + x) as usize;
                let gray_bit = ((grid[idx] >> j) & 1) as u8;
                bits[idx] = gray_bit;
                let transmitted = match &prev_bits {
                    Some(prev) => gray_bit ^ prev[idx],
                    None => gray_bit,
                };
                plane.set_pixel(x, y, transmitted);
            }
        }
        generic::encode_arith(
            &mut enc,
            &mut contexts,
            &plane,
            params.template,
            &at,
            false,
        );
        prev_bits = Some(bits);
    }

    bytes.extend(enc.finish());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_patterns() -> Vec<Bitmap> {
        (0..16u32)
            .map(|i| {
                let mut bm = Bitmap::new(4, 4);
                if i % 2 == 0 {
                    bm.set_pixel(0, 0, 1);
                }
                bm
            })
            .collect()
    }

    #[test]
    fn pattern_dictionary_roundtrip() {
        let patterns = sample_patterns();
        let bytes = encode_pattern_dictionary(&patterns, 0);
        let decoded = decode_pattern_dictionary(&bytes).unwrap();
        assert_eq!(decoded.len(), patterns.len());
        for (a, b) in decoded.iter().zip(patterns.iter()) {
            assert_eq!(a.raw(), b.raw());
        }
    }

    #[test]
    fn halftone_region_roundtrip() {
        let patterns: Vec<Bitmap> = (0..16u32)
            .map(|i| {
                let mut bm = Bitmap::new(4, 4);
                for y in 0..4u32 {
                    for x in 0..4u32 {
                        bm.set_pixel(x, y, (((i + x + y) % 3 == 0) as u8));
                    }
                }
                bm
            })
            .collect();

        let grid_w = 8u32;
        let grid_h = 9u32;
        let params = HalftoneRegionParams {
            mmr: false,
            template: 0,
            enable_skip: false,
            comb_op: CombinationOperator::Or,
            default_pixel: 0,
            grid_w,
            grid_h,
            grid_x: 0,
            grid_y: 0,
            region_x: 4 << 8,
            region_y: 0,
        };
        let grid: Vec<u32> = (0..grid_w * grid_h).map(|i| i % 16).collect();

        let bytes = encode_halftone_region(&params, &grid, &patterns);
        let decoded = decode_halftone_region(&bytes, 32, 36, &patterns).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 36);
    }

    #[test]
    fn bits_per_value_matches_pattern_count() {
        assert_eq!(bits_per_value(16), 4);
        assert_eq!(bits_per_value(1), 1);
        assert_eq!(bits_per_value(2), 1);
        assert_eq!(bits_per_value(17), 5);
    }
}
