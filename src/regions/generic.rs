//! Generic region decoding/encoding (§4.6): template-based context
//! formation, typical prediction (TPGD), and the MMR fallback seam.

use crate::arith::{new_contexts, ArithDecoder, ArithEncoder, ContextArray};
use crate::bit_io::{BitReader, BitWriter};
use crate::bitmap::Bitmap;
use crate::cancellation::CancellationToken;
use crate::constants::{
    GENERIC_SLTP_CONTEXT, TEMPLATE0_CANONICAL_AT, TEMPLATE1_CANONICAL_AT, TEMPLATE2_CANONICAL_AT,
    TEMPLATE3_CANONICAL_AT,
};
use crate::error::{Jbig2Error, Result};
use crate::mmr::MmrDecoder;

/// Parameters from a generic region segment's own flag byte and AT-pixel
/// fields (§4.6), separate from the shared [`super::RegionInfo`].
#[derive(Debug, Clone)]
pub struct GenericRegionParams {
    pub mmr: bool,
    pub template: u8,
    pub tpgd: bool,
    pub at: Vec<(i8, i8)>,
}

impl GenericRegionParams {
    pub fn parse(reader: &mut BitReader, _segment_number: u32) -> Result<Self> {
        let flags = reader.read_u8()?;
        let mmr = flags & 0x01 != 0;
        let template = (flags >> 1) & 0x03;
        let tpgd = flags & 0x08 != 0;

        let at = if mmr {
            Vec::new()
        } else if template == 0 {
            let mut at = Vec::with_capacity(4);
            for _ in 0..4 {
                at.push((reader.read_u8()? as i8, reader.read_u8()? as i8));
            }
            at
        } else {
            vec![(reader.read_u8()? as i8, reader.read_u8()? as i8)]
        };

        Ok(Self {
            mmr,
            template,
            tpgd,
            at,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        let mut flags = (self.template & 0x03) << 1;
        if self.mmr {
            flags |= 0x01;
        }
        if self.tpgd {
            flags |= 0x08;
        }
        writer.write_u8(flags);
        for &(dx, dy) in &self.at {
            writer.write_u8(dx as u8);
            writer.write_u8(dy as u8);
        }
    }

    pub fn canonical_at(&self) -> &'static [(i8, i8)] {
        match self.template {
            0 => &TEMPLATE0_CANONICAL_AT,
            1 => &TEMPLATE1_CANONICAL_AT,
            2 => &TEMPLATE2_CANONICAL_AT,
            _ => &TEMPLATE3_CANONICAL_AT,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.at == self.canonical_at()
    }
}

/// The canonical (default) AT-pixel offsets for a template, independent of
/// any parsed segment (used by pattern dictionaries and halftone regions,
/// which always decode their embedded generic regions at canonical AT
/// positions, optionally overriding just the first one).
pub fn canonical_at_for(template: u8) -> &'static [(i8, i8)] {
    match template {
        0 => &TEMPLATE0_CANONICAL_AT,
        1 => &TEMPLATE1_CANONICAL_AT,
        2 => &TEMPLATE2_CANONICAL_AT,
        _ => &TEMPLATE3_CANONICAL_AT,
    }
}

/// Context array size for a template (§4.3 "Context cells").
pub fn context_size(template: u8) -> usize {
    match template {
        0 => 1 << 16,
        1 => 1 << 13,
        _ => 1 << 10,
    }
}

/// A single context bit position: either a fixed relative pixel, or an
/// index into the region's AT-pixel array (§4.6 "adaptive template
/// pixels"). The bit position a slot occupies is fixed by the template
/// (§6.2.5.7); only the *value* read for an `At` slot depends on where
/// this region's encoder actually placed that AT pixel.
#[derive(Clone, Copy)]
enum Slot {
    Fixed(i8, i8),
    At(usize),
}

/// The context bit layout for a template, MSB first. AT pixels occupy the
/// same bit position regardless of their configured offset — only
/// non-canonical AT placement changes which pixel value fills that slot.
fn slot_order(template: u8) -> &'static [Slot] {
    use Slot::{At, Fixed};
    match template {
        0 => &[
            At(3),
            Fixed(-1, -2), Fixed(0, -2), Fixed(1, -2),
            At(2),
            At(1),
            Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1), Fixed(2, -1),
            At(0),
            Fixed(-4, 0), Fixed(-3, 0), Fixed(-2, 0), Fixed(-1, 0),
        ],
        1 => &[
            Fixed(-1, -2), Fixed(0, -2), Fixed(1, -2), Fixed(2, -2),
            Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1), Fixed(2, -1),
            At(0),
            Fixed(-3, 0), Fixed(-2, 0), Fixed(-1, 0),
        ],
        2 => &[
            Fixed(-1, -2), Fixed(0, -2), Fixed(1, -2),
            Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1),
            At(0),
            Fixed(-2, 0), Fixed(-1, 0),
        ],
        _ => &[
            Fixed(-3, -1), Fixed(-2, -1), Fixed(-1, -1), Fixed(0, -1), Fixed(1, -1),
            At(0),
            Fixed(-4, 0), Fixed(-3, 0), Fixed(-2, 0), Fixed(-1, 0),
        ],
    }
}

#[inline]
fn pixel_or_zero(bitmap: &Bitmap, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x as u32 >= bitmap.width() || y as u32 >= bitmap.height() {
        0
    } else {
        bitmap.get_pixel(x as u32, y as u32)
    }
}

fn form_context(bitmap: &Bitmap, slots: &[Slot], at: &[(i8, i8)], x: u32, y: u32) -> u32 {
    let mut cx = 0u32;
    for &slot in slots {
        let (dx, dy) = match slot {
            Slot::Fixed(dx, dy) => (dx, dy),
            Slot::At(i) => at[i],
        };
        let px = x as i32 + dx as i32;
        let py = y as i32 + dy as i32;
        cx = (cx << 1) | pixel_or_zero(bitmap, px, py) as u32;
    }
    cx
}

pub fn decode_arith(
    dec: &mut ArithDecoder,
    contexts: &mut ContextArray,
    width: u32,
    height: u32,
    template: u8,
    at: &[(i8, i8)],
    tpgd: bool,
    cancel: &impl CancellationToken,
) -> Result<Bitmap> {
    let slots = slot_order(template);
    let mut bitmap = Bitmap::new(width, height);
    let sltp_cx = GENERIC_SLTP_CONTEXT[template as usize] as usize;
    let mut ltp = 0u8;

    for y in 0..height {
        if cancel.is_cancelled() {
            return Err(Jbig2Error::Cancelled);
        }
        if tpgd {
            let bit = dec.decode_bit(contexts, sltp_cx);
            ltp ^= bit;
            if ltp == 1 {
                if y > 0 {
                    let (above, current) = bitmap_rows_mut(&mut bitmap, y);
                    current.copy_from_slice(above);
                }
                continue;
            }
        }
        for x in 0..width {
            let cx = form_context(&bitmap, slots, at, x, y) as usize;
            let bit = dec.decode_bit(contexts, cx);
            bitmap.set_pixel(x, y, bit);
        }
    }

    Ok(bitmap)
}

fn bitmap_rows_mut(bitmap: &mut Bitmap, y: u32) -> (Vec<u8>, &mut [u8]) {
    let above = bitmap.row(y - 1).to_vec();
    (above, bitmap.row_mut(y))
}

pub fn encode_arith(
    enc: &mut ArithEncoder,
    contexts: &mut ContextArray,
    bitmap: &Bitmap,
    template: u8,
    at: &[(i8, i8)],
    tpgd: bool,
) {
    let slots = slot_order(template);
    let sltp_cx = GENERIC_SLTP_CONTEXT[template as usize] as usize;
    let mut ltp = 0u8;

    for y in 0..bitmap.height() {
        if tpgd {
            let matches_above = y > 0 && bitmap.row(y) == bitmap.row(y - 1);
            let bit = (matches_above as u8) ^ ltp;
            enc.encode_bit(contexts, sltp_cx, bit);
            ltp ^= bit;
            if ltp == 1 {
                continue;
            }
        }
        for x in 0..bitmap.width() {
            let cx = form_context(bitmap, slots, at, x, y) as usize;
            let bit = bitmap.get_pixel(x, y);
            enc.encode_bit(contexts, cx, bit);
        }
    }
}

/// Decodes a standalone generic region segment: flag/AT header plus either
/// an arithmetic-coded or MMR-coded payload.
pub fn decode_region(
    data: &[u8],
    width: u32,
    height: u32,
    segment_number: u32,
    cancel: &impl CancellationToken,
) -> Result<Bitmap> {
    let mut reader = BitReader::new(data);
    let params = GenericRegionParams::parse(&mut reader, segment_number)?;
    let payload = reader.remaining();

    if params.mmr {
        return MmrDecoder.decode(width, height, payload);
    }

    let mut dec = ArithDecoder::new(payload);
    let mut contexts = new_contexts(context_size(params.template));
    decode_arith(
        &mut dec,
        &mut contexts,
        width,
        height,
        params.template,
        &params.at,
        params.tpgd,
        cancel,
    )
}

/// Encodes a standalone generic region segment body (flag/AT header plus
/// arithmetic-coded payload); used both for top-level generic region
/// segments and, with a caller-owned encoder/contexts, embedded inside a
/// symbol dictionary's per-symbol bitmap encode (§4.8 step 3).
pub fn encode_region(bitmap: &Bitmap, template: u8, tpgd: bool) -> Vec<u8> {
    let at: Vec<(i8, i8)> = match template {
        0 => TEMPLATE0_CANONICAL_AT.to_vec(),
        1 => TEMPLATE1_CANONICAL_AT.to_vec(),
        2 => TEMPLATE2_CANONICAL_AT.to_vec(),
        _ => TEMPLATE3_CANONICAL_AT.to_vec(),
    };
    let params = GenericRegionParams {
        mmr: false,
        template,
        tpgd,
        at: at.clone(),
    };

    let mut writer = BitWriter::new();
    params.write(&mut writer);
    let mut bytes = writer.finish();

    let mut enc = ArithEncoder::new();
    let mut contexts = new_contexts(context_size(template));
    encode_arith(&mut enc, &mut contexts, bitmap, template, &at, tpgd);
    bytes.extend(enc.finish());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: u32, h: u32) -> Bitmap {
        let mut bm = Bitmap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                bm.set_pixel(x, y, ((x + y) % 2) as u8);
            }
        }
        bm
    }

    #[test]
    fn roundtrip_template0_no_tpgd() {
        let bitmap = checkerboard(17, 9);
        let bytes = encode_region(&bitmap, 0, false);
        let decoded = decode_region(&bytes, 17, 9, 1, &()).unwrap();
        for y in 0..9 {
            assert_eq!(decoded.row(y), bitmap.row(y));
        }
    }

    #[test]
    fn roundtrip_template2_with_tpgd() {
        let mut bitmap = Bitmap::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                bitmap.set_pixel(x, y, ((x / 4 + y / 4) % 2) as u8);
            }
        }
        let bytes = encode_region(&bitmap, 2, true);
        let decoded = decode_region(&bytes, 16, 16, 1, &()).unwrap();
        for y in 0..16 {
            assert_eq!(decoded.row(y), bitmap.row(y));
        }
    }

    #[test]
    fn roundtrip_width_not_multiple_of_eight() {
        let bitmap = checkerboard(7, 5);
        let bytes = encode_region(&bitmap, 0, false);
        let decoded = decode_region(&bytes, 7, 5, 1, &()).unwrap();
        assert_eq!(decoded.raw(), bitmap.raw());
    }

    #[test]
    fn parses_template_and_tpgd_flags() {
        let mut w = BitWriter::new();
        w.write_u8(0x0E); // mmr=0, template=0b11=3, tpgd=1
        w.write_u8(2); // AT dx
        w.write_u8(253u8); // AT dy = -3
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        let params = GenericRegionParams::parse(&mut r, 1).unwrap();
        assert_eq!(params.template, 3);
        assert!(params.tpgd);
        assert!(!params.mmr);
        assert_eq!(params.at, vec![(2, -3)]);
    }
}
