//! Text region decoding/encoding (§4.9): strip-wise placement of symbol
//! instances from a combined (imported + new) symbol table.

use crate::arith::{
    decode_iaid, decode_int, encode_iaid, encode_int, encode_oob, new_contexts, ArithDecoder,
    ArithEncoder, ContextArray, IntCtx, IntDecoderContexts, IntEncoderContexts,
};
use crate::bit_io::{BitReader, BitWriter};
use crate::bitmap::{Bitmap, CombinationOperator};
use crate::cancellation::CancellationToken;
use crate::constants::OOB;
use crate::error::{Jbig2Error, Result};
use crate::huffman::{self, Table};
use crate::regions::refinement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCorner {
    BottomLeft,
    TopLeft,
    BottomRight,
    TopRight,
}

impl ReferenceCorner {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ReferenceCorner::BottomLeft,
            1 => ReferenceCorner::TopLeft,
            2 => ReferenceCorner::BottomRight,
            _ => ReferenceCorner::TopRight,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            ReferenceCorner::BottomLeft => 0,
            ReferenceCorner::TopLeft => 1,
            ReferenceCorner::BottomRight => 2,
            ReferenceCorner::TopRight => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextRegionParams {
    pub huffman: bool,
    pub refine: bool,
    pub log_strips: u8,
    pub ref_corner: ReferenceCorner,
    pub transposed: bool,
    pub comb_op: CombinationOperator,
    pub default_pixel: u8,
    pub ds_offset: i8,
    pub r_template: u8,
    pub r_at: Vec<(i8, i8)>,
    pub huffman_tables: HuffmanTableSelectors,
    pub num_instances: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanTableSelectors {
    pub fs: u8,
    pub ds: u8,
    pub dt: u8,
    pub rdw: u8,
    pub rdh: u8,
    pub rdx: u8,
    pub rdy: u8,
    pub rsize: u8,
}

impl TextRegionParams {
    pub fn parse(reader: &mut BitReader) -> Result<Self> {
        let flags = reader.read_u16()?;
        let huffman = flags & 0x0001 != 0;
        let refine = flags & 0x0002 != 0;
        let log_strips = ((flags >> 2) & 0x03) as u8;
        let ref_corner = ReferenceCorner::from_bits(((flags >> 4) & 0x03) as u8);
        let transposed = (flags >> 6) & 0x01 != 0;
        let comb_op = crate::bitmap::parse_combination_operator(((flags >> 7) & 0x03) as u8, 0)?;
        let default_pixel = ((flags >> 9) & 0x01) as u8;
        let raw_offset = ((flags >> 10) & 0x1F) as u8;
        let ds_offset = sign_extend_5(raw_offset);
        let r_template = ((flags >> 15) & 0x01) as u8;

        let huffman_tables = if huffman {
            let hflags = reader.read_u16()?;
            HuffmanTableSelectors {
                fs: (hflags & 0x03) as u8,
                ds: ((hflags >> 2) & 0x03) as u8,
                dt: ((hflags >> 4) & 0x03) as u8,
                rdw: ((hflags >> 6) & 0x03) as u8,
                rdh: ((hflags >> 8) & 0x03) as u8,
                rdx: ((hflags >> 10) & 0x03) as u8,
                rdy: ((hflags >> 12) & 0x03) as u8,
                rsize: ((hflags >> 14) & 0x01) as u8,
            }
        } else {
            HuffmanTableSelectors::default()
        };

        let r_at = if refine && r_template == 0 {
            let mut at = Vec::with_capacity(2);
            for _ in 0..2 {
                at.push((reader.read_u8()? as i8, reader.read_u8()? as i8));
            }
            at
        } else {
            Vec::new()
        };

        let num_instances = reader.read_u32()?;

        Ok(Self {
            huffman,
            refine,
            log_strips,
            ref_corner,
            transposed,
            comb_op,
            default_pixel,
            ds_offset,
            r_template,
            r_at,
            huffman_tables,
            num_instances,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        let mut flags: u16 = 0;
        if self.huffman {
            flags |= 0x0001;
        }
        if self.refine {
            flags |= 0x0002;
        }
        flags |= (self.log_strips as u16 & 0x03) << 2;
        flags |= (self.ref_corner.to_bits() as u16 & 0x03) << 4;
        if self.transposed {
            flags |= 0x0040;
        }
        flags |= (u8::from(self.comb_op) as u16 & 0x03) << 7;
        flags |= (self.default_pixel as u16 & 0x01) << 9;
        flags |= ((self.ds_offset as u8 & 0x1F) as u16) << 10;
        flags |= (self.r_template as u16 & 0x01) << 15;
        writer.write_u16(flags);

        if self.huffman {
            let h = &self.huffman_tables;
            let hflags: u16 = (h.fs as u16 & 0x03)
                | ((h.ds as u16 & 0x03) << 2)
                | ((h.dt as u16 & 0x03) << 4)
                | ((h.rdw as u16 & 0x03) << 6)
                | ((h.rdh as u16 & 0x03) << 8)
                | ((h.rdx as u16 & 0x03) << 10)
                | ((h.rdy as u16 & 0x03) << 12)
                | ((h.rsize as u16 & 0x01) << 14);
            writer.write_u16(hflags);
        }

        if self.refine && self.r_template == 0 {
            for &(dx, dy) in &self.r_at {
                writer.write_u8(dx as u8);
                writer.write_u8(dy as u8);
            }
        }

        writer.write_u32(self.num_instances);
    }

    pub fn strips(&self) -> u32 {
        1 << self.log_strips
    }
}

fn sign_extend_5(raw: u8) -> i8 {
    if raw & 0x10 != 0 {
        (raw as i8) - 32
    } else {
        raw as i8
    }
}

fn select_standard_table(selector: u8, choices: &[fn() -> Table]) -> Result<Table> {
    choices
        .get(selector as usize)
        .map(|f| f())
        .ok_or(Jbig2Error::UnsupportedFeature(
            "custom (non-default) text region Huffman table selector",
        ))
}

/// SBSYMCODELEN for arithmetic-coded text regions (§6.4.10): the number of
/// bits IAID reads, with no floor at 1 — a region with a single symbol
/// reads zero bits per instance.
fn symbol_code_len(num_symbols: usize) -> u32 {
    if num_symbols == 0 {
        0
    } else {
        usize::BITS - (num_symbols - 1).leading_zeros()
    }
}

/// `CURS`'s pre-draw adjustment (§4.9 step vi): right/bottom reference
/// corners need the symbol's far edge located before its bitmap is placed.
fn pre_draw_advance(transposed: bool, ref_corner: ReferenceCorner, w: i32, h: i32) -> i32 {
    if !transposed
        && matches!(
            ref_corner,
            ReferenceCorner::TopRight | ReferenceCorner::BottomRight
        )
    {
        w - 1
    } else if transposed
        && matches!(
            ref_corner,
            ReferenceCorner::BottomLeft | ReferenceCorner::BottomRight
        )
    {
        h - 1
    } else {
        0
    }
}

/// `CURS`'s post-draw adjustment (§4.9 step xi): left/top reference
/// corners advance the cursor past the symbol only after it is placed.
fn post_draw_advance(transposed: bool, ref_corner: ReferenceCorner, w: i32, h: i32) -> i32 {
    if !transposed
        && matches!(
            ref_corner,
            ReferenceCorner::TopLeft | ReferenceCorner::BottomLeft
        )
    {
        w - 1
    } else if transposed
        && matches!(
            ref_corner,
            ReferenceCorner::TopLeft | ReferenceCorner::TopRight
        )
    {
        h - 1
    } else {
        0
    }
}

/// The symbol bitmap's placement origin given `S_I`/`T_I` and REFCORNER
/// (§4.9 step viii): which corner of the bitmap lands at `(S_I, T_I)`
/// (or `(T_I, S_I)` when TRANSPOSED) depends on `ref_corner`.
fn compute_location(
    s_i: i32,
    t_i: i32,
    w: i32,
    h: i32,
    transposed: bool,
    ref_corner: ReferenceCorner,
) -> (i32, i32) {
    if !transposed {
        match ref_corner {
            ReferenceCorner::TopLeft => (s_i, t_i),
            ReferenceCorner::TopRight => (s_i - w + 1, t_i),
            ReferenceCorner::BottomLeft => (s_i, t_i - h + 1),
            ReferenceCorner::BottomRight => (s_i - w + 1, t_i - h + 1),
        }
    } else {
        match ref_corner {
            ReferenceCorner::TopLeft => (t_i, s_i),
            ReferenceCorner::TopRight => (t_i - w + 1, s_i),
            ReferenceCorner::BottomLeft => (t_i, s_i - h + 1),
            ReferenceCorner::BottomRight => (t_i - w + 1, s_i - h + 1),
        }
    }
}

/// Advances `CURS` and blits one symbol instance (§4.9 step 4): applies the
/// pre-draw adjustment, records `S_I`, places the bitmap at the corner
/// REFCORNER names, then applies the post-draw adjustment. Returns the
/// updated `CURS` for the next instance in the strip.
fn place_symbol(
    canvas: &mut Bitmap,
    symbol: &Bitmap,
    curs: i32,
    t_i: i32,
    transposed: bool,
    ref_corner: ReferenceCorner,
    comb_op: CombinationOperator,
) -> i32 {
    let w = symbol.width() as i32;
    let h = symbol.height() as i32;
    let mut curs = curs + pre_draw_advance(transposed, ref_corner, w, h);
    let s_i = curs;
    let (x, y) = compute_location(s_i, t_i, w, h, transposed, ref_corner);
    canvas.combine(symbol, x, y, comb_op);
    curs += post_draw_advance(transposed, ref_corner, w, h);
    curs
}

#[allow(clippy::too_many_arguments)]
fn decode_symbol_bitmap(
    dec: &mut ArithDecoder,
    int_ctxs: &mut IntDecoderContexts,
    refine_ctxs: &mut ContextArray,
    symbols: &[Bitmap],
    id: usize,
    params: &TextRegionParams,
) -> Result<Bitmap> {
    let base = symbols
        .get(id)
        .ok_or(Jbig2Error::InvalidParameters {
            segment_number: 0,
            field: "text region symbol id",
            detail: format!("{id} out of range for {} symbols", symbols.len()),
        })?
        .clone();
    if !params.refine {
        return Ok(base);
    }
    let ri = decode_int(dec, int_ctxs, IntCtx::Iari);
    if ri == 0 {
        return Ok(base);
    }
    let rdw = decode_int(dec, int_ctxs, IntCtx::Iardw);
    let rdh = decode_int(dec, int_ctxs, IntCtx::Iardh);
    let rdx = decode_int(dec, int_ctxs, IntCtx::Iardx);
    let rdy = decode_int(dec, int_ctxs, IntCtx::Iardy);
    let new_w = (base.width() as i64 + rdw).max(1) as u32;
    let new_h = (base.height() as i64 + rdh).max(1) as u32;
    let ref_dx = (rdw >> 1) + rdx;
    let ref_dy = (rdh >> 1) + rdy;
    refinement::decode_arith(
        dec,
        refine_ctxs,
        new_w,
        new_h,
        &base,
        ref_dx as i32,
        ref_dy as i32,
        params.r_template,
        &params.r_at,
        false,
        &(),
    )
}

pub fn decode_arith(
    data: &[u8],
    width: u32,
    height: u32,
    symbols: &[Bitmap],
    params: &TextRegionParams,
    cancel: &impl CancellationToken,
) -> Result<Bitmap> {
    let mut dec = ArithDecoder::new(data);
    let mut int_ctxs = IntDecoderContexts::default();
    let code_len = symbol_code_len(symbols.len());
    let mut iaid_ctxs = new_contexts(1usize << code_len);
    let mut refine_ctxs = new_contexts(refinement::context_size(params.r_template));

    let mut canvas = if params.default_pixel != 0 {
        Bitmap::filled(width, height)
    } else {
        Bitmap::new(width, height)
    };

    let strips = params.strips() as i64;
    let mut strip_t = -decode_int(&mut dec, &mut int_ctxs, IntCtx::Iadt) * strips;
    let mut first_s = 0i64;
    let mut placed = 0u32;

    while placed < params.num_instances {
        if cancel.is_cancelled() {
            return Err(Jbig2Error::Cancelled);
        }
        let dt = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iadt);
        if dt == OOB {
            break;
        }
        strip_t += dt * strips;

        let dfs = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iafs);
        first_s += dfs;
        let mut current_s = first_s;
        let mut first_in_strip = true;

        loop {
            if !first_in_strip {
                let ds = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iads);
                if ds == OOB {
                    break;
                }
                current_s += ds + params.ds_offset as i64;
            }
            first_in_strip = false;

            let cur_t = if strips == 1 {
                0
            } else {
                decode_int(&mut dec, &mut int_ctxs, IntCtx::Iait)
            };
            let t = strip_t + cur_t;

            let id = decode_iaid(&mut dec, &mut iaid_ctxs, code_len) as usize;
            let symbol = decode_symbol_bitmap(
                &mut dec,
                &mut int_ctxs,
                &mut refine_ctxs,
                symbols,
                id,
                params,
            )?;

            current_s = place_symbol(
                &mut canvas,
                &symbol,
                current_s as i32,
                t as i32,
                params.transposed,
                params.ref_corner,
                params.comb_op,
            ) as i64;
            placed += 1;
            if placed >= params.num_instances {
                break;
            }
        }
    }

    Ok(canvas)
}

pub fn decode_huffman(
    data: &[u8],
    width: u32,
    height: u32,
    symbols: &[Bitmap],
    params: &TextRegionParams,
) -> Result<Bitmap> {
    let h = &params.huffman_tables;
    let fs_table = select_standard_table(h.fs, &[huffman::table_b6, huffman::table_b7])?;
    let ds_table = select_standard_table(
        h.ds,
        &[huffman::table_b8, huffman::table_b9, huffman::table_b10],
    )?;
    let dt_table = select_standard_table(
        h.dt,
        &[huffman::table_b11, huffman::table_b12, huffman::table_b13],
    )?;
    let rdw_table = select_standard_table(h.rdw, &[huffman::table_b14, huffman::table_b15])?;
    let rdh_table = select_standard_table(h.rdh, &[huffman::table_b14, huffman::table_b15])?;
    let rdx_table = select_standard_table(h.rdx, &[huffman::table_b14, huffman::table_b15])?;
    let rdy_table = select_standard_table(h.rdy, &[huffman::table_b14, huffman::table_b15])?;
    if h.rsize != 0 {
        return Err(Jbig2Error::UnsupportedFeature(
            "custom symbol instance size table",
        ));
    }

    let mut reader = BitReader::new(data);
    let id_table = decode_symbol_id_table(&mut reader, symbols.len())?;

    let mut canvas = if params.default_pixel != 0 {
        Bitmap::filled(width, height)
    } else {
        Bitmap::new(width, height)
    };

    let strips = params.strips() as i64;
    let mut strip_t = -dt_table.decode(&mut reader)? * strips;
    let mut first_s = 0i64;
    let mut placed = 0u32;

    while placed < params.num_instances {
        let dt = dt_table.decode(&mut reader)?;
        strip_t += dt * strips;

        let dfs = fs_table.decode(&mut reader)?;
        first_s += dfs;
        let mut current_s = first_s;
        let mut first_in_strip = true;

        loop {
            if !first_in_strip {
                match ds_table.decode(&mut reader) {
                    Ok(ds) if ds != OOB => current_s += ds + params.ds_offset as i64,
                    _ => break,
                }
            }
            first_in_strip = false;

            let cur_t = if strips == 1 {
                0
            } else {
                reader.read_bits(params.log_strips as u32)? as i64
            };
            let t = strip_t + cur_t;

            let id = id_table.decode(&mut reader)? as usize;
            let mut symbol = symbols
                .get(id)
                .ok_or(Jbig2Error::InvalidParameters {
                    segment_number: 0,
                    field: "text region symbol id",
                    detail: format!("{id} out of range"),
                })?
                .clone();

            if params.refine {
                let ri = reader.read_bit()?;
                if ri != 0 {
                    let rdw = rdw_table.decode(&mut reader)?;
                    let rdh = rdh_table.decode(&mut reader)?;
                    let rdx = rdx_table.decode(&mut reader)?;
                    let rdy = rdy_table.decode(&mut reader)?;
                    let _bmsize = huffman::table_b1().decode(&mut reader)?;
                    reader.align_to_byte();
                    let new_w = (symbol.width() as i64 + rdw).max(1) as u32;
                    let new_h = (symbol.height() as i64 + rdh).max(1) as u32;
                    let ref_dx = (rdw >> 1) + rdx;
                    let ref_dy = (rdh >> 1) + rdy;
                    let payload = reader.remaining();
                    let mut dec = ArithDecoder::new(payload);
                    let mut ctxs = new_contexts(refinement::context_size(params.r_template));
                    symbol = refinement::decode_arith(
                        &mut dec,
                        &mut ctxs,
                        new_w,
                        new_h,
                        &symbol,
                        ref_dx as i32,
                        ref_dy as i32,
                        params.r_template,
                        &params.r_at,
                        false,
                        &(),
                    )?;
                    // Approximate resync: the arithmetic decoder's own
                    // lookahead means this may overshoot by a byte or two.
                    reader.seek_to_byte(reader.byte_position() + dec.bit_position() as usize / 8);
                }
            }

            current_s = place_symbol(
                &mut canvas,
                &symbol,
                current_s as i32,
                t as i32,
                params.transposed,
                params.ref_corner,
                params.comb_op,
            ) as i64;
            placed += 1;
            if placed >= params.num_instances {
                break;
            }
        }
    }

    Ok(canvas)
}

/// Decodes the Huffman-mode symbol ID code length table and assigns
/// canonical codes for `num_symbols` symbols (§4.9 "symbol ID Huffman
/// lengths"): 35 run-code lengths, then run-length-coded per-symbol code
/// lengths, canonically assigned per §B.3.
fn decode_symbol_id_table(reader: &mut BitReader, num_symbols: usize) -> Result<Table> {
    let mut runcode_lines = Vec::with_capacity(35);
    for i in 0..35 {
        let len = reader.read_bits(4)?;
        runcode_lines.push(huffman::Line::normal(len, 0, i as i64));
    }
    let runcode_table = Table::new(&runcode_lines);

    let mut lengths: Vec<u8> = Vec::with_capacity(num_symbols);
    while lengths.len() < num_symbols {
        let runcode = runcode_table.decode(reader)?;
        match runcode {
            0..=31 => lengths.push(runcode as u8),
            32 => {
                let extra = reader.read_bits(2)? as usize;
                let repeat = extra + 3;
                let prev = *lengths
                    .last()
                    .ok_or(Jbig2Error::HuffmanDecodeFailure)?;
                for _ in 0..repeat {
                    if lengths.len() >= num_symbols {
                        break;
                    }
                    lengths.push(prev);
                }
            }
            33 => {
                let extra = reader.read_bits(3)? as usize;
                let repeat = extra + 3;
                for _ in 0..repeat {
                    if lengths.len() >= num_symbols {
                        break;
                    }
                    lengths.push(0);
                }
            }
            34 => {
                let extra = reader.read_bits(7)? as usize;
                let repeat = extra + 11;
                for _ in 0..repeat {
                    if lengths.len() >= num_symbols {
                        break;
                    }
                    lengths.push(0);
                }
            }
            _ => return Err(Jbig2Error::HuffmanDecodeFailure),
        }
    }
    reader.align_to_byte();

    let symbol_lines: Vec<huffman::Line> = lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| huffman::Line::normal(len as u32, 0, i as i64))
        .collect();
    Ok(Table::new(&symbol_lines))
}

pub fn encode_arith(
    canvas: &Bitmap,
    placements: &[(usize, i32, i32)],
    symbols: &[Bitmap],
    params: &TextRegionParams,
) -> Vec<u8> {
    let _ = canvas;
    let mut enc = ArithEncoder::new();
    let mut int_ctxs = IntEncoderContexts::default();
    let code_len = symbol_code_len(symbols.len());
    let mut iaid_ctxs = new_contexts(1usize << code_len);

    let strips = params.strips() as i64;
    encode_int(&mut enc, &mut int_ctxs, IntCtx::Iadt, 0);

    let mut first_s = 0i64;
    let mut prev_t = 0i64;
    let mut first = true;

    for &(id, s, t) in placements {
        let symbol = &symbols[id];
        let w = symbol.width() as i32;
        let h = symbol.height() as i32;
        let firsts_target =
            s as i64 - pre_draw_advance(params.transposed, params.ref_corner, w, h) as i64;

        if first {
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iadt, 0);
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iafs, firsts_target - first_s);
            first_s = firsts_target;
            first = false;
        } else {
            let dt = (t as i64 - prev_t) / strips.max(1);
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iadt, dt);
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iafs, firsts_target - first_s);
            first_s = firsts_target;
        }
        prev_t = t as i64;

        if strips != 1 {
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iait, t as i64 % strips);
        }
        encode_iaid(&mut enc, &mut iaid_ctxs, code_len, id as u32);
        if params.refine {
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iari, 0);
        }
        encode_oob(&mut enc, &mut int_ctxs, IntCtx::Iads);
    }
    encode_oob(&mut enc, &mut int_ctxs, IntCtx::Iadt);
    enc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_c() -> Bitmap {
        let mut bm = Bitmap::new(5, 8);
        for y in 0..8u32 {
            bm.set_pixel(0, y, 1);
            bm.set_pixel(4, y, 1);
        }
        for x in 0..5u32 {
            bm.set_pixel(x, 0, 1);
            bm.set_pixel(x, 7, 1);
        }
        bm
    }

    fn params(num_instances: u32) -> TextRegionParams {
        TextRegionParams {
            huffman: false,
            refine: false,
            log_strips: 0,
            ref_corner: ReferenceCorner::TopLeft,
            transposed: false,
            comb_op: CombinationOperator::Or,
            default_pixel: 0,
            ds_offset: 0,
            r_template: 0,
            r_at: Vec::new(),
            huffman_tables: HuffmanTableSelectors::default(),
            num_instances,
        }
    }

    #[test]
    fn roundtrip_single_instance_placement() {
        let symbols = vec![letter_c()];
        let p = params(1);
        let bytes = encode_arith(&Bitmap::new(1, 1), &[(0, 0, 0)], &symbols, &p);
        let decoded = decode_arith(&bytes, 5, 8, &symbols, &p, &()).unwrap();
        assert_eq!(decoded.raw(), symbols[0].raw());
    }

    #[test]
    fn roundtrip_multiple_instances_same_strip() {
        let symbols = vec![letter_c()];
        let p = params(3);
        let placements = [(0, 0, 0), (0, 8, 0), (0, 16, 0)];
        let bytes = encode_arith(&Bitmap::new(1, 1), &placements, &symbols, &p);
        let decoded = decode_arith(&bytes, 24, 8, &symbols, &p, &()).unwrap();
        for &(_, s, t) in &placements {
            for y in 0..8u32 {
                for x in 0..5u32 {
                    assert_eq!(
                        decoded.get_pixel(s as u32 + x, t as u32 + y),
                        symbols[0].get_pixel(x, y)
                    );
                }
            }
        }
    }

    #[test]
    fn symbol_code_len_matches_count() {
        assert_eq!(symbol_code_len(1), 0);
        assert_eq!(symbol_code_len(2), 1);
        assert_eq!(symbol_code_len(3), 2);
        assert_eq!(symbol_code_len(5), 3);
    }

    #[test]
    fn place_symbol_bottom_right_corner_advances_before_drawing() {
        let mut canvas = Bitmap::new(10, 10);
        let symbol = letter_c();
        let next_curs = place_symbol(
            &mut canvas,
            &symbol,
            0,
            7,
            false,
            ReferenceCorner::BottomRight,
            CombinationOperator::Or,
        );
        // BottomRight: S_I is bumped by w-1 before placement, so the
        // bitmap's bounding box sits at x in 0..5, y in 0..8, not at
        // x in -4..1 as an unadjusted CURS would place it.
        for y in 0..8u32 {
            for x in 0..5u32 {
                assert_eq!(canvas.get_pixel(x, y), symbol.get_pixel(x, y));
            }
        }
        assert_eq!(canvas.get_pixel(9, 9), 0);
        assert_eq!(next_curs, symbol.width() as i32 - 1);
    }
}
