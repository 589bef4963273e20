//! Symbol dictionary decoding/encoding (§4.8): height-class decode of new
//! symbols, optional refinement/aggregation, Huffman or arithmetic mode,
//! export-flag runs.

use crate::arith::{
    decode_int, encode_int, encode_oob, new_contexts, ArithDecoder, ArithEncoder, ContextArray,
    IntCtx, IntDecoderContexts, IntEncoderContexts,
};
use crate::bit_io::{BitReader, BitWriter};
use crate::bitmap::Bitmap;
use crate::cancellation::CancellationToken;
use crate::constants::OOB;
use crate::error::{Jbig2Error, Result};
use crate::huffman::{self, Table};
use crate::regions::generic;
use crate::regions::refinement;
use crate::regions::text::{HuffmanTableSelectors, ReferenceCorner, TextRegionParams};

#[derive(Debug, Clone)]
pub struct SymbolDictParams {
    pub huffman: bool,
    pub refine_or_aggregate: bool,
    pub template: u8,
    pub r_template: u8,
    pub at: Vec<(i8, i8)>,
    pub r_at: Vec<(i8, i8)>,
    pub num_exported: u32,
    pub num_new: u32,
    pub dh_selector: u8,
    pub dw_selector: u8,
    pub bm_size_selector: u8,
    pub agg_inst_selector: u8,
}

impl SymbolDictParams {
    pub fn parse(reader: &mut BitReader) -> Result<Self> {
        let flags = reader.read_u16()?;
        let huffman = flags & 0x0001 != 0;
        let refine_or_aggregate = flags & 0x0002 != 0;
        let dh_selector = ((flags >> 2) & 0x03) as u8;
        let dw_selector = ((flags >> 4) & 0x03) as u8;
        let bm_size_selector = ((flags >> 6) & 0x01) as u8;
        let agg_inst_selector = ((flags >> 7) & 0x01) as u8;
        let template = ((flags >> 10) & 0x03) as u8;
        let r_template = ((flags >> 12) & 0x01) as u8;

        let at = if huffman {
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

        let r_at = if refine_or_aggregate && r_template == 0 {
            let mut at = Vec::with_capacity(2);
            for _ in 0..2 {
                at.push((reader.read_u8()? as i8, reader.read_u8()? as i8));
            }
            at
        } else {
            Vec::new()
        };

        let num_exported = reader.read_u32()?;
        let num_new = reader.read_u32()?;

        Ok(Self {
            huffman,
            refine_or_aggregate,
            template,
            r_template,
            at,
            r_at,
            num_exported,
            num_new,
            dh_selector,
            dw_selector,
            bm_size_selector,
            agg_inst_selector,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        let mut flags: u16 = 0;
        if self.huffman {
            flags |= 0x0001;
        }
        if self.refine_or_aggregate {
            flags |= 0x0002;
        }
        flags |= (self.dh_selector as u16 & 0x03) << 2;
        flags |= (self.dw_selector as u16 & 0x03) << 4;
        flags |= (self.bm_size_selector as u16 & 0x01) << 6;
        flags |= (self.agg_inst_selector as u16 & 0x01) << 7;
        flags |= (self.template as u16 & 0x03) << 10;
        flags |= (self.r_template as u16 & 0x01) << 12;
        writer.write_u16(flags);

        if !self.huffman {
            for &(dx, dy) in &self.at {
                writer.write_u8(dx as u8);
                writer.write_u8(dy as u8);
            }
        }
        if self.refine_or_aggregate && self.r_template == 0 {
            for &(dx, dy) in &self.r_at {
                writer.write_u8(dx as u8);
                writer.write_u8(dy as u8);
            }
        }
        writer.write_u32(self.num_exported);
        writer.write_u32(self.num_new);
    }
}

fn symbol_code_len(total_symbols: usize) -> u32 {
    if total_symbols <= 1 {
        1
    } else {
        (usize::BITS - (total_symbols - 1).leading_zeros()).max(1)
    }
}

/// Decodes a symbol dictionary's new symbols and applies the export run,
/// returning the exported symbols in dictionary order.
pub fn decode(
    data: &[u8],
    params: &SymbolDictParams,
    imported: &[Bitmap],
    cancel: &impl CancellationToken,
) -> Result<Vec<Bitmap>> {
    if params.huffman {
        return decode_huffman(data, params, imported, cancel);
    }

    let mut dec = ArithDecoder::new(data);
    let mut int_ctxs = IntDecoderContexts::default();
    let mut generic_ctxs = new_contexts(generic::context_size(params.template));
    let mut refine_ctxs = new_contexts(refinement::context_size(params.r_template));
    let code_len = symbol_code_len(imported.len() + params.num_new as usize);
    let mut iaid_ctxs = new_contexts(1usize << code_len);

    let mut all_symbols: Vec<Bitmap> = imported.to_vec();
    let mut new_symbols: Vec<Bitmap> = Vec::with_capacity(params.num_new as usize);

    let mut hc_height: i64 = 0;
    while new_symbols.len() < params.num_new as usize {
        if cancel.is_cancelled() {
            return Err(Jbig2Error::Cancelled);
        }
        let dh = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iadh);
        hc_height += dh;
        if hc_height <= 0 || hc_height > 0xFFFF {
            return Err(Jbig2Error::InvalidParameters {
                segment_number: 0,
                field: "symbol dictionary height class",
                detail: format!("accumulated height {hc_height} out of range"),
            });
        }
        let mut symbol_width: i64 = 0;

        loop {
            let dw = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iadw);
            if dw == OOB {
                break;
            }
            symbol_width += dw;
            if symbol_width <= 0 || new_symbols.len() >= params.num_new as usize {
                break;
            }

            let symbol = if !params.refine_or_aggregate {
                generic::decode_arith(
                    &mut dec,
                    &mut generic_ctxs,
                    symbol_width as u32,
                    hc_height as u32,
                    params.template,
                    &params.at,
                    false,
                    cancel,
                )?
            } else {
                let n_refagg = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iaai);
                if n_refagg == 1 {
                    let id = crate::arith::decode_iaid(&mut dec, &mut iaid_ctxs, code_len) as usize;
                    let rdx = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iardx);
                    let rdy = decode_int(&mut dec, &mut int_ctxs, IntCtx::Iardy);
                    let reference =
                        all_symbols
                            .get(id)
                            .ok_or(Jbig2Error::InvalidParameters {
                                segment_number: 0,
                                field: "symbol dictionary refinement id",
                                detail: format!("{id} out of range"),
                            })?
                            .clone();
                    refinement::decode_arith(
                        &mut dec,
                        &mut refine_ctxs,
                        symbol_width as u32,
                        hc_height as u32,
                        &reference,
                        rdx as i32,
                        rdy as i32,
                        params.r_template,
                        &params.r_at,
                        false,
                        cancel,
                    )?
                } else {
                    let text_params = TextRegionParams {
                        huffman: false,
                        refine: true,
                        log_strips: 0,
                        ref_corner: ReferenceCorner::TopLeft,
                        transposed: false,
                        comb_op: crate::bitmap::CombinationOperator::Or,
                        default_pixel: 0,
                        ds_offset: 0,
                        r_template: params.r_template,
                        r_at: params.r_at.clone(),
                        huffman_tables: HuffmanTableSelectors::default(),
                        num_instances: n_refagg.max(0) as u32,
                    };
                    decode_aggregate(
                        &mut dec,
                        &mut int_ctxs,
                        &mut iaid_ctxs,
                        &mut refine_ctxs,
                        symbol_width as u32,
                        hc_height as u32,
                        &all_symbols,
                        &text_params,
                    )?
                }
            };
            new_symbols.push(symbol.clone());
            all_symbols.push(symbol);
        }
    }

    decode_export(&mut dec, &mut int_ctxs, &all_symbols, params.num_exported as usize)
}

#[allow(clippy::too_many_arguments)]
fn decode_aggregate(
    dec: &mut ArithDecoder,
    int_ctxs: &mut IntDecoderContexts,
    iaid_ctxs: &mut ContextArray,
    refine_ctxs: &mut ContextArray,
    width: u32,
    height: u32,
    symbols: &[Bitmap],
    params: &TextRegionParams,
) -> Result<Bitmap> {
    let code_len = symbol_code_len(symbols.len());
    let strips = params.strips() as i64;
    let mut canvas = Bitmap::new(width, height);
    let mut strip_t = -decode_int(dec, int_ctxs, IntCtx::Iadt) * strips;
    let mut first_s = 0i64;
    let mut placed = 0u32;

    while placed < params.num_instances {
        let dt = decode_int(dec, int_ctxs, IntCtx::Iadt);
        if dt == OOB {
            break;
        }
        strip_t += dt * strips;
        let dfs = decode_int(dec, int_ctxs, IntCtx::Iafs);
        first_s += dfs;
        let mut current_s = first_s;
        let mut first_in_strip = true;

        loop {
            if !first_in_strip {
                let ds = decode_int(dec, int_ctxs, IntCtx::Iads);
                if ds == OOB {
                    break;
                }
                current_s += ds;
            }
            first_in_strip = false;
            let cur_t = if strips == 1 {
                0
            } else {
                decode_int(dec, int_ctxs, IntCtx::Iait)
            };
            let t = strip_t + cur_t;
            let id = crate::arith::decode_iaid(dec, iaid_ctxs, code_len) as usize;
            let symbol = symbols
                .get(id)
                .ok_or(Jbig2Error::InvalidParameters {
                    segment_number: 0,
                    field: "aggregate symbol id",
                    detail: format!("{id} out of range"),
                })?
                .clone();
            let ri = decode_int(dec, int_ctxs, IntCtx::Iari);
            let symbol = if ri != 0 {
                let rdw = decode_int(dec, int_ctxs, IntCtx::Iardw);
                let rdh = decode_int(dec, int_ctxs, IntCtx::Iardh);
                let rdx = decode_int(dec, int_ctxs, IntCtx::Iardx);
                let rdy = decode_int(dec, int_ctxs, IntCtx::Iardy);
                let new_w = (symbol.width() as i64 + rdw).max(1) as u32;
                let new_h = (symbol.height() as i64 + rdh).max(1) as u32;
                let ref_dx = (rdw >> 1) + rdx;
                let ref_dy = (rdh >> 1) + rdy;
                refinement::decode_arith(
                    dec,
                    refine_ctxs,
                    new_w,
                    new_h,
                    &symbol,
                    ref_dx as i32,
                    ref_dy as i32,
                    params.r_template,
                    &params.r_at,
                    false,
                    &(),
                )?
            } else {
                symbol
            };

            canvas.combine(&symbol, current_s as i32, t as i32, params.comb_op);
            current_s += symbol.width() as i64 - 1;
            placed += 1;
            if placed >= params.num_instances {
                break;
            }
        }
    }

    Ok(canvas)
}

fn decode_export(
    dec: &mut ArithDecoder,
    int_ctxs: &mut IntDecoderContexts,
    all_symbols: &[Bitmap],
    num_exported: usize,
) -> Result<Vec<Bitmap>> {
    let mut exported = Vec::with_capacity(num_exported);
    let mut i = 0usize;
    let mut cur_flag = false;
    while i < all_symbols.len() && exported.len() < num_exported {
        let run = decode_int(dec, int_ctxs, IntCtx::Iaex);
        if run == OOB || run < 0 {
            break;
        }
        for _ in 0..run {
            if i >= all_symbols.len() {
                break;
            }
            if cur_flag {
                exported.push(all_symbols[i].clone());
            }
            i += 1;
        }
        cur_flag = !cur_flag;
    }
    Ok(exported)
}

fn decode_huffman(
    data: &[u8],
    params: &SymbolDictParams,
    imported: &[Bitmap],
    cancel: &impl CancellationToken,
) -> Result<Vec<Bitmap>> {
    let dh_table = select(params.dh_selector, &[huffman::table_b4, huffman::table_b5])?;
    let dw_table = select(params.dw_selector, &[huffman::table_b2, huffman::table_b3])?;
    let bm_size_table = select(params.bm_size_selector, &[huffman::table_b1])?;
    if params.refine_or_aggregate {
        return Err(Jbig2Error::UnsupportedFeature(
            "Huffman-mode symbol dictionary refinement/aggregation",
        ));
    }

    let mut reader = BitReader::new(data);
    let mut all_symbols: Vec<Bitmap> = imported.to_vec();
    let mut new_symbols: Vec<Bitmap> = Vec::with_capacity(params.num_new as usize);
    let mut hc_height: i64 = 0;

    while new_symbols.len() < params.num_new as usize {
        if cancel.is_cancelled() {
            return Err(Jbig2Error::Cancelled);
        }
        hc_height += dh_table.decode(&mut reader)?;
        let mut symbol_width: i64 = 0;
        let mut total_width: i64 = 0;
        let class_start = new_symbols.len();

        loop {
            let dw = dw_table.decode(&mut reader)?;
            if dw == OOB {
                break;
            }
            symbol_width += dw;
            if symbol_width <= 0 || new_symbols.len() >= params.num_new as usize {
                break;
            }
            total_width += symbol_width;
            // Placeholder bitmap; replaced below once the collective strip
            // for this height class has been decoded and sliced.
            new_symbols.push(Bitmap::new(symbol_width as u32, hc_height as u32));
        }

        let collective_size = bm_size_table.decode(&mut reader)?;
        reader.align_to_byte();
        if collective_size == 0 {
            // Uncompressed raster directly in the data stream.
            let mut x_off = 0u32;
            for idx in class_start..new_symbols.len() {
                let w = new_symbols[idx].width();
                let mut bm = Bitmap::new(w, hc_height as u32);
                for y in 0..hc_height as u32 {
                    for x in 0..w {
                        bm.set_pixel(x, y, reader.read_bit()?);
                    }
                    reader.align_to_byte();
                }
                let _ = x_off;
                x_off += w;
                new_symbols[idx] = bm;
            }
        } else {
            return Err(Jbig2Error::UnsupportedFeature(
                "MMR-coded Huffman symbol dictionary collective bitmap",
            ));
        }
        let _ = total_width;
    }

    all_symbols.extend(new_symbols.iter().cloned());
    let export_table = huffman::table_b1();
    decode_export_huffman(&mut reader, &export_table, &all_symbols, params.num_exported as usize)
}

fn select(selector: u8, choices: &[fn() -> Table]) -> Result<Table> {
    choices
        .get(selector as usize)
        .map(|f| f())
        .ok_or(Jbig2Error::UnsupportedFeature(
            "custom (non-default) symbol dictionary Huffman table selector",
        ))
}

fn decode_export_huffman(
    reader: &mut BitReader,
    table: &Table,
    all_symbols: &[Bitmap],
    num_exported: usize,
) -> Result<Vec<Bitmap>> {
    let mut exported = Vec::with_capacity(num_exported);
    let mut i = 0usize;
    let mut cur_flag = false;
    while i < all_symbols.len() && exported.len() < num_exported {
        let run = table.decode(reader)?;
        if run < 0 {
            break;
        }
        for _ in 0..run {
            if i >= all_symbols.len() {
                break;
            }
            if cur_flag {
                exported.push(all_symbols[i].clone());
            }
            i += 1;
        }
        cur_flag = !cur_flag;
    }
    Ok(exported)
}

/// Encodes new symbols (already height/width-sorted by the caller) into a
/// symbol dictionary body, exporting all of them (§4.8 "Encoder").
pub fn encode(symbols: &[Bitmap], template: u8) -> (Vec<u8>, SymbolDictParams) {
    let params = SymbolDictParams {
        huffman: false,
        refine_or_aggregate: false,
        template,
        r_template: 0,
        at: generic::canonical_at_for(template).to_vec(),
        r_at: Vec::new(),
        num_exported: symbols.len() as u32,
        num_new: symbols.len() as u32,
        dh_selector: 0,
        dw_selector: 0,
        bm_size_selector: 0,
        agg_inst_selector: 0,
    };

    let mut enc = ArithEncoder::new();
    let mut int_ctxs = IntEncoderContexts::default();
    let mut generic_ctxs = new_contexts(generic::context_size(template));

    let mut hc_height = 0i64;
    let mut index = 0usize;
    while index < symbols.len() {
        let height = symbols[index].height() as i64;
        encode_int(&mut enc, &mut int_ctxs, IntCtx::Iadh, height - hc_height);
        hc_height = height;

        let mut width = 0i64;
        while index < symbols.len() && symbols[index].height() as i64 == hc_height {
            let w = symbols[index].width() as i64;
            encode_int(&mut enc, &mut int_ctxs, IntCtx::Iadw, w - width);
            width = w;
            generic::encode_arith(
                &mut enc,
                &mut generic_ctxs,
                &symbols[index],
                template,
                &params.at,
                false,
            );
            index += 1;
        }
        encode_oob(&mut enc, &mut int_ctxs, IntCtx::Iadw);
    }

    encode_int(&mut enc, &mut int_ctxs, IntCtx::Iaex, 0);
    encode_int(&mut enc, &mut int_ctxs, IntCtx::Iaex, symbols.len() as i64);

    (enc.finish(), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_p() -> Bitmap {
        let mut bm = Bitmap::new(5, 8);
        for y in 0..8u32 {
            bm.set_pixel(0, y, 1);
        }
        for x in 0..4u32 {
            bm.set_pixel(x, 0, 1);
            bm.set_pixel(x, 3, 1);
        }
        bm.set_pixel(4, 1, 1);
        bm.set_pixel(4, 2, 1);
        bm
    }

    #[test]
    fn roundtrip_single_symbol_no_refinement() {
        let symbols = vec![letter_p()];
        let (bytes, params) = encode(&symbols, 0);
        let decoded = decode(&bytes, &params, &[], &()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].raw(), symbols[0].raw());
    }

    #[test]
    fn roundtrip_multiple_height_classes() {
        let mut tall = Bitmap::new(3, 10);
        tall.set_pixel(1, 5, 1);
        let symbols = vec![letter_p(), tall];
        let (bytes, params) = encode(&symbols, 0);
        let decoded = decode(&bytes, &params, &[], &()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].raw(), symbols[0].raw());
        assert_eq!(decoded[1].raw(), symbols[1].raw());
    }

    #[test]
    fn export_run_selects_subset() {
        let symbols = vec![letter_p(), letter_p()];
        let (bytes, mut params) = encode(&symbols, 0);
        params.num_exported = 2;
        let decoded = decode(&bytes, &params, &[], &()).unwrap();
        assert_eq!(decoded.len(), 2);
    }
}
