//! MQ-coder-style binary arithmetic decoder (Annex E).
//!
//! Operates over a borrowed byte slice — the bounded substream the segment
//! framing layer carved out for this segment (§9 "Sub-stream readers"), so a
//! runaway decode can never read past its own segment's declared length
//! without first hitting the synthetic end-of-data `0xFF` padding the
//! standard's BYTEIN procedure expects.

use super::qe_table::QE_TABLE;
use crate::error::{Jbig2Error, Result};

/// One context cell: an index into [`QE_TABLE`] plus the current
/// most-probable-symbol bit. Packed into a single byte so that context
/// arrays (sized 512 up to 65536, §4.3) stay cheap to allocate and zero.
#[derive(Clone, Copy, Default)]
pub struct ContextCell(u8);

impl ContextCell {
    #[inline]
    pub(crate) fn index(self) -> usize {
        (self.0 >> 1) as usize
    }

    #[inline]
    pub(crate) fn mps(self) -> u8 {
        self.0 & 1
    }

    #[inline]
    pub(crate) fn set(&mut self, index: u8, mps: u8) {
        self.0 = (index << 1) | (mps & 1);
    }

    #[inline]
    pub(crate) fn with(index: u8, mps: u8) -> Self {
        let mut cell = Self::default();
        cell.set(index, mps);
        cell
    }
}

/// A context array, addressed by a packed neighbor-pixel index.
pub type ContextArray = Vec<ContextCell>;

pub fn new_contexts(size: usize) -> ContextArray {
    vec![ContextCell::default(); size]
}

/// The renormalizing binary arithmetic decoder (§4.3).
pub struct ArithDecoder<'a> {
    data: &'a [u8],
    bp: usize,
    c: u32,
    a: u32,
    ct: i32,
}

impl<'a> ArithDecoder<'a> {
    /// INITDEC (§4.3 "Decoder initialization").
    pub fn new(data: &'a [u8]) -> Self {
        let mut dec = Self {
            data,
            bp: 0,
            c: 0,
            a: 0,
            ct: 0,
        };
        let b0 = dec.byte_at(0);
        dec.c = (b0 as u32) << 16;
        dec.byte_in();
        dec.c <<= 7;
        dec.ct -= 7;
        dec.a = 0x8000;
        dec
    }

    /// Byte at `idx`, or the standard's implicit `0xFF` padding past the end
    /// of the substream.
    #[inline]
    fn byte_at(&self, idx: usize) -> u8 {
        self.data.get(idx).copied().unwrap_or(0xFF)
    }

    /// BYTEIN, including the byte-stuffing rule for bytes following `0xFF`.
    fn byte_in(&mut self) {
        let b = self.byte_at(self.bp);
        if b == 0xFF {
            let b1 = self.byte_at(self.bp + 1);
            if b1 > 0x8F {
                self.c += 0xFF00;
                self.ct = 8;
            } else {
                self.bp += 1;
                self.c += (b1 as u32) << 9;
                self.ct = 7;
            }
        } else {
            self.bp += 1;
            let next = self.byte_at(self.bp);
            self.c += (next as u32) << 8;
            self.ct = 8;
        }
    }

    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.byte_in();
            }
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;
            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// DECODE (§4.3 "decode_bit"). `cx` selects the context cell tracking
    /// this bit position's adaptive probability state.
    pub fn decode_bit(&mut self, contexts: &mut [ContextCell], cx: usize) -> u8 {
        let cell = contexts[cx];
        let idx = cell.index();
        let mps = cell.mps();
        let row = QE_TABLE[idx];
        let qe = row.qe as u32;

        self.a = self.a.wrapping_sub(qe);
        let chigh = self.c >> 16;

        let d;
        if chigh < qe {
            // LPS_EXCHANGE
            if self.a < qe {
                d = mps;
                contexts[cx].set(row.nmps, mps);
            } else {
                d = 1 - mps;
                let new_mps = if row.switch { 1 - mps } else { mps };
                contexts[cx].set(row.nlps, new_mps);
            }
            self.a = qe;
            self.renormalize();
        } else {
            self.c -= qe << 16;
            if self.a & 0x8000 == 0 {
                // MPS_EXCHANGE
                if self.a < qe {
                    d = 1 - mps;
                    let new_mps = if row.switch { 1 - mps } else { mps };
                    contexts[cx].set(row.nlps, new_mps);
                    self.a = qe;
                } else {
                    d = mps;
                    contexts[cx].set(row.nmps, mps);
                }
                self.renormalize();
            } else {
                d = mps;
            }
        }
        d
    }

    /// Bit-precise position, for `ArithmeticDecodeFailure` diagnostics.
    pub fn bit_position(&self) -> u64 {
        (self.bp as u64) * 8
    }
}

/// Named context roles for integer and symbol-ID decoding (GLOSSARY).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntCtx {
    Iadh,
    Iadw,
    Iaex,
    Iaai,
    Iadt,
    Iafs,
    Iads,
    Iait,
    Iari,
    Iardw,
    Iardh,
    Iardx,
    Iardy,
}

/// One 512-cell context array per integer-decoding role (§4.3 "decode_int").
pub struct IntDecoderContexts {
    cells: [ContextArray; 13],
}

impl Default for IntDecoderContexts {
    fn default() -> Self {
        Self {
            cells: std::array::from_fn(|_| new_contexts(512)),
        }
    }
}

impl IntDecoderContexts {
    fn slot(&mut self, which: IntCtx) -> &mut ContextArray {
        &mut self.cells[which as usize]
    }
}

use crate::constants::{INTEGER_DECODE_RANGES, OOB};

/// `decode_int` (§4.3): a binary tree of prefix bits classifies the decoded
/// integer into one of six ranges, then reads that range's magnitude bits.
/// The "previous" context (a 9-bit running value used to address the
/// 512-cell array) evolves exactly as §4.3 and the reference decoders do:
/// it starts at 1 and is updated as `prev = if prev < 256 { (prev<<1)|bit }
/// else { (((prev<<1)|bit) & 511) | 256 }` after every bit read.
pub fn decode_int(dec: &mut ArithDecoder, ctxs: &mut IntDecoderContexts, which: IntCtx) -> i64 {
    let cells = ctxs.slot(which);
    let mut prev: usize = 1;
    let mut read_bit = |dec: &mut ArithDecoder, cells: &mut ContextArray, prev: &mut usize| -> u8 {
        let bit = dec.decode_bit(cells, *prev);
        *prev = if *prev < 256 {
            (*prev << 1) | bit as usize
        } else {
            (((*prev << 1) | bit as usize) & 511) | 256
        };
        bit
    };

    let sign = read_bit(dec, cells, &mut prev);

    let mut n_prefix = 0usize;
    while n_prefix < 5 {
        let bit = read_bit(dec, cells, &mut prev);
        if bit == 0 {
            break;
        }
        n_prefix += 1;
    }
    let (bits, offset) = INTEGER_DECODE_RANGES[n_prefix];

    let mut value: i64 = 0;
    for _ in 0..bits {
        let bit = read_bit(dec, cells, &mut prev);
        value = (value << 1) | bit as i64;
    }
    value += offset;

    if sign == 0 {
        value
    } else if value > 0 {
        -value
    } else {
        OOB
    }
}

/// `decode_iaid` (§4.3): reads `code_len` bits through a `2^code_len`-cell
/// context-evolving binary tree; returns the accumulated value minus
/// `2^code_len`.
pub fn decode_iaid(dec: &mut ArithDecoder, cells: &mut ContextArray, code_len: u32) -> u32 {
    let mut prev: usize = 1;
    for _ in 0..code_len {
        let bit = dec.decode_bit(cells, prev);
        prev = (prev << 1) | bit as usize;
    }
    (prev as u32) - (1 << code_len)
}

pub use IntCtx::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::encoder::ArithEncoder;

    #[test]
    fn decode_bit_invariant_a_stays_normalized() {
        let mut contexts = new_contexts(1);
        let data = [0x84u8, 0xC7, 0x3B, 0xFC, 0xE1, 0xA1, 0x43, 0x04];
        let mut dec = ArithDecoder::new(&data);
        for _ in 0..20 {
            dec.decode_bit(&mut contexts, 0);
            assert!(dec.a >= 0x8000, "A register must stay renormalized");
        }
    }

    #[test]
    fn roundtrip_single_context_sequence() {
        let bits = [0u8, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 0, 1];
        let mut enc = ArithEncoder::new();
        let mut enc_ctx = new_contexts(1);
        for &b in &bits {
            enc.encode_bit(&mut enc_ctx, 0, b);
        }
        let encoded = enc.finish();

        let mut dec = ArithDecoder::new(&encoded);
        let mut dec_ctx = new_contexts(1);
        let decoded: Vec<u8> = bits.iter().map(|_| dec.decode_bit(&mut dec_ctx, 0)).collect();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn roundtrip_multi_context_sequence() {
        // A longer, multi-context sequence exercising the same shape of
        // workload as the standard's Annex H.2 arithmetic-coder test
        // (feeding a run of bits through several contexts and flushing).
        let ops: Vec<(usize, u8)> = (0..200)
            .map(|i| (i % 5, ((i * 37 + i / 3) % 2) as u8))
            .collect();

        let mut enc = ArithEncoder::new();
        let mut enc_ctx = new_contexts(5);
        for &(cx, b) in &ops {
            enc.encode_bit(&mut enc_ctx, cx, b);
        }
        let encoded = enc.finish();

        let mut dec = ArithDecoder::new(&encoded);
        let mut dec_ctx = new_contexts(5);
        for &(cx, b) in &ops {
            assert_eq!(dec.decode_bit(&mut dec_ctx, cx), b);
        }
    }

    /// ITU-T T.88 (2018-08) Annex H.2's published arithmetic-coder test
    /// sequence: a single context decoded for 256 bits against a fixed
    /// 30-byte input, packed MSB-first into the 32-byte expected output.
    #[test]
    fn annex_h2_literal_test_sequence() {
        let input = [
            0x84, 0xC7, 0x3B, 0xFC, 0xE1, 0xA1, 0x43, 0x04, 0x02, 0x20, 0x00, 0x00, 0x41, 0x0D,
            0xBB, 0x86, 0xF4, 0x31, 0x7F, 0xFF, 0x88, 0xFF, 0x37, 0x47, 0x1A, 0xDB, 0x6A, 0xDF,
            0xFF, 0xAC,
        ];
        let expected_output = [
            0x00, 0x02, 0x00, 0x51, 0x00, 0x00, 0x00, 0xC0, 0x03, 0x52, 0x87, 0x2A, 0xAA, 0xAA,
            0xAA, 0xAA, 0x82, 0xC0, 0x20, 0x00, 0xFC, 0xD7, 0x9E, 0xF6, 0xBF, 0x7F, 0xED, 0x90,
            0x4F, 0x46, 0xA3, 0xBF,
        ];

        let mut dec = ArithDecoder::new(&input);
        let mut cx = new_contexts(1);
        let mut out = [0u8; 32];
        for out_byte in out.iter_mut() {
            let mut acc = 0u8;
            for bit_idx in 0..8 {
                let bit = dec.decode_bit(&mut cx, 0);
                acc |= bit << (7 - bit_idx);
            }
            *out_byte = acc;
        }
        assert_eq!(out, expected_output);
    }

    #[test]
    fn integer_decode_roundtrip() {
        use crate::arith::encoder::encode_int;
        let values: [i64; 7] = [0, 1, -1, 17, -340, 4435, 5000];
        let mut enc = ArithEncoder::new();
        let mut enc_ctx = crate::arith::encoder::IntEncoderContexts::default();
        for &v in &values {
            encode_int(&mut enc, &mut enc_ctx, IntCtx::Iadw, v);
        }
        let encoded = enc.finish();

        let mut dec = ArithDecoder::new(&encoded);
        let mut dec_ctx = IntDecoderContexts::default();
        for &v in &values {
            assert_eq!(decode_int(&mut dec, &mut dec_ctx, IntCtx::Iadw), v);
        }
    }

    #[test]
    fn integer_decode_oob() {
        use crate::arith::encoder::{encode_oob, IntEncoderContexts};
        let mut enc = ArithEncoder::new();
        let mut enc_ctx = IntEncoderContexts::default();
        encode_oob(&mut enc, &mut enc_ctx, IntCtx::Iaex);
        let encoded = enc.finish();

        let mut dec = ArithDecoder::new(&encoded);
        let mut dec_ctx = IntDecoderContexts::default();
        assert_eq!(decode_int(&mut dec, &mut dec_ctx, IntCtx::Iaex), OOB);
    }

    #[test]
    fn iaid_decode_roundtrip() {
        use crate::arith::encoder::encode_iaid;
        let mut enc = ArithEncoder::new();
        let mut enc_ctx = new_contexts(1 << 5);
        for v in [0u32, 1, 7, 15, 31] {
            encode_iaid(&mut enc, &mut enc_ctx, 5, v);
        }
        let encoded = enc.finish();

        let mut dec = ArithDecoder::new(&encoded);
        let mut dec_ctx = new_contexts(1 << 5);
        for v in [0u32, 1, 7, 15, 31] {
            assert_eq!(decode_iaid(&mut dec, &mut dec_ctx, 5), v);
        }
    }
}

/// Wraps [`Jbig2Error::ArithmeticDecodeFailure`] construction with the
/// decoder's current bit position, for callers that detect a downstream
/// inconsistency (e.g. a symbol index out of range) rather than a failure
/// internal to the coder itself.
pub fn decode_failure(dec: &ArithDecoder) -> Jbig2Error {
    Jbig2Error::ArithmeticDecodeFailure {
        bit_position: dec.bit_position(),
    }
}

pub type DecodeResult<T> = Result<T>;
