//! MQ-coder-style binary arithmetic encoder, symmetric to [`super::decoder`].
//!
//! `C` is tracked in a `u64` rather than the decoder's 32-bit register: the
//! decoder only ever needs to *compare* against its top 16 bits and is free
//! to let stale low bits fall off the top on each shift, but the encoder is
//! still *accumulating* unflushed bits and must never silently drop one.

use super::decoder::IntCtx;
use super::qe_table::QE_TABLE;
use crate::constants::INTEGER_DECODE_RANGES;
use crate::arith::decoder::{new_contexts, ContextArray, ContextCell};

pub struct ArithEncoder {
    a: u32,
    c: u64,
    ct: i32,
    buffer: Vec<u8>,
}

impl Default for ArithEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithEncoder {
    /// INITENC (§4.3, by symmetry with decoder initialization).
    pub fn new() -> Self {
        Self {
            a: 0x8000,
            c: 0,
            ct: 12,
            buffer: Vec::new(),
        }
    }

    /// BYTEOUT. Defers an emitted `0xFF` byte's role in carry propagation:
    /// walking back through a run of already-written `0xFF` bytes and
    /// bumping the first non-`0xFF` predecessor is what guarantees the byte
    /// immediately following a real `0xFF` in the output never exceeds
    /// `0x8F`, which is exactly what the decoder's BYTEIN stuffing check
    /// relies on.
    fn byte_out(&mut self) {
        if self.c >= 0x8000000 {
            let mut i = self.buffer.len();
            while i > 0 {
                i -= 1;
                if self.buffer[i] == 0xFF {
                    self.buffer[i] = 0x00;
                } else {
                    self.buffer[i] += 1;
                    break;
                }
            }
            self.c &= 0x7FFFFFF;
        }

        if self.buffer.last() == Some(&0xFF) {
            self.buffer.push(((self.c >> 20) & 0x7F) as u8);
            self.c &= 0xFFFFF;
            self.ct = 7;
        } else {
            self.buffer.push(((self.c >> 19) & 0xFF) as u8);
            self.c &= 0x7FFFF;
            self.ct = 8;
        }
    }

    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.byte_out();
            }
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;
            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// Encodes one bit `d` for `contexts[cx]`, mirroring
    /// [`super::decoder::ArithDecoder::decode_bit`]'s branch structure with
    /// the roles reversed: the decoder reads which zone `chigh` fell into
    /// and reports `d`; the encoder is given `d` and picks the zone.
    pub fn encode_bit(&mut self, contexts: &mut [ContextCell], cx: usize, d: u8) {
        let cell = contexts[cx];
        let idx = cell.index();
        let mps = cell.mps();
        let row = QE_TABLE[idx];
        let qe = row.qe as u32;

        self.a -= qe;

        if d == mps {
            if self.a & 0x8000 != 0 {
                self.c += (qe as u64) << 16;
                return;
            }
            if self.a >= qe {
                self.c += (qe as u64) << 16;
            } else {
                self.a = qe;
            }
            contexts[cx] = ContextCell::with(row.nmps, mps);
            self.renormalize();
        } else {
            if self.a < qe {
                self.c += (qe as u64) << 16;
            }
            self.a = qe;
            let new_mps = if row.switch { 1 - mps } else { mps };
            contexts[cx] = ContextCell::with(row.nlps, new_mps);
            self.renormalize();
        }
    }

    /// FLUSH (§4.3, encoder termination). Rounds the remaining ambiguous
    /// interval up so the decoder's implicit end-of-data `0xFF` padding
    /// reproduces every encoded bit without further real input.
    pub fn finish(mut self) -> Vec<u8> {
        let temp = self.c.wrapping_add(self.a as u64);
        self.c |= 0xFFFF;
        if self.c >= temp {
            self.c -= 0x8000;
        }
        self.c <<= self.ct;
        self.byte_out();
        self.c <<= self.ct;
        self.byte_out();
        self.buffer
    }
}

/// Per-role integer-encoding contexts, mirroring
/// [`super::decoder::IntDecoderContexts`].
pub struct IntEncoderContexts {
    cells: [ContextArray; 13],
}

impl Default for IntEncoderContexts {
    fn default() -> Self {
        Self {
            cells: std::array::from_fn(|_| new_contexts(512)),
        }
    }
}

impl IntEncoderContexts {
    fn slot(&mut self, which: IntCtx) -> &mut ContextArray {
        &mut self.cells[which as usize]
    }
}

fn write_bit(enc: &mut ArithEncoder, cells: &mut ContextArray, prev: &mut usize, bit: u8) {
    enc.encode_bit(cells, *prev, bit);
    *prev = if *prev < 256 {
        (*prev << 1) | bit as usize
    } else {
        (((*prev << 1) | bit as usize) & 511) | 256
    };
}

/// `encode_int`, the `decode_int` mirror: picks the narrowest of the six
/// magnitude ranges that fits `value` and writes its sign, prefix, and
/// magnitude bits.
pub fn encode_int(enc: &mut ArithEncoder, ctxs: &mut IntEncoderContexts, which: IntCtx, value: i64) {
    let cells = ctxs.slot(which);
    let mut prev: usize = 1;

    let (sign, magnitude) = if value < 0 {
        (1u8, -value)
    } else {
        (0u8, value)
    };
    write_bit(enc, cells, &mut prev, sign);

    // Pick the widest range whose offset the magnitude still reaches.
    let mut range_idx = 0;
    for (i, &(_, offset)) in INTEGER_DECODE_RANGES.iter().enumerate() {
        if magnitude >= offset {
            range_idx = i;
        }
    }

    for _ in 0..range_idx {
        write_bit(enc, cells, &mut prev, 1);
    }
    if range_idx < INTEGER_DECODE_RANGES.len() - 1 {
        write_bit(enc, cells, &mut prev, 0);
    }

    let (bits, offset) = INTEGER_DECODE_RANGES[range_idx];
    let rest = magnitude - offset;
    for i in (0..bits).rev() {
        let bit = ((rest >> i) & 1) as u8;
        write_bit(enc, cells, &mut prev, bit);
    }
}

/// Writes the reserved "out of band" value (sign bit 1, magnitude 0, which
/// `decode_int` maps back to [`crate::constants::OOB`]).
pub fn encode_oob(enc: &mut ArithEncoder, ctxs: &mut IntEncoderContexts, which: IntCtx) {
    let cells = ctxs.slot(which);
    let mut prev: usize = 1;
    write_bit(enc, cells, &mut prev, 1); // sign
    write_bit(enc, cells, &mut prev, 0); // range-0 prefix terminator
    for _ in 0..INTEGER_DECODE_RANGES[0].0 {
        write_bit(enc, cells, &mut prev, 0); // magnitude 0
    }
}

/// `encode_iaid`, mirroring [`super::decoder::decode_iaid`].
pub fn encode_iaid(enc: &mut ArithEncoder, cells: &mut ContextArray, code_len: u32, value: u32) {
    let mut prev: usize = 1;
    for i in (0..code_len).rev() {
        let bit = ((value >> i) & 1) as u8;
        enc.encode_bit(cells, prev, bit);
        prev = (prev << 1) | bit as usize;
    }
}
