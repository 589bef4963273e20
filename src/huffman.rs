//! Huffman (prefix-code) entropy coding, the non-arithmetic alternative
//! entropy backend (Annex B).
//!
//! Every standard table is defined the same way the standard itself
//! specifies them: a list of `(prefix_length, range_length, range_low)`
//! lines plus an optional lower-range and upper-range line and an
//! out-of-band line. [`Table::assign_codes`] turns those lengths into an
//! actual canonical prefix code, and [`Table::decode`]/[`Table::encode`]
//! walk it.

use crate::bit_io::{BitReader, BitWriter};
use crate::error::{Jbig2Error, Result};

/// One line of a Huffman table definition (§B.3 "Code table structure").
#[derive(Debug, Clone, Copy)]
pub struct Line {
    pub prefix_len: u32,
    /// `None` for the lower-range line (values run downward from
    /// `range_low`), `Some(n)` for an `n`-bit magnitude read after the
    /// prefix, `Some(32)` conventionally marking the unbounded upper-range
    /// line.
    pub range_len: Option<u32>,
    pub range_low: i64,
    pub is_lower_range: bool,
    pub is_oob: bool,
}

impl Line {
    pub const fn normal(prefix_len: u32, range_len: u32, range_low: i64) -> Self {
        Self {
            prefix_len,
            range_len: Some(range_len),
            range_low,
            is_lower_range: false,
            is_oob: false,
        }
    }

    pub const fn lower(prefix_len: u32, range_len: u32, range_low: i64) -> Self {
        Self {
            prefix_len,
            range_len: Some(range_len),
            range_low,
            is_lower_range: true,
            is_oob: false,
        }
    }

    pub const fn oob(prefix_len: u32) -> Self {
        Self {
            prefix_len,
            range_len: None,
            range_low: 0,
            is_lower_range: false,
            is_oob: true,
        }
    }
}

struct AssignedLine {
    line: Line,
    code: u32,
}

/// An assembled prefix-code table: standard (Annex B.1-B.15) or a
/// user-supplied custom table segment (§4.8 "Tables segment").
pub struct Table {
    lines: Vec<AssignedLine>,
}

impl Table {
    pub fn new(lines: &[Line]) -> Self {
        Self {
            lines: Self::assign_codes(lines),
        }
    }

    /// Canonical-code assignment (§B.3): sort by prefix length, then assign
    /// consecutive codes within each length, left-shifting into the next
    /// length whenever it grows.
    fn assign_codes(lines: &[Line]) -> Vec<AssignedLine> {
        let max_len = lines.iter().map(|l| l.prefix_len).max().unwrap_or(0);
        let mut count_per_len = vec![0u32; max_len as usize + 1];
        for l in lines {
            if l.prefix_len > 0 {
                count_per_len[l.prefix_len as usize] += 1;
            }
        }

        let mut first_code = vec![0u32; max_len as usize + 2];
        let mut code = 0u32;
        for len in 1..=max_len as usize {
            code = (code + count_per_len[len - 1]) << 1;
            first_code[len] = code;
        }

        let mut next_code = first_code.clone();
        let mut out = Vec::with_capacity(lines.len());
        // Stable order by prefix length keeps assignment deterministic and
        // matches the order the standard's own tables are listed in.
        let mut indices: Vec<usize> = (0..lines.len()).collect();
        indices.sort_by_key(|&i| lines[i].prefix_len);
        for i in indices {
            let line = lines[i];
            if line.prefix_len == 0 {
                continue;
            }
            let code = next_code[line.prefix_len as usize];
            next_code[line.prefix_len as usize] += 1;
            out.push(AssignedLine { line, code });
        }
        out
    }

    pub fn decode(&self, reader: &mut BitReader) -> Result<i64> {
        let mut code = 0u32;
        let mut len = 0u32;
        loop {
            code = (code << 1) | reader.read_bit()? as u32;
            len += 1;
            if let Some(found) = self
                .lines
                .iter()
                .find(|al| al.line.prefix_len == len && al.code == code)
            {
                let line = found.line;
                if line.is_oob {
                    return Ok(crate::constants::OOB);
                }
                let range_len = line.range_len.unwrap_or(0);
                if range_len == 32 && !line.is_lower_range {
                    let extra = reader.read_bits(32)? as i64;
                    return Ok(line.range_low + extra);
                }
                let extra = reader.read_bits(range_len)? as i64;
                return Ok(if line.is_lower_range {
                    line.range_low - extra
                } else {
                    line.range_low + extra
                });
            }
            if len > 32 {
                return Err(Jbig2Error::HuffmanDecodeFailure);
            }
        }
    }

    pub fn encode(&self, writer: &mut BitWriter, value: i64) -> Result<()> {
        for al in &self.lines {
            let line = al.line;
            if line.is_oob {
                continue;
            }
            let range_len = line.range_len.unwrap_or(0);
            let in_range = if line.is_lower_range {
                value <= line.range_low
            } else if range_len == 32 {
                value >= line.range_low
            } else {
                value >= line.range_low && value < line.range_low + (1i64 << range_len)
            };
            if in_range {
                writer.write_bits(al.code, line.prefix_len);
                let extra = if line.is_lower_range {
                    line.range_low - value
                } else {
                    value - line.range_low
                };
                if range_len == 32 && !line.is_lower_range {
                    writer.write_bits(extra as u32, 32);
                } else {
                    writer.write_bits(extra as u32, range_len);
                }
                return Ok(());
            }
        }
        Err(Jbig2Error::InvalidParameters {
            segment_number: 0,
            field: "huffman value",
            detail: format!("{value} not representable by this table"),
        })
    }

    pub fn encode_oob(&self, writer: &mut BitWriter) -> Result<()> {
        let al = self
            .lines
            .iter()
            .find(|al| al.line.is_oob)
            .ok_or(Jbig2Error::HuffmanDecodeFailure)?;
        writer.write_bits(al.code, al.line.prefix_len);
        Ok(())
    }
}

/// Standard table B.1 (§B.5, "small generic region heights").
pub fn table_b1() -> Table {
    Table::new(&[
        Line::normal(1, 4, 0),
        Line::normal(2, 8, 16),
        Line::normal(3, 16, 272),
        Line::normal(3, 32, 65808),
    ])
}

/// Standard table B.2, used for `IADH`/`IADW`-style small deltas with OOB.
pub fn table_b2() -> Table {
    Table::new(&[
        Line::normal(1, 0, 0),
        Line::normal(2, 0, 1),
        Line::normal(3, 0, 2),
        Line::normal(4, 3, 3),
        Line::normal(5, 6, 11),
        Line::normal(6, 32, 75),
        Line::oob(6),
    ])
}

pub fn table_b3() -> Table {
    Table::new(&[
        Line::normal(8, 8, -256),
        Line::normal(1, 0, 0),
        Line::normal(2, 0, 1),
        Line::normal(3, 0, 2),
        Line::normal(4, 3, 3),
        Line::normal(5, 6, 11),
        Line::lower(8, 32, -257),
        Line::normal(7, 32, 75),
        Line::oob(6),
    ])
}

pub fn table_b4() -> Table {
    Table::new(&[
        Line::normal(1, 0, 1),
        Line::normal(2, 0, 2),
        Line::normal(3, 0, 3),
        Line::normal(4, 3, 4),
        Line::normal(5, 6, 12),
        Line::normal(5, 32, 76),
    ])
}

pub fn table_b5() -> Table {
    Table::new(&[
        Line::normal(7, 8, -255),
        Line::normal(1, 0, 1),
        Line::normal(2, 0, 2),
        Line::normal(3, 0, 3),
        Line::normal(4, 3, 4),
        Line::normal(5, 6, 12),
        Line::lower(7, 32, -256),
        Line::normal(6, 32, 76),
    ])
}

pub fn table_b6() -> Table {
    Table::new(&[
        Line::normal(5, 10, -2048),
        Line::normal(4, 9, -1024),
        Line::normal(4, 8, -512),
        Line::normal(4, 7, -256),
        Line::normal(5, 6, -128),
        Line::normal(5, 5, -64),
        Line::normal(4, 5, -32),
        Line::normal(2, 7, 0),
        Line::normal(3, 7, 128),
        Line::normal(3, 8, 256),
        Line::normal(4, 9, 512),
        Line::normal(4, 10, 1024),
        Line::lower(6, 32, -2049),
        Line::normal(6, 32, 2048),
    ])
}

pub fn table_b7() -> Table {
    Table::new(&[
        Line::normal(4, 9, -1024),
        Line::normal(3, 8, -512),
        Line::normal(4, 7, -256),
        Line::normal(5, 6, -128),
        Line::normal(5, 5, -64),
        Line::normal(4, 5, -32),
        Line::normal(4, 5, 0),
        Line::normal(5, 5, 32),
        Line::normal(5, 6, 64),
        Line::normal(4, 7, 128),
        Line::normal(3, 8, 256),
        Line::normal(3, 9, 512),
        Line::normal(3, 10, 1024),
        Line::lower(5, 32, -1025),
        Line::normal(5, 32, 2048),
    ])
}

pub fn table_b8() -> Table {
    Table::new(&[
        Line::normal(8, 3, -15),
        Line::normal(9, 1, -7),
        Line::normal(8, 1, -5),
        Line::normal(9, 0, -3),
        Line::normal(7, 0, -2),
        Line::normal(4, 0, -1),
        Line::normal(2, 1, 0),
        Line::normal(5, 0, 2),
        Line::normal(6, 0, 3),
        Line::normal(3, 4, 4),
        Line::normal(6, 1, 20),
        Line::normal(4, 4, 22),
        Line::normal(4, 5, 38),
        Line::normal(5, 6, 70),
        Line::normal(5, 7, 134),
        Line::normal(6, 7, 262),
        Line::normal(7, 8, 390),
        Line::normal(6, 10, 646),
        Line::lower(9, 32, -16),
        Line::normal(9, 32, 1670),
        Line::oob(2),
    ])
}

pub fn table_b9() -> Table {
    Table::new(&[
        Line::normal(8, 4, -31),
        Line::normal(9, 2, -15),
        Line::normal(8, 2, -11),
        Line::normal(9, 1, -7),
        Line::normal(7, 1, -5),
        Line::normal(4, 1, -3),
        Line::normal(3, 1, -1),
        Line::normal(3, 1, 1),
        Line::normal(5, 1, 3),
        Line::normal(6, 1, 5),
        Line::normal(3, 5, 7),
        Line::normal(6, 2, 39),
        Line::normal(4, 5, 43),
        Line::normal(4, 6, 75),
        Line::normal(5, 7, 139),
        Line::normal(5, 8, 267),
        Line::normal(6, 8, 523),
        Line::normal(7, 9, 779),
        Line::normal(6, 11, 1291),
        Line::lower(9, 32, -32),
        Line::normal(9, 32, 3339),
        Line::oob(2),
    ])
}

pub fn table_b10() -> Table {
    Table::new(&[
        Line::normal(7, 4, -21),
        Line::normal(8, 0, -5),
        Line::normal(7, 0, -4),
        Line::normal(5, 0, -3),
        Line::normal(2, 2, -2),
        Line::normal(5, 0, 2),
        Line::normal(6, 0, 3),
        Line::normal(7, 0, 4),
        Line::normal(8, 0, 5),
        Line::normal(2, 6, 6),
        Line::normal(5, 5, 70),
        Line::normal(6, 5, 102),
        Line::normal(6, 6, 134),
        Line::normal(6, 7, 198),
        Line::normal(6, 8, 326),
        Line::normal(6, 9, 582),
        Line::normal(6, 10, 1094),
        Line::normal(7, 11, 2118),
        Line::lower(8, 32, -22),
        Line::normal(8, 32, 4166),
        Line::oob(2),
    ])
}

pub fn table_b11() -> Table {
    Table::new(&[
        Line::normal(1, 0, 1),
        Line::normal(2, 1, 2),
        Line::normal(4, 0, 4),
        Line::normal(4, 1, 5),
        Line::normal(5, 1, 7),
        Line::normal(5, 2, 9),
        Line::normal(6, 2, 13),
        Line::normal(7, 2, 17),
        Line::normal(7, 3, 21),
        Line::normal(7, 4, 29),
        Line::normal(7, 5, 45),
        Line::normal(7, 6, 77),
        Line::normal(7, 32, 141),
    ])
}

pub fn table_b12() -> Table {
    Table::new(&[
        Line::normal(1, 0, 1),
        Line::normal(2, 0, 2),
        Line::normal(3, 1, 3),
        Line::normal(5, 0, 5),
        Line::normal(5, 1, 6),
        Line::normal(6, 1, 8),
        Line::normal(7, 0, 10),
        Line::normal(7, 1, 11),
        Line::normal(7, 2, 13),
        Line::normal(7, 3, 17),
        Line::normal(7, 4, 25),
        Line::normal(8, 5, 41),
        Line::normal(8, 32, 73),
    ])
}

pub fn table_b13() -> Table {
    Table::new(&[
        Line::normal(1, 0, 1),
        Line::normal(3, 0, 2),
        Line::normal(4, 0, 3),
        Line::normal(5, 0, 4),
        Line::normal(4, 1, 5),
        Line::normal(3, 3, 7),
        Line::normal(6, 1, 15),
        Line::normal(6, 2, 17),
        Line::normal(6, 3, 21),
        Line::normal(6, 4, 29),
        Line::normal(6, 5, 45),
        Line::normal(7, 6, 77),
        Line::normal(7, 32, 141),
    ])
}

pub fn table_b14() -> Table {
    Table::new(&[
        Line::normal(3, 0, -2),
        Line::normal(3, 0, -1),
        Line::normal(1, 0, 0),
        Line::normal(3, 0, 1),
        Line::normal(3, 0, 2),
    ])
}

pub fn table_b15() -> Table {
    Table::new(&[
        Line::normal(7, 4, -24),
        Line::normal(6, 2, -8),
        Line::normal(5, 1, -4),
        Line::normal(4, 0, -2),
        Line::normal(3, 0, -1),
        Line::normal(1, 0, 0),
        Line::normal(3, 0, 1),
        Line::normal(4, 0, 2),
        Line::normal(5, 1, 3),
        Line::normal(6, 2, 5),
        Line::normal(7, 4, 9),
        Line::lower(7, 32, -25),
        Line::normal(7, 32, 25),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(table: &Table, values: &[i64]) {
        let mut w = BitWriter::new();
        for &v in values {
            table.encode(w_ref(&mut w), v).unwrap();
        }
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        for &v in values {
            assert_eq!(table.decode(&mut r).unwrap(), v);
        }
    }

    fn w_ref(w: &mut BitWriter) -> &mut BitWriter {
        w
    }

    #[test]
    fn table_b1_roundtrip() {
        roundtrip(&table_b1(), &[0, 5, 15, 16, 100, 271, 272, 5000, 70000]);
    }

    #[test]
    fn table_b2_roundtrip_and_oob() {
        let table = table_b2();
        roundtrip(&table, &[0, 1, 2, 3, 10, 11, 74, 75, 1000]);
        let mut w = BitWriter::new();
        table.encode_oob(&mut w).unwrap();
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        assert_eq!(table.decode(&mut r).unwrap(), crate::constants::OOB);
    }

    #[test]
    fn table_b6_handles_negative_lower_range() {
        roundtrip(&table_b6(), &[-2048, -2049, -5000, 0, 2047, 2048, 9999]);
    }

    #[test]
    fn table_b14_small_fixed_set() {
        roundtrip(&table_b14(), &[-2, -1, 0, 1, 2]);
    }

    #[test]
    fn assign_codes_are_prefix_free() {
        let table = table_b8();
        for a in &table.lines {
            for b in &table.lines {
                if std::ptr::eq(a, b) || a.line.prefix_len == 0 || b.line.prefix_len == 0 {
                    continue;
                }
                if a.line.prefix_len <= b.line.prefix_len {
                    let shift = b.line.prefix_len - a.line.prefix_len;
                    assert_ne!(
                        a.code,
                        b.code >> shift,
                        "code for one line is a prefix of another"
                    );
                }
            }
        }
    }
}
