//! Top-level document encoder (§6 "Encoder"): wraps a page bitmap straight
//! into one generic region per page, the simplest legal encoding path.

use crate::bit_io::BitWriter;
use crate::bitmap::{Bitmap, CombinationOperator};
use crate::compositor::PageInfo;
use crate::constants::FILE_HEADER_MAGIC;
use crate::regions::generic;
use crate::regions::RegionInfo;
use crate::segment::{SegmentHeader, SegmentType};

/// Builds a JBIG2 stream one page at a time (§6 "Encoder::new",
/// "add_page", "finish").
pub struct Encoder {
    full_headers: bool,
    segments: Vec<u8>,
    next_segment_number: u32,
    page_count: u32,
}

impl Encoder {
    /// `full_headers` controls whether [`Self::finish`] emits the file
    /// header magic and page-count field, or just the bare segment stream
    /// ("embedded" mode, as consumed when wrapped in PDF/TIFF containers).
    pub fn new(full_headers: bool) -> Self {
        Self {
            full_headers,
            segments: Vec::new(),
            next_segment_number: 0,
            page_count: 0,
        }
    }

    fn take_segment_number(&mut self) -> u32 {
        let n = self.next_segment_number;
        self.next_segment_number += 1;
        n
    }

    fn write_segment(&mut self, segment_number: u32, segment_type: SegmentType, page_association: u32, body: Vec<u8>) {
        let header = SegmentHeader {
            segment_number,
            segment_type,
            page_association_size_is_4_bytes: page_association > 0xFF,
            deferred_non_retain: false,
            retain_flags: vec![false],
            referred_to: Vec::new(),
            page_association,
            data_length: Some(body.len() as u32),
        };
        let mut w = BitWriter::new();
        header.write(&mut w);
        self.segments.extend(w.finish());
        self.segments.extend(body);
    }

    /// Encodes one page as a page-info segment followed by a single
    /// immediate lossless generic region covering the whole bitmap
    /// (§8 "page compose" scenario, the encoder side). `duplicate_line_removal`
    /// enables TPGD, the standard's typical-prediction row-copy shortcut,
    /// which is a pure compression optimization with no effect on the
    /// decoded pixels.
    pub fn add_page(&mut self, bitmap: &Bitmap, duplicate_line_removal: bool) {
        self.page_count += 1;
        let page_association = self.page_count;

        let page_info = PageInfo {
            width: bitmap.width(),
            height: Some(bitmap.height()),
            x_resolution: 0,
            y_resolution: 0,
            default_pixel: 0,
            default_comb_op: CombinationOperator::Or,
            override_comb_op_allowed: true,
            might_contain_refinements: false,
            is_striped: false,
            max_stripe_size: 0,
        };
        let mut page_info_writer = BitWriter::new();
        page_info.write(&mut page_info_writer);
        let page_info_number = self.take_segment_number();
        self.write_segment(
            page_info_number,
            SegmentType::PageInfo,
            page_association,
            page_info_writer.finish(),
        );

        let region_info = RegionInfo {
            width: bitmap.width(),
            height: bitmap.height(),
            x: 0,
            y: 0,
            combination_operator: CombinationOperator::Or,
        };
        let mut region_writer = BitWriter::new();
        region_info.write(&mut region_writer);
        let mut region_body = region_writer.finish();
        region_body.extend(generic::encode_region(bitmap, 0, duplicate_line_removal));
        let region_number = self.take_segment_number();
        self.write_segment(
            region_number,
            SegmentType::ImmediateLosslessGenericRegion,
            page_association,
            region_body,
        );

        let end_of_page_number = self.take_segment_number();
        self.write_segment(
            end_of_page_number,
            SegmentType::EndOfPage,
            page_association,
            Vec::new(),
        );
    }

    /// Finalizes the stream, appending an end-of-file segment and, in
    /// full-header mode, the file header (§4.5 "File header").
    pub fn finish(mut self) -> Vec<u8> {
        let eof_number = self.take_segment_number();
        self.write_segment(eof_number, SegmentType::EndOfFile, 0, Vec::new());

        if !self.full_headers {
            return self.segments;
        }

        let mut out = Vec::with_capacity(FILE_HEADER_MAGIC.len() + 5 + self.segments.len());
        out.extend(FILE_HEADER_MAGIC);
        out.push(0x00); // known page count, sequential organization
        out.extend(self.page_count.to_be_bytes());
        out.extend(self.segments);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::decode_document;

    fn sample_bitmap() -> Bitmap {
        let mut bm = Bitmap::new(16, 12);
        for y in 0..12u32 {
            for x in 0..16u32 {
                bm.set_pixel(x, y, ((x + y) % 3 == 0) as u8);
            }
        }
        bm
    }

    #[test]
    fn single_page_roundtrips_with_full_headers() {
        let bitmap = sample_bitmap();
        let mut encoder = Encoder::new(true);
        encoder.add_page(&bitmap, false);
        let bytes = encoder.finish();

        let doc = decode_document(&bytes).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].bitmap.raw(), bitmap.raw());
    }

    #[test]
    fn embedded_mode_omits_file_header() {
        let bitmap = sample_bitmap();
        let mut encoder = Encoder::new(false);
        encoder.add_page(&bitmap, true);
        let bytes = encoder.finish();
        assert!(!bytes.starts_with(&FILE_HEADER_MAGIC));

        let doc = decode_document(&bytes).unwrap();
        assert_eq!(doc.pages[0].bitmap.raw(), bitmap.raw());
    }

    #[test]
    fn multi_page_document_roundtrips() {
        let a = sample_bitmap();
        let mut b = Bitmap::new(8, 8);
        b.set_pixel(0, 0, 1);
        let mut encoder = Encoder::new(true);
        encoder.add_page(&a, false);
        encoder.add_page(&b, false);
        let bytes = encoder.finish();

        let doc = decode_document(&bytes).unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].bitmap.raw(), a.raw());
        assert_eq!(doc.pages[1].bitmap.raw(), b.raw());
    }
}
