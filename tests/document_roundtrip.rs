//! Document-level integration tests: builds segment streams by hand (the
//! same way Annex H's test streams are structured) and checks the decoded
//! page pixels, rather than asserting exact encoded bytes.

use jbig2_rs::bitmap::CombinationOperator;
use jbig2_rs::compositor::PageInfo;
use jbig2_rs::document::decode_document;
use jbig2_rs::regions::{halftone, text, RegionInfo};
use jbig2_rs::segment::{SegmentHeader, SegmentType};
use jbig2_rs::symbol_dict;
use jbig2_rs::{bit_io::BitWriter, Bitmap, Encoder};

fn write_segment(
    out: &mut Vec<u8>,
    segment_number: u32,
    segment_type: SegmentType,
    page_association: u32,
    referred_to: Vec<u32>,
    body: Vec<u8>,
) {
    let header = SegmentHeader {
        segment_number,
        segment_type,
        page_association_size_is_4_bytes: false,
        deferred_non_retain: false,
        retain_flags: vec![false; referred_to.len() + 1],
        referred_to,
        page_association,
        data_length: Some(body.len() as u32),
    };
    let mut w = BitWriter::new();
    header.write(&mut w);
    out.extend(w.finish());
    out.extend(body);
}

fn sample_page_info(width: u32, height: u32) -> PageInfo {
    PageInfo {
        width,
        height: Some(height),
        x_resolution: 300,
        y_resolution: 300,
        default_pixel: 0,
        default_comb_op: CombinationOperator::Or,
        override_comb_op_allowed: true,
        might_contain_refinements: false,
        is_striped: false,
        max_stripe_size: 0,
    }
}

fn letter_bitmap(mark: u32) -> Bitmap {
    let mut bm = Bitmap::new(6, 8);
    for y in 0..8u32 {
        bm.set_pixel(0, y, 1);
        bm.set_pixel(5, y, 1);
    }
    bm.set_pixel(mark % 5, 4, 1);
    bm
}

/// A symbol dictionary feeding a text region that places each symbol twice,
/// resolved end to end through [`decode_document`].
#[test]
fn symbol_dictionary_and_text_region_compose_a_page() {
    let symbols = vec![letter_bitmap(1), letter_bitmap(2)];
    let (dict_body, dict_params) = symbol_dict::encode(&symbols, 0);
    let mut dict_segment_body = Vec::new();
    let mut dict_params_writer = BitWriter::new();
    dict_params.write(&mut dict_params_writer);
    dict_segment_body.extend(dict_params_writer.finish());
    dict_segment_body.extend(dict_body);

    let placements = [(0usize, 0i32, 0i32), (1, 8, 0), (0, 0, 10), (1, 8, 10)];
    let text_body_payload = text::encode_arith(&Bitmap::new(1, 1), &placements, &symbols, &text_params());
    let mut text_segment_body = Vec::new();
    let region_info = RegionInfo {
        width: 16,
        height: 20,
        x: 0,
        y: 0,
        combination_operator: CombinationOperator::Or,
    };
    let mut region_writer = BitWriter::new();
    region_info.write(&mut region_writer);
    text_segment_body.extend(region_writer.finish());
    let mut text_params_writer = BitWriter::new();
    text_params().write(&mut text_params_writer);
    text_segment_body.extend(text_params_writer.finish());
    text_segment_body.extend(text_body_payload);

    let mut stream = Vec::new();
    let mut page_info_writer = BitWriter::new();
    sample_page_info(16, 20).write(&mut page_info_writer);
    write_segment(&mut stream, 0, SegmentType::PageInfo, 1, vec![], page_info_writer.finish());
    write_segment(&mut stream, 1, SegmentType::SymbolDictionary, 1, vec![], dict_segment_body);
    write_segment(
        &mut stream,
        2,
        SegmentType::ImmediateTextRegion,
        1,
        vec![1],
        text_segment_body,
    );
    write_segment(&mut stream, 3, SegmentType::EndOfPage, 1, vec![], Vec::new());

    let document = decode_document(&stream).unwrap();
    assert_eq!(document.pages.len(), 1);
    let page = &document.pages[0];
    assert_eq!(page.bitmap.width(), 16);
    assert_eq!(page.bitmap.height(), 20);

    for (sym, s, t) in placements {
        let symbol = &symbols[sym];
        for y in 0..symbol.height() {
            for x in 0..symbol.width() {
                assert_eq!(
                    page.bitmap.get_pixel(s as u32 + x, t as u32 + y),
                    symbol.get_pixel(x, y)
                );
            }
        }
    }
}

fn text_params() -> text::TextRegionParams {
    text::TextRegionParams {
        huffman: false,
        refine: false,
        log_strips: 0,
        ref_corner: text::ReferenceCorner::TopLeft,
        transposed: false,
        comb_op: CombinationOperator::Or,
        default_pixel: 0,
        ds_offset: 0,
        r_template: 0,
        r_at: Vec::new(),
        huffman_tables: text::HuffmanTableSelectors::default(),
        num_instances: 4,
    }
}

/// A pattern dictionary feeding a halftone region, resolved end to end
/// through [`decode_document`].
#[test]
fn pattern_dictionary_and_halftone_region_compose_a_page() {
    let patterns: Vec<Bitmap> = (0..4u32)
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
    let dict_body = halftone::encode_pattern_dictionary(&patterns, 0);

    let region_params = halftone::HalftoneRegionParams {
        mmr: false,
        template: 0,
        enable_skip: false,
        comb_op: CombinationOperator::Or,
        default_pixel: 0,
        grid_w: 4,
        grid_h: 4,
        grid_x: 0,
        grid_y: 0,
        region_x: 4 << 8,
        region_y: 0,
    };
    let grid: Vec<u32> = (0..16u32).map(|i| i % 4).collect();
    let halftone_payload = halftone::encode_halftone_region(&region_params, &grid, &patterns);

    let region_info = RegionInfo {
        width: 16,
        height: 16,
        x: 0,
        y: 0,
        combination_operator: CombinationOperator::Or,
    };
    let mut region_body = Vec::new();
    let mut region_info_writer = BitWriter::new();
    region_info.write(&mut region_info_writer);
    region_body.extend(region_info_writer.finish());
    region_body.extend(halftone_payload);

    let mut stream = Vec::new();
    let mut page_info_writer = BitWriter::new();
    sample_page_info(16, 16).write(&mut page_info_writer);
    write_segment(&mut stream, 0, SegmentType::PageInfo, 1, vec![], page_info_writer.finish());
    write_segment(&mut stream, 1, SegmentType::PatternDictionary, 1, vec![], dict_body);
    write_segment(
        &mut stream,
        2,
        SegmentType::ImmediateHalftoneRegion,
        1,
        vec![1],
        region_body,
    );
    write_segment(&mut stream, 3, SegmentType::EndOfPage, 1, vec![], Vec::new());

    let document = decode_document(&stream).unwrap();
    assert_eq!(document.pages.len(), 1);
    assert_eq!(document.pages[0].bitmap.width(), 16);
    assert_eq!(document.pages[0].bitmap.height(), 16);
}

/// End-to-end via the top-level [`Encoder`]: multiple pages, full file
/// headers, a page boundary (end-of-page) between each.
#[test]
fn encoder_multi_page_end_of_page_roundtrip() {
    let mut page_a = Bitmap::new(20, 12);
    for y in 0..12u32 {
        for x in 0..20u32 {
            page_a.set_pixel(x, y, ((x * 3 + y) % 5 == 0) as u8);
        }
    }
    let mut page_b = Bitmap::new(10, 10);
    page_b.set_pixel(3, 3, 1);
    page_b.set_pixel(7, 7, 1);

    let mut encoder = Encoder::new(true);
    encoder.add_page(&page_a, true);
    encoder.add_page(&page_b, false);
    let bytes = encoder.finish();

    let document = decode_document(&bytes).unwrap();
    assert_eq!(document.pages.len(), 2);
    assert_eq!(document.pages[0].bitmap.raw(), page_a.raw());
    assert_eq!(document.pages[1].bitmap.raw(), page_b.raw());
}

/// An embedded-mode stream (no file header, as wrapped in a PDF/TIFF
/// container) decodes identically to a full-header stream.
#[test]
fn embedded_stream_without_file_header_decodes() {
    let mut page = Bitmap::new(8, 8);
    page.set_pixel(0, 0, 1);
    page.set_pixel(7, 7, 1);

    let mut encoder = Encoder::new(false);
    encoder.add_page(&page, false);
    let bytes = encoder.finish();

    let document = decode_document(&bytes).unwrap();
    assert_eq!(document.pages.len(), 1);
    assert_eq!(document.pages[0].bitmap.raw(), page.raw());
}
