//! Document-level decoding (§3 "Document", §4.5): file header handling,
//! segment dispatch, referred-to graph resolution, and page assembly.

use std::collections::HashMap;

use crate::bit_io::BitReader;
use crate::bitmap::Bitmap;
use crate::cancellation::CancellationToken;
use crate::compositor::{Compositor, PageInfo};
use crate::constants::FILE_HEADER_MAGIC;
use crate::error::{Jbig2Error, Result};
use crate::regions::generic;
use crate::regions::halftone;
use crate::regions::refinement;
use crate::regions::text::{self, TextRegionParams};
use crate::regions::RegionInfo;
use crate::segment::{SegmentHeader, SegmentType};
use crate::symbol_dict::{self, SymbolDictParams};

/// A fully decoded page: its composited bitmap plus the resolution fields
/// carried by its page information segment.
#[derive(Debug, Clone)]
pub struct Page {
    pub bitmap: Bitmap,
    pub x_resolution: u32,
    pub y_resolution: u32,
}

/// A decoded multi-page document (§6 "decode_document").
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub pages: Vec<Page>,
}

/// Segment-numbered lookup tables accumulated while walking the stream, used
/// to resolve each segment's `referred_to` list (§3 "Referred-to graph").
#[derive(Default)]
struct SegmentStore {
    symbols: HashMap<u32, Vec<Bitmap>>,
    patterns: HashMap<u32, Vec<Bitmap>>,
    intermediate_regions: HashMap<u32, (Bitmap, i32, i32)>,
}

struct PageBuilder {
    compositor: Compositor,
    x_resolution: u32,
    y_resolution: u32,
}

/// Decodes a complete JBIG2 stream into a [`Document`] (§6 "decode_document").
/// Accepts either a stream with the file header (`decode with header`) or an
/// "embedded" stream starting directly at the first segment header, as
/// produced by PDF/TIFF containers.
pub fn decode_document(data: &[u8]) -> Result<Document> {
    decode_document_with_cancel(data, &())
}

pub fn decode_document_with_cancel(
    data: &[u8],
    cancel: &impl CancellationToken,
) -> Result<Document> {
    let body = strip_file_header(data)?;
    let mut reader = BitReader::new(body);
    let mut store = SegmentStore::default();
    let mut pages: HashMap<u32, PageBuilder> = HashMap::new();
    let mut finished_pages: Vec<Page> = Vec::new();

    loop {
        if reader.remaining().is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            return Err(Jbig2Error::Cancelled);
        }
        let header = SegmentHeader::parse(&mut reader, None)?;
        let segment_data = read_segment_data(body, &mut reader, &header)?;

        process_segment(
            &header,
            segment_data,
            &mut store,
            &mut pages,
            &mut finished_pages,
            cancel,
        )?;

        if header.segment_type == SegmentType::EndOfFile {
            break;
        }
    }

    for (_, builder) in pages {
        finished_pages.push(Page {
            bitmap: builder.compositor.into_bitmap(),
            x_resolution: builder.x_resolution,
            y_resolution: builder.y_resolution,
        });
    }

    Ok(Document {
        pages: finished_pages,
    })
}

fn strip_file_header(data: &[u8]) -> Result<&[u8]> {
    if data.starts_with(&FILE_HEADER_MAGIC) {
        if data.len() < FILE_HEADER_MAGIC.len() + 1 {
            return Err(Jbig2Error::TruncatedStream {
                offset: data.len(),
                needed: 1,
            });
        }
        let flags = data[FILE_HEADER_MAGIC.len()];
        let known_page_count = flags & 0x02 == 0;
        let header_len = FILE_HEADER_MAGIC.len() + 1 + if known_page_count { 4 } else { 0 };
        if data.len() < header_len {
            return Err(Jbig2Error::TruncatedStream {
                offset: data.len(),
                needed: header_len - data.len(),
            });
        }
        Ok(&data[header_len..])
    } else {
        Ok(data)
    }
}

/// Reads a segment's data bytes, resolving the standard's unknown-length
/// sentinel only for the one case it is legal in: a generic region within a
/// striped page. Anywhere else, an unknown length is an unimplemented
/// feature (§9 Open Question (a)).
fn read_segment_data<'a>(
    body: &'a [u8],
    reader: &mut BitReader<'a>,
    header: &SegmentHeader,
) -> Result<&'a [u8]> {
    match header.data_length {
        Some(len) => {
            let start = reader.byte_position();
            let end = start + len as usize;
            if end > body.len() {
                return Err(Jbig2Error::TruncatedStream {
                    offset: body.len(),
                    needed: end - body.len(),
                });
            }
            reader.seek_to_byte(end);
            Ok(&body[start..end])
        }
        None => {
            let is_generic_region = matches!(
                header.segment_type,
                SegmentType::IntermediateGenericRegion
                    | SegmentType::ImmediateGenericRegion
                    | SegmentType::ImmediateLosslessGenericRegion
            );
            if !is_generic_region {
                return Err(Jbig2Error::UnsupportedFeature(
                    "unknown-length segment outside a striped generic region",
                ));
            }
            Err(Jbig2Error::UnsupportedFeature(
                "unknown-length generic region scan-for-terminator",
            ))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn process_segment(
    header: &SegmentHeader,
    data: &[u8],
    store: &mut SegmentStore,
    pages: &mut HashMap<u32, PageBuilder>,
    finished_pages: &mut Vec<Page>,
    cancel: &impl CancellationToken,
) -> Result<()> {
    match header.segment_type {
        SegmentType::PageInfo => {
            let mut reader = BitReader::new(data);
            let info = PageInfo::parse(&mut reader)?;
            let builder = PageBuilder {
                x_resolution: info.x_resolution,
                y_resolution: info.y_resolution,
                compositor: Compositor::new(info, 1),
            };
            pages.insert(header.page_association, builder);
        }

        SegmentType::SymbolDictionary => {
            let mut reader = BitReader::new(data);
            let params = SymbolDictParams::parse(&mut reader)?;
            let imported = gather_symbols(header, store);
            let payload = reader.remaining();
            let symbols = symbol_dict::decode(payload, &params, &imported, cancel)?;
            store.symbols.insert(header.segment_number, symbols);
        }

        SegmentType::IntermediateTextRegion
        | SegmentType::ImmediateTextRegion
        | SegmentType::ImmediateLosslessTextRegion => {
            let mut reader = BitReader::new(data);
            let region_info = RegionInfo::parse(&mut reader, header.segment_number)?;
            let params = TextRegionParams::parse(&mut reader)?;
            let symbols = gather_symbols(header, store);
            let payload = reader.remaining();
            let bitmap = if params.huffman {
                text::decode_huffman(payload, region_info.width, region_info.height, &symbols, &params)?
            } else {
                text::decode_arith(
                    payload,
                    region_info.width,
                    region_info.height,
                    &symbols,
                    &params,
                    cancel,
                )?
            };
            place_region(
                header,
                bitmap,
                region_info.x as i32,
                region_info.y as i32,
                region_info.combination_operator,
                store,
                pages,
            )?;
        }

        SegmentType::PatternDictionary => {
            let patterns = halftone::decode_pattern_dictionary(data)?;
            store.patterns.insert(header.segment_number, patterns);
        }

        SegmentType::IntermediateHalftoneRegion
        | SegmentType::ImmediateHalftoneRegion
        | SegmentType::ImmediateLosslessHalftoneRegion => {
            let mut reader = BitReader::new(data);
            let region_info = RegionInfo::parse(&mut reader, header.segment_number)?;
            let patterns = header
                .referred_to
                .iter()
                .find_map(|r| store.patterns.get(r))
                .ok_or(Jbig2Error::InvalidReference {
                    segment_number: header.segment_number,
                    referred: header.referred_to.first().copied().unwrap_or(0),
                })?;
            let payload = reader.remaining();
            let bitmap =
                halftone::decode_halftone_region(payload, region_info.width, region_info.height, patterns)?;
            place_region(
                header,
                bitmap,
                region_info.x as i32,
                region_info.y as i32,
                region_info.combination_operator,
                store,
                pages,
            )?;
        }

        SegmentType::IntermediateGenericRegion
        | SegmentType::ImmediateGenericRegion
        | SegmentType::ImmediateLosslessGenericRegion => {
            let mut reader = BitReader::new(data);
            let region_info = RegionInfo::parse(&mut reader, header.segment_number)?;
            let payload = reader.remaining();
            let bitmap = generic::decode_region(
                payload,
                region_info.width,
                region_info.height,
                header.segment_number,
                cancel,
            )?;
            place_region(
                header,
                bitmap,
                region_info.x as i32,
                region_info.y as i32,
                region_info.combination_operator,
                store,
                pages,
            )?;
        }

        SegmentType::IntermediateGenericRefinementRegion
        | SegmentType::ImmediateGenericRefinementRegion
        | SegmentType::ImmediateLosslessGenericRefinementRegion => {
            let mut reader = BitReader::new(data);
            let region_info = RegionInfo::parse(&mut reader, header.segment_number)?;
            let (reference, ref_dx, ref_dy) = resolve_refinement_reference(header, &region_info, store, pages)?;
            let payload = reader.remaining();
            let bitmap = refinement::decode_region(
                payload,
                region_info.width,
                region_info.height,
                &reference,
                ref_dx,
                ref_dy,
                cancel,
            )?;
            place_region(
                header,
                bitmap,
                region_info.x as i32,
                region_info.y as i32,
                region_info.combination_operator,
                store,
                pages,
            )?;
        }

        SegmentType::EndOfPage => {
            if let Some(builder) = pages.remove(&header.page_association) {
                finished_pages.push(Page {
                    bitmap: builder.compositor.into_bitmap(),
                    x_resolution: builder.x_resolution,
                    y_resolution: builder.y_resolution,
                });
            }
        }

        SegmentType::EndOfStripe => {
            let mut reader = BitReader::new(data);
            let y = reader.read_u32()?;
            if let Some(builder) = pages.get_mut(&header.page_association) {
                builder.compositor.ensure_height(y + 1);
            }
        }

        SegmentType::EndOfFile | SegmentType::Profiles | SegmentType::Tables | SegmentType::Extension => {}
    }

    Ok(())
}

/// Combines a segment's directly referred-to symbol dictionaries' exports,
/// in referred-to order (§3 "Imported symbols").
fn gather_symbols(header: &SegmentHeader, store: &SegmentStore) -> Vec<Bitmap> {
    let mut symbols = Vec::new();
    for r in &header.referred_to {
        if let Some(s) = store.symbols.get(r) {
            symbols.extend(s.iter().cloned());
        }
    }
    symbols
}

fn resolve_refinement_reference(
    header: &SegmentHeader,
    region_info: &RegionInfo,
    store: &SegmentStore,
    pages: &HashMap<u32, PageBuilder>,
) -> Result<(Bitmap, i32, i32)> {
    for r in &header.referred_to {
        if let Some((bitmap, x, y)) = store.intermediate_regions.get(r) {
            return Ok((bitmap.clone(), *x, *y));
        }
    }
    let page = pages
        .get(&header.page_association)
        .ok_or(Jbig2Error::InvalidReference {
            segment_number: header.segment_number,
            referred: header.page_association,
        })?;
    let cropped = page.compositor.bitmap.crop(
        region_info.x,
        region_info.y,
        region_info.width,
        region_info.height,
    );
    Ok((cropped, 0, 0))
}

fn place_region(
    header: &SegmentHeader,
    bitmap: Bitmap,
    x: i32,
    y: i32,
    comb_op: crate::bitmap::CombinationOperator,
    store: &mut SegmentStore,
    pages: &mut HashMap<u32, PageBuilder>,
) -> Result<()> {
    let is_intermediate = matches!(
        header.segment_type,
        SegmentType::IntermediateTextRegion
            | SegmentType::IntermediateHalftoneRegion
            | SegmentType::IntermediateGenericRegion
            | SegmentType::IntermediateGenericRefinementRegion
    );
    if is_intermediate {
        store
            .intermediate_regions
            .insert(header.segment_number, (bitmap, x, y));
        return Ok(());
    }
    let builder = pages
        .get_mut(&header.page_association)
        .ok_or(Jbig2Error::InvalidReference {
            segment_number: header.segment_number,
            referred: header.page_association,
        })?;
    builder.compositor.composite_region(&bitmap, x, y, comb_op);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_io::BitWriter;
    use crate::bitmap::CombinationOperator;
    use crate::compositor::PageInfo;
    use crate::regions::RegionInfo;
    use crate::segment::SegmentHeader;

    fn write_segment(
        out: &mut Vec<u8>,
        segment_number: u32,
        segment_type: SegmentType,
        page_association: u32,
        body: Vec<u8>,
    ) {
        let header = SegmentHeader {
            segment_number,
            segment_type,
            page_association_size_is_4_bytes: false,
            deferred_non_retain: false,
            retain_flags: vec![false],
            referred_to: Vec::new(),
            page_association,
            data_length: Some(body.len() as u32),
        };
        let mut w = BitWriter::new();
        header.write(&mut w);
        out.extend(w.finish());
        out.extend(body);
    }

    #[test]
    fn single_generic_region_page_roundtrips() {
        let mut bitmap = Bitmap::new(8, 8);
        bitmap.set_pixel(2, 2, 1);
        bitmap.set_pixel(5, 5, 1);
        let region_bytes = generic::encode_region(&bitmap, 0, false);

        let mut stream = Vec::new();

        let page_info = PageInfo {
            width: 8,
            height: Some(8),
            x_resolution: 0,
            y_resolution: 0,
            default_pixel: 0,
            default_comb_op: CombinationOperator::Or,
            override_comb_op_allowed: true,
            might_contain_refinements: false,
            is_striped: false,
            max_stripe_size: 0,
        };
        let mut page_body_writer = BitWriter::new();
        page_info.write(&mut page_body_writer);
        write_segment(
            &mut stream,
            0,
            SegmentType::PageInfo,
            1,
            page_body_writer.finish(),
        );

        let region_info = RegionInfo {
            width: 8,
            height: 8,
            x: 0,
            y: 0,
            combination_operator: CombinationOperator::Or,
        };
        let mut region_body_writer = BitWriter::new();
        region_info.write(&mut region_body_writer);
        let mut region_body = region_body_writer.finish();
        region_body.extend(region_bytes);
        write_segment(
            &mut stream,
            1,
            SegmentType::ImmediateGenericRegion,
            1,
            region_body,
        );

        write_segment(&mut stream, 2, SegmentType::EndOfPage, 1, Vec::new());

        let doc = decode_document(&stream).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].bitmap.get_pixel(2, 2), 1);
        assert_eq!(doc.pages[0].bitmap.get_pixel(5, 5), 1);
        assert_eq!(doc.pages[0].bitmap.get_pixel(0, 0), 0);
    }

    #[test]
    fn rejects_truncated_file_header() {
        let mut data = FILE_HEADER_MAGIC.to_vec();
        data.push(0x00); // known page count, but count bytes missing
        assert!(matches!(
            decode_document(&data),
            Err(Jbig2Error::TruncatedStream { .. })
        ));
    }
}
