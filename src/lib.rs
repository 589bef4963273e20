/*!
# jbig2-rs

`jbig2-rs` is a pure Rust implementation of the JBIG2 bi-level image codec
(ISO/IEC 14492), the compression format PDF and TIFF use for scanned black
and white pages.

## Decoding

```no_run
let data = std::fs::read("scan.jbig2").unwrap();
let document = jbig2_rs::decode_document(&data).unwrap();
for page in &document.pages {
    println!("{}x{}", page.bitmap.width(), page.bitmap.height());
}
```

## Encoding

```
use jbig2_rs::{Bitmap, Encoder};

let bitmap = Bitmap::new(64, 64);
let mut encoder = Encoder::new(true);
encoder.add_page(&bitmap, true);
let bytes = encoder.finish();
```

## Modules

- [`bitmap`]: the packed 1bpp raster and region-combination operators.
- [`segment`]: segment header parsing/emission.
- [`regions`]: generic, generic refinement, text, and pattern/halftone
  region decoders/encoders.
- [`symbol_dict`]: symbol dictionary decoding/encoding.
- [`document`]: file-header handling and segment-graph resolution into a
  [`Document`].
- [`encoder`]: the top-level page-at-a-time [`Encoder`].
- [`arith`]: the MQ-coder entropy backend shared by every arithmetic-mode
  decoder/encoder above.
- [`huffman`]: the standard tables (Annex B) for Huffman-mode decoding.
- [`mmr`]: the MMR (CCITT Group 4) trait boundary; no codec is implemented.
*/

pub mod arith;
pub mod bit_io;
pub mod bitmap;
pub mod cancellation;
pub mod compositor;
pub mod constants;
pub mod document;
pub mod encoder;
pub mod error;
pub mod huffman;
pub mod mmr;
pub mod regions;
pub mod segment;
pub mod symbol_dict;

#[cfg(feature = "ffi")]
pub mod ffi;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use bitmap::{Bitmap, CombinationOperator};
pub use cancellation::CancellationToken;
pub use document::{decode_document, decode_document_with_cancel, Document, Page};
pub use encoder::Encoder;
pub use error::{Jbig2Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_document_rejects_empty_input() {
        assert!(decode_document(&[]).unwrap().pages.is_empty());
    }

    #[test]
    fn end_to_end_single_page() {
        let mut bitmap = Bitmap::new(32, 24);
        for y in 0..24u32 {
            for x in 0..32u32 {
                bitmap.set_pixel(x, y, ((x ^ y) & 1) as u8);
            }
        }
        let mut encoder = Encoder::new(true);
        encoder.add_page(&bitmap, false);
        let bytes = encoder.finish();

        let doc = decode_document(&bytes).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].bitmap.raw(), bitmap.raw());
    }
}
