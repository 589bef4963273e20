//! WebAssembly bindings for jbig2-rs.
//!
//! This module provides JavaScript-compatible functions via wasm-bindgen
//! for use in browsers and Node.js.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Page information returned from the WASM API.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct PageInfo {
    pub width: u32,
    pub height: u32,
    pub x_resolution: u32,
    pub y_resolution: u32,
}

/// Decode a JBIG2 stream, returning the packed 1bpp raster of its first page.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn decode_page(data: &[u8]) -> Result<Vec<u8>, JsValue> {
    let document = crate::document::decode_document(data)
        .map_err(|e| JsValue::from_str(&format!("{:?}", e)))?;
    let page = document
        .pages
        .first()
        .ok_or_else(|| JsValue::from_str("document has no pages"))?;
    Ok(page.bitmap.raw().to_vec())
}

/// Decode every page, returning one packed 1bpp raster per page.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn decode_all_pages(data: &[u8]) -> Result<Vec<js_sys::Uint8Array>, JsValue> {
    let document = crate::document::decode_document(data)
        .map_err(|e| JsValue::from_str(&format!("{:?}", e)))?;
    Ok(document
        .pages
        .iter()
        .map(|p| js_sys::Uint8Array::from(p.bitmap.raw()))
        .collect())
}

/// Get a page's dimensions without copying its raster.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn get_page_info(data: &[u8], page_index: u32) -> Result<PageInfo, JsValue> {
    let document = crate::document::decode_document(data)
        .map_err(|e| JsValue::from_str(&format!("{:?}", e)))?;
    let page = document
        .pages
        .get(page_index as usize)
        .ok_or_else(|| JsValue::from_str("page index out of range"))?;
    Ok(PageInfo {
        width: page.bitmap.width(),
        height: page.bitmap.height(),
        x_resolution: page.x_resolution,
        y_resolution: page.y_resolution,
    })
}

/// Encode a single packed 1bpp raster as a standalone JBIG2 stream.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn encode_page(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, JsValue> {
    let bitmap = crate::bitmap::Bitmap::from_raw(width, height, raw.to_vec())
        .map_err(|e| JsValue::from_str(&format!("{:?}", e)))?;
    let mut encoder = crate::encoder::Encoder::new(true);
    encoder.add_page(&bitmap, true);
    Ok(encoder.finish())
}
