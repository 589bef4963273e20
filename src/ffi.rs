//! C Foreign Function Interface for jbig2-rs.
//!
//! This module provides C-compatible functions with opaque handles
//! for use from C/C++ projects.

use std::os::raw::{c_int, c_uchar};
use std::ptr;

use crate::document::Document;

/// Opaque decoder handle.
#[repr(C)]
pub struct Jbig2Decoder {
    _private: [u8; 0],
}

/// Page dimensions and resolution, filled in by `jbig2_decoder_read_page`.
#[repr(C)]
pub struct Jbig2PageInfo {
    pub width: u32,
    pub height: u32,
    pub x_resolution: u32,
    pub y_resolution: u32,
    pub stride: u32,
}

/// Error codes.
#[repr(C)]
pub enum Jbig2FfiError {
    Ok = 0,
    InvalidData = 1,
    BufferTooSmall = 2,
    UnsupportedFeature = 3,
    InternalError = 4,
    PageOutOfRange = 5,
}

struct DecoderState {
    document: Option<Document>,
}

/// Create a new decoder and eagerly decode the whole document.
///
/// # Safety
/// `data` must be a valid pointer to `len` bytes.
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn jbig2_decoder_new(data: *const c_uchar, len: usize) -> *mut Jbig2Decoder {
    if data.is_null() && len != 0 {
        return ptr::null_mut();
    }

    let slice = if len == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    };

    let document = crate::document::decode_document(slice).ok();
    let state = Box::new(DecoderState { document });
    Box::into_raw(state) as *mut Jbig2Decoder
}

/// Free a decoder handle.
///
/// # Safety
/// `decoder` must be a valid handle from `jbig2_decoder_new`, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn jbig2_decoder_free(decoder: *mut Jbig2Decoder) {
    if !decoder.is_null() {
        let _ = unsafe { Box::from_raw(decoder as *mut DecoderState) };
    }
}

/// Number of pages successfully decoded, or 0 if decoding failed entirely.
///
/// # Safety
/// `decoder` must be a valid handle from `jbig2_decoder_new`.
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn jbig2_decoder_page_count(decoder: *mut Jbig2Decoder) -> u32 {
    if decoder.is_null() {
        return 0;
    }
    let state = unsafe { &*(decoder as *mut DecoderState) };
    state
        .document
        .as_ref()
        .map(|d| d.pages.len() as u32)
        .unwrap_or(0)
}

/// Read one page's dimensions.
///
/// # Safety
/// `decoder` must be valid. `info` must point to a valid [`Jbig2PageInfo`].
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn jbig2_decoder_read_page(
    decoder: *mut Jbig2Decoder,
    page_index: u32,
    info: *mut Jbig2PageInfo,
) -> c_int {
    if decoder.is_null() || info.is_null() {
        return Jbig2FfiError::InvalidData as c_int;
    }
    let state = unsafe { &*(decoder as *mut DecoderState) };
    let document = match &state.document {
        Some(d) => d,
        None => return Jbig2FfiError::InvalidData as c_int,
    };
    let page = match document.pages.get(page_index as usize) {
        Some(p) => p,
        None => return Jbig2FfiError::PageOutOfRange as c_int,
    };

    unsafe {
        (*info).width = page.bitmap.width();
        (*info).height = page.bitmap.height();
        (*info).x_resolution = page.x_resolution;
        (*info).y_resolution = page.y_resolution;
        (*info).stride = page.bitmap.stride() as u32;
    }
    Jbig2FfiError::Ok as c_int
}

/// Copy a page's packed 1bpp raster into `output` (`stride * height` bytes,
/// MSB-first, 1 = black, matching [`crate::bitmap::Bitmap::raw`]).
///
/// # Safety
/// All pointers must be valid. `output` must have at least `output_len` bytes.
#[unsafe(no_mangle)]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub unsafe extern "C" fn jbig2_decoder_copy_page(
    decoder: *mut Jbig2Decoder,
    page_index: u32,
    output: *mut c_uchar,
    output_len: usize,
) -> c_int {
    if decoder.is_null() || output.is_null() {
        return Jbig2FfiError::InvalidData as c_int;
    }
    let state = unsafe { &*(decoder as *mut DecoderState) };
    let document = match &state.document {
        Some(d) => d,
        None => return Jbig2FfiError::InvalidData as c_int,
    };
    let page = match document.pages.get(page_index as usize) {
        Some(p) => p,
        None => return Jbig2FfiError::PageOutOfRange as c_int,
    };

    let raw = page.bitmap.raw();
    if output_len < raw.len() {
        return Jbig2FfiError::BufferTooSmall as c_int;
    }
    let output_slice = unsafe { std::slice::from_raw_parts_mut(output, raw.len()) };
    output_slice.copy_from_slice(raw);
    Jbig2FfiError::Ok as c_int
}
