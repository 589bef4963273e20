//! MMR (Modified Modified READ / CCITT Group 4) trait boundary.
//!
//! The standard allows generic and generic-refinement regions to carry an
//! MMR-coded payload instead of an arithmetic-coded one. MMR is a complete,
//! separate codec; this crate treats it as an external collaborator rather
//! than shipping a CCITT G4 implementation, per the standard's own
//! boundary-case allowance for treating MMR as a black box.

use crate::bitmap::Bitmap;
use crate::error::{Jbig2Error, Result};

/// Decodes an MMR-coded bitmap payload.
pub trait MmrBitmapDecoder {
    fn decode(&self, width: u32, height: u32, data: &[u8]) -> Result<Bitmap>;
}

/// Encodes a bitmap to an MMR-coded payload.
pub trait MmrBitmapEncoder {
    fn encode(&self, bitmap: &Bitmap) -> Result<Vec<u8>>;
}

/// Stub that always reports the feature as unsupported. Swap in a real
/// CCITT Group 4 implementation by implementing [`MmrBitmapDecoder`] /
/// [`MmrBitmapEncoder`] and passing it through instead.
pub struct MmrDecoder;

impl MmrBitmapDecoder for MmrDecoder {
    fn decode(&self, _width: u32, _height: u32, _data: &[u8]) -> Result<Bitmap> {
        Err(Jbig2Error::UnsupportedFeature("MMR-coded region payload"))
    }
}

impl MmrDecoder {
    pub fn decode(&self, width: u32, height: u32, data: &[u8]) -> Result<Bitmap> {
        MmrBitmapDecoder::decode(self, width, height, data)
    }
}

pub struct MmrEncoder;

impl MmrBitmapEncoder for MmrEncoder {
    fn encode(&self, _bitmap: &Bitmap) -> Result<Vec<u8>> {
        Err(Jbig2Error::UnsupportedFeature("MMR-coded region payload"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmr_decode_reports_unsupported() {
        let result = MmrDecoder.decode(8, 8, &[0u8; 4]);
        assert!(matches!(result, Err(Jbig2Error::UnsupportedFeature(_))));
    }

    #[test]
    fn mmr_encode_reports_unsupported() {
        let bitmap = Bitmap::new(8, 8);
        let result = MmrEncoder.encode(&bitmap);
        assert!(matches!(result, Err(Jbig2Error::UnsupportedFeature(_))));
    }
}
