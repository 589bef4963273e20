//! Page information parsing and region compositing (§4.11).

use crate::bit_io::{BitReader, BitWriter};
use crate::bitmap::{Bitmap, CombinationOperator};
use crate::constants::UNKNOWN_PAGE_HEIGHT;
use crate::error::Result;

/// A page information segment's fields (§3 "Page", §4.5 "Page information").
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub width: u32,
    /// `None` for the standard's unknown-height sentinel, legal only on
    /// striped pages that grow as later end-of-stripe segments arrive.
    pub height: Option<u32>,
    pub x_resolution: u32,
    pub y_resolution: u32,
    pub default_pixel: u8,
    pub default_comb_op: CombinationOperator,
    pub override_comb_op_allowed: bool,
    pub might_contain_refinements: bool,
    pub is_striped: bool,
    pub max_stripe_size: u16,
}

impl PageInfo {
    pub fn parse(reader: &mut BitReader) -> Result<Self> {
        let width = reader.read_u32()?;
        let raw_height = reader.read_u32()?;
        let height = if raw_height == UNKNOWN_PAGE_HEIGHT {
            None
        } else {
            Some(raw_height)
        };
        let x_resolution = reader.read_u32()?;
        let y_resolution = reader.read_u32()?;
        let flags = reader.read_u8()?;
        let might_contain_refinements = flags & 0x01 != 0;
        let default_pixel = (flags >> 2) & 0x01;
        let default_comb_op = crate::bitmap::parse_combination_operator((flags >> 3) & 0x03, 0)?;
        let override_comb_op_allowed = flags & 0x40 != 0;
        let striping = reader.read_u16()?;
        let is_striped = striping & 0x8000 != 0;
        let max_stripe_size = striping & 0x7FFF;

        Ok(Self {
            width,
            height,
            x_resolution,
            y_resolution,
            default_pixel,
            default_comb_op,
            override_comb_op_allowed,
            might_contain_refinements,
            is_striped,
            max_stripe_size,
        })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        writer.write_u32(self.width);
        writer.write_u32(self.height.unwrap_or(UNKNOWN_PAGE_HEIGHT));
        writer.write_u32(self.x_resolution);
        writer.write_u32(self.y_resolution);

        let mut flags = 0u8;
        if self.might_contain_refinements {
            flags |= 0x01;
        }
        flags |= (self.default_pixel & 0x01) << 2;
        flags |= (u8::from(self.default_comb_op) & 0x03) << 3;
        if self.override_comb_op_allowed {
            flags |= 0x40;
        }
        writer.write_u8(flags);

        let mut striping = self.max_stripe_size & 0x7FFF;
        if self.is_striped {
            striping |= 0x8000;
        }
        writer.write_u16(striping);
    }
}

/// Owns a page's growing bitmap and applies each region's combination
/// operator (region override vs. page default, §4.11 "Combination
/// operator").
pub struct Compositor {
    pub bitmap: Bitmap,
    info: PageInfo,
}

impl Compositor {
    /// `fallback_height` seeds an unknown-height (striped) page; it grows
    /// lazily as regions and end-of-stripe segments arrive past it.
    pub fn new(info: PageInfo, fallback_height: u32) -> Self {
        let height = info.height.unwrap_or(fallback_height).max(1);
        let bitmap = Self::blank(info.width, height, info.default_pixel);
        Self { bitmap, info }
    }

    fn blank(width: u32, height: u32, default_pixel: u8) -> Bitmap {
        if default_pixel != 0 {
            Bitmap::filled(width, height)
        } else {
            Bitmap::new(width, height)
        }
    }

    /// Extends the page canvas downward, preserving existing content, when a
    /// region or end-of-stripe marker reaches past the current height. A
    /// known-height page never needs this; only `PageInfo::height == None`
    /// pages do.
    pub fn ensure_height(&mut self, required_height: u32) {
        if required_height <= self.bitmap.height() {
            return;
        }
        let mut grown = Self::blank(self.bitmap.width(), required_height, self.info.default_pixel);
        grown.combine(&self.bitmap, 0, 0, CombinationOperator::Replace);
        self.bitmap = grown;
    }

    /// Composites one region at `(x, y)`. If the page disallows per-region
    /// operator overrides, every region uses the page's own default operator
    /// regardless of what it requested (§4.11).
    pub fn composite_region(
        &mut self,
        region: &Bitmap,
        x: i32,
        y: i32,
        region_comb_op: CombinationOperator,
    ) {
        self.ensure_height((y.max(0) as u32) + region.height());
        let op = if self.info.override_comb_op_allowed {
            region_comb_op
        } else {
            self.info.default_comb_op
        };
        self.bitmap.combine(region, x, y, op);
    }

    pub fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_info_roundtrip() {
        let info = PageInfo {
            width: 100,
            height: Some(200),
            x_resolution: 300,
            y_resolution: 300,
            default_pixel: 0,
            default_comb_op: CombinationOperator::Or,
            override_comb_op_allowed: true,
            might_contain_refinements: false,
            is_striped: false,
            max_stripe_size: 0,
        };
        let mut w = BitWriter::new();
        info.write(&mut w);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        let parsed = PageInfo::parse(&mut r).unwrap();
        assert_eq!(parsed.width, 100);
        assert_eq!(parsed.height, Some(200));
        assert!(parsed.override_comb_op_allowed);
    }

    #[test]
    fn unknown_height_roundtrips_to_none() {
        let mut info = PageInfo {
            width: 10,
            height: None,
            x_resolution: 0,
            y_resolution: 0,
            default_pixel: 0,
            default_comb_op: CombinationOperator::Or,
            override_comb_op_allowed: false,
            might_contain_refinements: false,
            is_striped: true,
            max_stripe_size: 16,
        };
        let mut w = BitWriter::new();
        info.write(&mut w);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        info = PageInfo::parse(&mut r).unwrap();
        assert_eq!(info.height, None);
        assert!(info.is_striped);
    }

    #[test]
    fn composite_region_fills_default_pixel() {
        let info = PageInfo {
            width: 8,
            height: Some(8),
            x_resolution: 0,
            y_resolution: 0,
            default_pixel: 1,
            default_comb_op: CombinationOperator::Or,
            override_comb_op_allowed: true,
            might_contain_refinements: false,
            is_striped: false,
            max_stripe_size: 0,
        };
        let compositor = Compositor::new(info, 8);
        assert_eq!(compositor.bitmap.get_pixel(0, 0), 1);
    }

    #[test]
    fn ensure_height_preserves_existing_rows() {
        let info = PageInfo {
            width: 4,
            height: None,
            x_resolution: 0,
            y_resolution: 0,
            default_pixel: 0,
            default_comb_op: CombinationOperator::Or,
            override_comb_op_allowed: true,
            might_contain_refinements: false,
            is_striped: true,
            max_stripe_size: 4,
        };
        let mut compositor = Compositor::new(info, 4);
        let mut region = Bitmap::new(4, 4);
        region.set_pixel(1, 1, 1);
        compositor.composite_region(&region, 0, 0, CombinationOperator::Or);
        compositor.ensure_height(8);
        assert_eq!(compositor.bitmap.height(), 8);
        assert_eq!(compositor.bitmap.get_pixel(1, 1), 1);
    }
}
