//! Heap-backed 4-bit greyscale framebuffer for the e-paper panel.
//!
//! The chart is drawn into this RAM buffer and then pushed to the panel in
//! one go, since every e-paper update is a full refresh. Pixels are packed
//! two per byte in panel order (high nibble is the left pixel) and hold
//! `Gray4` luma, so 0 is black and 15 is white.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Gray4;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use crate::chart::constants::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

const WIDTH: usize = DISPLAY_WIDTH_PX as usize;
const HEIGHT: usize = DISPLAY_HEIGHT_PX as usize;

/// Bytes in the packed buffer (960 x 540 / 2 = 259,200).
const BUFFER_LEN: usize = WIDTH * HEIGHT / 2;

/// Both nibbles white.
const WHITE_PAIR: u8 = 0xFF;

/// Framebuffer implementing `DrawTarget<Color = Gray4>`.
///
/// Tracks whether anything changed since the last flush so an unchanged
/// screen never costs a panel refresh.
pub struct FrameBuffer {
    bytes: Vec<u8>,
    dirty: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a new all-white framebuffer.
    pub fn new() -> Self {
        Self {
            bytes: vec![WHITE_PAIR; BUFFER_LEN],
            dirty: false,
        }
    }

    /// Colour at `(x, y)`, `None` outside the panel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Gray4> {
        let (x, y) = (x as usize, y as usize);
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        let (idx, high) = Self::locate(x, y);
        let byte = self.bytes[idx];
        let luma = if high { byte >> 4 } else { byte & 0x0F };
        Some(Gray4::new(luma))
    }

    /// Packed pixel data, row-major, two pixels per byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether pixels changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    fn locate(x: usize, y: usize) -> (usize, bool) {
        let offset = y * WIDTH + x;
        (offset / 2, offset % 2 == 0)
    }

    /// Write a single pixel, marking the buffer dirty only if it changed.
    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Gray4) {
        let (idx, high) = Self::locate(x, y);
        let luma = color.luma() & 0x0F;
        let byte = self.bytes[idx];
        let updated = if high {
            (byte & 0x0F) | (luma << 4)
        } else {
            (byte & 0xF0) | luma
        };
        if updated != byte {
            self.bytes[idx] = updated;
            self.dirty = true;
        }
    }

    /// Push the whole frame to a display, then reset the dirty state.
    ///
    /// Sends every pixel with a single `fill_contiguous`. If nothing changed
    /// since the last flush, this is a no-op.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Gray4>,
    {
        if !self.dirty {
            return Ok(());
        }

        debug!("Flushing full {}x{} frame", WIDTH, HEIGHT);

        let area = Rectangle::new(Point::zero(), self.size());
        let pixels = self
            .bytes
            .iter()
            .flat_map(|&pair| [Gray4::new(pair >> 4), Gray4::new(pair & 0x0F)]);

        display.fill_contiguous(&area, pixels)?;
        self.dirty = false;
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Gray4;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let x = coord.x;
            let y = coord.y;
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let luma = color.luma() & 0x0F;
        let pair = (luma << 4) | luma;
        if self.bytes.iter().any(|&b| b != pair) {
            self.bytes.fill(pair);
            self.dirty = true;
        }
        Ok(())
    }
}
