//! Constants for chart layout
//!
//! Pixel positions are in canvas coordinates with the origin top-left.
//! Ink levels are blackness on the 16-level e-paper scale (0 white, 15 black).

use embedded_graphics::mono_font::{MonoFont, ascii::FONT_10X20};

use super::Ink;

/// Panel width in pixels (landscape)
pub const DISPLAY_WIDTH_PX: u32 = 960;

/// Panel height in pixels (landscape)
pub const DISPLAY_HEIGHT_PX: u32 = 540;

/// Space left of the plot in pixels
pub const MARGIN_LEFT_PX: i32 = 40;

/// Space right of the plot for the price labels in pixels
pub const MARGIN_RIGHT_PX: i32 = 110;

/// Space above the plot for the header in pixels
pub const MARGIN_TOP_PX: i32 = 60;

/// Space below the plot for the hour labels in pixels
pub const MARGIN_BOTTOM_PX: i32 = 50;

/// Font used for every label on the chart
pub const LABEL_FONT: MonoFont<'static> = FONT_10X20;

/// Height of one text line in pixels
pub const LINE_HEIGHT_PX: i32 = LABEL_FONT.character_size.height as i32;

/// Gap between the plot and the labels beside or below it
pub const LABEL_GAP_PX: i32 = 10;

/// Vertical position of the header line
pub const HEADER_Y_PX: i32 = 20;

/// Hour labels are drawn every this many hours
pub const HOUR_LABEL_INTERVAL: u32 = 6;

/// Hour labels closer than this to the current hour are left out
pub const HOUR_LABEL_CLEARANCE: usize = 2;

/// Width of one price bar in pixels
pub const BAR_WIDTH_PX: u32 = 12;

/// Width of the plot frame and the reference line in pixels
pub const FRAME_WIDTH_PX: u32 = 2;

/// Maximum characters in a single label
pub const MAX_LABEL_LENGTH: usize = 48;

/// Decimal places on price labels
pub const PRICE_PRECISION: usize = 3;

pub const INK_NOW: Ink = Ink::new(15);
pub const INK_HOUR_LABEL: Ink = Ink::new(10);
pub const INK_SCALE_LABEL: Ink = Ink::new(10);
pub const INK_REFERENCE_LINE: Ink = Ink::new(5);
pub const INK_BAR: Ink = Ink::new(7);
pub const INK_FRAME: Ink = Ink::new(15);
pub const INK_HEADER: Ink = Ink::new(15);
