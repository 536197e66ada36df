//! Bar chart of hourly spot prices for the e-paper panel
//!
//! Layout and drawing are split in two steps. [`layout`] turns a series of
//! prices into a [`RenderPlan`]: an ordered list of lines and text in canvas
//! coordinates. [`RenderPlan::draw`] then paints the plan onto any
//! `embedded-graphics` target with a 4-bit greyscale colour, which keeps the
//! geometry testable without a display.
//!
//! # Chart anatomy
//!
//! ```text
//!  12:04:51 10/01/2024                 4.112 V
//! +-----------------------------------+ 2.481
//! |        ||                         |
//! |-------|||||-----------------------| 1.204   <- current price line
//! |  |||||||||||  ||                  |
//! | |||||||||||||||||||||||||||||||||| |
//! +-----------------------------------+ 0.000
//!   0     6    12  14   18    0    6
//! ```
//!
//! Zero always lies on or inside the plot, so negative prices extend the
//! range downwards. The current hour's bar and label are drawn in full
//! black; scale labels that would collide with the current price label are
//! left out.

extern crate alloc;
use alloc::vec::Vec;
use core::fmt;

use embedded_graphics::pixelcolor::Gray4;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Alignment;
use heapless::String;
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::prices::{PricePoint, Slot};
use crate::time::Timestamp;

pub mod constants;
mod notice;
mod render;
mod scale;
mod series;

pub use notice::unavailable_notice;
pub use scale::{PlotArea, PriceScale};
pub use series::{ChartSeries, MAX_SERIES_POINTS};

use chrono::{Datelike, Timelike};
use constants::*;

/// Error types for chart operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChartError {
    /// No price in today's portion of the series matches the current hour
    #[error("No price for the current hour")]
    NoCurrentHourMatch,

    /// A day the chart needs has no prices
    #[error("No prices for {0}")]
    MissingPrices(Slot),
}

/// Blackness on the panel's 16-level greyscale (0 white, 15 black)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ink(u8);

impl Ink {
    pub const WHITE: Ink = Ink(0);
    pub const BLACK: Ink = Ink(15);

    /// Levels above 15 are clamped to black
    pub const fn new(level: u8) -> Self {
        if level > 15 { Self(15) } else { Self(level) }
    }

    pub const fn level(self) -> u8 {
        self.0
    }

    /// Panel colour for this ink; `Gray4` counts luma, not blackness
    pub fn to_gray(self) -> Gray4 {
        Gray4::new(15 - self.0)
    }
}

/// One drawing operation of a [`RenderPlan`]
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        start: Point,
        end: Point,
        width: u32,
        ink: Ink,
    },
    /// Text in [`LABEL_FONT`], `position` is the top of the glyphs
    Text {
        text: String<MAX_LABEL_LENGTH>,
        position: Point,
        alignment: Alignment,
        ink: Ink,
    },
}

/// Ordered list of primitives for one screen
///
/// Later primitives paint over earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    canvas: Size,
    scale: Option<PriceScale>,
    now_y: Option<i32>,
    primitives: Vec<Primitive>,
}

impl RenderPlan {
    /// An empty plan for a canvas of the given size
    pub fn new(canvas: Size) -> Self {
        Self {
            canvas,
            scale: None,
            now_y: None,
            primitives: Vec::new(),
        }
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Price range of the chart, `None` for a plan without one
    pub fn scale(&self) -> Option<PriceScale> {
        self.scale
    }

    /// Vertical position of the current price line
    pub fn now_y(&self) -> Option<i32> {
        self.now_y
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Text of every label, in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text { text, .. } => Some(text.as_str()),
            Primitive::Line { .. } => None,
        })
    }

    pub fn push_line(&mut self, start: Point, end: Point, width: u32, ink: Ink) {
        self.primitives.push(Primitive::Line {
            start,
            end,
            width,
            ink,
        });
    }

    /// Queue formatted text; anything past [`MAX_LABEL_LENGTH`] is cut off
    pub fn push_text(&mut self, args: fmt::Arguments<'_>, position: Point, alignment: Alignment, ink: Ink) {
        let mut text = String::new();
        let _ = fmt::write(&mut text, args);
        self.primitives.push(Primitive::Text {
            text,
            position,
            alignment,
            ink,
        });
    }

    /// Add the clock line above the plot
    ///
    /// The timestamp goes on the left, the battery voltage (when known) is
    /// right-aligned to the plot's right edge.
    pub fn push_header(&mut self, now: Timestamp, battery_volts: Option<f32>) {
        let area = PlotArea::for_canvas(self.canvas);
        self.push_text(
            format_args!(
                "{:02}:{:02}:{:02} {:02}/{:02}/{:04}",
                now.hour(),
                now.minute(),
                now.second(),
                now.day(),
                now.month(),
                now.year()
            ),
            Point::new(area.left, HEADER_Y_PX),
            Alignment::Left,
            INK_HEADER,
        );

        if let Some(volts) = battery_volts {
            self.push_text(
                format_args!("{:.3} V", volts),
                Point::new(area.right, HEADER_Y_PX),
                Alignment::Right,
                INK_HEADER,
            );
        }
    }
}

/// Lay out a bar chart of `points` with the bar at `now_index` highlighted
///
/// Fails with [`ChartError::NoCurrentHourMatch`] when `now_index` is missing
/// or outside the series; no partial plan is produced.
pub fn layout(points: &[PricePoint], now_index: Option<usize>, canvas: Size) -> Result<RenderPlan, ChartError> {
    let now = match now_index {
        Some(i) if i < points.len() => i,
        _ => {
            warn!("No current hour among {} prices", points.len());
            return Err(ChartError::NoCurrentHourMatch);
        }
    };

    let scale = PriceScale::from_prices(points.iter().map(PricePoint::price));
    let area = PlotArea::for_canvas(canvas);
    let count = points.len();
    let mut plan = RenderPlan::new(canvas);

    // Hour labels
    for (i, point) in points.iter().enumerate() {
        let is_now = i == now;
        let on_interval = point.hour() % HOUR_LABEL_INTERVAL == 0 && i.abs_diff(now) > HOUR_LABEL_CLEARANCE;
        if is_now || on_interval {
            plan.push_text(
                format_args!("{}", point.hour()),
                Point::new(area.x_for(i, count), area.bottom + LABEL_GAP_PX),
                Alignment::Center,
                if is_now { INK_NOW } else { INK_HOUR_LABEL },
            );
        }
    }

    let now_price = points[now].price();
    let y_now = area.y_for(now_price, &scale);
    let label_x = area.right + LABEL_GAP_PX;

    // Scale labels, unless the current price label would overlap them
    if y_now - area.top > 2 * LINE_HEIGHT_PX {
        plan.push_text(
            format_args!("{:.*}", PRICE_PRECISION, scale.max),
            Point::new(label_x, area.top - LINE_HEIGHT_PX / 2),
            Alignment::Left,
            INK_SCALE_LABEL,
        );
    }
    if area.bottom - y_now > 2 * LINE_HEIGHT_PX {
        plan.push_text(
            format_args!("{:.*}", PRICE_PRECISION, scale.min),
            Point::new(label_x, area.bottom - LINE_HEIGHT_PX / 2),
            Alignment::Left,
            INK_SCALE_LABEL,
        );
    }

    plan.push_line(
        Point::new(area.left, y_now),
        Point::new(area.right, y_now),
        FRAME_WIDTH_PX,
        INK_REFERENCE_LINE,
    );
    plan.push_text(
        format_args!("{:.*}", PRICE_PRECISION, now_price),
        Point::new(label_x, y_now - LINE_HEIGHT_PX / 2),
        Alignment::Left,
        INK_NOW,
    );

    // Bars
    for (i, point) in points.iter().enumerate() {
        let x = area.x_for(i, count);
        let y = area.y_for(point.price(), &scale);
        if y == area.bottom {
            continue;
        }
        plan.push_line(
            Point::new(x, y),
            Point::new(x, area.bottom),
            BAR_WIDTH_PX,
            if i == now { INK_NOW } else { INK_BAR },
        );
    }

    // Frame
    let corners = [
        Point::new(area.left, area.top),
        Point::new(area.right, area.top),
        Point::new(area.right, area.bottom),
        Point::new(area.left, area.bottom),
    ];
    for (start, end) in [(0, 1), (3, 2), (0, 3), (1, 2)] {
        plan.push_line(corners[start], corners[end], FRAME_WIDTH_PX, INK_FRAME);
    }

    debug!(
        "Chart of {} prices, range {}..{}, current {} at y={}",
        count, scale.min, scale.max, now_price, y_now
    );

    plan.scale = Some(scale);
    plan.now_y = Some(y_now);
    Ok(plan)
}
