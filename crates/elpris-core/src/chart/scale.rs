//! Mapping prices and point indices onto the plot area

use embedded_graphics::prelude::*;

use super::constants::{MARGIN_BOTTOM_PX, MARGIN_LEFT_PX, MARGIN_RIGHT_PX, MARGIN_TOP_PX};

/// Vertical price range of a chart
///
/// Zero is always inside the range so bars grow from a common base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScale {
    pub min: f32,
    pub max: f32,
}

impl PriceScale {
    /// Range covering `prices` and zero
    pub fn from_prices<I: IntoIterator<Item = f32>>(prices: I) -> Self {
        prices.into_iter().fold(
            Self { min: 0.0, max: 0.0 },
            |scale, price| Self {
                min: scale.min.min(price),
                max: scale.max.max(price),
            },
        )
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Rectangle inside the margins where bars are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotArea {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PlotArea {
    pub fn for_canvas(canvas: Size) -> Self {
        Self {
            left: MARGIN_LEFT_PX,
            top: MARGIN_TOP_PX,
            right: canvas.width as i32 - MARGIN_RIGHT_PX,
            bottom: canvas.height as i32 - MARGIN_BOTTOM_PX,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Horizontal centre of point `index` out of `count`
    ///
    /// Points are spread evenly with half a slot of space at either end.
    pub fn x_for(&self, index: usize, count: usize) -> i32 {
        self.left + (index as i32 + 1) * self.width() / (count as i32 + 1)
    }

    /// Vertical position of `price`, truncated towards zero
    pub fn y_for(&self, price: f32, scale: &PriceScale) -> i32 {
        let span = scale.span();
        if span <= 0.0 {
            return self.bottom;
        }
        let height = self.height() as f32;
        (self.bottom as f32 - height * (price - scale.min) / span) as i32
    }
}
