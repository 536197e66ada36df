//! Screen shown when no chart can be drawn

use embedded_graphics::prelude::*;
use embedded_graphics::text::Alignment;

use super::constants::{INK_HOUR_LABEL, INK_NOW, LINE_HEIGHT_PX};
use super::{ChartError, RenderPlan};
use crate::time::Timestamp;

/// A plan telling the user prices are unavailable, and why
pub fn unavailable_notice(canvas: Size, now: Timestamp, error: &ChartError) -> RenderPlan {
    let mut plan = RenderPlan::new(canvas);
    plan.push_header(now, None);

    let centre = Point::new(canvas.width as i32 / 2, canvas.height as i32 / 2);
    plan.push_text(
        format_args!("Price data unavailable"),
        centre - Point::new(0, LINE_HEIGHT_PX),
        Alignment::Center,
        INK_NOW,
    );
    plan.push_text(
        format_args!("{}", error),
        centre + Point::new(0, LINE_HEIGHT_PX / 2),
        Alignment::Center,
        INK_HOUR_LABEL,
    );
    plan
}
