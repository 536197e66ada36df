//! Painting a render plan with embedded-graphics

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Gray4;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, Primitive as _, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text, TextStyleBuilder};

use super::constants::LABEL_FONT;
use super::{Primitive, RenderPlan};

impl RenderPlan {
    /// Clear `target` to white and paint every primitive in order
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Gray4>,
    {
        target.clear(Gray4::WHITE)?;

        for primitive in self.primitives() {
            match primitive {
                Primitive::Line {
                    start,
                    end,
                    width,
                    ink,
                } => {
                    Line::new(*start, *end)
                        .into_styled(PrimitiveStyle::with_stroke(ink.to_gray(), *width))
                        .draw(target)?;
                }
                Primitive::Text {
                    text,
                    position,
                    alignment,
                    ink,
                } => {
                    let character_style = MonoTextStyle::new(&LABEL_FONT, ink.to_gray());
                    let text_style = TextStyleBuilder::new()
                        .alignment(*alignment)
                        .baseline(Baseline::Top)
                        .build();
                    Text::with_text_style(text, *position, character_style, text_style).draw(target)?;
                }
            }
        }
        Ok(())
    }
}
