//! `embedded-graphics` draw target over a [`Frame`].

use std::convert::Infallible;

use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Size};
use tomme_core::model::{Frame, InkyColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Panel color usable as an `embedded-graphics` pixel color.
pub(crate) struct Ink(pub(crate) InkyColor);

impl PixelColor for Ink {
    type Raw = ();
}

/// Borrowed frame accepting `embedded-graphics` drawing operations.
pub(crate) struct Canvas<'frame>(pub(crate) &'frame mut Frame);

impl DrawTarget for Canvas<'_> {
    type Color = Ink;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, Ink(color)) in pixels {
            // Negative coordinates fall outside the frame.
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.0.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}
