//! Display that writes each refresh to a PNG file.

use std::path::PathBuf;

use image::{Rgb, RgbImage};
use tomme_core::model::{Frame, InkyColor};
use tomme_core::ports::{DisplayPort, PortError};
use tracing::info;

#[derive(Debug)]
/// Preview panel: frames are saved as PNG with the border as a one-pixel frame.
pub(crate) struct PngDisplay {
    width: u32,
    height: u32,
    border: InkyColor,
    output: PathBuf,
}

impl PngDisplay {
    pub(crate) fn new(width: u32, height: u32, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        info!(width, height, output = %output.display(), "PNG display initialized");
        Self {
            width,
            height,
            border: InkyColor::White,
            output,
        }
    }

    /// Fill the whole panel with one color.
    pub(crate) fn clear(&mut self, color: InkyColor) -> Result<(), PortError> {
        info!(?color, "Clearing display");
        self.border = color;
        self.show(&Frame::filled(self.width, self.height, color))
    }
}

impl DisplayPort for PngDisplay {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_border(&mut self, color: InkyColor) {
        self.border = color;
    }

    fn show(&mut self, frame: &Frame) -> Result<(), PortError> {
        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(PortError::Display(format!(
                "frame is {}x{} but the panel is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut image = RgbImage::from_pixel(self.width + 2, self.height + 2, rgb(self.border));
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some(color) = frame.pixel(x, y) {
                    image.put_pixel(x + 1, y + 1, rgb(color));
                }
            }
        }

        image.save(&self.output).map_err(|err| {
            PortError::Display(format!("failed to write {}: {err}", self.output.display()))
        })?;
        info!(output = %self.output.display(), "Display updated");
        Ok(())
    }
}

fn rgb(color: InkyColor) -> Rgb<u8> {
    match color {
        InkyColor::White => Rgb([255, 255, 255]),
        InkyColor::Black => Rgb([0, 0, 0]),
        InkyColor::Red => Rgb([200, 0, 0]),
    }
}
