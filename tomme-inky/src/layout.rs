//! Two-band title/date layout for small e-paper panels.

use chrono::Local;
use embedded_graphics::Drawable;
use embedded_graphics::mono_font::iso_8859_1::{
    FONT_4X6, FONT_7X13_BOLD, FONT_9X18_BOLD, FONT_10X20,
};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::prelude::{Point, Primitive, Size};
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use tomme_core::model::{Frame, InkyColor};
use tomme_core::ports::{PortError, RenderPort};
use tracing::info;

use crate::canvas::{Canvas, Ink};

/// Titles up to this many characters use the large font on one line.
const SHORT_TITLE: usize = 15;
const MAX_TITLE_LINES: usize = 3;
const TITLE_LINE_HEIGHT: i32 = 16;
const CAPTION_PADDING: i32 = 3;
const CAPTION_BOTTOM: i32 = 12;

#[derive(Debug, Clone, Copy)]
/// White title band above a black date band.
pub(crate) struct TitleAndDateLayout {
    width: u32,
    height: u32,
}

impl TitleAndDateLayout {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn draw(&self, frame: &mut Frame, title: &str, date: &str, caption: &str) {
        let width = to_coord(self.width);
        let height = to_coord(self.height);
        let division = height / 2;
        let mut canvas = Canvas(frame);

        infallible(
            Rectangle::new(
                Point::new(0, division),
                Size::new(self.width, self.height - self.height / 2),
            )
            .into_styled(PrimitiveStyle::with_fill(Ink(InkyColor::Black)))
            .draw(&mut canvas),
        );

        let (font, lines): (&MonoFont<'_>, Vec<String>) =
            if title.chars().count() > SHORT_TITLE {
                (&FONT_7X13_BOLD, split_title(title, SHORT_TITLE))
            } else {
                (&FONT_10X20, vec![title.to_owned()])
            };
        let title_style = MonoTextStyle::new(font, Ink(InkyColor::Black));
        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();

        let count = i32::try_from(lines.len()).unwrap_or(1);
        let first_line = division / 2 - (count - 1) * TITLE_LINE_HEIGHT / 2;
        for (offset, line) in (0..).zip(&lines) {
            let center = Point::new(width / 2, first_line + offset * TITLE_LINE_HEIGHT);
            infallible(
                Text::with_text_style(line, center, title_style, centered)
                    .draw(&mut canvas)
                    .map(drop),
            );
        }

        let date_style = MonoTextStyle::new(&FONT_9X18_BOLD, Ink(InkyColor::White));
        let date_center = Point::new(width / 2, division + (height - division) / 2);
        infallible(
            Text::with_text_style(date, date_center, date_style, centered)
                .draw(&mut canvas)
                .map(drop),
        );

        let caption_style = MonoTextStyle::new(&FONT_4X6, Ink(InkyColor::White));
        let bottom_right = TextStyleBuilder::new()
            .alignment(Alignment::Right)
            .baseline(Baseline::Top)
            .build();
        infallible(
            Text::with_text_style(
                caption,
                Point::new(width - CAPTION_PADDING, height - CAPTION_BOTTOM),
                caption_style,
                bottom_right,
            )
            .draw(&mut canvas)
            .map(drop),
        );
    }
}

impl RenderPort for TitleAndDateLayout {
    fn title_and_date(&self, title: &str, date: &str) -> Result<Frame, PortError> {
        if self.width == 0 || self.height == 0 {
            return Err(PortError::Render(format!(
                "cannot draw on a {}x{} panel",
                self.width, self.height
            )));
        }
        info!(title, date, "Creating title and date layout");

        let caption = format!("Updated: {}", Local::now().format("%d/%m %H:%M"));
        let mut frame = Frame::new(self.width, self.height);
        self.draw(&mut frame, title, date, &caption);
        Ok(frame)
    }
}

/// Break a long title into display lines.
///
/// Comma-separated lists are grouped first; if that gives more than three
/// lines or overly long ones, words are wrapped instead. At most three lines
/// are kept.
pub(crate) fn split_title(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_owned()];
    }
    let soft_limit = max_len * 3 / 2;

    if text.contains(',') {
        let lines = pack(text.split(',').map(str::trim), ", ", soft_limit);
        let hard_limit = max_len * 9 / 5;
        let fits = lines.iter().all(|line| line.chars().count() <= hard_limit);
        if lines.len() <= MAX_TITLE_LINES && fits {
            return lines;
        }
    }

    let mut lines = pack(text.split_whitespace(), " ", soft_limit);
    lines.truncate(MAX_TITLE_LINES);
    lines
}

fn pack<'text>(
    parts: impl Iterator<Item = &'text str>,
    joiner: &str,
    limit: usize,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for part in parts {
        if current.is_empty() {
            current.push_str(part);
        } else if current.chars().count() + joiner.len() + part.chars().count() <= limit {
            current.push_str(joiner);
            current.push_str(part);
        } else {
            lines.push(std::mem::replace(&mut current, part.to_owned()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn to_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn infallible(result: Result<(), std::convert::Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}
