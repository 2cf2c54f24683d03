//! Text measurement.
//!
//! The compiler never measures glyphs itself: it asks a [`TextMeasurer`] how
//! many lines a string wraps to and how much space it occupies. Two
//! implementations ship here:
//!
//! - [`MonospaceApproxMeasurer`]: fixed advance of `0.6 * font_width`,
//!   no line breaking of its own (the printer's `^FB` wraps).
//! - [`OracleTextMeasurer`]: wraps lines itself and measures them against a
//!   [`RenderOracle`] (a ZPL-to-PNG renderer), falling back to the same
//!   monospace arithmetic when no oracle is configured.

mod oracle;

pub use oracle::{InkMetrics, OracleTextMeasurer, RenderOracle, RenderRequest, build_measure_zpl, ink_bbox};
pub(crate) use oracle::luma_over_white;

use crate::error::MeasureError;
use crate::model::Wrap;

/// Advance of one glyph as a fraction of the font width.
pub(crate) const CHAR_WIDTH_RATIO: f64 = 0.6;

/// Font cell in dots (`^A0N,height,width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontDots {
    /// Cell height.
    pub height: i32,
    /// Cell width.
    pub width: i32,
}

impl FontDots {
    /// Font cell `height` x `width`.
    pub fn new(height: i32, width: i32) -> Self {
        Self { height, width }
    }

    /// Approximate glyph advance, at least one dot.
    pub(crate) fn char_advance(self) -> i32 {
        ((f64::from(self.width) * CHAR_WIDTH_RATIO) as i32).max(1)
    }
}

/// Space occupied by a block of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMetrics {
    /// Number of printed lines.
    pub lines: usize,
    /// Widest line in dots.
    pub width_dots: i32,
    /// Total block height in dots.
    pub height_dots: i32,
}

/// Answers "how big is this text" for the compiler.
pub trait TextMeasurer {
    /// Size of `text` wrapped into `box_width_dots`.
    fn estimate(
        &self,
        text: &str,
        box_width_dots: i32,
        font: FontDots,
        wrap: Wrap,
        line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError>;

    /// Break `text` into printed lines, if this measurer wraps on its own.
    ///
    /// `None` (the default) leaves line breaking to the printer's field
    /// block; the compiler then only uses [`TextMeasurer::estimate`].
    fn wrap_lines(
        &self,
        _text: &str,
        _box_width_dots: i32,
        _font: FontDots,
        _wrap: Wrap,
    ) -> Result<Option<Vec<String>>, MeasureError> {
        Ok(None)
    }

    /// Size of lines already produced by [`TextMeasurer::wrap_lines`].
    fn measure_wrapped(
        &self,
        lines: &[String],
        font: FontDots,
        line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError> {
        Ok(monospace_block(lines, font, line_spacing_dots))
    }

    /// A measurer tuned for a label at `dpi`, if this one is density-specific.
    fn for_dpi(&self, _dpi: u32) -> Option<Box<dyn TextMeasurer>> {
        None
    }
}

/// Monospace arithmetic over already-wrapped lines.
pub(crate) fn monospace_block(lines: &[String], font: FontDots, line_spacing_dots: i32) -> TextMetrics {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    TextMetrics {
        lines: lines.len(),
        width_dots: count_i32(longest).saturating_mul(font.char_advance()),
        height_dots: count_i32(lines.len()).saturating_mul(font.height + line_spacing_dots),
    }
}

pub(crate) fn count_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// `\r\n` and `\r` become `\n`.
pub(crate) fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Fixed-advance estimate; the printer does the actual wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceApproxMeasurer;

impl TextMeasurer for MonospaceApproxMeasurer {
    fn estimate(
        &self,
        text: &str,
        box_width_dots: i32,
        font: FontDots,
        wrap: Wrap,
        line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError> {
        if box_width_dots <= 0 || font.width <= 0 || font.height <= 0 {
            return Ok(TextMetrics::default());
        }
        let char_w = font.char_advance();
        let max_chars = usize::try_from((box_width_dots / char_w).max(1)).unwrap_or(1);

        let lines: usize = normalize_newlines(text)
            .split('\n')
            .map(str::trim)
            .map(|p| {
                if p.is_empty() {
                    return 1;
                }
                match wrap {
                    Wrap::None => 1,
                    Wrap::Char => p.chars().count().div_ceil(max_chars),
                    Wrap::Word => word_wrap_line_count(p, max_chars),
                }
            })
            .sum();

        Ok(TextMetrics {
            lines,
            width_dots: box_width_dots.min(count_i32(max_chars).saturating_mul(char_w)),
            height_dots: count_i32(lines).saturating_mul(font.height + line_spacing_dots),
        })
    }
}

/// Greedy word wrap by character count.
fn word_wrap_line_count(text: &str, max_chars: usize) -> usize {
    let mut lines = 1;
    let mut current = 0;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if current == 0 {
            current = len;
        } else if current + 1 + len <= max_chars {
            current += 1 + len;
        } else {
            lines += 1;
            current = len;
        }
    }
    lines
}
