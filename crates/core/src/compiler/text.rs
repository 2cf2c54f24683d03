//! Text elements: font resolution, shrink-to-fit, wrapping, and `^FB`.

use serde_json::Value;

use super::LabelWriter;
use crate::error::{MeasureError, ZplGridError};
use crate::hex_escape::encode_field_data;
use crate::measure::{FontDots, TextMeasurer, TextMetrics, normalize_newlines};
use crate::model::{AlignH, AlignV, Rect, TextElement, TextFit, Wrap};
use crate::render::render_text;
use crate::zpl::{FieldBlock, Justification};

const DEFAULT_FONT_HEIGHT_MM: f64 = 4.0;
/// Line cap standing in for "unlimited".
const UNBOUNDED_LINES: u32 = 9999;
const SHRINK_FACTOR: f64 = 0.95;
const SHRINK_MAX_STEPS: usize = 200;
/// ZPL line break inside a field block.
const LINE_BREAK: &str = "\\&";

impl LabelWriter<'_> {
    pub(super) fn text(&mut self, el: &TextElement, rect: Rect) -> Result<(), ZplGridError> {
        let rendered = render_text(&el.text, self.variables, self.render)?;
        let raw = normalize_newlines(&rendered).replace("\\n", "\n");

        let mut font = self.font_for(el)?;
        let wrap = el.wrap.unwrap_or_default();
        let fit = el
            .fit
            .unwrap_or(if wrap == Wrap::None { TextFit::Overflow } else { TextFit::Wrap });
        let max_lines = el.max_lines.unwrap_or(UNBOUNDED_LINES);
        let align_v = el.align_v.unwrap_or_default();
        let line_spacing = 0;

        let explicit_lines = u32::try_from(raw.split('\n').count()).unwrap_or(u32::MAX);
        let explicit_overflow = max_lines < UNBOUNDED_LINES && explicit_lines > max_lines;
        let shrink = fit == TextFit::ShrinkToFit;

        let mut wrap_for_layout = wrap;
        let mut wrap_for_shrink = if shrink && wrap == Wrap::Char { Wrap::Word } else { wrap };
        if shrink && explicit_overflow {
            wrap_for_layout = Wrap::None;
            wrap_for_shrink = Wrap::None;
            tracing::warn!(
                explicit_lines,
                max_lines,
                "text exceeds max_lines; keeping its explicit line breaks and ignoring max_lines for them"
            );
        }

        let measurer = self.measurer;
        if shrink {
            let cap = if explicit_overflow { explicit_lines } else { max_lines };
            font = shrink_font(measurer, &raw, rect, font, wrap_for_shrink, cap, line_spacing)?;
        }

        let mut lines = measurer.wrap_lines(&raw, rect.w, font, wrap_for_layout)?;
        if fit == TextFit::Truncate
            && let Some(lines) = lines.as_mut()
        {
            lines.truncate(usize::try_from(max_lines).unwrap_or(usize::MAX));
        }

        let mut y = rect.y;
        if align_v != AlignV::Top {
            let metrics = match &lines {
                Some(lines) => measurer.measure_wrapped(lines, font, line_spacing)?,
                None => measurer.estimate(&raw, rect.w, font, wrap_for_layout, line_spacing)?,
            };
            let slack = rect.h - metrics.height_dots;
            y += match align_v {
                AlignV::Bottom => slack.max(0),
                _ => (slack / 2).max(0),
            };
        }

        let data = match &lines {
            Some(lines) => lines.join(LINE_BREAK),
            None => raw.replace('\n', LINE_BREAK),
        };

        self.zpl.field_origin(rect.x, y);
        self.zpl.font_a0(font.height, font.width);
        if wrap != Wrap::None || fit != TextFit::Overflow {
            let block_lines = match fit {
                TextFit::Overflow => UNBOUNDED_LINES,
                TextFit::ShrinkToFit if explicit_overflow => explicit_lines,
                _ => max_lines,
            };
            self.zpl.field_block(FieldBlock {
                width: rect.w.max(1),
                max_lines: block_lines,
                line_spacing,
                justification: justification(el.align_h.unwrap_or_default()),
                hanging_indent: 0,
            });
        }

        let field = encode_field_data(&data, '_');
        if field.needs_hex {
            self.zpl.field_hex('_');
        }
        self.zpl.field_data(&field.data);
        self.zpl.field_separator();
        Ok(())
    }

    /// Font cell from the element, its extensions, or the 4 mm default.
    ///
    /// A zero height counts as unset; the width follows the height.
    fn font_for(&self, el: &TextElement) -> Result<FontDots, ZplGridError> {
        let height_mm = el
            .font_height_mm
            .or_else(|| el.base.extensions.get("font_height_mm").and_then(Value::as_f64))
            .filter(|mm| *mm != 0.0)
            .unwrap_or(DEFAULT_FONT_HEIGHT_MM);
        let width_mm = el.font_width_mm.filter(|mm| *mm != 0.0).unwrap_or(height_mm);
        Ok(FontDots::new(
            self.dots(height_mm)?.max(1),
            self.dots(width_mm)?.max(1),
        ))
    }
}

fn justification(align: AlignH) -> Justification {
    match align {
        AlignH::Left => Justification::Left,
        AlignH::Center => Justification::Center,
        AlignH::Right => Justification::Right,
    }
}

/// Largest font, in 5% steps down from `font`, whose block fits `rect`.
///
/// Stops at a 1x1 cell or after a bounded number of steps.
fn shrink_font(
    measurer: &dyn TextMeasurer,
    text: &str,
    rect: Rect,
    font: FontDots,
    wrap: Wrap,
    max_lines: u32,
    line_spacing: i32,
) -> Result<FontDots, MeasureError> {
    if rect.w <= 0 || rect.h <= 0 {
        return Ok(font);
    }
    let max_lines = usize::try_from(max_lines).unwrap_or(usize::MAX);
    let fits = |m: &TextMetrics| m.lines <= max_lines && m.height_dots <= rect.h && m.width_dots <= rect.w;

    let mut current = font;
    for _ in 0..SHRINK_MAX_STEPS {
        if fits(&measurer.estimate(text, rect.w, current, wrap, line_spacing)?) {
            return Ok(current);
        }
        current = FontDots::new(scale_down(current.height), scale_down(current.width));
        if current.height == 1 && current.width == 1 {
            break;
        }
    }
    tracing::debug!(height = current.height, width = current.width, "shrink-to-fit hit its floor");
    Ok(current)
}

fn scale_down(d: i32) -> i32 {
    ((f64::from(d) * SHRINK_FACTOR) as i32).max(1)
}
