//! Measurement against a ZPL rendering oracle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use super::{FontDots, TextMeasurer, TextMetrics, count_i32, monospace_block, normalize_newlines};
use crate::config::MeasurerConfig;
use crate::error::MeasureError;
use crate::hex_escape::encode_field_data;
use crate::model::Wrap;

/// Largest label edge the oracle accepts, in inches.
const MAX_LABEL_IN: f64 = 15.0;

/// Glyph advance used for offline character wrapping.
const CHAR_WRAP_WIDTH_RATIO: f64 = 0.45;

/// One render job for a [`RenderOracle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest<'a> {
    /// Complete `^XA`..`^XZ` program.
    pub zpl: &'a str,
    /// Print density in dots per millimeter.
    pub dpmm: u32,
    /// Label width in inches.
    pub width_in: f64,
    /// Label height in inches.
    pub height_in: f64,
}

/// Something that turns ZPL into a PNG exactly as a printer would print it.
pub trait RenderOracle: Send + Sync {
    /// Render the first label of `request.zpl` to PNG bytes.
    fn render_png(
        &self,
        request: &RenderRequest<'_>,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Inked area of a rendered image or a symbol, in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InkMetrics {
    /// Left edge of the ink.
    pub offset_x: i32,
    /// Top edge of the ink.
    pub offset_y: i32,
    /// Ink width.
    pub width: i32,
    /// Ink height.
    pub height: i32,
}

impl InkMetrics {
    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.offset_x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.offset_y + self.height
    }
}

/// Bounding box `(left, top, right, bottom)` of pixels darker than
/// `threshold`, with right/bottom exclusive. Transparent pixels count as
/// white. `None` when nothing is inked.
pub fn ink_bbox(img: &DynamicImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let rgba = img.to_rgba8();
    let mut bbox: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        if luma_over_white(r, g, b, a) >= threshold {
            continue;
        }
        bbox = Some(match bbox {
            None => (x, y, x + 1, y + 1),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x + 1), b.max(y + 1)),
        });
    }
    bbox
}

/// ITU-R 601 luma of a pixel composited over white.
pub(crate) fn luma_over_white(r: u8, g: u8, b: u8, a: u8) -> u8 {
    let over = |c: u8| -> u32 {
        let (c, a) = (u32::from(c), u32::from(a));
        (c * a + 255 * (255 - a) + 127) / 255
    };
    let luma = (over(r) * 299 + over(g) * 587 + over(b) * 114 + 500) / 1000;
    u8::try_from(luma).unwrap_or(u8::MAX)
}

/// ZPL program that prints `text` in font `0` at the label origin.
///
/// Line breaks become `\&`; the field is hex-escaped with `_` as needed.
pub fn build_measure_zpl(text: &str, font: FontDots, use_utf8: bool) -> String {
    let normalized = normalize_newlines(text).replace('\n', "\\&");
    let field = encode_field_data(&normalized, '_');
    let mut zpl = String::from("^XA\n");
    if use_utf8 {
        zpl.push_str("^CI28\n");
    }
    zpl.push_str("^LH0,0\n^FO0,0\n");
    zpl.push_str(&format!("^A0N,{},{}\n", font.height, font.width));
    if field.needs_hex {
        zpl.push_str("^FH\n");
    }
    zpl.push_str(&format!("^FD{}^FS\n^XZ", field.data));
    zpl
}

/// Wraps and measures text by rendering it.
///
/// Without an oracle the measurer runs offline: widths come from a fixed
/// advance (`0.6 * font_width`, `0.45` for character wrapping), so results
/// are deterministic but only approximate. Per-line widths are cached for
/// the lifetime of the measurer.
pub struct OracleTextMeasurer {
    config: MeasurerConfig,
    oracle: Option<Arc<dyn RenderOracle>>,
    width_cache: RefCell<HashMap<(String, FontDots), i32>>,
}

impl fmt::Debug for OracleTextMeasurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleTextMeasurer")
            .field("config", &self.config)
            .field("online", &self.oracle.is_some())
            .field("cached_widths", &self.width_cache.borrow().len())
            .finish()
    }
}

impl OracleTextMeasurer {
    /// Build a measurer; `oracle = None` measures offline.
    pub fn new(
        config: MeasurerConfig,
        oracle: Option<Arc<dyn RenderOracle>>,
    ) -> Result<Self, MeasureError> {
        if config.dpmm == 0 {
            return Err(MeasureError::InvalidConfig("dpmm must be > 0".into()));
        }
        if !(config.label_width_in > 0.0 && config.label_height_in > 0.0) {
            return Err(MeasureError::InvalidConfig(
                "label_width_in/label_height_in must be > 0".into(),
            ));
        }
        if config.max_attempts == 0 {
            return Err(MeasureError::InvalidConfig("max_attempts must be > 0".into()));
        }
        Ok(Self {
            config,
            oracle,
            width_cache: RefCell::new(HashMap::new()),
        })
    }

    /// Offline measurer with default settings.
    pub fn offline() -> Self {
        Self {
            config: MeasurerConfig::default(),
            oracle: None,
            width_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Current settings.
    pub fn config(&self) -> &MeasurerConfig {
        &self.config
    }

    /// Whether measurements go to an oracle.
    pub fn is_online(&self) -> bool {
        self.oracle.is_some()
    }

    /// Render `text` and return its ink box.
    ///
    /// The label starts at `width_in` x `height_in` and doubles (up to
    /// 15 in per edge) while the ink touches the right or bottom edge.
    fn measure_ink(
        &self,
        oracle: &dyn RenderOracle,
        text: &str,
        font: FontDots,
        width_in: f64,
        height_in: f64,
    ) -> Result<InkMetrics, MeasureError> {
        let zpl = build_measure_zpl(text, font, self.config.use_utf8);
        let (mut w_in, mut h_in) = (width_in, height_in);

        for _ in 0..self.config.max_attempts {
            w_in = w_in.min(MAX_LABEL_IN);
            h_in = h_in.min(MAX_LABEL_IN);
            let request = RenderRequest {
                zpl: &zpl,
                dpmm: self.config.dpmm,
                width_in: w_in,
                height_in: h_in,
            };
            let png = oracle.render_png(&request).map_err(MeasureError::Oracle)?;
            let img = image::load_from_memory(&png)?;

            let Some((left, top, right, bottom)) = ink_bbox(&img, self.config.threshold) else {
                return Ok(InkMetrics::default());
            };
            let ink = InkMetrics {
                offset_x: i32::try_from(left).unwrap_or(i32::MAX),
                offset_y: i32::try_from(top).unwrap_or(i32::MAX),
                width: i32::try_from(right - left).unwrap_or(i32::MAX),
                height: i32::try_from(bottom - top).unwrap_or(i32::MAX),
            };
            let clear_of_edges =
                right < img.width().saturating_sub(1) && bottom < img.height().saturating_sub(1);
            if clear_of_edges || (w_in >= MAX_LABEL_IN && h_in >= MAX_LABEL_IN) {
                return Ok(ink);
            }
            tracing::debug!(w_in, h_in, "ink reaches label edge, enlarging");
            w_in *= 2.0;
            h_in *= 2.0;
        }

        Err(MeasureError::DidNotFit {
            width_in: w_in,
            height_in: h_in,
        })
    }

    /// Label size for a render of `box_width_dots` wide, `font_height` tall text.
    fn label_size_in(&self, box_width_dots: i32, font_height: i32) -> (f64, f64) {
        let dots_per_in = f64::from(self.config.dpmm) * 25.4;
        let width = self
            .config
            .label_width_in
            .max(f64::from(box_width_dots) / dots_per_in);
        let height = self
            .config
            .label_height_in
            .max(f64::from(font_height.max(1)) / dots_per_in);
        (width, height)
    }

    fn line_width(&self, text: &str, font: FontDots) -> Result<i32, MeasureError> {
        let key = (text.to_string(), font);
        if let Some(&w) = self.width_cache.borrow().get(&key) {
            return Ok(w);
        }
        let width = match &self.oracle {
            None => count_i32(text.chars().count()).saturating_mul(font.char_advance()),
            Some(oracle) => {
                let (w_in, h_in) = self.label_size_in(font.width.max(1), font.height);
                self.measure_ink(oracle.as_ref(), text, font, w_in, h_in)?.width
            }
        };
        self.width_cache.borrow_mut().insert(key, width);
        Ok(width)
    }

    fn wrap_word(&self, text: &str, box_width: i32, font: FontDots) -> Result<Vec<String>, MeasureError> {
        let mut words = text.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(vec![String::new()]);
        };
        let mut lines = Vec::new();
        let mut current = first.to_string();
        for word in words {
            let candidate = format!("{current} {word}");
            if self.line_width(&candidate, font)? <= box_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
        Ok(lines)
    }

    /// Longest prefix of `chars` that fits `box_width` (0 when none does).
    fn max_chars_that_fit(&self, chars: &[char], box_width: i32, font: FontDots) -> Result<usize, MeasureError> {
        let (mut low, mut high, mut best) = (1usize, chars.len(), 0usize);
        while low <= high {
            let mid = (low + high) / 2;
            let prefix: String = chars[..mid].iter().collect();
            if self.line_width(&prefix, font)? <= box_width {
                best = mid;
                low = mid + 1;
            } else {
                high = mid - 1;
            }
        }
        Ok(best)
    }

    fn wrap_char(&self, text: &str, box_width: i32, font: FontDots) -> Result<Vec<String>, MeasureError> {
        let mut rest: Vec<char> = text.chars().collect();
        let mut lines = Vec::new();
        let offline_len = {
            let char_w = ((f64::from(font.width) * CHAR_WRAP_WIDTH_RATIO) as i32).max(1);
            usize::try_from((box_width / char_w).max(1)).unwrap_or(1)
        };

        while !rest.is_empty() {
            let max_len = match self.oracle {
                None => offline_len,
                Some(_) => self.max_chars_that_fit(&rest, box_width, font)?,
            };
            if max_len == 0 || max_len >= rest.len() {
                lines.push(rest.iter().collect());
                break;
            }
            let (line, consumed) = break_line(&rest, max_len);
            lines.push(line);
            rest.drain(..consumed);
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        Ok(lines)
    }
}

/// Split `chars` after at most `max_len` characters.
///
/// A break between two alphanumerics hyphenates one character earlier when
/// both halves keep at least two characters. Returns the printed line and
/// the number of characters consumed.
fn break_line(chars: &[char], max_len: usize) -> (String, usize) {
    let plain = || (chars[..max_len].iter().collect(), max_len);
    let (last, next) = (chars[max_len - 1], chars[max_len]);
    if !(last.is_alphanumeric() && next.is_alphanumeric()) || max_len <= 2 {
        return plain();
    }
    let prefix = &chars[..max_len - 1];
    let suffix_len = chars.len() - prefix.len();
    if prefix.len() >= 2 && suffix_len >= 2 && prefix.iter().all(|c| c.is_alphanumeric()) {
        let mut line: String = prefix.iter().collect();
        line.push('-');
        (line, prefix.len())
    } else {
        plain()
    }
}

impl TextMeasurer for OracleTextMeasurer {
    fn estimate(
        &self,
        text: &str,
        box_width_dots: i32,
        font: FontDots,
        wrap: Wrap,
        line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError> {
        let lines = self.wrap_paragraphs(text, box_width_dots, font, wrap)?;
        self.measure_wrapped(&lines, font, line_spacing_dots)
    }

    fn wrap_lines(
        &self,
        text: &str,
        box_width_dots: i32,
        font: FontDots,
        wrap: Wrap,
    ) -> Result<Option<Vec<String>>, MeasureError> {
        self.wrap_paragraphs(text, box_width_dots, font, wrap).map(Some)
    }

    fn measure_wrapped(
        &self,
        lines: &[String],
        font: FontDots,
        line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError> {
        let Some(oracle) = &self.oracle else {
            return Ok(monospace_block(lines, font, line_spacing_dots));
        };
        let mut widest = 1;
        for line in lines {
            widest = widest.max(self.line_width(line, font)?);
        }
        let (w_in, h_in) = self.label_size_in(widest, font.height);
        let ink = self.measure_ink(oracle.as_ref(), &lines.join("\n"), font, w_in, h_in)?;
        let extra = count_i32(lines.len().saturating_sub(1)).saturating_mul(line_spacing_dots.max(0));
        Ok(TextMetrics {
            lines: lines.len(),
            width_dots: ink.width,
            height_dots: ink.height + extra,
        })
    }

    fn for_dpi(&self, dpi: u32) -> Option<Box<dyn TextMeasurer>> {
        Some(Box::new(Self {
            config: self.config.for_dpi(dpi),
            oracle: self.oracle.clone(),
            width_cache: RefCell::new(HashMap::new()),
        }))
    }
}

impl OracleTextMeasurer {
    fn wrap_paragraphs(
        &self,
        text: &str,
        box_width_dots: i32,
        font: FontDots,
        wrap: Wrap,
    ) -> Result<Vec<String>, MeasureError> {
        if box_width_dots <= 0 {
            return Ok(vec![text.to_string()]);
        }
        let mut lines = Vec::new();
        for paragraph in normalize_newlines(text).split('\n') {
            if paragraph.is_empty() {
                lines.push(String::new());
                continue;
            }
            match wrap {
                Wrap::None => lines.push(paragraph.to_string()),
                Wrap::Char => lines.extend(self.wrap_char(paragraph, box_width_dots, font)?),
                Wrap::Word => lines.extend(self.wrap_word(paragraph, box_width_dots, font)?),
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        Ok(lines)
    }
}
