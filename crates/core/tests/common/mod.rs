//! Shared test helpers for `zplgrid_core` integration tests.

#![allow(unreachable_pub)]

use std::collections::HashMap;
use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use zplgrid_core::error::MeasureError;
use zplgrid_core::model::Wrap;
use zplgrid_core::{
    Compiler, FontDots, LabelTarget, TextMeasurer, TextMetrics, Variables, compile_zpl_value,
    load_template_value,
};

// ─── Templates ───────────────────────────────────────────────────────────────

/// One-leaf template with zero leaf padding around `element`.
#[allow(dead_code)]
pub fn leaf_template(element: Value) -> Value {
    json!({
        "schema_version": 1,
        "name": "test",
        "defaults": { "leaf_padding_mm": [0.0, 0.0, 0.0, 0.0] },
        "layout": { "kind": "leaf", "elements": [element] }
    })
}

/// One-leaf template keeping the default 1 mm leaf padding.
#[allow(dead_code)]
pub fn padded_leaf_template(element: Value) -> Value {
    json!({
        "schema_version": 1,
        "name": "test",
        "layout": { "kind": "leaf", "elements": [element] }
    })
}

// ─── Compilation ─────────────────────────────────────────────────────────────

/// Compile with the default compiler and no variables, panicking on error.
#[allow(dead_code)]
pub fn compile(template: &Value, target: &LabelTarget) -> String {
    compile_zpl_value(template, target, &Variables::new(), false)
        .unwrap_or_else(|e| panic!("compile failed: {e}"))
}

/// Compile with a specific compiler and no variables, panicking on error.
#[allow(dead_code)]
pub fn compile_with(compiler: &Compiler, template: &Value, target: &LabelTarget) -> String {
    let template = load_template_value(template).unwrap_or_else(|e| panic!("invalid template: {e}"));
    compiler
        .compile(&template, target, &Variables::new(), false)
        .unwrap_or_else(|e| panic!("compile failed: {e}"))
}

/// `(x, y)` of the `^FO` line directly before the first line starting with `command`.
#[allow(dead_code)]
pub fn origin_before(zpl: &str, command: &str) -> (i32, i32) {
    let lines: Vec<&str> = zpl.lines().collect();
    let idx = lines
        .iter()
        .position(|l| l.starts_with(command))
        .unwrap_or_else(|| panic!("no {command} line in:\n{zpl}"));
    assert!(idx > 0, "{command} is the first line");
    let fo = lines[idx - 1]
        .strip_prefix("^FO")
        .unwrap_or_else(|| panic!("line before {command} is not ^FO: {}", lines[idx - 1]));
    let (x, y) = fo.split_once(',').expect("^FO has two coordinates");
    (x.parse().expect("numeric x"), y.parse().expect("numeric y"))
}

// ─── Images ──────────────────────────────────────────────────────────────────

/// Solid black PNG, base64 encoded.
#[allow(dead_code)]
pub fn black_png_base64(width: u32, height: u32) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    STANDARD.encode(buf.into_inner())
}

// ─── Measurers ───────────────────────────────────────────────────────────────

/// Measurer returning canned lines per wrap mode (the input text otherwise).
///
/// Every line is 10 dots wide and one font height tall.
#[allow(dead_code)]
pub struct FakeMeasurer {
    lines_by_wrap: HashMap<Wrap, Vec<String>>,
}

#[allow(dead_code)]
impl FakeMeasurer {
    pub fn new(pairs: &[(Wrap, &[&str])]) -> Self {
        Self {
            lines_by_wrap: pairs
                .iter()
                .map(|(wrap, lines)| (*wrap, lines.iter().map(|l| l.to_string()).collect()))
                .collect(),
        }
    }

    fn lines_for(&self, text: &str, wrap: Wrap) -> Vec<String> {
        self.lines_by_wrap
            .get(&wrap)
            .cloned()
            .unwrap_or_else(|| vec![text.to_string()])
    }
}

impl TextMeasurer for FakeMeasurer {
    fn estimate(
        &self,
        text: &str,
        _box_width_dots: i32,
        font: FontDots,
        wrap: Wrap,
        line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError> {
        self.measure_wrapped(&self.lines_for(text, wrap), font, line_spacing_dots)
    }

    fn wrap_lines(
        &self,
        text: &str,
        _box_width_dots: i32,
        _font: FontDots,
        wrap: Wrap,
    ) -> Result<Option<Vec<String>>, MeasureError> {
        Ok(Some(self.lines_for(text, wrap)))
    }

    fn measure_wrapped(
        &self,
        lines: &[String],
        font: FontDots,
        _line_spacing_dots: i32,
    ) -> Result<TextMetrics, MeasureError> {
        let count = i32::try_from(lines.len()).unwrap();
        Ok(TextMetrics {
            lines: lines.len(),
            width_dots: 10,
            height_dots: count * font.height.max(1),
        })
    }
}
