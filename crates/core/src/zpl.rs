//! ZPL II command builder.
//!
//! One [`ZplBuilder`] is scoped to one compile call. Commands are appended in
//! order and rendered one per line; field data is passed through verbatim, so
//! callers run it through [`crate::hex_escape::encode_field_data`] first.

use std::fmt::Write as _;

// ── Configuration ───────────────────────────────────────────────────────

/// Label-level output switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZplOptions {
    /// Emit `^CI28` after the label header so field data is read as UTF-8.
    pub emit_ci28: bool,
}

/// `^FB` justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justification {
    /// `L`
    #[default]
    Left,
    /// `C`
    Center,
    /// `R`
    Right,
}

impl Justification {
    fn code(self) -> char {
        match self {
            Justification::Left => 'L',
            Justification::Center => 'C',
            Justification::Right => 'R',
        }
    }
}

/// `^FB` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBlock {
    /// Block width in dots.
    pub width: i32,
    /// Maximum number of lines.
    pub max_lines: u32,
    /// Extra dots between lines.
    pub line_spacing: i32,
    /// Line justification.
    pub justification: Justification,
    /// Hanging indent for lines after the first.
    pub hanging_indent: i32,
}

/// `^BX` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataMatrixParams {
    /// Module edge in dots.
    pub module_size: i32,
    /// Always 200.
    pub quality: u32,
    /// Symbol columns (0 = auto).
    pub columns: u32,
    /// Symbol rows (0 = auto).
    pub rows: u32,
    /// Format id 0-6.
    pub format_id: u32,
    /// Escape character.
    pub escape_char: char,
}

// ── Builder ─────────────────────────────────────────────────────────────

/// Accumulates ZPL commands for one label.
#[derive(Debug, Default)]
pub struct ZplBuilder {
    lines: Vec<String>,
    options: ZplOptions,
}

impl ZplBuilder {
    /// New empty builder.
    pub fn new(options: ZplOptions) -> Self {
        Self {
            lines: Vec::new(),
            options,
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    /// `^XA ^PW ^LL ^LH [^CI28]`
    pub fn start_label(&mut self, width_dots: i32, height_dots: i32, origin_x: i32, origin_y: i32) {
        self.push("^XA".into());
        self.push(format!("^PW{width_dots}"));
        self.push(format!("^LL{height_dots}"));
        self.push(format!("^LH{origin_x},{origin_y}"));
        if self.options.emit_ci28 {
            self.push("^CI28".into());
        }
    }

    /// `^XZ`
    pub fn end_label(&mut self) {
        self.push("^XZ".into());
    }

    /// `^FOx,y`
    pub fn field_origin(&mut self, x: i32, y: i32) {
        self.push(format!("^FO{x},{y}"));
    }

    /// `^FS`
    pub fn field_separator(&mut self) {
        self.push("^FS".into());
    }

    /// `^A0N,h,w` (scalable font 0, normal orientation).
    pub fn font_a0(&mut self, height: i32, width: i32) {
        self.push(format!("^A0N,{height},{width}"));
    }

    /// `^FBw,lines,spacing,J,indent`
    pub fn field_block(&mut self, block: FieldBlock) {
        self.push(format!(
            "^FB{},{},{},{},{}",
            block.width,
            block.max_lines,
            block.line_spacing,
            block.justification.code(),
            block.hanging_indent
        ));
    }

    /// `^FH`, with the indicator spelled out only when it is not `_`.
    pub fn field_hex(&mut self, indicator: char) {
        if indicator == '_' {
            self.push("^FH".into());
        } else {
            self.push(format!("^FH{indicator}"));
        }
    }

    /// `^FD` followed by already-encoded data.
    pub fn field_data(&mut self, data: &str) {
        self.push(format!("^FD{data}"));
    }

    /// `^BQN,model,mag`
    pub fn qr_code(&mut self, model: u32, magnification: u32) {
        self.push(format!("^BQN,{model},{magnification}"));
    }

    /// `^BXN,module,quality,cols,rows,format,esc`
    pub fn datamatrix(&mut self, p: DataMatrixParams) {
        self.push(format!(
            "^BXN,{},{},{},{},{},{}",
            p.module_size, p.quality, p.columns, p.rows, p.format_id, p.escape_char
        ));
    }

    /// `^GBw,h,t,color,rounding`
    pub fn graphic_box(&mut self, width: i32, height: i32, thickness: i32, color: char, rounding: u8) {
        self.push(format!("^GB{width},{height},{thickness},{color},{rounding}"));
    }

    /// `^GFA,total,total,bpr,data`
    pub fn graphic_field(&mut self, total_bytes: usize, bytes_per_row: usize, data: &str) {
        self.push(format!(
            "^GFA,{total_bytes},{total_bytes},{bytes_per_row},{data}"
        ));
    }

    /// Render every command followed by a newline.
    pub fn build(&self) -> String {
        let cap = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut out = String::with_capacity(cap);
        for line in &self.lines {
            let _ = writeln!(out, "{line}");
        }
        out
    }
}
