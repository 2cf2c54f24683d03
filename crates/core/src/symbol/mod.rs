//! 2D symbol builders.
//!
//! A builder turns payload data plus symbol parameters into a
//! [`ZplSymbol`]: the minimal ZPL program that prints it, its footprint in
//! dots, and where its ink lands. The compiler uses the footprint to align
//! symbols inside their boxes; the programs themselves are standalone
//! (`^XA`..`^XZ`) and useful for rendering previews.
//!
//! For `render_mode = "image"` the module matrices come from [`qr_matrix`]
//! and [`datamatrix_matrix`] instead.

mod datamatrix;
mod qr;

pub use datamatrix::{DataMatrixMeta, DataMatrixZplBuilder, datamatrix_matrix};
pub(crate) use datamatrix::check_escape_collision;
pub use qr::{
    QR_FORCED_TOP_MODULES, QrCodeZplBuilder, QrMeta, QrMode, default_qr_magnification, qr_matrix,
    select_qr_version,
};

use crate::measure::InkMetrics;

/// Field orientation of a barcode command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrientation {
    /// Normal.
    #[default]
    N,
    /// Rotated 90 degrees clockwise.
    R,
    /// Inverted 180 degrees.
    I,
    /// Read from bottom up, 270 degrees.
    B,
}

impl FieldOrientation {
    /// ZPL letter.
    pub fn as_char(self) -> char {
        match self {
            Self::N => 'N',
            Self::R => 'R',
            Self::I => 'I',
            Self::B => 'B',
        }
    }
}

/// Footprint of a symbol, in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSize {
    /// Width the printer occupies.
    pub symbol_width: i32,
    /// Height the printer occupies (including any forced offset).
    pub symbol_height: i32,
    /// Width including the recommended quiet zone.
    pub recommended_width: i32,
    /// Height including the recommended quiet zone.
    pub recommended_height: i32,
}

/// Builder-specific details about a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolMeta {
    /// QR parameters chosen by [`QrCodeZplBuilder`].
    Qr(QrMeta),
    /// DataMatrix parameters used by [`DataMatrixZplBuilder`].
    DataMatrix(DataMatrixMeta),
}

/// A built symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ZplSymbol {
    /// Standalone `^XA`..`^XZ` program printing the symbol.
    pub zpl: String,
    /// Footprint.
    pub size: SymbolSize,
    /// Inked area relative to the field origin.
    pub ink: InkMetrics,
    /// Builder details.
    pub meta: SymbolMeta,
}

impl ZplSymbol {
    /// `"qr"` or `"datamatrix"`.
    pub fn kind(&self) -> &'static str {
        match self.meta {
            SymbolMeta::Qr(_) => "qr",
            SymbolMeta::DataMatrix(_) => "datamatrix",
        }
    }
}

/// Dark/light module grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    width: usize,
    height: usize,
    dark: Vec<bool>,
}

impl ModuleMatrix {
    /// All-light `width` x `height` grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            dark: vec![false; width * height],
        }
    }

    /// Modules per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Modules per column.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the module at column `x`, row `y` is dark.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.dark[y * self.width + x]
    }

    pub(crate) fn set_dark(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.dark[y * self.width + x] = true;
        }
    }
}
