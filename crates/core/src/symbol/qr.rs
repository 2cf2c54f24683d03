//! QR Code (model 2) sizing and `^BQ` programs.

use qrcode::bits::Bits;
use qrcode::{Color, EcLevel, QrCode, Version};

use super::{FieldOrientation, ModuleMatrix, SymbolMeta, SymbolSize, ZplSymbol};
use crate::error::CompilationError;
use crate::measure::InkMetrics;
use crate::model::{CharacterMode, EccLevel, InputMode};

/// Blank modules the printer inserts above a `^BQ` symbol.
///
/// Calibrated against rendered output: a `^BQN,2,2` field at the label
/// origin inks from y = 10. Re-check when targeting other firmware.
pub const QR_FORCED_TOP_MODULES: i32 = 5;

/// Largest byte count a `^FD..B{nnnn}` field can declare.
const MAX_BYTE_FIELD_LEN: usize = 9999;

/// Data codewords per version (1-40) for ECC levels L, M, Q, H.
const CAPACITY_CODEWORDS: [[u32; 4]; 40] = [
    [19, 16, 13, 9],
    [34, 28, 22, 16],
    [55, 44, 34, 26],
    [80, 64, 48, 36],
    [108, 86, 62, 46],
    [136, 108, 76, 60],
    [156, 124, 88, 66],
    [194, 154, 110, 86],
    [232, 182, 132, 100],
    [274, 216, 154, 122],
    [324, 254, 180, 140],
    [370, 290, 206, 158],
    [428, 334, 244, 180],
    [461, 365, 261, 197],
    [523, 415, 295, 223],
    [589, 453, 325, 253],
    [647, 507, 367, 283],
    [721, 563, 397, 313],
    [795, 627, 445, 341],
    [861, 669, 485, 385],
    [932, 714, 512, 406],
    [1006, 782, 568, 442],
    [1094, 860, 614, 464],
    [1174, 914, 664, 514],
    [1276, 1000, 718, 538],
    [1370, 1062, 754, 596],
    [1468, 1128, 808, 628],
    [1531, 1193, 871, 661],
    [1631, 1267, 911, 701],
    [1735, 1373, 985, 745],
    [1843, 1455, 1033, 793],
    [1955, 1541, 1115, 845],
    [2071, 1631, 1171, 901],
    [2191, 1725, 1231, 961],
    [2306, 1812, 1286, 986],
    [2434, 1914, 1354, 1054],
    [2566, 1992, 1426, 1096],
    [2702, 2102, 1502, 1142],
    [2812, 2216, 1582, 1222],
    [2956, 2334, 1666, 1276],
];

const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// QR segment encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrMode {
    /// Digits, 10 bits per 3.
    Numeric,
    /// `0-9A-Z $%*+-./:`, 11 bits per 2.
    Alphanumeric,
    /// Raw bytes.
    Byte,
}

impl QrMode {
    /// Classify `data` as a single segment.
    pub fn for_data(data: &[u8]) -> Self {
        if !data.is_empty() && data.iter().all(u8::is_ascii_digit) {
            Self::Numeric
        } else if data.iter().all(|b| ALPHANUMERIC.contains(b)) {
            Self::Alphanumeric
        } else {
            Self::Byte
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Alphanumeric => "alphanumeric",
            Self::Byte => "byte",
        }
    }

    fn length_bits(self, version: u32) -> u32 {
        let tier = match version {
            ..10 => 0,
            10..27 => 1,
            _ => 2,
        };
        match self {
            Self::Numeric => [10, 12, 14][tier],
            Self::Alphanumeric => [9, 11, 13][tier],
            Self::Byte => [8, 16, 16][tier],
        }
    }

    fn data_bits(self, len: u32) -> u32 {
        match self {
            Self::Numeric => len / 3 * 10 + [0, 4, 7][(len % 3) as usize],
            Self::Alphanumeric => len / 2 * 11 + [0, 6][(len % 2) as usize],
            Self::Byte => len * 8,
        }
    }
}

fn ecc_index(ecc: EccLevel) -> usize {
    match ecc {
        EccLevel::L => 0,
        EccLevel::M => 1,
        EccLevel::Q => 2,
        EccLevel::H => 3,
    }
}

/// Smallest version (1-40) holding `data` as one segment at `ecc`.
pub fn select_qr_version(data: &[u8], ecc: EccLevel) -> Result<(u32, QrMode), CompilationError> {
    let mode = QrMode::for_data(data);
    let too_large = || CompilationError::DataTooLarge {
        len: data.len(),
        ecc: ecc.as_char(),
        mode: mode.as_str(),
    };
    let len = u32::try_from(data.len()).map_err(|_| too_large())?;
    let required = |version: u32| 4 + mode.length_bits(version) + mode.data_bits(len);
    (1..=40u32)
        .zip(CAPACITY_CODEWORDS)
        .find(|&(version, caps)| required(version) <= caps[ecc_index(ecc)] * 8)
        .map(|(version, _)| (version, mode))
        .ok_or_else(too_large)
}

/// Default magnification for a print density.
pub fn default_qr_magnification(dpi: u32) -> u32 {
    match dpi {
        ..=160 => 1,
        161..=250 => 2,
        251..=350 => 3,
        _ => 4,
    }
}

/// Details recorded by [`QrCodeZplBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrMeta {
    /// Selected version.
    pub version: u32,
    /// Modules per side.
    pub modules: i32,
    /// Dots per module.
    pub magnification: u32,
    /// ECC level.
    pub ecc: EccLevel,
    /// Segment mode used for version selection.
    pub mode: QrMode,
    /// Field orientation.
    pub orientation: FieldOrientation,
    /// Recommended quiet zone in modules.
    pub quiet_zone_modules: u32,
    /// Recommended quiet zone in dots.
    pub quiet_zone_dots: i32,
    /// [`QR_FORCED_TOP_MODULES`] in dots at this magnification.
    pub forced_top_dots: i32,
}

/// Builds `^BQ` programs and predicts their footprint.
#[derive(Debug, Clone)]
pub struct QrCodeZplBuilder {
    magnification: u32,
    ecc: EccLevel,
    model: u8,
    orientation: FieldOrientation,
    quiet_zone_modules: u32,
    ink_offset_x: i32,
    ink_offset_y: i32,
}

impl QrCodeZplBuilder {
    /// Model 2, ECC M, normal orientation, 4-module recommended quiet zone.
    pub fn new(magnification: u32) -> Result<Self, CompilationError> {
        if !(1..=10).contains(&magnification) {
            return Err(CompilationError::Symbol(format!(
                "magnification must be in [1..10] (got {magnification})"
            )));
        }
        Ok(Self {
            magnification,
            ecc: EccLevel::M,
            model: 2,
            orientation: FieldOrientation::N,
            quiet_zone_modules: 4,
            ink_offset_x: 0,
            ink_offset_y: 0,
        })
    }

    /// Error-correction level.
    #[must_use]
    pub fn ecc(mut self, ecc: EccLevel) -> Self {
        self.ecc = ecc;
        self
    }

    /// Field orientation.
    #[must_use]
    pub fn orientation(mut self, orientation: FieldOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Recommended quiet zone, in modules.
    #[must_use]
    pub fn quiet_zone_modules(mut self, modules: u32) -> Self {
        self.quiet_zone_modules = modules;
        self
    }

    /// QR model (1 or 2).
    pub fn model(mut self, model: u8) -> Result<Self, CompilationError> {
        if !(1..=2).contains(&model) {
            return Err(CompilationError::Symbol(format!("model must be 1 or 2 (got {model})")));
        }
        self.model = model;
        Ok(self)
    }

    /// Extra ink offset measured for a specific renderer.
    pub fn ink_offset(mut self, x: i32, y: i32) -> Result<Self, CompilationError> {
        if x < 0 || y < 0 {
            return Err(CompilationError::Symbol("ink offsets must be >= 0".into()));
        }
        self.ink_offset_x = x;
        self.ink_offset_y = y;
        Ok(self)
    }

    /// Size `data` and emit a byte-mode program at `(x, y)`.
    pub fn build(&self, data: &str, x: i32, y: i32) -> Result<ZplSymbol, CompilationError> {
        if !data.is_ascii() {
            return Err(CompilationError::NonAscii("QR"));
        }
        if data.len() > MAX_BYTE_FIELD_LEN {
            return Err(CompilationError::Symbol(format!(
                "byte-mode field supports up to {MAX_BYTE_FIELD_LEN} bytes (got {})",
                data.len()
            )));
        }
        let (version, mode) = select_qr_version(data.as_bytes(), self.ecc)?;
        let modules = 4 * i32::try_from(version).unwrap_or(40) + 17;
        let mag = i32::try_from(self.magnification).unwrap_or(10);

        let ink_w = modules * mag;
        let forced_top = QR_FORCED_TOP_MODULES * mag;
        let symbol_h = ink_w + forced_top;
        let qz = i32::try_from(self.quiet_zone_modules).unwrap_or(i32::MAX / 4).saturating_mul(mag);

        let zpl = format!(
            "^XA\n^FO{x},{y}^BQ{},{},{}\n^FD{}M,B{:04}{data}^FS\n^XZ",
            self.orientation.as_char(),
            self.model,
            self.magnification,
            self.ecc.as_char(),
            data.len(),
        );

        Ok(ZplSymbol {
            zpl,
            size: SymbolSize {
                symbol_width: ink_w,
                symbol_height: symbol_h,
                recommended_width: ink_w + 2 * qz,
                recommended_height: symbol_h + 2 * qz,
            },
            ink: InkMetrics {
                offset_x: self.ink_offset_x,
                offset_y: self.ink_offset_y + forced_top,
                width: ink_w,
                height: ink_w,
            },
            meta: SymbolMeta::Qr(QrMeta {
                version,
                modules,
                magnification: self.magnification,
                ecc: self.ecc,
                mode,
                orientation: self.orientation,
                quiet_zone_modules: self.quiet_zone_modules,
                quiet_zone_dots: qz,
                forced_top_dots: forced_top,
            }),
        })
    }
}

fn ec_level(ecc: EccLevel) -> EcLevel {
    match ecc {
        EccLevel::L => EcLevel::L,
        EccLevel::M => EcLevel::M,
        EccLevel::Q => EcLevel::Q,
        EccLevel::H => EcLevel::H,
    }
}

/// Module matrix for image rendering.
///
/// Auto input lets the encoder segment the UTF-8 bytes freely; manual input
/// forces a single segment in `character_mode`.
pub fn qr_matrix(
    data: &str,
    ecc: EccLevel,
    input_mode: InputMode,
    character_mode: Option<CharacterMode>,
) -> Result<ModuleMatrix, CompilationError> {
    let level = ec_level(ecc);
    let code = match (input_mode, character_mode) {
        (InputMode::Auto, _) => QrCode::with_error_correction_level(data.as_bytes(), level)
            .map_err(|e| CompilationError::Symbol(format!("failed to build QR image: {e}")))?,
        (InputMode::Manual, None) => {
            return Err(CompilationError::Unsupported {
                field: "QR character_mode".into(),
                value: "none (required when input_mode is \"M\")".into(),
            });
        }
        (InputMode::Manual, Some(mode)) => manual_segment(data, ecc, mode)?,
    };

    let width = code.width();
    let mut matrix = ModuleMatrix::new(width, width);
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            matrix.set_dark(i % width, i / width);
        }
    }
    Ok(matrix)
}

/// Encode `data` as one numeric or alphanumeric segment in the smallest version.
fn manual_segment(data: &str, ecc: EccLevel, mode: CharacterMode) -> Result<QrCode, CompilationError> {
    let bytes = data.as_bytes();
    let level = ec_level(ecc);
    let valid = match mode {
        CharacterMode::Numeric => bytes.iter().all(u8::is_ascii_digit),
        CharacterMode::Alphanumeric => bytes.iter().all(|b| ALPHANUMERIC.contains(b)),
    };
    if !valid {
        return Err(CompilationError::Symbol(format!(
            "QR data is not valid for character_mode {}",
            mode.as_char()
        )));
    }
    for version in 1..=40i16 {
        let mut bits = Bits::new(Version::Normal(version));
        let pushed = match mode {
            CharacterMode::Numeric => bits.push_numeric_data(bytes),
            CharacterMode::Alphanumeric => bits.push_alphanumeric_data(bytes),
        };
        if pushed.is_err() || bits.push_terminator(level).is_err() {
            continue;
        }
        if let Ok(code) = QrCode::with_bits(bits, level) {
            return Ok(code);
        }
    }
    Err(CompilationError::DataTooLarge {
        len: bytes.len(),
        ecc: ecc.as_char(),
        mode: match mode {
            CharacterMode::Numeric => "numeric",
            CharacterMode::Alphanumeric => "alphanumeric",
        },
    })
}
