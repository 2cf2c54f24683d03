//! QR and DataMatrix elements, as native barcode commands or as rasters.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use super::{LabelWriter, align_in_rect};
use crate::error::{CompilationError, ZplGridError};
use crate::hex_escape::encode_field_data;
use crate::model::{
    AlignH, AlignV, DataMatrixElement, Dither, InputMode, QrElement, Rect, RenderMode, SizeMode,
};
use crate::raster::{draw_module, image_to_gfa};
use crate::render::render_text;
use crate::symbol::{
    DataMatrixZplBuilder, ModuleMatrix, QrCodeZplBuilder, check_escape_collision, datamatrix_matrix,
    default_qr_magnification, qr_matrix,
};
use crate::units::clamp_int;
use crate::zpl::DataMatrixParams;

const QR_MODEL: u32 = 2;
const DEFAULT_MODULE_SIZE_MM: f64 = 0.5;
/// Finder patterns are 7x7 modules in three corners.
const FINDER_MODULES: usize = 7;
const MIN_FINDER_SYMBOL: usize = 21;

impl LabelWriter<'_> {
    pub(super) fn qr(&mut self, el: &QrElement, rect: Rect) -> Result<(), ZplGridError> {
        if el.render_mode.unwrap_or_default() == RenderMode::Image {
            return self.qr_image(el, rect);
        }
        let data = render_text(&el.data, self.variables, self.render)?;
        let inner = self.quiet_zone_inset(el.quiet_zone_mm, &el.base, rect)?;
        let ecc = el.error_correction;
        let character_mode = manual_character_mode(el)?;

        let mut mag = el
            .magnification
            .unwrap_or_else(|| default_qr_magnification(self.dpi));
        if el.size_mode.unwrap_or_default() == SizeMode::Max {
            let probe = QrCodeZplBuilder::new(1)?.ecc(ecc).build(&data, 0, 0)?;
            let unit = probe.size.symbol_width.max(probe.size.symbol_height).max(1);
            let inner_size = inner.w.min(inner.h).max(1);
            mag = u32::try_from(clamp_int(i64::from(inner_size / unit), 1, 10)).unwrap_or(1);
        }

        let symbol = QrCodeZplBuilder::new(mag)?.ecc(ecc).build(&data, 0, 0)?;
        let (w, h) = (symbol.size.symbol_width.max(1), symbol.size.symbol_height.max(1));
        tracing::debug!(mag, w, h, "sized QR symbol");
        let (x, y) = align_in_rect(inner, w, h, qr_align_h(el), qr_align_v(el));

        let fd = match character_mode {
            None => format!("{}A,{data}", ecc.as_char()),
            Some(cm) => format!("{}M,{}{data}", ecc.as_char(), cm.as_char()),
        };
        let field = encode_field_data(&fd, '_');
        self.zpl.field_origin(x.max(0), y.max(0));
        self.zpl.qr_code(QR_MODEL, mag);
        if field.needs_hex {
            self.zpl.field_hex('_');
        }
        self.zpl.field_data(&field.data);
        self.zpl.field_separator();
        Ok(())
    }

    fn qr_image(&mut self, el: &QrElement, rect: Rect) -> Result<(), ZplGridError> {
        let data = render_text(&el.data, self.variables, self.render)?;
        let inner = self.quiet_zone_inset(el.quiet_zone_mm, &el.base, rect)?;
        let character_mode = manual_character_mode(el)?;

        let matrix = qr_matrix(&data, el.error_correction, el.input_mode, character_mode)?;
        let modules = matrix.width();
        if modules == 0 {
            return Err(CompilationError::Symbol("QR matrix is empty".into()).into());
        }
        let modules_u32 = u32::try_from(modules).unwrap_or(u32::MAX);

        let mut mag = el
            .magnification
            .unwrap_or_else(|| default_qr_magnification(self.dpi));
        if el.size_mode.unwrap_or_default() == SizeMode::Max {
            let inner_size = inner.w.min(inner.h).max(1).unsigned_abs();
            mag = (inner_size / modules_u32).max(1);
        }
        let size = modules_u32.saturating_mul(mag).max(1);

        let (module_shape, finder_shape) = el.theme.shapes();
        let mut canvas = GrayImage::from_pixel(size, size, Luma([u8::MAX]));
        for row in 0..modules {
            for col in 0..modules {
                if !matrix.is_dark(col, row) {
                    continue;
                }
                let shape = if is_finder_module(row, col, modules) {
                    finder_shape
                } else {
                    module_shape
                };
                let (x0, y0) = (as_u32(col) * mag, as_u32(row) * mag);
                draw_module(&mut canvas, x0, y0, mag, shape);
            }
        }

        let side = i32::try_from(size).unwrap_or(i32::MAX);
        let (x, y) = align_in_rect(inner, side, side, qr_align_h(el), qr_align_v(el));
        self.raster(&canvas, x, y);
        Ok(())
    }

    pub(super) fn datamatrix(&mut self, el: &DataMatrixElement, rect: Rect) -> Result<(), ZplGridError> {
        if el.render_mode.unwrap_or_default() == RenderMode::Image {
            return self.datamatrix_image(el, rect);
        }
        let data = render_text(&el.data, self.variables, self.render)?;
        let inner = self.quiet_zone_inset(el.quiet_zone_mm, &el.base, rect)?;

        if el.quality != 200 {
            return Err(CompilationError::Unsupported {
                field: "DataMatrix quality".into(),
                value: format!("{} (only 200/ECC200 is supported)", el.quality),
            }
            .into());
        }
        let (columns, rows) = (el.columns, el.rows);
        let explicit_dims = columns > 0 && rows > 0;

        let module = match el.size_mode.unwrap_or_default() {
            SizeMode::Max => {
                if !explicit_dims {
                    return Err(CompilationError::Symbol(
                        "DataMatrix size_mode \"max\" requires explicit columns and rows".into(),
                    )
                    .into());
                }
                let per_col = inner.w / i32::try_from(columns).unwrap_or(i32::MAX);
                let per_row = inner.h / i32::try_from(rows).unwrap_or(i32::MAX);
                per_col.min(per_row).max(1)
            }
            SizeMode::Fixed => self
                .dots(el.module_size_mm.unwrap_or(DEFAULT_MODULE_SIZE_MM))?
                .max(1),
        };

        check_escape_collision(&data, el.escape_char)?;

        let (w, h) = if explicit_dims {
            let symbol = DataMatrixZplBuilder::new(module, columns, rows)?
                .format_id(el.format_id)?
                .escape_char(el.escape_char)
                .build(&data, 0, 0)?;
            (symbol.size.symbol_width.max(1), symbol.size.symbol_height.max(1))
        } else {
            let side = inner.w.min(inner.h).max(1);
            (side, side)
        };
        tracing::debug!(module, columns, rows, w, h, "sized DataMatrix symbol");
        let (x, y) = align_in_rect(
            inner,
            w,
            h,
            el.align_h.unwrap_or(AlignH::Center),
            el.align_v.unwrap_or(AlignV::Center),
        );

        let field = encode_field_data(&data, el.escape_char);
        self.zpl.field_origin(x, y);
        self.zpl.datamatrix(DataMatrixParams {
            module_size: module,
            quality: el.quality,
            columns,
            rows,
            format_id: el.format_id,
            escape_char: el.escape_char,
        });
        if field.needs_hex {
            self.zpl.field_hex(el.escape_char);
        }
        self.zpl.field_data(&field.data);
        self.zpl.field_separator();
        Ok(())
    }

    fn datamatrix_image(&mut self, el: &DataMatrixElement, rect: Rect) -> Result<(), ZplGridError> {
        let data = render_text(&el.data, self.variables, self.render)?;
        let inner = self.quiet_zone_inset(el.quiet_zone_mm, &el.base, rect)?;

        let matrix = datamatrix_matrix(&data)?;
        let (w, h) = (as_u32(matrix.width()), as_u32(matrix.height()));
        if w == 0 || h == 0 {
            return Err(CompilationError::Symbol("DataMatrix image is empty".into()).into());
        }

        let (tw, th) = match el.size_mode.unwrap_or_default() {
            SizeMode::Max => {
                let scale = (f64::from(inner.w) / f64::from(w)).min(f64::from(inner.h) / f64::from(h));
                let dim = |n: u32| ((f64::from(n) * scale).round_ties_even() as u32).max(1);
                (dim(w), dim(h))
            }
            SizeMode::Fixed => {
                let module = self
                    .dots(el.module_size_mm.unwrap_or(DEFAULT_MODULE_SIZE_MM))?
                    .max(1)
                    .unsigned_abs();
                (w * module, h * module)
            }
        };

        let mut img = module_image(&matrix);
        if (tw, th) != (w, h) {
            img = imageops::resize(&img, tw, th, FilterType::Nearest);
        }

        let (x, y) = align_in_rect(
            inner,
            i32::try_from(tw).unwrap_or(i32::MAX),
            i32::try_from(th).unwrap_or(i32::MAX),
            el.align_h.unwrap_or(AlignH::Center),
            el.align_v.unwrap_or(AlignV::Center),
        );
        self.raster(&img, x, y);
        Ok(())
    }

    /// `^GFA` field for a rendered symbol (plain threshold, no dither).
    fn raster(&mut self, img: &GrayImage, x: i32, y: i32) {
        let gfa = image_to_gfa(img, 128, Dither::None, false);
        self.zpl.field_origin(x, y);
        self.zpl.graphic_field(gfa.total_bytes, gfa.bytes_per_row, &gfa.data);
        self.zpl.field_separator();
    }
}

/// Character mode for manual input; `None` for automatic input.
fn manual_character_mode(el: &QrElement) -> Result<Option<crate::model::CharacterMode>, CompilationError> {
    match (el.input_mode, el.character_mode) {
        (InputMode::Auto, _) => Ok(None),
        (InputMode::Manual, Some(cm)) => Ok(Some(cm)),
        (InputMode::Manual, None) => Err(CompilationError::Unsupported {
            field: "QR input_mode".into(),
            value: "\"M\" requires character_mode".into(),
        }),
    }
}

fn qr_align_h(el: &QrElement) -> AlignH {
    el.align_h.unwrap_or(AlignH::Center)
}

fn qr_align_v(el: &QrElement) -> AlignV {
    el.align_v.unwrap_or(AlignV::Center)
}

fn is_finder_module(row: usize, col: usize, modules: usize) -> bool {
    if modules < MIN_FINDER_SYMBOL {
        return false;
    }
    let far = modules - FINDER_MODULES;
    (row < FINDER_MODULES && col < FINDER_MODULES)
        || (row < FINDER_MODULES && col >= far)
        || (row >= far && col < FINDER_MODULES)
}

/// One pixel per module, dark on white.
fn module_image(matrix: &ModuleMatrix) -> GrayImage {
    GrayImage::from_fn(as_u32(matrix.width()), as_u32(matrix.height()), |x, y| {
        if matrix.is_dark(x as usize, y as usize) {
            Luma([0])
        } else {
            Luma([u8::MAX])
        }
    })
}

fn as_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
