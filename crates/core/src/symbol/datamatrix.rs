//! DataMatrix (ECC200) sizing and `^BX` programs.

use datamatrix::{DataMatrix, SymbolList};

use super::{ModuleMatrix, SymbolMeta, SymbolSize, ZplSymbol};
use crate::error::CompilationError;
use crate::hex_escape::encode_field_data;
use crate::measure::InkMetrics;

/// Details recorded by [`DataMatrixZplBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataMatrixMeta {
    /// Symbol columns.
    pub columns: u32,
    /// Symbol rows.
    pub rows: u32,
    /// Dots per module.
    pub module_size: i32,
    /// Always 200.
    pub quality: u32,
    /// `^BX` format id.
    pub format_id: u32,
    /// `^FH` indicator.
    pub escape_char: char,
    /// Recommended quiet zone in modules.
    pub quiet_zone_modules: u32,
    /// Recommended quiet zone in dots.
    pub quiet_zone_dots: i32,
}

/// Builds `^BX` programs for an explicit symbol size.
///
/// No capacity search happens here: the caller picks `columns` x `rows`
/// and the printer rejects data that does not fit.
#[derive(Debug, Clone)]
pub struct DataMatrixZplBuilder {
    module_size: i32,
    columns: u32,
    rows: u32,
    format_id: u32,
    escape_char: char,
    quiet_zone_modules: u32,
    ink_offset_x: i32,
    ink_offset_y: i32,
}

impl DataMatrixZplBuilder {
    /// ECC200 builder with format 6, `_` escapes, and a 1-module quiet zone.
    pub fn new(module_size: i32, columns: u32, rows: u32) -> Result<Self, CompilationError> {
        if module_size <= 0 {
            return Err(CompilationError::Symbol("module_size must be > 0".into()));
        }
        if columns == 0 || rows == 0 {
            return Err(CompilationError::Symbol("columns/rows must be > 0".into()));
        }
        Ok(Self {
            module_size,
            columns,
            rows,
            format_id: 6,
            escape_char: '_',
            quiet_zone_modules: 1,
            ink_offset_x: 0,
            ink_offset_y: 0,
        })
    }

    /// Error-correction quality; only 200 is supported.
    pub fn quality(self, quality: u32) -> Result<Self, CompilationError> {
        if quality != 200 {
            return Err(CompilationError::Unsupported {
                field: "DataMatrix quality".into(),
                value: format!("{quality} (only 200/ECC200 is supported)"),
            });
        }
        Ok(self)
    }

    /// `^BX` format id (0-6).
    pub fn format_id(mut self, format_id: u32) -> Result<Self, CompilationError> {
        if format_id > 6 {
            return Err(CompilationError::Symbol(format!("format_id must be in [0..6] (got {format_id})")));
        }
        self.format_id = format_id;
        Ok(self)
    }

    /// `^FH` indicator used in the payload.
    #[must_use]
    pub fn escape_char(mut self, escape_char: char) -> Self {
        self.escape_char = escape_char;
        self
    }

    /// Recommended quiet zone, in modules.
    #[must_use]
    pub fn quiet_zone_modules(mut self, modules: u32) -> Self {
        self.quiet_zone_modules = modules;
        self
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

    /// Size the symbol and emit a program at `(x, y)`.
    ///
    /// Fails when `data` contains the escape character.
    pub fn build(&self, data: &str, x: i32, y: i32) -> Result<ZplSymbol, CompilationError> {
        check_escape_collision(data, self.escape_char)?;

        let cols = i32::try_from(self.columns).unwrap_or(i32::MAX);
        let rows = i32::try_from(self.rows).unwrap_or(i32::MAX);
        let ink_w = cols.saturating_mul(self.module_size);
        let ink_h = rows.saturating_mul(self.module_size);
        let qz = i32::try_from(self.quiet_zone_modules)
            .unwrap_or(i32::MAX)
            .saturating_mul(self.module_size);

        let field = encode_field_data(data, self.escape_char);
        let fh = if field.needs_hex {
            format!("^FH{}", self.escape_char)
        } else {
            String::new()
        };
        let zpl = format!(
            "^XA\n^FO{x},{y}^BXN,{},200,{},{},{},{}\n{fh}^FD{}^FS\n^XZ",
            self.module_size, self.columns, self.rows, self.format_id, self.escape_char, field.data,
        );

        Ok(ZplSymbol {
            zpl,
            size: SymbolSize {
                symbol_width: ink_w,
                symbol_height: ink_h,
                recommended_width: ink_w.saturating_add(2 * qz),
                recommended_height: ink_h.saturating_add(2 * qz),
            },
            ink: InkMetrics {
                offset_x: self.ink_offset_x,
                offset_y: self.ink_offset_y,
                width: ink_w,
                height: ink_h,
            },
            meta: SymbolMeta::DataMatrix(DataMatrixMeta {
                columns: self.columns,
                rows: self.rows,
                module_size: self.module_size,
                quality: 200,
                format_id: self.format_id,
                escape_char: self.escape_char,
                quiet_zone_modules: self.quiet_zone_modules,
                quiet_zone_dots: qz,
            }),
        })
    }
}

/// Reject payloads containing their own `^FH` indicator.
pub(crate) fn check_escape_collision(data: &str, escape_char: char) -> Result<(), CompilationError> {
    if data.contains(escape_char) {
        return Err(CompilationError::EscapeCollision(escape_char));
    }
    Ok(())
}

/// Module matrix for image rendering (UTF-8 bytes, smallest fitting symbol).
pub fn datamatrix_matrix(data: &str) -> Result<ModuleMatrix, CompilationError> {
    let code = DataMatrix::encode(data.as_bytes(), SymbolList::default())
        .map_err(|e| CompilationError::Symbol(format!("failed to build DataMatrix image: {e:?}")))?;
    let bitmap = code.bitmap();
    let mut matrix = ModuleMatrix::new(bitmap.width(), bitmap.height());
    for (x, y) in bitmap.pixels() {
        matrix.set_dark(x, y);
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprint_is_columns_by_rows() {
        let sym = DataMatrixZplBuilder::new(4, 12, 10).unwrap().build("ABC", 5, 6).unwrap();
        assert_eq!(sym.kind(), "datamatrix");
        assert_eq!(sym.size.symbol_width, 48);
        assert_eq!(sym.size.symbol_height, 40);
        assert_eq!(sym.size.recommended_width, 56);
        assert_eq!(sym.ink.offset_y, 0);
        assert_eq!(sym.zpl, "^XA\n^FO5,6^BXN,4,200,12,10,6,_\n^FDABC^FS\n^XZ");
    }

    #[test]
    fn escape_collision_is_rejected() {
        let b = DataMatrixZplBuilder::new(4, 12, 10).unwrap();
        let err = b.build("A_B", 0, 0).unwrap_err();
        assert!(matches!(err, CompilationError::EscapeCollision('_')));
        let sym = b.escape_char('#').build("A_B", 0, 0).unwrap();
        assert!(sym.zpl.contains("^FDA_B^FS"));
    }

    #[test]
    fn non_printable_payload_gets_field_hex() {
        let sym = DataMatrixZplBuilder::new(2, 10, 10).unwrap().build("a^b", 0, 0).unwrap();
        assert!(sym.zpl.contains("^FH_^FDa_5Eb^FS"));
    }

    #[test]
    fn only_ecc200() {
        let b = DataMatrixZplBuilder::new(4, 12, 10).unwrap();
        assert!(b.clone().quality(200).is_ok());
        let err = b.quality(140).unwrap_err();
        assert!(err.to_string().starts_with("unsupported DataMatrix quality: 140"));
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(DataMatrixZplBuilder::new(0, 12, 10).is_err());
        assert!(DataMatrixZplBuilder::new(2, 0, 10).is_err());
        assert!(DataMatrixZplBuilder::new(2, 10, 10).unwrap().format_id(7).is_err());
    }

    #[test]
    fn matrix_has_l_finder() {
        let m = datamatrix_matrix("HELLO").unwrap();
        assert!(m.width() >= 10 && m.height() >= 8);
        // solid L finder along the left edge and the bottom row
        assert!((0..m.height()).all(|y| m.is_dark(0, y)));
        assert!((0..m.width()).all(|x| m.is_dark(x, m.height() - 1)));
    }
}
