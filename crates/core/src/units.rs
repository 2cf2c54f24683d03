//! Millimeter ↔ device-dot conversion.
//!
//! Every pixel coordinate the compiler emits flows through [`mm_to_dots`],
//! so its rounding rule (round half up) has to match the renderer used to
//! calibrate placement.

use crate::error::UnitsError;

const MM_PER_INCH: f64 = 25.4;

/// Convert millimeters to device dots at `dpi`, rounding half up.
///
/// Returns an error for negative or non-finite `mm` and for a zero `dpi`.
pub fn mm_to_dots(mm: f64, dpi: u32) -> Result<u32, UnitsError> {
    if !mm.is_finite() || mm < 0.0 {
        return Err(UnitsError::NegativeLength(mm));
    }
    if dpi == 0 {
        return Err(UnitsError::ZeroDpi);
    }
    let value = (mm / MM_PER_INCH) * f64::from(dpi);
    Ok((value + 0.5).floor() as u32)
}

/// [`mm_to_dots`] as a signed coordinate, saturating at `i32::MAX`.
pub(crate) fn dots(mm: f64, dpi: u32) -> Result<i32, UnitsError> {
    Ok(i32::try_from(mm_to_dots(mm, dpi)?).unwrap_or(i32::MAX))
}

/// Convert device dots back to millimeters (exact scale, no rounding).
pub fn dots_to_mm(dots: u32, dpi: u32) -> Result<f64, UnitsError> {
    if dpi == 0 {
        return Err(UnitsError::ZeroDpi);
    }
    Ok(f64::from(dots) / f64::from(dpi) * MM_PER_INCH)
}

/// Clamp `value` into `[lo, hi]`.
pub fn clamp_int(value: i64, lo: i64, hi: i64) -> i64 {
    value.min(hi).max(lo)
}
