//! zplgrid core library.
//!
//! Compiles declarative JSON label templates (split/leaf layouts holding
//! text, QR, DataMatrix, line, and image elements) into ZPL II sized for a
//! physical label. The main entry points are [`load_template`] for parsing
//! and validation, [`Compiler::compile`] for emission, and [`compile_zpl`]
//! for both in one call.

#![warn(missing_docs)]

/// Template → ZPL compilation.
pub mod compiler;
/// Environment-driven settings.
pub mod config;
/// Error types for every stage.
pub mod error;
/// Hex escape processing for `^FH` field data.
pub mod hex_escape;
/// Split/leaf layout solver.
pub mod layout;
/// Macro variables (dates, ids, counters).
pub mod macros;
/// Text measurement.
pub mod measure;
/// Typed template model.
pub mod model;
/// Template loading.
pub mod parse;
/// Image decoding and 1-bit conversion.
pub mod raster;
/// `{name}` placeholder rendering.
pub mod render;
/// QR and DataMatrix builders.
pub mod symbol;
/// Millimeter/dot conversion.
pub mod units;
/// Template validation.
pub mod validate;
/// ZPL command builder.
pub mod zpl;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

// Compilation
pub use compiler::{Compiler, compile_zpl, compile_zpl_value};
pub use config::{CompilerConfig, ImageFetchConfig, MeasurerConfig};

// Errors
pub use error::{
    CompilationError, LayoutError, MeasureError, TemplateIssue, TemplateRenderError,
    TemplateValidationError, UnitsError, ZplGridError,
};

// Model
pub use model::{Element, LabelTarget, Node, Rect, Template};

// Loading and validation
pub use parse::{load_template, load_template_value};
pub use validate::validate_template_value;

// Layout
pub use layout::{LayoutResult, compute_layout};

// Rendering and macros
pub use macros::{CounterStore, MacroContext, build_macro_variables, collect_template_placeholders};
pub use render::{RenderOptions, Variables, assert_variables_present, render_text};

// Measurement
pub use measure::{
    FontDots, MonospaceApproxMeasurer, OracleTextMeasurer, RenderOracle, RenderRequest, TextMeasurer,
    TextMetrics,
};

// Units
pub use units::{dots_to_mm, mm_to_dots};
