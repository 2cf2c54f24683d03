//! Error taxonomy for template compilation.
//!
//! Four caller-facing families: validation (every schema/semantic problem,
//! collected), render (placeholder substitution), layout (unsatisfiable
//! geometry), and compilation (everything element-specific). None of them
//! is retried internally and none yields partial output.

use std::fmt;

/// A single validation problem at a JSON-pointer-like path (`$.layout.children[0]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateIssue {
    /// Location of the offending value.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl TemplateIssue {
    /// Create an issue at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The template JSON failed schema or semantic validation.
///
/// Issues are kept in discovery order so callers can report all of them in
/// one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateValidationError {
    /// Every problem found, in document order.
    pub issues: Vec<TemplateIssue>,
}

impl fmt::Display for TemplateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "Template validation failed");
        }
        write!(f, "Template validation failed:")?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TemplateValidationError {}

/// Placeholder substitution failed.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateRenderError {
    /// A `{name}` placeholder had no matching variable.
    #[error("missing template variable: '{0}'")]
    MissingVariable(String),

    /// The placeholder string itself is malformed or cannot be formatted.
    #[error("failed to render text: {0}")]
    Format(String),
}

/// The layout tree cannot be realized in the available space.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// A split's gutter is wider than its own extent.
    #[error("gutter too large at {node_id}")]
    GutterTooLarge {
        /// Path id of the split node.
        node_id: String,
    },

    /// A rect with negative extent reached a split.
    #[error("negative rect at {node_id}")]
    NegativeRect {
        /// Path id of the node.
        node_id: String,
    },

    /// A millimeter value could not be converted.
    #[error("invalid length at {node_id}: {source}")]
    Units {
        /// Path id of the node.
        node_id: String,
        /// Underlying conversion error.
        #[source]
        source: UnitsError,
    },
}

/// Element-level compilation failure.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CompilationError {
    /// An enum value or option combination the compiler cannot handle.
    #[error("unsupported {field}: {value}")]
    Unsupported {
        /// Offending field (e.g. `"DataMatrix quality"`).
        field: String,
        /// The value as written.
        value: String,
    },

    /// The element's content box is smaller than its `min_size_mm`.
    #[error(
        "element {element} does not meet min_size_mm: need {need_w}x{need_h} dots, got {got_w}x{got_h}"
    )]
    MinSizeNotMet {
        /// Element type name.
        element: &'static str,
        /// Required width in dots.
        need_w: u32,
        /// Required height in dots.
        need_h: u32,
        /// Available width in dots.
        got_w: u32,
        /// Available height in dots.
        got_h: u32,
    },

    /// QR payload does not fit any version at the requested ECC level.
    #[error("data too large for QR (len={len}, ecc={ecc}, mode={mode})")]
    DataTooLarge {
        /// Payload length in characters/bytes.
        len: usize,
        /// ECC level letter.
        ecc: char,
        /// Detected encoding mode.
        mode: &'static str,
    },

    /// DataMatrix payload contains its own escape character.
    #[error("data contains escape_char '{0}'; choose a different escape_char")]
    EscapeCollision(char),

    /// Non-ASCII data on a path that only supports ASCII.
    #[error("{0} data contains non-ASCII characters")]
    NonAscii(&'static str),

    /// A symbol builder rejected its parameters.
    #[error("invalid symbol parameters: {0}")]
    Symbol(String),

    /// Image source could not be loaded.
    #[error("{0}")]
    ImageSource(String),

    /// Image bytes could not be decoded or processed.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// Text measurement failed.
    #[error("text measurement failed: {0}")]
    Measure(#[from] MeasureError),

    /// A millimeter value could not be converted.
    #[error("invalid length: {0}")]
    Units(#[from] UnitsError),
}

/// Text measurement failed (oracle transport or PNG decoding).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    /// The rendering oracle returned an error.
    #[error("render oracle failed: {0}")]
    Oracle(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The oracle's PNG could not be decoded.
    #[error("failed to decode oracle image: {0}")]
    Decode(#[from] image::ImageError),

    /// The text never fit on the largest label the oracle accepts.
    #[error("text did not fit into the rendered label ({width_in}x{height_in} in)")]
    DidNotFit {
        /// Final label width in inches.
        width_in: f64,
        /// Final label height in inches.
        height_in: f64,
    },

    /// Measurer parameters were invalid.
    #[error("invalid measurer configuration: {0}")]
    InvalidConfig(String),
}

/// Unit conversion input was out of range.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum UnitsError {
    /// Millimeter value was negative (or not finite).
    #[error("mm must be >= 0 (got {0})")]
    NegativeLength(f64),
    /// DPI must be positive.
    #[error("dpi must be > 0")]
    ZeroDpi,
}

/// Any failure from loading or compiling a template.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ZplGridError {
    /// Schema or semantic validation failed.
    #[error(transparent)]
    Validation(#[from] TemplateValidationError),

    /// Placeholder substitution failed.
    #[error(transparent)]
    Render(#[from] TemplateRenderError),

    /// Layout geometry is unsatisfiable.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// An element could not be compiled.
    #[error(transparent)]
    Compilation(#[from] CompilationError),
}

impl From<MeasureError> for ZplGridError {
    fn from(e: MeasureError) -> Self {
        ZplGridError::Compilation(CompilationError::Measure(e))
    }
}

impl From<UnitsError> for ZplGridError {
    fn from(e: UnitsError) -> Self {
        ZplGridError::Compilation(CompilationError::Units(e))
    }
}
