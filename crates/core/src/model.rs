//! Typed template model.
//!
//! Values here are produced once per compile by [`crate::parse`] and never
//! mutated afterwards. Enum-valued fields are closed Rust enums, so the
//! compiler matches exhaustively instead of checking strings at emit time.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Open string-keyed bag carried by elements, nodes, and templates.
pub type Extensions = Map<String, Value>;

/// Physical label the template is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LabelTarget {
    /// Label width in millimeters.
    pub width_mm: f64,
    /// Label height in millimeters.
    pub height_mm: f64,
    /// Printer resolution in dots per inch.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Label home X offset in millimeters (`^LH`).
    #[serde(default)]
    pub origin_x_mm: f64,
    /// Label home Y offset in millimeters (`^LH`).
    #[serde(default)]
    pub origin_y_mm: f64,
}

fn default_dpi() -> u32 {
    203
}

impl LabelTarget {
    /// A target with no origin offset.
    pub fn new(width_mm: f64, height_mm: f64, dpi: u32) -> Self {
        Self {
            width_mm,
            height_mm,
            dpi,
            origin_x_mm: 0.0,
            origin_y_mm: 0.0,
        }
    }
}

/// Padding in millimeters, written in JSON as `[top, right, bottom, left]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f64; 4]")]
pub struct PaddingMm {
    /// Top inset.
    pub top: f64,
    /// Right inset.
    pub right: f64,
    /// Bottom inset.
    pub bottom: f64,
    /// Left inset.
    pub left: f64,
}

impl PaddingMm {
    /// Same inset on every side.
    pub fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

impl From<[f64; 4]> for PaddingMm {
    fn from([top, right, bottom, left]: [f64; 4]) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Axis-aligned rectangle in device dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width, never negative once produced by [`Rect::inset`].
    pub w: i32,
    /// Height, never negative once produced by [`Rect::inset`].
    pub h: i32,
}

impl Rect {
    /// Construct a rect.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Shrink by the given insets; extents floor at zero.
    pub fn inset(&self, left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect {
            x: self.x + left,
            y: self.y + top,
            w: (self.w - left - right).max(0),
            h: (self.h - top - bottom).max(0),
        }
    }

    /// Shrink by `d` on every side.
    pub fn inset_uniform(&self, d: i32) -> Rect {
        self.inset(d, d, d, d)
    }
}

// ── Shared enums ────────────────────────────────────────────────────────

/// Horizontal alignment inside a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignH {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Vertical alignment inside a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignV {
    /// Flush top.
    Top,
    /// Centered.
    #[default]
    Center,
    /// Flush bottom.
    Bottom,
}

/// Whether a 2D code uses its declared size or grows to fill its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// Use the declared magnification / module size.
    #[default]
    Fixed,
    /// Largest size that fits the quiet-zone-inset box.
    Max,
}

/// How a 2D code is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Native printer barcode command.
    #[default]
    Zpl,
    /// Pre-rasterized graphic field.
    Image,
}

// ── Text ────────────────────────────────────────────────────────────────

/// Line-wrapping strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wrap {
    /// Keep explicit lines only.
    None,
    /// Break between words.
    #[default]
    Word,
    /// Break anywhere, hyphenating between letters.
    Char,
}

/// What to do when text does not fit its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFit {
    /// Let text run past the box.
    Overflow,
    /// Wrap into as many lines as `max_lines` allows.
    Wrap,
    /// Wrap, then drop lines past `max_lines`.
    Truncate,
    /// Reduce the font until the block fits.
    ShrinkToFit,
}

/// A text block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextElement {
    /// Common element properties.
    #[serde(flatten)]
    pub base: ElementBase,
    /// Content; may contain `{name}` placeholders.
    pub text: String,
    /// Font cell height.
    #[serde(default)]
    pub font_height_mm: Option<f64>,
    /// Font cell width; defaults to the height.
    #[serde(default)]
    pub font_width_mm: Option<f64>,
    /// Wrap mode; `word` when unset.
    #[serde(default)]
    pub wrap: Option<Wrap>,
    /// Fit policy; derived from `wrap` when unset.
    #[serde(default)]
    pub fit: Option<TextFit>,
    /// Line cap; unbounded when unset.
    #[serde(default)]
    pub max_lines: Option<u32>,
    /// Horizontal justification.
    #[serde(default)]
    pub align_h: Option<AlignH>,
    /// Vertical placement of the whole block.
    #[serde(default)]
    pub align_v: Option<AlignV>,
}

// ── QR ──────────────────────────────────────────────────────────────────

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum EccLevel {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

impl EccLevel {
    /// The ZPL letter for this level.
    pub fn as_char(self) -> char {
        match self {
            EccLevel::L => 'L',
            EccLevel::M => 'M',
            EccLevel::Q => 'Q',
            EccLevel::H => 'H',
        }
    }
}

/// QR input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum InputMode {
    /// Printer picks the encoding.
    #[default]
    #[serde(rename = "A")]
    Auto,
    /// Encoding given by `character_mode`.
    #[serde(rename = "M")]
    Manual,
}

/// QR character mode for manual input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CharacterMode {
    /// Digits only.
    #[serde(rename = "N")]
    Numeric,
    /// `0-9A-Z $%*+-./:`.
    #[serde(rename = "A")]
    Alphanumeric,
}

impl CharacterMode {
    /// The ZPL letter for this mode.
    pub fn as_char(self) -> char {
        match self {
            CharacterMode::Numeric => 'N',
            CharacterMode::Alphanumeric => 'A',
        }
    }
}

/// Module shape for image-mode QR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleShape {
    /// Filled square.
    Square,
    /// Filled ellipse inscribed in the module.
    Circle,
    /// Square with rounded corners.
    Rounded,
}

/// Named theme preset for image-mode QR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreset {
    /// Square modules, square finders.
    Classic,
    /// Circle modules, square finders.
    Dots,
    /// Rounded modules and finders.
    Rounded,
}

/// Shape overrides for image-mode QR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct QrTheme {
    /// Base preset.
    #[serde(default)]
    pub preset: Option<ThemePreset>,
    /// Overrides the preset's data-module shape.
    #[serde(default)]
    pub module_shape: Option<ModuleShape>,
    /// Overrides the preset's finder-pattern shape.
    #[serde(default)]
    pub finder_shape: Option<ModuleShape>,
}

impl QrTheme {
    /// Resolve `(module_shape, finder_shape)`.
    pub fn shapes(&self) -> (ModuleShape, ModuleShape) {
        let (module, finder) = match self.preset {
            Some(ThemePreset::Dots) => (ModuleShape::Circle, ModuleShape::Square),
            Some(ThemePreset::Rounded) => (ModuleShape::Rounded, ModuleShape::Rounded),
            Some(ThemePreset::Classic) | None => (ModuleShape::Square, ModuleShape::Square),
        };
        (
            self.module_shape.unwrap_or(module),
            self.finder_shape.unwrap_or(finder),
        )
    }
}

/// A QR code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QrElement {
    /// Common element properties.
    #[serde(flatten)]
    pub base: ElementBase,
    /// Payload; may contain placeholders.
    pub data: String,
    /// Module size in dots (1-10).
    #[serde(default)]
    pub magnification: Option<u32>,
    /// Fixed or max sizing.
    #[serde(default)]
    pub size_mode: Option<SizeMode>,
    /// Horizontal placement.
    #[serde(default)]
    pub align_h: Option<AlignH>,
    /// Vertical placement.
    #[serde(default)]
    pub align_v: Option<AlignV>,
    /// ECC level.
    #[serde(default)]
    pub error_correction: EccLevel,
    /// Auto or manual input.
    #[serde(default)]
    pub input_mode: InputMode,
    /// Required for manual input.
    #[serde(default)]
    pub character_mode: Option<CharacterMode>,
    /// Inset applied around the symbol before placement.
    #[serde(default)]
    pub quiet_zone_mm: Option<f64>,
    /// Native or rasterized output.
    #[serde(default)]
    pub render_mode: Option<RenderMode>,
    /// Shapes for image rendering.
    #[serde(default)]
    pub theme: QrTheme,
}

// ── DataMatrix ──────────────────────────────────────────────────────────

/// A DataMatrix (ECC200) code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataMatrixElement {
    /// Common element properties.
    #[serde(flatten)]
    pub base: ElementBase,
    /// Payload; may contain placeholders.
    pub data: String,
    /// Module edge length; 0.5 mm when unset.
    #[serde(default)]
    pub module_size_mm: Option<f64>,
    /// Fixed or max sizing.
    #[serde(default)]
    pub size_mode: Option<SizeMode>,
    /// Horizontal placement.
    #[serde(default)]
    pub align_h: Option<AlignH>,
    /// Vertical placement.
    #[serde(default)]
    pub align_v: Option<AlignV>,
    /// Only 200 is accepted.
    #[serde(default = "default_quality")]
    pub quality: u32,
    /// Symbol columns; 0 lets the printer choose.
    #[serde(default)]
    pub columns: u32,
    /// Symbol rows; 0 lets the printer choose.
    #[serde(default)]
    pub rows: u32,
    /// `^BX` format id (0-6).
    #[serde(default = "default_format_id")]
    pub format_id: u32,
    /// Hex-escape character for `^FH`.
    #[serde(default = "default_escape_char")]
    pub escape_char: char,
    /// Inset applied around the symbol before placement.
    #[serde(default)]
    pub quiet_zone_mm: Option<f64>,
    /// Native or rasterized output.
    #[serde(default)]
    pub render_mode: Option<RenderMode>,
}

fn default_quality() -> u32 {
    200
}

fn default_format_id() -> u32 {
    6
}

fn default_escape_char() -> char {
    '_'
}

// ── Line ────────────────────────────────────────────────────────────────

/// Line direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Horizontal bar spanning the box width.
    #[default]
    H,
    /// Vertical bar spanning the box height.
    V,
}

/// Cross-axis placement of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAlign {
    /// Top / left edge.
    Start,
    /// Centered.
    #[default]
    Center,
    /// Bottom / right edge.
    End,
}

/// A straight rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineElement {
    /// Common element properties.
    #[serde(flatten)]
    pub base: ElementBase,
    /// Horizontal or vertical.
    #[serde(default)]
    pub orientation: Orientation,
    /// Stroke thickness.
    pub thickness_mm: f64,
    /// Cross-axis placement.
    #[serde(default)]
    pub align: LineAlign,
}

// ── Image ───────────────────────────────────────────────────────────────

/// Where image bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSourceKind {
    /// Inline base64, optionally as a `data:` URI.
    #[default]
    Base64,
    /// HTTP(S) URL, fetched only when enabled.
    Url,
}

/// Image payload reference.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ImageSource {
    /// Source kind.
    #[serde(default)]
    pub kind: ImageSourceKind,
    /// Base64 text or URL; may contain placeholders.
    #[serde(default)]
    pub data: String,
}

/// How an image is scaled into its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Native size (optionally rescaled from `input_dpi`).
    None,
    /// Fit inside the box, preserving aspect.
    #[default]
    Contain,
    /// Fill the box, preserving aspect, center-cropped.
    Cover,
    /// Force to box dimensions.
    Stretch,
}

/// 1-bit conversion method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dither {
    /// Flat threshold.
    #[default]
    None,
    /// Error diffusion.
    FloydSteinberg,
    /// Ordered 4x4 matrix.
    Bayer,
}

/// A raster image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageElement {
    /// Common element properties.
    #[serde(flatten)]
    pub base: ElementBase,
    /// Image payload.
    #[serde(default)]
    pub source: ImageSource,
    /// Scaling policy.
    #[serde(default)]
    pub fit: Option<ImageFit>,
    /// Horizontal placement.
    #[serde(default)]
    pub align_h: Option<AlignH>,
    /// Vertical placement.
    #[serde(default)]
    pub align_v: Option<AlignV>,
    /// Source resolution, used only with `fit = none`.
    #[serde(default)]
    pub input_dpi: Option<u32>,
    /// Luma cut-off (0-255).
    #[serde(default)]
    pub threshold: Option<u8>,
    /// 1-bit conversion method.
    #[serde(default)]
    pub dither: Option<Dither>,
    /// Swap black and white after thresholding.
    #[serde(default)]
    pub invert: Option<bool>,
}

// ── Element union ───────────────────────────────────────────────────────

/// Properties every element carries.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ElementBase {
    /// Optional caller id.
    #[serde(default)]
    pub id: Option<String>,
    /// Inset inside the leaf's content rect.
    #[serde(default)]
    pub padding_mm: PaddingMm,
    /// Minimum `(w, h)`; compilation fails when the box is smaller.
    #[serde(default)]
    pub min_size_mm: Option<(f64, f64)>,
    /// Maximum `(w, h)`; the box is shrunk and recentered.
    #[serde(default)]
    pub max_size_mm: Option<(f64, f64)>,
    /// Free-form extras (e.g. `font_height_mm`, `quiet_zone_mm` fallbacks).
    #[serde(default)]
    pub extensions: Extensions,
}

/// A leaf's renderable content.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// Text block.
    Text(TextElement),
    /// QR code.
    Qr(QrElement),
    /// DataMatrix code.
    #[serde(rename = "datamatrix")]
    DataMatrix(DataMatrixElement),
    /// Straight rule.
    Line(LineElement),
    /// Raster image.
    Image(ImageElement),
}

impl Element {
    /// Properties shared by every variant.
    pub fn base(&self) -> &ElementBase {
        match self {
            Element::Text(e) => &e.base,
            Element::Qr(e) => &e.base,
            Element::DataMatrix(e) => &e.base,
            Element::Line(e) => &e.base,
            Element::Image(e) => &e.base,
        }
    }

    /// The JSON `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Text(_) => "text",
            Element::Qr(_) => "qr",
            Element::DataMatrix(_) => "datamatrix",
            Element::Line(_) => "line",
            Element::Image(_) => "image",
        }
    }
}

// ── Layout nodes ────────────────────────────────────────────────────────

/// Split axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Vertical cut: children side by side (left, right).
    V,
    /// Horizontal cut: children stacked (top, bottom).
    H,
}

/// Rule drawn in a split's gutter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Divider {
    /// Whether the rule is drawn.
    #[serde(default)]
    pub visible: bool,
    /// Rule thickness.
    #[serde(default = "default_divider_thickness")]
    pub thickness_mm: f64,
}

fn default_divider_thickness() -> f64 {
    0.3
}

impl Default for Divider {
    fn default() -> Self {
        Self {
            visible: false,
            thickness_mm: default_divider_thickness(),
        }
    }
}

/// Two-way partition of a rect.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplitNode {
    /// Globally unique alias.
    #[serde(default)]
    pub alias: Option<String>,
    /// Split axis.
    pub direction: Direction,
    /// Share of the available length given to the first child, in (0, 1).
    pub ratio: f64,
    /// Band between the children.
    #[serde(default)]
    pub gutter_mm: f64,
    /// Optional rule centered in the gutter.
    #[serde(default)]
    pub divider: Divider,
    /// First (left/top) and second (right/bottom) child.
    pub children: Box<[Node; 2]>,
    /// Free-form extras.
    #[serde(default)]
    pub extensions: Extensions,
}

/// A rect holding one element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeafNode {
    /// Globally unique alias.
    #[serde(default)]
    pub alias: Option<String>,
    /// Content inset; the template default applies when unset.
    #[serde(default)]
    pub padding_mm: Option<PaddingMm>,
    /// Draw a 1-dot outline around this leaf.
    #[serde(default)]
    pub debug_border: bool,
    /// Exactly one element after validation.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Free-form extras.
    #[serde(default)]
    pub extensions: Extensions,
}

/// A layout tree node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// Partition.
    Split(SplitNode),
    /// Content holder.
    Leaf(LeafNode),
}

impl Node {
    /// The node's alias, if any.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Node::Split(s) => s.alias.as_deref(),
            Node::Leaf(l) => l.alias.as_deref(),
        }
    }
}

// ── Template ────────────────────────────────────────────────────────────

/// Policy for `{name}` placeholders with no matching variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingVariables {
    /// Fail the compile.
    #[default]
    Error,
    /// Substitute an empty string.
    Empty,
}

/// `defaults.render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RenderDefaults {
    /// Missing-variable policy.
    #[serde(default)]
    pub missing_variables: MissingVariables,
    /// Emit `^CI28` so field data is read as UTF-8.
    #[serde(default)]
    pub emit_ci28: bool,
    /// Outline every leaf content rect.
    #[serde(default)]
    pub debug_padding_guides: bool,
    /// Outline every gutter band.
    #[serde(default)]
    pub debug_gutter_guides: bool,
}

/// Template-wide defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateDefaults {
    /// Padding for leaves that do not set their own.
    #[serde(default = "default_leaf_padding")]
    pub leaf_padding_mm: PaddingMm,
    /// Merged under every text element.
    #[serde(default)]
    pub text: Extensions,
    /// Merged under every QR and DataMatrix element.
    #[serde(default)]
    pub code2d: Extensions,
    /// Merged under every image element.
    #[serde(default)]
    pub image: Extensions,
    /// Rendering switches.
    #[serde(default)]
    pub render: RenderDefaults,
}

fn default_leaf_padding() -> PaddingMm {
    PaddingMm::uniform(1.0)
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            leaf_padding_mm: default_leaf_padding(),
            text: Extensions::new(),
            code2d: Extensions::new(),
            image: Extensions::new(),
            render: RenderDefaults::default(),
        }
    }
}

/// A parsed, validated template.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Template {
    /// Template format version.
    pub schema_version: u32,
    /// Display name; also exposed to macros as `_template_name`.
    #[serde(default = "default_template_name")]
    pub name: String,
    /// Template-wide defaults.
    #[serde(default)]
    pub defaults: TemplateDefaults,
    /// Root of the layout tree.
    pub layout: Node,
    /// Free-form extras.
    #[serde(default)]
    pub extensions: Extensions,
}

fn default_template_name() -> String {
    "template".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inset_never_goes_negative() {
        let r = Rect::new(10, 10, 5, 5).inset(4, 4, 4, 4);
        assert_eq!(r, Rect::new(14, 14, 0, 0));
    }

    #[test]
    fn padding_reads_trbl_order() {
        let p: PaddingMm = serde_json::from_value(json!([1, 2, 3, 4])).unwrap();
        assert_eq!(p.top, 1.0);
        assert_eq!(p.right, 2.0);
        assert_eq!(p.bottom, 3.0);
        assert_eq!(p.left, 4.0);
    }

    #[test]
    fn element_tag_selects_variant() {
        let e: Element = serde_json::from_value(json!({
            "type": "datamatrix",
            "data": "X",
            "columns": 12,
            "rows": 10,
            "padding_mm": [1, 0, 0, 0]
        }))
        .unwrap();
        let Element::DataMatrix(dm) = &e else {
            panic!("expected datamatrix, got {e:?}");
        };
        assert_eq!(dm.columns, 12);
        assert_eq!(dm.quality, 200);
        assert_eq!(dm.format_id, 6);
        assert_eq!(dm.escape_char, '_');
        assert_eq!(e.base().padding_mm.top, 1.0);
        assert_eq!(e.type_name(), "datamatrix");
    }

    #[test]
    fn qr_defaults() {
        let e: Element = serde_json::from_value(json!({"type": "qr", "data": "1234"})).unwrap();
        let Element::Qr(qr) = e else { panic!() };
        assert_eq!(qr.error_correction, EccLevel::M);
        assert_eq!(qr.input_mode, InputMode::Auto);
        assert_eq!(qr.theme.shapes(), (ModuleShape::Square, ModuleShape::Square));
    }

    #[test]
    fn theme_overrides_preset() {
        let theme = QrTheme {
            preset: Some(ThemePreset::Dots),
            module_shape: None,
            finder_shape: Some(ModuleShape::Rounded),
        };
        assert_eq!(theme.shapes(), (ModuleShape::Circle, ModuleShape::Rounded));
    }

    #[test]
    fn template_defaults_apply() {
        let t: Template = serde_json::from_value(json!({
            "schema_version": 1,
            "layout": {"kind": "leaf", "elements": [{"type": "line", "thickness_mm": 0.5}]}
        }))
        .unwrap();
        assert_eq!(t.name, "template");
        assert_eq!(t.defaults.leaf_padding_mm, PaddingMm::uniform(1.0));
        assert_eq!(t.defaults.render.missing_variables, MissingVariables::Error);
        let Node::Leaf(leaf) = &t.layout else { panic!() };
        assert!(leaf.padding_mm.is_none());
        assert!(matches!(leaf.elements[0], Element::Line(_)));
    }
}
