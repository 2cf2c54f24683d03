//! Template → ZPL compilation.
//!
//! [`Compiler::compile`] solves the layout, then walks it in a fixed order:
//! visible dividers, gutter guides (when enabled), and finally every leaf in
//! document order (border, padding guide, element). Each element is drawn
//! inside its *element box*: the leaf content rect inset by the element's own
//! padding and clamped by `min_size_mm` / `max_size_mm`.
//!
//! Compilation is a pure function of its inputs. A failing compile returns
//! no ZPL at all.

mod code2d;
mod graphics;
mod text;

use std::fmt;

use crate::config::{CompilerConfig, ImageFetchConfig};
use crate::error::{CompilationError, ZplGridError};
use crate::layout::compute_layout;
use crate::measure::{OracleTextMeasurer, TextMeasurer};
use crate::model::{AlignH, AlignV, Element, ElementBase, LabelTarget, Rect, Template};
use crate::parse::{load_template, load_template_value};
use crate::render::{RenderOptions, Variables};
use crate::units::dots;
use crate::zpl::{ZplBuilder, ZplOptions};

/// Compiles templates with one text measurer and one configuration.
///
/// The measurer is consulted for text wrapping and shrink-to-fit; the
/// default is [`OracleTextMeasurer::offline`], which wraps lines itself
/// using fixed glyph advances.
pub struct Compiler {
    measurer: Box<dyn TextMeasurer>,
    config: CompilerConfig,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Box::new(OracleTextMeasurer::offline()))
    }
}

impl Compiler {
    /// Compiler using `measurer` and the default configuration.
    pub fn new(measurer: Box<dyn TextMeasurer>) -> Self {
        Self {
            measurer,
            config: CompilerConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `template` for `target`.
    ///
    /// `debug` outlines every leaf with a 1-dot border.
    pub fn compile(
        &self,
        template: &Template,
        target: &LabelTarget,
        variables: &Variables,
        debug: bool,
    ) -> Result<String, ZplGridError> {
        let dpi = target.dpi;
        let width = dots(target.width_mm, dpi)?;
        let height = dots(target.height_mm, dpi)?;
        let origin_x = dots(target.origin_x_mm, dpi)?;
        let origin_y = dots(target.origin_y_mm, dpi)?;

        let render = &template.defaults.render;
        let layout = compute_layout(
            &template.layout,
            width,
            height,
            dpi,
            template.defaults.leaf_padding_mm,
        )?;
        tracing::debug!(
            template = %template.name,
            width,
            height,
            dpi,
            leaves = layout.leaves.len(),
            "compiling label"
        );

        let scoped = self.measurer.for_dpi(dpi);
        let measurer: &dyn TextMeasurer = scoped.as_deref().unwrap_or(&*self.measurer);

        let mut w = LabelWriter {
            zpl: ZplBuilder::new(ZplOptions {
                emit_ci28: render.emit_ci28,
            }),
            measurer,
            variables,
            render: RenderOptions::from(render),
            dpi,
            fetch: &self.config.image_fetch,
        };
        w.zpl.start_label(width, height, origin_x, origin_y);

        for divider in &layout.dividers {
            let r = divider.rect;
            if r.w <= 0 || r.h <= 0 {
                continue;
            }
            w.zpl.field_origin(r.x, r.y);
            w.zpl.graphic_box(r.w, r.h, divider.thickness.max(1), 'B', 0);
            w.zpl.field_separator();
        }

        if render.debug_gutter_guides {
            for gutter in &layout.gutters {
                w.outline(gutter.rect);
            }
        }

        for leaf in &layout.leaves {
            if debug || leaf.node.debug_border {
                w.outline(leaf.rect);
            }
            if render.debug_padding_guides {
                w.outline(leaf.content_rect);
            }
            let Some(element) = leaf.node.elements.first() else {
                continue;
            };
            let rect = element_box(element.base(), element.type_name(), leaf.content_rect, dpi)?;
            match element {
                Element::Text(el) => w.text(el, rect)?,
                Element::Qr(el) => w.qr(el, rect)?,
                Element::DataMatrix(el) => w.datamatrix(el, rect)?,
                Element::Line(el) => w.line(el, rect)?,
                Element::Image(el) => w.image(el, rect)?,
            }
        }

        w.zpl.end_label();
        Ok(w.zpl.build())
    }
}

impl Template {
    /// Compile with a default [`Compiler`].
    pub fn compile(
        &self,
        target: &LabelTarget,
        variables: &Variables,
        debug: bool,
    ) -> Result<String, ZplGridError> {
        Compiler::default().compile(self, target, variables, debug)
    }
}

/// Load, validate, and compile a JSON template in one call.
///
/// URL image sources follow [`CompilerConfig::from_env`].
pub fn compile_zpl(
    template_json: &str,
    target: &LabelTarget,
    variables: &Variables,
    debug: bool,
) -> Result<String, ZplGridError> {
    let template = load_template(template_json)?;
    env_compiler().compile(&template, target, variables, debug)
}

/// [`compile_zpl`] for an already-parsed JSON value.
pub fn compile_zpl_value(
    template: &serde_json::Value,
    target: &LabelTarget,
    variables: &Variables,
    debug: bool,
) -> Result<String, ZplGridError> {
    let template = load_template_value(template)?;
    env_compiler().compile(&template, target, variables, debug)
}

fn env_compiler() -> Compiler {
    Compiler::default().with_config(CompilerConfig::from_env())
}

/// Per-call emission state.
struct LabelWriter<'a> {
    zpl: ZplBuilder,
    measurer: &'a dyn TextMeasurer,
    variables: &'a Variables,
    render: RenderOptions,
    dpi: u32,
    fetch: &'a ImageFetchConfig,
}

impl LabelWriter<'_> {
    /// 1-dot outline around `rect`.
    fn outline(&mut self, rect: Rect) {
        self.zpl.field_origin(rect.x, rect.y);
        self.zpl.graphic_box(rect.w.max(1), rect.h.max(1), 1, 'B', 0);
        self.zpl.field_separator();
    }

    fn dots(&self, mm: f64) -> Result<i32, ZplGridError> {
        Ok(dots(mm, self.dpi)?)
    }

    /// `rect` shrunk on every side by the quiet zone.
    ///
    /// The zone comes from the element, then `extensions.quiet_zone_mm`,
    /// then zero.
    fn quiet_zone_inset(
        &self,
        quiet_zone_mm: Option<f64>,
        base: &ElementBase,
        rect: Rect,
    ) -> Result<Rect, ZplGridError> {
        let mm = quiet_zone_mm
            .or_else(|| base.extensions.get("quiet_zone_mm").and_then(serde_json::Value::as_f64))
            .unwrap_or(0.0);
        if mm == 0.0 {
            return Ok(rect);
        }
        Ok(rect.inset_uniform(self.dots(mm)?))
    }
}

/// The leaf content rect inset by element padding, then size-clamped.
fn element_box(base: &ElementBase, kind: &'static str, rect: Rect, dpi: u32) -> Result<Rect, ZplGridError> {
    let pad = base.padding_mm;
    let mut b = rect.inset(
        dots(pad.left, dpi)?,
        dots(pad.top, dpi)?,
        dots(pad.right, dpi)?,
        dots(pad.bottom, dpi)?,
    );

    if let Some((min_w, min_h)) = base.min_size_mm {
        let (need_w, need_h) = (dots(min_w, dpi)?, dots(min_h, dpi)?);
        if b.w < need_w || b.h < need_h {
            return Err(CompilationError::MinSizeNotMet {
                element: kind,
                need_w: need_w.unsigned_abs(),
                need_h: need_h.unsigned_abs(),
                got_w: b.w.max(0).unsigned_abs(),
                got_h: b.h.max(0).unsigned_abs(),
            }
            .into());
        }
    }

    if let Some((max_w, max_h)) = base.max_size_mm {
        let tw = b.w.min(dots(max_w, dpi)?);
        let th = b.h.min(dots(max_h, dpi)?);
        b = Rect::new(b.x + (b.w - tw) / 2, b.y + (b.h - th) / 2, tw, th);
    }
    Ok(b)
}

/// Top-left corner for a `w` x `h` block aligned inside `rect`.
///
/// Slack is never negative: an oversized block stays at the rect's
/// top/left edge.
fn align_in_rect(rect: Rect, w: i32, h: i32, align_h: AlignH, align_v: AlignV) -> (i32, i32) {
    let x = match align_h {
        AlignH::Left => rect.x,
        AlignH::Center => rect.x + ((rect.w - w) / 2).max(0),
        AlignH::Right => rect.x + (rect.w - w).max(0),
    };
    let y = match align_v {
        AlignV::Top => rect.y,
        AlignV::Center => rect.y + ((rect.h - h) / 2).max(0),
        AlignV::Bottom => rect.y + (rect.h - h).max(0),
    };
    (x, y)
}
