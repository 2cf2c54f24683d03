//! Lines and raster images.

use super::{LabelWriter, align_in_rect};
use crate::error::ZplGridError;
use crate::model::{AlignH, AlignV, ImageElement, ImageFit, LineAlign, LineElement, Orientation, Rect};
use crate::raster::{decode_image_bytes, image_to_gfa, load_image_bytes, prepare_image, to_luma};
use crate::render::render_text;

const DEFAULT_THRESHOLD: u8 = 128;

impl LabelWriter<'_> {
    pub(super) fn line(&mut self, el: &LineElement, rect: Rect) -> Result<(), ZplGridError> {
        let t = self.dots(el.thickness_mm)?.max(1);
        let offset = |span: i32| match el.align {
            LineAlign::Start => 0,
            LineAlign::Center => ((span - t) / 2).max(0),
            LineAlign::End => (span - t).max(0),
        };
        match el.orientation {
            Orientation::H => {
                self.zpl.field_origin(rect.x, rect.y + offset(rect.h));
                self.zpl.graphic_box(rect.w.max(1), t, t, 'B', 0);
            }
            Orientation::V => {
                self.zpl.field_origin(rect.x + offset(rect.w), rect.y);
                self.zpl.graphic_box(t, rect.h.max(1), t, 'B', 0);
            }
        }
        self.zpl.field_separator();
        Ok(())
    }

    pub(super) fn image(&mut self, el: &ImageElement, rect: Rect) -> Result<(), ZplGridError> {
        if rect.w <= 0 || rect.h <= 0 {
            return Ok(());
        }
        let source = render_text(&el.source.data, self.variables, self.render)?;
        let bytes = load_image_bytes(el.source.kind, &source, self.fetch)?;
        let decoded = decode_image_bytes(&bytes)?;

        let fit = el.fit.unwrap_or_default();
        let Some(img) = prepare_image(
            decoded,
            rect.w.unsigned_abs(),
            rect.h.unsigned_abs(),
            fit,
            el.input_dpi,
            self.dpi,
        ) else {
            return Ok(());
        };
        let (w, h) = img.dimensions();
        tracing::debug!(w, h, ?fit, "prepared image");

        let (x, y) = if fit == ImageFit::Cover {
            (rect.x, rect.y)
        } else {
            align_in_rect(
                rect,
                i32::try_from(w).unwrap_or(i32::MAX),
                i32::try_from(h).unwrap_or(i32::MAX),
                el.align_h.unwrap_or(AlignH::Center),
                el.align_v.unwrap_or(AlignV::Center),
            )
        };

        let gfa = image_to_gfa(
            &to_luma(&img),
            el.threshold.unwrap_or(DEFAULT_THRESHOLD),
            el.dither.unwrap_or_default(),
            el.invert.unwrap_or(false),
        );
        self.zpl.field_origin(x, y);
        self.zpl.graphic_field(gfa.total_bytes, gfa.bytes_per_row, &gfa.data);
        self.zpl.field_separator();
        Ok(())
    }
}
