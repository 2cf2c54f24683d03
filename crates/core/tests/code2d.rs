//! QR and DataMatrix placement through the full compiler.

mod common;

use common::{compile, leaf_template, origin_before};
use serde_json::json;
use zplgrid_core::error::CompilationError;
use zplgrid_core::model::EccLevel;
use zplgrid_core::symbol::QrCodeZplBuilder;
use zplgrid_core::{LabelTarget, Variables, ZplGridError, compile_zpl_value, mm_to_dots};

// ─── QR ──────────────────────────────────────────────────────────────────────

#[test]
fn qr_max_uses_largest_magnification_that_fits() {
    let target = LabelTarget::new(20.0, 20.0, 203);
    let zpl = compile(
        &leaf_template(json!({
            "type": "qr", "data": "1234", "size_mode": "max", "align_h": "left", "align_v": "top"
        })),
        &target,
    );

    let probe = QrCodeZplBuilder::new(1).unwrap().ecc(EccLevel::M).build("1234", 0, 0).unwrap();
    let inner = mm_to_dots(20.0, 203).unwrap() as i32;
    let unit = probe.size.symbol_width.max(probe.size.symbol_height);
    let expected_mag = (inner / unit).clamp(1, 10);
    assert_eq!(expected_mag, 6);

    assert!(zpl.contains("^FO0,0\n^BQN,2,6\n^FDMA,1234\n^FS\n"), "{zpl}");
}

#[test]
fn qr_top_alignment_starts_at_content_edge() {
    let target = LabelTarget::new(20.0, 20.0, 203);
    let template = json!({
        "schema_version": 1,
        "layout": {
            "kind": "leaf",
            "padding_mm": [2.0, 0.0, 0.0, 0.0],
            "elements": [{
                "type": "qr", "data": "1234", "magnification": 2,
                "align_h": "left", "align_v": "top", "quiet_zone_mm": 0.0
            }]
        }
    });
    let zpl = compile(&template, &target);
    assert_eq!(origin_before(&zpl, "^BQN,2,2"), (0, 16));
}

#[test]
fn qr_centers_its_full_footprint() {
    // mag 2: 42 dots wide, 52 tall including the forced top offset
    let target = LabelTarget::new(20.0, 20.0, 203);
    let zpl = compile(
        &leaf_template(json!({ "type": "qr", "data": "1234", "magnification": 2 })),
        &target,
    );
    assert_eq!(origin_before(&zpl, "^BQN,2,2"), (59, 54));
}

#[test]
fn qr_quiet_zone_insets_the_box() {
    let target = LabelTarget::new(20.0, 20.0, 203);
    let zpl = compile(
        &leaf_template(json!({
            "type": "qr", "data": "1234", "magnification": 2, "quiet_zone_mm": 1.0,
            "align_h": "right", "align_v": "bottom"
        })),
        &target,
    );
    // inner box is 8..152; footprint 42 x 52
    assert_eq!(origin_before(&zpl, "^BQN,2,2"), (110, 100));
}

#[test]
fn qr_default_magnification_follows_dpi() {
    let zpl = compile(
        &leaf_template(json!({ "type": "qr", "data": "x" })),
        &LabelTarget::new(30.0, 30.0, 300),
    );
    assert!(zpl.contains("^BQN,2,3\n"), "{zpl}");
}

#[test]
fn qr_manual_input_prefixes_character_mode() {
    let zpl = compile(
        &leaf_template(json!({
            "type": "qr", "data": "12345", "error_correction": "H",
            "input_mode": "M", "character_mode": "N", "magnification": 3
        })),
        &LabelTarget::new(20.0, 20.0, 203),
    );
    assert!(zpl.contains("^BQN,2,3\n^FDHM,N12345\n^FS\n"), "{zpl}");
}

#[test]
fn qr_data_comes_from_variables() {
    let mut vars = Variables::new();
    vars.insert("sku".into(), json!("A-1"));
    let zpl = compile_zpl_value(
        &leaf_template(json!({ "type": "qr", "data": "SKU:{sku}", "error_correction": "L" })),
        &LabelTarget::new(20.0, 20.0, 203),
        &vars,
        false,
    )
    .unwrap();
    assert!(zpl.contains("^FDLA,SKU:A-1\n"), "{zpl}");
}

#[test]
fn qr_non_ascii_data_is_rejected_in_zpl_mode() {
    let err = compile_zpl_value(
        &leaf_template(json!({ "type": "qr", "data": "Grüße" })),
        &LabelTarget::new(20.0, 20.0, 203),
        &Variables::new(),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, ZplGridError::Compilation(CompilationError::NonAscii(_))), "{err}");
}

#[test]
fn qr_image_mode_emits_a_graphic_field() {
    let zpl = compile(
        &leaf_template(json!({
            "type": "qr", "data": "HELLO", "render_mode": "image", "magnification": 2,
            "align_h": "left", "align_v": "top"
        })),
        &LabelTarget::new(20.0, 20.0, 203),
    );
    // version 1: 21 modules x 2 dots = 42 px, 6 bytes per row
    assert!(zpl.contains("^FO0,0\n^GFA,252,252,6,"), "{zpl}");
    assert!(!zpl.contains("^BQ"));
}

#[test]
fn qr_image_mode_accepts_non_ascii() {
    let zpl = compile(
        &leaf_template(json!({
            "type": "qr", "data": "Grüße", "render_mode": "image", "theme": { "preset": "dots" }
        })),
        &LabelTarget::new(20.0, 20.0, 203),
    );
    assert!(zpl.contains("^GFA,"), "{zpl}");
}

// ─── DataMatrix ──────────────────────────────────────────────────────────────

#[test]
fn datamatrix_max_aligns_right_bottom() {
    let zpl = compile(
        &leaf_template(json!({
            "type": "datamatrix", "data": "ABC123", "size_mode": "max",
            "columns": 12, "rows": 10, "align_h": "right", "align_v": "bottom"
        })),
        &LabelTarget::new(30.0, 20.0, 203),
    );
    let inner_w = mm_to_dots(30.0, 203).unwrap() as i32;
    let inner_h = mm_to_dots(20.0, 203).unwrap() as i32;
    let module = (inner_w / 12).min(inner_h / 10);
    assert_eq!(module, 16);
    assert_eq!(
        origin_before(&zpl, "^BXN"),
        (inner_w - 12 * module, inner_h - 10 * module)
    );
    assert!(zpl.contains("^BXN,16,200,12,10,6,_\n^FDABC123\n^FS\n"), "{zpl}");
}

#[test]
fn datamatrix_max_requires_columns_and_rows() {
    let err = compile_zpl_value(
        &leaf_template(json!({ "type": "datamatrix", "data": "ABC123", "size_mode": "max" })),
        &LabelTarget::new(30.0, 20.0, 203),
        &Variables::new(),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, ZplGridError::Compilation(_)), "{err}");
}

#[test]
fn datamatrix_escape_collision_is_an_error() {
    let err = compile_zpl_value(
        &leaf_template(json!({ "type": "datamatrix", "data": "A_B" })),
        &LabelTarget::new(20.0, 20.0, 203),
        &Variables::new(),
        false,
    )
    .unwrap_err();
    assert!(
        matches!(err, ZplGridError::Compilation(CompilationError::EscapeCollision('_'))),
        "{err}"
    );
}

#[test]
fn datamatrix_custom_escape_char() {
    let zpl = compile(
        &leaf_template(json!({ "type": "datamatrix", "data": "A_B", "escape_char": "#" })),
        &LabelTarget::new(20.0, 20.0, 203),
    );
    // fixed mode, 0.5 mm modules = 4 dots; auto size fills the square box
    assert!(zpl.contains("^FO0,0\n^BXN,4,200,0,0,6,#\n^FDA_B\n^FS\n"), "{zpl}");
}

#[test]
fn datamatrix_image_mode_emits_a_graphic_field() {
    let zpl = compile(
        &leaf_template(json!({ "type": "datamatrix", "data": "ABC123", "render_mode": "image" })),
        &LabelTarget::new(20.0, 20.0, 203),
    );
    assert!(zpl.contains("^GFA,"), "{zpl}");
    assert!(!zpl.contains("^BX"));
}
