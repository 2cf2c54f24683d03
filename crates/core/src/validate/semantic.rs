//! Cross-field and tree-wide rules.
//!
//! Runs only on structurally valid templates, so required keys and basic
//! shapes can be relied on here.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{check_enum, check_int_range, check_number_min, check_string_len, present, push};
use crate::error::TemplateIssue;

const ALIGN_H: &[&str] = &["left", "center", "right"];
const ALIGN_V: &[&str] = &["top", "center", "bottom"];
const SIZE_MODES: &[&str] = &["fixed", "max"];
const RENDER_MODES: &[&str] = &["zpl", "image"];
const SHAPES: &[&str] = &["square", "circle", "rounded"];

const DEFAULT_DIVIDER_THICKNESS_MM: f64 = 0.3;

type Issues = Vec<TemplateIssue>;

pub(super) fn check_layout(layout: &Value, issues: &mut Issues) {
    let mut seen_aliases = HashSet::new();
    check_node(layout, "$.layout", &mut seen_aliases, issues);
}

/// Pre-order walk: the first use of an alias wins, later ones are reported.
fn check_node(node: &Value, path: &str, seen_aliases: &mut HashSet<String>, issues: &mut Issues) {
    let Some(obj) = node.as_object() else {
        return;
    };

    if let Some(alias) = present(obj.get("alias")).and_then(Value::as_str)
        && !seen_aliases.insert(alias.to_string())
    {
        push(issues, &format!("{path}.alias"), format!("duplicate alias: '{alias}'"));
    }

    match obj.get("kind").and_then(Value::as_str) {
        Some("split") => {
            check_divider(obj, path, issues);
            if let Some(children) = obj.get("children").and_then(Value::as_array) {
                for (idx, child) in children.iter().enumerate() {
                    check_node(child, &format!("{path}.children[{idx}]"), seen_aliases, issues);
                }
            }
        }
        Some("leaf") => {
            if let Some(elements) = obj.get("elements").and_then(Value::as_array) {
                for (idx, element) in elements.iter().enumerate() {
                    if let Some(element) = element.as_object() {
                        check_element(element, &format!("{path}.elements[{idx}]"), issues);
                    }
                }
            }
        }
        _ => {}
    }
}

fn check_divider(split: &Map<String, Value>, path: &str, issues: &mut Issues) {
    let Some(divider) = present(split.get("divider")).and_then(Value::as_object) else {
        return;
    };
    if !divider.get("visible").and_then(Value::as_bool).unwrap_or(false) {
        return;
    }
    let gutter = split.get("gutter_mm").and_then(Value::as_f64).unwrap_or(0.0);
    let thickness = divider
        .get("thickness_mm")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_DIVIDER_THICKNESS_MM);
    if gutter < thickness {
        push(
            issues,
            &format!("{path}.divider"),
            "gutter_mm must be >= divider.thickness_mm when divider is visible",
        );
    }
}

fn check_element(element: &Map<String, Value>, path: &str, issues: &mut Issues) {
    match element.get("type").and_then(Value::as_str) {
        Some("qr") => check_qr(element, path, issues),
        Some("datamatrix") => check_datamatrix(element, path, issues),
        Some("image") => check_image(element, path, issues),
        _ => {}
    }
}

fn check_qr(e: &Map<String, Value>, path: &str, issues: &mut Issues) {
    let field = |key: &str| format!("{path}.{key}");

    if e.contains_key("model") {
        push(issues, &field("model"), "qr model is fixed to 2 and is not configurable");
    }
    check_int_range(e.get("magnification"), issues, &field("magnification"), Some(1), Some(10));
    check_enum(e.get("size_mode"), issues, &field("size_mode"), SIZE_MODES);
    check_enum(e.get("align_h"), issues, &field("align_h"), ALIGN_H);
    check_enum(e.get("align_v"), issues, &field("align_v"), ALIGN_V);
    check_enum(e.get("error_correction"), issues, &field("error_correction"), &["L", "M", "Q", "H"]);
    check_enum(e.get("input_mode"), issues, &field("input_mode"), &["A", "M"]);
    check_enum(e.get("character_mode"), issues, &field("character_mode"), &["N", "A"]);
    check_number_min(e.get("quiet_zone_mm"), issues, &field("quiet_zone_mm"), 0.0, false);
    check_enum(e.get("render_mode"), issues, &field("render_mode"), RENDER_MODES);

    match present(e.get("theme")) {
        Some(Value::Object(theme)) => {
            check_enum(
                theme.get("preset"),
                issues,
                &field("theme.preset"),
                &["classic", "dots", "rounded"],
            );
            check_enum(theme.get("module_shape"), issues, &field("theme.module_shape"), SHAPES);
            check_enum(theme.get("finder_shape"), issues, &field("theme.finder_shape"), SHAPES);
        }
        Some(_) => push(issues, &field("theme"), "must be an object"),
        None => {}
    }

    let manual = e.get("input_mode").and_then(Value::as_str) == Some("M");
    let has_character_mode = present(e.get("character_mode")).is_some();
    if manual && !has_character_mode {
        push(
            issues,
            &field("character_mode"),
            "character_mode is required when input_mode is \"M\"",
        );
    }
    if has_character_mode && !manual {
        push(
            issues,
            &field("character_mode"),
            "character_mode is only valid when input_mode is \"M\"",
        );
    }
}

fn check_datamatrix(e: &Map<String, Value>, path: &str, issues: &mut Issues) {
    let field = |key: &str| format!("{path}.{key}");

    check_number_min(e.get("module_size_mm"), issues, &field("module_size_mm"), 0.0, true);
    check_enum(e.get("size_mode"), issues, &field("size_mode"), SIZE_MODES);
    check_enum(e.get("align_h"), issues, &field("align_h"), ALIGN_H);
    check_enum(e.get("align_v"), issues, &field("align_v"), ALIGN_V);
    if let Some(quality) = present(e.get("quality"))
        && quality.as_u64() != Some(200)
    {
        push(issues, &field("quality"), "must be one of [200]");
    }
    check_int_range(e.get("columns"), issues, &field("columns"), Some(0), Some(49));
    check_int_range(e.get("rows"), issues, &field("rows"), Some(0), Some(49));
    check_int_range(e.get("format_id"), issues, &field("format_id"), Some(0), Some(6));
    check_string_len(e.get("escape_char"), issues, &field("escape_char"), 1);
    check_number_min(e.get("quiet_zone_mm"), issues, &field("quiet_zone_mm"), 0.0, false);
    check_enum(e.get("render_mode"), issues, &field("render_mode"), RENDER_MODES);
}

fn check_image(e: &Map<String, Value>, path: &str, issues: &mut Issues) {
    let field = |key: &str| format!("{path}.{key}");

    match present(e.get("source")) {
        Some(Value::Object(source)) => {
            check_enum(source.get("kind"), issues, &field("source.kind"), &["base64", "url"]);
            if present(source.get("data")).is_none() {
                push(issues, &field("source.data"), "is required");
            }
        }
        Some(_) => push(issues, &field("source"), "must be an object"),
        None => push(issues, &field("source.data"), "is required"),
    }

    check_enum(e.get("fit"), issues, &field("fit"), &["none", "contain", "cover", "stretch"]);
    check_enum(e.get("align_h"), issues, &field("align_h"), ALIGN_H);
    check_enum(e.get("align_v"), issues, &field("align_v"), ALIGN_V);
    check_int_range(e.get("input_dpi"), issues, &field("input_dpi"), Some(1), None);
    check_int_range(e.get("threshold"), issues, &field("threshold"), Some(0), Some(255));
    check_enum(e.get("dither"), issues, &field("dither"), &["none", "floyd_steinberg", "bayer"]);
}
