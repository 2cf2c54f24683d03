//! Structural checks: required keys, types, enums, ranges.

use serde_json::{Map, Value};

use super::{
    check_bool, check_enum, check_int_range, check_number_min, check_object, check_string, present, push, require,
};
use crate::error::TemplateIssue;

const U32_MAX: i64 = u32::MAX as i64;

const ALIGN_H: &[&str] = &["left", "center", "right"];
const ALIGN_V: &[&str] = &["top", "center", "bottom"];

type Issues = Vec<TemplateIssue>;

pub(super) fn check_template(root: &Map<String, Value>, issues: &mut Issues) {
    if let Some(v) = require(root, "schema_version", "$", issues) {
        check_int_range(Some(v), issues, "$.schema_version", Some(1), Some(U32_MAX));
    }
    check_string(root.get("name"), issues, "$.name");
    check_object(root.get("extensions"), issues, "$.extensions");

    match present(root.get("defaults")) {
        Some(Value::Object(defaults)) => check_defaults(defaults, issues),
        Some(_) => push(issues, "$.defaults", "must be an object"),
        None => {}
    }

    if let Some(layout) = require(root, "layout", "$", issues) {
        check_node(layout, "$.layout", issues);
    }
}

fn check_defaults(defaults: &Map<String, Value>, issues: &mut Issues) {
    check_padding(defaults.get("leaf_padding_mm"), "$.defaults.leaf_padding_mm", issues);
    for key in ["text", "code2d", "image"] {
        check_object(defaults.get(key), issues, &format!("$.defaults.{key}"));
    }
    match present(defaults.get("render")) {
        Some(Value::Object(render)) => {
            check_enum(
                render.get("missing_variables"),
                issues,
                "$.defaults.render.missing_variables",
                &["empty", "error"],
            );
            for key in ["emit_ci28", "debug_padding_guides", "debug_gutter_guides"] {
                check_bool(render.get(key), issues, &format!("$.defaults.render.{key}"));
            }
        }
        Some(_) => push(issues, "$.defaults.render", "must be an object"),
        None => {}
    }
}

fn check_node(node: &Value, path: &str, issues: &mut Issues) {
    let Some(obj) = node.as_object() else {
        push(issues, path, "must be an object");
        return;
    };
    check_string(obj.get("alias"), issues, &format!("{path}.alias"));
    check_object(obj.get("extensions"), issues, &format!("{path}.extensions"));

    let Some(kind) = require(obj, "kind", path, issues) else {
        return;
    };
    match kind.as_str() {
        Some("split") => check_split(obj, path, issues),
        Some("leaf") => check_leaf(obj, path, issues),
        _ => push(issues, &format!("{path}.kind"), "must be one of ['leaf', 'split']"),
    }
}

fn check_split(obj: &Map<String, Value>, path: &str, issues: &mut Issues) {
    if let Some(direction) = require(obj, "direction", path, issues) {
        check_enum(Some(direction), issues, &format!("{path}.direction"), &["h", "v"]);
    }
    if let Some(ratio) = require(obj, "ratio", path, issues) {
        let ratio_path = format!("{path}.ratio");
        match ratio.as_f64() {
            None => push(issues, &ratio_path, "must be a number"),
            Some(r) if r <= 0.0 => push(issues, &ratio_path, "must be > 0.0"),
            Some(r) if r >= 1.0 => push(issues, &ratio_path, "must be < 1.0"),
            Some(_) => {}
        }
    }
    check_number_min(obj.get("gutter_mm"), issues, &format!("{path}.gutter_mm"), 0.0, false);

    let divider_path = format!("{path}.divider");
    match present(obj.get("divider")) {
        Some(Value::Object(divider)) => {
            check_bool(divider.get("visible"), issues, &format!("{divider_path}.visible"));
            check_number_min(
                divider.get("thickness_mm"),
                issues,
                &format!("{divider_path}.thickness_mm"),
                0.0,
                true,
            );
        }
        Some(_) => push(issues, &divider_path, "must be an object"),
        None => {}
    }

    let Some(children) = require(obj, "children", path, issues) else {
        return;
    };
    let children_path = format!("{path}.children");
    let Some(children) = children.as_array() else {
        push(issues, &children_path, "must be an array");
        return;
    };
    if children.len() != 2 {
        push(issues, &children_path, "must contain exactly 2 items");
    }
    for (idx, child) in children.iter().enumerate() {
        check_node(child, &format!("{children_path}[{idx}]"), issues);
    }
}

fn check_leaf(obj: &Map<String, Value>, path: &str, issues: &mut Issues) {
    check_padding(obj.get("padding_mm"), &format!("{path}.padding_mm"), issues);
    check_bool(obj.get("debug_border"), issues, &format!("{path}.debug_border"));

    let Some(elements) = require(obj, "elements", path, issues) else {
        return;
    };
    let elements_path = format!("{path}.elements");
    let Some(elements) = elements.as_array() else {
        push(issues, &elements_path, "must be an array");
        return;
    };
    if elements.len() != 1 {
        push(issues, &elements_path, "must contain exactly 1 item");
    }
    for (idx, element) in elements.iter().enumerate() {
        check_element(element, &format!("{elements_path}[{idx}]"), issues);
    }
}

fn check_element(element: &Value, path: &str, issues: &mut Issues) {
    let Some(obj) = element.as_object() else {
        push(issues, path, "must be an object");
        return;
    };
    let field = |key: &str| format!("{path}.{key}");

    check_string(obj.get("id"), issues, &field("id"));
    check_padding(obj.get("padding_mm"), &field("padding_mm"), issues);
    check_size_pair(obj.get("min_size_mm"), &field("min_size_mm"), issues);
    check_size_pair(obj.get("max_size_mm"), &field("max_size_mm"), issues);
    check_object(obj.get("extensions"), issues, &field("extensions"));

    let Some(kind) = require(obj, "type", path, issues) else {
        return;
    };
    match kind.as_str() {
        Some("text") => {
            if let Some(text) = require(obj, "text", path, issues) {
                check_string(Some(text), issues, &field("text"));
            }
            check_number_min(obj.get("font_height_mm"), issues, &field("font_height_mm"), 0.0, true);
            check_number_min(obj.get("font_width_mm"), issues, &field("font_width_mm"), 0.0, true);
            check_enum(obj.get("wrap"), issues, &field("wrap"), &["none", "word", "char"]);
            check_enum(
                obj.get("fit"),
                issues,
                &field("fit"),
                &["overflow", "wrap", "truncate", "shrink_to_fit"],
            );
            check_int_range(obj.get("max_lines"), issues, &field("max_lines"), Some(1), Some(U32_MAX));
            check_enum(obj.get("align_h"), issues, &field("align_h"), ALIGN_H);
            check_enum(obj.get("align_v"), issues, &field("align_v"), ALIGN_V);
        }
        Some("qr" | "datamatrix") => {
            if let Some(data) = require(obj, "data", path, issues) {
                check_string(Some(data), issues, &field("data"));
            }
        }
        Some("line") => {
            if let Some(t) = require(obj, "thickness_mm", path, issues) {
                check_number_min(Some(t), issues, &field("thickness_mm"), 0.0, true);
            }
            check_enum(obj.get("orientation"), issues, &field("orientation"), &["h", "v"]);
            check_enum(obj.get("align"), issues, &field("align"), &["start", "center", "end"]);
        }
        Some("image") => {
            if let Some(Value::Object(source)) = present(obj.get("source")) {
                check_string(source.get("data"), issues, &format!("{path}.source.data"));
            }
            check_bool(obj.get("invert"), issues, &field("invert"));
            check_int_range(obj.get("input_dpi"), issues, &field("input_dpi"), None, Some(U32_MAX));
        }
        _ => push(
            issues,
            &field("type"),
            "must be one of ['datamatrix', 'image', 'line', 'qr', 'text']",
        ),
    }
}

/// `[top, right, bottom, left]`, each a number >= 0.
fn check_padding(value: Option<&Value>, path: &str, issues: &mut Issues) {
    check_number_array(value, path, 4, "must be an array of 4 numbers", issues);
}

/// `[width_mm, height_mm]`, each a number >= 0.
fn check_size_pair(value: Option<&Value>, path: &str, issues: &mut Issues) {
    check_number_array(value, path, 2, "must be an array of 2 numbers", issues);
}

fn check_number_array(value: Option<&Value>, path: &str, len: usize, shape: &str, issues: &mut Issues) {
    let Some(value) = present(value) else {
        return;
    };
    match value.as_array() {
        Some(items) if items.len() == len => {
            for (idx, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{idx}]");
                if item.is_null() {
                    push(issues, &item_path, "must be a number");
                } else {
                    check_number_min(Some(item), issues, &item_path, 0.0, false);
                }
            }
        }
        _ => push(issues, path, shape),
    }
}
