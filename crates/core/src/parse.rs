//! Loading templates from JSON.
//!
//! Loading is validate-then-deserialize: element dictionaries are first
//! shallow-merged over the matching `defaults` bucket (`text`, `code2d`,
//! `image`), the merged value is validated, and only a clean value is handed
//! to serde. JSON `null` means "not set" everywhere except inside
//! `extensions` bags.

use serde_json::{Map, Value};

use crate::error::{TemplateIssue, TemplateValidationError};
use crate::model::Template;

/// Element keys that always come from the element itself.
const NEVER_DEFAULTED: &[&str] = &[
    "type",
    "id",
    "padding_mm",
    "min_size_mm",
    "max_size_mm",
    "extensions",
    "theme",
];

/// Parse, validate, and type a template from JSON text.
pub fn load_template(json: &str) -> Result<Template, TemplateValidationError> {
    let raw: Value = serde_json::from_str(json).map_err(|e| single_issue(format!("invalid JSON: {e}")))?;
    load_template_value(&raw)
}

/// Validate and type an already-parsed template value.
///
/// Every problem found is reported in the returned error, in document order.
pub fn load_template_value(raw: &Value) -> Result<Template, TemplateValidationError> {
    if !raw.is_object() {
        return Err(single_issue("template must be a JSON object"));
    }
    let merged = with_element_defaults(raw);
    let issues = crate::validate::check_merged(&merged);
    if !issues.is_empty() {
        return Err(TemplateValidationError { issues });
    }
    serde_json::from_value(merged).map_err(|e| single_issue(e.to_string()))
}

fn single_issue(message: impl Into<String>) -> TemplateValidationError {
    TemplateValidationError {
        issues: vec![TemplateIssue::new("$", message)],
    }
}

/// Copy of `raw` with template defaults merged under each element and
/// `null` members dropped.
pub(crate) fn with_element_defaults(raw: &Value) -> Value {
    let mut out = raw.clone();
    let Some(root) = out.as_object_mut() else {
        return out;
    };
    strip_nulls(root);

    let defaults = match root.get_mut("defaults") {
        Some(Value::Object(defaults)) => {
            strip_nulls(defaults);
            if let Some(Value::Object(render)) = defaults.get_mut("render") {
                strip_nulls(render);
            }
            defaults.clone()
        }
        _ => Map::new(),
    };

    if let Some(layout) = root.get_mut("layout") {
        merge_node(layout, &defaults);
    }
    out
}

fn merge_node(node: &mut Value, defaults: &Map<String, Value>) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    strip_nulls(obj);
    if let Some(Value::Object(divider)) = obj.get_mut("divider") {
        strip_nulls(divider);
    }
    if let Some(Value::Array(children)) = obj.get_mut("children") {
        for child in children {
            merge_node(child, defaults);
        }
    }
    if let Some(Value::Array(elements)) = obj.get_mut("elements") {
        for element in elements {
            merge_element(element, defaults);
        }
    }
}

fn merge_element(element: &mut Value, defaults: &Map<String, Value>) {
    let Some(obj) = element.as_object_mut() else {
        return;
    };
    let bucket = match obj.get("type").and_then(Value::as_str) {
        Some("text") => Some("text"),
        Some("qr" | "datamatrix") => Some("code2d"),
        Some("image") => Some("image"),
        _ => None,
    };
    if let Some(Value::Object(base)) = bucket.and_then(|b| defaults.get(b)) {
        let mut merged: Map<String, Value> = base
            .iter()
            .filter(|(k, _)| !NEVER_DEFAULTED.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        merged.extend(std::mem::take(obj));
        *obj = merged;
    }
    strip_nulls(obj);
    for key in ["source", "theme"] {
        if let Some(Value::Object(inner)) = obj.get_mut(key) {
            strip_nulls(inner);
        }
    }
}

fn strip_nulls(obj: &mut Map<String, Value>) {
    obj.retain(|_, v| !v.is_null());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Direction, Element, ImageFit, ImageSourceKind, InputMode, Node, PaddingMm, SizeMode, TextFit, Wrap,
    };
    use serde_json::json;

    fn leaf_with(element: Value) -> Value {
        json!({
            "schema_version": 1,
            "defaults": {
                "text": { "font_height_mm": 3.0, "wrap": "char", "id": "ignored" },
                "code2d": { "size_mode": "max", "quiet_zone_mm": 1.0 },
                "image": { "fit": "cover" }
            },
            "layout": { "kind": "leaf", "elements": [element] }
        })
    }

    fn only_element(t: &Template) -> &Element {
        match &t.layout {
            Node::Leaf(leaf) => &leaf.elements[0],
            Node::Split(_) => panic!("expected a leaf"),
        }
    }

    #[test]
    fn text_defaults_merge_under_element() {
        let t = load_template_value(&leaf_with(json!({ "type": "text", "text": "hi", "wrap": "none" }))).unwrap();
        let Element::Text(text) = only_element(&t) else {
            panic!("expected text");
        };
        assert_eq!(text.font_height_mm, Some(3.0));
        assert_eq!(text.wrap, Some(Wrap::None));
        assert_eq!(text.fit, None);
        assert_eq!(text.base.id, None);
    }

    #[test]
    fn code2d_defaults_apply_to_both_symbologies() {
        let t = load_template_value(&leaf_with(json!({ "type": "datamatrix", "data": "x" }))).unwrap();
        let Element::DataMatrix(dm) = only_element(&t) else {
            panic!("expected datamatrix");
        };
        assert_eq!(dm.size_mode, Some(SizeMode::Max));
        assert_eq!(dm.quiet_zone_mm, Some(1.0));
        assert_eq!(dm.quality, 200);
        assert_eq!(dm.escape_char, '_');

        let t = load_template_value(&leaf_with(json!({ "type": "qr", "data": "x" }))).unwrap();
        let Element::Qr(qr) = only_element(&t) else {
            panic!("expected qr");
        };
        assert_eq!(qr.size_mode, Some(SizeMode::Max));
        assert_eq!(qr.input_mode, InputMode::Auto);
    }

    #[test]
    fn image_defaults_and_source() {
        let t = load_template_value(&leaf_with(json!({
            "type": "image", "source": { "kind": "url", "data": "https://example.com/a.png" }
        })))
        .unwrap();
        let Element::Image(img) = only_element(&t) else {
            panic!("expected image");
        };
        assert_eq!(img.fit, Some(ImageFit::Cover));
        assert_eq!(img.source.kind, ImageSourceKind::Url);
    }

    #[test]
    fn null_means_unset() {
        let t = load_template_value(&json!({
            "schema_version": 1,
            "name": null,
            "defaults": { "text": { "fit": "truncate" } },
            "layout": {
                "kind": "split", "direction": "v", "ratio": 0.25, "gutter_mm": null, "divider": null,
                "children": [
                    { "kind": "leaf", "padding_mm": null, "elements": [{ "type": "text", "text": "a", "fit": null }] },
                    { "kind": "leaf", "padding_mm": [0, 0, 0, 0], "elements": [{ "type": "line", "thickness_mm": 0.5 }] }
                ]
            }
        }))
        .unwrap();
        assert_eq!(t.name, "template");
        let Node::Split(split) = &t.layout else {
            panic!("expected split");
        };
        assert_eq!(split.direction, Direction::V);
        assert_eq!(split.gutter_mm, 0.0);
        let Node::Leaf(first) = &split.children[0] else {
            panic!("expected leaf");
        };
        assert_eq!(first.padding_mm, None);
        let Element::Text(text) = &first.elements[0] else {
            panic!("expected text");
        };
        // the element's explicit null wins over the template default
        assert_eq!(text.fit, None);
        let Node::Leaf(second) = &split.children[1] else {
            panic!("expected leaf");
        };
        assert_eq!(second.padding_mm, Some(PaddingMm::default()));
    }

    #[test]
    fn element_keys_win_over_defaults() {
        let t = load_template_value(&leaf_with(json!({
            "type": "text", "text": "x", "font_height_mm": 5, "fit": "shrink_to_fit"
        })))
        .unwrap();
        let Element::Text(text) = only_element(&t) else {
            panic!("expected text");
        };
        assert_eq!(text.font_height_mm, Some(5.0));
        assert_eq!(text.fit, Some(TextFit::ShrinkToFit));
    }

    #[test]
    fn invalid_json_is_one_issue_at_root() {
        let err = load_template("{ not json").unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "$");
        assert!(err.issues[0].message.starts_with("invalid JSON"));
    }

    #[test]
    fn validation_issues_are_all_reported() {
        let err = load_template(
            r#"{
                "schema_version": 1,
                "layout": {
                    "kind": "split", "direction": "h", "ratio": 0.5,
                    "children": [
                        { "kind": "leaf", "elements": [{ "type": "qr", "data": "x", "magnification": 0 }] },
                        { "kind": "leaf", "elements": [{ "type": "datamatrix", "data": "x", "format_id": 9 }] }
                    ]
                }
            }"#,
        )
        .unwrap_err();
        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$.layout.children[0].elements[0].magnification",
                "$.layout.children[1].elements[0].format_id",
            ]
        );
    }

    #[test]
    fn defaults_do_not_leak_into_raw_value() {
        let raw = leaf_with(json!({ "type": "text", "text": "hi" }));
        let merged = with_element_defaults(&raw);
        assert_eq!(merged["layout"]["elements"][0]["wrap"], json!("char"));
        assert!(raw["layout"]["elements"][0].get("wrap").is_none());
        assert!(merged["layout"]["elements"][0].get("id").is_none());
    }
}
