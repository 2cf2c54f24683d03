//! Template validation.
//!
//! Validation runs over the raw JSON value after element defaults have been
//! merged in (see [`crate::parse`]), in two passes:
//!
//! 1. **structural**: required keys, value types, enum membership, numeric
//!    ranges. A template that passes this pass always deserializes into the
//!    typed [`crate::model::Template`].
//! 2. **semantic**: only when the structural pass is clean. Duplicate
//!    aliases, divider/gutter fit, and the per-element rules for QR,
//!    DataMatrix, and image elements.
//!
//! Every problem is collected; nothing fails fast. Paths are
//! JSON-pointer-like (`$.layout.children[0].elements[0].data`).

mod schema;
mod semantic;

use serde_json::Value;

use crate::error::TemplateIssue;

/// Validate a raw template value, returning every issue found.
///
/// An empty vector means [`crate::parse::load_template_value`] will succeed.
pub fn validate_template_value(raw: &Value) -> Vec<TemplateIssue> {
    if !raw.is_object() {
        return vec![not_an_object()];
    }
    check_merged(&crate::parse::with_element_defaults(raw))
}

/// Validate a template whose element defaults are already merged.
pub(crate) fn check_merged(merged: &Value) -> Vec<TemplateIssue> {
    let Some(root) = merged.as_object() else {
        return vec![not_an_object()];
    };
    let mut issues = Vec::new();
    schema::check_template(root, &mut issues);
    if issues.is_empty()
        && let Some(layout) = root.get("layout")
    {
        semantic::check_layout(layout, &mut issues);
    }
    issues
}

fn not_an_object() -> TemplateIssue {
    TemplateIssue::new("$", "template must be a JSON object")
}

// ── Shared checks ───────────────────────────────────────────────────────
//
// `None` and JSON `null` both mean "not set" and are never reported here;
// required keys are checked separately with `require`.

fn push(issues: &mut Vec<TemplateIssue>, path: &str, message: impl Into<String>) {
    issues.push(TemplateIssue::new(path, message));
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_integer(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

/// Report a missing key; returns the value when present.
fn require<'v>(
    obj: &'v serde_json::Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<TemplateIssue>,
) -> Option<&'v Value> {
    let value = present(obj.get(key));
    if value.is_none() {
        push(issues, &format!("{path}.{key}"), "is required");
    }
    value
}

fn check_enum(value: Option<&Value>, issues: &mut Vec<TemplateIssue>, path: &str, allowed: &[&str]) {
    let Some(value) = present(value) else {
        return;
    };
    if !value.as_str().is_some_and(|s| allowed.contains(&s)) {
        push(issues, path, format!("must be one of {}", quoted_list(allowed)));
    }
}

fn check_int_range(
    value: Option<&Value>,
    issues: &mut Vec<TemplateIssue>,
    path: &str,
    minimum: Option<i64>,
    maximum: Option<i64>,
) {
    let Some(value) = present(value) else {
        return;
    };
    let Some(n) = as_integer(value) else {
        push(issues, path, "must be an integer");
        return;
    };
    if let Some(min) = minimum
        && n < i128::from(min)
    {
        push(issues, path, format!("must be >= {min}"));
    }
    if let Some(max) = maximum
        && n > i128::from(max)
    {
        push(issues, path, format!("must be <= {max}"));
    }
}

fn check_number_min(
    value: Option<&Value>,
    issues: &mut Vec<TemplateIssue>,
    path: &str,
    minimum: f64,
    exclusive: bool,
) {
    let Some(value) = present(value) else {
        return;
    };
    let Some(n) = value.as_f64() else {
        push(issues, path, "must be a number");
        return;
    };
    if exclusive && n <= minimum {
        push(issues, path, format!("must be > {}", bound_float(minimum)));
    }
    if !exclusive && n < minimum {
        push(issues, path, format!("must be >= {}", bound_float(minimum)));
    }
}

fn check_string_len(value: Option<&Value>, issues: &mut Vec<TemplateIssue>, path: &str, length: usize) {
    let Some(value) = present(value) else {
        return;
    };
    if value.as_str().is_none_or(|s| s.chars().count() != length) {
        push(issues, path, format!("must be a string of length {length}"));
    }
}

fn check_string(value: Option<&Value>, issues: &mut Vec<TemplateIssue>, path: &str) {
    if present(value).is_some_and(|v| !v.is_string()) {
        push(issues, path, "must be a string");
    }
}

fn check_bool(value: Option<&Value>, issues: &mut Vec<TemplateIssue>, path: &str) {
    if present(value).is_some_and(|v| !v.is_boolean()) {
        push(issues, path, "must be a boolean");
    }
}

fn check_object(value: Option<&Value>, issues: &mut Vec<TemplateIssue>, path: &str) {
    if present(value).is_some_and(|v| !v.is_object()) {
        push(issues, path, "must be an object");
    }
}

/// Sorted, quoted list: `['a', 'b']`.
fn quoted_list(items: &[&str]) -> String {
    let mut sorted = items.to_vec();
    sorted.sort_unstable();
    let quoted: Vec<String> = sorted.iter().map(|s| format!("'{s}'")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Float bound with at least one decimal: `0.0`, `1.0`, `0.5`.
fn bound_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}
