//! `{name}` placeholder substitution.
//!
//! Supports the brace-format mini-language that label templates use:
//! `{{`/`}}` escapes, `{name}`, attribute and index access into JSON values
//! (`{item.sku}`, `{rows[0]}`), `!s`/`!r` conversions, and format specs of the
//! form `[[fill]align][sign][#][0][width][,|_][.precision][type]` with types
//! `s d f % x X`. JSON scalars print as `True`, `False`, `None`, and floats
//! always carry a fraction (`1.0`), so existing templates keep their output.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::error::TemplateRenderError;
use crate::model::{Element, MissingVariables, Node, RenderDefaults, Template};

/// Variables a template is rendered against.
pub type Variables = Map<String, Value>;

/// Substitution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// What a placeholder with no matching variable becomes.
    pub missing_variables: MissingVariables,
}

impl RenderOptions {
    /// Fail on any missing variable.
    pub const STRICT: RenderOptions = RenderOptions {
        missing_variables: MissingVariables::Error,
    };
}

impl From<&RenderDefaults> for RenderOptions {
    fn from(d: &RenderDefaults) -> Self {
        Self {
            missing_variables: d.missing_variables,
        }
    }
}

/// Substitute every placeholder in `template`.
pub fn render_text(
    template: &str,
    variables: &Variables,
    options: RenderOptions,
) -> Result<String, TemplateRenderError> {
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Field(field) => {
                let value = resolve(&field, variables, options)?;
                out.push_str(&format_field(&value, field.conversion, field.spec)?);
            }
        }
    }
    Ok(out)
}

/// Base variable names referenced by `template`, in order of first use.
///
/// `{item.sku}` and `{rows[0]}` report `item` and `rows`.
pub fn placeholder_names(template: &str) -> Result<Vec<String>, TemplateRenderError> {
    let mut names: Vec<String> = Vec::new();
    for segment in parse(template)? {
        if let Segment::Field(field) = segment
            && !field.base.is_empty()
            && !names.iter().any(|n| n == field.base)
        {
            names.push(field.base.to_string());
        }
    }
    Ok(names)
}

/// Every placeholder-bearing string in `template`, in layout order.
///
/// Text content, QR and DataMatrix data, and image source data.
pub fn template_strings(template: &Template) -> Vec<&str> {
    fn walk<'t>(node: &'t Node, out: &mut Vec<&'t str>) {
        match node {
            Node::Split(split) => split.children.iter().for_each(|c| walk(c, out)),
            Node::Leaf(leaf) => out.extend(leaf.elements.iter().filter_map(|e| match e {
                Element::Text(t) => Some(t.text.as_str()),
                Element::Qr(q) => Some(q.data.as_str()),
                Element::DataMatrix(d) => Some(d.data.as_str()),
                Element::Image(i) => Some(i.source.data.as_str()),
                Element::Line(_) => None,
            })),
        }
    }
    let mut out = Vec::new();
    walk(&template.layout, &mut out);
    out
}

/// Render every placeholder string strictly, failing on the first missing
/// variable. Lets a caller reject a request before compiling.
pub fn assert_variables_present(
    template: &Template,
    variables: &Variables,
) -> Result<(), TemplateRenderError> {
    for text in template_strings(template) {
        render_text(text, variables, RenderOptions::STRICT)?;
    }
    Ok(())
}

fn format_err(msg: impl Into<String>) -> TemplateRenderError {
    TemplateRenderError::Format(msg.into())
}

// ── Parsing ─────────────────────────────────────────────────────────────

enum Segment<'a> {
    Literal(Cow<'a, str>),
    Field(Field<'a>),
}

enum Accessor<'a> {
    Attr(&'a str),
    Index(&'a str),
}

struct Field<'a> {
    base: &'a str,
    accessors: Vec<Accessor<'a>>,
    conversion: Option<char>,
    spec: &'a str,
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateRenderError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let start = i + 1;
                let mut end = None;
                for (j, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            end = Some(j);
                            break;
                        }
                        '{' => return Err(format_err("nested replacement fields are not supported")),
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| format_err("expected '}' before end of string"))?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(Cow::Owned(std::mem::take(&mut literal))));
                }
                segments.push(Segment::Field(parse_field(&template[start..end])?));
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(format_err("single '}' encountered in format string")),
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(Cow::Owned(literal)));
    }
    Ok(segments)
}

fn parse_field(field: &str) -> Result<Field<'_>, TemplateRenderError> {
    // The name ends at the first '!' or ':' that is not inside brackets.
    let mut in_bracket = false;
    let mut name_end = field.len();
    for (i, c) in field.char_indices() {
        match c {
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            '!' | ':' if !in_bracket => {
                name_end = i;
                break;
            }
            _ => {}
        }
    }
    let name = &field[..name_end];
    let rest = &field[name_end..];

    let (conversion, spec) = if let Some(conv) = rest.strip_prefix('!') {
        let mut it = conv.chars();
        let c = it
            .next()
            .ok_or_else(|| format_err("end of string while looking for conversion specifier"))?;
        let after = it.as_str();
        let spec = if after.is_empty() {
            ""
        } else {
            after
                .strip_prefix(':')
                .ok_or_else(|| format_err("expected ':' after conversion specifier"))?
        };
        (Some(c), spec)
    } else {
        (None, rest.strip_prefix(':').unwrap_or(""))
    };

    let (base, accessors) = parse_name(name)?;
    Ok(Field {
        base,
        accessors,
        conversion,
        spec,
    })
}

fn parse_name(name: &str) -> Result<(&str, Vec<Accessor<'_>>), TemplateRenderError> {
    let base_end = name.find(['.', '[']).unwrap_or(name.len());
    let base = &name[..base_end];
    let mut rest = &name[base_end..];
    let mut accessors = Vec::new();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            if end == 0 {
                return Err(format_err("empty attribute in format string"));
            }
            accessors.push(Accessor::Attr(&after[..end]));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| format_err("missing ']' in format string"))?;
            accessors.push(Accessor::Index(&after[..end]));
            rest = &after[end + 1..];
            if !(rest.is_empty() || rest.starts_with(['.', '['])) {
                return Err(format_err(
                    "only '.' or '[' may follow ']' in format field specifier",
                ));
            }
        } else {
            return Err(format_err(format!("invalid field name {name:?}")));
        }
    }
    Ok((base, accessors))
}

// ── Lookup ──────────────────────────────────────────────────────────────

static EMPTY: Value = Value::String(String::new());

fn resolve<'v>(
    field: &Field<'_>,
    variables: &'v Variables,
    options: RenderOptions,
) -> Result<Cow<'v, Value>, TemplateRenderError> {
    if field.base.is_empty() || field.base.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format_err(format!(
            "positional placeholder {{{}}} is not supported; use a variable name",
            field.base
        )));
    }
    let mut value: Cow<'v, Value> = match variables.get(field.base) {
        Some(v) => Cow::Borrowed(v),
        None => match options.missing_variables {
            MissingVariables::Error => {
                return Err(TemplateRenderError::MissingVariable(field.base.to_string()));
            }
            MissingVariables::Empty => Cow::Borrowed(&EMPTY),
        },
    };

    for accessor in &field.accessors {
        value = match (accessor, value) {
            (Accessor::Attr(key) | Accessor::Index(key), Cow::Borrowed(Value::Object(map))) => {
                Cow::Borrowed(lookup_key(map, key)?)
            }
            (Accessor::Attr(key) | Accessor::Index(key), Cow::Owned(Value::Object(map))) => {
                Cow::Owned(lookup_key(&map, key)?.clone())
            }
            (Accessor::Index(idx), v) => Cow::Owned(index_into(&v, idx)?),
            (Accessor::Attr(attr), v) => {
                return Err(format_err(format!(
                    "'{}' object has no attribute '{attr}'",
                    type_label(&v)
                )));
            }
        };
    }
    Ok(value)
}

fn lookup_key<'m>(map: &'m Map<String, Value>, key: &str) -> Result<&'m Value, TemplateRenderError> {
    map.get(key)
        .ok_or_else(|| TemplateRenderError::MissingVariable(key.to_string()))
}

fn index_into(value: &Value, idx: &str) -> Result<Value, TemplateRenderError> {
    let position = idx.parse::<usize>().ok();
    match value {
        Value::Array(items) => {
            let i = position.ok_or_else(|| {
                format_err("list indices must be integers or slices, not str")
            })?;
            items
                .get(i)
                .cloned()
                .ok_or_else(|| format_err("list index out of range"))
        }
        Value::String(s) => {
            let i = position.ok_or_else(|| format_err("string indices must be integers"))?;
            s.chars()
                .nth(i)
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| format_err("string index out of range"))
        }
        other => Err(format_err(format!(
            "'{}' object is not subscriptable",
            type_label(other)
        ))),
    }
}

// ── Value text ───────────────────────────────────────────────────────────

fn type_label(v: &Value) -> &'static str {
    match v {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Shortest round-trip float text, always with a fraction or exponent.
fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".into();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{f:e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exp.abs());
    }
    let s = format!("{f}");
    if s.contains('.') { s } else { format!("{s}.0") }
}

fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn number_value(n: &serde_json::Number) -> Formattable {
    if let Some(i) = n.as_i64() {
        Formattable::Int(i128::from(i))
    } else if let Some(u) = n.as_u64() {
        Formattable::Int(i128::from(u))
    } else {
        Formattable::Float(n.as_f64().unwrap_or_default())
    }
}

/// Display text for `!s` and plain fields.
fn value_str(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => value_repr(other),
    }
}

/// Quoted text for `!r`.
fn value_repr(v: &Value) -> String {
    match v {
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => match number_value(n) {
            Formattable::Float(f) => float_repr(f),
            Formattable::Int(i) => i.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => quote_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(value_repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote_str(k), value_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

// ── Format specs ────────────────────────────────────────────────────────

enum Formattable {
    Str(String),
    Int(i128),
    Float(f64),
    Bool(bool),
    Other { type_name: &'static str, text: String },
}

#[derive(Default)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

fn parse_spec(spec: &str) -> Result<Spec, TemplateRenderError> {
    let chars: Vec<char> = spec.chars().collect();
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    let mut s = Spec::default();
    let mut i = 0;

    if chars.len() >= 2 && is_align(chars[1]) {
        s.fill = Some(chars[0]);
        s.align = Some(chars[1]);
        i = 2;
    } else if chars.first().is_some_and(|&c| is_align(c)) {
        s.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&(c @ ('+' | '-' | ' '))) = chars.get(i) {
        s.sign = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        s.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        s.zero = true;
        i += 1;
    }
    let digits = |i: &mut usize| -> Option<usize> {
        let start = *i;
        while chars.get(*i).is_some_and(char::is_ascii_digit) {
            *i += 1;
        }
        (*i > start).then(|| chars[start..*i].iter().collect::<String>().parse().ok())?
    };
    s.width = digits(&mut i).unwrap_or(0);
    if let Some(&(c @ (',' | '_'))) = chars.get(i) {
        s.grouping = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        s.precision = Some(digits(&mut i).ok_or_else(|| format_err("format specifier missing precision"))?);
    }
    if let Some(&c) = chars.get(i) {
        s.ty = Some(c);
        i += 1;
    }
    if i < chars.len() {
        return Err(format_err(format!("invalid format specifier '{spec}'")));
    }
    Ok(s)
}

fn format_field(value: &Value, conversion: Option<char>, spec: &str) -> Result<String, TemplateRenderError> {
    let item = match conversion {
        Some('s') => Formattable::Str(value_str(value)),
        Some('r' | 'a') => Formattable::Str(value_repr(value)),
        Some(c) => return Err(format_err(format!("unknown conversion specifier {c}"))),
        None => match value {
            Value::String(s) => Formattable::Str(s.clone()),
            Value::Number(n) => number_value(n),
            Value::Bool(b) => Formattable::Bool(*b),
            other => Formattable::Other {
                type_name: type_label(other),
                text: value_str(other),
            },
        },
    };

    if spec.is_empty() {
        return Ok(match item {
            Formattable::Str(s) => s,
            Formattable::Int(i) => i.to_string(),
            Formattable::Float(f) => float_repr(f),
            Formattable::Bool(b) => (if b { "True" } else { "False" }).to_string(),
            Formattable::Other { text, .. } => text,
        });
    }

    let spec = parse_spec(spec)?;
    match item {
        Formattable::Str(s) => format_str(&s, &spec),
        Formattable::Int(i) => format_int(i, &spec),
        Formattable::Bool(b) => format_int(i128::from(b), &spec),
        Formattable::Float(f) => format_float(f, &spec),
        Formattable::Other { type_name, .. } => Err(format_err(format!(
            "unsupported format string passed to {type_name}.__format__"
        ))),
    }
}

fn format_str(s: &str, spec: &Spec) -> Result<String, TemplateRenderError> {
    if let Some(t) = spec.ty.filter(|&t| t != 's') {
        return Err(format_err(format!("unknown format code '{t}' for object of type 'str'")));
    }
    if spec.sign.is_some() {
        return Err(format_err("sign not allowed in string format specifier"));
    }
    if spec.grouping.is_some() {
        return Err(format_err("cannot specify grouping with 's'"));
    }
    if spec.align == Some('=') {
        return Err(format_err("'=' alignment not allowed in string format specifier"));
    }
    let body: String = match spec.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    let (fill, align) = fill_align(spec, '<');
    Ok(pad("", &body, fill, align, spec.width))
}

fn format_int(n: i128, spec: &Spec) -> Result<String, TemplateRenderError> {
    let digits = match spec.ty {
        None | Some('d') => {
            if spec.precision.is_some() {
                return Err(format_err("precision not allowed in integer format specifier"));
            }
            group(&n.unsigned_abs().to_string(), spec.grouping)
        }
        Some('x') | Some('X') => {
            let hex = format!("{:x}", n.unsigned_abs());
            let hex = if spec.ty == Some('X') { hex.to_uppercase() } else { hex };
            match (spec.alternate, spec.ty) {
                (true, Some('X')) => format!("0X{hex}"),
                (true, _) => format!("0x{hex}"),
                _ => hex,
            }
        }
        Some('f' | '%') => return format_float(n as f64, spec),
        Some(t) => {
            return Err(format_err(format!("unknown format code '{t}' for object of type 'int'")));
        }
    };
    Ok(finish_number(n < 0, &digits, spec))
}

fn format_float(f: f64, spec: &Spec) -> Result<String, TemplateRenderError> {
    let body = match spec.ty {
        Some('f') => fixed(f.abs(), spec.precision.unwrap_or(6), spec.grouping),
        Some('%') => format!("{}%", fixed(f.abs() * 100.0, spec.precision.unwrap_or(6), spec.grouping)),
        None if spec.precision.is_none() => {
            let repr = float_repr(f.abs());
            match repr.split_once('.') {
                Some((int, frac)) if !frac.contains('e') => format!("{}.{frac}", group(int, spec.grouping)),
                _ => repr,
            }
        }
        None => {
            return Err(format_err("float precision needs an explicit 'f' or '%' type"));
        }
        Some(t) => {
            return Err(format_err(format!("unknown format code '{t}' for object of type 'float'")));
        }
    };
    Ok(finish_number(f.is_sign_negative() && f != 0.0, &body, spec))
}

fn fixed(abs: f64, precision: usize, grouping: Option<char>) -> String {
    let text = format!("{abs:.precision$}");
    match text.split_once('.') {
        Some((int, frac)) => format!("{}.{frac}", group(int, grouping)),
        None => group(&text, grouping),
    }
}

fn group(int_digits: &str, sep: Option<char>) -> String {
    let Some(sep) = sep else {
        return int_digits.to_string();
    };
    let len = int_digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in int_digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn finish_number(negative: bool, body: &str, spec: &Spec) -> String {
    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    };
    let (fill, align) = fill_align(spec, '>');
    pad(sign, body, fill, align, spec.width)
}

fn fill_align(spec: &Spec, default_align: char) -> (char, char) {
    match (spec.fill, spec.align, spec.zero) {
        (Some(f), Some(a), _) => (f, a),
        (None, Some(a), true) => ('0', a),
        (None, Some(a), false) => (' ', a),
        (_, None, true) if default_align == '>' => ('0', '='),
        (_, None, true) => ('0', default_align),
        (_, None, false) => (' ', default_align),
    }
}

fn pad(sign: &str, body: &str, fill: char, align: char, width: usize) -> String {
    let len = sign.chars().count() + body.chars().count();
    if width <= len {
        return format!("{sign}{body}");
    }
    let n = width - len;
    let fill_n = |k: usize| std::iter::repeat_n(fill, k).collect::<String>();
    match align {
        '<' => format!("{sign}{body}{}", fill_n(n)),
        '^' => format!("{}{sign}{body}{}", fill_n(n / 2), fill_n(n - n / 2)),
        '=' => format!("{sign}{}{body}", fill_n(n)),
        _ => format!("{}{sign}{body}", fill_n(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(v: Value) -> Variables {
        match v {
            Value::Object(m) => m,
            _ => panic!("variables must be an object"),
        }
    }

    fn render(t: &str, v: Value) -> Result<String, TemplateRenderError> {
        render_text(t, &vars(v), RenderOptions::STRICT)
    }

    #[test]
    fn substitutes_names() {
        assert_eq!(render("Hello {name}!", json!({"name": "World"})).unwrap(), "Hello World!");
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(render("{{x}} = {x}", json!({"x": 1})).unwrap(), "{x} = 1");
    }

    #[test]
    fn missing_variable_strict_and_empty() {
        let err = render("{sku}", json!({})).unwrap_err();
        assert_eq!(err, TemplateRenderError::MissingVariable("sku".into()));

        let opts = RenderOptions {
            missing_variables: MissingVariables::Empty,
        };
        assert_eq!(render_text("[{sku}]", &Variables::new(), opts).unwrap(), "[]");
    }

    #[test]
    fn json_scalars_print_as_literals() {
        let v = json!({"t": true, "f": false, "n": null, "i": 7, "x": 2.0, "y": 1.5});
        assert_eq!(render("{t} {f} {n} {i} {x} {y}", v).unwrap(), "True False None 7 2.0 1.5");
    }

    #[test]
    fn containers_print_as_literals() {
        let v = json!({"a": [1, "b", null]});
        assert_eq!(render("{a}", v).unwrap(), "[1, 'b', None]");
    }

    #[test]
    fn attribute_and_index_access() {
        let v = json!({"item": {"sku": "A-1", "dims": [10, 20]}, "rows": ["x", "y"]});
        assert_eq!(
            render("{item.sku} {item[dims][1]} {rows[0]}", v).unwrap(),
            "A-1 20 x"
        );
    }

    #[test]
    fn conversions() {
        let v = json!({"s": "hi", "q": "it's"});
        assert_eq!(render("{s!r} {q!r} {s!s}", v).unwrap(), "'hi' \"it's\" hi");
    }

    #[test]
    fn numeric_format_specs() {
        let v = json!({"p": 3.14159, "n": 42, "big": 1234567, "h": 255, "r": 0.25, "neg": -5});
        assert_eq!(render("{p:.2f}", v.clone()).unwrap(), "3.14");
        assert_eq!(render("{n:05d}", v.clone()).unwrap(), "00042");
        assert_eq!(render("{big:,}", v.clone()).unwrap(), "1,234,567");
        assert_eq!(render("{h:x} {h:#X}", v.clone()).unwrap(), "ff 0XFF");
        assert_eq!(render("{r:.0%}", v.clone()).unwrap(), "25%");
        assert_eq!(render("{neg:+d} {n:+d}", v.clone()).unwrap(), "-5 +42");
        assert_eq!(render("{neg:06d}", v).unwrap(), "-00005");
    }

    #[test]
    fn string_format_specs() {
        let v = json!({"s": "abc"});
        assert_eq!(render("{s:>6}|", v.clone()).unwrap(), "   abc|");
        assert_eq!(render("{s:*^7}", v.clone()).unwrap(), "**abc**");
        assert_eq!(render("{s:<5}|", v.clone()).unwrap(), "abc  |");
        assert_eq!(render("{s:.2}", v.clone()).unwrap(), "ab");
        assert!(render("{s:d}", v).is_err());
    }

    #[test]
    fn malformed_templates_are_format_errors() {
        for t in ["{unclosed", "oops }", "{0}", "{}", "{a!}", "{a!x}"] {
            let err = render(t, json!({"a": 1})).unwrap_err();
            assert!(matches!(err, TemplateRenderError::Format(_)), "{t}: {err:?}");
        }
    }

    #[test]
    fn placeholder_names_reports_base_names_once() {
        let names = placeholder_names("A {a.b} {c[0]:>3} {{x}} {a}").unwrap();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn preflight_finds_missing_variable_anywhere_in_tree() {
        let template: Template = serde_json::from_value(json!({
            "schema_version": 1,
            "defaults": {"render": {"missing_variables": "empty"}},
            "layout": {"kind": "split", "direction": "v", "ratio": 0.5, "children": [
                {"kind": "leaf", "elements": [{"type": "text", "text": "{title}"}]},
                {"kind": "leaf", "elements": [{"type": "qr", "data": "{sku}"}]}
            ]}
        }))
        .unwrap();
        assert_eq!(template_strings(&template), ["{title}", "{sku}"]);
        let err = assert_variables_present(&template, &vars(json!({"title": "x"}))).unwrap_err();
        assert_eq!(err, TemplateRenderError::MissingVariable("sku".into()));
        assert!(assert_variables_present(&template, &vars(json!({"title": 1, "sku": 2}))).is_ok());
    }

    #[test]
    fn float_repr_round_trips() {
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.00001), "1e-05");
        assert_eq!(float_repr(-0.5), "-0.5");
    }
}
