//! Generated `_`-prefixed variables (dates, ids, counters).
//!
//! Macros are only produced for names the template actually references and
//! the caller did not already supply. Counters live in a small JSON file;
//! daily counters restart when the stored date differs from today.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TemplateRenderError;
use crate::model::Template;
use crate::render::{Variables, placeholder_names, template_strings};

/// Environment variable naming the counter file.
pub const COUNTERS_PATH_ENV: &str = "ZPLGRID_COUNTERS_PATH";

/// Counter persistence failed.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    /// Reading or replacing the counter file failed.
    #[error("counter store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The counter map could not be serialized.
    #[error("counter store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inputs that are not part of the template itself.
#[derive(Debug, Clone)]
pub struct MacroContext {
    /// Exposed as `_template_name`; scopes the template counters.
    pub template_name: Option<String>,
    /// Exposed as `_printer_id`; scopes the printer counters.
    pub printer_id: Option<String>,
    /// Exposed as `_draft_id`.
    pub draft_id: Option<String>,
    /// Clock reading used for every date/time macro.
    pub now: DateTime<FixedOffset>,
    /// Advance and persist counters (false for previews).
    pub increment_counters: bool,
}

impl MacroContext {
    /// Context at the current local time with no ids.
    pub fn now(increment_counters: bool) -> Self {
        Self {
            template_name: None,
            printer_id: None,
            draft_id: None,
            now: Local::now().fixed_offset(),
            increment_counters,
        }
    }
}

/// JSON file holding counter state.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    /// Store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$ZPLGRID_COUNTERS_PATH`, or `counters.json`.
    pub fn from_env() -> Self {
        let path = std::env::var_os(COUNTERS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("counters.json"));
        Self { path }
    }

    /// File location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current counter map. A missing or unreadable file reads as empty.
    pub fn load(&self) -> Map<String, Value> {
        let Ok(text) = std::fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Replace the file atomically (write a sibling temp file, then rename).
    pub fn save(&self, counters: &Map<String, Value>) -> Result<(), CounterStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(counters)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Base names of every placeholder the template references.
pub fn collect_template_placeholders(
    template: &Template,
) -> Result<BTreeSet<String>, TemplateRenderError> {
    let mut used = BTreeSet::new();
    for text in template_strings(template) {
        used.extend(placeholder_names(text)?);
    }
    Ok(used)
}

/// Generate macro values for `used` names absent from `existing`.
pub fn build_macro_variables<'a>(
    used: impl IntoIterator<Item = &'a str>,
    existing: &Variables,
    context: &MacroContext,
    store: &CounterStore,
) -> Result<Variables, CounterStoreError> {
    let wanted: BTreeSet<&str> = used
        .into_iter()
        .filter(|name| !existing.contains_key(*name))
        .collect();
    let mut macros = Variables::new();
    if wanted.is_empty() {
        return Ok(macros);
    }

    let now = &context.now;
    let mut add = |name: &str, value: Value| {
        if wanted.contains(name) {
            macros.insert(name.to_string(), value);
        }
    };
    add("_now_iso", Value::String(iso_format(now)));
    add("_date_yyyy_mm_dd", now.format("%Y-%m-%d").to_string().into());
    add("_date_dd_mm_yyyy", now.format("%d.%m.%Y").to_string().into());
    add("_time_hh_mm", now.format("%H:%M").to_string().into());
    add("_time_hh_mm_ss", now.format("%H:%M:%S").to_string().into());
    add("_timestamp_ms", now.timestamp_millis().into());
    add("_uuid", uuid::Uuid::new_v4().to_string().into());
    let short = uuid::Uuid::new_v4().simple().to_string();
    add("_short_id", short[..8].to_string().into());
    if let Some(id) = &context.draft_id {
        add("_draft_id", id.clone().into());
    }
    if let Some(id) = &context.printer_id {
        add("_printer_id", id.clone().into());
    }
    if let Some(name) = &context.template_name {
        add("_template_name", name.clone().into());
    }

    let mut counters: Vec<(&str, String, bool)> = vec![
        ("_counter_global", "global".into(), false),
        ("_counter_daily", "global".into(), true),
    ];
    if let Some(id) = &context.printer_id {
        counters.push(("_counter_printer", format!("printer:{id}"), false));
        counters.push(("_counter_printer_daily", format!("printer:{id}"), true));
    }
    if let Some(name) = &context.template_name {
        counters.push(("_counter_template", format!("template:{name}"), false));
        counters.push(("_counter_template_daily", format!("template:{name}"), true));
    }
    counters.retain(|(name, ..)| wanted.contains(name));
    if counters.is_empty() {
        return Ok(macros);
    }

    let today = now.format("%Y-%m-%d").to_string();
    let mut state = store.load();
    let mut dirty = false;
    for (name, scope, daily) in counters {
        let value = next_counter(&mut state, &scope, daily, &today, context.increment_counters);
        dirty |= context.increment_counters;
        macros.insert(name.to_string(), value.into());
    }
    if dirty {
        debug!(path = %store.path().display(), "persisting macro counters");
        store.save(&state)?;
    }
    Ok(macros)
}

/// ISO 8601 with microseconds only when non-zero.
fn iso_format(now: &DateTime<FixedOffset>) -> String {
    if now.timestamp_subsec_micros() == 0 {
        now.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        now.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
    }
}

/// Current (or advanced) counter value for `scope`.
///
/// Daily counters use their own `scope:daily` entry carrying the date.
fn next_counter(
    state: &mut Map<String, Value>,
    scope: &str,
    daily: bool,
    today: &str,
    increment: bool,
) -> i64 {
    let key = if daily { format!("{scope}:daily") } else { scope.to_string() };
    let mut entry = match state.get(&key) {
        Some(Value::Object(m)) => m.clone(),
        _ => Map::new(),
    };
    if daily && entry.get("date").and_then(Value::as_str) != Some(today) {
        entry = Map::new();
        entry.insert("date".into(), today.into());
    }
    let mut value = entry.get("value").and_then(Value::as_i64).unwrap_or(0);
    if increment {
        value += 1;
        entry.insert("value".into(), value.into());
        state.insert(key, Value::Object(entry));
    }
    value
}
