//! Configuration types for the compiler and the oracle-backed measurer.

use std::time::Duration;

/// Opt-in switch for URL image sources.
pub const IMAGE_URL_ENABLE_ENV: &str = "ZPLGRID_ENABLE_IMAGE_URL";
/// Per-request timeout in seconds for URL image sources.
pub const IMAGE_URL_TIMEOUT_ENV: &str = "ZPLGRID_IMAGE_URL_TIMEOUT_S";
/// Size cap in bytes for URL image sources (`0` disables the cap).
pub const IMAGE_MAX_BYTES_ENV: &str = "ZPLGRID_IMAGE_MAX_BYTES";

/// Compiler settings that are not part of the template.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// URL image source policy.
    pub image_fetch: ImageFetchConfig,
}

impl CompilerConfig {
    /// Read every switch from the environment.
    pub fn from_env() -> Self {
        Self {
            image_fetch: ImageFetchConfig::from_env(),
        }
    }
}

/// Policy for `source.kind = "url"` images.
///
/// Disabled by default: a template should not make the compiler reach out to
/// the network unless the deployment asks for it.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFetchConfig {
    /// Whether URL sources are allowed at all.
    pub enabled: bool,
    /// Overall timeout per fetch.
    pub timeout: Duration,
    /// Largest accepted body; `None` accepts any size.
    pub max_bytes: Option<u64>,
}

impl Default for ImageFetchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: Duration::from_secs(5),
            max_bytes: Some(5_000_000),
        }
    }
}

impl ImageFetchConfig {
    /// Enabled, with default limits.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Read the `ZPLGRID_*` image switches; unparsable numbers keep defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let enabled = get(IMAGE_URL_ENABLE_ENV).is_some_and(|v| env_flag(&v));
        let timeout = get(IMAGE_URL_TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .unwrap_or(defaults.timeout);
        let max_bytes = match get(IMAGE_MAX_BYTES_ENV).map(|v| v.trim().parse::<i64>()) {
            Some(Ok(n)) if n <= 0 => None,
            Some(Ok(n)) => Some(n.unsigned_abs()),
            _ => defaults.max_bytes,
        };
        Self {
            enabled,
            timeout,
            max_bytes,
        }
    }
}

/// `1`, `true`, `yes`, `on` (any case) enable a flag.
pub(crate) fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Settings for [`crate::measure::OracleTextMeasurer`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurerConfig {
    /// Print density passed to the oracle (dots per millimeter).
    pub dpmm: u32,
    /// Initial label width for a measurement render.
    pub label_width_in: f64,
    /// Initial label height for a measurement render.
    pub label_height_in: f64,
    /// Luma below which a pixel counts as ink.
    pub threshold: u8,
    /// Render attempts while ink touches the label edge.
    pub max_attempts: u32,
    /// Emit `^CI28` in measurement snippets.
    pub use_utf8: bool,
}

impl Default for MeasurerConfig {
    fn default() -> Self {
        Self {
            dpmm: 8,
            label_width_in: 4.0,
            label_height_in: 6.0,
            threshold: 250,
            max_attempts: 5,
            use_utf8: true,
        }
    }
}

impl MeasurerConfig {
    /// Same settings at the density matching `dpi` (at least 1 dpmm).
    pub fn for_dpi(&self, dpi: u32) -> Self {
        let dpmm = (f64::from(dpi) / 25.4).round().max(1.0) as u32;
        Self {
            dpmm,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn image_fetch_defaults() {
        let cfg = ImageFetchConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, ImageFetchConfig::default());
        assert!(!cfg.enabled);
        assert_eq!(cfg.max_bytes, Some(5_000_000));
    }

    #[test]
    fn image_fetch_reads_switches() {
        let cfg = ImageFetchConfig::from_lookup(lookup(&[
            (IMAGE_URL_ENABLE_ENV, " Yes "),
            (IMAGE_URL_TIMEOUT_ENV, "2.5"),
            (IMAGE_MAX_BYTES_ENV, "0"),
        ]));
        assert!(cfg.enabled);
        assert_eq!(cfg.timeout, Duration::from_millis(2500));
        assert_eq!(cfg.max_bytes, None);
    }

    #[test]
    fn bad_numbers_keep_defaults() {
        let cfg = ImageFetchConfig::from_lookup(lookup(&[
            (IMAGE_URL_ENABLE_ENV, "nope"),
            (IMAGE_URL_TIMEOUT_ENV, "soon"),
            (IMAGE_MAX_BYTES_ENV, "lots"),
        ]));
        assert!(!cfg.enabled);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_bytes, Some(5_000_000));
    }

    #[test]
    fn measurer_density_follows_dpi() {
        let base = MeasurerConfig::default();
        assert_eq!(base.for_dpi(203).dpmm, 8);
        assert_eq!(base.for_dpi(300).dpmm, 12);
        assert_eq!(base.for_dpi(600).dpmm, 24);
        assert_eq!(base.for_dpi(10).dpmm, 1);
        assert_eq!(base.for_dpi(300).threshold, 250);
    }
}
