//! Blocking HTTP client.

use std::error::Error;
use std::fmt::Write as _;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use zplgrid_core::{RenderOracle, RenderRequest};

use crate::config::LabelaryConfig;
use crate::error::LabelaryError;
use crate::rate_limit::RateLimiter;
use crate::retry::retry_op;
use crate::warnings::{LabelaryWarning, parse_warnings};

const WARNINGS_HEADER: &str = "X-Warnings";
const LINTER_HEADER: &str = "X-Linter";

/// Renders ZPL through a Labelary-compatible service.
///
/// Cloning is cheap; clones share the connection pool and request spacing.
#[derive(Debug, Clone)]
pub struct LabelaryClient {
    http: Client,
    config: LabelaryConfig,
    limiter: RateLimiter,
}

impl LabelaryClient {
    /// Build a client.
    ///
    /// Fails when the base URL is empty, `retry.max_attempts` is zero, or
    /// the HTTP stack cannot be initialized.
    pub fn new(config: LabelaryConfig) -> Result<Self, LabelaryError> {
        if config.base_url.trim().is_empty() {
            return Err(LabelaryError::InvalidConfig("base_url must not be empty".into()));
        }
        if config.retry.max_attempts == 0 {
            return Err(LabelaryError::InvalidConfig(
                "retry.max_attempts must be >= 1".into(),
            ));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            limiter: RateLimiter::new(config.min_request_interval),
            config,
        })
    }

    /// Current settings.
    pub fn config(&self) -> &LabelaryConfig {
        &self.config
    }

    /// Render label `index` of `zpl` to PNG bytes.
    pub fn render_png(
        &self,
        zpl: &str,
        dpmm: u32,
        width_in: f64,
        height_in: f64,
        index: u32,
    ) -> Result<Vec<u8>, LabelaryError> {
        let url = self.label_url(dpmm, width_in, height_in, index);
        let response = self.post(&url, zpl, false)?;
        Ok(response.bytes()?.to_vec())
    }

    /// Run the service's linter over `zpl` and return its warnings.
    ///
    /// The program is compacted (lines trimmed and joined) first so that
    /// reported byte offsets do not depend on indentation.
    pub fn lint(
        &self,
        zpl: &str,
        dpmm: u32,
        width_in: f64,
        height_in: f64,
        index: u32,
    ) -> Result<Vec<LabelaryWarning>, LabelaryError> {
        let url = self.label_url(dpmm, width_in, height_in, index);
        let response = self.post(&url, &compact_zpl(zpl), true)?;
        let header = response
            .headers()
            .get(WARNINGS_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let warnings = parse_warnings(header);
        tracing::debug!(count = warnings.len(), "labelary lint finished");
        Ok(warnings)
    }

    fn label_url(&self, dpmm: u32, width_in: f64, height_in: f64, index: u32) -> String {
        let mut url = self.config.base_url.trim_end_matches('/').to_string();
        let _ = write!(
            url,
            "/v1/printers/{dpmm}dpmm/labels/{}x{}/{index}/",
            format_inches(width_in),
            format_inches(height_in),
        );
        url
    }

    fn post(&self, url: &str, zpl: &str, linter: bool) -> Result<Response, LabelaryError> {
        retry_op(&self.config.retry, || {
            self.limiter.wait();
            tracing::debug!(url, bytes = zpl.len(), linter, "labelary request");
            let mut request = self
                .http
                .post(url)
                .header(ACCEPT, "image/png")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(zpl.to_owned());
            if linter {
                request = request.header(LINTER_HEADER, "On");
            }
            let response = request.send()?;
            let status = response.status();
            if status == StatusCode::OK {
                return Ok(response);
            }
            Err(LabelaryError::Http {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            })
        })
    }
}

impl RenderOracle for LabelaryClient {
    fn render_png(
        &self,
        request: &RenderRequest<'_>,
    ) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        Ok(LabelaryClient::render_png(
            self,
            request.zpl,
            request.dpmm,
            request.width_in,
            request.height_in,
            0,
        )?)
    }
}

/// Drop blank lines and surrounding whitespace, joining what remains.
fn compact_zpl(zpl: &str) -> String {
    zpl.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// Inch value as it appears in the label path: whole numbers keep one
/// decimal (`4.0`), everything else uses the shortest exact form.
fn format_inches(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inches_format() {
        assert_eq!(format_inches(4.0), "4.0");
        assert_eq!(format_inches(6.0), "6.0");
        assert_eq!(format_inches(2.5), "2.5");
        assert_eq!(format_inches(74.0 / 25.4), "2.9133858267716537");
    }

    #[test]
    fn compaction_trims_and_joins() {
        assert_eq!(compact_zpl("^XA\n  ^FO0,0\n\n^FDx^FS  \r\n^XZ\n"), "^XA^FO0,0^FDx^FS^XZ");
    }

    #[test]
    fn url_layout() {
        let client = LabelaryClient::new(LabelaryConfig::default().with_base_url("http://localhost:1/")).unwrap();
        assert_eq!(
            client.label_url(8, 4.0, 6.0, 0),
            "http://localhost:1/v1/printers/8dpmm/labels/4.0x6.0/0/"
        );
        assert_eq!(
            client.label_url(12, 2.5, 1.25, 3),
            "http://localhost:1/v1/printers/12dpmm/labels/2.5x1.25/3/"
        );
    }

    #[test]
    fn config_is_checked() {
        let err = LabelaryClient::new(LabelaryConfig::default().with_base_url(" ")).unwrap_err();
        assert!(matches!(err, LabelaryError::InvalidConfig(_)));
        let mut cfg = LabelaryConfig::default();
        cfg.retry.max_attempts = 0;
        assert!(LabelaryClient::new(cfg).is_err());
    }
}
