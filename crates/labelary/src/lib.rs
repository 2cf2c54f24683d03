//! Client for a Labelary-compatible ZPL rendering service.
//!
//! [`LabelaryClient`] posts ZPL to `{base_url}/v1/printers/{dpmm}dpmm/labels/{w}x{h}/{index}/`
//! and returns the rendered PNG, or the linter warnings the service reports
//! in its `X-Warnings` header. Requests from one client (and its clones) are
//! spaced by [`LabelaryConfig::min_request_interval`] and HTTP 429 responses
//! are retried per [`RetryConfig`].
//!
//! The client implements [`zplgrid_core::RenderOracle`], so it can back
//! [`zplgrid_core::OracleTextMeasurer`]:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use zplgrid_core::{Compiler, MeasurerConfig, OracleTextMeasurer};
//! use zplgrid_labelary::{LabelaryClient, LabelaryConfig};
//!
//! let client = LabelaryClient::new(LabelaryConfig::default())?;
//! let measurer = OracleTextMeasurer::new(MeasurerConfig::default(), Some(Arc::new(client)))?;
//! let compiler = Compiler::new(Box::new(measurer));
//! # let _ = compiler;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;
mod config;
mod error;
mod rate_limit;
mod retry;
mod warnings;

pub use client::LabelaryClient;
pub use config::{LABELARY_ENABLE_ENV, LabelaryConfig, RetryConfig};
pub use error::LabelaryError;
pub use warnings::{LabelaryWarning, parse_warnings};
