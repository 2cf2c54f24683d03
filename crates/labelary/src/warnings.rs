//! Linter warnings reported in the `X-Warnings` response header.

use serde::Serialize;

/// Fields per warning in the pipe-delimited header.
const FIELDS: usize = 5;

/// One linter finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelaryWarning {
    /// Byte offset of the offending command in the submitted ZPL.
    pub byte_index: u64,
    /// Length of the offending span in bytes.
    pub byte_size: u64,
    /// Command name such as `^GB`; empty for label-level findings.
    pub command: String,
    /// 1-based parameter position, when the finding concerns one parameter.
    pub param_index: Option<u32>,
    /// Human-readable description.
    pub message: String,
}

/// Parse an `X-Warnings` header.
///
/// The header is a flat `|`-separated list, five fields per warning:
/// `byte_index|byte_size|command|param_index|message`. A trailing partial
/// group is dropped; unparseable offsets read as 0 and an empty or
/// unparseable parameter index as `None`.
pub fn parse_warnings(header: &str) -> Vec<LabelaryWarning> {
    if header.is_empty() {
        return Vec::new();
    }
    let parts: Vec<&str> = header.split('|').collect();
    parts
        .chunks_exact(FIELDS)
        .map(|group| LabelaryWarning {
            byte_index: group[0].trim().parse().unwrap_or(0),
            byte_size: group[1].trim().parse().unwrap_or(0),
            command: group[2].to_string(),
            param_index: group[3].trim().parse().ok(),
            message: group[4].to_string(),
        })
        .collect()
}
