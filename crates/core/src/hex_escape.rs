//! Field-data hex escaping for `^FH`.
//!
//! With `^FH` active, `{indicator}XX` in field data stands for the byte
//! `0xXX`. [`encode_field_data`] produces such data from arbitrary UTF-8
//! text; [`decode_hex_escapes`] and [`validate_hex_escapes`] read it back.

use std::fmt::Write as _;

/// Result of [`encode_field_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField {
    /// Whether any escape was written (the field then needs `^FH`).
    pub needs_hex: bool,
    /// Text safe to place after `^FD`.
    pub data: String,
}

/// Bytes that pass through unescaped: printable ASCII minus `^` and `~`.
fn is_passthrough(b: u8) -> bool {
    (0x20..0x7F).contains(&b) && b != b'^' && b != b'~'
}

/// Encode `text` for `^FD` using `indicator` as the `^FH` escape character.
///
/// Every UTF-8 byte outside the pass-through set, and the indicator itself,
/// is written as `{indicator}{byte:02X}`.
pub fn encode_field_data(text: &str, indicator: char) -> EncodedField {
    let mut data = String::with_capacity(text.len());
    let mut needs_hex = false;
    for b in text.bytes() {
        if is_passthrough(b) && char::from(b) != indicator {
            data.push(char::from(b));
        } else {
            needs_hex = true;
            let _ = write!(data, "{indicator}{b:02X}");
        }
    }
    EncodedField { needs_hex, data }
}

/// A malformed escape sequence at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexEscapeError {
    /// Byte offset of the indicator.
    pub offset: usize,
    /// What is wrong with the sequence.
    pub message: String,
}

enum Token<'a> {
    Literal(&'a [u8]),
    Byte(u8),
    Bad(HexEscapeError, &'a [u8]),
}

/// Walk `content`, yielding literal runs, decoded bytes, and bad sequences.
fn scan<'a>(content: &'a str, indicator: &'a [u8]) -> impl Iterator<Item = Token<'a>> + 'a {
    let bytes = content.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        if i >= bytes.len() {
            return None;
        }
        if !bytes[i..].starts_with(indicator) {
            let start = i;
            while i < bytes.len() && !bytes[i..].starts_with(indicator) {
                i += 1;
            }
            return Some(Token::Literal(&bytes[start..i]));
        }
        let at = i;
        let digits = at + indicator.len();
        if digits + 2 > bytes.len() {
            i = bytes.len();
            let message = format!(
                "incomplete hex escape at offset {at} (expected two hex digits after the indicator)"
            );
            return Some(Token::Bad(HexEscapeError { offset: at, message }, &bytes[at..]));
        }
        i = digits + 2;
        let pair = &bytes[digits..digits + 2];
        match std::str::from_utf8(pair)
            .ok()
            .and_then(|s| u8::from_str_radix(s, 16).ok())
        {
            Some(b) if pair.iter().all(u8::is_ascii_hexdigit) => Some(Token::Byte(b)),
            _ => {
                let message = format!(
                    "invalid hex escape {:?} at offset {at}",
                    String::from_utf8_lossy(&bytes[at..i])
                );
                Some(Token::Bad(HexEscapeError { offset: at, message }, &bytes[at..i]))
            }
        }
    })
}

/// List every malformed escape in `content`.
pub fn validate_hex_escapes(content: &str, indicator: char) -> Vec<HexEscapeError> {
    let mut buf = [0u8; 4];
    let ind = indicator.encode_utf8(&mut buf).as_bytes();
    scan(content, ind)
        .filter_map(|t| match t {
            Token::Bad(e, _) => Some(e),
            _ => None,
        })
        .collect()
}

/// Decode escapes back to raw bytes.
///
/// On failure every bad sequence is reported; decoding does not stop at the
/// first one.
pub fn decode_hex_escapes(content: &str, indicator: char) -> Result<Vec<u8>, Vec<HexEscapeError>> {
    let mut buf = [0u8; 4];
    let ind = indicator.encode_utf8(&mut buf).as_bytes();
    let mut out = Vec::with_capacity(content.len());
    let mut errors = Vec::new();
    for token in scan(content, ind) {
        match token {
            Token::Literal(run) => out.extend_from_slice(run),
            Token::Byte(b) => out.push(b),
            Token::Bad(e, raw) => {
                out.extend_from_slice(raw);
                errors.push(e);
            }
        }
    }
    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}
