//! # Packet Codec
//!
//! Decoding of request lines and splitting of their payloads into fields.
//!
//! A request line looks like `OPCODE#field1?field2?field3`. The opcode is
//! everything up to and including the first `#`; the payload is the rest of
//! the line. Payloads are split on `?` into a fixed number of positional
//! fields that depends on the opcode.

use crate::error::ProtocolError;
use std::fmt::Write as _;
use std::str::FromStr;

/// Character terminating every opcode.
pub const TERMINATOR: char = '#';

/// Character separating payload fields.
pub const FIELD_SEPARATOR: char = '?';

/// Payload (or bare line) that asks the server to close the connection.
pub const STOP_SENTINEL: &str = "STOP";

/// A decoded request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Opcode including its trailing terminator, e.g. `BR#`.
    pub opcode: &'a str,
    /// Everything after the opcode.
    pub payload: &'a str,
}

/// Decodes one request line into its opcode and payload.
///
/// Surrounding whitespace (including the line terminator) is trimmed first.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPacket`] if the line contains no `#`.
pub fn decode(line: &str) -> Result<Frame<'_>, ProtocolError> {
    let data = line.trim();
    let end = data
        .find(TERMINATOR)
        .ok_or_else(|| ProtocolError::MalformedPacket(data.to_string()))?;
    let (opcode, payload) = data.split_at(end + TERMINATOR.len_utf8());
    Ok(Frame { opcode, payload })
}

/// Splits a payload into exactly `N` positional fields.
///
/// Fields beyond the first `N` are ignored, matching clients that append
/// trailing data to older opcodes.
///
/// ```rust
/// use bitrealm_protocol::split_fields;
///
/// let [request, account] = split_fields::<2>("r?a?extra").unwrap();
/// assert_eq!((request, account), ("r", "a"));
/// assert!(split_fields::<3>("r?a").is_err());
/// ```
///
/// # Errors
///
/// Returns [`ProtocolError::ArityMismatch`] if fewer than `N` fields exist.
pub fn split_fields<const N: usize>(payload: &str) -> Result<[&str; N], ProtocolError> {
    let mut fields = [""; N];
    let mut parts = payload.split(FIELD_SEPARATOR);
    for (index, slot) in fields.iter_mut().enumerate() {
        *slot = parts.next().ok_or(ProtocolError::ArityMismatch {
            expected: N,
            found: index,
        })?;
    }
    Ok(fields)
}

/// Parses a single field, naming it in the error on failure.
pub fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.trim().parse().map_err(|_| ProtocolError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Parses a bracketed reward matrix such as `[1,0,1]`.
///
/// An empty matrix `[]` is accepted and yields no flags.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedRewardMatrix`] when the brackets are
/// missing or an entry is anything other than `0` or `1`.
pub fn parse_reward_matrix(raw: &str) -> Result<Vec<u8>, ProtocolError> {
    let malformed = || ProtocolError::MalformedRewardMatrix(raw.to_string());

    let inner = raw
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(malformed)?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|flag| match flag.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            _ => Err(malformed()),
        })
        .collect()
}

/// Escapes outgoing text the way clients expect to unquote it.
///
/// Printable ASCII passes through unchanged except `"` and `\`, which are
/// backslash-escaped. Control characters use their short escapes (`\n`,
/// `\t`, ...) or `\xNN`, and anything outside ASCII becomes `\uNNNN` (or
/// `\UNNNNNNNN` above the basic multilingual plane). The output is therefore
/// always pure ASCII, so byte-level partitioning never splits a character.
pub fn escape_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            ' '..='~' => out.push(ch),
            c if (c as u32) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) <= 0xFFFF => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_opcode_and_payload() {
        let frame = decode("BR#req?acc?00001\n").unwrap();
        assert_eq!(frame.opcode, "BR#");
        assert_eq!(frame.payload, "req?acc?00001");
    }

    #[test]
    fn test_decode_uses_first_terminator_only() {
        let frame = decode("TT#hello#world").unwrap();
        assert_eq!(frame.opcode, "TT#");
        assert_eq!(frame.payload, "hello#world");
    }

    #[test]
    fn test_decode_rejects_line_without_terminator() {
        let err = decode("garbage").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPacket(ref line) if line == "garbage"));
    }

    #[test]
    fn test_split_fields_reports_arity() {
        let err = split_fields::<4>("a?b").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ArityMismatch {
                expected: 4,
                found: 2
            }
        ));
    }

    #[test]
    fn test_split_fields_on_empty_payload_yields_one_empty_field() {
        let [only] = split_fields::<1>("").unwrap();
        assert_eq!(only, "");
        assert!(split_fields::<2>("").is_err());
    }

    #[test]
    fn test_parse_field_names_the_field() {
        let err = parse_field::<f64>("streamed_exp", "lots").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "streamed_exp", .. }));
        assert_eq!(parse_field::<f64>("streamed_exp", " 12.5 ").unwrap(), 12.5);
    }

    #[test]
    fn test_parse_reward_matrix() {
        assert_eq!(parse_reward_matrix("[1,0,1]").unwrap(), vec![1, 0, 1]);
        assert_eq!(parse_reward_matrix("[1]").unwrap(), vec![1]);
        assert_eq!(parse_reward_matrix(" [0, 1] ").unwrap(), vec![0, 1]);
        assert!(parse_reward_matrix("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_reward_matrix_rejects_garbage() {
        assert!(parse_reward_matrix("1,0,1").is_err());
        assert!(parse_reward_matrix("[1,2]").is_err());
        assert!(parse_reward_matrix("[1,,0]").is_err());
    }

    #[test]
    fn test_escape_ascii() {
        assert_eq!(escape_ascii(r#"?{"a":1}"#), r#"?{\"a\":1}"#);
        assert_eq!(escape_ascii("line\nbreak\\"), "line\\nbreak\\\\");
        assert_eq!(escape_ascii("café"), "caf\\u00e9");
        assert_eq!(escape_ascii("\u{1F409}"), "\\U0001f409");
        assert_eq!(escape_ascii("\u{01}"), "\\x01");
        assert!(escape_ascii("ドラゴン").is_ascii());
    }
}
