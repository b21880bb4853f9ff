//! Decoding of the `extra` field carried by a signed reply.
//!
//! The field is a query-string style list: `key=value&key=value`, with both
//! keys and values percent-encoded and `+` standing for a space.

use crate::{Error, Result};
use std::collections::HashMap;

/// Decoded key/value pairs from a reply's extras.
pub type Extras = HashMap<String, String>;

/// Decodes a query-string style extras field.
///
/// Empty segments are skipped, a key without `=` maps to an empty value, and
/// a repeated key keeps its last value.
///
/// # Errors
///
/// Returns [`Error::InvalidExtras`] if the raw string is not a valid URI
/// query (a character outside the query set, or a `%` not followed by two
/// hex digits), or a key or value does not decode to valid UTF-8.
pub fn decode_extras(raw: &str) -> Result<Extras> {
    validate_query(raw)?;

    let mut extras = Extras::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        extras.insert(decode_component(name)?, decode_component(value)?);
    }
    Ok(extras)
}

/// Checks `raw` against the RFC 3986 query grammar. Non-ASCII characters
/// other than whitespace and controls are accepted unescaped.
fn validate_query(raw: &str) -> Result<()> {
    let mut chars = raw.char_indices();
    while let Some((at, c)) = chars.next() {
        match c {
            '%' => {
                let escape = raw.get(at + 1..at + 3).unwrap_or("");
                if escape.len() != 2 || !escape.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(Error::InvalidExtras(format!("malformed escape at index {at}")));
                }
                chars.nth(1);
            }
            c if is_query_char(c) => {}
            c => return Err(Error::InvalidExtras(format!("illegal character {c:?} at index {at}"))),
        }
    }
    Ok(())
}

fn is_query_char(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@/?".contains(c)
    } else {
        !c.is_whitespace() && !c.is_control()
    }
}

fn decode_component(s: &str) -> Result<String> {
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|c| c.into_owned())
        .map_err(|e| Error::InvalidExtras(format!("{s:?}: {e}")))
}
