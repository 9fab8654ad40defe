//! PEM-style ASCII armor around a binary message
//!
//! ```text
//! -----BEGIN AGE ENCRYPTED FILE-----
//! <padded standard base64, 64 columns, last line may be shorter>
//! -----END AGE ENCRYPTED FILE-----
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use page_core::{PageError, PageResult};

use crate::format::COLUMNS_PER_LINE;

const ARMOR_BEGIN: &str = "-----BEGIN AGE ENCRYPTED FILE-----";
const ARMOR_END: &str = "-----END AGE ENCRYPTED FILE-----";

/// Wrap a binary message in armor.
pub fn armor(message: &[u8]) -> String {
    let encoded = STANDARD.encode(message);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / COLUMNS_PER_LINE + 80);
    out.push_str(ARMOR_BEGIN);
    out.push('\n');
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(COLUMNS_PER_LINE));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out.push_str(ARMOR_END);
    out.push('\n');
    out
}

/// Whether `data` starts with the armor header, ignoring leading whitespace.
pub fn is_armored(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(ARMOR_BEGIN.as_bytes())
}

/// Strip armor and return the binary message.
pub fn dearmor(data: &[u8]) -> PageResult<Vec<u8>> {
    let text = std::str::from_utf8(data)
        .map_err(|_| PageError::Format("armored message is not ASCII".into()))?;
    let mut lines = text.trim().lines().map(|l| l.strip_suffix('\r').unwrap_or(l));

    if lines.next() != Some(ARMOR_BEGIN) {
        return Err(PageError::Format("missing armor header".into()));
    }

    let mut encoded = String::new();
    let mut saw_short_line = false;
    let mut closed = false;
    for line in lines.by_ref() {
        if line == ARMOR_END {
            closed = true;
            break;
        }
        if saw_short_line {
            return Err(PageError::Format("short armor line before the end".into()));
        }
        if line.len() > COLUMNS_PER_LINE {
            return Err(PageError::Format("armor line too long".into()));
        }
        saw_short_line = line.len() < COLUMNS_PER_LINE;
        encoded.push_str(line);
    }

    if !closed {
        return Err(PageError::Format("missing armor footer".into()));
    }
    if lines.next().is_some() {
        return Err(PageError::Format("trailing data after armor footer".into()));
    }

    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| PageError::Format(format!("armor base64: {e}")))
}
