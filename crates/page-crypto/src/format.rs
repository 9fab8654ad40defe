//! Header wire format
//!
//! ```text
//! age-encryption.org/v1
//! -> <tag> <arg>...
//! <unpadded base64 body, 64 columns, last line shorter (possibly empty)>
//! ...
//! --- <unpadded base64 HMAC-SHA256, 43 chars>
//! ```
//!
//! The MAC covers every header byte up to and including the `---` marker.
//! Parsing is strict: any non-canonical line shape is a format error. Stanzas
//! with unrecognised tags are kept as-is.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use page_core::{PageError, PageResult};

use crate::keys::FileKey;
use crate::primitives::{hkdf, hmac_sha256, hmac_sha256_verify};
use crate::MAC_SIZE;

pub const VERSION_LINE: &str = "age-encryption.org/v1";
const VERSION_PREFIX: &str = "age-encryption.org/";
const STANZA_PREFIX: &str = "-> ";
const MAC_MARKER: &str = "---";
const HEADER_KEY_LABEL: &[u8] = b"header";

/// Base64 columns per body line.
pub const COLUMNS_PER_LINE: usize = 64;

/// Encoded MAC length (32 bytes, unpadded base64).
const ENCODED_MAC_LEN: usize = 43;

/// One recipient record: a type tag, its arguments, and a binary body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    pub tag: String,
    pub args: Vec<String>,
    pub body: Vec<u8>,
}

impl Stanza {
    pub fn new(tag: impl Into<String>, args: Vec<String>, body: Vec<u8>) -> Self {
        Self {
            tag: tag.into(),
            args,
            body,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(STANZA_PREFIX.as_bytes());
        out.extend_from_slice(self.tag.as_bytes());
        for arg in &self.args {
            out.push(b' ');
            out.extend_from_slice(arg.as_bytes());
        }
        out.push(b'\n');

        let encoded = STANDARD_NO_PAD.encode(&self.body);
        for line in encoded.as_bytes().chunks(COLUMNS_PER_LINE) {
            out.extend_from_slice(line);
            out.push(b'\n');
        }
        // The body always ends on a line shorter than a full row, possibly empty.
        if encoded.len() % COLUMNS_PER_LINE == 0 {
            out.push(b'\n');
        }
    }
}

/// A parsed or freshly built header.
#[derive(Debug, Clone)]
pub struct Header {
    pub stanzas: Vec<Stanza>,
    pub mac: [u8; MAC_SIZE],
    /// Exact bytes the MAC covers, as serialized or as received.
    mac_input: Vec<u8>,
}

fn mac_key(file_key: &FileKey) -> PageResult<zeroize::Zeroizing<[u8; crate::KEY_SIZE]>> {
    hkdf(&[], HEADER_KEY_LABEL, file_key.as_bytes())
}

fn is_arbitrary_string(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| (0x21..=0x7e).contains(&b))
}

impl Header {
    /// Build a header over `stanzas` and MAC it under `file_key`.
    pub fn new(stanzas: Vec<Stanza>, file_key: &FileKey) -> PageResult<Self> {
        if stanzas.is_empty() {
            return Err(PageError::Usage("a header needs at least one stanza".into()));
        }
        for stanza in &stanzas {
            if !is_arbitrary_string(&stanza.tag) || !stanza.args.iter().all(|a| is_arbitrary_string(a)) {
                return Err(PageError::Usage(format!(
                    "stanza {:?} has an unencodable tag or argument",
                    stanza.tag
                )));
            }
        }

        let mut mac_input = Vec::new();
        mac_input.extend_from_slice(VERSION_LINE.as_bytes());
        mac_input.push(b'\n');
        for stanza in &stanzas {
            stanza.write(&mut mac_input);
        }
        mac_input.extend_from_slice(MAC_MARKER.as_bytes());

        let mac = hmac_sha256(&*mac_key(file_key)?, &mac_input)?;
        Ok(Self {
            stanzas,
            mac,
            mac_input,
        })
    }

    /// Append the wire form of this header to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.mac_input);
        out.push(b' ');
        out.extend_from_slice(STANDARD_NO_PAD.encode(self.mac).as_bytes());
        out.push(b'\n');
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.mac_input.len() + 2 + ENCODED_MAC_LEN);
        self.write(&mut out);
        out
    }

    /// Check the header MAC in constant time.
    pub fn verify_mac(&self, file_key: &FileKey) -> PageResult<()> {
        if hmac_sha256_verify(&*mac_key(file_key)?, &self.mac_input, &self.mac)? {
            Ok(())
        } else {
            Err(PageError::Integrity("header MAC mismatch".into()))
        }
    }

    /// Parse a header from the front of `data`.
    ///
    /// Returns the header and the number of bytes it occupied; the payload
    /// starts right after.
    pub fn parse(data: &[u8]) -> PageResult<(Self, usize)> {
        let mut lines = LineReader::new(data);

        let version = lines.next_line()?;
        if version != VERSION_LINE {
            if version.starts_with(VERSION_PREFIX) {
                return Err(PageError::UnknownFormat);
            }
            return Err(PageError::Format("missing version line".into()));
        }

        let mut stanzas = Vec::new();
        loop {
            let line_start = lines.position();
            let line = lines.next_line()?;

            if let Some(rest) = line.strip_prefix(STANZA_PREFIX) {
                let stanza = parse_stanza(rest, &mut lines)?;
                crate::recipient::validate_stanza(&stanza)?;
                stanzas.push(stanza);
            } else if let Some(rest) = line.strip_prefix(MAC_MARKER) {
                if stanzas.is_empty() {
                    return Err(PageError::Format("header has no stanzas".into()));
                }
                let encoded = rest
                    .strip_prefix(' ')
                    .filter(|mac| mac.len() == ENCODED_MAC_LEN)
                    .ok_or_else(|| PageError::Format("malformed MAC line".into()))?;
                let decoded = STANDARD_NO_PAD
                    .decode(encoded)
                    .map_err(|e| PageError::Format(format!("MAC base64: {e}")))?;
                let mac: [u8; MAC_SIZE] = decoded
                    .try_into()
                    .map_err(|_| PageError::Format("MAC has the wrong length".into()))?;

                let mac_input = data[..line_start + MAC_MARKER.len()].to_vec();
                let header = Self {
                    stanzas,
                    mac,
                    mac_input,
                };
                return Ok((header, lines.position()));
            } else {
                return Err(PageError::Format("unexpected header line".into()));
            }
        }
    }
}

fn parse_stanza(first_line: &str, lines: &mut LineReader<'_>) -> PageResult<Stanza> {
    let mut fields = first_line.split(' ');
    let tag = fields.next().unwrap_or_default();
    if !is_arbitrary_string(tag) {
        return Err(PageError::Format("invalid stanza tag".into()));
    }
    let args = fields
        .map(|arg| {
            if is_arbitrary_string(arg) {
                Ok(arg.to_string())
            } else {
                Err(PageError::Format("invalid stanza argument".into()))
            }
        })
        .collect::<PageResult<Vec<_>>>()?;

    let mut encoded = String::new();
    loop {
        let line = lines.next_line()?;
        if line.len() > COLUMNS_PER_LINE {
            return Err(PageError::Format("stanza body line too long".into()));
        }
        encoded.push_str(line);
        if line.len() < COLUMNS_PER_LINE {
            break;
        }
    }
    let body = STANDARD_NO_PAD
        .decode(encoded.as_bytes())
        .map_err(|e| PageError::Format(format!("stanza body base64: {e}")))?;

    Ok(Stanza::new(tag, args, body))
}

/// Splits the header region into `\n`-terminated ASCII lines.
struct LineReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LineReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn next_line(&mut self) -> PageResult<&'a str> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| PageError::Format("truncated header".into()))?;
        let line = &rest[..end];
        if !line.iter().all(|b| (0x20..=0x7e).contains(b)) {
            return Err(PageError::Format("non-printable byte in header".into()));
        }
        self.pos += end + 1;
        std::str::from_utf8(line).map_err(|_| PageError::Format("header is not ASCII".into()))
    }
}
