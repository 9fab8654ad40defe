//! Closed set of recipient and identity kinds
//!
//! Wrapping and unwrapping dispatch on the variant. An identity handed a
//! stanza of a different kind returns `None`; that is not an error.

use std::fmt;
use std::str::FromStr;

use page_core::{PageError, PageResult};

use crate::format::Stanza;
use crate::keys::FileKey;
use crate::{scrypt, ssh_ed25519, x25519};

/// A key a file key can be wrapped to.
#[derive(Debug)]
pub enum Recipient {
    X25519(x25519::Recipient),
    SshEd25519(ssh_ed25519::Recipient),
    Scrypt(scrypt::Recipient),
}

impl Recipient {
    pub fn wrap_file_key(&self, file_key: &FileKey) -> PageResult<Stanza> {
        match self {
            Recipient::X25519(r) => r.wrap_file_key(file_key),
            Recipient::SshEd25519(r) => r.wrap_file_key(file_key),
            Recipient::Scrypt(r) => r.wrap_file_key(file_key),
        }
    }

    pub fn is_passphrase(&self) -> bool {
        matches!(self, Recipient::Scrypt(_))
    }
}

impl FromStr for Recipient {
    type Err = PageError;

    fn from_str(s: &str) -> PageResult<Self> {
        crate::keys::parse_recipient(s)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::X25519(r) => r.fmt(f),
            Recipient::SshEd25519(r) => r.fmt(f),
            Recipient::Scrypt(_) => f.write_str("scrypt passphrase"),
        }
    }
}

/// The decrypting counterpart of a [`Recipient`].
#[derive(Clone)]
pub enum IdentityKey {
    X25519(x25519::Identity),
    SshEd25519(ssh_ed25519::Identity),
    Scrypt(scrypt::Identity),
}

impl IdentityKey {
    /// Try to recover the file key from one stanza.
    pub fn unwrap_stanza(&self, stanza: &Stanza) -> Option<PageResult<FileKey>> {
        match self {
            IdentityKey::X25519(i) => i.unwrap_stanza(stanza),
            IdentityKey::SshEd25519(i) => i.unwrap_stanza(stanza),
            IdentityKey::Scrypt(i) => i.unwrap_stanza(stanza),
        }
    }

    /// The recipient string for this identity, if it has a public half.
    pub fn public(&self) -> Option<String> {
        match self {
            IdentityKey::X25519(i) => Some(i.to_public().to_string()),
            IdentityKey::SshEd25519(i) => Some(i.to_public().to_string()),
            IdentityKey::Scrypt(_) => None,
        }
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            IdentityKey::X25519(_) => "X25519",
            IdentityKey::SshEd25519(_) => "ssh-ed25519",
            IdentityKey::Scrypt(_) => "scrypt",
        };
        f.debug_tuple("IdentityKey").field(&kind).finish()
    }
}

impl FromStr for IdentityKey {
    type Err = PageError;

    fn from_str(s: &str) -> PageResult<Self> {
        crate::keys::parse_identity(s)
    }
}

/// Reject a stanza of a recognised kind whose arguments or body are malformed.
///
/// Unrecognised kinds always pass.
pub(crate) fn validate_stanza(stanza: &Stanza) -> PageResult<()> {
    match stanza.tag.as_str() {
        x25519::STANZA_TAG => x25519::parse_args(stanza).map(|_| ()),
        ssh_ed25519::STANZA_TAG => ssh_ed25519::parse_args(stanza).map(|_| ()),
        scrypt::STANZA_TAG => scrypt::parse_args(stanza).map(|_| ()),
        _ => Ok(()),
    }
}
