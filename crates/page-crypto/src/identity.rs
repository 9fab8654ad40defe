//! User-facing identity: one or more secret keys loaded together

use std::path::Path;
use std::str::FromStr;

use page_core::{PageError, PageResult};
use secrecy::SecretString;

use crate::keys::parse_identities;
use crate::recipient::IdentityKey;
use crate::x25519;

/// A set of secret keys, as read from one identity file or string.
#[derive(Clone, Debug)]
pub struct Identity {
    keys: Vec<IdentityKey>,
}

impl Identity {
    /// Parse native secret keys (one per line, `#` comments allowed) or an
    /// unencrypted OpenSSH ed25519 private key.
    pub fn from_secret(text: &str) -> PageResult<Self> {
        Ok(Self {
            keys: parse_identities(text)?,
        })
    }

    pub fn from_file(path: &Path) -> PageResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PageError::Usage(format!("reading identity file {}: {e}", path.display())))?;
        Self::from_secret(&text)
    }

    /// A fresh native X25519 identity.
    pub fn generate() -> Self {
        Self {
            keys: vec![IdentityKey::X25519(x25519::Identity::generate())],
        }
    }

    pub fn keys(&self) -> &[IdentityKey] {
        &self.keys
    }

    /// Recipient strings for every key that has one.
    pub fn public(&self) -> Vec<String> {
        self.keys.iter().filter_map(IdentityKey::public).collect()
    }

    /// Decrypt with these keys, or with `passphrase` alone when one is given.
    pub fn decrypt(&self, message: &[u8], passphrase: Option<SecretString>) -> PageResult<Vec<u8>> {
        match passphrase {
            Some(passphrase) => crate::protocol::decrypt(message, None, Some(passphrase)),
            None => crate::protocol::decrypt(message, Some(std::slice::from_ref(self)), None),
        }
    }
}

impl FromStr for Identity {
    type Err = PageError;

    fn from_str(s: &str) -> PageResult<Self> {
        Self::from_secret(s)
    }
}

impl From<IdentityKey> for Identity {
    fn from(key: IdentityKey) -> Self {
        Self { keys: vec![key] }
    }
}
