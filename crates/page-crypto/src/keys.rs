//! File keys and the textual key codec
//!
//! Accepted recipient forms:
//! - `age1…` (bech32, 32-byte X25519 public key)
//! - `ssh-ed25519 <base64 wire blob> [comment]`
//!
//! Accepted identity forms:
//! - `AGE-SECRET-KEY-1…` (bech32, 32-byte X25519 scalar)
//! - an unencrypted OpenSSH ed25519 private key block
//!
//! Parsing never touches the filesystem or network.

use bech32::{FromBase32, ToBase32, Variant};
use page_core::{PageError, PageResult};
use zeroize::{Zeroize, Zeroizing};

use crate::recipient::{IdentityKey, Recipient};
use crate::{scrypt, ssh, ssh_ed25519, x25519, FILE_KEY_SIZE, KEY_SIZE};

/// The per-message symmetric key. Zeroized on drop.
pub struct FileKey {
    bytes: [u8; FILE_KEY_SIZE],
}

impl FileKey {
    pub fn from_bytes(bytes: [u8; FILE_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; FILE_KEY_SIZE] {
        &self.bytes
    }

    /// Rebuild a file key from an unwrapped stanza body.
    pub(crate) fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; FILE_KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 128-bit file key.
pub fn generate_file_key() -> FileKey {
    FileKey::from_bytes(crate::primitives::random_bytes())
}

pub(crate) fn encode_bech32(hrp: &str, bytes: &[u8]) -> Result<String, bech32::Error> {
    bech32::encode(hrp, bytes.to_base32(), Variant::Bech32)
}

/// Decode a bech32 string carrying exactly 32 bytes under `expected_hrp`.
///
/// Errors never echo the input, which may be a secret key.
pub(crate) fn decode_bech32(s: &str, expected_hrp: &str) -> PageResult<Zeroizing<[u8; KEY_SIZE]>> {
    let (hrp, data, variant) =
        bech32::decode(s).map_err(|e| PageError::InvalidKey(format!("bech32: {e}")))?;
    if variant != Variant::Bech32 {
        return Err(PageError::InvalidKey("bech32m encoding is not accepted".into()));
    }
    if hrp != expected_hrp {
        return Err(PageError::InvalidKey(format!(
            "unexpected key prefix (expected {expected_hrp})"
        )));
    }

    let decoded = Zeroizing::new(
        Vec::<u8>::from_base32(&data).map_err(|e| PageError::InvalidKey(format!("bech32: {e}")))?,
    );
    if decoded.len() != KEY_SIZE {
        return Err(PageError::InvalidKey(format!(
            "decoded key is {} bytes (expected {KEY_SIZE})",
            decoded.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&decoded);
    Ok(key)
}

/// Parse one recipient string.
pub fn parse_recipient(text: &str) -> PageResult<Recipient> {
    let text = text.trim();
    if text.starts_with(ssh::SSH_ED25519_KEY_TYPE) {
        return text
            .parse::<ssh_ed25519::Recipient>()
            .map(Recipient::SshEd25519);
    }
    if text.starts_with("ssh-") || text.starts_with("ecdsa-") {
        return Err(PageError::InvalidKey(
            "only ssh-ed25519 SSH keys are supported".into(),
        ));
    }
    text.parse::<x25519::Recipient>().map(Recipient::X25519)
}

/// Parse a single identity: a native secret key or an OpenSSH private key block.
pub fn parse_identity(text: &str) -> PageResult<IdentityKey> {
    let text = text.trim();
    if text.starts_with(ssh::OPENSSH_BEGIN) {
        return ssh_ed25519::Identity::from_openssh(text).map(IdentityKey::SshEd25519);
    }
    text.parse::<x25519::Identity>().map(IdentityKey::X25519)
}

/// Parse an identity buffer.
///
/// The buffer is either one OpenSSH private key block, or any number of lines
/// where blank lines and `#` comments are skipped and every remaining line is a
/// native secret key. A buffer with no keys is rejected.
pub fn parse_identities(buffer: &str) -> PageResult<Vec<IdentityKey>> {
    if buffer.trim_start().starts_with(ssh::OPENSSH_BEGIN) {
        return Ok(vec![parse_identity(buffer)?]);
    }

    let keys = buffer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_identity)
        .collect::<PageResult<Vec<_>>>()?;

    if keys.is_empty() {
        return Err(PageError::InvalidKey("no identities found".into()));
    }
    Ok(keys)
}

/// A passphrase identity with the default work-factor ceiling.
pub fn passphrase_identity(passphrase: secrecy::SecretString) -> IdentityKey {
    IdentityKey::Scrypt(scrypt::Identity::new(passphrase))
}
