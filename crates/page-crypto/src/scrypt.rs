//! Passphrase recipients
//!
//! Stanza: `-> scrypt <base64(salt)> <log2 N>` with a 32-byte body.
//!
//! ```text
//! wrap key = scrypt(passphrase, salt = LABEL || salt, N = 2^log2N, r = 8, p = 1)
//! body     = ChaCha20-Poly1305(wrap key, nonce = 0, file key)
//! ```

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use page_core::{PageError, PageResult};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::format::Stanza;
use crate::keys::FileKey;
use crate::primitives::{aead_decrypt, aead_encrypt, random_bytes};
use crate::{KEY_SIZE, WRAPPED_KEY_SIZE};

pub(crate) const STANZA_TAG: &str = "scrypt";
const SALT_LABEL: &[u8] = b"age-encryption.org/v1/scrypt";
const SALT_SIZE: usize = 16;

/// Default log2 work factor when encrypting (2^18).
pub const DEFAULT_WORK_FACTOR: u8 = 18;

/// Default ceiling on the log2 work factor accepted when decrypting.
pub const DEFAULT_MAX_WORK_FACTOR: u8 = 22;

fn derive_wrap_key(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    log_n: u8,
) -> PageResult<Zeroizing<[u8; KEY_SIZE]>> {
    let params = ::scrypt::Params::new(log_n, 8, 1, KEY_SIZE)
        .map_err(|e| PageError::Format(format!("invalid scrypt parameters: {e}")))?;

    let mut inner_salt = Vec::with_capacity(SALT_LABEL.len() + SALT_SIZE);
    inner_salt.extend_from_slice(SALT_LABEL);
    inner_salt.extend_from_slice(salt);

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    ::scrypt::scrypt(
        passphrase.expose_secret().as_bytes(),
        &inner_salt,
        &params,
        &mut key[..],
    )
    .map_err(|e| PageError::Primitive(format!("scrypt failed: {e}")))?;
    Ok(key)
}

/// Wraps file keys under a passphrase.
pub struct Recipient {
    passphrase: SecretString,
    log_n: u8,
}

impl Recipient {
    pub fn new(passphrase: SecretString) -> Self {
        Self {
            passphrase,
            log_n: DEFAULT_WORK_FACTOR,
        }
    }

    /// Override the log2 work factor (1..=63).
    pub fn set_work_factor(&mut self, log_n: u8) {
        self.log_n = log_n;
    }

    pub fn work_factor(&self) -> u8 {
        self.log_n
    }

    pub fn wrap_file_key(&self, file_key: &FileKey) -> PageResult<Stanza> {
        if !(1..64).contains(&self.log_n) {
            return Err(PageError::Usage(format!(
                "scrypt work factor 2^{} is out of range",
                self.log_n
            )));
        }
        let salt: [u8; SALT_SIZE] = random_bytes();
        let wrap_key = derive_wrap_key(&self.passphrase, &salt, self.log_n)?;
        let body = aead_encrypt(&wrap_key, file_key.as_bytes())?;

        tracing::debug!(log_n = self.log_n, "wrapped file key to passphrase");
        Ok(Stanza::new(
            STANZA_TAG,
            vec![STANDARD_NO_PAD.encode(salt), self.log_n.to_string()],
            body,
        ))
    }
}

impl std::fmt::Debug for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScryptRecipient")
            .field("passphrase", &"[REDACTED]")
            .field("log_n", &self.log_n)
            .finish()
    }
}

/// Unwraps passphrase stanzas.
pub struct Identity {
    passphrase: SecretString,
    max_work_factor: u8,
}

impl Identity {
    pub fn new(passphrase: SecretString) -> Self {
        Self {
            passphrase,
            max_work_factor: DEFAULT_MAX_WORK_FACTOR,
        }
    }

    /// Refuse stanzas whose log2 work factor exceeds `max`.
    pub fn with_max_work_factor(mut self, max: u8) -> Self {
        self.max_work_factor = max;
        self
    }

    pub fn unwrap_stanza(&self, stanza: &Stanza) -> Option<PageResult<FileKey>> {
        if stanza.tag != STANZA_TAG {
            return None;
        }
        let (salt, log_n) = match parse_args(stanza) {
            Ok(parsed) => parsed,
            Err(e) => return Some(Err(e)),
        };
        if log_n > self.max_work_factor {
            return Some(Err(PageError::ExcessiveWork {
                required: log_n,
                max: self.max_work_factor,
            }));
        }

        let wrap_key = match derive_wrap_key(&self.passphrase, &salt, log_n) {
            Ok(k) => k,
            Err(e) => return Some(Err(e)),
        };
        aead_decrypt(&wrap_key, &stanza.body)
            .and_then(|pt| FileKey::from_slice(&pt))
            .map(Ok)
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self {
            passphrase: SecretString::from(self.passphrase.expose_secret().to_owned()),
            max_work_factor: self.max_work_factor,
        }
    }
}

/// Parse a decimal work factor with no sign and no leading zeros.
fn parse_work_factor(arg: &str) -> Option<u8> {
    if arg.starts_with('0') || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    arg.parse::<u8>().ok().filter(|n| (1..64).contains(n))
}

/// Structural checks for a `scrypt` stanza; returns (salt, log2 N).
pub(crate) fn parse_args(stanza: &Stanza) -> PageResult<([u8; SALT_SIZE], u8)> {
    let [salt, log_n] = stanza.args.as_slice() else {
        return Err(PageError::Format("scrypt stanza takes exactly two arguments".into()));
    };
    let salt: [u8; SALT_SIZE] = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|e| PageError::Format(format!("scrypt salt base64: {e}")))?
        .try_into()
        .map_err(|_| PageError::Format("scrypt salt must be 16 bytes".into()))?;
    let log_n = parse_work_factor(log_n)
        .ok_or_else(|| PageError::Format("invalid scrypt work factor".into()))?;
    if stanza.body.len() != WRAPPED_KEY_SIZE {
        return Err(PageError::Format("scrypt stanza body must be 32 bytes".into()));
    }
    Ok((salt, log_n))
}
