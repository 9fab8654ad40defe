//! Native X25519 recipients (`age1…`) and identities (`AGE-SECRET-KEY-1…`)
//!
//! Stanza: `-> X25519 <base64(ephemeral share)>` with a 32-byte body.
//!
//! ```text
//! shared   = X25519(ephemeral secret, recipient)
//! wrap key = HKDF-SHA256(salt = ephemeral share || recipient, ikm = shared, info = LABEL)
//! body     = ChaCha20-Poly1305(wrap key, nonce = 0, file key)
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use page_core::{PageError, PageResult};
use rand::rngs::OsRng;
use secrecy::SecretString;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::format::Stanza;
use crate::keys::{decode_bech32, encode_bech32, FileKey};
use crate::primitives::{aead_decrypt, aead_encrypt, hkdf};
use crate::{KEY_SIZE, WRAPPED_KEY_SIZE};

pub(crate) const STANZA_TAG: &str = "X25519";
const LABEL: &[u8] = b"age-encryption.org/v1/X25519";

const PUBLIC_KEY_HRP: &str = "age";
const SECRET_KEY_HRP: &str = "age-secret-key-";

/// An X25519 public key that file keys can be wrapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipient(PublicKey);

impl Recipient {
    pub fn wrap_file_key(&self, file_key: &FileKey) -> PageResult<Stanza> {
        let esk = EphemeralSecret::random_from_rng(OsRng);
        let epk = PublicKey::from(&esk);
        let shared = esk.diffie_hellman(&self.0);
        if !shared.was_contributory() {
            return Err(PageError::InvalidKey("X25519 recipient is a low-order point".into()));
        }

        let mut salt = [0u8; 2 * KEY_SIZE];
        salt[..KEY_SIZE].copy_from_slice(epk.as_bytes());
        salt[KEY_SIZE..].copy_from_slice(self.0.as_bytes());
        let wrap_key = hkdf(&salt, LABEL, shared.as_bytes())?;

        let body = aead_encrypt(&wrap_key, file_key.as_bytes())?;
        Ok(Stanza::new(
            STANZA_TAG,
            vec![STANDARD_NO_PAD.encode(epk.as_bytes())],
            body,
        ))
    }
}

impl FromStr for Recipient {
    type Err = PageError;

    fn from_str(s: &str) -> PageResult<Self> {
        let bytes = decode_bech32(s, PUBLIC_KEY_HRP)?;
        Ok(Recipient(PublicKey::from(*bytes)))
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = encode_bech32(PUBLIC_KEY_HRP, self.0.as_bytes()).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

/// An X25519 secret scalar. Zeroized on drop.
#[derive(Clone)]
pub struct Identity(StaticSecret);

impl Identity {
    pub fn generate() -> Self {
        Identity(StaticSecret::random_from_rng(OsRng))
    }

    pub fn to_public(&self) -> Recipient {
        Recipient(PublicKey::from(&self.0))
    }

    /// The `AGE-SECRET-KEY-1…` encoding.
    pub fn to_secret_string(&self) -> PageResult<SecretString> {
        let bytes = Zeroizing::new(self.0.to_bytes());
        let encoded = Zeroizing::new(
            encode_bech32(SECRET_KEY_HRP, bytes.as_slice())
                .map_err(|e| PageError::InvalidKey(format!("bech32: {e}")))?,
        );
        Ok(SecretString::from(encoded.to_ascii_uppercase()))
    }

    /// Try to recover the file key from `stanza`.
    ///
    /// `None` when the stanza is of another kind or was not wrapped to this key.
    pub fn unwrap_stanza(&self, stanza: &Stanza) -> Option<PageResult<FileKey>> {
        if stanza.tag != STANZA_TAG {
            return None;
        }
        let epk = match parse_args(stanza) {
            Ok(epk) => epk,
            Err(e) => return Some(Err(e)),
        };

        let shared = self.0.diffie_hellman(&epk);
        if !shared.was_contributory() {
            return None;
        }

        let mut salt = [0u8; 2 * KEY_SIZE];
        salt[..KEY_SIZE].copy_from_slice(epk.as_bytes());
        salt[KEY_SIZE..].copy_from_slice(PublicKey::from(&self.0).as_bytes());
        let wrap_key = match hkdf(&salt, LABEL, shared.as_bytes()) {
            Ok(k) => k,
            Err(e) => return Some(Err(e)),
        };

        aead_decrypt(&wrap_key, &stanza.body)
            .and_then(|pt| FileKey::from_slice(&pt))
            .map(Ok)
    }
}

impl FromStr for Identity {
    type Err = PageError;

    fn from_str(s: &str) -> PageResult<Self> {
        let bytes = decode_bech32(s, SECRET_KEY_HRP)?;
        Ok(Identity(StaticSecret::from(*bytes)))
    }
}

/// Structural checks for an `X25519` stanza; returns the ephemeral share.
pub(crate) fn parse_args(stanza: &Stanza) -> PageResult<PublicKey> {
    let [share] = stanza.args.as_slice() else {
        return Err(PageError::Format("X25519 stanza takes exactly one argument".into()));
    };
    let share = STANDARD_NO_PAD
        .decode(share)
        .map_err(|e| PageError::Format(format!("X25519 share base64: {e}")))?;
    let share: [u8; KEY_SIZE] = share
        .try_into()
        .map_err(|_| PageError::Format("X25519 share must be 32 bytes".into()))?;
    if stanza.body.len() != WRAPPED_KEY_SIZE {
        return Err(PageError::Format("X25519 stanza body must be 32 bytes".into()));
    }
    Ok(PublicKey::from(share))
}
