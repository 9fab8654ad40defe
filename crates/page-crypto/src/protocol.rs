//! Whole-message encryption and decryption
//!
//! ```text
//! message = header || payload nonce (16 bytes) || payload chunks
//! ```
//!
//! Encryption draws a fresh file key, wraps it once per recipient, MACs the
//! header, then streams the plaintext under a key derived from the file key
//! and the payload nonce. Decryption recovers the file key from the first
//! identity that opens any stanza, checks the header MAC, and only then reads
//! the payload.

use std::borrow::Cow;

use page_core::{PageError, PageResult};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::armor::{armor, dearmor, is_armored};
use crate::format::{Header, Stanza};
use crate::identity::Identity;
use crate::keys::{generate_file_key, parse_recipient, passphrase_identity};
use crate::primitives::random_bytes;
use crate::recipient::{IdentityKey, Recipient};
use crate::stream::{Stream, PAYLOAD_NONCE_SIZE};
use crate::scrypt;

/// Builds encrypted messages for a fixed set of recipients.
#[derive(Debug)]
pub struct Encryptor {
    recipients: Vec<Recipient>,
    armor: bool,
}

impl Encryptor {
    /// Encrypt to public-key recipients.
    ///
    /// Passphrase recipients cannot be mixed with others.
    pub fn with_recipients(recipients: Vec<Recipient>) -> PageResult<Self> {
        if recipients.is_empty() {
            return Err(PageError::Usage("at least one recipient is required".into()));
        }
        if recipients.len() > 1 && recipients.iter().any(Recipient::is_passphrase) {
            return Err(PageError::Usage(
                "a passphrase cannot be combined with other recipients".into(),
            ));
        }
        Ok(Self {
            recipients,
            armor: false,
        })
    }

    /// Encrypt under a passphrase at the default work factor.
    pub fn with_passphrase(passphrase: SecretString) -> Self {
        Self {
            recipients: vec![Recipient::Scrypt(scrypt::Recipient::new(passphrase))],
            armor: false,
        }
    }

    /// Set the log2 scrypt work factor. No effect on public-key recipients.
    pub fn with_work_factor(mut self, log_n: u8) -> Self {
        for recipient in &mut self.recipients {
            if let Recipient::Scrypt(r) = recipient {
                r.set_work_factor(log_n);
            }
        }
        self
    }

    /// Emit ASCII armor instead of binary.
    pub fn armored(mut self, armor: bool) -> Self {
        self.armor = armor;
        self
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> PageResult<Vec<u8>> {
        let file_key = generate_file_key();
        let stanzas = self
            .recipients
            .iter()
            .map(|r| r.wrap_file_key(&file_key))
            .collect::<PageResult<Vec<_>>>()?;
        let header = Header::new(stanzas, &file_key)?;

        let nonce: [u8; PAYLOAD_NONCE_SIZE] = random_bytes();
        let payload = Stream::encrypt(&file_key, &nonce, plaintext)?;

        let mut out = header.to_bytes();
        out.reserve(PAYLOAD_NONCE_SIZE + payload.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&payload);

        tracing::debug!(
            recipients = self.recipients.len(),
            bytes = plaintext.len(),
            armor = self.armor,
            "encrypted message"
        );
        if self.armor {
            Ok(armor(&out).into_bytes())
        } else {
            Ok(out)
        }
    }
}

/// A parsed message awaiting an identity.
///
/// Binary input is borrowed; only armored input is decoded into an owned
/// buffer.
#[derive(Debug)]
pub struct Decryptor<'a> {
    header: Header,
    nonce: [u8; PAYLOAD_NONCE_SIZE],
    message: Cow<'a, [u8]>,
    payload_start: usize,
}

impl<'a> Decryptor<'a> {
    /// Parse the header of `message`, removing armor if present.
    pub fn new(message: &'a [u8]) -> PageResult<Self> {
        let message = if is_armored(message) {
            Cow::Owned(dearmor(message)?)
        } else {
            Cow::Borrowed(message)
        };

        let (header, consumed) = Header::parse(&message)?;
        let payload_start = consumed + PAYLOAD_NONCE_SIZE;
        let nonce: [u8; PAYLOAD_NONCE_SIZE] = message
            .get(consumed..payload_start)
            .and_then(|n| n.try_into().ok())
            .ok_or_else(|| PageError::Integrity("payload nonce is missing".into()))?;

        tracing::debug!(stanzas = header.stanzas.len(), "parsed header");
        Ok(Self {
            header,
            nonce,
            message,
            payload_start,
        })
    }

    fn payload(&self) -> &[u8] {
        &self.message[self.payload_start..]
    }

    pub fn stanzas(&self) -> &[Stanza] {
        &self.header.stanzas
    }

    /// Whether the message was encrypted under a passphrase.
    pub fn is_scrypt(&self) -> bool {
        self.header
            .stanzas
            .iter()
            .any(|s| s.tag == scrypt::STANZA_TAG)
    }

    /// Recover the plaintext with the first identity that opens a stanza.
    ///
    /// Identities are tried in the order given; an identity that recognises a
    /// stanza but finds it malformed or too expensive aborts the search.
    pub fn decrypt<'k>(
        &self,
        identities: impl IntoIterator<Item = &'k IdentityKey>,
    ) -> PageResult<Zeroizing<Vec<u8>>> {
        let file_key = identities
            .into_iter()
            .find_map(|identity| {
                self.header
                    .stanzas
                    .iter()
                    .find_map(|stanza| identity.unwrap_stanza(stanza))
            })
            .ok_or(PageError::NoMatchingKeys)??;

        self.header.verify_mac(&file_key)?;
        Stream::decrypt(&file_key, &self.nonce, self.payload())
    }
}

/// Encrypt `plaintext` to recipient strings or under a passphrase.
///
/// Exactly one of the two must be given.
pub fn encrypt(
    plaintext: &[u8],
    recipients: Option<&[String]>,
    passphrase: Option<SecretString>,
) -> PageResult<Vec<u8>> {
    let recipients = recipients.filter(|r| !r.is_empty());
    let encryptor = match (recipients, passphrase) {
        (Some(recipients), None) => Encryptor::with_recipients(
            recipients
                .iter()
                .map(|r| parse_recipient(r))
                .collect::<PageResult<Vec<_>>>()?,
        )?,
        (None, Some(passphrase)) => Encryptor::with_passphrase(passphrase),
        _ => {
            return Err(PageError::Usage(
                "specify either recipients or a passphrase, but not both".into(),
            ))
        }
    };
    encryptor.encrypt(plaintext)
}

/// Decrypt `message` with identities or a passphrase.
///
/// Exactly one of the two must be given.
pub fn decrypt(
    message: &[u8],
    identities: Option<&[Identity]>,
    passphrase: Option<SecretString>,
) -> PageResult<Vec<u8>> {
    let identities = identities.filter(|i| !i.is_empty());
    let keys: Vec<IdentityKey> = match (identities, passphrase) {
        (Some(identities), None) => identities
            .iter()
            .flat_map(|i| i.keys().iter().cloned())
            .collect(),
        (None, Some(passphrase)) => vec![passphrase_identity(passphrase)],
        _ => {
            return Err(PageError::Usage(
                "specify either identities or a passphrase, but not both".into(),
            ))
        }
    };

    let mut plaintext = Decryptor::new(message)?.decrypt(&keys)?;
    Ok(std::mem::take(&mut *plaintext))
}
