//! page-crypto: age-format (`age-encryption.org/v1`) file encryption
//!
//! Message layout:
//! ```text
//! header    : version line, one stanza per recipient, HMAC-SHA256 over the header
//! nonce     : 16 random bytes
//! payload   : 64 KiB ChaCha20-Poly1305 chunks under HKDF(nonce, file key, "payload")
//! ```
//!
//! Key hierarchy:
//! ```text
//! File Key (128-bit, random per message)
//!   ├── wrapped per recipient: X25519 | ssh-ed25519 | scrypt passphrase
//!   ├── Header MAC Key (HKDF, info = "header")
//!   └── Payload Key (HKDF, salt = payload nonce, info = "payload")
//! ```

pub mod armor;
pub mod format;
pub mod identity;
pub mod keys;
mod primitives;
pub mod protocol;
pub mod recipient;
pub mod scrypt;
mod ssh;
pub mod ssh_ed25519;
pub mod stream;
pub mod x25519;

pub use format::{Header, Stanza};
pub use identity::Identity;
pub use keys::{generate_file_key, parse_identities, parse_identity, parse_recipient, FileKey};
pub use page_core::{ErrorKind, PageError, PageResult};
pub use protocol::{decrypt, encrypt, Decryptor, Encryptor};
pub use recipient::{IdentityKey, Recipient};
pub use stream::{chunk_count, Stream, CHUNK_SIZE};

/// Size of a derived symmetric key (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a file key (128-bit)
pub const FILE_KEY_SIZE: usize = 16;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an HMAC-SHA256 header MAC
pub const MAC_SIZE: usize = 32;

/// Size of a stanza body: a sealed file key
pub const WRAPPED_KEY_SIZE: usize = FILE_KEY_SIZE + TAG_SIZE;
