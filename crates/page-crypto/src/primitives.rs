//! Fixed-shape wrappers around the RustCrypto primitives the format is built from
//!
//! Every AEAD use outside the payload stream seals exactly one file key under a
//! single-use derived key, so a zero nonce is safe there.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use page_core::{PageError, PageResult};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{KEY_SIZE, MAC_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// HKDF-SHA256 extract-and-expand to a 256-bit key.
pub(crate) fn hkdf(salt: &[u8], label: &[u8], ikm: &[u8]) -> PageResult<Zeroizing<[u8; KEY_SIZE]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hkdf.expand(label, &mut okm[..])
        .map_err(|e| PageError::Primitive(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

/// ChaCha20-Poly1305 seal under an all-zero nonce.
pub(crate) fn aead_encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> PageResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.into());
    cipher
        .encrypt(&Nonce::default(), plaintext)
        .map_err(|e| PageError::Primitive(format!("key wrapping failed: {e}")))
}

/// ChaCha20-Poly1305 open under an all-zero nonce. `None` on tag mismatch.
pub(crate) fn aead_decrypt(key: &[u8; KEY_SIZE], ciphertext: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(&Nonce::default(), ciphertext)
        .ok()
        .map(Zeroizing::new)
}

pub(crate) fn hmac_sha256(key: &[u8; KEY_SIZE], data: &[u8]) -> PageResult<[u8; MAC_SIZE]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| PageError::Primitive(format!("HMAC init failed: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time HMAC-SHA256 check.
pub(crate) fn hmac_sha256_verify(key: &[u8; KEY_SIZE], data: &[u8], tag: &[u8]) -> PageResult<bool> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| PageError::Primitive(format!("HMAC init failed: {e}")))?;
    mac.update(data);
    Ok(mac.verify_slice(tag).is_ok())
}

pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hkdf_different_labels() {
        let a = hkdf(b"salt", b"header", b"ikm").unwrap();
        let b = hkdf(b"salt", b"payload", b"ikm").unwrap();
        assert_ne!(*a, *b, "different labels must produce different keys");
    }

    #[test]
    fn test_hkdf_rfc5869_case_1() {
        // RFC 5869 A.1, truncated to the first 32 bytes of OKM
        let ikm = [0x0bu8; 22];
        let salt: Vec<u8> = (0x00..=0x0c).collect();
        let info: Vec<u8> = (0xf0..=0xf9).collect();
        let okm = hkdf(&salt, &info, &ikm).unwrap();
        assert_eq!(
            okm[..8],
            [0x3c, 0xb2, 0x5f, 0x25, 0xfa, 0xac, 0xd5, 0x7a]
        );
    }

    #[test]
    fn test_aead_roundtrip() {
        let key = [7u8; KEY_SIZE];
        let sealed = aead_encrypt(&key, b"0123456789abcdef").unwrap();
        assert_eq!(sealed.len(), 16 + crate::TAG_SIZE);

        let opened = aead_decrypt(&key, &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"0123456789abcdef");
    }

    #[test]
    fn test_aead_wrong_key_is_none() {
        let sealed = aead_encrypt(&[1u8; KEY_SIZE], b"file key bytes!!").unwrap();
        assert!(aead_decrypt(&[2u8; KEY_SIZE], &sealed).is_none());
    }

    #[test]
    fn test_hmac_verify() {
        let key = [9u8; KEY_SIZE];
        let tag = hmac_sha256(&key, b"header bytes").unwrap();

        assert!(hmac_sha256_verify(&key, b"header bytes", &tag).unwrap());
        assert!(!hmac_sha256_verify(&key, b"header bytez", &tag).unwrap());
        assert!(!hmac_sha256_verify(&key, b"header bytes", &tag[..31]).unwrap());
    }

    #[test]
    fn test_random_bytes_differ() {
        let a: [u8; 16] = random_bytes();
        let b: [u8; 16] = random_bytes();
        assert_ne!(a, b);
    }
}
