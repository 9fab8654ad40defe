//! Chunked ChaCha20-Poly1305 payload
//!
//! ```text
//! payload key = HKDF-SHA256(salt = payload nonce, ikm = file key, info = "payload")
//! chunk nonce = counter (11 bytes, big-endian) || last flag (1 byte)
//! chunk       = ChaCha20-Poly1305(payload key, chunk nonce, <= 64 KiB plaintext)
//! ```
//!
//! Every chunk but the last holds exactly [`CHUNK_SIZE`] bytes of plaintext.
//! The last chunk is flagged, so truncation at a chunk boundary is detected.
//! Only an empty plaintext produces an empty last chunk.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use page_core::{PageError, PageResult};
use zeroize::Zeroizing;

use crate::keys::FileKey;
use crate::primitives::hkdf;
use crate::TAG_SIZE;

/// Plaintext bytes per chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Ciphertext bytes per full chunk.
pub const ENCRYPTED_CHUNK_SIZE: usize = CHUNK_SIZE + TAG_SIZE;

/// Size of the random nonce between the header and the payload.
pub const PAYLOAD_NONCE_SIZE: usize = 16;

const PAYLOAD_KEY_LABEL: &[u8] = b"payload";

/// Largest counter that fits the 11-byte nonce prefix.
const MAX_COUNTER: u128 = (1u128 << 88) - 1;

/// Number of chunks a plaintext of `len` bytes encrypts to.
pub fn chunk_count(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(CHUNK_SIZE)
    }
}

/// Ciphertext length for a plaintext of `len` bytes.
pub fn encrypted_len(len: usize) -> usize {
    len + chunk_count(len) * TAG_SIZE
}

/// Payload cipher bound to one file key and payload nonce.
pub struct Stream {
    aead: ChaCha20Poly1305,
}

impl Stream {
    fn new(file_key: &FileKey, nonce: &[u8; PAYLOAD_NONCE_SIZE]) -> PageResult<Self> {
        let key = hkdf(nonce, PAYLOAD_KEY_LABEL, file_key.as_bytes())?;
        Ok(Self {
            aead: ChaCha20Poly1305::new((&*key).into()),
        })
    }

    fn seal(&self, counter: usize, last: bool, piece: &[u8]) -> PageResult<Vec<u8>> {
        let nonce = chunk_nonce(counter as u128, last)?;
        self.aead
            .encrypt(&nonce, piece)
            .map_err(|e| PageError::Primitive(format!("payload chunk {counter}: {e}")))
    }

    /// Encrypt a whole plaintext into concatenated chunks.
    pub fn encrypt(
        file_key: &FileKey,
        nonce: &[u8; PAYLOAD_NONCE_SIZE],
        plaintext: &[u8],
    ) -> PageResult<Vec<u8>> {
        let stream = Self::new(file_key, nonce)?;
        let chunks = chunk_count(plaintext.len());
        let mut out = Vec::with_capacity(encrypted_len(plaintext.len()));

        // An empty plaintext still gets one (empty, last) chunk.
        if plaintext.is_empty() {
            out.extend_from_slice(&stream.seal(0, true, plaintext)?);
        } else {
            for (counter, piece) in plaintext.chunks(CHUNK_SIZE).enumerate() {
                let last = counter + 1 == chunks;
                out.extend_from_slice(&stream.seal(counter, last, piece)?);
            }
        }

        tracing::trace!(chunks, bytes = plaintext.len(), "payload encrypted");
        Ok(out)
    }

    /// Decrypt and authenticate concatenated chunks.
    ///
    /// Nothing is returned unless every chunk authenticates and the final
    /// chunk carries the last flag.
    pub fn decrypt(
        file_key: &FileKey,
        nonce: &[u8; PAYLOAD_NONCE_SIZE],
        ciphertext: &[u8],
    ) -> PageResult<Zeroizing<Vec<u8>>> {
        if ciphertext.is_empty() {
            return Err(PageError::Integrity("payload is missing".into()));
        }

        let stream = Self::new(file_key, nonce)?;
        let chunks = ciphertext.len().div_ceil(ENCRYPTED_CHUNK_SIZE);
        let mut out = Zeroizing::new(Vec::with_capacity(ciphertext.len()));

        for (counter, sealed) in ciphertext.chunks(ENCRYPTED_CHUNK_SIZE).enumerate() {
            let last = counter + 1 == chunks;
            if sealed.len() < TAG_SIZE {
                return Err(PageError::Integrity(format!("payload chunk {counter} is truncated")));
            }
            if last && counter > 0 && sealed.len() == TAG_SIZE {
                return Err(PageError::Integrity("empty final chunk after data".into()));
            }

            let nonce = chunk_nonce(counter as u128, last)?;
            let opened = Zeroizing::new(stream.aead.decrypt(&nonce, sealed).map_err(|_| {
                PageError::Integrity(format!("payload chunk {counter} failed authentication"))
            })?);
            out.extend_from_slice(&opened);
        }

        tracing::trace!(chunks, bytes = out.len(), "payload decrypted");
        Ok(out)
    }
}

fn chunk_nonce(counter: u128, last: bool) -> PageResult<Nonce> {
    if counter > MAX_COUNTER {
        return Err(PageError::Integrity("payload chunk counter overflow".into()));
    }
    let mut nonce = [0u8; 12];
    nonce[..11].copy_from_slice(&counter.to_be_bytes()[5..]);
    nonce[11] = u8::from(last);
    Ok(Nonce::from(nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_file_key;
    use crate::primitives::random_bytes;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_nonce_layout() {
        let nonce = chunk_nonce(0x0102, true).unwrap();
        assert_eq!(nonce.as_slice(), &[0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 1]);

        let nonce = chunk_nonce(0, false).unwrap();
        assert_eq!(nonce.as_slice(), &[0u8; 12]);

        assert!(chunk_nonce(MAX_COUNTER + 1, false).is_err());
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0), 1);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(CHUNK_SIZE), 1);
        assert_eq!(chunk_count(CHUNK_SIZE + 1), 2);
        assert_eq!(chunk_count(3 * CHUNK_SIZE), 3);
    }

    #[test]
    fn test_empty_plaintext_is_one_tag() {
        let key = generate_file_key();
        let nonce = random_bytes();
        let ct = Stream::encrypt(&key, &nonce, b"").unwrap();
        assert_eq!(ct.len(), TAG_SIZE);

        let pt = Stream::decrypt(&key, &nonce, &ct).unwrap();
        assert!(pt.is_empty());
    }

    #[test]
    fn test_only_final_chunk_is_flagged_last() {
        let key = generate_file_key();
        let nonce = random_bytes();
        let stream = Stream::new(&key, &nonce).unwrap();

        let ct = Stream::encrypt(&key, &nonce, b"").unwrap();
        assert!(stream.aead.decrypt(&chunk_nonce(0, true).unwrap(), &ct[..]).is_ok());
        assert!(stream.aead.decrypt(&chunk_nonce(0, false).unwrap(), &ct[..]).is_err());

        let ct = Stream::encrypt(&key, &nonce, &vec![3u8; CHUNK_SIZE + 10]).unwrap();
        let (first, second) = ct.split_at(ENCRYPTED_CHUNK_SIZE);
        assert!(stream.aead.decrypt(&chunk_nonce(0, false).unwrap(), first).is_ok());
        assert_eq!(
            stream.aead.decrypt(&chunk_nonce(1, true).unwrap(), second).unwrap(),
            vec![3u8; 10]
        );
    }

    #[test]
    fn test_chunk_boundaries() {
        let key = generate_file_key();
        let nonce = random_bytes();
        for len in [CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 2 * CHUNK_SIZE] {
            let plaintext = vec![0x5a; len];
            let ct = Stream::encrypt(&key, &nonce, &plaintext).unwrap();
            assert_eq!(ct.len(), encrypted_len(len), "len {len}");
            assert_eq!(*Stream::decrypt(&key, &nonce, &ct).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let key = generate_file_key();
        let nonce = random_bytes();
        let ct = Stream::encrypt(&key, &nonce, &vec![1u8; CHUNK_SIZE]).unwrap();
        assert_eq!(ct.len(), ENCRYPTED_CHUNK_SIZE);
    }

    #[test]
    fn test_truncation_at_chunk_boundary_detected() {
        let key = generate_file_key();
        let nonce = random_bytes();
        let ct = Stream::encrypt(&key, &nonce, &vec![7u8; CHUNK_SIZE + 10]).unwrap();

        // First chunk alone was sealed with last = 0
        let err = Stream::decrypt(&key, &nonce, &ct[..ENCRYPTED_CHUNK_SIZE]).unwrap_err();
        assert!(matches!(err, PageError::Integrity(_)));
    }

    #[test]
    fn test_appended_empty_chunk_rejected() {
        let key = generate_file_key();
        let nonce = random_bytes();
        let mut ct = Stream::encrypt(&key, &nonce, &vec![7u8; CHUNK_SIZE]).unwrap();
        ct.extend_from_slice(&[0u8; TAG_SIZE]);
        assert!(Stream::decrypt(&key, &nonce, &ct).is_err());
    }

    #[test]
    fn test_missing_payload_rejected() {
        let key = generate_file_key();
        let err = Stream::decrypt(&key, &random_bytes(), b"").unwrap_err();
        assert!(matches!(err, PageError::Integrity(_)));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let key = generate_file_key();
        let ct = Stream::encrypt(&key, &[1u8; 16], b"hello").unwrap();
        assert!(Stream::decrypt(&key, &[2u8; 16], &ct).is_err());
    }

    #[test]
    fn test_swapped_chunks_fail() {
        let key = generate_file_key();
        let nonce = random_bytes();
        let mut plaintext = vec![1u8; CHUNK_SIZE];
        plaintext.extend(vec![2u8; CHUNK_SIZE]);
        plaintext.push(3);
        let ct = Stream::encrypt(&key, &nonce, &plaintext).unwrap();

        let mut swapped = ct[ENCRYPTED_CHUNK_SIZE..2 * ENCRYPTED_CHUNK_SIZE].to_vec();
        swapped.extend_from_slice(&ct[..ENCRYPTED_CHUNK_SIZE]);
        swapped.extend_from_slice(&ct[2 * ENCRYPTED_CHUNK_SIZE..]);
        assert!(Stream::decrypt(&key, &nonce, &swapped).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..(2 * CHUNK_SIZE + 17))) {
            let key = generate_file_key();
            let nonce = random_bytes();
            let ct = Stream::encrypt(&key, &nonce, &plaintext).unwrap();
            prop_assert_eq!(ct.len(), encrypted_len(plaintext.len()));
            let pt = Stream::decrypt(&key, &nonce, &ct).unwrap();
            prop_assert_eq!(&*pt, &plaintext);
        }

        #[test]
        fn prop_any_bit_flip_fails(len in 0usize..300, bit in any::<usize>()) {
            let key = generate_file_key();
            let nonce = random_bytes();
            let mut ct = Stream::encrypt(&key, &nonce, &vec![0xa5; len]).unwrap();
            let bit = bit % (ct.len() * 8);
            ct[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(Stream::decrypt(&key, &nonce, &ct).is_err());
        }
    }
}
