//! # Authenticated Encryption for Rows, Blocks and Aggregator State
//!
//! AES-128-GCM over fixed in-memory buffers. Every ciphertext is laid out
//! as `[iv: 12][body || tag: n + 16]`, so the expansion is a fixed
//! function of the plaintext length:
//!
//! ```text
//! ciphertext_len(n) = n + CIPHER_IV_SIZE + CIPHER_TAG_SIZE
//! ```
//!
//! Block framing passes its 16-byte header as associated data, which binds
//! row counts and lineage task IDs to the ciphertext: flipping any header
//! byte makes decryption fail.

mod stream;

pub use stream::{StreamCipher, StreamDecipher};

use crate::config::{CIPHER_IV_SIZE, CIPHER_OVERHEAD};
use crate::error::{EngineError, Result};
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_128_GCM};
use ring::rand::{SecureRandom, SystemRandom};

/// Development key. Deployments install the attested session key here
/// during enclave provisioning.
const ENGINE_KEY: [u8; 16] = [
    0x10, 0x8e, 0x7f, 0x31, 0xc2, 0x5b, 0xaa, 0x9d, 0x04, 0x66, 0xe1, 0x28, 0x93, 0x4a, 0x5c,
    0xf7,
];

/// Ciphertext length for a plaintext of `plain_len` bytes.
pub fn ciphertext_len(plain_len: usize) -> usize {
    plain_len + CIPHER_OVERHEAD
}

/// A nonce sequence that yields exactly one nonce. Each seal and open
/// operation binds a fresh key, so a one-shot sequence is sufficient.
struct OneNonceSequence(Option<Nonce>);

impl NonceSequence for OneNonceSequence {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0.take().ok_or(ring::error::Unspecified)
    }
}

fn fill_random_iv(iv: &mut [u8; CIPHER_IV_SIZE]) -> Result<()> {
    SystemRandom::new().fill(iv)?;
    Ok(())
}

pub(crate) fn seal(plain: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; CIPHER_IV_SIZE];
    fill_random_iv(&mut iv)?;

    let unbound = UnboundKey::new(&AES_128_GCM, &ENGINE_KEY)?;
    let nonce = Nonce::assume_unique_for_key(iv);
    let mut key = aead::SealingKey::new(unbound, OneNonceSequence(Some(nonce)));

    let mut body = Vec::with_capacity(ciphertext_len(plain.len()));
    body.extend_from_slice(&iv);
    body.extend_from_slice(plain);
    let tag = key.seal_in_place_separate_tag(Aad::from(aad), &mut body[CIPHER_IV_SIZE..])?;
    body.extend_from_slice(tag.as_ref());
    Ok(body)
}

pub(crate) fn open(ct: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if ct.len() < CIPHER_OVERHEAD {
        return Err(EngineError::Format(format!(
            "ciphertext shorter than cipher overhead: {} bytes",
            ct.len()
        )));
    }
    let (iv_bytes, body) = ct.split_at(CIPHER_IV_SIZE);
    let mut iv = [0u8; CIPHER_IV_SIZE];
    iv.copy_from_slice(iv_bytes);

    let unbound = UnboundKey::new(&AES_128_GCM, &ENGINE_KEY)?;
    let nonce = Nonce::assume_unique_for_key(iv);
    let mut key = aead::OpeningKey::new(unbound, OneNonceSequence(Some(nonce)));

    let mut scratch = body.to_vec();
    let plain = key
        .open_in_place(Aad::from(aad), &mut scratch)
        .map_err(|_| EngineError::Cipher)?;
    let plain_len = plain.len();
    scratch.truncate(plain_len);
    Ok(scratch)
}

/// Encrypts `plain` into `out`, returning the number of bytes written.
pub fn encrypt(plain: &[u8], out: &mut [u8]) -> Result<usize> {
    encrypt_with_aad(plain, out, &[])
}

/// Encrypts `plain` into `out`, authenticating `aad` alongside it.
pub fn encrypt_with_aad(plain: &[u8], out: &mut [u8], aad: &[u8]) -> Result<usize> {
    let ct = seal(plain, aad)?;
    if out.len() < ct.len() {
        return Err(EngineError::CapacityExceeded {
            requested: ct.len(),
            capacity: out.len(),
        });
    }
    out[..ct.len()].copy_from_slice(&ct);
    Ok(ct.len())
}

/// Decrypts `ct` into `out`, returning the plaintext length.
pub fn decrypt(ct: &[u8], out: &mut [u8]) -> Result<usize> {
    decrypt_with_aad(ct, out, &[])
}

/// Decrypts `ct` into `out`, verifying `aad` alongside it.
pub fn decrypt_with_aad(ct: &[u8], out: &mut [u8], aad: &[u8]) -> Result<usize> {
    let plain = open(ct, aad)?;
    if out.len() < plain.len() {
        return Err(EngineError::CapacityExceeded {
            requested: plain.len(),
            capacity: out.len(),
        });
    }
    out[..plain.len()].copy_from_slice(&plain);
    Ok(plain.len())
}
