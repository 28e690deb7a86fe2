//! # Streaming Cipher for Block-at-a-Time Row Encryption
//!
//! Writers push row bytes into a `StreamCipher` as they serialize them;
//! the cipher stages plaintext up to the block capacity and seals it as a
//! single AEAD message when the block is finished, with the block header
//! as associated data. Readers mirror this with `StreamDecipher`, which
//! authenticates and opens a block once and then serves its bytes to the
//! row codec in sequential `decrypt` calls.

use crate::config::MAX_BLOCK_SIZE;
use crate::crypto::{ciphertext_len, open, seal};
use crate::error::{EngineError, Result};

/// Incremental encryption state for one block at a time.
pub struct StreamCipher {
    plain: Vec<u8>,
    sealed: Vec<u8>,
}

impl Default for StreamCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCipher {
    pub fn new() -> StreamCipher {
        StreamCipher {
            plain: Vec::with_capacity(MAX_BLOCK_SIZE),
            sealed: Vec::new(),
        }
    }

    /// Appends plaintext bytes to the current block.
    pub fn encrypt(&mut self, bytes: &[u8]) -> Result<()> {
        if self.plain.len() + bytes.len() > MAX_BLOCK_SIZE {
            return Err(EngineError::CapacityExceeded {
                requested: self.plain.len() + bytes.len(),
                capacity: MAX_BLOCK_SIZE,
            });
        }
        self.plain.extend_from_slice(bytes);
        Ok(())
    }

    /// Plaintext bytes accumulated since the last reset.
    pub fn plaintext_len(&self) -> usize {
        self.plain.len()
    }

    /// Seals the accumulated plaintext with `aad` and returns the
    /// ciphertext for the finished block.
    pub fn finish_with_aad(&mut self, aad: &[u8]) -> Result<&[u8]> {
        self.sealed = seal(&self.plain, aad)?;
        Ok(&self.sealed)
    }

    /// Ciphertext length of the most recently finished block.
    pub fn bytes_written(&self) -> usize {
        self.sealed.len()
    }

    /// Clears all state so the next block starts fresh.
    pub fn reset(&mut self) {
        self.plain.clear();
        self.sealed.clear();
    }
}

/// Incremental decryption state for one block at a time.
#[derive(Debug)]
pub struct StreamDecipher {
    plain: Vec<u8>,
    pos: usize,
}

impl Default for StreamDecipher {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecipher {
    pub fn new() -> StreamDecipher {
        StreamDecipher {
            plain: Vec::new(),
            pos: 0,
        }
    }

    /// Authenticates and opens the next block's ciphertext; subsequent
    /// `decrypt` calls serve its plaintext in order.
    pub fn reset(&mut self, ct: &[u8], aad: &[u8]) -> Result<()> {
        self.plain = open(ct, aad)?;
        self.pos = 0;
        Ok(())
    }

    /// Copies the next `out.len()` plaintext bytes into `out`.
    pub fn decrypt(&mut self, out: &mut [u8]) -> Result<()> {
        let end = self.pos + out.len();
        if end > self.plain.len() {
            return Err(EngineError::Format(format!(
                "stream read past end of block: want {} bytes, {} remain",
                out.len(),
                self.plain.len() - self.pos
            )));
        }
        out.copy_from_slice(&self.plain[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    /// Plaintext bytes not yet consumed from the current block.
    pub fn remaining(&self) -> usize {
        self.plain.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_bytes_roundtrip_through_finish() {
        let mut enc = StreamCipher::new();
        enc.encrypt(b"alpha").unwrap();
        enc.encrypt(b"beta").unwrap();
        assert_eq!(enc.plaintext_len(), 9);

        let ct = enc.finish_with_aad(b"hdr").unwrap().to_vec();
        assert_eq!(ct.len(), ciphertext_len(9));
        assert_eq!(enc.bytes_written(), ct.len());

        let mut dec = StreamDecipher::new();
        dec.reset(&ct, b"hdr").unwrap();
        let mut a = [0u8; 5];
        let mut b = [0u8; 4];
        dec.decrypt(&mut a).unwrap();
        dec.decrypt(&mut b).unwrap();
        assert_eq!(&a, b"alpha");
        assert_eq!(&b, b"beta");
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn reading_past_block_end_is_a_format_error() {
        let mut enc = StreamCipher::new();
        enc.encrypt(b"xy").unwrap();
        let ct = enc.finish_with_aad(&[]).unwrap().to_vec();

        let mut dec = StreamDecipher::new();
        dec.reset(&ct, &[]).unwrap();
        let mut out = [0u8; 3];
        assert!(matches!(
            dec.decrypt(&mut out).unwrap_err(),
            EngineError::Format(_)
        ));
    }

    #[test]
    fn overfilling_a_block_is_rejected() {
        let mut enc = StreamCipher::new();
        let chunk = vec![0u8; MAX_BLOCK_SIZE];
        enc.encrypt(&chunk).unwrap();
        assert!(matches!(
            enc.encrypt(&[0]).unwrap_err(),
            EngineError::CapacityExceeded { .. }
        ));
    }

    #[test]
    fn reset_clears_prior_block_state() {
        let mut enc = StreamCipher::new();
        enc.encrypt(b"one").unwrap();
        enc.finish_with_aad(&[]).unwrap();
        enc.reset();
        assert_eq!(enc.plaintext_len(), 0);
        assert_eq!(enc.bytes_written(), 0);
    }
}
