//! Symmetric-cipher configuration: the algorithm and its per-encryption IV.

use std::fmt;
use std::str::FromStr;

use crate::error::{KeySealError, Result};
use crate::provider::CryptoProvider;

/// Block size of every supported AES variant, in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Initialization vector length, in bytes (one AES block).
pub const IV_SIZE: usize = 16;

/// The symmetric ciphers a key file may declare.
///
/// Each variant fixes its key length; all share the 16-byte AES block size.
/// The wire names (`aes-128-ctr`, ...) are part of the persisted format and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    Aes128Ctr,
    Aes192Ctr,
    Aes256Ctr,
    Aes128Cbc,
}

impl CipherAlgorithm {
    /// Key length in bytes for this algorithm.
    #[inline]
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            CipherAlgorithm::Aes128Ctr | CipherAlgorithm::Aes128Cbc => 16,
            CipherAlgorithm::Aes192Ctr => 24,
            CipherAlgorithm::Aes256Ctr => 32,
        }
    }

    /// Block size in bytes (16 for every AES variant).
    #[inline]
    #[must_use]
    pub const fn block_size(self) -> usize {
        AES_BLOCK_SIZE
    }

    /// Whether this is a CBC mode, i.e. ciphertext is PKCS7-padded to a
    /// multiple of the block size.
    #[inline]
    #[must_use]
    pub const fn is_cbc(self) -> bool {
        matches!(self, CipherAlgorithm::Aes128Cbc)
    }

    /// Canonical wire name, as written into the `cipher` field.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::Aes128Ctr => "aes-128-ctr",
            CipherAlgorithm::Aes192Ctr => "aes-192-ctr",
            CipherAlgorithm::Aes256Ctr => "aes-256-ctr",
            CipherAlgorithm::Aes128Cbc => "aes-128-cbc",
        }
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = KeySealError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aes-128-ctr" => Ok(CipherAlgorithm::Aes128Ctr),
            "aes-192-ctr" => Ok(CipherAlgorithm::Aes192Ctr),
            "aes-256-ctr" => Ok(CipherAlgorithm::Aes256Ctr),
            "aes-128-cbc" => Ok(CipherAlgorithm::Aes128Cbc),
            other => Err(KeySealError::UnsupportedCipher(other.to_string())),
        }
    }
}

/// One cipher configuration: an algorithm plus a 16-byte IV.
///
/// [`CipherSpec::generate`] draws a fresh IV from the provider's secure RNG;
/// an IV is never reused across two encryptions under the same key.
/// [`CipherSpec::from_parts`] carries a stored IV verbatim, which is required
/// when decrypting a previously persisted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSpec {
    algorithm: CipherAlgorithm,
    iv: Vec<u8>,
}

impl CipherSpec {
    /// Builds a spec for `algorithm` with a freshly randomized IV.
    pub fn generate<P: CryptoProvider>(provider: &P, algorithm: CipherAlgorithm) -> Self {
        CipherSpec {
            algorithm,
            iv: provider.secure_random_bytes(IV_SIZE),
        }
    }

    /// Rebuilds a spec from a stored IV without re-randomizing it.
    ///
    /// # Errors
    ///
    /// [`KeySealError::InvalidCipher`] if `iv` is not exactly [`IV_SIZE`]
    /// bytes.
    pub fn from_parts(algorithm: CipherAlgorithm, iv: Vec<u8>) -> Result<Self> {
        if iv.len() != IV_SIZE {
            return Err(KeySealError::InvalidCipher(format!(
                "iv must be {IV_SIZE} bytes for {algorithm}, got {}",
                iv.len()
            )));
        }
        Ok(CipherSpec { algorithm, iv })
    }

    #[inline]
    #[must_use]
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    #[inline]
    #[must_use]
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}
