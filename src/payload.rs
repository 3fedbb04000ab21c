//! The sealed payload: ciphertext plus MAC plus the spec that produced them.
//!
//! The construction is encrypt-then-MAC. Sealing derives a key, encrypts with
//! the last `key_len` bytes of it, and authenticates the ciphertext under
//! those same bytes; opening re-derives, verifies the MAC in constant time,
//! and only then decrypts. The key-suffix slicing is inherited from the
//! keystore file format this crate stays compatible with and must not change,
//! even though slicing from the front would be equally secure.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::encryption::{EncryptionSpec, EncryptionSpecJson};
use crate::error::{KeySealError, Result};
use crate::provider::{CryptoProvider, SystemCryptoProvider};

/// MAC length in bytes, fixed by the 256-bit MAC hash.
pub const MAC_SIZE: usize = 32;

/// A secret sealed under a password.
///
/// Immutable after construction: re-encrypting means building a new payload
/// with fresh salt and IV, never editing this one in place. The ciphertext
/// and MAC are not themselves secret; the transient derived key and the
/// recovered plaintext are, and both live in self-zeroing buffers for the
/// whole of every `seal`/`open` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    spec: EncryptionSpec,
    ciphertext: Vec<u8>,
    mac: Vec<u8>,
}

/// Canonical key-file object. `ciphertext` first, then the four spec fields,
/// then `mac`, all byte fields hex-encoded.
#[derive(Debug, Serialize, Deserialize)]
struct PayloadJson {
    ciphertext: String,
    #[serde(flatten)]
    spec: EncryptionSpecJson,
    mac: String,
}

impl EncryptedPayload {
    /// Seals `plaintext` under `password` with the system provider.
    ///
    /// See [`EncryptedPayload::seal_with`].
    pub fn seal<S: AsRef<[u8]>>(
        password: S,
        plaintext: &[u8],
        spec: EncryptionSpec,
    ) -> Result<Self> {
        Self::seal_with(&SystemCryptoProvider, password, plaintext, spec)
    }

    /// Seals `plaintext` under `password`: derive, encrypt, authenticate.
    ///
    /// The derived key is wiped before this returns, on success and on every
    /// error path.
    pub fn seal_with<P: CryptoProvider, S: AsRef<[u8]>>(
        provider: &P,
        password: S,
        plaintext: &[u8],
        spec: EncryptionSpec,
    ) -> Result<Self> {
        let derived = spec.kdf().derive(provider, password.as_ref())?;
        let key = cipher_key(&spec, &derived)?;

        let ciphertext = provider.aes_encrypt(
            spec.cipher().algorithm(),
            key,
            spec.cipher().iv(),
            plaintext,
        )?;
        let mac = compute_mac(provider, key, &ciphertext);

        Ok(EncryptedPayload {
            spec,
            ciphertext,
            mac: mac.to_vec(),
        })
    }

    /// Opens the payload with the system provider.
    ///
    /// See [`EncryptedPayload::open_with`].
    pub fn open<S: AsRef<[u8]>>(&self, password: S) -> Result<Zeroizing<Vec<u8>>> {
        self.open_with(&SystemCryptoProvider, password)
    }

    /// Recovers the plaintext: re-derive, verify the MAC, decrypt.
    ///
    /// The MAC comparison is constant-time and happens before any decryption
    /// is attempted; a mismatch fails with [`KeySealError::InvalidPassword`]
    /// and never yields partial plaintext. Retrying with the same password
    /// deterministically fails again.
    ///
    /// The returned buffer zeroes itself when dropped. Ownership of the
    /// secret transfers to the caller here: keep it alive no longer than
    /// needed.
    pub fn open_with<P: CryptoProvider, S: AsRef<[u8]>>(
        &self,
        provider: &P,
        password: S,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let derived = self.spec.kdf().derive(provider, password.as_ref())?;
        let key = cipher_key(&self.spec, &derived)?;

        let expected = compute_mac(provider, key, &self.ciphertext);
        if expected.len() != self.mac.len()
            || !bool::from(expected.as_slice().ct_eq(self.mac.as_slice()))
        {
            return Err(KeySealError::InvalidPassword);
        }

        let plaintext = provider.aes_decrypt(
            self.spec.cipher().algorithm(),
            key,
            self.spec.cipher().iv(),
            &self.ciphertext,
        )?;
        Ok(Zeroizing::new(plaintext))
    }

    /// Re-encrypts under a new password with the system provider.
    ///
    /// See [`EncryptedPayload::reseal_with`].
    pub fn reseal<S1, S2>(&self, old_password: S1, new_password: S2) -> Result<Self>
    where
        S1: AsRef<[u8]>,
        S2: AsRef<[u8]>,
    {
        self.reseal_with(&SystemCryptoProvider, old_password, new_password)
    }

    /// Opens with `old_password` and seals the recovered secret under
    /// `new_password`, keeping the cipher algorithm and KDF costs but drawing
    /// a fresh salt and IV. The original payload is untouched.
    pub fn reseal_with<P, S1, S2>(
        &self,
        provider: &P,
        old_password: S1,
        new_password: S2,
    ) -> Result<Self>
    where
        P: CryptoProvider,
        S1: AsRef<[u8]>,
        S2: AsRef<[u8]>,
    {
        let plaintext = self.open_with(provider, old_password)?;
        Self::seal_with(
            provider,
            new_password,
            &plaintext,
            self.spec.refreshed(provider),
        )
    }

    #[inline]
    #[must_use]
    pub fn spec(&self) -> &EncryptionSpec {
        &self.spec
    }

    #[inline]
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    #[inline]
    #[must_use]
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// Serializes the canonical key-file object.
    pub fn to_json(&self) -> Result<String> {
        let raw = PayloadJson {
            ciphertext: hex::encode(&self.ciphertext),
            spec: self.spec.to_json_struct()?,
            mac: hex::encode(&self.mac),
        };
        serde_json::to_string(&raw)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("payload encoding failed: {e}")))
    }

    /// Parses a previously persisted key-file object.
    ///
    /// All fields are carried verbatim — IV and salt included, since decrypt
    /// must use the stored values. Structural checks run here, before any
    /// derivation work is possible.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: PayloadJson = serde_json::from_str(json)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("malformed key file: {e}")))?;

        let spec = EncryptionSpec::from_json_struct(&raw.spec)?;
        let ciphertext = hex::decode(&raw.ciphertext)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("invalid ciphertext hex: {e}")))?;
        let mac = hex::decode(&raw.mac)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("invalid mac hex: {e}")))?;

        if mac.len() != MAC_SIZE {
            return Err(KeySealError::InvalidKeyFile(format!(
                "mac must be {MAC_SIZE} bytes, got {}",
                mac.len()
            )));
        }
        let algorithm = spec.cipher().algorithm();
        if algorithm.is_cbc()
            && (ciphertext.is_empty() || ciphertext.len() % algorithm.block_size() != 0)
        {
            return Err(KeySealError::InvalidKeyFile(format!(
                "cbc ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                algorithm.block_size()
            )));
        }

        Ok(EncryptedPayload {
            spec,
            ciphertext,
            mac,
        })
    }
}

/// The cipher-key slice: the LAST `key_len` bytes of the derived key. Both
/// encryption and the MAC input use this suffix; the convention is part of
/// the persisted format.
fn cipher_key<'a>(spec: &EncryptionSpec, derived: &'a [u8]) -> Result<&'a [u8]> {
    let key_len = spec.cipher().algorithm().key_len();
    if derived.len() < key_len {
        return Err(KeySealError::InvalidCipher(format!(
            "derived key is {} bytes but {} needs {}",
            derived.len(),
            spec.cipher().algorithm(),
            key_len
        )));
    }
    Ok(&derived[derived.len() - key_len..])
}

/// mac = hash256(key-suffix || ciphertext). The concatenation buffer holds
/// key material, so it zeroes itself on drop.
fn compute_mac<P: CryptoProvider>(provider: &P, key: &[u8], ciphertext: &[u8]) -> [u8; 32] {
    let mut input = Zeroizing::new(Vec::with_capacity(key.len() + ciphertext.len()));
    input.extend_from_slice(key);
    input.extend_from_slice(ciphertext);
    provider.hash256(&input)
}
