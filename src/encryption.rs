//! The pairing of one cipher configuration with one KDF configuration, and
//! its canonical JSON representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cipher::{CipherAlgorithm, CipherSpec};
use crate::error::{KeySealError, Result};
use crate::kdf::{KdfSpec, Pbkdf2Params, ScryptParams};
use crate::provider::{CryptoProvider, SystemCryptoProvider};

/// Named security/performance trade-offs for the scrypt presets, so callers
/// pick a level instead of raw cost numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionLevel {
    /// Alias for [`EncryptionLevel::Weak`].
    Default,
    /// Fast and low-memory (n=2^12, p=6), for constrained devices.
    Minimal,
    /// Balanced (n=2^14, p=4).
    Weak,
    /// Highest cost (n=2^18, p=1), for long-term storage.
    Standard,
}

/// Everything needed to turn a password into a cipher operation: one
/// [`CipherSpec`] plus one [`KdfSpec`].
///
/// Immutable once constructed. Re-encrypting never mutates a spec in place;
/// a new one is built with fresh salt and IV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSpec {
    cipher: CipherSpec,
    kdf: KdfSpec,
}

/// Raw `cipherparams` object.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CipherParamsJson {
    pub iv: String,
}

/// The four spec fields of the canonical key-file object. The payload codec
/// flattens this between its `ciphertext` and `mac` fields.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EncryptionSpecJson {
    pub cipher: String,
    pub cipherparams: CipherParamsJson,
    pub kdf: String,
    pub kdfparams: Value,
}

impl EncryptionSpec {
    /// Pairs a cipher with a KDF, validating the KDF parameters.
    pub fn new(cipher: CipherSpec, kdf: KdfSpec) -> Result<Self> {
        kdf.validate()?;
        Ok(EncryptionSpec { cipher, kdf })
    }

    /// Builds a spec for `level` and `algorithm` using the system provider.
    #[must_use]
    pub fn preset(level: EncryptionLevel, algorithm: CipherAlgorithm) -> Self {
        Self::preset_with(&SystemCryptoProvider, level, algorithm)
    }

    /// Builds a spec for `level` and `algorithm`, drawing salt and IV from
    /// `provider`.
    pub fn preset_with<P: CryptoProvider>(
        provider: &P,
        level: EncryptionLevel,
        algorithm: CipherAlgorithm,
    ) -> Self {
        let kdf = match level {
            EncryptionLevel::Minimal => KdfSpec::Scrypt(ScryptParams::minimal(provider)),
            EncryptionLevel::Default | EncryptionLevel::Weak => {
                KdfSpec::Scrypt(ScryptParams::weak(provider))
            }
            EncryptionLevel::Standard => KdfSpec::Scrypt(ScryptParams::standard(provider)),
        };
        EncryptionSpec {
            cipher: CipherSpec::generate(provider, algorithm),
            kdf,
        }
    }

    /// Builds a PBKDF2-based spec with default iteration count.
    pub fn pbkdf2_with<P: CryptoProvider>(provider: &P, algorithm: CipherAlgorithm) -> Self {
        EncryptionSpec {
            cipher: CipherSpec::generate(provider, algorithm),
            kdf: KdfSpec::Pbkdf2(Pbkdf2Params::new(provider)),
        }
    }

    /// Rebuilds the same cipher algorithm and KDF costs around a fresh IV
    /// and salt.
    pub(crate) fn refreshed<P: CryptoProvider>(&self, provider: &P) -> Self {
        EncryptionSpec {
            cipher: CipherSpec::generate(provider, self.cipher.algorithm()),
            kdf: self.kdf.refreshed(provider),
        }
    }

    #[inline]
    #[must_use]
    pub fn cipher(&self) -> &CipherSpec {
        &self.cipher
    }

    #[inline]
    #[must_use]
    pub fn kdf(&self) -> &KdfSpec {
        &self.kdf
    }

    pub(crate) fn to_json_struct(&self) -> Result<EncryptionSpecJson> {
        let (kdf, kdfparams) = self.kdf.to_json_parts()?;
        Ok(EncryptionSpecJson {
            cipher: self.cipher.algorithm().name().to_string(),
            cipherparams: CipherParamsJson {
                iv: hex::encode(self.cipher.iv()),
            },
            kdf: kdf.to_string(),
            kdfparams,
        })
    }

    /// Decodes the spec fields of a key file.
    ///
    /// Every structural check happens here, before any derivation work: the
    /// cipher and kdf tags must be recognized, the IV must decode to the
    /// right length, and scrypt costs must validate.
    pub(crate) fn from_json_struct(raw: &EncryptionSpecJson) -> Result<Self> {
        let algorithm: CipherAlgorithm = raw.cipher.parse()?;
        let iv = hex::decode(&raw.cipherparams.iv)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("invalid iv hex: {e}")))?;
        let cipher = CipherSpec::from_parts(algorithm, iv)?;
        let kdf = KdfSpec::from_json_parts(&raw.kdf, &raw.kdfparams)?;
        Ok(EncryptionSpec { cipher, kdf })
    }

    /// Serializes to the canonical `{"cipher", "cipherparams", "kdf",
    /// "kdfparams"}` object.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_json_struct()?)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("spec encoding failed: {e}")))
    }

    /// Parses the canonical spec object.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: EncryptionSpecJson = serde_json::from_str(json)
            .map_err(|e| KeySealError::InvalidKeyFile(format!("malformed spec: {e}")))?;
        Self::from_json_struct(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScryptError;
    use serde_json::json;

    const ALGORITHMS: [CipherAlgorithm; 4] = [
        CipherAlgorithm::Aes128Ctr,
        CipherAlgorithm::Aes192Ctr,
        CipherAlgorithm::Aes256Ctr,
        CipherAlgorithm::Aes128Cbc,
    ];

    #[test]
    fn default_level_is_weak() {
        let spec = EncryptionSpec::preset(EncryptionLevel::Default, CipherAlgorithm::Aes128Ctr);
        match spec.kdf() {
            KdfSpec::Scrypt(params) => {
                assert_eq!(params.n, 16384);
                assert_eq!(params.p, 4);
            }
            KdfSpec::Pbkdf2(_) => panic!("presets are scrypt-based"),
        }
    }

    #[test]
    fn json_roundtrip_preserves_every_variant() {
        let provider = SystemCryptoProvider;
        for algorithm in ALGORITHMS {
            for spec in [
                EncryptionSpec::preset_with(&provider, EncryptionLevel::Minimal, algorithm),
                EncryptionSpec::pbkdf2_with(&provider, algorithm),
            ] {
                let json = spec.to_json().unwrap();
                let parsed = EncryptionSpec::from_json(&json).unwrap();
                assert_eq!(parsed, spec);
            }
        }
    }

    #[test]
    fn parse_does_not_rerandomize_iv_or_salt() {
        let spec = EncryptionSpec::preset(EncryptionLevel::Minimal, CipherAlgorithm::Aes128Ctr);
        let parsed = EncryptionSpec::from_json(&spec.to_json().unwrap()).unwrap();
        assert_eq!(parsed.cipher().iv(), spec.cipher().iv());
        assert_eq!(parsed.kdf().salt(), spec.kdf().salt());
    }

    #[test]
    fn unknown_cipher_tag_fails() {
        let json = json!({
            "cipher": "chacha20-poly1305",
            "cipherparams": {"iv": "00".repeat(16)},
            "kdf": "scrypt",
            "kdfparams": {"salt": "00".repeat(32), "dklen": 32, "n": 4096, "p": 6, "r": 8},
        });
        let result = EncryptionSpec::from_json(&json.to_string());
        assert!(matches!(result, Err(KeySealError::UnsupportedCipher(_))));
    }

    #[test]
    fn unknown_kdf_tag_fails_without_defaulting() {
        let json = json!({
            "cipher": "aes-128-ctr",
            "cipherparams": {"iv": "00".repeat(16)},
            "kdf": "bcrypt",
            "kdfparams": {},
        });
        let result = EncryptionSpec::from_json(&json.to_string());
        assert!(matches!(result, Err(KeySealError::UnsupportedKdf(_))));
    }

    #[test]
    fn wrong_length_iv_is_invalid_cipher() {
        let json = json!({
            "cipher": "aes-128-ctr",
            "cipherparams": {"iv": "00".repeat(8)},
            "kdf": "scrypt",
            "kdfparams": {"salt": "00".repeat(32), "dklen": 32, "n": 4096, "p": 6, "r": 8},
        });
        let result = EncryptionSpec::from_json(&json.to_string());
        assert!(matches!(result, Err(KeySealError::InvalidCipher(_))));
    }

    #[test]
    fn malformed_iv_hex_is_invalid_key_file() {
        let json = json!({
            "cipher": "aes-128-ctr",
            "cipherparams": {"iv": "zz".repeat(16)},
            "kdf": "scrypt",
            "kdfparams": {"salt": "00".repeat(32), "dklen": 32, "n": 4096, "p": 6, "r": 8},
        });
        let result = EncryptionSpec::from_json(&json.to_string());
        assert!(matches!(result, Err(KeySealError::InvalidKeyFile(_))));
    }

    #[test]
    fn hostile_scrypt_costs_fail_the_parse() {
        let json = json!({
            "cipher": "aes-128-ctr",
            "cipherparams": {"iv": "00".repeat(16)},
            "kdf": "scrypt",
            "kdfparams": {"salt": "00".repeat(32), "dklen": 32, "n": 7, "p": 1, "r": 8},
        });
        let result = EncryptionSpec::from_json(&json.to_string());
        assert!(matches!(
            result,
            Err(KeySealError::InvalidScryptParams(
                ScryptError::InvalidCostFactor
            ))
        ));
    }
}
