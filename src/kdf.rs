//! Key-derivation parameters: scrypt and PBKDF2-HMAC-SHA256.
//!
//! Scrypt carries its own cost-parameter validation, run both when a preset
//! is constructed and — the call site that actually matters — when parameters
//! arrive from an untrusted key file. A crafted cost factor can force
//! hundreds of megabytes of derivation work, so violations fail the parse
//! instead of being clamped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::{KeySealError, Result, ScryptError};
use crate::provider::CryptoProvider;

/// Derived-key length used by every preset, in bytes.
pub const DEFAULT_DKLEN: usize = 32;

/// Salt length drawn for freshly constructed parameters, in bytes.
pub const SALT_SIZE: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 262_144;

/// Scrypt block-size parameter shared by the presets.
const DEFAULT_SCRYPT_R: u32 = 8;

/// Scrypt maximum derived-key length: (2^32 - 1) * 32.
const MAX_DKLEN: u64 = (u32::MAX as u64) * 32;

/// Scrypt cost parameters plus the per-payload salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScryptParams {
    /// Random salt, freshly drawn at construction, carried verbatim on parse.
    pub salt: Vec<u8>,
    /// CPU/memory cost factor. Must be a power of two, at least 2.
    pub n: u32,
    /// Block size factor.
    pub r: u32,
    /// Parallelism factor.
    pub p: u32,
    /// Derived key length in bytes.
    pub dklen: usize,
}

impl ScryptParams {
    fn preset<P: CryptoProvider>(provider: &P, n: u32, p: u32) -> Self {
        ScryptParams {
            salt: provider.secure_random_bytes(SALT_SIZE),
            n,
            r: DEFAULT_SCRYPT_R,
            p,
            dklen: DEFAULT_DKLEN,
        }
    }

    /// Fast, low-memory parameters (n=2^12, p=6) for constrained devices.
    pub fn minimal<P: CryptoProvider>(provider: &P) -> Self {
        Self::preset(provider, 1 << 12, 6)
    }

    /// Balanced parameters (n=2^14, p=4). The default level.
    pub fn weak<P: CryptoProvider>(provider: &P) -> Self {
        Self::preset(provider, 1 << 14, 4)
    }

    /// Highest-cost parameters (n=2^18, p=1) for long-term storage.
    pub fn standard<P: CryptoProvider>(provider: &P) -> Self {
        Self::preset(provider, 1 << 18, 1)
    }

    /// Checks the scrypt cost-parameter invariants and reports the first
    /// violation.
    ///
    /// Pure, and called from two places: preset/explicit construction, and
    /// [`KdfSpec::from_json_parts`] when parameters arrive from an untrusted
    /// key file.
    pub fn validate(&self) -> std::result::Result<(), ScryptError> {
        if self.dklen as u64 > MAX_DKLEN {
            return Err(ScryptError::DerivedKeyLengthTooLarge);
        }
        if u64::from(self.r) * u64::from(self.p) >= 1 << 30 {
            return Err(ScryptError::BlockSizeTooLarge);
        }
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(ScryptError::InvalidCostFactor);
        }
        if u64::from(self.r) * 128 * u64::from(self.p) > u64::from(u32::MAX)
            || u64::from(self.n) * 128 * u64::from(self.r) > u64::from(u32::MAX)
        {
            return Err(ScryptError::Overflow);
        }
        Ok(())
    }
}

/// PBKDF2-HMAC-SHA256 parameters plus the per-payload salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// Random salt, freshly drawn at construction, carried verbatim on parse.
    pub salt: Vec<u8>,
    /// Iteration count. Must be nonzero.
    pub c: u32,
    /// Derived key length in bytes.
    pub dklen: usize,
}

impl Pbkdf2Params {
    /// Default parameters: 262144 iterations, 32-byte key, 32-byte salt.
    pub fn new<P: CryptoProvider>(provider: &P) -> Self {
        Pbkdf2Params {
            salt: provider.secure_random_bytes(SALT_SIZE),
            c: DEFAULT_PBKDF2_ITERATIONS,
            dklen: DEFAULT_DKLEN,
        }
    }
}

/// The KDF half of an encryption spec: which function, and with what
/// parameters.
///
/// Closed set; every consumption site matches exhaustively so a new variant
/// cannot be added without the compiler pointing at each of them.
#[remain::sorted]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfSpec {
    Pbkdf2(Pbkdf2Params),
    Scrypt(ScryptParams),
}

/// Raw scrypt `kdfparams` object. Every field is required: a cost parameter
/// silently defaulted from untrusted input would be its own footgun.
#[derive(Debug, Serialize, Deserialize)]
struct ScryptParamsJson {
    salt: String,
    dklen: usize,
    n: u32,
    p: u32,
    r: u32,
}

/// Raw PBKDF2 `kdfparams` object. `c` may be absent (there is no structural
/// overflow hazard in an iteration count, so the default is safe to assume);
/// `salt` and `dklen` are required.
#[derive(Debug, Serialize, Deserialize)]
struct Pbkdf2ParamsJson {
    salt: String,
    dklen: usize,
    #[serde(default = "default_iterations")]
    c: u32,
}

fn default_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

impl KdfSpec {
    /// Wire tag for the `kdf` field.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            KdfSpec::Pbkdf2(_) => "pbkdf2",
            KdfSpec::Scrypt(_) => "scrypt",
        }
    }

    /// Derived key length in bytes.
    #[inline]
    #[must_use]
    pub fn dklen(&self) -> usize {
        match self {
            KdfSpec::Pbkdf2(params) => params.dklen,
            KdfSpec::Scrypt(params) => params.dklen,
        }
    }

    /// Salt carried by this spec.
    #[inline]
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        match self {
            KdfSpec::Pbkdf2(params) => &params.salt,
            KdfSpec::Scrypt(params) => &params.salt,
        }
    }

    /// Validates the parameters of whichever variant this is.
    pub fn validate(&self) -> Result<()> {
        match self {
            KdfSpec::Pbkdf2(params) => {
                if params.c == 0 {
                    return Err(KeySealError::InvalidKeyFile(
                        "pbkdf2 iteration count must be nonzero".into(),
                    ));
                }
                Ok(())
            }
            KdfSpec::Scrypt(params) => params.validate().map_err(Into::into),
        }
    }

    /// Rebuilds the same cost parameters around a fresh salt, for
    /// re-encryption.
    pub(crate) fn refreshed<P: CryptoProvider>(&self, provider: &P) -> KdfSpec {
        let salt = provider.secure_random_bytes(SALT_SIZE);
        match self {
            KdfSpec::Pbkdf2(params) => KdfSpec::Pbkdf2(Pbkdf2Params {
                salt,
                ..params.clone()
            }),
            KdfSpec::Scrypt(params) => KdfSpec::Scrypt(ScryptParams {
                salt,
                ..params.clone()
            }),
        }
    }

    /// Runs the KDF through the provider, yielding `dklen` key bytes in a
    /// self-zeroing buffer.
    ///
    /// Parameters are re-validated first so a spec constructed around raw
    /// struct fields cannot smuggle bad costs past the parse-time check.
    pub fn derive<P: CryptoProvider>(
        &self,
        provider: &P,
        password: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.validate()?;
        match self {
            KdfSpec::Pbkdf2(params) => {
                provider.pbkdf2_hmac_sha256(password, &params.salt, params.c, params.dklen)
            }
            KdfSpec::Scrypt(params) => provider.scrypt(
                password,
                &params.salt,
                params.n,
                params.r,
                params.p,
                params.dklen,
            ),
        }
    }

    /// Encodes this spec as its (`kdf` tag, `kdfparams` object) pair.
    pub(crate) fn to_json_parts(&self) -> Result<(&'static str, Value)> {
        let params = match self {
            KdfSpec::Pbkdf2(p) => serde_json::to_value(Pbkdf2ParamsJson {
                salt: hex::encode(&p.salt),
                dklen: p.dklen,
                c: p.c,
            }),
            KdfSpec::Scrypt(s) => serde_json::to_value(ScryptParamsJson {
                salt: hex::encode(&s.salt),
                dklen: s.dklen,
                n: s.n,
                p: s.p,
                r: s.r,
            }),
        };
        let params = params
            .map_err(|e| KeySealError::InvalidKeyFile(format!("kdfparams encoding failed: {e}")))?;
        Ok((self.kind(), params))
    }

    /// Decodes a (`kdf` tag, `kdfparams` object) pair from a key file.
    ///
    /// The string tag selects the variant; an unrecognized tag fails with
    /// [`KeySealError::UnsupportedKdf`] rather than assuming a default.
    /// Scrypt parameters are validated before this returns, so no derivation
    /// work can be attempted with a hostile cost factor.
    pub(crate) fn from_json_parts(kdf: &str, kdfparams: &Value) -> Result<Self> {
        match kdf {
            "pbkdf2" => {
                let raw: Pbkdf2ParamsJson = serde_json::from_value(kdfparams.clone())
                    .map_err(|e| KeySealError::InvalidKeyFile(format!("bad kdfparams: {e}")))?;
                let spec = KdfSpec::Pbkdf2(Pbkdf2Params {
                    salt: decode_salt(&raw.salt)?,
                    c: raw.c,
                    dklen: raw.dklen,
                });
                spec.validate()?;
                Ok(spec)
            }
            "scrypt" => {
                let raw: ScryptParamsJson = serde_json::from_value(kdfparams.clone())
                    .map_err(|e| KeySealError::InvalidKeyFile(format!("bad kdfparams: {e}")))?;
                let spec = KdfSpec::Scrypt(ScryptParams {
                    salt: decode_salt(&raw.salt)?,
                    n: raw.n,
                    r: raw.r,
                    p: raw.p,
                    dklen: raw.dklen,
                });
                spec.validate()?;
                Ok(spec)
            }
            other => Err(KeySealError::UnsupportedKdf(other.to_string())),
        }
    }
}

fn decode_salt(salt: &str) -> Result<Vec<u8>> {
    hex::decode(salt).map_err(|e| KeySealError::InvalidKeyFile(format!("invalid kdf salt: {e}")))
}
