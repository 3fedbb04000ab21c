use thiserror::Error;

/// A violated scrypt cost-parameter invariant.
///
/// Returned by [`ScryptParams::validate`](crate::kdf::ScryptParams::validate),
/// which reports the first failing check in the order the variants are listed
/// here. Bad parameters are rejected, never clamped: a crafted cost factor in
/// an untrusted key file is a resource-exhaustion vector, not a value to fix
/// up silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScryptError {
    /// `dklen` exceeds the scrypt maximum of (2^32 - 1) * 32 bytes.
    #[error("derived key length is too large")]
    DerivedKeyLengthTooLarge,

    /// `r * p` is 2^30 or more.
    #[error("block size * parallelism is too large")]
    BlockSizeTooLarge,

    /// `n` is not a power of two, or is less than 2.
    #[error("cost factor n must be a power of two and at least 2")]
    InvalidCostFactor,

    /// `r * 128 * p` or `n * 128 * r` does not fit in 32 bits.
    #[error("parameters overflow 32-bit arithmetic")]
    Overflow,
}

#[derive(Debug, Error)]
pub enum KeySealError {
    /// The `kdf` tag in a key file names a KDF this crate does not implement.
    #[error("unsupported KDF: {0}")]
    UnsupportedKdf(String),

    /// The `cipher` tag in a key file names a cipher this crate does not
    /// implement.
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// Structurally malformed key file: unparseable JSON, a missing required
    /// field, or a hex field that does not decode.
    #[error("invalid key file: {0}")]
    InvalidKeyFile(String),

    /// Scrypt cost parameters failed validation, at construction or while
    /// parsing an untrusted key file.
    #[error("invalid scrypt parameters: {0}")]
    InvalidScryptParams(#[from] ScryptError),

    /// Cipher parameters are internally inconsistent, e.g. an IV of the
    /// wrong length for the declared algorithm.
    #[error("invalid cipher parameters: {0}")]
    InvalidCipher(String),

    /// MAC verification failed: wrong password or tampered payload.
    #[error("invalid password")]
    InvalidPassword,

    /// The underlying cryptography engine rejected an operation.
    #[error("crypto provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, KeySealError>;
