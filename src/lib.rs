//! # keyseal-rs
//!
//! The encrypted-credential layer of a multi-chain wallet: a secret (private
//! key or seed) plus a password becomes a tamper-evident, password-recoverable
//! [`EncryptedPayload`], and back again.
//!
//! Key derivation is scrypt or PBKDF2-HMAC-SHA256, encryption is AES in CTR
//! or CBC mode, and the construction is encrypt-then-MAC with a keccak-256
//! tag, matching the Web3 Secret Storage key-file layout so payloads stay
//! readable across clients.
//!
//! ## Example
//!
//! ```
//! use keyseal_rs::{CipherAlgorithm, EncryptedPayload, EncryptionLevel, EncryptionSpec};
//!
//! let spec = EncryptionSpec::preset(EncryptionLevel::Minimal, CipherAlgorithm::Aes128Ctr);
//! let payload = EncryptedPayload::seal("correct horse", b"\x00\x01\x02\x03", spec).unwrap();
//!
//! let json = payload.to_json().unwrap();
//! let loaded = EncryptedPayload::from_json(&json).unwrap();
//! assert_eq!(&*loaded.open("correct horse").unwrap(), b"\x00\x01\x02\x03");
//! ```

pub mod cipher;
pub mod encryption;
pub mod error;
pub mod kdf;
pub mod payload;
pub mod provider;

pub use cipher::{CipherAlgorithm, CipherSpec};
pub use encryption::{EncryptionLevel, EncryptionSpec};
pub use error::{KeySealError, Result, ScryptError};
pub use kdf::{KdfSpec, Pbkdf2Params, ScryptParams};
pub use payload::EncryptedPayload;
pub use provider::{CryptoProvider, SystemCryptoProvider};
