//! The boundary to the primitive cryptography engine.
//!
//! Everything below this trait is delegated: random bytes, the two KDFs, the
//! four AES variants and the MAC hash. The sealing protocol in
//! [`payload`](crate::payload) never touches a primitive directly, which keeps
//! it testable against a fake provider without paying for real key
//! derivation.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use rand::{CryptoRng, RngCore};
use scrypt::Params as ScryptEngineParams;
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::cipher::CipherAlgorithm;
use crate::error::{KeySealError, Result};

/// Capability interface consumed by the sealing protocol.
///
/// Implementations must be deterministic for everything except
/// [`secure_random_bytes`](CryptoProvider::secure_random_bytes). Derived keys
/// are returned in [`Zeroizing`] buffers so they are wiped on every exit
/// path, including early error returns in the caller.
pub trait CryptoProvider {
    /// Fills a fresh buffer of `n` bytes from a cryptographically secure RNG.
    fn secure_random_bytes(&self, n: usize) -> Vec<u8>;

    /// Scrypt key derivation.
    ///
    /// The engine re-validates `n`/`r`/`p` independently of
    /// [`ScryptParams::validate`](crate::kdf::ScryptParams::validate) and may
    /// reject parameters the subsystem accepted.
    fn scrypt(
        &self,
        password: &[u8],
        salt: &[u8],
        n: u32,
        r: u32,
        p: u32,
        dklen: usize,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// PBKDF2-HMAC-SHA256 key derivation.
    fn pbkdf2_hmac_sha256(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        dklen: usize,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Encrypts `plaintext` under `key`/`iv`. CBC output is PKCS7-padded.
    fn aes_encrypt(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Decrypts `ciphertext` under `key`/`iv`. CBC input has its PKCS7
    /// padding removed.
    fn aes_decrypt(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;

    /// 256-bit MAC hash (keccak-256, fixed by the key file format).
    fn hash256(&self, data: &[u8]) -> [u8; 32];
}

/// Production provider backed by the RustCrypto crates and the system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCryptoProvider;

impl SystemCryptoProvider {
    #[inline]
    fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        bytes
    }
}

impl CryptoProvider for SystemCryptoProvider {
    fn secure_random_bytes(&self, n: usize) -> Vec<u8> {
        Self::fill_random(&mut rand::thread_rng(), n)
    }

    fn scrypt(
        &self,
        password: &[u8],
        salt: &[u8],
        n: u32,
        r: u32,
        p: u32,
        dklen: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if n < 2 || !n.is_power_of_two() {
            return Err(KeySealError::Provider(format!(
                "scrypt rejected parameters: n={n} is not a power of two >= 2"
            )));
        }
        let log_n = n.trailing_zeros() as u8;
        let params = ScryptEngineParams::new(log_n, r, p, dklen)
            .map_err(|e| KeySealError::Provider(format!("scrypt rejected parameters: {e}")))?;

        let mut key = Zeroizing::new(vec![0u8; dklen]);
        scrypt::scrypt(password, salt, &params, &mut key)
            .map_err(|e| KeySealError::Provider(format!("scrypt derivation failed: {e}")))?;
        Ok(key)
    }

    fn pbkdf2_hmac_sha256(
        &self,
        password: &[u8],
        salt: &[u8],
        iterations: u32,
        dklen: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let mut key = Zeroizing::new(vec![0u8; dklen]);
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
        Ok(key)
    }

    fn aes_encrypt(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        match algorithm {
            CipherAlgorithm::Aes128Ctr => ctr_apply::<aes::Aes128>(key, iv, plaintext),
            CipherAlgorithm::Aes192Ctr => ctr_apply::<aes::Aes192>(key, iv, plaintext),
            CipherAlgorithm::Aes256Ctr => ctr_apply::<aes::Aes256>(key, iv, plaintext),
            CipherAlgorithm::Aes128Cbc => {
                let enc = cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                    .map_err(invalid_key_iv)?;
                Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
        }
    }

    fn aes_decrypt(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        match algorithm {
            CipherAlgorithm::Aes128Ctr => ctr_apply::<aes::Aes128>(key, iv, ciphertext),
            CipherAlgorithm::Aes192Ctr => ctr_apply::<aes::Aes192>(key, iv, ciphertext),
            CipherAlgorithm::Aes256Ctr => ctr_apply::<aes::Aes256>(key, iv, ciphertext),
            CipherAlgorithm::Aes128Cbc => {
                let dec = cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
                    .map_err(invalid_key_iv)?;
                dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| KeySealError::Provider("invalid PKCS7 padding".into()))
            }
        }
    }

    fn hash256(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

/// CTR mode is its own inverse, so one keystream pass serves both directions.
fn ctr_apply<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: aes::cipher::BlockCipher
        + aes::cipher::BlockEncryptMut
        + aes::cipher::BlockSizeUser<BlockSize = aes::cipher::consts::U16>,
    ctr::Ctr128BE<C>: KeyIvInit + StreamCipher,
{
    let mut cipher = ctr::Ctr128BE::<C>::new_from_slices(key, iv).map_err(invalid_key_iv)?;
    let mut buf = data.to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

fn invalid_key_iv(e: aes::cipher::InvalidLength) -> KeySealError {
    KeySealError::Provider(format!("invalid key or IV length: {e}"))
}
