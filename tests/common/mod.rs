#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use keyseal_rs::{
    CipherAlgorithm, CipherSpec, CryptoProvider, EncryptionSpec, KdfSpec, Pbkdf2Params, Result,
    ScryptParams, SystemCryptoProvider,
};
use zeroize::Zeroizing;

pub const TEST_PASSWORD: &str = "test_password_123";
pub const TEST_WRONG_PASSWORD: &str = "wrong_password_456";

pub const ALL_ALGORITHMS: [CipherAlgorithm; 4] = [
    CipherAlgorithm::Aes128Ctr,
    CipherAlgorithm::Aes192Ctr,
    CipherAlgorithm::Aes256Ctr,
    CipherAlgorithm::Aes128Cbc,
];

/// Scrypt spec with the cheapest valid cost (n=16), for tests that would
/// otherwise pay for a real derivation on every case.
pub fn fast_scrypt_spec(algorithm: CipherAlgorithm) -> EncryptionSpec {
    let provider = SystemCryptoProvider;
    EncryptionSpec::new(
        CipherSpec::generate(&provider, algorithm),
        KdfSpec::Scrypt(ScryptParams {
            salt: provider.secure_random_bytes(32),
            n: 16,
            r: 8,
            p: 1,
            dklen: 32,
        }),
    )
    .expect("fast scrypt params are valid")
}

/// PBKDF2 spec with a tiny iteration count, for the same reason.
pub fn fast_pbkdf2_spec(algorithm: CipherAlgorithm) -> EncryptionSpec {
    let provider = SystemCryptoProvider;
    EncryptionSpec::new(
        CipherSpec::generate(&provider, algorithm),
        KdfSpec::Pbkdf2(Pbkdf2Params {
            salt: provider.secure_random_bytes(32),
            c: 64,
            dklen: 32,
        }),
    )
    .expect("fast pbkdf2 params are valid")
}

/// Deterministic, instrumented provider for protocol-level tests.
///
/// Derivation is a cheap function of (password, salt), the "cipher" is an
/// XOR keystream (its own inverse, like CTR), and the hash is a byte fold.
/// Call counters and the last key handed to the cipher let tests observe the
/// protocol without real cryptography.
#[derive(Default)]
pub struct FakeProvider {
    pub derive_calls: Cell<usize>,
    pub encrypt_calls: Cell<usize>,
    pub decrypt_calls: Cell<usize>,
    pub last_cipher_key: RefCell<Vec<u8>>,
    rng_state: Cell<u8>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The derived key this provider produces for (password, salt, dklen).
    pub fn expected_key(password: &[u8], salt: &[u8], dklen: usize) -> Vec<u8> {
        let seed = fold(password).wrapping_add(fold(salt));
        (0..dklen).map(|i| seed.wrapping_add(i as u8)).collect()
    }

    /// The MAC this provider produces for (key-suffix, ciphertext).
    pub fn expected_mac(key: &[u8], ciphertext: &[u8]) -> [u8; 32] {
        let mut input = key.to_vec();
        input.extend_from_slice(ciphertext);
        fake_hash(&input)
    }
}

fn fold(data: &[u8]) -> u8 {
    data.iter()
        .enumerate()
        .fold(0u8, |acc, (i, b)| acc.wrapping_mul(31).wrapping_add(b.wrapping_add(i as u8)))
}

fn fake_hash(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, b) in data.iter().enumerate() {
        out[i % 32] = out[i % 32]
            .wrapping_mul(17)
            .wrapping_add(b.wrapping_add(i as u8));
    }
    out
}

fn xor_keystream(key: &[u8], data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

impl CryptoProvider for FakeProvider {
    fn secure_random_bytes(&self, n: usize) -> Vec<u8> {
        let start = self.rng_state.get();
        self.rng_state.set(start.wrapping_add(n as u8));
        (0..n).map(|i| start.wrapping_add(i as u8)).collect()
    }

    fn scrypt(
        &self,
        password: &[u8],
        salt: &[u8],
        _n: u32,
        _r: u32,
        _p: u32,
        dklen: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.derive_calls.set(self.derive_calls.get() + 1);
        Ok(Zeroizing::new(Self::expected_key(password, salt, dklen)))
    }

    fn pbkdf2_hmac_sha256(
        &self,
        password: &[u8],
        salt: &[u8],
        _iterations: u32,
        dklen: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.derive_calls.set(self.derive_calls.get() + 1);
        Ok(Zeroizing::new(Self::expected_key(password, salt, dklen)))
    }

    fn aes_encrypt(
        &self,
        _algorithm: CipherAlgorithm,
        key: &[u8],
        _iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        self.encrypt_calls.set(self.encrypt_calls.get() + 1);
        *self.last_cipher_key.borrow_mut() = key.to_vec();
        Ok(xor_keystream(key, plaintext))
    }

    fn aes_decrypt(
        &self,
        _algorithm: CipherAlgorithm,
        key: &[u8],
        _iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        self.decrypt_calls.set(self.decrypt_calls.get() + 1);
        *self.last_cipher_key.borrow_mut() = key.to_vec();
        Ok(xor_keystream(key, ciphertext))
    }

    fn hash256(&self, data: &[u8]) -> [u8; 32] {
        fake_hash(data)
    }
}
