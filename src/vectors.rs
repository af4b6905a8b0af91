//! Test-vector fixtures driven through the accelerator.
//!
//! The crate implements no cryptography: fixtures are opaque byte sequences
//! supplied by the caller. A real harness loads vectors matched to the
//! session's algorithm; [`demo_vectors`] builds deterministic filler data so
//! tests and benches can run against the stub devices without any algorithm
//! files.

use crate::config::{OpMode, RunConfig};

/// Fixture byte sequences for one run.
///
/// `plaintext` and `ciphertext` are `buffer_size` bytes; `digest` and `aad`
/// match the configured trailer and header sizes. The faithful stub device
/// writes these same fixtures into completed buffers, which is what makes
/// byte-level verification possible without implementing any cipher.
#[derive(Clone, Debug)]
pub struct TestVectors {
    pub plaintext: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub digest: Vec<u8>,
    pub aad: Vec<u8>,
}

impl TestVectors {
    /// Wraps caller-supplied fixture data.
    pub fn new(plaintext: Vec<u8>, ciphertext: Vec<u8>, digest: Vec<u8>, aad: Vec<u8>) -> Self {
        Self {
            plaintext,
            ciphertext,
            digest,
            aad,
        }
    }

    /// Fixture the input buffers are pre-filled from.
    pub fn input_data(&self, cfg: &RunConfig) -> &[u8] {
        match cfg.cipher_dir {
            crate::config::CipherDirection::Encrypt => &self.plaintext,
            crate::config::CipherDirection::Decrypt => &self.ciphertext,
        }
    }
}

/// Tiny xorshift64 generator for deterministic fixture bytes.
///
/// Not cryptographic; it only has to be stable across runs so stub-device
/// output and verifier expectations agree.
struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn fill(&mut self, out: &mut [u8]) {
        for chunk in out.chunks_mut(8) {
            let v = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&v[..chunk.len()]);
        }
    }
}

/// Builds deterministic vectors sized to `cfg`.
///
/// The ciphertext is the plaintext XORed with a fixed keystream, so the two
/// fixtures differ in every byte. Seeded per-size so different geometries get
/// different data.
pub fn demo_vectors(cfg: &RunConfig) -> TestVectors {
    let mut rng = XorShift64::new(0x4372_7970_7446_7831 ^ cfg.buffer_size as u64);

    let mut plaintext = vec![0u8; cfg.buffer_size];
    rng.fill(&mut plaintext);

    let mut keystream = vec![0u8; cfg.buffer_size];
    rng.fill(&mut keystream);
    let ciphertext: Vec<u8> = plaintext
        .iter()
        .zip(&keystream)
        .map(|(p, k)| p ^ k ^ 0xa5)
        .collect();

    let mut digest = vec![0u8; cfg.digest_size];
    rng.fill(&mut digest);

    let aad_len = if cfg.mode == OpMode::Aead {
        cfg.aad_size
    } else {
        0
    };
    let mut aad = vec![0u8; aad_len];
    rng.fill(&mut aad);

    TestVectors {
        plaintext,
        ciphertext,
        digest,
        aad,
    }
}
