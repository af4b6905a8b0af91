//! Output verification against the fixtures.
//!
//! Verification is read-only and idempotent: it reconstructs a completed
//! buffer's segments into one contiguous image and compares byte regions
//! chosen by the per-mode offset table. A mismatch is tallied, never fatal.

use crate::buffer::SegBuffer;
use crate::config::{AuthDirection, CipherDirection, OpMode, RunConfig};
use crate::vectors::TestVectors;

/// Per-mode byte-region offsets, as a tagged pair rather than a hierarchy.
///
/// Offsets address the logical concatenation of the buffer's segments:
///
/// | mode             | cipher offset | auth offset     |
/// |------------------|---------------|-----------------|
/// | cipher-only      | 0             | —               |
/// | auth-only        | —             | pt len          |
/// | cipher-then-auth | 0             | pt len          |
/// | auth-then-cipher | 0             | pt len          |
/// | AEAD             | aad len       | aad len + pt len|
///
/// AEAD offsets use the raw associated-data length; when the configured AAD
/// size is not a multiple of the header alignment the regions deliberately
/// begin inside the padded header, matching what the device was asked to
/// transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionLayout {
    /// Cipher region offset, when the mode has a cipher pass.
    pub cipher: Option<usize>,
    /// Auth region offset, when the mode has an auth pass.
    pub auth: Option<usize>,
}

impl RegionLayout {
    /// Offsets for the configured mode and fixture lengths.
    pub fn for_run(cfg: &RunConfig, vectors: &TestVectors) -> Self {
        let pt = vectors.plaintext.len();
        let aad = vectors.aad.len();
        match cfg.mode {
            OpMode::CipherOnly => Self {
                cipher: Some(0),
                auth: None,
            },
            OpMode::AuthOnly => Self {
                cipher: None,
                auth: Some(pt),
            },
            OpMode::CipherThenAuth | OpMode::AuthThenCipher => Self {
                cipher: Some(0),
                auth: Some(pt),
            },
            OpMode::Aead => Self {
                cipher: Some(aad),
                auth: Some(aad + pt),
            },
        }
    }
}

/// Checks one completed buffer against the fixtures.
///
/// Returns `true` when every applicable region matches. The cipher target is
/// the ciphertext fixture when encrypting and the plaintext fixture when
/// decrypting. The digest comparison applies only in generate direction; in
/// verify direction the device's completion status is authoritative and the
/// bytes are skipped.
pub fn verify_buffer(buf: &SegBuffer, cfg: &RunConfig, vectors: &TestVectors) -> bool {
    let image = buf.to_contiguous();
    let layout = RegionLayout::for_run(cfg, vectors);
    let mut ok = true;

    if let Some(offset) = layout.cipher {
        let expected: &[u8] = match cfg.cipher_dir {
            CipherDirection::Encrypt => &vectors.ciphertext,
            CipherDirection::Decrypt => &vectors.plaintext,
        };
        ok &= region_matches(&image, offset, expected);
    }

    if let Some(offset) = layout.auth {
        if cfg.auth_dir == AuthDirection::Generate {
            ok &= region_matches(&image, offset, &vectors.digest);
        }
    }

    ok
}

/// Region comparison that treats an out-of-bounds region as a mismatch
/// rather than a panic; a truncated buffer is a failed operation.
fn region_matches(image: &[u8], offset: usize, expected: &[u8]) -> bool {
    match image.get(offset..offset + expected.len()) {
        Some(region) => region == expected,
        None => false,
    }
}
