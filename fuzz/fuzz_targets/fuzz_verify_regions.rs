//! Fuzz target for verification segmentation invariance.
//!
//! # Invariant
//!
//! Verification addresses the logical concatenation of a buffer's segments,
//! so for any geometry and any byte corruption the outcome must match the
//! single-segment rendition of the same logical content, and the buffer must
//! be unchanged afterwards (verification is read-only).
//!
//! # Input Format
//!
//! ```text
//! [0] mode selector
//! [1] segment count selector
//! [2] buffer size selector
//! [3..] corruption byte offsets, applied to both renditions
//! ```
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_verify_regions
//! cargo +nightly fuzz run fuzz_verify_regions -- -max_len=64
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

use cryptoperf_rs::{
    demo_vectors, verify_buffer, AuthDirection, CipherDirection, OpMode, OutputFormat,
    RegionLayout, RunConfig, SegBuffer,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let mode = match data[0] % 5 {
        0 => OpMode::CipherOnly,
        1 => OpMode::AuthOnly,
        2 => OpMode::CipherThenAuth,
        3 => OpMode::AuthThenCipher,
        _ => OpMode::Aead,
    };
    let buffer_size = 16 + (data[2] as usize % 241);
    let segment_count = 1 + (data[1] as usize % 8).min(buffer_size - 1);

    let cfg = RunConfig {
        buffer_size,
        segment_count,
        pool_size: 8,
        burst_size: 8,
        total_ops: 8,
        mode,
        cipher_dir: CipherDirection::Encrypt,
        auth_dir: AuthDirection::Generate,
        out_of_place: false,
        verify: true,
        output: OutputFormat::Human,
        digest_size: if mode == OpMode::CipherOnly { 0 } else { 16 },
        aad_size: if mode == OpMode::Aead { 16 } else { 0 },
    };
    let vectors = demo_vectors(&cfg);

    let mut segmented = SegBuffer::build(&cfg, &vectors, segment_count).expect("build segmented");
    let mut flat = SegBuffer::build(&cfg, &vectors, 1).expect("build flat");

    // Apply the expected transform so some inputs verify clean.
    let layout = RegionLayout::for_run(&cfg, &vectors);
    for buf in [&mut segmented, &mut flat] {
        if let Some(offset) = layout.cipher {
            buf.write_at(offset, &vectors.ciphertext);
        }
        if let Some(offset) = layout.auth {
            buf.write_at(offset, &vectors.digest);
        }
    }

    // Corrupt the same logical bytes in both renditions.
    let len = segmented.total_len();
    for &raw in &data[3..] {
        let offset = raw as usize % len;
        let image = segmented.to_contiguous();
        segmented.write_at(offset, &[image[offset] ^ 0x01]);
        flat.write_at(offset, &[image[offset] ^ 0x01]);
    }

    assert_eq!(segmented.to_contiguous(), flat.to_contiguous());

    let before = segmented.to_contiguous();
    let a = verify_buffer(&segmented, &cfg, &vectors);
    let b = verify_buffer(&flat, &cfg, &vectors);
    assert_eq!(a, b);

    // Read-only and idempotent.
    assert_eq!(segmented.to_contiguous(), before);
    assert_eq!(verify_buffer(&segmented, &cfg, &vectors), a);
});
