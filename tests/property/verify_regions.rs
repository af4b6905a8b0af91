//! Segmentation invariance and idempotence of verification.
//!
//! Verification addresses the logical concatenation of a buffer's segments,
//! so the outcome must not depend on how the payload happens to be split,
//! and re-running it must never change the answer.

use proptest::prelude::*;

use cryptoperf_rs::{
    demo_vectors, AuthDirection, CipherDirection, OpMode, OutputFormat, RegionLayout, RunConfig,
    SegBuffer, TestVectors, verify_buffer,
};

fn config(buffer_size: usize, segment_count: usize, mode: OpMode) -> RunConfig {
    RunConfig {
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
    }
}

/// Applies the expected transform the way a correct device would.
fn transform(buf: &mut SegBuffer, cfg: &RunConfig, v: &TestVectors) {
    let layout = RegionLayout::for_run(cfg, v);
    if let Some(offset) = layout.cipher {
        buf.write_at(offset, &v.ciphertext);
    }
    if let Some(offset) = layout.auth {
        buf.write_at(offset, &v.digest);
    }
}

fn mode_strategy() -> impl Strategy<Value = OpMode> {
    prop_oneof![
        Just(OpMode::CipherOnly),
        Just(OpMode::AuthOnly),
        Just(OpMode::CipherThenAuth),
        Just(OpMode::AuthThenCipher),
        Just(OpMode::Aead),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn outcome_is_independent_of_segmentation(
        buffer_size in 16usize..=256,
        segment_count in 1usize..=8,
        mode in mode_strategy(),
        corrupt in 0usize..=255,
    ) {
        prop_assume!(segment_count <= buffer_size);
        let cfg = config(buffer_size, segment_count, mode);
        let v = demo_vectors(&cfg);

        let mut segmented = SegBuffer::build(&cfg, &v, segment_count).unwrap();
        let mut flat_cfg = cfg.clone();
        flat_cfg.segment_count = 1;
        let mut flat = SegBuffer::build(&flat_cfg, &v, 1).unwrap();

        transform(&mut segmented, &cfg, &v);
        transform(&mut flat, &cfg, &v);

        // Optionally corrupt the same logical byte in both.
        if corrupt < segmented.total_len() {
            let image = segmented.to_contiguous();
            segmented.write_at(corrupt, &[image[corrupt] ^ 0x40]);
            flat.write_at(corrupt, &[image[corrupt] ^ 0x40]);
        }

        prop_assert_eq!(segmented.to_contiguous(), flat.to_contiguous());
        prop_assert_eq!(
            verify_buffer(&segmented, &cfg, &v),
            verify_buffer(&flat, &cfg, &v)
        );
    }

    #[test]
    fn verification_is_idempotent(
        buffer_size in 16usize..=128,
        segment_count in 1usize..=4,
        mode in mode_strategy(),
        transformed in any::<bool>(),
    ) {
        prop_assume!(segment_count <= buffer_size);
        let cfg = config(buffer_size, segment_count, mode);
        let v = demo_vectors(&cfg);

        let mut buf = SegBuffer::build(&cfg, &v, segment_count).unwrap();
        if transformed {
            transform(&mut buf, &cfg, &v);
        }

        let before = buf.to_contiguous();
        let first = verify_buffer(&buf, &cfg, &v);
        let second = verify_buffer(&buf, &cfg, &v);

        prop_assert_eq!(first, second);
        prop_assert_eq!(buf.to_contiguous(), before);
        prop_assert_eq!(first, transformed);
    }
}
