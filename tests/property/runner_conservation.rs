//! Conservation properties of the pipelined loop.
//!
//! Whatever the geometry (burst, pool multiple, total) and whatever the
//! device's acceptance and completion behavior, every configured operation
//! must be enqueued exactly once and retrieved exactly once, and a faithful
//! device must never produce a verification failure.

use proptest::prelude::*;

use cryptoperf_rs::{
    demo_vectors, populate_symmetric_ops, AuthDirection, CipherDirection, OpMode, OutputFormat,
    RunConfig, StubDevice, ThroughputCtx,
};

#[derive(Clone, Debug)]
struct Geometry {
    burst_size: usize,
    pool_multiple: usize,
    total_ops: u64,
    segment_count: usize,
    reject_half: bool,
    completion_lag: u64,
    mode: OpMode,
    out_of_place: bool,
}

impl Geometry {
    /// Up to `burst * (lag + 1)` descriptors sit between the staging slice
    /// and the device at once, so a lag beyond the pool multiple would
    /// exhaust the op pool instead of exercising the drain. Clamp it to
    /// what the pool can absorb.
    fn lag(&self) -> u64 {
        self.completion_lag.min(self.pool_multiple as u64 - 1)
    }
}

fn geometry() -> impl Strategy<Value = Geometry> {
    (
        1usize..=32,
        1usize..=4,
        1u64..=300,
        1usize..=4,
        any::<bool>(),
        0u64..=4,
        prop_oneof![
            Just(OpMode::CipherOnly),
            Just(OpMode::AuthOnly),
            Just(OpMode::CipherThenAuth),
            Just(OpMode::AuthThenCipher),
            Just(OpMode::Aead),
        ],
        any::<bool>(),
    )
        .prop_map(
            |(
                burst_size,
                pool_multiple,
                total_ops,
                segment_count,
                reject_half,
                completion_lag,
                mode,
                out_of_place,
            )| Geometry {
                burst_size,
                pool_multiple,
                total_ops,
                segment_count,
                reject_half,
                completion_lag,
                mode,
                out_of_place,
            },
        )
}

fn config_for(g: &Geometry) -> RunConfig {
    RunConfig {
        buffer_size: 64,
        segment_count: g.segment_count,
        pool_size: g.burst_size * g.pool_multiple,
        burst_size: g.burst_size,
        total_ops: g.total_ops,
        mode: g.mode,
        cipher_dir: CipherDirection::Encrypt,
        auth_dir: AuthDirection::Generate,
        out_of_place: g.out_of_place,
        verify: true,
        output: OutputFormat::Human,
        digest_size: if g.mode == OpMode::CipherOnly { 0 } else { 16 },
        aad_size: if g.mode == OpMode::Aead { 16 } else { 0 },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_op_is_accounted_for(g in geometry()) {
        let cfg = config_for(&g);
        let mut dev = StubDevice::faithful().with_completion_lag(g.lag());
        if g.reject_half {
            dev = dev.rejecting_half();
        }

        let vectors = demo_vectors(&cfg);
        let mut ctx = ThroughputCtx::construct(
            dev, 0, 0, 0, cfg, vectors, populate_symmetric_ops,
        ).unwrap();
        let r = ctx.run().unwrap();

        prop_assert_eq!(r.ops_enqueued, g.total_ops);
        prop_assert_eq!(r.ops_dequeued, g.total_ops);
        prop_assert_eq!(r.ops_failed, 0);
    }

    #[test]
    fn echo_device_fails_exactly_the_total(g in geometry()) {
        // Generate-direction auth compares digest bytes, so every mode
        // inspects some byte region and the untransformed content misses.
        let cfg = config_for(&g);

        let mut dev = StubDevice::echo().with_completion_lag(g.lag());
        if g.reject_half {
            dev = dev.rejecting_half();
        }

        let vectors = demo_vectors(&cfg);
        let mut ctx = ThroughputCtx::construct(
            dev, 0, 0, 0, cfg, vectors, populate_symmetric_ops,
        ).unwrap();
        let r = ctx.run().unwrap();

        prop_assert_eq!(r.ops_dequeued, g.total_ops);
        prop_assert_eq!(r.ops_failed, g.total_ops);
    }
}
