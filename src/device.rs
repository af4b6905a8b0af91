//! Capability traits for the accelerator and its collaborators.
//!
//! The runner never sees a concrete device: it drives anything implementing
//! [`CryptoDevice`] plus [`SessionFactory`], with mode-specific descriptor
//! preparation supplied as an injected [`OpPopulator`]. The deterministic
//! stub devices in [`crate::stub`] implement the same traits for tests and
//! benches; a hardware binding would implement them over its driver queue.
//!
//! Submission and retrieval are independent non-blocking calls: `submit` may
//! accept fewer operations than offered (ingress queue full) and `retrieve`
//! may return none. The runner treats both as recoverable and keeps polling.

use serde::{Deserialize, Serialize};

use crate::buffer::BufferPool;
use crate::config::RunConfig;
use crate::oppool::{OpDescriptor, OpRegion};
use crate::vectors::TestVectors;
use crate::verify::RegionLayout;

/// Opaque pre-bound cryptographic context for one device queue.
///
/// Created by a [`SessionFactory`] before buffers are built and released
/// last during teardown. The harness never looks inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle(pub u64);

/// Device capability bits, queried once per run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapabilityFlags(u32);

impl CapabilityFlags {
    /// Device accepts segmented buffers directly.
    pub const SCATTER_GATHER: CapabilityFlags = CapabilityFlags(1 << 0);

    /// No capabilities.
    pub const fn empty() -> Self {
        CapabilityFlags(0)
    }

    /// Union of two capability sets.
    pub const fn union(self, other: CapabilityFlags) -> Self {
        CapabilityFlags(self.0 | other.0)
    }

    /// True when every bit of `other` is present.
    pub const fn contains(self, other: CapabilityFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// An asynchronous accelerator queue.
///
/// One value of this trait models one hardware queue; distinct queues get
/// distinct values and share nothing.
pub trait CryptoDevice {
    /// Capability set, stable for the lifetime of the device.
    fn capability_flags(&self) -> CapabilityFlags;

    /// Offers `ops` for processing; returns how many were accepted.
    ///
    /// The accepted prefix `ops[..n]` is now owned by the device until it
    /// reappears from [`retrieve`](Self::retrieve). An empty `ops` slice is a
    /// flush: it gives software devices a chance to make progress and is how
    /// the warm-up and drain phases tick the queue.
    fn submit(&mut self, ops: &[OpDescriptor], buffers: &mut BufferPool) -> usize;

    /// Non-blocking poll for up to `max` completions, appended to `out`.
    ///
    /// Returns the number appended; zero means nothing was ready.
    fn retrieve(&mut self, out: &mut Vec<OpDescriptor>, max: usize) -> usize;
}

/// Creates and releases sessions on a device.
pub trait SessionFactory {
    /// Binds a session for the configured workload.
    fn create_session(
        &mut self,
        cfg: &RunConfig,
        vectors: &TestVectors,
    ) -> Result<SessionHandle, SessionError>;

    /// Releases a session. Called once during teardown.
    fn destroy_session(&mut self, session: SessionHandle);
}

/// Session creation failure; fatal for construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionError(pub String);

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session creation failed: {}", self.0)
    }
}

impl std::error::Error for SessionError {}

/// Mode-specific descriptor preparation, supplied by the caller.
///
/// Binds each descriptor in `ops` to consecutive buffer-pool slots starting
/// at `first_buffer`, sets its byte ranges and session. Correlation tokens
/// are not touched here; the runner owns those.
pub type OpPopulator = fn(
    ops: &mut [OpDescriptor],
    first_buffer: usize,
    session: SessionHandle,
    cfg: &RunConfig,
    vectors: &TestVectors,
);

/// Standard populator for symmetric workloads.
///
/// Byte ranges come from the per-mode region table shared with the verifier,
/// so what the device is asked to transform is exactly what verification
/// later inspects.
pub fn populate_symmetric_ops(
    ops: &mut [OpDescriptor],
    first_buffer: usize,
    session: SessionHandle,
    cfg: &RunConfig,
    vectors: &TestVectors,
) {
    let layout = RegionLayout::for_run(cfg, vectors);
    let cipher = layout.cipher.map(|offset| OpRegion {
        offset: offset as u32,
        len: vectors.plaintext.len() as u32,
    });
    let auth = layout.auth.map(|offset| OpRegion {
        offset: offset as u32,
        len: vectors.digest.len() as u32,
    });

    for (i, op) in ops.iter_mut().enumerate() {
        let idx = (first_buffer + i) as u32;
        op.input = idx;
        op.output = cfg.out_of_place.then_some(idx);
        op.session = session;
        op.cipher = cipher;
        op.auth = auth;
    }
}
