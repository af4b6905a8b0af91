//! Deterministic in-process stand-ins for an accelerator queue.
//!
//! The runner is a pipelined loop around an opaque asynchronous device; these
//! stubs define that contract's observable behaviors so the loop's
//! correctness can be tested without hardware:
//!
//! - **faithful**: accepts everything and writes the expected fixture bytes
//!   into each operation's regions, so verification passes.
//! - **echo**: accepts everything but transforms nothing, so byte
//!   verification fails for every cipher/auth-generate operation.
//!
//! Either behavior can be combined with partial acceptance (ingress-queue
//! pressure) and completion lag (completions surfacing only on later polls),
//! which is what exercises the backlog-retry and drain paths.

use std::collections::VecDeque;

use crate::buffer::BufferPool;
use crate::config::{AuthDirection, CipherDirection, RunConfig};
use crate::device::{
    CapabilityFlags, CryptoDevice, SessionFactory, SessionError, SessionHandle,
};
use crate::oppool::{OpDescriptor, OpStatus};
use crate::vectors::TestVectors;

/// How submitted operations are (not) transformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transform {
    /// Write the expected fixture bytes into each region.
    Faithful,
    /// Accept and complete without touching the buffers.
    Echo,
}

/// How many offered operations a submit call accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AcceptPolicy {
    /// Accept the whole burst.
    All,
    /// Accept half of every offered burst, rounding up so progress is
    /// always possible.
    Half,
}

/// Session state captured at `create_session`.
///
/// Holds the fixture clone and the directions the faithful transform needs;
/// the real equivalent would hold key schedules.
#[derive(Debug)]
struct StubSession {
    handle: SessionHandle,
    vectors: TestVectors,
    cipher_dir: CipherDirection,
    auth_dir: AuthDirection,
}

/// Software device with configurable acceptance, transform and lag.
#[derive(Debug)]
pub struct StubDevice {
    caps: CapabilityFlags,
    transform: Transform,
    accept: AcceptPolicy,
    /// Retrieve polls an accepted operation waits before becoming ready.
    completion_lag: u64,
    /// Pending completions: (poll tick they become ready at, descriptor).
    pending: VecDeque<(u64, OpDescriptor)>,
    polls: u64,
    session: Option<StubSession>,
    next_session: u64,
    /// Session create/destroy calls, for teardown-order assertions.
    pub sessions_destroyed: u64,
}

impl StubDevice {
    /// Device that completes every operation with the expected output.
    pub fn faithful() -> Self {
        Self::new(Transform::Faithful)
    }

    /// Device that completes every operation without transforming it.
    pub fn echo() -> Self {
        Self::new(Transform::Echo)
    }

    fn new(transform: Transform) -> Self {
        Self {
            caps: CapabilityFlags::SCATTER_GATHER,
            transform,
            accept: AcceptPolicy::All,
            completion_lag: 0,
            pending: VecDeque::new(),
            polls: 0,
            session: None,
            next_session: 1,
            sessions_destroyed: 0,
        }
    }

    /// Rejects half of every offered burst, forcing backlog retries.
    pub fn rejecting_half(mut self) -> Self {
        self.accept = AcceptPolicy::Half;
        self
    }

    /// Drops the scatter-gather capability, forcing linearization.
    pub fn without_scatter_gather(mut self) -> Self {
        self.caps = CapabilityFlags::empty();
        self
    }

    /// Completions only become visible after `polls` further retrieve calls,
    /// so some always surface in the drain phase.
    pub fn with_completion_lag(mut self, polls: u64) -> Self {
        self.completion_lag = polls;
        self
    }

    /// Operations currently inside the device.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn accepted_count(&self, offered: usize) -> usize {
        match self.accept {
            AcceptPolicy::All => offered,
            AcceptPolicy::Half => offered.div_ceil(2),
        }
    }

    fn apply_transform(&self, op: &OpDescriptor, buffers: &mut BufferPool) {
        let session = self.session.as_ref().expect("submit without a session");
        let dest = buffers.dest_mut(op.input as usize, op.output.map(|o| o as usize));

        if let Some(region) = op.cipher {
            let bytes: &[u8] = match session.cipher_dir {
                CipherDirection::Encrypt => &session.vectors.ciphertext,
                CipherDirection::Decrypt => &session.vectors.plaintext,
            };
            dest.write_at(region.offset as usize, &bytes[..region.len as usize]);
        }
        if let Some(region) = op.auth {
            // Generate writes the digest; verify direction only checks it.
            if session.auth_dir == AuthDirection::Generate {
                let digest = &session.vectors.digest;
                dest.write_at(region.offset as usize, &digest[..region.len as usize]);
            }
        }
    }
}

impl CryptoDevice for StubDevice {
    fn capability_flags(&self) -> CapabilityFlags {
        self.caps
    }

    fn submit(&mut self, ops: &[OpDescriptor], buffers: &mut BufferPool) -> usize {
        if ops.is_empty() {
            // Flush tick: nothing to accept, nothing to do for a stub.
            return 0;
        }
        let accepted = self.accepted_count(ops.len());
        let ready_at = self.polls + self.completion_lag;
        for op in &ops[..accepted] {
            let mut done = *op;
            if self.transform == Transform::Faithful {
                self.apply_transform(&done, buffers);
            }
            done.status = OpStatus::Success;
            self.pending.push_back((ready_at, done));
        }
        accepted
    }

    fn retrieve(&mut self, out: &mut Vec<OpDescriptor>, max: usize) -> usize {
        self.polls += 1;
        let mut count = 0;
        while count < max {
            match self.pending.front() {
                Some((ready_at, _)) if *ready_at < self.polls => {
                    let (_, op) = self.pending.pop_front().expect("front just observed");
                    out.push(op);
                    count += 1;
                }
                _ => break,
            }
        }
        count
    }
}

impl SessionFactory for StubDevice {
    fn create_session(
        &mut self,
        cfg: &RunConfig,
        vectors: &TestVectors,
    ) -> Result<SessionHandle, SessionError> {
        if vectors.plaintext.len() != cfg.buffer_size
            || vectors.ciphertext.len() != cfg.buffer_size
        {
            return Err(SessionError(format!(
                "fixture length {} does not match buffer size {}",
                vectors.plaintext.len(),
                cfg.buffer_size
            )));
        }
        let handle = SessionHandle(self.next_session);
        self.next_session += 1;
        self.session = Some(StubSession {
            handle,
            vectors: vectors.clone(),
            cipher_dir: cfg.cipher_dir,
            auth_dir: cfg.auth_dir,
        });
        Ok(handle)
    }

    fn destroy_session(&mut self, session: SessionHandle) {
        if let Some(s) = self.session.take() {
            assert_eq!(s.handle, session, "destroying a session this device never created");
            self.sessions_destroyed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OpMode, OutputFormat};
    use crate::device::populate_symmetric_ops;
    use crate::vectors::demo_vectors;
    use crate::verify::verify_buffer;

    fn cfg() -> RunConfig {
        RunConfig {
            buffer_size: 64,
            segment_count: 1,
            pool_size: 8,
            burst_size: 8,
            total_ops: 8,
            mode: OpMode::CipherOnly,
            cipher_dir: CipherDirection::Encrypt,
            auth_dir: AuthDirection::Generate,
            out_of_place: false,
            verify: true,
            output: OutputFormat::Human,
            digest_size: 0,
            aad_size: 0,
        }
    }

    fn prepared(dev: &mut StubDevice, cfg: &RunConfig) -> (BufferPool, Vec<OpDescriptor>) {
        let v = demo_vectors(cfg);
        let session = dev.create_session(cfg, &v).unwrap();
        let buffers = BufferPool::build(cfg, &v).unwrap();
        let mut ops = vec![OpDescriptor::default(); cfg.burst_size];
        populate_symmetric_ops(&mut ops, 0, session, cfg, &v);
        (buffers, ops)
    }

    #[test]
    fn faithful_device_produces_verifiable_output() {
        let cfg = cfg();
        let v = demo_vectors(&cfg);
        let mut dev = StubDevice::faithful();
        let (mut buffers, ops) = prepared(&mut dev, &cfg);

        assert_eq!(dev.submit(&ops, &mut buffers), 8);
        let mut done = Vec::new();
        assert_eq!(dev.retrieve(&mut done, 8), 8);
        for op in &done {
            assert_eq!(op.status, OpStatus::Success);
            assert!(verify_buffer(buffers.input(op.input as usize), &cfg, &v));
        }
    }

    #[test]
    fn echo_device_leaves_input_untouched() {
        let cfg = cfg();
        let v = demo_vectors(&cfg);
        let mut dev = StubDevice::echo();
        let (mut buffers, ops) = prepared(&mut dev, &cfg);

        dev.submit(&ops, &mut buffers);
        assert!(!verify_buffer(buffers.input(0), &cfg, &v));
    }

    #[test]
    fn half_rejection_accepts_rounded_up_half() {
        let cfg = cfg();
        let mut dev = StubDevice::faithful().rejecting_half();
        let (mut buffers, ops) = prepared(&mut dev, &cfg);

        assert_eq!(dev.submit(&ops, &mut buffers), 4);
        assert_eq!(dev.submit(&ops[..1], &mut buffers), 1);
    }

    #[test]
    fn completion_lag_defers_retrieval() {
        let cfg = cfg();
        let mut dev = StubDevice::faithful().with_completion_lag(2);
        let (mut buffers, ops) = prepared(&mut dev, &cfg);

        dev.submit(&ops, &mut buffers);
        let mut done = Vec::new();
        assert_eq!(dev.retrieve(&mut done, 8), 0);
        assert_eq!(dev.retrieve(&mut done, 8), 0);
        assert_eq!(dev.retrieve(&mut done, 8), 8);
    }

    #[test]
    fn retrieve_respects_max() {
        let cfg = cfg();
        let mut dev = StubDevice::faithful();
        let (mut buffers, ops) = prepared(&mut dev, &cfg);

        dev.submit(&ops, &mut buffers);
        let mut done = Vec::new();
        assert_eq!(dev.retrieve(&mut done, 3), 3);
        assert_eq!(dev.in_flight(), 5);
        assert_eq!(dev.retrieve(&mut done, 8), 5);
    }
}
