//! The pipelined throughput runner.
//!
//! One [`ThroughputCtx`] drives one accelerator queue from one logical
//! execution unit; distinct contexts own disjoint pools and sessions and
//! share nothing. The loop overlaps submission and retrieval without ever
//! suspending: an empty poll is counted and retried on the next iteration.
//!
//! Safety of buffer reuse needs no locks. In-flight operations are bounded
//! by the burst size, the pool size is a whole multiple of the burst size,
//! and the buffer cursor only wraps when a full burst would run past the
//! pool end, so a slot is never rebound while its previous submission is
//! still inside the device.
//!
//! Loop shape per round (`enqueued < total`):
//!
//! 1. target burst = min(burst size, remaining);
//! 2. allocate only `burst - unused` fresh descriptors; descriptors the
//!    device rejected last round stay at the front of the staging ring and
//!    are retried unchanged, keeping their original correlation tokens;
//! 3. populate the fresh tail, bind result slots, linearize if the device
//!    cannot scatter-gather;
//! 4. submit; shortfall becomes next round's `unused` and counts one
//!    enqueue failure;
//! 5. poll up to one burst of completions; record statuses, recycle
//!    descriptors; an empty poll counts one dequeue failure;
//! 6. advance the cursor by the fresh-descriptor count, wrapping in
//!    whole-burst steps.
//!
//! A drain phase then flushes the device with empty submits until every
//! accepted operation has been retrieved. The timed interval runs from just
//! before the first real submission to the end of the drain.

use std::fmt;
use std::io::{self, Write};

use crate::buffer::{BufferPool, BuildError};
use crate::config::{ConfigError, OutputFormat, RunConfig};
use crate::cycles::CycleClock;
use crate::device::{
    CapabilityFlags, CryptoDevice, OpPopulator, SessionError, SessionFactory, SessionHandle,
};
use crate::oppool::{OpDescriptor, OpPool, OpPoolError, OpStatus};
use crate::report::{self, RunResults};
use crate::vectors::TestVectors;
use crate::verify::verify_buffer;

/// Per-operation verification record.
///
/// Slots live in a flat pre-sized array indexed by the correlation token;
/// each is bound once, when its operation is first prepared, and never
/// rebound across submission retries.
#[derive(Clone, Copy, Debug)]
struct ResultSlot {
    status: OpStatus,
    buffer: u32,
}

/// Owns everything one run needs: config, fixtures, pools, session, device.
///
/// Build with [`construct`](Self::construct), drive with [`run`](Self::run),
/// tear down with [`finish`](Self::finish) (which also emits the report).
/// Teardown releases resources in reverse build order; the session goes
/// first.
#[derive(Debug)]
pub struct ThroughputCtx<D> {
    dev_id: u8,
    queue_id: u16,
    lane_id: u32,
    device: D,
    session: Option<SessionHandle>,
    cfg: RunConfig,
    vectors: TestVectors,
    buffers: BufferPool,
    op_pool: OpPool,
    populate: OpPopulator,
    results: Option<RunResults>,
}

impl<D: CryptoDevice + SessionFactory> ThroughputCtx<D> {
    /// Validates the configuration, binds a session and pre-builds both
    /// pools. Any failure releases whatever was partially built (sessions
    /// created before a later failure are destroyed before returning).
    pub fn construct(
        mut device: D,
        dev_id: u8,
        queue_id: u16,
        lane_id: u32,
        cfg: RunConfig,
        vectors: TestVectors,
        populate: OpPopulator,
    ) -> Result<Self, ConstructError> {
        cfg.validate()?;
        if vectors.plaintext.len() != cfg.buffer_size
            || vectors.ciphertext.len() != cfg.buffer_size
        {
            return Err(ConstructError::FixtureMismatch {
                fixture_len: vectors.plaintext.len(),
                buffer_size: cfg.buffer_size,
            });
        }

        let session = device.create_session(&cfg, &vectors)?;
        let buffers = match BufferPool::build(&cfg, &vectors) {
            Ok(b) => b,
            Err(e) => {
                device.destroy_session(session);
                return Err(e.into());
            }
        };
        let op_pool = OpPool::new(cfg.pool_size);

        Ok(Self {
            dev_id,
            queue_id,
            lane_id,
            device,
            session: Some(session),
            cfg,
            vectors,
            buffers,
            op_pool,
            populate,
            results: None,
        })
    }

    /// Runs the measurement to completion and returns the results snapshot.
    ///
    /// Only an operation-pool allocation shortfall crosses the loop boundary
    /// as an error; submission shortfalls, empty polls and verification
    /// mismatches are tallied and the run continues.
    pub fn run(&mut self) -> Result<RunResults, RunError> {
        let total = self.cfg.total_ops;
        let burst_cap = self.cfg.burst_size;
        let session = self.session.expect("run after teardown");

        let linearize = self.cfg.segment_count > 1
            && !self
                .device
                .capability_flags()
                .contains(CapabilityFlags::SCATTER_GATHER);

        let mut slots: Vec<ResultSlot> = Vec::new();
        if self.cfg.verify {
            slots.reserve_exact(total as usize);
        }

        let mut staging: Vec<OpDescriptor> = Vec::with_capacity(burst_cap);
        let mut completed: Vec<OpDescriptor> = Vec::with_capacity(burst_cap);

        let mut enqueued: u64 = 0;
        let mut dequeued: u64 = 0;
        let mut enqueue_failed: u64 = 0;
        let mut dequeue_failed: u64 = 0;
        let mut unused: usize = 0;
        let mut cursor: usize = 0;

        // Warm-up: as many empty submissions as real ones, to stabilize
        // caches and clocks before the timed interval starts.
        for _ in 0..total {
            self.device.submit(&[], &mut self.buffers);
        }

        let clock = CycleClock::calibrated();
        let start = clock.now();

        while enqueued < total {
            let remaining = (total - enqueued) as usize;
            let burst = burst_cap.min(remaining);
            debug_assert!(
                unused <= burst,
                "backlog {unused} cannot exceed round burst {burst}"
            );
            let needed = burst - unused;

            self.op_pool.alloc_bulk(needed, &mut staging)?;
            let fresh = &mut staging[unused..];
            (self.populate)(fresh, cursor, session, &self.cfg, &self.vectors);

            if self.cfg.verify {
                for op in fresh.iter_mut() {
                    op.token = slots.len() as u64;
                    slots.push(ResultSlot {
                        status: OpStatus::NotProcessed,
                        buffer: op.input,
                    });
                }
            }

            if linearize {
                for op in &staging[..burst] {
                    self.buffers.input_mut(op.input as usize).linearize();
                }
            }

            let accepted = self.device.submit(&staging[..burst], &mut self.buffers);
            debug_assert!(accepted <= burst);
            if accepted < burst {
                enqueue_failed += 1;
            }
            unused = burst - accepted;
            enqueued += accepted as u64;
            staging.drain(..accepted);

            completed.clear();
            let got = self.device.retrieve(&mut completed, burst_cap);
            if got > 0 {
                if self.cfg.verify {
                    for op in &completed {
                        slots[op.token as usize].status = op.status;
                    }
                }
                self.op_pool.free_bulk(completed.drain(..));
                dequeued += got as u64;
            } else {
                dequeue_failed += 1;
            }

            cursor += needed;
            if cursor + burst_cap > self.cfg.pool_size {
                cursor = 0;
            }
        }

        // Every requested operation was accepted; nothing is left unsubmitted.
        debug_assert_eq!(enqueued, total);
        debug_assert_eq!(unused, 0);
        debug_assert!(staging.is_empty());

        // Drain: keep flushing and polling until every accepted operation
        // has come back out.
        while dequeued < total {
            self.device.submit(&[], &mut self.buffers);

            completed.clear();
            let got = self.device.retrieve(&mut completed, burst_cap);
            if got == 0 {
                dequeue_failed += 1;
            } else {
                if self.cfg.verify {
                    for op in &completed {
                        slots[op.token as usize].status = op.status;
                    }
                }
                self.op_pool.free_bulk(completed.drain(..));
                dequeued += got as u64;
            }
        }

        let elapsed = clock.now().wrapping_sub(start).max(1);

        // Verification runs outside the timed interval so the verify flag
        // does not perturb the throughput numbers.
        let mut ops_failed: u64 = 0;
        if self.cfg.verify {
            debug_assert_eq!(slots.len() as u64, total);
            for slot in &slots {
                let idx = slot.buffer as usize;
                let buf = self
                    .buffers
                    .dest(idx, self.cfg.out_of_place.then_some(idx));
                if slot.status != OpStatus::Success
                    || !verify_buffer(buf, &self.cfg, &self.vectors)
                {
                    ops_failed += 1;
                }
            }
        }

        let seconds = elapsed as f64 / clock.hz() as f64;
        let ops_per_second = total as f64 / seconds;
        let throughput_gbps = ops_per_second * self.cfg.buffer_size as f64 * 8.0 / 1e9;
        let cycles_per_byte = elapsed as f64 / total as f64 / self.cfg.buffer_size as f64;

        let results = RunResults {
            dev_id: self.dev_id,
            queue_id: self.queue_id,
            lane_id: self.lane_id,
            burst_size: self.cfg.burst_size,
            buffer_size: self.cfg.buffer_size,
            ops_enqueued: enqueued,
            ops_dequeued: dequeued,
            ops_enqueued_failed: enqueue_failed,
            ops_dequeued_failed: dequeue_failed,
            ops_failed,
            ops_per_second,
            throughput_gbps,
            cycles_per_byte,
        };
        self.results = Some(results.clone());
        Ok(results)
    }

    /// Results of the last completed run, if any.
    pub fn results(&self) -> Option<&RunResults> {
        self.results.as_ref()
    }

    /// Borrow of the buffer pool, for post-run inspection in tests.
    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    /// Emits the final report in the configured format, destroys the
    /// session and releases the pools (reverse build order, by drop).
    ///
    /// Returns the results snapshot, or `None` when `run` was never called.
    pub fn finish<W: Write>(mut self, sink: &mut W) -> io::Result<Option<RunResults>> {
        if let Some(results) = &self.results {
            match self.cfg.output {
                OutputFormat::Human => report::write_human(sink, results)?,
                OutputFormat::Csv => report::write_csv(sink, results)?,
            }
        }
        if let Some(session) = self.session.take() {
            self.device.destroy_session(session);
        }
        Ok(self.results.take())
    }
}

/// Fatal construction failure.
#[derive(Debug)]
pub enum ConstructError {
    /// Configuration invariant violated.
    Config(ConfigError),
    /// Fixture lengths disagree with the configured buffer size.
    FixtureMismatch { fixture_len: usize, buffer_size: usize },
    /// Session creation was refused.
    Session(SessionError),
    /// Pool allocation failed.
    Alloc(BuildError),
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::FixtureMismatch {
                fixture_len,
                buffer_size,
            } => write!(
                f,
                "fixture length {fixture_len} does not match buffer size {buffer_size}"
            ),
            Self::Session(e) => e.fmt(f),
            Self::Alloc(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ConstructError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::FixtureMismatch { .. } => None,
            Self::Session(e) => Some(e),
            Self::Alloc(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ConstructError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SessionError> for ConstructError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl From<BuildError> for ConstructError {
    fn from(e: BuildError) -> Self {
        Self::Alloc(e)
    }
}

/// Fatal mid-run failure.
#[derive(Debug)]
pub enum RunError {
    /// The op pool could not satisfy a bulk allocation in full.
    OpAlloc(OpPoolError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpAlloc(e) => write!(f, "descriptor allocation failed: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OpAlloc(e) => Some(e),
        }
    }
}

impl From<OpPoolError> for RunError {
    fn from(e: OpPoolError) -> Self {
        Self::OpAlloc(e)
    }
}
