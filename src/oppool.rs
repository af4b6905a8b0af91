//! Recyclable fixed-capacity pool of operation descriptors.
//!
//! Descriptors are always taken and returned in bulk, one burst at a time,
//! to amortize bookkeeping over the round. Bulk allocation is all-or-nothing:
//! receiving fewer descriptors than asked for is a fatal failure, never a
//! partial success. Release validates the descriptor count so a double free
//! of a burst is caught immediately.

use std::fmt;

use crate::device::SessionHandle;

/// Completion status reported by the device for one operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpStatus {
    /// Not yet processed (initial state, also "unspecified" on the wire).
    #[default]
    NotProcessed,
    /// Processed successfully.
    Success,
    /// The device's own auth check rejected the operation.
    AuthFailed,
    /// Generic processing error.
    Error,
}

/// Byte range within a buffer's logical concatenation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpRegion {
    pub offset: u32,
    pub len: u32,
}

/// One submitted request.
///
/// References its buffers by pool index rather than by pointer so the
/// descriptor stays `Copy` and survives recycling through the pool. The
/// `token` is the opaque correlation handle: when verification is enabled it
/// is the index of the operation's result slot and is preserved across
/// submission retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpDescriptor {
    /// Input buffer index in the buffer pool.
    pub input: u32,
    /// Output buffer index, out-of-place mode only.
    pub output: Option<u32>,
    /// Session the operation executes under.
    pub session: SessionHandle,
    /// Cipher pass byte range, when the mode has one.
    pub cipher: Option<OpRegion>,
    /// Auth pass byte range, when the mode has one.
    pub auth: Option<OpRegion>,
    /// Opaque correlation handle (result-slot index under verification).
    pub token: u64,
    /// Completion status, written by the device.
    pub status: OpStatus,
}

/// Fixed-capacity recyclable descriptor allocator.
#[derive(Debug)]
pub struct OpPool {
    free: Vec<OpDescriptor>,
    capacity: usize,
}

impl OpPool {
    /// Creates a pool holding exactly `capacity` descriptors.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "op pool capacity must be > 0");
        let free = vec![OpDescriptor::default(); capacity];
        Self { free, capacity }
    }

    /// Descriptors currently available.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total pool capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Takes exactly `n` descriptors, appending them to `out`.
    ///
    /// Fails without taking anything when fewer than `n` are free.
    pub fn alloc_bulk(&mut self, n: usize, out: &mut Vec<OpDescriptor>) -> Result<(), OpPoolError> {
        if n > self.free.len() {
            return Err(OpPoolError::Exhausted {
                requested: n,
                available: self.free.len(),
            });
        }
        let at = self.free.len() - n;
        out.extend(self.free.drain(at..).map(|mut op| {
            op.status = OpStatus::NotProcessed;
            op
        }));
        Ok(())
    }

    /// Returns a burst of descriptors to the pool.
    ///
    /// Panics if the return would exceed capacity; that indicates a burst
    /// freed twice.
    pub fn free_bulk<I: IntoIterator<Item = OpDescriptor>>(&mut self, ops: I) {
        for op in ops {
            assert!(
                self.free.len() < self.capacity,
                "op pool over-freed; burst returned twice"
            );
            self.free.push(op);
        }
    }
}

/// Bulk allocation could not be satisfied in full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpPoolError {
    Exhausted { requested: usize, available: usize },
}

impl fmt::Display for OpPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                available,
            } => write!(
                f,
                "op pool exhausted: requested {requested}, available {available}"
            ),
        }
    }
}

impl std::error::Error for OpPoolError {}
