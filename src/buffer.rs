//! Segmented message buffers and the pre-built buffer pools.
//!
//! Every buffer is allocated once during construction and reused for the
//! whole run; the device overwrites contents in place across iterations and
//! nothing is freed until the context is torn down. Allocation failure while
//! building any buffer aborts construction with [`BuildError`] rather than
//! degrading the pool.
//!
//! Layout of one input buffer (AEAD mode):
//!
//! ```text
//! [ aad | pad to 16 ][ seg 0 ][ seg 1 ] ... [ seg n-1 | digest trailer ]
//! ```
//!
//! The payload is split into `segment_count` equal shares with the remainder
//! absorbed by the last segment. Out-of-place output buffers are always built
//! single-segment.

use std::collections::TryReserveError;
use std::fmt;

use crate::config::RunConfig;
use crate::vectors::TestVectors;

/// One logical message as a chain of owned contiguous segments.
///
/// Offsets used by operations and the verifier address the logical
/// concatenation of all segments, not any single segment.
#[derive(Clone, Debug)]
pub struct SegBuffer {
    segs: Vec<Vec<u8>>,
}

impl SegBuffer {
    /// Number of segments currently forming the buffer.
    pub fn segment_count(&self) -> usize {
        self.segs.len()
    }

    /// Total logical length across all segments.
    pub fn total_len(&self) -> usize {
        self.segs.iter().map(Vec::len).sum()
    }

    /// Reconstructs the logical message as one contiguous image.
    pub fn to_contiguous(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        for seg in &self.segs {
            out.extend_from_slice(seg);
        }
        out
    }

    /// Coalesces all segments into a single contiguous segment.
    ///
    /// Used before submission when the device cannot scatter-gather. Logical
    /// content and total length are unchanged; segment count becomes 1.
    pub fn linearize(&mut self) {
        if self.segs.len() <= 1 {
            return;
        }
        let flat = self.to_contiguous();
        self.segs.clear();
        self.segs.push(flat);
    }

    /// Writes `data` at a logical offset, spanning segment boundaries.
    ///
    /// Panics if the write would run past the end of the buffer; operation
    /// regions are validated against buffer geometry at populate time.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) {
        assert!(
            offset + data.len() <= self.total_len(),
            "write of {} bytes at offset {offset} exceeds buffer of {} bytes",
            data.len(),
            self.total_len()
        );

        let mut remaining = data;
        let mut skip = offset;
        for seg in &mut self.segs {
            if skip >= seg.len() {
                skip -= seg.len();
                continue;
            }
            let take = remaining.len().min(seg.len() - skip);
            seg[skip..skip + take].copy_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
            skip = 0;
            if remaining.is_empty() {
                break;
            }
        }
        debug_assert!(remaining.is_empty());
    }

    /// Builds one input buffer prefilled from the fixtures.
    ///
    /// `segment_count` controls the payload split; out-of-place output
    /// buffers pass 1 here regardless of the configured count.
    pub fn build(
        cfg: &RunConfig,
        vectors: &TestVectors,
        segment_count: usize,
    ) -> Result<Self, BuildError> {
        let share = cfg.buffer_size / segment_count;
        let last_extra = cfg.buffer_size % segment_count;
        let data = vectors.input_data(cfg);
        assert_eq!(data.len(), cfg.buffer_size, "fixture length mismatch");

        let mut segs: Vec<Vec<u8>> = Vec::new();
        segs.try_reserve_exact(segment_count)?;

        let mut consumed = 0usize;
        for i in 0..segment_count {
            let mut len = share;
            if i == segment_count - 1 {
                len += last_extra;
            }

            // First segment carries the aligned AAD header, last carries the
            // digest trailer. With one segment it carries both.
            let head = if i == 0 { cfg.aad_header_len() } else { 0 };
            let tail = if i == segment_count - 1 {
                cfg.digest_size
            } else {
                0
            };

            let mut seg: Vec<u8> = Vec::new();
            seg.try_reserve_exact(head + len + tail)?;
            if head > 0 {
                seg.extend_from_slice(&vectors.aad);
                seg.resize(head, 0);
            }
            seg.extend_from_slice(&data[consumed..consumed + len]);
            seg.resize(seg.len() + tail, 0);

            consumed += len;
            segs.push(seg);
        }
        debug_assert_eq!(consumed, cfg.buffer_size);

        Ok(Self { segs })
    }
}

/// Pre-built input buffers and, in out-of-place mode, their output twins.
///
/// Input slot `i` and output slot `i` are bound to the same operation;
/// in-place runs leave every output slot empty and the device writes back
/// into the input buffer.
#[derive(Debug)]
pub struct BufferPool {
    inputs: Vec<SegBuffer>,
    outputs: Vec<Option<SegBuffer>>,
}

impl BufferPool {
    /// Builds `pool_size` inputs (and outputs when out-of-place).
    pub fn build(cfg: &RunConfig, vectors: &TestVectors) -> Result<Self, BuildError> {
        let mut inputs = Vec::new();
        inputs.try_reserve_exact(cfg.pool_size)?;
        for _ in 0..cfg.pool_size {
            inputs.push(SegBuffer::build(cfg, vectors, cfg.segment_count)?);
        }

        let mut outputs = Vec::new();
        outputs.try_reserve_exact(cfg.pool_size)?;
        for _ in 0..cfg.pool_size {
            outputs.push(if cfg.out_of_place {
                Some(SegBuffer::build(cfg, vectors, 1)?)
            } else {
                None
            });
        }

        Ok(Self { inputs, outputs })
    }

    /// Number of input slots.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True when the pool holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Input buffer at `idx`.
    pub fn input(&self, idx: usize) -> &SegBuffer {
        &self.inputs[idx]
    }

    /// Mutable input buffer at `idx`.
    pub fn input_mut(&mut self, idx: usize) -> &mut SegBuffer {
        &mut self.inputs[idx]
    }

    /// Output buffer at `idx`, when built out-of-place.
    pub fn output(&self, idx: usize) -> Option<&SegBuffer> {
        self.outputs[idx].as_ref()
    }

    /// Destination buffer for an operation: the output slot when one exists,
    /// otherwise the input buffer itself.
    pub fn dest(&self, in_idx: usize, out_idx: Option<usize>) -> &SegBuffer {
        match out_idx {
            Some(o) => self.outputs[o].as_ref().expect("missing output buffer"),
            None => &self.inputs[in_idx],
        }
    }

    /// Mutable destination buffer for an operation.
    pub fn dest_mut(&mut self, in_idx: usize, out_idx: Option<usize>) -> &mut SegBuffer {
        match out_idx {
            Some(o) => self.outputs[o].as_mut().expect("missing output buffer"),
            None => &mut self.inputs[in_idx],
        }
    }
}

/// Fatal allocation failure while building pools or the run context.
#[derive(Debug)]
pub enum BuildError {
    /// The allocator refused a buffer or pool reservation.
    Alloc(TryReserveError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "buffer allocation failed: {e}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
        }
    }
}

impl From<TryReserveError> for BuildError {
    fn from(e: TryReserveError) -> Self {
        Self::Alloc(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthDirection, CipherDirection, OpMode, OutputFormat};
    use crate::vectors::demo_vectors;

    fn cfg(mode: OpMode, segments: usize, out_of_place: bool) -> RunConfig {
        RunConfig {
            buffer_size: 100,
            segment_count: segments,
            pool_size: 8,
            burst_size: 8,
            total_ops: 8,
            mode,
            cipher_dir: CipherDirection::Encrypt,
            auth_dir: AuthDirection::Generate,
            out_of_place,
            verify: false,
            output: OutputFormat::Human,
            digest_size: if mode == OpMode::CipherOnly { 0 } else { 16 },
            aad_size: if mode == OpMode::Aead { 20 } else { 0 },
        }
    }

    #[test]
    fn last_segment_absorbs_remainder() {
        let cfg = cfg(OpMode::CipherOnly, 3, false);
        let v = demo_vectors(&cfg);
        let buf = SegBuffer::build(&cfg, &v, 3).unwrap();
        // 100 / 3 = 33 per share, remainder 1 lands in the last segment.
        assert_eq!(buf.segment_count(), 3);
        assert_eq!(buf.total_len(), 100);
        assert_eq!(buf.to_contiguous(), v.plaintext);
    }

    #[test]
    fn aead_layout_has_aligned_header_and_trailer() {
        let cfg = cfg(OpMode::Aead, 2, false);
        let v = demo_vectors(&cfg);
        let buf = SegBuffer::build(&cfg, &v, 2).unwrap();

        // 20-byte AAD aligns up to 32; payload 100; digest 16.
        assert_eq!(buf.total_len(), 32 + 100 + 16);
        let flat = buf.to_contiguous();
        assert_eq!(&flat[..20], &v.aad[..]);
        assert!(flat[20..32].iter().all(|&b| b == 0));
        assert_eq!(&flat[32..132], &v.plaintext[..]);
    }

    #[test]
    fn decrypt_prefills_ciphertext() {
        let mut cfg = cfg(OpMode::CipherOnly, 1, false);
        cfg.cipher_dir = CipherDirection::Decrypt;
        let v = demo_vectors(&cfg);
        let buf = SegBuffer::build(&cfg, &v, 1).unwrap();
        assert_eq!(buf.to_contiguous(), v.ciphertext);
    }

    #[test]
    fn linearize_preserves_content() {
        let cfg = cfg(OpMode::CipherThenAuth, 4, false);
        let v = demo_vectors(&cfg);
        let mut buf = SegBuffer::build(&cfg, &v, 4).unwrap();
        let before = buf.to_contiguous();
        buf.linearize();
        assert_eq!(buf.segment_count(), 1);
        assert_eq!(buf.to_contiguous(), before);
    }

    #[test]
    fn write_at_spans_segments() {
        let cfg = cfg(OpMode::CipherOnly, 4, false);
        let v = demo_vectors(&cfg);
        let mut buf = SegBuffer::build(&cfg, &v, 4).unwrap();
        let patch: Vec<u8> = (0..40).collect();
        buf.write_at(10, &patch);
        let flat = buf.to_contiguous();
        assert_eq!(&flat[10..50], &patch[..]);
    }

    #[test]
    fn out_of_place_outputs_are_single_segment() {
        let cfg = cfg(OpMode::CipherOnly, 4, true);
        let v = demo_vectors(&cfg);
        let pool = BufferPool::build(&cfg, &v).unwrap();
        assert_eq!(pool.len(), 8);
        assert_eq!(pool.input(0).segment_count(), 4);
        assert_eq!(pool.output(0).unwrap().segment_count(), 1);
    }

    #[test]
    fn in_place_leaves_output_slots_empty() {
        let cfg = cfg(OpMode::CipherOnly, 1, false);
        let v = demo_vectors(&cfg);
        let pool = BufferPool::build(&cfg, &v).unwrap();
        assert!(pool.output(0).is_none());
        assert_eq!(pool.dest(3, None).total_len(), pool.input(3).total_len());
    }
}
