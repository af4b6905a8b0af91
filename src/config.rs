//! Run configuration for a throughput measurement.
//!
//! Parsing command lines or config files into a [`RunConfig`] is the caller's
//! job; this module only defines the shape of a run and validates it. All
//! invalid combinations are rejected up front by [`RunConfig::validate`] so
//! the hot loop can rely on them without re-checking.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Alignment applied to the associated-data header prepended in AEAD mode.
///
/// The header occupies `aad_size` rounded up to this boundary; the pad bytes
/// are zero and are skipped by the verifier via the region offset table.
pub const AAD_ALIGN: usize = 16;

/// Symmetric workload shape for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpMode {
    /// Cipher pass only.
    CipherOnly,
    /// Authentication pass only.
    AuthOnly,
    /// Cipher pass followed by an authentication pass.
    CipherThenAuth,
    /// Authentication pass followed by a cipher pass.
    AuthThenCipher,
    /// Authenticated encryption with associated data.
    Aead,
}

impl OpMode {
    /// True when the workload includes a cipher pass.
    pub fn has_cipher(self) -> bool {
        !matches!(self, OpMode::AuthOnly)
    }

    /// True when the workload includes an authentication pass.
    pub fn has_auth(self) -> bool {
        !matches!(self, OpMode::CipherOnly)
    }
}

/// Direction of the cipher pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherDirection {
    Encrypt,
    Decrypt,
}

/// Direction of the authentication pass.
///
/// `Generate` produces a digest the verifier can compare byte-for-byte;
/// `Verify` makes the device's completion status authoritative instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthDirection {
    Generate,
    Verify,
}

/// Final report shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Multi-line human-readable block.
    Human,
    /// Single semicolon-delimited line with a once-per-process header.
    Csv,
}

/// Configuration for one throughput run.
///
/// One instance describes the workload for a single device/queue/lane triple.
/// Construction of a run context calls [`validate`](Self::validate); callers
/// building configs by hand should do the same before relying on them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Logical message size in bytes (excludes AAD header and digest trailer).
    pub buffer_size: usize,
    /// Number of segments each input buffer is split into.
    pub segment_count: usize,
    /// Number of pre-built buffers; the op-pool capacity matches it.
    pub pool_size: usize,
    /// Operations submitted/retrieved per round.
    pub burst_size: usize,
    /// Total operations the run must account for.
    pub total_ops: u64,
    /// Workload shape.
    pub mode: OpMode,
    /// Cipher pass direction.
    pub cipher_dir: CipherDirection,
    /// Authentication pass direction.
    pub auth_dir: AuthDirection,
    /// When set, results land in a distinct single-segment output buffer.
    pub out_of_place: bool,
    /// When set, every completed operation is checked against the fixtures.
    pub verify: bool,
    /// Final report shape.
    pub output: OutputFormat,
    /// Digest trailer size in bytes (0 for cipher-only runs).
    pub digest_size: usize,
    /// Associated-data size in bytes (AEAD mode only).
    pub aad_size: usize,
}

impl RunConfig {
    /// Checks the invariants the runner depends on.
    ///
    /// The pool/burst multiple is load-bearing: the buffer cursor wraps in
    /// whole-burst steps and in-flight tracking assumes it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.segment_count == 0 {
            return Err(ConfigError::ZeroSegmentCount);
        }
        if self.segment_count > self.buffer_size {
            return Err(ConfigError::SegmentsExceedBuffer {
                segments: self.segment_count,
                buffer_size: self.buffer_size,
            });
        }
        if self.burst_size == 0 {
            return Err(ConfigError::ZeroBurstSize);
        }
        if self.pool_size == 0 || !self.pool_size.is_multiple_of(self.burst_size) {
            return Err(ConfigError::PoolNotMultipleOfBurst {
                pool_size: self.pool_size,
                burst_size: self.burst_size,
            });
        }
        if self.total_ops == 0 {
            return Err(ConfigError::ZeroTotalOps);
        }
        if self.mode.has_auth() && self.digest_size == 0 {
            return Err(ConfigError::ZeroDigestSize);
        }
        if self.mode == OpMode::Aead && self.aad_size == 0 {
            return Err(ConfigError::ZeroAadSize);
        }
        Ok(())
    }

    /// AAD header bytes actually reserved at the front of an input buffer.
    ///
    /// Zero for every mode except AEAD; aligned up to [`AAD_ALIGN`].
    pub fn aad_header_len(&self) -> usize {
        if self.mode == OpMode::Aead {
            self.aad_size.next_multiple_of(AAD_ALIGN)
        } else {
            0
        }
    }
}

/// Rejected configuration combinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `buffer_size == 0`.
    ZeroBufferSize,
    /// `segment_count == 0`.
    ZeroSegmentCount,
    /// More segments than bytes to split.
    SegmentsExceedBuffer { segments: usize, buffer_size: usize },
    /// `burst_size == 0`.
    ZeroBurstSize,
    /// Pool size is not a positive multiple of the burst size.
    PoolNotMultipleOfBurst { pool_size: usize, burst_size: usize },
    /// `total_ops == 0`.
    ZeroTotalOps,
    /// Auth workload with no digest trailer.
    ZeroDigestSize,
    /// AEAD workload with no associated data.
    ZeroAadSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBufferSize => write!(f, "buffer_size must be > 0"),
            Self::ZeroSegmentCount => write!(f, "segment_count must be > 0"),
            Self::SegmentsExceedBuffer {
                segments,
                buffer_size,
            } => write!(
                f,
                "segment_count {segments} exceeds buffer_size {buffer_size}"
            ),
            Self::ZeroBurstSize => write!(f, "burst_size must be > 0"),
            Self::PoolNotMultipleOfBurst {
                pool_size,
                burst_size,
            } => write!(
                f,
                "pool_size {pool_size} is not a multiple of burst_size {burst_size}"
            ),
            Self::ZeroTotalOps => write!(f, "total_ops must be > 0"),
            Self::ZeroDigestSize => write!(f, "digest_size must be > 0 for auth workloads"),
            Self::ZeroAadSize => write!(f, "aad_size must be > 0 for AEAD workloads"),
        }
    }
}

impl std::error::Error for ConfigError {}
