//! Throughput harness for asynchronous symmetric-crypto accelerators.
//!
//! ## Scope
//! This crate measures sustained throughput of an accelerator executing
//! cipher, auth, cipher+auth and AEAD workloads, reporting operations per
//! second, Gbps and cycles per byte for a fixed buffer size and burst depth.
//! It implements no cryptography: the device, modeled by the capability
//! traits in [`device`], performs (or fakes) every transform.
//!
//! ## Key invariants
//! - All memory is pre-built: buffer and descriptor pools are allocated at
//!   construction and recycled for the whole run.
//! - The pool size is a whole multiple of the burst size, and in-flight
//!   operations never exceed one burst, so buffer slots are never rebound
//!   while a prior submission is outstanding.
//! - Operations the device rejects are retried unchanged, keeping their
//!   original verification binding; every configured operation is accounted
//!   for before the run ends.
//!
//! ## Run flow
//! `RunConfig` + `TestVectors` -> session + pools ->
//! [`ThroughputCtx::run`] (pipelined submit/poll loop, drain) ->
//! optional verification -> report via [`ThroughputCtx::finish`].
//!
//! ## Notable entry points
//! - [`ThroughputCtx`]: construct / run / finish one measurement.
//! - [`CryptoDevice`] / [`SessionFactory`]: implement these over a real
//!   driver queue to measure hardware.
//! - [`StubDevice`]: deterministic software device for tests and benches.
//! - [`demo_vectors`]: canned fixtures sized to a configuration.

pub mod buffer;
pub mod config;
pub mod cycles;
pub mod device;
pub mod oppool;
pub mod report;
pub mod runner;
pub mod stub;
pub mod vectors;
pub mod verify;

pub use buffer::{BufferPool, BuildError, SegBuffer};
pub use config::{
    AuthDirection, CipherDirection, ConfigError, OpMode, OutputFormat, RunConfig, AAD_ALIGN,
};
pub use device::{
    populate_symmetric_ops, CapabilityFlags, CryptoDevice, OpPopulator, SessionError,
    SessionFactory, SessionHandle,
};
pub use oppool::{OpDescriptor, OpPool, OpPoolError, OpRegion, OpStatus};
pub use report::{write_csv, write_human, RunResults};
pub use runner::{ConstructError, RunError, ThroughputCtx};
pub use stub::StubDevice;
pub use vectors::{demo_vectors, TestVectors};
pub use verify::{verify_buffer, RegionLayout};
