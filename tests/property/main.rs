//! Property-based tests for the runner and the verifier.
//!
//! Run with: `cargo test --test property`

mod runner_conservation;
mod verify_regions;
