//! Cycle counting for the timed interval.
//!
//! On x86-64 this reads the TSC directly and calibrates its frequency
//! against the monotonic clock once per process. Elsewhere the monotonic clock
//! itself stands in, with nanoseconds treated as cycles of a 1 GHz counter
//! so cycles-per-byte stays comparable across hosts.

use std::time::Instant;

#[cfg(target_arch = "x86_64")]
use std::sync::OnceLock;

/// Calibrated cycle source for one run.
///
/// Cheap to read in the loop; calibration cost is paid once at construction,
/// before the timed interval starts.
pub struct CycleClock {
    hz: u64,
    #[cfg(not(target_arch = "x86_64"))]
    epoch: Instant,
}

/// Calibration window. Long enough to bound frequency error to well under
/// a percent, short enough to not dominate small test runs.
const CALIBRATE_MS: u64 = 10;

impl CycleClock {
    /// Builds a clock with a measured cycles-per-second estimate.
    ///
    /// Calibration runs once per process; later clocks reuse the estimate.
    #[cfg(target_arch = "x86_64")]
    pub fn calibrated() -> Self {
        static HZ: OnceLock<u64> = OnceLock::new();
        let hz = *HZ.get_or_init(|| {
            let t0 = Instant::now();
            let c0 = read_tsc();
            while t0.elapsed().as_millis() < CALIBRATE_MS as u128 {
                std::hint::spin_loop();
            }
            let cycles = read_tsc().wrapping_sub(c0);
            let nanos = t0.elapsed().as_nanos().max(1) as u64;
            (((cycles as u128 * 1_000_000_000) / nanos as u128) as u64).max(1)
        });
        Self { hz }
    }

    /// Builds a clock over the monotonic timer.
    #[cfg(not(target_arch = "x86_64"))]
    pub fn calibrated() -> Self {
        Self {
            hz: 1_000_000_000,
            epoch: Instant::now(),
        }
    }

    /// Current cycle count.
    #[cfg(target_arch = "x86_64")]
    pub fn now(&self) -> u64 {
        read_tsc()
    }

    /// Current cycle count (nanoseconds since clock construction).
    #[cfg(not(target_arch = "x86_64"))]
    pub fn now(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Estimated cycles per second.
    pub fn hz(&self) -> u64 {
        self.hz
    }
}

#[cfg(target_arch = "x86_64")]
fn read_tsc() -> u64 {
    // SAFETY: _rdtsc has no memory or validity preconditions; it is
    // available on every x86-64 CPU.
    unsafe { core::arch::x86_64::_rdtsc() }
}
