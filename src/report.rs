//! Final metrics snapshot and its two output shapes.
//!
//! Reports are written to an injected sink rather than straight to stdout so
//! callers can redirect, capture or merge them. The CSV header is emitted at
//! most once per process no matter how many runs report, so multi-lane runs
//! concatenate into one readable table.

use std::io::{self, Write};
use std::sync::Once;

use serde::{Deserialize, Serialize};

/// Accumulated counters and derived metrics for one finished run.
///
/// `Serialize` is derived so external formatters can emit shapes beyond the
/// two built-in ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    /// Device the run executed on.
    pub dev_id: u8,
    /// Queue pair within the device.
    pub queue_id: u16,
    /// Logical execution unit driving the queue.
    pub lane_id: u32,
    /// Operations per submitted burst.
    pub burst_size: usize,
    /// Logical message size in bytes.
    pub buffer_size: usize,
    /// Operations accepted by the device.
    pub ops_enqueued: u64,
    /// Operations retrieved from the device.
    pub ops_dequeued: u64,
    /// Rounds where the device accepted fewer operations than offered.
    pub ops_enqueued_failed: u64,
    /// Polls that returned no completions.
    pub ops_dequeued_failed: u64,
    /// Operations failing verification (status or bytes).
    pub ops_failed: u64,
    /// Average completed operations per second.
    pub ops_per_second: f64,
    /// Average throughput in gigabits per second.
    pub throughput_gbps: f64,
    /// Average cycles spent per processed byte.
    pub cycles_per_byte: f64,
}

static CSV_HEADER: Once = Once::new();

/// Writes the human-readable report block.
pub fn write_human<W: Write>(w: &mut W, r: &RunResults) -> io::Result<()> {
    writeln!(w, "\n# Device {} on lane {}", r.dev_id, r.lane_id)?;
    writeln!(
        w,
        "# Buffer Size(B)\t  Enqueued\t  Dequeued\tFailed Enq\tFailed Deq\
         \tOps(Millions)\tThroughput(Gbps)\tCycles Per Byte"
    )?;
    writeln!(
        w,
        "\n{:16}\t{:10}\t{:10}\t{:10}\t{:10}\t{:16.4}\t{:16.4}\t{:15.2}",
        r.buffer_size,
        r.ops_enqueued,
        r.ops_dequeued,
        r.ops_enqueued_failed,
        r.ops_dequeued_failed,
        r.ops_per_second / 1_000_000.0,
        r.throughput_gbps,
        r.cycles_per_byte
    )?;
    if r.ops_failed > 0 {
        writeln!(w, "# Failed verification: {}", r.ops_failed)?;
    }
    Ok(())
}

/// Writes one delimited result line, preceded by the column header the first
/// time any run in this process reports in CSV form.
pub fn write_csv<W: Write>(w: &mut W, r: &RunResults) -> io::Result<()> {
    let mut header = Ok(());
    CSV_HEADER.call_once(|| {
        header = writeln!(
            w,
            "# Lane id,Burst Size,Buffer Size(B),Enqueued,Dequeued,\
             Failed Enq,Failed Deq,Ops(Millions),Throughput(Gbps),Cycles Per Byte"
        );
    });
    header?;

    writeln!(
        w,
        "{};{};{};{};{};{};{};{:.3};{:.3};{:.3}",
        r.lane_id,
        r.burst_size,
        r.buffer_size,
        r.ops_enqueued,
        r.ops_dequeued,
        r.ops_enqueued_failed,
        r.ops_dequeued_failed,
        r.ops_per_second / 1_000_000.0,
        r.throughput_gbps,
        r.cycles_per_byte
    )
}
