//! CSV header emission is once-per-process.
//!
//! This lives in its own integration binary so no other test can consume
//! the process-wide header guard first. Both reports are written from a
//! single test function for the same reason.

use cryptoperf_rs::{write_csv, RunResults};

fn results(lane_id: u32) -> RunResults {
    RunResults {
        dev_id: 0,
        queue_id: 0,
        lane_id,
        burst_size: 32,
        buffer_size: 1024,
        ops_enqueued: 1024,
        ops_dequeued: 1024,
        ops_enqueued_failed: 0,
        ops_dequeued_failed: 3,
        ops_failed: 0,
        ops_per_second: 1_000_000.0,
        throughput_gbps: 8.192,
        cycles_per_byte: 2.5,
    }
}

#[test]
fn csv_header_appears_exactly_once_across_runs() {
    let mut first = Vec::new();
    let mut second = Vec::new();
    write_csv(&mut first, &results(0)).unwrap();
    write_csv(&mut second, &results(1)).unwrap();

    let first = String::from_utf8(first).unwrap();
    let second = String::from_utf8(second).unwrap();

    assert!(first.starts_with("# Lane id,"));
    assert!(!second.contains("# Lane id,"));

    // Both carry their data line.
    assert!(first.lines().any(|l| l.starts_with("0;32;1024;")));
    assert!(second.lines().any(|l| l.starts_with("1;32;1024;")));
}
