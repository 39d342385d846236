//! Prometheus metrics for schedule compilation and decompilation.
//!
//! Metrics are registered lazily on first access using once_cell::Lazy.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};

// ===== Compilation Metrics =====

/// Compiled profiles by chosen path (`uniform` or `batches`)
pub static COMPILATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loadramp_compilations_total",
        "Total number of compiled load profiles",
        &["path"]
    )
    .expect("Failed to register compilations counter")
});

/// Rejected profiles by error kind
pub static COMPILE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loadramp_compile_errors_total",
        "Total number of load profiles that failed to compile",
        &["kind"]
    )
    .expect("Failed to register compile errors counter")
});

/// Number of batches produced per batch schedule
pub static BATCHES_PER_SCHEDULE: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "loadramp_batches_per_schedule",
        "Number of batches produced per batch schedule",
        vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0]
    )
    .expect("Failed to register batches per schedule histogram")
});

/// Compile time by path
pub static COMPILE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "loadramp_compile_duration_seconds",
        "Profile compilation duration in seconds",
        &["path"],
        // Buckets: 10us, 50us, 100us, 500us, 1ms, 5ms, 10ms, 50ms
        vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]
    )
    .expect("Failed to register compile duration histogram")
});

// ===== Decompilation Metrics =====

/// Total number of decompiled schedules
pub static DECOMPILATIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "loadramp_decompilations_total",
        "Total number of schedules decompiled back into profile operations"
    )
    .expect("Failed to register decompilations counter")
});

/// Breakpoints left after timeline compaction
pub static TIMELINE_BREAKPOINTS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "loadramp_timeline_breakpoints",
        "Number of breakpoints in compacted timelines",
        vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0]
    )
    .expect("Failed to register timeline breakpoints histogram")
});
