//! Metrics sink boundary.
//!
//! Row and index code never touches `obs::metrics` directly; every counter
//! update flows through a `MetricsEvent` handed to the active sink.
use crate::obs::metrics::{self, EventReport};
use std::cell::Cell;

thread_local! {
    static SINK_OVERRIDE: Cell<Option<&'static dyn MetricsSink>> = const { Cell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    SaveStart {
        model: &'a str,
    },
    SaveFinish {
        model: &'a str,
        writes: u64,
        columns: u64,
    },
    Load {
        model: &'a str,
        keys: u64,
        rows: u64,
    },
    IndexAppend {
        model: &'a str,
    },
    DuplicateSuppressed {
        model: &'a str,
    },
    UniquenessScan {
        model: &'a str,
        entries: u64,
    },
    HookRun {
        model: &'a str,
        failed: bool,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink writing into the thread's metrics state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::SaveStart { model } => metrics::with_state_mut(|m| {
                m.ops.save_calls = m.ops.save_calls.saturating_add(1);
                let entry = m.model_mut(model);
                entry.save_calls = entry.save_calls.saturating_add(1);
            }),

            MetricsEvent::SaveFinish {
                model,
                writes,
                columns,
            } => metrics::with_state_mut(|m| {
                m.ops.saves_completed = m.ops.saves_completed.saturating_add(1);
                m.ops.rows_written = m.ops.rows_written.saturating_add(writes);
                m.ops.columns_written = m
                    .ops
                    .columns_written
                    .saturating_add(columns.saturating_mul(writes));
                let entry = m.model_mut(model);
                entry.rows_written = entry.rows_written.saturating_add(writes);
            }),

            MetricsEvent::Load { model, keys, rows } => metrics::with_state_mut(|m| {
                m.ops.load_calls = m.ops.load_calls.saturating_add(1);
                m.ops.keys_requested = m.ops.keys_requested.saturating_add(keys);
                m.ops.rows_loaded = m.ops.rows_loaded.saturating_add(rows);
                let entry = m.model_mut(model);
                entry.load_calls = entry.load_calls.saturating_add(1);
                entry.rows_loaded = entry.rows_loaded.saturating_add(rows);
            }),

            MetricsEvent::IndexAppend { model } => metrics::with_state_mut(|m| {
                m.ops.index_appends = m.ops.index_appends.saturating_add(1);
                let entry = m.model_mut(model);
                entry.index_appends = entry.index_appends.saturating_add(1);
            }),

            MetricsEvent::DuplicateSuppressed { model } => metrics::with_state_mut(|m| {
                m.ops.duplicates_suppressed = m.ops.duplicates_suppressed.saturating_add(1);
                let entry = m.model_mut(model);
                entry.duplicates_suppressed = entry.duplicates_suppressed.saturating_add(1);
            }),

            MetricsEvent::UniquenessScan { entries, .. } => metrics::with_state_mut(|m| {
                m.ops.uniqueness_scans = m.ops.uniqueness_scans.saturating_add(1);
                m.ops.entries_scanned = m.ops.entries_scanned.saturating_add(entries);
            }),

            MetricsEvent::HookRun { model, failed } => metrics::with_state_mut(|m| {
                m.ops.hooks_run = m.ops.hooks_run.saturating_add(1);
                if failed {
                    m.ops.hooks_failed = m.ops.hooks_failed.saturating_add(1);
                    let entry = m.model_mut(model);
                    entry.hooks_failed = entry.hooks_failed.saturating_add(1);
                }
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    match SINK_OVERRIDE.with(Cell::get) {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's metrics.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics state for the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &'static dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<&'static dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.replace(Some(sink)));
    let _guard = Guard(prev);

    f()
}
