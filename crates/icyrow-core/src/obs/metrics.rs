use crate::types::timestamp::now_millis;
use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for row and index operations.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub models: BTreeMap<String, ModelCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            models: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

impl EventState {
    pub(crate) fn model_mut(&mut self, model: &str) -> &mut ModelCounters {
        self.models.entry(model.to_string()).or_default()
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOps {
    // saves
    pub save_calls: u64,
    pub saves_completed: u64,
    pub rows_written: u64,
    pub columns_written: u64,

    // loads
    pub load_calls: u64,
    pub keys_requested: u64,
    pub rows_loaded: u64,

    // index maintenance
    pub index_appends: u64,
    pub duplicates_suppressed: u64,
    pub uniqueness_scans: u64,
    pub entries_scanned: u64,

    // hooks
    pub hooks_run: u64,
    pub hooks_failed: u64,
}

///
/// ModelCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct ModelCounters {
    pub save_calls: u64,
    pub rows_written: u64,
    pub load_calls: u64,
    pub rows_loaded: u64,
    pub index_appends: u64,
    pub duplicates_suppressed: u64,
    pub hooks_failed: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventReport {
    /// Counters since `since_ms`.
    pub counters: Option<EventState>,
    pub models: Vec<ModelSummary>,
}

///
/// ModelSummary
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub save_calls: u64,
    pub rows_written: u64,
    pub load_calls: u64,
    pub rows_loaded: u64,
    pub avg_rows_per_load: f64,
    pub index_appends: u64,
    pub duplicates_suppressed: u64,
    pub hooks_failed: u64,
}

/// Build a report from the in-memory counters. Models are listed busiest
/// first, then by name.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut models: Vec<ModelSummary> = snap
        .models
        .iter()
        .map(|(model, counters)| ModelSummary {
            model: model.clone(),
            save_calls: counters.save_calls,
            rows_written: counters.rows_written,
            load_calls: counters.load_calls,
            rows_loaded: counters.rows_loaded,
            avg_rows_per_load: if counters.load_calls > 0 {
                counters.rows_loaded as f64 / counters.load_calls as f64
            } else {
                0.0
            },
            index_appends: counters.index_appends,
            duplicates_suppressed: counters.duplicates_suppressed,
            hooks_failed: counters.hooks_failed,
        })
        .collect();

    models.sort_by(|a, b| {
        let activity = |s: &ModelSummary| s.save_calls.saturating_add(s.load_calls);
        activity(b)
            .cmp(&activity(a))
            .then_with(|| a.model.cmp(&b.model))
    });

    EventReport {
        counters: Some(snap),
        models,
    }
}
