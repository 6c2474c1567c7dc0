use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{Mutex, OnceLock, PoisonError},
};

///
/// EventState
/// Ephemeral, in-memory counters for cache and compiler activity.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventState {
    pub stores: BTreeMap<&'static str, StoreCounters>,
    pub views: ViewCounters,
}

///
/// StoreCounters
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StoreCounters {
    pub lookups: u64,
    pub hits: u64,
    pub inserts: u64,
    pub discarded_writes: u64,
    pub replacements: u64,
    pub evictions: u64,
}

impl StoreCounters {
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.lookups.saturating_sub(self.hits)
    }
}

///
/// ViewCounters
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ViewCounters {
    pub compiled: u64,
    pub rejected: u64,
    pub blocks: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the global counters.
///

pub type EventReport = EventState;

// Process-wide by nature; every access goes through with_state_mut/report.
static STATE: OnceLock<Mutex<EventState>> = OnceLock::new();

fn state() -> &'static Mutex<EventState> {
    STATE.get_or_init(|| Mutex::new(EventState::default()))
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    let mut guard = state().lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

pub(crate) fn report() -> EventReport {
    state()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}
