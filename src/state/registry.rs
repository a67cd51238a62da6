//! Timer registry: the single source of truth for ids and transitions

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use super::{
    clock::{Clock, SystemClock},
    timer::{Timer, TimerId, TimerView, DEFAULT_LABEL},
};

/// What Stop does when the timer is already stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Return the frozen timer unchanged
    #[default]
    Idempotent,
    /// Reject with `InvalidState`
    Strict,
}

/// Persisted form of the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub next_id: TimerId,
    pub timers: Vec<Timer>,
}

impl RegistrySnapshot {
    /// Build a snapshot from bare timer records, deriving the next id
    pub fn from_timers(timers: Vec<Timer>) -> Result<Self> {
        let mut snapshot = Self { next_id: TimerId::new(1), timers };
        snapshot.next_id = snapshot.min_next_id()?;
        Ok(snapshot)
    }

    /// Smallest next id that cannot collide with a stored timer
    fn min_next_id(&self) -> Result<TimerId> {
        self.timers.iter().try_fold(TimerId::new(1), |floor, timer| {
            let next = timer.id.next().ok_or_else(|| {
                RegistryError::Storage(format!("Timer ID {} leaves no room for new timers", timer.id))
            })?;
            Ok(floor.max(next))
        })
    }

    /// Reject snapshots that would lose timers or overflow the id counter
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.timers.len());
        if let Some(duplicate) = self.timers.iter().find(|timer| !seen.insert(timer.id)) {
            return Err(RegistryError::Storage(format!("Duplicate timer ID {}", duplicate.id)));
        }
        self.min_next_id().map(|_| ())
    }
}

#[derive(Debug)]
struct RegistryInner {
    /// Ids only ever grow, so key order is creation order
    timers: BTreeMap<TimerId, Timer>,
    next_id: TimerId,
}

/// Thread-safe store of all timers
#[derive(Debug)]
pub struct TimerRegistry {
    inner: Mutex<RegistryInner>,
    clock: Arc<dyn Clock>,
    stop_policy: StopPolicy,
}

impl TimerRegistry {
    /// Create an empty registry reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>, stop_policy: StopPolicy) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                timers: BTreeMap::new(),
                next_id: TimerId::new(1),
            }),
            clock,
            stop_policy,
        }
    }

    /// Registry on the system clock with idempotent stop
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock), StopPolicy::default())
    }

    pub fn stop_policy(&self) -> StopPolicy {
        self.stop_policy
    }

    // Every operation leaves the map consistent before anything that could
    // panic, so a poisoned lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a running timer with a fresh id. Fails only once every id
    /// has been handed out.
    pub fn start(&self, label: Option<&str>) -> Result<TimerView> {
        let label = label
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(DEFAULT_LABEL)
            .to_string();

        let mut inner = self.lock();
        let now = self.clock.now();
        let id = inner.next_id;
        // the last representable id is never handed out, it marks exhaustion
        inner.next_id = id.next().ok_or(RegistryError::Exhausted)?;

        let timer = Timer::new(id, label, now);
        let view = timer.view_at(now);
        let previous = inner.timers.insert(id, timer);
        assert!(previous.is_none(), "timer id {} allocated twice", id);

        info!("Started timer {} ({})", id, view.timer.label);
        Ok(view)
    }

    /// Read a timer with its elapsed time as of now
    pub fn get(&self, id: TimerId) -> Result<TimerView> {
        let inner = self.lock();
        let now = self.clock.now();
        inner
            .timers
            .get(&id)
            .map(|timer| timer.view_at(now))
            .ok_or(RegistryError::NotFound(id))
    }

    /// Stop a running timer, banking the elapsed time of its current segment
    pub fn stop(&self, id: TimerId) -> Result<TimerView> {
        self.stop_with_change(id).map(|(view, _)| view)
    }

    /// Like `stop`, also reporting whether this call changed the timer
    pub fn stop_with_change(&self, id: TimerId) -> Result<(TimerView, bool)> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let timer = inner.timers.get_mut(&id).ok_or(RegistryError::NotFound(id))?;

        let changed = timer.stop(now);
        if changed {
            info!("Stopped timer {} ({}) after {}s", id, timer.label, timer.accumulated_seconds);
        } else {
            match self.stop_policy {
                StopPolicy::Idempotent => debug!("Timer {} already stopped, returning frozen state", id),
                StopPolicy::Strict => {
                    return Err(RegistryError::InvalidState { id, status: timer.status });
                }
            }
        }

        Ok((timer.view_at(now), changed))
    }

    /// Restart a timer from zero regardless of its status
    pub fn reset(&self, id: TimerId) -> Result<TimerView> {
        let mut inner = self.lock();
        let now = self.clock.now();
        let timer = inner.timers.get_mut(&id).ok_or(RegistryError::NotFound(id))?;

        timer.reset(now);
        info!("Reset timer {} ({})", id, timer.label);
        Ok(timer.view_at(now))
    }

    /// Remove a timer permanently, returning its final state
    pub fn delete(&self, id: TimerId) -> Result<Timer> {
        let mut inner = self.lock();
        let timer = inner.timers.remove(&id).ok_or(RegistryError::NotFound(id))?;

        info!("Deleted timer {} ({})", id, timer.label);
        Ok(timer)
    }

    /// All timers in creation order, computed against a single instant
    pub fn list(&self) -> Vec<TimerView> {
        let inner = self.lock();
        let now = self.clock.now();
        inner.timers.values().map(|timer| timer.view_at(now)).collect()
    }

    /// Number of (running, stopped) timers
    pub fn counts(&self) -> (usize, usize) {
        let inner = self.lock();
        let running = inner.timers.values().filter(|timer| timer.is_running()).count();
        (running, inner.timers.len() - running)
    }

    /// Capture the registry for persistence
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.lock();
        RegistrySnapshot {
            next_id: inner.next_id,
            timers: inner.timers.values().cloned().collect(),
        }
    }

    /// Replace the registry contents with a persisted snapshot. The next id
    /// never drops to or below an id that is present. Invalid snapshots leave
    /// the registry untouched.
    pub fn restore(&self, snapshot: RegistrySnapshot) -> Result<()> {
        snapshot.validate()?;
        let derived = snapshot.min_next_id()?;

        let mut inner = self.lock();
        inner.next_id = snapshot.next_id.max(derived);
        inner.timers = snapshot
            .timers
            .into_iter()
            .map(|timer| (timer.id, timer))
            .collect();

        info!("Restored {} timers, next id {}", inner.timers.len(), inner.next_id);
        Ok(())
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, thread};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::{clock::ManualClock, timer::TimerStatus};

    fn registry(policy: StopPolicy) -> (Arc<ManualClock>, TimerRegistry) {
        let clock = Arc::new(ManualClock::default());
        let registry = TimerRegistry::new(clock.clone(), policy);
        (clock, registry)
    }

    #[test]
    fn start_assigns_sequential_ids_and_default_label() {
        let (_, registry) = registry(StopPolicy::Idempotent);

        let first = registry.start(Some("Morning Exercise")).unwrap();
        let second = registry.start(None).unwrap();
        let third = registry.start(Some("   ")).unwrap();

        assert_eq!(first.timer.id, TimerId::new(1));
        assert_eq!(first.timer.label, "Morning Exercise");
        assert_eq!(first.timer.status, TimerStatus::Running);
        assert_eq!(first.timer.end_time, None);
        assert_eq!(first.elapsed_time.total_seconds, 0);
        assert_eq!(second.timer.id, TimerId::new(2));
        assert_eq!(second.timer.label, DEFAULT_LABEL);
        assert_eq!(third.timer.label, DEFAULT_LABEL);
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let (_, registry) = registry(StopPolicy::Idempotent);
        let mut seen = HashSet::new();

        for round in 0..10 {
            let view = registry.start(Some("loop")).unwrap();
            assert!(seen.insert(view.timer.id));
            if round % 2 == 0 {
                registry.delete(view.timer.id).unwrap();
            }
        }
        assert_eq!(seen.len(), 10);
        assert_eq!(registry.list().len(), 5);
    }

    #[test]
    fn morning_exercise_scenario() {
        let (clock, registry) = registry(StopPolicy::Idempotent);

        let started = registry.start(Some("Morning Exercise")).unwrap();
        let id = started.timer.id;
        assert_eq!(id, TimerId::new(1));

        clock.advance_millis(5_300);
        let stopped = registry.stop(id).unwrap();
        assert_eq!(stopped.timer.status, TimerStatus::Stopped);
        assert_eq!(stopped.elapsed_time.total_seconds, 5);
        assert_eq!(stopped.elapsed_time.formatted, "00:00:05");

        let reset = registry.reset(id).unwrap();
        assert_eq!(reset.timer.status, TimerStatus::Running);
        assert_eq!(reset.timer.accumulated_seconds, 0.0);
        assert_eq!(reset.elapsed_time.total_seconds, 0);

        clock.advance_secs(1);
        let current = registry.get(id).unwrap();
        assert_eq!(current.elapsed_time.total_seconds, 1);
    }

    #[test]
    fn stopping_twice_is_idempotent() {
        let (clock, registry) = registry(StopPolicy::Idempotent);
        let id = registry.start(None).unwrap().timer.id;

        clock.advance_secs(3);
        let first = registry.stop(id).unwrap();
        clock.advance_secs(10);
        let second = registry.stop(id).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.timer.accumulated_seconds, 3.0);
    }

    #[test]
    fn strict_policy_rejects_second_stop() {
        let (clock, registry) = registry(StopPolicy::Strict);
        let id = registry.start(None).unwrap().timer.id;

        clock.advance_secs(2);
        registry.stop(id).unwrap();
        assert_eq!(
            registry.stop(id),
            Err(RegistryError::InvalidState { id, status: TimerStatus::Stopped })
        );
        assert_eq!(registry.get(id).unwrap().elapsed_time.total_seconds, 2);
    }

    #[test]
    fn stopped_timer_keeps_its_elapsed_time() {
        let (clock, registry) = registry(StopPolicy::Idempotent);
        let id = registry.start(None).unwrap().timer.id;

        clock.advance_secs(61);
        registry.stop(id).unwrap();
        clock.advance_secs(3600);

        let view = registry.get(id).unwrap();
        assert_eq!(view.elapsed_time.formatted, "00:01:01");
    }

    #[test]
    fn elapsed_is_monotonic_while_running() {
        let (clock, registry) = registry(StopPolicy::Idempotent);
        let id = registry.start(None).unwrap().timer.id;

        let mut last = 0;
        for step in [0, 400, 700, 1_000, 2_500] {
            clock.advance_millis(step);
            let total = registry.get(id).unwrap().elapsed_time.total_seconds;
            assert!(total >= last);
            last = total;
        }
        assert_eq!(last, 4);
    }

    #[test]
    fn unknown_ids_report_not_found() {
        let (_, registry) = registry(StopPolicy::Idempotent);
        let missing = TimerId::new(999999);

        assert_eq!(registry.get(missing), Err(RegistryError::NotFound(missing)));
        assert_eq!(registry.stop(missing), Err(RegistryError::NotFound(missing)));
        assert_eq!(registry.reset(missing), Err(RegistryError::NotFound(missing)));
        assert_eq!(registry.delete(missing), Err(RegistryError::NotFound(missing)));
    }

    #[test]
    fn delete_is_final() {
        let (_, registry) = registry(StopPolicy::Idempotent);
        let id = registry.start(Some("Timer to Delete")).unwrap().timer.id;

        let deleted = registry.delete(id).unwrap();
        assert_eq!(deleted.label, "Timer to Delete");

        assert_eq!(registry.get(id), Err(RegistryError::NotFound(id)));
        assert_eq!(registry.stop(id), Err(RegistryError::NotFound(id)));
        assert_eq!(registry.reset(id), Err(RegistryError::NotFound(id)));
        assert_eq!(registry.delete(id), Err(RegistryError::NotFound(id)));
    }

    #[test]
    fn list_preserves_creation_order() {
        let (clock, registry) = registry(StopPolicy::Idempotent);
        for i in 1..=3 {
            registry.start(Some(format!("Multi-Timer Test {}", i).as_str())).unwrap();
            clock.advance_secs(1);
        }
        registry.stop(TimerId::new(2)).unwrap();

        let labels: Vec<_> = registry.list().into_iter().map(|view| view.timer.label).collect();
        assert_eq!(labels, vec!["Multi-Timer Test 1", "Multi-Timer Test 2", "Multi-Timer Test 3"]);
        assert_eq!(registry.counts(), (2, 1));
    }

    #[test]
    fn concurrent_starts_get_distinct_ids() {
        let registry = Arc::new(TimerRegistry::with_system_clock());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| {
                            let id = registry.start(Some(format!("{}-{}", worker, i).as_str())).unwrap().timer.id;
                            registry.stop(id).unwrap();
                            id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<TimerId> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(registry.counts(), (0, 400));
    }

    #[test]
    fn restore_keeps_ids_unique() {
        let (_, source) = registry(StopPolicy::Idempotent);
        source.start(Some("a")).unwrap();
        let b = source.start(Some("b")).unwrap().timer.id;
        let c = source.start(Some("c")).unwrap().timer.id;
        source.delete(c).unwrap();

        let (_, restored) = registry(StopPolicy::Idempotent);
        restored.restore(source.snapshot()).unwrap();
        assert_eq!(restored.list().len(), 2);
        assert_eq!(restored.get(b).unwrap().timer.label, "b");
        // id 3 was handed out before the snapshot, so it stays retired
        assert_eq!(restored.start(None).unwrap().timer.id, TimerId::new(4));
    }

    #[test]
    fn second_stop_reports_no_change() {
        let (clock, registry) = registry(StopPolicy::Idempotent);
        let id = registry.start(None).unwrap().timer.id;
        clock.advance_secs(1);

        let (_, changed) = registry.stop_with_change(id).unwrap();
        assert!(changed);
        let (view, changed) = registry.stop_with_change(id).unwrap();
        assert!(!changed);
        assert_eq!(view.elapsed_time.total_seconds, 1);
    }

    #[test]
    fn restore_rejects_duplicate_ids() {
        let (_, source) = registry(StopPolicy::Idempotent);
        source.start(Some("a")).unwrap();
        let mut timers = source.snapshot().timers;
        timers.push(timers[0].clone());

        let (_, restored) = registry(StopPolicy::Idempotent);
        restored.start(Some("kept")).unwrap();
        let snapshot = RegistrySnapshot { next_id: TimerId::new(2), timers };

        assert!(matches!(restored.restore(snapshot), Err(RegistryError::Storage(_))));
        assert_eq!(restored.list()[0].timer.label, "kept");
    }

    #[test]
    fn largest_id_is_rejected_instead_of_overflowing() {
        let (_, source) = registry(StopPolicy::Idempotent);
        source.start(Some("a")).unwrap();
        let mut timers = source.snapshot().timers;
        timers[0].id = TimerId::new(u64::MAX);

        assert!(matches!(
            RegistrySnapshot::from_timers(timers.clone()),
            Err(RegistryError::Storage(_))
        ));

        let (_, restored) = registry(StopPolicy::Idempotent);
        let snapshot = RegistrySnapshot { next_id: TimerId::new(u64::MAX), timers };
        assert!(matches!(restored.restore(snapshot), Err(RegistryError::Storage(_))));
    }

    #[test]
    fn start_fails_cleanly_when_ids_run_out() {
        let (_, registry) = registry(StopPolicy::Idempotent);
        registry
            .restore(RegistrySnapshot { next_id: TimerId::new(u64::MAX - 1), timers: Vec::new() })
            .unwrap();

        assert_eq!(registry.start(None).unwrap().timer.id, TimerId::new(u64::MAX - 1));
        assert_eq!(registry.start(None), Err(RegistryError::Exhausted));
        assert_eq!(registry.start(None), Err(RegistryError::Exhausted));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn restore_from_bare_timers_derives_next_id() {
        let (_, source) = registry(StopPolicy::Idempotent);
        source.start(Some("a")).unwrap();
        source.start(Some("b")).unwrap();

        let bare = source.snapshot().timers;
        let (_, restored) = registry(StopPolicy::Idempotent);
        restored.restore(RegistrySnapshot::from_timers(bare).unwrap()).unwrap();
        assert_eq!(restored.start(None).unwrap().timer.id, TimerId::new(3));
    }
}
