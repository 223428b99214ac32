#![forbid(unsafe_code)]

//! Tour controller: the `Idle → Active → Idle` state machine.
//!
//! The controller owns the [`StepRegistry`], snapshots it into an ordered
//! sequence when a tour starts, and walks that snapshot with
//! [`next`](TourController::next) / [`prev`](TourController::prev). A tour
//! ends either by completing (walking past the last step) or by being
//! skipped ([`stop`](TourController::stop)); the two are mutually exclusive.
//!
//! Time is injected. [`mount`](TourController::mount) schedules the
//! auto-start / resume task after a settle delay, and
//! [`tick`](TourController::tick) fires it once due.
//!
//! # Persistence
//!
//! - The completion flag is written on every successful completion and
//!   suppresses auto start and resume afterwards.
//! - In persistent mode every index change writes `{stepIndex}`, and both
//!   stop and completion clear it.
//! - Storage failures are logged and otherwise ignored; navigation never
//!   fails because a write did.

use std::fmt;

use web_time::{Duration, Instant};

use crate::config::TourConfig;
use crate::deferred::Deferred;
use crate::error::Result;
use crate::persist::Persistence;
use crate::registry::{Registration, StepKey, StepRegistry};
use crate::step::{ElementHandle, Side, TourStep};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceReason {
    Next,
    Prev,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourEvent {
    Started {
        index: usize,
        resumed: bool,
    },
    StepChanged {
        from: usize,
        to: usize,
        reason: AdvanceReason,
    },
    Completed {
        last: usize,
    },
    Skipped {
        at: usize,
    },
}

impl TourEvent {
    /// Index the tour is on after this event, if it is still active.
    pub fn current_index(&self) -> Option<usize> {
        match *self {
            Self::Started { index, .. } => Some(index),
            Self::StepChanged { to, .. } => Some(to),
            Self::Completed { .. } | Self::Skipped { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Skipped { .. })
    }
}

/// One entry of the active sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStep {
    pub step: TourStep,
    pub element: ElementHandle,
}

impl From<&Registration> for ActiveStep {
    fn from(registration: &Registration) -> Self {
        Self {
            step: registration.step.clone(),
            element: registration.element,
        }
    }
}

/// What the popover shows for the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView<'a> {
    pub index: usize,
    pub count: usize,
    pub title: &'a str,
    pub content: &'a str,
    pub position: Side,
    pub element: ElementHandle,
    /// e.g. "Step 2 of 5".
    pub progress: String,
    pub can_go_back: bool,
    /// The primary action finishes the tour instead of advancing.
    pub is_last: bool,
}

type CompleteFn = Box<dyn FnMut()>;
type SkipFn = Box<dyn FnMut(usize)>;
type StepChangeFn = Box<dyn FnMut(usize, usize)>;

/// Host callbacks for tour lifecycle signals.
#[derive(Default)]
pub struct TourCallbacks {
    on_complete: Option<CompleteFn>,
    on_skip: Option<SkipFn>,
    on_step_change: Option<StepChangeFn>,
}

impl TourCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the last step is passed.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called with the step index the user left from.
    #[must_use]
    pub fn on_skip(mut self, f: impl FnMut(usize) + 'static) -> Self {
        self.on_skip = Some(Box::new(f));
        self
    }

    /// Called with `(from, to)` on every index change within a tour.
    #[must_use]
    pub fn on_step_change(mut self, f: impl FnMut(usize, usize) + 'static) -> Self {
        self.on_step_change = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for TourCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TourCallbacks")
            .field("on_complete", &self.on_complete.is_some())
            .field("on_skip", &self.on_skip.is_some())
            .field("on_step_change", &self.on_step_change.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct Runtime {
    sequence: Vec<ActiveStep>,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettleTask {
    Resume(usize),
    AutoStart,
}

#[derive(Debug)]
pub struct TourController<S> {
    registry: StepRegistry,
    runtime: Option<Runtime>,
    persistence: Persistence<S>,
    callbacks: TourCallbacks,
    settle: Deferred<SettleTask>,
    settle_delay: Duration,
    auto_start: bool,
    persistent: bool,
    auto_started: bool,
}

impl<S: StorageBackend> TourController<S> {
    pub fn new(config: &TourConfig, storage: S) -> Self {
        Self {
            registry: StepRegistry::with_policy(config.duplicate_policy),
            runtime: None,
            persistence: Persistence::with_prefix(storage, &config.storage_prefix),
            callbacks: TourCallbacks::default(),
            settle: Deferred::new(),
            settle_delay: config.settle_delay(),
            auto_start: config.auto_start,
            persistent: config.persistent,
            auto_started: false,
        }
    }

    #[must_use]
    pub fn callbacks(mut self, callbacks: TourCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn set_callbacks(&mut self, callbacks: TourCallbacks) {
        self.callbacks = callbacks;
    }

    // ── Registry lifecycle ──────────────────────────────────────────────

    /// Register a step when its element mounts.
    pub fn attach(&mut self, step: TourStep, element: ElementHandle) -> Result<StepKey> {
        self.registry.attach(step, element)
    }

    /// Unregister a step when its element unmounts. A running tour keeps its
    /// snapshot; the host simply stops reporting bounds for the element.
    pub fn detach(&mut self, id: &str) -> Option<Registration> {
        self.registry.detach(id)
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    // ── Mount / timers ──────────────────────────────────────────────────

    /// Schedule resume or auto start for after the settle delay.
    ///
    /// Nothing is scheduled once the tour has been completed. In persistent
    /// mode saved progress wins over auto start.
    pub fn mount(&mut self, now: Instant) {
        self.settle.cancel();
        if self.completion_flag() {
            tracing::debug!("tour previously completed; not scheduling");
            return;
        }

        if self.persistent {
            match self.persistence.load_progress() {
                Ok(Some(index)) => {
                    tracing::debug!(index, "scheduling tour resume");
                    self.settle
                        .schedule_after(SettleTask::Resume(index), now, self.settle_delay);
                    return;
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "failed to read tour progress"),
            }
        }

        if self.auto_start && !self.auto_started {
            tracing::debug!(delay = ?self.settle_delay, "scheduling tour auto start");
            self.settle
                .schedule_after(SettleTask::AutoStart, now, self.settle_delay);
        }
    }

    /// Fire the pending settle task if it is due.
    pub fn tick(&mut self, now: Instant) -> Option<TourEvent> {
        let task = self.settle.poll(now)?;
        if self.is_active() || self.completion_flag() {
            return None;
        }
        match task {
            SettleTask::Resume(index) => {
                self.auto_started = true;
                self.begin(index, true)
            }
            SettleTask::AutoStart => {
                if self.auto_started {
                    return None;
                }
                self.auto_started = true;
                self.begin(0, false)
            }
        }
    }

    /// When the pending settle task is due, for hosts driving real timers.
    pub fn settle_due(&self) -> Option<Instant> {
        self.settle.due()
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Start at the first step. No-op with an empty registry.
    pub fn start(&mut self) -> Option<TourEvent> {
        self.begin(0, false)
    }

    /// Start at `index`, clamped to the last step.
    pub fn start_at(&mut self, index: usize) -> Option<TourEvent> {
        self.begin(index, false)
    }

    pub fn next(&mut self) -> Option<TourEvent> {
        let runtime = self.runtime.as_mut()?;
        let from = runtime.index;
        if from + 1 >= runtime.sequence.len() {
            return Some(self.complete());
        }
        runtime.index += 1;
        Some(self.step_changed(from, from + 1, AdvanceReason::Next))
    }

    /// Go back one step. No-op on the first step.
    pub fn prev(&mut self) -> Option<TourEvent> {
        let runtime = self.runtime.as_mut()?;
        let from = runtime.index;
        if from == 0 {
            return None;
        }
        runtime.index -= 1;
        Some(self.step_changed(from, from - 1, AdvanceReason::Prev))
    }

    /// Jump to `index`, clamped to the last step. No-op if already there.
    pub fn jump_to(&mut self, index: usize) -> Option<TourEvent> {
        let runtime = self.runtime.as_mut()?;
        let from = runtime.index;
        let to = index.min(runtime.sequence.len().saturating_sub(1));
        if to == from {
            return None;
        }
        runtime.index = to;
        Some(self.step_changed(from, to, AdvanceReason::Jump))
    }

    /// Abandon the tour. Fires the skip callback only if a tour was running.
    pub fn stop(&mut self) -> Option<TourEvent> {
        self.settle.cancel();
        let runtime = self.runtime.take()?;
        let at = runtime.index;
        if self.persistent {
            self.clear_saved_progress();
        }
        tracing::info!(at, steps = runtime.sequence.len(), "tour.skip");
        if let Some(on_skip) = self.callbacks.on_skip.as_mut() {
            on_skip(at);
        }
        Some(TourEvent::Skipped { at })
    }

    /// Forget completion and saved progress so the tour can run (and auto
    /// start) again.
    ///
    /// Both keys are cleared even if the first removal fails; the first
    /// error is returned.
    pub fn reset_progress(&mut self) -> Result<()> {
        let completed = self.persistence.clear_completed();
        let progress = self.persistence.clear_progress();
        self.auto_started = false;
        tracing::debug!("tour progress reset");
        completed.and(progress)?;
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completion_flag()
    }

    pub fn step_index(&self) -> Option<usize> {
        self.runtime.as_ref().map(|r| r.index)
    }

    /// Length of the active sequence; zero when idle.
    pub fn step_count(&self) -> usize {
        self.runtime.as_ref().map_or(0, |r| r.sequence.len())
    }

    /// The active sequence snapshot; empty when idle.
    pub fn steps(&self) -> &[ActiveStep] {
        match &self.runtime {
            Some(runtime) => &runtime.sequence,
            None => &[],
        }
    }

    pub fn current_step(&self) -> Option<&ActiveStep> {
        let runtime = self.runtime.as_ref()?;
        runtime.sequence.get(runtime.index)
    }

    pub fn view(&self) -> Option<StepView<'_>> {
        let runtime = self.runtime.as_ref()?;
        let current = runtime.sequence.get(runtime.index)?;
        let count = runtime.sequence.len();
        Some(StepView {
            index: runtime.index,
            count,
            title: &current.step.title,
            content: &current.step.content,
            position: current.step.position,
            element: current.element,
            progress: format!("Step {} of {}", runtime.index + 1, count),
            can_go_back: runtime.index > 0,
            is_last: runtime.index + 1 == count,
        })
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn begin(&mut self, index: usize, resumed: bool) -> Option<TourEvent> {
        let sequence: Vec<ActiveStep> = self
            .registry
            .sorted()
            .into_iter()
            .map(ActiveStep::from)
            .collect();
        if sequence.is_empty() {
            tracing::debug!("tour start ignored: no steps registered");
            return None;
        }

        self.settle.cancel();
        let index = index.min(sequence.len() - 1);
        let steps = sequence.len();
        if self.runtime.is_some() {
            tracing::debug!("restarting active tour");
        }
        self.runtime = Some(Runtime { sequence, index });
        self.save_index(index);
        tracing::info!(index, steps, resumed, "tour.start");
        Some(TourEvent::Started { index, resumed })
    }

    fn step_changed(&mut self, from: usize, to: usize, reason: AdvanceReason) -> TourEvent {
        self.save_index(to);
        tracing::debug!(from, to, ?reason, "tour.step");
        if let Some(on_step_change) = self.callbacks.on_step_change.as_mut() {
            on_step_change(from, to);
        }
        TourEvent::StepChanged { from, to, reason }
    }

    fn complete(&mut self) -> TourEvent {
        let last = self.runtime.take().map_or(0, |r| r.index);
        if let Err(err) = self.persistence.mark_completed() {
            tracing::warn!(error = %err, "failed to persist tour completion");
        }
        if self.persistent {
            self.clear_saved_progress();
        }
        tracing::info!(last, "tour.complete");
        if let Some(on_complete) = self.callbacks.on_complete.as_mut() {
            on_complete();
        }
        TourEvent::Completed { last }
    }

    fn save_index(&mut self, index: usize) {
        if !self.persistent {
            return;
        }
        if let Err(err) = self.persistence.save_progress(index) {
            tracing::warn!(index, error = %err, "failed to persist tour progress");
        }
    }

    fn clear_saved_progress(&mut self) {
        if let Err(err) = self.persistence.clear_progress() {
            tracing::warn!(error = %err, "failed to clear tour progress");
        }
    }

    fn completion_flag(&self) -> bool {
        match self.persistence.is_completed() {
            Ok(done) => done,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read tour completion flag");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{COMPLETED_KEY, PROGRESS_KEY};
    use crate::storage::{MemoryStorage, StorageError, StorageResult};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn controller(config: TourConfig) -> TourController<MemoryStorage> {
        TourController::new(&config, MemoryStorage::new())
    }

    fn with_steps(mut tour: TourController<MemoryStorage>, orders: &[i64]) -> TourController<MemoryStorage> {
        for (i, &order) in orders.iter().enumerate() {
            tour.attach(
                TourStep::new(format!("step-{order}"), order).title(format!("Title {order}")),
                ElementHandle(i as u64),
            )
            .unwrap();
        }
        tour
    }

    // ── Navigation ──────────────────────────────────────────────────────

    #[test]
    fn start_snapshots_sorted_sequence() {
        let mut tour = with_steps(controller(TourConfig::default()), &[10, 5, 20]);
        assert_eq!(
            tour.start(),
            Some(TourEvent::Started {
                index: 0,
                resumed: false
            })
        );
        let orders: Vec<i64> = tour.steps().iter().map(|s| s.step.order).collect();
        assert_eq!(orders, [5, 10, 20]);
        assert_eq!(tour.step_index(), Some(0));
    }

    #[test]
    fn start_with_empty_registry_is_noop() {
        let mut tour = controller(TourConfig::default());
        assert_eq!(tour.start(), None);
        assert!(!tour.is_active());
    }

    #[test]
    fn snapshot_ignores_later_registrations() {
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2]);
        tour.start();
        tour.attach(TourStep::new("late", 0), ElementHandle(99)).unwrap();
        assert_eq!(tour.step_count(), 2);
        assert_eq!(tour.current_step().unwrap().step.id, "step-1");
    }

    #[test]
    fn next_walks_to_completion_once() {
        let completions = Rc::new(Cell::new(0));
        let seen = Rc::clone(&completions);
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2, 3])
            .callbacks(TourCallbacks::new().on_complete(move || seen.set(seen.get() + 1)));

        tour.start();
        tour.next();
        tour.next();
        assert_eq!(tour.step_index(), Some(2));
        assert_eq!(completions.get(), 0);

        assert_eq!(tour.next(), Some(TourEvent::Completed { last: 2 }));
        assert!(!tour.is_active());
        assert_eq!(completions.get(), 1);
        assert_eq!(tour.next(), None);
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn prev_on_first_step_is_noop() {
        let changes = Rc::new(Cell::new(0));
        let seen = Rc::clone(&changes);
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2])
            .callbacks(TourCallbacks::new().on_step_change(move |_, _| seen.set(seen.get() + 1)));
        tour.start();
        assert_eq!(tour.prev(), None);
        assert_eq!(tour.prev(), None);
        assert_eq!(tour.step_index(), Some(0));
        assert_eq!(changes.get(), 0);
    }

    #[test]
    fn step_change_reports_from_and_to() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2, 3])
            .callbacks(TourCallbacks::new().on_step_change(move |a, b| sink.borrow_mut().push((a, b))));
        tour.start();
        tour.next();
        tour.next();
        tour.prev();
        assert_eq!(*log.borrow(), [(0, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn jump_to_clamps_and_ignores_same_index() {
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2, 3]);
        tour.start();
        assert_eq!(tour.jump_to(0), None);
        assert_eq!(
            tour.jump_to(99),
            Some(TourEvent::StepChanged {
                from: 0,
                to: 2,
                reason: AdvanceReason::Jump
            })
        );
    }

    #[test]
    fn stop_fires_skip_only_when_active() {
        let skips = Rc::new(RefCell::new(Vec::new()));
        let completions = Rc::new(Cell::new(0));
        let (s, c) = (Rc::clone(&skips), Rc::clone(&completions));
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2]).callbacks(
            TourCallbacks::new()
                .on_skip(move |at| s.borrow_mut().push(at))
                .on_complete(move || c.set(c.get() + 1)),
        );

        assert_eq!(tour.stop(), None);
        tour.start();
        tour.next();
        assert_eq!(tour.stop(), Some(TourEvent::Skipped { at: 1 }));
        assert_eq!(tour.stop(), None);
        assert_eq!(*skips.borrow(), [1]);
        assert_eq!(completions.get(), 0);
        assert!(!tour.is_completed());
    }

    #[test]
    fn view_describes_current_step() {
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2]);
        assert!(tour.view().is_none());
        tour.start();
        let view = tour.view().unwrap();
        assert_eq!(view.progress, "Step 1 of 2");
        assert_eq!(view.title, "Title 1");
        assert!(!view.can_go_back);
        assert!(!view.is_last);

        tour.next();
        let view = tour.view().unwrap();
        assert_eq!(view.progress, "Step 2 of 2");
        assert!(view.can_go_back);
        assert!(view.is_last);
    }

    // ── Persistence ─────────────────────────────────────────────────────

    #[test]
    fn completion_sets_flag_even_without_persistent_mode() {
        let mut tour = with_steps(controller(TourConfig::default()), &[1]);
        tour.start();
        tour.next();
        assert!(tour.is_completed());
        assert_eq!(
            tour.persistence().storage().get(COMPLETED_KEY).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(tour.persistence().storage().get(PROGRESS_KEY).unwrap(), None);
    }

    #[test]
    fn persistent_mode_writes_every_index_and_clears_on_stop() {
        let mut tour = with_steps(controller(TourConfig::default().persistent(true)), &[1, 2, 3]);
        let saved = |t: &TourController<MemoryStorage>| {
            t.persistence().storage().get(PROGRESS_KEY).unwrap()
        };

        tour.start();
        assert_eq!(saved(&tour).as_deref(), Some(r#"{"stepIndex":0}"#));
        tour.next();
        assert_eq!(saved(&tour).as_deref(), Some(r#"{"stepIndex":1}"#));
        tour.prev();
        assert_eq!(saved(&tour).as_deref(), Some(r#"{"stepIndex":0}"#));
        tour.stop();
        assert_eq!(saved(&tour), None);
        assert!(!tour.is_completed());
    }

    #[test]
    fn non_persistent_mode_never_writes_progress() {
        let mut tour = with_steps(controller(TourConfig::default()), &[1, 2]);
        tour.start();
        tour.next();
        assert_eq!(tour.persistence().storage().get(PROGRESS_KEY).unwrap(), None);
    }

    #[test]
    fn reset_progress_allows_auto_start_again() {
        let config = TourConfig::default().auto_start(true);
        let mut tour = with_steps(controller(config), &[1]);
        let t0 = Instant::now();
        tour.mount(t0);
        assert!(tour.tick(t0 + Duration::from_secs(1)).is_some());
        tour.next();
        assert!(tour.is_completed());

        tour.mount(t0);
        assert_eq!(tour.settle_due(), None);

        tour.reset_progress().unwrap();
        tour.mount(t0);
        assert!(tour.tick(t0 + Duration::from_secs(1)).is_some());
    }

    // ── Timers ──────────────────────────────────────────────────────────

    #[test]
    fn auto_start_waits_for_settle_delay() {
        let mut tour = controller(TourConfig::default().auto_start(true));
        let t0 = Instant::now();
        tour.mount(t0);
        // Steps register after mount but before the delay elapses.
        tour.attach(TourStep::new("a", 1), ElementHandle(1)).unwrap();

        assert_eq!(tour.tick(t0 + Duration::from_millis(499)), None);
        assert_eq!(
            tour.tick(t0 + Duration::from_millis(500)),
            Some(TourEvent::Started {
                index: 0,
                resumed: false
            })
        );
    }

    #[test]
    fn auto_start_runs_once_per_session() {
        let mut tour = with_steps(controller(TourConfig::default().auto_start(true)), &[1, 2]);
        let t0 = Instant::now();
        tour.mount(t0);
        assert!(tour.tick(t0 + Duration::from_secs(1)).is_some());
        tour.stop();

        tour.mount(t0 + Duration::from_secs(2));
        assert_eq!(tour.settle_due(), None);
        assert_eq!(tour.tick(t0 + Duration::from_secs(10)), None);
        assert!(!tour.is_active());
    }

    #[test]
    fn manual_start_cancels_pending_auto_start() {
        let mut tour = with_steps(controller(TourConfig::default().auto_start(true)), &[1, 2]);
        let t0 = Instant::now();
        tour.mount(t0);
        tour.start();
        tour.next();
        assert_eq!(tour.tick(t0 + Duration::from_secs(1)), None);
        assert_eq!(tour.step_index(), Some(1));
    }

    #[test]
    fn resume_uses_saved_index() {
        let mut storage = MemoryStorage::new();
        storage.set(PROGRESS_KEY, r#"{"stepIndex":1}"#).unwrap();
        let mut tour = TourController::new(&TourConfig::default().persistent(true), storage);
        let t0 = Instant::now();
        tour.mount(t0);
        for (i, order) in [1, 2, 3].into_iter().enumerate() {
            tour.attach(TourStep::new(format!("s{order}"), order), ElementHandle(i as u64))
                .unwrap();
        }
        assert_eq!(
            tour.tick(t0 + Duration::from_millis(500)),
            Some(TourEvent::Started {
                index: 1,
                resumed: true
            })
        );
    }

    #[test]
    fn resume_clamps_out_of_range_index() {
        let mut storage = MemoryStorage::new();
        storage.set(PROGRESS_KEY, r#"{"stepIndex":42}"#).unwrap();
        let mut tour = TourController::new(&TourConfig::default().persistent(true), storage);
        tour.attach(TourStep::new("only", 1), ElementHandle(1)).unwrap();
        let t0 = Instant::now();
        tour.mount(t0);
        assert_eq!(tour.tick(t0 + Duration::from_secs(1)).unwrap().current_index(), Some(0));
    }

    #[test]
    fn malformed_progress_is_discarded_on_mount() {
        let mut storage = MemoryStorage::new();
        storage.set(PROGRESS_KEY, "garbage").unwrap();
        let mut tour = TourController::new(&TourConfig::default().persistent(true), storage);
        tour.attach(TourStep::new("a", 1), ElementHandle(1)).unwrap();
        let t0 = Instant::now();
        tour.mount(t0);
        assert_eq!(tour.settle_due(), None);
        assert_eq!(tour.persistence().storage().get(PROGRESS_KEY).unwrap(), None);
    }

    #[test]
    fn completed_flag_blocks_resume() {
        let mut storage = MemoryStorage::new();
        storage.set(PROGRESS_KEY, r#"{"stepIndex":1}"#).unwrap();
        storage.set(COMPLETED_KEY, "true").unwrap();
        let mut tour = TourController::new(
            &TourConfig::default().persistent(true).auto_start(true),
            storage,
        );
        tour.attach(TourStep::new("a", 1), ElementHandle(1)).unwrap();
        let t0 = Instant::now();
        tour.mount(t0);
        assert_eq!(tour.tick(t0 + Duration::from_secs(5)), None);
        assert!(!tour.is_active());
    }

    // ── Failing storage ─────────────────────────────────────────────────

    #[derive(Debug, Default)]
    struct BrokenStorage;

    impl StorageBackend for BrokenStorage {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Unavailable("quota".into()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota".into()))
        }

        fn remove(&mut self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota".into()))
        }
    }

    #[test]
    fn storage_failures_do_not_block_navigation() {
        let config = TourConfig::default().persistent(true).auto_start(true);
        let mut tour = TourController::new(&config, BrokenStorage);
        tour.attach(TourStep::new("a", 1), ElementHandle(1)).unwrap();
        tour.attach(TourStep::new("b", 2), ElementHandle(2)).unwrap();

        let t0 = Instant::now();
        tour.mount(t0);
        assert!(tour.tick(t0 + Duration::from_secs(1)).is_some());
        assert!(tour.next().is_some());
        assert_eq!(tour.next(), Some(TourEvent::Completed { last: 1 }));
        assert!(tour.reset_progress().is_err());
    }

    /// Memory storage that refuses to remove one key.
    #[derive(Debug, Default)]
    struct StuckKey {
        inner: MemoryStorage,
        stuck: &'static str,
    }

    impl StorageBackend for StuckKey {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> StorageResult<()> {
            if key == self.stuck {
                return Err(StorageError::Unavailable("locked".into()));
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn reset_progress_clears_progress_when_completion_clear_fails() {
        let config = TourConfig::default().persistent(true).auto_start(true);
        let storage = StuckKey {
            stuck: COMPLETED_KEY,
            ..StuckKey::default()
        };
        let mut tour = TourController::new(&config, storage);
        tour.attach(TourStep::new("a", 1), ElementHandle(1)).unwrap();
        tour.attach(TourStep::new("b", 2), ElementHandle(2)).unwrap();
        let t0 = Instant::now();
        tour.mount(t0);
        assert!(tour.tick(t0 + Duration::from_secs(1)).is_some());
        assert!(tour.persistence().storage().get(PROGRESS_KEY).unwrap().is_some());

        assert!(tour.reset_progress().is_err());
        assert_eq!(tour.persistence().storage().get(PROGRESS_KEY).unwrap(), None);
        assert!(!tour.auto_started);
    }

    // ── Tracing ─────────────────────────────────────────────────────────

    mod tracing_capture {
        use super::*;
        use std::sync::{Arc, Mutex};
        use tracing::Subscriber;
        use tracing_subscriber::Layer;
        use tracing_subscriber::layer::{Context, SubscriberExt};

        struct MessageCapture {
            messages: Arc<Mutex<Vec<String>>>,
        }

        impl<S> Layer<S> for MessageCapture
        where
            S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
        {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                struct Msg {
                    message: Option<String>,
                }
                impl tracing::field::Visit for Msg {
                    fn record_debug(
                        &mut self,
                        field: &tracing::field::Field,
                        value: &dyn std::fmt::Debug,
                    ) {
                        if field.name() == "message" {
                            self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                        }
                    }
                }
                let mut msg = Msg { message: None };
                event.record(&mut msg);
                if let Some(message) = msg.message {
                    self.messages.lock().expect("capture lock").push(message);
                }
            }
        }

        #[test]
        fn lifecycle_emits_start_step_and_complete_events() {
            let messages = Arc::new(Mutex::new(Vec::new()));
            let subscriber = tracing_subscriber::registry().with(MessageCapture {
                messages: Arc::clone(&messages),
            });
            let _guard = tracing::subscriber::set_default(subscriber);

            let mut tour = with_steps(controller(TourConfig::default()), &[1, 2]);
            tour.start();
            tour.next();
            tour.next();

            let seen = messages.lock().expect("capture lock");
            let pos = |name: &str| seen.iter().position(|m| m == name);
            let start = pos("tour.start").expect("tour.start event");
            let step = pos("tour.step").expect("tour.step event");
            let complete = pos("tour.complete").expect("tour.complete event");
            assert!(start < step && step < complete);
            assert!(pos("tour.skip").is_none());
        }
    }
}
