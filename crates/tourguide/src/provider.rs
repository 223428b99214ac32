#![forbid(unsafe_code)]

//! Tour provider: wires the controller to a host UI.
//!
//! The provider is what a UI layer talks to. It exposes the step
//! declaration API (`attach_step` / `detach_step`), the trigger API
//! ([`trigger`](TourProvider::trigger)), and navigation, and it turns every
//! step change into host work:
//!
//! 1. ask the host to scroll the target into view,
//! 2. wait the scroll-settle delay,
//! 3. read the target's bounds and solve the popover placement.
//!
//! The wait is a cancellable [`Deferred`] tagged with the step index it was
//! scheduled for. A newer step change replaces it, so a late timer can never
//! position the popover against a step the user already left.
//!
//! Viewport listeners are only wanted while a tour is active; hosts attach
//! resize/scroll handlers when [`wants_viewport_events`] turns true and drop
//! them when it turns false.
//!
//! [`wants_viewport_events`]: TourProvider::wants_viewport_events

use tourguide_core::{Point, Rect};
use web_time::{Duration, Instant};

use crate::config::TourConfig;
use crate::controller::{StepView, TourCallbacks, TourController, TourEvent};
use crate::deferred::Deferred;
use crate::error::Result;
use crate::host::TourHost;
use crate::overlay::{OverlayHit, Spotlight};
use crate::placement::{Placement, PlacementSolver};
use crate::registry::{Registration, StepKey};
use crate::step::{ElementHandle, TourStep};
use crate::storage::StorageBackend;

/// Solved geometry for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TourLayout {
    pub step_index: usize,
    /// Target bounds (viewport coordinates) the layout was solved for.
    pub target: Rect,
    pub placement: Placement,
    pub spotlight: Spotlight,
}

#[derive(Debug)]
pub struct TourProvider<S> {
    controller: TourController<S>,
    solver: PlacementSolver,
    overlay_padding: i32,
    scroll_settle: Duration,
    reposition: Deferred<usize>,
    layout: Option<TourLayout>,
}

impl<S: StorageBackend> TourProvider<S> {
    pub fn new(config: &TourConfig, storage: S) -> Self {
        Self {
            controller: TourController::new(config, storage),
            solver: PlacementSolver::from_config(&config.placement),
            overlay_padding: config.overlay.padding,
            scroll_settle: config.scroll_settle(),
            reposition: Deferred::new(),
            layout: None,
        }
    }

    #[must_use]
    pub fn callbacks(mut self, callbacks: TourCallbacks) -> Self {
        self.controller.set_callbacks(callbacks);
        self
    }

    /// Replace the placement solver (e.g. with a custom policy).
    #[must_use]
    pub fn solver(mut self, solver: PlacementSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn controller(&self) -> &TourController<S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TourController<S> {
        &mut self.controller
    }

    // ── Step declaration ────────────────────────────────────────────────

    pub fn attach_step(&mut self, step: TourStep, element: ElementHandle) -> Result<StepKey> {
        self.controller.attach(step, element)
    }

    pub fn detach_step(&mut self, id: &str) -> Option<Registration> {
        self.controller.detach(id)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    pub fn mount(&mut self, now: Instant) {
        self.controller.mount(now);
    }

    /// Trigger button: start the tour from the first step.
    pub fn trigger(&mut self, now: Instant, host: &mut impl TourHost) -> Option<TourEvent> {
        let event = self.controller.start();
        self.apply(event, now, host)
    }

    pub fn next(&mut self, now: Instant, host: &mut impl TourHost) -> Option<TourEvent> {
        let event = self.controller.next();
        self.apply(event, now, host)
    }

    pub fn prev(&mut self, now: Instant, host: &mut impl TourHost) -> Option<TourEvent> {
        let event = self.controller.prev();
        self.apply(event, now, host)
    }

    pub fn jump_to(
        &mut self,
        index: usize,
        now: Instant,
        host: &mut impl TourHost,
    ) -> Option<TourEvent> {
        let event = self.controller.jump_to(index);
        self.apply(event, now, host)
    }

    pub fn stop(&mut self) -> Option<TourEvent> {
        let event = self.controller.stop();
        self.teardown();
        event
    }

    /// Advance timers: the mount settle task, then the pending reposition.
    pub fn tick(&mut self, now: Instant, host: &mut impl TourHost) -> Option<TourEvent> {
        let event = self.controller.tick(now);
        let event = self.apply(event, now, host);

        if let Some(index) = self.reposition.poll(now) {
            if self.controller.step_index() == Some(index) {
                self.relayout(&*host);
            } else {
                tracing::debug!(index, "dropping reposition for a step no longer current");
            }
        }
        event
    }

    /// Earliest instant `tick` has work to do, for hosts driving real timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.controller.settle_due(), self.reposition.due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ── Viewport & pointer ──────────────────────────────────────────────

    /// Whether resize/scroll listeners should be attached right now.
    pub fn wants_viewport_events(&self) -> bool {
        self.controller.is_active()
    }

    /// Resize or scroll happened. Recomputes the layout immediately unless a
    /// scroll-settle wait is still pending.
    pub fn on_viewport_changed(&mut self, host: &impl TourHost) {
        if !self.wants_viewport_events() || self.reposition.is_pending() {
            return;
        }
        self.relayout(host);
    }

    /// Pointer click at `point` (viewport coordinates). A click on the scrim
    /// dismisses the tour.
    ///
    /// Before the layout is solved (scroll still settling, or target not
    /// mounted) the scrim covers the whole viewport, with a cut-out only if
    /// the host already reports the target's bounds.
    pub fn click(&mut self, point: Point, host: &impl TourHost) -> Option<TourEvent> {
        if !self.controller.is_active() {
            return None;
        }
        let hit = match &self.layout {
            Some(layout) => layout.spotlight.hit_test(point),
            None => self.pending_spotlight(host).hit_test(point),
        };
        if hit == OverlayHit::Scrim {
            tracing::debug!(x = point.x, y = point.y, "scrim clicked; stopping tour");
            return self.stop();
        }
        None
    }

    // ── Rendering state ─────────────────────────────────────────────────

    /// Geometry for the current step, once the scroll has settled.
    pub fn layout(&self) -> Option<&TourLayout> {
        self.layout.as_ref()
    }

    pub fn view(&self) -> Option<StepView<'_>> {
        self.controller.view()
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn apply(
        &mut self,
        event: Option<TourEvent>,
        now: Instant,
        host: &mut impl TourHost,
    ) -> Option<TourEvent> {
        let ev = event?;
        match ev.current_index() {
            Some(index) => {
                self.layout = None;
                if let Some(current) = self.controller.current_step() {
                    host.scroll_into_view(current.element);
                }
                self.reposition.schedule_after(index, now, self.scroll_settle);
            }
            None => self.teardown(),
        }
        Some(ev)
    }

    fn teardown(&mut self) {
        self.reposition.cancel();
        self.layout = None;
    }

    fn pending_spotlight(&self, host: &impl TourHost) -> Spotlight {
        let spotlight = Spotlight::new(host.viewport()).padding(self.overlay_padding);
        match self
            .controller
            .current_step()
            .and_then(|current| host.element_bounds(current.element))
        {
            Some(target) => spotlight.target(target),
            None => spotlight,
        }
    }

    fn relayout(&mut self, host: &impl TourHost) {
        let Some(current) = self.controller.current_step() else {
            self.layout = None;
            return;
        };
        let Some(index) = self.controller.step_index() else {
            return;
        };
        let Some(target) = host.element_bounds(current.element) else {
            tracing::debug!(step = %current.step.id, "tour target not mounted; skipping layout");
            self.layout = None;
            return;
        };

        let viewport = host.viewport();
        let placement = self.solver.solve(target, viewport, current.step.position);
        let spotlight = Spotlight::new(viewport)
            .padding(self.overlay_padding)
            .target(target)
            .popover(placement.rect);
        tracing::trace!(index, side = ?placement.side, "tour popover placed");
        self.layout = Some(TourLayout {
            step_index: index,
            target,
            placement,
            spotlight,
        });
    }
}
