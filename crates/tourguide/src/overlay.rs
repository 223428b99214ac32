#![forbid(unsafe_code)]

//! Spotlight overlay geometry for highlighting the current step's target.
//!
//! # Invariants
//!
//! 1. The scrim covers the viewport except for a padded "cut-out" around
//!    the target.
//! 2. Scrim bands never overlap each other or the cut-out.
//! 3. Hit testing gives the popover priority over everything beneath it.
//!
//! # Example
//!
//! ```
//! use tourguide::overlay::{OverlayHit, Spotlight};
//! use tourguide::{Point, Rect, Viewport};
//!
//! let spotlight = Spotlight::new(Viewport::new(800, 600)).target(Rect::new(100, 100, 50, 20));
//! assert_eq!(spotlight.hit_test(Point::new(5, 5)), OverlayHit::Scrim);
//! assert_eq!(spotlight.hit_test(Point::new(110, 105)), OverlayHit::Cutout);
//! ```

use tourguide_core::{Point, Rect, Sides, Viewport};

pub const DEFAULT_PADDING: i32 = 8;

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayHit {
    /// The annotation popover.
    Popover,
    /// The highlighted target (the hole in the scrim).
    Cutout,
    /// The dimmed area. A click here dismisses the tour.
    Scrim,
    /// Outside the viewport.
    Outside,
}

/// Dimmed scrim with a cut-out over the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spotlight {
    viewport: Viewport,
    target: Option<Rect>,
    padding: i32,
    popover: Option<Rect>,
}

impl Spotlight {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            target: None,
            padding: DEFAULT_PADDING,
            popover: None,
        }
    }

    /// Set the target bounds (viewport coordinates).
    #[must_use]
    pub fn target(mut self, bounds: Rect) -> Self {
        self.target = Some(bounds);
        self
    }

    /// Set padding around the target ("breathing room").
    #[must_use]
    pub fn padding(mut self, padding: i32) -> Self {
        self.padding = padding.max(0);
        self
    }

    /// Set the popover bounds so hit testing can see it.
    #[must_use]
    pub fn popover(mut self, bounds: Rect) -> Self {
        self.popover = Some(bounds);
        self
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Padded target clipped to the viewport. `None` without a target or
    /// when the target is scrolled fully out of view.
    pub fn cutout(&self) -> Option<Rect> {
        let padded = self.target?.outset(Sides::all(self.padding));
        padded.intersection_opt(&self.viewport.bounds())
    }

    /// Scrim bands around the cut-out: top, bottom, left, right. Empty bands
    /// are omitted. Without a cut-out the whole viewport is dimmed.
    pub fn scrim(&self) -> Vec<Rect> {
        let vp = self.viewport.bounds();
        let Some(cut) = self.cutout() else {
            return if vp.is_empty() { Vec::new() } else { vec![vp] };
        };

        [
            Rect::new(0, 0, vp.width, cut.top()),
            Rect::new(0, cut.bottom(), vp.width, vp.height - cut.bottom()),
            Rect::new(0, cut.top(), cut.left(), cut.height),
            Rect::new(cut.right(), cut.top(), vp.width - cut.right(), cut.height),
        ]
        .into_iter()
        .filter(|band| !band.is_empty())
        .collect()
    }

    /// Classify a point in viewport coordinates.
    pub fn hit_test(&self, point: Point) -> OverlayHit {
        if !self.viewport.bounds().contains(point) {
            return OverlayHit::Outside;
        }
        if self.popover.is_some_and(|p| p.contains(point)) {
            return OverlayHit::Popover;
        }
        if self.cutout().is_some_and(|c| c.contains(point)) {
            return OverlayHit::Cutout;
        }
        OverlayHit::Scrim
    }
}
