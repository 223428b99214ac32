#![forbid(unsafe_code)]

//! Popover placement relative to a target element.
//!
//! The solver is greedy and deterministic: it asks a [`PlacementPolicy`] for
//! an ordered list of candidate sides, takes the first side with enough room,
//! and falls back to centring the popover in the viewport.
//!
//! # Invariants
//!
//! 1. A side is taken only if the space between the target and that viewport
//!    edge is at least the popover extent plus the margin.
//! 2. Top/bottom placements clamp horizontally, left/right placements clamp
//!    vertically, so the popover stays at least `margin` away from the
//!    viewport edges whenever the viewport is large enough to allow it.
//! 3. The result depends only on the inputs (no hidden state).
//!
//! # Example
//!
//! ```
//! use tourguide::placement::{PlacementSide, PlacementSolver};
//! use tourguide::{Rect, Side, Viewport};
//!
//! let solver = PlacementSolver::default();
//! let placement = solver.solve(Rect::new(100, 40, 200, 40), Viewport::new(1280, 800), Side::Bottom);
//! assert_eq!(placement.side, PlacementSide::Bottom);
//! ```

use std::fmt;

use tourguide_core::{Point, Rect, Size, Viewport};

use crate::config::PlacementConfig;
use crate::step::Side;

/// Where the popover ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementSide {
    Top,
    Bottom,
    Left,
    Right,
    /// Centred in the viewport, ignoring the target.
    Center,
}

impl From<Side> for PlacementSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Top => Self::Top,
            Side::Bottom => Self::Bottom,
            Side::Left => Self::Left,
            Side::Right => Self::Right,
        }
    }
}

/// Free space between a target and each viewport edge. Negative when the
/// target pokes out past that edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideSpace {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl SideSpace {
    pub fn around(target: Rect, viewport: Viewport) -> Self {
        Self {
            top: target.top(),
            bottom: viewport.height.saturating_sub(target.bottom()),
            left: target.left(),
            right: viewport.width.saturating_sub(target.right()),
        }
    }

    pub fn get(&self, side: Side) -> i32 {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Ordering strategy for candidate sides.
pub trait PlacementPolicy: fmt::Debug {
    /// Sides to try, most wanted first. `preferred` is the side the step's
    /// author declared; policies are free to ignore it.
    fn candidates(&self, preferred: Side) -> Vec<Side>;
}

/// Fixed priority order. The default is bottom, top, right, left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityPolicy {
    order: Vec<Side>,
}

impl PriorityPolicy {
    pub const DEFAULT_ORDER: [Side; 4] = [Side::Bottom, Side::Top, Side::Right, Side::Left];

    pub fn new(order: impl Into<Vec<Side>>) -> Self {
        Self {
            order: order.into(),
        }
    }

    pub fn order(&self) -> &[Side] {
        &self.order
    }
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ORDER)
    }
}

impl PlacementPolicy for PriorityPolicy {
    fn candidates(&self, _preferred: Side) -> Vec<Side> {
        self.order.clone()
    }
}

/// Try the step's declared side first, then the fallback order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferredFirst {
    fallback: PriorityPolicy,
}

impl PreferredFirst {
    pub fn new(fallback: PriorityPolicy) -> Self {
        Self { fallback }
    }
}

impl PlacementPolicy for PreferredFirst {
    fn candidates(&self, preferred: Side) -> Vec<Side> {
        let mut sides = Vec::with_capacity(self.fallback.order.len() + 1);
        sides.push(preferred);
        sides.extend(self.fallback.order.iter().copied().filter(|&s| s != preferred));
        sides
    }
}

/// A solved popover position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub side: PlacementSide,
    /// Popover bounds relative to the viewport.
    pub rect: Rect,
    /// Popover bounds in page coordinates (viewport + scroll offsets), for
    /// absolutely positioned popovers.
    pub page_rect: Rect,
}

/// Computes where the annotation popover goes.
#[derive(Debug)]
pub struct PlacementSolver {
    popover: Size,
    margin: i32,
    policy: Box<dyn PlacementPolicy>,
}

impl Default for PlacementSolver {
    fn default() -> Self {
        Self::from_config(&PlacementConfig::default())
    }
}

impl PlacementSolver {
    pub fn new(popover: Size, margin: i32) -> Self {
        Self {
            popover,
            margin: margin.max(0),
            policy: Box::new(PriorityPolicy::default()),
        }
    }

    pub fn from_config(config: &PlacementConfig) -> Self {
        let solver = Self::new(
            Size::new(config.popover_width, config.popover_height),
            config.margin,
        );
        if config.honor_preferred {
            solver.policy(PreferredFirst::default())
        } else {
            solver
        }
    }

    /// Replace the candidate ordering strategy.
    #[must_use]
    pub fn policy(mut self, policy: impl PlacementPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn popover_size(&self) -> Size {
        self.popover
    }

    pub fn margin(&self) -> i32 {
        self.margin
    }

    /// Whether the popover fits on `side` of a target with `space` around it.
    pub fn fits(&self, space: &SideSpace, side: Side) -> bool {
        let need = match side {
            Side::Top | Side::Bottom => self.popover.height,
            Side::Left | Side::Right => self.popover.width,
        };
        space.get(side) >= need.saturating_add(self.margin)
    }

    /// Pick a side for `target` and position the popover there.
    pub fn solve(&self, target: Rect, viewport: Viewport, preferred: Side) -> Placement {
        let space = SideSpace::around(target, viewport);
        let side = self
            .policy
            .candidates(preferred)
            .into_iter()
            .find(|&side| self.fits(&space, side))
            .map_or(PlacementSide::Center, PlacementSide::from);
        self.place_on(side, target, viewport)
    }

    /// Position the popover on `side` without checking for room. Used for
    /// forced placements; still clamps along the free axis.
    pub fn place_on(&self, side: PlacementSide, target: Rect, viewport: Viewport) -> Placement {
        let Size { width, height } = self.popover;
        let m = self.margin;
        let center = target.center();

        let across_x = clamp_axis(center.x.saturating_sub(width / 2), viewport.width, width, m);
        let across_y = clamp_axis(center.y.saturating_sub(height / 2), viewport.height, height, m);

        let (x, y) = match side {
            PlacementSide::Bottom => (across_x, target.bottom().saturating_add(m)),
            PlacementSide::Top => (across_x, target.top().saturating_sub(m).saturating_sub(height)),
            PlacementSide::Right => (target.right().saturating_add(m), across_y),
            PlacementSide::Left => (target.left().saturating_sub(m).saturating_sub(width), across_y),
            PlacementSide::Center => (
                ((viewport.width - width) / 2).max(0),
                ((viewport.height - height) / 2).max(0),
            ),
        };

        let rect = Rect::at(Point::new(x, y), self.popover);
        Placement {
            side,
            rect,
            page_rect: viewport.to_page(rect),
        }
    }
}

/// Keep `[pos, pos + size)` at least `margin` inside `[0, extent)`. When the
/// extent is too small for that, centre instead.
fn clamp_axis(pos: i32, extent: i32, size: i32, margin: i32) -> i32 {
    let lo = margin;
    let hi = extent.saturating_sub(size).saturating_sub(margin);
    if hi >= lo {
        pos.clamp(lo, hi)
    } else {
        (extent.saturating_sub(size) / 2).max(0)
    }
}
