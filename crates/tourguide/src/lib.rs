#![forbid(unsafe_code)]

//! Guided-tour engine.
//!
//! # Role in tourguide
//! `tourguide` walks a user through annotated UI elements. It is
//! toolkit-agnostic: the hosting UI reports element bounds and viewport
//! metrics through [`TourHost`], and renders whatever [`TourLayout`] and
//! [`StepView`] describe.
//!
//! # Primary responsibilities
//! - **StepRegistry**: which steps are mounted, keyed by id, held in a
//!   generational arena.
//! - **TourController**: the `Idle → Active → Idle` state machine, with
//!   completion/skip callbacks, auto start, and resume.
//! - **PlacementSolver**: where the popover goes (bottom, top, right, left,
//!   then centred), with a pluggable [`PlacementPolicy`].
//! - **Spotlight**: scrim bands and cut-out for the highlight overlay.
//! - **Persistence**: progress and completion flag over a
//!   [`StorageBackend`].
//! - **TourProvider**: glue that schedules scroll-settle repositioning and
//!   routes scrim clicks.
//!
//! # Example
//!
//! ```
//! use tourguide::{
//!     ElementHandle, MemoryStorage, Rect, StaticHost, TourConfig, TourProvider, TourStep, Viewport,
//! };
//! use web_time::{Duration, Instant};
//!
//! let mut host = StaticHost::new(Viewport::new(1280, 800))
//!     .with_element(ElementHandle(1), Rect::new(40, 40, 200, 32));
//! let mut tour = TourProvider::new(&TourConfig::default(), MemoryStorage::new());
//! tour.attach_step(TourStep::new("search", 1).title("Search"), ElementHandle(1))
//!     .unwrap();
//!
//! let t0 = Instant::now();
//! tour.trigger(t0, &mut host);
//! tour.tick(t0 + Duration::from_millis(300), &mut host);
//! assert!(tour.layout().is_some());
//! ```

pub mod config;
pub mod controller;
pub mod deferred;
pub mod error;
pub mod host;
#[cfg(feature = "logging")]
pub mod logging;
pub mod overlay;
pub mod persist;
pub mod placement;
pub mod provider;
pub mod registry;
pub mod step;
pub mod storage;

pub use config::{OverlayConfig, PlacementConfig, TourConfig};
pub use controller::{
    ActiveStep, AdvanceReason, StepView, TourCallbacks, TourController, TourEvent,
};
pub use deferred::{Deferred, TaskId};
pub use error::{Result, TourError};
pub use host::{StaticHost, TourHost};
pub use overlay::{OverlayHit, Spotlight};
pub use persist::{PersistedProgress, Persistence};
pub use placement::{
    Placement, PlacementPolicy, PlacementSide, PlacementSolver, PreferredFirst, PriorityPolicy,
};
pub use provider::{TourLayout, TourProvider};
pub use registry::{DuplicatePolicy, Registration, StepKey, StepRegistry};
pub use step::{ElementHandle, Side, TourStep};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageError, StorageResult};
pub use tourguide_core::{Point, Rect, Sides, Size, Viewport};
