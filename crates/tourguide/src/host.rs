#![forbid(unsafe_code)]

//! The seam between the tour engine and the hosting UI.
//!
//! The engine never holds element references. It asks the host for the
//! bounds of an [`ElementHandle`] whenever it needs them, and treats `None`
//! as "not mounted right now".

use ahash::AHashMap;
use tourguide_core::{Rect, Viewport};

use crate::step::ElementHandle;

/// What the engine needs from a UI toolkit.
pub trait TourHost {
    /// Current bounds of `element`, relative to the viewport. `None` if the
    /// element is not mounted.
    fn element_bounds(&self, element: ElementHandle) -> Option<Rect>;

    /// Current viewport size and scroll offsets.
    fn viewport(&self) -> Viewport;

    /// Smoothly scroll `element` toward the viewport centre. Fire and forget;
    /// the engine waits a settle delay before reading bounds again.
    fn scroll_into_view(&mut self, element: ElementHandle);
}

/// A headless host with a fixed layout.
///
/// Useful for tests and for server-side previews. Scrolling is recorded, not
/// performed.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    viewport: Viewport,
    bounds: AHashMap<ElementHandle, Rect>,
    scrolled: Vec<ElementHandle>,
}

impl StaticHost {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_element(mut self, element: ElementHandle, bounds: Rect) -> Self {
        self.bounds.insert(element, bounds);
        self
    }

    pub fn place(&mut self, element: ElementHandle, bounds: Rect) {
        self.bounds.insert(element, bounds);
    }

    /// Forget `element`, as if it unmounted.
    pub fn unmount(&mut self, element: ElementHandle) {
        self.bounds.remove(&element);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Elements passed to `scroll_into_view`, oldest first.
    pub fn scroll_requests(&self) -> &[ElementHandle] {
        &self.scrolled
    }
}

impl TourHost for StaticHost {
    fn element_bounds(&self, element: ElementHandle) -> Option<Rect> {
        self.bounds.get(&element).copied()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_into_view(&mut self, element: ElementHandle) {
        self.scrolled.push(element);
    }
}
