#![forbid(unsafe_code)]

//! Core primitives for the tourguide engine.
//!
//! # Role in tourguide
//! `tourguide-core` holds the geometry vocabulary every other layer speaks:
//! rectangles in logical units, points, sizes, padding sides, and the
//! viewport (visible area plus scroll offsets) reported by the host UI.
//!
//! The types are toolkit-agnostic. A browser host reports CSS pixels from
//! `getBoundingClientRect`, a terminal host reports cells; the engine only
//! cares that both sides agree on the unit.

pub mod geometry;

pub use geometry::{Point, Rect, Sides, Size, Viewport};
