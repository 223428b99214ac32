#![forbid(unsafe_code)]

//! Step metadata and the opaque element handle.

use serde::{Deserialize, Serialize};

/// Side of the target an annotation popover sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];
}

/// Opaque token naming a mounted UI element.
///
/// The engine never interprets the value; it hands it back to the host when
/// asking for bounds or scrolling. Hosts typically use a node id, an arena
/// index, or a widget id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

/// A single annotated UI element's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourStep {
    /// Unique identifier.
    pub id: String,
    pub title: String,
    pub content: String,
    /// Sort key. Need not be contiguous.
    pub order: i64,
    /// Side the step's author would like the popover on.
    #[serde(default)]
    pub position: Side,
}

impl TourStep {
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            content: String::new(),
            order,
            position: Side::default(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn position(mut self, position: Side) -> Self {
        self.position = position;
        self
    }
}
