//! Shared element types for driver-backed UI automation.
//!
//! These types describe what the remote automation session hands back: an
//! opaque element handle, the element's on-screen frame, and the current
//! window size. They are independent of any specific driver backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to an element inside a live driver session.
///
/// The wrapped string is the element id assigned by the remote session
/// (W3C `element-6066-11e4-a52e-4f735466cecf`). A handle is only meaningful
/// for the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Wraps a driver-assigned element id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the driver-assigned element id.
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Returns true if the handle carries no id.
    ///
    /// Gesture synthesis refuses to act on empty handles.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element({})", self.0)
    }
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in device pixels, with the origin at the top-left
/// corner of the viewport. Frames are read fresh before every gesture and
/// never cached, since layout can shift between reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFrame {
    /// The x-coordinate of the element's top-left corner.
    pub x: i32,
    /// The y-coordinate of the element's top-left corner.
    pub y: i32,
    /// The width of the element.
    pub width: i32,
    /// The height of the element.
    pub height: i32,
}

impl ElementFrame {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Horizontal center, using integer division like the driver does.
    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    /// Vertical center, using integer division like the driver does.
    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }

    /// Center point of the frame.
    pub fn center(&self) -> (i32, i32) {
        (self.center_x(), self.center_y())
    }

    /// Returns true if the frame has a positive area.
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Size of the current device window (viewport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: i32,
    pub height: i32,
}

impl WindowSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}
