//! Pointer-input action sequences sent to the driver.
//!
//! Gestures are expressed as W3C WebDriver "actions": a touch input source
//! named `finger` whose ticks move, press, pause and release the pointer.
//! The serialized form is exactly what the remote session's
//! `POST /session/{id}/actions` endpoint expects.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use mobitest_core::action::PointerSequence;
//!
//! let tap = PointerSequence::finger()
//!     .move_to(120, 300, Duration::ZERO)
//!     .down()
//!     .up();
//!
//! assert_eq!(tap.actions.len(), 3);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the single touch input source used by every gesture.
pub const FINGER: &str = "finger";

/// Button index for a touch contact (W3C "left" button).
const CONTACT_BUTTON: u8 = 0;

/// Origin a pointer move is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Absolute viewport coordinates.
    Viewport,
}

/// One tick of a pointer input source.
///
/// Serialized with a `type` tag discriminator (`pointerMove`, `pointerDown`,
/// `pointerUp`, `pause`). Durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerAction {
    /// Move the pointer to `(x, y)` over `duration` milliseconds.
    PointerMove {
        duration: u64,
        x: i32,
        y: i32,
        origin: Origin,
    },

    /// Put the finger down.
    PointerDown { button: u8 },

    /// Lift the finger.
    PointerUp { button: u8 },

    /// Hold the current state for `duration` milliseconds.
    Pause { duration: u64 },
}

impl PointerAction {
    /// Time this tick takes, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match self {
            PointerAction::PointerMove { duration, .. } | PointerAction::Pause { duration } => {
                *duration
            }
            PointerAction::PointerDown { .. } | PointerAction::PointerUp { .. } => 0,
        }
    }
}

/// Kind of pointer device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
    Touch,
}

/// Parameters of a pointer input source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerParameters {
    pub pointer_type: PointerType,
}

/// An input source plus the ordered ticks it performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerSequence {
    /// Always `"pointer"`.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Input source id, e.g. `finger`.
    pub id: String,
    pub parameters: PointerParameters,
    pub actions: Vec<PointerAction>,
}

impl PointerSequence {
    /// Starts an empty touch sequence for the [`FINGER`] input source.
    pub fn finger() -> Self {
        Self {
            source_type: "pointer".to_string(),
            id: FINGER.to_string(),
            parameters: PointerParameters {
                pointer_type: PointerType::Touch,
            },
            actions: Vec::new(),
        }
    }

    /// Appends a viewport-relative move.
    pub fn move_to(mut self, x: i32, y: i32, duration: Duration) -> Self {
        self.actions.push(PointerAction::PointerMove {
            duration: duration.as_millis() as u64,
            x,
            y,
            origin: Origin::Viewport,
        });
        self
    }

    /// Appends a finger-down tick.
    pub fn down(mut self) -> Self {
        self.actions.push(PointerAction::PointerDown {
            button: CONTACT_BUTTON,
        });
        self
    }

    /// Appends a finger-up tick.
    pub fn up(mut self) -> Self {
        self.actions.push(PointerAction::PointerUp {
            button: CONTACT_BUTTON,
        });
        self
    }

    /// Appends a pause tick.
    pub fn pause(mut self, duration: Duration) -> Self {
        self.actions.push(PointerAction::Pause {
            duration: duration.as_millis() as u64,
        });
        self
    }

    /// Sum of all tick durations, in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.actions.iter().map(PointerAction::duration_ms).sum()
    }

    /// Points the finger touches down or moves to, in order.
    pub fn points(&self) -> Vec<(i32, i32)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                PointerAction::PointerMove { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sequence_serializes_to_w3c_shape() {
        let seq = PointerSequence::finger()
            .move_to(10, 20, Duration::ZERO)
            .down()
            .pause(Duration::from_millis(100))
            .up();

        let value = serde_json::to_value(&seq).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "pointer",
                "id": "finger",
                "parameters": { "pointerType": "touch" },
                "actions": [
                    { "type": "pointerMove", "duration": 0, "x": 10, "y": 20, "origin": "viewport" },
                    { "type": "pointerDown", "button": 0 },
                    { "type": "pause", "duration": 100 },
                    { "type": "pointerUp", "button": 0 }
                ]
            })
        );
    }

    #[test]
    fn test_total_duration() {
        let seq = PointerSequence::finger()
            .move_to(0, 0, Duration::ZERO)
            .down()
            .move_to(5, 5, Duration::from_millis(500))
            .pause(Duration::from_secs(1))
            .up();
        assert_eq!(seq.total_duration_ms(), 1500);
        assert_eq!(seq.points(), vec![(0, 0), (5, 5)]);
    }
}
