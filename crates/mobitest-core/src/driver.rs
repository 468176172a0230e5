//! Automation driver trait for backend-agnostic mobile UI automation.
//!
//! This module defines the [`AutomationDriver`] trait, the narrow interface the
//! core consumes from a remote automation session (an Appium/W3C WebDriver
//! session against an Android or iOS device). Session bootstrap, transport
//! and authentication live behind implementations of this trait; the locator,
//! wait and gesture layers only ever talk to it.
//!
//! An in-memory implementation, [`MemoryDriver`](crate::memory::MemoryDriver),
//! backs the test suite and dry runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::action::PointerSequence;
use crate::element::{ElementFrame, ElementHandle, WindowSize};
use crate::locator::Locator;

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type,
/// allowing consumers to handle errors uniformly regardless of the
/// underlying automation backend.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The session is not available or has been closed.
    #[error("Not connected to automation session")]
    NotConnected,

    /// No element matched the locator.
    #[error("No such element: {0}")]
    NoSuchElement(Locator),

    /// The backend does not implement the requested command.
    #[error("Unsupported by this driver: {0}")]
    Unsupported(&'static str),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl DriverError {
    /// Returns true if the error means "element is not there (yet)".
    ///
    /// Polling waits treat these as "keep polling" rather than a hard failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::NoSuchElement(_))
    }
}

/// Trait for backend-agnostic mobile UI automation.
///
/// Implementors wrap one live remote session. All methods that talk to the
/// device are async so that both HTTP-backed sessions and in-memory fakes fit
/// behind the same interface.
///
/// # Required Methods
///
/// Implementors must provide: [`session_id`](AutomationDriver::session_id),
/// [`is_connected`](AutomationDriver::is_connected),
/// [`find_element`](AutomationDriver::find_element),
/// [`find_elements`](AutomationDriver::find_elements),
/// [`attribute`](AutomationDriver::attribute),
/// [`text`](AutomationDriver::text),
/// [`rect`](AutomationDriver::rect),
/// [`is_displayed`](AutomationDriver::is_displayed),
/// [`is_enabled`](AutomationDriver::is_enabled),
/// [`click`](AutomationDriver::click),
/// [`clear`](AutomationDriver::clear),
/// [`send_keys`](AutomationDriver::send_keys),
/// [`perform`](AutomationDriver::perform),
/// [`window_size`](AutomationDriver::window_size),
/// [`navigate_back`](AutomationDriver::navigate_back),
/// and [`quit`](AutomationDriver::quit).
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Identifier of the remote session this driver is bound to.
    fn session_id(&self) -> &str;

    /// Check if the session is ready to accept commands.
    fn is_connected(&self) -> bool;

    /// Find the first element matching `locator`.
    ///
    /// Returns [`DriverError::NoSuchElement`] when nothing matches.
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, DriverError>;

    /// Find every element matching `locator`. An empty list is not an error.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError>;

    /// Read a named attribute (e.g. `content-desc`, `checked`).
    ///
    /// `Ok(None)` when the element has no such attribute.
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Read the element's visible text.
    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError>;

    /// Read the element's current frame.
    async fn rect(&self, element: &ElementHandle) -> Result<ElementFrame, DriverError>;

    /// Whether the element is currently displayed.
    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Whether the element is currently enabled.
    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Click (native tap) the element.
    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Clear an editable element.
    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Type text into an editable element.
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError>;

    /// Dispatch a pointer-input sequence. Not interruptible once sent.
    async fn perform(&self, sequence: &PointerSequence) -> Result<(), DriverError>;

    /// Current viewport size.
    async fn window_size(&self) -> Result<WindowSize, DriverError>;

    /// Press the system back button / navigate back once.
    async fn navigate_back(&self) -> Result<(), DriverError>;

    /// Dismiss the on-screen keyboard.
    ///
    /// Not all backends support this. The default implementation returns
    /// an error.
    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("hide_keyboard"))
    }

    /// Pull down the notification shade (Android only).
    ///
    /// The default implementation returns an error.
    async fn open_notifications(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("open_notifications"))
    }

    /// End the remote session. Further commands fail with
    /// [`DriverError::NotConnected`].
    async fn quit(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::CommandFailed("tap failed".to_string());
        assert!(err.to_string().contains("tap failed"));

        let err = DriverError::NotConnected;
        assert!(err.to_string().contains("Not connected"));

        let err = DriverError::NoSuchElement(Locator::id("btn_login"));
        assert!(err.to_string().contains("id=btn_login"));
        assert!(err.is_not_found());

        let err = DriverError::Unsupported("hide_keyboard");
        assert!(err.to_string().contains("hide_keyboard"));
        assert!(!err.is_not_found());

        let err = DriverError::JsonParse("unexpected token".to_string());
        assert!(err.to_string().contains("unexpected token"));
    }
}
