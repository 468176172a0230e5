//! Error type shared by the wait, gesture, page and session layers.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::driver::DriverError;
use crate::locator::LocatorError;
use crate::test_data::TestDataError;

/// Boxed cause of a failed page construction.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    TestData(#[from] TestDataError),

    /// A wait condition did not hold before its timeout.
    #[error("Timed out after {}ms waiting for {target} to be {condition}", after.as_millis())]
    Timeout {
        target: String,
        condition: &'static str,
        after: Duration,
    },

    /// A gesture precondition failed before any pointer action was sent.
    #[error("Gesture failed: {0}")]
    Gesture(String),

    #[error("Failed to construct page '{page}': {source}")]
    PageConstruction {
        page: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("No active session")]
    NoActiveSession,

    /// Element text did not have the expected shape.
    #[error("Unexpected content: {0}")]
    Content(String),
}

impl AutomationError {
    pub fn timeout(target: impl ToString, condition: &'static str, after: Duration) -> Self {
        AutomationError::Timeout {
            target: target.to_string(),
            condition,
            after,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AutomationError::Timeout { .. })
    }
}

pub type Result<T, E = AutomationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    #[test]
    fn timeout_names_locator_and_condition() {
        let err = AutomationError::timeout(
            Locator::id("btn_login"),
            "visible",
            Duration::from_secs(30),
        );
        let msg = err.to_string();
        assert!(msg.contains("id=btn_login"));
        assert!(msg.contains("visible"));
        assert!(msg.contains("30000ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn conversions() {
        let err: AutomationError = DriverError::NotConnected.into();
        assert!(matches!(err, AutomationError::Driver(DriverError::NotConnected)));

        let err: AutomationError = LocatorError::Configuration("bad".into()).into();
        assert!(err.to_string().contains("bad"));

        let err: AutomationError = TestDataError::GroupNotFound("userData".into()).into();
        assert!(err.to_string().contains("userData"));
    }

    #[test]
    fn page_construction_keeps_cause() {
        let cause: BoxError = "catalog missing".into();
        let err = AutomationError::PageConstruction { page: "LoginPage", source: cause };
        assert!(err.to_string().contains("LoginPage"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
