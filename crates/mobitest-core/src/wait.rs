//! Polling waits for element readiness.
//!
//! [`ElementWaiter`] repeatedly queries the driver until a condition holds or
//! a timeout elapses. "Element not found" between polls is expected and
//! simply means "poll again"; any other driver error ends the wait.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mobitest_core::locator::Locator;
//! use mobitest_core::memory::MemoryDriver;
//! use mobitest_core::wait::ElementWaiter;
//!
//! # async fn run() -> mobitest_core::error::Result<()> {
//! let waiter = ElementWaiter::new(Arc::new(MemoryDriver::new()), Duration::from_secs(30));
//! let login = waiter.await_clickable(&Locator::id("btn_login")).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

use crate::content::line_at;
use crate::driver::AutomationDriver;
use crate::element::ElementHandle;
use crate::error::{AutomationError, Result};
use crate::locator::Locator;

/// Interval between visibility / clickability polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timeout of [`ElementWaiter::try_await_visible`].
pub const QUICK_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Ceiling of [`ElementWaiter::await_value_change`].
pub const VALUE_CHANGE_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between value-change polls.
pub const VALUE_CHANGE_POLL: Duration = Duration::from_millis(2);

/// Attribute carrying the multi-line description.
pub const CONTENT_DESC: &str = "content-desc";

/// Line of the description watched for value changes.
pub const VALUE_LINE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Visible,
    Clickable,
}

impl Condition {
    fn as_str(self) -> &'static str {
        match self {
            Condition::Visible => "visible",
            Condition::Clickable => "clickable",
        }
    }
}

/// Waits for elements to become visible, clickable, or change value.
///
/// Holds no state between calls; cloning is cheap.
#[derive(Clone)]
pub struct ElementWaiter {
    driver: Arc<dyn AutomationDriver>,
    default_timeout: Duration,
    poll_interval: Duration,
}

impl ElementWaiter {
    pub fn new(driver: Arc<dyn AutomationDriver>, default_timeout: Duration) -> Self {
        Self {
            driver,
            default_timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Waits up to the default timeout for `locator` to be found and displayed.
    pub async fn await_visible(&self, locator: &Locator) -> Result<ElementHandle> {
        self.await_visible_for(locator, self.default_timeout).await
    }

    pub async fn await_visible_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        self.poll(locator, Condition::Visible, timeout).await
    }

    /// Waits up to the default timeout for `locator` to be visible and enabled.
    pub async fn await_clickable(&self, locator: &Locator) -> Result<ElementHandle> {
        self.await_clickable_for(locator, self.default_timeout).await
    }

    pub async fn await_clickable_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        self.poll(locator, Condition::Clickable, timeout).await
    }

    /// Quick visibility probe with a 2 s timeout. Never errors.
    pub async fn try_await_visible(&self, locator: &Locator) -> bool {
        self.try_await_visible_for(locator, QUICK_PROBE_TIMEOUT).await
    }

    pub async fn try_await_visible_for(&self, locator: &Locator, timeout: Duration) -> bool {
        match self.await_visible_for(locator, timeout).await {
            Ok(_) => true,
            Err(e) => {
                debug!(%locator, error = %e, "element not present");
                false
            }
        }
    }

    /// Waits up to 20 s for line 2 of the element's `content-desc` to change.
    ///
    /// Returns `Ok(false)` when the value is unchanged at the ceiling. A
    /// missing attribute or a description with fewer than three lines is a
    /// [`AutomationError::Content`] error.
    pub async fn await_value_change(&self, element: &ElementHandle) -> Result<bool> {
        self.await_value_change_for(element, VALUE_CHANGE_TIMEOUT).await
    }

    pub async fn await_value_change_for(
        &self,
        element: &ElementHandle,
        timeout: Duration,
    ) -> Result<bool> {
        let span = info_span!("await_value_change", element = %element);
        async {
            let start = Instant::now();
            let initial = self.watched_value(element).await?;
            debug!(initial = %initial, "watching value");
            loop {
                tokio::time::sleep(VALUE_CHANGE_POLL).await;
                let current = self.watched_value(element).await?;
                if current != initial {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    debug!(elapsed_ms, current = %current, "value changed");
                    return Ok(true);
                }
                if start.elapsed() >= timeout {
                    debug!("value unchanged at ceiling");
                    return Ok(false);
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn watched_value(&self, element: &ElementHandle) -> Result<String> {
        let desc = self
            .driver
            .attribute(element, CONTENT_DESC)
            .await?
            .ok_or_else(|| {
                AutomationError::Content(format!("{} has no {}", element, CONTENT_DESC))
            })?;
        line_at(&desc, VALUE_LINE).map(str::to_string).ok_or_else(|| {
            AutomationError::Content(format!(
                "{} of {} has no line {}: {:?}",
                CONTENT_DESC, element, VALUE_LINE, desc
            ))
        })
    }

    async fn poll(
        &self,
        locator: &Locator,
        condition: Condition,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        let span = info_span!("await_element", %locator, condition = condition.as_str());
        async {
            let start = Instant::now();
            loop {
                if let Some(element) = self.probe(locator, condition).await? {
                    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "condition met");
                    return Ok(element);
                }
                if start.elapsed() >= timeout {
                    return Err(AutomationError::timeout(locator, condition.as_str(), timeout));
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        .instrument(span)
        .await
    }

    async fn probe(
        &self,
        locator: &Locator,
        condition: Condition,
    ) -> Result<Option<ElementHandle>> {
        let element = match self.driver.find_element(locator).await {
            Ok(element) => element,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !self.driver.is_displayed(&element).await? {
            return Ok(None);
        }
        if condition == Condition::Clickable && !self.driver.is_enabled(&element).await? {
            return Ok(None);
        }
        Ok(Some(element))
    }
}
