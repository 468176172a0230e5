//! Page-level actions.
//!
//! [`ActionExecutor`] combines the waiter, the gesture synthesizer and plain
//! driver commands into the actions page objects are written in: "wait for
//! it, then tap it", "scroll until it shows up", "read its price".
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mobitest_core::executor::ActionExecutor;
//! use mobitest_core::locator::Locator;
//! use mobitest_core::memory::MemoryDriver;
//!
//! #[tokio::main]
//! async fn main() -> mobitest_core::error::Result<()> {
//!     let actions = ActionExecutor::new(Arc::new(MemoryDriver::new()), Duration::from_secs(30));
//!
//!     actions.send_values(&Locator::id("et_mobile"), "9999999999").await?;
//!     actions.tap_on(&Locator::id("btn_login")).await?;
//!     let price = actions.price_value(&Locator::accessibility_id("ltp")).await?;
//!     println!("LTP: {:?}", price);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

use crate::content::{extract_boolean, extract_price, split_lines};
use crate::driver::AutomationDriver;
use crate::element::ElementHandle;
use crate::error::{AutomationError, Result};
use crate::gesture::{GestureSynthesizer, Side};
use crate::locator::Locator;
use crate::wait::{ElementWaiter, CONTENT_DESC, QUICK_PROBE_TIMEOUT};

/// Ceiling of the scroll / back / swipe search loops.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Every text view on screen; used to read the notification shade.
pub const NOTIFICATION_TEXT: &str = "//android.widget.TextView";

/// Accessibility id of the shade's "clear all" button.
pub const CLEAR_ALL_NOTIFICATIONS: &str = "Clear all notifications.";

/// What a search loop does between probes.
enum Step<'a> {
    ScrollDown,
    NavigateBack,
    SwipeRight(&'a Locator),
}

impl Step<'_> {
    fn condition(&self) -> &'static str {
        match self {
            Step::ScrollDown => "present after scrolling",
            Step::NavigateBack => "present after navigating back",
            Step::SwipeRight(_) => "present after swiping",
        }
    }
}

/// Executes page-level actions against one session.
#[derive(Clone)]
pub struct ActionExecutor {
    driver: Arc<dyn AutomationDriver>,
    waiter: ElementWaiter,
    gestures: GestureSynthesizer,
}

impl ActionExecutor {
    /// Creates an executor whose waits default to `default_timeout`.
    pub fn new(driver: Arc<dyn AutomationDriver>, default_timeout: Duration) -> Self {
        Self {
            waiter: ElementWaiter::new(driver.clone(), default_timeout),
            gestures: GestureSynthesizer::new(driver.clone()),
            driver,
        }
    }

    /// Replaces the gesture synthesizer (e.g. one with custom timing).
    pub fn with_gestures(mut self, gestures: GestureSynthesizer) -> Self {
        self.gestures = gestures;
        self
    }

    /// Returns a reference to the underlying driver.
    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    pub fn waiter(&self) -> &ElementWaiter {
        &self.waiter
    }

    pub fn gestures(&self) -> &GestureSynthesizer {
        &self.gestures
    }

    /// Waits for the element to be visible, then clicks it.
    pub async fn tap_on(&self, locator: &Locator) -> Result<()> {
        let span = info_span!("tap_on", %locator);
        async {
            let element = self.waiter.await_visible(locator).await?;
            self.driver.click(&element).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Waits for the element to be clickable, then clicks it.
    pub async fn tap_when_clickable(&self, locator: &Locator) -> Result<()> {
        let element = self.waiter.await_clickable(locator).await?;
        self.driver.click(&element).await?;
        Ok(())
    }

    /// Clicks the element if it shows up within the quick-probe window.
    /// Returns whether it was tapped.
    pub async fn tap_if_present(&self, locator: &Locator) -> Result<bool> {
        match self.waiter.await_visible_for(locator, QUICK_PROBE_TIMEOUT).await {
            Ok(element) => {
                self.driver.click(&element).await?;
                Ok(true)
            }
            Err(e) if e.is_timeout() => {
                debug!(%locator, "not present, skipping tap");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Taps the left or right part of the element.
    pub async fn tap_side(&self, locator: &Locator, side: Side) -> Result<()> {
        let element = self.waiter.await_visible(locator).await?;
        self.gestures.tap_offset(&element, side).await
    }

    /// Focuses the field, clears it and types `value`.
    pub async fn send_values(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.waiter.await_visible(locator).await?;
        self.driver.click(&element).await?;
        self.driver.clear(&element).await?;
        self.driver.send_keys(&element, value).await?;
        Ok(())
    }

    pub async fn hide_keyboard(&self) -> Result<()> {
        self.gestures.hide_keyboard().await
    }

    pub async fn navigate_back(&self) -> Result<()> {
        self.gestures.navigate_back().await
    }

    /// Swipes the screen up (0.8 → 0.4 of the height) until the element is
    /// visible, for at most 20 s.
    pub async fn scroll_down_to(&self, locator: &Locator) -> Result<ElementHandle> {
        self.search(locator, Step::ScrollDown).await
    }

    /// Presses back until the element is visible, for at most 20 s.
    pub async fn navigate_back_to(&self, locator: &Locator) -> Result<ElementHandle> {
        self.search(locator, Step::NavigateBack).await
    }

    /// Swipes `element` left-to-right until `target` is visible, for at most
    /// 20 s.
    pub async fn swipe_right_until(
        &self,
        element: &Locator,
        target: &Locator,
    ) -> Result<ElementHandle> {
        self.search(target, Step::SwipeRight(element)).await
    }

    async fn search(&self, target: &Locator, step: Step<'_>) -> Result<ElementHandle> {
        let span = info_span!("search", %target, condition = step.condition());
        async {
            let start = Instant::now();
            let mut steps = 0usize;
            loop {
                match self.waiter.await_visible_for(target, QUICK_PROBE_TIMEOUT).await {
                    Ok(element) => {
                        let elapsed_ms = start.elapsed().as_millis() as u64;
                        debug!(steps, elapsed_ms, "target reached");
                        return Ok(element);
                    }
                    Err(e) if e.is_timeout() => {}
                    Err(e) => return Err(e),
                }
                if start.elapsed() >= SEARCH_TIMEOUT {
                    return Err(AutomationError::timeout(target, step.condition(), SEARCH_TIMEOUT));
                }
                match step {
                    Step::ScrollDown => self.gestures.swipe_screen(0.8, 0.4).await?,
                    Step::NavigateBack => self.gestures.navigate_back().await?,
                    Step::SwipeRight(element) => {
                        let element = self.waiter.await_visible(element).await?;
                        self.gestures.swipe_within_element(&element, true).await?;
                    }
                }
                steps += 1;
            }
        }
        .instrument(span)
        .await
    }

    /// Swipes within the element, left-to-right or the reverse.
    pub async fn swipe_element(&self, locator: &Locator, left_to_right: bool) -> Result<()> {
        let element = self.waiter.await_visible(locator).await?;
        self.gestures.swipe_within_element(&element, left_to_right).await
    }

    /// Swipes right across the element's row `times` times; failed swipes
    /// are logged and skipped.
    pub async fn swipe_right_times(&self, locator: &Locator, times: usize) -> Result<()> {
        let element = self.waiter.await_visible(locator).await?;
        self.gestures.repeated_swipe_right(&element, times).await;
        Ok(())
    }

    pub async fn long_press_on(&self, locator: &Locator) -> Result<()> {
        let element = self.waiter.await_visible(locator).await?;
        self.gestures.long_press(&element).await
    }

    pub async fn double_tap_on(&self, locator: &Locator) -> Result<()> {
        let element = self.waiter.await_visible(locator).await?;
        self.gestures.double_tap(&element).await
    }

    /// Whether the element becomes visible within the quick-probe window.
    pub async fn is_present(&self, locator: &Locator) -> bool {
        self.waiter.try_await_visible(locator).await
    }

    /// The element's `content-desc`.
    pub async fn content(&self, locator: &Locator) -> Result<String> {
        let element = self.waiter.await_visible(locator).await?;
        self.content_of(&element).await
    }

    async fn content_of(&self, element: &ElementHandle) -> Result<String> {
        self.driver
            .attribute(element, CONTENT_DESC)
            .await?
            .ok_or_else(|| AutomationError::Content(format!("{} has no {}", element, CONTENT_DESC)))
    }

    /// The element's `content-desc`, one entry per line.
    pub async fn values_list(&self, locator: &Locator) -> Result<Vec<String>> {
        let content = self.content(locator).await?;
        Ok(split_lines(&content).into_iter().map(str::to_string).collect())
    }

    pub async fn text(&self, locator: &Locator) -> Result<String> {
        let element = self.waiter.await_visible(locator).await?;
        Ok(self.driver.text(&element).await?)
    }

    /// Reads the `checked` attribute; absent means unchecked.
    pub async fn is_checked(&self, locator: &Locator) -> Result<bool> {
        let element = self.waiter.await_visible(locator).await?;
        let checked = self.driver.attribute(&element, "checked").await?;
        Ok(checked.as_deref().is_some_and(extract_boolean))
    }

    pub async fn is_enabled(&self, locator: &Locator) -> Result<bool> {
        let element = self.waiter.await_visible(locator).await?;
        Ok(self.driver.is_enabled(&element).await?)
    }

    /// The first price in the element's `content-desc`, or `None` if the
    /// description holds no number.
    pub async fn price_value(&self, locator: &Locator) -> Result<Option<String>> {
        let content = self.content(locator).await?;
        Ok(extract_price(&content))
    }

    /// Opens the notification shade and returns the text of every text view
    /// in it.
    pub async fn notifications(&self) -> Result<Vec<String>> {
        let span = info_span!("notifications");
        async {
            self.gestures.open_notifications().await?;
            let elements = self.driver.find_elements(&Locator::xpath(NOTIFICATION_TEXT)).await?;
            let mut texts = Vec::with_capacity(elements.len());
            for element in &elements {
                texts.push(self.driver.text(element).await?);
            }
            debug!(count = texts.len(), "notifications read");
            Ok(texts)
        }
        .instrument(span)
        .await
    }

    /// Opens the shade, scrolls to "clear all" and taps it. Returns whether
    /// it was tapped.
    pub async fn clear_notifications(&self) -> Result<bool> {
        self.gestures.open_notifications().await?;
        let clear = Locator::accessibility_id(CLEAR_ALL_NOTIFICATIONS);
        self.scroll_down_to(&clear).await?;
        self.tap_if_present(&clear).await
    }

    /// Waits for the element, then for line 2 of its description to change.
    pub async fn await_value_change(&self, locator: &Locator) -> Result<bool> {
        let element = self.waiter.await_visible(locator).await?;
        self.waiter.await_value_change(&element).await
    }
}
