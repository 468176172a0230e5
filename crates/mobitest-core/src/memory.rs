//! In-memory [`AutomationDriver`] for tests and dry runs.
//!
//! A [`MemoryDriver`] holds a scripted screen: a list of elements, each bound
//! to the locator that finds it. Elements can be made to appear later (after
//! a delay, a number of back presses, or a number of gestures) and attributes
//! can be scheduled to change, so polling waits can be exercised under
//! tokio's paused clock. Every command is recorded for later assertions.
//!
//! ```
//! use mobitest_core::element::ElementFrame;
//! use mobitest_core::locator::Locator;
//! use mobitest_core::memory::{MemoryDriver, MemoryElement};
//!
//! let driver = MemoryDriver::new();
//! let login = driver.add(MemoryElement::new(Locator::id("btn_login"), ElementFrame::new(0, 0, 200, 80)));
//! assert_eq!(login.id(), "mem-1");
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::action::PointerSequence;
use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementFrame, ElementHandle, WindowSize};
use crate::locator::Locator;

/// When a scripted element becomes findable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Appearance {
    /// Present from the start.
    Immediate,
    /// Present once this much time has passed since it was added.
    After(Duration),
    /// Present after this many back presses.
    AfterBackPresses(usize),
    /// Present after this many performed pointer sequences.
    AfterGestures(usize),
}

/// One scripted on-screen element.
#[derive(Debug, Clone)]
pub struct MemoryElement {
    pub locator: Locator,
    pub frame: ElementFrame,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub displayed: bool,
    pub enabled: bool,
    pub appearance: Appearance,
}

impl MemoryElement {
    pub fn new(locator: Locator, frame: ElementFrame) -> Self {
        Self {
            locator,
            frame,
            text: String::new(),
            attributes: BTreeMap::new(),
            displayed: true,
            enabled: true,
            appearance: Appearance::Immediate,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appears(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }
}

struct Slot {
    handle: ElementHandle,
    element: MemoryElement,
    added_at: Instant,
    removed: bool,
}

struct ScheduledChange {
    at: Instant,
    handle: ElementHandle,
    target: ChangeTarget,
}

enum ChangeTarget {
    Attribute(String, String),
    Displayed(bool),
    Enabled(bool),
}

struct State {
    connected: bool,
    window: WindowSize,
    slots: Vec<Slot>,
    scheduled: Vec<ScheduledChange>,
    next_id: usize,
    performed: Vec<PointerSequence>,
    clicks: Vec<ElementHandle>,
    typed: Vec<(ElementHandle, String)>,
    back_presses: usize,
    keyboard_hides: usize,
    notification_opens: usize,
    quits: usize,
    fail_performs: bool,
    supports_notifications: bool,
}

impl State {
    fn apply_due(&mut self) {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|c| c.at <= now);
        self.scheduled = pending;
        for change in due {
            if let Some(slot) = self.slots.iter_mut().find(|s| s.handle == change.handle) {
                match change.target {
                    ChangeTarget::Attribute(name, value) => {
                        slot.element.attributes.insert(name, value);
                    }
                    ChangeTarget::Displayed(displayed) => slot.element.displayed = displayed,
                    ChangeTarget::Enabled(enabled) => slot.element.enabled = enabled,
                }
            }
        }
    }

    fn is_present(&self, slot: &Slot) -> bool {
        if slot.removed {
            return false;
        }
        match slot.element.appearance {
            Appearance::Immediate => true,
            Appearance::After(delay) => Instant::now() >= slot.added_at + delay,
            Appearance::AfterBackPresses(n) => self.back_presses >= n,
            Appearance::AfterGestures(n) => self.performed.len() >= n,
        }
    }

    fn slot(&self, handle: &ElementHandle) -> Result<&Slot, DriverError> {
        self.slots
            .iter()
            .find(|s| &s.handle == handle && !s.removed)
            .ok_or_else(|| {
                DriverError::CommandFailed(format!("stale element reference: {}", handle))
            })
    }

    fn slot_mut(&mut self, handle: &ElementHandle) -> Result<&mut Slot, DriverError> {
        self.slots
            .iter_mut()
            .find(|s| &s.handle == handle && !s.removed)
            .ok_or_else(|| {
                DriverError::CommandFailed(format!("stale element reference: {}", handle))
            })
    }

    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.connected {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }
}

/// Scripted in-memory driver.
pub struct MemoryDriver {
    session_id: String,
    state: Mutex<State>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// Creates a connected driver with a 1080x2340 portrait window.
    pub fn new() -> Self {
        Self {
            session_id: format!("memory-{}", Uuid::new_v4()),
            state: Mutex::new(State {
                connected: true,
                window: WindowSize::new(1080, 2340),
                slots: Vec::new(),
                scheduled: Vec::new(),
                next_id: 1,
                performed: Vec::new(),
                clicks: Vec::new(),
                typed: Vec::new(),
                back_presses: 0,
                keyboard_hides: 0,
                notification_opens: 0,
                quits: 0,
                fail_performs: false,
                supports_notifications: true,
            }),
        }
    }

    pub fn with_window_size(self, width: i32, height: i32) -> Self {
        self.lock().window = WindowSize::new(width, height);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an element to the screen and returns its handle.
    pub fn add(&self, element: MemoryElement) -> ElementHandle {
        let mut state = self.lock();
        let handle = ElementHandle::new(format!("mem-{}", state.next_id));
        state.next_id += 1;
        state.slots.push(Slot {
            handle: handle.clone(),
            element,
            added_at: Instant::now(),
            removed: false,
        });
        handle
    }

    /// Removes an element; its handle goes stale.
    pub fn remove(&self, handle: &ElementHandle) {
        let mut state = self.lock();
        if let Some(slot) = state.slots.iter_mut().find(|s| &s.handle == handle) {
            slot.removed = true;
        }
    }

    pub fn set_attribute(&self, handle: &ElementHandle, name: &str, value: &str) {
        self.schedule(
            handle,
            Duration::ZERO,
            ChangeTarget::Attribute(name.to_string(), value.to_string()),
        );
    }

    /// Changes an attribute once `after` has elapsed.
    pub fn schedule_attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
        value: &str,
        after: Duration,
    ) {
        self.schedule(handle, after, ChangeTarget::Attribute(name.to_string(), value.to_string()));
    }

    pub fn schedule_displayed(&self, handle: &ElementHandle, displayed: bool, after: Duration) {
        self.schedule(handle, after, ChangeTarget::Displayed(displayed));
    }

    pub fn schedule_enabled(&self, handle: &ElementHandle, enabled: bool, after: Duration) {
        self.schedule(handle, after, ChangeTarget::Enabled(enabled));
    }

    fn schedule(&self, handle: &ElementHandle, after: Duration, target: ChangeTarget) {
        let mut state = self.lock();
        state.scheduled.push(ScheduledChange {
            at: Instant::now() + after,
            handle: handle.clone(),
            target,
        });
        state.apply_due();
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Makes every `perform` call fail.
    pub fn fail_performs(&self, fail: bool) {
        self.lock().fail_performs = fail;
    }

    /// Makes `open_notifications` report unsupported (iOS behavior).
    pub fn without_notifications(self) -> Self {
        self.lock().supports_notifications = false;
        self
    }

    pub fn performed(&self) -> Vec<PointerSequence> {
        self.lock().performed.clone()
    }

    pub fn clicks(&self) -> Vec<ElementHandle> {
        self.lock().clicks.clone()
    }

    pub fn typed(&self) -> Vec<(ElementHandle, String)> {
        self.lock().typed.clone()
    }

    pub fn back_presses(&self) -> usize {
        self.lock().back_presses
    }

    pub fn keyboard_hides(&self) -> usize {
        self.lock().keyboard_hides
    }

    pub fn notification_opens(&self) -> usize {
        self.lock().notification_opens
    }

    pub fn quits(&self) -> usize {
        self.lock().quits
    }
}

#[async_trait]
impl AutomationDriver for MemoryDriver {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle, DriverError> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(locator.clone()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.apply_due();
        let found: Vec<ElementHandle> = state
            .slots
            .iter()
            .filter(|s| &s.element.locator == locator && state.is_present(s))
            .map(|s| s.handle.clone())
            .collect();
        debug!(%locator, count = found.len(), "find_elements");
        Ok(found)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.apply_due();
        Ok(state.slot(element)?.element.attributes.get(name).cloned())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        let state = self.lock();
        state.ensure_connected()?;
        Ok(state.slot(element)?.element.text.clone())
    }

    async fn rect(&self, element: &ElementHandle) -> Result<ElementFrame, DriverError> {
        let state = self.lock();
        state.ensure_connected()?;
        Ok(state.slot(element)?.element.frame)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.apply_due();
        Ok(state.slot(element)?.element.displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.apply_due();
        Ok(state.slot(element)?.element.enabled)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.slot(element)?;
        state.clicks.push(element.clone());
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.slot_mut(element)?.element.text.clear();
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.slot_mut(element)?.element.text.push_str(text);
        state.typed.push((element.clone(), text.to_string()));
        Ok(())
    }

    async fn perform(&self, sequence: &PointerSequence) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        if state.fail_performs {
            return Err(DriverError::CommandFailed("pointer actions rejected".to_string()));
        }
        debug!(ticks = sequence.actions.len(), "perform");
        state.performed.push(sequence.clone());
        Ok(())
    }

    async fn window_size(&self) -> Result<WindowSize, DriverError> {
        let state = self.lock();
        state.ensure_connected()?;
        Ok(state.window)
    }

    async fn navigate_back(&self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.back_presses += 1;
        Ok(())
    }

    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.keyboard_hides += 1;
        Ok(())
    }

    async fn open_notifications(&self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        if !state.supports_notifications {
            return Err(DriverError::Unsupported("open_notifications"));
        }
        state.notification_opens += 1;
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.ensure_connected()?;
        state.connected = false;
        state.quits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ElementFrame {
        ElementFrame::new(10, 20, 100, 40)
    }

    #[tokio::test]
    async fn find_and_read() {
        let driver = MemoryDriver::new();
        let handle = driver.add(
            MemoryElement::new(Locator::id("title"), frame())
                .text("Watchlist")
                .attribute("checked", "true"),
        );

        assert_eq!(driver.find_element(&Locator::id("title")).await.unwrap(), handle);
        assert_eq!(driver.text(&handle).await.unwrap(), "Watchlist");
        assert_eq!(driver.attribute(&handle, "checked").await.unwrap().as_deref(), Some("true"));
        assert_eq!(driver.attribute(&handle, "selected").await.unwrap(), None);
        assert_eq!(driver.rect(&handle).await.unwrap(), frame());

        let err = driver.find_element(&Locator::id("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_appearance_and_changes() {
        let driver = MemoryDriver::new();
        let loc = Locator::id("toast");
        driver.add(
            MemoryElement::new(loc.clone(), frame())
                .appears(Appearance::After(Duration::from_secs(3))),
        );
        let row = driver
            .add(MemoryElement::new(Locator::id("row"), frame()).attribute("content-desc", "a"));
        driver.schedule_attribute(&row, "content-desc", "b", Duration::from_secs(1));

        assert!(driver.find_elements(&loc).await.unwrap().is_empty());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(driver.attribute(&row, "content-desc").await.unwrap().as_deref(), Some("b"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(driver.find_elements(&loc).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn back_and_gesture_triggers() {
        let driver = MemoryDriver::new();
        let home = Locator::id("home");
        let footer = Locator::id("footer");
        driver.add(
            MemoryElement::new(home.clone(), frame()).appears(Appearance::AfterBackPresses(2)),
        );
        driver.add(
            MemoryElement::new(footer.clone(), frame()).appears(Appearance::AfterGestures(1)),
        );

        driver.navigate_back().await.unwrap();
        assert!(driver.find_elements(&home).await.unwrap().is_empty());
        driver.navigate_back().await.unwrap();
        assert!(!driver.find_elements(&home).await.unwrap().is_empty());

        driver.perform(&PointerSequence::finger().down().up()).await.unwrap();
        assert!(!driver.find_elements(&footer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn quit_disconnects() {
        let driver = MemoryDriver::new();
        driver.quit().await.unwrap();
        assert!(!driver.is_connected());
        assert_eq!(driver.quits(), 1);
        assert!(matches!(
            driver.find_element(&Locator::id("x")).await,
            Err(DriverError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn removed_handle_is_stale() {
        let driver = MemoryDriver::new();
        let handle = driver.add(MemoryElement::new(Locator::id("x"), frame()));
        driver.remove(&handle);
        assert!(driver.text(&handle).await.is_err());
        assert!(driver.find_elements(&Locator::id("x")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_window_size() {
        let driver = MemoryDriver::new().with_window_size(720, 1600);
        assert_eq!(driver.window_size().await.unwrap(), WindowSize::new(720, 1600));
    }

    #[tokio::test]
    async fn set_attribute_applies_immediately() {
        let driver = MemoryDriver::new();
        let toggle = driver.add(
            MemoryElement::new(Locator::id("toggle"), frame()).attribute("checked", "false"),
        );
        driver.set_attribute(&toggle, "checked", "true");
        assert_eq!(driver.attribute(&toggle, "checked").await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_visibility() {
        let driver = MemoryDriver::new();
        let spinner = driver.add(MemoryElement::new(Locator::id("spinner"), frame()));
        driver.schedule_displayed(&spinner, false, Duration::from_secs(2));

        assert!(driver.is_displayed(&spinner).await.unwrap());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!driver.is_displayed(&spinner).await.unwrap());
    }
}
