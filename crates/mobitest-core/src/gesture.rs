//! Touch gesture synthesis.
//!
//! [`GestureSynthesizer`] turns an element (or the screen) into a W3C pointer
//! sequence and hands it to the driver. Coordinates are computed with integer
//! math from the element's rect and the window size, both read from the
//! driver at call time and never cached.
//!
//! The coordinate math lives in free functions ([`offset_point`],
//! [`element_swipe_points`], ...) so it can be checked without a driver.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::action::PointerSequence;
use crate::driver::AutomationDriver;
use crate::element::{ElementFrame, ElementHandle, WindowSize};
use crate::error::{AutomationError, Result};

/// Timing of the synthesized gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTiming {
    /// Drag duration of [`GestureSynthesizer::swipe_within_element`].
    pub element_swipe: Duration,
    /// Hold duration of [`GestureSynthesizer::long_press`].
    pub long_press: Duration,
    /// Gap between the two taps of [`GestureSynthesizer::double_tap`].
    pub double_tap_gap: Duration,
    /// Drag duration of [`GestureSynthesizer::swipe_screen`].
    pub screen_swipe: Duration,
    /// Drag duration of each [`GestureSynthesizer::repeated_swipe_right`] swipe.
    pub repeated_swipe: Duration,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            element_swipe: Duration::from_millis(500),
            long_press: Duration::from_secs(5),
            double_tap_gap: Duration::from_millis(100),
            screen_swipe: Duration::from_millis(3000),
            repeated_swipe: Duration::from_millis(3000),
        }
    }
}

/// Which half of an element [`GestureSynthesizer::tap_offset`] hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Center x shifted a quarter width toward `side`, center y.
pub fn offset_point(frame: &ElementFrame, side: Side) -> (i32, i32) {
    let quarter = frame.width / 4;
    let x = match side {
        Side::Left => frame.center_x() - quarter,
        Side::Right => frame.center_x() + quarter,
    };
    (x, frame.center_y())
}

/// Start and end of a horizontal swipe across 10%..90% of the element's
/// width at its center y.
///
/// The 90% end rounds up, so any element at least one pixel wide gets a
/// swipe of nonzero length.
pub fn element_swipe_points(
    frame: &ElementFrame,
    left_to_right: bool,
) -> ((i32, i32), (i32, i32)) {
    let y = frame.center_y();
    let left = frame.x + frame.width * 10 / 100;
    let right = frame.x + (frame.width * 90 + 99) / 100;
    if left_to_right {
        ((left, y), (right, y))
    } else {
        ((right, y), (left, y))
    }
}

/// Start and end of a vertical swipe at half the screen width. Fractions are
/// of the window height.
pub fn screen_swipe_points(
    window: &WindowSize,
    start_y_fraction: f64,
    end_y_fraction: f64,
) -> ((i32, i32), (i32, i32)) {
    let x = window.width / 2;
    let start_y = (window.height as f64 * start_y_fraction) as i32;
    let end_y = (window.height as f64 * end_y_fraction) as i32;
    ((x, start_y), (x, end_y))
}

/// Start and end of a rightward swipe from 20% to 90% of the screen width at
/// the element's center y.
pub fn repeated_swipe_points(
    window: &WindowSize,
    frame: &ElementFrame,
) -> ((i32, i32), (i32, i32)) {
    let y = frame.center_y();
    ((window.width * 20 / 100, y), (window.width * 90 / 100, y))
}

fn drag(from: (i32, i32), to: (i32, i32), duration: Duration) -> PointerSequence {
    PointerSequence::finger()
        .move_to(from.0, from.1, Duration::ZERO)
        .down()
        .move_to(to.0, to.1, duration)
        .up()
}

fn press_at(point: (i32, i32)) -> PointerSequence {
    PointerSequence::finger().move_to(point.0, point.1, Duration::ZERO).down().up()
}

/// Synthesizes touch gestures against one driver session.
#[derive(Clone)]
pub struct GestureSynthesizer {
    driver: Arc<dyn AutomationDriver>,
    timing: GestureTiming,
}

impl GestureSynthesizer {
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self::with_timing(driver, GestureTiming::default())
    }

    pub fn with_timing(driver: Arc<dyn AutomationDriver>, timing: GestureTiming) -> Self {
        Self { driver, timing }
    }

    pub fn timing(&self) -> &GestureTiming {
        &self.timing
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.driver.is_connected() {
            Ok(())
        } else {
            Err(AutomationError::Gesture("driver is not connected".to_string()))
        }
    }

    async fn target(&self, element: &ElementHandle) -> Result<ElementFrame> {
        self.ensure_connected()?;
        if element.is_empty() {
            return Err(AutomationError::Gesture("element handle is empty".to_string()));
        }
        Ok(self.driver.rect(element).await?)
    }

    async fn perform(&self, gesture: &'static str, sequence: PointerSequence) -> Result<()> {
        debug!(
            gesture,
            points = ?sequence.points(),
            duration_ms = sequence.total_duration_ms(),
            "perform gesture"
        );
        self.driver.perform(&sequence).await?;
        Ok(())
    }

    /// Taps the element's center.
    pub async fn tap(&self, element: &ElementHandle) -> Result<()> {
        let frame = self.target(element).await?;
        self.perform("tap", press_at(frame.center())).await
    }

    /// Taps a quarter width left or right of the element's center.
    pub async fn tap_offset(&self, element: &ElementHandle, side: Side) -> Result<()> {
        let frame = self.target(element).await?;
        self.perform("tap_offset", press_at(offset_point(&frame, side))).await
    }

    pub async fn double_tap(&self, element: &ElementHandle) -> Result<()> {
        let frame = self.target(element).await?;
        let (x, y) = frame.center();
        let sequence = PointerSequence::finger()
            .move_to(x, y, Duration::ZERO)
            .down()
            .up()
            .pause(self.timing.double_tap_gap)
            .down()
            .up();
        self.perform("double_tap", sequence).await
    }

    pub async fn long_press(&self, element: &ElementHandle) -> Result<()> {
        let frame = self.target(element).await?;
        let (x, y) = frame.center();
        let sequence = PointerSequence::finger()
            .move_to(x, y, Duration::ZERO)
            .down()
            .pause(self.timing.long_press)
            .up();
        self.perform("long_press", sequence).await
    }

    /// Swipes horizontally across the element.
    pub async fn swipe_within_element(
        &self,
        element: &ElementHandle,
        left_to_right: bool,
    ) -> Result<()> {
        let frame = self.target(element).await?;
        let (from, to) = element_swipe_points(&frame, left_to_right);
        self.perform("swipe_within_element", drag(from, to, self.timing.element_swipe)).await
    }

    /// Swipes vertically at mid-screen between two fractions of the height.
    ///
    /// `swipe_screen(0.8, 0.4)` scrolls content up (reveals what is below).
    pub async fn swipe_screen(&self, start_y_fraction: f64, end_y_fraction: f64) -> Result<()> {
        self.ensure_connected()?;
        for fraction in [start_y_fraction, end_y_fraction] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(AutomationError::Gesture(format!(
                    "screen fraction {} is outside 0..=1",
                    fraction
                )));
            }
        }
        let window = self.driver.window_size().await?;
        let (from, to) = screen_swipe_points(&window, start_y_fraction, end_y_fraction);
        self.perform("swipe_screen", drag(from, to, self.timing.screen_swipe)).await
    }

    /// Swipes right across the screen at the element's row, `times` times.
    ///
    /// Failures are logged and skipped; this never returns an error.
    pub async fn repeated_swipe_right(&self, element: &ElementHandle, times: usize) {
        for attempt in 1..=times {
            if let Err(e) = self.swipe_right_once(element).await {
                warn!(%element, attempt, times, error = %e, "swipe right failed");
            }
        }
    }

    async fn swipe_right_once(&self, element: &ElementHandle) -> Result<()> {
        let frame = self.target(element).await?;
        let window = self.driver.window_size().await?;
        let (from, to) = repeated_swipe_points(&window, &frame);
        self.perform("repeated_swipe_right", drag(from, to, self.timing.repeated_swipe)).await
    }

    pub async fn navigate_back(&self) -> Result<()> {
        self.ensure_connected()?;
        self.driver.navigate_back().await?;
        Ok(())
    }

    pub async fn hide_keyboard(&self) -> Result<()> {
        self.ensure_connected()?;
        self.driver.hide_keyboard().await?;
        Ok(())
    }

    /// Pulls down the notification shade (Android).
    pub async fn open_notifications(&self) -> Result<()> {
        self.ensure_connected()?;
        self.driver.open_notifications().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PointerAction;
    use crate::driver::DriverError;
    use crate::locator::Locator;
    use crate::memory::{MemoryDriver, MemoryElement};

    fn setup(frame: ElementFrame) -> (Arc<MemoryDriver>, GestureSynthesizer, ElementHandle) {
        let driver = Arc::new(MemoryDriver::new());
        let handle = driver.add(MemoryElement::new(Locator::id("target"), frame));
        let gestures = GestureSynthesizer::new(driver.clone());
        (driver, gestures, handle)
    }

    #[test]
    fn offset_points() {
        let frame = ElementFrame::new(100, 200, 400, 100);
        assert_eq!(offset_point(&frame, Side::Left), (200, 250));
        assert_eq!(offset_point(&frame, Side::Right), (400, 250));
    }

    #[test]
    fn element_swipe_direction() {
        let frame = ElementFrame::new(50, 1000, 1000, 120);
        let (start, end) = element_swipe_points(&frame, true);
        assert_eq!(start, (150, 1060));
        assert_eq!(end, (950, 1060));
        assert!(start.0 < end.0);

        let (start, end) = element_swipe_points(&frame, false);
        assert!(start.0 > end.0);
        assert_eq!(start, (950, 1060));
    }

    #[test]
    fn element_swipe_moves_for_narrow_elements() {
        for width in 1..=20 {
            let frame = ElementFrame::new(10, 0, width, 40);
            let (start, end) = element_swipe_points(&frame, true);
            assert!(start.0 < end.0, "width {}: {:?} -> {:?}", width, start, end);
            assert!(end.0 <= frame.x + width, "width {}: end {:?} past element", width, end);

            let (start, end) = element_swipe_points(&frame, false);
            assert!(start.0 > end.0, "width {}: {:?} -> {:?}", width, start, end);
        }
    }

    #[test]
    fn screen_and_repeated_points() {
        let window = WindowSize::new(1080, 2400);
        assert_eq!(screen_swipe_points(&window, 0.8, 0.4), ((540, 1920), (540, 960)));

        let row = ElementFrame::new(0, 500, 1080, 200);
        assert_eq!(repeated_swipe_points(&window, &row), ((216, 600), (972, 600)));
    }

    #[tokio::test]
    async fn tap_hits_center() {
        let (driver, gestures, handle) = setup(ElementFrame::new(10, 20, 200, 80));
        gestures.tap(&handle).await.unwrap();

        let performed = driver.performed();
        assert_eq!(performed.len(), 1);
        assert_eq!(performed[0].points(), vec![(110, 60)]);
        assert_eq!(performed[0].actions.len(), 3);
    }

    #[tokio::test]
    async fn long_press_and_double_tap_timing() {
        let (driver, gestures, handle) = setup(ElementFrame::new(0, 0, 100, 100));
        gestures.long_press(&handle).await.unwrap();
        gestures.double_tap(&handle).await.unwrap();

        let performed = driver.performed();
        assert_eq!(performed[0].total_duration_ms(), 5000);
        assert_eq!(performed[1].total_duration_ms(), 100);
        let downs = performed[1]
            .actions
            .iter()
            .filter(|a| matches!(a, PointerAction::PointerDown { .. }))
            .count();
        assert_eq!(downs, 2);
    }

    #[tokio::test]
    async fn swipe_uses_element_offset() {
        let (driver, gestures, handle) = setup(ElementFrame::new(200, 300, 500, 100));
        gestures.swipe_within_element(&handle, false).await.unwrap();

        let seq = &driver.performed()[0];
        assert_eq!(seq.points(), vec![(650, 350), (250, 350)]);
        assert_eq!(seq.total_duration_ms(), 500);
    }

    #[tokio::test]
    async fn custom_timing() {
        let driver = Arc::new(MemoryDriver::new());
        let handle =
            driver.add(MemoryElement::new(Locator::id("t"), ElementFrame::new(0, 0, 10, 10)));
        let timing = GestureTiming {
            long_press: Duration::from_millis(1500),
            ..GestureTiming::default()
        };
        GestureSynthesizer::with_timing(driver.clone(), timing)
            .long_press(&handle)
            .await
            .unwrap();
        assert_eq!(driver.performed()[0].total_duration_ms(), 1500);
    }

    #[tokio::test]
    async fn preconditions_fail_before_any_action() {
        let (driver, gestures, _) = setup(ElementFrame::new(0, 0, 10, 10));
        let err = gestures.tap(&ElementHandle::new("  ")).await.unwrap_err();
        assert!(matches!(err, AutomationError::Gesture(_)));

        driver.set_connected(false);
        let err = gestures.swipe_screen(0.8, 0.4).await.unwrap_err();
        assert!(matches!(err, AutomationError::Gesture(_)));
        assert!(driver.performed().is_empty());
    }

    #[tokio::test]
    async fn screen_fraction_out_of_range() {
        let (driver, gestures, _) = setup(ElementFrame::new(0, 0, 10, 10));
        assert!(gestures.swipe_screen(1.2, 0.4).await.is_err());
        assert!(driver.performed().is_empty());
    }

    #[tokio::test]
    async fn repeated_swipe_swallows_failures() {
        let (driver, gestures, handle) = setup(ElementFrame::new(0, 1000, 1080, 100));
        gestures.repeated_swipe_right(&handle, 3).await;
        assert_eq!(driver.performed().len(), 3);
        assert_eq!(driver.performed()[0].points(), vec![(216, 1050), (972, 1050)]);

        driver.fail_performs(true);
        gestures.repeated_swipe_right(&handle, 2).await;
        assert_eq!(driver.performed().len(), 3);
    }

    #[tokio::test]
    async fn unsupported_notifications_propagate() {
        let driver = Arc::new(MemoryDriver::new().without_notifications());
        let gestures = GestureSynthesizer::new(driver.clone());
        let err = gestures.open_notifications().await.unwrap_err();
        assert!(matches!(err, AutomationError::Driver(DriverError::Unsupported(_))));
        gestures.hide_keyboard().await.unwrap();
        gestures.navigate_back().await.unwrap();
        assert_eq!(driver.keyboard_hides(), 1);
        assert_eq!(driver.back_presses(), 1);
    }
}
