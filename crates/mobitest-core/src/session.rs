//! Per-session automation context.
//!
//! A [`Session`] owns one driver connection and the session's slot in the
//! shared [`PageCache`]. Everything that acts on the device (waits, gestures,
//! page objects, composite actions) is reached through it, so each test task
//! passes its session explicitly instead of looking up a global driver.
//!
//! # Lifecycle
//!
//! - [`Session::new`] opens the session's page-cache slot
//! - [`Session::end`] evicts the session's pages and quits the driver, once
//! - dropping a session that was never ended still evicts its pages
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitest_core::config::Settings;
//! use mobitest_core::memory::MemoryDriver;
//! use mobitest_core::page::{PageCache, PageRegistry};
//! use mobitest_core::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> mobitest_core::error::Result<()> {
//!     let pages = Arc::new(PageCache::new(PageRegistry::new()));
//!     let session = Session::new(Arc::new(MemoryDriver::new()), Arc::new(Settings::default()), pages);
//!
//!     session.gestures().navigate_back().await?;
//!     session.end().await
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Settings;
use crate::driver::AutomationDriver;
use crate::error::Result;
use crate::executor::ActionExecutor;
use crate::gesture::GestureSynthesizer;
use crate::locator::Platform;
use crate::page::{Page, PageCache, PageContext};
use crate::wait::ElementWaiter;

/// Identity of one automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One live automation session.
pub struct Session {
    /// The unique identifier for this session.
    pub id: SessionId,

    /// When this session was created.
    pub created_at: DateTime<Utc>,

    platform: Platform,
    settings: Arc<Settings>,
    driver: Arc<dyn AutomationDriver>,
    pages: Arc<PageCache>,
    ended: AtomicBool,
}

impl Session {
    /// Creates a session on the settings' default platform and opens its
    /// page-cache slot.
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        settings: Arc<Settings>,
        pages: Arc<PageCache>,
    ) -> Self {
        let platform = settings.platform;
        Self::with_platform(driver, settings, platform, pages)
    }

    /// Like [`new`](Self::new) with an explicit platform.
    pub fn with_platform(
        driver: Arc<dyn AutomationDriver>,
        settings: Arc<Settings>,
        platform: Platform,
        pages: Arc<PageCache>,
    ) -> Self {
        let session = Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            platform,
            settings,
            driver,
            pages,
            ended: AtomicBool::new(false),
        };
        session.pages.open(session.context());
        info!(
            session = %session.id,
            remote = session.driver.session_id(),
            platform = %platform,
            "session started"
        );
        session
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    /// Context handed to page factories.
    pub fn context(&self) -> PageContext {
        PageContext::new(self.id, self.platform, self.settings.clone(), self.driver.clone())
    }

    /// Waiter using the settings' default timeout.
    pub fn waiter(&self) -> ElementWaiter {
        ElementWaiter::new(self.driver.clone(), self.settings.default_wait())
    }

    pub fn gestures(&self) -> GestureSynthesizer {
        GestureSynthesizer::new(self.driver.clone())
    }

    pub fn actions(&self) -> ActionExecutor {
        ActionExecutor::new(self.driver.clone(), self.settings.default_wait())
    }

    /// This session's instance of page `P`.
    pub fn page<P: Page>(&self) -> Result<Arc<P>> {
        self.pages.get::<P>(&self.id)
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Evicts this session's pages and quits the driver.
    ///
    /// Only the first call does anything; later calls return `Ok(())`.
    pub async fn end(&self) -> Result<()> {
        if self.ended.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let evicted = self.pages.evict(&self.id);
        info!(session = %self.id, pages = evicted, "session ended");
        self.driver.quit().await?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            let evicted = self.pages.evict(&self.id);
            debug!(session = %self.id, pages = evicted, "session dropped without end");
        }
    }
}
