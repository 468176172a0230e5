//! Shared test helpers for mobitest-core integration tests.
//!
//! Provides settings pointing at `tests/fixtures`, two sample page objects
//! built from those fixtures, and a scripted login screen on a
//! [`MemoryDriver`].

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use mobitest_core::config::Settings;
use mobitest_core::element::{ElementFrame, ElementHandle};
use mobitest_core::error::{BoxError, Result};
use mobitest_core::executor::ActionExecutor;
use mobitest_core::locator::{Locator, LocatorCatalog, LocatorError, Platform};
use mobitest_core::memory::{Appearance, MemoryDriver, MemoryElement};
use mobitest_core::page::{Page, PageCache, PageContext, PageRegistry};
use mobitest_core::session::Session;
use mobitest_core::test_data::TestData;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Settings whose catalog and test-data directories are the fixtures.
pub fn fixture_settings(platform: Platform) -> Arc<Settings> {
    Arc::new(Settings {
        platform,
        locator_directory: fixtures_dir().join("locators"),
        test_data_directory: fixtures_dir().join("testData"),
        idle_timeout: 100,
        ..Settings::default()
    })
}

// ---------------------------------------------------------------------------
// Page objects
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LoginPage {
    catalog: LocatorCatalog,
    data: TestData,
    platform: Platform,
}

impl Page for LoginPage {
    const NAME: &'static str = "LoginPage";
}

impl LoginPage {
    pub fn build(ctx: &PageContext) -> std::result::Result<Self, BoxError> {
        Ok(Self {
            catalog: ctx.locators(Self::NAME)?,
            data: ctx.test_data("LoginData")?,
            platform: ctx.platform(),
        })
    }

    pub fn locator(&self, name: &str) -> std::result::Result<Locator, LocatorError> {
        self.catalog.resolve(name, self.platform)
    }

    /// Types the mobile number, taps login, then enters the PIN.
    pub async fn login(&self, actions: &ActionExecutor) -> Result<()> {
        let user = self.data.group("userData")?;
        let mobile = self.data.field("userData", "mobileNumber")?;
        actions.send_values(&self.locator("mobileField")?, mobile).await?;
        actions.tap_on(&self.locator("loginButton")?).await?;

        let pin = self.catalog.resolve_with("pinField", self.platform, &["1"])?;
        actions.send_values(&pin, &user["pin"]).await?;
        Ok(())
    }

    pub async fn welcome_shown(&self, actions: &ActionExecutor, client: &str) -> Result<bool> {
        let banner = self.catalog.resolve_with("welcomeBanner", self.platform, &[client])?;
        Ok(actions.is_present(&banner).await)
    }
}

#[derive(Debug)]
pub struct WatchlistPage {
    catalog: LocatorCatalog,
}

impl Page for WatchlistPage {
    const NAME: &'static str = "WatchlistPage";
}

impl WatchlistPage {
    pub fn build(ctx: &PageContext) -> std::result::Result<Self, BoxError> {
        Ok(Self {
            catalog: ctx.locators(Self::NAME)?,
        })
    }

    pub fn stock_row(
        &self,
        symbol: &str,
        exchange: &str,
    ) -> std::result::Result<Locator, LocatorError> {
        self.catalog.resolve_default_with("stockRow", &[symbol, exchange])
    }
}

/// A registry with [`LoginPage`] and [`WatchlistPage`].
pub fn registry() -> PageRegistry {
    let mut registry = PageRegistry::new();
    registry.register(LoginPage::build).register(WatchlistPage::build);
    registry
}

pub fn page_cache() -> Arc<PageCache> {
    Arc::new(PageCache::new(registry()))
}

// ---------------------------------------------------------------------------
// Scripted screens
// ---------------------------------------------------------------------------

pub struct LoginScreen {
    pub mobile: ElementHandle,
    pub login: ElementHandle,
    pub pin: ElementHandle,
    pub banner: ElementHandle,
}

/// Android login screen; the PIN field and welcome banner appear a little
/// after the login button is shown.
pub fn android_login_screen(driver: &MemoryDriver) -> LoginScreen {
    let row = |y| ElementFrame::new(40, y, 1000, 140);
    LoginScreen {
        mobile: driver.add(MemoryElement::new(Locator::id("et_mobile"), row(600))),
        login: driver.add(MemoryElement::new(Locator::id("btn_login"), row(800))),
        pin: driver.add(
            MemoryElement::new(Locator::xpath("//android.widget.EditText[@index='1']"), row(600))
                .appears(Appearance::After(std::time::Duration::from_secs(2))),
        ),
        banner: driver.add(
            MemoryElement::new(
                Locator::xpath("//*[contains(@content-desc,'Welcome XS0215')]"),
                row(200),
            )
            .attribute("content-desc", "Welcome XS0215")
            .appears(Appearance::After(std::time::Duration::from_secs(3))),
        ),
    }
}

/// A session on a fresh [`MemoryDriver`] using the fixture settings.
pub fn memory_session(platform: Platform, pages: Arc<PageCache>) -> (Arc<MemoryDriver>, Session) {
    let driver = Arc::new(MemoryDriver::new());
    let session =
        Session::with_platform(driver.clone(), fixture_settings(platform), platform, pages);
    (driver, session)
}
