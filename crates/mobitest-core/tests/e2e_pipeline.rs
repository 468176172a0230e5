//! End-to-end tests for mobitest-core.
//!
//! These tests exercise the full path:
//!   settings -> locator catalog -> page cache -> session -> waits / gestures -> driver
//!
//! Catalogs and test data come from `tests/fixtures`; the device is a
//! scripted [`MemoryDriver`](mobitest_core::memory::MemoryDriver).

mod common;

use std::sync::Arc;

use common::{
    android_login_screen, fixture_settings, memory_session, page_cache, LoginPage, WatchlistPage,
};
use mobitest_core::error::AutomationError;
use mobitest_core::locator::{Locator, LocatorCatalog, LocatorError, LocatorKind, Platform};

// =============================================================================
// 1. Locator resolution
// =============================================================================

#[test]
fn test_login_button_resolves_for_android_only() {
    let catalog = LocatorCatalog::from_yaml_str(
        "LoginPage",
        "elements:\n  loginButton:\n    android:\n      type: id\n      value: btn_login\n",
        Platform::Android,
    )
    .unwrap();

    let locator = catalog.resolve_default("loginButton").unwrap();
    assert_eq!(locator.kind, LocatorKind::Id);
    assert_eq!(locator.selector, "btn_login");

    let err = catalog.resolve("loginButton", Platform::Ios).unwrap_err();
    assert!(matches!(err, LocatorError::PlatformMissing { platform: Platform::Ios, .. }));
    let message = err.to_string();
    assert!(message.contains("loginButton"), "got: {}", message);
    assert!(message.contains("ios"), "got: {}", message);
}

#[test]
fn test_fixture_catalog_substitutions() {
    let settings = fixture_settings(Platform::Android);
    let catalog = LocatorCatalog::for_page(&settings, "LoginPage").unwrap();
    assert_eq!(catalog.page(), "LoginPage");

    let pin = catalog.resolve_with("pinField", Platform::Android, &["2"]).unwrap();
    assert_eq!(pin, Locator::xpath("//android.widget.EditText[@index='2']"));

    let banner = catalog.resolve_with("welcomeBanner", Platform::Ios, &["XS0215"]).unwrap();
    assert_eq!(banner, Locator::accessibility_id("Welcome XS0215"));

    let err = catalog.resolve("pinField", Platform::Android).unwrap_err();
    assert!(matches!(err, LocatorError::Configuration(_)));

    assert!(matches!(
        catalog.resolve("logoutButton", Platform::Android),
        Err(LocatorError::NotFound { .. })
    ));
}

// =============================================================================
// 2. Full login flow through the session
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_login_flow_on_android() {
    let pages = page_cache();
    let (driver, session) = memory_session(Platform::Android, pages.clone());
    let screen = android_login_screen(&driver);

    let login = session.page::<LoginPage>().unwrap();
    let actions = session.actions();
    login.login(&actions).await.unwrap();

    assert_eq!(
        driver.clicks(),
        vec![screen.mobile.clone(), screen.login.clone(), screen.pin.clone()]
    );
    let typed: Vec<String> = driver.typed().into_iter().map(|(_, text)| text).collect();
    assert_eq!(typed, vec!["9999999999", "1234"]);

    assert!(login.welcome_shown(&actions, "XS0215").await.unwrap());

    session.end().await.unwrap();
    assert_eq!(driver.quits(), 1);
    assert!(!pages.is_open(&session.id));
}

#[tokio::test(start_paused = true)]
async fn test_login_flow_times_out_without_pin_field() {
    let (driver, session) = memory_session(Platform::Android, page_cache());
    driver.add(mobitest_core::memory::MemoryElement::new(
        Locator::id("et_mobile"),
        mobitest_core::element::ElementFrame::new(0, 0, 100, 100),
    ));
    driver.add(mobitest_core::memory::MemoryElement::new(
        Locator::id("btn_login"),
        mobitest_core::element::ElementFrame::new(0, 200, 100, 100),
    ));

    let login = session.page::<LoginPage>().unwrap();
    let err = login.login(&session.actions()).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("@index='1'"), "got: {}", err);
}

#[tokio::test]
async fn test_ios_page_rejects_android_only_locator() {
    let (_driver, session) = memory_session(Platform::Ios, page_cache());
    let login = session.page::<LoginPage>().unwrap();

    assert_eq!(login.locator("mobileField").unwrap(), Locator::accessibility_id("Mobile Number"));
    let err = login.locator("loginButton").unwrap_err();
    assert!(matches!(err, LocatorError::PlatformMissing { .. }));

    let err: AutomationError = err.into();
    assert!(err.to_string().contains("loginButton"));
}

// =============================================================================
// 3. Page objects on top of the cache
// =============================================================================

#[tokio::test]
async fn test_watchlist_row_locator() {
    let (_driver, session) = memory_session(Platform::Android, page_cache());
    let watchlist = session.page::<WatchlistPage>().unwrap();
    let row = watchlist.stock_row("RELIANCE", "NSE").unwrap();
    assert_eq!(
        row.selector,
        "//*[contains(@content-desc,'RELIANCE') and contains(@content-desc,'NSE')]"
    );
    assert!(Arc::ptr_eq(&watchlist, &session.page::<WatchlistPage>().unwrap()));
}
