//! # mobitest-core
//!
//! Core library for cross-platform (Android / iOS) mobile UI test automation.
//!
//! This crate turns a symbolic element name plus a target platform into a
//! concrete on-screen action: it resolves locators from per-page catalogs,
//! waits for elements to become actionable, synthesizes touch gestures from
//! element bounds, and caches page objects per session.
//!
//! ## Modules
//!
//! - [`locator`] - Platform-keyed locator catalogs and locator resolution
//! - [`wait`] - Polling waits for visibility, clickability and value changes
//! - [`gesture`] - Tap, swipe, long-press and double-tap synthesis
//! - [`action`] - W3C pointer-action sequences sent to the driver
//! - [`page`] - Page objects, the page factory registry and the per-session page cache
//! - [`session`] - Per-session context owning the driver handle
//! - [`executor`] - Page-level composite actions
//! - [`content`] - Price / boolean / line extraction from element text
//! - [`driver`] - The [`AutomationDriver`](driver::AutomationDriver) trait the core consumes
//! - [`memory`] - Scripted in-memory driver for tests and dry runs
//! - [`config`] - Settings loading with environment overrides
//! - [`test_data`] - Per-page JSON test data
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitest_core::config::Settings;
//! use mobitest_core::locator::LocatorCatalog;
//! use mobitest_core::memory::MemoryDriver;
//! use mobitest_core::page::{PageCache, PageRegistry};
//! use mobitest_core::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> mobitest_core::error::Result<()> {
//!     let settings = Arc::new(Settings::load("config.properties")?);
//!     let catalog = LocatorCatalog::for_page(&settings, "LoginPage")?;
//!
//!     let pages = Arc::new(PageCache::new(PageRegistry::new()));
//!     let session = Session::new(Arc::new(MemoryDriver::new()), settings, pages);
//!
//!     let login = catalog.resolve("loginButton", session.platform())?;
//!     session.actions().tap_on(&login).await?;
//!     session.end().await
//! }
//! ```

pub mod action;
pub mod config;
pub mod content;
pub mod driver;
pub mod element;
pub mod error;
pub mod executor;
pub mod gesture;
pub mod locator;
pub mod memory;
pub mod page;
pub mod session;
pub mod test_data;
pub mod wait;
