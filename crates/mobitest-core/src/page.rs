//! Page objects and the per-session page cache.
//!
//! A page object bundles the locators and actions of one app screen. Page
//! types implement [`Page`] and are built by factory closures registered in a
//! [`PageRegistry`]. The [`PageCache`] hands out one shared instance per
//! `(session, page type)`, constructing it on first use, and drops every
//! instance of a session in one step when the session ends.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mobitest_core::error::BoxError;
//! use mobitest_core::page::{Page, PageCache, PageContext, PageRegistry};
//!
//! struct LoginPage {
//!     platform: mobitest_core::locator::Platform,
//! }
//!
//! impl Page for LoginPage {
//!     const NAME: &'static str = "LoginPage";
//! }
//!
//! let mut registry = PageRegistry::new();
//! registry.register(|ctx: &PageContext| Ok::<_, BoxError>(LoginPage { platform: ctx.platform() }));
//! let cache = Arc::new(PageCache::new(registry));
//! assert!(cache.registry().contains::<LoginPage>());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::debug;

use crate::config::Settings;
use crate::driver::AutomationDriver;
use crate::error::{AutomationError, BoxError, Result};
use crate::gesture::GestureSynthesizer;
use crate::locator::{LocatorCatalog, LocatorError, Platform};
use crate::session::SessionId;
use crate::test_data::{TestData, TestDataError};
use crate::wait::ElementWaiter;

/// A page object type.
pub trait Page: Send + Sync + 'static {
    /// Page name; also the file stem of its locator catalog.
    const NAME: &'static str;
}

/// What a page factory gets to build a page for one session.
#[derive(Clone)]
pub struct PageContext {
    session_id: SessionId,
    platform: Platform,
    settings: Arc<Settings>,
    driver: Arc<dyn AutomationDriver>,
}

impl PageContext {
    pub fn new(
        session_id: SessionId,
        platform: Platform,
        settings: Arc<Settings>,
        driver: Arc<dyn AutomationDriver>,
    ) -> Self {
        Self {
            session_id,
            platform,
            settings,
            driver,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
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

    /// Loads `<locatorDirectory>/<page>.yaml`, defaulting to the session's
    /// platform.
    pub fn locators(&self, page: &str) -> std::result::Result<LocatorCatalog, LocatorError> {
        LocatorCatalog::load(self.settings.locator_path(page), self.platform)
    }

    /// Loads `<testDataDirectory>/<page>.json`.
    pub fn test_data(&self, page: &str) -> std::result::Result<TestData, TestDataError> {
        TestData::for_page(&self.settings, page)
    }

    pub fn waiter(&self) -> ElementWaiter {
        ElementWaiter::new(self.driver.clone(), self.settings.default_wait())
    }

    pub fn gestures(&self) -> GestureSynthesizer {
        GestureSynthesizer::new(self.driver.clone())
    }
}

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&PageContext) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Page type name → constructor.
#[derive(Default, Clone)]
pub struct PageRegistry {
    factories: HashMap<&'static str, Factory>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor for `P`, replacing any previous one.
    pub fn register<P, F, E>(&mut self, factory: F) -> &mut Self
    where
        P: Page,
        F: Fn(&PageContext) -> std::result::Result<P, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let factory: Factory = Arc::new(move |ctx: &PageContext| {
            factory(ctx)
                .map(|page| Arc::new(page) as Instance)
                .map_err(Into::into)
        });
        self.factories.insert(P::NAME, factory);
        self
    }

    pub fn contains<P: Page>(&self) -> bool {
        self.factories.contains_key(P::NAME)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn factory(&self, name: &str) -> Option<Factory> {
        self.factories.get(name).cloned()
    }
}

/// Holds one page once built. Locked for the whole fetch-or-create of its
/// `(session, page type)` so the factory runs at most once per key.
type PageCell = Arc<Mutex<Option<Instance>>>;

fn is_built(cell: &PageCell) -> bool {
    match cell.try_lock() {
        Ok(page) => page.is_some(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
        Err(TryLockError::WouldBlock) => false,
    }
}

struct SessionPages {
    context: PageContext,
    pages: HashMap<&'static str, PageCell>,
}

/// One page instance per `(session, page type)`.
///
/// A session must be [`open`](Self::open)ed before pages can be fetched for
/// it. The session table sits behind one mutex that is held only to find or
/// insert a page's cell; construction runs under that cell's own lock, so
/// concurrent fetches of the same page wait for a single build while other
/// pages and sessions proceed.
pub struct PageCache {
    registry: PageRegistry,
    sessions: Mutex<HashMap<SessionId, SessionPages>>,
}

impl PageCache {
    pub fn new(registry: PageRegistry) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionPages>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts caching pages for the context's session. Re-opening an open
    /// session keeps its pages.
    pub fn open(&self, context: PageContext) {
        let id = context.session_id();
        self.lock().entry(id).or_insert_with(|| {
            debug!(session = %id, "page cache opened");
            SessionPages {
                context,
                pages: HashMap::new(),
            }
        });
    }

    pub fn is_open(&self, session: &SessionId) -> bool {
        self.lock().contains_key(session)
    }

    /// Number of sessions with a live slot.
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of pages built for `session`.
    pub fn page_count(&self, session: &SessionId) -> usize {
        self.lock()
            .get(session)
            .map_or(0, |s| s.pages.values().filter(|cell| is_built(cell)).count())
    }

    /// Returns the session's instance of `P`, building it on first use.
    ///
    /// Fails with [`AutomationError::NoActiveSession`] if the session was
    /// never opened or has been evicted, and with
    /// [`AutomationError::PageConstruction`] if `P` is unregistered or its
    /// factory fails. A failed build leaves nothing cached, so the next call
    /// tries again.
    ///
    /// Factories must not fetch pages of the same type from inside
    /// themselves.
    pub fn get<P: Page>(&self, session: &SessionId) -> Result<Arc<P>> {
        let (cell, context) = {
            let mut sessions = self.lock();
            let slot = sessions
                .get_mut(session)
                .ok_or(AutomationError::NoActiveSession)?;
            let cell = slot.pages.entry(P::NAME).or_default().clone();
            (cell, slot.context.clone())
        };

        let mut page = cell.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = page.as_ref() {
            return downcast::<P>(instance.clone());
        }

        let factory =
            self.registry
                .factory(P::NAME)
                .ok_or_else(|| AutomationError::PageConstruction {
                    page: P::NAME,
                    source: "page type is not registered".into(),
                })?;
        debug!(session = %session, page = P::NAME, "constructing page");
        let built = factory(&context).map_err(|source| AutomationError::PageConstruction {
            page: P::NAME,
            source,
        })?;
        *page = Some(built.clone());
        drop(page);
        downcast::<P>(built)
    }

    /// Drops every page of `session` and closes its slot. Returns how many
    /// pages were dropped.
    pub fn evict(&self, session: &SessionId) -> usize {
        let removed = self.lock().remove(session);
        let count = removed
            .as_ref()
            .map_or(0, |s| s.pages.values().filter(|cell| is_built(cell)).count());
        if removed.is_some() {
            debug!(session = %session, pages = count, "page cache evicted");
        }
        count
    }
}

fn downcast<P: Page>(instance: Instance) -> Result<Arc<P>> {
    instance.downcast::<P>().map_err(|_| AutomationError::PageConstruction {
        page: P::NAME,
        source: "cached instance has a different type".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDriver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct HomePage {
        built_for: SessionId,
    }

    impl Page for HomePage {
        const NAME: &'static str = "HomePage";
    }

    #[derive(Debug)]
    struct BrokenPage;

    impl Page for BrokenPage {
        const NAME: &'static str = "BrokenPage";
    }

    #[derive(Debug)]
    struct UnregisteredPage;

    impl Page for UnregisteredPage {
        const NAME: &'static str = "UnregisteredPage";
    }

    fn context(id: SessionId) -> PageContext {
        PageContext::new(
            id,
            Platform::Android,
            Arc::new(Settings::default()),
            Arc::new(MemoryDriver::new()),
        )
    }

    fn cache(builds: Arc<AtomicUsize>) -> PageCache {
        let mut registry = PageRegistry::new();
        registry
            .register(move |ctx: &PageContext| {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(HomePage {
                    built_for: ctx.session_id(),
                })
            })
            .register(|_: &PageContext| Err::<BrokenPage, _>("catalog missing"));
        PageCache::new(registry)
    }

    #[test]
    fn same_instance_within_session() {
        let builds = Arc::new(AtomicUsize::new(0));
        let cache = cache(builds.clone());
        let id = SessionId::new();
        cache.open(context(id));

        let a = cache.get::<HomePage>(&id).unwrap();
        let b = cache.get::<HomePage>(&id).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.built_for, id);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.page_count(&id), 1);
    }

    #[test]
    fn concurrent_fetches_build_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let mut registry = PageRegistry::new();
        let counter = builds.clone();
        registry.register(move |ctx: &PageContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok::<_, BoxError>(HomePage {
                built_for: ctx.session_id(),
            })
        });
        let cache = PageCache::new(registry);
        let id = SessionId::new();
        cache.open(context(id));

        let pages: Vec<Arc<HomePage>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get::<HomePage>(&id).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(pages.iter().all(|page| Arc::ptr_eq(page, &pages[0])));
        assert_eq!(cache.page_count(&id), 1);
    }

    #[test]
    fn failed_build_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut registry = PageRegistry::new();
        let counter = attempts.clone();
        registry.register(move |ctx: &PageContext| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err::<HomePage, BoxError>("device busy".into());
            }
            Ok(HomePage {
                built_for: ctx.session_id(),
            })
        });
        let cache = PageCache::new(registry);
        let id = SessionId::new();
        cache.open(context(id));

        assert!(cache.get::<HomePage>(&id).is_err());
        assert_eq!(cache.page_count(&id), 0);
        assert!(cache.get::<HomePage>(&id).is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn distinct_across_sessions() {
        let cache = cache(Arc::new(AtomicUsize::new(0)));
        let (s1, s2) = (SessionId::new(), SessionId::new());
        cache.open(context(s1));
        cache.open(context(s2));

        let a = cache.get::<HomePage>(&s1).unwrap();
        let b = cache.get::<HomePage>(&s2).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.session_count(), 2);
    }

    #[test]
    fn evict_drops_everything() {
        let builds = Arc::new(AtomicUsize::new(0));
        let cache = cache(builds.clone());
        let id = SessionId::new();
        cache.open(context(id));
        let before = cache.get::<HomePage>(&id).unwrap();

        assert_eq!(cache.evict(&id), 1);
        assert!(!cache.is_open(&id));
        assert!(matches!(cache.get::<HomePage>(&id), Err(AutomationError::NoActiveSession)));
        assert_eq!(cache.evict(&id), 0);

        cache.open(context(id));
        let after = cache.get::<HomePage>(&id).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn never_opened_session() {
        let cache = cache(Arc::new(AtomicUsize::new(0)));
        assert!(matches!(
            cache.get::<HomePage>(&SessionId::new()),
            Err(AutomationError::NoActiveSession)
        ));
    }

    #[test]
    fn construction_failures() {
        let cache = cache(Arc::new(AtomicUsize::new(0)));
        let id = SessionId::new();
        cache.open(context(id));

        let err = cache.get::<BrokenPage>(&id).unwrap_err();
        assert!(matches!(err, AutomationError::PageConstruction { page: "BrokenPage", .. }));
        assert!(err.to_string().contains("catalog missing"));

        let err = cache.get::<UnregisteredPage>(&id).unwrap_err();
        assert!(err.to_string().contains("not registered"));
        assert_eq!(cache.page_count(&id), 0);
    }
}
