//! Page inspection abstraction
//!
//! The agent never reads the page directly. Everything it knows about the
//! page comes through [`PageInspector`], implemented over CDP by
//! `tacit-browser` and in memory by [`MockPageInspector`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tacit_core::{ObservedAction, PageView, Result, TacitError};

/// Trait for reading the watched page (allows mocking in tests)
#[async_trait]
pub trait PageInspector: Send + Sync {
    /// Whether the container to observe has been mounted
    async fn container_present(&self) -> Result<bool>;

    /// Start observing structural changes under the container
    async fn attach(&self) -> Result<()>;

    /// Number of structural-change notifications since the previous call
    ///
    /// `None` when the observer is no longer installed, as after a reload.
    async fn take_notifications(&self) -> Result<Option<u64>>;

    /// Read the current view and, in a detail view, its context
    async fn inspect(&self) -> Result<PageView>;

    /// Drain user actions observed since the previous call
    async fn take_actions(&self) -> Result<Vec<ObservedAction>>;
}

/// Mock page for testing
///
/// Starts as a mounted, empty list view. [`MockPageInspector::set_view`]
/// changes the view and queues one notification, like a page re-render would.
pub struct MockPageInspector {
    absent_lookups: AtomicUsize,
    failing_attaches: AtomicUsize,
    lookups: AtomicUsize,
    attaches: AtomicUsize,
    inspections: AtomicUsize,
    notifications: AtomicU64,
    broken: AtomicBool,
    detached: AtomicBool,
    view: Mutex<PageView>,
    actions: Mutex<VecDeque<ObservedAction>>,
}

impl Default for MockPageInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageInspector {
    pub fn new() -> Self {
        Self {
            absent_lookups: AtomicUsize::new(0),
            failing_attaches: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            attaches: AtomicUsize::new(0),
            inspections: AtomicUsize::new(0),
            notifications: AtomicU64::new(0),
            broken: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            view: Mutex::new(PageView::NoDetailView),
            actions: Mutex::new(VecDeque::new()),
        }
    }

    /// Report the container missing for the first `lookups` lookups
    pub fn with_container_after(self, lookups: usize) -> Self {
        self.absent_lookups.store(lookups, Ordering::SeqCst);
        self
    }

    /// Fail the first `attaches` observer attachments
    pub fn with_failing_attaches(self, attaches: usize) -> Self {
        self.failing_attaches.store(attaches, Ordering::SeqCst);
        self
    }

    /// Drop the observer, as a reload of the tab would
    ///
    /// Notification polls report the observer gone until the next attach.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    /// Change the view and queue a notification
    pub fn set_view(&self, view: PageView) {
        *self.view.lock().unwrap() = view;
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }

    /// Queue a notification without changing the view (a re-render)
    pub fn rerender(&self) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }

    /// Queue a user action
    pub fn push_action(&self, action: ObservedAction) {
        self.actions.lock().unwrap().push_back(action);
    }

    /// Make every call fail, as if the tab went away
    pub fn break_page(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn inspections(&self) -> usize {
        self.inspections.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(TacitError::Browser("tab closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PageInspector for MockPageInspector {
    async fn container_present(&self) -> Result<bool> {
        self.check()?;
        let lookup = self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(lookup >= self.absent_lookups.load(Ordering::SeqCst))
    }

    async fn attach(&self) -> Result<()> {
        self.check()?;
        self.attaches.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_attaches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_attaches.store(failing - 1, Ordering::SeqCst);
            return Err(TacitError::PageScript("container vanished".to_string()));
        }

        self.detached.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn take_notifications(&self) -> Result<Option<u64>> {
        self.check()?;
        if self.detached.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.notifications.swap(0, Ordering::SeqCst)))
    }

    async fn inspect(&self) -> Result<PageView> {
        self.check()?;
        self.inspections.fetch_add(1, Ordering::SeqCst);
        Ok(self.view.lock().unwrap().clone())
    }

    async fn take_actions(&self) -> Result<Vec<ObservedAction>> {
        self.check()?;
        Ok(self.actions.lock().unwrap().drain(..).collect())
    }
}
