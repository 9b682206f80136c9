//! Pure state machine deciding when the viewed context changed
//!
//! No async, no I/O. The agent feeds it one [`PageView`] per structural-change
//! notification and acts on the returned [`Change`].
//!
//! - Same subject as last time: nothing happens, re-renders never refetch
//! - Incomplete detail render: nothing happens, the next notification retries
//! - Leaving the detail view: exactly one `LeaveContext` per departure

use tacit_core::{Context, PageView};

/// What the detector last processed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewState {
    /// List view, or nothing processed yet
    #[default]
    NoContext,
    /// A detail view whose context was emitted downstream
    InContext(Context),
}

impl ViewState {
    pub fn context(&self) -> Option<&Context> {
        match self {
            Self::NoContext => None,
            Self::InContext(context) => Some(context),
        }
    }
}

/// Outcome of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A new context appeared; fetch a prediction for it
    EnterContext(Context),
    /// The view left the detail state; hide the overlay
    LeaveContext,
    /// Nothing relevant changed
    Unchanged,
}

/// Pure transition function
///
/// Takes the last processed state and the current page view, returns the new
/// state and the change to act on.
pub fn transition(state: ViewState, view: PageView) -> (ViewState, Change) {
    match (state, view) {
        (ViewState::InContext(last), PageView::Detail(context)) if last.same_message(&context) => {
            (ViewState::InContext(last), Change::Unchanged)
        }
        (_, PageView::Detail(context)) => (
            ViewState::InContext(context.clone()),
            Change::EnterContext(context),
        ),
        (state, PageView::Incomplete) => (state, Change::Unchanged),
        (ViewState::InContext(_), PageView::NoDetailView) => {
            (ViewState::NoContext, Change::LeaveContext)
        }
        (ViewState::NoContext, PageView::NoDetailView) => (ViewState::NoContext, Change::Unchanged),
    }
}

/// Change detector holding the last processed context
#[derive(Debug, Default)]
pub struct ChangeDetector {
    state: ViewState,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one notification's view
    pub fn observe(&mut self, view: PageView) -> Change {
        let (state, change) = transition(std::mem::take(&mut self.state), view);
        self.state = state;
        change
    }

    /// The last processed context, if the view is in a detail state
    pub fn last_processed(&self) -> Option<&Context> {
        self.state.context()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Forget the last processed context
    pub fn reset(&mut self) {
        self.state = ViewState::NoContext;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(subject: &str, sender: &str) -> PageView {
        PageView::Detail(Context::new(subject, sender))
    }

    #[test]
    fn test_first_detail_view_enters_context() {
        let mut detector = ChangeDetector::new();
        let change = detector.observe(detail("Invoice #42", "billing@co.example"));

        assert_eq!(
            change,
            Change::EnterContext(Context::new("Invoice #42", "billing@co.example"))
        );
        assert_eq!(detector.last_processed().unwrap().subject, "Invoice #42");
    }

    #[test]
    fn test_rerender_of_same_subject_is_unchanged() {
        let mut detector = ChangeDetector::new();
        detector.observe(detail("Invoice #42", "billing@co.example"));

        for _ in 0..5 {
            assert_eq!(
                detector.observe(detail("Invoice #42", "billing@co.example")),
                Change::Unchanged
            );
        }
    }

    #[test]
    fn test_subject_only_equality() {
        let mut detector = ChangeDetector::new();
        detector.observe(detail("Lunch?", "alice@co.example"));

        // A different sender with the same subject counts as the same context
        let change = detector.observe(detail("Lunch?", "bob@co.example"));
        assert_eq!(change, Change::Unchanged);
        assert_eq!(detector.last_processed().unwrap().sender, "alice@co.example");
    }

    #[test]
    fn test_switching_messages_enters_new_context() {
        let mut detector = ChangeDetector::new();
        detector.observe(detail("A", "a@co.example"));

        let change = detector.observe(detail("B", "b@co.example"));
        assert_eq!(change, Change::EnterContext(Context::new("B", "b@co.example")));
    }

    #[test]
    fn test_incomplete_render_keeps_state() {
        let mut detector = ChangeDetector::new();
        assert_eq!(detector.observe(PageView::Incomplete), Change::Unchanged);
        assert_eq!(detector.state(), &ViewState::NoContext);

        detector.observe(detail("A", "a@co.example"));
        assert_eq!(detector.observe(PageView::Incomplete), Change::Unchanged);
        assert_eq!(detector.last_processed().unwrap().subject, "A");
    }

    #[test]
    fn test_leave_context_fires_once_per_departure() {
        let mut detector = ChangeDetector::new();
        detector.observe(detail("A", "a@co.example"));

        assert_eq!(detector.observe(PageView::NoDetailView), Change::LeaveContext);
        assert_eq!(detector.observe(PageView::NoDetailView), Change::Unchanged);
        assert_eq!(detector.observe(PageView::NoDetailView), Change::Unchanged);
        assert!(detector.last_processed().is_none());
    }

    #[test]
    fn test_list_view_without_prior_context_is_unchanged() {
        let (state, change) = transition(ViewState::NoContext, PageView::NoDetailView);
        assert_eq!(state, ViewState::NoContext);
        assert_eq!(change, Change::Unchanged);
    }

    #[test]
    fn test_leave_and_return_is_new_detection() {
        let mut detector = ChangeDetector::new();
        detector.observe(detail("A", "a@co.example"));
        detector.observe(PageView::NoDetailView);

        let change = detector.observe(detail("A", "a@co.example"));
        assert_eq!(change, Change::EnterContext(Context::new("A", "a@co.example")));
    }

    #[test]
    fn test_reset_refetches_same_subject() {
        let mut detector = ChangeDetector::new();
        detector.observe(detail("A", "a@co.example"));
        detector.reset();

        assert!(detector.last_processed().is_none());
        let change = detector.observe(detail("A", "a@co.example"));
        assert_eq!(change, Change::EnterContext(Context::new("A", "a@co.example")));
    }
}
