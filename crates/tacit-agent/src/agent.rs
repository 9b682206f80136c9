//! The agent's event loop
//!
//! One task owns the detector, the prediction generations and the presenter.
//! Everything else (container search, page polling, HTTP requests) runs in
//! background tasks that report back through a single event queue, so every
//! state change happens inside one `handle` call and never interleaves with
//! another.

use crate::capture::CaptureForwarder;
use crate::client::SuggestionService;
use crate::detector::{Change, ChangeDetector};
use crate::feedback::FeedbackReporter;
use crate::inspector::PageInspector;
use crate::prediction::{resolve, PredictionClient, PredictionOutcome, PredictionTicket};
use crate::presenter::{Click, ClickTarget, OverlaySurface, SuggestionPresenter};
use crate::watcher::{spawn_page_poller, ContainerSearch};
use std::sync::Arc;
use tacit_core::fail_open::fail_open;
use tacit_core::{Binding, Context, ObservedAction, Timing};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lifecycle phase of the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    /// Constructed, not started
    Uninitialized,
    /// Looking for the container on a fixed delay
    WaitingForContainer,
    /// Observing the container
    Attached,
}

/// Everything the event loop reacts to
#[derive(Debug)]
pub enum AgentEvent {
    /// The container search found the container
    ContainerFound,
    /// The page observer disappeared, as after a reload
    ContainerLost,
    /// The page's content tree changed
    PageChanged,
    /// A prediction request finished
    PredictionResolved {
        ticket: PredictionTicket,
        outcome: PredictionOutcome,
    },
    /// The user pressed accept or reject
    Click(Click),
    /// The user acted on a message directly in the page
    UserAction(ObservedAction),
    /// Stop the loop
    Shutdown,
}

/// Page-embedded suggestion agent
pub struct TacitAgent {
    timing: Timing,
    inspector: Arc<dyn PageInspector>,
    detector: ChangeDetector,
    predictor: PredictionClient,
    presenter: SuggestionPresenter,
    reporter: FeedbackReporter,
    capture: CaptureForwarder,
    phase: AgentPhase,
    page_polling: bool,
    events_tx: UnboundedSender<AgentEvent>,
    events_rx: UnboundedReceiver<AgentEvent>,
    search: Option<ContainerSearch>,
    poller: Option<JoinHandle<()>>,
}

impl TacitAgent {
    pub fn new(
        timing: Timing,
        inspector: Arc<dyn PageInspector>,
        overlay: Arc<dyn OverlaySurface>,
        service: Arc<dyn SuggestionService>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            timing,
            inspector,
            detector: ChangeDetector::new(),
            predictor: PredictionClient::new(Arc::clone(&service)),
            presenter: SuggestionPresenter::new(overlay),
            reporter: FeedbackReporter::new(Arc::clone(&service)),
            capture: CaptureForwarder::new(service),
            phase: AgentPhase::Uninitialized,
            page_polling: true,
            events_tx,
            events_rx,
            search: None,
            poller: None,
        }
    }

    /// Disable the background page poller
    ///
    /// Notifications and clicks must then be fed through [`TacitAgent::handle`].
    pub fn without_page_polling(mut self) -> Self {
        self.page_polling = false;
        self
    }

    /// Sender for injecting events (shutdown, notifications from other sources)
    pub fn events(&self) -> UnboundedSender<AgentEvent> {
        self.events_tx.clone()
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Context the detector last emitted
    pub fn current_context(&self) -> Option<&Context> {
        self.detector.last_processed()
    }

    /// Binding currently on screen
    pub fn binding(&self) -> Option<&Binding> {
        self.presenter.binding()
    }

    pub fn presenter(&self) -> &SuggestionPresenter {
        &self.presenter
    }

    /// Begin looking for the container
    pub fn start(&mut self) {
        if self.phase != AgentPhase::Uninitialized {
            return;
        }
        info!("Agent starting, waiting for container");
        self.begin_search();
    }

    /// Run until shutdown
    pub async fn run(mut self) {
        self.start();

        while let Some(event) = self.next_event().await {
            if matches!(event, AgentEvent::Shutdown) {
                break;
            }
            self.handle(event).await;
        }

        self.stop();
        info!("Agent stopped");
    }

    /// Wait for the next queued event
    pub async fn next_event(&mut self) -> Option<AgentEvent> {
        self.events_rx.recv().await
    }

    /// Handle one event to completion
    pub async fn handle(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::ContainerFound => self.on_container_found().await,
            AgentEvent::ContainerLost => self.on_container_lost().await,
            AgentEvent::PageChanged => self.on_page_changed().await,
            AgentEvent::PredictionResolved { ticket, outcome } => {
                self.on_prediction(ticket, outcome).await
            }
            AgentEvent::Click(click) => self.on_click(click).await,
            AgentEvent::UserAction(observed) => {
                self.capture.forward(observed);
            }
            AgentEvent::Shutdown => self.stop(),
        }
    }

    /// Cancel background pollers
    pub fn stop(&mut self) {
        if let Some(search) = self.search.take() {
            search.cancel();
        }
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    fn begin_search(&mut self) {
        self.phase = AgentPhase::WaitingForContainer;
        self.search = Some(ContainerSearch::spawn(
            Arc::clone(&self.inspector),
            self.timing.container_retry(),
            self.events_tx.clone(),
        ));
    }

    async fn on_container_found(&mut self) {
        if self.phase != AgentPhase::WaitingForContainer {
            debug!("Ignoring container notice in phase {:?}", self.phase);
            return;
        }
        self.search = None;

        let inspector = Arc::clone(&self.inspector);
        if fail_open("observer_attach", || inspector.attach()).await.is_none() {
            self.begin_search();
            return;
        }

        self.phase = AgentPhase::Attached;
        info!("Observer attached");

        if self.page_polling {
            self.poller = Some(spawn_page_poller(
                Arc::clone(&self.inspector),
                self.presenter.surface(),
                self.timing.poll_interval(),
                self.events_tx.clone(),
            ));
        }
    }

    async fn on_container_lost(&mut self) {
        if self.phase != AgentPhase::Attached {
            debug!("Ignoring container loss in phase {:?}", self.phase);
            return;
        }
        info!("Container lost, searching again");

        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.detector.reset();
        self.presenter.hide().await;
        self.begin_search();
    }

    async fn on_page_changed(&mut self) {
        if self.phase != AgentPhase::Attached {
            return;
        }

        let inspector = Arc::clone(&self.inspector);
        let Some(view) = fail_open("page_inspect", || inspector.inspect()).await else {
            return;
        };

        match self.detector.observe(view) {
            Change::EnterContext(context) => {
                info!("New context: {}", context);
                if self.presenter.is_visible() {
                    // The suggestion on screen belongs to the previous message
                    self.presenter.hide().await;
                }
                let ticket = self.predictor.issue(context);
                self.spawn_prediction(ticket);
            }
            Change::LeaveContext => {
                debug!("Left detail view");
                self.presenter.hide().await;
            }
            Change::Unchanged => {}
        }
    }

    fn spawn_prediction(&self, ticket: PredictionTicket) {
        let service = self.predictor.service();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = resolve(service, &ticket).await;
            let _ = events.send(AgentEvent::PredictionResolved { ticket, outcome });
        });
    }

    async fn on_prediction(&mut self, ticket: PredictionTicket, outcome: PredictionOutcome) {
        if !self
            .predictor
            .is_current(&ticket, self.detector.last_processed())
        {
            debug!(
                "Discarding stale prediction (generation {}, current {}) for {}",
                ticket.generation,
                self.predictor.current_generation(),
                ticket.context
            );
            return;
        }

        match outcome {
            PredictionOutcome::Suggested(suggestion) => {
                self.presenter
                    .show(Binding::new(ticket.context, suggestion))
                    .await;
            }
            PredictionOutcome::Suppressed(_) => {}
        }
    }

    async fn on_click(&mut self, click: Click) {
        let binding = match self.presenter.target(&click) {
            ClickTarget::Live(controls) => Some(controls.binding().clone()),
            ClickTarget::Superseded => {
                debug!("Ignoring click on replaced {}", click.controls);
                return;
            }
            ClickTarget::Unbound => None,
        };

        let context = binding.as_ref().map(|b| &b.context);
        let suggestion = binding.as_ref().map(|b| &b.suggestion);
        self.reporter
            .report(&mut self.presenter, context, suggestion, click.decision)
            .await;
    }
}

impl Drop for TacitAgent {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockServiceClient;
    use crate::inspector::MockPageInspector;
    use crate::presenter::RecordingOverlay;
    use std::time::Duration;
    use tacit_core::{Decision, PageView, Suggestion};

    struct Harness {
        page: Arc<MockPageInspector>,
        overlay: Arc<RecordingOverlay>,
        service: Arc<MockServiceClient>,
        agent: TacitAgent,
    }

    fn timing() -> Timing {
        Timing {
            container_retry_ms: 5,
            poll_interval_ms: 5,
        }
    }

    /// Agent already attached, page polling off
    async fn attached(service: MockServiceClient) -> Harness {
        let page = Arc::new(MockPageInspector::new());
        let overlay = Arc::new(RecordingOverlay::new());
        let service = Arc::new(service);
        let mut agent = TacitAgent::new(timing(), page.clone(), overlay.clone(), service.clone())
            .without_page_polling();

        agent.start();
        let event = agent.next_event().await.unwrap();
        assert!(matches!(event, AgentEvent::ContainerFound));
        agent.handle(event).await;
        assert_eq!(agent.phase(), AgentPhase::Attached);

        Harness {
            page,
            overlay,
            service,
            agent,
        }
    }

    fn detail(subject: &str, sender: &str) -> PageView {
        PageView::Detail(Context::new(subject, sender))
    }

    /// Handle queued events until a prediction result has been processed
    async fn settle_prediction(agent: &mut TacitAgent) {
        let event = tokio::time::timeout(Duration::from_secs(2), agent.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AgentEvent::PredictionResolved { .. }));
        agent.handle(event).await;
    }

    #[tokio::test]
    async fn test_same_subject_fetches_once() {
        let mut h = attached(MockServiceClient::new().with_prediction("A", "archive")).await;

        h.page.set_view(detail("A", "a@co.example"));
        for _ in 0..4 {
            h.agent.handle(AgentEvent::PageChanged).await;
        }
        settle_prediction(&mut h.agent).await;

        assert_eq!(h.service.predict_calls().len(), 1);
        assert_eq!(h.overlay.renders().len(), 1);
    }

    #[tokio::test]
    async fn test_leaving_context_hides_once() {
        let mut h = attached(MockServiceClient::new().with_prediction("A", "archive")).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;
        assert!(h.overlay.is_visible());

        h.page.set_view(PageView::NoDetailView);
        for _ in 0..3 {
            h.agent.handle(AgentEvent::PageChanged).await;
        }

        assert_eq!(h.overlay.hide_count(), 1);
        assert!(h.agent.current_context().is_none());
        assert!(h.agent.binding().is_none());
    }

    #[tokio::test]
    async fn test_late_prediction_for_previous_context_is_discarded() {
        let service = MockServiceClient::new()
            .with_prediction("A", "archive")
            .with_prediction("B", "delete");
        let gate_a = service.gate("A");
        let mut h = attached(service).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        h.page.set_view(detail("B", "b@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;

        // B resolves first
        settle_prediction(&mut h.agent).await;
        assert_eq!(h.agent.binding().unwrap().suggestion, Suggestion::new("delete"));

        // A's answer arrives late and must not replace B's
        gate_a.notify_one();
        settle_prediction(&mut h.agent).await;

        assert_eq!(h.agent.current_context().unwrap().subject, "B");
        assert_eq!(h.agent.binding().unwrap().context.subject, "B");
        assert_eq!(h.overlay.renders().len(), 1);
        assert_eq!(h.overlay.last_render().unwrap().label(), "delete");
    }

    #[tokio::test]
    async fn test_prediction_after_leaving_is_discarded() {
        let service = MockServiceClient::new().with_prediction("A", "archive");
        let gate_a = service.gate("A");
        let mut h = attached(service).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        h.page.set_view(PageView::NoDetailView);
        h.agent.handle(AgentEvent::PageChanged).await;

        gate_a.notify_one();
        settle_prediction(&mut h.agent).await;

        assert!(h.agent.binding().is_none());
        assert!(h.overlay.renders().is_empty());
    }

    #[tokio::test]
    async fn test_accept_reports_latest_binding() {
        let service = MockServiceClient::new()
            .with_prediction("A", "archive")
            .with_prediction("B", "delete");
        let mut h = attached(service).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;
        h.page.set_view(detail("B", "b@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;

        let controls = h.overlay.last_render().unwrap().id();
        h.agent
            .handle(AgentEvent::Click(Click {
                controls,
                decision: Decision::Accepted,
            }))
            .await;

        let sent = h.service.wait_for_feedback(1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].context, Context::new("B", "b@co.example"));
        assert_eq!(sent[0].suggestion, "delete");
        assert!(!h.overlay.is_visible());
    }

    #[tokio::test]
    async fn test_click_after_hide_sends_nothing() {
        let mut h = attached(MockServiceClient::new().with_prediction("A", "archive")).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;
        let controls = h.overlay.last_render().unwrap().id();

        h.page.set_view(PageView::NoDetailView);
        h.agent.handle(AgentEvent::PageChanged).await;
        h.agent
            .handle(AgentEvent::Click(Click {
                controls,
                decision: Decision::Rejected,
            }))
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.service.feedback_calls().is_empty());
        assert_eq!(h.overlay.hide_count(), 2);
    }

    #[tokio::test]
    async fn test_offline_service_shows_nothing() {
        let mut h = attached(MockServiceClient::new()).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;

        assert!(h.overlay.renders().is_empty());
        assert!(!h.agent.presenter().is_visible());
        assert_eq!(h.agent.current_context().unwrap().subject, "A");
    }

    #[tokio::test]
    async fn test_page_read_failure_is_ignored() {
        let mut h = attached(MockServiceClient::new()).await;

        h.page.break_page();
        h.agent.handle(AgentEvent::PageChanged).await;

        assert!(h.agent.current_context().is_none());
        assert!(h.service.predict_calls().is_empty());
    }

    #[tokio::test]
    async fn test_notifications_before_attach_are_ignored() {
        let page = Arc::new(MockPageInspector::new().with_container_after(usize::MAX));
        let service = Arc::new(MockServiceClient::new());
        let mut agent = TacitAgent::new(
            timing(),
            page.clone(),
            Arc::new(RecordingOverlay::new()),
            service.clone(),
        )
        .without_page_polling();

        agent.start();
        assert_eq!(agent.phase(), AgentPhase::WaitingForContainer);

        page.set_view(detail("A", "a@co.example"));
        agent.handle(AgentEvent::PageChanged).await;

        assert_eq!(page.inspections(), 0);
        assert!(service.predict_calls().is_empty());
        agent.stop();
    }

    #[tokio::test]
    async fn test_duplicate_container_notice_attaches_once() {
        let mut h = attached(MockServiceClient::new()).await;

        h.agent.handle(AgentEvent::ContainerFound).await;

        assert_eq!(h.page.attaches(), 1);
        assert_eq!(h.agent.phase(), AgentPhase::Attached);
    }
    #[tokio::test]
    async fn test_failed_attach_searches_again() {
        let page = Arc::new(MockPageInspector::new().with_failing_attaches(1));
        let mut agent = TacitAgent::new(
            timing(),
            page.clone(),
            Arc::new(RecordingOverlay::new()),
            Arc::new(MockServiceClient::new()),
        )
        .without_page_polling();

        agent.start();
        let event = agent.next_event().await.unwrap();
        assert!(matches!(event, AgentEvent::ContainerFound));
        agent.handle(event).await;
        assert_eq!(agent.phase(), AgentPhase::WaitingForContainer);

        let event = tokio::time::timeout(Duration::from_secs(2), agent.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AgentEvent::ContainerFound));
        agent.handle(event).await;

        assert_eq!(agent.phase(), AgentPhase::Attached);
        assert_eq!(page.attaches(), 2);
    }

    #[tokio::test]
    async fn test_lost_container_restarts_search() {
        let mut h = attached(MockServiceClient::new().with_prediction("A", "archive")).await;

        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;
        assert!(h.overlay.is_visible());

        h.page.detach();
        h.agent.handle(AgentEvent::ContainerLost).await;

        assert_eq!(h.agent.phase(), AgentPhase::WaitingForContainer);
        assert!(h.agent.current_context().is_none());
        assert!(h.agent.binding().is_none());
        assert!(!h.overlay.is_visible());

        // Notifications while searching are not acted on
        h.agent.handle(AgentEvent::PageChanged).await;
        assert_eq!(h.service.predict_calls().len(), 1);

        let event = tokio::time::timeout(Duration::from_secs(2), h.agent.next_event())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AgentEvent::ContainerFound));
        h.agent.handle(event).await;
        assert_eq!(h.agent.phase(), AgentPhase::Attached);
        assert_eq!(h.page.attaches(), 2);

        // Same message after the reload is a fresh detection
        h.page.set_view(detail("A", "a@co.example"));
        h.agent.handle(AgentEvent::PageChanged).await;
        settle_prediction(&mut h.agent).await;
        assert_eq!(h.service.predict_calls().len(), 2);
        assert!(h.overlay.is_visible());
    }

    #[tokio::test]
    async fn test_container_loss_before_attach_is_ignored() {
        let page = Arc::new(MockPageInspector::new().with_container_after(usize::MAX));
        let mut agent = TacitAgent::new(
            timing(),
            page,
            Arc::new(RecordingOverlay::new()),
            Arc::new(MockServiceClient::new()),
        )
        .without_page_polling();

        agent.start();
        agent.handle(AgentEvent::ContainerLost).await;

        assert_eq!(agent.phase(), AgentPhase::WaitingForContainer);
        agent.stop();
    }
}
