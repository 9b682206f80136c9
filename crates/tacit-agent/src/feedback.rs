//! Feedback reporting for accepted and rejected suggestions

use crate::client::SuggestionService;
use crate::presenter::SuggestionPresenter;
use std::sync::Arc;
use tacit_core::{Context, Decision, FeedbackEvent, Suggestion};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// What `report` did
#[derive(Debug)]
pub enum ReportOutcome {
    /// Request spawned; the handle resolves to whether delivery succeeded
    Sent(JoinHandle<bool>),
    /// Context or suggestion was missing; nothing was sent
    Aborted,
}

impl ReportOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

/// Sends the user's verdict and closes the overlay
#[derive(Clone)]
pub struct FeedbackReporter {
    service: Arc<dyn SuggestionService>,
}

impl FeedbackReporter {
    pub fn new(service: Arc<dyn SuggestionService>) -> Self {
        Self { service }
    }

    /// Report `decision` for the given pair, then hide the overlay.
    ///
    /// The overlay is hidden without waiting for delivery, whether or not
    /// anything was sent.
    pub async fn report(
        &self,
        presenter: &mut SuggestionPresenter,
        context: Option<&Context>,
        suggestion: Option<&Suggestion>,
        decision: Decision,
    ) -> ReportOutcome {
        info!("Feedback started for \"{}\"", decision);

        let outcome = match (context, suggestion) {
            (Some(context), Some(suggestion)) => {
                let event = FeedbackEvent {
                    context: context.clone(),
                    suggestion: suggestion.action.clone(),
                    feedback: decision,
                };
                ReportOutcome::Sent(self.spawn_delivery(event))
            }
            _ => {
                error!("Feedback aborted: context or suggestion was missing");
                ReportOutcome::Aborted
            }
        };

        presenter.hide().await;
        outcome
    }

    fn spawn_delivery(&self, event: FeedbackEvent) -> JoinHandle<bool> {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            match service.feedback(&event).await {
                Ok(()) => {
                    info!(
                        "Feedback sent: {} '{}' for {}",
                        event.feedback, event.suggestion, event.context
                    );
                    true
                }
                Err(e) => {
                    warn!("Feedback delivery failed: {}", e);
                    false
                }
            }
        })
    }
}
