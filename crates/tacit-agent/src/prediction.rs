//! Prediction round-trip for a detected context
//!
//! The prediction service is expected to be unreachable much of the time.
//! Failures never surface to the user and never propagate; they resolve to
//! [`PredictionOutcome::Suppressed`] so callers can tell "no suggestion" apart
//! from "a suggestion" without watching logs.

use crate::client::SuggestionService;
use std::sync::Arc;
use tacit_core::{Context, Suggestion};
use tracing::debug;

/// Result of one prediction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionOutcome {
    Suggested(Suggestion),
    /// Transport, status or parse failure, with the reason for diagnostics
    Suppressed(String),
}

impl PredictionOutcome {
    pub fn suggestion(&self) -> Option<&Suggestion> {
        match self {
            Self::Suggested(suggestion) => Some(suggestion),
            Self::Suppressed(_) => None,
        }
    }
}

/// A prediction request tagged with the generation it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionTicket {
    pub generation: u64,
    pub context: Context,
}

/// Issues prediction requests and tags them
#[derive(Clone)]
pub struct PredictionClient {
    service: Arc<dyn SuggestionService>,
    generation: u64,
}

impl PredictionClient {
    pub fn new(service: Arc<dyn SuggestionService>) -> Self {
        Self {
            service,
            generation: 0,
        }
    }

    /// Ask for a suggestion. Never fails.
    pub async fn predict(&self, context: &Context) -> PredictionOutcome {
        predict_with(self.service.as_ref(), context).await
    }

    /// Start a new generation for `context`
    ///
    /// Every ticket issued supersedes all earlier ones.
    pub fn issue(&mut self, context: Context) -> PredictionTicket {
        self.generation += 1;
        PredictionTicket {
            generation: self.generation,
            context,
        }
    }

    /// Generation of the most recently issued ticket
    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    /// Whether a resolved ticket still belongs to the live context
    pub fn is_current(&self, ticket: &PredictionTicket, live: Option<&Context>) -> bool {
        ticket.generation == self.generation && live == Some(&ticket.context)
    }

    pub fn service(&self) -> Arc<dyn SuggestionService> {
        Arc::clone(&self.service)
    }
}

async fn predict_with(service: &dyn SuggestionService, context: &Context) -> PredictionOutcome {
    match service.predict(context).await {
        Ok(suggestion) => PredictionOutcome::Suggested(suggestion),
        Err(e) => {
            debug!(target: "tacit::prediction", "No suggestion for {}: {}", context, e);
            PredictionOutcome::Suppressed(e.to_string())
        }
    }
}

/// Run a ticket's request against `service`
pub async fn resolve(
    service: Arc<dyn SuggestionService>,
    ticket: &PredictionTicket,
) -> PredictionOutcome {
    predict_with(service.as_ref(), &ticket.context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockServiceClient;

    #[tokio::test]
    async fn test_successful_prediction() {
        let mock = Arc::new(MockServiceClient::new().with_prediction("Invoice #42", "archive"));
        let client = PredictionClient::new(mock.clone());

        let outcome = client
            .predict(&Context::new("Invoice #42", "billing@co.example"))
            .await;

        assert_eq!(outcome, PredictionOutcome::Suggested(Suggestion::new("archive")));
        assert_eq!(mock.predict_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_suppressed() {
        let mock = Arc::new(MockServiceClient::new());
        let client = PredictionClient::new(mock);

        let outcome = client.predict(&Context::new("Anything", "x@co.example")).await;

        assert!(matches!(outcome, PredictionOutcome::Suppressed(_)));
        assert!(outcome.suggestion().is_none());
    }

    #[test]
    fn test_tickets_supersede_each_other() {
        let mut client = PredictionClient::new(Arc::new(MockServiceClient::new()));
        let a = Context::new("A", "a@co.example");
        let b = Context::new("B", "b@co.example");

        let first = client.issue(a.clone());
        assert!(client.is_current(&first, Some(&a)));

        let second = client.issue(b.clone());
        assert!(!client.is_current(&first, Some(&a)));
        assert!(!client.is_current(&first, Some(&b)));
        assert!(client.is_current(&second, Some(&b)));
        assert_eq!(client.current_generation(), 2);
    }

    #[test]
    fn test_ticket_is_stale_after_leaving_context() {
        let mut client = PredictionClient::new(Arc::new(MockServiceClient::new()));
        let a = Context::new("A", "a@co.example");

        let ticket = client.issue(a);
        assert!(!client.is_current(&ticket, None));
    }
}
