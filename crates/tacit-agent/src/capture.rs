//! One-shot forwarding of actions the user took directly in the page

use crate::client::SuggestionService;
use chrono::Utc;
use std::sync::Arc;
use tacit_core::{CaptureEvent, Context, ObservedAction, UserAction};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Maps observed actions to capture requests
#[derive(Clone)]
pub struct CaptureForwarder {
    service: Arc<dyn SuggestionService>,
}

impl CaptureForwarder {
    pub fn new(service: Arc<dyn SuggestionService>) -> Self {
        Self { service }
    }

    /// Post one capture for `action` taken on `context`
    pub async fn capture(&self, context: &Context, action: UserAction) -> bool {
        let event = CaptureEvent::new(context, action, Utc::now());
        match self.service.capture(&event).await {
            Ok(()) => {
                info!("User action captured: '{}' on {}", action, context);
                true
            }
            Err(e) => {
                warn!("Capture of '{}' failed: {}", action, e);
                false
            }
        }
    }

    /// Forward an observed action in the background
    ///
    /// Returns `None` when the page could not tell which message the action
    /// applied to.
    pub fn forward(&self, observed: ObservedAction) -> Option<JoinHandle<bool>> {
        let Some(context) = observed.context else {
            debug!("Dropping '{}' capture: no context inferred", observed.action);
            return None;
        };

        let forwarder = self.clone();
        Some(tokio::spawn(async move {
            forwarder.capture(&context, observed.action).await
        }))
    }
}
