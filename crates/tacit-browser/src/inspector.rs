//! Page inspection over CDP

use crate::browser::BrowserSession;
use crate::error::{Result, TacitError};
use crate::scripts::PageScripts;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tacit_agent::PageInspector;
use tacit_core::{ObservedAction, PageSelectors, PageView, UserAction};
use tracing::{debug, instrument};

/// Subject and sender as read by the page script
#[derive(Debug, Default, Deserialize)]
struct RawView {
    subject: Option<String>,
    sender: Option<String>,
}

/// Captured toolbar click as queued by the page script
#[derive(Debug, Deserialize)]
struct RawAction {
    action: String,
    subject: Option<String>,
    sender: Option<String>,
}

impl RawAction {
    fn into_observed(self) -> Option<ObservedAction> {
        let action = match self.action.parse::<UserAction>() {
            Ok(action) => action,
            Err(e) => {
                debug!("Skipping captured click: {}", e);
                return None;
            }
        };

        let context = match PageView::from_extraction(self.subject, self.sender) {
            PageView::Detail(context) => Some(context),
            _ => None,
        };

        Some(ObservedAction { action, context })
    }
}

/// Decode the mutation drain result; a negative count means no observer
fn mutation_count(value: &serde_json::Value) -> Option<u64> {
    match value.as_i64() {
        Some(n) if n < 0 => None,
        Some(n) => Some(n as u64),
        None => Some(0),
    }
}

/// [`PageInspector`] backed by a live tab
pub struct CdpPageInspector {
    session: Arc<BrowserSession>,
    scripts: PageScripts,
}

impl CdpPageInspector {
    pub fn new(session: Arc<BrowserSession>, selectors: PageSelectors) -> Self {
        Self {
            session,
            scripts: PageScripts::new(selectors),
        }
    }
}

#[async_trait]
impl PageInspector for CdpPageInspector {
    async fn container_present(&self) -> Result<bool> {
        let value = self
            .session
            .evaluate_script(&self.scripts.container_present())
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    #[instrument(skip(self))]
    async fn attach(&self) -> Result<()> {
        let value = self.session.evaluate_script(&self.scripts.attach()).await?;
        if value.as_bool() != Some(true) {
            return Err(TacitError::PageScript(
                "Container disappeared before the observer was attached".to_string(),
            ));
        }
        Ok(())
    }

    async fn take_notifications(&self) -> Result<Option<u64>> {
        let value = self
            .session
            .evaluate_script(&self.scripts.take_mutations())
            .await?;
        Ok(mutation_count(&value))
    }

    async fn inspect(&self) -> Result<PageView> {
        let raw: RawView = self.session.evaluate_json(&self.scripts.inspect()).await?;
        let view = PageView::from_extraction(raw.subject, raw.sender);
        debug!("Inspected view: {:?}", view);
        Ok(view)
    }

    async fn take_actions(&self) -> Result<Vec<ObservedAction>> {
        let raw: Vec<RawAction> = self
            .session
            .evaluate_json(&self.scripts.take_actions())
            .await?;
        Ok(raw.into_iter().filter_map(RawAction::into_observed).collect())
    }
}
