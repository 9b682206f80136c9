//! Suggestion overlay rendered into the page over CDP

use crate::browser::BrowserSession;
use crate::error::Result;
use crate::scripts;
use async_trait::async_trait;
use std::sync::Arc;
use tacit_agent::{Click, Controls, OverlaySurface};

/// [`OverlaySurface`] injected into a live tab
pub struct CdpOverlay {
    session: Arc<BrowserSession>,
}

impl CdpOverlay {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl OverlaySurface for CdpOverlay {
    async fn render(&self, controls: &Controls) -> Result<()> {
        self.session
            .evaluate_script(&scripts::render_overlay(controls.id().0, controls.label()))
            .await?;
        Ok(())
    }

    async fn set_visible(&self, visible: bool) -> Result<()> {
        self.session
            .evaluate_script(&scripts::set_overlay_visible(visible))
            .await?;
        Ok(())
    }

    async fn take_click(&self) -> Result<Option<Click>> {
        self.session.evaluate_json(&scripts::take_click()).await
    }
}
