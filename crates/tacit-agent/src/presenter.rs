//! Suggestion overlay ownership and binding
//!
//! The presenter owns the one overlay on the page. Every [`SuggestionPresenter::show`]
//! mints fresh [`Controls`] for exactly the binding it was given and throws the
//! previous controls away. A click is always tagged with the [`ControlsId`] it
//! was rendered with, so a click can only ever report the binding that was on
//! screen when the user made it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tacit_core::fail_open::fail_open;
use tacit_core::{Binding, Decision, FeedbackEvent, Result};
use tracing::debug;

/// Identity of one set of rendered controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlsId(pub u64);

impl std::fmt::Display for ControlsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "controls#{}", self.0)
    }
}

/// Accept/reject handlers minted for one binding
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    id: ControlsId,
    binding: Binding,
}

impl Controls {
    fn new(id: ControlsId, binding: Binding) -> Self {
        Self { id, binding }
    }

    pub fn id(&self) -> ControlsId {
        self.id
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Text shown in the overlay
    pub fn label(&self) -> &str {
        &self.binding.suggestion.action
    }

    /// The report this control produces when pressed
    pub fn press(&self, decision: Decision) -> FeedbackEvent {
        FeedbackEvent::from_binding(&self.binding, decision)
    }
}

/// A button press read back from the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Click {
    pub controls: ControlsId,
    pub decision: Decision,
}

/// What a click refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget<'a> {
    /// The click belongs to the controls currently on screen
    Live(&'a Controls),
    /// The click was made on controls that have since been replaced
    Superseded,
    /// Nothing is bound (overlay hidden)
    Unbound,
}

/// Trait for the rendered overlay (allows mocking in tests)
#[async_trait]
pub trait OverlaySurface: Send + Sync {
    /// Replace the suggestion text and rebuild both buttons for `controls`
    async fn render(&self, controls: &Controls) -> Result<()>;

    /// Show or hide the overlay
    async fn set_visible(&self, visible: bool) -> Result<()>;

    /// Drain the next button press, if any
    async fn take_click(&self) -> Result<Option<Click>>;
}

/// Owner of the overlay's visible state and current binding
pub struct SuggestionPresenter {
    surface: Arc<dyn OverlaySurface>,
    controls: Option<Controls>,
    visible: bool,
    minted: u64,
}

impl SuggestionPresenter {
    pub fn new(surface: Arc<dyn OverlaySurface>) -> Self {
        Self {
            surface,
            controls: None,
            visible: false,
            minted: 0,
        }
    }

    /// Display `binding`, replacing whatever was displayed before
    pub async fn show(&mut self, binding: Binding) -> ControlsId {
        self.minted += 1;
        let controls = Controls::new(ControlsId(self.minted), binding);
        let id = controls.id();
        debug!("Showing '{}' for {} ({})", controls.label(), controls.binding().context, id);

        // Binding and visibility flip together before anything is awaited
        self.controls = Some(controls.clone());
        self.visible = true;

        fail_open("overlay_render", || self.surface.render(&controls)).await;
        fail_open("overlay_show", || self.surface.set_visible(true)).await;
        id
    }

    /// Hide the overlay and drop the binding
    pub async fn hide(&mut self) {
        self.visible = false;
        self.controls = None;
        fail_open("overlay_hide", || self.surface.set_visible(false)).await;
    }

    /// Match a click against the controls on screen
    pub fn target(&self, click: &Click) -> ClickTarget<'_> {
        match &self.controls {
            Some(controls) if controls.id() == click.controls => ClickTarget::Live(controls),
            Some(_) => ClickTarget::Superseded,
            None => ClickTarget::Unbound,
        }
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.controls.as_ref().map(Controls::binding)
    }

    pub fn controls(&self) -> Option<&Controls> {
        self.controls.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn surface(&self) -> Arc<dyn OverlaySurface> {
        Arc::clone(&self.surface)
    }
}

/// In-memory overlay for testing
///
/// Records every render and visibility change; tests queue clicks with
/// [`RecordingOverlay::click`].
#[derive(Default)]
pub struct RecordingOverlay {
    renders: Mutex<Vec<Controls>>,
    visibility: Mutex<Vec<bool>>,
    clicks: Mutex<VecDeque<Click>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a button press on the given controls
    pub fn click(&self, controls: ControlsId, decision: Decision) {
        self.clicks
            .lock()
            .unwrap()
            .push_back(Click { controls, decision });
    }

    pub fn renders(&self) -> Vec<Controls> {
        self.renders.lock().unwrap().clone()
    }

    /// Most recently rendered controls
    pub fn last_render(&self) -> Option<Controls> {
        self.renders.lock().unwrap().last().cloned()
    }

    /// Number of times the overlay was hidden
    pub fn hide_count(&self) -> usize {
        self.visibility.lock().unwrap().iter().filter(|v| !**v).count()
    }

    /// Whether the overlay is currently shown
    pub fn is_visible(&self) -> bool {
        self.visibility.lock().unwrap().last().copied().unwrap_or(false)
    }
}

#[async_trait]
impl OverlaySurface for RecordingOverlay {
    async fn render(&self, controls: &Controls) -> Result<()> {
        self.renders.lock().unwrap().push(controls.clone());
        Ok(())
    }

    async fn set_visible(&self, visible: bool) -> Result<()> {
        self.visibility.lock().unwrap().push(visible);
        Ok(())
    }

    async fn take_click(&self) -> Result<Option<Click>> {
        Ok(self.clicks.lock().unwrap().pop_front())
    }
}
