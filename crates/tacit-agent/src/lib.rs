//! # tacit-agent
//!
//! Context detection and suggestion delivery for Tacit.
//!
//! This crate implements the pipeline behind the overlay:
//! - A pure change detector deciding when the viewed message changed
//! - Generation-tagged predictions, so a late answer never lands on a newer message
//! - A presenter that mints fresh accept/reject controls for every suggestion
//! - Best-effort feedback and capture reports
//!
//! ## Key Pattern
//!
//! A single event loop ([`TacitAgent`]) owns all state. Background tasks only
//! poll and send [`AgentEvent`]s:
//!
//! ```text
//! page change -> detector -> predict -> (still current?) -> show
//!                                            click -> feedback -> hide
//! ```
//!
//! The page and overlay are reached through [`PageInspector`] and
//! [`OverlaySurface`]; `tacit-browser` implements both over CDP.

mod agent;
mod capture;
mod client;
pub mod detector;
mod feedback;
mod inspector;
mod prediction;
mod presenter;
mod watcher;

pub use agent::{AgentEvent, AgentPhase, TacitAgent};
pub use capture::CaptureForwarder;
pub use client::{HttpServiceClient, MockServiceClient, SuggestionService};
pub use detector::{Change, ChangeDetector, ViewState};
pub use feedback::{FeedbackReporter, ReportOutcome};
pub use inspector::{MockPageInspector, PageInspector};
pub use prediction::{PredictionClient, PredictionOutcome, PredictionTicket};
pub use presenter::{
    Click, ClickTarget, Controls, ControlsId, OverlaySurface, RecordingOverlay, SuggestionPresenter,
};
pub use watcher::{spawn_page_poller, ContainerSearch};
