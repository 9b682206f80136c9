//! Chrome DevTools Protocol page binding for Tacit
//!
//! This crate connects the agent pipeline in `tacit-agent` to a real browser
//! tab. It evaluates small scripts in the page to observe it and to draw the
//! suggestion overlay.
//!
//! # Features
//!
//! - **Browser Management**: Launch Chrome/Chromium or attach to a running one
//! - **Page Inspection**: Container lookup, mutation counting, subject/sender extraction
//! - **Action Capture**: Delete/archive/report-spam clicks with the message they applied to
//! - **Overlay**: One injected bar whose buttons are rebuilt on every suggestion
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tacit_agent::{HttpServiceClient, TacitAgent};
//! use tacit_browser::{BrowserSession, CdpOverlay, CdpPageInspector};
//! use tacit_core::TacitConfig;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TacitConfig::default();
//!     let session = Arc::new(BrowserSession::connect(9222).await?);
//!
//!     let agent = TacitAgent::new(
//!         config.timing.clone(),
//!         Arc::new(CdpPageInspector::new(session.clone(), config.page.clone())),
//!         Arc::new(CdpOverlay::new(session)),
//!         Arc::new(HttpServiceClient::new(config.endpoints.clone())),
//!     );
//!     agent.run().await;
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium browser installed
//! - For attaching to an existing browser: `chrome --remote-debugging-port=9222`

pub mod browser;
pub mod error;
pub mod inspector;
pub mod overlay;
pub mod scripts;

pub use browser::{BrowserConfig, BrowserSession};
pub use error::{Result, TacitError};
pub use inspector::CdpPageInspector;
pub use overlay::CdpOverlay;
pub use scripts::PageScripts;
