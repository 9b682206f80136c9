//! # tacit-core
//!
//! Core types for the Tacit page-embedded suggestion agent.
//!
//! Tacit watches a live mail page, infers the message the user is looking at,
//! asks a prediction service what the user usually does with such messages,
//! and offers that action back as a one-click suggestion.
//!
//! ## Core Paradigm
//!
//! - A context IS the (subject, sender) pair currently on screen
//! - A binding IS the suggestion the user can accept or reject right now
//! - Feedback and captures ARE best-effort, fire-and-forget reports

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::{BrowserSettings, Endpoints, PageSelectors, TacitConfig, Timing};
pub use error::{Result, TacitError};
pub use types::*;
