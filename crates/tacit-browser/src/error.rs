//! Browser error types - re-exports unified TacitError from tacit-core
//!
//! All browser errors use the unified TacitError type:
//! - Browser(String) - launch, navigation and CDP failures
//! - PageScript(String) - a page script returned something unexpected
//!
//! Error messages should name the operation that failed.

pub use tacit_core::{Result, TacitError};
