//! Fail-open utilities for graceful degradation
//!
//! The agent lives inside someone else's page and talks to services that are
//! often offline. Nothing it does may take the page down with it, so page
//! probes and best-effort reports go through these helpers.
//!
//! DO NOT use fail-open for:
//! - Context change decisions (state)
//! - Binding replacement (correctness)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use tacit_core::fail_open::fail_open;
/// use tacit_core::Result;
///
/// async fn count_mutations() -> Result<u64> {
///     Ok(3)
/// }
///
/// async fn example() {
///     let seen = fail_open("mutation_probe", || count_mutations()).await;
///     // seen is None if the page could not be read
/// }
/// ```
///
/// # Examples of appropriate use:
/// - Page probes over CDP
/// - Overlay rendering
/// - Feedback and capture delivery
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Like [`fail_open`] but logs at debug level.
///
/// For operations whose failure is expected and frequent, such as the
/// prediction service being down, where a warning per attempt would only be
/// noise.
pub async fn fail_quiet<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            tracing::debug!("{} failed (suppressed): {}", operation_name, e);
            None
        }
    }
}
