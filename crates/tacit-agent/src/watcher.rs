//! Background pollers feeding the agent's event queue
//!
//! Pollers only read the page and send [`AgentEvent`]s. They never touch the
//! detector or presenter, which live on the agent's event loop.

use crate::agent::AgentEvent;
use crate::inspector::PageInspector;
use crate::presenter::OverlaySurface;
use std::sync::Arc;
use std::time::Duration;
use tacit_core::fail_open::fail_quiet;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Repeating container lookup with a cancellation handle
///
/// Looks once immediately, then every `retry` until the container is found.
/// Sends exactly one [`AgentEvent::ContainerFound`] and stops.
pub struct ContainerSearch {
    handle: JoinHandle<()>,
}

impl ContainerSearch {
    pub fn spawn(
        inspector: Arc<dyn PageInspector>,
        retry: Duration,
        events: UnboundedSender<AgentEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut attempt: u64 = 0;
            loop {
                attempt += 1;
                let present = fail_quiet("container_lookup", || inspector.container_present())
                    .await
                    .unwrap_or(false);

                if present {
                    info!("Container found after {} lookup(s)", attempt);
                    let _ = events.send(AgentEvent::ContainerFound);
                    return;
                }

                debug!("Container not mounted yet, retrying in {:?}", retry);
                tokio::time::sleep(retry).await;
            }
        });

        Self { handle }
    }

    /// Stop searching
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ContainerSearch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll the page and overlay at a fixed interval
///
/// Each tick drains structural-change notifications, observed user actions and
/// overlay clicks. The task ends when the agent drops its receiver, or after
/// sending [`AgentEvent::ContainerLost`] once the page observer is gone.
pub fn spawn_page_poller(
    inspector: Arc<dyn PageInspector>,
    overlay: Arc<dyn OverlaySurface>,
    interval: Duration,
    events: UnboundedSender<AgentEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let notifications = fail_quiet("notification_poll", || inspector.take_notifications())
                .await
                .unwrap_or(Some(0));
            match notifications {
                None => {
                    info!("Page observer gone, container lost");
                    let _ = events.send(AgentEvent::ContainerLost);
                    return;
                }
                Some(0) => {}
                Some(_) => {
                    if events.send(AgentEvent::PageChanged).is_err() {
                        return;
                    }
                }
            }

            let actions = fail_quiet("action_poll", || inspector.take_actions())
                .await
                .unwrap_or_default();
            for action in actions {
                if events.send(AgentEvent::UserAction(action)).is_err() {
                    return;
                }
            }

            while let Some(click) = fail_quiet("click_poll", || overlay.take_click())
                .await
                .flatten()
            {
                if events.send(AgentEvent::Click(click)).is_err() {
                    return;
                }
            }

            if events.is_closed() {
                return;
            }
        }
    })
}
