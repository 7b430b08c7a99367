//! Messages exchanged with the parent (shell) frame.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::platform::ParentFrame;
use crate::routes::{AppRouteConfig, RouteItem};

/// Every message understood on the frame channel, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(tag = "type")]
pub enum FrameMessage {
    /// Shell asks the child to navigate.
    #[serde(rename = "ROUTE_CHANGE")]
    RouteChange {
        /// Target path.
        path: String,
    },
    /// Child asks the shell to scroll its content area to the top.
    #[serde(rename = "MICRO_FRONTEND_SCROLL_TO_TOP")]
    ScrollToTop {
        /// Sending application.
        source: String,
        /// Whether to animate.
        smooth: bool,
    },
    /// Child announces its route table.
    #[serde(rename = "MICRO_FRONTEND_ROUTES", rename_all = "camelCase")]
    Routes {
        /// Sending application.
        app_key: String,
        /// The application's pages.
        routes: Vec<RouteItem>,
    },
}

impl FrameMessage {
    /// Parses an incoming message. Unknown types and malformed payloads are
    /// `None`.
    #[must_use]
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json)
            .inspect_err(|err| log::trace!("ignoring frame message: {err}"))
            .ok()
    }
}

/// Best-effort channel to the parent frame.
pub struct FrameChannel {
    frame: Arc<dyn ParentFrame>,
    source: String,
}

impl FrameChannel {
    /// Creates a channel that signs scroll requests with `source`.
    #[must_use]
    pub fn new(frame: Arc<dyn ParentFrame>, source: impl Into<String>) -> Self {
        Self {
            frame,
            source: source.into(),
        }
    }

    /// Posts `message` if a parent frame exists. Returns whether it was
    /// delivered; failures are logged.
    #[must_use]
    pub fn post(&self, message: &FrameMessage) -> bool {
        if !self.frame.has_parent() {
            return false;
        }
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("failed to encode frame message: {err}");
                return false;
            }
        };
        match self.frame.post_message(payload) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to post message to parent frame: {err}");
                false
            }
        }
    }

    /// Asks the shell to scroll to the top.
    #[must_use]
    pub fn scroll_to_top(&self, smooth: bool) -> bool {
        self.post(&FrameMessage::ScrollToTop {
            source: self.source.clone(),
            smooth,
        })
    }

    /// Announces `config`'s routes to the shell.
    #[must_use]
    pub fn announce_routes(&self, config: &AppRouteConfig) -> bool {
        self.post(&FrameMessage::Routes {
            app_key: config.app_key.clone(),
            routes: config.routes.clone(),
        })
    }

    /// Parses a message received from the parent.
    #[must_use]
    pub fn handle_incoming(&self, json: &str) -> Option<FrameMessage> {
        let message = FrameMessage::parse(json)?;
        log::debug!("received frame message {message:?}");
        Some(message)
    }
}
