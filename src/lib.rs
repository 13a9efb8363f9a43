//! Chat Widget
//!
//! A chat bubble panel that forwards each question to a remote
//! question-answering service and shows the answer in place of a
//! `"Thinking..."` placeholder.
//!
//! # Architecture
//!
//! - **Widget**: headless, event-driven state (panel, transcript, input)
//! - **Ask**: one JSON POST per question, every outcome folded into a reply
//! - **Server**: Axum routes turning HTMX requests into widget events, with
//!   SSE for replies that settle later
//! - **UI**: Handlebars markup for the page and its fragments
//!
//! # Modules
//!
//! - [`widget`]: the chat widget and its parts
//! - [`ask`]: answering service client
//! - [`session`]: per-page widget sessions
//! - [`ui`]: HTML rendering
//! - [`server`]: HTTP surface
//! - [`config`]: layered configuration

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unused_async)]

pub mod ask;
pub mod config;
pub mod server;
pub mod session;
pub mod ui;
pub mod widget;

use crate::ask::ResponseFetcher;
use crate::config::AppConfig;
use crate::ui::Renderer;

use session::SessionStore;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live widget sessions.
    pub sessions: SessionStore,
    /// Markup renderer.
    pub renderer: Arc<Renderer>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<AppConfig>, fetcher: ResponseFetcher, renderer: Renderer) -> Self {
        Self {
            sessions: SessionStore::new(fetcher, config.widget.settings()),
            renderer: Arc::new(renderer),
            config,
        }
    }
}
