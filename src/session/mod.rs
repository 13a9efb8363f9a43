//! Widget sessions.
//!
//! Every page load gets its own [`ChatWidget`](crate::widget::ChatWidget),
//! kept in memory and addressed by a UUID. Nothing is persisted; an idle
//! session is dropped after a timeout.
//!
//! # Architecture
//!
//! - [`Session`]: one widget plus activity bookkeeping
//! - [`SessionStore`]: thread-safe store for all live sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use chat_widget::session::SessionStore;
//!
//! let store = SessionStore::new(fetcher, WidgetSettings::default());
//! let session = store.create();
//! session.widget().toggle();
//! assert!(store.get(session.id()).is_some());
//! ```

mod store;

pub use store::{DEFAULT_SESSION_TIMEOUT, Session, SessionStore};
