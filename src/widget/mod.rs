//! Headless chat widget.
//!
//! [`ChatWidget`] owns everything a chat bubble panel needs: the panel
//! [`Visibility`], the [`Transcript`], the [`InputField`] and the
//! [`ResponseFetcher`] used to answer questions. It knows nothing about how
//! it is drawn; a front-end feeds it user events and renders snapshots or
//! the [`WidgetUpdate`] stream.
//!
//! # Event flow
//!
//! 1. `input`/`key_down`/`send` mutate the widget synchronously.
//! 2. A successful `send` appends the outgoing bubble and spawns one task
//!    for that question.
//! 3. After the reply delay the task appends a `"Thinking..."` placeholder
//!    and asks the [`AnswerSource`](crate::ask::AnswerSource).
//! 4. The result is written through the placeholder's own
//!    [`EntryHandle`], so concurrent questions never overwrite each other.
//!
//! # Example
//!
//! ```rust,ignore
//! let widget = ChatWidget::new(fetcher, WidgetSettings::default());
//! widget.input("Where is the head office?");
//! if let Some(submission) = widget.send() {
//!     submission.settled().await;
//! }
//! ```

pub mod filter;
pub mod input;
pub mod panel;
pub mod transcript;

pub use filter::KeywordFilter;
pub use input::{InputField, InputMetrics, KeyPress};
pub use panel::Visibility;
pub use transcript::{
    EntryHandle, EntryId, MessageEntry, RequestToken, Role, Status, Transcript, TranscriptError,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::ask::{Reply, ResponseFetcher, THINKING_TEXT};
use filter::OFF_TOPIC_REPLY;

/// Default pause before the reply placeholder appears.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(600);
/// Narrowest viewport (px) on which Enter sends the message.
pub const DEFAULT_DESKTOP_MIN_WIDTH: u32 = 768;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Behavioral knobs of a widget.
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub reply_delay: Duration,
    pub desktop_min_width: u32,
    pub metrics: InputMetrics,
    pub filter: KeywordFilter,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            desktop_min_width: DEFAULT_DESKTOP_MIN_WIDTH,
            metrics: InputMetrics::default(),
            filter: KeywordFilter::default(),
        }
    }
}

/// A change to the widget, published to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetUpdate {
    Visibility { visibility: Visibility },
    EntryAppended { entry: MessageEntry },
    EntryUpdated { entry: MessageEntry },
    InputReset { height: u32 },
}

/// Point-in-time copy of the widget state.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSnapshot {
    pub visibility: Visibility,
    pub entries: Vec<MessageEntry>,
    pub scroll_anchor: Option<EntryId>,
    pub input_value: String,
    pub input_height: u32,
}

/// A question that has been accepted and is being answered.
#[derive(Debug)]
pub struct Submission {
    pub token: RequestToken,
    /// The user's bubble.
    pub outgoing: EntryId,
    task: JoinHandle<EntryId>,
}

impl Submission {
    /// Wait until the reply placeholder has received its final text.
    /// Returns the placeholder's id, or `None` if the task was aborted.
    pub async fn settled(self) -> Option<EntryId> {
        match self.task.await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(token = %self.token, error = %e, "Reply task did not complete");
                None
            }
        }
    }
}

#[derive(Debug)]
struct WidgetState {
    visibility: Visibility,
    transcript: Transcript,
    input: InputField,
}

#[derive(Debug)]
struct WidgetInner {
    state: Mutex<WidgetState>,
    fetcher: ResponseFetcher,
    settings: WidgetSettings,
    updates: broadcast::Sender<WidgetUpdate>,
}

impl WidgetInner {
    fn state(&self) -> MutexGuard<'_, WidgetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, update: WidgetUpdate) {
        // No subscribers is fine.
        let _ = self.updates.send(update);
    }
}

/// The chat widget. Cheap to clone; clones share state.
///
/// `send` spawns onto the current tokio runtime.
#[derive(Debug, Clone)]
pub struct ChatWidget {
    inner: Arc<WidgetInner>,
}

impl ChatWidget {
    #[must_use]
    pub fn new(fetcher: ResponseFetcher, settings: WidgetSettings) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(WidgetInner {
                state: Mutex::new(WidgetState {
                    visibility: Visibility::default(),
                    transcript: Transcript::new(),
                    input: InputField::new(settings.metrics),
                }),
                fetcher,
                settings,
                updates,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &WidgetSettings {
        &self.inner.settings
    }

    /// Receive every change made after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetUpdate> {
        self.inner.updates.subscribe()
    }

    pub fn toggle(&self) -> Visibility {
        self.set_visibility(Visibility::toggle)
    }

    pub fn open(&self) -> Visibility {
        self.set_visibility(Visibility::open)
    }

    pub fn close(&self) -> Visibility {
        self.set_visibility(Visibility::close)
    }

    fn set_visibility(&self, change: fn(&mut Visibility) -> Visibility) -> Visibility {
        let visibility = change(&mut self.inner.state().visibility);
        tracing::debug!(?visibility, "Panel visibility changed");
        self.inner.publish(WidgetUpdate::Visibility { visibility });
        visibility
    }

    /// Input-change event. Returns the field's new height.
    pub fn input(&self, value: impl Into<String>) -> u32 {
        self.inner.state().input.set_value(value)
    }

    /// Key-down event in the input field. Submits when `key` is the send
    /// shortcut for this viewport; any other key is ordinary text entry.
    pub fn key_down(&self, key: &KeyPress, viewport_width: u32) -> Option<Submission> {
        if key.is_send_shortcut(viewport_width, self.inner.settings.desktop_min_width) {
            self.send()
        } else {
            None
        }
    }

    /// Send-button activation: submit whatever is in the input field.
    ///
    /// Returns `None` when the trimmed input is empty; nothing is appended
    /// and no request is made.
    pub fn send(&self) -> Option<Submission> {
        let token = RequestToken::new();

        let (question, outgoing, height) = {
            let mut state = self.inner.state();
            let question = state.input.take_trimmed();
            let height = state.input.height();
            let Some(question) = question else {
                drop(state);
                self.inner.publish(WidgetUpdate::InputReset { height });
                return None;
            };
            let handle = state
                .transcript
                .append(question.clone(), Role::Outgoing, token);
            let entry = state.transcript.get(handle.id()).cloned();
            (question, entry, height)
        };

        self.inner.publish(WidgetUpdate::InputReset { height });
        let outgoing = outgoing?;
        let outgoing_id = outgoing.id;
        self.inner
            .publish(WidgetUpdate::EntryAppended { entry: outgoing });

        tracing::info!(
            name: "widget.question.submitted",
            token = %token,
            entry = outgoing_id.0,
            question_length = question.len(),
            "Question submitted"
        );

        let task = tokio::spawn(Self::answer(Arc::clone(&self.inner), question, token));

        Some(Submission {
            token,
            outgoing: outgoing_id,
            task,
        })
    }

    /// Replace the input value and submit it in one step, as a form post
    /// carrying the textarea value does.
    pub fn send_message(&self, value: impl Into<String>) -> Option<Submission> {
        self.input(value);
        self.send()
    }

    async fn answer(inner: Arc<WidgetInner>, question: String, token: RequestToken) -> EntryId {
        tokio::time::sleep(inner.settings.reply_delay).await;

        let (placeholder, entry) = {
            let mut state = inner.state();
            let handle = state
                .transcript
                .append(THINKING_TEXT, Role::Incoming, token);
            let entry = state.transcript.get(handle.id()).cloned();
            (handle, entry)
        };
        let placeholder_id = placeholder.id();
        if let Some(entry) = entry {
            inner.publish(WidgetUpdate::EntryAppended { entry });
        }

        let reply = if inner.settings.filter.allows(&question) {
            inner.fetcher.fetch(&question).await
        } else {
            tracing::info!(token = %token, "Question rejected by keyword filter");
            Reply::answer(OFF_TOPIC_REPLY)
        };

        let updated = {
            let mut state = inner.state();
            let updated = state
                .transcript
                .update(placeholder, reply.text, reply.is_error)
                .cloned();
            state.transcript.scroll_to_latest();
            updated
        };

        match updated {
            Ok(entry) => {
                tracing::debug!(
                    token = %token,
                    entry = placeholder_id.0,
                    is_error = reply.is_error,
                    "Reply settled"
                );
                inner.publish(WidgetUpdate::EntryUpdated { entry });
            }
            Err(e) => {
                tracing::error!(token = %token, error = %e, "Failed to apply reply");
            }
        }

        placeholder_id
    }

    #[must_use]
    pub fn snapshot(&self) -> WidgetSnapshot {
        let state = self.inner.state();
        WidgetSnapshot {
            visibility: state.visibility,
            entries: state.transcript.entries().to_vec(),
            scroll_anchor: state.transcript.scroll_anchor(),
            input_value: state.input.value().to_string(),
            input_height: state.input.height(),
        }
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.inner.state().visibility
    }
}
