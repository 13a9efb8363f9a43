//! Transcript model: the ordered list of chat bubbles.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    Outgoing,
    /// Produced by the answering service (or the widget on its behalf).
    Incoming,
}

/// Display status of a transcript entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Normal,
    Error,
}

/// Position of an entry in the transcript (append index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

/// Correlation token minted once per submitted question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestToken(Uuid);

impl RequestToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A single rendered chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEntry {
    pub id: EntryId,
    pub text: String,
    pub role: Role,
    pub status: Status,
    /// Token of the submission this entry belongs to.
    pub token: RequestToken,
}

/// Capability to rewrite one transcript entry exactly once.
///
/// Not `Clone`: [`Transcript::update`] consumes the handle, so a placeholder
/// can never be written twice.
#[derive(Debug, PartialEq, Eq)]
pub struct EntryHandle {
    id: EntryId,
    token: RequestToken,
}

impl EntryHandle {
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub fn token(&self) -> RequestToken {
        self.token
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("no transcript entry with id {0:?}")]
    UnknownEntry(EntryId),
    #[error("entry {id:?} belongs to request {expected}, not {got}")]
    TokenMismatch {
        id: EntryId,
        expected: RequestToken,
        got: RequestToken,
    },
}

/// Append-only list of entries plus the current scroll anchor.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    entries: Vec<MessageEntry>,
    scroll_anchor: Option<EntryId>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the bottom and scroll it into view.
    pub fn append(&mut self, text: impl Into<String>, role: Role, token: RequestToken) -> EntryHandle {
        let id = EntryId(self.entries.len());
        self.entries.push(MessageEntry {
            id,
            text: text.into(),
            role,
            status: Status::Normal,
            token,
        });
        self.scroll_to_latest();
        EntryHandle { id, token }
    }

    /// Replace the text of the entry behind `handle`, optionally flagging it
    /// as an error. Scroll position is irrelevant.
    pub fn update(
        &mut self,
        handle: EntryHandle,
        text: impl Into<String>,
        is_error: bool,
    ) -> Result<&MessageEntry, TranscriptError> {
        let entry = self
            .entries
            .get_mut(handle.id.0)
            .ok_or(TranscriptError::UnknownEntry(handle.id))?;

        if entry.token != handle.token {
            return Err(TranscriptError::TokenMismatch {
                id: handle.id,
                expected: entry.token,
                got: handle.token,
            });
        }

        entry.text = text.into();
        if is_error {
            entry.status = Status::Error;
        }
        Ok(entry)
    }

    /// Move the scroll anchor to the newest entry.
    pub fn scroll_to_latest(&mut self) {
        self.scroll_anchor = self.entries.last().map(|e| e.id);
    }

    #[must_use]
    pub fn scroll_anchor(&self) -> Option<EntryId> {
        self.scroll_anchor
    }

    #[must_use]
    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&MessageEntry> {
        self.entries.get(id.0)
    }
}
