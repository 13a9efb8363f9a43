//! Server-side rendering of the chat widget.
//!
//! Markup is produced with Handlebars, which escapes every interpolated
//! value. Answers come from a remote service and are untrusted.

mod templates;

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::widget::{MessageEntry, Role, Status, Visibility, WidgetSnapshot};

#[derive(Debug, Clone, Copy)]
enum Template {
    Page,
    Visibility,
    Entry,
    Transcript,
}

impl Template {
    fn name(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Visibility => "visibility",
            Self::Entry => "entry",
            Self::Transcript => "transcript",
        }
    }
}

#[derive(Serialize)]
struct EntryView<'a> {
    id: usize,
    role: Role,
    text: &'a str,
    is_error: bool,
    is_incoming: bool,
    oob: bool,
}

impl<'a> EntryView<'a> {
    fn new(entry: &'a MessageEntry, oob: bool) -> Self {
        Self {
            id: entry.id.0,
            role: entry.role,
            text: &entry.text,
            is_error: entry.status == Status::Error,
            is_incoming: entry.role == Role::Incoming,
            oob,
        }
    }
}

#[derive(Serialize)]
struct VisibilityView<'a> {
    session_id: &'a str,
    visibility: Visibility,
}

#[derive(Serialize)]
struct TranscriptView<'a> {
    entries: Vec<EntryView<'a>>,
}

#[derive(Serialize)]
struct PageView<'a> {
    title: &'a str,
    session_id: &'a str,
    visibility: Visibility,
    entries: Vec<EntryView<'a>>,
    input_value: &'a str,
    input_height: u32,
    desktop_min_width: u32,
}

/// Renders pages and fragments for one application.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        for (template, source) in [
            (Template::Page, templates::PAGE),
            (Template::Visibility, templates::VISIBILITY),
            (Template::Entry, templates::ENTRY),
            (Template::Transcript, templates::TRANSCRIPT),
        ] {
            registry.register_template_string(template.name(), source)?;
        }
        Ok(Self { registry })
    }

    /// Full page hosting the widget of `session_id`.
    pub fn page(
        &self,
        session_id: &str,
        snapshot: &WidgetSnapshot,
        desktop_min_width: u32,
    ) -> Result<String, RenderError> {
        let view = PageView {
            title: "Chatbot",
            session_id,
            visibility: snapshot.visibility,
            entries: snapshot
                .entries
                .iter()
                .map(|e| EntryView::new(e, false))
                .collect(),
            input_value: &snapshot.input_value,
            input_height: snapshot.input_height,
            desktop_min_width,
        };
        self.registry.render(Template::Page.name(), &view)
    }

    /// The element carrying the panel's visibility class.
    pub fn visibility(&self, session_id: &str, visibility: Visibility) -> Result<String, RenderError> {
        self.registry.render(
            Template::Visibility.name(),
            &VisibilityView {
                session_id,
                visibility,
            },
        )
    }

    /// One bubble. With `replace` set the fragment swaps the existing
    /// bubble with the same id instead of being appended.
    pub fn entry(&self, entry: &MessageEntry, replace: bool) -> Result<String, RenderError> {
        self.registry
            .render(Template::Entry.name(), &EntryView::new(entry, replace))
    }

    /// All bubbles, oldest first.
    pub fn transcript(&self, entries: &[MessageEntry]) -> Result<String, RenderError> {
        let view = TranscriptView {
            entries: entries.iter().map(|e| EntryView::new(e, false)).collect(),
        };
        self.registry.render(Template::Transcript.name(), &view)
    }
}
