//! Message input field: trimming, clearing, auto-grow and the Enter shortcut.

use serde::{Deserialize, Serialize};

/// Geometry used to size the textarea from its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputMetrics {
    /// Height of one line of text, in pixels.
    pub line_height: u32,
    /// Top + bottom padding, in pixels.
    pub vertical_padding: u32,
}

impl Default for InputMetrics {
    fn default() -> Self {
        Self {
            line_height: 20,
            vertical_padding: 24,
        }
    }
}

impl InputMetrics {
    /// Height of the field holding a single line.
    #[must_use]
    pub fn min_height(&self) -> u32 {
        self.vertical_padding + self.line_height
    }

    /// Natural height of `content`. Never below [`Self::min_height`]; no
    /// upper bound.
    #[must_use]
    pub fn natural_height(&self, content: &str) -> u32 {
        let lines = u32::try_from(content.split('\n').count()).unwrap_or(u32::MAX);
        self.vertical_padding
            .saturating_add(lines.max(1).saturating_mul(self.line_height))
    }
}

/// The multi-line text input.
#[derive(Debug, Clone)]
pub struct InputField {
    value: String,
    height: u32,
    metrics: InputMetrics,
}

impl InputField {
    #[must_use]
    pub fn new(metrics: InputMetrics) -> Self {
        Self {
            value: String::new(),
            height: metrics.min_height(),
            metrics,
        }
    }

    /// Handle an input-change event: store the value, then reset the height
    /// to the minimum and grow it to fit.
    pub fn set_value(&mut self, value: impl Into<String>) -> u32 {
        self.value = value.into();
        self.height = self.metrics.min_height();
        self.height = self.height.max(self.metrics.natural_height(&self.value));
        self.height
    }

    /// Trim the current value. Returns `None` (and leaves the field empty)
    /// when nothing but whitespace was typed; otherwise clears the field,
    /// shrinks it back to one line and hands out the trimmed text.
    pub fn take_trimmed(&mut self) -> Option<String> {
        let trimmed = self.value.trim().to_string();
        self.clear();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.height = self.metrics.min_height();
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for InputField {
    fn default() -> Self {
        Self::new(InputMetrics::default())
    }
}

/// A key-down event on the input field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPress {
    /// DOM `KeyboardEvent.key` value, e.g. `"Enter"`.
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyPress {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    #[must_use]
    pub fn has_modifier(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }

    /// Whether this press should submit the message instead of inserting a
    /// newline. Only a bare Enter on a desktop-sized viewport submits.
    #[must_use]
    pub fn is_send_shortcut(&self, viewport_width: u32, desktop_min_width: u32) -> bool {
        self.key == "Enter" && !self.has_modifier() && viewport_width >= desktop_min_width
    }
}
