//! Chat panel visibility.

use serde::Serialize;

/// Whether the chat panel is currently shown.
///
/// The panel starts hidden and only changes through explicit user action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Panel is collapsed; only the toggler is on screen.
    #[default]
    Hidden,
    /// Panel is expanded.
    Shown,
}

impl Visibility {
    /// Flip the visibility and return the new value.
    pub fn toggle(&mut self) -> Self {
        *self = match self {
            Self::Hidden => Self::Shown,
            Self::Shown => Self::Hidden,
        };
        *self
    }

    /// Show the panel.
    pub fn open(&mut self) -> Self {
        *self = Self::Shown;
        *self
    }

    /// Hide the panel.
    pub fn close(&mut self) -> Self {
        *self = Self::Hidden;
        *self
    }

    #[must_use]
    pub fn is_shown(self) -> bool {
        self == Self::Shown
    }
}
