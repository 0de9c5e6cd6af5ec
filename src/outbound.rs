//! Outbound reply payloads and typed button actions.
//!
//! The coach emits an ordered sequence of `Reply` values per inbound event;
//! the transport layer renders them. Button presses come back as compact
//! `verb:arg:arg` callback data, parsed strictly into `ButtonAction`.

use std::fmt;

/// An action carried by an inline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Generate a fresh plan for the given number of days.
    GenerateMenu { days: usize },
    /// Replace one plan slot.
    Replace { day: usize, meal: usize },
    /// Show the recipe of one plan slot.
    Recipe { day: usize, meal: usize },
    /// Show the consolidated shopping list of the active plan.
    ShowShoppingList,
    /// Start the add-preference dialog.
    AddPreference,
    /// Start the add-exclusion dialog.
    AddExclusion,
    /// Clear both preference lists.
    ClearPreferences,
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::GenerateMenu { days } => write!(f, "gen_menu:{days}"),
            ButtonAction::Replace { day, meal } => write!(f, "replace:{day}:{meal}"),
            ButtonAction::Recipe { day, meal } => write!(f, "recipe:{day}:{meal}"),
            ButtonAction::ShowShoppingList => write!(f, "shopping_list"),
            ButtonAction::AddPreference => write!(f, "prefs:add_pref"),
            ButtonAction::AddExclusion => write!(f, "prefs:add_excl"),
            ButtonAction::ClearPreferences => write!(f, "prefs:clear"),
        }
    }
}

impl ButtonAction {
    /// Parses callback data. Malformed data yields None, never a panic.
    pub fn parse(data: &str) -> Option<ButtonAction> {
        let mut parts = data.split(':');
        let verb = parts.next()?;
        let action = match verb {
            "gen_menu" => ButtonAction::GenerateMenu {
                days: parts.next()?.parse().ok()?,
            },
            "replace" => ButtonAction::Replace {
                day: parts.next()?.parse().ok()?,
                meal: parts.next()?.parse().ok()?,
            },
            "recipe" => ButtonAction::Recipe {
                day: parts.next()?.parse().ok()?,
                meal: parts.next()?.parse().ok()?,
            },
            "shopping_list" => ButtonAction::ShowShoppingList,
            "prefs" => match parts.next()? {
                "add_pref" => ButtonAction::AddPreference,
                "add_excl" => ButtonAction::AddExclusion,
                "clear" => ButtonAction::ClearPreferences,
                _ => return None,
            },
            _ => return None,
        };
        if parts.next().is_some() {
            return None; // trailing junk
        }
        Some(action)
    }
}

/// An inline button: visible label plus its action.
#[derive(Debug, Clone)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// One outbound message: text plus optional button sets.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub text: String,
    /// Inline button rows attached to this message.
    pub inline_buttons: Vec<Vec<Button>>,
    /// One-time reply keyboard rows (label-only buttons).
    pub menu_keyboard: Option<Vec<Vec<String>>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_inline(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.inline_buttons = rows;
        self
    }

    pub fn with_menu(mut self, rows: Vec<Vec<String>>) -> Self {
        self.menu_keyboard = Some(rows);
        self
    }
}
