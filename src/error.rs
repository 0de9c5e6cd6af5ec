//! Error types for the nutricoach application.

use thiserror::Error;

/// Errors surfaced to the user during an interaction.
///
/// Onboarding validation failures are deliberately not represented here:
/// they are ordinary re-prompt replies, never errors.
#[derive(Debug, Error)]
pub enum CoachError {
    /// No profile exists for the user; onboarding must run first.
    #[error("profile not set up")]
    MissingProfile,

    /// No weight entry exists for the user; targets cannot be derived.
    #[error("no weight recorded")]
    MissingWeight,

    /// The content generator failed or returned malformed data.
    #[error("content generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// A plan slot reference no longer matches the active plan.
    #[error("stale plan reference: day {day_index}, meal {meal_index}")]
    StalePlan {
        day_index: usize,
        meal_index: usize,
    },

    /// No active plan exists for the user.
    #[error("no active meal plan")]
    NoActivePlan,

    /// Persistence failure; fatal for the current interaction.
    #[error("storage error: {0}")]
    Storage(#[from] crate::store::StoreError),
}

impl CoachError {
    /// The corrective message shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self {
            CoachError::MissingProfile => {
                "Your profile is not set up yet. Send /start to begin.".to_string()
            }
            CoachError::MissingWeight => {
                "I need a weight entry first. Send e.g. \"weight 80.5\".".to_string()
            }
            CoachError::GeneratorUnavailable(_) => {
                "The meal service is unavailable right now, please try again.".to_string()
            }
            CoachError::StalePlan { .. } | CoachError::NoActivePlan => {
                "This plan is stale. Generate a new menu first.".to_string()
            }
            CoachError::Storage(_) => {
                "Something went wrong saving your data. Please try again.".to_string()
            }
        }
    }
}
