//! Per-user conversation session and the onboarding state machine.
//!
//! Onboarding is a linear chain with no back-edges; invalid input re-prompts
//! and never advances the state. The multi-turn sub-dialogs (food logging,
//! preference edits, fridge input) share the same state enum but their side
//! effects run in the coach, which owns the stores and the generator.

use std::collections::BTreeMap;

use crate::domain::{
    parse_weight_kg, DietGoal, Gender, MacroSummary, Profile, WeeklyPlan,
};
use std::str::FromStr;

/// The pending multi-turn dialog for a user session. `None` means no dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    None,
    Gender,
    Age,
    Height,
    WeightInitial,
    Activity,
    DietGoal,
    LoggingFood,
    AddingPreference,
    AddingExclusion,
    AwaitingFridgeInput,
}

/// Profile fields gathered so far during onboarding.
#[derive(Debug, Clone, Default)]
pub struct PendingProfile {
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub height_cm: Option<u32>,
    pub activity_level: Option<u8>,
}

/// Everything the bot tracks for one user between events.
#[derive(Debug, Default)]
pub struct UserSession {
    pub state: SessionState,
    pub pending: PendingProfile,
    /// Free-text entries of the current food-log dialog.
    pub food_log: Vec<String>,
    /// The single active meal plan; regeneration overwrites it.
    pub active_plan: Option<WeeklyPlan>,
    /// Running intake totals keyed by ISO date.
    pub daily_intake: BTreeMap<String, MacroSummary>,
}

/// Outcome of one onboarding step.
#[derive(Debug)]
pub struct OnboardingStep {
    pub next_state: SessionState,
    pub reply: String,
    /// One-time reply keyboard rows to show with the reply, if any.
    pub keyboard: Option<Vec<Vec<String>>>,
    /// Set when this step completes onboarding.
    pub committed_profile: Option<Profile>,
    /// Set when this step captured the initial weight.
    pub record_weight: Option<f64>,
}

impl OnboardingStep {
    fn stay(state: SessionState, reply: impl Into<String>) -> Self {
        Self {
            next_state: state,
            reply: reply.into(),
            keyboard: None,
            committed_profile: None,
            record_weight: None,
        }
    }

    fn advance_to(state: SessionState, reply: impl Into<String>) -> Self {
        Self::stay(state, reply)
    }
}

/// The prompt and keyboard opening the onboarding dialog.
pub fn gender_prompt() -> (String, Vec<Vec<String>>) {
    (
        "Welcome! Let's set up your profile.\nPlease select your gender:".to_string(),
        vec![vec!["Male".to_string(), "Female".to_string()]],
    )
}

fn diet_goal_prompt() -> (String, Vec<Vec<String>>) {
    let text = format!(
        "Great, last step. Pick the main goal of your nutrition plan:\n\n\
         \u{2022} {}: classic approach with a moderate calorie deficit.\n\
         \u{2022} {}: extra protein to minimize muscle loss.\n\
         \u{2022} {}: reduced carbs for intensive fat burning.",
        DietGoal::Balanced.label(),
        DietGoal::HighProtein.label(),
        DietGoal::LowCarb.label()
    );
    let keyboard = vec![
        vec![DietGoal::Balanced.label().to_string()],
        vec![DietGoal::HighProtein.label().to_string()],
        vec![DietGoal::LowCarb.label().to_string()],
    ];
    (text, keyboard)
}

/// Advances the linear onboarding chain by one input.
///
/// States outside the chain (None and the sub-dialogs) are not handled here;
/// callers route those separately. Invalid input yields a corrective reply
/// with `next_state` equal to the current state.
pub fn advance(
    state: SessionState,
    pending: &mut PendingProfile,
    input: &str,
) -> OnboardingStep {
    let input = input.trim();
    match state {
        SessionState::Gender => match Gender::from_str(input) {
            Ok(gender) => {
                pending.gender = Some(gender);
                OnboardingStep::advance_to(SessionState::Age, "How old are you?")
            }
            Err(()) => OnboardingStep::stay(state, "Please choose a gender using the buttons."),
        },

        SessionState::Age => match input.parse::<u32>() {
            Ok(age) if (10..=120).contains(&age) => {
                pending.age = Some(age);
                OnboardingStep::advance_to(SessionState::Height, "What is your height in cm?")
            }
            Ok(_) => OnboardingStep::stay(state, "Please enter a real age (10 to 120)."),
            Err(_) => OnboardingStep::stay(state, "Please enter your age as a number."),
        },

        SessionState::Height => match input.parse::<u32>() {
            Ok(height) if (50..=250).contains(&height) => {
                pending.height_cm = Some(height);
                OnboardingStep::advance_to(
                    SessionState::WeightInitial,
                    "What is your current weight in kg?",
                )
            }
            Ok(_) => OnboardingStep::stay(state, "Please enter a real height (50 to 250 cm)."),
            Err(_) => OnboardingStep::stay(state, "Please enter your height as a number."),
        },

        SessionState::WeightInitial => match parse_weight_kg(input) {
            Some(weight) => {
                let mut step = OnboardingStep::advance_to(
                    SessionState::Activity,
                    "What is your physical activity level? (a number from 1 to 5)",
                );
                step.record_weight = Some(weight);
                step
            }
            None => OnboardingStep::stay(
                state,
                "Please enter your weight in kg, 20 to 300 (decimal comma or dot is fine).",
            ),
        },

        SessionState::Activity => match input.parse::<u8>() {
            Ok(level) if (1..=5).contains(&level) => {
                pending.activity_level = Some(level);
                let (text, keyboard) = diet_goal_prompt();
                let mut step = OnboardingStep::advance_to(SessionState::DietGoal, text);
                step.keyboard = Some(keyboard);
                step
            }
            _ => OnboardingStep::stay(state, "Enter a number from 1 to 5."),
        },

        SessionState::DietGoal => match DietGoal::from_label(input) {
            Some(goal) => {
                // All earlier fields are present: the chain cannot reach this
                // state without them.
                let profile = Profile {
                    gender: pending.gender.unwrap_or(Gender::Male),
                    age: pending.age.unwrap_or(0),
                    height_cm: pending.height_cm.unwrap_or(0),
                    activity_level: pending.activity_level.unwrap_or(1),
                    diet_goal: goal,
                    preferences: Vec::new(),
                    exclusions: Vec::new(),
                };
                let mut step = OnboardingStep::advance_to(
                    SessionState::None,
                    "Your profile is all set!",
                );
                step.committed_profile = Some(profile);
                step
            }
            None => OnboardingStep::stay(
                state,
                "Please choose one of the options using the buttons.",
            ),
        },

        // Not part of the linear chain.
        SessionState::None
        | SessionState::LoggingFood
        | SessionState::AddingPreference
        | SessionState::AddingExclusion
        | SessionState::AwaitingFridgeInput => {
            OnboardingStep::stay(state, "Unrecognized input. Use the menu buttons.")
        }
    }
}

/// The token that finalizes a food-log dialog.
pub fn is_done_token(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("done")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_onboarding_walkthrough() {
        let mut pending = PendingProfile::default();

        let step = advance(SessionState::Gender, &mut pending, "Male");
        assert_eq!(step.next_state, SessionState::Age);

        let step = advance(SessionState::Age, &mut pending, "30");
        assert_eq!(step.next_state, SessionState::Height);

        let step = advance(SessionState::Height, &mut pending, "180");
        assert_eq!(step.next_state, SessionState::WeightInitial);

        let step = advance(SessionState::WeightInitial, &mut pending, "80,5");
        assert_eq!(step.next_state, SessionState::Activity);
        assert_eq!(step.record_weight, Some(80.5));

        let step = advance(SessionState::Activity, &mut pending, "3");
        assert_eq!(step.next_state, SessionState::DietGoal);
        assert!(step.keyboard.is_some());

        let step = advance(
            SessionState::DietGoal,
            &mut pending,
            DietGoal::Balanced.label(),
        );
        assert_eq!(step.next_state, SessionState::None);
        let profile = step.committed_profile.expect("profile committed");
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.age, 30);
        assert_eq!(profile.height_cm, 180);
        assert_eq!(profile.activity_level, 3);
        assert_eq!(profile.diet_goal, DietGoal::Balanced);
    }

    #[test]
    fn test_invalid_input_never_advances() {
        let chain = [
            SessionState::Gender,
            SessionState::Age,
            SessionState::Height,
            SessionState::WeightInitial,
            SessionState::Activity,
            SessionState::DietGoal,
        ];
        for state in chain {
            for input in ["", "nonsense", "-5", "99999"] {
                let mut pending = PendingProfile::default();
                let step = advance(state, &mut pending, input);
                assert_eq!(step.next_state, state, "{state:?} advanced on {input:?}");
                assert!(step.committed_profile.is_none());
                assert!(step.record_weight.is_none());
            }
        }
    }

    #[test]
    fn test_range_boundaries() {
        let mut pending = PendingProfile::default();

        assert_eq!(
            advance(SessionState::Age, &mut pending, "9").next_state,
            SessionState::Age
        );
        assert_eq!(
            advance(SessionState::Age, &mut pending, "10").next_state,
            SessionState::Height
        );
        assert_eq!(
            advance(SessionState::Height, &mut pending, "251").next_state,
            SessionState::Height
        );
        assert_eq!(
            advance(SessionState::Height, &mut pending, "250").next_state,
            SessionState::WeightInitial
        );
        assert_eq!(
            advance(SessionState::Activity, &mut pending, "0").next_state,
            SessionState::Activity
        );
        assert_eq!(
            advance(SessionState::Activity, &mut pending, "5").next_state,
            SessionState::DietGoal
        );
    }

    #[test]
    fn test_gender_case_insensitive() {
        let mut pending = PendingProfile::default();
        let step = advance(SessionState::Gender, &mut pending, "FEMALE");
        assert_eq!(step.next_state, SessionState::Age);
        assert_eq!(pending.gender, Some(Gender::Female));
    }

    #[test]
    fn test_weight_boundaries_and_decimal_comma() {
        let mut pending = PendingProfile::default();
        assert_eq!(
            advance(SessionState::WeightInitial, &mut pending, "19,9").next_state,
            SessionState::WeightInitial
        );
        let step = advance(SessionState::WeightInitial, &mut pending, "20");
        assert_eq!(step.next_state, SessionState::Activity);
        assert_eq!(step.record_weight, Some(20.0));
    }

    #[test]
    fn test_done_token() {
        assert!(is_done_token("done"));
        assert!(is_done_token(" DONE "));
        assert!(!is_done_token("done eating"));
    }
}
