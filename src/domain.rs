//! Domain types for user profiles, weight tracking and meal plans.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// === Profile ===

/// Biological gender, used by the BMR formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(()),
        }
    }
}

/// Diet goal selected during onboarding; drives the macro split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietGoal {
    Balanced,
    HighProtein,
    LowCarb,
}

impl DietGoal {
    /// The button label shown for this goal during onboarding.
    pub fn label(&self) -> &'static str {
        match self {
            DietGoal::Balanced => "Balanced weight loss",
            DietGoal::HighProtein => "Muscle-sparing weight loss",
            DietGoal::LowCarb => "Active fat burn (low carb)",
        }
    }

    /// Maps a goal button label back to the goal.
    pub fn from_label(label: &str) -> Option<DietGoal> {
        let label = label.trim().to_lowercase();
        [DietGoal::Balanced, DietGoal::HighProtein, DietGoal::LowCarb]
            .into_iter()
            .find(|g| g.label().to_lowercase() == label)
    }

    /// Macro split as (protein, fat, carbs) calorie fractions.
    pub fn macro_split(&self) -> (f64, f64, f64) {
        match self {
            DietGoal::Balanced => (0.20, 0.30, 0.50),
            DietGoal::HighProtein => (0.30, 0.30, 0.40),
            DietGoal::LowCarb => (0.25, 0.50, 0.25),
        }
    }
}

/// A user's nutrition profile, created on completion of onboarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: u32,
    pub activity_level: u8,
    pub diet_goal: DietGoal,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

// === Weight ===

/// Parses a weight value in kg, accepting comma or dot decimals.
/// Returns None outside the plausible range [20, 300].
pub fn parse_weight_kg(s: &str) -> Option<f64> {
    let value: f64 = s.trim().replace(',', ".").parse().ok()?;
    if (20.0..=300.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

// === Nutrition target ===

/// Daily calorie and macro targets. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NutritionTarget {
    pub calories: u32,
    pub protein_g: u32,
    pub fat_g: u32,
    pub carbs_g: u32,
}

// === Meal plan ===

/// Breakfast/lunch/dinner classification of a meal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Course {
    Breakfast,
    Lunch,
    Dinner,
}

impl Course {
    /// The fixed slot order within a day.
    pub fn all() -> &'static [Course] {
        &[Course::Breakfast, Course::Lunch, Course::Dinner]
    }
}

/// A single ingredient with its gram amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealItem {
    pub food_name: String,
    pub grams: u32,
}

/// One meal of a day plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    pub course: Course,
    pub items: Vec<MealItem>,
    pub calories: u32,
    pub protein_g: u32,
    pub fat_g: u32,
    pub carbs_g: u32,
    pub recipe_text: String,
}

/// One day of the plan: exactly three meals in breakfast/lunch/dinner order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub day_label: String,
    pub meals: Vec<Meal>,
}

/// Number of meals every day plan must carry.
pub const MEALS_PER_DAY: usize = 3;

/// A multi-day meal plan with its consolidated shopping list.
/// A user has at most one active plan; regeneration overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub days: Vec<DayPlan>,
    pub shopping_list: Vec<String>,
}

// === Food logging ===

/// Macro estimate for a logged food session, and per-day running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSummary {
    pub calories: u32,
    pub protein_g: u32,
    pub fat_g: u32,
    pub carbs_g: u32,
}

impl MacroSummary {
    pub fn add(&mut self, other: &MacroSummary) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.fat_g += other.fat_g;
        self.carbs_g += other.carbs_g;
    }
}

/// A recipe produced from free-text fridge contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub dish_name: String,
    pub description: String,
    pub ingredients_used: Vec<String>,
    pub steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_str_case_insensitive() {
        assert_eq!(Gender::from_str("male").unwrap(), Gender::Male);
        assert_eq!(Gender::from_str("FEMALE").unwrap(), Gender::Female);
        assert_eq!(Gender::from_str("  Male ").unwrap(), Gender::Male);
    }

    #[test]
    fn test_gender_from_str_invalid() {
        assert!(Gender::from_str("other").is_err());
        assert!(Gender::from_str("").is_err());
    }

    #[test]
    fn test_diet_goal_label_round_trip() {
        for goal in [DietGoal::Balanced, DietGoal::HighProtein, DietGoal::LowCarb] {
            assert_eq!(DietGoal::from_label(goal.label()), Some(goal));
        }
        assert_eq!(DietGoal::from_label("keto"), None);
    }

    #[test]
    fn test_parse_weight_dot_and_comma() {
        assert_eq!(parse_weight_kg("80.5"), Some(80.5));
        assert_eq!(parse_weight_kg("80,5"), Some(80.5));
        assert_eq!(parse_weight_kg(" 75 "), Some(75.0));
    }

    #[test]
    fn test_parse_weight_out_of_range() {
        assert_eq!(parse_weight_kg("19.9"), None);
        assert_eq!(parse_weight_kg("301"), None);
        assert_eq!(parse_weight_kg("abc"), None);
    }

    #[test]
    fn test_macro_summary_add() {
        let mut total = MacroSummary::default();
        total.add(&MacroSummary {
            calories: 300,
            protein_g: 30,
            fat_g: 15,
            carbs_g: 10,
        });
        total.add(&MacroSummary {
            calories: 200,
            protein_g: 10,
            fat_g: 5,
            carbs_g: 30,
        });
        assert_eq!(total.calories, 500);
        assert_eq!(total.protein_g, 40);
        assert_eq!(total.fat_g, 20);
        assert_eq!(total.carbs_g, 40);
    }
}
