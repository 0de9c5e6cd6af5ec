//! Daily calorie and macro target derivation.
//!
//! BMR uses the Mifflin-St Jeor equation; maintenance applies an activity
//! factor; the target applies a fixed 20 % deficit. Macro grams follow the
//! diet-goal split at 4 kcal/g for protein and carbs, 9 kcal/g for fat.

use crate::domain::{Gender, NutritionTarget, Profile};
use crate::error::CoachError;

/// Activity multipliers indexed by activity_level - 1.
pub const ACTIVITY_FACTORS: [f64; 5] = [1.20, 1.375, 1.55, 1.725, 1.90];

/// Fixed calorie deficit applied to maintenance.
const DEFICIT_FACTOR: f64 = 0.80;

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;
const KCAL_PER_G_CARBS: f64 = 4.0;

/// Basal metabolic rate in kcal (Mifflin-St Jeor). Floating point; truncation
/// happens only when the final targets are formed.
fn bmr(profile: &Profile, weight_kg: f64) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * f64::from(profile.height_cm)
        - 5.0 * f64::from(profile.age);
    match profile.gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

/// Derives the daily nutrition target from a profile and the latest weight.
///
/// # Errors
/// `CoachError::MissingWeight` when no weight is available (`latest_weight_kg`
/// is None). A missing profile is the caller's concern: this function always
/// receives one.
pub fn target(profile: &Profile, latest_weight_kg: Option<f64>) -> Result<NutritionTarget, CoachError> {
    let weight = latest_weight_kg.ok_or(CoachError::MissingWeight)?;

    let idx = usize::from(profile.activity_level.clamp(1, 5)) - 1;
    let maintenance = bmr(profile, weight) * ACTIVITY_FACTORS[idx];
    let calories = (maintenance * DEFICIT_FACTOR).floor();

    let (p_frac, f_frac, c_frac) = profile.diet_goal.macro_split();
    let protein_g = (calories * p_frac / KCAL_PER_G_PROTEIN).floor();
    let fat_g = (calories * f_frac / KCAL_PER_G_FAT).floor();
    let carbs_g = (calories * c_frac / KCAL_PER_G_CARBS).floor();

    Ok(NutritionTarget {
        calories: calories as u32,
        protein_g: protein_g as u32,
        fat_g: fat_g as u32,
        carbs_g: carbs_g as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DietGoal;

    fn profile(gender: Gender, age: u32, height: u32, activity: u8, goal: DietGoal) -> Profile {
        Profile {
            gender,
            age,
            height_cm: height,
            activity_level: activity,
            diet_goal: goal,
            preferences: vec![],
            exclusions: vec![],
        }
    }

    #[test]
    fn test_worked_example_balanced_male() {
        // BMR = 10*80 + 6.25*180 - 5*30 + 5 = 1780
        // maintenance = 1780 * 1.55 = 2759
        // calories = floor(2759 * 0.8) = 2207
        let p = profile(Gender::Male, 30, 180, 3, DietGoal::Balanced);
        let t = target(&p, Some(80.0)).unwrap();
        assert_eq!(t.calories, 2207);
        assert_eq!(t.protein_g, 110); // floor(2207*0.20/4)
        assert_eq!(t.fat_g, 73); // floor(2207*0.30/9)
        assert_eq!(t.carbs_g, 275); // floor(2207*0.50/4)
    }

    #[test]
    fn test_female_offset() {
        // Female BMR is 166 kcal lower than male at equal inputs.
        let m = profile(Gender::Male, 30, 180, 3, DietGoal::Balanced);
        let f = profile(Gender::Female, 30, 180, 3, DietGoal::Balanced);
        let tm = target(&m, Some(80.0)).unwrap();
        let tf = target(&f, Some(80.0)).unwrap();
        assert!(tf.calories < tm.calories);
    }

    #[test]
    fn test_missing_weight_is_error() {
        let p = profile(Gender::Male, 30, 180, 3, DietGoal::Balanced);
        assert!(matches!(
            target(&p, None),
            Err(CoachError::MissingWeight)
        ));
    }

    #[test]
    fn test_deterministic() {
        let p = profile(Gender::Female, 45, 165, 2, DietGoal::LowCarb);
        let a = target(&p, Some(70.5)).unwrap();
        let b = target(&p, Some(70.5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_macro_kcal_reconstruction_within_4_kcal() {
        // Sum of macro grams times kcal-per-gram must come within the
        // truncation slack of the calorie target for every goal.
        for goal in [DietGoal::Balanced, DietGoal::HighProtein, DietGoal::LowCarb] {
            for weight in [55.0, 72.3, 95.8] {
                let p = profile(Gender::Male, 35, 178, 4, goal);
                let t = target(&p, Some(weight)).unwrap();
                let reconstructed = t.protein_g * 4 + t.fat_g * 9 + t.carbs_g * 4;
                let diff = i64::from(t.calories) - i64::from(reconstructed);
                assert!(
                    (0..=17).contains(&diff),
                    "goal {:?} weight {}: target {} vs macros {}",
                    goal,
                    weight,
                    t.calories,
                    reconstructed
                );
            }
        }
    }

    #[test]
    fn test_activity_factor_bounds() {
        let lazy = profile(Gender::Male, 30, 180, 1, DietGoal::Balanced);
        let athlete = profile(Gender::Male, 30, 180, 5, DietGoal::Balanced);
        let tl = target(&lazy, Some(80.0)).unwrap();
        let ta = target(&athlete, Some(80.0)).unwrap();
        assert!(ta.calories > tl.calories);
    }
}
