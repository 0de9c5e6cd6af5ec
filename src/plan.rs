//! Meal plan generation, per-slot replacement and shopping-list aggregation.

use crate::domain::{Course, DayPlan, Meal, NutritionTarget, Profile, WeeklyPlan, MEALS_PER_DAY};
use crate::error::CoachError;
use crate::generator::ContentGenerator;

/// Requests a fresh plan from the generator and validates its shape.
///
/// The generator must return exactly `num_days` days of exactly three meals
/// each; anything else is a generation failure and the caller keeps its
/// previous plan. The shopping list is computed over the validated days.
pub fn generate(
    generator: &dyn ContentGenerator,
    profile: &Profile,
    target: &NutritionTarget,
    num_days: usize,
) -> Result<WeeklyPlan, CoachError> {
    let days = generator
        .generate_plan(profile, target, num_days)
        .map_err(|e| CoachError::GeneratorUnavailable(e.to_string()))?;

    if days.len() != num_days {
        return Err(CoachError::GeneratorUnavailable(format!(
            "expected {} days, got {}",
            num_days,
            days.len()
        )));
    }
    for day in &days {
        if day.meals.len() != MEALS_PER_DAY {
            return Err(CoachError::GeneratorUnavailable(format!(
                "day \"{}\" has {} meals, expected {}",
                day.day_label,
                day.meals.len(),
                MEALS_PER_DAY
            )));
        }
    }

    let shopping_list = shopping_list(&days);
    Ok(WeeklyPlan {
        days,
        shopping_list,
    })
}

/// Replaces one meal slot with a freshly generated same-course meal.
///
/// Indices are validated against the current plan; a plan regenerated since
/// the user last saw it can make them point nowhere, which is reported as a
/// stale reference rather than a crash. The plan shape is preserved and the
/// shopping list is recomputed from the mutated plan.
pub fn replace_meal(
    plan: &mut WeeklyPlan,
    day_index: usize,
    meal_index: usize,
    generator: &dyn ContentGenerator,
    profile: &Profile,
    target: &NutritionTarget,
) -> Result<Meal, CoachError> {
    let slot = plan
        .days
        .get(day_index)
        .and_then(|d| d.meals.get(meal_index))
        .ok_or(CoachError::StalePlan {
            day_index,
            meal_index,
        })?;

    let course = course_of(slot);
    let replacement = generator
        .replacement_meal(profile, target, course)
        .map_err(|e| CoachError::GeneratorUnavailable(e.to_string()))?;

    plan.days[day_index].meals[meal_index] = replacement.clone();
    plan.shopping_list = shopping_list(&plan.days);
    Ok(replacement)
}

/// Looks up a meal slot, reporting stale indices instead of panicking.
pub fn meal_at(plan: &WeeklyPlan, day_index: usize, meal_index: usize) -> Result<&Meal, CoachError> {
    plan.days
        .get(day_index)
        .and_then(|d| d.meals.get(meal_index))
        .ok_or(CoachError::StalePlan {
            day_index,
            meal_index,
        })
}

/// The course of a meal: the explicit tag carried from generation time.
fn course_of(meal: &Meal) -> Course {
    meal.course
}

/// Consolidates ingredient grams across all meals of all days.
///
/// Order is deterministic: first-seen ingredient in plan-array order.
/// Duplicate names across meals and days accumulate under one entry.
pub fn shopping_list(days: &[DayPlan]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: std::collections::HashMap<String, u64> = std::collections::HashMap::new();

    for day in days {
        for meal in &day.meals {
            for item in &meal.items {
                let entry = totals.entry(item.food_name.clone()).or_insert_with(|| {
                    order.push(item.food_name.clone());
                    0
                });
                *entry += u64::from(item.grams);
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let grams = totals[&name];
            format!("{name}: {grams}g")
        })
        .collect()
}
