//! Meal and recipe content generation.
//!
//! The coach consumes generated content through the `ContentGenerator`
//! trait; any failure is surfaced uniformly as "unavailable". The built-in
//! implementation draws from a canned sample-meal table. A remote model
//! would implement the same trait (and carry its own timeout policy
//! behind it).

use rand::seq::SliceRandom;

use crate::domain::{
    Course, DayPlan, MacroSummary, Meal, MealItem, NutritionTarget, Profile, Recipe,
};

/// A generator failure. The cause is kept for logs; users always see the
/// same "unavailable" wording.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct GeneratorError(pub String);

/// External content generator contract.
pub trait ContentGenerator: Send + Sync {
    /// Produces `num_days` day plans of exactly three meals each.
    fn generate_plan(
        &self,
        profile: &Profile,
        target: &NutritionTarget,
        num_days: usize,
    ) -> Result<Vec<DayPlan>, GeneratorError>;

    /// Produces a single replacement meal of the given course.
    fn replacement_meal(
        &self,
        profile: &Profile,
        target: &NutritionTarget,
        course: Course,
    ) -> Result<Meal, GeneratorError>;

    /// Estimates macros for a list of free-text food entries.
    fn estimate_macros(&self, foods: &[String]) -> Result<MacroSummary, GeneratorError>;

    /// Invents a recipe from free-text fridge contents.
    fn generate_recipe(&self, ingredients_text: &str) -> Result<Recipe, GeneratorError>;
}

// === Built-in sample generator ===

struct SampleMeal {
    name: &'static str,
    items: &'static [(&'static str, u32)],
    calories: u32,
    protein_g: u32,
    fat_g: u32,
    carbs_g: u32,
    recipe: &'static str,
}

impl SampleMeal {
    fn to_meal(&self, course: Course) -> Meal {
        Meal {
            name: self.name.to_string(),
            course,
            items: self
                .items
                .iter()
                .map(|(food_name, grams)| MealItem {
                    food_name: (*food_name).to_string(),
                    grams: *grams,
                })
                .collect(),
            calories: self.calories,
            protein_g: self.protein_g,
            fat_g: self.fat_g,
            carbs_g: self.carbs_g,
            recipe_text: self.recipe.to_string(),
        }
    }
}

const BREAKFASTS: &[SampleMeal] = &[
    SampleMeal {
        name: "Breakfast (oatmeal with berries)",
        items: &[("rolled oats", 50), ("berries", 100)],
        calories: 350,
        protein_g: 15,
        fat_g: 8,
        carbs_g: 55,
        recipe: "Pour hot water or milk over the oats, add berries, let sit 5 minutes.",
    },
    SampleMeal {
        name: "Breakfast (scrambled eggs with toast)",
        items: &[("eggs", 120), ("whole-grain bread", 60)],
        calories: 380,
        protein_g: 22,
        fat_g: 18,
        carbs_g: 30,
        recipe: "Whisk the eggs, cook on low heat while stirring, serve on toasted bread.",
    },
];

const LUNCHES: &[SampleMeal] = &[
    SampleMeal {
        name: "Lunch (chicken breast with buckwheat)",
        items: &[("chicken breast", 150), ("buckwheat", 60)],
        calories: 550,
        protein_g: 45,
        fat_g: 10,
        carbs_g: 60,
        recipe: "Boil the buckwheat. Bake the chicken with spices or grill it.",
    },
    SampleMeal {
        name: "Lunch (salmon with rice)",
        items: &[("salmon", 140), ("rice", 70)],
        calories: 580,
        protein_g: 38,
        fat_g: 22,
        carbs_g: 55,
        recipe: "Boil the rice. Pan-sear the salmon 3 minutes per side.",
    },
];

const DINNERS: &[SampleMeal] = &[
    SampleMeal {
        name: "Dinner (cottage cheese with walnuts)",
        items: &[("cottage cheese", 180), ("walnuts", 20)],
        calories: 300,
        protein_g: 30,
        fat_g: 18,
        carbs_g: 8,
        recipe: "Mix the cottage cheese with crushed walnuts.",
    },
    SampleMeal {
        name: "Dinner (turkey and vegetable stir-fry)",
        items: &[("turkey fillet", 150), ("mixed vegetables", 200)],
        calories: 340,
        protein_g: 35,
        fat_g: 12,
        carbs_g: 20,
        recipe: "Stir-fry the turkey strips, add vegetables, season and cook 7 minutes.",
    },
];

/// Canned-sample generator with random choice per slot. Meals containing an
/// excluded ingredient are skipped when an alternative exists.
pub struct SampleGenerator;

impl SampleGenerator {
    pub fn new() -> Self {
        Self
    }

    fn pool_for(course: Course) -> &'static [SampleMeal] {
        match course {
            Course::Breakfast => BREAKFASTS,
            Course::Lunch => LUNCHES,
            Course::Dinner => DINNERS,
        }
    }

    fn pick(&self, profile: &Profile, course: Course) -> Result<Meal, GeneratorError> {
        let pool = Self::pool_for(course);
        let allowed: Vec<&SampleMeal> = pool
            .iter()
            .filter(|m| {
                !m.items.iter().any(|(food, _)| {
                    profile
                        .exclusions
                        .iter()
                        .any(|x| food.to_lowercase().contains(&x.to_lowercase()))
                })
            })
            .collect();
        // Fall back to the unfiltered pool rather than failing outright.
        let candidates: Vec<&SampleMeal> = if allowed.is_empty() {
            pool.iter().collect()
        } else {
            allowed
        };
        let chosen = candidates
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| GeneratorError("empty sample pool".to_string()))?;
        Ok(chosen.to_meal(course))
    }
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentGenerator for SampleGenerator {
    fn generate_plan(
        &self,
        profile: &Profile,
        _target: &NutritionTarget,
        num_days: usize,
    ) -> Result<Vec<DayPlan>, GeneratorError> {
        let mut days = Vec::with_capacity(num_days);
        for i in 0..num_days {
            let meals = Course::all()
                .iter()
                .map(|course| self.pick(profile, *course))
                .collect::<Result<Vec<_>, _>>()?;
            days.push(DayPlan {
                day_label: format!("Day {}", i + 1),
                meals,
            });
        }
        Ok(days)
    }

    fn replacement_meal(
        &self,
        profile: &Profile,
        _target: &NutritionTarget,
        course: Course,
    ) -> Result<Meal, GeneratorError> {
        self.pick(profile, course)
    }

    fn estimate_macros(&self, foods: &[String]) -> Result<MacroSummary, GeneratorError> {
        if foods.is_empty() {
            return Ok(MacroSummary::default());
        }
        // Flat per-entry estimate; a real estimator would inspect the text.
        let n = foods.len() as u32;
        Ok(MacroSummary {
            calories: 300 * n,
            protein_g: 30 * n,
            fat_g: 15 * n,
            carbs_g: 10 * n,
        })
    }

    fn generate_recipe(&self, ingredients_text: &str) -> Result<Recipe, GeneratorError> {
        let ingredients_used: Vec<String> = ingredients_text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if ingredients_used.is_empty() {
            return Err(GeneratorError("no ingredients given".to_string()));
        }
        Ok(Recipe {
            dish_name: format!("Oven bake with {}", ingredients_used[0]),
            description: "A simple, filling dish from what you have on hand.".to_string(),
            ingredients_used,
            steps: vec![
                "1. Preheat the oven to 180 C.".to_string(),
                "2. Season everything and arrange in a baking dish.".to_string(),
                "3. Bake for 20-25 minutes.".to_string(),
                "4. Serve hot.".to_string(),
            ],
        })
    }
}
