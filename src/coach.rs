//! Event routing and command handling.
//!
//! Every inbound chat event arrives as one tagged `InboundEvent` and is
//! handled while holding that user's session lock, so events from the same
//! user are serialized while other users proceed independently. The coach
//! returns an ordered list of replies; it knows nothing about the transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::domain::{Meal, NutritionTarget, Profile, WeeklyPlan};
use crate::error::CoachError;
use crate::generator::ContentGenerator;
use crate::outbound::{Button, ButtonAction, Reply};
use crate::plan;
use crate::scheduler::ReminderScheduler;
use crate::session::{self, SessionState, UserSession};
use crate::store::{KvStore, ProfileStore, WeightLedger};

/// The bot's command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    DailyMenu,
    WeeklyMenu,
    Targets,
    LogFood,
    Progress,
    Preferences,
    Fridge,
}

/// One inbound chat event, dispatched once at the transport boundary.
#[derive(Debug)]
pub enum EventPayload {
    Command(Command),
    Text(String),
    Button(ButtonAction),
}

#[derive(Debug)]
pub struct InboundEvent {
    pub user_id: u64,
    pub payload: EventPayload,
}

/// Main menu labels shown to users with a committed profile.
const MENU_ROWS: &[&[&str]] = &[
    &["Daily menu"],
    &["Weekly menu"],
    &["Targets", "Weight progress"],
    &["Log food", "Preferences"],
    &["Fridge recipe"],
];

/// Maps a tapped main-menu label to its command.
pub fn command_for_label(label: &str) -> Option<Command> {
    match label.trim() {
        "Daily menu" => Some(Command::DailyMenu),
        "Weekly menu" => Some(Command::WeeklyMenu),
        "Targets" => Some(Command::Targets),
        "Weight progress" => Some(Command::Progress),
        "Log food" => Some(Command::LogFood),
        "Preferences" => Some(Command::Preferences),
        "Fridge recipe" => Some(Command::Fridge),
        _ => None,
    }
}

fn main_keyboard() -> Vec<Vec<String>> {
    MENU_ROWS
        .iter()
        .map(|row| row.iter().map(|s| (*s).to_string()).collect())
        .collect()
}

pub struct Coach {
    store: Arc<dyn KvStore>,
    generator: Arc<dyn ContentGenerator>,
    scheduler: Arc<ReminderScheduler>,
    sessions: Mutex<HashMap<u64, Arc<Mutex<UserSession>>>>,
}

impl Coach {
    pub fn new(
        store: Arc<dyn KvStore>,
        generator: Arc<dyn ContentGenerator>,
        scheduler: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            store,
            generator,
            scheduler,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn profiles(&self) -> ProfileStore<'_> {
        ProfileStore::new(&*self.store)
    }

    fn ledger(&self) -> WeightLedger<'_> {
        WeightLedger::new(&*self.store)
    }

    fn session_for(&self, user_id: u64) -> Arc<Mutex<UserSession>> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserSession::default())))
            .clone()
    }

    /// Handles one inbound event and returns the replies to deliver, in
    /// order. Errors become a single corrective reply; they never escape.
    pub fn handle_event(&self, event: InboundEvent) -> Vec<Reply> {
        let handle = self.session_for(event.user_id);
        let mut session = handle.lock().unwrap();

        let result = match event.payload {
            EventPayload::Command(cmd) => self.handle_command(event.user_id, &mut session, cmd),
            EventPayload::Text(text) => self.handle_text(event.user_id, &mut session, &text),
            EventPayload::Button(action) => {
                self.handle_button(event.user_id, &mut session, action)
            }
        };

        match result {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!("user {}: {}", event.user_id, e);
                vec![Reply::text(e.user_message())]
            }
        }
    }

    // === Commands ===

    fn handle_command(
        &self,
        user_id: u64,
        session: &mut UserSession,
        cmd: Command,
    ) -> Result<Vec<Reply>, CoachError> {
        match cmd {
            Command::Start => self.cmd_start(user_id, session),
            Command::DailyMenu => self.generate_menu(user_id, session, 1),
            Command::WeeklyMenu => Ok(vec![Reply::text("For how many days?").with_inline(vec![
                vec![
                    Button::new("3 days", ButtonAction::GenerateMenu { days: 3 }),
                    Button::new("5 days", ButtonAction::GenerateMenu { days: 5 }),
                    Button::new("7 days", ButtonAction::GenerateMenu { days: 7 }),
                ],
            ])]),
            Command::Targets => self.cmd_targets(user_id),
            Command::LogFood => {
                session.state = SessionState::LoggingFood;
                session.food_log.clear();
                Ok(vec![Reply::text(
                    "Enter foods one at a time. Send \"done\" when finished.",
                )
                .with_menu(vec![vec!["Done".to_string()]])])
            }
            Command::Progress => self.cmd_progress(user_id),
            Command::Preferences => self.prefs_overview(user_id),
            Command::Fridge => {
                session.state = SessionState::AwaitingFridgeInput;
                Ok(vec![Reply::text(
                    "List the foods you have (comma separated) and I'll suggest a dish.",
                )])
            }
        }
    }

    fn cmd_start(
        &self,
        user_id: u64,
        session: &mut UserSession,
    ) -> Result<Vec<Reply>, CoachError> {
        // Drop intake totals from previous days.
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        session.daily_intake.retain(|date, _| *date == today);

        if self.profiles().get(user_id)?.is_some() {
            // Restores reminder triggers after a process restart; a no-op
            // when they already exist.
            self.scheduler.register_user(user_id);
            return Ok(vec![Reply::text(
                "Bot is active. Use the menu to navigate.",
            )
            .with_menu(main_keyboard())]);
        }

        session.state = SessionState::Gender;
        session.pending = Default::default();
        let (text, keyboard) = session::gender_prompt();
        Ok(vec![Reply::text(text).with_menu(keyboard)])
    }

    fn cmd_targets(&self, user_id: u64) -> Result<Vec<Reply>, CoachError> {
        let profile = self.require_profile(user_id)?;
        let weight = self.ledger().latest(user_id)?;
        let target = crate::nutrition::target(&profile, weight)?;
        Ok(vec![Reply::text(targets_text(
            &profile,
            weight.unwrap_or_default(),
            &target,
        ))])
    }

    fn cmd_progress(&self, user_id: u64) -> Result<Vec<Reply>, CoachError> {
        let history = self.ledger().history(user_id)?;
        if history.is_empty() {
            return Ok(vec![Reply::text(
                "No progress yet. Log your weight first, e.g. \"weight 80.5\".",
            )]);
        }
        let mut text = String::from("Weight progress by day:\n");
        for (date, weight) in history {
            text.push_str(&format!("{}: {} kg\n", date.format("%d.%m.%Y"), weight));
        }
        Ok(vec![Reply::text(text)])
    }

    // === Free text ===

    fn handle_text(
        &self,
        user_id: u64,
        session: &mut UserSession,
        text: &str,
    ) -> Result<Vec<Reply>, CoachError> {
        let text = text.trim();

        // Main-menu labels route first: "Weight progress" would otherwise
        // be swallowed by the weight-log phrase below.
        if session.state == SessionState::None {
            if let Some(cmd) = command_for_label(text) {
                return self.handle_command(user_id, session, cmd);
            }
        }

        // The weight-log phrase works everywhere, even mid-dialog.
        let lower = text.to_lowercase();
        if let Some(rest) = lower.strip_prefix("weight").or_else(|| lower.strip_prefix("вес")) {
            return self.log_weight(user_id, rest);
        }

        match session.state {
            SessionState::Gender
            | SessionState::Age
            | SessionState::Height
            | SessionState::WeightInitial
            | SessionState::Activity
            | SessionState::DietGoal => self.onboarding_step(user_id, session, text),

            SessionState::LoggingFood => {
                if session::is_done_token(text) {
                    self.finalize_food_log(user_id, session)
                } else {
                    session.food_log.push(text.to_string());
                    Ok(vec![Reply::text("Got it. Anything else?")])
                }
            }

            SessionState::AddingPreference => {
                session.state = SessionState::None;
                self.append_to_list(user_id, text, true)
            }
            SessionState::AddingExclusion => {
                session.state = SessionState::None;
                self.append_to_list(user_id, text, false)
            }

            SessionState::AwaitingFridgeInput => {
                // State resets regardless of generator success.
                session.state = SessionState::None;
                match self.generator.generate_recipe(text) {
                    Ok(recipe) => Ok(vec![Reply::text(format!(
                        "{}\n\n{}\n\nIngredients used:\n{}\n\nSteps:\n{}",
                        recipe.dish_name,
                        recipe.description,
                        recipe.ingredients_used.join(", "),
                        recipe.steps.join("\n"),
                    ))]),
                    Err(e) => {
                        log::warn!("recipe generation failed for {user_id}: {e}");
                        Ok(vec![Reply::text(
                            "Couldn't come up with a dish from that, please try again.",
                        )])
                    }
                }
            }

            SessionState::None => Ok(vec![Reply::text(
                "Unrecognized command. Use the menu buttons.",
            )]),
        }
    }

    fn onboarding_step(
        &self,
        user_id: u64,
        session: &mut UserSession,
        text: &str,
    ) -> Result<Vec<Reply>, CoachError> {
        let step = session::advance(session.state, &mut session.pending, text);
        session.state = step.next_state;

        if let Some(weight) = step.record_weight {
            self.ledger().set(user_id, Local::now().date_naive(), weight)?;
        }

        let mut reply = Reply::text(step.reply);
        if let Some(keyboard) = step.keyboard {
            reply = reply.with_menu(keyboard);
        }
        let mut replies = vec![reply];

        if let Some(profile) = step.committed_profile {
            self.profiles().put(user_id, &profile)?;
            self.scheduler.register_user(user_id);

            let weight = self.ledger().latest(user_id)?;
            if let Ok(target) = crate::nutrition::target(&profile, weight) {
                replies.push(Reply::text(targets_text(
                    &profile,
                    weight.unwrap_or_default(),
                    &target,
                )));
            }
            replies.push(
                Reply::text("You can now use the main features:").with_menu(main_keyboard()),
            );
        }

        Ok(replies)
    }

    fn log_weight(&self, user_id: u64, value_text: &str) -> Result<Vec<Reply>, CoachError> {
        match crate::domain::parse_weight_kg(value_text) {
            Some(weight) => {
                self.ledger()
                    .set(user_id, Local::now().date_naive(), weight)?;
                Ok(vec![Reply::text(format!("Weight saved: {weight} kg"))])
            }
            None => Ok(vec![Reply::text(
                "Wrong format. Example: weight 80.5",
            )]),
        }
    }

    fn finalize_food_log(
        &self,
        user_id: u64,
        session: &mut UserSession,
    ) -> Result<Vec<Reply>, CoachError> {
        session.state = SessionState::None;
        let items = std::mem::take(&mut session.food_log);

        if items.is_empty() {
            return Ok(vec![
                Reply::text("Nothing was logged.").with_menu(main_keyboard())
            ]);
        }

        let estimate = match self.generator.estimate_macros(&items) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("macro estimation failed for {user_id}: {e}");
                return Ok(vec![Reply::text(
                    "Couldn't estimate the macros, please try again.",
                )
                .with_menu(main_keyboard())]);
            }
        };

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let totals = session.daily_intake.entry(today).or_default();
        totals.add(&estimate);
        let totals = *totals;

        // Targets may be unavailable (e.g. no weight entry); show "?" then.
        let target = self
            .profiles()
            .get(user_id)?
            .and_then(|p| {
                let weight = self.ledger().latest(user_id).ok()?;
                crate::nutrition::target(&p, weight).ok()
            });
        let goal = |v: Option<u32>| v.map_or("?".to_string(), |v| v.to_string());
        let (tc, tp, tf, tcarb) = match target {
            Some(t) => (Some(t.calories), Some(t.protein_g), Some(t.fat_g), Some(t.carbs_g)),
            None => (None, None, None, None),
        };

        Ok(vec![Reply::text(format!(
            "This session: {} kcal, protein {} g, fat {} g, carbs {} g\n\n\
             Today so far:\n\
             Calories: {} / {}\n\
             Protein: {} / {} g\n\
             Fat: {} / {} g\n\
             Carbs: {} / {} g",
            estimate.calories,
            estimate.protein_g,
            estimate.fat_g,
            estimate.carbs_g,
            totals.calories,
            goal(tc),
            totals.protein_g,
            goal(tp),
            totals.fat_g,
            goal(tf),
            totals.carbs_g,
            goal(tcarb),
        ))
        .with_menu(main_keyboard())])
    }

    // === Preferences ===

    fn prefs_overview(&self, user_id: u64) -> Result<Vec<Reply>, CoachError> {
        let profile = self.require_profile(user_id)?;
        let join = |list: &[String]| {
            if list.is_empty() {
                "none yet".to_string()
            } else {
                list.join(", ")
            }
        };
        Ok(vec![Reply::text(format!(
            "Your preferences\n\nLiked foods: {}\nDisliked foods: {}",
            join(&profile.preferences),
            join(&profile.exclusions),
        ))
        .with_inline(vec![
            vec![
                Button::new("Add liked", ButtonAction::AddPreference),
                Button::new("Add disliked", ButtonAction::AddExclusion),
            ],
            vec![Button::new("Clear lists", ButtonAction::ClearPreferences)],
        ])])
    }

    fn append_to_list(
        &self,
        user_id: u64,
        food: &str,
        liked: bool,
    ) -> Result<Vec<Reply>, CoachError> {
        let mut profile = self.require_profile(user_id)?;
        let which = if liked {
            &mut profile.preferences
        } else {
            &mut profile.exclusions
        };
        which.push(food.to_string());
        self.profiles().put(user_id, &profile)?;

        let mut replies = vec![Reply::text(format!(
            "\"{food}\" added to your {} foods.",
            if liked { "liked" } else { "disliked" }
        ))];
        replies.extend(self.prefs_overview(user_id)?);
        Ok(replies)
    }

    // === Buttons ===

    fn handle_button(
        &self,
        user_id: u64,
        session: &mut UserSession,
        action: ButtonAction,
    ) -> Result<Vec<Reply>, CoachError> {
        match action {
            ButtonAction::GenerateMenu { days } => self.generate_menu(user_id, session, days),

            ButtonAction::Replace { day, meal } => {
                let profile = self.require_profile(user_id)?;
                let weight = self.ledger().latest(user_id)?;
                let target = crate::nutrition::target(&profile, weight)?;
                let plan = session.active_plan.as_mut().ok_or(CoachError::NoActivePlan)?;

                let replacement = plan::replace_meal(
                    plan,
                    day,
                    meal,
                    &*self.generator,
                    &profile,
                    &target,
                )?;
                Ok(vec![meal_reply(day, meal, &replacement)])
            }

            ButtonAction::Recipe { day, meal } => {
                let plan = session.active_plan.as_ref().ok_or(CoachError::NoActivePlan)?;
                let slot = plan::meal_at(plan, day, meal)?;
                Ok(vec![Reply::text(format!(
                    "Recipe for \"{}\":\n\n{}",
                    slot.name, slot.recipe_text
                ))])
            }

            ButtonAction::ShowShoppingList => {
                let plan = session.active_plan.as_ref().ok_or(CoachError::NoActivePlan)?;
                let mut text = String::from("Your consolidated shopping list:\n\n");
                for entry in &plan.shopping_list {
                    text.push_str(&format!("\u{2022} {entry}\n"));
                }
                Ok(vec![Reply::text(text)])
            }

            ButtonAction::AddPreference => {
                self.require_profile(user_id)?;
                session.state = SessionState::AddingPreference;
                Ok(vec![Reply::text("Which food should I add to your liked list?")])
            }
            ButtonAction::AddExclusion => {
                self.require_profile(user_id)?;
                session.state = SessionState::AddingExclusion;
                Ok(vec![Reply::text(
                    "Which food should I add to your disliked list?",
                )])
            }
            ButtonAction::ClearPreferences => {
                let mut profile = self.require_profile(user_id)?;
                profile.preferences.clear();
                profile.exclusions.clear();
                self.profiles().put(user_id, &profile)?;
                Ok(vec![Reply::text("Your preference lists are cleared.")])
            }
        }
    }

    // === Plan generation ===

    fn generate_menu(
        &self,
        user_id: u64,
        session: &mut UserSession,
        num_days: usize,
    ) -> Result<Vec<Reply>, CoachError> {
        if !matches!(num_days, 1 | 3 | 5 | 7) {
            return Ok(vec![Reply::text("Unsupported plan length.")]);
        }

        let profile = self.require_profile(user_id)?;
        let weight = self.ledger().latest(user_id)?;
        let target = crate::nutrition::target(&profile, weight)?;

        let plan = plan::generate(&*self.generator, &profile, &target, num_days)?;
        let replies = render_plan(&plan);
        // Replace the active plan only after successful generation.
        session.active_plan = Some(plan);
        Ok(replies)
    }

    fn require_profile(&self, user_id: u64) -> Result<Profile, CoachError> {
        self.profiles()
            .get(user_id)?
            .ok_or(CoachError::MissingProfile)
    }
}

// === Reply formatting ===

fn targets_text(profile: &Profile, weight_kg: f64, target: &NutritionTarget) -> String {
    format!(
        "Your current profile:\n\
         Gender: {:?}, age: {}, height: {} cm\n\
         Activity: {}, goal: {}\n\
         Latest weight: {} kg\n\n\
         Your daily weight-loss goal:\n\
         Calories: {} kcal, protein: {} g, fat: {} g, carbs: {} g",
        profile.gender,
        profile.age,
        profile.height_cm,
        profile.activity_level,
        profile.diet_goal.label(),
        weight_kg,
        target.calories,
        target.protein_g,
        target.fat_g,
        target.carbs_g,
    )
}

fn meal_reply(day_index: usize, meal_index: usize, meal: &Meal) -> Reply {
    Reply::text(format!(
        "{}\n{} kcal | P {} g | F {} g | C {} g",
        meal.name, meal.calories, meal.protein_g, meal.fat_g, meal.carbs_g
    ))
    .with_inline(vec![vec![
        Button::new(
            "Replace",
            ButtonAction::Replace {
                day: day_index,
                meal: meal_index,
            },
        ),
        Button::new(
            "Recipe",
            ButtonAction::Recipe {
                day: day_index,
                meal: meal_index,
            },
        ),
    ]])
}

fn render_plan(plan: &WeeklyPlan) -> Vec<Reply> {
    let mut replies = Vec::new();
    for (day_index, day) in plan.days.iter().enumerate() {
        let calories: u32 = day.meals.iter().map(|m| m.calories).sum();
        let protein: u32 = day.meals.iter().map(|m| m.protein_g).sum();
        let fat: u32 = day.meals.iter().map(|m| m.fat_g).sum();
        let carbs: u32 = day.meals.iter().map(|m| m.carbs_g).sum();
        replies.push(Reply::text(format!(
            "{}\nTotal: ~{} kcal | P {} g | F {} g | C {} g",
            day.day_label, calories, protein, fat, carbs
        )));
        for (meal_index, meal) in day.meals.iter().enumerate() {
            replies.push(meal_reply(day_index, meal_index, meal));
        }
    }
    replies.push(
        Reply::text("Menu is ready. Show the consolidated shopping list?").with_inline(vec![
            vec![Button::new("Shopping list", ButtonAction::ShowShoppingList)],
        ]),
    );
    replies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DietGoal;
    use crate::generator::SampleGenerator;
    use crate::store::MemoryStore;

    fn coach() -> Coach {
        Coach::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SampleGenerator::new()),
            Arc::new(ReminderScheduler::new()),
        )
    }

    fn send(coach: &Coach, user_id: u64, payload: EventPayload) -> Vec<Reply> {
        coach.handle_event(InboundEvent { user_id, payload })
    }

    fn text(coach: &Coach, user_id: u64, s: &str) -> Vec<Reply> {
        send(coach, user_id, EventPayload::Text(s.to_string()))
    }

    fn onboard(coach: &Coach, user_id: u64) {
        send(coach, user_id, EventPayload::Command(Command::Start));
        text(coach, user_id, "male");
        text(coach, user_id, "30");
        text(coach, user_id, "180");
        text(coach, user_id, "80");
        text(coach, user_id, "3");
        text(coach, user_id, DietGoal::Balanced.label());
    }

    #[test]
    fn test_first_contact_starts_onboarding() {
        let coach = coach();
        let replies = send(&coach, 1, EventPayload::Command(Command::Start));
        assert!(replies[0].text.contains("select your gender"));
    }

    #[test]
    fn test_onboarding_commits_profile_and_reminders() {
        let coach = coach();
        onboard(&coach, 1);

        let profile = coach.profiles().get(1).unwrap().expect("profile saved");
        assert_eq!(profile.age, 30);
        assert_eq!(coach.scheduler.trigger_count(1), 2);
        assert_eq!(coach.ledger().latest(1).unwrap(), Some(80.0));
    }

    #[test]
    fn test_onboarding_completion_reports_targets() {
        let coach = coach();
        send(&coach, 1, EventPayload::Command(Command::Start));
        text(&coach, 1, "male");
        text(&coach, 1, "30");
        text(&coach, 1, "180");
        text(&coach, 1, "80");
        text(&coach, 1, "3");
        let replies = text(&coach, 1, DietGoal::Balanced.label());
        // Commit reply, targets summary, main menu.
        assert!(replies.iter().any(|r| r.text.contains("2207")));
        assert!(replies.last().unwrap().menu_keyboard.is_some());
    }

    #[test]
    fn test_start_for_known_user_shows_menu() {
        let coach = coach();
        onboard(&coach, 1);
        let replies = send(&coach, 1, EventPayload::Command(Command::Start));
        assert!(replies[0].text.contains("Bot is active"));
        assert!(replies[0].menu_keyboard.is_some());
    }

    #[test]
    fn test_weight_phrase_russian_comma_decimal() {
        let coach = coach();
        let replies = text(&coach, 1, "вес 80,5");
        assert!(replies[0].text.contains("80.5"));
        assert_eq!(coach.ledger().latest(1).unwrap(), Some(80.5));

        // A second same-day entry overwrites.
        text(&coach, 1, "weight 79");
        assert_eq!(coach.ledger().latest(1).unwrap(), Some(79.0));
        assert_eq!(coach.ledger().history(1).unwrap().len(), 1);
    }

    #[test]
    fn test_weight_phrase_bad_value() {
        let coach = coach();
        let replies = text(&coach, 1, "weight lots");
        assert!(replies[0].text.contains("Wrong format"));
        assert_eq!(coach.ledger().latest(1).unwrap(), None);
    }

    #[test]
    fn test_menu_requires_profile() {
        let coach = coach();
        let replies = send(&coach, 1, EventPayload::Command(Command::DailyMenu));
        assert!(replies[0].text.contains("/start"));
    }

    #[test]
    fn test_daily_menu_and_shopping_list() {
        let coach = coach();
        onboard(&coach, 1);

        let replies = send(&coach, 1, EventPayload::Command(Command::DailyMenu));
        // Day header + 3 meals + shopping-list prompt.
        assert_eq!(replies.len(), 5);
        assert!(replies[1].inline_buttons[0]
            .iter()
            .any(|b| matches!(b.action, ButtonAction::Replace { .. })));

        let list = send(&coach, 1, EventPayload::Button(ButtonAction::ShowShoppingList));
        assert!(list[0].text.contains("g\n"));
    }

    #[test]
    fn test_replace_button_stale_index() {
        let coach = coach();
        onboard(&coach, 1);
        send(&coach, 1, EventPayload::Command(Command::DailyMenu));

        let replies = send(
            &coach,
            1,
            EventPayload::Button(ButtonAction::Replace { day: 2, meal: 0 }),
        );
        assert!(replies[0].text.contains("stale"));
    }

    #[test]
    fn test_replace_button_keeps_plan_shape() {
        let coach = coach();
        onboard(&coach, 1);
        send(&coach, 1, EventPayload::Command(Command::DailyMenu));

        send(
            &coach,
            1,
            EventPayload::Button(ButtonAction::Replace { day: 0, meal: 1 }),
        );
        let handle = coach.session_for(1);
        let session = handle.lock().unwrap();
        let plan = session.active_plan.as_ref().unwrap();
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.days[0].meals.len(), 3);
    }

    #[test]
    fn test_shopping_list_without_plan_is_stale_message() {
        let coach = coach();
        onboard(&coach, 1);
        let replies = send(&coach, 1, EventPayload::Button(ButtonAction::ShowShoppingList));
        assert!(replies[0].text.contains("stale"));
    }

    #[test]
    fn test_food_log_flow() {
        let coach = coach();
        onboard(&coach, 1);

        send(&coach, 1, EventPayload::Command(Command::LogFood));
        text(&coach, 1, "two eggs");
        text(&coach, 1, "a bowl of rice");
        let replies = text(&coach, 1, "Done");
        assert!(replies[0].text.contains("This session"));
        assert!(replies[0].text.contains("/ 2207"));
    }

    #[test]
    fn test_food_log_empty_finalize_is_noop() {
        let coach = coach();
        onboard(&coach, 1);
        send(&coach, 1, EventPayload::Command(Command::LogFood));
        let replies = text(&coach, 1, "done");
        assert!(replies[0].text.contains("Nothing was logged"));
    }

    #[test]
    fn test_food_log_accumulates_daily_total() {
        let coach = coach();
        onboard(&coach, 1);

        send(&coach, 1, EventPayload::Command(Command::LogFood));
        text(&coach, 1, "snack");
        text(&coach, 1, "done");

        send(&coach, 1, EventPayload::Command(Command::LogFood));
        text(&coach, 1, "snack");
        let replies = text(&coach, 1, "done");
        // Second session: day total doubles the single-session estimate.
        assert!(replies[0].text.contains("Calories: 600"));
    }

    #[test]
    fn test_preferences_add_and_clear() {
        let coach = coach();
        onboard(&coach, 1);

        send(&coach, 1, EventPayload::Button(ButtonAction::AddExclusion));
        text(&coach, 1, "salmon");
        let profile = coach.profiles().get(1).unwrap().unwrap();
        assert_eq!(profile.exclusions, vec!["salmon".to_string()]);

        send(&coach, 1, EventPayload::Button(ButtonAction::ClearPreferences));
        let profile = coach.profiles().get(1).unwrap().unwrap();
        assert!(profile.exclusions.is_empty());
    }

    #[test]
    fn test_fridge_flow_resets_state() {
        let coach = coach();
        onboard(&coach, 1);

        send(&coach, 1, EventPayload::Command(Command::Fridge));
        let replies = text(&coach, 1, "chicken, rice");
        assert!(replies[0].text.contains("Ingredients used"));

        // Dialog is over; plain text falls through to the fallback.
        let replies = text(&coach, 1, "chicken, rice");
        assert!(replies[0].text.contains("Unrecognized"));
    }

    #[test]
    fn test_menu_label_routes_like_command() {
        let coach = coach();
        onboard(&coach, 1);
        let replies = text(&coach, 1, "Weekly menu");
        assert!(replies[0].text.contains("how many days"));
    }

    #[test]
    fn test_every_menu_label_reaches_its_command() {
        // Fresh user per label: some labels open a dialog and would route
        // the next label's text into it.
        let coach = coach();
        for (i, label) in MENU_ROWS.iter().copied().flatten().enumerate() {
            let user = 100 + i as u64;
            onboard(&coach, user);
            let replies = text(&coach, user, label);
            assert!(!replies[0].text.contains("Wrong format"), "{label}");
            assert!(!replies[0].text.contains("Unrecognized"), "{label}");
        }
    }

    #[test]
    fn test_progress_label_shows_history() {
        let coach = coach();
        onboard(&coach, 1);
        // "Weight progress" starts with the weight-log trigger word; it must
        // still reach the progress command.
        let replies = text(&coach, 1, "Weight progress");
        assert!(replies[0].text.contains("Weight progress by day"));
        assert!(replies[0].text.contains("80 kg"));
    }

    #[test]
    fn test_unsupported_plan_length_rejected() {
        let coach = coach();
        onboard(&coach, 1);
        let replies = send(
            &coach,
            1,
            EventPayload::Button(ButtonAction::GenerateMenu { days: 4 }),
        );
        assert!(replies[0].text.contains("Unsupported"));
    }

    #[test]
    fn test_menu_requires_weight_entry() {
        // Profile exists but the ledger is empty: targets are unavailable.
        let coach = coach();
        coach
            .profiles()
            .put(
                9,
                &Profile {
                    gender: crate::domain::Gender::Male,
                    age: 30,
                    height_cm: 180,
                    activity_level: 3,
                    diet_goal: DietGoal::Balanced,
                    preferences: vec![],
                    exclusions: vec![],
                },
            )
            .unwrap();
        let replies = send(&coach, 9, EventPayload::Command(Command::DailyMenu));
        assert!(replies[0].text.contains("weight"));
    }
}
