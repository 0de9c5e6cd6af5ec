//! Recurring reminders: hydration nudges and a daily weigh-in check.
//!
//! Every user with a committed profile gets exactly two named triggers,
//! registered idempotently. The due-computation is pure and driven by an
//! injected "now"; a thin tokio loop polls it and hands messages to the
//! transport.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveTime, Timelike};

use crate::store::WeightLedger;

/// Interval between hydration reminders.
pub const HYDRATION_INTERVAL_HOURS: i64 = 2;

/// Local time of the daily weigh-in check.
pub fn daily_check_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

/// The two trigger kinds a registered user carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Hydration,
    DailyWeighIn,
}

#[derive(Debug)]
struct TriggerState {
    last_fired: Option<DateTime<Local>>,
}

/// A reminder message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub user_id: u64,
    pub text: String,
}

/// Per-user trigger registry.
#[derive(Default)]
pub struct ReminderScheduler {
    triggers: Mutex<HashMap<(u64, TriggerKind), TriggerState>>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers both triggers for a user. Re-registering an existing named
    /// trigger is a no-op: its state (including last-fired) is kept.
    pub fn register_user(&self, user_id: u64) {
        self.register_user_at(user_id, Local::now());
    }

    /// Hydration counts its interval from the registration time; the daily
    /// weigh-in check may still fire on the registration day.
    fn register_user_at(&self, user_id: u64, now: DateTime<Local>) {
        let mut triggers = self.triggers.lock().unwrap();
        triggers
            .entry((user_id, TriggerKind::Hydration))
            .or_insert(TriggerState {
                last_fired: Some(now),
            });
        triggers
            .entry((user_id, TriggerKind::DailyWeighIn))
            .or_insert(TriggerState { last_fired: None });
    }

    /// Number of registered triggers for a user.
    pub fn trigger_count(&self, user_id: u64) -> usize {
        self.triggers
            .lock()
            .unwrap()
            .keys()
            .filter(|(u, _)| *u == user_id)
            .count()
    }

    /// Computes and marks reminders due at `now`.
    ///
    /// Hydration fires every two hours. The daily weigh-in trigger fires at
    /// most once per day at or after the configured time, and only produces
    /// a message when the ledger has no entry for the current date.
    pub fn poll(&self, now: DateTime<Local>, ledger: &WeightLedger<'_>) -> Vec<Reminder> {
        let mut due = Vec::new();
        let mut triggers = self.triggers.lock().unwrap();

        for ((user_id, kind), state) in triggers.iter_mut() {
            match kind {
                TriggerKind::Hydration => {
                    let fire = match state.last_fired {
                        None => true,
                        Some(last) => now - last >= Duration::hours(HYDRATION_INTERVAL_HOURS),
                    };
                    if fire {
                        state.last_fired = Some(now);
                        due.push(Reminder {
                            user_id: *user_id,
                            text: "Time for a glass of water!".to_string(),
                        });
                    }
                }
                TriggerKind::DailyWeighIn => {
                    let at_or_past = now.time().hour() * 60 + now.time().minute()
                        >= daily_check_time().hour() * 60 + daily_check_time().minute();
                    let already_today = state
                        .last_fired
                        .is_some_and(|last| last.date_naive() == now.date_naive());
                    if at_or_past && !already_today {
                        state.last_fired = Some(now);
                        // Conditional: remind only when today has no entry.
                        match ledger.has_entry(*user_id, now.date_naive()) {
                            Ok(false) => due.push(Reminder {
                                user_id: *user_id,
                                text: "You haven't logged your weight today. \
                                       Send e.g. \"weight 80.5\"."
                                    .to_string(),
                            }),
                            Ok(true) => {}
                            Err(e) => log::warn!("weigh-in check failed for {user_id}: {e}"),
                        }
                    }
                }
            }
        }

        due
    }
}

/// Polls the scheduler once a minute, forwarding due reminders.
pub async fn run(
    scheduler: std::sync::Arc<ReminderScheduler>,
    store: std::sync::Arc<dyn crate::store::KvStore>,
    tx: tokio::sync::mpsc::Sender<Reminder>,
) {
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        tick.tick().await;
        let ledger = WeightLedger::new(&*store);
        for reminder in scheduler.poll(Local::now(), &ledger) {
            if tx.send(reminder).await.is_err() {
                log::warn!("reminder channel closed, stopping scheduler loop");
                return;
            }
        }
    }
}
