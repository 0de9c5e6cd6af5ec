mod coach;
mod domain;
mod error;
mod generator;
mod nutrition;
mod outbound;
mod plan;
mod scheduler;
mod session;
mod store;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::Bot;
use tokio::sync::mpsc;

use crate::coach::Coach;
use crate::generator::SampleGenerator;
use crate::scheduler::ReminderScheduler;
use crate::store::{JsonFileStore, KvStore};

/// Personal nutrition coaching bot for Telegram.
#[derive(Parser, Debug)]
#[command(name = "nutricoach")]
#[command(about = "Telegram nutrition coach: profile onboarding, daily targets, meal plans")]
#[command(version)]
struct Args {
    /// Directory for profile and weight data.
    /// Can also be set via NUTRICOACH_DATA_DIR environment variable.
    #[arg(
        value_name = "DATA_DIR",
        env = "NUTRICOACH_DATA_DIR",
        default_value = "data"
    )]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let store: Arc<dyn KvStore> = Arc::new(
        JsonFileStore::new(&args.data_dir)
            .with_context(|| format!("Failed to open data directory: {}", args.data_dir.display()))?,
    );
    println!("Data directory: {}", args.data_dir.display());

    let scheduler = Arc::new(ReminderScheduler::new());
    let coach = Arc::new(Coach::new(
        store.clone(),
        Arc::new(SampleGenerator::new()),
        scheduler.clone(),
    ));

    // Bot token comes from TELOXIDE_TOKEN.
    let bot = Bot::from_env();

    let (reminder_tx, reminder_rx) = mpsc::channel(64);
    tokio::spawn(scheduler::run(scheduler, store, reminder_tx));
    tokio::spawn(telegram::deliver_reminders(bot.clone(), reminder_rx));

    println!("Bot started");
    telegram::start_bot(bot, coach).await;

    Ok(())
}
