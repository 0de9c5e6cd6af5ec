//! Telegram transport: teloxide wiring around the coach.
//!
//! This layer only translates: updates become `InboundEvent`s, the coach's
//! `Reply` values become `send_message` calls. All decisions live in the
//! coach, which keeps this file free of business logic and the coach free
//! of Telegram types.

use std::sync::Arc;

use teloxide::{
    dispatching::UpdateFilterExt,
    dptree,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup},
    utils::command::BotCommands,
};
use tokio::sync::mpsc;

use crate::coach::{Coach, EventPayload, InboundEvent};
use crate::outbound::{ButtonAction, Reply};
use crate::scheduler::Reminder;

pub async fn start_bot(bot: Bot, coach: Arc<Coach>) {
    Dispatcher::builder(
        bot,
        dptree::entry()
            .branch(
                Update::filter_message()
                    .branch(
                        dptree::entry()
                            .filter_command::<Command>()
                            .endpoint(handle_command),
                    )
                    .branch(
                        dptree::filter(|msg: Message| msg.text().is_some())
                            .endpoint(handle_text),
                    ),
            )
            .branch(Update::filter_callback_query().endpoint(handle_callback)),
    )
    .dependencies(dptree::deps![coach])
    .build()
    .dispatch()
    .await;
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "snake_case",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "set up your profile or show the menu.")]
    Start,
    #[command(description = "generate a menu for today.")]
    DailyMenu,
    #[command(description = "generate a menu for several days.")]
    WeeklyMenu,
    #[command(description = "show your daily calorie and macro goal.")]
    Targets,
    #[command(description = "log what you ate.")]
    LogFood,
    #[command(description = "show your weight history.")]
    Progress,
    #[command(description = "manage liked and disliked foods.")]
    Preferences,
    #[command(description = "suggest a dish from what you have.")]
    Fridge,
}

impl From<Command> for crate::coach::Command {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => crate::coach::Command::Start,
            Command::DailyMenu => crate::coach::Command::DailyMenu,
            Command::WeeklyMenu => crate::coach::Command::WeeklyMenu,
            Command::Targets => crate::coach::Command::Targets,
            Command::LogFood => crate::coach::Command::LogFood,
            Command::Progress => crate::coach::Command::Progress,
            Command::Preferences => crate::coach::Command::Preferences,
            Command::Fridge => crate::coach::Command::Fridge,
        }
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    coach: Arc<Coach>,
) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let replies = coach.handle_event(InboundEvent {
        user_id: user.id.0,
        payload: EventPayload::Command(cmd.into()),
    });
    deliver(&bot, msg.chat.id, replies).await
}

async fn handle_text(bot: Bot, msg: Message, coach: Arc<Coach>) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let replies = coach.handle_event(InboundEvent {
        user_id: user.id.0,
        payload: EventPayload::Text(text.to_string()),
    });
    deliver(&bot, msg.chat.id, replies).await
}

async fn handle_callback(bot: Bot, q: CallbackQuery, coach: Arc<Coach>) -> ResponseResult<()> {
    // Stop the client-side spinner whatever happens next.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = ButtonAction::parse(data) else {
        log::warn!("unparseable callback data from {}: {data:?}", q.from.id);
        return Ok(());
    };

    let replies = coach.handle_event(InboundEvent {
        user_id: q.from.id.0,
        payload: EventPayload::Button(action),
    });
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64));
    deliver(&bot, chat_id, replies).await
}

/// Sends the coach's replies in order, rendering button sets as Telegram
/// markup. Inline buttons win when a reply carries both kinds.
async fn deliver(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> ResponseResult<()> {
    for reply in replies {
        let request = bot.send_message(chat_id, reply.text);
        if !reply.inline_buttons.is_empty() {
            let rows = reply.inline_buttons.into_iter().map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.action.to_string()))
                    .collect::<Vec<_>>()
            });
            request.reply_markup(InlineKeyboardMarkup::new(rows)).await?;
        } else if let Some(menu) = reply.menu_keyboard {
            let rows = menu
                .into_iter()
                .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>());
            request
                .reply_markup(KeyboardMarkup::new(rows).resize_keyboard())
                .await?;
        } else {
            request.await?;
        }
    }
    Ok(())
}

/// Forwards scheduler reminders to their users. Runs until the channel
/// closes; a failed send is logged and skipped, never retried.
pub async fn deliver_reminders(bot: Bot, mut rx: mpsc::Receiver<Reminder>) {
    while let Some(reminder) = rx.recv().await {
        let chat_id = ChatId(reminder.user_id as i64);
        if let Err(e) = bot.send_message(chat_id, reminder.text).await {
            log::warn!("failed to deliver reminder to {}: {e}", reminder.user_id);
        }
    }
}
