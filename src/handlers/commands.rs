use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, ReplyParameters};
use tracing::{error, info};

use crate::catalog::DEFAULT_IMAGE_COMMAND;
use crate::delivery::{
    deliver, deliver_start_image, start_chats, DeliveryContext, DeliveryReport, SEND_INTERVAL,
};
use crate::handlers::access::check_authorized;
use crate::history::clear_history;
use crate::outbound::TelegramOutbound;
use crate::state::AppState;
use crate::utils::timing::{CommandStatus, CommandTimer};

const GREETING_TEXT: &str = "Hi, I am AnimeBot!";
const TAGS_MODE_TEXT: &str = "tags_mode activated.";
const FULL_MODE_TEXT: &str = "full_mode activated.";
const CLEARED_HISTORY_TEXT: &str = "You have cleared the history.";

fn reply_keyboard<R: AsRef<[String]>>(rows: &[R]) -> KeyboardMarkup {
    let rows = rows
        .iter()
        .map(|row| {
            row.as_ref()
                .iter()
                .map(|label| KeyboardButton::new(label.clone()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

fn default_keyboard() -> KeyboardMarkup {
    reply_keyboard(&[vec![DEFAULT_IMAGE_COMMAND.to_string()]])
}

fn display_name(message: &Message) -> &str {
    message
        .chat
        .first_name()
        .or_else(|| message.from.as_ref().map(|user| user.first_name.as_str()))
        .unwrap_or("friend")
}

fn report_status(report: &DeliveryReport) -> CommandStatus {
    match (report.sent(), report.failed()) {
        (_, 0) => CommandStatus::Success,
        (0, _) => CommandStatus::Error,
        _ => CommandStatus::Partial,
    }
}

fn delivery_context<'a>(state: &'a AppState, outbound: &'a TelegramOutbound) -> DeliveryContext<'a> {
    DeliveryContext {
        catalog: state.catalog.as_ref(),
        source: &state.provider,
        formatter: &state.formatter,
        outbound,
        buttons: state.inline_buttons(),
        retry: state.config.retry_policy(),
        send_interval: SEND_INTERVAL,
    }
}

pub async fn start_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    mut timer: CommandTimer,
) -> Result<()> {
    bot.send_message(
        message.chat.id,
        format!("Hi, {}. Look what I found.", display_name(&message)),
    )
    .reply_markup(default_keyboard())
    .await?;

    let chats = start_chats(message.chat.id, state.config.group_chat_id);
    let outbound = TelegramOutbound::new(bot);
    let ctx = delivery_context(&state, &outbound);

    match deliver_start_image(&ctx, &chats).await {
        Ok(report) => {
            let status = match report.delivered.len() {
                0 => CommandStatus::Error,
                sent if sent == chats.len() => CommandStatus::Success,
                _ => CommandStatus::Partial,
            };
            timer.complete(
                status,
                Some(format!(
                    "delivered={}/{} mode={:?}",
                    report.delivered.len(),
                    chats.len(),
                    report.mode
                )),
            );
        }
        Err(err) => {
            error!(chat_id = message.chat.id.0, "Start image failed: {err}");
            timer.complete(CommandStatus::Error, Some(err.to_string()));
        }
    }
    Ok(())
}

pub async fn tags_mode_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    mut timer: CommandTimer,
) -> Result<()> {
    bot.send_message(message.chat.id, TAGS_MODE_TEXT)
        .reply_markup(reply_keyboard(state.catalog.tags_keyboard()))
        .await?;
    timer.complete(CommandStatus::Success, None);
    Ok(())
}

pub async fn full_mode_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    mut timer: CommandTimer,
) -> Result<()> {
    if !check_authorized(&bot, &state, &message).await {
        timer.complete(CommandStatus::Error, Some("unauthorized".to_string()));
        return Ok(());
    }
    bot.send_message(message.chat.id, FULL_MODE_TEXT)
        .reply_markup(reply_keyboard(state.catalog.full_keyboard()))
        .await?;
    timer.complete(CommandStatus::Success, None);
    Ok(())
}

pub async fn clear_history_handler(
    bot: Bot,
    message: Message,
    mut timer: CommandTimer,
) -> Result<()> {
    bot.send_message(message.chat.id, CLEARED_HISTORY_TEXT)
        .reply_markup(default_keyboard())
        .await?;

    let outbound = TelegramOutbound::new(bot);
    let deleted = clear_history(&outbound, message.chat.id, message.id).await;
    info!(chat_id = message.chat.id.0, deleted, "History cleared");
    timer.complete(CommandStatus::Success, Some(format!("deleted={deleted}")));
    Ok(())
}

pub async fn greeting_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    mut timer: CommandTimer,
) -> Result<()> {
    if !check_authorized(&bot, &state, &message).await {
        timer.complete(CommandStatus::Error, Some("unauthorized".to_string()));
        return Ok(());
    }
    bot.send_message(message.chat.id, GREETING_TEXT)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    timer.complete(CommandStatus::Success, None);
    Ok(())
}

pub async fn images_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    command: String,
    mut timer: CommandTimer,
) -> Result<()> {
    let outbound = TelegramOutbound::new(bot);
    let ctx = delivery_context(&state, &outbound);

    match deliver(&ctx, &command, message.chat.id).await {
        Ok(report) => timer.complete(
            report_status(&report),
            Some(format!(
                "command={} sent={} failed={}",
                report.command,
                report.sent(),
                report.failed()
            )),
        ),
        Err(err) => timer.complete(CommandStatus::Error, Some(err.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::BotVersion;
    use crate::delivery::{DeliveryAttempt, DeliveryOutcome};

    fn report(outcomes: &[DeliveryOutcome]) -> DeliveryReport {
        let catalog = Catalog::for_version(BotVersion::Lite);
        let target = catalog.target("/maid").cloned().unwrap();
        DeliveryReport {
            command: "/maid".to_string(),
            attempts: outcomes
                .iter()
                .enumerate()
                .map(|(index, outcome)| DeliveryAttempt {
                    target: target.clone(),
                    sequence_number: index as u32 + 1,
                    result: None,
                    mode: None,
                    outcome: *outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn status_reflects_report() {
        use DeliveryOutcome::{Failed, Sent};
        assert_eq!(report_status(&report(&[Sent, Sent])), CommandStatus::Success);
        assert_eq!(report_status(&report(&[Sent, Failed])), CommandStatus::Partial);
        assert_eq!(report_status(&report(&[Failed, Failed])), CommandStatus::Error);
    }

    #[test]
    fn reply_keyboard_keeps_layout() {
        let catalog = Catalog::for_version(BotVersion::Lite);
        let markup = reply_keyboard(catalog.tags_keyboard());
        assert_eq!(markup.keyboard.len(), catalog.tags_keyboard().len());
        assert_eq!(markup.keyboard[0][0].text, catalog.tags_keyboard()[0][0]);
    }
}
