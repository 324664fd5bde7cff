use teloxide::prelude::*;
use tracing::info;

use crate::state::AppState;

pub const NO_ACCESS_TEXT: &str = "Sorry, you do not have access!";

/// Replies with the no-access text and returns false when the chat is not the
/// configured one.
pub async fn check_authorized(bot: &Bot, state: &AppState, message: &Message) -> bool {
    if state.config.is_authorized_chat(message.chat.id.0) {
        return true;
    }

    info!(chat_id = message.chat.id.0, "Rejected message from unauthorized chat");
    let _ = bot.send_message(message.chat.id, NO_ACCESS_TEXT).await;
    false
}
