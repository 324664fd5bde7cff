use teloxide::types::{ChatId, MessageId};
use tracing::info;

use crate::outbound::Outbound;

/// Deletes messages from `start` downwards, stopping at the first id that cannot be
/// deleted. Message id 1 is never touched. Returns how many messages were removed.
pub async fn clear_history(outbound: &dyn Outbound, chat_id: ChatId, start: MessageId) -> usize {
    let mut message_id = start.0;
    let mut deleted = 0;
    while message_id > 1 {
        if let Err(err) = outbound.delete_message(chat_id, MessageId(message_id)).await {
            info!(
                chat_id = chat_id.0,
                message_id, "Message does not exist, history clear stopped: {err}"
            );
            break;
        }
        deleted += 1;
        message_id -= 1;
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingOutbound;

    #[tokio::test]
    async fn deletes_down_to_two() {
        let outbound = RecordingOutbound::new();

        let deleted = clear_history(&outbound, ChatId(1), MessageId(5)).await;

        assert_eq!(deleted, 4);
        assert_eq!(outbound.delete_attempts(), vec![5, 4, 3, 2]);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let outbound = RecordingOutbound::new().missing_message(3);

        let deleted = clear_history(&outbound, ChatId(1), MessageId(5)).await;

        assert_eq!(deleted, 2);
        assert_eq!(outbound.delete_attempts(), vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn nothing_to_do_for_first_message() {
        let outbound = RecordingOutbound::new();

        assert_eq!(clear_history(&outbound, ChatId(1), MessageId(1)).await, 0);
        assert!(outbound.delete_attempts().is_empty());
    }
}
