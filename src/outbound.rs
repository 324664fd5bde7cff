use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, MessageId};
use teloxide::RequestError;
use tracing::warn;
use url::Url;

const TELEGRAM_RETRY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPhoto {
    /// Telegram fetches the photo itself.
    Url(Url),
    /// Photo is uploaded from a local file.
    File(PathBuf),
}

impl OutboundPhoto {
    fn to_input_file(&self) -> InputFile {
        match self {
            OutboundPhoto::Url(url) => InputFile::url(url.clone()),
            OutboundPhoto::File(path) => InputFile::file(path.clone()),
        }
    }
}

/// Chat operations the delivery flow needs from the messaging platform.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutboundPhoto,
        caption: Option<String>,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, RequestError>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), RequestError>;
}

fn telegram_retryable_error(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Network(_) | RequestError::RetryAfter(_) | RequestError::Io(_)
    )
}

#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutboundPhoto,
        caption: Option<String>,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, RequestError> {
        let mut delay = Duration::from_secs_f32(1.5);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.bot.send_photo(chat_id, photo.to_input_file());
            if let Some(caption) = &caption {
                request = request.caption(caption.clone());
            }
            if let Some(keyboard) = &keyboard {
                request = request.reply_markup(keyboard.clone());
            }

            let err = match request.await {
                Ok(message) => return Ok(message.id),
                Err(err) => err,
            };
            if !telegram_retryable_error(&err) || attempt >= TELEGRAM_RETRY_ATTEMPTS {
                return Err(err);
            }
            warn!("send_photo attempt {attempt} failed: {err}");
            if let RequestError::RetryAfter(wait) = err {
                tokio::time::sleep(wait.duration()).await;
            } else {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), RequestError> {
        self.bot.delete_message(chat_id, message_id).await?;
        Ok(())
    }
}
