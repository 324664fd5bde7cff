use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile};
use tracing::{info, warn};
use url::Url;

use crate::delivery::buttons::{keyboard, ButtonAction, ButtonPayload, ButtonStore};
use crate::state::AppState;

const EXPIRED_BUTTON_TEXT: &str = "This button has expired.";

#[derive(Debug)]
pub enum ButtonResponse {
    /// Only the press itself is acknowledged.
    Acknowledge,
    Expired,
    ExpandCaption {
        caption: String,
        keyboard: InlineKeyboardMarkup,
    },
    SendDocument(Url),
}

/// Decides what a press on an Info or Download button does.
pub fn resolve_button(store: &ButtonStore, data: Option<&str>) -> ButtonResponse {
    let Some(action) = data.and_then(ButtonAction::parse) else {
        return ButtonResponse::Acknowledge;
    };
    let Some(payload) = store.get(action.id()) else {
        info!(button_id = action.id(), "Callback for evicted button");
        return ButtonResponse::Expired;
    };

    match action {
        ButtonAction::Info(id) => {
            let Some(caption) = payload.caption else {
                return ButtonResponse::Acknowledge;
            };
            // the caption is now fully shown, only Download remains useful
            let remaining = ButtonPayload {
                caption: None,
                url: payload.url,
            };
            ButtonResponse::ExpandCaption {
                caption,
                keyboard: keyboard(id, &remaining),
            }
        }
        ButtonAction::Download(_) => match Url::parse(&payload.url) {
            Ok(url) => ButtonResponse::SendDocument(url),
            Err(err) => {
                warn!(url = %payload.url, "Stored image url is invalid: {err}");
                ButtonResponse::Acknowledge
            }
        },
    }
}

/// Handles the Info and Download buttons attached under delivered photos.
pub async fn button_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let response = resolve_button(&state.buttons, query.data.as_deref());

    let mut answer = bot.answer_callback_query(query.id.clone());
    if matches!(response, ButtonResponse::Expired) {
        answer = answer.text(EXPIRED_BUTTON_TEXT);
    }
    answer.await?;

    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;

    match response {
        ButtonResponse::ExpandCaption { caption, keyboard } => {
            if let Err(err) = bot
                .edit_message_caption(chat_id, message.id())
                .caption(caption)
                .reply_markup(keyboard)
                .await
            {
                warn!(chat_id = chat_id.0, "Failed to expand photo caption: {err}");
            }
        }
        ButtonResponse::SendDocument(url) => {
            if let Err(err) = bot.send_document(chat_id, InputFile::url(url.clone())).await {
                warn!(chat_id = chat_id.0, url = %url, "Failed to send source image: {err}");
            }
        }
        ButtonResponse::Acknowledge | ButtonResponse::Expired => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_URL: &str = "https://cdn.waifu.im/7581.jpg";

    fn store_with(caption: Option<&str>, url: &str) -> (ButtonStore, u64) {
        let store = ButtonStore::new(4);
        let id = store.register(ButtonPayload {
            caption: caption.map(str::to_string),
            url: url.to_string(),
        });
        (store, id)
    }

    #[test]
    fn info_expands_caption_and_keeps_download() {
        let (store, id) = store_with(Some("Maid №1 #MAID (2400x3600 pix, 1.0 Mb)"), IMAGE_URL);

        let response = resolve_button(&store, Some(format!("info:{id}").as_str()));

        let (caption, keyboard) = match response {
            ButtonResponse::ExpandCaption { caption, keyboard } => (caption, keyboard),
            other => panic!("unexpected response: {other:?}"),
        };
        assert_eq!(caption, "Maid №1 #MAID (2400x3600 pix, 1.0 Mb)");
        let buttons = &keyboard.inline_keyboard[0];
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].text, "Download");
    }

    #[test]
    fn info_without_caption_is_only_acknowledged() {
        let (store, id) = store_with(None, IMAGE_URL);

        let response = resolve_button(&store, Some(format!("info:{id}").as_str()));

        assert!(matches!(response, ButtonResponse::Acknowledge));
    }

    #[test]
    fn download_sends_stored_url() {
        let (store, id) = store_with(None, IMAGE_URL);

        let response = resolve_button(&store, Some(format!("download:{id}").as_str()));

        let url = match response {
            ButtonResponse::SendDocument(url) => url,
            other => panic!("unexpected response: {other:?}"),
        };
        assert_eq!(url.as_str(), IMAGE_URL);
    }

    #[test]
    fn download_with_invalid_url_is_only_acknowledged() {
        let (store, id) = store_with(None, "not a url");

        let response = resolve_button(&store, Some(format!("download:{id}").as_str()));

        assert!(matches!(response, ButtonResponse::Acknowledge));
    }

    #[test]
    fn evicted_button_has_expired() {
        let store = ButtonStore::new(1);
        let evicted = store.register(ButtonPayload {
            caption: None,
            url: IMAGE_URL.to_string(),
        });
        store.register(ButtonPayload {
            caption: None,
            url: IMAGE_URL.to_string(),
        });

        let response = resolve_button(&store, Some(format!("download:{evicted}").as_str()));

        assert!(matches!(response, ButtonResponse::Expired));
    }

    #[test]
    fn unrelated_data_is_only_acknowledged() {
        let (store, _) = store_with(None, IMAGE_URL);

        assert!(matches!(
            resolve_button(&store, Some("image_res:2K")),
            ButtonResponse::Acknowledge
        ));
        assert!(matches!(
            resolve_button(&store, None),
            ButtonResponse::Acknowledge
        ));
    }
}
