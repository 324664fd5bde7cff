//! Fetch → size check → send cycle for image commands and the /start photo.

pub mod buttons;
pub mod caption;

use std::time::Duration;

use teloxide::types::{ChatId, InlineKeyboardMarkup};
use teloxide::RequestError;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::catalog::{Catalog, CommandTarget, DEFAULT_IMAGE_COMMAND};
use crate::media::{BaselineImage, FormatError, ImageFormatter};
use crate::outbound::{Outbound, OutboundPhoto};
use crate::provider::{fetch_with_retry, ImageResult, ImageSource, ProviderError, RetryPolicy};
use buttons::{ButtonPayload, ButtonStore};
use caption::ImageCaption;

pub const IMAGES_PER_COMMAND: u32 = 5;
pub const SEND_INTERVAL: Duration = Duration::from_millis(200);
/// Telegram refuses to fetch photos of this size or larger by URL.
pub const RESIZE_THRESHOLD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
#[error("unknown image command: {0}")]
pub struct UnknownCommandError(pub String);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("invalid image url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("telegram rejected the photo: {0}")]
    Send(#[from] RequestError),
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommandError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Direct,
    Resized,
}

impl DeliveryMode {
    pub fn for_size(byte_size: u64) -> Self {
        if byte_size < RESIZE_THRESHOLD_BYTES {
            DeliveryMode::Direct
        } else {
            DeliveryMode::Resized
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub target: CommandTarget,
    pub sequence_number: u32,
    pub result: Option<ImageResult>,
    pub mode: Option<DeliveryMode>,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub command: String,
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    pub fn sent(&self) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| attempt.outcome == DeliveryOutcome::Sent)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.sent()
    }
}

pub struct DeliveryContext<'a> {
    pub catalog: &'a Catalog,
    pub source: &'a dyn ImageSource,
    pub formatter: &'a dyn ImageFormatter,
    pub outbound: &'a dyn Outbound,
    /// Attach Info/Download buttons when set.
    pub buttons: Option<&'a ButtonStore>,
    pub retry: RetryPolicy,
    pub send_interval: Duration,
}

/// Sends up to [`IMAGES_PER_COMMAND`] images for `command` to `chat_id`.
///
/// A failed slot is logged and skipped, so the report may hold fewer sent images.
pub async fn deliver(
    ctx: &DeliveryContext<'_>,
    command: &str,
    chat_id: ChatId,
) -> Result<DeliveryReport, UnknownCommandError> {
    let Some(target) = ctx.catalog.target(command) else {
        error!(command, chat_id = chat_id.0, "No search target for image command");
        return Err(UnknownCommandError(command.to_string()));
    };

    let mut report = DeliveryReport {
        command: command.to_string(),
        attempts: Vec::with_capacity(IMAGES_PER_COMMAND as usize),
    };

    for sequence_number in 1..=IMAGES_PER_COMMAND {
        if sequence_number > 1 {
            tokio::time::sleep(ctx.send_interval).await;
        }

        let image = match fetch_with_retry(ctx.source, &target.search_url, &ctx.retry).await {
            Ok(image) => image,
            Err(err) => {
                error!(
                    command,
                    sequence_number,
                    url = %target.search_url,
                    "Image delivery attempt failed: {}",
                    DeliveryError::from(err)
                );
                report.attempts.push(DeliveryAttempt {
                    target: target.clone(),
                    sequence_number,
                    result: None,
                    mode: None,
                    outcome: DeliveryOutcome::Failed,
                });
                continue;
            }
        };

        let (mode, outcome) = match send_image(ctx, target, sequence_number, chat_id, &image).await
        {
            Ok(mode) => (Some(mode), DeliveryOutcome::Sent),
            Err(err) => {
                error!(
                    command,
                    sequence_number,
                    url = %image.source_url,
                    "Image delivery attempt failed: {err}"
                );
                (None, DeliveryOutcome::Failed)
            }
        };
        report.attempts.push(DeliveryAttempt {
            target: target.clone(),
            sequence_number,
            result: Some(image),
            mode,
            outcome,
        });
    }

    info!(
        command = %report.command,
        chat_id = chat_id.0,
        sent = report.sent(),
        failed = report.failed(),
        "Image command finished"
    );
    Ok(report)
}

/// Registers the Info/Download payload when inline controls are on.
fn register_buttons<'s>(
    store: Option<&'s ButtonStore>,
    payload: ButtonPayload,
) -> Option<(&'s ButtonStore, u64, InlineKeyboardMarkup)> {
    store.map(|store| {
        let id = store.register(payload.clone());
        (store, id, buttons::keyboard(id, &payload))
    })
}

/// Photo handed to the chat and, for re-encoded images, the file backing it.
/// The file is deleted once the returned [`BaselineImage`] is dropped.
async fn prepare_photo(
    ctx: &DeliveryContext<'_>,
    image: &ImageResult,
    mode: DeliveryMode,
) -> Result<(OutboundPhoto, Option<BaselineImage>), DeliveryError> {
    match mode {
        DeliveryMode::Direct => {
            let url = Url::parse(&image.source_url).map_err(|source| DeliveryError::InvalidUrl {
                url: image.source_url.clone(),
                source,
            })?;
            Ok((OutboundPhoto::Url(url), None))
        }
        DeliveryMode::Resized => {
            debug!(url = %image.source_url, byte_size = image.byte_size, "Large file, re-encoding before upload");
            let baseline = ctx.formatter.materialize(&image.source_url).await?;
            Ok((
                OutboundPhoto::File(baseline.path().to_path_buf()),
                Some(baseline),
            ))
        }
    }
}

async fn send_image(
    ctx: &DeliveryContext<'_>,
    target: &CommandTarget,
    sequence_number: u32,
    chat_id: ChatId,
    image: &ImageResult,
) -> Result<DeliveryMode, DeliveryError> {
    let mode = DeliveryMode::for_size(image.byte_size);
    let resized = mode == DeliveryMode::Resized;
    let caption = ImageCaption::new(&target.display_name, sequence_number, image);

    let registered = register_buttons(
        ctx.buttons,
        ButtonPayload {
            caption: Some(caption.full(resized)),
            url: image.source_url.clone(),
        },
    );
    let photo_caption = match registered {
        Some(_) => caption.headline(resized),
        None => caption.full(resized),
    };
    let keyboard = registered.as_ref().map(|(_, _, keyboard)| keyboard.clone());

    let sent = async {
        let (photo, _baseline) = prepare_photo(ctx, image, mode).await?;
        ctx.outbound
            .send_photo(chat_id, photo, Some(photo_caption), keyboard)
            .await?;
        Ok::<_, DeliveryError>(())
    }
    .await;

    if sent.is_err() {
        if let Some((store, id, _)) = registered {
            store.remove(id);
        }
    }
    sent.map(|()| mode)
}

#[derive(Debug, Clone)]
pub struct StartReport {
    pub mode: DeliveryMode,
    /// Chats that accepted the photo, in send order.
    pub delivered: Vec<ChatId>,
}

/// The requesting chat, then the group chat unless both are the same chat.
pub fn start_chats(requesting: ChatId, group_chat_id: Option<i64>) -> Vec<ChatId> {
    let mut chats = vec![requesting];
    if let Some(group_chat_id) = group_chat_id {
        if group_chat_id != requesting.0 {
            chats.push(ChatId(group_chat_id));
        }
    }
    chats
}

/// Sends one image of [`DEFAULT_IMAGE_COMMAND`] to every chat in `chats`. Large
/// images are re-encoded once and the same file is uploaded to each chat.
pub async fn deliver_start_image(
    ctx: &DeliveryContext<'_>,
    chats: &[ChatId],
) -> Result<StartReport, DeliveryError> {
    let target = ctx
        .catalog
        .target(DEFAULT_IMAGE_COMMAND)
        .ok_or_else(|| UnknownCommandError(DEFAULT_IMAGE_COMMAND.to_string()))?;
    let image = fetch_with_retry(ctx.source, &target.search_url, &ctx.retry).await?;
    let mode = DeliveryMode::for_size(image.byte_size);

    let registered = register_buttons(
        ctx.buttons,
        ButtonPayload {
            caption: None,
            url: image.source_url.clone(),
        },
    );
    let keyboard = registered.as_ref().map(|(_, _, keyboard)| keyboard.clone());

    let (photo, baseline) = match prepare_photo(ctx, &image, mode).await {
        Ok(prepared) => prepared,
        Err(err) => {
            if let Some((store, id, _)) = registered {
                store.remove(id);
            }
            return Err(err);
        }
    };

    let mut delivered = Vec::with_capacity(chats.len());
    for &chat_id in chats {
        match ctx
            .outbound
            .send_photo(chat_id, photo.clone(), None, keyboard.clone())
            .await
        {
            Ok(_) => delivered.push(chat_id),
            Err(err) => {
                warn!(chat_id = chat_id.0, url = %image.source_url, "Failed to send start photo: {err}");
            }
        }
    }
    drop(baseline);

    if delivered.is_empty() {
        if let Some((store, id, _)) = registered {
            store.remove(id);
        }
    }
    info!(
        url = %image.source_url,
        delivered = delivered.len(),
        chats = chats.len(),
        "Start image finished"
    );
    Ok(StartReport {
        mode,
        delivered,
    })
}
