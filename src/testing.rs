//! In-memory fakes for the provider, formatter and chat seams.

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};
use teloxide::{ApiError, RequestError};
use tempfile::TempDir;

use crate::media::{BaselineImage, FormatError, ImageFormatter};
use crate::outbound::{Outbound, OutboundPhoto};
use crate::provider::{ImageResult, ImageSource, ProviderError};

pub fn sample_image(byte_size: u64) -> ImageResult {
    ImageResult {
        source_url: "https://cdn.waifu.im/7581.jpg".to_string(),
        byte_size,
        width: 2400,
        height: 3600,
        tags: vec!["maid".to_string(), "smile".to_string()],
    }
}

pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<ImageResult, ProviderError>>>,
    fallback: Option<ImageResult>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// Replays `script`, then answers with an empty result.
    pub fn new(script: Vec<Result<ImageResult, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(image: ImageResult) -> Self {
        Self::new(Vec::new()).with_fallback(image)
    }

    pub fn with_fallback(mut self, image: ImageResult) -> Self {
        self.fallback = Some(image);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for ScriptedSource {
    async fn fetch_random_image(&self, search_url: &str) -> Result<ImageResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(image)) => Ok(image.clone()),
            (None, None) => Err(ProviderError::Empty {
                url: search_url.to_string(),
            }),
        }
    }
}

pub struct FakeFormatter {
    dir: TempDir,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeFormatter {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining_files(&self) -> usize {
        fs::read_dir(self.dir.path()).expect("read temp dir").count()
    }
}

#[async_trait]
impl ImageFormatter for FakeFormatter {
    async fn materialize(&self, source_url: &str) -> Result<BaselineImage, FormatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FormatError::Download {
                url: source_url.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        let mut file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile_in(self.dir.path())?;
        file.write_all(b"jpeg")?;
        Ok(BaselineImage::new(file.into_temp_path(), 10, 10, 4))
    }
}

#[derive(Debug, Clone)]
pub struct SentPhoto {
    pub chat_id: ChatId,
    pub photo: OutboundPhoto,
    pub caption: Option<String>,
    pub keyboard: Option<InlineKeyboardMarkup>,
    pub file_existed: bool,
}

pub struct RecordingOutbound {
    photos: Mutex<Vec<SentPhoto>>,
    send_calls: AtomicUsize,
    failing_send: Option<usize>,
    delete_attempts: Mutex<Vec<i32>>,
    missing_message: Option<i32>,
    next_message_id: AtomicI32,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self {
            photos: Mutex::new(Vec::new()),
            send_calls: AtomicUsize::new(0),
            failing_send: None,
            delete_attempts: Mutex::new(Vec::new()),
            missing_message: None,
            next_message_id: AtomicI32::new(100),
        }
    }

    /// Rejects the `call`-th photo send (1-based).
    pub fn failing_send(mut self, call: usize) -> Self {
        self.failing_send = Some(call);
        self
    }

    /// Deleting this message id fails as if it never existed.
    pub fn missing_message(mut self, message_id: i32) -> Self {
        self.missing_message = Some(message_id);
        self
    }

    pub fn photos(&self) -> Vec<SentPhoto> {
        self.photos.lock().clone()
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn delete_attempts(&self) -> Vec<i32> {
        self.delete_attempts.lock().clone()
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: OutboundPhoto,
        caption: Option<String>,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, RequestError> {
        let call = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_send == Some(call) {
            return Err(RequestError::Api(ApiError::Unknown(
                "Bad Request: wrong file identifier/HTTP URL specified".to_string(),
            )));
        }
        let file_existed = match &photo {
            OutboundPhoto::File(path) => path.exists(),
            OutboundPhoto::Url(_) => false,
        };
        self.photos.lock().push(SentPhoto {
            chat_id,
            photo,
            caption,
            keyboard,
            file_existed,
        });
        Ok(MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn delete_message(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), RequestError> {
        self.delete_attempts.lock().push(message_id.0);
        if self.missing_message == Some(message_id.0) {
            return Err(RequestError::Api(ApiError::MessageToDeleteNotFound));
        }
        Ok(())
    }
}
