use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const INFO_CALLBACK_PREFIX: &str = "info:";
pub const DOWNLOAD_CALLBACK_PREFIX: &str = "download:";

/// What the inline buttons under one photo act on. Telegram caps callback data at
/// 64 bytes, so captions and URLs stay here and the buttons carry only an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPayload {
    pub caption: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Info(u64),
    Download(u64),
}

impl ButtonAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(id) = data.strip_prefix(INFO_CALLBACK_PREFIX) {
            return id.parse().ok().map(ButtonAction::Info);
        }
        if let Some(id) = data.strip_prefix(DOWNLOAD_CALLBACK_PREFIX) {
            return id.parse().ok().map(ButtonAction::Download);
        }
        None
    }

    pub fn id(self) -> u64 {
        match self {
            ButtonAction::Info(id) | ButtonAction::Download(id) => id,
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    entries: HashMap<u64, ButtonPayload>,
    order: VecDeque<u64>,
}

/// Bounded store of button payloads; the oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ButtonStore {
    inner: Arc<Mutex<StoreInner>>,
    capacity: usize,
}

impl ButtonStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn register(&self, payload: ButtonPayload) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.insert(id, payload);
        inner.order.push_back(id);
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        id
    }

    pub fn get(&self, id: u64) -> Option<ButtonPayload> {
        self.inner.lock().entries.get(&id).cloned()
    }

    /// Drops a payload whose photo never reached the chat.
    pub fn remove(&self, id: u64) {
        let mut inner = self.inner.lock();
        if inner.entries.remove(&id).is_some() {
            inner.order.retain(|entry| *entry != id);
        }
    }
}

pub fn keyboard(id: u64, payload: &ButtonPayload) -> InlineKeyboardMarkup {
    let mut row = Vec::with_capacity(2);
    if payload.caption.is_some() {
        row.push(InlineKeyboardButton::callback(
            "Info",
            format!("{INFO_CALLBACK_PREFIX}{id}"),
        ));
    }
    row.push(InlineKeyboardButton::callback(
        "Download",
        format!("{DOWNLOAD_CALLBACK_PREFIX}{id}"),
    ));
    InlineKeyboardMarkup::new(vec![row])
}
