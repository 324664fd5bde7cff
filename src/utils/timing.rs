use std::time::Instant;

use chrono::{DateTime, Utc};
use teloxide::types::Message;
use tracing::info;

use super::logging::TIMING_TARGET;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Partial,
    Error,
}

impl CommandStatus {
    fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Success => "success",
            CommandStatus::Partial => "partial",
            CommandStatus::Error => "error",
        }
    }
}

#[derive(Debug)]
pub struct CommandTimer {
    command: String,
    chat_id: i64,
    user_id: Option<u64>,
    message_id: i32,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

impl CommandTimer {
    pub fn from_message(command: &str, message: &Message) -> Self {
        CommandTimer {
            command: command.to_string(),
            chat_id: message.chat.id.0,
            user_id: message.from.as_ref().map(|user| user.id.0),
            message_id: message.id.0,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            completed: false,
        }
    }

    fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            "event=command_received command={} chat_id={} user_id={:?} message_id={} received_at={}",
            self.command,
            self.chat_id,
            self.user_id,
            self.message_id,
            self.started_at.to_rfc3339()
        );
    }

    pub fn complete(&mut self, status: CommandStatus, detail: Option<String>) {
        if self.completed {
            return;
        }
        self.completed = true;
        info!(
            target: TIMING_TARGET,
            "event=command_completed command={} chat_id={} user_id={:?} message_id={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.command,
            self.chat_id,
            self.user_id,
            self.message_id,
            self.started_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
            self.started_perf.elapsed().as_secs_f64(),
            status.as_str(),
            detail.unwrap_or_default()
        );
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        // a handler that bailed out with `?` never reported a status
        self.complete(CommandStatus::Error, Some("handler aborted".to_string()));
    }
}

pub fn start_command_timer(command: &str, message: &Message) -> CommandTimer {
    let timer = CommandTimer::from_message(command, message);
    timer.log_received();
    timer
}
