use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use tracing::{info, warn};

mod catalog;
mod config;
mod delivery;
mod handlers;
mod history;
mod media;
mod outbound;
mod provider;
mod router;
mod state;
#[cfg(test)]
mod testing;
mod utils;

use config::Config;
use handlers::{callbacks, commands};
use router::{route, Route};
use state::AppState;
use utils::http::build_http_client;
use utils::logging::init_logging;
use utils::timing::start_command_timer;

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config);

    let http = build_http_client(config.http_timeout())?;
    let bot = Bot::new(config.telegram_token.clone());
    let state = AppState::new(config, http);
    info!(
        version = state.config.version.as_str(),
        inline_controls = state.config.inline_controls,
        "Starting AnimeBot"
    );

    if let Err(err) = bot.set_my_commands(state.catalog.bot_commands()).await {
        warn!("Failed to register bot commands: {err}");
    }

    let message_handler = Update::filter_message()
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_message))
        .endpoint(ignore_message);
    let callback_handler = Update::filter_callback_query().endpoint(handle_callback_query);

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|update| async move {
            tracing::debug!("Unhandled update: {:?}", update.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    let Some(text) = message.text() else {
        return Ok(());
    };

    let route = route(text, &state.catalog);
    let timer = start_command_timer(route.name(), &message);
    match route {
        Route::Start => commands::start_handler(bot, state, message, timer).await?,
        Route::TagsMode => commands::tags_mode_handler(bot, state, message, timer).await?,
        Route::ClearHistory => commands::clear_history_handler(bot, message, timer).await?,
        Route::FullMode => commands::full_mode_handler(bot, state, message, timer).await?,
        Route::Images(command) => {
            commands::images_handler(bot, state, message, command, timer).await?
        }
        Route::Greeting => commands::greeting_handler(bot, state, message, timer).await?,
    }
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    callbacks::button_callback(bot, state, query).await?;
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}
