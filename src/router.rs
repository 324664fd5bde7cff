use crate::catalog::{Catalog, FULL_MODE_COMMAND};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    TagsMode,
    ClearHistory,
    FullMode,
    Images(String),
    Greeting,
}

impl Route {
    pub fn name(&self) -> &str {
        match self {
            Route::Start => "start",
            Route::TagsMode => "tags_mode",
            Route::ClearHistory => "clear_history",
            Route::FullMode => "paid",
            Route::Images(command) => command.trim_start_matches('/'),
            Route::Greeting => "greeting",
        }
    }
}

/// `/maid@AnimeBot extra words` → `/maid`.
pub fn command_name(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') || first.len() < 2 {
        return None;
    }
    let command = first.split('@').next().unwrap_or(first);
    Some(command.to_lowercase())
}

pub fn route(text: &str, catalog: &Catalog) -> Route {
    let Some(command) = command_name(text) else {
        return Route::Greeting;
    };
    match command.as_str() {
        "/start" => return Route::Start,
        "/tags_mode" => return Route::TagsMode,
        "/clear_history" => return Route::ClearHistory,
        FULL_MODE_COMMAND if catalog.has_full_mode() => return Route::FullMode,
        _ => {}
    }
    if catalog.is_image_command(&command) {
        Route::Images(command)
    } else {
        Route::Greeting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotVersion;

    #[test]
    fn extracts_command_name() {
        assert_eq!(command_name("/maid"), Some("/maid".to_string()));
        assert_eq!(command_name("/Maid@AnimeBot now"), Some("/maid".to_string()));
        assert_eq!(command_name("  /start"), Some("/start".to_string()));
        assert_eq!(command_name("hello /maid"), None);
        assert_eq!(command_name("/"), None);
        assert_eq!(command_name(""), None);
    }

    #[test]
    fn routes_lite_commands() {
        let catalog = Catalog::for_version(BotVersion::Lite);
        assert_eq!(route("/start", &catalog), Route::Start);
        assert_eq!(route("/tags_mode", &catalog), Route::TagsMode);
        assert_eq!(route("/clear_history", &catalog), Route::ClearHistory);
        assert_eq!(
            route("/new_waifu@AnimeBot", &catalog),
            Route::Images("/new_waifu".to_string())
        );
        assert_eq!(route("/paid", &catalog), Route::Greeting);
        assert_eq!(route("/selfies", &catalog), Route::Greeting);
        assert_eq!(route("good morning", &catalog), Route::Greeting);
    }

    #[test]
    fn routes_full_commands() {
        let catalog = Catalog::for_version(BotVersion::Full);
        assert_eq!(route("/paid", &catalog), Route::FullMode);
        assert_eq!(
            route("/selfies", &catalog),
            Route::Images("/selfies".to_string())
        );
        assert_eq!(route("/maid", &catalog), Route::Images("/maid".to_string()));
    }

    #[test]
    fn route_names_for_timing() {
        assert_eq!(Route::Images("/maid".to_string()).name(), "maid");
        assert_eq!(Route::FullMode.name(), "paid");
    }
}
