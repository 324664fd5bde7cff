use std::collections::HashMap;

use teloxide::types::BotCommand;

use crate::config::BotVersion;

pub const DEFAULT_IMAGE_COMMAND: &str = "/new_waifu";
pub const FULL_MODE_COMMAND: &str = "/paid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTarget {
    pub search_url: String,
    pub display_name: String,
}

struct CatalogEntry {
    command: &'static str,
    search_url: &'static str,
    display_name: &'static str,
    description: &'static str,
}

const LITE_ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        command: "/new_waifu",
        search_url: "https://api.waifu.im/search/",
        display_name: "Waifu",
        description: "Random waifu",
    },
    CatalogEntry {
        command: "/maid",
        search_url: "https://api.waifu.im/search/?&included_tags=maid",
        display_name: "Maid",
        description: "Maid pictures",
    },
    CatalogEntry {
        command: "/raiden_shogun",
        search_url: "https://api.waifu.im/search/?included_tags=raiden-shogun",
        display_name: "Raiden_shogun",
        description: "Raiden Shogun pictures",
    },
    CatalogEntry {
        command: "/uniform",
        search_url: "https://api.waifu.im/search/?gif=false&included_tags=uniform",
        display_name: "Uniform",
        description: "Uniform pictures",
    },
];

const FULL_ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        command: "/marin_kitagawa",
        search_url: "https://api.waifu.im/search/?included_tags=marin-kitagawa",
        display_name: "Marin_kitagawa",
        description: "Marin Kitagawa pictures",
    },
    CatalogEntry {
        command: "/mori_calliope",
        search_url: "https://api.waifu.im/search/?included_tags=mori-calliope",
        display_name: "Mori_calliope",
        description: "Mori Calliope pictures",
    },
    CatalogEntry {
        command: "/kamisato_ayaka",
        search_url: "https://api.waifu.im/search/?included_tags=kamisato-ayaka",
        display_name: "Kamisato_ayaka",
        description: "Kamisato Ayaka pictures",
    },
    CatalogEntry {
        command: "/selfies",
        search_url: "https://api.waifu.im/search/?gif=false&included_tags=selfies",
        display_name: "Selfies",
        description: "Selfies",
    },
];

const LITE_KEYBOARD: &[&[&str]] = &[
    &["/clear_history"],
    &["/uniform", "/maid"],
    &["/raiden_shogun", "/new_waifu"],
];

const FULL_KEYBOARD: &[&[&str]] = &[
    &["/marin_kitagawa", "/mori_calliope"],
    &["/kamisato_ayaka", "/selfies"],
];

const SERVICE_COMMANDS: &[(&str, &str)] = &[
    ("start", "Say hello and get a first picture"),
    ("tags_mode", "Show more picture commands"),
    ("clear_history", "Delete chat history"),
];

/// Command table for one bot version, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: BotVersion,
    targets: HashMap<String, CommandTarget>,
    image_commands: Vec<(String, String)>,
    tags_keyboard: Vec<Vec<String>>,
    full_keyboard: Vec<Vec<String>>,
}

fn keyboard_rows(layouts: &[&[&[&str]]]) -> Vec<Vec<String>> {
    layouts
        .iter()
        .flat_map(|layout| layout.iter())
        .map(|row| row.iter().map(|label| label.to_string()).collect())
        .collect()
}

impl Catalog {
    pub fn for_version(version: BotVersion) -> Self {
        let entries: Vec<&CatalogEntry> = match version {
            BotVersion::Lite => LITE_ENTRIES.iter().collect(),
            BotVersion::Full => FULL_ENTRIES.iter().chain(LITE_ENTRIES.iter()).collect(),
        };

        let targets = entries
            .iter()
            .map(|entry| {
                (
                    entry.command.to_string(),
                    CommandTarget {
                        search_url: entry.search_url.to_string(),
                        display_name: entry.display_name.to_string(),
                    },
                )
            })
            .collect();
        let image_commands = entries
            .iter()
            .map(|entry| (entry.command.to_string(), entry.description.to_string()))
            .collect();

        let full_keyboard = match version {
            BotVersion::Lite => Vec::new(),
            BotVersion::Full => keyboard_rows(&[FULL_KEYBOARD, LITE_KEYBOARD]),
        };

        Catalog {
            version,
            targets,
            image_commands,
            tags_keyboard: keyboard_rows(&[LITE_KEYBOARD]),
            full_keyboard,
        }
    }

    pub fn target(&self, command: &str) -> Option<&CommandTarget> {
        self.targets.get(command)
    }

    pub fn is_image_command(&self, command: &str) -> bool {
        self.targets.contains_key(command)
    }

    pub fn has_full_mode(&self) -> bool {
        self.version == BotVersion::Full
    }

    pub fn tags_keyboard(&self) -> &[Vec<String>] {
        &self.tags_keyboard
    }

    pub fn full_keyboard(&self) -> &[Vec<String>] {
        &self.full_keyboard
    }

    /// Commands advertised to Telegram through `set_my_commands`.
    pub fn bot_commands(&self) -> Vec<BotCommand> {
        let mut commands: Vec<BotCommand> = SERVICE_COMMANDS
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect();
        if self.has_full_mode() {
            commands.push(BotCommand::new(
                FULL_MODE_COMMAND.trim_start_matches('/'),
                "Show full version commands",
            ));
        }
        commands.extend(self.image_commands.iter().map(|(command, description)| {
            BotCommand::new(command.trim_start_matches('/'), description.as_str())
        }));
        commands
    }
}
