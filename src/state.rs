use std::sync::Arc;

use reqwest::Client;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::delivery::buttons::ButtonStore;
use crate::media::{BaselineFormatter, FormatOptions};
use crate::provider::ProviderClient;

const BUTTON_STORE_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub provider: ProviderClient,
    pub formatter: BaselineFormatter,
    pub buttons: ButtonStore,
}

impl AppState {
    pub fn new(config: Config, http: Client) -> Self {
        let catalog = Catalog::for_version(config.version);
        let formatter = BaselineFormatter::new(
            http.clone(),
            config.media_dir.clone(),
            FormatOptions {
                max_dimension: config.format_max_dimension,
                jpeg_quality: config.format_jpeg_quality,
            },
        );
        AppState {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            provider: ProviderClient::new(http),
            formatter,
            buttons: ButtonStore::new(BUTTON_STORE_CAPACITY),
        }
    }

    /// Button store to use for new photos, if inline controls are enabled.
    pub fn inline_buttons(&self) -> Option<&ButtonStore> {
        self.config.inline_controls.then_some(&self.buttons)
    }
}
