use std::sync::Arc;

use contentstore_lib::Localizer;

use super::config::ContentServerConfig;
use super::content::ContentStore;
use super::notify::Notifier;

/// Shared application state for the HTTP server.
pub struct AppState {
    /// Resource persistence shared by the admin API, public reads and forms.
    pub store: ContentStore,
    /// Language fallback applied on list reads.
    pub localizer: Localizer,
    /// Server configuration (public resources, admin tokens, forms).
    pub config: Arc<ContentServerConfig>,
    /// Sink for form submission notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(
        store: ContentStore,
        config: Arc<ContentServerConfig>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            localizer: config.content.localizer(),
            config,
            notifier,
        }
    }

    /// Requested language, or the configured default when absent or blank.
    pub fn language<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.config.content.default_language)
    }
}
