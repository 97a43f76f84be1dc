use std::sync::Arc;

use crate::config::AppConfig;

/// Bridges [`AppConfig`]'s per-plugin bag into plugkit's `ConfigProvider`.
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }

    pub fn from_arc(config: Arc<AppConfig>) -> Self {
        Self(config)
    }

    pub fn inner(&self) -> &AppConfig {
        &self.0
    }
}

impl plugkit::ConfigProvider for AppConfigProvider {
    fn plugin_config(&self, plugin_name: &str) -> Option<&serde_json::Value> {
        self.0.plugins.get(plugin_name)
    }
}
