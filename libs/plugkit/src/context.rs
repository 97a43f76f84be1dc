//! Per-plugin context handed to every lifecycle call.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::event_bus::EventBus;
use crate::services::{ServiceContext, ServiceError};

/// Provider of per-plugin config sections (raw JSON by plugin name).
pub trait ConfigProvider: Send + Sync {
    fn plugin_config(&self, plugin_name: &str) -> Option<&serde_json::Value>;
}

/// Config provider with no sections; every plugin falls back to defaults.
pub struct EmptyConfigProvider;

impl ConfigProvider for EmptyConfigProvider {
    fn plugin_config(&self, _plugin_name: &str) -> Option<&serde_json::Value> {
        None
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config section for plugin '{plugin}'")]
    Invalid {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Scoped view of the runtime a plugin sees: its config section, the shared
/// service directory, the event bus and the shutdown token.
#[derive(Clone)]
pub struct PluginCtx {
    plugin_name: &'static str,
    raw_config: Option<serde_json::Value>,
    services: Arc<ServiceContext>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
}

impl PluginCtx {
    pub fn plugin_name(&self) -> &'static str {
        self.plugin_name
    }

    pub fn services(&self) -> &Arc<ServiceContext> {
        &self.services
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Deserialize this plugin's config section; a missing section yields
    /// `T::default()`.
    pub fn config<T>(&self) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match &self.raw_config {
            None => Ok(T::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| ConfigError::Invalid {
                    plugin: self.plugin_name.to_owned(),
                    source,
                })
            }
        }
    }

    /// Lookup a collaborator service this plugin cannot function without.
    /// Absence maps to [`ServiceError::MissingService`]; returning the error
    /// from `init()` disables this plugin only, never the application.
    pub fn service_required<S>(&self, name: &str) -> Result<Arc<S>, ServiceError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services
            .get::<S>(name)
            .ok_or_else(|| ServiceError::MissingService(name.to_owned()))
    }
}

/// Builds per-plugin contexts over the shared runtime components.
#[derive(Clone)]
pub struct PluginContextBuilder {
    config: Arc<dyn ConfigProvider>,
    services: Arc<ServiceContext>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
}

impl PluginContextBuilder {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        services: Arc<ServiceContext>,
        events: Arc<EventBus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            services,
            events,
            cancel,
        }
    }

    pub fn for_plugin(&self, plugin_name: &'static str) -> PluginCtx {
        PluginCtx {
            plugin_name,
            raw_config: self.config.plugin_config(plugin_name).cloned(),
            services: Arc::clone(&self.services),
            events: Arc::clone(&self.events),
            cancel: self.cancel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct ToolCfg {
        #[serde(default)]
        parallel_jobs: u32,
    }

    struct OneSection(serde_json::Value);
    impl ConfigProvider for OneSection {
        fn plugin_config(&self, plugin_name: &str) -> Option<&serde_json::Value> {
            (plugin_name == "builder").then_some(&self.0)
        }
    }

    fn builder_with(provider: Arc<dyn ConfigProvider>) -> PluginContextBuilder {
        PluginContextBuilder::new(
            provider,
            Arc::new(ServiceContext::new()),
            Arc::new(EventBus::new()),
            CancellationToken::new(),
        )
    }

    #[test]
    fn missing_section_falls_back_to_default() {
        let b = builder_with(Arc::new(EmptyConfigProvider));
        let cfg: ToolCfg = b.for_plugin("builder").config().unwrap();
        assert_eq!(cfg, ToolCfg::default());
    }

    #[test]
    fn present_section_is_deserialized() {
        let b = builder_with(Arc::new(OneSection(
            serde_json::json!({ "parallel_jobs": 8 }),
        )));
        let cfg: ToolCfg = b.for_plugin("builder").config().unwrap();
        assert_eq!(cfg.parallel_jobs, 8);
    }

    #[test]
    fn malformed_section_is_an_error() {
        let b = builder_with(Arc::new(OneSection(
            serde_json::json!({ "parallel_jobs": "not a number" }),
        )));
        let err = b.for_plugin("builder").config::<ToolCfg>().unwrap_err();
        assert!(err.to_string().contains("builder"));
    }

    #[test]
    fn required_service_absence_is_reported() {
        let b = builder_with(Arc::new(EmptyConfigProvider));
        let ctx = b.for_plugin("builder");
        let err = ctx
            .service_required::<ServiceContext>("WindowService")
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::MissingService(_)));
    }
}
