//! Plugin host: owns lifecycle orchestration.
//!
//! Drives every discovered plugin through
//! init → start → wait → stop → service teardown. The init pass completes
//! for the whole plugin set before any start runs, so a plugin's `start()`
//! can assume every service another plugin intends to publish already
//! exists. Stop runs in exact reverse of start order.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::{ConfigProvider, PluginContextBuilder};
use crate::contracts::StopFlag;
use crate::event_bus::EventBus;
use crate::registry::PluginRegistry;
use crate::services::ServiceContext;

const DEFAULT_STOP_DEADLINE: Duration = Duration::from_secs(5);

/// Lifecycle state of a managed plugin. Transitions are monotonic;
/// `Disabled` is terminal and never blocks the rest of the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginState {
    Discovered,
    Initialized,
    Started,
    Stopped,
    Disabled,
}

pub struct PluginHost {
    registry: PluginRegistry,
    states: DashMap<&'static str, PluginState>,
    start_order: Mutex<Vec<&'static str>>,
    ctx_builder: PluginContextBuilder,
    services: Arc<ServiceContext>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
    stop_deadline: Duration,
}

impl PluginHost {
    pub fn new(
        registry: PluginRegistry,
        plugins_cfg: Arc<dyn ConfigProvider>,
        cancel: CancellationToken,
    ) -> Self {
        let services = Arc::new(ServiceContext::new());
        let events = Arc::new(EventBus::new());
        let ctx_builder = PluginContextBuilder::new(
            plugins_cfg,
            Arc::clone(&services),
            Arc::clone(&events),
            cancel.clone(),
        );

        let states = DashMap::new();
        for entry in registry.plugins() {
            states.insert(entry.name, PluginState::Discovered);
        }

        Self {
            registry,
            states,
            start_order: Mutex::new(Vec::new()),
            ctx_builder,
            services,
            events,
            cancel,
            stop_deadline: DEFAULT_STOP_DEADLINE,
        }
    }

    /// How long a deferred stop may outlive the stop call before the host
    /// gives up on the plugin and moves on.
    pub fn with_stop_deadline(mut self, deadline: Duration) -> Self {
        self.stop_deadline = deadline;
        self
    }

    pub fn services(&self) -> &Arc<ServiceContext> {
        &self.services
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn plugin_state(&self, name: &str) -> Option<PluginState> {
        self.states.get(name).map(|s| *s)
    }

    fn set_state(&self, name: &'static str, state: PluginState) {
        self.states.insert(name, state);
    }

    fn is_disabled(&self, name: &str) -> bool {
        self.plugin_state(name) == Some(PluginState::Disabled)
    }

    /// INIT phase: every plugin, in dependency order. A failed init (or a
    /// disabled dependency) disables that plugin only; the host continues
    /// with the rest.
    pub async fn run_init_phase(&self) {
        tracing::info!("Phase: init");

        for entry in self.registry.plugins() {
            if let Some(dep) = entry.deps.iter().find(|d| self.is_disabled(d)) {
                tracing::warn!(
                    plugin = entry.name,
                    disabled_dep = dep,
                    "Disabling plugin: dependency is disabled"
                );
                self.set_state(entry.name, PluginState::Disabled);
                continue;
            }

            let ctx = self.ctx_builder.for_plugin(entry.name);
            match entry.core.init(&ctx).await {
                Ok(()) => self.set_state(entry.name, PluginState::Initialized),
                Err(error) => {
                    tracing::warn!(
                        plugin = entry.name,
                        error = format!("{error:#}"),
                        "Plugin init failed, disabling"
                    );
                    self.set_state(entry.name, PluginState::Disabled);
                }
            }
        }
    }

    /// START phase: runs only after the init pass covered every plugin.
    /// Start failures disable the offending plugin and the host continues.
    pub async fn run_start_phase(&self) {
        tracing::info!("Phase: start");

        for entry in self.registry.plugins() {
            if self.plugin_state(entry.name) != Some(PluginState::Initialized) {
                continue;
            }

            if let Some(stateful) = &entry.stateful {
                let ctx = self.ctx_builder.for_plugin(entry.name);
                if let Err(error) = stateful.start(&ctx).await {
                    tracing::warn!(
                        plugin = entry.name,
                        error = format!("{error:#}"),
                        "Plugin start failed, disabling"
                    );
                    self.set_state(entry.name, PluginState::Disabled);
                    continue;
                }
            }

            self.set_state(entry.name, PluginState::Started);
            self.start_order.lock().push(entry.name);
        }
    }

    /// STOP phase: reverse of start order. A plugin reporting
    /// [`StopFlag::Deferred`] is awaited up to the stop deadline; errors and
    /// expiries are logged, never propagated, so shutdown always completes.
    pub async fn run_stop_phase(&self) {
        tracing::info!("Phase: stop");

        let order: Vec<&'static str> = {
            let mut guard = self.start_order.lock();
            guard.drain(..).rev().collect()
        };

        for name in order {
            let Some(entry) = self.registry.plugins().iter().find(|p| p.name == name) else {
                continue;
            };

            if let Some(stateful) = &entry.stateful {
                let ctx = self.ctx_builder.for_plugin(entry.name);
                match stateful.stop(&ctx).await {
                    Ok(StopFlag::Sync) => {}
                    Ok(StopFlag::Deferred(done)) => {
                        tracing::debug!(plugin = entry.name, "Waiting for deferred stop");
                        match tokio::time::timeout(self.stop_deadline, done).await {
                            Ok(Ok(())) => {}
                            Ok(Err(_)) => tracing::warn!(
                                plugin = entry.name,
                                "Deferred stop signal dropped without completing"
                            ),
                            Err(_) => tracing::warn!(
                                plugin = entry.name,
                                deadline = ?self.stop_deadline,
                                "Deferred stop deadline elapsed"
                            ),
                        }
                    }
                    Err(error) => tracing::warn!(
                        plugin = entry.name,
                        error = format!("{error:#}"),
                        "Failed to stop plugin"
                    ),
                }
            }

            self.set_state(entry.name, PluginState::Stopped);
        }
    }

    /// Full cycle: init → start → wait for cancellation → stop → teardown.
    pub async fn run_full_cycle(self) -> anyhow::Result<()> {
        self.run_init_phase().await;
        self.run_start_phase().await;

        self.cancel.cancelled().await;

        self.run_stop_phase().await;
        self.services.teardown();
        Ok(())
    }
}
