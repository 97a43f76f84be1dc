//! Builder core plugin: owns the `BuilderService` singleton, tracks the
//! active project and runs builds in the background. Stateful: a build in
//! flight defers shutdown until it drains (bounded by the host deadline).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use plugkit::registry::{Registrator, RegistryBuilder};
use plugkit::{
    Event, EventBus, EventHandler, Plugin, PluginCtx, StatefulPlugin, StopFlag,
};
use workbench_services::{topics, BuilderService, ProjectInfo};

#[derive(Debug, Clone, Default, Deserialize)]
struct BuilderConfig {
    /// Generator used when a project does not name one.
    #[serde(default)]
    default_generator: Option<String>,
}

#[derive(Default)]
pub struct BuilderCorePlugin {
    service: ArcSwapOption<BuilderService>,
    active_project: Arc<ArcSwapOption<ProjectInfo>>,
    building: Arc<AtomicBool>,
    config: Mutex<BuilderConfig>,
    // Signalled when a background build finishes while a stop is pending.
    pending_stop: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl BuilderCorePlugin {
    pub fn active_project(&self) -> Option<ProjectInfo> {
        self.active_project.load().as_deref().cloned()
    }

    /// Resolve the project's generator and publish the build outcome.
    /// Synchronous core of a build; callers decide the thread.
    pub fn run_build(&self, events: &Arc<EventBus>, project: &ProjectInfo) -> anyhow::Result<()> {
        let service = self
            .service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("builder core not initialized"))?;

        let kit = if project.kit_name.is_empty() {
            self.config
                .lock()
                .default_generator
                .clone()
                .ok_or_else(|| anyhow::anyhow!("project names no generator and no default is configured"))?
        } else {
            project.kit_name.clone()
        };

        events.publish(
            topics::BUILD_STARTED,
            vec![json!(project.workspace_dir), json!(kit)],
        )?;

        // Command execution is delegated elsewhere; here we only resolve
        // what to run.
        let outcome: anyhow::Result<workbench_services::CommandInfo> = service
            .create_generator(&kit)
            .map_err(anyhow::Error::from)
            .and_then(|generator| generator.build_command(project));

        let (success, raw_output) = match &outcome {
            Ok(command) => (
                true,
                format!("{} {}", command.program, command.arguments.join(" ")),
            ),
            Err(error) => (false, error.to_string()),
        };

        // Output formatting belongs to whichever plugin owns the output
        // pane; fall back to the raw line when nothing bound it.
        let output = service
            .format_output
            .invoke(raw_output.clone())
            .unwrap_or(raw_output);

        events.publish(
            topics::BUILD_FINISHED,
            vec![json!(project.workspace_dir), json!(success), json!(output)],
        )?;

        outcome.map(|_| ())
    }

    /// Run a build off the host thread; shutdown waits for it.
    pub fn spawn_build(self: &Arc<Self>, events: Arc<EventBus>, project: ProjectInfo) {
        let plugin = Arc::clone(self);
        plugin.building.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            if let Err(error) = plugin.run_build(&events, &project) {
                tracing::warn!(error = format!("{error:#}"), "Build failed");
            }
            plugin.building.store(false, Ordering::SeqCst);
            if let Some(done) = plugin.pending_stop.lock().take() {
                let _ = done.send(());
            }
        });
    }
}

/// Remembers which project is active so builds know their workspace.
struct BuildReceiver {
    active_project: Arc<ArcSwapOption<ProjectInfo>>,
}

impl EventHandler for BuildReceiver {
    fn process(&self, event: &Event) {
        if event.topic() != topics::PROJECT_ACTIVATED {
            return;
        }
        let workspace = event.property(0).and_then(|v| v.as_str());
        let kit = event.property(1).and_then(|v| v.as_str());
        if let (Some(workspace), Some(kit)) = (workspace, kit) {
            self.active_project
                .store(Some(Arc::new(ProjectInfo::new(kit, workspace))));
        }
    }
}

#[plugkit::async_trait]
impl Plugin for BuilderCorePlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        *self.config.lock() = ctx.config()?;

        let service = Arc::new(BuilderService::new());
        ctx.services()
            .register::<BuilderService>(BuilderService::NAME, Arc::clone(&service))?;
        self.service.store(Some(service));

        ctx.events().subscribe(
            Arc::new(BuildReceiver {
                active_project: Arc::clone(&self.active_project),
            }),
            [topics::PROJECT_ACTIVATED],
        );

        tracing::info!("builder_core initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[plugkit::async_trait]
impl StatefulPlugin for BuilderCorePlugin {
    async fn start(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
        tracing::debug!(
            generators = ?self.service.load_full().map(|s| s.supported_generators()),
            "builder_core started"
        );
        Ok(())
    }

    async fn stop(&self, _ctx: &PluginCtx) -> anyhow::Result<StopFlag> {
        if !self.building.load(Ordering::SeqCst) {
            return Ok(StopFlag::Sync);
        }
        let (tx, rx) = oneshot::channel();
        *self.pending_stop.lock() = Some(tx);
        // Re-check: the build may have drained between the flag read and
        // the sender install.
        if !self.building.load(Ordering::SeqCst) {
            if let Some(tx) = self.pending_stop.lock().take() {
                let _ = tx.send(());
            }
        }
        Ok(StopFlag::Deferred(rx))
    }
}

inventory::submit! {
    Registrator(|b: &mut RegistryBuilder| {
        let plugin = Arc::new(BuilderCorePlugin::default());
        b.register_core("builder_core", &[], plugin.clone());
        b.register_stateful("builder_core", plugin);
    })
}
