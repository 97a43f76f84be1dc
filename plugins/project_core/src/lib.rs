//! Project core plugin: owns the `ProjectService` singleton and the
//! project tree state behind its interface slots.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;

use plugkit::registry::{Registrator, RegistryBuilder};
use plugkit::{Event, EventBus, EventHandler, Plugin, PluginCtx};
use workbench_services::{topics, ProjectNode, ProjectService};

#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectCoreConfig {
    /// How many levels the tree expands after a project opens.
    #[serde(default = "default_expand_depth")]
    expand_depth: usize,
}

fn default_expand_depth() -> usize {
    2
}

#[derive(Default)]
pub struct ProjectCorePlugin {
    service: RwLock<Option<Arc<ProjectService>>>,
    tree_roots: Arc<RwLock<Vec<ProjectNode>>>,
    recent_files: Arc<RwLock<Vec<PathBuf>>>,
    expand_depth: RwLock<usize>,
}

impl ProjectCorePlugin {
    pub fn tree_roots(&self) -> Vec<ProjectNode> {
        self.tree_roots.read().clone()
    }

    pub fn recent_files(&self) -> Vec<PathBuf> {
        self.recent_files.read().clone()
    }

    /// Open a project: resolve the kit's generator, attach its tree and
    /// announce activation. Unknown kits surface as an error string, not a
    /// crash ("this project type is not supported").
    pub fn open_project(
        &self,
        events: &Arc<EventBus>,
        kit_name: &str,
        workspace_dir: &std::path::Path,
    ) -> anyhow::Result<()> {
        let service = self
            .service
            .read()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("project core not initialized"))?;

        let generator = service.create_generator(kit_name)?;
        generator.configure(workspace_dir)?;

        let root = generator
            .project_tree(workspace_dir)
            .unwrap_or_else(|| ProjectNode::new(
                workspace_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| workspace_dir.display().to_string()),
                workspace_dir,
            ));

        service.attach_project_root.invoke(root)?;
        let depth = *self.expand_depth.read();
        service
            .expand_project_depth
            .invoke((workspace_dir.to_path_buf(), depth))?;

        events.publish(
            topics::PROJECT_ACTIVATED,
            vec![json!(workspace_dir), json!(kit_name)],
        )?;
        Ok(())
    }
}

/// Tracks files the editor opens so the tree can highlight them.
struct ProjectReceiver {
    recent_files: Arc<RwLock<Vec<PathBuf>>>,
}

impl EventHandler for ProjectReceiver {
    fn process(&self, event: &Event) {
        if event.topic() != topics::EDITOR_FILE_OPENED {
            return;
        }
        if let Some(path) = event.property(0).and_then(|v| v.as_str()) {
            self.recent_files.write().push(PathBuf::from(path));
        }
    }
}

#[plugkit::async_trait]
impl Plugin for ProjectCorePlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let cfg: ProjectCoreConfig = ctx.config()?;
        *self.expand_depth.write() = cfg.expand_depth;

        let service = Arc::new(ProjectService::new());

        // This plugin owns the tree view, so it binds the tree slots.
        let roots = Arc::clone(&self.tree_roots);
        service
            .attach_project_root
            .bind(move |node| roots.write().push(node))?;
        service.expand_project_depth.bind(|(path, depth)| {
            tracing::debug!(path = %path.display(), depth, "Expanding project tree");
        })?;

        ctx.services()
            .register::<ProjectService>(ProjectService::NAME, Arc::clone(&service))?;
        *self.service.write() = Some(service);

        ctx.events().subscribe(
            Arc::new(ProjectReceiver {
                recent_files: Arc::clone(&self.recent_files),
            }),
            [topics::EDITOR_FILE_OPENED],
        );

        tracing::info!("project_core initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

inventory::submit! {
    Registrator(|b: &mut RegistryBuilder| {
        b.register_core("project_core", &[], Arc::new(ProjectCorePlugin::default()));
    })
}
