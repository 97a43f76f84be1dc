//! Gradle tool-kit support.
//!
//! Contributes both halves of gradle support: a `ProjectGenerator` so
//! gradle workspaces open as projects, and a `BuildGenerator` so they
//! build through the wrapper script. Requires both core services; if
//! either is missing the host disables this plugin.

use std::sync::Arc;

use plugkit::registry::{Registrator, RegistryBuilder};
use plugkit::{Plugin, PluginCtx};
use workbench_services::{
    BuildGenerator, BuilderService, CommandInfo, ProjectGenerator, ProjectInfo, ProjectNode,
    ProjectService,
};

const KIT: &str = "gradle";

pub struct GradleBuildGenerator;

impl BuildGenerator for GradleBuildGenerator {
    fn toolkit_name(&self) -> &'static str {
        KIT
    }

    // Prefer the checked-in wrapper over a system gradle.
    fn build_command(&self, project: &ProjectInfo) -> anyhow::Result<CommandInfo> {
        Ok(CommandInfo {
            program: "./gradlew".into(),
            arguments: vec!["build".into()],
            working_dir: project.workspace_dir.clone(),
        })
    }
}

pub struct GradleProjectGenerator;

impl ProjectGenerator for GradleProjectGenerator {
    fn kit_name(&self) -> &'static str {
        KIT
    }

    fn project_tree(&self, project_dir: &std::path::Path) -> Option<ProjectNode> {
        let name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())?;
        let mut root = ProjectNode::new(name, project_dir);
        root.kit_name = Some(KIT.into());
        root.children.push(ProjectNode::new(
            "build.gradle",
            project_dir.join("build.gradle"),
        ));
        Some(root)
    }
}

#[derive(Default)]
pub struct GradlePlugin;

#[plugkit::async_trait]
impl Plugin for GradlePlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let projects = ctx.service_required::<ProjectService>(ProjectService::NAME)?;
        let builder = ctx.service_required::<BuilderService>(BuilderService::NAME)?;

        projects.register_generator(KIT, || Arc::new(GradleProjectGenerator))?;
        builder.register_generator(KIT, || Arc::new(GradleBuildGenerator))?;

        tracing::info!("gradle generators registered");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

inventory::submit! {
    Registrator(|b: &mut RegistryBuilder| {
        b.register_core(
            "generator_gradle",
            &["project_core", "builder_core"],
            Arc::new(GradlePlugin),
        );
    })
}
