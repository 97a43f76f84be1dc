//! Ninja build-tool support.
//!
//! Contributes a `BuildGenerator` for ninja workspaces. Requires the
//! `BuilderService`: when it is missing the host disables this plugin and
//! the rest of the application keeps running without ninja support.

use std::sync::Arc;

use plugkit::registry::{Registrator, RegistryBuilder};
use plugkit::{Plugin, PluginCtx};
use workbench_services::{BuildGenerator, BuilderService, CommandInfo, ProjectInfo};

pub struct NinjaGenerator;

impl BuildGenerator for NinjaGenerator {
    fn toolkit_name(&self) -> &'static str {
        "ninja"
    }

    // ninja discovers its own targets from build.ninja in the workspace.
    fn build_command(&self, project: &ProjectInfo) -> anyhow::Result<CommandInfo> {
        Ok(CommandInfo {
            program: "ninja".into(),
            arguments: Vec::new(),
            working_dir: project.workspace_dir.clone(),
        })
    }
}

#[derive(Default)]
pub struct NinjaPlugin;

#[plugkit::async_trait]
impl Plugin for NinjaPlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let builder = ctx.service_required::<BuilderService>(BuilderService::NAME)?;
        builder.register_generator("ninja", || Arc::new(NinjaGenerator))?;
        tracing::info!("ninja generator registered");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

inventory::submit! {
    Registrator(|b: &mut RegistryBuilder| {
        b.register_core("generator_ninja", &["builder_core"], Arc::new(NinjaPlugin));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugkit::context::{EmptyConfigProvider, PluginContextBuilder};
    use plugkit::services::ServiceContext;
    use plugkit::EventBus;
    use tokio_util::sync::CancellationToken;

    fn ctx_with(services: Arc<ServiceContext>) -> PluginCtx {
        PluginContextBuilder::new(
            Arc::new(EmptyConfigProvider),
            services,
            Arc::new(EventBus::new()),
            CancellationToken::new(),
        )
        .for_plugin("generator_ninja")
    }

    #[test]
    fn build_command_runs_ninja_in_workspace() {
        let project = ProjectInfo::new("ninja", "/work/demo");
        let cmd = NinjaGenerator.build_command(&project).unwrap();
        assert_eq!(cmd.program, "ninja");
        assert!(cmd.arguments.is_empty());
        assert_eq!(cmd.working_dir, std::path::PathBuf::from("/work/demo"));
    }

    #[tokio::test]
    async fn init_registers_into_builder_service() {
        let services = Arc::new(ServiceContext::new());
        services
            .register::<BuilderService>(BuilderService::NAME, Arc::new(BuilderService::new()))
            .unwrap();

        NinjaPlugin.init(&ctx_with(Arc::clone(&services))).await.unwrap();

        let builder = services.get::<BuilderService>(BuilderService::NAME).unwrap();
        assert!(builder.supported_generators().contains(&"ninja".to_string()));
    }

    #[tokio::test]
    async fn init_fails_cleanly_without_builder_service() {
        let services = Arc::new(ServiceContext::new());
        let err = NinjaPlugin.init(&ctx_with(services)).await.unwrap_err();
        assert!(err.to_string().contains(BuilderService::NAME));
    }
}
