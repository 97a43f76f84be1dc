//! Build capability surface.

use std::sync::Arc;

use plugkit::{FactoryError, GeneratorHub, Slot};
use serde_json::json;

use crate::project::ProjectInfo;

/// A resolved command line for building or running a target.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo {
    pub program: String,
    pub arguments: Vec<String>,
    pub working_dir: std::path::PathBuf,
}

/// Pluggable build-tool logic, registered under its tool-kit key
/// ("ninja", "gradle", ...). Absence of a key at lookup time is a valid
/// runtime state: that build tool is simply not installed/supported.
pub trait BuildGenerator: Send + Sync {
    fn toolkit_name(&self) -> &'static str;

    /// Command that builds the project.
    fn build_command(&self, project: &ProjectInfo) -> anyhow::Result<CommandInfo>;

    /// Command that runs the produced target.
    fn run_command(&self, project: &ProjectInfo) -> anyhow::Result<CommandInfo> {
        Ok(CommandInfo {
            program: project.target_path().to_string_lossy().into_owned(),
            arguments: project.run_args.clone(),
            working_dir: project.workspace_dir.clone(),
        })
    }

    /// Debug launch parameters handed to a debug-adapter integration.
    fn launch_parameters(&self, project: &ProjectInfo) -> serde_json::Value {
        json!({
            "workspace": project.workspace_dir,
            "targetPath": project.target_path(),
        })
    }

    fn needs_build(&self) -> bool {
        true
    }
}

/// Singleton service owned by the builder core plugin.
pub struct BuilderService {
    generators: GeneratorHub<dyn BuildGenerator>,
    /// Build-output formatting contributed by whichever plugin owns the
    /// output pane; resolved at call time, never a compile-time edge.
    pub format_output: Slot<String, String>,
}

impl Default for BuilderService {
    fn default() -> Self {
        Self {
            generators: GeneratorHub::new(),
            format_output: Slot::new(),
        }
    }
}

impl BuilderService {
    pub const NAME: &'static str = "BuilderService";

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a build generator under its unique tool-kit key. One-shot:
    /// re-registration is rejected, the first constructor stays
    /// authoritative.
    pub fn register_generator<F>(&self, name: &str, ctor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Arc<dyn BuildGenerator> + Send + Sync + 'static,
    {
        self.generators.reg_class(name, ctor)
    }

    pub fn supported_generators(&self) -> Vec<String> {
        self.generators.supported_names()
    }

    /// Memoized generator lookup: one instance per tool-kit key.
    pub fn create_generator(&self, name: &str) -> Result<Arc<dyn BuildGenerator>, FactoryError> {
        self.generators.get_or_create(name)
    }
}
