//! Project capability surface.
//!
//! `ProjectService` faces the project core; `ProjectGenerator` faces the
//! outside plugins extending it. Keeping them separate isolates the
//! interfaces and lets the plugin set vary: a plugin can ship only a
//! generator (standalone capability) or a generator plus workflow wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugkit::{FactoryError, GeneratorHub, Slot};

/// Describes an opened project workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInfo {
    /// Tool-kit key the project was created with ("gradle", "ninja", ...).
    pub kit_name: String,
    pub workspace_dir: PathBuf,
    /// Extra arguments for running the produced target.
    pub run_args: Vec<String>,
}

impl ProjectInfo {
    pub fn new(kit_name: impl Into<String>, workspace_dir: impl Into<PathBuf>) -> Self {
        Self {
            kit_name: kit_name.into(),
            workspace_dir: workspace_dir.into(),
            run_args: Vec::new(),
        }
    }

    /// Conventional target path: `<workspace>/<workspace dirname>`.
    pub fn target_path(&self) -> PathBuf {
        let file_name = self
            .workspace_dir
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_default();
        self.workspace_dir.join(file_name)
    }
}

/// A node of the project file tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub name: String,
    pub path: PathBuf,
    /// Tool-kit key that produced this subtree, if any.
    pub kit_name: Option<String>,
    pub children: Vec<ProjectNode>,
}

impl ProjectNode {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kit_name: None,
            children: Vec::new(),
        }
    }
}

/// Pluggable project-type logic, registered under its tool-kit key.
pub trait ProjectGenerator: Send + Sync {
    fn kit_name(&self) -> &'static str;

    /// Run the generator's configure step (e.g. produce cache files bound
    /// to the project path). Callers ensure preconditions first.
    fn configure(&self, project_dir: &Path) -> anyhow::Result<()> {
        let _ = project_dir;
        Ok(())
    }

    /// Build the file-tree root for the project, if this kit can.
    fn project_tree(&self, project_dir: &Path) -> Option<ProjectNode> {
        let _ = project_dir;
        None
    }
}

/// Singleton service owned by the project core plugin.
pub struct ProjectService {
    generators: GeneratorHub<dyn ProjectGenerator>,
    /// Attach a root node to the project tree; bound by whichever plugin
    /// owns the tree view.
    pub attach_project_root: Slot<ProjectNode>,
    /// Expand the tree below `path` down to `depth` levels.
    pub expand_project_depth: Slot<(PathBuf, usize)>,
}

impl Default for ProjectService {
    fn default() -> Self {
        Self {
            generators: GeneratorHub::new(),
            attach_project_root: Slot::new(),
            expand_project_depth: Slot::new(),
        }
    }
}

impl ProjectService {
    pub const NAME: &'static str = "ProjectService";

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project generator under its unique kit key. One-shot.
    pub fn register_generator<F>(&self, name: &str, ctor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Arc<dyn ProjectGenerator> + Send + Sync + 'static,
    {
        self.generators.reg_class(name, ctor)
    }

    pub fn supported_generators(&self) -> Vec<String> {
        self.generators.supported_names()
    }

    /// Memoized generator lookup: one instance per kit key.
    pub fn create_generator(&self, name: &str) -> Result<Arc<dyn ProjectGenerator>, FactoryError> {
        self.generators.get_or_create(name)
    }
}
