//! Plugin discovery and ordering.
//!
//! Plugin crates submit a [`Registrator`] via `inventory`; at startup the
//! host collects them into a [`RegistryBuilder`], validates the declared
//! dependency graph and produces a topologically sorted [`PluginRegistry`].
//! Dependencies only influence init order inside the init pass — the
//! two-pass guarantee (all inits before any start) holds regardless.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use thiserror::Error;

use crate::contracts::{Plugin, StatefulPlugin};

/// A discovered plugin: descriptor metadata plus the owned plugin object.
pub struct PluginEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn Plugin>,
    pub stateful: Option<Arc<dyn StatefulPlugin>>,
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("is_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// Registration hook submitted by plugin crates via `inventory::submit!`.
pub struct Registrator(pub fn(&mut RegistryBuilder));

inventory::collect!(Registrator);

/// The final, topo-sorted plugin set.
pub struct PluginRegistry {
    plugins: Vec<PluginEntry>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.plugins.iter().map(|p| p.name).collect();
        f.debug_struct("PluginRegistry")
            .field("plugins", &names)
            .finish()
    }
}

impl PluginRegistry {
    pub fn plugins(&self) -> &[PluginEntry] {
        &self.plugins
    }

    pub fn get_plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .map(|p| Arc::clone(&p.core))
    }

    /// Run every inventory-collected registrator, then validate and sort.
    pub fn discover_and_build() -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::default();
        for registrator in ::inventory::iter::<Registrator> {
            registrator.0(&mut builder);
        }
        builder.build_topo_sorted()
    }
}

/// Collects registrations; uniqueness and graph validity are enforced at
/// build time so one misdeclared plugin reports cleanly instead of
/// panicking inside a registrator.
#[derive(Default)]
pub struct RegistryBuilder {
    core: Vec<(&'static str, &'static [&'static str], Arc<dyn Plugin>)>,
    stateful: HashMap<&'static str, Arc<dyn StatefulPlugin>>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    pub fn register_core(
        &mut self,
        name: &'static str,
        deps: &'static [&'static str],
        plugin: Arc<dyn Plugin>,
    ) {
        if self.core.iter().any(|(n, _, _)| *n == name) {
            self.errors
                .push(format!("plugin '{name}' is already registered"));
            return;
        }
        self.core.push((name, deps, plugin));
    }

    pub fn register_stateful(&mut self, name: &'static str, plugin: Arc<dyn StatefulPlugin>) {
        if self.stateful.insert(name, plugin).is_some() {
            self.errors
                .push(format!("plugin '{name}' registered stateful twice"));
        }
    }

    /// Finalize: verify stateful bindings and deps, detect cycles, then
    /// order with Kahn's algorithm. Discovery order breaks ties, keeping
    /// startup deterministic.
    pub fn build_topo_sorted(mut self) -> Result<PluginRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidConfiguration {
                errors: self.errors,
            });
        }

        let index: HashMap<&'static str, usize> = self
            .core
            .iter()
            .enumerate()
            .map(|(i, (n, _, _))| (*n, i))
            .collect();

        for name in self.stateful.keys() {
            if !index.contains_key(name) {
                return Err(RegistryError::UnknownPlugin(name.to_string()));
            }
        }

        // edges: dep -> plugin
        let mut adjacency = vec![Vec::<usize>::new(); self.core.len()];
        let mut indegree = vec![0usize; self.core.len()];
        for (name, deps, _) in &self.core {
            let to = index[name];
            for dep in *deps {
                let from = *index
                    .get(dep)
                    .ok_or_else(|| RegistryError::UnknownDependency {
                        plugin: name.to_string(),
                        depends_on: dep.to_string(),
                    })?;
                adjacency[from].push(to);
                indegree[to] += 1;
            }
        }

        let mut queue: VecDeque<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.core.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &adjacency[node] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != self.core.len() {
            // Kahn left nodes behind, so a cycle exists; walk it for the
            // error message.
            let cycle = self.find_cycle();
            return Err(RegistryError::CycleDetected { path: cycle });
        }

        let mut slots: Vec<Option<(&'static str, &'static [&'static str], Arc<dyn Plugin>)>> =
            self.core.into_iter().map(Some).collect();
        let mut plugins = Vec::with_capacity(order.len());
        for i in order {
            let (name, deps, core) = slots[i].take().ok_or(RegistryError::CorruptBuilder)?;
            plugins.push(PluginEntry {
                name,
                deps,
                core,
                stateful: self.stateful.remove(name),
            });
        }

        tracing::info!(
            plugins = ?plugins.iter().map(|p| p.name).collect::<Vec<_>>(),
            "Plugin dependency order resolved"
        );
        Ok(PluginRegistry { plugins })
    }

    fn find_cycle(&self) -> Vec<&'static str> {
        // Depth-first walk over every dependency edge until a node on the
        // current path repeats. Called only when a cycle is known to exist.
        let deps_of: HashMap<&'static str, &'static [&'static str]> =
            self.core.iter().map(|(n, d, _)| (*n, *d)).collect();

        fn walk(
            node: &'static str,
            deps_of: &HashMap<&'static str, &'static [&'static str]>,
            cycle_free: &mut HashSet<&'static str>,
            path: &mut Vec<&'static str>,
        ) -> Option<Vec<&'static str>> {
            if let Some(pos) = path.iter().position(|n| *n == node) {
                let mut cycle = path[pos..].to_vec();
                cycle.push(node);
                return Some(cycle);
            }
            if cycle_free.contains(node) {
                return None;
            }
            path.push(node);
            if let Some(deps) = deps_of.get(node) {
                for dep in deps.iter().copied().filter(|d| deps_of.contains_key(*d)) {
                    if let Some(cycle) = walk(dep, deps_of, cycle_free, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            cycle_free.insert(node);
            None
        }

        let mut cycle_free = HashSet::new();
        for (start, _, _) in &self.core {
            let mut path = Vec::new();
            if let Some(cycle) = walk(start, &deps_of, &mut cycle_free, &mut path) {
                return cycle;
            }
        }
        Vec::new()
    }
}

/// Structured errors for plugin discovery and lifecycle.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for plugin '{plugin}'")]
    Init {
        plugin: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for plugin '{plugin}'")]
    Start {
        plugin: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),
    #[error("plugin '{plugin}' depends on unknown '{depends_on}'")]
    UnknownDependency { plugin: String, depends_on: String },
    #[error("cyclic plugin dependency detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<&'static str> },
    #[error("invalid plugin registration:\n{errors:#?}")]
    InvalidConfiguration { errors: Vec<String> },
    #[error("registry builder state corrupted during topo sort")]
    CorruptBuilder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PluginCtx;

    #[derive(Default)]
    struct NoopPlugin;

    #[async_trait::async_trait]
    impl Plugin for NoopPlugin {
        async fn init(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn topo_sort_respects_deps() {
        let mut b = RegistryBuilder::default();
        b.register_core("editor", &["window"], Arc::new(NoopPlugin));
        b.register_core("window", &[], Arc::new(NoopPlugin));

        let reg = b.build_topo_sorted().unwrap();
        let order: Vec<_> = reg.plugins().iter().map(|p| p.name).collect();
        assert_eq!(order, vec!["window", "editor"]);
    }

    #[test]
    fn discovery_order_breaks_ties() {
        let mut b = RegistryBuilder::default();
        b.register_core("a", &[], Arc::new(NoopPlugin));
        b.register_core("b", &[], Arc::new(NoopPlugin));
        b.register_core("c", &[], Arc::new(NoopPlugin));

        let reg = b.build_topo_sorted().unwrap();
        let order: Vec<_> = reg.plugins().iter().map(|p| p.name).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let mut b = RegistryBuilder::default();
        b.register_core("editor", &["missing"], Arc::new(NoopPlugin));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::UnknownDependency { plugin, depends_on } => {
                assert_eq!(plugin, "editor");
                assert_eq!(depends_on, "missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cycle_is_detected_with_path() {
        let mut b = RegistryBuilder::default();
        b.register_core("a", &["b"], Arc::new(NoopPlugin));
        b.register_core("b", &["c"], Arc::new(NoopPlugin));
        b.register_core("c", &["a"], Arc::new(NoopPlugin));
        b.register_core("standalone", &[], Arc::new(NoopPlugin));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::CycleDetected { path } => {
                assert!(path.len() >= 4);
                assert_eq!(path.first(), path.last());
                assert!(!path.contains(&"standalone"));
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn cycle_behind_a_non_first_dependency_is_traced() {
        let mut b = RegistryBuilder::default();
        // the cycle is only reachable through "a"'s second dependency
        b.register_core("a", &["x", "b"], Arc::new(NoopPlugin));
        b.register_core("b", &["a"], Arc::new(NoopPlugin));
        b.register_core("x", &[], Arc::new(NoopPlugin));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::CycleDetected { path } => {
                assert!(!path.is_empty(), "cycle path must be reconstructed");
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"a"));
                assert!(path.contains(&"b"));
                assert!(!path.contains(&"x"));
            }
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_registration_is_a_configuration_error() {
        let mut b = RegistryBuilder::default();
        b.register_core("editor", &[], Arc::new(NoopPlugin));
        b.register_core("editor", &[], Arc::new(NoopPlugin));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::InvalidConfiguration { errors } => {
                assert!(errors.iter().any(|e| e.contains("already registered")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn stateful_must_bind_to_known_core() {
        struct Ghost;
        #[async_trait::async_trait]
        impl StatefulPlugin for Ghost {
            async fn start(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
                Ok(())
            }
            async fn stop(&self, _ctx: &PluginCtx) -> anyhow::Result<crate::contracts::StopFlag> {
                Ok(crate::contracts::StopFlag::Sync)
            }
        }

        let mut b = RegistryBuilder::default();
        b.register_stateful("ghost", Arc::new(Ghost));
        assert!(matches!(
            b.build_topo_sorted().unwrap_err(),
            RegistryError::UnknownPlugin(_)
        ));
    }
}
