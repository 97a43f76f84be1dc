//! Code editor plugin.
//!
//! Tracks the set of open files, answers jump-to-line requests from other
//! plugins over the event bus, and owns the build output pane, so it binds
//! the builder's `format_output` slot.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use plugkit::registry::{Registrator, RegistryBuilder};
use plugkit::{Event, EventBus, EventHandler, Plugin, PluginCtx};
use workbench_services::{topics, BuilderService};

#[derive(Debug, Clone, Default)]
struct EditorState {
    open_files: Vec<PathBuf>,
    /// Last jump target: `(file, line)`.
    cursor: Option<(PathBuf, usize)>,
}

#[derive(Default)]
pub struct EditorPlugin {
    state: Arc<RwLock<EditorState>>,
}

impl EditorPlugin {
    pub fn open_files(&self) -> Vec<PathBuf> {
        self.state.read().open_files.clone()
    }

    pub fn cursor(&self) -> Option<(PathBuf, usize)> {
        self.state.read().cursor.clone()
    }

    /// Open a file in the editor and announce it. Re-opening an already
    /// open file only moves focus, it is not announced twice.
    pub fn open_file(&self, events: &Arc<EventBus>, path: impl Into<PathBuf>) -> anyhow::Result<()> {
        let path = path.into();
        let newly_opened = {
            let mut state = self.state.write();
            if state.open_files.contains(&path) {
                false
            } else {
                state.open_files.push(path.clone());
                true
            }
        };
        if newly_opened {
            events.publish(topics::EDITOR_FILE_OPENED, vec![json!(path)])?;
        }
        Ok(())
    }
}

struct EditorReceiver {
    state: Arc<RwLock<EditorState>>,
}

impl EventHandler for EditorReceiver {
    fn process(&self, event: &Event) {
        match event.topic() {
            topics::EDITOR_JUMP_TO_LINE => {
                let path = event.property(0).and_then(|v| v.as_str());
                let line = event.property(1).and_then(|v| v.as_u64());
                if let (Some(path), Some(line)) = (path, line) {
                    let path = PathBuf::from(path);
                    let mut state = self.state.write();
                    if !state.open_files.contains(&path) {
                        state.open_files.push(path.clone());
                    }
                    state.cursor = Some((path, line as usize));
                }
            }
            topics::PROJECT_ACTIVATED => {
                // A new project replaces the editing session.
                let mut state = self.state.write();
                state.open_files.clear();
                state.cursor = None;
            }
            _ => {}
        }
    }
}

#[plugkit::async_trait]
impl Plugin for EditorPlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let builder = ctx.service_required::<BuilderService>(BuilderService::NAME)?;
        builder
            .format_output
            .bind(|line: String| format!("[build] {line}"))?;

        ctx.events().subscribe(
            Arc::new(EditorReceiver {
                state: Arc::clone(&self.state),
            }),
            [topics::EDITOR_JUMP_TO_LINE, topics::PROJECT_ACTIVATED],
        );

        tracing::info!("code_editor initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

inventory::submit! {
    Registrator(|b: &mut RegistryBuilder| {
        b.register_core(
            "code_editor",
            &["builder_core"],
            Arc::new(EditorPlugin::default()),
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugkit::context::{EmptyConfigProvider, PluginContextBuilder};
    use plugkit::services::ServiceContext;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> (PluginCtx, Arc<ServiceContext>, Arc<EventBus>) {
        let services = Arc::new(ServiceContext::new());
        services
            .register::<BuilderService>(BuilderService::NAME, Arc::new(BuilderService::new()))
            .unwrap();
        let events = Arc::new(EventBus::new());
        let ctx = PluginContextBuilder::new(
            Arc::new(EmptyConfigProvider),
            Arc::clone(&services),
            Arc::clone(&events),
            CancellationToken::new(),
        )
        .for_plugin("code_editor");
        (ctx, services, events)
    }

    #[tokio::test]
    async fn init_binds_the_output_formatter() {
        let plugin = EditorPlugin::default();
        let (ctx, services, _) = ctx();
        plugin.init(&ctx).await.unwrap();

        let builder = services.get::<BuilderService>(BuilderService::NAME).unwrap();
        assert_eq!(
            builder.format_output.invoke("done".into()).unwrap(),
            "[build] done"
        );
    }

    #[tokio::test]
    async fn open_file_announces_once() {
        let plugin = EditorPlugin::default();
        let (ctx, _, events) = ctx();
        plugin.init(&ctx).await.unwrap();

        let seen = Arc::new(RwLock::new(0usize));
        struct Counter(Arc<RwLock<usize>>);
        impl EventHandler for Counter {
            fn process(&self, _: &Event) {
                *self.0.write() += 1;
            }
        }
        events.subscribe(Arc::new(Counter(Arc::clone(&seen))), [topics::EDITOR_FILE_OPENED]);

        plugin.open_file(&events, "/work/demo/a.rs").unwrap();
        plugin.open_file(&events, "/work/demo/a.rs").unwrap();

        assert_eq!(plugin.open_files(), vec![PathBuf::from("/work/demo/a.rs")]);
        assert_eq!(*seen.read(), 1);
    }

    #[tokio::test]
    async fn jump_request_opens_the_file_and_moves_the_cursor() {
        let plugin = EditorPlugin::default();
        let (ctx, _, events) = ctx();
        plugin.init(&ctx).await.unwrap();

        events
            .publish(
                topics::EDITOR_JUMP_TO_LINE,
                vec![json!("/work/demo/main.rs"), json!(42)],
            )
            .unwrap();

        assert_eq!(plugin.open_files(), vec![PathBuf::from("/work/demo/main.rs")]);
        assert_eq!(
            plugin.cursor(),
            Some((PathBuf::from("/work/demo/main.rs"), 42))
        );
    }

    #[tokio::test]
    async fn project_switch_resets_the_session() {
        let plugin = EditorPlugin::default();
        let (ctx, _, events) = ctx();
        plugin.init(&ctx).await.unwrap();

        plugin.open_file(&events, "/work/demo/a.rs").unwrap();
        events
            .publish(
                topics::PROJECT_ACTIVATED,
                vec![json!("/work/other"), json!("gradle")],
            )
            .unwrap();

        assert!(plugin.open_files().is_empty());
        assert!(plugin.cursor().is_none());
    }
}
