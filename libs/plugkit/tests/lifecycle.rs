//! End-to-end lifecycle tests driving PluginHost over hand-built registries.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use plugkit::context::EmptyConfigProvider;
use plugkit::registry::RegistryBuilder;
use plugkit::{
    GeneratorHub, Plugin, PluginCtx, PluginHost, PluginState, StatefulPlugin, StopFlag,
};

type Journal = Arc<Mutex<Vec<String>>>;

struct Probe {
    name: &'static str,
    journal: Journal,
    fail_init: bool,
}

impl Probe {
    fn new(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_init: false,
        })
    }

    fn failing(name: &'static str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_init: true,
        })
    }

    fn log(&self, phase: &str) {
        self.journal.lock().push(format!("{}:{}", self.name, phase));
    }
}

#[plugkit::async_trait]
impl Plugin for Probe {
    async fn init(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
        self.log("init");
        if self.fail_init {
            anyhow::bail!("intentional init failure");
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[plugkit::async_trait]
impl StatefulPlugin for Probe {
    async fn start(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
        self.log("start");
        Ok(())
    }

    async fn stop(&self, _ctx: &PluginCtx) -> anyhow::Result<StopFlag> {
        self.log("stop");
        Ok(StopFlag::Sync)
    }
}

fn host_from(builder: RegistryBuilder) -> PluginHost {
    let registry = builder.build_topo_sorted().unwrap();
    PluginHost::new(
        registry,
        Arc::new(EmptyConfigProvider),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn every_init_completes_before_any_start() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let a = Probe::new("a", &journal);
    let b = Probe::new("b", &journal);

    let mut builder = RegistryBuilder::default();
    builder.register_core("a", &[], a.clone());
    builder.register_stateful("a", a);
    builder.register_core("b", &["a"], b.clone());
    builder.register_stateful("b", b);

    let host = host_from(builder);
    host.run_init_phase().await;
    host.run_start_phase().await;
    host.run_stop_phase().await;

    let log = journal.lock().clone();
    assert_eq!(
        log,
        vec!["a:init", "b:init", "a:start", "b:start", "b:stop", "a:stop"]
    );
    assert_eq!(host.plugin_state("a"), Some(PluginState::Stopped));
    assert_eq!(host.plugin_state("b"), Some(PluginState::Stopped));
}

#[tokio::test]
async fn failed_init_disables_only_that_plugin() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let bad = Probe::failing("bad", &journal);
    let good = Probe::new("good", &journal);
    let dependent = Probe::new("dependent", &journal);

    let mut builder = RegistryBuilder::default();
    builder.register_core("bad", &[], bad);
    builder.register_core("good", &[], good.clone());
    builder.register_stateful("good", good);
    builder.register_core("dependent", &["bad"], dependent);

    let host = host_from(builder);
    host.run_init_phase().await;
    host.run_start_phase().await;

    assert_eq!(host.plugin_state("bad"), Some(PluginState::Disabled));
    // a plugin depending on a disabled one is disabled, not crashed
    assert_eq!(host.plugin_state("dependent"), Some(PluginState::Disabled));
    assert_eq!(host.plugin_state("good"), Some(PluginState::Started));

    let log = journal.lock().clone();
    assert!(!log.contains(&"dependent:init".to_string()));
    assert!(log.contains(&"good:start".to_string()));
}

struct DeferredStopper {
    journal: Journal,
    hang_forever: bool,
}

#[plugkit::async_trait]
impl Plugin for DeferredStopper {
    async fn init(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[plugkit::async_trait]
impl StatefulPlugin for DeferredStopper {
    async fn start(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self, _ctx: &PluginCtx) -> anyhow::Result<StopFlag> {
        let (tx, rx) = oneshot::channel();
        let journal = Arc::clone(&self.journal);
        if self.hang_forever {
            // drop tx so the receiver never resolves; host must time out
            std::mem::forget(tx);
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                journal.lock().push("background-drained".into());
                let _ = tx.send(());
            });
        }
        Ok(StopFlag::Deferred(rx))
    }
}

#[tokio::test]
async fn deferred_stop_waits_for_completion_signal() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let plugin = Arc::new(DeferredStopper {
        journal: Arc::clone(&journal),
        hang_forever: false,
    });

    let mut builder = RegistryBuilder::default();
    builder.register_core("worker", &[], plugin.clone());
    builder.register_stateful("worker", plugin);

    let host = host_from(builder).with_stop_deadline(Duration::from_secs(2));
    host.run_init_phase().await;
    host.run_start_phase().await;
    host.run_stop_phase().await;

    assert_eq!(journal.lock().clone(), vec!["background-drained"]);
    assert_eq!(host.plugin_state("worker"), Some(PluginState::Stopped));
}

#[tokio::test]
async fn deferred_stop_deadline_bounds_shutdown() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let plugin = Arc::new(DeferredStopper {
        journal,
        hang_forever: true,
    });

    let mut builder = RegistryBuilder::default();
    builder.register_core("stuck", &[], plugin.clone());
    builder.register_stateful("stuck", plugin);

    let host = host_from(builder).with_stop_deadline(Duration::from_millis(50));
    host.run_init_phase().await;
    host.run_start_phase().await;

    let shutdown = tokio::time::timeout(Duration::from_secs(1), host.run_stop_phase()).await;
    assert!(shutdown.is_ok(), "stop phase must not hang past the deadline");
    assert_eq!(host.plugin_state("stuck"), Some(PluginState::Stopped));
}

// Provider publishes a generator hub as a service; a consumer started later
// resolves it and uses get-or-create. Exercises the cross-plugin wiring the
// two-pass lifecycle exists for.
trait BuildTool: Send + Sync {
    fn tool(&self) -> &'static str;
}

struct Ninja;
impl BuildTool for Ninja {
    fn tool(&self) -> &'static str {
        "ninja"
    }
}

struct ProviderPlugin;

#[plugkit::async_trait]
impl Plugin for ProviderPlugin {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let hub: Arc<GeneratorHub<dyn BuildTool>> = Arc::new(GeneratorHub::new());
        hub.reg_class("ninja", || Arc::new(Ninja))?;
        ctx.services()
            .register::<GeneratorHub<dyn BuildTool>>("BuildToolHub", hub)?;
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct ConsumerPlugin {
    seen: Journal,
}

#[plugkit::async_trait]
impl Plugin for ConsumerPlugin {
    async fn init(&self, _ctx: &PluginCtx) -> anyhow::Result<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[plugkit::async_trait]
impl StatefulPlugin for ConsumerPlugin {
    async fn start(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
        let hub = ctx.service_required::<GeneratorHub<dyn BuildTool>>("BuildToolHub")?;
        let first = hub.get_or_create("ninja")?;
        let second = hub.get_or_create("ninja")?;
        assert!(Arc::ptr_eq(&first, &second));
        self.seen.lock().push(first.tool().to_string());
        Ok(())
    }

    async fn stop(&self, _ctx: &PluginCtx) -> anyhow::Result<StopFlag> {
        Ok(StopFlag::Sync)
    }
}

#[tokio::test]
async fn consumer_start_sees_provider_service() {
    let seen: Journal = Arc::new(Mutex::new(Vec::new()));
    let consumer = Arc::new(ConsumerPlugin {
        seen: Arc::clone(&seen),
    });

    let mut builder = RegistryBuilder::default();
    // consumer registers before provider, with no declared dep: the
    // two-pass lifecycle alone must make the lookup succeed
    builder.register_core("consumer", &[], consumer.clone());
    builder.register_stateful("consumer", consumer);
    builder.register_core("provider", &[], Arc::new(ProviderPlugin));

    let host = host_from(builder);
    host.run_init_phase().await;
    host.run_start_phase().await;

    assert_eq!(seen.lock().clone(), vec!["ninja"]);
    assert_eq!(host.plugin_state("consumer"), Some(PluginState::Started));
}
