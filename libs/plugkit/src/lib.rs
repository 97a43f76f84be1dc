//! # Plugkit — plugin and service framework
//!
//! Assembles a desktop application at runtime from independently loadable
//! plugins. The framework provides:
//!
//! - **Discovery**: plugin crates submit a [`registry::Registrator`] via
//!   `inventory`; the host collects, validates and dependency-orders them.
//! - **Lifecycle**: two full passes — `init()` on every plugin, then
//!   `start()` on every plugin — so a service registered by any plugin is
//!   visible to every consumer before any consumer runs. `stop()` unwinds
//!   in reverse, supporting deferred async completion with a deadline.
//! - **Services**: a [`ServiceContext`] directory of named singletons with
//!   typed lookup; the only coupling between plugins is a shared interface
//!   crate.
//! - **Factories**: [`ClassFactory`]/[`NamedRegistry`]/[`GeneratorHub`] for
//!   pluggable named implementations ("ninja", "gradle", ...) constructed
//!   lazily, one instance per key.
//! - **Events**: a synchronous topic [`EventBus`] with ordered dispatch and
//!   re-entrancy protection.
//! - **Slots**: [`Slot`] fields for cross-plugin interface forwarding
//!   resolved at call time.
//!
//! ## Registering a plugin
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plugkit::{Plugin, PluginCtx, registry::{RegistryBuilder, Registrator}};
//!
//! #[derive(Default)]
//! struct FindPlugin;
//!
//! #[plugkit::async_trait]
//! impl Plugin for FindPlugin {
//!     async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()> {
//!         let windows = ctx.service_required::<dyn WindowService>("WindowService")?;
//!         // register services, bind slots, subscribe handlers ...
//!         Ok(())
//!     }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! inventory::submit! {
//!     Registrator(|b: &mut RegistryBuilder| {
//!         b.register_core("find", &["window"], Arc::new(FindPlugin));
//!     })
//! }
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Re-export inventory so plugin crates submit registrators without adding
// the dependency themselves.
pub use inventory;

pub mod context;
pub mod contracts;
pub mod event_bus;
pub mod factory;
pub mod registry;
pub mod runtime;
pub mod services;
pub mod slot;

pub use context::{ConfigError, ConfigProvider, EmptyConfigProvider, PluginContextBuilder, PluginCtx};
pub use contracts::{EventHandler, Plugin, StatefulPlugin, StopFlag};
pub use event_bus::{Event, EventBus, EventBusError};
pub use factory::{ClassFactory, FactoryError, GeneratorHub, NamedRegistry};
pub use registry::{PluginRegistry, RegistryError};
pub use runtime::{run, PluginHost, PluginState, RunOptions, ShutdownOptions};
pub use services::{ServiceContext, ServiceError};
pub use slot::{Slot, SlotError};
