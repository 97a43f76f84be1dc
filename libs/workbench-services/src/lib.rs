//! Shared capability interfaces between Workbench plugins.
//!
//! This crate is the only compile-time artifact two collaborating plugins
//! share: service types, generator capability traits and the event topic
//! contract. Implementations live in plugin crates and meet only through
//! the plugkit `ServiceContext` and `EventBus`.

pub mod builder;
pub mod project;
pub mod topics;

pub use builder::{BuildGenerator, BuilderService, CommandInfo};
pub use project::{ProjectGenerator, ProjectInfo, ProjectNode, ProjectService};
