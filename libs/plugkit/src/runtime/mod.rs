mod host;
mod runner;
mod shutdown;

pub use host::{PluginHost, PluginState};
pub use runner::{run, RunOptions, ShutdownOptions};
pub use shutdown::wait_for_shutdown;
