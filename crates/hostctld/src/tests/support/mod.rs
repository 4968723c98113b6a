//! Test harness utilities for the daemon behavioural suites.

mod config_loader;
mod reporter;
mod world;

pub use config_loader::TestConfigLoader;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{StartupWorld, world};
