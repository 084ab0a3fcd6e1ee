//! Configuration schema and loader for the meadow pipeline.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::load_config;
pub use model::{
    MeadowConfig, MeadowConfigBuilder, ModelLimitsConfig, ObservationConfig, ScriptConfig,
    ServiceConfig, SyncConfig,
};
