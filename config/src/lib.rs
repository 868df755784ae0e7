//! Settings for ferrule.
//!
//! [`Settings`] is the raw, typed view of the user's `[rust]` configuration
//! table. [`ConfigurationResolver`] turns it into the single-valued
//! [`ferrule_types::EffectiveSettings`] everything downstream consumes.

mod resolver;
mod settings;

pub use resolver::{CONFLICT_MESSAGE, ConfigurationResolver, ConflictChoice, ConflictPrompt};
pub use settings::{
    ConfigError, Settings, config_path, expand_env_vars, workspace_config_path,
};
