//! Configuration loading and dynamic configuration values.

mod builder;
mod dynamic;
mod env;
mod error;
mod file;
mod option;
mod source;

pub use builder::Config;
pub use dynamic::Dynamic;
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use option::{
    with_env, with_file, with_reload_interval, with_source, with_sub_section, ConfigOption,
    DynamicOptions,
};
pub use source::{ConfigEntry, ConfigSource, MemorySource};
