//! Directives that shape how a [`Dynamic`](super::Dynamic) value is sourced.

use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::source::ConfigSource;
use super::Config;

/// Settings collected from a list of [`ConfigOption`]s before construction.
#[derive(Debug)]
pub struct DynamicOptions<T> {
    config: Config,
    reload_interval: Option<Duration>,
    _target: PhantomData<fn() -> T>,
}

impl<T> Default for DynamicOptions<T> {
    fn default() -> Self {
        Self {
            config: Config::builder(),
            reload_interval: None,
            _target: PhantomData,
        }
    }
}

impl<T> DynamicOptions<T> {
    /// Rewrites the underlying loader.
    pub fn map_config(&mut self, f: impl FnOnce(Config) -> Config) {
        self.config = f(std::mem::take(&mut self.config));
    }

    pub fn set_reload_interval(&mut self, interval: Option<Duration>) {
        self.reload_interval = interval;
    }

    pub(crate) fn into_parts(self) -> (Config, Option<Duration>) {
        (self.config, self.reload_interval)
    }
}

/// A single configuration directive for target type `T`.
///
/// Options are applied in order when the dynamic value is constructed, never
/// when the option itself is created. They are cheap to clone.
pub struct ConfigOption<T> {
    apply: Arc<dyn Fn(&mut DynamicOptions<T>) + Send + Sync>,
}

impl<T> ConfigOption<T> {
    /// Wraps an arbitrary directive.
    pub fn custom(apply: impl Fn(&mut DynamicOptions<T>) + Send + Sync + 'static) -> Self {
        Self {
            apply: Arc::new(apply),
        }
    }

    pub fn apply(&self, options: &mut DynamicOptions<T>) {
        (self.apply)(options);
    }
}

impl<T> Clone for ConfigOption<T> {
    fn clone(&self) -> Self {
        Self {
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<T> fmt::Debug for ConfigOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("target", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// Parses `T` from the named sub-section (dotted for nested tables).
pub fn with_sub_section<T>(name: impl Into<String>) -> ConfigOption<T> {
    let name = name.into();
    ConfigOption::custom(move |opts| opts.map_config(|c| c.with_sub_section(name.clone())))
}

/// Adds a custom source. The same source instance backs every construction.
pub fn with_source<T>(source: impl ConfigSource + 'static) -> ConfigOption<T> {
    let source: Arc<dyn ConfigSource> = Arc::new(source);
    ConfigOption::custom(move |opts| opts.map_config(|c| c.with_shared_source(Arc::clone(&source))))
}

/// Adds a TOML file source.
pub fn with_file<T>(path: impl Into<PathBuf>, required: bool) -> ConfigOption<T> {
    let path = path.into();
    ConfigOption::custom(move |opts| opts.map_config(|c| c.with_file(&path, required)))
}

/// Adds an environment variable source.
pub fn with_env<T>(prefix: impl Into<String>, separator: impl Into<String>) -> ConfigOption<T> {
    let prefix = prefix.into();
    let separator = separator.into();
    ConfigOption::custom(move |opts| {
        opts.map_config(|c| c.with_env(prefix.clone(), separator.clone()))
    })
}

/// Refreshes the value in the background every `interval`.
pub fn with_reload_interval<T>(interval: Duration) -> ConfigOption<T> {
    ConfigOption::custom(move |opts| opts.set_reload_interval(Some(interval)))
}
