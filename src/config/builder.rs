use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::debug;

use super::env::EnvSource;
use super::file::FileSource;
use super::source::{merge_at_path, ConfigSource};
use super::ConfigError;

/// Builder for loading configuration from layered sources.
///
/// Sources are merged in registration order, with later sources overriding
/// earlier ones. Nested tables are merged recursively; other values
/// (including arrays) are replaced entirely.
///
/// The builder is cheap to clone and every [`load`](Self::load) reads all
/// sources again, which is what [`Dynamic`](super::Dynamic) relies on to
/// refresh.
///
/// ## Example
///
/// ```no_run
/// use dragon_fxconfig::Config;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Database {
///     host: String,
///     port: u16,
/// }
///
/// let db: Database = Config::builder()
///     .with_file("config/default.toml", true)
///     .with_env("MYAPP", "__")
///     .with_file("config/local.toml", false)
///     .with_sub_section("database")
///     .build()?;
/// # Ok::<(), dragon_fxconfig::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<Arc<dyn ConfigSource>>,
    sub_section: Option<String>,
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a TOML file to be loaded.
    ///
    /// If `required` is `true`, loading fails if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Loads configuration from environment variables with the given prefix.
    ///
    /// With `MYAPP__DATABASE__HOST=localhost`, `with_env("MYAPP", "__")`
    /// yields `database.host = "localhost"`.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds a custom source.
    pub fn with_source(self, source: impl ConfigSource + 'static) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    /// Adds a source that may also be held elsewhere.
    pub fn with_shared_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Deserializes from a named sub-section instead of the root table.
    ///
    /// Dotted names (`services.billing`) address nested tables. Each segment
    /// matches exactly if possible, otherwise ignoring ASCII case.
    pub fn with_sub_section(mut self, name: impl Into<String>) -> Self {
        self.sub_section = Some(name.into());
        self
    }

    /// Loads and merges all sources, returning the selected value.
    pub fn load(&self) -> Result<Value, ConfigError> {
        let mut merged = Table::new();

        for source in &self.sources {
            for entry in source.entries()? {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }
        debug!(
            sources = self.sources.len(),
            sub_section = self.sub_section.as_deref(),
            "configuration loaded"
        );

        match &self.sub_section {
            Some(name) => select_sub_section(merged, name).map(Value::Table),
            None => Ok(Value::Table(merged)),
        }
    }

    /// Loads and deserializes the configuration once.
    pub fn build<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        parse(self.load()?)
    }
}

pub(crate) fn parse<T: DeserializeOwned>(value: Value) -> Result<T, ConfigError> {
    value.try_into().map_err(ConfigError::DeserializeError)
}

fn select_sub_section(root: Table, name: &str) -> Result<Table, ConfigError> {
    let mut current = root;

    for segment in name.split('.') {
        let key = current
            .keys()
            .find(|k| k.as_str() == segment)
            .or_else(|| current.keys().find(|k| k.eq_ignore_ascii_case(segment)))
            .cloned()
            .ok_or_else(|| ConfigError::SubSectionNotFound(name.to_string()))?;

        current = match current.remove(&key) {
            Some(Value::Table(table)) => table,
            _ => return Err(ConfigError::NotATable(name.to_string())),
        };
    }

    Ok(current)
}
