//! Source abstraction and the in-memory source.

use std::sync::Arc;

use parking_lot::RwLock;
use toml::{Table, Value};

use super::ConfigError;

/// A value contributed by a source, anchored at `path` in the merged table.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl ConfigEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// Anything that can contribute configuration entries.
///
/// Sources are read on every load, so a dynamic handle picks up whatever a
/// source returns at refresh time.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// A shared, mutable in-memory table.
///
/// Clones share the same table, so a test or an embedding application can
/// keep one clone and call [`set`](Self::set) while a handle reads the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    table: Arc<RwLock<Table>>,
}

impl MemorySource {
    pub fn new(table: Table) -> Self {
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    /// Parses a TOML document into a new source.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let table = toml::from_str(contents).map_err(ConfigError::InlineParseError)?;
        Ok(Self::new(table))
    }

    /// Replaces the whole table.
    pub fn set(&self, table: Table) {
        *self.table.write() = table;
    }

    /// Replaces the whole table with a parsed TOML document.
    pub fn set_toml(&self, contents: &str) -> Result<(), ConfigError> {
        let table = toml::from_str(contents).map_err(ConfigError::InlineParseError)?;
        self.set(table);
        Ok(())
    }
}

impl ConfigSource for MemorySource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let table = self.table.read().clone();
        Ok(vec![ConfigEntry::root(table)])
    }
}

pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => {
                deep_merge(base, overlay);
            }
            (_, value) => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}

fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
