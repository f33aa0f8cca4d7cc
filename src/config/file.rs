//! File-based configuration source.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use toml::Table;
use tracing::{debug, trace};

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// A TOML file, re-read whenever it changes on disk.
///
/// A required file that is missing fails the load; a missing optional file
/// contributes nothing. The last parsed table is kept and reused while the
/// file's modification time and length stay the same, so polling an
/// unchanged file costs one `stat`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
    cache: Arc<Mutex<Option<Cached>>>,
}

#[derive(Debug)]
struct Cached {
    stamp: Stamp,
    table: Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl Stamp {
    fn of(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

impl FileSource {
    /// Creates a new file source. Nothing is read until the source is loaded.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
            cache: Arc::default(),
        }
    }

    fn read_error(&self, source: std::io::Error) -> ConfigError {
        if source.kind() == ErrorKind::NotFound && self.required {
            ConfigError::FileNotFound(self.path.clone())
        } else {
            ConfigError::ReadError {
                path: self.path.clone(),
                source,
            }
        }
    }

    fn read_table(&self) -> Result<Option<Table>, ConfigError> {
        let mut cache = self.cache.lock();

        let stamp = match std::fs::metadata(&self.path) {
            Ok(metadata) => Stamp::of(&metadata),
            Err(e) if e.kind() == ErrorKind::NotFound && !self.required => {
                debug!(path = %self.path.display(), "optional config file missing, skipping");
                *cache = None;
                return Ok(None);
            }
            Err(e) => return Err(self.read_error(e)),
        };

        // Without a modification time there is nothing reliable to compare.
        if let Some(cached) = cache.as_ref() {
            if cached.stamp == stamp && stamp.modified.is_some() {
                trace!(path = %self.path.display(), "config file unchanged");
                return Ok(Some(cached.table.clone()));
            }
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.read_error(e))?;
        let table: Table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(path = %self.path.display(), "config file parsed");

        *cache = Some(Cached {
            stamp,
            table: table.clone(),
        });
        Ok(Some(table))
    }
}

impl ConfigSource for FileSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self.read_table()?.map(ConfigEntry::root).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn rewrite(path: &Path, contents: &str, modified: SystemTime) {
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.set_modified(modified).unwrap();
    }

    fn url(source: &FileSource) -> String {
        let entries = source.entries().unwrap();
        entries[0].value["service"]["url"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_file_source_loads_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ServiceConfig]\nURL = \"example.com\"").unwrap();

        let entries = FileSource::new(file.path(), true).entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
        assert_eq!(
            entries[0].value["ServiceConfig"]["URL"].as_str(),
            Some("example.com")
        );
    }

    #[test]
    fn test_unchanged_file_reuses_parsed_table() {
        let file = NamedTempFile::new().unwrap();
        let stamp = SystemTime::now() - Duration::from_secs(60);
        rewrite(file.path(), "[service]\nurl = \"aaa\"", stamp);

        let source = FileSource::new(file.path(), true);
        assert_eq!(url(&source), "aaa");

        // Same length and modification time: the cached table is served.
        rewrite(file.path(), "[service]\nurl = \"bbb\"", stamp);
        assert_eq!(url(&source), "aaa");

        rewrite(file.path(), "[service]\nurl = \"bbb\"", stamp + Duration::from_secs(1));
        assert_eq!(url(&source), "bbb");
    }

    #[test]
    fn test_changed_length_is_reparsed() {
        let file = NamedTempFile::new().unwrap();
        let stamp = SystemTime::now() - Duration::from_secs(60);
        rewrite(file.path(), "[service]\nurl = \"a\"", stamp);

        let source = FileSource::new(file.path(), true);
        assert_eq!(url(&source), "a");

        rewrite(file.path(), "[service]\nurl = \"longer\"", stamp);
        assert_eq!(url(&source), "longer");
    }

    #[test]
    fn test_file_source_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "URL = ").unwrap();

        let result = FileSource::new(file.path(), true).entries();
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_file_source_required_missing() {
        let result = FileSource::new("/nonexistent/path/config.toml", true).entries();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_file_source_optional_missing() {
        let entries = FileSource::new("/nonexistent/path/config.toml", false)
            .entries()
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_removed_file_drops_cache() {
        let file = NamedTempFile::new().unwrap();
        rewrite(file.path(), "[service]\nurl = \"a\"", SystemTime::now());
        let source = FileSource::new(file.path(), false);
        assert_eq!(url(&source), "a");

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
        assert!(source.entries().unwrap().is_empty());
        assert!(source.cache.lock().is_none());
    }
}
