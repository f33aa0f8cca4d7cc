//! Configuration values that can change while the application runs.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use toml::Value;
use tracing::{debug, info, warn};

use super::builder::parse;
use super::option::{ConfigOption, DynamicOptions};
use super::{Config, ConfigError};

/// A handle to the latest parsed value of `T`.
///
/// Clones share the same value. Reads never block: [`load`](Self::load)
/// returns whatever was published last, either at construction, by
/// [`reload`](Self::reload), or by the background watcher enabled with
/// [`with_reload_interval`](super::with_reload_interval).
///
/// ## Example
///
/// ```no_run
/// use dragon_fxconfig::config::{with_file, with_sub_section, Dynamic};
/// use serde::Deserialize;
///
/// #[derive(Clone, Deserialize)]
/// struct Database {
///     host: String,
/// }
///
/// let (handle, initial) = Dynamic::<Database>::new([
///     with_file("config/default.toml", true),
///     with_sub_section("database"),
/// ])?;
/// assert_eq!(handle.load().host, initial.host);
/// # Ok::<(), dragon_fxconfig::ConfigError>(())
/// ```
pub struct Dynamic<T> {
    shared: Arc<Shared<T>>,
    watcher: Option<Arc<Watcher>>,
}

struct Shared<T> {
    config: Config,
    // Held across load, compare and publish so refreshes apply in order.
    refresh: Mutex<()>,
    raw: ArcSwap<Value>,
    current: ArcSwap<T>,
}

impl<T> Dynamic<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Applies `options`, loads the configuration once and returns the handle
    /// together with the value it was seeded with.
    pub fn new<I>(options: I) -> Result<(Self, T), ConfigError>
    where
        I: IntoIterator<Item = ConfigOption<T>>,
    {
        let mut settings = DynamicOptions::default();
        for option in options {
            option.apply(&mut settings);
        }
        let (config, reload_interval) = settings.into_parts();
        if reload_interval == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroReloadInterval);
        }

        let raw = config.load()?;
        let value: T = parse(raw.clone())?;

        let shared = Arc::new(Shared {
            config,
            refresh: Mutex::new(()),
            raw: ArcSwap::from_pointee(raw),
            current: ArcSwap::from_pointee(value.clone()),
        });

        let watcher = match reload_interval {
            Some(interval) => Some(Arc::new(Watcher::spawn(Arc::clone(&shared), interval)?)),
            None => None,
        };

        Ok((Self { shared, watcher }, value))
    }

    /// Reads the sources again and publishes the result if it changed.
    ///
    /// Returns `Ok(true)` when a new value was published. On error the
    /// current value is left in place.
    pub fn reload(&self) -> Result<bool, ConfigError> {
        self.shared.refresh()
    }
}

impl<T> Dynamic<T> {
    /// Returns the most recently published value.
    pub fn load(&self) -> Arc<T> {
        self.shared.current.load_full()
    }

    /// Whether a background watcher refreshes this handle.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

impl<T> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            watcher: self.watcher.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("current", &**self.shared.current.load())
            .field("watching", &self.is_watching())
            .finish()
    }
}

impl<T: DeserializeOwned> Shared<T> {
    fn refresh(&self) -> Result<bool, ConfigError> {
        let _guard = self.refresh.lock();
        let raw = self.config.load()?;
        if **self.raw.load() == raw {
            return Ok(false);
        }

        let value: T = parse(raw.clone())?;
        self.current.store(Arc::new(value));
        self.raw.store(Arc::new(raw));
        Ok(true)
    }
}

/// Background thread polling the sources; stopped when dropped.
struct Watcher {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    fn spawn<T>(shared: Arc<Shared<T>>, interval: Duration) -> Result<Self, ConfigError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("fxconfig-watch".into())
            .spawn(move || {
                info!(
                    target_type = std::any::type_name::<T>(),
                    ?interval,
                    "config watcher started"
                );
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => match shared.refresh() {
                            Ok(true) => debug!("configuration refreshed"),
                            Ok(false) => {}
                            Err(e) => {
                                warn!(error = %e, "configuration refresh failed, keeping previous value")
                            }
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!(target_type = std::any::type_name::<T>(), "config watcher stopped");
            })
            .map_err(ConfigError::Watch)?;

        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
        })
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        // Disconnecting the channel wakes the thread immediately.
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("config watcher panicked");
            }
        }
    }
}
