//! Bridges dynamic configuration into [`AppContext`](crate::AppContext) providers.

use serde::de::DeserializeOwned;

use crate::config::{ConfigError, ConfigOption, Dynamic};

/// Returns a constructor of a [`Dynamic`] handle and the parsed value of `T`.
///
/// Nothing happens until the returned closure is called; it then builds the
/// handle from `options` and returns `(handle, snapshot)` exactly as
/// [`Dynamic::new`] does, errors included.
///
/// ```no_run
/// use dragon_fxconfig::config::{with_file, with_sub_section, Dynamic};
/// use dragon_fxconfig::AppContext;
/// use serde::Deserialize;
///
/// #[derive(Clone, Deserialize)]
/// struct ServiceConfig {
///     url: String,
/// }
///
/// let ctx = AppContext::builder()
///     .provide(dragon_fxconfig::new(vec![
///         with_file("config.toml", true),
///         with_sub_section::<ServiceConfig>("ServiceConfig"),
///     ]))
///     .build()?;
///
/// let initial = ctx.get::<ServiceConfig>()?;
/// let live = ctx.get::<Dynamic<ServiceConfig>>()?;
/// assert_eq!(live.load().url, initial.url);
/// # Ok::<(), dragon_fxconfig::Error>(())
/// ```
pub fn new<T>(
    options: Vec<ConfigOption<T>>,
) -> impl Fn() -> Result<(Dynamic<T>, T), ConfigError> + Send + Sync + 'static
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    move || Dynamic::new(options.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{with_file, with_source, with_sub_section, MemorySource};
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Endpoint {
        url: String,
    }

    #[test]
    fn test_factory_matches_direct_construction() {
        let source = MemorySource::from_toml("[endpoint]\nurl = \"example.com\"").unwrap();
        let options = vec![
            with_source::<Endpoint>(source),
            with_sub_section("endpoint"),
        ];

        let (_, direct) = Dynamic::new(options.clone()).unwrap();
        let (handle, provided) = new(options)().unwrap();

        assert_eq!(provided, direct);
        assert_eq!(*handle.load(), direct);
    }

    #[test]
    fn test_factory_can_be_called_repeatedly() {
        let source = MemorySource::from_toml("[endpoint]\nurl = \"a\"").unwrap();
        let factory = new(vec![
            with_source::<Endpoint>(source.clone()),
            with_sub_section("endpoint"),
        ]);

        let (first, _) = factory().unwrap();
        source.set_toml("[endpoint]\nurl = \"b\"").unwrap();
        let (second, snapshot) = factory().unwrap();

        assert_eq!(first.load().url, "a");
        assert_eq!(second.load().url, "b");
        assert_eq!(snapshot.url, "b");
    }

    #[test]
    fn test_errors_pass_through_unchanged() {
        let factory = new(vec![with_file::<Endpoint>("/nonexistent/config.toml", true)]);

        let result = factory();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
