//! Application context for managing shared application state.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Values produced by providers, keyed by type.
#[derive(Default)]
pub struct Values {
    entries: HashMap<TypeId, (&'static str, Box<dyn Any + Send + Sync>)>,
}

impl Values {
    /// Stores `value`, failing if a value of the same type already exists.
    pub fn insert<V: Any + Send + Sync>(&mut self, value: V) -> Result<(), Error> {
        let name = type_name::<V>();
        if self.entries.contains_key(&TypeId::of::<V>()) {
            return Err(Error::DuplicateProvider(name));
        }
        self.entries.insert(TypeId::of::<V>(), (name, Box::new(value)));
        Ok(())
    }

    fn get<V: Any>(&self) -> Option<&V> {
        self.entries
            .get(&TypeId::of::<V>())
            .and_then(|(_, value)| value.downcast_ref())
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|(name, _)| name))
            .finish()
    }
}

/// The set of values a provider places into the context.
///
/// Implemented for tuples so a single provider can supply several values,
/// each keyed by its own type.
pub trait Provided: Send + 'static {
    fn store(self, values: &mut Values) -> Result<(), Error>;
}

macro_rules! impl_provided {
    ($($name:ident),+) => {
        impl<$($name: Any + Send + Sync),+> Provided for ($($name,)+) {
            #[allow(non_snake_case)]
            fn store(self, values: &mut Values) -> Result<(), Error> {
                let ($($name,)+) = self;
                $(values.insert($name)?;)+
                Ok(())
            }
        }
    };
}

impl_provided!(A);
impl_provided!(A, B);
impl_provided!(A, B, C);
impl_provided!(A, B, C, D);

type Construct = Box<dyn FnOnce(&mut Values) -> Result<(), Error> + Send>;

struct Registration {
    provider: &'static str,
    construct: Construct,
}

/// Central application context holding provided values.
///
/// Built in two phases: providers are registered on an
/// [`AppContextBuilder`] without running, then [`build`](AppContextBuilder::build)
/// runs them in registration order.
///
/// ## Example
///
/// ```no_run
/// use dragon_fxconfig::config::{with_file, with_sub_section, Dynamic};
/// use dragon_fxconfig::AppContext;
/// use serde::Deserialize;
///
/// #[derive(Clone, Deserialize)]
/// struct Database {
///     host: String,
/// }
///
/// let ctx = AppContext::builder()
///     .provide(dragon_fxconfig::new(vec![
///         with_file("config.toml", true),
///         with_sub_section::<Database>("database"),
///     ]))
///     .build()?;
///
/// let db = ctx.get::<Dynamic<Database>>()?;
/// println!("{}", db.load().host);
/// # Ok::<(), dragon_fxconfig::Error>(())
/// ```
#[derive(Debug)]
pub struct AppContext {
    values: Values,
}

impl AppContext {
    /// Creates a new builder for constructing an `AppContext`.
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder {
            registrations: Vec::new(),
        }
    }

    /// Returns a reference to the value of type `V`.
    pub fn get<V: Any>(&self) -> Result<&V, Error> {
        self.values
            .get()
            .ok_or(Error::MissingDependency(type_name::<V>()))
    }

    pub fn contains<V: Any>(&self) -> bool {
        self.values.get::<V>().is_some()
    }

    /// Runs `f` against the built context.
    pub fn invoke<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        f(self)
    }
}

/// Builder for constructing an [`AppContext`].
#[must_use = "builders do nothing until .build() is called"]
pub struct AppContextBuilder {
    registrations: Vec<Registration>,
}

impl AppContextBuilder {
    /// Registers a zero-argument provider. It runs during [`build`](Self::build).
    pub fn provide<F, O, E>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<O, E> + Send + 'static,
        O: Provided,
        E: Into<BoxedError> + 'static,
    {
        let name = type_name::<O>();
        self.registrations.push(Registration {
            provider: name,
            construct: Box::new(move |values: &mut Values| {
                let provided = provider().map_err(|e| Error::Provider {
                    provider: name,
                    source: e.into(),
                })?;
                provided.store(values)
            }),
        });
        self
    }

    /// Registers an already constructed value.
    pub fn supply<V: Any + Send + Sync>(self, value: V) -> Self {
        self.provide(move || Ok::<_, Error>((value,)))
    }

    /// Runs every provider in registration order.
    pub fn build(self) -> Result<AppContext, Error> {
        let mut values = Values::default();
        for registration in self.registrations {
            debug!(provider = registration.provider, "running provider");
            (registration.construct)(&mut values)?;
        }
        Ok(AppContext { values })
    }
}

impl fmt::Debug for AppContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| r.provider))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[derive(Debug, PartialEq)]
    struct Host(&'static str);

    #[test]
    fn test_provider_supplies_multiple_values() {
        let ctx = AppContext::builder()
            .provide(|| Ok::<_, Error>((Host("localhost"), Port(8080))))
            .build()
            .unwrap();

        assert_eq!(ctx.get::<Host>().unwrap(), &Host("localhost"));
        assert_eq!(ctx.get::<Port>().unwrap(), &Port(8080));
    }

    #[test]
    fn test_registration_runs_nothing() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let builder = AppContext::builder().provide(move || {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, Error>((Port(1),))
        });
        assert!(!ran.load(Ordering::SeqCst));

        builder.build().unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_provider_error_is_reported() {
        let result = AppContext::builder()
            .provide(|| Err::<(Port,), _>(std::io::Error::other("boom")))
            .build();

        match result {
            Err(Error::Provider { source, .. }) => assert_eq!(source.to_string(), "boom"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_provider() {
        let result = AppContext::builder()
            .supply(Port(1))
            .supply(Port(2))
            .build();

        assert!(matches!(result, Err(Error::DuplicateProvider(_))));
    }

    #[test]
    fn test_missing_dependency() {
        let ctx = AppContext::builder().supply(Port(1)).build().unwrap();

        assert!(ctx.contains::<Port>());
        assert!(!ctx.contains::<Host>());
        assert!(matches!(
            ctx.get::<Host>(),
            Err(Error::MissingDependency(_))
        ));
    }

    #[test]
    fn test_invoke() {
        let ctx = AppContext::builder().supply(Port(7)).build().unwrap();
        let port = ctx.invoke(|ctx| ctx.get::<Port>().map(|p| p.0));
        assert_eq!(port.unwrap(), 7);
    }
}
