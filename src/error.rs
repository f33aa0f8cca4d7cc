use thiserror::Error;

/// Errors raised while building or reading an [`AppContext`](crate::AppContext).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("provider of {provider} failed: {source}")]
    Provider {
        provider: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("more than one provider supplies {0}")]
    DuplicateProvider(&'static str),

    #[error("no provider registered for {0}")]
    MissingDependency(&'static str),
}
