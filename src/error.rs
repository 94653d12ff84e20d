//! Errors raised while building the middleware configuration.

use thiserror::Error;

/// Invalid value passed to a [`Config`] setter.
///
/// [`Config`]: crate::trace::Config
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("component name must not be empty")]
    EmptyComponentName,
}
