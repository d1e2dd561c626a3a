//! Build immutable session factories from configuration sources.
//!
//! `sqlsession` is the facade crate of the workspace. Hand a
//! [`SessionFactoryBuilder`] a text stream, a byte stream or an
//! already-resolved [`Configuration`], optionally with an environment id and
//! property overrides, and get back a ready [`SessionFactory`] or a single
//! [`BuildError`].
//!
//! # Guarantees
//!
//! - Streams are closed exactly once per build, on success and on failure.
//!   Close failures never override the build outcome.
//! - The calling thread's [`ErrorContext`] is reset after every stream build.
//! - Builds share no state: overrides passed to one build never leak into
//!   another, and concurrent builds on different threads do not interfere.
//!
//! # Example
//!
//! ```
//! use sqlsession::prelude::*;
//!
//! let text = r#"{ "settings": { "cacheEnabled": false } }"#;
//! let factory = SessionFactoryBuilder::new().build(ConfigStream::text(text.as_bytes()))?;
//! assert!(!factory.settings().cache_enabled);
//! # Ok::<(), BuildError>(())
//! ```

pub mod builder;
pub mod factory;
pub mod source;

pub use builder::{BuildOptions, SessionFactoryBuilder};
pub use factory::SessionFactory;
pub use source::{CloseableRead, ConfigStream, ConfigurationSource, OwnedReader, StreamKind};

pub use sqlsession_config::ConfigParser;
pub use sqlsession_core::{
    BuildError, Configuration, DataSourceConfig, DataSourceKind, Environment, Error, ErrorContext,
    ExecutorType, LocalCacheScope, Properties, Settings, TransactionManagerConfig,
    TransactionManagerKind,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        BuildError, BuildOptions, CloseableRead, ConfigStream, Configuration,
        ConfigurationSource, Properties, SessionFactory, SessionFactoryBuilder,
    };
}
