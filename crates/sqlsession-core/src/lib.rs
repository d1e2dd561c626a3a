//! Core types for SQLSession Rust.
//!
//! `sqlsession-core` is the **foundation layer** of the workspace. It defines the
//! error types, the diagnostic context and the configuration model every other
//! crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Error contract**: [`Error`] describes what went wrong while reading a
//!   configuration; [`BuildError`] is the single error the factory builder
//!   surfaces, wrapping any underlying failure.
//! - **Diagnostics**: [`ErrorContext`] is a per-thread breadcrumb trail that
//!   gets snapshotted into a [`BuildError`] and reset after every build.
//! - **Data model**: [`Configuration`], [`Settings`], [`Environment`] and
//!   [`Properties`] are the resolved values produced by the parser and held by
//!   the session factory.
//!
//! # Who Uses This Crate
//!
//! - `sqlsession-config` produces a [`Configuration`] from a document stream.
//! - `sqlsession` wraps a [`Configuration`] into a `SessionFactory` and maps
//!   failures into [`BuildError`].

pub mod configuration;
pub mod error;
pub mod error_context;
pub mod properties;

pub use configuration::{
    Configuration, DataSourceConfig, DataSourceKind, Environment, ExecutorType, LocalCacheScope,
    Settings, TransactionManagerConfig, TransactionManagerKind,
};
pub use error::{BuildError, Error, Result};
pub use error_context::ErrorContext;
pub use properties::{DEFAULT_VALUE_SEPARATOR, ENABLE_DEFAULT_VALUE, Properties};
