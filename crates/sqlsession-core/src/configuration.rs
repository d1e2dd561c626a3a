//! The parsed configuration model.
//!
//! A [`Configuration`] is the fully resolved, in-memory result of reading a
//! configuration document: variables merged with caller overrides, typed
//! settings, the selected [`Environment`] and the list of mapper resources.
//! It is immutable once built; a session factory only ever reads it.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::properties::Properties;

// ============================================================================
// Settings
// ============================================================================

/// How statements are executed by sessions opened from the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExecutorType {
    /// Prepare a new statement for every execution.
    #[default]
    Simple,
    /// Reuse prepared statements within a session.
    Reuse,
    /// Batch all updates until flush.
    Batch,
}

impl FromStr for ExecutorType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(ExecutorType::Simple),
            "REUSE" => Ok(ExecutorType::Reuse),
            "BATCH" => Ok(ExecutorType::Batch),
            _ => Err(()),
        }
    }
}

/// Lifetime of the per-session local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LocalCacheScope {
    /// Cache results for the whole session.
    #[default]
    Session,
    /// Clear the cache after every statement.
    Statement,
}

impl FromStr for LocalCacheScope {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SESSION" => Ok(LocalCacheScope::Session),
            "STATEMENT" => Ok(LocalCacheScope::Statement),
            _ => Err(()),
        }
    }
}

/// Typed global settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Whether mapper-level caches are enabled.
    pub cache_enabled: bool,
    /// Whether relationships load lazily.
    pub lazy_loading_enabled: bool,
    /// Map `snake_case` columns onto `camelCase` properties.
    pub map_underscore_to_camel_case: bool,
    /// Fetch database-generated keys after inserts.
    pub use_generated_keys: bool,
    /// Default executor for new sessions.
    pub default_executor_type: ExecutorType,
    /// Default statement timeout.
    pub default_statement_timeout: Option<Duration>,
    /// Default driver fetch size hint.
    pub default_fetch_size: Option<u32>,
    /// Scope of the local cache.
    pub local_cache_scope: LocalCacheScope,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            lazy_loading_enabled: false,
            map_underscore_to_camel_case: false,
            use_generated_keys: false,
            default_executor_type: ExecutorType::default(),
            default_statement_timeout: None,
            default_fetch_size: None,
            local_cache_scope: LocalCacheScope::default(),
        }
    }
}

impl Settings {
    /// Names accepted by [`Settings::apply`].
    pub const KNOWN: &'static [&'static str] = &[
        "cacheEnabled",
        "lazyLoadingEnabled",
        "mapUnderscoreToCamelCase",
        "useGeneratedKeys",
        "defaultExecutorType",
        "defaultStatementTimeout",
        "defaultFetchSize",
        "localCacheScope",
    ];

    /// Apply one setting given by its document name and raw string value.
    pub fn apply(&mut self, name: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match name {
            "cacheEnabled" => self.cache_enabled = parse_bool(name, value)?,
            "lazyLoadingEnabled" => self.lazy_loading_enabled = parse_bool(name, value)?,
            "mapUnderscoreToCamelCase" => {
                self.map_underscore_to_camel_case = parse_bool(name, value)?;
            }
            "useGeneratedKeys" => self.use_generated_keys = parse_bool(name, value)?,
            "defaultExecutorType" => {
                self.default_executor_type = value
                    .parse()
                    .map_err(|()| invalid(name, value, "SIMPLE, REUSE or BATCH"))?;
            }
            "defaultStatementTimeout" => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| invalid(name, value, "a number of seconds"))?;
                self.default_statement_timeout = Some(Duration::from_secs(secs));
            }
            "defaultFetchSize" => {
                let size = value
                    .parse::<u32>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| invalid(name, value, "a positive integer"))?;
                self.default_fetch_size = Some(size);
            }
            "localCacheScope" => {
                self.local_cache_scope = value
                    .parse()
                    .map_err(|()| invalid(name, value, "SESSION or STATEMENT"))?;
            }
            _ => return Err(Error::UnknownSetting(name.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(name, value, "true or false"))
    }
}

fn invalid(name: &str, value: &str, expected: &'static str) -> Error {
    Error::InvalidSetting {
        name: name.to_string(),
        value: value.to_string(),
        expected,
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Who owns transaction boundaries for connections of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionManagerKind {
    /// Commit and rollback are issued on the connection directly.
    Jdbc,
    /// An outer container manages the transaction lifecycle.
    Managed,
}

impl FromStr for TransactionManagerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "JDBC" => Ok(TransactionManagerKind::Jdbc),
            "MANAGED" => Ok(TransactionManagerKind::Managed),
            _ => Err(Error::custom(format!(
                "unknown transaction manager type '{}'",
                s
            ))),
        }
    }
}

/// Transaction manager declaration of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionManagerConfig {
    pub kind: TransactionManagerKind,
    pub properties: Properties,
}

/// Kind of connection source used by an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSourceKind {
    /// Open a new connection per request.
    Unpooled,
    /// Keep a pool of open connections.
    Pooled,
    /// Look the data source up from a naming directory.
    Jndi,
}

impl FromStr for DataSourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UNPOOLED" => Ok(DataSourceKind::Unpooled),
            "POOLED" => Ok(DataSourceKind::Pooled),
            "JNDI" => Ok(DataSourceKind::Jndi),
            _ => Err(Error::custom(format!("unknown data source type '{}'", s))),
        }
    }
}

/// Data source declaration of an environment, placeholders already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceConfig {
    pub kind: DataSourceKind,
    pub properties: Properties,
}

impl DataSourceConfig {
    /// Look up a resolved data source property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }
}

/// A named runtime target: transaction manager plus data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub id: String,
    pub transaction_manager: TransactionManagerConfig,
    pub data_source: DataSourceConfig,
}

// ============================================================================
// Configuration
// ============================================================================

/// Fully resolved configuration, produced once per parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Configuration {
    variables: Properties,
    settings: Settings,
    environment: Option<Environment>,
    mapper_resources: Vec<String>,
}

impl Configuration {
    /// Create an empty configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Properties) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    #[must_use]
    pub fn with_mapper_resource(mut self, resource: impl Into<String>) -> Self {
        self.mapper_resources.push(resource.into());
        self
    }

    /// Variables after merging document properties with caller overrides.
    pub fn variables(&self) -> &Properties {
        &self.variables
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The active environment, if the document declares any.
    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    pub fn mapper_resources(&self) -> &[String] {
        &self.mapper_resources
    }
}
