//! Configuration document parser.
//!
//! [`ConfigParser`] is constructed from a stream (or already-decoded text), an
//! optional environment id and optional property overrides. Construction
//! reads and deserializes the whole document; [`ConfigParser::parse`] then
//! resolves it into a [`Configuration`].
//!
//! # Example
//!
//! ```
//! use sqlsession_config::ConfigParser;
//! use sqlsession_core::Properties;
//!
//! let text = r#"{
//!     "properties": { "url": "sqlite::memory:" },
//!     "environments": {
//!         "default": "dev",
//!         "environment": [{
//!             "id": "dev",
//!             "transactionManager": { "type": "JDBC" },
//!             "dataSource": { "type": "UNPOOLED", "properties": { "url": "${url}" } }
//!         }]
//!     }
//! }"#;
//!
//! let overrides = Properties::new().with("url", "sqlite:app.db");
//! let config = ConfigParser::from_text(text, None, Some(overrides))?.parse()?;
//!
//! let env = config.environment().unwrap();
//! assert_eq!(env.data_source.property("url"), Some("sqlite:app.db"));
//! # Ok::<(), sqlsession_core::Error>(())
//! ```

use std::collections::BTreeMap;
use std::io::Read;

use sqlsession_core::{
    Configuration, DataSourceConfig, Environment, Error, ErrorContext, Properties, Result,
    Settings, TransactionManagerConfig,
};

use crate::document::{ConfigDocument, EnvironmentsNode, FactoryNode, MapperNode};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads a configuration document and resolves it into a [`Configuration`].
///
/// A parser is single-use: [`ConfigParser::parse`] consumes it.
#[derive(Debug)]
pub struct ConfigParser {
    document: ConfigDocument,
    environment: Option<String>,
    overrides: Option<Properties>,
}

impl ConfigParser {
    /// Build a parser from a character stream. The stream must yield UTF-8.
    pub fn from_text_reader<R: Read + ?Sized>(
        reader: &mut R,
        environment: Option<String>,
        overrides: Option<Properties>,
    ) -> Result<Self> {
        ErrorContext::current(|ctx| {
            ctx.set_activity("reading configuration text");
        });
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_text(&text, environment, overrides)
    }

    /// Build a parser from a byte stream. A leading UTF-8 byte order mark is skipped.
    pub fn from_byte_reader<R: Read + ?Sized>(
        reader: &mut R,
        environment: Option<String>,
        overrides: Option<Properties>,
    ) -> Result<Self> {
        ErrorContext::current(|ctx| {
            ctx.set_activity("reading configuration bytes");
        });
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.starts_with(UTF8_BOM) {
            bytes.drain(..UTF8_BOM.len());
        }
        let text = String::from_utf8(bytes)?;
        Self::from_text(&text, environment, overrides)
    }

    /// Build a parser from already-decoded document text.
    pub fn from_text(
        text: &str,
        environment: Option<String>,
        overrides: Option<Properties>,
    ) -> Result<Self> {
        ErrorContext::current(|ctx| {
            ctx.set_activity("parsing configuration document");
        });
        let document = ConfigDocument::from_text(text)?;
        tracing::trace!(bytes = text.len(), "Configuration document deserialized");
        Ok(Self {
            document,
            environment,
            overrides,
        })
    }

    /// Environment explicitly requested at construction, if any.
    pub fn requested_environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Resolve the document into a [`Configuration`].
    #[tracing::instrument(level = "debug", skip(self), fields(environment = ?self.environment))]
    pub fn parse(self) -> Result<Configuration> {
        let ConfigParser {
            document,
            environment,
            overrides,
        } = self;

        let variables = resolve_variables(document.properties, overrides.as_ref());
        let settings = resolve_settings(document.settings, &variables)?;
        let environment = match document.environments {
            Some(node) => Some(select_environment(node, environment, &variables)?),
            None => match environment {
                Some(id) => return Err(Error::UnknownEnvironment(id)),
                None => None,
            },
        };
        let mappers = resolve_mappers(document.mappers, &variables)?;

        tracing::info!(
            environment = environment.as_ref().map(|e| e.id.as_str()),
            variables = variables.len(),
            mappers = mappers.len(),
            "Parsed configuration"
        );

        let mut config = Configuration::new()
            .with_variables(variables)
            .with_settings(settings);
        if let Some(environment) = environment {
            config = config.with_environment(environment);
        }
        for resource in mappers {
            config = config.with_mapper_resource(resource);
        }
        Ok(config)
    }
}

/// Record a new activity; the previous phase's object no longer applies.
fn enter_phase(activity: &'static str) {
    ErrorContext::current(|ctx| {
        ctx.set_activity(activity).clear_object();
    });
}

fn resolve_variables(
    declared: BTreeMap<String, String>,
    overrides: Option<&Properties>,
) -> Properties {
    enter_phase("resolving configuration properties");
    let mut variables = Properties::from(declared);
    if let Some(overrides) = overrides {
        tracing::debug!(overrides = overrides.len(), "Applying property overrides");
        variables.extend_from(overrides);
    }
    variables
}

fn resolve_settings(
    declared: BTreeMap<String, serde_json::Value>,
    variables: &Properties,
) -> Result<Settings> {
    enter_phase("applying settings");

    // Reject misspelled names before touching any value.
    if let Some(name) = declared
        .keys()
        .find(|name| !Settings::KNOWN.contains(&name.as_str()))
    {
        return Err(Error::UnknownSetting(name.clone()));
    }

    let mut settings = Settings::default();
    for (name, raw) in declared {
        ErrorContext::current(|ctx| {
            ctx.set_object(format!("setting {}", name));
        });
        let text = match raw {
            serde_json::Value::String(s) => variables.resolve(&s),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(Error::InvalidSetting {
                    name,
                    value: other.to_string(),
                    expected: "a string, boolean or number",
                });
            }
        };
        settings.apply(&name, &text)?;
    }
    Ok(settings)
}

fn select_environment(
    node: EnvironmentsNode,
    requested: Option<String>,
    variables: &Properties,
) -> Result<Environment> {
    enter_phase("selecting environment");

    let id = requested
        .or_else(|| node.default.map(|d| variables.resolve(&d)))
        .ok_or(Error::NoEnvironment)?;
    ErrorContext::current(|ctx| {
        ctx.set_object(format!("environment {}", id));
    });

    let Some(declared) = node.environment.into_iter().find(|e| e.id == id) else {
        tracing::debug!(environment = %id, "Requested environment is not declared");
        return Err(Error::UnknownEnvironment(id));
    };

    let transaction_manager = declared
        .transaction_manager
        .ok_or_else(|| Error::MissingTransactionManager(id.clone()))?;
    let data_source = declared
        .data_source
        .ok_or_else(|| Error::MissingDataSource(id.clone()))?;

    let (tm_kind, tm_properties) = resolve_factory(transaction_manager, variables);
    let (ds_kind, ds_properties) = resolve_factory(data_source, variables);

    tracing::debug!(environment = %id, data_source = %ds_kind, "Selected environment");
    Ok(Environment {
        transaction_manager: TransactionManagerConfig {
            kind: tm_kind.parse()?,
            properties: tm_properties,
        },
        data_source: DataSourceConfig {
            kind: ds_kind.parse()?,
            properties: ds_properties,
        },
        id,
    })
}

fn resolve_factory(node: FactoryNode, variables: &Properties) -> (String, Properties) {
    let kind = variables.resolve(&node.kind);
    let properties = node
        .properties
        .into_iter()
        .map(|(k, v)| {
            let resolved = variables.resolve(&v);
            (k, resolved)
        })
        .collect();
    (kind, properties)
}

fn resolve_mappers(declared: Vec<MapperNode>, variables: &Properties) -> Result<Vec<String>> {
    enter_phase("collecting mapper resources");
    declared
        .into_iter()
        .map(|mapper| match (mapper.resource, mapper.url) {
            (Some(location), None) | (None, Some(location)) => Ok(variables.resolve(&location)),
            _ => Err(Error::custom(
                "a mapper entry must specify exactly one of 'resource' or 'url'",
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlsession_core::{DataSourceKind, ExecutorType, TransactionManagerKind};
    use std::io::Cursor;
    use std::time::Duration;

    const TWO_ENVIRONMENTS: &str = r#"{
        "properties": { "host": "localhost", "timeout": "10" },
        "settings": { "defaultStatementTimeout": "${timeout}", "defaultExecutorType": "REUSE" },
        "environments": {
            "default": "dev",
            "environment": [
                {
                    "id": "dev",
                    "transactionManager": { "type": "JDBC" },
                    "dataSource": { "type": "UNPOOLED", "properties": { "url": "db://${host}/dev" } }
                },
                {
                    "id": "prod",
                    "transactionManager": { "type": "MANAGED", "properties": { "closeConnection": "false" } },
                    "dataSource": { "type": "POOLED", "properties": { "url": "db://${host}/prod" } }
                }
            ]
        },
        "mappers": [{ "resource": "mappers/user.json" }, { "url": "file:///opt/${host}.json" }]
    }"#;

    #[test]
    fn test_default_environment_selected() {
        let config = ConfigParser::from_text(TWO_ENVIRONMENTS, None, None)
            .unwrap()
            .parse()
            .unwrap();

        let env = config.environment().unwrap();
        assert_eq!(env.id, "dev");
        assert_eq!(env.transaction_manager.kind, TransactionManagerKind::Jdbc);
        assert_eq!(env.data_source.kind, DataSourceKind::Unpooled);
        assert_eq!(env.data_source.property("url"), Some("db://localhost/dev"));
        assert_eq!(
            config.settings().default_statement_timeout,
            Some(Duration::from_secs(10))
        );
        assert_eq!(config.settings().default_executor_type, ExecutorType::Reuse);
        assert_eq!(
            config.mapper_resources(),
            ["mappers/user.json", "file:///opt/localhost.json"]
        );
    }

    #[test]
    fn test_explicit_environment_wins() {
        let config = ConfigParser::from_text(TWO_ENVIRONMENTS, Some("prod".to_string()), None)
            .unwrap()
            .parse()
            .unwrap();

        let env = config.environment().unwrap();
        assert_eq!(env.id, "prod");
        assert_eq!(env.transaction_manager.kind, TransactionManagerKind::Managed);
        assert_eq!(
            env.transaction_manager.properties.get("closeConnection"),
            Some("false")
        );
        assert_eq!(env.data_source.kind, DataSourceKind::Pooled);
    }

    #[test]
    fn test_overrides_win_over_document() {
        let overrides = Properties::new().with("timeout", "30").with("host", "db.prod");
        let config = ConfigParser::from_text(TWO_ENVIRONMENTS, None, Some(overrides))
            .unwrap()
            .parse()
            .unwrap();

        assert_eq!(config.variables().get("timeout"), Some("30"));
        assert_eq!(
            config.settings().default_statement_timeout,
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            config.environment().unwrap().data_source.property("url"),
            Some("db://db.prod/dev")
        );
    }

    #[test]
    fn test_unknown_environment() {
        let err = ConfigParser::from_text(TWO_ENVIRONMENTS, Some("qa".to_string()), None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(id) if id == "qa"));
    }

    #[test]
    fn test_no_environment_selected() {
        let text = r#"{ "environments": { "environment": [] } }"#;
        let err = ConfigParser::from_text(text, None, None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::NoEnvironment));
    }

    #[test]
    fn test_requested_environment_without_environments() {
        let err = ConfigParser::from_text("{}", Some("dev".to_string()), None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(id) if id == "dev"));

        let config = ConfigParser::from_text("{}", None, None)
            .unwrap()
            .parse()
            .unwrap();
        assert!(config.environment().is_none());
    }

    #[test]
    fn test_missing_data_source() {
        let text = r#"{
            "environments": {
                "default": "dev",
                "environment": [{ "id": "dev", "transactionManager": { "type": "JDBC" } }]
            }
        }"#;
        let err = ConfigParser::from_text(text, None, None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::MissingDataSource(id) if id == "dev"));
    }

    #[test]
    fn test_unknown_setting_rejected_before_values() {
        let text = r#"{ "settings": { "cacheEnabled": "maybe", "zzzUnknown": "1" } }"#;
        let err = ConfigParser::from_text(text, None, None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSetting(name) if name == "zzzUnknown"));
    }

    #[test]
    fn test_non_scalar_setting_rejected() {
        let text = r#"{ "settings": { "cacheEnabled": [true] } }"#;
        let err = ConfigParser::from_text(text, None, None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSetting { .. }));
    }

    #[test]
    fn test_mapper_needs_exactly_one_location() {
        let text = r#"{ "mappers": [{ "resource": "a.json", "url": "file:///a.json" }] }"#;
        let err = ConfigParser::from_text(text, None, None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::Custom(_)));
    }

    #[test]
    fn test_byte_reader_skips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{ "properties": { "a": "1" } }"#);
        let config = ConfigParser::from_byte_reader(&mut Cursor::new(bytes), None, None)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(config.variables().get("a"), Some("1"));
    }

    #[test]
    fn test_byte_reader_rejects_invalid_utf8() {
        let mut input = Cursor::new(vec![b'{', 0xFF, b'}']);
        let err = ConfigParser::from_byte_reader(&mut input, None, None).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_text_reader() {
        let mut input = Cursor::new(r#"{ "settings": { "lazyLoadingEnabled": true } }"#);
        let parser = ConfigParser::from_text_reader(&mut input, None, None).unwrap();
        assert_eq!(parser.requested_environment(), None);
        assert!(parser.parse().unwrap().settings().lazy_loading_enabled);
    }

    #[test]
    fn test_parse_records_error_context() {
        ErrorContext::reset();
        let _ = ConfigParser::from_text(TWO_ENVIRONMENTS, Some("qa".to_string()), None)
            .unwrap()
            .parse();
        let ctx = ErrorContext::snapshot();
        assert_eq!(ctx.activity(), Some("selecting environment"));
        assert_eq!(ctx.object(), Some("environment qa"));
        ErrorContext::reset();
    }

    #[test]
    fn test_phase_change_drops_previous_object() {
        let text = r#"{
            "settings": { "cacheEnabled": true },
            "environments": { "environment": [] }
        }"#;
        ErrorContext::reset();
        let err = ConfigParser::from_text(text, None, None)
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, Error::NoEnvironment));

        let ctx = ErrorContext::snapshot();
        assert_eq!(ctx.activity(), Some("selecting environment"));
        assert_eq!(ctx.object(), None);
        ErrorContext::reset();
    }
}
