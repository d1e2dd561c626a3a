//! Session factory builder.
//!
//! Every build funnels through one path:
//!
//! 1. A [`ConfigurationSource::Parsed`] source is wrapped directly.
//! 2. A stream is handed to a [`ConfigParser`] together with the optional
//!    environment id and property overrides from [`BuildOptions`].
//! 3. The parsed [`Configuration`] is wrapped into a [`SessionFactory`].
//! 4. Any failure along the way becomes a [`BuildError`].
//!
//! For stream sources a cleanup guard runs on every exit path: it resets the
//! thread's [`ErrorContext`] and then closes the stream. A failing close is
//! logged and otherwise ignored, so it can never replace the real outcome.
//!
//! # Example
//!
//! ```
//! use sqlsession::{BuildOptions, ConfigStream, SessionFactoryBuilder};
//!
//! let text = r#"{
//!     "environments": {
//!         "default": "dev",
//!         "environment": [{
//!             "id": "dev",
//!             "transactionManager": { "type": "JDBC" },
//!             "dataSource": { "type": "POOLED", "properties": { "url": "${url}" } }
//!         }]
//!     }
//! }"#;
//!
//! let factory = SessionFactoryBuilder::new().build_with(
//!     ConfigStream::text(text.as_bytes()),
//!     BuildOptions::new().environment("dev").property("url", "sqlite::memory:"),
//! )?;
//!
//! let env = factory.environment().unwrap();
//! assert_eq!(env.data_source.property("url"), Some("sqlite::memory:"));
//! # Ok::<(), sqlsession::BuildError>(())
//! ```

use sqlsession_config::ConfigParser;
use sqlsession_core::{BuildError, Configuration, ErrorContext, Properties};

use crate::factory::SessionFactory;
use crate::source::{CloseableRead, ConfigStream, ConfigurationSource, StreamKind};

/// Optional inputs for a stream build.
///
/// Leaving a field unset defers to whatever the configuration document says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    environment: Option<String>,
    properties: Option<Properties>,
    resource: Option<String>,
}

impl BuildOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a named environment instead of the document's default.
    #[must_use]
    pub fn environment(mut self, id: impl Into<String>) -> Self {
        self.environment = Some(id.into());
        self
    }

    /// Replace the property overrides. `None` means no overrides.
    #[must_use]
    pub fn properties(mut self, properties: impl Into<Option<Properties>>) -> Self {
        self.properties = properties.into();
        self
    }

    /// Add a single property override.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .set(key, value);
        self
    }

    /// Name the stream's origin for error messages (a path or URL).
    #[must_use]
    pub fn resource(mut self, name: impl Into<String>) -> Self {
        self.resource = Some(name.into());
        self
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn property_overrides(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }
}

/// Builds [`SessionFactory`] instances from configuration sources.
///
/// The builder holds no state. One instance can serve any number of builds,
/// from any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFactoryBuilder;

impl SessionFactoryBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build from any source using default options.
    ///
    /// A [`ConfigurationSource::Parsed`] source cannot fail.
    pub fn build(
        &self,
        source: impl Into<ConfigurationSource>,
    ) -> Result<SessionFactory, BuildError> {
        match source.into() {
            ConfigurationSource::Stream(stream) => self.build_with(stream, BuildOptions::default()),
            ConfigurationSource::Parsed(configuration) => {
                Ok(self.build_from_configuration(configuration))
            }
        }
    }

    /// Parse a stream with an optional environment and property overrides.
    ///
    /// The stream is closed before this returns, on success and on failure.
    #[tracing::instrument(
        level = "debug",
        skip(self, stream, options),
        fields(
            kind = ?stream.kind(),
            environment = ?options.environment,
            overrides = options.properties.as_ref().map_or(0, Properties::len),
        )
    )]
    pub fn build_with(
        &self,
        stream: ConfigStream,
        options: BuildOptions,
    ) -> Result<SessionFactory, BuildError> {
        let (kind, reader) = stream.into_parts();
        let mut guard = StreamGuard::new(reader);

        let BuildOptions {
            environment,
            properties,
            resource,
        } = options;
        if let Some(resource) = resource {
            ErrorContext::current(|ctx| {
                ctx.set_resource(resource);
            });
        }

        let parser = match kind {
            StreamKind::Text => {
                ConfigParser::from_text_reader(guard.reader(), environment, properties)
            }
            StreamKind::Bytes => {
                ConfigParser::from_byte_reader(guard.reader(), environment, properties)
            }
        };

        match parser.and_then(ConfigParser::parse) {
            Ok(configuration) => Ok(self.build_from_configuration(configuration)),
            Err(err) => {
                tracing::debug!(error = %err, "Session factory build failed");
                // Wrap while the guard is alive so the context is still populated.
                Err(BuildError::wrap(err))
            }
        }
    }

    /// Wrap an already-resolved configuration.
    pub fn build_from_configuration(&self, configuration: Configuration) -> SessionFactory {
        tracing::debug!(
            environment = configuration.environment().map(|e| e.id.as_str()),
            "Building session factory"
        );
        SessionFactory::from_configuration(configuration)
    }
}

/// Resets the diagnostic context and closes the stream when dropped.
struct StreamGuard {
    reader: Box<dyn CloseableRead>,
}

impl StreamGuard {
    fn new(reader: Box<dyn CloseableRead>) -> Self {
        Self { reader }
    }

    fn reader(&mut self) -> &mut dyn CloseableRead {
        self.reader.as_mut()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        ErrorContext::reset();
        if let Err(err) = self.reader.close() {
            tracing::debug!(error = %err, "Ignoring failure while closing configuration stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = BuildOptions::new()
            .environment("dev")
            .property("timeout", "30")
            .property("user", "app")
            .resource("config/app.json");

        assert_eq!(options.environment_id(), Some("dev"));
        let overrides = options.property_overrides().unwrap();
        assert_eq!(overrides.get("timeout"), Some("30"));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_options_default_is_empty() {
        let options = BuildOptions::default();
        assert_eq!(options.environment_id(), None);
        assert_eq!(options.property_overrides(), None);
        assert_eq!(options, BuildOptions::new());
    }

    #[test]
    fn test_build_parsed_configuration() {
        let factory = SessionFactoryBuilder::new()
            .build(Configuration::new())
            .unwrap();
        assert!(factory.environment().is_none());
    }

    #[test]
    fn test_parsed_build_leaves_error_context_alone() {
        ErrorContext::reset();
        ErrorContext::current(|ctx| {
            ctx.set_activity("caller work");
        });
        let _ = SessionFactoryBuilder::new().build_from_configuration(Configuration::new());
        assert_eq!(ErrorContext::snapshot().activity(), Some("caller work"));
        ErrorContext::reset();
    }

    #[test]
    fn test_guard_resets_context() {
        ErrorContext::current(|ctx| {
            ctx.set_activity("mid-parse");
        });
        drop(StreamGuard::new(Box::new(crate::source::OwnedReader::new(
            std::io::empty(),
        ))));
        assert!(ErrorContext::snapshot().is_empty());
    }
}
