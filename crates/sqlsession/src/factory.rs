//! The immutable session factory produced by a build.

use std::sync::Arc;

use sqlsession_core::{Configuration, Environment, Properties, Settings};

/// Runtime entry point wrapping a resolved [`Configuration`].
///
/// Cloning is cheap and every clone shares the same configuration. Factories
/// produced by separate builds never share anything.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    configuration: Arc<Configuration>,
}

impl SessionFactory {
    /// Wrap a configuration. Never fails.
    pub fn from_configuration(configuration: Configuration) -> Self {
        Self {
            configuration: Arc::new(configuration),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.configuration.environment()
    }

    pub fn settings(&self) -> &Settings {
        self.configuration.settings()
    }

    pub fn variables(&self) -> &Properties {
        self.configuration.variables()
    }
}

impl From<Configuration> for SessionFactory {
    fn from(configuration: Configuration) -> Self {
        Self::from_configuration(configuration)
    }
}
