//! Registry configuration

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Asset registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Spare slots reserved in the handler pool
    pub handler_pool_capacity: usize,
    /// Spare slots reserved in the consumer record pool
    pub record_pool_capacity: usize,
    /// Record the caller location of each request for leak diagnostics
    pub capture_traces: bool,
    /// Log dangling consumers found by automatic sweeps
    pub report_dangling: bool,
    /// Ticks between automatic sweeps (0 disables them)
    pub sweep_interval: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            handler_pool_capacity: 3000,
            record_pool_capacity: 9000,
            capture_traces: cfg!(debug_assertions),
            report_dangling: cfg!(debug_assertions),
            sweep_interval: 0,
        }
    }
}

impl RegistryConfig {
    /// Set pool preallocation for handlers and records
    pub fn with_pool_capacity(mut self, handlers: usize, records: usize) -> Self {
        self.handler_pool_capacity = handlers;
        self.record_pool_capacity = records;
        self
    }

    /// Enable or disable capture-site tracking
    pub fn with_traces(mut self, capture: bool) -> Self {
        self.capture_traces = capture;
        self
    }

    /// Run a sweep every `interval` ticks, optionally reporting dangling consumers
    pub fn with_sweep_interval(mut self, interval: u32, report: bool) -> Self {
        self.sweep_interval = interval;
        self.report_dangling = report;
        self
    }

    /// Parse a configuration from RON text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }
}

/// Errors that can occur while loading a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error
    Io(String),
    /// Deserialization error
    Deserialize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Deserialize(e) => write!(f, "Deserialization error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
