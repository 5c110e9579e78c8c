//! DispatcherConfig - ディスパッチャの設定
//!
//! JSON から読める。省略したフィールドは `Default` の値になる。

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Label attached to every log event of this dispatcher.
    pub name: String,

    /// Maximum number of queued (not yet started) requests.
    /// `None` keeps the queue unbounded.
    pub max_pending: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "shuttle".to_string(),
            max_pending: None,
        }
    }
}

impl DispatcherConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn with_max_pending(mut self, capacity: usize) -> Self {
        self.max_pending = Some(capacity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded() {
        let config = DispatcherConfig::default();
        assert_eq!(config.name, "shuttle");
        assert_eq!(config.max_pending, None);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = DispatcherConfig::from_json_str(r#"{ "max_pending": 8 }"#).unwrap();
        assert_eq!(config.name, "shuttle");
        assert_eq!(config.max_pending, Some(8));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = DispatcherConfig::from_json_str(r#"{ "workers": 4 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DispatcherConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
