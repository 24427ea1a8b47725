// kubeconfig/marshal.rs
use serde::Deserialize;

use super::Config;

impl Config {
    /// Parses a kubeconfig document. JSON is accepted as well since it is a
    /// subset of YAML. An empty (or comment-only) document yields an empty
    /// [`Config`]. Only the first document of a multi-document stream is
    /// read, the same as kubectl.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let Some(document) = serde_yaml::Deserializer::from_str(contents).next() else {
            return Ok(Self::default());
        };

        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            return Ok(Self::default());
        }

        serde_yaml::from_value(value)
    }

    /// Parses a kubeconfig document from raw bytes.
    pub fn from_slice(contents: &[u8]) -> Result<Self, serde_yaml::Error> {
        match std::str::from_utf8(contents) {
            Ok(text) => Self::from_yaml_str(text),
            // Let the YAML parser produce the error for invalid input.
            Err(_) => serde_yaml::from_slice(contents),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
