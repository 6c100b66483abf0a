use std::path::Path;

use serde::{Deserialize, Serialize};
use xkey_index::DEFAULT_POOL_CAPACITY;

use crate::error::{ModuleError, ModuleResult};

/// Configuration for an [`Xkey`](crate::Xkey) context.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XkeyConfig {
    /// Retired nodes kept per kind for reuse. Zero disables pooling.
    pub pool_capacity: usize,
    /// Response headers whose values carry secondary keys. Matched
    /// case-insensitively.
    pub header_names: Vec<String>,
    /// Optional domain tag mixed into every key digest.
    pub digest_domain: Option<String>,
}

impl Default for XkeyConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            header_names: vec!["xkey".into(), "X-HashTwo".into()],
            digest_domain: None,
        }
    }
}

impl XkeyConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> ModuleResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> ModuleResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ModuleResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that header names can be matched as `<name>:` prefixes.
    pub fn validate(&self) -> ModuleResult<()> {
        if self.header_names.is_empty() {
            return Err(ModuleError::Config("header_names must not be empty".into()));
        }
        for name in &self.header_names {
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
                return Err(ModuleError::Config(format!(
                    "invalid header name {name:?}: expected visible ASCII without ':'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = XkeyConfig::default();
        assert_eq!(c.pool_capacity, 5);
        assert_eq!(c.header_names, vec!["xkey".to_string(), "X-HashTwo".to_string()]);
        assert!(c.digest_domain.is_none());
        c.validate().unwrap();
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(XkeyConfig::from_toml_str("").unwrap(), XkeyConfig::default());
    }

    #[test]
    fn partial_document_overrides() {
        let c = XkeyConfig::from_toml_str("pool_capacity = 16\ndigest_domain = \"edge\"").unwrap();
        assert_eq!(c.pool_capacity, 16);
        assert_eq!(c.digest_domain.as_deref(), Some("edge"));
        assert_eq!(c.header_names.len(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = XkeyConfig::from_toml_str("pool_size = 3");
        assert!(matches!(result, Err(ModuleError::TomlParse(_))));
    }

    #[test]
    fn header_names_are_validated() {
        for bad in ["header_names = []", "header_names = [\"x key\"]", "header_names = [\"xkey:\"]"] {
            let result = XkeyConfig::from_toml_str(bad);
            assert!(matches!(result, Err(ModuleError::Config(_))), "{bad}");
        }
    }

    #[test]
    fn toml_roundtrip() {
        let c = XkeyConfig {
            pool_capacity: 0,
            header_names: vec!["Surrogate-Key".into()],
            digest_domain: Some("eu".into()),
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(XkeyConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "header_names = [\"xkey\"]").unwrap();
        let c = XkeyConfig::load(file.path()).unwrap();
        assert_eq!(c.header_names, vec!["xkey".to_string()]);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = XkeyConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ModuleError::Io(_))));
    }
}
