use thiserror::Error;

/// Errors surfaced by the xkey module.
///
/// Purges never fail: unknown or empty keys simply match nothing. These
/// errors come from configuration handling and index audits.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("index audit failed: {0}")]
    Index(#[from] xkey_index::IndexError),
}

pub type ModuleResult<T> = Result<T, ModuleError>;
