use thiserror::Error;

/// Failure decoding a Lua argument table.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing key `{key}`")]
    MissingKey { key: String },
    #[error("invalid value for `{key}`; expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
    #[error("empty value for `{key}`")]
    EmptyValue { key: String },
    #[error("{message}")]
    Unexpected { message: String },
    #[error("nvim error: {0}")]
    Nvim(#[from] nvim_oxi::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn missing_key(key: &str) -> Self {
        Self::MissingKey {
            key: key.to_string(),
        }
    }

    pub fn invalid_value(key: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            expected,
        }
    }

    pub fn empty_value(key: &str) -> Self {
        Self::EmptyValue {
            key: key.to_string(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}
