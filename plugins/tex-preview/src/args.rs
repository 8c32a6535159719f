use nvim_oxi::Dictionary;
use std::path::PathBuf;
use texsync_nvim_oxi_utils::Error as OxiError;
use texsync_nvim_oxi_utils::dict;
use texsync_nvim_oxi_utils::handles::BufHandle;

#[derive(Debug)]
pub enum ArgsError {
    MissingKey { key: String },
    InvalidValue { key: String, expected: &'static str },
    InvalidHandle { key: String, value: i64 },
    OutOfRange { key: String, value: i64 },
    EmptyValue { key: String },
    Unexpected { message: String },
}

pub type ParseResult<T> = std::result::Result<T, ArgsError>;

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey { key } => write!(f, "missing key '{key}'"),
            Self::InvalidValue { key, expected } => {
                write!(f, "invalid value for '{key}', expected {expected}")
            }
            Self::InvalidHandle { key, value } => {
                write!(f, "invalid handle for '{key}': {value}")
            }
            Self::OutOfRange { key, value } => write!(f, "value out of range for '{key}': {value}"),
            Self::EmptyValue { key } => write!(f, "empty value for '{key}'"),
            Self::Unexpected { message } => write!(f, "{message}"),
        }
    }
}

impl From<OxiError> for ArgsError {
    fn from(err: OxiError) -> Self {
        match err {
            OxiError::MissingKey { key } => Self::MissingKey { key },
            OxiError::InvalidValue { key, expected } => Self::InvalidValue { key, expected },
            OxiError::EmptyValue { key } => Self::EmptyValue { key },
            OxiError::Unexpected { message } => Self::Unexpected { message },
            OxiError::Nvim(err) => Self::Unexpected {
                message: err.to_string(),
            },
        }
    }
}

fn require_buf_handle(args: &Dictionary, key: &str) -> ParseResult<BufHandle> {
    let value = dict::require_i64(args, key)?;
    BufHandle::try_from_i64(value).ok_or_else(|| ArgsError::InvalidHandle {
        key: key.to_string(),
        value,
    })
}

fn require_path(args: &Dictionary, key: &str) -> ParseResult<PathBuf> {
    let value = dict::require_string_nonempty(args, key)?;
    Ok(PathBuf::from(value.into_string()))
}

fn optional_path(args: &Dictionary, key: &str) -> ParseResult<Option<PathBuf>> {
    let value = dict::optional_string_nonempty(args, key)?;
    Ok(value.map(|value| PathBuf::from(value.into_string())))
}

fn require_u32(args: &Dictionary, key: &str) -> ParseResult<u32> {
    let value = dict::require_i64(args, key)?;
    u32::try_from(value).map_err(|_| ArgsError::OutOfRange {
        key: key.to_string(),
        value,
    })
}

fn require_i32(args: &Dictionary, key: &str) -> ParseResult<i32> {
    let value = dict::require_i64(args, key)?;
    i32::try_from(value).map_err(|_| ArgsError::OutOfRange {
        key: key.to_string(),
        value,
    })
}

/// A finished compile: the decoded page list and, optionally, its trace.
#[derive(Debug)]
pub struct LoadDocumentArgs {
    pub buf_handle: BufHandle,
    pub source: PathBuf,
    pub document: PathBuf,
    pub trace: Option<PathBuf>,
}

impl LoadDocumentArgs {
    pub fn parse(args: &Dictionary) -> ParseResult<Self> {
        Ok(Self {
            buf_handle: require_buf_handle(args, "buf")?,
            source: require_path(args, "source")?,
            document: require_path(args, "document")?,
            trace: optional_path(args, "trace")?,
        })
    }
}

#[derive(Debug)]
pub struct FailGenerationArgs {
    pub buf_handle: BufHandle,
    pub output: String,
}

impl FailGenerationArgs {
    pub fn parse(args: &Dictionary) -> ParseResult<Self> {
        Ok(Self {
            buf_handle: require_buf_handle(args, "buf")?,
            output: dict::require_string(args, "output")?,
        })
    }
}

#[derive(Debug)]
pub struct CursorMovedArgs {
    pub buf_handle: BufHandle,
    pub line: u32,
}

impl CursorMovedArgs {
    pub fn parse(args: &Dictionary) -> ParseResult<Self> {
        Ok(Self {
            buf_handle: require_buf_handle(args, "buf")?,
            line: require_u32(args, "line")?,
        })
    }
}

/// Raw JSON message received from the rendering target.
#[derive(Debug)]
pub struct TargetMessageArgs {
    pub buf_handle: BufHandle,
    pub message: String,
}

impl TargetMessageArgs {
    pub fn parse(args: &Dictionary) -> ParseResult<Self> {
        Ok(Self {
            buf_handle: require_buf_handle(args, "buf")?,
            message: dict::require_string_nonempty(args, "message")?.into_string(),
        })
    }
}

#[derive(Debug)]
pub struct MagnifyArgs {
    pub buf_handle: BufHandle,
    pub delta: i32,
}

impl MagnifyArgs {
    pub fn parse(args: &Dictionary) -> ParseResult<Self> {
        Ok(Self {
            buf_handle: require_buf_handle(args, "buf")?,
            delta: require_i32(args, "delta")?,
        })
    }
}

pub fn parse_buf_handle(value: i64) -> ParseResult<BufHandle> {
    BufHandle::try_from_i64(value).ok_or_else(|| ArgsError::InvalidHandle {
        key: "buf".to_string(),
        value,
    })
}
