//! Taxonomía de errores por archivo que el enrutador convierte en diagnósticos.

use std::fmt;
use std::io;
use thiserror::Error;

/// Fallos posibles al extraer metadata de un único archivo.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("truncated data: {0}")]
    TruncatedData(String),

    #[error("{0}")]
    UnsupportedType(String),

    #[error("adapter failure: {0}")]
    AdapterFailure(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidFormat,
    TruncatedData,
    UnsupportedType,
    AdapterFailure,
    Io,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::TruncatedData(_) => ErrorKind::TruncatedData,
            Self::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Self::AdapterFailure(_) => ErrorKind::AdapterFailure,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn adapter(message: impl fmt::Display) -> Self {
        Self::AdapterFailure(message.to_string())
    }

    pub fn truncated(what: impl fmt::Display) -> Self {
        Self::TruncatedData(what.to_string())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidFormat => "InvalidFormat",
            Self::TruncatedData => "TruncatedData",
            Self::UnsupportedType => "UnsupportedType",
            Self::AdapterFailure => "AdapterFailure",
            Self::Io => "IOError",
        };
        f.write_str(label)
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_renders_message_verbatim() {
        let err = ExtractError::UnsupportedType("MIME type image/x-foo not supported".to_string());
        assert_eq!(err.to_string(), "MIME type image/x-foo not supported");
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }

    #[test]
    fn io_errors_convert_and_keep_kind() {
        let err: ExtractError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.kind().to_string(), "IOError");
        assert!(err.to_string().starts_with("io error:"));
    }

    #[test]
    fn truncated_helper_prefixes_kind() {
        let err = ExtractError::truncated("IHDR chunk");
        assert_eq!(err.to_string(), "truncated data: IHDR chunk");
    }
}
