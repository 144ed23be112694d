//! Crate-wide error type.

use std::fmt;

/// Errors produced by fallible entry points (`bind`, `save`, `commit`,
/// strict-mode parsing). Operations that the data model treats as
/// recoverable (a wrong-kind `get`, a parse failure reached through the
/// ambient API) surface as [`crate::value::Value::Error`] instead; see
/// the crate-level docs for the propagation policy.
#[derive(Debug)]
pub enum NodelError {
    /// Operation undefined for the value's kind, e.g. indexing a scalar.
    Type(String),
    /// A parser could not decode its input.
    Parse { message: String, offset: usize },
    /// URI scheme not registered, or a URI's configuration is inconsistent.
    Bind(String),
    /// Backend read/write failure.
    Io(std::io::Error),
    /// Attempted cycle, out-of-range structural edit, or corrupted refcount.
    Invariant(String),
    /// Numeric parse or conversion out of representable range.
    Range(String),
}

impl fmt::Display for NodelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodelError::Type(s) => write!(f, "type error: {}", s),
            NodelError::Parse { message, offset } => {
                write!(f, "parse error at offset {}: {}", offset, message)
            }
            NodelError::Bind(s) => write!(f, "bind error: {}", s),
            NodelError::Io(e) => write!(f, "io error: {}", e),
            NodelError::Invariant(s) => write!(f, "invariant violated: {}", s),
            NodelError::Range(s) => write!(f, "range error: {}", s),
        }
    }
}

impl std::error::Error for NodelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NodelError {
    fn from(e: std::io::Error) -> Self {
        NodelError::Io(e)
    }
}

impl From<std::fmt::Error> for NodelError {
    fn from(_: std::fmt::Error) -> Self {
        NodelError::Type("formatting failure".into())
    }
}

/// Result alias used throughout the crate's fallible entry points.
pub type NodelResult<T> = Result<T, NodelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_type_error() {
        let e = NodelError::Type("expected list, found int".into());
        assert_eq!(e.to_string(), "type error: expected list, found int");
    }

    #[test]
    fn test_display_parse_error() {
        let e = NodelError::Parse {
            message: "unexpected end of input".into(),
            offset: 42,
        };
        assert_eq!(
            e.to_string(),
            "parse error at offset 42: unexpected end of input"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: NodelError = io.into();
        assert!(matches!(e, NodelError::Io(_)));
    }

    #[test]
    fn test_bind_error_message() {
        let e = NodelError::Bind("URI scheme not found: foo".into());
        assert_eq!(e.to_string(), "bind error: URI scheme not found: foo");
    }
}
