use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Error produced while decoding a single raw event line.
///
/// A `DecodeError` never escapes the stream reader: the offending line is
/// dropped and reading continues.
#[derive(Debug)]
pub enum DecodeError {
    /// The line was not a valid JSON object.
    Parse(serde_json::Error),
    /// A required key was absent from the payload.
    MissingField(&'static str),
    /// A present value could not be coerced to the field's type.
    InvalidFieldType {
        field: &'static str,
        expected: &'static str,
    },
    /// The `"type"` discriminant matched none of the known event kinds.
    UnknownEventKind(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Parse(err) => write!(f, "invalid event json: {}", err),
            DecodeError::MissingField(key) => write!(f, "missing field: {}", key),
            DecodeError::InvalidFieldType { field, expected } => {
                write!(f, "{} must be {}", field, expected)
            }
            DecodeError::UnknownEventKind(kind) => write!(f, "unknown event kind: {}", kind),
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DecodeError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> DecodeError {
        DecodeError::Parse(err)
    }
}

/// Transport-level failure during connect or streaming. Unlike decode
/// errors these propagate up to the connection manager, which logs them
/// and drops the connection.
#[derive(Debug)]
pub enum ConnectionError {
    Io(io::Error),
    Ssh(ssh2::Error),
    /// The configured host did not resolve to any address.
    Resolve(String),
    /// Neither a private key nor a password was configured.
    NoAuthMethod,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionError::Io(err) => write!(f, "i/o error: {}", err),
            ConnectionError::Ssh(err) => write!(f, "ssh error: {}", err),
            ConnectionError::Resolve(host) => write!(f, "could not resolve host: {}", host),
            ConnectionError::NoAuthMethod => {
                f.write_str("neither private key nor password configured")
            }
        }
    }
}

impl StdError for ConnectionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConnectionError::Io(err) => Some(err),
            ConnectionError::Ssh(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> ConnectionError {
        ConnectionError::Io(err)
    }
}

impl From<ssh2::Error> for ConnectionError {
    fn from(err: ssh2::Error) -> ConnectionError {
        ConnectionError::Ssh(err)
    }
}
