//! Crate error type.
//!
//! The box parse/serialize layer speaks `std::io::Result`; the public
//! timeline, track and codec APIs return this `Error` instead. The set
//! of kinds is closed on purpose: callers match on it.
use std::fmt;
use std::io;

/// Everything that can go wrong, by kind.
#[derive(Debug)]
pub enum Error {
    /// Wire-format violation: bad magic, out-of-range field,
    /// self-inconsistent counts.
    InvalidData(String),
    /// Allocation failure.
    MemoryAlloc,
    /// API misuse: zero track id, missing argument.
    FunctionParam(&'static str),
    /// Any other unexpected failure not worth a taxonomy of its own.
    Nameless(String),
    /// A known-unimplemented path.
    PatchWelcome(&'static str),
    /// Underlying I/O failure.
    Stream(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_data(msg: impl Into<String>) -> Error {
        Error::InvalidData(msg.into())
    }

    pub(crate) fn nameless(msg: impl Into<String>) -> Error {
        Error::Nameless(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            Error::MemoryAlloc => write!(f, "memory allocation failure"),
            Error::FunctionParam(msg) => write!(f, "invalid function parameter: {}", msg),
            Error::Nameless(msg) => write!(f, "{}", msg),
            Error::PatchWelcome(msg) => write!(f, "not implemented (patch welcome): {}", msg),
            Error::Stream(e) => write!(f, "stream error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Stream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                Error::InvalidData(e.to_string())
            },
            _ => Error::Stream(e),
        }
    }
}
