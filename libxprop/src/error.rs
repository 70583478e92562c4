use std::error::Error as StdError;
use std::fmt;

use x11rb::{protocol::xproto::Atom, x11_utils::X11Error};

/// `PropertyResult<T>` provides a simplified result type with a common error type
pub type PropertyResult<T> = std::result::Result<T, ErrorWrapper>;

// X11 protocol error codes that the accessor reports on
pub const BAD_VALUE: u8 = 2;
pub const BAD_WINDOW: u8 = 3;
pub const BAD_ATOM: u8 = 5;
pub const BAD_MATCH: u8 = 8;

/// PropertyError defines all the internal errors that `libxprop` might return
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PropertyError {
    InvalidArgument(String),
    InvalidLength(usize),
    PropertyNotFound(Atom),
    TypeMismatch { expected: Atom, actual: Atom, format: u8 },
    UnknownFormat(u8),
}
impl std::error::Error for PropertyError {}
impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PropertyError::InvalidArgument(ref err) => write!(f, "invalid argument was given: {}", err),
            PropertyError::InvalidLength(ref err) => write!(f, "invalid length was given: {}", err),
            PropertyError::PropertyNotFound(ref err) => write!(f, "property {} was not found", err),
            PropertyError::TypeMismatch { expected, actual, format } => {
                write!(f, "property type {} does not match {} (format {})", actual, expected, format)
            },
            PropertyError::UnknownFormat(ref err) => write!(f, "unknown property format: {}", err),
        }
    }
}

/// XError is an owned copy of an X11 protocol error as delivered to the error handler
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct XError {
    pub error_code: u8,
    pub bad_value: u32,
    pub major_opcode: u8,
    pub request_name: Option<&'static str>,
}
impl XError {
    pub fn new(error_code: u8, bad_value: u32) -> Self {
        Self { error_code, bad_value, major_opcode: 0, request_name: None }
    }
}
impl std::error::Error for XError {}
impl fmt::Display for XError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "X error: code={}, bad value={}, request={} ({})",
            self.error_code,
            self.bad_value,
            self.major_opcode,
            self.request_name.unwrap_or("unknown")
        )
    }
}

impl From<&X11Error> for XError {
    fn from(err: &X11Error) -> XError {
        XError {
            error_code: err.error_code,
            bad_value: err.bad_value,
            major_opcode: err.major_opcode,
            request_name: err.request_name,
        }
    }
}

/// ErrorWrapper provides wrapper around all the underlying library dependencys that `libxprop` uses
/// such that we can easily surface all errors from `libxprop` in a single easy way.
#[derive(Debug)]
pub enum ErrorWrapper {
    Property(PropertyError),

    // X11 protocol errors reported by the server
    Protocol(XError),

    // std::str::Utf8Error
    Utf8(std::str::Utf8Error),

    // x11rb errors
    Connect(x11rb::errors::ConnectError),
    Connection(x11rb::errors::ConnectionError),
}
impl ErrorWrapper {
    /// Implemented directly on the `Error` type to reduce casting required
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.as_ref().is::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.as_ref().downcast_ref::<T>()
    }

    /// Implemented directly on the `Error` type to reduce casting required
    /// which allows for using as_ref to get the correct pass through.
    pub fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.as_ref().source()
    }

    /// Get the property error if this is one
    pub fn property(&self) -> Option<&PropertyError> {
        match *self {
            ErrorWrapper::Property(ref err) => Some(err),
            _ => None,
        }
    }
}
impl StdError for ErrorWrapper {}

impl fmt::Display for ErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorWrapper::Property(ref err) => write!(f, "{}", err),
            ErrorWrapper::Protocol(ref err) => write!(f, "{}", err),
            ErrorWrapper::Utf8(ref err) => write!(f, "{}", err),
            ErrorWrapper::Connect(ref err) => write!(f, "{}", err),
            ErrorWrapper::Connection(ref err) => write!(f, "{}", err),
        }
    }
}

impl AsRef<dyn StdError> for ErrorWrapper {
    fn as_ref(&self) -> &(dyn StdError + 'static) {
        match *self {
            ErrorWrapper::Property(ref err) => err,
            ErrorWrapper::Protocol(ref err) => err,
            ErrorWrapper::Utf8(ref err) => err,
            ErrorWrapper::Connect(ref err) => err,
            ErrorWrapper::Connection(ref err) => err,
        }
    }
}

impl From<PropertyError> for ErrorWrapper {
    fn from(err: PropertyError) -> ErrorWrapper {
        ErrorWrapper::Property(err)
    }
}

impl From<XError> for ErrorWrapper {
    fn from(err: XError) -> ErrorWrapper {
        ErrorWrapper::Protocol(err)
    }
}

impl From<std::str::Utf8Error> for ErrorWrapper {
    fn from(err: std::str::Utf8Error) -> ErrorWrapper {
        ErrorWrapper::Utf8(err)
    }
}

// x11rb errors
//--------------------------------------------------------------------------------------------------
impl From<x11rb::errors::ConnectError> for ErrorWrapper {
    fn from(err: x11rb::errors::ConnectError) -> ErrorWrapper {
        ErrorWrapper::Connect(err)
    }
}

impl From<x11rb::errors::ConnectionError> for ErrorWrapper {
    fn from(err: x11rb::errors::ConnectionError) -> ErrorWrapper {
        ErrorWrapper::Connection(err)
    }
}

// Replies carry either a broken connection or a protocol error from the server
impl From<x11rb::errors::ReplyError> for ErrorWrapper {
    fn from(err: x11rb::errors::ReplyError) -> ErrorWrapper {
        match err {
            x11rb::errors::ReplyError::ConnectionError(err) => ErrorWrapper::Connection(err),
            x11rb::errors::ReplyError::X11Error(ref err) => ErrorWrapper::Protocol(XError::from(err)),
        }
    }
}
