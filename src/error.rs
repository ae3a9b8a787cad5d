//! Error types for the Quickbridge native interface
//!
//! Two families live here. [`Error`] is what a bridge call returns to native
//! code. [`ErrorKind`] names the script-visible error constructors that
//! [`Error`] values are materialised as when they cross back into script space.

use std::fmt;
use thiserror::Error;

/// The dynamic type a strict accessor or verb required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Boolean,
    Number,
    String,
    Object,
    Function,
    Array,
    BigInt,
    Symbol,
    Promise,
    External,
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedType::Boolean => write!(f, "A boolean was expected"),
            ExpectedType::Number => write!(f, "A number was expected"),
            ExpectedType::String => write!(f, "A string was expected"),
            ExpectedType::Object => write!(f, "An object was expected"),
            ExpectedType::Function => write!(f, "A function was expected"),
            ExpectedType::Array => write!(f, "An array was expected"),
            ExpectedType::BigInt => write!(f, "A bigint was expected"),
            ExpectedType::Symbol => write!(f, "A symbol was expected"),
            ExpectedType::Promise => write!(f, "A promise was expected"),
            ExpectedType::External => write!(f, "An external was expected"),
        }
    }
}

/// Main error type for bridge calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The value's dynamic type does not match what the verb requires
    #[error("{expected}")]
    WrongType { expected: ExpectedType },

    /// A property key was neither a string nor a symbol
    #[error("A string or symbol was expected as property key")]
    WrongKeyType,

    /// An element index fell outside the object's valid index range
    #[error("Index {index} is out of range (length {length})")]
    IndexOutOfRange { index: i64, length: u32 },

    /// A value handle was dereferenced after its owning scope closed
    #[error("Value used after its handle scope was closed")]
    UseAfterScopeClose,

    /// `escape` was called a second time on the same escapable scope
    #[error("Escape called twice on the same escapable scope")]
    EscapeAlreadyCalled,

    /// The object already carries a native wrap slot
    #[error("Object is already wrapped")]
    AlreadyWrapped,

    /// The object carries no native wrap slot
    #[error("Object is not wrapped")]
    NotWrapped,

    /// A script value was thrown and is pending on the environment
    #[error("A script exception is pending")]
    Thrown,

    /// An engine call was attempted while an exception was already pending
    #[error("Cannot call into the engine while an exception is pending")]
    PendingException,

    /// A size or depth bound of the engine was exceeded
    #[error("{what} exceeds the engine limit of {limit}")]
    EngineLimitExceeded { what: &'static str, limit: u64 },

    /// A precondition of the native-facing API was violated
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or parsed
    #[error("ConfigError: {0}")]
    Config(String),
}

/// Script error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// Error - the base kind every other kind inherits from
    GenericError,
    /// TypeError - wrong type for operation
    TypeError,
    /// RangeError - value out of range
    RangeError,
    /// SyntaxError - invalid syntax
    SyntaxError,
    /// ReferenceError - undefined variable
    ReferenceError,
    /// URIError - malformed URI
    UriError,
    /// EvalError - error in eval()
    EvalError,
}

impl ErrorKind {
    /// All kinds, base kind first
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::GenericError,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::SyntaxError,
        ErrorKind::ReferenceError,
        ErrorKind::UriError,
        ErrorKind::EvalError,
    ];

    /// The constructor name the kind is exposed under
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::GenericError => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::UriError => "URIError",
            ErrorKind::EvalError => "EvalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Error {
    /// Shorthand for a [`Error::WrongType`]
    pub fn wrong_type(expected: ExpectedType) -> Self {
        Error::WrongType { expected }
    }

    /// Shorthand for an [`Error::InvalidArgument`]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// The script error kind this failure is raised as when it crosses into
    /// script space from a native callback
    pub fn script_kind(&self) -> ErrorKind {
        match self {
            Error::WrongType { .. } | Error::WrongKeyType => ErrorKind::TypeError,
            Error::IndexOutOfRange { .. } | Error::EngineLimitExceeded { .. } => {
                ErrorKind::RangeError
            }
            _ => ErrorKind::GenericError,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for Quickbridge
pub type Result<T> = std::result::Result<T, Error>;

/// Standardized error message templates
///
/// Messages for errors the bridge itself throws into script space, worded the
/// way the engine's own built-ins word them.
pub mod messages {
    pub const NOT_A_FUNCTION: &str = "is not a function";
    pub const NOT_A_CONSTRUCTOR: &str = "is not a constructor";
    pub const CANNOT_CONVERT_SYMBOL: &str = "Cannot convert a Symbol value to";
    pub const CANNOT_CONVERT_TO_PRIMITIVE: &str = "Cannot convert object to primitive value";
    pub const CANNOT_CONVERT_NULLISH: &str = "Cannot convert undefined or null to object";
    pub const CLASS_WITHOUT_NEW: &str = "cannot be invoked without 'new'";
    pub const INVALID_ARRAY_LENGTH: &str = "Invalid array length";
    pub const CYCLIC_PROTOTYPE: &str = "Cyclic __proto__ value";

    /// Format a "X is not a function" error message
    pub fn not_a_function(name: &str) -> String {
        format!("'{}' {}", name, NOT_A_FUNCTION)
    }

    /// Format a "X is not a constructor" error message
    pub fn not_a_constructor(name: &str) -> String {
        format!("'{}' {}", name, NOT_A_CONSTRUCTOR)
    }

    /// Format a "Cannot convert a Symbol value to X" error message
    pub fn cannot_convert_symbol(to: &str) -> String {
        format!("{} a {}", CANNOT_CONVERT_SYMBOL, to)
    }

    /// Format a "Class constructor X cannot be invoked without 'new'" message
    pub fn class_without_new(name: &str) -> String {
        format!("Class constructor {} {}", name, CLASS_WITHOUT_NEW)
    }
}
