use rmpv::Value;
use thiserror::Error;

pub mod classifier;

/// Errors surfaced by the driver.
///
/// Caller errors (`FieldNotFound`, `IndexError`, `DuplicateFieldMutation`,
/// `EmptyTupleOperation`, `ConverterNotFound`) indicate misuse and are not
/// retriable. `NoAvailableConnections` is transient and may be retried after a
/// pool refresh. `BoxError`, `ModuleError` and `Unrecognized` are produced by
/// the error classifier from server-reported payloads, never constructed
/// directly by callers.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("no converter found for {0}")]
    ConverterNotFound(String),

    #[error("field '{0}' not found in space format")]
    FieldNotFound(String),

    #[error("field position {position} is out of bounds for space format of length {format_length}")]
    IndexError {
        position: usize,
        format_length: usize,
    },

    #[error("double update of the same field ({0})")]
    DuplicateFieldMutation(String),

    #[error("cannot perform an update with an empty tuple")]
    EmptyTupleOperation,

    #[error("no available connections")]
    NoAvailableConnections,

    #[error("server error {code}: {message}")]
    BoxError { code: u64, message: String },

    #[error("server module error: {message}")]
    ModuleError {
        class_name: Option<String>,
        message: String,
    },

    #[error("unrecognized server error: {0}")]
    Unrecognized(Value),

    #[error("corrupt error payload: {0}")]
    ErrorPayloadCorrupt(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
