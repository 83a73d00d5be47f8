//! Error types for the engine

use thiserror::Error;

/// Stable result codes surfaced to embedders alongside the error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok,
    SyntaxError,
    RuntimeError,
    MemoryError,
    TypeError,
    ReferenceError,
    RangeError,
}

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum JsError {
    #[error("SyntaxError: {message} at {line}:{column}")]
    SyntaxError {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("ReferenceError: {name} is not defined")]
    ReferenceError { name: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    #[error("RuntimeError: {message}")]
    RuntimeError { message: String },

    #[error("MemoryError: {message}")]
    MemoryError { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn syntax_error(message: impl Into<String>, line: u32, column: u32) -> Self {
        JsError::SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl Into<String>) -> Self {
        JsError::ReferenceError { name: name.into() }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        JsError::RuntimeError {
            message: message.into(),
        }
    }

    pub fn memory_error(message: impl Into<String>) -> Self {
        JsError::MemoryError {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// The stable result code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            JsError::SyntaxError { .. } => ErrorCode::SyntaxError,
            JsError::TypeError { .. } => ErrorCode::TypeError,
            JsError::ReferenceError { .. } => ErrorCode::ReferenceError,
            JsError::RangeError { .. } => ErrorCode::RangeError,
            JsError::RuntimeError { .. } => ErrorCode::RuntimeError,
            JsError::MemoryError { .. } => ErrorCode::MemoryError,
            JsError::Internal(_) => ErrorCode::RuntimeError,
        }
    }
}
