use thiserror::Error;

use crate::token::SrcLoc;

use super::value::Value;

/// Typed execution failures. `Exception` carries the user value raised by
/// the `error(v)` builtin; everything else is a plain runtime fault.
#[derive(Debug, Clone, Error)]
pub enum ExecErrorKind {
    #[error("undefined variable")]
    UndefinedVariable,
    #[error("unknown variable in assignment")]
    BadSlot,
    #[error("invalid number of arguments: expected {expected}, got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("trying to call non-function value of type '{type_name}'")]
    NotCallable { type_name: &'static str },
    #[error("trying to index non-container value of type '{type_name}'")]
    NotIndexable { type_name: &'static str },
    #[error("trying to set value of non-container value of type '{type_name}'")]
    NotSettable { type_name: &'static str },
    #[error("trying to index vector with non-integer number '{index}'")]
    NonIntegerIndex { index: f64 },
    #[error("trying to index vector with a non-numeric value of type '{type_name}'")]
    NonNumericIndex { type_name: &'static str },
    #[error("array index out of bounds: {index}")]
    IndexOutOfBounds { index: i64 },
    #[error("'{type_name}' is not a number")]
    NotANumber { type_name: &'static str },
    #[error("can't convert {number} to int")]
    NonFiniteInt { number: f64 },
    #[error("function '{name}' not found")]
    FunctionNotFound { name: String },
    #[error("{}", exception_text(.0))]
    Exception(Value),
    #[error("{0}")]
    Message(String),
}

fn exception_text(value: &Value) -> String {
    match value {
        Value::Str(text) => text.to_string(),
        _ => "exception".to_string(),
    }
}

/// A dynamic error, carrying the source location of the failing operation.
#[derive(Debug, Clone, Error)]
#[error("{loc}: {kind}")]
pub struct ExecError {
    pub loc: SrcLoc,
    pub kind: ExecErrorKind,
}

impl ExecError {
    pub fn new(loc: &SrcLoc, kind: ExecErrorKind) -> Self {
        Self {
            loc: loc.clone(),
            kind,
        }
    }

    pub fn message(loc: &SrcLoc, message: impl Into<String>) -> Self {
        Self::new(loc, ExecErrorKind::Message(message.into()))
    }

    /// The value this error carries for the host: the raised user value for
    /// exceptions, otherwise the message as a string.
    pub fn value(&self) -> Value {
        match &self.kind {
            ExecErrorKind::Exception(value) => value.clone(),
            other => Value::string(other.to_string()),
        }
    }
}
