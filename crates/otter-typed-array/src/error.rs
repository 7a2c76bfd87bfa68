//! Typed array error types
//!
//! Every failure of the view/species protocol is a synchronous, typed error
//! that aborts the operation in progress. Nothing here is retried or logged.

use crate::value::Value;
use thiserror::Error;

/// Errors raised by typed array operations
#[derive(Debug, Error)]
pub enum VmError {
    /// Receiver does not carry typed array identity
    #[error("TypeError: this is not a typed array.")]
    NotATypedArray,

    /// Backing buffer has been detached
    #[error("TypeError: Cannot perform {0} on a detached ArrayBuffer")]
    DetachedBuffer(String),

    /// `exemplar.constructor` is neither undefined nor an object
    #[error("TypeError: object.constructor is not an object")]
    ConstructorNotReceiver,

    /// `constructor[Symbol.species]` is present but cannot construct
    #[error("TypeError: object.constructor[Symbol.species] is not a constructor")]
    SpeciesNotConstructor,

    /// Value used as a constructor is not construct-capable
    #[error("TypeError: {0} is not a constructor")]
    NotConstructor(String),

    /// Value used as a function is not callable
    #[error("TypeError: {0} is not a function")]
    CalledNonCallable(String),

    /// A derived constructor returned a view shorter than requested
    #[error(
        "TypeError: Derived TypedArray constructor created an array which was too small \
         (requested {requested}, got {actual})"
    )]
    TooShort {
        /// Element count passed to the constructor
        requested: usize,
        /// Logical length of the returned view
        actual: usize,
    },

    /// `sort` was given something other than undefined or a function
    #[error("TypeError: The comparison function must be either a function or undefined")]
    BadSortComparisonFunction,

    /// Attempt to construct `%TypedArray%` itself
    #[error("TypeError: Abstract class {0} not directly constructable")]
    ConstructAbstractClass(String),

    /// Concrete constructor invoked without `new`
    #[error("TypeError: Constructor {0} requires 'new'")]
    ConstructorRequiresNew(String),

    /// Length argument out of range or view past the end of its buffer
    #[error("RangeError: Invalid typed array length: {0}")]
    InvalidTypedArrayLength(String),

    /// Misaligned or out-of-bounds byte offset
    #[error("RangeError: Start offset {0} is outside the bounds of the buffer")]
    InvalidOffset(String),

    /// Generic type error
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Generic range error
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Value thrown by a user callback
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),
}

/// A value thrown out of user code
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// String form of the thrown value
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a detached-buffer error naming the operation
    pub fn detached(method: impl Into<String>) -> Self {
        Self::DetachedBuffer(method.into())
    }

    /// Create an exception from a thrown JS value
    pub fn exception(value: Value) -> Self {
        let message = value.to_js_string();
        Self::Exception(Box::new(ThrownValue { value, message }))
    }

    /// The thrown value, if this error came from user code
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }

    /// Whether this error surfaces to script as a `TypeError`
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::NotATypedArray
                | Self::DetachedBuffer(_)
                | Self::ConstructorNotReceiver
                | Self::SpeciesNotConstructor
                | Self::NotConstructor(_)
                | Self::CalledNonCallable(_)
                | Self::TooShort { .. }
                | Self::BadSortComparisonFunction
                | Self::ConstructAbstractClass(_)
                | Self::ConstructorRequiresNew(_)
                | Self::TypeError(_)
        )
    }

    /// Whether this error surfaces to script as a `RangeError`
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTypedArrayLength(_) | Self::InvalidOffset(_) | Self::RangeError(_)
        )
    }
}

/// Result type for typed array operations
pub type VmResult<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(VmError::NotATypedArray.is_type_error());
        assert!(VmError::TooShort { requested: 2, actual: 1 }.is_type_error());
        assert!(VmError::InvalidOffset("3".into()).is_range_error());
        assert!(!VmError::exception(Value::number(1.0)).is_type_error());
    }

    #[test]
    fn test_detached_message_names_method() {
        let err = VmError::detached("%TypedArray%.prototype.filter");
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot perform %TypedArray%.prototype.filter on a detached ArrayBuffer"
        );
    }

    #[test]
    fn test_exception_keeps_value() {
        let err = VmError::exception(Value::string("boom"));
        assert_eq!(err.thrown_value().and_then(Value::as_str), Some("boom"));
        assert_eq!(err.to_string(), "Uncaught exception: boom");
    }
}
