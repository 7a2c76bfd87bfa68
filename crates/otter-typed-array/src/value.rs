//! JavaScript values and the abstract conversions the typed array code needs

use std::sync::Arc;

use crate::object::{JsObject, ObjectKind};

/// Largest integer representable without loss in an f64 (2^53 - 1)
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A JavaScript value
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Number primitive
    Number(f64),
    /// String primitive
    String(Arc<str>),
    /// Object reference
    Object(Arc<JsObject>),
}

impl Value {
    /// `undefined`
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// `null`
    pub const fn null() -> Self {
        Self::Null
    }

    /// Boolean value
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Number value
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// String value
    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    /// Object value
    pub fn object(obj: Arc<JsObject>) -> Self {
        Self::Object(obj)
    }

    /// Is `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Is `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Is an object
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// IsCallable
    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(|obj| obj.as_function().is_some())
    }

    /// IsConstructor
    pub fn is_constructor(&self) -> bool {
        self.as_object()
            .and_then(|obj| obj.as_function())
            .is_some_and(|f| f.construct_behavior().is_some())
    }

    /// Number payload, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload, if this is an object
    pub fn as_object(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// ToNumber
    ///
    /// Objects convert to NaN; this crate has no ToPrimitive hook.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Object(_) => f64::NAN,
        }
    }

    /// ToString
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::String(s) => s.to_string(),
            Self::Object(obj) => match obj.kind() {
                ObjectKind::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
                _ => "[object Object]".to_string(),
            },
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Self::String(s) => format!("\"{}\"", s),
            Self::Object(obj) => match obj.kind() {
                ObjectKind::Function(f) => f.name().to_string(),
                ObjectKind::TypedArray(ta) => format!("[object {}]", ta.kind().name()),
                ObjectKind::ArrayBuffer(_) => "[object ArrayBuffer]".to_string(),
                ObjectKind::Array => "[object Array]".to_string(),
                ObjectKind::Ordinary => "#<Object>".to_string(),
            },
            other => other.to_js_string(),
        }
    }

    /// Strict equality (`===`)
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", number_to_string(*n)),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Object(_) => write!(f, "{}", self.describe()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Undefined
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<Arc<JsObject>> for Value {
    fn from(obj: Arc<JsObject>) -> Self {
        Self::Object(obj)
    }
}

// ---------------------------------------------------------------------------
// Numeric abstract operations
// ---------------------------------------------------------------------------

/// ToIntegerOrInfinity on an already-converted number
pub fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        return 0.0;
    }
    if n.is_infinite() {
        return n;
    }
    n.trunc()
}

/// ToLength, saturating at `max`
pub fn to_length(n: f64, max: f64) -> f64 {
    let len = to_integer_or_infinity(n);
    if len <= 0.0 { 0.0 } else { len.min(max) }
}

/// ToIndex: `None` when the value is negative or above 2^53 - 1
pub fn to_index(value: &Value) -> Option<u64> {
    if value.is_undefined() {
        return Some(0);
    }
    let integer = to_integer_or_infinity(value.to_number());
    if !(0.0..=MAX_SAFE_INTEGER).contains(&integer) {
        return None;
    }
    Some(integer as u64)
}

/// Resolve a relative index (negative counts from the end) against `len`
pub fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let relative = to_integer_or_infinity(value.to_number());
    let len_f = len as f64;
    if relative < 0.0 {
        (len_f + relative).max(0.0) as usize
    } else {
        relative.min(len_f) as usize
    }
}

/// Number::toString(10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        }
        .to_string();
    }
    let mut buffer = ryu_js::Buffer::new();
    buffer.format_finite(n).to_string()
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let radix_digits = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    for (prefix, radix) in radix_digits {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    // Rust accepts "inf"/"nan" spellings that JS does not
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
