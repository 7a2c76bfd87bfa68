//! View validation
//!
//! `ValidateTypedArray`: confirms that a value carries typed array identity
//! and that its backing buffer is still attached. The result is a
//! [`ValidatedView`] token; any user callback can detach the buffer behind
//! it, so the token re-checks liveness on every access instead of caching it.

use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::JsObject;
use crate::typed_array::{JsTypedArray, TypedArrayKind};
use crate::value::Value;

/// Stateless typed array validator
pub struct ViewValidator;

impl ViewValidator {
    /// Whether `value` carries typed array identity (regardless of liveness)
    pub fn is_typed_array(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|obj| obj.as_typed_array().is_some())
    }

    /// Validate `value` as a live typed array for the operation `method`
    pub fn validate(value: &Value, method: &str) -> VmResult<ValidatedView> {
        let object = value
            .as_object()
            .filter(|obj| obj.as_typed_array().is_some())
            .ok_or(VmError::NotATypedArray)?;
        let view = ValidatedView::new(object.clone())?;
        view.revalidate(method)?;
        Ok(view)
    }

    /// Identity check only: returns the view even when its buffer is detached
    pub fn require_typed_array(value: &Value) -> VmResult<ValidatedView> {
        let object = value.as_object().ok_or(VmError::NotATypedArray)?;
        ValidatedView::new(object.clone())
    }
}

/// A typed array that passed validation at some point
#[derive(Debug, Clone)]
pub struct ValidatedView {
    object: Arc<JsObject>,
    view: JsTypedArray,
}

impl ValidatedView {
    fn new(object: Arc<JsObject>) -> VmResult<Self> {
        let view = object.as_typed_array().cloned().ok_or(VmError::NotATypedArray)?;
        Ok(Self { object, view })
    }

    /// The typed array object
    pub fn object(&self) -> &Arc<JsObject> {
        &self.object
    }

    /// The typed array as a value
    pub fn value(&self) -> Value {
        Value::object(self.object.clone())
    }

    /// The underlying view slots
    pub fn typed_array(&self) -> &JsTypedArray {
        &self.view
    }

    /// Element kind
    pub fn kind(&self) -> TypedArrayKind {
        self.view.kind()
    }

    /// Current logical length (0 once detached)
    pub fn length(&self) -> usize {
        self.view.length()
    }

    /// Whether the backing buffer is still attached
    pub fn is_live(&self) -> bool {
        !self.view.is_detached()
    }

    /// Whether `index` is present right now
    pub fn has_index(&self, index: usize) -> bool {
        self.view.is_valid_index(index)
    }

    /// Read element `index`; None when not present right now
    pub fn get(&self, index: usize) -> Option<f64> {
        self.view.get(index)
    }

    /// Write element `index` with the kind's conversion; dropped when not present
    pub fn set(&self, index: usize, value: f64) -> bool {
        self.view.set(index, value)
    }

    /// Re-run the liveness check after a possible reentry point
    pub fn revalidate(&self, method: &str) -> VmResult<()> {
        if self.view.is_detached() {
            return Err(VmError::detached(method));
        }
        Ok(())
    }
}
