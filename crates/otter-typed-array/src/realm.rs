//! Realm: intrinsics plus the object-model abstract operations
//!
//! The realm owns the prototype objects and the nine concrete typed array
//! constructors, and implements `Get`, `Set`, `HasProperty`, `Call`,
//! `Construct` and the iteration protocol on top of [`JsObject`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::array_buffer::JsArrayBuffer;
use crate::config::TypedArrayConfig;
use crate::error::{VmError, VmResult};
use crate::intrinsics_impl;
use crate::object::{
    ConstructKind, FunctionData, JsObject, NativeFn, ObjectKind, PropertyAttributes,
    PropertyDescriptor, PropertyKey, WellKnownSymbol,
};
use crate::species::DEFAULT_CONSTRUCTORS;
use crate::typed_array::{JsTypedArray, TypedArrayKind};
use crate::value::{Value, to_index, to_length};

/// Create a native function object
pub(crate) fn native_function<F>(name: &str, fn_proto: &Arc<JsObject>, f: F) -> Arc<JsObject>
where
    F: Fn(&Value, &[Value], &Realm) -> VmResult<Value> + Send + Sync + 'static,
{
    let call: NativeFn = Arc::new(f);
    function_object(FunctionData::new(name, call), fn_proto)
}

fn function_object(data: FunctionData, proto: &Arc<JsObject>) -> Arc<JsObject> {
    let name = Value::string(data.name());
    let func = Arc::new(JsObject::with_kind(
        Some(proto.clone()),
        ObjectKind::Function(data),
    ));
    func.define_property(
        PropertyKey::string("name"),
        PropertyDescriptor::data_with_attrs(
            name,
            PropertyAttributes {
                writable: false,
                enumerable: false,
                configurable: true,
            },
        ),
    );
    func
}

/// Wire `ctor.prototype` and `proto.constructor` to each other
fn link_constructor(ctor: &Arc<JsObject>, proto: &Arc<JsObject>) {
    ctor.define_property(
        PropertyKey::string("prototype"),
        PropertyDescriptor::data_with_attrs(
            Value::object(proto.clone()),
            PropertyAttributes::frozen(),
        ),
    );
    proto.define_property(
        PropertyKey::string("constructor"),
        PropertyDescriptor::builtin_method(Value::object(ctor.clone())),
    );
}

/// An iterable or array-like source, materialized for index access
pub enum ArrayLike {
    /// Values drained eagerly from an iterator
    List(Vec<Value>),
    /// An object read through its `length` and index properties
    Object(Arc<JsObject>),
}

impl ArrayLike {
    /// Number of elements, `ToLength(Get(obj, "length"))` for objects
    pub fn length(&self, realm: &Realm) -> VmResult<usize> {
        match self {
            ArrayLike::List(values) => Ok(values.len()),
            ArrayLike::Object(obj) => {
                let len = realm.get(obj, &PropertyKey::string("length"))?;
                Ok(to_length(len.to_number(), realm.config().max_length) as usize)
            }
        }
    }

    /// Element `index`
    pub fn get(&self, realm: &Realm, index: usize) -> VmResult<Value> {
        match self {
            ArrayLike::List(values) => Ok(values.get(index).cloned().unwrap_or_default()),
            ArrayLike::Object(obj) => realm.get(obj, &PropertyKey::from_usize(index)),
        }
    }
}

/// A realm: one set of intrinsics and the operations that use them
pub struct Realm {
    config: TypedArrayConfig,
    object_prototype: Arc<JsObject>,
    function_prototype: Arc<JsObject>,
    array_prototype: Arc<JsObject>,
    array_buffer_prototype: Arc<JsObject>,
    iterator_prototype: Arc<JsObject>,
    typed_array_constructor: Arc<JsObject>,
    typed_array_prototype: Arc<JsObject>,
    constructors: Vec<Arc<JsObject>>,
    prototypes: Vec<Arc<JsObject>>,
}

impl Realm {
    /// Create a realm with default limits
    pub fn new() -> Self {
        Self::with_config(TypedArrayConfig::default())
    }

    /// Create a realm with the given limits
    pub fn with_config(config: TypedArrayConfig) -> Self {
        let object_prototype = Arc::new(JsObject::new(None));
        let function_prototype = Arc::new(JsObject::new(Some(object_prototype.clone())));
        let array_prototype = Arc::new(JsObject::array(
            Some(object_prototype.clone()),
            Vec::new(),
        ));
        let array_buffer_prototype = Arc::new(JsObject::new(Some(object_prototype.clone())));
        let iterator_prototype = Arc::new(JsObject::new(Some(object_prototype.clone())));
        let typed_array_prototype = Arc::new(JsObject::new(Some(object_prototype.clone())));

        // %TypedArray% is a constructor that refuses to construct
        let abstract_call: NativeFn = Arc::new(|_this: &Value, _args: &[Value], _realm: &Realm| {
            Err(VmError::ConstructAbstractClass("TypedArray".to_string()))
        });
        let typed_array_constructor = function_object(
            FunctionData::constructor(
                "TypedArray",
                abstract_call,
                ConstructKind::AbstractTypedArray,
            ),
            &function_prototype,
        );
        link_constructor(&typed_array_constructor, &typed_array_prototype);

        let mut constructors = Vec::with_capacity(DEFAULT_CONSTRUCTORS.len());
        let mut prototypes = Vec::with_capacity(DEFAULT_CONSTRUCTORS.len());
        for entry in &DEFAULT_CONSTRUCTORS {
            let name = entry.name;
            let proto = Arc::new(JsObject::new(Some(typed_array_prototype.clone())));
            let call: NativeFn = Arc::new(move |_this: &Value, _args: &[Value], _realm: &Realm| {
                Err(VmError::ConstructorRequiresNew(name.to_string()))
            });
            let ctor = function_object(
                FunctionData::constructor(name, call, ConstructKind::TypedArray(entry.kind)),
                &typed_array_constructor,
            );
            link_constructor(&ctor, &proto);
            let bytes_per_element = PropertyDescriptor::data_with_attrs(
                Value::number(entry.bytes_per_element as f64),
                PropertyAttributes::frozen(),
            );
            ctor.define_property(
                PropertyKey::string("BYTES_PER_ELEMENT"),
                bytes_per_element.clone(),
            );
            proto.define_property(PropertyKey::string("BYTES_PER_ELEMENT"), bytes_per_element);
            constructors.push(ctor);
            prototypes.push(proto);
        }

        intrinsics_impl::typed_array::init_typed_array_intrinsics(
            &typed_array_constructor,
            &typed_array_prototype,
            &function_prototype,
        );
        intrinsics_impl::typed_array::init_array_iteration(&array_prototype, &function_prototype);

        tracing::debug!(
            max_byte_length = config.max_byte_length,
            "typed array realm initialized"
        );

        Self {
            config,
            object_prototype,
            function_prototype,
            array_prototype,
            array_buffer_prototype,
            iterator_prototype,
            typed_array_constructor,
            typed_array_prototype,
            constructors,
            prototypes,
        }
    }

    /// Limits in effect for this realm
    pub fn config(&self) -> &TypedArrayConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Intrinsics
    // ------------------------------------------------------------------

    /// `%TypedArray%`
    pub fn typed_array_intrinsic(&self) -> &Arc<JsObject> {
        &self.typed_array_constructor
    }

    /// `%TypedArray%.prototype`
    pub fn typed_array_intrinsic_prototype(&self) -> &Arc<JsObject> {
        &self.typed_array_prototype
    }

    /// The concrete constructor for `kind` (e.g. `Uint8Array`)
    pub fn typed_array_constructor(&self, kind: TypedArrayKind) -> &Arc<JsObject> {
        &self.constructors[kind.table_index()]
    }

    /// The concrete prototype for `kind` (e.g. `Uint8Array.prototype`)
    pub fn typed_array_prototype(&self, kind: TypedArrayKind) -> &Arc<JsObject> {
        &self.prototypes[kind.table_index()]
    }

    // ------------------------------------------------------------------
    // Object creation
    // ------------------------------------------------------------------

    /// A plain object inheriting from `Object.prototype`
    pub fn new_object(&self) -> Arc<JsObject> {
        Arc::new(JsObject::new(Some(self.object_prototype.clone())))
    }

    /// An array holding `values`
    pub fn new_array(&self, values: Vec<Value>) -> Value {
        Value::object(Arc::new(JsObject::array(
            Some(self.array_prototype.clone()),
            values,
        )))
    }

    /// A native function
    pub fn new_function<F>(&self, name: &str, f: F) -> Value
    where
        F: Fn(&Value, &[Value], &Realm) -> VmResult<Value> + Send + Sync + 'static,
    {
        Value::object(native_function(name, &self.function_prototype, f))
    }

    /// A construct-capable function whose construct behavior is `construct`.
    ///
    /// Calling it without `new` fails. A `prototype` object inheriting from
    /// `Object.prototype` is attached.
    pub fn new_constructor<F>(&self, name: &str, construct: F) -> Value
    where
        F: Fn(&[Value], &Arc<JsObject>, &Realm) -> VmResult<Value> + Send + Sync + 'static,
    {
        let owned_name = name.to_string();
        let call: NativeFn = Arc::new(move |_this: &Value, _args: &[Value], _realm: &Realm| {
            Err(VmError::ConstructorRequiresNew(owned_name.clone()))
        });
        let ctor = function_object(
            FunctionData::constructor(name, call, ConstructKind::Native(Arc::new(construct))),
            &self.function_prototype,
        );
        link_constructor(&ctor, &self.new_object());
        Value::object(ctor)
    }

    /// Equivalent of `class <name> extends <parent> {}`
    pub fn define_subclass(&self, name: &str, parent: &Value) -> VmResult<Value> {
        let Some(parent_obj) = parent.as_object().filter(|_| parent.is_constructor()) else {
            return Err(VmError::NotConstructor(parent.describe()));
        };
        let proto_parent = match self.get(parent_obj, &PropertyKey::string("prototype"))? {
            Value::Object(obj) => Some(obj),
            Value::Null => None,
            other => {
                return Err(VmError::type_error(format!(
                    "Class extends value does not have valid prototype property {}",
                    other.describe()
                )));
            }
        };
        let owned_name = name.to_string();
        let call: NativeFn = Arc::new(move |_this: &Value, _args: &[Value], _realm: &Realm| {
            Err(VmError::ConstructorRequiresNew(owned_name.clone()))
        });
        let ctor = function_object(
            FunctionData::constructor(name, call, ConstructKind::Derived(parent_obj.clone())),
            parent_obj,
        );
        let proto = Arc::new(JsObject::new(proto_parent));
        link_constructor(&ctor, &proto);
        Ok(Value::object(ctor))
    }

    /// A zero-filled ArrayBuffer
    pub fn new_array_buffer(&self, byte_length: usize) -> VmResult<Value> {
        if byte_length > self.config.max_byte_length {
            return Err(VmError::range_error("Array buffer allocation failed"));
        }
        Ok(Value::object(self.array_buffer_object(JsArrayBuffer::new(
            byte_length,
        ))))
    }

    fn array_buffer_object(&self, store: JsArrayBuffer) -> Arc<JsObject> {
        Arc::new(JsObject::with_kind(
            Some(self.array_buffer_prototype.clone()),
            ObjectKind::ArrayBuffer(Arc::new(store)),
        ))
    }

    /// Detach an ArrayBuffer, or the buffer behind a typed array
    pub fn detach(&self, value: &Value) -> VmResult<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| VmError::type_error("detach target is not an object"))?;
        match obj.kind() {
            ObjectKind::ArrayBuffer(store) => store.detach(),
            ObjectKind::TypedArray(ta) => ta.store().detach(),
            _ => {
                return Err(VmError::type_error(
                    "detach target is not an ArrayBuffer or typed array",
                ));
            }
        }
        Ok(())
    }

    /// `new <Kind>Array(length)` through the intrinsic constructor
    pub fn new_typed_array(&self, kind: TypedArrayKind, length: usize) -> VmResult<Value> {
        let ctor = Value::object(self.typed_array_constructor(kind).clone());
        self.construct(&ctor, &[Value::number(length as f64)], None)
    }

    /// A typed array of `kind` holding `values` (with the kind's conversion)
    pub fn typed_array_from_numbers(&self, kind: TypedArrayKind, values: &[f64]) -> VmResult<Value> {
        let result = self.new_typed_array(kind, values.len())?;
        if let Some(ta) = result.as_object().and_then(|o| o.as_typed_array()) {
            for (i, v) in values.iter().enumerate() {
                ta.set(i, *v);
            }
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------

    /// `Get(obj, key)`
    pub fn get(&self, obj: &Arc<JsObject>, key: &PropertyKey) -> VmResult<Value> {
        self.get_with_receiver(obj, key, &Value::object(obj.clone()))
    }

    /// `obj.[[Get]](key, receiver)`: walks the prototype chain and runs getters
    pub fn get_with_receiver(
        &self,
        obj: &Arc<JsObject>,
        key: &PropertyKey,
        receiver: &Value,
    ) -> VmResult<Value> {
        let mut current = obj.clone();
        loop {
            // Integer-indexed exotic objects never consult the prototype for indices
            if let (Some(ta), PropertyKey::Index(i)) = (current.as_typed_array(), key) {
                return Ok(ta
                    .get(*i as usize)
                    .map_or_else(Value::undefined, Value::number));
            }
            match current.get_own_property(key) {
                Some(PropertyDescriptor::Data { value, .. }) => return Ok(value),
                Some(PropertyDescriptor::Accessor { get, .. }) => {
                    return match get {
                        Some(getter) => self.call(&getter, receiver, &[]),
                        None => Ok(Value::undefined()),
                    };
                }
                None => {}
            }
            let next = match current.prototype() {
                Some(proto) => proto.clone(),
                None => return Ok(Value::undefined()),
            };
            current = next;
        }
    }

    /// `Get(value, key)` for any value; primitives other than strings have no properties here
    pub fn get_value(&self, value: &Value, key: &PropertyKey) -> VmResult<Value> {
        match value {
            Value::Object(obj) => self.get(obj, key),
            Value::Undefined | Value::Null => Err(VmError::type_error(format!(
                "Cannot read properties of {}",
                value.to_js_string()
            ))),
            Value::String(s) => Ok(match key {
                PropertyKey::String(name) if &**name == "length" => {
                    Value::number(s.encode_utf16().count() as f64)
                }
                // Strings index by UTF-16 code unit
                PropertyKey::Index(i) => s
                    .encode_utf16()
                    .nth(*i as usize)
                    .map_or_else(Value::undefined, |unit| {
                        Value::string(&String::from_utf16_lossy(&[unit]))
                    }),
                _ => Value::undefined(),
            }),
            _ => Ok(Value::undefined()),
        }
    }

    /// `Set(obj, key, value, true)`
    ///
    /// Writes to typed array indices that are not currently valid are dropped.
    pub fn set(&self, obj: &Arc<JsObject>, key: PropertyKey, value: Value) -> VmResult<bool> {
        if let (Some(ta), PropertyKey::Index(i)) = (obj.as_typed_array(), &key) {
            let n = value.to_number();
            ta.set(*i as usize, n);
            return Ok(true);
        }

        let mut current = Some(obj.clone());
        while let Some(o) = current {
            match o.get_own_property(&key) {
                Some(PropertyDescriptor::Accessor { set, .. }) => {
                    return match set {
                        Some(setter) => {
                            self.call(&setter, &Value::object(obj.clone()), &[value])?;
                            Ok(true)
                        }
                        None => Ok(false),
                    };
                }
                Some(PropertyDescriptor::Data { attributes, .. }) => {
                    if !attributes.writable {
                        return Ok(false);
                    }
                    break;
                }
                None => {}
            }
            current = o.prototype().cloned();
        }
        Ok(obj.set_own(key, value))
    }

    /// `HasProperty(obj, key)`
    pub fn has_property(&self, obj: &Arc<JsObject>, key: &PropertyKey) -> bool {
        if let (Some(ta), PropertyKey::Index(i)) = (obj.as_typed_array(), key) {
            return ta.is_valid_index(*i as usize);
        }
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            if o.has_own(key) {
                return true;
            }
            current = o.prototype().cloned();
        }
        false
    }

    /// `GetMethod(value, key)`: None when the property is null or undefined
    pub fn get_method(&self, value: &Value, key: &PropertyKey) -> VmResult<Option<Value>> {
        let method = self.get_value(value, key)?;
        if method.is_nullish() {
            return Ok(None);
        }
        if !method.is_callable() {
            return Err(VmError::CalledNonCallable(method.describe()));
        }
        Ok(Some(method))
    }

    // ------------------------------------------------------------------
    // Call / Construct
    // ------------------------------------------------------------------

    /// `Call(f, this, args)`
    pub fn call(&self, f: &Value, this: &Value, args: &[Value]) -> VmResult<Value> {
        let call = f
            .as_object()
            .and_then(|obj| obj.as_function())
            .map(|data| data.call_behavior().clone())
            .ok_or_else(|| VmError::CalledNonCallable(f.describe()))?;
        call(this, args, self)
    }

    /// `Construct(f, args, new_target)`; `new_target` defaults to `f`
    pub fn construct(
        &self,
        f: &Value,
        args: &[Value],
        new_target: Option<&Arc<JsObject>>,
    ) -> VmResult<Value> {
        let (ctor, behavior) = match f.as_object() {
            Some(obj) => match obj.as_function().and_then(|d| d.construct_behavior()) {
                Some(behavior) => (obj, behavior.clone()),
                None => return Err(VmError::NotConstructor(f.describe())),
            },
            None => return Err(VmError::NotConstructor(f.describe())),
        };
        let new_target = new_target.unwrap_or(ctor);

        match behavior {
            ConstructKind::TypedArray(kind) => self.construct_typed_array(kind, args, new_target),
            ConstructKind::AbstractTypedArray => {
                Err(VmError::ConstructAbstractClass("TypedArray".to_string()))
            }
            ConstructKind::Derived(parent) => {
                self.construct(&Value::object(parent), args, Some(new_target))
            }
            ConstructKind::Native(construct) => construct(args, new_target, self),
        }
    }

    /// `GetPrototypeFromConstructor(new_target, %<Kind>Array.prototype%)`
    fn prototype_from_constructor(
        &self,
        new_target: &Arc<JsObject>,
        kind: TypedArrayKind,
    ) -> VmResult<Arc<JsObject>> {
        match self.get(new_target, &PropertyKey::string("prototype"))? {
            Value::Object(proto) => Ok(proto),
            _ => Ok(self.typed_array_prototype(kind).clone()),
        }
    }

    /// `[[Construct]]` of the concrete typed array constructors
    fn construct_typed_array(
        &self,
        kind: TypedArrayKind,
        args: &[Value],
        new_target: &Arc<JsObject>,
    ) -> VmResult<Value> {
        let first = args.first().cloned().unwrap_or_default();
        let source = match &first {
            Value::Object(obj) => obj.clone(),
            primitive => {
                let length = to_index(primitive)
                    .ok_or_else(|| VmError::InvalidTypedArrayLength(primitive.to_js_string()))?;
                let proto = self.prototype_from_constructor(new_target, kind)?;
                return self.allocate_typed_array(kind, length, proto);
            }
        };

        if let Some(store) = source.as_array_buffer() {
            let store = store.clone();
            return self.construct_over_buffer(kind, &source, &store, args, new_target);
        }

        if let Some(src) = source.as_typed_array() {
            let src = src.clone();
            let proto = self.prototype_from_constructor(new_target, kind)?;
            if src.is_detached() {
                return Err(VmError::detached("Construct"));
            }
            let len = src.length();
            let result = self.allocate_typed_array(kind, len as u64, proto)?;
            if let Some(dst) = result.as_object().and_then(|o| o.as_typed_array()) {
                for i in 0..len {
                    if let Some(v) = src.get(i) {
                        dst.set(i, v);
                    }
                }
            }
            return Ok(result);
        }

        let proto = self.prototype_from_constructor(new_target, kind)?;
        let array_like = self.iterable_to_array_like(&Value::object(source))?;
        let len = array_like.length(self)?;
        let result = self.allocate_typed_array(kind, len as u64, proto)?;
        if let Some(target) = result.as_object() {
            for i in 0..len {
                let value = array_like.get(self, i)?;
                self.set(target, PropertyKey::from_usize(i), value)?;
            }
        }
        Ok(result)
    }

    /// `new <Kind>Array(buffer, byteOffset, length)`
    fn construct_over_buffer(
        &self,
        kind: TypedArrayKind,
        buffer: &Arc<JsObject>,
        store: &Arc<JsArrayBuffer>,
        args: &[Value],
        new_target: &Arc<JsObject>,
    ) -> VmResult<Value> {
        let elem_size = kind.element_size() as u64;
        let offset_arg = args.get(1).cloned().unwrap_or_default();
        let length_arg = args.get(2).cloned().unwrap_or_default();

        let offset = to_index(&offset_arg)
            .ok_or_else(|| VmError::InvalidOffset(offset_arg.to_js_string()))?;
        if offset % elem_size != 0 {
            return Err(VmError::InvalidOffset(offset.to_string()));
        }
        let new_length = if length_arg.is_undefined() {
            None
        } else {
            Some(
                to_index(&length_arg)
                    .ok_or_else(|| VmError::InvalidTypedArrayLength(length_arg.to_js_string()))?,
            )
        };
        let proto = self.prototype_from_constructor(new_target, kind)?;

        if store.is_detached() {
            return Err(VmError::detached("Construct"));
        }
        let buffer_byte_length = store.byte_length() as u64;

        let length = match new_length {
            None => {
                if buffer_byte_length % elem_size != 0 {
                    return Err(VmError::InvalidTypedArrayLength(
                        buffer_byte_length.to_string(),
                    ));
                }
                if offset > buffer_byte_length {
                    return Err(VmError::InvalidOffset(offset.to_string()));
                }
                (buffer_byte_length - offset) / elem_size
            }
            Some(length) => {
                let fits = length
                    .checked_mul(elem_size)
                    .and_then(|bytes| bytes.checked_add(offset))
                    .is_some_and(|end| end <= buffer_byte_length);
                if !fits {
                    return Err(VmError::InvalidTypedArrayLength(length.to_string()));
                }
                length
            }
        };

        let view = JsTypedArray::new(buffer.clone(), kind, offset as usize, length as usize)
            .map_err(|e| VmError::InvalidTypedArrayLength(e.to_string()))?;
        Ok(Value::object(Arc::new(JsObject::with_kind(
            Some(proto),
            ObjectKind::TypedArray(view),
        ))))
    }

    /// AllocateTypedArray with a fresh zero-filled buffer
    fn allocate_typed_array(
        &self,
        kind: TypedArrayKind,
        length: u64,
        proto: Arc<JsObject>,
    ) -> VmResult<Value> {
        let byte_length = length
            .checked_mul(kind.element_size() as u64)
            .filter(|bytes| *bytes <= self.config.max_byte_length as u64)
            .ok_or_else(|| VmError::InvalidTypedArrayLength(length.to_string()))?;
        let buffer = self.array_buffer_object(JsArrayBuffer::new(byte_length as usize));
        let view = JsTypedArray::new(buffer, kind, 0, length as usize)
            .map_err(|e| VmError::InvalidTypedArrayLength(e.to_string()))?;
        tracing::trace!(kind = kind.name(), length, "typed array allocated");
        Ok(Value::object(Arc::new(JsObject::with_kind(
            Some(proto),
            ObjectKind::TypedArray(view),
        ))))
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// `CreateIterResultObject(value, done)`
    pub fn iter_result(&self, value: Value, done: bool) -> Value {
        let result = self.new_object();
        result.set_own(PropertyKey::string("value"), value);
        result.set_own(PropertyKey::string("done"), Value::boolean(done));
        Value::object(result)
    }

    /// An iterator over `target[0..length)` that re-reads the length each step
    pub fn new_index_iterator(&self, target: Value) -> Value {
        let iterator = Arc::new(JsObject::new(Some(self.iterator_prototype.clone())));
        let cursor: Mutex<Option<usize>> = Mutex::new(Some(0));
        let next = native_function("next", &self.function_prototype, move |_this, _args, realm| {
            let Some(index) = *cursor.lock() else {
                return Ok(realm.iter_result(Value::undefined(), true));
            };
            let len = match target.as_object() {
                Some(obj) => match obj.as_typed_array() {
                    Some(ta) if ta.is_detached() => {
                        return Err(VmError::detached("%ArrayIteratorPrototype%.next"));
                    }
                    Some(ta) => ta.length(),
                    None => ArrayLike::Object(obj.clone()).length(realm)?,
                },
                None => 0,
            };
            if index >= len {
                *cursor.lock() = None;
                return Ok(realm.iter_result(Value::undefined(), true));
            }
            *cursor.lock() = Some(index + 1);
            let value = realm.get_value(&target, &PropertyKey::from_usize(index))?;
            Ok(realm.iter_result(value, false))
        });
        iterator.define_property(
            PropertyKey::string("next"),
            PropertyDescriptor::builtin_method(Value::object(next)),
        );
        Value::object(iterator)
    }

    /// Drain `method.call(items)` into a list
    pub fn iterable_to_list(&self, items: &Value, method: &Value) -> VmResult<Vec<Value>> {
        let iterator = self.call(method, items, &[])?;
        let Some(iterator_obj) = iterator.as_object() else {
            return Err(VmError::type_error("Result of the Symbol.iterator method is not an object"));
        };
        let next = self.get(iterator_obj, &PropertyKey::string("next"))?;
        let mut values = Vec::new();
        loop {
            let result = self.call(&next, &iterator, &[])?;
            let Some(result_obj) = result.as_object() else {
                return Err(VmError::type_error(format!(
                    "Iterator result {} is not an object",
                    result.describe()
                )));
            };
            if self.get(result_obj, &PropertyKey::string("done"))?.to_boolean() {
                return Ok(values);
            }
            values.push(self.get(result_obj, &PropertyKey::string("value"))?);
        }
    }

    /// IterableToArrayLike: drain an iterable eagerly, otherwise use the object as array-like
    pub fn iterable_to_array_like(&self, items: &Value) -> VmResult<ArrayLike> {
        match items {
            Value::Undefined | Value::Null => Err(VmError::type_error(
                "Cannot convert undefined or null to object",
            )),
            Value::String(s) => Ok(ArrayLike::List(
                s.chars().map(|c| Value::string(c.encode_utf8(&mut [0; 4]))).collect(),
            )),
            Value::Boolean(_) | Value::Number(_) => Ok(ArrayLike::List(Vec::new())),
            Value::Object(obj) => {
                match self.get_method(items, &PropertyKey::Symbol(WellKnownSymbol::Iterator))? {
                    Some(method) => Ok(ArrayLike::List(self.iterable_to_list(items, &method)?)),
                    None => Ok(ArrayLike::Object(obj.clone())),
                }
            }
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_prototype_links() {
        let realm = Realm::new();
        for kind in TypedArrayKind::ALL {
            let ctor = realm.typed_array_constructor(kind);
            let proto = realm
                .get(ctor, &PropertyKey::string("prototype"))
                .unwrap();
            assert!(
                proto
                    .as_object()
                    .is_some_and(|p| Arc::ptr_eq(p, realm.typed_array_prototype(kind)))
            );
            assert!(
                ctor.prototype()
                    .is_some_and(|p| Arc::ptr_eq(p, realm.typed_array_intrinsic()))
            );
        }
    }

    #[test]
    fn test_get_walks_prototype_chain() {
        let realm = Realm::new();
        let parent = realm.new_object();
        parent.set_own(PropertyKey::string("x"), Value::number(1.0));
        let child = Arc::new(JsObject::new(Some(parent)));
        let x = realm.get(&child, &PropertyKey::string("x")).unwrap();
        assert_eq!(x.as_number(), Some(1.0));
    }

    #[test]
    fn test_getter_receives_receiver() {
        let realm = Realm::new();
        let proto = realm.new_object();
        proto.define_property(
            PropertyKey::string("me"),
            PropertyDescriptor::getter(realm.new_function("get me", |this, _, _| Ok(this.clone()))),
        );
        let obj = Arc::new(JsObject::new(Some(proto)));
        let me = realm.get(&obj, &PropertyKey::string("me")).unwrap();
        assert!(me.strict_equals(&Value::object(obj)));
    }

    #[test]
    fn test_call_non_callable() {
        let realm = Realm::new();
        let err = realm
            .call(&Value::number(1.0), &Value::undefined(), &[])
            .unwrap_err();
        assert!(matches!(err, VmError::CalledNonCallable(_)));
    }

    #[test]
    fn test_construct_non_constructor() {
        let realm = Realm::new();
        let f = realm.new_function("plain", |_, _, _| Ok(Value::undefined()));
        let err = realm.construct(&f, &[], None).unwrap_err();
        assert!(matches!(err, VmError::NotConstructor(_)));
    }

    #[test]
    fn test_array_iteration() {
        let realm = Realm::new();
        let arr = realm.new_array(vec![Value::number(1.0), Value::string("a")]);
        let method = realm
            .get_method(&arr, &PropertyKey::Symbol(WellKnownSymbol::Iterator))
            .unwrap()
            .unwrap();
        let values = realm.iterable_to_list(&arr, &method).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].as_str(), Some("a"));
    }

    #[test]
    fn test_array_like_object() {
        let realm = Realm::new();
        let obj = realm.new_object();
        obj.set_own(PropertyKey::string("length"), Value::string("2"));
        obj.set_own(PropertyKey::Index(0), Value::number(7.0));
        let array_like = realm.iterable_to_array_like(&Value::object(obj)).unwrap();
        assert_eq!(array_like.length(&realm).unwrap(), 2);
        assert_eq!(array_like.get(&realm, 0).unwrap().as_number(), Some(7.0));
        assert!(array_like.get(&realm, 1).unwrap().is_undefined());
    }

    #[test]
    fn test_far_array_index_write() {
        let realm = Realm::new();
        let arr = realm.new_array(Vec::new());
        let obj = arr.as_object().unwrap();
        let far = PropertyKey::Index(u32::MAX - 1);
        assert!(realm.set(obj, far.clone(), Value::number(1.0)).unwrap());
        assert_eq!(realm.get(obj, &far).unwrap().as_number(), Some(1.0));
        let length = realm.get(obj, &PropertyKey::string("length")).unwrap();
        assert_eq!(length.as_number(), Some(u32::MAX as f64));
        assert!(!realm.has_property(obj, &PropertyKey::Index(5)));
    }

    #[test]
    fn test_string_index_reads_code_unit() {
        let realm = Realm::new();
        let s = Value::string("hé");
        let second = realm.get_value(&s, &PropertyKey::Index(1)).unwrap();
        assert_eq!(second.as_str(), Some("é"));
        assert!(realm.get_value(&s, &PropertyKey::Index(2)).unwrap().is_undefined());
    }

    #[test]
    fn test_iterable_to_array_like_rejects_nullish() {
        let realm = Realm::new();
        assert!(realm.iterable_to_array_like(&Value::undefined()).is_err());
        assert!(realm.iterable_to_array_like(&Value::null()).is_err());
    }

    #[test]
    fn test_detach_typed_array_buffer() {
        let realm = Realm::new();
        let ta = realm.new_typed_array(TypedArrayKind::Uint8, 4).unwrap();
        realm.detach(&ta).unwrap();
        let view = ta.as_object().and_then(|o| o.as_typed_array()).unwrap();
        assert!(view.is_detached());
        assert!(realm.detach(&Value::number(1.0)).is_err());
    }

    #[test]
    fn test_new_array_buffer_respects_limit() {
        let realm = Realm::with_config(TypedArrayConfig::default().with_max_byte_length(8));
        assert!(realm.new_array_buffer(8).is_ok());
        assert!(realm.new_array_buffer(9).unwrap_err().is_range_error());
    }
}
