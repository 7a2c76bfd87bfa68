//! JavaScript objects
//!
//! Objects carry an ordinary property table plus an immutable [`ObjectKind`]
//! that tags exotic behavior (arrays, functions, buffers, typed arrays).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::array_buffer::JsArrayBuffer;
use crate::error::VmResult;
use crate::realm::Realm;
use crate::typed_array::{JsTypedArray, TypedArrayKind};
use crate::value::Value;

/// Well-known symbols used by the typed array protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    /// `Symbol.species`
    Species,
    /// `Symbol.iterator`
    Iterator,
    /// `Symbol.toStringTag`
    ToStringTag,
}

/// Property key (string, symbol or integer index)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Arc<str>),
    /// Well-known symbol key
    Symbol(WellKnownSymbol),
    /// Integer index
    Index(u32),
}

impl PropertyKey {
    /// Create a string property key
    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    /// Index key for a `usize`, falling back to a string key past `u32::MAX`
    pub fn from_usize(i: usize) -> Self {
        match u32::try_from(i) {
            Ok(i) => Self::Index(i),
            Err(_) => Self::String(Arc::from(i.to_string().as_str())),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl From<WellKnownSymbol> for PropertyKey {
    fn from(sym: WellKnownSymbol) -> Self {
        Self::Symbol(sym)
    }
}

/// Property attributes
#[derive(Clone, Copy, Debug, Default)]
pub struct PropertyAttributes {
    /// Property is writable
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default data property attributes
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Attributes of built-in methods: writable, configurable, not enumerable
    pub const fn builtin() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }
}

/// Property descriptor
#[derive(Clone, Debug)]
pub enum PropertyDescriptor {
    /// Data property
    Data {
        /// The value
        value: Value,
        /// Attributes
        attributes: PropertyAttributes,
    },
    /// Accessor property
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
        /// Attributes
        attributes: PropertyAttributes,
    },
}

impl PropertyDescriptor {
    /// Create a data property
    pub fn data(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::data(),
        }
    }

    /// Create a data property with specific attributes
    pub fn data_with_attrs(value: Value, attributes: PropertyAttributes) -> Self {
        Self::Data { value, attributes }
    }

    /// Create a built-in method property (non-enumerable)
    pub fn builtin_method(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::builtin(),
        }
    }

    /// Create a getter-only accessor (non-enumerable, configurable)
    pub fn getter(get: Value) -> Self {
        Self::Accessor {
            get: Some(get),
            set: None,
            attributes: PropertyAttributes {
                writable: false,
                enumerable: false,
                configurable: true,
            },
        }
    }

    /// Get the value (for data properties)
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }
}

/// Native call behavior: `(this, args, realm) -> result`
pub type NativeFn = Arc<dyn Fn(&Value, &[Value], &Realm) -> VmResult<Value> + Send + Sync>;

/// Native construct behavior: `(args, new_target, realm) -> result`
pub type NativeConstructFn =
    Arc<dyn Fn(&[Value], &Arc<JsObject>, &Realm) -> VmResult<Value> + Send + Sync>;

/// How a function object responds to `new`
#[derive(Clone)]
pub enum ConstructKind {
    /// One of the nine concrete typed array constructors
    TypedArray(TypedArrayKind),
    /// `%TypedArray%`: construct-capable but always throws
    AbstractTypedArray,
    /// `class X extends Parent {}`: delegates to the parent with `new_target`
    Derived(Arc<JsObject>),
    /// Arbitrary host or user supplied constructor
    Native(NativeConstructFn),
}

/// Internal slots of a function object
#[derive(Clone)]
pub struct FunctionData {
    name: Arc<str>,
    call: NativeFn,
    construct: Option<ConstructKind>,
}

impl FunctionData {
    /// A callable with no construct behavior
    pub fn new(name: &str, call: NativeFn) -> Self {
        Self {
            name: Arc::from(name),
            call,
            construct: None,
        }
    }

    /// A callable that is also construct-capable
    pub fn constructor(name: &str, call: NativeFn, construct: ConstructKind) -> Self {
        Self {
            name: Arc::from(name),
            call,
            construct: Some(construct),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// [[Call]]
    pub fn call_behavior(&self) -> &NativeFn {
        &self.call
    }

    /// [[Construct]], if any
    pub fn construct_behavior(&self) -> Option<&ConstructKind> {
        self.construct.as_ref()
    }
}

impl std::fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionData")
            .field("name", &self.name)
            .field("constructor", &self.construct.is_some())
            .finish()
    }
}

/// Exotic behavior tag of an object
#[derive(Debug)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array with dense element storage
    Array,
    /// Function object
    Function(FunctionData),
    /// ArrayBuffer
    ArrayBuffer(Arc<JsArrayBuffer>),
    /// Typed array view
    TypedArray(JsTypedArray),
}

/// Largest gap past the dense end an index write may fill with holes.
/// Indices further out go to the property table instead.
const MAX_DENSE_GAP: usize = 1024;

/// Indexed storage of an array: a dense prefix plus the overall length,
/// which also covers indices kept in the property table.
#[derive(Default)]
struct ArrayElements {
    dense: Vec<Value>,
    length: usize,
}

/// A JavaScript object
///
/// Thread-safe with interior mutability. No lock is held across a call back
/// into user code.
pub struct JsObject {
    /// Properties storage
    properties: RwLock<FxHashMap<PropertyKey, PropertyDescriptor>>,
    /// Prototype (None for Object.prototype)
    prototype: Option<Arc<JsObject>>,
    /// Array elements (for arrays)
    elements: RwLock<ArrayElements>,
    /// Exotic behavior
    kind: ObjectKind,
}

impl JsObject {
    /// Create a new empty ordinary object
    pub fn new(prototype: Option<Arc<JsObject>>) -> Self {
        Self::with_kind(prototype, ObjectKind::Ordinary)
    }

    /// Create an object with the given exotic kind
    pub fn with_kind(prototype: Option<Arc<JsObject>>, kind: ObjectKind) -> Self {
        Self {
            properties: RwLock::new(FxHashMap::default()),
            prototype,
            elements: RwLock::new(ArrayElements::default()),
            kind,
        }
    }

    /// Create a new array holding `values`
    pub fn array(prototype: Option<Arc<JsObject>>, values: Vec<Value>) -> Self {
        let obj = Self::with_kind(prototype, ObjectKind::Array);
        *obj.elements.write() = ArrayElements {
            length: values.len(),
            dense: values,
        };
        obj
    }

    /// Exotic kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Typed array slots, if this is a typed array
    pub fn as_typed_array(&self) -> Option<&JsTypedArray> {
        match &self.kind {
            ObjectKind::TypedArray(ta) => Some(ta),
            _ => None,
        }
    }

    /// Buffer slots, if this is an ArrayBuffer
    pub fn as_array_buffer(&self) -> Option<&Arc<JsArrayBuffer>> {
        match &self.kind {
            ObjectKind::ArrayBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    /// Function slots, if this is a function
    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Check if object is an array
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }

    /// Own property descriptor (ordinary properties and array elements)
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.properties.read().get(key) {
            return Some(desc.clone());
        }

        if let (PropertyKey::Index(i), true) = (key, self.is_array()) {
            let elements = self.elements.read();
            return elements
                .dense
                .get(*i as usize)
                .map(|v| PropertyDescriptor::data(v.clone()));
        }

        if let (PropertyKey::String(s), true) = (key, self.is_array()) {
            if &**s == "length" {
                let len = self.elements.read().length;
                return Some(PropertyDescriptor::data_with_attrs(
                    Value::number(len as f64),
                    PropertyAttributes {
                        writable: true,
                        enumerable: false,
                        configurable: false,
                    },
                ));
            }
        }

        None
    }

    /// Write an own data property, creating it if missing
    pub fn set_own(&self, key: PropertyKey, value: Value) -> bool {
        if let (PropertyKey::Index(i), true) = (&key, self.is_array()) {
            let mut elements = self.elements.write();
            let idx = *i as usize;
            elements.length = elements.length.max(idx + 1);
            if idx > elements.dense.len() + MAX_DENSE_GAP {
                self.properties
                    .write()
                    .insert(key, PropertyDescriptor::data(value));
                return true;
            }
            if idx >= elements.dense.len() {
                elements.dense.resize(idx + 1, Value::undefined());
            }
            elements.dense[idx] = value;
            // A far index stored earlier may now fall inside the dense prefix
            if elements.length > elements.dense.len() {
                self.properties.write().remove(&key);
            }
            return true;
        }

        let mut props = self.properties.write();
        match props.get_mut(&key) {
            Some(PropertyDescriptor::Data {
                value: slot,
                attributes,
            }) => {
                if !attributes.writable {
                    return false;
                }
                *slot = value;
                true
            }
            Some(PropertyDescriptor::Accessor { .. }) => false,
            None => {
                props.insert(key, PropertyDescriptor::data(value));
                true
            }
        }
    }

    /// Define a property with descriptor
    pub fn define_property(&self, key: PropertyKey, desc: PropertyDescriptor) {
        self.properties.write().insert(key, desc);
    }

    /// Check if object has own property
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Get prototype
    pub fn prototype(&self) -> Option<&Arc<JsObject>> {
        self.prototype.as_ref()
    }

    /// Get array length (for arrays)
    pub fn array_length(&self) -> usize {
        self.elements.read().length
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let props = self.properties.read();
        f.debug_struct("JsObject")
            .field("kind", &self.kind)
            .field("properties", &props.len())
            .finish()
    }
}
