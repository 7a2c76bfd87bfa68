//! Species-aware construction of derived typed arrays
//!
//! Built-in methods that produce a new typed array from an existing one
//! (the exemplar) pick the result constructor through
//! `exemplar.constructor[Symbol.species]`, then construct and re-validate
//! the result because a user-supplied constructor is not trusted to honor
//! its contract.

use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, PropertyKey, WellKnownSymbol};
use crate::realm::Realm;
use crate::typed_array::TypedArrayKind;
use crate::validate::{ValidatedView, ViewValidator};
use crate::value::Value;

/// An intrinsic constructor entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultConstructor {
    /// Element kind produced
    pub kind: TypedArrayKind,
    /// Global binding name
    pub name: &'static str,
    /// `BYTES_PER_ELEMENT`
    pub bytes_per_element: usize,
}

const fn entry(kind: TypedArrayKind) -> DefaultConstructor {
    DefaultConstructor {
        kind,
        name: kind.name(),
        bytes_per_element: kind.element_size(),
    }
}

/// Kind to default constructor, in [`TypedArrayKind::table_index`] order
pub static DEFAULT_CONSTRUCTORS: [DefaultConstructor; 9] = [
    entry(TypedArrayKind::Int8),
    entry(TypedArrayKind::Uint8),
    entry(TypedArrayKind::Uint8Clamped),
    entry(TypedArrayKind::Int16),
    entry(TypedArrayKind::Uint16),
    entry(TypedArrayKind::Int32),
    entry(TypedArrayKind::Uint32),
    entry(TypedArrayKind::Float32),
    entry(TypedArrayKind::Float64),
];

/// Default constructor entry for `kind`
pub fn default_constructor(kind: TypedArrayKind) -> &'static DefaultConstructor {
    &DEFAULT_CONSTRUCTORS[kind.table_index()]
}

/// The constructor chosen for a derived result
#[derive(Debug, Clone)]
pub enum ConstructorRef {
    /// The realm's intrinsic constructor for a kind
    Default(TypedArrayKind),
    /// Any other construct-capable function (subclass or user constructor)
    Custom(Arc<JsObject>),
}

impl ConstructorRef {
    /// Treat `value` as a constructor, failing with `NotConstructor` otherwise
    pub fn from_value(realm: &Realm, value: &Value) -> VmResult<Self> {
        match value.as_object() {
            Some(obj) if value.is_constructor() => Ok(Self::from_object(realm, obj)),
            _ => Err(VmError::NotConstructor(value.describe())),
        }
    }

    fn from_object(realm: &Realm, obj: &Arc<JsObject>) -> Self {
        TypedArrayKind::ALL
            .into_iter()
            .find(|kind| Arc::ptr_eq(realm.typed_array_constructor(*kind), obj))
            .map_or_else(|| Self::Custom(obj.clone()), Self::Default)
    }

    /// The function object to construct
    pub fn to_value(&self, realm: &Realm) -> Value {
        match self {
            Self::Default(kind) => Value::object(realm.typed_array_constructor(*kind).clone()),
            Self::Custom(obj) => Value::object(obj.clone()),
        }
    }

    /// Whether this is an intrinsic constructor
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default(_))
    }
}

/// Arguments passed to a derived constructor
#[derive(Debug, Clone)]
pub enum CreateArgs {
    /// `new C(length)`: a fresh zero-filled view of at least `length` elements
    Length(usize),
    /// `new C(buffer, byteOffset, length)`: a view over an existing buffer
    View {
        /// ArrayBuffer object
        buffer: Arc<JsObject>,
        /// Byte offset into the buffer
        byte_offset: usize,
        /// Element count; None passes `undefined`
        length: Option<usize>,
    },
}

impl CreateArgs {
    fn to_values(&self) -> Vec<Value> {
        match self {
            Self::Length(len) => vec![Value::number(*len as f64)],
            Self::View {
                buffer,
                byte_offset,
                length,
            } => vec![
                Value::object(buffer.clone()),
                Value::number(*byte_offset as f64),
                length.map_or_else(Value::undefined, |len| Value::number(len as f64)),
            ],
        }
    }
}

/// `SpeciesConstructor(exemplar, %<Kind>Array%)`
pub fn resolve_constructor(realm: &Realm, exemplar: &ValidatedView) -> VmResult<ConstructorRef> {
    let kind = exemplar.kind();
    let ctor = realm.get(exemplar.object(), &PropertyKey::string("constructor"))?;
    if ctor.is_undefined() {
        tracing::trace!(kind = kind.name(), "no constructor, using default");
        return Ok(ConstructorRef::Default(kind));
    }
    let Some(ctor_obj) = ctor.as_object() else {
        return Err(VmError::ConstructorNotReceiver);
    };

    let species = realm.get(ctor_obj, &PropertyKey::Symbol(WellKnownSymbol::Species))?;
    if species.is_nullish() {
        tracing::trace!(kind = kind.name(), "species is nullish, using default");
        return Ok(ConstructorRef::Default(kind));
    }
    match species.as_object() {
        Some(species_obj) if species.is_constructor() => {
            let resolved = ConstructorRef::from_object(realm, species_obj);
            tracing::trace!(
                kind = kind.name(),
                default = resolved.is_default(),
                "species constructor resolved"
            );
            Ok(resolved)
        }
        _ => Err(VmError::SpeciesNotConstructor),
    }
}

/// `TypedArrayCreate(constructor, args)`: construct, validate, check length
pub fn create_derived(
    realm: &Realm,
    constructor: &ConstructorRef,
    args: CreateArgs,
) -> VmResult<ValidatedView> {
    let result = realm.construct(&constructor.to_value(realm), &args.to_values(), None)?;
    let view = ViewValidator::validate(&result, "TypedArrayCreate")?;

    if let CreateArgs::Length(requested) = args {
        let actual = view.length();
        tracing::trace!(requested, actual, kind = view.kind().name(), "derived typed array");
        if actual < requested {
            return Err(VmError::TooShort { requested, actual });
        }
    }
    Ok(view)
}

/// `TypedArraySpeciesCreate(exemplar, args)`
pub fn species_create(
    realm: &Realm,
    exemplar: &ValidatedView,
    args: CreateArgs,
) -> VmResult<ValidatedView> {
    let constructor = resolve_constructor(realm, exemplar)?;
    create_derived(realm, &constructor, args)
}
