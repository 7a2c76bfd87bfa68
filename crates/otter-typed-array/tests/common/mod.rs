#![allow(dead_code)]

use std::sync::Arc;

use otter_typed_array::object::PropertyDescriptor;
use otter_typed_array::{JsObject, PropertyKey, Realm, TypedArrayKind, Value, WellKnownSymbol};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn obj(value: &Value) -> &Arc<JsObject> {
    value.as_object().expect("expected an object")
}

pub fn kind_of(value: &Value) -> TypedArrayKind {
    obj(value)
        .as_typed_array()
        .expect("expected a typed array")
        .kind()
}

pub fn elements(value: &Value) -> Vec<f64> {
    let ta = obj(value).as_typed_array().expect("expected a typed array");
    (0..ta.length()).filter_map(|i| ta.get(i)).collect()
}

pub fn typed(realm: &Realm, kind: TypedArrayKind, values: &[f64]) -> Value {
    realm.typed_array_from_numbers(kind, values).unwrap()
}

pub fn ctor(realm: &Realm, kind: TypedArrayKind) -> Value {
    Value::object(realm.typed_array_constructor(kind).clone())
}

pub fn numbers(realm: &Realm, values: &[f64]) -> Value {
    realm.new_array(values.iter().copied().map(Value::number).collect())
}

pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Define `target[Symbol.species] = species` as an own data property
pub fn set_species(target: &Value, species: Value) {
    obj(target).define_property(
        PropertyKey::Symbol(WellKnownSymbol::Species),
        PropertyDescriptor::data(species),
    );
}

/// Define `target.constructor = constructor` as an own data property
pub fn set_constructor(target: &Value, constructor: Value) {
    obj(target).set_own(PropertyKey::string("constructor"), constructor);
}

/// Call a method installed on the receiver's prototype chain
pub fn invoke(
    realm: &Realm,
    receiver: &Value,
    name: &str,
    args: &[Value],
) -> otter_typed_array::VmResult<Value> {
    let method = realm.get_value(receiver, &PropertyKey::string(name))?;
    realm.call(&method, receiver, args)
}
