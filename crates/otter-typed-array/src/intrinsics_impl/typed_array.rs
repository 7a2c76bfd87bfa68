//! TypedArray constructor statics and prototype methods (ES2026 §23.2)
//!
//! ## Prototype Chain
//!
//! ```text
//! instance → Int8Array.prototype → %TypedArray%.prototype → Object.prototype → null
//! Int8Array → %TypedArray% → Function.prototype
//! ```
//!
//! Every method that derives a new typed array goes through
//! [`species_create`] or [`create_derived`], and every method that reads the
//! receiver after calling user code re-checks liveness at the point of use.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey, WellKnownSymbol};
use crate::realm::{Realm, native_function};
use crate::species::{ConstructorRef, CreateArgs, create_derived, species_create};
use crate::validate::ViewValidator;
use crate::value::{Value, number_to_string, relative_index};

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

// ============================================================================
// Initialization
// ============================================================================

/// Install `%TypedArray%` statics and `%TypedArray%.prototype` members.
pub fn init_typed_array_intrinsics(
    ctor: &Arc<JsObject>,
    proto: &Arc<JsObject>,
    fn_proto: &Arc<JsObject>,
) {
    init_typed_array_statics(ctor, fn_proto);
    init_typed_array_getters(proto, fn_proto);
    init_typed_array_methods(proto, fn_proto);
    init_typed_array_iterators(proto, fn_proto);
}

/// Install `Array.prototype.values` and `Array.prototype[Symbol.iterator]`.
pub fn init_array_iteration(array_proto: &Arc<JsObject>, fn_proto: &Arc<JsObject>) {
    let values = Value::object(native_function("values", fn_proto, |this_val, _args, realm| {
        if !this_val.is_object() {
            return Err(VmError::type_error(
                "Array.prototype.values called on non-object",
            ));
        }
        Ok(realm.new_index_iterator(this_val.clone()))
    }));
    array_proto.define_property(
        PropertyKey::string("values"),
        PropertyDescriptor::builtin_method(values.clone()),
    );
    array_proto.define_property(
        PropertyKey::Symbol(WellKnownSymbol::Iterator),
        PropertyDescriptor::builtin_method(values),
    );
}

fn init_typed_array_statics(ctor: &Arc<JsObject>, fn_proto: &Arc<JsObject>) {
    // %TypedArray%.from(source [, mapfn [, thisArg]]) (ES2026 §23.2.2.1)
    ctor.define_property(
        PropertyKey::string("from"),
        PropertyDescriptor::builtin_method(Value::object(native_function(
            "from",
            fn_proto,
            |this_val, args, realm| {
                typed_array_from(realm, this_val, &arg(args, 0), &arg(args, 1), &arg(args, 2))
            },
        ))),
    );

    // get %TypedArray%[Symbol.species] (ES2026 §23.2.2.4)
    ctor.define_property(
        PropertyKey::Symbol(WellKnownSymbol::Species),
        PropertyDescriptor::getter(Value::object(native_function(
            "get [Symbol.species]",
            fn_proto,
            |this_val, _args, _realm| Ok(this_val.clone()),
        ))),
    );
}

// ============================================================================
// Getters
// ============================================================================

fn init_typed_array_getters(proto: &Arc<JsObject>, fn_proto: &Arc<JsObject>) {
    // get %TypedArray%.prototype.buffer
    proto.define_property(
        PropertyKey::string("buffer"),
        PropertyDescriptor::getter(Value::object(native_function(
            "get buffer",
            fn_proto,
            |this_val, _args, _realm| {
                let view = ViewValidator::require_typed_array(this_val)?;
                Ok(Value::object(view.typed_array().buffer().clone()))
            },
        ))),
    );

    // get %TypedArray%.prototype.byteLength
    proto.define_property(
        PropertyKey::string("byteLength"),
        PropertyDescriptor::getter(Value::object(native_function(
            "get byteLength",
            fn_proto,
            |this_val, _args, _realm| {
                let view = ViewValidator::require_typed_array(this_val)?;
                Ok(Value::number(view.typed_array().byte_length() as f64))
            },
        ))),
    );

    // get %TypedArray%.prototype.byteOffset
    proto.define_property(
        PropertyKey::string("byteOffset"),
        PropertyDescriptor::getter(Value::object(native_function(
            "get byteOffset",
            fn_proto,
            |this_val, _args, _realm| {
                let view = ViewValidator::require_typed_array(this_val)?;
                Ok(Value::number(view.typed_array().byte_offset() as f64))
            },
        ))),
    );

    // get %TypedArray%.prototype.length
    proto.define_property(
        PropertyKey::string("length"),
        PropertyDescriptor::getter(Value::object(native_function(
            "get length",
            fn_proto,
            |this_val, _args, _realm| {
                let view = ViewValidator::require_typed_array(this_val)?;
                Ok(Value::number(view.length() as f64))
            },
        ))),
    );

    // get %TypedArray%.prototype[Symbol.toStringTag]: undefined for non typed arrays
    proto.define_property(
        PropertyKey::Symbol(WellKnownSymbol::ToStringTag),
        PropertyDescriptor::getter(Value::object(native_function(
            "get [Symbol.toStringTag]",
            fn_proto,
            |this_val, _args, _realm| {
                Ok(this_val
                    .as_object()
                    .and_then(|obj| obj.as_typed_array())
                    .map_or_else(Value::undefined, |ta| Value::string(ta.kind().name())))
            },
        ))),
    );
}

// ============================================================================
// Methods
// ============================================================================

fn define_method<F>(proto: &Arc<JsObject>, fn_proto: &Arc<JsObject>, name: &str, f: F)
where
    F: Fn(&Value, &[Value], &Realm) -> VmResult<Value> + Send + Sync + 'static,
{
    proto.define_property(
        PropertyKey::string(name),
        PropertyDescriptor::builtin_method(Value::object(native_function(name, fn_proto, f))),
    );
}

fn init_typed_array_methods(proto: &Arc<JsObject>, fn_proto: &Arc<JsObject>) {
    // %TypedArray%.prototype.filter(callbackfn [, thisArg]) (ES2026 §23.2.3.10)
    define_method(proto, fn_proto, "filter", |this_val, args, realm| {
        typed_array_filter(realm, this_val, &arg(args, 0), &arg(args, 1))
    });

    // %TypedArray%.prototype.sort(comparefn) (ES2026 §23.2.3.29)
    define_method(proto, fn_proto, "sort", |this_val, args, realm| {
        typed_array_sort(realm, this_val, &arg(args, 0))
    });

    // %TypedArray%.prototype.join(separator) (ES2026 §23.2.3.18)
    define_method(proto, fn_proto, "join", |this_val, args, _realm| {
        typed_array_join(this_val, &arg(args, 0)).map(|s| Value::string(&s))
    });

    define_method(proto, fn_proto, "toString", |this_val, _args, _realm| {
        typed_array_join(this_val, &Value::undefined()).map(|s| Value::string(&s))
    });

    // %TypedArray%.prototype.subarray(begin, end) (ES2026 §23.2.3.30)
    define_method(proto, fn_proto, "subarray", |this_val, args, realm| {
        typed_array_subarray(realm, this_val, &arg(args, 0), &arg(args, 1))
    });

    // %TypedArray%.prototype.slice(start, end) (ES2026 §23.2.3.27)
    define_method(proto, fn_proto, "slice", |this_val, args, realm| {
        typed_array_slice(realm, this_val, &arg(args, 0), &arg(args, 1))
    });
}

fn init_typed_array_iterators(proto: &Arc<JsObject>, fn_proto: &Arc<JsObject>) {
    // %TypedArray%.prototype.values and [Symbol.iterator] are the same function object
    let values = Value::object(native_function("values", fn_proto, |this_val, _args, realm| {
        ViewValidator::validate(this_val, "%TypedArray%.prototype.values")?;
        Ok(realm.new_index_iterator(this_val.clone()))
    }));
    proto.define_property(
        PropertyKey::string("values"),
        PropertyDescriptor::builtin_method(values.clone()),
    );
    proto.define_property(
        PropertyKey::Symbol(WellKnownSymbol::Iterator),
        PropertyDescriptor::data_with_attrs(values, PropertyAttributes::builtin()),
    );
}

// ============================================================================
// Operations
// ============================================================================

/// `%TypedArray%.prototype.filter(callbackfn [, thisArg])`
///
/// Kept elements are collected into a plain list first; the result is only
/// species-created once the whole pass is done. An element whose index is no
/// longer present when it is reached (e.g. the predicate detached the buffer)
/// is skipped.
pub fn typed_array_filter(
    realm: &Realm,
    this_val: &Value,
    callback: &Value,
    this_arg: &Value,
) -> VmResult<Value> {
    let source = ViewValidator::validate(this_val, "%TypedArray%.prototype.filter")?;
    let length = source.length();
    if !callback.is_callable() {
        return Err(VmError::CalledNonCallable(callback.describe()));
    }

    let mut kept = Vec::new();
    for index in 0..length {
        let Some(element) = source.get(index) else {
            continue;
        };
        let selected = realm.call(
            callback,
            this_arg,
            &[
                Value::number(element),
                Value::number(index as f64),
                source.value(),
            ],
        )?;
        if selected.to_boolean() {
            kept.push(element);
        }
    }

    let output = species_create(realm, &source, CreateArgs::Length(kept.len()))?;
    for (index, element) in kept.into_iter().enumerate() {
        realm.set(
            output.object(),
            PropertyKey::from_usize(index),
            Value::number(element),
        )?;
    }
    Ok(output.value())
}

/// `%TypedArray%.from(source [, mapfn [, thisArg]])`
///
/// `this` is used directly as the constructor; no species lookup applies.
pub fn typed_array_from(
    realm: &Realm,
    this_val: &Value,
    source: &Value,
    map_fn: &Value,
    this_arg: &Value,
) -> VmResult<Value> {
    let constructor = ConstructorRef::from_value(realm, this_val)?;
    let mapping = !map_fn.is_undefined();
    if mapping && !map_fn.is_callable() {
        return Err(VmError::CalledNonCallable(map_fn.describe()));
    }

    let array_like = realm.iterable_to_array_like(source)?;
    let length = array_like.length(realm)?;
    let target = create_derived(realm, &constructor, CreateArgs::Length(length))?;

    for index in 0..length {
        let value = array_like.get(realm, index)?;
        let mapped = if mapping {
            realm.call(map_fn, this_arg, &[value, Value::number(index as f64)])?
        } else {
            value
        };
        realm.set(target.object(), PropertyKey::from_usize(index), mapped)?;
    }
    Ok(target.value())
}

/// `%TypedArray%.prototype.sort(comparefn)`
pub fn typed_array_sort(realm: &Realm, this_val: &Value, comparefn: &Value) -> VmResult<Value> {
    let view = ViewValidator::validate(this_val, "%TypedArray%.prototype.sort")?;
    if !comparefn.is_undefined() && !comparefn.is_callable() {
        return Err(VmError::BadSortComparisonFunction);
    }

    let length = view.length();
    let snapshot: Vec<f64> = (0..length).filter_map(|i| view.get(i)).collect();

    let sorted = if comparefn.is_undefined() {
        let mut values = snapshot;
        values.sort_by(|a, b| default_order(*a, *b));
        values
    } else {
        merge_sort_by(&snapshot, &mut |a: f64, b: f64| {
            let result = realm.call(
                comparefn,
                &Value::undefined(),
                &[Value::number(a), Value::number(b)],
            )?;
            let n = result.to_number();
            Ok(if n < 0.0 {
                Ordering::Less
            } else if n > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            })
        })?
    };

    // The comparator may have detached the buffer; those writes are dropped
    for (index, value) in sorted.into_iter().enumerate() {
        view.set(index, value);
    }
    Ok(view.value())
}

/// Numeric ascending, `-0` before `+0`, NaN last
fn default_order(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Stable merge sort with a fallible comparator
fn merge_sort_by<F>(items: &[f64], compare: &mut F) -> VmResult<Vec<f64>>
where
    F: FnMut(f64, f64) -> VmResult<Ordering>,
{
    if items.len() <= 1 {
        return Ok(items.to_vec());
    }
    let mid = items.len() / 2;
    let left = merge_sort_by(&items[..mid], compare)?;
    let right = merge_sort_by(&items[mid..], compare)?;

    let mut merged = Vec::with_capacity(items.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        // Take from the right only when strictly smaller
        if compare(right[j], left[i])? == Ordering::Less {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    Ok(merged)
}

/// `%TypedArray%.prototype.join(separator)`
pub fn typed_array_join(this_val: &Value, separator: &Value) -> VmResult<String> {
    let view = ViewValidator::validate(this_val, "%TypedArray%.prototype.join")?;
    let separator = if separator.is_undefined() {
        ",".to_string()
    } else {
        separator.to_js_string()
    };

    let parts: Vec<String> = (0..view.length())
        .map(|i| view.get(i).map(number_to_string).unwrap_or_default())
        .collect();
    Ok(parts.join(&separator))
}

/// `%TypedArray%.prototype.subarray(begin, end)`
///
/// Shares the receiver's buffer. Liveness is left to the derived constructor.
pub fn typed_array_subarray(
    realm: &Realm,
    this_val: &Value,
    begin: &Value,
    end: &Value,
) -> VmResult<Value> {
    let source = ViewValidator::require_typed_array(this_val)?;
    let source_length = source.length();
    let begin_index = relative_index(begin, source_length, 0);
    let end_index = relative_index(end, source_length, source_length);
    let new_length = end_index.saturating_sub(begin_index);

    let ta = source.typed_array();
    let byte_offset = ta.byte_offset() + begin_index * ta.kind().element_size();
    let output = species_create(
        realm,
        &source,
        CreateArgs::View {
            buffer: ta.buffer().clone(),
            byte_offset,
            length: Some(new_length),
        },
    )?;
    Ok(output.value())
}

/// `%TypedArray%.prototype.slice(start, end)`
pub fn typed_array_slice(
    realm: &Realm,
    this_val: &Value,
    start: &Value,
    end: &Value,
) -> VmResult<Value> {
    const METHOD: &str = "%TypedArray%.prototype.slice";
    let source = ViewValidator::validate(this_val, METHOD)?;
    let length = source.length();
    let first = relative_index(start, length, 0);
    let last = relative_index(end, length, length);
    let count = last.saturating_sub(first);

    let output = species_create(realm, &source, CreateArgs::Length(count))?;
    if count == 0 {
        return Ok(output.value());
    }

    // Constructing the output ran user code
    source.revalidate(METHOD)?;
    if source.kind() == output.kind() {
        if let Some(bytes) = source.typed_array().read_elements_raw(first, count) {
            output.typed_array().write_elements_raw(0, &bytes);
        }
    } else {
        for (n, index) in (first..last).enumerate() {
            if let Some(value) = source.get(index) {
                output.set(n, value);
            }
        }
    }
    Ok(output.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_array::TypedArrayKind;

    fn elements(value: &Value) -> Vec<f64> {
        let ta = value.as_object().and_then(|o| o.as_typed_array()).unwrap();
        (0..ta.length()).filter_map(|i| ta.get(i)).collect()
    }

    #[test]
    fn test_default_order() {
        let mut values = vec![3.0, f64::NAN, 0.0, -0.0, -1.0];
        values.sort_by(|a, b| default_order(*a, *b));
        assert_eq!(values[0], -1.0);
        assert!(values[1] == 0.0 && values[1].is_sign_negative());
        assert!(values[2] == 0.0 && values[2].is_sign_positive());
        assert_eq!(values[3], 3.0);
        assert!(values[4].is_nan());
    }

    #[test]
    fn test_merge_sort_is_stable() {
        // Compare on the integer part only; fractional parts record input order
        let input = [2.1, 1.1, 2.2, 1.2, 0.5];
        let sorted = merge_sort_by(&input, &mut |a: f64, b: f64| {
            Ok(a.trunc().partial_cmp(&b.trunc()).unwrap_or(Ordering::Equal))
        })
        .unwrap();
        assert_eq!(sorted, vec![0.5, 1.1, 1.2, 2.1, 2.2]);
    }

    #[test]
    fn test_merge_sort_propagates_errors() {
        let err = merge_sort_by(&[1.0, 2.0], &mut |_, _| Err(VmError::type_error("boom")))
            .unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_join_formats_numbers() {
        let realm = Realm::new();
        let ta = realm
            .typed_array_from_numbers(TypedArrayKind::Float64, &[1.0, 0.5, -0.0, f64::NAN])
            .unwrap();
        assert_eq!(typed_array_join(&ta, &Value::undefined()).unwrap(), "1,0.5,0,NaN");
        assert_eq!(typed_array_join(&ta, &Value::string("-")).unwrap(), "1-0.5-0-NaN");
    }

    #[test]
    fn test_slice_converts_between_kinds() {
        let realm = Realm::new();
        let source = realm
            .typed_array_from_numbers(TypedArrayKind::Float64, &[1.5, 300.0, -1.0])
            .unwrap();
        let species = Value::object(realm.typed_array_constructor(TypedArrayKind::Uint8).clone());
        let ctor = realm.new_object();
        ctor.set_own(PropertyKey::Symbol(WellKnownSymbol::Species), species);
        source
            .as_object()
            .unwrap()
            .set_own(PropertyKey::string("constructor"), Value::object(ctor));

        let sliced = typed_array_slice(&realm, &source, &Value::undefined(), &Value::undefined())
            .unwrap();
        assert_eq!(elements(&sliced), vec![1.0, 44.0, 255.0]);
    }
}
