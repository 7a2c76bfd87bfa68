mod common;

use common::*;
use otter_typed_array::{
    PropertyKey, Realm, TypedArrayKind, Value, VmError, WellKnownSymbol, typed_array_join,
    typed_array_slice, typed_array_sort, typed_array_subarray,
};

#[test]
fn sort_without_comparator_orders_numerically() {
    let realm = Realm::new();
    let ta = typed(
        &realm,
        TypedArrayKind::Float64,
        &[10.0, f64::NAN, 2.0, 0.0, -0.0, -5.0, f64::INFINITY],
    );
    let result = typed_array_sort(&realm, &ta, &Value::undefined()).unwrap();
    assert!(result.strict_equals(&ta));

    let values = elements(&ta);
    assert_eq!(&values[..2], &[-5.0, 0.0]);
    assert!(values[1].is_sign_negative());
    assert!(values[2] == 0.0 && values[2].is_sign_positive());
    assert_eq!(&values[3..6], &[2.0, 10.0, f64::INFINITY]);
    assert!(values[6].is_nan());
}

#[test]
fn sort_with_comparator_is_stable() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Float32, &[2.5, 1.5, 2.25, 1.25, 0.5]);
    // Compare integer parts only
    let by_integer_part = realm.new_function("cmp", |_, args, _| {
        let a = arg(args, 0).to_number().trunc();
        let b = arg(args, 1).to_number().trunc();
        Ok(Value::number(a - b))
    });
    invoke(&realm, &ta, "sort", &[by_integer_part]).unwrap();
    assert_eq!(elements(&ta), vec![0.5, 1.5, 1.25, 2.5, 2.25]);
}

#[test]
fn sort_comparator_nan_is_equal() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int8, &[3.0, 1.0, 2.0]);
    let nan = realm.new_function("nan", |_, _, _| Ok(Value::number(f64::NAN)));
    typed_array_sort(&realm, &ta, &nan).unwrap();
    assert_eq!(elements(&ta), vec![3.0, 1.0, 2.0]);
}

#[test]
fn sort_rejects_bad_comparator() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int8, &[1.0]);
    let err = typed_array_sort(&realm, &ta, &Value::number(1.0)).unwrap_err();
    assert!(matches!(err, VmError::BadSortComparisonFunction));
}

#[test]
fn sort_validates_receiver_first() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int8, &[1.0]);
    realm.detach(&ta).unwrap();
    let err = typed_array_sort(&realm, &ta, &Value::number(1.0)).unwrap_err();
    assert!(matches!(err, VmError::DetachedBuffer(_)));
}

#[test]
fn sort_comparator_detaching_drops_writes() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Uint16, &[3.0, 2.0, 1.0]);
    let target = ta.clone();
    let detach = realm.new_function("detach", move |_, args, realm| {
        realm.detach(&target)?;
        Ok(Value::number(arg(args, 0).to_number() - arg(args, 1).to_number()))
    });
    let result = typed_array_sort(&realm, &ta, &detach).unwrap();
    assert!(result.strict_equals(&ta));
    assert!(elements(&ta).is_empty());
}

#[test]
fn sort_comparator_error_propagates() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Uint16, &[3.0, 2.0, 1.0]);
    let throws = realm.new_function("throws", |_, _, _| {
        Err(VmError::exception(Value::string("cmp failed")))
    });
    let err = typed_array_sort(&realm, &ta, &throws).unwrap_err();
    assert_eq!(err.thrown_value().and_then(Value::as_str), Some("cmp failed"));
    // Nothing was written back
    assert_eq!(elements(&ta), vec![3.0, 2.0, 1.0]);
}

#[test]
fn join_and_to_string() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Float64, &[1.0, 2.5, -3.0, 1e21]);
    assert_eq!(
        typed_array_join(&ta, &Value::undefined()).unwrap(),
        "1,2.5,-3,1e+21"
    );
    assert_eq!(typed_array_join(&ta, &Value::string(" | ")).unwrap(), "1 | 2.5 | -3 | 1e+21");
    assert_eq!(typed_array_join(&ta, &Value::number(0.0)).unwrap(), "102.50-301e+21");

    let via_proto = invoke(&realm, &ta, "toString", &[]).unwrap();
    assert_eq!(via_proto.as_str(), Some("1,2.5,-3,1e+21"));

    let empty = typed(&realm, TypedArrayKind::Int8, &[]);
    assert_eq!(typed_array_join(&empty, &Value::undefined()).unwrap(), "");
}

#[test]
fn join_requires_live_typed_array() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int8, &[1.0]);
    realm.detach(&ta).unwrap();
    assert!(matches!(
        typed_array_join(&ta, &Value::undefined()),
        Err(VmError::DetachedBuffer(_))
    ));
    assert!(matches!(
        typed_array_join(&Value::string("x"), &Value::undefined()),
        Err(VmError::NotATypedArray)
    ));
}

#[test]
fn subarray_shares_buffer() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int32, &[0.0, 1.0, 2.0, 3.0, 4.0]);
    let sub = typed_array_subarray(&realm, &ta, &Value::number(1.0), &Value::number(-1.0))
        .unwrap();
    assert_eq!(elements(&sub), vec![1.0, 2.0, 3.0]);
    let offset = realm
        .get(obj(&sub), &PropertyKey::string("byteOffset"))
        .unwrap();
    assert_eq!(offset.as_number(), Some(4.0));

    realm
        .set(obj(&sub), PropertyKey::Index(0), Value::number(42.0))
        .unwrap();
    assert_eq!(elements(&ta)[1], 42.0);

    let whole = typed_array_subarray(&realm, &ta, &Value::undefined(), &Value::undefined())
        .unwrap();
    assert_eq!(elements(&whole).len(), 5);
    let inverted = typed_array_subarray(&realm, &ta, &Value::number(4.0), &Value::number(2.0))
        .unwrap();
    assert!(elements(&inverted).is_empty());
}

#[test]
fn subarray_honors_species() {
    let realm = Realm::new();
    let subclass = realm
        .define_subclass("Words", &ctor(&realm, TypedArrayKind::Uint16))
        .unwrap();
    let ta = realm
        .construct(&subclass, &[numbers(&realm, &[1.0, 2.0, 3.0])], None)
        .unwrap();
    let sub = invoke(&realm, &ta, "subarray", &[Value::number(1.0)]).unwrap();
    let constructor = realm
        .get(obj(&sub), &PropertyKey::string("constructor"))
        .unwrap();
    assert!(constructor.strict_equals(&subclass));
    assert_eq!(elements(&sub), vec![2.0, 3.0]);
}

#[test]
fn subarray_of_detached_fails_in_constructor() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int8, &[1.0, 2.0]);
    realm.detach(&ta).unwrap();
    let err = typed_array_subarray(&realm, &ta, &Value::undefined(), &Value::undefined())
        .unwrap_err();
    assert!(matches!(err, VmError::DetachedBuffer(ref m) if m == "Construct"));
}

#[test]
fn slice_copies_range() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int16, &[1.0, -2.0, 3.0, -4.0]);
    let sliced = typed_array_slice(&realm, &ta, &Value::number(-3.0), &Value::number(3.0))
        .unwrap();
    assert_eq!(elements(&sliced), vec![-2.0, 3.0]);

    // Independent storage
    realm
        .set(obj(&sliced), PropertyKey::Index(0), Value::number(7.0))
        .unwrap();
    assert_eq!(elements(&ta)[1], -2.0);

    let empty = invoke(&realm, &ta, "slice", &[Value::number(3.0), Value::number(1.0)]).unwrap();
    assert!(elements(&empty).is_empty());
    assert_eq!(kind_of(&empty), TypedArrayKind::Int16);
}

#[test]
fn slice_detects_detach_during_species_construction() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Uint8, &[1.0, 2.0, 3.0]);
    let victim = ta.clone();
    let detaching = realm.new_constructor("Detaching", move |args, _new_target, realm| {
        realm.detach(&victim)?;
        let len = arg(args, 0).to_number() as usize;
        realm.new_typed_array(TypedArrayKind::Uint8, len)
    });
    let holder = Value::object(realm.new_object());
    set_species(&holder, detaching);
    set_constructor(&ta, holder);

    let err = typed_array_slice(&realm, &ta, &Value::undefined(), &Value::undefined())
        .unwrap_err();
    assert!(matches!(
        err,
        VmError::DetachedBuffer(ref m) if m == "%TypedArray%.prototype.slice"
    ));
}

#[test]
fn values_iterator_reads_live_length() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Uint8, &[4.0, 5.0, 6.0]);
    let iterator = invoke(&realm, &ta, "values", &[]).unwrap();
    let next = realm
        .get_value(&iterator, &PropertyKey::string("next"))
        .unwrap();

    let first = realm.call(&next, &iterator, &[]).unwrap();
    let value = realm.get_value(&first, &PropertyKey::string("value")).unwrap();
    assert_eq!(value.as_number(), Some(4.0));

    realm.detach(&ta).unwrap();
    let err = realm.call(&next, &iterator, &[]).unwrap_err();
    assert!(matches!(err, VmError::DetachedBuffer(_)));
}

#[test]
fn iterator_symbol_is_values() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int32, &[1.0, 2.0]);
    let values = realm.get_value(&ta, &PropertyKey::string("values")).unwrap();
    let iterator = realm
        .get_value(&ta, &PropertyKey::Symbol(WellKnownSymbol::Iterator))
        .unwrap();
    assert!(values.strict_equals(&iterator));

    let collected = realm.iterable_to_list(&ta, &iterator).unwrap();
    let collected: Vec<f64> = collected.iter().map(Value::to_number).collect();
    assert_eq!(collected, vec![1.0, 2.0]);
}

#[test]
fn index_writes_outside_bounds_are_dropped() {
    let realm = Realm::new();
    let ta = typed(&realm, TypedArrayKind::Int8, &[1.0]);
    assert!(
        realm
            .set(obj(&ta), PropertyKey::Index(5), Value::number(3.0))
            .unwrap()
    );
    assert!(!realm.has_property(obj(&ta), &PropertyKey::Index(5)));
    assert_eq!(elements(&ta), vec![1.0]);
}
