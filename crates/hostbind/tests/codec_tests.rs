//! Value codec tests against the mock host

use hostbind::codec::{NativeValue, WireType, I64_CODEC, OBJECT_CODEC, STRING_CODEC, VARIANT_CODEC};
use hostbind::sys::VariantType;
use hostbind::testing;
use hostbind::types::*;
use hostbind::{GString, StringName, Variant, VariantError, WireTable};

fn wire() -> &'static WireTable {
    testing::install().1
}

fn boxed<T: WireType>(value: T) -> T {
    let wire = wire();
    let variant = value.encode_variant(wire);
    assert_eq!(variant.get_type(wire), T::VARIANT_TYPE);
    T::decode_variant(wire, &variant)
}

fn raw<T: WireType>(value: T, slot: &mut [u8]) -> T {
    let wire = wire();
    unsafe {
        value.encode_type_ptr(wire, slot.as_mut_ptr() as _);
        T::decode_type_ptr(wire, slot.as_ptr() as _)
    }
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_integer_boundaries() {
    assert_eq!(boxed(i64::MIN), i64::MIN);
    assert_eq!(boxed(i64::MAX), i64::MAX);
    assert_eq!(boxed(u64::MAX), u64::MAX);
    assert_eq!(boxed(i8::MIN), i8::MIN);
    assert_eq!(boxed(u8::MAX), u8::MAX);
    assert_eq!(boxed(0i32), 0);

    let mut slot = [0u8; 8];
    assert_eq!(raw(i32::MIN, &mut slot), i32::MIN);
    assert_eq!(i64::from_ne_bytes(slot), i32::MIN as i64);
}

#[test]
fn test_byte_range_round_trips() {
    let mut slot = [0u8; 8];
    for value in i8::MIN..=i8::MAX {
        assert_eq!(boxed(value), value);
        assert_eq!(raw(value, &mut slot), value);
    }
    for value in u8::MIN..=u8::MAX {
        assert_eq!(boxed(value), value);
        assert_eq!(raw(value, &mut slot), value);
    }
}

#[test]
fn test_float_special_values() {
    assert!(boxed(f64::NAN).is_nan());
    assert_eq!(boxed(f64::INFINITY), f64::INFINITY);
    assert_eq!(boxed(f64::NEG_INFINITY), f64::NEG_INFINITY);
    assert_eq!(boxed(-0.0f64).to_bits(), (-0.0f64).to_bits());
    assert_eq!(boxed(1.5f32), 1.5);

    let mut slot = [0u8; 8];
    assert_eq!(raw(0.25f32, &mut slot), 0.25);
    assert_eq!(f64::from_ne_bytes(slot), 0.25);
}

#[test]
fn test_bool_variants() {
    let wire = wire();
    assert!(boxed(true));
    assert!(!boxed(false));
    assert!(true.encode_variant(wire).booleanize(wire));
    assert!(!false.encode_variant(wire).booleanize(wire));
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_strings() {
    assert_eq!(boxed(String::new()), "");
    assert_eq!(boxed("hello".to_string()), "hello");
    assert_eq!(boxed("héllo wörld ✓".to_string()), "héllo wörld ✓");

    let mut slot = [0u8; 8];
    let text = raw("slot".to_string(), &mut slot);
    assert_eq!(text, "slot");
    // The slot now holds a host string the test owns.
    drop(unsafe { GString::new_with(|dst| std::ptr::copy_nonoverlapping(slot.as_ptr(), dst as *mut u8, 8)) });
}

#[test]
fn test_string_handles() {
    let wire = wire();
    let text = GString::from_str(wire, "abc");
    assert_eq!(text.to_utf32(wire), vec!['a' as u32, 'b' as u32, 'c' as u32]);
    assert_eq!(GString::from_utf32(wire, &[0x263A]).to_rust_string(wire), "☺");
    assert_eq!(GString::from_latin1(wire, c"caf\xe9").to_rust_string(wire), "café");

    let name = StringName::new(wire, "_ready");
    assert_eq!(name.to_rust_string(wire), "_ready");
    assert_eq!(GString::from_string_name(wire, &name).to_rust_string(wire), "_ready");

    let copy = text.clone();
    drop(text);
    assert_eq!(copy.to_rust_string(wire), "abc");
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn test_aggregates() {
    let v = Vector3::new(1.0, -2.0, 3.5);
    assert_eq!(boxed(v), v);
    assert_eq!(boxed(Vector2i::new(-1, 7)), Vector2i::new(-1, 7));
    assert_eq!(boxed(Color::rgba(0.1, 0.2, 0.3, 1.0)), Color::rgba(0.1, 0.2, 0.3, 1.0));
    assert_eq!(boxed(Quaternion::default()), Quaternion::default());
    assert_eq!(boxed(Rid(42)), Rid(42));
}

#[test]
fn test_wide_aggregates() {
    let transform = Transform3D {
        basis: Basis::IDENTITY,
        origin: Vector3::new(4.0, 5.0, 6.0),
    };
    assert_eq!(boxed(transform), transform);
    assert_eq!(boxed(Projection::default()), Projection::default());

    let aabb = Aabb {
        position: Vector3::new(-1.0, -1.0, -1.0),
        size: Vector3::new(2.0, 2.0, 2.0),
    };
    let mut slot = [0u8; 24];
    assert_eq!(raw(aabb, &mut slot), aabb);
}

// ============================================================================
// Objects and Variants
// ============================================================================

#[test]
fn test_null_object_is_nil() {
    let wire = wire();
    let variant = ObjectHandle::null().encode_variant(wire);
    assert!(variant.is_nil(wire));
    assert!(ObjectHandle::decode_variant(wire, &variant).is_null());
    assert!((OBJECT_CODEC.decode_variant)(wire, &Variant::nil()).is_some());
}

#[test]
fn test_object_round_trip() {
    let (host, wire) = testing::install();
    let object = host.construct_object("Object");
    let variant = object.encode_variant(wire);
    assert_eq!(variant.get_type(wire), VariantType::Object);
    assert_eq!(ObjectHandle::decode_variant(wire, &variant), object);
    host.destroy_object(object);
}

#[test]
fn test_variant_passthrough() {
    let wire = wire();
    let inner = 7i64.encode_variant(wire);
    let value = (VARIANT_CODEC.decode_variant)(wire, &inner).unwrap();
    match value {
        NativeValue::Variant(v) => assert_eq!(i64::decode_variant(wire, &v), 7),
        other => panic!("unexpected value {:?}", other),
    }
}

#[test]
fn test_type_mismatch_is_rejected() {
    let wire = wire();
    let text = "12".to_string().encode_variant(wire);
    assert!((I64_CODEC.decode_variant)(wire, &text).is_none());
    assert!((STRING_CODEC.decode_variant)(wire, &5i64.encode_variant(wire)).is_none());
    assert!((OBJECT_CODEC.decode_variant)(wire, &text).is_none());
}

#[test]
fn test_stringify() {
    let wire = wire();
    assert_eq!(Variant::nil().stringify(wire), "<null>");
    assert_eq!(42i64.encode_variant(wire).stringify(wire), "42");
    assert_eq!("hi".to_string().encode_variant(wire).stringify(wire), "hi");
}

#[test]
fn test_element_access() {
    let wire = wire();
    let text = "abc".to_string().encode_variant(wire);
    assert_eq!(text.get_indexed(wire, 2).unwrap().stringify(wire), "c");
    assert_eq!(text.get_indexed(wire, 3).unwrap_err(), VariantError::OutOfBounds { index: 3 });
    assert_eq!(text.get_indexed(wire, -1).unwrap_err(), VariantError::OutOfBounds { index: -1 });

    let number = 9i64.encode_variant(wire);
    assert_eq!(number.get_indexed(wire, 0).unwrap_err(), VariantError::Invalid);
    assert_eq!(number.get_keyed(wire, &text).unwrap_err(), VariantError::Invalid);
    assert_eq!(number.get_named(wire, "x").unwrap_err(), VariantError::Invalid);
}
