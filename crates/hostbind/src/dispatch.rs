//! Method dispatch
//!
//! The two calling conventions the host uses, plus the `_get`/`_set`
//! property protocol built on virtual methods:
//!
//! - [`call`]: arguments and return value are boxed [`Variant`]s. Missing
//!   trailing arguments are filled from the method's defaults.
//! - [`ptrcall`]: arguments and return value are raw typed slots. The
//!   caller supplies exactly one slot per parameter.
//!
//! Both run on the calling thread and hold the instance lock only for the
//! duration of the user callable.

use crate::codec::NativeValue;
use crate::error::{BindResult, BindingError, CallError, CallFailure};
use crate::instance::Wrapped;
use crate::method::{CallArgs, MethodBind, MethodMetadata, ReturnStyle, ReturnValue, VarArgs};
use crate::variant::Variant;
use crate::wire::WireTable;
use crate::Bridge;
use hostbind_sys as sys;

/// Virtual method consulted when the host reads an unknown property
pub const GET_METHOD: &str = "_get";
/// Virtual method consulted when the host writes an unknown property
pub const SET_METHOD: &str = "_set";

// ============================================================================
// Boxed Call
// ============================================================================

/// Call `bind` on `wrapped` with boxed arguments.
pub fn call(
    bridge: &Bridge,
    bind: &MethodBind,
    wrapped: &Wrapped,
    args: &[&Variant],
) -> Result<Variant, CallFailure> {
    let wire = bridge.wire();
    let meta = bind.metadata();
    log::trace!("call {} with {} args", meta, args.len());

    let call_args = if meta.is_variadic {
        CallArgs::Variadic(VarArgs::new(args))
    } else {
        CallArgs::Fixed(decode_variants(wire, meta, args)?)
    };

    let ret = invoke(bind, wrapped, call_args)?;
    Ok(encode_variant_return(wire, meta, ret)?)
}

fn decode_variants(
    wire: &WireTable,
    meta: &MethodMetadata,
    args: &[&Variant],
) -> Result<Vec<NativeValue>, CallFailure> {
    let expected = meta.param_count();
    if args.len() > expected {
        return Err(CallError::TooManyArguments {
            expected: expected as i32,
        }
        .into());
    }

    let mut values = Vec::with_capacity(expected);
    for (index, codec) in meta.param_codecs.iter().enumerate() {
        let arg = match args.get(index) {
            Some(arg) => *arg,
            None => meta.default_for(index).ok_or_else(|| BindingError::TooFewArguments {
                method: meta.to_string(),
                expected,
                supplied: args.len(),
            })?,
        };
        let value = (codec.decode_variant)(wire, arg).ok_or(CallError::InvalidArgument {
            argument: index as i32,
            expected: codec.variant_type.sys() as i32,
        })?;
        values.push(value);
    }
    Ok(values)
}

fn encode_variant_return(wire: &WireTable, meta: &MethodMetadata, ret: ReturnValue) -> BindResult<Variant> {
    warn_dropped_flag(meta, &ret);
    match (ret.value, meta.return_codec) {
        (Some(value), Some(codec)) => (codec.encode_variant)(wire, value),
        _ => Ok(Variant::nil()),
    }
}

// ============================================================================
// Raw Call
// ============================================================================

/// Call `bind` on `wrapped` with raw typed slots, writing the result to
/// `ret`.
///
/// # Safety
///
/// Each slot in `args` must hold an initialized value of the matching
/// parameter type, and `ret` must be null or writable storage for the
/// return type.
pub unsafe fn ptrcall(
    bridge: &Bridge,
    bind: &MethodBind,
    wrapped: &Wrapped,
    args: &[sys::GDExtensionConstTypePtr],
    ret: sys::GDExtensionTypePtr,
) -> BindResult<()> {
    let wire = bridge.wire();
    let meta = bind.metadata();
    log::trace!("ptrcall {}", meta);

    if meta.is_variadic {
        return Err(BindingError::VariadicMismatch {
            class: meta.class_name.clone(),
            method: meta.declared_name.clone(),
        });
    }
    if args.len() != meta.param_count() {
        return Err(BindingError::ArityMismatch {
            method: meta.to_string(),
            expected: meta.param_count(),
            supplied: args.len(),
        });
    }

    let values = args
        .iter()
        .zip(&meta.param_codecs)
        .map(|(slot, codec)| (codec.decode_type_ptr)(wire, *slot))
        .collect();

    let out = invoke(bind, wrapped, CallArgs::Fixed(values))?;
    warn_dropped_flag(meta, &out);
    if let (Some(value), Some(codec)) = (out.value, meta.return_codec) {
        if !ret.is_null() {
            (codec.encode_type_ptr)(wire, value, ret)?;
        }
    }
    Ok(())
}

// ============================================================================
// Property Protocol
// ============================================================================

/// Read property `name` through the class's `_get`. `None` when the class
/// has no `_get` or it declines the name.
pub fn get_property(bridge: &Bridge, wrapped: &Wrapped, name: &str) -> BindResult<Option<Variant>> {
    let Some(bind) = bridge.classes().virtual_method(wrapped.class_name(), GET_METHOD) else {
        return Ok(None);
    };
    let meta = bind.metadata();
    if meta.return_style != ReturnStyle::ValueAndBool || meta.param_count() != 1 {
        return Err(BindingError::ReturnTypeMismatch {
            method: meta.to_string(),
            expected: "(Variant, bool)",
        });
    }

    let out = invoke(&bind, wrapped, CallArgs::Fixed(vec![NativeValue::String(name.to_string())]))?;
    if out.flag != Some(true) {
        return Ok(None);
    }
    match (out.value, meta.return_codec) {
        (Some(value), Some(codec)) => Ok(Some((codec.encode_variant)(bridge.wire(), value)?)),
        _ => Ok(None),
    }
}

/// Write property `name` through the class's `_set`. Returns whether the
/// class handled it.
pub fn set_property(bridge: &Bridge, wrapped: &Wrapped, name: &str, value: &Variant) -> BindResult<bool> {
    let Some(bind) = bridge.classes().virtual_method(wrapped.class_name(), SET_METHOD) else {
        return Ok(false);
    };
    let meta = bind.metadata();
    if meta.return_style != ReturnStyle::Value || meta.param_count() != 2 {
        return Err(BindingError::ReturnTypeMismatch {
            method: meta.to_string(),
            expected: "bool",
        });
    }

    let args = vec![NativeValue::String(name.to_string()), NativeValue::Variant(value.clone())];
    match invoke(&bind, wrapped, CallArgs::Fixed(args))?.value {
        Some(NativeValue::Bool(handled)) => Ok(handled),
        _ => Err(BindingError::ReturnTypeMismatch {
            method: meta.to_string(),
            expected: "bool",
        }),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn invoke(bind: &MethodBind, wrapped: &Wrapped, args: CallArgs<'_>) -> BindResult<ReturnValue> {
    let state = wrapped
        .state()
        .ok_or_else(|| BindingError::InstanceIsNull(wrapped.class_name().to_string()))?;
    let mut guard = state.lock();
    bind.invoke(&mut **guard, args)
        .map_err(|err| annotate(err, bind.metadata(), wrapped))
}

fn warn_dropped_flag(meta: &MethodMetadata, ret: &ReturnValue) {
    if meta.return_style == ReturnStyle::ValueAndBool && ret.flag.is_some() {
        log::warn!("{}: second return value ignored", meta);
    }
}

/// Fill in the method and class context invokers leave blank.
fn annotate(err: BindingError, meta: &MethodMetadata, wrapped: &Wrapped) -> BindingError {
    let method = || meta.to_string();
    match err {
        BindingError::ArityMismatch {
            method: m,
            expected,
            supplied,
        } if m.is_empty() => BindingError::ArityMismatch {
            method: method(),
            expected,
            supplied,
        },
        BindingError::ArgumentTypeMismatch {
            method: m,
            index,
            expected,
            found,
        } if m.is_empty() => BindingError::ArgumentTypeMismatch {
            method: method(),
            index,
            expected,
            found,
        },
        BindingError::InstanceTypeMismatch { class, expected } if class.is_empty() => {
            BindingError::InstanceTypeMismatch {
                class: wrapped.class_name().to_string(),
                expected,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{construct_erased, ExtensionClass};
    use crate::method::MethodFlags;
    use crate::types::ObjectHandle;
    use std::sync::{Arc, Weak};

    struct Meter {
        total: i64,
    }

    impl ExtensionClass for Meter {
        const CLASS_NAME: &'static str = "Meter";
        const PARENT_CLASS_NAME: &'static str = "Object";

        fn construct(_owner: ObjectHandle) -> Self {
            Meter { total: 0 }
        }
    }

    impl Meter {
        fn add(&mut self, amount: i64, times: i32) -> i64 {
            self.total += amount * times as i64;
            self.total
        }

        fn lookup(&mut self, key: String) -> (i64, bool) {
            (key.len() as i64, !key.is_empty())
        }
    }

    fn meter_instance() -> Arc<Wrapped> {
        Wrapped::create(
            Weak::new(),
            "Meter",
            ObjectHandle::null(),
            1,
            Some(construct_erased::<Meter>(ObjectHandle::null())),
        )
    }

    #[test]
    fn test_invoke_locks_state() {
        let bind = MethodBind::new("Meter", "Add", "add", Meter::add, &[], vec![], MethodFlags::DEFAULT)
            .unwrap();
        let wrapped = meter_instance();
        let out = invoke(
            &bind,
            &wrapped,
            CallArgs::Fixed(vec![NativeValue::I64(5), NativeValue::I32(2)]),
        )
        .unwrap();
        assert!(matches!(out.value, Some(NativeValue::I64(10))));
        assert_eq!(wrapped.with_state(|m: &mut Meter| m.total).unwrap(), 10);
    }

    #[test]
    fn test_invoke_foreign_object() {
        let bind = MethodBind::new("Meter", "Add", "add", Meter::add, &[], vec![], MethodFlags::DEFAULT)
            .unwrap();
        let wrapped = Wrapped::create(Weak::new(), "Node", ObjectHandle::null(), 2, None);
        let err = invoke(&bind, &wrapped, CallArgs::Fixed(vec![])).unwrap_err();
        assert_eq!(err, BindingError::InstanceIsNull("Node".into()));
    }

    #[test]
    fn test_errors_carry_method_context() {
        let bind = MethodBind::new("Meter", "Add", "add", Meter::add, &[], vec![], MethodFlags::DEFAULT)
            .unwrap();
        let wrapped = meter_instance();
        let err = invoke(
            &bind,
            &wrapped,
            CallArgs::Fixed(vec![NativeValue::I64(1), NativeValue::Bool(true)]),
        )
        .unwrap_err();
        match err {
            BindingError::ArgumentTypeMismatch { method, index, .. } => {
                assert_eq!(method, "MethodBind:Meter.Add(i64/2,i32/2) i64");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_flag_is_returned_to_protocol_callers() {
        let bind = MethodBind::new(
            "Meter",
            "Lookup",
            "lookup",
            Meter::lookup,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        let wrapped = meter_instance();
        let out = invoke(&bind, &wrapped, CallArgs::Fixed(vec![NativeValue::String("abc".into())])).unwrap();
        assert_eq!(out.flag, Some(true));
        assert!(matches!(out.value, Some(NativeValue::I64(3))));
    }
}
