//! Rust callables as bindable methods
//!
//! [`NativeMethod`] is implemented for every `Fn(&mut C, A0, .., An) -> R`
//! up to eight parameters, and for `Fn(&mut C, VarArgs) -> R`. The marker
//! type parameter keeps the implementations apart; callers never name it.

use super::{CallArgs, ReturnShape, ReturnValue, VarArgs};
use crate::codec::{NativeValue, WireType};
use crate::error::{BindResult, BindingError};
use crate::reflect::TypeInfo;
use std::marker::PhantomData;

/// A callable bound on receiver type `C`
pub trait NativeMethod<C, Marker>: Send + Sync + 'static {
    /// Takes a `VarArgs` instead of fixed parameters
    const IS_VARIADIC: bool;

    type Output: ReturnShape;

    /// Descriptors of the fixed parameters, in order
    fn param_types() -> Vec<TypeInfo>;

    fn invoke(&self, receiver: &mut C, args: CallArgs<'_>) -> BindResult<ReturnValue>;
}

/// Marker for variadic callables
pub struct VariadicMarker<R>(PhantomData<fn() -> R>);

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

fn take_arg<T: WireType>(value: Option<NativeValue>, index: usize) -> BindResult<T> {
    match value {
        Some(value) => {
            let found = value.type_name();
            T::from_native(value).ok_or(BindingError::ArgumentTypeMismatch {
                method: String::new(),
                index,
                expected: T::NAME,
                found,
            })
        }
        None => Err(BindingError::ArityMismatch {
            method: String::new(),
            expected: index + 1,
            supplied: index,
        }),
    }
}

macro_rules! impl_native_method {
    ($($arg:ident),*) => {
        impl<C, F, R, $($arg,)*> NativeMethod<C, fn($($arg,)*) -> R> for F
        where
            C: 'static,
            F: Fn(&mut C, $($arg,)*) -> R + Send + Sync + 'static,
            R: ReturnShape,
            $($arg: WireType,)*
        {
            const IS_VARIADIC: bool = false;

            type Output = R;

            fn param_types() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$arg>(),)*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn invoke(&self, receiver: &mut C, args: CallArgs<'_>) -> BindResult<ReturnValue> {
                let mut values = args.into_fixed(count!($($arg)*))?.into_iter();
                let mut index = 0usize;
                $(
                    let $arg = take_arg::<$arg>(values.next(), index)?;
                    index += 1;
                )*
                Ok((self)(receiver, $($arg,)*).into_return())
            }
        }
    };
}

impl_native_method!();
impl_native_method!(A0);
impl_native_method!(A0, A1);
impl_native_method!(A0, A1, A2);
impl_native_method!(A0, A1, A2, A3);
impl_native_method!(A0, A1, A2, A3, A4);
impl_native_method!(A0, A1, A2, A3, A4, A5);
impl_native_method!(A0, A1, A2, A3, A4, A5, A6);
impl_native_method!(A0, A1, A2, A3, A4, A5, A6, A7);

impl<C, F, R> NativeMethod<C, VariadicMarker<R>> for F
where
    C: 'static,
    F: for<'a> Fn(&mut C, VarArgs<'a>) -> R + Send + Sync + 'static,
    R: ReturnShape,
{
    const IS_VARIADIC: bool = true;

    type Output = R;

    fn param_types() -> Vec<TypeInfo> {
        Vec::new()
    }

    fn invoke(&self, receiver: &mut C, args: CallArgs<'_>) -> BindResult<ReturnValue> {
        let args = args.into_variadic()?;
        Ok((self)(receiver, args).into_return())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector3;

    struct Meter {
        calls: u32,
    }

    fn touch(meter: &mut Meter) {
        meter.calls += 1;
    }

    fn scale(meter: &mut Meter, v: Vector3, k: f32, label: String) -> Vector3 {
        meter.calls += label.len() as u32;
        Vector3 {
            x: v.x * k,
            y: v.y * k,
            z: v.z * k,
        }
    }

    fn count_args(_meter: &mut Meter, args: VarArgs<'_>) -> i64 {
        args.len() as i64
    }

    fn params_of<F: NativeMethod<Meter, M>, M>(_: &F) -> Vec<TypeInfo> {
        F::param_types()
    }

    fn is_variadic<F: NativeMethod<Meter, M>, M>(_: &F) -> bool {
        F::IS_VARIADIC
    }

    #[test]
    fn test_param_types() {
        assert!(params_of(&touch).is_empty());
        let params = params_of(&scale);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "Vector3");
        assert_eq!(params[1].name, "f32");
        assert_eq!(params[2].name, "String");
        assert!(!is_variadic(&scale));
        assert!(is_variadic(&count_args));
    }

    #[test]
    fn test_invoke_unit() {
        let mut meter = Meter { calls: 0 };
        let ret = NativeMethod::invoke(&touch, &mut meter, CallArgs::Fixed(vec![])).unwrap();
        assert!(ret.value.is_none());
        assert_eq!(meter.calls, 1);
    }

    #[test]
    fn test_invoke_three_args() {
        let mut meter = Meter { calls: 0 };
        let args = CallArgs::Fixed(vec![
            NativeValue::Vector3(Vector3 { x: 1.0, y: 2.0, z: 3.0 }),
            NativeValue::F32(2.0),
            NativeValue::String("abc".into()),
        ]);
        let ret = NativeMethod::invoke(&scale, &mut meter, args).unwrap();
        match ret.value {
            Some(NativeValue::Vector3(v)) => assert_eq!((v.x, v.y, v.z), (2.0, 4.0, 6.0)),
            other => panic!("unexpected return {:?}", other),
        }
        assert_eq!(meter.calls, 3);
    }

    #[test]
    fn test_invoke_wrong_count() {
        let mut meter = Meter { calls: 0 };
        let err = NativeMethod::invoke(&scale, &mut meter, CallArgs::Fixed(vec![NativeValue::F32(1.0)]))
            .unwrap_err();
        assert!(matches!(err, BindingError::ArityMismatch { expected: 3, supplied: 1, .. }));
        assert_eq!(meter.calls, 0);
    }

    #[test]
    fn test_invoke_variadic() {
        let mut meter = Meter { calls: 0 };
        let ret = NativeMethod::invoke(&count_args, &mut meter, CallArgs::Variadic(VarArgs::new(&[])))
            .unwrap();
        assert!(matches!(ret.value, Some(NativeValue::I64(0))));

        let err = NativeMethod::invoke(&count_args, &mut meter, CallArgs::Fixed(vec![NativeValue::Nil]))
            .unwrap_err();
        assert!(matches!(err, BindingError::ArityMismatch { .. }));
    }
}
