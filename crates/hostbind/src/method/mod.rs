//! Callable metadata
//!
//! A [`MethodBind`] pairs the [`MethodMetadata`] captured from a Rust
//! callable with a type-erased invoker. Metadata is built once, when the
//! method is bound: parameter types are resolved to codecs, the return
//! shape is checked, and the declared flags are validated against the
//! signature. Dispatch never looks at Rust types again.

mod info;
mod native;

pub use info::{MethodInfoStorage, PropertyInfoStorage};
pub use native::{NativeMethod, VariadicMarker};

use crate::codec::{accepts_variant, ErasedCodec, NativeValue, WireType};
use crate::error::{BindResult, BindingError};
use crate::instance::ExtensionClass;
use crate::reflect::{codec_for, TypeInfo};
use crate::variant::Variant;
use crate::wire::WireTable;
use hostbind_sys::{self as sys, VariantType};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::BitOr;

// ============================================================================
// Flags
// ============================================================================

/// Host method flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodFlags(u32);

impl MethodFlags {
    pub const NORMAL: Self = Self(sys::GDEXTENSION_METHOD_FLAG_NORMAL);
    pub const EDITOR: Self = Self(sys::GDEXTENSION_METHOD_FLAG_EDITOR);
    pub const CONST: Self = Self(sys::GDEXTENSION_METHOD_FLAG_CONST);
    pub const VIRTUAL: Self = Self(sys::GDEXTENSION_METHOD_FLAG_VIRTUAL);
    pub const VARARG: Self = Self(sys::GDEXTENSION_METHOD_FLAG_VARARG);
    pub const STATIC: Self = Self(sys::GDEXTENSION_METHOD_FLAG_STATIC);
    pub const DEFAULT: Self = Self(sys::GDEXTENSION_METHOD_FLAGS_DEFAULT);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for MethodFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for MethodFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// ============================================================================
// Return Shapes
// ============================================================================

/// How a callable returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStyle {
    /// Returns `()`
    None,
    /// Returns one value
    Value,
    /// Returns a value and a `bool` flag
    ValueAndBool,
}

/// What a call produced, in erased form
#[derive(Debug, Clone, Default)]
pub struct ReturnValue {
    pub value: Option<NativeValue>,
    /// Second return value of a `ValueAndBool` callable
    pub flag: Option<bool>,
}

impl ReturnValue {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Return types a bound callable may have
pub trait ReturnShape: 'static {
    const STYLE: ReturnStyle;

    /// Descriptor of the returned value, `None` for `()`
    fn value_type() -> Option<TypeInfo>;

    /// Reject shapes the host cannot express.
    fn validate(_class: &str, _method: &str) -> BindResult<()> {
        Ok(())
    }

    fn into_return(self) -> ReturnValue;
}

impl ReturnShape for () {
    const STYLE: ReturnStyle = ReturnStyle::None;

    fn value_type() -> Option<TypeInfo> {
        None
    }

    fn into_return(self) -> ReturnValue {
        ReturnValue::none()
    }
}

impl<T: WireType> ReturnShape for T {
    const STYLE: ReturnStyle = ReturnStyle::Value;

    fn value_type() -> Option<TypeInfo> {
        Some(TypeInfo::of::<T>())
    }

    fn into_return(self) -> ReturnValue {
        ReturnValue {
            value: Some(self.into_native()),
            flag: None,
        }
    }
}

impl<A: WireType, B: WireType> ReturnShape for (A, B) {
    const STYLE: ReturnStyle = ReturnStyle::ValueAndBool;

    fn value_type() -> Option<TypeInfo> {
        Some(TypeInfo::of::<A>())
    }

    fn validate(class: &str, method: &str) -> BindResult<()> {
        if B::VARIANT_TYPE != VariantType::Bool {
            return Err(BindingError::SecondReturnNotBool {
                class: class.to_string(),
                method: method.to_string(),
                found: B::NAME,
            });
        }
        Ok(())
    }

    fn into_return(self) -> ReturnValue {
        let flag = match self.1.into_native() {
            NativeValue::Bool(b) => Some(b),
            _ => None,
        };
        ReturnValue {
            value: Some(self.0.into_native()),
            flag,
        }
    }
}

impl<A: WireType, B: WireType, C: WireType> ReturnShape for (A, B, C) {
    const STYLE: ReturnStyle = ReturnStyle::ValueAndBool;

    fn value_type() -> Option<TypeInfo> {
        Some(TypeInfo::of::<A>())
    }

    fn validate(class: &str, method: &str) -> BindResult<()> {
        Err(BindingError::TooManyReturnValues {
            class: class.to_string(),
            method: method.to_string(),
            count: 3,
        })
    }

    fn into_return(self) -> ReturnValue {
        ReturnValue {
            value: Some(self.0.into_native()),
            flag: None,
        }
    }
}

// ============================================================================
// Call Arguments
// ============================================================================

/// Arguments of a variadic call, borrowed from the caller
#[derive(Debug, Clone, Copy)]
pub struct VarArgs<'a> {
    args: &'a [&'a Variant],
}

impl<'a> VarArgs<'a> {
    pub fn new(args: &'a [&'a Variant]) -> Self {
        Self { args }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Variant> {
        self.args.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Variant> + 'a {
        self.args.iter().copied()
    }

    /// Unbox argument `index` as `T`. `None` if absent or of another type.
    pub fn decode<T: WireType>(&self, wire: &WireTable, index: usize) -> Option<T> {
        let value = self.get(index)?;
        if !accepts_variant::<T>(value.get_type(wire)) {
            return None;
        }
        Some(T::decode_variant(wire, value))
    }
}

/// Arguments handed to an invoker
#[derive(Debug)]
pub enum CallArgs<'a> {
    /// One decoded value per parameter
    Fixed(Vec<NativeValue>),
    Variadic(VarArgs<'a>),
}

impl<'a> CallArgs<'a> {
    /// The fixed arguments, checked against the expected count
    pub fn into_fixed(self, expected: usize) -> BindResult<Vec<NativeValue>> {
        match self {
            CallArgs::Fixed(values) if values.len() == expected => Ok(values),
            CallArgs::Fixed(values) => Err(BindingError::ArityMismatch {
                method: String::new(),
                expected,
                supplied: values.len(),
            }),
            CallArgs::Variadic(args) => Err(BindingError::ArityMismatch {
                method: String::new(),
                expected,
                supplied: args.len(),
            }),
        }
    }

    pub fn into_variadic(self) -> BindResult<VarArgs<'a>> {
        match self {
            CallArgs::Variadic(args) => Ok(args),
            CallArgs::Fixed(values) => Err(BindingError::ArityMismatch {
                method: String::new(),
                expected: 0,
                supplied: values.len(),
            }),
        }
    }
}

// ============================================================================
// Method Metadata
// ============================================================================

/// Everything known about a bound method. Immutable after construction.
pub struct MethodMetadata {
    pub class_name: String,
    /// Rust-side name, checked against the `V_` convention
    pub declared_name: String,
    /// Name the host sees
    pub exposed_name: String,
    pub params: Vec<TypeInfo>,
    pub param_codecs: Vec<&'static ErasedCodec>,
    pub arg_names: Vec<String>,
    pub return_type: Option<TypeInfo>,
    pub return_codec: Option<&'static ErasedCodec>,
    pub return_style: ReturnStyle,
    pub is_variadic: bool,
    pub is_virtual: bool,
    /// Values for the trailing parameters
    pub default_arguments: Vec<Variant>,
    pub flags: MethodFlags,
}

impl MethodMetadata {
    /// Capture the metadata of callable `F` bound on `class_name`.
    pub fn new<C, F, M>(
        class_name: &str,
        declared_name: &str,
        exposed_name: &str,
        arg_names: &[&str],
        default_arguments: Vec<Variant>,
        flags: MethodFlags,
    ) -> BindResult<Self>
    where
        C: ExtensionClass,
        F: NativeMethod<C, M>,
    {
        if C::CLASS_NAME != class_name {
            return Err(BindingError::ReceiverMismatch {
                class: class_name.to_string(),
                method: declared_name.to_string(),
                receiver: C::CLASS_NAME.to_string(),
            });
        }

        let is_variadic = flags.contains(MethodFlags::VARARG);
        if F::IS_VARIADIC != is_variadic {
            return Err(BindingError::VariadicMismatch {
                class: class_name.to_string(),
                method: declared_name.to_string(),
            });
        }

        <F::Output as ReturnShape>::validate(class_name, declared_name)?;

        let params = F::param_types();
        if arg_names.len() > params.len() {
            return Err(BindingError::ArgumentNameMismatch {
                class: class_name.to_string(),
                method: declared_name.to_string(),
                names: arg_names.len(),
                params: params.len(),
            });
        }
        if !is_variadic && default_arguments.len() > params.len() {
            return Err(BindingError::TooManyDefaults {
                class: class_name.to_string(),
                method: declared_name.to_string(),
                defaults: default_arguments.len(),
                params: params.len(),
            });
        }

        let param_codecs = params.iter().map(codec_for).collect::<BindResult<Vec<_>>>()?;
        let return_type = <F::Output as ReturnShape>::value_type();
        let return_codec = return_type.as_ref().map(codec_for).transpose()?;

        let metadata = Self {
            class_name: class_name.to_string(),
            declared_name: declared_name.to_string(),
            exposed_name: exposed_name.to_string(),
            params,
            param_codecs,
            arg_names: arg_names.iter().map(|s| s.to_string()).collect(),
            return_type,
            return_codec,
            return_style: <F::Output as ReturnShape>::STYLE,
            is_variadic,
            is_virtual: flags.contains(MethodFlags::VIRTUAL),
            default_arguments,
            flags,
        };
        log::debug!("captured {}", metadata);
        Ok(metadata)
    }

    #[inline]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Index of the first parameter that has a default
    #[inline]
    pub fn first_default(&self) -> usize {
        self.params.len().saturating_sub(self.default_arguments.len())
    }

    /// Default value for parameter `index`, aligned to the tail
    pub fn default_for(&self, index: usize) -> Option<&Variant> {
        index
            .checked_sub(self.first_default())
            .and_then(|i| self.default_arguments.get(i))
    }

    /// Host-visible name of parameter `index`
    pub fn arg_name(&self, index: usize) -> String {
        match self.arg_names.get(index) {
            Some(name) => name.clone(),
            None => format!("arg{}", index),
        }
    }
}

impl fmt::Display for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodBind:{}.{}(", self.class_name, self.declared_name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{}/{}", param.name, param.variant_type.sys())?;
        }
        f.write_str(")")?;
        if let Some(ret) = &self.return_type {
            write!(f, " {}", ret.name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ============================================================================
// Method Bind
// ============================================================================

/// A bound method: metadata plus the erased callable
pub struct MethodBind {
    metadata: MethodMetadata,
    invoker: Box<dyn ErasedInvoke>,
}

impl MethodBind {
    pub fn new<C, F, M>(
        class_name: &str,
        declared_name: &str,
        exposed_name: &str,
        method: F,
        arg_names: &[&str],
        default_arguments: Vec<Variant>,
        flags: MethodFlags,
    ) -> BindResult<Self>
    where
        C: ExtensionClass,
        F: NativeMethod<C, M>,
        M: 'static,
    {
        let metadata = MethodMetadata::new::<C, F, M>(
            class_name,
            declared_name,
            exposed_name,
            arg_names,
            default_arguments,
            flags,
        )?;
        Ok(Self {
            metadata,
            invoker: Box::new(TypedInvoker::<C, M, F> {
                method,
                _marker: PhantomData,
            }),
        })
    }

    #[inline]
    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    /// Run the callable against instance state. The state must be the
    /// receiver type the method was bound with.
    pub fn invoke(&self, state: &mut (dyn Any + Send), args: CallArgs<'_>) -> BindResult<ReturnValue> {
        self.invoker.invoke(state, args)
    }
}

impl fmt::Debug for MethodBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.metadata, f)
    }
}

trait ErasedInvoke: Send + Sync {
    fn invoke(&self, state: &mut (dyn Any + Send), args: CallArgs<'_>) -> BindResult<ReturnValue>;
}

struct TypedInvoker<C, M, F> {
    method: F,
    _marker: PhantomData<fn() -> (C, M)>,
}

impl<C, M, F> ErasedInvoke for TypedInvoker<C, M, F>
where
    C: ExtensionClass,
    F: NativeMethod<C, M>,
    M: 'static,
{
    fn invoke(&self, state: &mut (dyn Any + Send), args: CallArgs<'_>) -> BindResult<ReturnValue> {
        let receiver = state
            .downcast_mut::<C>()
            .ok_or(BindingError::InstanceTypeMismatch {
                class: String::new(),
                expected: C::CLASS_NAME,
            })?;
        self.method.invoke(receiver, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectHandle;

    struct Counter {
        count: i64,
    }

    impl ExtensionClass for Counter {
        const CLASS_NAME: &'static str = "Counter";
        const PARENT_CLASS_NAME: &'static str = "Object";

        fn construct(_owner: ObjectHandle) -> Self {
            Counter { count: 0 }
        }
    }

    impl Counter {
        fn get_count(&mut self) -> i64 {
            self.count
        }

        fn add(&mut self, a: i64, b: i32) -> i64 {
            self.count += a + b as i64;
            self.count
        }

        fn lookup(&mut self, _key: String) -> (i64, bool) {
            (self.count, true)
        }

        fn pair(&mut self) -> (i64, i32) {
            (0, 0)
        }

        fn triple(&mut self) -> (i64, bool, bool) {
            (0, true, true)
        }

        fn sum(&mut self, args: VarArgs<'_>) -> i64 {
            args.len() as i64
        }
    }

    #[test]
    fn test_metadata_capture() {
        let bind = MethodBind::new(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &["a", "b"],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        let meta = bind.metadata();
        assert_eq!(meta.param_count(), 2);
        assert_eq!(meta.params[0].variant_type, VariantType::Int);
        assert_eq!(meta.return_style, ReturnStyle::Value);
        assert_eq!(meta.to_string(), "MethodBind:Counter.Add(i64/2,i32/2) i64");
        assert_eq!(meta.arg_name(1), "b");
        assert_eq!(meta.arg_name(2), "arg2");
    }

    #[test]
    fn test_receiver_mismatch() {
        let err = MethodBind::new(
            "Widget",
            "GetCount",
            "get_count",
            Counter::get_count,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap_err();
        assert!(matches!(err, BindingError::ReceiverMismatch { .. }));
    }

    #[test]
    fn test_too_many_arg_names() {
        let err = MethodBind::new(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &["a", "b", "c"],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap_err();
        assert_eq!(
            err,
            BindingError::ArgumentNameMismatch {
                class: "Counter".into(),
                method: "Add".into(),
                names: 3,
                params: 2,
            }
        );
    }

    #[test]
    fn test_return_shapes() {
        let bind = MethodBind::new(
            "Counter",
            "Lookup",
            "lookup",
            Counter::lookup,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        assert_eq!(bind.metadata().return_style, ReturnStyle::ValueAndBool);

        let err = MethodBind::new("Counter", "Pair", "pair", Counter::pair, &[], vec![], MethodFlags::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, BindingError::SecondReturnNotBool { found: "i32", .. }));

        let err = MethodBind::new(
            "Counter",
            "Triple",
            "triple",
            Counter::triple,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap_err();
        assert!(matches!(err, BindingError::TooManyReturnValues { count: 3, .. }));
    }

    #[test]
    fn test_variadic_flag_must_match() {
        let err = MethodBind::new("Counter", "Sum", "sum", Counter::sum, &[], vec![], MethodFlags::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, BindingError::VariadicMismatch { .. }));

        let err = MethodBind::new(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &[],
            vec![],
            MethodFlags::DEFAULT | MethodFlags::VARARG,
        )
        .unwrap_err();
        assert!(matches!(err, BindingError::VariadicMismatch { .. }));

        let bind = MethodBind::new(
            "Counter",
            "Sum",
            "sum",
            Counter::sum,
            &[],
            vec![],
            MethodFlags::DEFAULT | MethodFlags::VARARG,
        )
        .unwrap();
        assert!(bind.metadata().is_variadic);
        assert_eq!(bind.metadata().param_count(), 0);
    }

    #[test]
    fn test_invoke_fixed() {
        let bind = MethodBind::new(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        let mut state: Box<dyn Any + Send> = Box::new(Counter { count: 1 });
        let ret = bind
            .invoke(
                state.as_mut(),
                CallArgs::Fixed(vec![NativeValue::I64(2), NativeValue::I32(3)]),
            )
            .unwrap();
        assert!(matches!(ret.value, Some(NativeValue::I64(6))));
    }

    #[test]
    fn test_invoke_rejects_wrong_state() {
        let bind = MethodBind::new(
            "Counter",
            "GetCount",
            "get_count",
            Counter::get_count,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        let mut state: Box<dyn Any + Send> = Box::new(5u32);
        let err = bind.invoke(state.as_mut(), CallArgs::Fixed(vec![])).unwrap_err();
        assert!(matches!(err, BindingError::InstanceTypeMismatch { expected: "Counter", .. }));
    }

    #[test]
    fn test_invoke_rejects_wrong_argument() {
        let bind = MethodBind::new(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &[],
            vec![],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        let mut state: Box<dyn Any + Send> = Box::new(Counter { count: 0 });
        let err = bind
            .invoke(
                state.as_mut(),
                CallArgs::Fixed(vec![NativeValue::I64(1), NativeValue::F64(1.0)]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BindingError::ArgumentTypeMismatch { index: 1, expected: "i32", found: "f64", .. }
        ));
    }

    #[test]
    fn test_default_alignment() {
        let bind = MethodBind::new(
            "Counter",
            "Add",
            "add",
            Counter::add,
            &["a", "b"],
            vec![Variant::nil()],
            MethodFlags::DEFAULT,
        )
        .unwrap();
        let meta = bind.metadata();
        assert_eq!(meta.first_default(), 1);
        assert!(meta.default_for(0).is_none());
        assert!(meta.default_for(1).is_some());
        assert!(meta.default_for(2).is_none());

        let err = MethodBind::new(
            "Counter",
            "GetCount",
            "get_count",
            Counter::get_count,
            &[],
            vec![Variant::nil()],
            MethodFlags::DEFAULT,
        )
        .unwrap_err();
        assert!(matches!(err, BindingError::TooManyDefaults { defaults: 1, params: 0, .. }));
    }
}
