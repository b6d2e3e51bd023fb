//! Error types for the bridge
//!
//! Two tiers exist. [`BindingError`] is a broken contract between the
//! extension and the bridge (a bad signature, an unknown class, a handle the
//! table never issued). The trampolines treat it as fatal. [`VariantError`]
//! and [`CallError`] are ordinary data-level failures that are reported back
//! to the caller.

use hostbind_sys as sys;

/// Result type for bind-time and dispatch-time operations
pub type BindResult<T> = Result<T, BindingError>;

/// Contract violations detected by the bridge
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    // ========================================================================
    // Host
    // ========================================================================
    /// `get_proc_address` returned null for a required entry point
    #[error("host entry point `{0}` is missing")]
    MissingEntryPoint(&'static str),

    /// The process-wide host table was installed twice
    #[error("host interface is already installed")]
    HostAlreadyInstalled,

    /// An operation needed the host table before it was installed
    #[error("host interface is not installed")]
    HostNotInstalled,

    // ========================================================================
    // Method Metadata
    // ========================================================================
    /// The callable's receiver is not the class it is bound on
    #[error("method `{method}` has receiver `{receiver}`, expected `{class}`")]
    ReceiverMismatch {
        /// Class the method is bound on
        class: String,
        /// Method being bound
        method: String,
        /// Receiver type of the callable
        receiver: String,
    },

    /// Variadic callable without the vararg flag, or the reverse
    #[error("method `{class}.{method}`: variadic signature does not match the vararg flag")]
    VariadicMismatch {
        /// Class the method is bound on
        class: String,
        /// Method being bound
        method: String,
    },

    /// A two-value return whose second element is not `bool`
    #[error("method `{class}.{method}`: second return value must be bool, found `{found}`")]
    SecondReturnNotBool {
        /// Class the method is bound on
        class: String,
        /// Method being bound
        method: String,
        /// Type of the second return value
        found: &'static str,
    },

    /// More than two return values
    #[error("method `{class}.{method}` returns {count} values, at most 2 are supported")]
    TooManyReturnValues {
        /// Class the method is bound on
        class: String,
        /// Method being bound
        method: String,
        /// Number of returned values
        count: usize,
    },

    /// More argument names than parameters
    #[error("method `{class}.{method}`: {names} argument names given for {params} parameters")]
    ArgumentNameMismatch {
        /// Class the method is bound on
        class: String,
        /// Method being bound
        method: String,
        /// Number of supplied names
        names: usize,
        /// Number of parameters
        params: usize,
    },

    /// More default values than parameters
    #[error("method `{class}.{method}`: {defaults} default values given for {params} parameters")]
    TooManyDefaults {
        /// Class the method is bound on
        class: String,
        /// Method being bound
        method: String,
        /// Number of default values
        defaults: usize,
        /// Number of parameters
        params: usize,
    },

    /// No codec exists for a parameter or return type
    #[error("no codec for type `{type_name}`")]
    UnresolvableType {
        /// Rust type name
        type_name: &'static str,
    },

    // ========================================================================
    // Class Registry
    // ========================================================================
    /// A virtual method whose declared name lacks the `V_` prefix
    #[error("virtual method `{class}.{method}` must start with `V_`")]
    VirtualPrefixMissing {
        /// Class the method is bound on
        class: String,
        /// Declared method name
        method: String,
    },

    /// Default argument values given for a virtual method
    #[error("virtual method `{class}.{method}` cannot take {defaults} default values")]
    VirtualDefaults {
        /// Class the method is bound on
        class: String,
        /// Declared method name
        method: String,
        /// Number of default values
        defaults: usize,
    },

    /// A regular method whose declared name carries the `V_` prefix
    #[error("method `{class}.{method}` starts with `V_` but is not virtual")]
    UnexpectedVirtualPrefix {
        /// Class the method is bound on
        class: String,
        /// Declared method name
        method: String,
    },

    /// Class registered twice
    #[error("class `{0}` is already registered")]
    DuplicateClass(String),

    /// Class declared as its own parent
    #[error("class `{0}` cannot be its own parent")]
    SelfParent(String),

    /// Parent class neither native nor registered
    #[error("class `{class}` has unknown parent `{parent}`")]
    MissingParent {
        /// Class being registered
        class: String,
        /// Declared parent
        parent: String,
    },

    /// Class name not found in the registry
    #[error("class `{0}` is not registered")]
    UnknownClass(String),

    /// Method bound twice on the same class
    #[error("method `{class}.{method}` is already bound")]
    DuplicateMethod {
        /// Class the method is bound on
        class: String,
        /// Exposed method name
        method: String,
    },

    /// Exposed name is already taken by the other method table
    #[error("method `{class}.{method}` is already bound as {existing}")]
    MethodAlreadyVirtual {
        /// Class the method is bound on
        class: String,
        /// Exposed method name
        method: String,
        /// Table that already holds the name ("virtual" or "regular")
        existing: &'static str,
    },

    /// Property bound twice
    #[error("property `{class}.{property}` is already bound")]
    DuplicateProperty {
        /// Class the property is bound on
        class: String,
        /// Property name
        property: String,
    },

    /// Property getter not bound on the class
    #[error("property `{class}.{property}`: getter `{getter}` is not bound")]
    GetterMissing {
        /// Class the property is bound on
        class: String,
        /// Property name
        property: String,
        /// Getter name
        getter: String,
    },

    /// Property getter takes arguments
    #[error("property `{class}.{property}`: getter `{getter}` must take 0 arguments, takes {arity}")]
    GetterInvalid {
        /// Class the property is bound on
        class: String,
        /// Property name
        property: String,
        /// Getter name
        getter: String,
        /// Actual argument count
        arity: usize,
    },

    /// Property setter missing or not unary
    #[error("property `{class}.{property}`: setter `{setter}` must be bound and take 1 argument")]
    SetterInvalid {
        /// Class the property is bound on
        class: String,
        /// Property name
        property: String,
        /// Setter name
        setter: String,
    },

    /// Signal bound twice
    #[error("signal `{class}.{signal}` is already bound")]
    DuplicateSignal {
        /// Class the signal is bound on
        class: String,
        /// Signal name
        signal: String,
    },

    /// Constant bound twice
    #[error("constant `{class}.{constant}` is already bound")]
    DuplicateConstant {
        /// Class the constant is bound on
        class: String,
        /// Constant name
        constant: String,
    },

    // ========================================================================
    // Dispatch
    // ========================================================================
    /// Boxed call with fewer arguments than parameters and no default to fill in
    #[error("method `{method}`: too few arguments, expected {expected}, got {supplied}")]
    TooFewArguments {
        /// Method description
        method: String,
        /// Parameter count
        expected: usize,
        /// Supplied argument count
        supplied: usize,
    },

    /// Raw call with the wrong number of slots
    #[error("method `{method}`: raw call expects {expected} arguments, got {supplied}")]
    ArityMismatch {
        /// Method description
        method: String,
        /// Parameter count
        expected: usize,
        /// Supplied slot count
        supplied: usize,
    },

    /// Decoded value does not match the parameter type
    #[error("argument {index} of `{method}`: expected {expected}, got {found}")]
    ArgumentTypeMismatch {
        /// Method description
        method: String,
        /// Zero-based argument index
        index: usize,
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },

    /// A codec was handed a value of another type
    #[error("expected a {expected} value, got {found}")]
    ValueTypeMismatch {
        /// Codec type name
        expected: &'static str,
        /// Carried type name
        found: &'static str,
    },

    /// A method returned something other than the protocol requires
    #[error("method `{method}`: expected return type {expected}")]
    ReturnTypeMismatch {
        /// Method description
        method: String,
        /// Expected type name
        expected: &'static str,
    },

    /// Instance state is not the method's receiver type
    #[error("instance of `{class}` is not a `{expected}`")]
    InstanceTypeMismatch {
        /// Class of the instance
        class: String,
        /// Receiver type expected by the method
        expected: &'static str,
    },

    /// A method was called on a foreign object with no native state
    #[error("instance of `{0}` has no native state")]
    InstanceIsNull(String),

    // ========================================================================
    // Binding Table
    // ========================================================================
    /// Handle not issued by this table, or already freed
    #[error("unknown instance handle {0:#x}")]
    UnknownInstance(usize),

    /// The host failed to construct the parent object
    #[error("host failed to construct `{0}`")]
    ConstructFailed(String),

    // ========================================================================
    // Entry
    // ========================================================================
    /// Entry point called with no level initializer
    #[error("no initialization function registered")]
    NoInitializer,
}

/// Data-level failures of variant accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VariantError {
    /// The operation is not supported for this value or key
    #[error("invalid variant operation")]
    Invalid,

    /// Index outside the container
    #[error("index {index} out of bounds")]
    OutOfBounds {
        /// Requested index
        index: i64,
    },
}

/// Call failures reported to the host through `GDExtensionCallError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// No such method
    #[error("invalid method")]
    InvalidMethod,

    /// Argument of the wrong type
    #[error("invalid argument {argument}, expected variant type {expected}")]
    InvalidArgument {
        /// Zero-based argument index
        argument: i32,
        /// Expected variant type tag
        expected: i32,
    },

    /// More arguments than the method accepts
    #[error("too many arguments, expected {expected}")]
    TooManyArguments {
        /// Parameter count
        expected: i32,
    },

    /// Fewer arguments than the method requires
    #[error("too few arguments, expected {expected}")]
    TooFewArguments {
        /// Parameter count
        expected: i32,
    },

    /// Called on a null instance
    #[error("instance is null")]
    InstanceIsNull,

    /// Non-const method called through a const reference
    #[error("method is not const")]
    MethodNotConst,
}

impl CallError {
    /// Host representation of this error
    pub fn to_sys(self) -> sys::GDExtensionCallError {
        let (error, argument, expected) = match self {
            CallError::InvalidMethod => (sys::GDEXTENSION_CALL_ERROR_INVALID_METHOD, 0, 0),
            CallError::InvalidArgument { argument, expected } => {
                (sys::GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT, argument, expected)
            }
            CallError::TooManyArguments { expected } => {
                (sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS, 0, expected)
            }
            CallError::TooFewArguments { expected } => {
                (sys::GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS, 0, expected)
            }
            CallError::InstanceIsNull => (sys::GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL, 0, 0),
            CallError::MethodNotConst => (sys::GDEXTENSION_CALL_ERROR_METHOD_NOT_CONST, 0, 0),
        };
        sys::GDExtensionCallError {
            error,
            argument,
            expected,
        }
    }

    /// Parse a host call error. `None` for `GDEXTENSION_CALL_OK` and unknown codes.
    pub fn from_sys(err: &sys::GDExtensionCallError) -> Option<Self> {
        match err.error {
            sys::GDEXTENSION_CALL_ERROR_INVALID_METHOD => Some(CallError::InvalidMethod),
            sys::GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT => Some(CallError::InvalidArgument {
                argument: err.argument,
                expected: err.expected,
            }),
            sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS => {
                Some(CallError::TooManyArguments { expected: err.expected })
            }
            sys::GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS => {
                Some(CallError::TooFewArguments { expected: err.expected })
            }
            sys::GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL => Some(CallError::InstanceIsNull),
            sys::GDEXTENSION_CALL_ERROR_METHOD_NOT_CONST => Some(CallError::MethodNotConst),
            _ => None,
        }
    }
}

/// Outcome of a failed dispatch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallFailure {
    /// Contract violation, fatal at the C boundary
    #[error(transparent)]
    Contract(#[from] BindingError),

    /// Reported to the host
    #[error(transparent)]
    Call(#[from] CallError),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override with an unusable value
    #[error("invalid value `{value}` for {var}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_sys_roundtrip() {
        let errors = [
            CallError::InvalidMethod,
            CallError::InvalidArgument { argument: 2, expected: 4 },
            CallError::TooManyArguments { expected: 3 },
            CallError::TooFewArguments { expected: 1 },
            CallError::InstanceIsNull,
            CallError::MethodNotConst,
        ];
        for err in errors {
            assert_eq!(CallError::from_sys(&err.to_sys()), Some(err));
        }
        assert_eq!(CallError::from_sys(&sys::GDExtensionCallError::default()), None);
    }

    #[test]
    fn test_too_many_arguments_sets_expected() {
        let raw = CallError::TooManyArguments { expected: 2 }.to_sys();
        assert_eq!(raw.error, sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS);
        assert_eq!(raw.expected, 2);
    }

    #[test]
    fn test_binding_error_messages() {
        let err = BindingError::MissingParent {
            class: "Widget".into(),
            parent: "Gadget".into(),
        };
        assert_eq!(err.to_string(), "class `Widget` has unknown parent `Gadget`");

        let failure: CallFailure = BindingError::NoInitializer.into();
        assert_eq!(failure.to_string(), "no initialization function registered");
    }
}
