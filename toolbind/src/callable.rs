//! Type-erased callables with explicit signatures.
//!
//! Plain functions and closures become callables through [`IntoCallable`].
//! Anything else can implement [`Callable`] directly and describe itself with
//! a hand-built [`Signature`].

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use toolbind_schema::TypeDescriptor;

use crate::arg::ToolArg;
use crate::convert::ConvertError;
use crate::error::{BoxError, InvokeError};

type Decode = fn(Value) -> Result<Box<dyn Any + Send>, ConvertError>;

/// One declared parameter of a callable.
#[derive(Clone)]
pub struct ParamSpec {
    type_id: TypeId,
    type_name: &'static str,
    descriptor: TypeDescriptor,
    decode: Decode,
}

impl ParamSpec {
    /// Describes a parameter of type `T`.
    #[must_use]
    pub fn of<T: ToolArg>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            descriptor: T::descriptor(),
            decode: decode::<T>,
        }
    }

    /// Exact type of the parameter.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the parameter type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Registration-time description of the parameter type.
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub(crate) fn decode(&self, value: Value) -> Result<Box<dyn Any + Send>, ConvertError> {
        (self.decode)(value)
    }
}

fn decode<T: ToolArg>(value: Value) -> Result<Box<dyn Any + Send>, ConvertError> {
    T::from_canonical(value).map(|parsed| Box::new(parsed) as Box<dyn Any + Send>)
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSpec")
            .field("type_name", &self.type_name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Kind of one declared result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResultKind {
    /// An ordinary value.
    Value,
    /// An error slot.
    Error,
}

/// One produced result.
#[derive(Debug)]
pub enum Return {
    /// An ordinary value, already encoded.
    Value(Value),
    /// An error slot, `None` when the call succeeded.
    Error(Option<BoxError>),
}

/// Parameter and result layout of a callable.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<ParamSpec>,
    variadic: bool,
    results: Vec<ResultKind>,
}

impl Signature {
    /// Creates a fixed-arity signature.
    #[must_use]
    pub fn new(params: Vec<ParamSpec>, results: Vec<ResultKind>) -> Self {
        Self {
            params,
            variadic: false,
            results,
        }
    }

    /// Marks the last parameter as a variable-length tail.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Declared parameters in order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Returns `true` for a variable-length tail.
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Declared results in order.
    #[must_use]
    pub fn results(&self) -> &[ResultKind] {
        &self.results
    }
}

/// A callable whose signature is known at registration.
pub trait Callable: Send + Sync + 'static {
    /// Describes parameters and results.
    fn signature(&self) -> Signature;

    /// Runs the callable with one boxed argument per declared parameter.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] if an argument has the wrong type or a result
    /// cannot be encoded. Errors produced by the callable itself belong in
    /// the returned [`Return::Error`] slot.
    fn call(&self, args: Vec<Box<dyn Any + Send>>) -> Result<Vec<Return>, InvokeError>;
}

/// Return types of functions that can be adapted.
///
/// `()` produces no results, a value type produces one, and `Result<T, E>`
/// appends an error slot to the results of `T`. So `Result<(), E>` returns
/// only an error and `Result<u32, E>` returns a value and an error.
pub trait ToolOutput: Send + 'static {
    /// Declared result layout.
    fn result_kinds() -> Vec<ResultKind>;

    /// Encodes the produced results.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error if a value cannot be serialized.
    fn into_returns(self) -> Result<Vec<Return>, serde_json::Error>;
}

impl ToolOutput for () {
    fn result_kinds() -> Vec<ResultKind> {
        Vec::new()
    }

    fn into_returns(self) -> Result<Vec<Return>, serde_json::Error> {
        Ok(Vec::new())
    }
}

impl<T, E> ToolOutput for Result<T, E>
where
    T: ToolOutput,
    E: Into<BoxError> + Send + 'static,
{
    fn result_kinds() -> Vec<ResultKind> {
        let mut kinds = T::result_kinds();
        kinds.push(ResultKind::Error);
        kinds
    }

    fn into_returns(self) -> Result<Vec<Return>, serde_json::Error> {
        match self {
            Ok(value) => {
                let mut returns = value.into_returns()?;
                returns.push(Return::Error(None));
                Ok(returns)
            }
            Err(err) => {
                let mut returns: Vec<Return> = T::result_kinds()
                    .into_iter()
                    .map(|kind| match kind {
                        ResultKind::Value => Return::Value(Value::Null),
                        ResultKind::Error => Return::Error(None),
                    })
                    .collect();
                returns.push(Return::Error(Some(err.into())));
                Ok(returns)
            }
        }
    }
}

/// Wraps any serializable value as a single result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize + Send + 'static> ToolOutput for Json<T> {
    fn result_kinds() -> Vec<ResultKind> {
        vec![ResultKind::Value]
    }

    fn into_returns(self) -> Result<Vec<Return>, serde_json::Error> {
        Ok(vec![Return::Value(serde_json::to_value(self.0)?)])
    }
}

macro_rules! value_output {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToolOutput for $ty {
                fn result_kinds() -> Vec<ResultKind> {
                    vec![ResultKind::Value]
                }

                fn into_returns(self) -> Result<Vec<Return>, serde_json::Error> {
                    Ok(vec![Return::Value(serde_json::to_value(self)?)])
                }
            }
        )*
    };
}

value_output!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, &'static str,
    Value,
);

macro_rules! generic_value_output {
    ($($ty:ty => [$($param:ident),*]),* $(,)?) => {
        $(
            impl<$($param: Serialize + Send + 'static),*> ToolOutput for $ty {
                fn result_kinds() -> Vec<ResultKind> {
                    vec![ResultKind::Value]
                }

                fn into_returns(self) -> Result<Vec<Return>, serde_json::Error> {
                    Ok(vec![Return::Value(serde_json::to_value(self)?)])
                }
            }
        )*
    };
}

generic_value_output!(
    Vec<T> => [T],
    Option<T> => [T],
    BTreeMap<String, T> => [T],
    HashMap<String, T> => [T],
);

/// Functions and closures that can be adapted into a [`Callable`].
///
/// Implemented for `Fn` types of up to twelve [`ToolArg`] parameters
/// returning a [`ToolOutput`]. `Args` is a marker tuple of the parameter
/// types.
pub trait IntoCallable<Args>: Send + Sync + 'static {
    /// Erases the function's types.
    fn into_callable(self) -> Arc<dyn Callable>;
}

/// A function paired with the parameter and result types it is called with.
pub struct FnCallable<F, M> {
    f: F,
    marker: PhantomData<M>,
}

fn take<T: 'static>(
    args: &mut impl Iterator<Item = Box<dyn Any + Send>>,
) -> Result<T, InvokeError> {
    let arg = args
        .next()
        .ok_or_else(|| InvokeError::internal("too few arguments"))?;
    arg.downcast::<T>()
        .map(|arg| *arg)
        .map_err(|_| InvokeError::internal(format!("argument is not a {}", type_name::<T>())))
}

macro_rules! impl_callable {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> IntoCallable<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: ToolOutput,
            $($arg: ToolArg,)*
        {
            fn into_callable(self) -> Arc<dyn Callable> {
                Arc::new(FnCallable::<F, fn($($arg),*) -> R> {
                    f: self,
                    marker: PhantomData,
                })
            }
        }

        impl<F, R, $($arg,)*> Callable for FnCallable<F, fn($($arg),*) -> R>
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: ToolOutput,
            $($arg: ToolArg,)*
        {
            fn signature(&self) -> Signature {
                Signature::new(vec![$(ParamSpec::of::<$arg>()),*], R::result_kinds())
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, args: Vec<Box<dyn Any + Send>>) -> Result<Vec<Return>, InvokeError> {
                let mut args = args.into_iter();
                $(let $arg = take::<$arg>(&mut args)?;)*
                if args.next().is_some() {
                    return Err(InvokeError::internal("too many arguments"));
                }
                Ok((self.f)($($arg),*).into_returns()?)
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);
impl_callable!(A1, A2, A3, A4, A5, A6, A7);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11, A12);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boxed<T: Send + 'static>(value: T) -> Box<dyn Any + Send> {
        Box::new(value)
    }

    #[test]
    fn functions_describe_their_signature() {
        #[allow(clippy::cast_precision_loss)]
        fn scale(factor: f64, values: Vec<i64>) -> Result<Vec<f64>, std::io::Error> {
            Ok(values.into_iter().map(|v| v as f64 * factor).collect())
        }

        let callable = scale.into_callable();
        let signature = callable.signature();
        assert_eq!(signature.params().len(), 2);
        assert_eq!(signature.params()[1].descriptor().to_string(), "Vec<i64>");
        assert_eq!(signature.results(), &[ResultKind::Value, ResultKind::Error]);
        assert!(!signature.is_variadic());
    }

    #[test]
    fn call_unpacks_arguments_in_order() {
        let callable = (|a: i64, b: String| format!("{b}{a}")).into_callable();
        let returns = callable.call(vec![boxed(7_i64), boxed("n".to_owned())]).unwrap();
        assert!(matches!(&returns[..], [Return::Value(v)] if *v == json!("n7")));
    }

    #[test]
    fn result_unit_declares_only_an_error() {
        fn check(flag: bool) -> Result<(), String> {
            if flag { Ok(()) } else { Err("flag unset".into()) }
        }

        let callable = check.into_callable();
        assert_eq!(callable.signature().results(), &[ResultKind::Error]);

        let returns = callable.call(vec![boxed(false)]).unwrap();
        match &returns[..] {
            [Return::Error(Some(err))] => assert_eq!(err.to_string(), "flag unset"),
            other => panic!("unexpected returns: {other:?}"),
        }
    }

    #[test]
    fn failed_results_fill_value_slots_with_null() {
        let callable = (|| -> Result<u8, String> { Err("boom".into()) }).into_callable();
        let returns = callable.call(Vec::new()).unwrap();
        assert!(matches!(
            &returns[..],
            [Return::Value(Value::Null), Return::Error(Some(_))]
        ));
    }

    #[test]
    fn nested_results_declare_three_slots() {
        let callable = (|| -> Result<Result<u8, String>, String> { Ok(Ok(1)) }).into_callable();
        assert_eq!(callable.signature().results().len(), 3);
    }

    #[test]
    fn wrong_argument_types_are_internal_errors() {
        let callable = (|a: u8| a).into_callable();
        let err = callable.call(vec![boxed("nope")]).unwrap_err();
        assert!(matches!(err, InvokeError::Internal { .. }));

        let err = callable.call(Vec::new()).unwrap_err();
        assert!(matches!(err, InvokeError::Internal { .. }));
    }

    #[test]
    fn json_wraps_serializable_values() {
        #[derive(Serialize)]
        struct Summary {
            total: u32,
        }

        let callable = (|| Json(Summary { total: 3 })).into_callable();
        let returns = callable.call(Vec::new()).unwrap();
        assert!(matches!(&returns[..], [Return::Value(v)] if *v == json!({ "total": 3 })));
    }
}
