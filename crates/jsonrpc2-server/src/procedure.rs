//! Typed procedures and their type-erased form.
//!
//! A procedure is any async function taking the service receiver (`Arc<S>`)
//! followed by up to eight typed formals and returning `Result<R, E>`, where the
//! result serializes to JSON and the failure has a display form.

use std::any::type_name;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::params::{Argument, ParamType};
use crate::registry::DispatchError;

pub type ProcedureFuture = BoxFuture<'static, Result<Value, DispatchError>>;

/// Conversion of a typed async function into a callable procedure.
///
/// `Args` is the tuple of formal types after the receiver; it only exists to
/// keep the blanket implementations for different arities apart.
pub trait IntoProcedure<S, Args>: Send + Sync + 'static {
    /// Formal parameter types, in declaration order, excluding the receiver.
    fn param_types() -> Vec<ParamType>;

    /// Runs the function with already coerced arguments.
    ///
    /// Arguments that do not match the formals fail with
    /// [`DispatchError::InvalidArgumentsCount`] or
    /// [`DispatchError::InvalidArgumentType`] without running the function.
    fn invoke(&self, receiver: Arc<S>, args: Vec<Argument>) -> ProcedureFuture;
}

/// A registered procedure with its receiver bound.
#[async_trait]
pub trait Procedure: Send + Sync {
    fn param_types(&self) -> &[ParamType];

    async fn call(&self, args: Vec<Argument>) -> Result<Value, DispatchError>;
}

pub(crate) struct BoundProcedure<S, P, Args> {
    receiver: Arc<S>,
    procedure: P,
    params: Vec<ParamType>,
    _args: PhantomData<fn() -> Args>,
}

impl<S, P, Args> BoundProcedure<S, P, Args>
where
    P: IntoProcedure<S, Args>,
{
    pub(crate) fn new(receiver: Arc<S>, procedure: P) -> Self {
        Self {
            receiver,
            procedure,
            params: P::param_types(),
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<S, P, Args> Procedure for BoundProcedure<S, P, Args>
where
    S: Send + Sync + 'static,
    P: IntoProcedure<S, Args>,
    Args: 'static,
{
    fn param_types(&self) -> &[ParamType] {
        &self.params
    }

    async fn call(&self, args: Vec<Argument>) -> Result<Value, DispatchError> {
        self.procedure.invoke(Arc::clone(&self.receiver), args).await
    }
}

fn finish<R, E>(outcome: Result<R, E>) -> Result<Value, DispatchError>
where
    R: Serialize,
    E: Display,
{
    match outcome {
        Ok(result) => serde_json::to_value(result).map_err(DispatchError::ResultEncoding),
        Err(failure) => Err(DispatchError::Procedure(failure.to_string())),
    }
}

fn rejected(error: DispatchError) -> ProcedureFuture {
    future::ready(Err(error)).boxed()
}

macro_rules! impl_into_procedure {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<S, F, Fut, R, E, $($ty,)*> IntoProcedure<S, ($($ty,)*)> for F
        where
            S: Send + Sync + 'static,
            F: Fn(Arc<S>, $($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Serialize + Send + 'static,
            E: Display + Send + 'static,
            $($ty: DeserializeOwned + JsonSchema + Send + 'static,)*
        {
            fn param_types() -> Vec<ParamType> {
                vec![$(ParamType::of::<$ty>()),*]
            }

            fn invoke(&self, receiver: Arc<S>, args: Vec<Argument>) -> ProcedureFuture {
                let expected = <[&str]>::len(&[$(stringify!($ty)),*]);
                let found = args.len();
                if found != expected {
                    return rejected(DispatchError::InvalidArgumentsCount { expected, found });
                }

                let mut args = args.into_iter().enumerate();
                $(
                    let Some((position, argument)) = args.next() else {
                        return rejected(DispatchError::InvalidArgumentsCount { expected, found });
                    };
                    let $ty = match argument.downcast::<$ty>() {
                        Ok(value) => *value,
                        Err(_) => {
                            return rejected(DispatchError::InvalidArgumentType {
                                position,
                                expected: type_name::<$ty>(),
                            });
                        }
                    };
                )*

                let pending = (self)(receiver, $($ty),*);
                async move {
                    let outcome = pending.await;
                    finish(outcome)
                }
                .boxed()
            }
        }
    };
}

impl_into_procedure!();
impl_into_procedure!(T1);
impl_into_procedure!(T1, T2);
impl_into_procedure!(T1, T2, T3);
impl_into_procedure!(T1, T2, T3, T4);
impl_into_procedure!(T1, T2, T3, T4, T5);
impl_into_procedure!(T1, T2, T3, T4, T5, T6);
impl_into_procedure!(T1, T2, T3, T4, T5, T6, T7);
impl_into_procedure!(T1, T2, T3, T4, T5, T6, T7, T8);
