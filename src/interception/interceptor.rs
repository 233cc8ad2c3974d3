// src/interception/interceptor.rs
//! Interceptor and interceptor selector traits

use crate::interception::invocation::Invocation;
use crate::model::{MemberInfo, TypeInfo};
use std::fmt;
use std::sync::Arc;

/// One step of an interceptor chain
///
/// An interceptor continues the chain with `invocation.proceed()`, or
/// short-circuits by setting the return value and returning without
/// proceeding. Errors propagate to the caller unchanged.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()>;
}

/// Closure adapter
pub struct FnInterceptor<F> {
    f: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<()> {
        (self.f)(invocation)
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnInterceptor")
    }
}

/// Shared closure interceptor
pub fn interceptor_fn<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(&mut Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnInterceptor::new(f))
}

/// Picks the interceptors that apply to a member of a proxy instance
///
/// Consulted at most once per (instance, member); the result is reused for
/// every later call.
pub trait InterceptorSelector: Send + Sync {
    fn select(
        &self,
        ty: &TypeInfo,
        member: &MemberInfo,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Vec<Arc<dyn Interceptor>>;
}

impl<F> InterceptorSelector for F
where
    F: Fn(&TypeInfo, &MemberInfo, &[Arc<dyn Interceptor>]) -> Vec<Arc<dyn Interceptor>> + Send + Sync,
{
    fn select(
        &self,
        ty: &TypeInfo,
        member: &MemberInfo,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Vec<Arc<dyn Interceptor>> {
        self(ty, member, interceptors)
    }
}
