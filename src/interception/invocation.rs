// src/interception/invocation.rs
//! Reified in-flight call
//!
//! An `Invocation` is created per call and never shared across threads. It
//! owns copies of the caller's arguments; by-ref slots are copied back by the
//! forwarder once the outermost `proceed` has returned.
//!
//! `proceed` advances through the interceptor chain. Chain position lives on
//! the invocation: it is incremented before an interceptor runs and restored
//! after it returns, so calling `proceed` twice from the same interceptor runs
//! the rest of the chain twice.

use crate::generation::request::ProxyKind;
use crate::generation::resolver::{ResolutionTag, Slot};
use crate::interception::interceptor::Interceptor;
use crate::model::{Frame, MemberInfo, Target, TypeRef, Value};
use crate::proxy::{GeneratedMember, Proxy};
use crate::utils::errors::{ProxyError, Result};
use std::fmt;
use std::sync::Arc;

/// Which real-implementation fallback an invocation uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationKind {
    /// No target; the chain must produce the result
    InterfaceWithoutTarget,
    /// Forward to the proxy target
    InterfaceWithTarget,
    /// Forward to the base implementation
    Class,
    /// Forward to a separate instance of the base type
    ClassWithTarget,
    /// Forward to a mixin instance
    Mixin,
}

/// One call travelling through the interceptor chain
pub struct Invocation<'a> {
    proxy: &'a Proxy,
    member: &'a GeneratedMember,
    generic_args: Vec<TypeRef>,
    arguments: Vec<Value>,
    return_value: Option<Value>,
    target: Option<Arc<dyn Target>>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    position: usize,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        proxy: &'a Proxy,
        member: &'a GeneratedMember,
        generic_args: Vec<TypeRef>,
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            proxy,
            member,
            generic_args,
            arguments,
            return_value: None,
            target: proxy.slot_target(member.slot()),
            interceptors: proxy.interceptors_for(member),
            position: 0,
        }
    }

    /// Continue with the next interceptor, or the real implementation at the
    /// end of the chain
    pub fn proceed(&mut self) -> anyhow::Result<()> {
        if self.position < self.interceptors.len() {
            let interceptor = Arc::clone(&self.interceptors[self.position]);
            self.position += 1;
            let result = interceptor.intercept(self);
            self.position -= 1;
            result
        } else {
            self.invoke_target()
        }
    }

    fn invoke_target(&mut self) -> anyhow::Result<()> {
        let target = self.target.clone().ok_or_else(|| ProxyError::NoImplementation {
            member: self.member.member().qualified_name(),
        })?;

        let mut frame = Frame::new(self.member.name(), &mut self.arguments, &self.generic_args);
        let value = target.invoke_member(self.member.shape(), &mut frame)?;
        self.return_value = Some(value);
        Ok(())
    }

    /// The proxy the call was made on
    pub fn proxy(&self) -> &'a Proxy {
        self.proxy
    }

    /// Member as declared on the synthesized implementation
    pub fn method(&self) -> &'a MemberInfo {
        self.member.member()
    }

    /// Member as declared on the originating contract
    pub fn source_method(&self) -> &'a MemberInfo {
        self.member.source()
    }

    pub fn generated(&self) -> &'a GeneratedMember {
        self.member
    }

    pub fn tag(&self) -> ResolutionTag {
        self.member.tag()
    }

    pub fn kind(&self) -> InvocationKind {
        match (self.member.slot(), self.proxy.descriptor().kind()) {
            (Slot::Mixin(_), _) => InvocationKind::Mixin,
            (_, ProxyKind::Interface) => InvocationKind::InterfaceWithoutTarget,
            (_, ProxyKind::InterfaceWithTarget) => InvocationKind::InterfaceWithTarget,
            (_, ProxyKind::Class) => InvocationKind::Class,
            (_, ProxyKind::ClassWithTarget) => InvocationKind::ClassWithTarget,
        }
    }

    /// Type arguments bound for this call
    pub fn generic_arguments(&self) -> &[TypeRef] {
        &self.generic_args
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Replace an argument; the value must fit the parameter type
    pub fn set_argument(&mut self, index: usize, value: Value) -> Result<()> {
        let member = self.member.member();
        let ty = member
            .signature()
            .bound_param(index, &self.generic_args)
            .ok_or_else(|| ProxyError::ArgumentMismatch {
                member: member.qualified_name(),
                reason: format!("no argument at position {}", index),
            })?;

        if !ty.admits(&value) {
            return Err(ProxyError::ArgumentMismatch {
                member: member.qualified_name(),
                reason: format!("argument {} expects {}, got {}", index, ty, value.type_ref()),
            });
        }

        if let Some(slot) = self.arguments.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }

    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Set the result; interceptors that short-circuit must call this
    pub fn set_return_value(&mut self, value: impl Into<Value>) {
        self.return_value = Some(value.into());
    }

    /// Current invocation target
    pub fn target(&self) -> Option<&Arc<dyn Target>> {
        self.target.as_ref()
    }

    /// Redirect the rest of this call to another instance
    pub fn set_target(&mut self, target: Arc<dyn Target>) -> Result<()> {
        if self.kind() == InvocationKind::InterfaceWithoutTarget {
            return Err(ProxyError::TargetNotChangeable {
                member: self.member.member().qualified_name(),
            });
        }
        self.target = Some(target);
        Ok(())
    }

    /// Index of the next interceptor `proceed` would run
    pub fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn into_parts(self) -> (Vec<Value>, Option<Value>) {
        (self.arguments, self.return_value)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.member.member().qualified_name())
            .field("generic_args", &self.generic_args)
            .field("arguments", &self.arguments)
            .field("return_value", &self.return_value)
            .field("position", &self.position)
            .field("chain", &self.interceptors.len())
            .finish()
    }
}
