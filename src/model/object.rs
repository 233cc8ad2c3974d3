// src/model/object.rs
//! Call targets and concrete objects
//!
//! Anything a call can land on implements `Target`: plain objects built from
//! a class description, and proxies. Dispatch is by `CallShape`, so a target
//! only needs a member with the same shape, not the same declaring contract.

use crate::model::types::{CallShape, MemberInfo, State, TypeInfo};
use crate::model::value::{describe_values, TypeRef, Value};
use crate::utils::errors::{ProxyError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Something a call can be dispatched to
pub trait Target: Send + Sync + 'static {
    /// Runtime type of this target
    fn type_info(&self) -> &Arc<TypeInfo>;

    /// Invoke the member matching `shape`
    fn invoke_member(&self, shape: &CallShape, frame: &mut Frame<'_>) -> anyhow::Result<Value>;

    fn as_any(&self) -> &dyn Any;

    /// Call a non-generic member by name, resolving overloads from the arguments
    fn call(&self, name: &str, args: &mut [Value]) -> anyhow::Result<Value> {
        self.call_generic(name, &[], args)
    }

    /// Call a member by name with explicit generic arguments
    fn call_generic(
        &self,
        name: &str,
        generic_args: &[TypeRef],
        args: &mut [Value],
    ) -> anyhow::Result<Value> {
        let member: Arc<MemberInfo> = self.type_info().resolve_call(name, generic_args, args)?;
        let mut frame = Frame::new(member.name(), args, generic_args);
        self.invoke_member(member.shape(), &mut frame)
    }
}

/// Argument view handed to member bodies
pub struct Frame<'a> {
    member: &'a str,
    args: &'a mut [Value],
    generic_args: &'a [TypeRef],
}

impl<'a> Frame<'a> {
    pub fn new(member: &'a str, args: &'a mut [Value], generic_args: &'a [TypeRef]) -> Self {
        Self {
            member,
            args,
            generic_args,
        }
    }

    pub fn member(&self) -> &str {
        self.member
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn args(&self) -> &[Value] {
        self.args
    }

    pub fn generic_args(&self) -> &'a [TypeRef] {
        self.generic_args
    }

    pub fn args_mut(&mut self) -> &mut [Value] {
        self.args
    }

    pub fn generic_arg(&self, index: usize) -> Option<&TypeRef> {
        self.generic_args.get(index)
    }

    pub fn arg(&self, index: usize) -> anyhow::Result<&Value> {
        self.args.get(index).ok_or_else(|| {
            self.mismatch(format!("no argument at position {}", index))
                .into()
        })
    }

    pub fn int(&self, index: usize) -> anyhow::Result<i64> {
        let value = self.arg(index)?;
        value
            .as_int()
            .ok_or_else(|| self.mismatch(format!("argument {} is {:?}, expected Int", index, value)).into())
    }

    pub fn str(&self, index: usize) -> anyhow::Result<&str> {
        let value = self.arg(index)?;
        value
            .as_str()
            .ok_or_else(|| self.mismatch(format!("argument {} is {:?}, expected Str", index, value)).into())
    }

    /// Write an argument slot (ref/out parameters)
    pub fn set(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
        match self.args.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.mismatch(format!("no argument at position {}", index)).into()),
        }
    }

    fn mismatch(&self, reason: String) -> ProxyError {
        ProxyError::ArgumentMismatch {
            member: self.member.to_string(),
            reason,
        }
    }
}

/// Instance of a class description
pub struct Object {
    ty: Arc<TypeInfo>,
    state: State,
}

impl Object {
    /// Construct an instance through the first constructor accepting `args`
    pub fn new(ty: &Arc<TypeInfo>, args: &[Value]) -> Result<Arc<Object>> {
        if ty.is_abstract() {
            return Err(ProxyError::InvalidType {
                type_name: ty.name().to_string(),
                reason: "cannot instantiate an interface or abstract class".to_string(),
            });
        }
        Self::construct(ty, args).map(Arc::new)
    }

    /// Wrap existing state without running a constructor
    pub fn with_state<S: Any + Send + Sync>(ty: &Arc<TypeInfo>, state: S) -> Result<Arc<Object>> {
        if ty.is_abstract() {
            return Err(ProxyError::InvalidType {
                type_name: ty.name().to_string(),
                reason: "cannot instantiate an interface or abstract class".to_string(),
            });
        }
        Ok(Arc::new(Object {
            ty: Arc::clone(ty),
            state: Box::new(state),
        }))
    }

    /// Construct without the abstractness check; class proxies supply the
    /// missing members themselves.
    pub(crate) fn construct(ty: &Arc<TypeInfo>, args: &[Value]) -> Result<Object> {
        let mismatch = || ProxyError::ConstructorMismatch {
            type_name: ty.name().to_string(),
            arguments: describe_values(args),
        };

        let state: State = if ty.constructors().is_empty() {
            // Implicit parameterless constructor
            if !args.is_empty() {
                return Err(mismatch());
            }
            Box::new(())
        } else {
            let ctor = ty
                .constructors()
                .iter()
                .find(|c| c.accepts(args))
                .ok_or_else(mismatch)?;
            ctor.construct(args).map_err(|e| ProxyError::InvalidType {
                type_name: ty.name().to_string(),
                reason: format!("constructor failed: {}", e),
            })?
        };

        Ok(Object {
            ty: Arc::clone(ty),
            state,
        })
    }

    /// Borrow the constructor-produced state
    pub fn state<S: Any>(&self) -> Option<&S> {
        self.state.downcast_ref::<S>()
    }
}

impl Target for Object {
    fn type_info(&self) -> &Arc<TypeInfo> {
        &self.ty
    }

    fn invoke_member(&self, shape: &CallShape, frame: &mut Frame<'_>) -> anyhow::Result<Value> {
        let member = self.ty.find_member(shape).ok_or_else(|| ProxyError::MemberNotFound {
            type_name: self.ty.name().to_string(),
            member: shape.to_string(),
        })?;

        let body = member.body().ok_or_else(|| ProxyError::NoImplementation {
            member: member.qualified_name(),
        })?;

        body(self, frame)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("type", &self.ty.name()).finish()
    }
}
