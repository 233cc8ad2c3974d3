// src/proxy/instance.rs
//! Proxy instances
//!
//! A proxy pairs a shared descriptor with the parts bound at construction:
//! target, mixins and interceptors. Calls are dispatched through the
//! descriptor's vtable. The interceptor chain is fixed for the lifetime of
//! the instance.

use crate::generation::resolver::Slot;
use crate::interception::{Interceptor, InterceptorSelector};
use crate::model::{CallShape, Frame, Target, TypeInfo, TypeRef, Value};
use crate::proxy::descriptor::{GeneratedMember, ProxyTypeDescriptor};
use crate::utils::errors::ProxyError;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Chain = Arc<[Arc<dyn Interceptor>]>;

/// Instance of a synthesized implementation
pub struct Proxy {
    descriptor: Arc<ProxyTypeDescriptor>,
    target: Option<Arc<dyn Target>>,
    mixins: Vec<Arc<dyn Target>>,
    interceptors: Chain,
    selector: Option<Arc<dyn InterceptorSelector>>,
    /// Selector results per member, computed on first call
    selected: Vec<OnceCell<Chain>>,
}

impl Proxy {
    pub(crate) fn new(
        descriptor: Arc<ProxyTypeDescriptor>,
        target: Option<Arc<dyn Target>>,
        mixins: Vec<Arc<dyn Target>>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        selector: Option<Arc<dyn InterceptorSelector>>,
    ) -> Self {
        let selected = match selector {
            Some(_) => descriptor.members().iter().map(|_| OnceCell::new()).collect(),
            None => Vec::new(),
        };

        Self {
            descriptor,
            target,
            mixins,
            interceptors: interceptors.into(),
            selector,
            selected,
        }
    }

    pub fn descriptor(&self) -> &Arc<ProxyTypeDescriptor> {
        &self.descriptor
    }

    /// Real implementation fallback (base instance for class proxies)
    pub fn target(&self) -> Option<&Arc<dyn Target>> {
        self.target.as_ref()
    }

    pub fn mixins(&self) -> &[Arc<dyn Target>] {
        &self.mixins
    }

    pub fn mixin(&self, slot: usize) -> Option<&Arc<dyn Target>> {
        self.mixins.get(slot)
    }

    /// Interceptors bound at construction
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    pub(crate) fn slot_target(&self, slot: Slot) -> Option<Arc<dyn Target>> {
        match slot {
            Slot::Target => self.target.clone(),
            Slot::Mixin(index) => self.mixins.get(index).cloned(),
            Slot::Abstract => None,
        }
    }

    /// Chain for one member, applying the selector on first use
    pub(crate) fn interceptors_for(&self, member: &GeneratedMember) -> Chain {
        match (&self.selector, self.selected.get(member.index())) {
            (Some(selector), Some(cell)) => Arc::clone(cell.get_or_init(|| {
                selector
                    .select(self.descriptor.type_info(), member.source(), &self.interceptors)
                    .into()
            })),
            _ => Arc::clone(&self.interceptors),
        }
    }

    /// Call the vtable entry at `index`
    pub fn invoke_index(
        &self,
        index: usize,
        generic_args: &[TypeRef],
        args: &mut [Value],
    ) -> anyhow::Result<Value> {
        let member = self
            .descriptor
            .member(index)
            .ok_or_else(|| ProxyError::MemberNotFound {
                type_name: self.descriptor.name().to_string(),
                member: format!("#{}", index),
            })?;
        self.dispatch(member, generic_args, args)
    }

    fn dispatch(
        &self,
        member: &GeneratedMember,
        generic_args: &[TypeRef],
        args: &mut [Value],
    ) -> anyhow::Result<Value> {
        member
            .member()
            .signature()
            .check_arguments(args, generic_args)
            .map_err(|reason| ProxyError::ArgumentMismatch {
                member: member.member().qualified_name(),
                reason,
            })?;

        (member.forwarder())(self, member, generic_args, args)
    }
}

impl Target for Proxy {
    fn type_info(&self) -> &Arc<TypeInfo> {
        self.descriptor.type_info()
    }

    fn invoke_member(&self, shape: &CallShape, frame: &mut Frame<'_>) -> anyhow::Result<Value> {
        let member = self.descriptor.find(shape).ok_or_else(|| ProxyError::MemberNotFound {
            type_name: self.descriptor.name().to_string(),
            member: shape.to_string(),
        })?;

        let generic_args = frame.generic_args();
        self.dispatch(member, generic_args, frame.args_mut())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("type", &self.descriptor.name())
            .field("has_target", &self.target.is_some())
            .field("mixins", &self.mixins.len())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
