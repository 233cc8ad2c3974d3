// src/proxy/descriptor.rs
//! Generated implementation descriptors
//!
//! A descriptor is produced once per cache key and shared by every proxy
//! instance of that shape. It holds the member vtable, the slot each member
//! falls back to and the synthesized type description. Instance parts
//! (target, mixins, interceptors) are bound by `instantiate`.

use crate::generation::hook::HookDecision;
use crate::generation::request::{CacheKey, ProxyKind};
use crate::generation::resolver::{ResolutionTag, Slot};
use crate::generation::synthesizer::Forwarder;
use crate::interception::{Interceptor, InterceptorSelector};
use crate::model::{CallShape, MemberInfo, Object, Target, TypeId, TypeInfo, Value};
use crate::proxy::instance::Proxy;
use crate::proxy::mixin::MixinComposer;
use crate::utils::errors::{ProxyError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Member of a synthesized implementation
pub struct GeneratedMember {
    pub(crate) index: usize,
    pub(crate) member: Arc<MemberInfo>,
    pub(crate) source: Arc<MemberInfo>,
    pub(crate) contract: String,
    pub(crate) contracts: Vec<TypeId>,
    pub(crate) tag: ResolutionTag,
    pub(crate) slot: Slot,
    pub(crate) decision: HookDecision,
    pub(crate) by_ref_slots: Vec<usize>,
    pub(crate) forwarder: Forwarder,
}

impl GeneratedMember {
    /// Position in the vtable
    pub fn index(&self) -> usize {
        self.index
    }

    /// Member as declared on the synthesized type
    pub fn member(&self) -> &MemberInfo {
        &self.member
    }

    /// Member as declared on the originating contract
    pub fn source(&self) -> &MemberInfo {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.member.name()
    }

    pub fn shape(&self) -> &CallShape {
        self.member.shape()
    }

    /// Name of the contract the member was resolved from
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Every contract this member serves
    pub fn contracts(&self) -> &[TypeId] {
        &self.contracts
    }

    pub fn tag(&self) -> ResolutionTag {
        self.tag
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn decision(&self) -> HookDecision {
        self.decision
    }

    pub fn is_intercepted(&self) -> bool {
        self.decision.intercepts()
    }

    pub fn by_ref_slots(&self) -> &[usize] {
        &self.by_ref_slots
    }

    pub(crate) fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }
}

impl fmt::Debug for GeneratedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedMember")
            .field("index", &self.index)
            .field("shape", &self.member.shape().to_string())
            .field("contract", &self.contract)
            .field("tag", &self.tag)
            .field("slot", &self.slot)
            .field("decision", &self.decision)
            .finish()
    }
}

/// Per-instance parts bound at construction
#[derive(Clone, Default)]
pub struct ProxyParts {
    pub target: Option<Arc<dyn Target>>,
    pub constructor_args: Vec<Value>,
    pub mixins: Vec<Arc<dyn Target>>,
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    pub selector: Option<Arc<dyn InterceptorSelector>>,
}

/// Reusable synthesized implementation
pub struct ProxyTypeDescriptor {
    pub(crate) name: String,
    pub(crate) key: CacheKey,
    pub(crate) fingerprint: String,
    pub(crate) kind: ProxyKind,
    pub(crate) base: Option<Arc<TypeInfo>>,
    /// Requested interfaces
    pub(crate) interfaces: Vec<Arc<TypeInfo>>,
    /// Every exposed interface, inherited and mixin interfaces included
    pub(crate) exposed: Vec<Arc<TypeInfo>>,
    pub(crate) mixin_types: Vec<Arc<TypeInfo>>,
    pub(crate) members: Vec<GeneratedMember>,
    pub(crate) by_shape: HashMap<CallShape, usize>,
    pub(crate) type_info: Arc<TypeInfo>,
    pub(crate) backend: &'static str,
}

impl ProxyTypeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// SHA-256 structural fingerprint, hex encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    pub fn base(&self) -> Option<&Arc<TypeInfo>> {
        self.base.as_ref()
    }

    pub fn interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.interfaces
    }

    pub fn exposed_interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.exposed
    }

    /// Mixin type recorded for each slot
    pub fn mixin_types(&self) -> &[Arc<TypeInfo>] {
        &self.mixin_types
    }

    pub fn members(&self) -> &[GeneratedMember] {
        &self.members
    }

    pub fn member(&self, index: usize) -> Option<&GeneratedMember> {
        self.members.get(index)
    }

    pub fn find(&self, shape: &CallShape) -> Option<&GeneratedMember> {
        self.by_shape.get(shape).map(|&i| &self.members[i])
    }

    /// Synthesized type description
    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.type_info
    }

    /// Forwarder backend that produced the vtable
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Member table as pretty JSON
    pub fn summary(&self) -> Result<String> {
        let summary = DescriptorSummary {
            name: &self.name,
            kind: self.kind,
            backend: self.backend,
            fingerprint: &self.fingerprint,
            base: self.base.as_ref().map(|b| b.name()),
            interfaces: self.exposed.iter().map(|i| i.name()).collect(),
            mixins: self.mixin_types.iter().map(|m| m.name()).collect(),
            members: self
                .members
                .iter()
                .map(|m| MemberSummary {
                    index: m.index,
                    shape: m.shape().to_string(),
                    returns: m.member.signature().returns.to_string(),
                    contract: &m.contract,
                    tag: m.tag,
                    slot: m.slot.to_string(),
                    decision: m.decision,
                    intercepted: m.is_intercepted(),
                    metadata: m.member.metadata().iter().map(|e| e.to_string()).collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    /// Bind instance parts and create a proxy
    pub fn instantiate(self: &Arc<Self>, parts: ProxyParts) -> Result<Arc<Proxy>> {
        let target = self.bind_target(parts.target, &parts.constructor_args)?;
        let mixins = MixinComposer::new(&self.mixin_types).bind(parts.mixins)?;

        debug!(
            "Instantiating {} with {} interceptors and {} mixins",
            self.name,
            parts.interceptors.len(),
            mixins.len()
        );

        Ok(Arc::new(Proxy::new(
            Arc::clone(self),
            target,
            mixins,
            parts.interceptors,
            parts.selector,
        )))
    }

    fn bind_target(
        &self,
        target: Option<Arc<dyn Target>>,
        constructor_args: &[Value],
    ) -> Result<Option<Arc<dyn Target>>> {
        match (self.kind, target) {
            (ProxyKind::Interface, None) => Ok(None),
            (ProxyKind::Class, None) => {
                let base = self.base.as_ref().ok_or_else(|| {
                    ProxyError::InvalidContract(format!("{} has no base type", self.name))
                })?;
                let instance: Arc<dyn Target> = Arc::new(Object::construct(base, constructor_args)?);
                Ok(Some(instance))
            }
            (ProxyKind::InterfaceWithTarget, Some(target)) => {
                let actual = target.type_info();
                if let Some(missing) = self.interfaces.iter().find(|i| !actual.is_assignable_to(i)) {
                    return Err(ProxyError::TargetTypeMismatch {
                        expected: missing.name().to_string(),
                        actual: actual.name().to_string(),
                    });
                }
                Ok(Some(target))
            }
            (ProxyKind::ClassWithTarget, Some(target)) => {
                if let Some(base) = &self.base {
                    if !target.type_info().is_assignable_to(base) {
                        return Err(ProxyError::TargetTypeMismatch {
                            expected: base.name().to_string(),
                            actual: target.type_info().name().to_string(),
                        });
                    }
                }
                Ok(Some(target))
            }
            (kind, Some(_)) => Err(ProxyError::InvalidContract(format!(
                "{} was generated as {:?} and cannot bind a target",
                self.name, kind
            ))),
            (kind, None) => Err(ProxyError::InvalidContract(format!(
                "{} was generated as {:?} and requires a target",
                self.name, kind
            ))),
        }
    }
}

impl fmt::Debug for ProxyTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyTypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("members", &self.members)
            .field("backend", &self.backend)
            .finish()
    }
}

#[derive(Serialize)]
struct DescriptorSummary<'a> {
    name: &'a str,
    kind: ProxyKind,
    backend: &'a str,
    fingerprint: &'a str,
    base: Option<&'a str>,
    interfaces: Vec<&'a str>,
    mixins: Vec<&'a str>,
    members: Vec<MemberSummary<'a>>,
}

#[derive(Serialize)]
struct MemberSummary<'a> {
    index: usize,
    shape: String,
    returns: String,
    contract: &'a str,
    tag: ResolutionTag,
    slot: String,
    decision: HookDecision,
    intercepted: bool,
    metadata: Vec<String>,
}
