// src/generation/resolver.rs
//! Contract resolution
//!
//! Combines a base type, the requested interfaces and the mixin types into a
//! flat member table. Every distinct call shape gets exactly one entry in an
//! arena; contracts that share a shape share the entry. Each entry carries a
//! resolution tag and the slot its calls fall back to.
//!
//! Priority, highest first:
//!
//! 1. Base type members (override the base)
//! 2. Requested interface members (implement the interface)
//! 3. Mixin interface members (delegate to the mixin), only for unclaimed shapes

use crate::generation::hook::{GenerationHook, HookDecision};
use crate::generation::request::{ProxyKind, ProxyRequest};
use crate::model::{CallShape, MemberInfo, TypeId, TypeInfo, Visibility};
use crate::utils::errors::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a generated member obtains its real implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionTag {
    OverrideBase,
    ImplementInterface,
    DelegateToMixin,
}

/// Where a call lands when the interceptor chain is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// The proxy target (base instance for class proxies)
    Target,
    /// Mixin instance at the given index
    Mixin(usize),
    /// No implementation; only interceptors can complete the call
    Abstract,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Target => write!(f, "target"),
            Slot::Mixin(k) => write!(f, "mixin[{}]", k),
            Slot::Abstract => write!(f, "abstract"),
        }
    }
}

/// One entry of the resolved member table
#[derive(Debug, Clone)]
pub struct ResolvedMember {
    /// Member whose signature and metadata are implemented
    pub member: Arc<MemberInfo>,
    /// Contract the member was first found on
    pub contract: Arc<TypeInfo>,
    /// Every contract served by this entry
    pub contracts: Vec<TypeId>,
    pub tag: ResolutionTag,
    pub slot: Slot,
    pub decision: HookDecision,
}

/// Output of contract resolution
#[derive(Debug)]
pub struct ResolvedContract {
    pub members: Vec<ResolvedMember>,
    /// Every interface the implementation exposes, request order first
    pub interfaces: Vec<Arc<TypeInfo>>,
}

/// Arena-based resolution pass over one request
pub struct ContractResolver<'a> {
    request: &'a ProxyRequest,
    arena: Vec<ResolvedMember>,
    by_shape: HashMap<CallShape, usize>,
    interfaces: Vec<Arc<TypeInfo>>,
    seen_interfaces: HashSet<TypeId>,
}

impl<'a> ContractResolver<'a> {
    pub fn new(request: &'a ProxyRequest) -> Self {
        Self {
            request,
            arena: Vec::new(),
            by_shape: HashMap::new(),
            interfaces: Vec::new(),
            seen_interfaces: HashSet::new(),
        }
    }

    pub fn resolve(mut self) -> Result<ResolvedContract> {
        self.validate()?;

        if let Some(base) = self.request.base() {
            self.collect_base(base)?;
        }

        let interface_slot = match self.request.kind() {
            ProxyKind::InterfaceWithTarget | ProxyKind::ClassWithTarget => Slot::Target,
            ProxyKind::Interface | ProxyKind::Class => Slot::Abstract,
        };
        for iface in expand(self.request.interfaces()) {
            self.collect_interface(&iface, interface_slot)?;
        }

        for (index, mixin) in self.request.mixin_types().iter().enumerate() {
            self.collect_mixin(index, mixin)?;
        }

        self.hook().members_inspected();

        debug!(
            "Resolved {} members over {} interfaces for {}",
            self.arena.len(),
            self.interfaces.len(),
            self.request.primary_name()
        );

        Ok(ResolvedContract {
            members: self.arena,
            interfaces: self.interfaces,
        })
    }

    fn hook(&self) -> &'a dyn GenerationHook {
        self.request.options().hook.as_ref()
    }

    fn validate(&self) -> Result<()> {
        if let Some(iface) = self.request.interfaces().iter().find(|i| !i.is_interface()) {
            return Err(ProxyError::InvalidContract(format!(
                "{} is a class and cannot be implemented as an interface",
                iface.name()
            )));
        }

        match (self.request.kind().is_class(), self.request.base()) {
            (true, None) => Err(ProxyError::InvalidContract(
                "class proxies require a base type".to_string(),
            )),
            (true, Some(base)) if base.is_interface() => Err(ProxyError::InvalidContract(format!(
                "{} is an interface, not a base class",
                base.name()
            ))),
            (true, Some(base)) if base.is_sealed() => Err(ProxyError::InvalidContract(format!(
                "cannot proxy sealed class {}",
                base.name()
            ))),
            (false, Some(base)) => Err(ProxyError::InvalidContract(format!(
                "interface proxies cannot have a base type ({})",
                base.name()
            ))),
            (false, None) if self.request.interfaces().is_empty() => Err(ProxyError::InvalidContract(
                "interface proxies require at least one interface".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn collect_base(&mut self, base: &Arc<TypeInfo>) -> Result<()> {
        for field in base.fields() {
            debug!("Field {} on {} cannot be intercepted", field.name, base.name());
            if self.hook().non_proxyable_field(base, field) == HookDecision::Abort {
                return Err(ProxyError::UnsupportedMemberKind {
                    type_name: base.name().to_string(),
                    member: field.name.clone(),
                    reason: "fields have no accessor to intercept".to_string(),
                });
            }
        }

        for member in base.members() {
            let decision = match member.visibility() {
                Visibility::Private => {
                    debug!("Excluded private member {} on {}", member.shape(), base.name());
                    continue;
                }
                Visibility::Internal => self.report_non_proxyable(base, member, "not accessible")?,
                _ if !member.is_overridable() => {
                    self.report_non_proxyable(base, member, "not overridable")?
                }
                _ => self.decide(base, member)?,
            };

            self.push(ResolvedMember {
                member: Arc::clone(member),
                contract: Arc::clone(base),
                contracts: vec![base.id()],
                tag: ResolutionTag::OverrideBase,
                slot: Slot::Target,
                decision,
            });
        }

        Ok(())
    }

    fn collect_interface(&mut self, iface: &Arc<TypeInfo>, slot: Slot) -> Result<()> {
        self.expose(iface);

        for member in iface.declared_members() {
            if let Some(&index) = self.by_shape.get(member.shape()) {
                let entry = &mut self.arena[index];
                check_return_types(entry, member, iface)?;
                if !entry.contracts.contains(&iface.id()) {
                    entry.contracts.push(iface.id());
                }
                continue;
            }

            let decision = self.decide(iface, member)?;
            self.push(ResolvedMember {
                member: Arc::clone(member),
                contract: Arc::clone(iface),
                contracts: vec![iface.id()],
                tag: ResolutionTag::ImplementInterface,
                slot,
                decision,
            });
        }

        Ok(())
    }

    fn collect_mixin(&mut self, index: usize, mixin: &Arc<TypeInfo>) -> Result<()> {
        let duplicate = self.request.mixin_types()[..index]
            .iter()
            .any(|earlier| earlier.id() == mixin.id());
        if duplicate {
            return Err(ProxyError::AmbiguousMemberResolution {
                member: mixin.name().to_string(),
                detail: format!("mixin type {} supplied more than once", mixin.name()),
            });
        }

        let mut contracts: Vec<Arc<TypeInfo>> = Vec::new();
        if mixin.is_interface() {
            contracts.push(Arc::clone(mixin));
        }
        contracts.extend(mixin.all_interfaces().iter().cloned());

        if contracts.is_empty() {
            debug!("Mixin {} implements no interfaces; nothing to expose", mixin.name());
            return Ok(());
        }

        let slot = Slot::Mixin(index);
        for iface in contracts {
            self.expose(&iface);

            for member in iface.declared_members() {
                if let Some(&existing) = self.by_shape.get(member.shape()) {
                    let entry = &mut self.arena[existing];
                    check_return_types(entry, member, &iface)?;

                    match entry.slot {
                        Slot::Mixin(other) if other != index => {
                            return Err(ProxyError::AmbiguousMemberResolution {
                                member: member.shape().to_string(),
                                detail: format!(
                                    "implemented by mixin {} and mixin {}",
                                    other, index
                                ),
                            });
                        }
                        Slot::Mixin(_) => {}
                        _ => debug!(
                            "{} from mixin {} is already claimed by {}; primary contract wins",
                            member.shape(),
                            mixin.name(),
                            entry.contract.name()
                        ),
                    }

                    if !entry.contracts.contains(&iface.id()) {
                        entry.contracts.push(iface.id());
                    }
                    continue;
                }

                let decision = self.decide(&iface, member)?;
                self.push(ResolvedMember {
                    member: Arc::clone(member),
                    contract: Arc::clone(&iface),
                    contracts: vec![iface.id()],
                    tag: ResolutionTag::DelegateToMixin,
                    slot,
                    decision,
                });
            }
        }

        Ok(())
    }

    fn decide(&self, ty: &TypeInfo, member: &MemberInfo) -> Result<HookDecision> {
        match self.hook().should_intercept(ty, member) {
            HookDecision::Abort => Err(ProxyError::GenerationAborted {
                type_name: ty.name().to_string(),
                member: member.shape().to_string(),
            }),
            HookDecision::Skip => {
                warn!("Member {} on {} will not be intercepted", member.shape(), ty.name());
                Ok(HookDecision::Skip)
            }
            decision => Ok(decision),
        }
    }

    fn report_non_proxyable(&self, ty: &TypeInfo, member: &MemberInfo, reason: &str) -> Result<HookDecision> {
        debug!(
            "Excluded member {} on {} because it cannot be intercepted: {}",
            member.shape(),
            ty.name(),
            reason
        );

        match self.hook().non_proxyable_member(ty, member, reason) {
            HookDecision::Abort => Err(ProxyError::UnsupportedMemberKind {
                type_name: ty.name().to_string(),
                member: member.shape().to_string(),
                reason: reason.to_string(),
            }),
            HookDecision::Skip => {
                warn!("Member {} on {} is {}", member.shape(), ty.name(), reason);
                Ok(HookDecision::Skip)
            }
            _ => Ok(HookDecision::SkipSilently),
        }
    }

    fn push(&mut self, entry: ResolvedMember) {
        self.by_shape
            .insert(entry.member.shape().clone(), self.arena.len());
        self.arena.push(entry);
    }

    fn expose(&mut self, iface: &Arc<TypeInfo>) {
        if self.seen_interfaces.insert(iface.id()) {
            self.interfaces.push(Arc::clone(iface));
        }
    }
}

/// Requested interfaces followed by their inherited interfaces, deduplicated
fn expand(interfaces: &[Arc<TypeInfo>]) -> Vec<Arc<TypeInfo>> {
    let mut seen = HashSet::new();
    let mut all = Vec::new();
    for iface in interfaces {
        for candidate in std::iter::once(iface).chain(iface.all_interfaces()) {
            if seen.insert(candidate.id()) {
                all.push(Arc::clone(candidate));
            }
        }
    }
    all
}

fn check_return_types(entry: &ResolvedMember, member: &MemberInfo, iface: &TypeInfo) -> Result<()> {
    let claimed = &entry.member.signature().returns;
    let wanted = &member.signature().returns;
    if entry.member.signature().normalized_return() != member.signature().normalized_return() {
        return Err(ProxyError::AmbiguousMemberResolution {
            member: member.shape().to_string(),
            detail: format!(
                "{} returns {} but {} requires {}",
                entry.contract.name(),
                claimed,
                iface.name(),
                wanted
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::request::GenerationOptions;
    use crate::model::{MemberBuilder, TypeBuilder, TypeRef, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn iface(name: &str, members: &[(&str, TypeRef)]) -> Arc<TypeInfo> {
        members
            .iter()
            .fold(TypeBuilder::interface(name), |b, (m, ret)| {
                b.member(MemberBuilder::method(*m).returns(ret.clone()))
            })
            .build()
            .unwrap()
    }

    fn tags(resolved: &ResolvedContract) -> Vec<(String, ResolutionTag, Slot)> {
        resolved
            .members
            .iter()
            .map(|m| (m.member.name().to_string(), m.tag, m.slot))
            .collect()
    }

    #[test]
    fn test_shared_shape_emits_one_member() {
        let a = iface("IA", &[("Run", TypeRef::Int), ("Stop", TypeRef::Unit)]);
        let b = iface("IB", &[("Run", TypeRef::Int)]);

        let request = ProxyRequest::for_interfaces(&[a.clone(), b.clone()]).with_target();
        let resolved = ContractResolver::new(&request).resolve().unwrap();

        assert_eq!(resolved.members.len(), 2);
        let run = &resolved.members[0];
        assert_eq!(run.contracts, vec![a.id(), b.id()]);
        assert_eq!(run.slot, Slot::Target);
        assert_eq!(resolved.interfaces.len(), 2);
    }

    #[test]
    fn test_conflicting_return_types_are_ambiguous() {
        let a = iface("IA", &[("Run", TypeRef::Int)]);
        let b = iface("IB", &[("Run", TypeRef::Str)]);

        let request = ProxyRequest::for_interfaces(&[a, b]);
        let result = ContractResolver::new(&request).resolve();
        assert!(matches!(result, Err(ProxyError::AmbiguousMemberResolution { .. })));
    }

    #[test]
    fn test_renamed_generic_parameters_share_one_member() {
        let generic = |name: &str, param: &str| {
            TypeBuilder::interface(name)
                .member(
                    MemberBuilder::method("Get")
                        .generic(param)
                        .param("key", TypeRef::Str)
                        .returns(TypeRef::param(param)),
                )
                .build()
                .unwrap()
        };
        let a = generic("IA", "T");
        let b = generic("IB", "U");

        let request = ProxyRequest::for_interfaces(&[a.clone(), b.clone()]);
        let resolved = ContractResolver::new(&request).resolve().unwrap();
        assert_eq!(resolved.members.len(), 1);
        assert_eq!(resolved.members[0].contracts, vec![a.id(), b.id()]);
    }

    #[test]
    fn test_base_member_wins_over_interface() {
        let runnable = iface("IRunnable", &[("Run", TypeRef::Int)]);
        let base = TypeBuilder::class("Worker")
            .implements(&runnable)
            .member(MemberBuilder::method("Run").returns(TypeRef::Int).body(|_, _| Ok(1.into())))
            .build()
            .unwrap();

        let request = ProxyRequest::for_class(&base).with_interfaces(&[runnable.clone()]);
        let resolved = ContractResolver::new(&request).resolve().unwrap();

        assert_eq!(
            tags(&resolved),
            vec![("Run".to_string(), ResolutionTag::OverrideBase, Slot::Target)]
        );
        assert_eq!(resolved.members[0].contracts, vec![base.id(), runnable.id()]);
    }

    #[test]
    fn test_primary_contract_wins_over_mixin() {
        let x = iface("IX", &[("Shared", TypeRef::Int), ("OnlyX", TypeRef::Unit)]);
        let y = iface("IY", &[("Shared", TypeRef::Int), ("OnlyY", TypeRef::Unit)]);
        let mixin = TypeBuilder::class("YImpl")
            .implements(&y)
            .member(MemberBuilder::method("Shared").returns(TypeRef::Int).body(|_, _| Ok(2.into())))
            .member(MemberBuilder::method("OnlyY").body(|_, _| Ok(Value::Unit)))
            .build()
            .unwrap();

        let request = ProxyRequest::for_interfaces(&[x]).with_target().with_mixin_types(&[mixin]);
        let resolved = ContractResolver::new(&request).resolve().unwrap();

        assert_eq!(
            tags(&resolved),
            vec![
                ("Shared".to_string(), ResolutionTag::ImplementInterface, Slot::Target),
                ("OnlyX".to_string(), ResolutionTag::ImplementInterface, Slot::Target),
                ("OnlyY".to_string(), ResolutionTag::DelegateToMixin, Slot::Mixin(0)),
            ]
        );
        assert_eq!(resolved.interfaces.len(), 2);
    }

    #[test]
    fn test_two_mixins_on_one_shape_are_ambiguous() {
        let x = iface("IX", &[("Run", TypeRef::Unit)]);
        let y = iface("IY", &[("Log", TypeRef::Unit)]);
        let z = iface("IZ", &[("Log", TypeRef::Unit)]);
        let mixin = |name: &str, contract: &Arc<TypeInfo>| {
            TypeBuilder::class(name)
                .implements(contract)
                .member(MemberBuilder::method("Log").body(|_, _| Ok(Value::Unit)))
                .build()
                .unwrap()
        };

        let request = ProxyRequest::for_interfaces(&[x])
            .with_mixin_types(&[mixin("YImpl", &y), mixin("ZImpl", &z)]);
        let result = ContractResolver::new(&request).resolve();
        assert!(matches!(result, Err(ProxyError::AmbiguousMemberResolution { .. })));
    }

    #[test]
    fn test_non_overridable_members_are_reported() {
        #[derive(Default)]
        struct CountingHook {
            reported: AtomicUsize,
            inspected: AtomicUsize,
        }

        impl GenerationHook for CountingHook {
            fn non_proxyable_member(&self, _: &TypeInfo, _: &MemberInfo, _: &str) -> HookDecision {
                self.reported.fetch_add(1, Ordering::SeqCst);
                HookDecision::SkipSilently
            }

            fn members_inspected(&self) {
                self.inspected.fetch_add(1, Ordering::SeqCst);
            }
        }

        let base = TypeBuilder::class("Service")
            .member(MemberBuilder::method("Run").body(|_, _| Ok(Value::Unit)))
            .member(MemberBuilder::method("Id").returns(TypeRef::Int).non_overridable().body(|_, _| Ok(7.into())))
            .member(MemberBuilder::method("Secret").visibility(Visibility::Private).body(|_, _| Ok(Value::Unit)))
            .build()
            .unwrap();

        let hook = Arc::new(CountingHook::default());
        let options = GenerationOptions {
            hook: hook.clone(),
            ..GenerationOptions::default()
        };
        let request = ProxyRequest::for_class(&base).with_options(options);
        let resolved = ContractResolver::new(&request).resolve().unwrap();

        let decisions: Vec<(String, HookDecision)> = resolved
            .members
            .iter()
            .map(|m| (m.member.name().to_string(), m.decision))
            .collect();
        assert_eq!(
            decisions,
            vec![
                ("Run".to_string(), HookDecision::Intercept),
                ("Id".to_string(), HookDecision::SkipSilently),
            ]
        );
        assert_eq!(hook.reported.load(Ordering::SeqCst), 1);
        assert_eq!(hook.inspected.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abort_decisions_fail_resolution() {
        struct AbortHook;
        impl GenerationHook for AbortHook {
            fn non_proxyable_member(&self, _: &TypeInfo, _: &MemberInfo, _: &str) -> HookDecision {
                HookDecision::Abort
            }
        }

        let base = TypeBuilder::class("Service")
            .member(MemberBuilder::method("Id").non_overridable().body(|_, _| Ok(Value::Unit)))
            .build()
            .unwrap();
        let request = ProxyRequest::for_class(&base)
            .with_options(GenerationOptions::default().with_hook(AbortHook));
        assert!(matches!(
            ContractResolver::new(&request).resolve(),
            Err(ProxyError::UnsupportedMemberKind { .. })
        ));
    }

    #[test]
    fn test_should_intercept_decisions() {
        struct SkipHook;
        impl GenerationHook for SkipHook {
            fn should_intercept(&self, _: &TypeInfo, member: &MemberInfo) -> HookDecision {
                if member.name() == "Stop" {
                    HookDecision::Skip
                } else {
                    HookDecision::Intercept
                }
            }
        }

        let a = iface("IA", &[("Run", TypeRef::Int), ("Stop", TypeRef::Unit)]);
        let request = ProxyRequest::for_interfaces(&[a.clone()])
            .with_options(GenerationOptions::default().with_hook(SkipHook));
        let resolved = ContractResolver::new(&request).resolve().unwrap();
        let decisions: Vec<_> = resolved.members.iter().map(|m| m.decision).collect();
        assert_eq!(decisions, vec![HookDecision::Intercept, HookDecision::Skip]);

        struct AbortOnStop;
        impl GenerationHook for AbortOnStop {
            fn should_intercept(&self, _: &TypeInfo, member: &MemberInfo) -> HookDecision {
                if member.name() == "Stop" {
                    HookDecision::Abort
                } else {
                    HookDecision::Intercept
                }
            }
        }

        let request = ProxyRequest::for_interfaces(&[a])
            .with_options(GenerationOptions::default().with_hook(AbortOnStop));
        match ContractResolver::new(&request).resolve() {
            Err(ProxyError::GenerationAborted { type_name, member }) => {
                assert_eq!(type_name, "IA");
                assert!(member.starts_with("Stop"));
            }
            other => panic!("expected GenerationAborted, got {:?}", other.map(|r| r.members.len())),
        }
    }

    #[test]
    fn test_invalid_contracts() {
        let sealed = TypeBuilder::class("Final").sealed().build().unwrap();
        let request = ProxyRequest::for_class(&sealed);
        assert!(matches!(
            ContractResolver::new(&request).resolve(),
            Err(ProxyError::InvalidContract(_))
        ));

        let class = TypeBuilder::class("Plain").build().unwrap();
        let request = ProxyRequest::for_interfaces(&[class]);
        assert!(matches!(
            ContractResolver::new(&request).resolve(),
            Err(ProxyError::InvalidContract(_))
        ));
    }
}
